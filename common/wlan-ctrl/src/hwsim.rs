//! Data-plane checks over mac80211_hwsim

use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{CtrlError, CtrlResult};
use crate::executor::{run_tool, DEFAULT_TOOL_TIMEOUT};

/// Default hwsim_test binary name
pub const DEFAULT_HWSIM_TEST: &str = "hwsim_test";

/// Runs `hwsim_test` to pass frames both ways between two interfaces
#[derive(Debug, Clone)]
pub struct HwsimTest {
    program: String,
    timeout: Duration,
}

impl Default for HwsimTest {
    fn default() -> Self {
        Self::new(DEFAULT_HWSIM_TEST)
    }
}

impl HwsimTest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail with `Connectivity` unless traffic flows between the interfaces
    #[instrument(skip(self))]
    pub async fn test_connectivity(&self, ifname1: &str, ifname2: &str) -> CtrlResult<()> {
        match run_tool(&self.program, &[ifname1, ifname2], self.timeout).await {
            Ok(out) => {
                debug!(output = %out.trim_end(), "connectivity ok");
                Ok(())
            }
            Err(CtrlError::ToolFailed { code, stderr, .. }) => Err(CtrlError::Connectivity {
                src: ifname1.to_string(),
                dst: ifname2.to_string(),
                detail: format!("exit code {code}: {stderr}"),
            }),
            Err(e) => Err(e),
        }
    }
}
