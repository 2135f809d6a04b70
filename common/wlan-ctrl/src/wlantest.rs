//! wlantest queries through `wlantest_cli`
//!
//! wlantest sniffs the hwsim medium, decrypts frames with the passphrases it
//! has been given and keeps per-BSS and per-STA state and counters.

use std::time::Duration;
use tracing::{debug, instrument};

use crate::ctrl::redact;
use crate::error::{CtrlError, CtrlResult};
use crate::executor::{run_tool, DEFAULT_TOOL_TIMEOUT};
use crate::types::{MacAddr, PmfMode, StaCounter};

/// Default wlantest_cli binary name
pub const DEFAULT_WLANTEST_CLI: &str = "wlantest_cli";

/// MFPC / MFPR bits of an observed RSN capabilities field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RsnCapab {
    /// Management frame protection capable
    pub mfpc: bool,
    /// Management frame protection required
    pub mfpr: bool,
}

impl RsnCapab {
    /// Parse the space separated flag list wlantest prints for `rsn_capab`
    pub fn parse(info: &str) -> Self {
        let mut capab = Self::default();
        for flag in info.split_whitespace() {
            match flag {
                "MFPC" => capab.mfpc = true,
                "MFPR" => capab.mfpr = true,
                _ => {}
            }
        }
        capab
    }

    pub fn pmf_mode(&self) -> PmfMode {
        match (self.mfpc, self.mfpr) {
            (_, true) => PmfMode::Required,
            (true, false) => PmfMode::Optional,
            (false, false) => PmfMode::Disabled,
        }
    }
}

/// Client for a running wlantest instance
#[derive(Debug, Clone)]
pub struct Wlantest {
    cli: String,
    timeout: Duration,
}

impl Default for Wlantest {
    fn default() -> Self {
        Self::new(DEFAULT_WLANTEST_CLI)
    }
}

impl Wlantest {
    pub fn new(cli: impl Into<String>) -> Self {
        Self {
            cli: cli.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn cli(&self, args: &[&str]) -> CtrlResult<String> {
        let out = run_tool(&self.cli, args, self.timeout).await?;
        if out.contains("FAIL") {
            return Err(CtrlError::CommandFailed {
                target: self.cli.clone(),
                command: redact(&args.join(" ")),
                reply: out.trim_end().to_string(),
            });
        }
        Ok(out)
    }

    /// Forget all BSS/STA state and counters
    pub async fn flush(&self) -> CtrlResult<()> {
        self.cli(&["flush"]).await.map(|_| ())
    }

    pub async fn add_passphrase(&self, passphrase: &str) -> CtrlResult<()> {
        self.cli(&["add_passphrase", passphrase]).await.map(|_| ())
    }

    pub async fn info_bss(&self, field: &str, bssid: MacAddr) -> CtrlResult<String> {
        let bssid = bssid.to_string();
        self.cli(&["info_bss", field, &bssid]).await
    }

    pub async fn info_sta(&self, field: &str, bssid: MacAddr, addr: MacAddr) -> CtrlResult<String> {
        let bssid = bssid.to_string();
        let addr = addr.to_string();
        self.cli(&["info_sta", field, &bssid, &addr]).await
    }

    #[instrument(skip(self))]
    pub async fn get_sta_counter(
        &self,
        counter: StaCounter,
        bssid: MacAddr,
        addr: MacAddr,
    ) -> CtrlResult<u64> {
        let bssid = bssid.to_string();
        let addr = addr.to_string();
        let out = self
            .cli(&["get_sta_counter", counter.as_str(), &bssid, &addr])
            .await?;

        let value = out.trim().parse().map_err(|_| CtrlError::InvalidCounter {
            counter: counter.to_string(),
            raw: out.trim().to_string(),
        })?;
        debug!(value, "counter read");
        Ok(value)
    }
}
