//! Async executor for the hwsim helper tools
//!
//! wlantest is queried through `wlantest_cli` and data-plane reachability is
//! checked with `hwsim_test`; both are short-lived processes whose stdout is
//! the answer.
//!
//! # Example
//!
//! ```rust,ignore
//! use wlan_ctrl::executor::run_tool;
//!
//! let out = run_tool("wlantest_cli", &["flush"], Duration::from_secs(5)).await?;
//! ```

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::ctrl::redact;
use crate::error::{CtrlError, CtrlResult};

/// Default time limit for a helper tool invocation
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `program` with `args` and return its stdout
///
/// # Errors
///
/// Returns an error if:
/// - The binary cannot be found or spawned
/// - The process does not finish within `limit`
/// - The process exits with a non-zero status
#[instrument(skip(args), fields(cmd = %redact(&args.join(" "))))]
pub async fn run_tool(program: &str, args: &[&str], limit: Duration) -> CtrlResult<String> {
    let cmdline = redact(&args.join(" "));
    debug!("executing: {} {}", program, cmdline);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CtrlError::ToolNotFound {
                    tool: program.to_string(),
                }
            } else {
                CtrlError::Io(e)
            }
        })?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            error!(program, "tool timed out");
            return Err(CtrlError::Timeout {
                target: program.to_string(),
                command: cmdline,
                timeout: limit,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);

        error!(code, stderr = %stderr, "{} failed", program);
        return Err(CtrlError::ToolFailed {
            tool: program.to_string(),
            code,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
