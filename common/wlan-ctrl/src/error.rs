//! Error types for control interface operations
//!
//! One error type covers the daemons' control sockets and the helper tools
//! (wlantest_cli, hwsim_test) so callers can match on the failure kind.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to hostapd, wpa_supplicant or the hwsim tools
#[derive(Error, Debug)]
pub enum CtrlError {
    /// Socket or process level I/O failure
    #[error("control I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply arrived within the request timeout
    #[error("no reply to '{command}' from {target} within {timeout:?}")]
    Timeout {
        target: String,
        command: String,
        timeout: Duration,
    },

    /// The daemon or tool answered with FAIL
    #[error("'{command}' failed on {target}: {reply}")]
    CommandFailed {
        target: String,
        command: String,
        reply: String,
    },

    /// The reply did not have the expected shape
    #[error("unexpected reply to '{command}': {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// The station never reported CTRL-EVENT-CONNECTED
    #[error("association of {ifname} with the AP timed out after {timeout:?}")]
    AssociationTimeout { ifname: String, timeout: Duration },

    /// The AP rejected the association request
    #[error("association of {ifname} rejected: {event}")]
    AssociationRejected { ifname: String, event: String },

    /// hwsim_test could not pass frames between the two interfaces
    #[error("no connectivity between {src} and {dst}: {detail}")]
    Connectivity {
        src: String,
        dst: String,
        detail: String,
    },

    /// Helper tool binary not found
    #[error("{tool} not found - ensure it is installed and in PATH")]
    ToolNotFound { tool: String },

    /// Helper tool exited with a non-zero status
    #[error("{tool} failed (exit code {code}): {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// Counter output was not an integer
    #[error("invalid counter value for {counter}: '{raw}'")]
    InvalidCounter { counter: String, raw: String },

    /// Malformed hardware address
    #[error("invalid MAC address: '{0}'")]
    InvalidMac(String),

    /// An observed protocol state did not match the expectation
    #[error("{0}")]
    Expectation(String),
}

impl CtrlError {
    /// True for failures that mean "the station did not get onto the network"
    pub fn is_join_failure(&self) -> bool {
        matches!(
            self,
            CtrlError::AssociationTimeout { .. }
                | CtrlError::AssociationRejected { .. }
                | CtrlError::Connectivity { .. }
        )
    }
}

/// Result type alias for control operations
pub type CtrlResult<T> = Result<T, CtrlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_failures() {
        let timeout = CtrlError::AssociationTimeout {
            ifname: "wlan1".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(timeout.is_join_failure());

        let conn = CtrlError::Connectivity {
            src: "wlan1".to_string(),
            dst: "wlan2".to_string(),
            detail: "exit code 1".to_string(),
        };
        assert!(conn.is_join_failure());

        let io = CtrlError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!io.is_join_failure());
        assert!(!CtrlError::Expectation("AP enabled PMF".to_string()).is_join_failure());
    }

    #[test]
    fn test_expectation_display_is_bare_message() {
        let err = CtrlError::Expectation("STA did not enable PMF".to_string());
        assert_eq!(err.to_string(), "STA did not enable PMF");
    }
}
