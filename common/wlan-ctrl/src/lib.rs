//! Control clients for the hwsim wireless test environment
//!
//! This crate talks to the external collaborators of a mac80211_hwsim test
//! setup:
//!
//! - **hostapd**: global and per-interface control sockets
//! - **wpa_supplicant**: station control and event monitor sockets
//! - **wlantest**: frame observer, queried through `wlantest_cli`
//! - **hwsim_test**: data-plane connectivity check
//!
//! # Usage
//!
//! ```rust,ignore
//! use wlan_ctrl::{hostapd, ApParams, PmfMode};
//!
//! let global = hostapd::HostapdGlobal::open(hostapd::DEFAULT_GLOBAL_CTRL, hostapd::DEFAULT_CTRL_DIR, timeout)?;
//! let params = ApParams::wpa2("test-pmf-required", "12345678").pmf(PmfMode::Required);
//! let hapd = hostapd::add_ap(&global, "wlan2", &params, timeout).await?;
//! ```

pub mod ctrl;
pub mod error;
pub mod executor;
pub mod hostapd;
pub mod hwsim;
pub mod init;
pub mod types;
pub mod wlantest;
pub mod wpas;

pub use ctrl::{CtrlSocket, DEFAULT_REQUEST_TIMEOUT};
pub use error::{CtrlError, CtrlResult};
pub use hostapd::{ApParams, Hostapd, HostapdGlobal};
pub use hwsim::HwsimTest;
pub use init::init_tracing;
pub use types::{KeyMgmt, KeyMgmtSet, MacAddr, PmfMode, Proto, StaCounter};
pub use wlantest::{RsnCapab, Wlantest};
pub use wpas::{ConnectParams, WpaSupplicant};
