//! Collaborator seams the scenarios run against
//!
//! A scenario only ever sees these traits. [`live`] binds them to hostapd,
//! wpa_supplicant, wlantest and hwsim_test; tests use a simulated medium.

pub mod live;
#[cfg(test)]
pub(crate) mod sim;

use async_trait::async_trait;
use std::time::Duration;
use wlan_ctrl::{
    ApParams, ConnectParams, CtrlError, CtrlResult, KeyMgmt, MacAddr, PmfMode, RsnCapab,
    StaCounter,
};

use crate::error::ScenarioError;

/// Access point lifecycle and ad-hoc control commands
#[async_trait]
pub trait AccessPoint: Send + Sync {
    /// Bring up a fresh AP on `ifname`
    async fn start(&self, ifname: &str, params: &ApParams) -> CtrlResult<()>;

    /// Send a raw control command to the AP on `ifname`
    async fn request(&self, ifname: &str, cmd: &str) -> CtrlResult<String>;

    /// Remove the AP on `ifname`
    async fn stop(&self, ifname: &str) -> CtrlResult<()>;

    /// Ask the AP to run an SA Query with an associated station
    async fn sa_query(&self, ifname: &str, addr: MacAddr) -> CtrlResult<()>;
}

/// A station that can join networks
#[async_trait]
pub trait Station: Send + Sync {
    fn ifname(&self) -> &str;

    fn address(&self) -> MacAddr;

    /// Join a network, returning once associated
    async fn connect(&self, params: &ConnectParams) -> CtrlResult<()>;

    /// Forget all networks
    async fn reset(&self) -> CtrlResult<()>;
}

/// Data-plane reachability between two interfaces
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn check(&self, src_ifname: &str, dst_ifname: &str) -> CtrlResult<()>;
}

/// Passive frame observer with assertion helpers
#[async_trait]
pub trait Observer: Send + Sync {
    /// Drop all recorded state
    async fn flush(&self) -> CtrlResult<()>;

    /// Passphrase used to derive keys for decrypting protected frames
    async fn add_passphrase(&self, passphrase: &str) -> CtrlResult<()>;

    async fn info_bss(&self, field: &str, bssid: MacAddr) -> CtrlResult<String>;

    async fn info_sta(&self, field: &str, bssid: MacAddr, addr: MacAddr) -> CtrlResult<String>;

    async fn sta_counter(&self, counter: StaCounter, bssid: MacAddr, addr: MacAddr)
        -> CtrlResult<u64>;

    async fn require_ap_pmf_mandatory(&self, bssid: MacAddr) -> CtrlResult<()> {
        let capab = RsnCapab::parse(&self.info_bss("rsn_capab", bssid).await?);
        if !capab.mfpr {
            return Err(CtrlError::Expectation("AP did not require PMF".to_string()));
        }
        if !capab.mfpc {
            return Err(CtrlError::Expectation("AP did not enable PMF".to_string()));
        }
        Ok(())
    }

    async fn require_ap_pmf_optional(&self, bssid: MacAddr) -> CtrlResult<()> {
        let capab = RsnCapab::parse(&self.info_bss("rsn_capab", bssid).await?);
        if capab.mfpr {
            return Err(CtrlError::Expectation("AP required PMF".to_string()));
        }
        if !capab.mfpc {
            return Err(CtrlError::Expectation("AP did not enable PMF".to_string()));
        }
        Ok(())
    }

    async fn require_ap_no_pmf(&self, bssid: MacAddr) -> CtrlResult<()> {
        let capab = RsnCapab::parse(&self.info_bss("rsn_capab", bssid).await?);
        if capab.mfpr {
            return Err(CtrlError::Expectation("AP required PMF".to_string()));
        }
        if capab.mfpc {
            return Err(CtrlError::Expectation("AP enabled PMF".to_string()));
        }
        Ok(())
    }

    async fn require_ap_pmf_mode(&self, bssid: MacAddr, mode: PmfMode) -> CtrlResult<()> {
        match mode {
            PmfMode::Required => self.require_ap_pmf_mandatory(bssid).await,
            PmfMode::Optional => self.require_ap_pmf_optional(bssid).await,
            PmfMode::Disabled => self.require_ap_no_pmf(bssid).await,
        }
    }

    async fn require_sta_pmf(&self, bssid: MacAddr, addr: MacAddr) -> CtrlResult<()> {
        let capab = RsnCapab::parse(&self.info_sta("rsn_capab", bssid, addr).await?);
        if !capab.mfpc {
            return Err(CtrlError::Expectation("STA did not enable PMF".to_string()));
        }
        Ok(())
    }

    async fn require_sta_pmf_mandatory(&self, bssid: MacAddr, addr: MacAddr) -> CtrlResult<()> {
        let capab = RsnCapab::parse(&self.info_sta("rsn_capab", bssid, addr).await?);
        if !capab.mfpr {
            return Err(CtrlError::Expectation("STA did not require PMF".to_string()));
        }
        if !capab.mfpc {
            return Err(CtrlError::Expectation("STA did not enable PMF".to_string()));
        }
        Ok(())
    }

    async fn require_sta_key_mgmt(
        &self,
        bssid: MacAddr,
        addr: MacAddr,
        key_mgmt: KeyMgmt,
    ) -> CtrlResult<()> {
        let info = self.info_sta("key_mgmt", bssid, addr).await?;
        if !info.split_whitespace().any(|k| k == key_mgmt.observed_name()) {
            return Err(CtrlError::Expectation(format!(
                "Unexpected STA key_mgmt: {} (expected {})",
                info.trim(),
                key_mgmt.observed_name()
            )));
        }
        Ok(())
    }
}

/// Fixed identity of the network under test
#[derive(Debug, Clone)]
pub struct TestbedSettings {
    pub ap_ifname: String,
    pub bssid: MacAddr,
    pub passphrase: String,
    /// Pause between SA Query and reading the counters
    pub sa_query_settle: Duration,
}

impl Default for TestbedSettings {
    fn default() -> Self {
        Self {
            ap_ifname: "wlan2".to_string(),
            bssid: MacAddr::new([0x02, 0, 0, 0, 0x02, 0]),
            passphrase: "12345678".to_string(),
            sa_query_settle: Duration::from_millis(100),
        }
    }
}

/// Everything a scenario needs, behind trait objects
pub struct Testbed {
    pub ap: Box<dyn AccessPoint>,
    pub stations: Vec<Box<dyn Station>>,
    pub connectivity: Box<dyn Connectivity>,
    pub observer: Box<dyn Observer>,
    pub settings: TestbedSettings,
}

impl Testbed {
    pub fn station(&self, index: usize) -> Result<&dyn Station, ScenarioError> {
        self.stations
            .get(index)
            .map(|s| s.as_ref())
            .ok_or(ScenarioError::MissingStation {
                index,
                available: self.stations.len(),
            })
    }
}
