//! hostapd control interface
//!
//! The AP is brought up dynamically: the global control socket adds a BSS
//! for an interface, then the per-interface socket configures it field by
//! field and enables it.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::ctrl::{redact, CtrlSocket};
use crate::error::{CtrlError, CtrlResult};
use crate::types::{KeyMgmtSet, MacAddr, PmfMode};

/// Default per-interface control directory
pub const DEFAULT_CTRL_DIR: &str = "/var/run/hostapd";

/// Default global control socket
pub const DEFAULT_GLOBAL_CTRL: &str = "/var/run/hostapd-global";

/// Ordered hostapd configuration fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApParams {
    fields: Vec<(String, String)>,
}

impl ApParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// WPA2-Personal with CCMP
    pub fn wpa2(ssid: &str, passphrase: &str) -> Self {
        Self::new()
            .with("ssid", ssid)
            .with("wpa_passphrase", passphrase)
            .with("wpa", "2")
            .with("wpa_key_mgmt", "WPA-PSK")
            .with("rsn_pairwise", "CCMP")
    }

    /// Set a field, replacing any earlier value but keeping its position
    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| k == field) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((field.to_string(), value)),
        }
        self
    }

    pub fn key_mgmt(self, suites: &KeyMgmtSet) -> Self {
        self.with("wpa_key_mgmt", suites.to_string())
    }

    pub fn pmf(self, mode: PmfMode) -> Self {
        self.with("ieee80211w", mode.ieee80211w())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// PMF mode this configuration asks for; an absent field means disabled
    pub fn pmf_mode(&self) -> PmfMode {
        match self.get("ieee80211w") {
            Some("1") => PmfMode::Optional,
            Some("2") => PmfMode::Required,
            _ => PmfMode::Disabled,
        }
    }
}

/// Client for the hostapd global control socket
pub struct HostapdGlobal {
    ctrl: CtrlSocket,
    ctrl_dir: PathBuf,
}

impl HostapdGlobal {
    pub fn open(
        global_ctrl: impl AsRef<Path>,
        ctrl_dir: impl Into<PathBuf>,
        request_timeout: Duration,
    ) -> CtrlResult<Self> {
        Ok(Self {
            ctrl: CtrlSocket::open(global_ctrl, request_timeout)?,
            ctrl_dir: ctrl_dir.into(),
        })
    }

    /// Create a BSS on `ifname` whose control socket lives in the control directory
    pub async fn add(&self, ifname: &str) -> CtrlResult<()> {
        let cmd = format!("ADD {} {}", ifname, self.ctrl_dir.display());
        let reply = self.ctrl.request(&cmd).await?;
        if !reply.contains("OK") {
            return Err(CtrlError::CommandFailed {
                target: "hostapd-global".to_string(),
                command: cmd,
                reply: reply.trim_end().to_string(),
            });
        }
        Ok(())
    }

    /// Remove the BSS on `ifname`; the reply is not checked
    pub async fn remove(&self, ifname: &str) -> CtrlResult<()> {
        let reply = self.ctrl.request(&format!("REMOVE {ifname}")).await?;
        debug!(ifname, reply = %reply.trim_end(), "removed interface");
        Ok(())
    }
}

/// Client for a single hostapd interface
pub struct Hostapd {
    ifname: String,
    ctrl: CtrlSocket,
}

impl Hostapd {
    pub fn open(
        ctrl_dir: impl AsRef<Path>,
        ifname: &str,
        request_timeout: Duration,
    ) -> CtrlResult<Self> {
        Ok(Self {
            ifname: ifname.to_string(),
            ctrl: CtrlSocket::open(ctrl_dir.as_ref().join(ifname), request_timeout)?,
        })
    }

    pub fn ifname(&self) -> &str {
        &self.ifname
    }

    pub async fn request(&self, cmd: &str) -> CtrlResult<String> {
        self.ctrl.request(cmd).await
    }

    pub async fn ping(&self) -> CtrlResult<bool> {
        Ok(self.request("PING").await?.contains("PONG"))
    }

    pub async fn set(&self, field: &str, value: &str) -> CtrlResult<()> {
        let cmd = format!("SET {field} {value}");
        let reply = self.request(&cmd).await?;
        if !reply.contains("OK") {
            return Err(CtrlError::CommandFailed {
                target: self.ifname.clone(),
                command: redact(&cmd),
                reply: reply.trim_end().to_string(),
            });
        }
        Ok(())
    }

    /// Radio settings shared by every hwsim AP
    pub async fn set_defaults(&self) -> CtrlResult<()> {
        self.set("driver", "nl80211").await?;
        self.set("hw_mode", "g").await?;
        self.set("channel", "1").await?;
        self.set("ieee80211n", "1").await
    }

    pub async fn enable(&self) -> CtrlResult<()> {
        self.ctrl.request_ok("ENABLE").await
    }

    pub async fn disable(&self) -> CtrlResult<()> {
        self.ctrl.request_ok("DISABLE").await
    }

    /// Start an SA Query procedure towards an associated station
    #[instrument(skip(self), fields(ifname = %self.ifname))]
    pub async fn sa_query(&self, addr: MacAddr) -> CtrlResult<()> {
        let cmd = format!("SA_QUERY {addr}");
        let reply = self.request(&cmd).await?;
        if reply.contains("FAIL") {
            return Err(CtrlError::CommandFailed {
                target: self.ifname.clone(),
                command: cmd,
                reply: reply.trim_end().to_string(),
            });
        }
        Ok(())
    }
}

/// Bring up an AP on `ifname` with `params`
///
/// A leftover BSS from an earlier run is removed first so each call starts
/// from a fresh configuration.
#[instrument(skip(global, params, request_timeout), fields(ssid = params.get("ssid").unwrap_or("")))]
pub async fn add_ap(
    global: &HostapdGlobal,
    ifname: &str,
    params: &ApParams,
    request_timeout: Duration,
) -> CtrlResult<Hostapd> {
    info!("Starting AP {}", ifname);

    global.remove(ifname).await?;
    global.add(ifname).await?;

    let hapd = Hostapd::open(&global.ctrl_dir, ifname, request_timeout)?;
    if !hapd.ping().await? {
        warn!(ifname, "hostapd did not answer PING");
        return Err(CtrlError::UnexpectedReply {
            command: "PING".to_string(),
            reply: "no PONG".to_string(),
        });
    }

    hapd.set_defaults().await?;
    for (field, value) in params.fields() {
        hapd.set(field, value).await?;
    }
    hapd.enable().await?;

    Ok(hapd)
}
