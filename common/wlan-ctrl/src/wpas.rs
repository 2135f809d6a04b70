//! wpa_supplicant control interface
//!
//! Each station uses two sockets to the same interface: one for commands and
//! one attached as an event monitor, so waiting for connection events never
//! races with command replies.

use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::ctrl::{redact, reply_field, CtrlSocket};
use crate::error::{CtrlError, CtrlResult};
use crate::types::{KeyMgmtSet, MacAddr, PmfMode, Proto};

/// Default per-interface control directory
pub const DEFAULT_CTRL_DIR: &str = "/var/run/wpa_supplicant";

/// Default time to wait for CTRL-EVENT-CONNECTED
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const EVENT_CONNECTED: &str = "CTRL-EVENT-CONNECTED";
const EVENT_ASSOC_REJECT: &str = "CTRL-EVENT-ASSOC-REJECT";

/// Network block for a WPA2-Personal connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub ssid: String,
    pub psk: String,
    pub proto: Proto,
    pub key_mgmt: KeyMgmtSet,
    pub ieee80211w: PmfMode,
}

impl ConnectParams {
    /// WPA2 PSK network offering both PSK AKMs
    pub fn wpa2_psk(ssid: &str, psk: &str, ieee80211w: PmfMode) -> Self {
        Self {
            ssid: ssid.to_string(),
            psk: psk.to_string(),
            proto: Proto::Wpa2,
            key_mgmt: KeyMgmtSet::psk_both(),
            ieee80211w,
        }
    }
}

/// Client for one wpa_supplicant interface
pub struct WpaSupplicant {
    ifname: String,
    ctrl: CtrlSocket,
    monitor: CtrlSocket,
    connect_timeout: Duration,
}

impl WpaSupplicant {
    /// Open command and monitor sockets for `ifname` and attach the monitor
    pub async fn open(
        ctrl_dir: impl AsRef<Path>,
        ifname: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> CtrlResult<Self> {
        let path = ctrl_dir.as_ref().join(ifname);
        let ctrl = CtrlSocket::open(&path, request_timeout)?;
        let monitor = CtrlSocket::open(&path, request_timeout)?;
        monitor.attach().await?;

        Ok(Self {
            ifname: ifname.to_string(),
            ctrl,
            monitor,
            connect_timeout,
        })
    }

    pub fn ifname(&self) -> &str {
        &self.ifname
    }

    pub async fn request(&self, cmd: &str) -> CtrlResult<String> {
        self.ctrl.request(cmd).await
    }

    fn check_reply(&self, command: &str, reply: &str) -> CtrlResult<()> {
        if reply.starts_with("FAIL") {
            return Err(CtrlError::CommandFailed {
                target: self.ifname.clone(),
                command: command.to_string(),
                reply: reply.trim_end().to_string(),
            });
        }
        Ok(())
    }

    pub async fn add_network(&self) -> CtrlResult<u32> {
        let reply = self.request("ADD_NETWORK").await?;
        self.check_reply("ADD_NETWORK", &reply)?;
        reply
            .trim()
            .parse()
            .map_err(|_| CtrlError::UnexpectedReply {
                command: "ADD_NETWORK".to_string(),
                reply: reply.trim_end().to_string(),
            })
    }

    pub async fn set_network(&self, id: u32, field: &str, value: &str) -> CtrlResult<()> {
        let cmd = format!("SET_NETWORK {id} {field} {value}");
        let reply = self.request(&cmd).await?;
        self.check_reply(&redact(&cmd), &reply)
    }

    pub async fn set_network_quoted(&self, id: u32, field: &str, value: &str) -> CtrlResult<()> {
        self.set_network(id, field, &format!("\"{value}\"")).await
    }

    pub async fn select_network(&self, id: u32) -> CtrlResult<()> {
        let cmd = format!("SELECT_NETWORK {id}");
        let reply = self.request(&cmd).await?;
        self.check_reply(&cmd, &reply)
    }

    /// Configure a network and wait for the association to complete
    ///
    /// # Errors
    ///
    /// `AssociationRejected` when the AP refuses the association,
    /// `AssociationTimeout` when no connection event arrives in time.
    #[instrument(skip(self, params), fields(ifname = %self.ifname, ssid = %params.ssid))]
    pub async fn connect(&self, params: &ConnectParams) -> CtrlResult<u32> {
        info!(
            "Connect STA {} to AP (ieee80211w={}, key_mgmt={})",
            self.ifname,
            params.ieee80211w.ieee80211w(),
            params.key_mgmt
        );

        let id = self.add_network().await?;
        self.set_network_quoted(id, "ssid", &params.ssid).await?;
        self.set_network_quoted(id, "psk", &params.psk).await?;
        self.set_network(id, "proto", params.proto.config_name())
            .await?;
        self.set_network(id, "key_mgmt", &params.key_mgmt.to_string())
            .await?;
        self.set_network(id, "ieee80211w", params.ieee80211w.ieee80211w())
            .await?;

        self.monitor.drain();
        self.select_network(id).await?;
        self.wait_connected().await?;
        self.monitor.drain();

        Ok(id)
    }

    async fn wait_connected(&self) -> CtrlResult<()> {
        let deadline = Instant::now() + self.connect_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self.monitor.recv_event(remaining).await? {
                Some(ev) if ev.starts_with(EVENT_CONNECTED) => {
                    debug!(event = %ev, "connected");
                    return Ok(());
                }
                Some(ev) if ev.starts_with(EVENT_ASSOC_REJECT) => {
                    warn!(event = %ev, "association rejected");
                    return Err(CtrlError::AssociationRejected {
                        ifname: self.ifname.clone(),
                        event: ev,
                    });
                }
                Some(_) => continue,
                None => break,
            }
        }

        Err(CtrlError::AssociationTimeout {
            ifname: self.ifname.clone(),
            timeout: self.connect_timeout,
        })
    }

    /// Own hardware address from STATUS
    pub async fn own_addr(&self) -> CtrlResult<MacAddr> {
        let status = self.request("STATUS").await?;
        reply_field(&status, "address")
            .ok_or_else(|| CtrlError::UnexpectedReply {
                command: "STATUS".to_string(),
                reply: "missing address field".to_string(),
            })?
            .parse()
    }

    /// Drop every configured network so the next scenario starts clean
    pub async fn reset(&self) -> CtrlResult<()> {
        let reply = self.request("REMOVE_NETWORK all").await?;
        self.check_reply("REMOVE_NETWORK all", &reply)?;
        self.monitor.drain();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctrl::testing::FakeDaemon;

    fn supplicant_replies(
        select_event: &'static str,
    ) -> impl Fn(&str) -> Vec<String> + Send + 'static {
        move |cmd| match cmd {
            "ADD_NETWORK" => vec!["0\n".to_string()],
            "STATUS" => vec!["wpa_state=COMPLETED\naddress=02:00:00:00:01:00\n".to_string()],
            c if c.starts_with("SELECT_NETWORK") => {
                vec!["OK\n".to_string(), select_event.to_string()]
            }
            _ => vec!["OK\n".to_string()],
        }
    }

    #[tokio::test]
    async fn test_own_addr() {
        let dir = tempfile::tempdir().unwrap();
        let _daemon = FakeDaemon::spawn(dir.path(), "wlan1", supplicant_replies("<3>CTRL-EVENT-SCAN-STARTED "));

        let wpas = WpaSupplicant::open(dir.path(), "wlan1", Duration::from_secs(2), DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(
            wpas.own_addr().await.unwrap().to_string(),
            "02:00:00:00:01:00"
        );
    }

    #[tokio::test]
    async fn test_connect_times_out_without_event() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = FakeDaemon::spawn(dir.path(), "wlan1", supplicant_replies("<3>CTRL-EVENT-SCAN-STARTED "));

        let wpas = WpaSupplicant::open(dir.path(), "wlan1", Duration::from_secs(2), Duration::from_millis(100))
            .await
            .unwrap();
        let params = ConnectParams::wpa2_psk("test-pmf-negative", "12345678", PmfMode::Required);
        let err = wpas.connect(&params).await.unwrap_err();
        assert!(matches!(err, CtrlError::AssociationTimeout { .. }));

        let cmds = daemon.commands();
        assert!(cmds.contains(&"SET_NETWORK 0 ssid \"test-pmf-negative\"".to_string()));
        assert!(cmds.contains(&"SET_NETWORK 0 key_mgmt WPA-PSK WPA-PSK-SHA256".to_string()));
        assert!(cmds.contains(&"SET_NETWORK 0 ieee80211w 2".to_string()));
        assert!(cmds.contains(&"SET_NETWORK 0 proto WPA2".to_string()));
    }

    #[tokio::test]
    async fn test_connect_completes_on_event() {
        let dir = tempfile::tempdir().unwrap();
        let _daemon = FakeDaemon::spawn(
            dir.path(),
            "wlan0",
            supplicant_replies("<3>CTRL-EVENT-CONNECTED - Connection to 02:00:00:00:02:00 completed [id=0 id_str=]"),
        );

        let wpas = WpaSupplicant::open(dir.path(), "wlan0", Duration::from_secs(2), Duration::from_secs(2))
            .await
            .unwrap();
        let params = ConnectParams::wpa2_psk("test-pmf-optional", "12345678", PmfMode::Optional);
        assert_eq!(wpas.connect(&params).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let _daemon = FakeDaemon::spawn(
            dir.path(),
            "wlan1",
            supplicant_replies("<3>CTRL-EVENT-ASSOC-REJECT bssid=02:00:00:00:02:00 status_code=31"),
        );

        let wpas = WpaSupplicant::open(dir.path(), "wlan1", Duration::from_secs(2), Duration::from_secs(2))
            .await
            .unwrap();
        let params = ConnectParams::wpa2_psk("test-pmf-negative", "12345678", PmfMode::Required);
        let err = wpas.connect(&params).await.unwrap_err();
        assert!(matches!(err, CtrlError::AssociationRejected { .. }));
        assert!(err.is_join_failure());
    }

    #[tokio::test]
    async fn test_reset_removes_networks() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = FakeDaemon::spawn(dir.path(), "wlan0", supplicant_replies("<3>CTRL-EVENT-SCAN-STARTED "));

        let wpas = WpaSupplicant::open(dir.path(), "wlan0", Duration::from_secs(2), DEFAULT_CONNECT_TIMEOUT)
            .await
            .unwrap();
        wpas.reset().await.unwrap();
        assert_eq!(daemon.commands().last().map(String::as_str), Some("REMOVE_NETWORK all"));
    }
}
