//! Testbed backed by the real hwsim daemons and tools

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use wlan_ctrl::{
    hostapd, ApParams, ConnectParams, CtrlResult, Hostapd, HostapdGlobal, HwsimTest,
    MacAddr, StaCounter, Wlantest, WpaSupplicant,
};

use super::{AccessPoint, Connectivity, Observer, Station, Testbed};
use crate::config::HarnessConfig;

/// hostapd driven through its global control socket
pub struct HostapdController {
    global: HostapdGlobal,
    ctrl_dir: PathBuf,
    request_timeout: Duration,
    running: Mutex<HashMap<String, Hostapd>>,
}

impl HostapdController {
    pub fn open(config: &HarnessConfig) -> CtrlResult<Self> {
        let request_timeout = config.timing.request_timeout();
        Ok(Self {
            global: HostapdGlobal::open(
                &config.ap.global_ctrl,
                config.ap.ctrl_dir.clone(),
                request_timeout,
            )?,
            ctrl_dir: config.ap.ctrl_dir.clone(),
            request_timeout,
            running: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl AccessPoint for HostapdController {
    async fn start(&self, ifname: &str, params: &ApParams) -> CtrlResult<()> {
        let mut running = self.running.lock().await;
        running.remove(ifname);
        let hapd = hostapd::add_ap(&self.global, ifname, params, self.request_timeout).await?;
        running.insert(ifname.to_string(), hapd);
        Ok(())
    }

    async fn request(&self, ifname: &str, cmd: &str) -> CtrlResult<String> {
        let running = self.running.lock().await;
        match running.get(ifname) {
            Some(hapd) => hapd.request(cmd).await,
            None => {
                // AP started outside this controller
                Hostapd::open(&self.ctrl_dir, ifname, self.request_timeout)?
                    .request(cmd)
                    .await
            }
        }
    }

    async fn sa_query(&self, ifname: &str, addr: MacAddr) -> CtrlResult<()> {
        let running = self.running.lock().await;
        match running.get(ifname) {
            Some(hapd) => hapd.sa_query(addr).await,
            None => {
                Hostapd::open(&self.ctrl_dir, ifname, self.request_timeout)?
                    .sa_query(addr)
                    .await
            }
        }
    }

    async fn stop(&self, ifname: &str) -> CtrlResult<()> {
        if let Some(hapd) = self.running.lock().await.remove(ifname) {
            if let Err(e) = hapd.disable().await {
                warn!(ifname, error = %e, "failed to disable AP");
            }
        }
        self.global.remove(ifname).await
    }
}

/// wpa_supplicant station with its address read once at open
pub struct SupplicantStation {
    wpas: WpaSupplicant,
    address: MacAddr,
}

impl SupplicantStation {
    pub async fn open(config: &HarnessConfig, ifname: &str) -> CtrlResult<Self> {
        let wpas = WpaSupplicant::open(
            &config.stations.ctrl_dir,
            ifname,
            config.timing.request_timeout(),
            config.timing.connect_timeout(),
        )
        .await?;
        let address = wpas.own_addr().await?;
        Ok(Self { wpas, address })
    }
}

#[async_trait]
impl Station for SupplicantStation {
    fn ifname(&self) -> &str {
        self.wpas.ifname()
    }

    fn address(&self) -> MacAddr {
        self.address
    }

    async fn connect(&self, params: &ConnectParams) -> CtrlResult<()> {
        self.wpas.connect(params).await.map(|_| ())
    }

    async fn reset(&self) -> CtrlResult<()> {
        self.wpas.reset().await
    }
}

#[async_trait]
impl Connectivity for HwsimTest {
    async fn check(&self, src_ifname: &str, dst_ifname: &str) -> CtrlResult<()> {
        self.test_connectivity(src_ifname, dst_ifname).await
    }
}

#[async_trait]
impl Observer for Wlantest {
    async fn flush(&self) -> CtrlResult<()> {
        Wlantest::flush(self).await
    }

    async fn add_passphrase(&self, passphrase: &str) -> CtrlResult<()> {
        Wlantest::add_passphrase(self, passphrase).await
    }

    async fn info_bss(&self, field: &str, bssid: MacAddr) -> CtrlResult<String> {
        Wlantest::info_bss(self, field, bssid).await
    }

    async fn info_sta(&self, field: &str, bssid: MacAddr, addr: MacAddr) -> CtrlResult<String> {
        Wlantest::info_sta(self, field, bssid, addr).await
    }

    async fn sta_counter(
        &self,
        counter: StaCounter,
        bssid: MacAddr,
        addr: MacAddr,
    ) -> CtrlResult<u64> {
        self.get_sta_counter(counter, bssid, addr).await
    }
}

/// Connect to every collaborator named in `config`
pub async fn connect(config: &HarnessConfig) -> Result<Testbed> {
    config.validate()?;

    let ap = HostapdController::open(config).with_context(|| {
        format!(
            "opening hostapd global control socket {}",
            config.ap.global_ctrl.display()
        )
    })?;

    let mut stations: Vec<Box<dyn Station>> = Vec::with_capacity(config.stations.ifnames.len());
    for ifname in &config.stations.ifnames {
        let station = SupplicantStation::open(config, ifname)
            .await
            .with_context(|| format!("opening wpa_supplicant control socket for {ifname}"))?;
        info!(ifname, address = %station.address(), "station ready");
        stations.push(Box::new(station));
    }

    let connectivity = HwsimTest::new(config.tools.hwsim_test.clone())
        .with_timeout(config.timing.tool_timeout());
    let observer = Wlantest::new(config.tools.wlantest_cli.clone())
        .with_timeout(config.timing.tool_timeout());

    Ok(Testbed {
        ap: Box::new(ap),
        stations,
        connectivity: Box::new(connectivity),
        observer: Box::new(observer),
        settings: config.testbed_settings(),
    })
}

