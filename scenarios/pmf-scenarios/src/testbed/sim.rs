//! Simulated medium for exercising scenarios without hwsim
//!
//! Models just enough of hostapd, wpa_supplicant and wlantest to make PMF
//! negotiation observable: RSN capabilities per BSS and per STA, AKM
//! selection, SA Query counters, and the passphrase wlantest needs before it
//! can see protected frames. Faults can be injected to check that scenarios
//! notice misbehaving daemons.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wlan_ctrl::{
    ApParams, ConnectParams, CtrlError, CtrlResult, KeyMgmt, KeyMgmtSet, MacAddr, PmfMode,
    StaCounter,
};

use super::{AccessPoint, Connectivity, Observer, Station, Testbed, TestbedSettings};

#[derive(Debug, Clone)]
struct SimAp {
    ifname: String,
    bssid: MacAddr,
    ssid: String,
    passphrase: String,
    key_mgmt: KeyMgmtSet,
    pmf: PmfMode,
}

#[derive(Debug, Clone)]
struct SimAssoc {
    mfpc: bool,
    mfpr: bool,
    akm: KeyMgmt,
}

/// Misbehaviour to inject
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Stations that never answer an SA Query
    pub silent_stations: HashSet<String>,
    /// AP advertises no PMF whatever it was configured with
    pub ap_ignores_pmf: bool,
    /// Stations join even when their PMF policy cannot be met
    pub stations_ignore_pmf: bool,
    /// AP advertises MFPC even with PMF disabled
    pub ap_advertises_pmf: bool,
    /// AP advertises MFPR even with PMF optional
    pub ap_forces_mfpr: bool,
    /// Stations that behave as if ieee80211w=0 whatever they are given
    pub pmf_unaware_stations: HashSet<String>,
    /// Stations that negotiate PMF but never set MFPR
    pub no_mfpr_stations: HashSet<String>,
    /// hwsim_test fails for every pair
    pub no_data_plane: bool,
}

/// Shared state behind every simulated collaborator
#[derive(Debug, Default)]
pub struct SimState {
    ap: Option<SimAp>,
    /// station ifname -> (address, association)
    assoc: HashMap<String, (MacAddr, SimAssoc)>,
    observed_bss: HashMap<MacAddr, String>,
    observed_sta: HashMap<(MacAddr, MacAddr), SimAssoc>,
    counters: HashMap<(MacAddr, MacAddr, StaCounter), u64>,
    passphrases: Vec<String>,
    faults: Faults,
    /// Every collaborator call, in order
    pub log: Vec<String>,
}

impl SimState {
    fn record(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    fn bss_capab(ap: &SimAp, faults: &Faults) -> String {
        if faults.ap_ignores_pmf {
            return String::new();
        }
        match ap.pmf {
            PmfMode::Disabled if faults.ap_advertises_pmf => "MFPC".to_string(),
            PmfMode::Disabled => String::new(),
            PmfMode::Optional if faults.ap_forces_mfpr => "MFPC MFPR".to_string(),
            PmfMode::Optional => "MFPC".to_string(),
            PmfMode::Required => "MFPC MFPR".to_string(),
        }
    }

    fn effective_ap_pmf(&self, ap: &SimAp) -> PmfMode {
        if self.faults.ap_ignores_pmf {
            PmfMode::Disabled
        } else {
            ap.pmf
        }
    }

    /// What wpa_supplicant and hostapd would agree on, if anything
    fn negotiate(
        &self,
        ap: &SimAp,
        sta_ifname: &str,
        params: &ConnectParams,
    ) -> Option<SimAssoc> {
        if ap.ssid != params.ssid || ap.passphrase != params.psk {
            return None;
        }

        let akm = [KeyMgmt::WpaPskSha256, KeyMgmt::WpaPsk]
            .into_iter()
            .find(|k| ap.key_mgmt.contains(*k) && params.key_mgmt.contains(*k))?;

        let ap_pmf = self.effective_ap_pmf(ap);
        let sta_pmf = if self.faults.pmf_unaware_stations.contains(sta_ifname) {
            PmfMode::Disabled
        } else {
            params.ieee80211w
        };
        let incompatible = matches!(
            (ap_pmf, sta_pmf),
            (PmfMode::Required, PmfMode::Disabled) | (PmfMode::Disabled, PmfMode::Required)
        );
        if incompatible && !self.faults.stations_ignore_pmf {
            return None;
        }

        let negotiated = ap_pmf != PmfMode::Disabled && sta_pmf != PmfMode::Disabled;
        Some(SimAssoc {
            mfpc: negotiated,
            mfpr: negotiated
                && sta_pmf == PmfMode::Required
                && !self.faults.no_mfpr_stations.contains(sta_ifname),
            akm,
        })
    }

    fn running_ap(&self, ifname: &str) -> CtrlResult<SimAp> {
        self.ap.clone().filter(|ap| ap.ifname == ifname).ok_or_else(|| {
            CtrlError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no hostapd control socket for {ifname}"),
            ))
        })
    }

    fn bump(&mut self, bssid: MacAddr, addr: MacAddr, counter: StaCounter) {
        *self.counters.entry((bssid, addr, counter)).or_default() += 1;
    }
}

type Shared = Arc<Mutex<SimState>>;

pub struct SimAccessPoint {
    state: Shared,
    bssid: MacAddr,
}

#[async_trait]
impl AccessPoint for SimAccessPoint {
    async fn start(&self, ifname: &str, params: &ApParams) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("ap.start {ifname} {}", params.get("ssid").unwrap_or("")));

        let key_mgmt = params
            .get("wpa_key_mgmt")
            .unwrap_or("WPA-PSK")
            .parse::<KeyMgmtSet>()?;
        let ap = SimAp {
            ifname: ifname.to_string(),
            bssid: self.bssid,
            ssid: params.get("ssid").unwrap_or_default().to_string(),
            passphrase: params.get("wpa_passphrase").unwrap_or_default().to_string(),
            key_mgmt,
            pmf: params.pmf_mode(),
        };

        // A restarted BSS drops every association
        state.assoc.clear();
        let capab = SimState::bss_capab(&ap, &state.faults);
        state.observed_bss.insert(ap.bssid, capab);
        state.ap = Some(ap);
        Ok(())
    }

    async fn request(&self, ifname: &str, cmd: &str) -> CtrlResult<String> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("ap.request {ifname} {cmd}"));
        state.running_ap(ifname)?;

        match cmd {
            "PING" => Ok("PONG\n".to_string()),
            _ => Ok("UNKNOWN COMMAND\n".to_string()),
        }
    }

    async fn sa_query(&self, ifname: &str, addr: MacAddr) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("ap.sa_query {ifname} {addr}"));
        let ap = state.running_ap(ifname)?;

        let Some((sta_ifname, assoc)) = state
            .assoc
            .iter()
            .find(|(_, (a, _))| *a == addr)
            .map(|(i, (_, s))| (i.clone(), s.clone()))
        else {
            return Err(CtrlError::CommandFailed {
                target: ifname.to_string(),
                command: format!("SA_QUERY {addr}"),
                reply: "FAIL".to_string(),
            });
        };

        // wlantest only sees inside protected frames with the passphrase
        let visible = assoc.mfpc && state.passphrases.contains(&ap.passphrase);
        if visible {
            state.bump(ap.bssid, addr, StaCounter::ValidSaQueryReqTx);
            if !state.faults.silent_stations.contains(&sta_ifname) {
                state.bump(ap.bssid, addr, StaCounter::ValidSaQueryRespTx);
            }
        }
        Ok(())
    }

    async fn stop(&self, ifname: &str) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("ap.stop {ifname}"));
        if state.ap.as_ref().is_some_and(|ap| ap.ifname == ifname) {
            state.ap = None;
            state.assoc.clear();
        }
        Ok(())
    }
}

pub struct SimStation {
    state: Shared,
    ifname: String,
    address: MacAddr,
    connect_timeout: Duration,
}

#[async_trait]
impl Station for SimStation {
    fn ifname(&self) -> &str {
        &self.ifname
    }

    fn address(&self) -> MacAddr {
        self.address
    }

    async fn connect(&self, params: &ConnectParams) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!(
            "sta.connect {} ieee80211w={}",
            self.ifname,
            params.ieee80211w.ieee80211w()
        ));

        let negotiated = state
            .ap
            .clone()
            .and_then(|ap| state.negotiate(&ap, &self.ifname, params).map(|a| (ap, a)));

        match negotiated {
            Some((ap, assoc)) => {
                state
                    .observed_sta
                    .insert((ap.bssid, self.address), assoc.clone());
                state
                    .assoc
                    .insert(self.ifname.clone(), (self.address, assoc));
                Ok(())
            }
            None => {
                state.assoc.remove(&self.ifname);
                Err(CtrlError::AssociationTimeout {
                    ifname: self.ifname.clone(),
                    timeout: self.connect_timeout,
                })
            }
        }
    }

    async fn reset(&self) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("sta.reset {}", self.ifname));
        state.assoc.remove(&self.ifname);
        Ok(())
    }
}

pub struct SimConnectivity {
    state: Shared,
}

#[async_trait]
impl Connectivity for SimConnectivity {
    async fn check(&self, src_ifname: &str, dst_ifname: &str) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record(format!("connectivity {src_ifname} {dst_ifname}"));

        let reachable = !state.faults.no_data_plane
            && state.ap.as_ref().is_some_and(|ap| ap.ifname == dst_ifname)
            && state.assoc.contains_key(src_ifname);

        if reachable {
            Ok(())
        } else {
            Err(CtrlError::Connectivity {
                src: src_ifname.to_string(),
                dst: dst_ifname.to_string(),
                detail: "exit code 1: no frames received".to_string(),
            })
        }
    }
}

pub struct SimObserver {
    state: Shared,
}

fn observer_fail(command: &str) -> CtrlError {
    CtrlError::CommandFailed {
        target: "wlantest_cli".to_string(),
        command: command.to_string(),
        reply: "FAIL".to_string(),
    }
}

#[async_trait]
impl Observer for SimObserver {
    async fn flush(&self) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record("observer.flush");
        state.observed_bss.clear();
        state.observed_sta.clear();
        state.counters.clear();
        state.passphrases.clear();
        Ok(())
    }

    async fn add_passphrase(&self, passphrase: &str) -> CtrlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record("observer.add_passphrase");
        state.passphrases.push(passphrase.to_string());
        Ok(())
    }

    async fn info_bss(&self, field: &str, bssid: MacAddr) -> CtrlResult<String> {
        let state = self.state.lock().unwrap();
        match (field, state.observed_bss.get(&bssid)) {
            ("rsn_capab", Some(capab)) => Ok(capab.clone()),
            _ => Err(observer_fail(&format!("info_bss {field} {bssid}"))),
        }
    }

    async fn info_sta(&self, field: &str, bssid: MacAddr, addr: MacAddr) -> CtrlResult<String> {
        let state = self.state.lock().unwrap();
        let Some(sta) = state.observed_sta.get(&(bssid, addr)) else {
            return Err(observer_fail(&format!("info_sta {field} {bssid} {addr}")));
        };
        match field {
            "rsn_capab" => {
                let mut flags = Vec::new();
                if sta.mfpc {
                    flags.push("MFPC");
                }
                if sta.mfpr {
                    flags.push("MFPR");
                }
                Ok(flags.join(" "))
            }
            "key_mgmt" => Ok(sta.akm.observed_name().to_string()),
            _ => Err(observer_fail(&format!("info_sta {field} {bssid} {addr}"))),
        }
    }

    async fn sta_counter(
        &self,
        counter: StaCounter,
        bssid: MacAddr,
        addr: MacAddr,
    ) -> CtrlResult<u64> {
        let state = self.state.lock().unwrap();
        if !state.observed_bss.contains_key(&bssid) {
            return Err(observer_fail(&format!("get_sta_counter {counter} {bssid} {addr}")));
        }
        Ok(state
            .counters
            .get(&(bssid, addr, counter))
            .copied()
            .unwrap_or(0))
    }
}

/// Build a testbed with two stations (wlan0, wlan1) over a fresh medium
pub fn testbed(faults: Faults) -> (Testbed, Shared) {
    let settings = TestbedSettings {
        sa_query_settle: Duration::from_millis(1),
        ..TestbedSettings::default()
    };
    let state: Shared = Arc::new(Mutex::new(SimState {
        faults,
        ..SimState::default()
    }));

    let stations: Vec<Box<dyn Station>> = (0u8..2)
        .map(|i| {
            Box::new(SimStation {
                state: state.clone(),
                ifname: format!("wlan{i}"),
                address: MacAddr::new([0x02, 0, 0, 0, i, 0]),
                connect_timeout: Duration::from_secs(10),
            }) as Box<dyn Station>
        })
        .collect();

    let bed = Testbed {
        ap: Box::new(SimAccessPoint {
            state: state.clone(),
            bssid: settings.bssid,
        }),
        stations,
        connectivity: Box::new(SimConnectivity {
            state: state.clone(),
        }),
        observer: Box::new(SimObserver {
            state: state.clone(),
        }),
        settings,
    };

    (bed, state)
}

/// Testbed keeping only the first `count` stations
pub fn testbed_with_stations(count: usize) -> Testbed {
    let (mut bed, _) = testbed(Faults::default());
    bed.stations.truncate(count);
    bed
}
