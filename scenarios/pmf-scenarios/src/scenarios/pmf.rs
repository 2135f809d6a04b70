//! Protected management frames scenarios
//!
//! Every scenario starts by flushing wlantest and giving it the passphrase,
//! so the observer state it asserts on comes from this scenario alone.

use tracing::debug;
use wlan_ctrl::{ApParams, ConnectParams, CtrlResult, KeyMgmt, KeyMgmtSet, PmfMode, StaCounter};

use crate::error::ScenarioError;
use crate::testbed::{Station, Testbed};

async fn prepare_observer(bed: &Testbed) -> CtrlResult<()> {
    bed.observer.flush().await?;
    bed.observer.add_passphrase(&bed.settings.passphrase).await
}

/// Connect `sta` with the given PMF policy and confirm data flows to the AP
async fn join(bed: &Testbed, sta: &dyn Station, ssid: &str, pmf: PmfMode) -> CtrlResult<()> {
    let params = ConnectParams::wpa2_psk(ssid, &bed.settings.passphrase, pmf);
    sta.connect(&params).await?;
    bed.connectivity
        .check(sta.ifname(), &bed.settings.ap_ifname)
        .await
}

async fn start_ap(bed: &Testbed, params: &ApParams) -> CtrlResult<()> {
    bed.ap.start(&bed.settings.ap_ifname, params).await
}

/// WPA2-PSK AP with PMF required
pub async fn ap_pmf_required(bed: &Testbed) -> Result<(), ScenarioError> {
    let ssid = "test-pmf-required";
    prepare_observer(bed).await?;

    let params = ApParams::wpa2(ssid, &bed.settings.passphrase)
        .key_mgmt(&KeyMgmtSet::from(KeyMgmt::WpaPskSha256))
        .pmf(PmfMode::Required);
    start_ap(bed, &params).await?;

    let sta0 = bed.station(0)?;
    let sta1 = bed.station(1)?;
    join(bed, sta0, ssid, PmfMode::Optional).await?;
    join(bed, sta1, ssid, PmfMode::Required).await?;

    let ap_ifname = &bed.settings.ap_ifname;
    bed.ap.sa_query(ap_ifname, sta0.address()).await?;
    bed.ap.sa_query(ap_ifname, sta1.address()).await?;

    let bssid = bed.settings.bssid;
    let wt = bed.observer.as_ref();
    wt.require_ap_pmf_mode(bssid, PmfMode::Required).await?;
    wt.require_sta_pmf(bssid, sta0.address()).await?;
    wt.require_sta_pmf_mandatory(bssid, sta1.address()).await?;

    tokio::time::sleep(bed.settings.sa_query_settle).await;

    for sta in [sta0, sta1] {
        let replies = wt
            .sta_counter(StaCounter::ValidSaQueryRespTx, bssid, sta.address())
            .await?;
        debug!(station = sta.ifname(), replies, "SA Query responses");
        if replies < 1 {
            return Err(ScenarioError::expectation(format!(
                "STA {} did not reply to SA Query",
                sta.ifname()
            )));
        }
    }

    Ok(())
}

/// WPA2-PSK AP with PMF optional
pub async fn ap_pmf_optional(bed: &Testbed) -> Result<(), ScenarioError> {
    let ssid = "test-pmf-optional";
    prepare_observer(bed).await?;

    let params = ApParams::wpa2(ssid, &bed.settings.passphrase)
        .key_mgmt(&KeyMgmtSet::from(KeyMgmt::WpaPsk))
        .pmf(PmfMode::Optional);
    start_ap(bed, &params).await?;

    let sta0 = bed.station(0)?;
    let sta1 = bed.station(1)?;
    join(bed, sta0, ssid, PmfMode::Optional).await?;
    join(bed, sta1, ssid, PmfMode::Required).await?;

    let bssid = bed.settings.bssid;
    let wt = bed.observer.as_ref();
    wt.require_ap_pmf_mode(bssid, PmfMode::Optional).await?;
    wt.require_sta_pmf(bssid, sta0.address()).await?;
    wt.require_sta_pmf_mandatory(bssid, sta1.address()).await?;

    Ok(())
}

/// WPA2-PSK AP with PMF optional (2 AKMs)
pub async fn ap_pmf_optional_2akm(bed: &Testbed) -> Result<(), ScenarioError> {
    let ssid = "test-pmf-optional-2akm";
    prepare_observer(bed).await?;

    let params = ApParams::wpa2(ssid, &bed.settings.passphrase)
        .key_mgmt(&KeyMgmtSet::psk_both())
        .pmf(PmfMode::Optional);
    start_ap(bed, &params).await?;

    let sta0 = bed.station(0)?;
    let sta1 = bed.station(1)?;
    join(bed, sta0, ssid, PmfMode::Optional).await?;
    join(bed, sta1, ssid, PmfMode::Required).await?;

    let bssid = bed.settings.bssid;
    let wt = bed.observer.as_ref();
    wt.require_ap_pmf_mode(bssid, PmfMode::Optional).await?;
    wt.require_sta_pmf(bssid, sta0.address()).await?;
    wt.require_sta_key_mgmt(bssid, sta0.address(), KeyMgmt::WpaPskSha256)
        .await?;
    wt.require_sta_pmf_mandatory(bssid, sta1.address()).await?;
    wt.require_sta_key_mgmt(bssid, sta1.address(), KeyMgmt::WpaPskSha256)
        .await?;

    Ok(())
}

/// WPA2-PSK AP without PMF (negative test)
///
/// Only a failure to associate or to pass traffic counts as the expected
/// outcome for the PMF-required station; any other error fails the scenario.
pub async fn ap_pmf_negative(bed: &Testbed) -> Result<(), ScenarioError> {
    let ssid = "test-pmf-negative";
    prepare_observer(bed).await?;

    let params = ApParams::wpa2(ssid, &bed.settings.passphrase);
    start_ap(bed, &params).await?;

    let sta0 = bed.station(0)?;
    let sta1 = bed.station(1)?;
    join(bed, sta0, ssid, PmfMode::Optional).await?;

    match join(bed, sta1, ssid, PmfMode::Required).await {
        Ok(()) => {
            return Err(ScenarioError::UnexpectedConnection {
                station: sta1.ifname().to_string(),
            })
        }
        Err(e) if e.is_join_failure() => {
            debug!(station = sta1.ifname(), "Ignore expected failure: {}", e);
        }
        Err(e) => return Err(e.into()),
    }

    bed.observer
        .require_ap_pmf_mode(bed.settings.bssid, PmfMode::Disabled)
        .await?;

    Ok(())
}
