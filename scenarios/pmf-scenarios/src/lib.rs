//! hwsim PMF scenarios
//!
//! Protected Management Frames (802.11w) checks against a mac80211_hwsim
//! testbed: hostapd serves the AP, wpa_supplicant drives the stations,
//! hwsim_test confirms the data plane and wlantest reports what actually
//! went over the air.
//!
//! ## Scenarios
//!
//! - **ap_pmf_required**: PMF-required AP, stations answer SA Query
//! - **ap_pmf_optional**: PMF-optional AP with optional and required stations
//! - **ap_pmf_optional_2akm**: both PSK AKMs offered, stations pick PSK-SHA256
//! - **ap_pmf_negative**: a PMF-required station cannot join an AP without PMF
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pmf_scenarios::{config::HarnessConfig, scenarios, testbed::live, RunnerConfig, ScenarioRunner};
//!
//! let config = HarnessConfig::load()?;
//! let runner = ScenarioRunner::new(live::connect(&config).await?, RunnerConfig::default());
//! let results = runner.run_all(&scenarios::all_scenarios()).await;
//! ```

pub mod config;
pub mod error;
pub mod reporter;
pub mod runner;
pub mod scenarios;
pub mod testbed;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::ScenarioError;
pub use reporter::{OutputFormat, Reporter};
pub use runner::{RunnerConfig, ScenarioRunner};
pub use scenarios::Scenario;
pub use testbed::Testbed;

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub name: String,
    pub passed: bool,
    /// Wall time including station reset and AP teardown
    pub duration_ms: u64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate over a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub total_duration_ms: u64,
    pub failed_ids: Vec<String>,
}
