//! Scenario registry
//!
//! Scenarios are registered here in execution order; the runner never
//! depends on that order for correctness.

pub mod pmf;

use serde::Serialize;

use crate::error::ScenarioError;
use crate::testbed::Testbed;

/// Which procedure a scenario runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    ApPmfRequired,
    ApPmfOptional,
    ApPmfOptional2Akm,
    ApPmfNegative,
}

/// A named scenario
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// Unique identifier for the scenario
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// What the scenario validates
    pub description: String,
    pub kind: ScenarioKind,
}

impl Scenario {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ScenarioKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            kind,
        }
    }

    /// Run the scenario against `bed`
    pub async fn run(&self, bed: &Testbed) -> Result<(), ScenarioError> {
        match self.kind {
            ScenarioKind::ApPmfRequired => pmf::ap_pmf_required(bed).await,
            ScenarioKind::ApPmfOptional => pmf::ap_pmf_optional(bed).await,
            ScenarioKind::ApPmfOptional2Akm => pmf::ap_pmf_optional_2akm(bed).await,
            ScenarioKind::ApPmfNegative => pmf::ap_pmf_negative(bed).await,
        }
    }
}

/// Get all scenarios
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "ap_pmf_required",
            "WPA2-PSK AP with PMF required",
            "Both stations negotiate PMF with a PMF-required AP and answer SA Query",
            ScenarioKind::ApPmfRequired,
        ),
        Scenario::new(
            "ap_pmf_optional",
            "WPA2-PSK AP with PMF optional",
            "PMF-optional AP accepts stations with either PMF policy",
            ScenarioKind::ApPmfOptional,
        ),
        Scenario::new(
            "ap_pmf_optional_2akm",
            "WPA2-PSK AP with PMF optional (2 AKMs)",
            "Stations pick PSK-SHA256 when the AP offers both PSK AKMs",
            ScenarioKind::ApPmfOptional2Akm,
        ),
        Scenario::new(
            "ap_pmf_negative",
            "WPA2-PSK AP without PMF (negative test)",
            "A PMF-required station cannot join an AP without PMF",
            ScenarioKind::ApPmfNegative,
        ),
    ]
}

/// Get a specific scenario by ID
pub fn get_scenario(id: &str) -> Option<Scenario> {
    all_scenarios().into_iter().find(|s| s.id == id)
}

/// List all scenario IDs
pub fn list_scenario_ids() -> Vec<String> {
    all_scenarios().into_iter().map(|s| s.id).collect()
}
