//! Scenario runner
//!
//! Executes scenarios one at a time against a testbed and collects results.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::ScenarioError;
use crate::scenarios::Scenario;
use crate::testbed::Testbed;
use crate::{RunSummary, ScenarioResult};

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on a single scenario, including all its control requests
    pub scenario_timeout: Duration,
    /// Forget station networks before each scenario
    pub reset_stations: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scenario_timeout: Duration::from_secs(60),
            reset_stations: true,
        }
    }
}

/// Scenario runner
pub struct ScenarioRunner {
    testbed: Testbed,
    config: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new(testbed: Testbed, config: RunnerConfig) -> Self {
        Self { testbed, config }
    }

    /// Run a single scenario; failures end up in the result, never as `Err`
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let timestamp = Utc::now();

        info!(scenario_id = %scenario.id, "Running scenario");

        if self.config.reset_stations {
            self.reset_stations().await;
        }

        let outcome = match timeout(self.config.scenario_timeout, scenario.run(&self.testbed)).await
        {
            Ok(result) => result,
            Err(_) => Err(ScenarioError::Timeout(self.config.scenario_timeout)),
        };

        // The scenario may have failed before starting the AP; nothing to undo then
        if let Err(e) = self.testbed.ap.stop(&self.testbed.settings.ap_ifname).await {
            warn!(scenario_id = %scenario.id, error = %e, "Failed to stop AP");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let error = outcome.err().map(|e| e.to_string());

        match &error {
            None => info!(scenario_id = %scenario.id, duration_ms, "Scenario PASSED"),
            Some(e) => warn!(scenario_id = %scenario.id, duration_ms, error = %e, "Scenario FAILED"),
        }

        ScenarioResult {
            scenario_id: scenario.id.clone(),
            name: scenario.name.clone(),
            passed: error.is_none(),
            duration_ms,
            error,
            timestamp,
        }
    }

    /// Run scenarios in order
    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            results.push(self.run_scenario(scenario).await);
        }

        results
    }

    async fn reset_stations(&self) {
        for sta in &self.testbed.stations {
            if let Err(e) = sta.reset().await {
                warn!(station = sta.ifname(), error = %e, "Failed to reset station");
            }
        }
    }

    /// Generate a summary from results
    pub fn summarize(results: &[ScenarioResult]) -> RunSummary {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();

        RunSummary {
            timestamp: Utc::now(),
            total,
            passed,
            failed: total - passed,
            pass_rate: if total > 0 {
                (passed as f64 / total as f64) * 100.0
            } else {
                0.0
            },
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            failed_ids: results
                .iter()
                .filter(|r| !r.passed)
                .map(|r| r.scenario_id.clone())
                .collect(),
        }
    }
}
