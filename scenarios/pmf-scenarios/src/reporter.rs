//! Run reporting
//!
//! Formats results for the terminal, as Markdown, or as JSON.

use crate::{RunSummary, ScenarioResult};

/// Output format for run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact terminal output
    Terminal,
    /// Human-readable Markdown
    Markdown,
    /// Machine-readable JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "term" | "console" => Ok(Self::Terminal),
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Unknown format: {}", s)),
        }
    }
}

/// Report generator
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Generate a summary report
    pub fn summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Terminal => self.summary_terminal(summary),
            OutputFormat::Markdown => self.summary_markdown(summary),
            OutputFormat::Json => {
                serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }

    /// Generate a per-scenario report
    pub fn results(&self, results: &[ScenarioResult]) -> String {
        match self.format {
            OutputFormat::Terminal => self.results_terminal(results),
            OutputFormat::Markdown => self.results_markdown(results),
            OutputFormat::Json => {
                serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    // === Terminal formatters ===

    fn summary_terminal(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        let status = if summary.failed == 0 { "PASS" } else { "FAIL" };
        output.push_str(&format!(
            "\n[{}] PMF scenarios: {}/{} passed ({:.1}%) | {}ms\n",
            status, summary.passed, summary.total, summary.pass_rate, summary.total_duration_ms
        ));

        if !summary.failed_ids.is_empty() {
            output.push_str(&format!("   Failed: {}\n", summary.failed_ids.join(", ")));
        }

        output
    }

    fn results_terminal(&self, results: &[ScenarioResult]) -> String {
        let mut output = String::new();

        for result in results {
            let status = if result.passed { "ok  " } else { "FAIL" };
            output.push_str(&format!(
                "{} {} | {}ms\n",
                status, result.scenario_id, result.duration_ms
            ));

            if let Some(error) = &result.error {
                output.push_str(&format!("     Error: {}\n", error));
            }
        }

        output
    }

    // === Markdown formatters ===

    fn summary_markdown(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("# PMF Scenario Summary\n\n");
        output.push_str(&format!(
            "**Date:** {}\n",
            summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!(
            "**Total Duration:** {}ms\n\n",
            summary.total_duration_ms
        ));
        output.push_str(&format!("- **Total:** {}\n", summary.total));
        output.push_str(&format!("- **Passed:** {}\n", summary.passed));
        output.push_str(&format!("- **Failed:** {}\n", summary.failed));
        output.push_str(&format!("- **Pass Rate:** {:.1}%\n", summary.pass_rate));

        if !summary.failed_ids.is_empty() {
            output.push_str("\n## Failed Scenarios\n\n");
            for id in &summary.failed_ids {
                output.push_str(&format!("- `{}`\n", id));
            }
        }

        output
    }

    fn results_markdown(&self, results: &[ScenarioResult]) -> String {
        let mut output = String::new();

        output.push_str("# Scenario Results\n\n");
        output.push_str("| Scenario | Result | Duration | Error |\n");
        output.push_str("|----------|--------|----------|-------|\n");

        for result in results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            let error = result
                .error
                .as_deref()
                .map(|e| e.replace('|', "\\|"))
                .unwrap_or_default();
            output.push_str(&format!(
                "| {} | {} | {}ms | {} |\n",
                result.scenario_id, status, result.duration_ms, error
            ));
        }

        output
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::Terminal)
    }
}
