//! hwsim PMF scenario CLI
//!
//! Runs the 802.11w scenarios against hostapd and wpa_supplicant on a
//! mac80211_hwsim testbed.
//!
//! Usage:
//!   cargo run -p pmf-scenarios -- [OPTIONS]
//!
//! Examples:
//!   cargo run -p pmf-scenarios -- --list
//!   cargo run -p pmf-scenarios -- --scenario ap_pmf_required
//!   cargo run -p pmf-scenarios -- --output json --config ./hwsim-pmf.toml

use anyhow::Result;
use clap::Parser;
use pmf_scenarios::{
    config::HarnessConfig, scenarios, testbed::live, OutputFormat, Reporter, RunnerConfig,
    Scenario, ScenarioRunner,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hwsim-pmf")]
#[command(about = "Protected Management Frames scenarios on mac80211_hwsim")]
struct Cli {
    /// Run only this scenario (repeatable)
    #[arg(short, long = "scenario")]
    scenarios: Vec<String>,

    /// Harness config file (discovered from the working directory if not given)
    #[arg(long, env = "HWSIM_PMF_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: terminal, markdown, json
    #[arg(short, long, default_value = "terminal")]
    output: OutputFormat,

    /// Debug logging and per-scenario detail
    #[arg(short, long)]
    verbose: bool,

    /// List available scenarios and exit
    #[arg(long)]
    list: bool,
}

fn scenario_listing() -> String {
    scenarios::all_scenarios()
        .iter()
        .map(|s| format!("  {} - {}\n      {}\n", s.id, s.name, s.description))
        .collect()
}

fn print_scenarios() {
    print!("{}", scenario_listing());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    wlan_ctrl::init_tracing("pmf_scenarios", level)?;

    if cli.list {
        println!("Available scenarios:\n");
        print_scenarios();
        return Ok(());
    }

    let selected = match select(&cli.scenarios) {
        Ok(selected) => selected,
        Err(unknown) => {
            eprintln!("Unknown scenario '{}'. Available scenarios:", unknown);
            print_scenarios();
            std::process::exit(2);
        }
    };

    let all_passed = run(cli, selected).await?;
    if !all_passed {
        std::process::exit(1);
    }

    Ok(())
}

/// Resolve requested ids, returning the first unknown one on failure
fn select(ids: &[String]) -> Result<Vec<Scenario>, String> {
    if ids.is_empty() {
        return Ok(scenarios::all_scenarios());
    }

    ids.iter()
        .map(|id| scenarios::get_scenario(id).ok_or_else(|| id.clone()))
        .collect()
}

async fn run(cli: Cli, selected: Vec<Scenario>) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => HarnessConfig::load_from_path(path)?,
        None => HarnessConfig::load()?,
    };

    let reporter = Reporter::new(cli.output);
    let testbed = live::connect(&config).await?;
    let runner = ScenarioRunner::new(
        testbed,
        RunnerConfig {
            scenario_timeout: config.timing.scenario_timeout(),
            ..RunnerConfig::default()
        },
    );

    if matches!(cli.output, OutputFormat::Terminal) {
        println!("\n=== hwsim PMF scenarios ===");
        println!("AP: {} ({})", config.ap.ifname, config.ap.bssid);
        println!("Stations: {}", config.stations.ifnames.join(", "));
        println!("Scenarios to run: {}\n", selected.len());
    }

    let results = runner.run_all(&selected).await;
    let summary = ScenarioRunner::summarize(&results);

    // Per-scenario detail only when something failed or more was asked for
    if cli.verbose || !matches!(cli.output, OutputFormat::Terminal) || summary.failed > 0 {
        println!("{}", reporter.results(&results));
    }
    println!("{}", reporter.summary(&summary));

    Ok(summary.failed == 0)
}
