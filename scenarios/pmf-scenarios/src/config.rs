//! Configuration loading
//!
//! Everything has a default matching the stock hwsim setup (stations on
//! wlan0/wlan1, AP on wlan2), so a config file is only needed to deviate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wlan_ctrl::{hostapd, hwsim, wlantest, wpas, MacAddr};

use crate::testbed::TestbedSettings;

/// Config file name searched for on disk
pub const CONFIG_FILE: &str = "hwsim-pmf.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/hwsim-pmf/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("hwsim-pmf").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level harness configuration (from hwsim-pmf.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub ap: ApSection,
    pub stations: StationSection,
    pub tools: ToolSection,
    pub timing: TimingSection,
    pub network: NetworkSection,
}

/// Access point section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApSection {
    pub ifname: String,
    pub bssid: MacAddr,
    pub ctrl_dir: PathBuf,
    pub global_ctrl: PathBuf,
}

/// Station section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StationSection {
    pub ifnames: Vec<String>,
    pub ctrl_dir: PathBuf,
}

/// Helper tool paths
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSection {
    pub wlantest_cli: String,
    pub hwsim_test: String,
}

/// Timeouts and delays
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingSection {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub tool_timeout_ms: u64,
    pub sa_query_settle_ms: u64,
    pub scenario_timeout_secs: u64,
}

/// Network credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkSection {
    pub passphrase: String,
}

impl Default for ApSection {
    fn default() -> Self {
        Self {
            ifname: "wlan2".to_string(),
            bssid: MacAddr::new([0x02, 0, 0, 0, 0x02, 0]),
            ctrl_dir: PathBuf::from(hostapd::DEFAULT_CTRL_DIR),
            global_ctrl: PathBuf::from(hostapd::DEFAULT_GLOBAL_CTRL),
        }
    }
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            ifnames: vec!["wlan0".to_string(), "wlan1".to_string()],
            ctrl_dir: PathBuf::from(wpas::DEFAULT_CTRL_DIR),
        }
    }
}

impl Default for ToolSection {
    fn default() -> Self {
        Self {
            wlantest_cli: wlantest::DEFAULT_WLANTEST_CLI.to_string(),
            hwsim_test: hwsim::DEFAULT_HWSIM_TEST.to_string(),
        }
    }
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            connect_timeout_ms: 10_000,
            tool_timeout_ms: 30_000,
            sa_query_settle_ms: 100,
            scenario_timeout_secs: 60,
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            passphrase: "12345678".to_string(),
        }
    }
}

impl TimingSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn sa_query_settle(&self) -> Duration {
        Duration::from_millis(self.sa_query_settle_ms)
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario_timeout_secs)
    }
}

impl HarnessConfig {
    /// Load the discovered config file, or defaults when there is none
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(CONFIG_FILE) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: HarnessConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no scenario can run with
    pub fn validate(&self) -> Result<()> {
        if self.stations.ifnames.len() < 2 {
            anyhow::bail!(
                "at least two stations are required, {} configured",
                self.stations.ifnames.len()
            );
        }
        if self.stations.ifnames.contains(&self.ap.ifname) {
            anyhow::bail!("AP interface {} is also listed as a station", self.ap.ifname);
        }
        let len = self.network.passphrase.len();
        if !(8..=63).contains(&len) {
            anyhow::bail!("WPA passphrase must be 8..63 characters, got {}", len);
        }
        Ok(())
    }

    pub fn testbed_settings(&self) -> TestbedSettings {
        TestbedSettings {
            ap_ifname: self.ap.ifname.clone(),
            bssid: self.ap.bssid,
            passphrase: self.network.passphrase.clone(),
            sa_query_settle: self.timing.sa_query_settle(),
        }
    }
}
