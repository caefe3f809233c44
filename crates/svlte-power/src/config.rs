//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Configuration for the power engine and its runtime.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PowerConfig {
    /// Number of SIM slots this device is provisioned for. SIM-state events
    /// are ignored until card-type detection has completed on exactly this
    /// many slots.
    pub sim_count: usize,

    /// Whether airplane mode powers the modem rails down entirely. When
    /// false on a multi-SIM device, airplane mode only toggles radio power.
    pub flight_mode_power_off: bool,

    /// Whether the device supports multi-SIM radio toggling.
    pub msim_supported: bool,

    /// Fixed interval between a failed precondition gate and the replay of
    /// the deferred operation.
    pub retry_interval_ms: u64,

    /// Cap on deferrals per operation. `None` reschedules until the gate
    /// opens, matching the legacy behaviour.
    pub max_retry_attempts: Option<u32>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        PowerConfig {
            sim_count: 2,
            flight_mode_power_off: true,
            msim_supported: true,
            retry_interval_ms: 3000,
            max_retry_attempts: Some(40),
        }
    }
}

impl PowerConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("failed to parse power config")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}
