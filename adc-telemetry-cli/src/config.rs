//! Configuration loading and parsing

use adc_telemetry::{Endpoint, NodeConfig, RawSample, CHANNEL_COUNT};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub node: NodeConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Readings served when no converter bus is attached
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Raw counts for the sixteen channels, in channel order
    #[serde(default = "default_readings")]
    pub readings: Vec<RawSample>,
    /// Bus addresses whose startup should fail
    #[serde(default)]
    pub failing_devices: Vec<u8>,
    /// Value read from a device that failed to start
    #[serde(default)]
    pub sentinel: RawSample,
}

fn default_readings() -> Vec<RawSample> {
    vec![0; CHANNEL_COUNT]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            readings: default_readings(),
            failing_devices: Vec::new(),
            sentinel: 0,
        }
    }
}

impl AppConfig {
    /// Configuration with defaults for everything but the collector
    pub fn for_endpoint(endpoint: Endpoint) -> Self {
        Self {
            node: NodeConfig::new(endpoint),
            simulation: SimulationConfig::default(),
        }
    }

    /// Check the whole configuration before starting the node
    pub fn validate(&self) -> Result<()> {
        self.node
            .validate()
            .context("Invalid [node] configuration")?;
        if self.simulation.readings.len() != CHANNEL_COUNT {
            bail!(
                "[simulation] readings must list {} values, found {}",
                CHANNEL_COUNT,
                self.simulation.readings.len()
            );
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}
