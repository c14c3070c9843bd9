//! Node configuration types
//!
//! Everything the acquisition loop needs to know about its surroundings is
//! injected through `NodeConfig`: where the collector lives, how the
//! converters are addressed and configured, and how often to run.

use crate::converter::DEFAULT_ADDRESSES;
use crate::delivery::Endpoint;
use crate::scaler::{Gain, SampleScaler};
use crate::types::{Result, TelemetryError, DEVICE_COUNT};
use serde::{Deserialize, Serialize};

/// Configuration for one telemetry node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Collector to deliver to
    pub endpoint: Endpoint,

    /// Bus address of each converter, in device order
    #[serde(default = "default_addresses")]
    pub device_addresses: Vec<u8>,

    /// Minimum time between cycles (default: 60000ms)
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Converter gain setting (default: two_thirds)
    #[serde(default)]
    pub gain: Gain,

    /// Optional: explicit millivolts per count, overrides the gain table
    #[serde(default)]
    pub millivolts_per_count: Option<f64>,

    /// Append the node's unix time to every payload
    #[serde(default)]
    pub include_timestamp: bool,

    /// How long the loop idles between scheduler checks (default: 100ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Optional: give up on a silent collector after this long
    #[serde(default)]
    pub response_timeout_ms: Option<u64>,
}

fn default_addresses() -> Vec<u8> {
    DEFAULT_ADDRESSES.to_vec()
}

fn default_interval() -> u64 {
    60_000
}

fn default_poll_interval() -> u64 {
    100
}

impl NodeConfig {
    /// Create a configuration with default settings for `endpoint`
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            device_addresses: default_addresses(),
            interval_ms: default_interval(),
            gain: Gain::default(),
            millivolts_per_count: None,
            include_timestamp: false,
            poll_interval_ms: default_poll_interval(),
            response_timeout_ms: None,
        }
    }

    /// Builder method: set the cycle interval
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Builder method: set the converter addresses
    pub fn with_device_addresses(mut self, addresses: Vec<u8>) -> Self {
        self.device_addresses = addresses;
        self
    }

    /// Builder method: set the gain
    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    /// Builder method: override the scaling factor
    pub fn with_millivolts_per_count(mut self, factor: f64) -> Self {
        self.millivolts_per_count = Some(factor);
        self
    }

    /// Builder method: enable the timestamp field
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.include_timestamp = enabled;
        self
    }

    /// Builder method: set the idle time between scheduler checks
    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn with_response_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = Some(timeout_ms);
        self
    }

    /// Scaler for the configured gain or override
    pub fn scaler(&self) -> SampleScaler {
        match self.millivolts_per_count {
            Some(factor) => SampleScaler::new(factor),
            None => SampleScaler::from_gain(self.gain),
        }
    }

    /// Check the configuration before the node starts
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.host.trim().is_empty() {
            return Err(invalid("endpoint host is empty"));
        }
        if self.endpoint.port == 0 {
            return Err(invalid("endpoint port must be non-zero"));
        }
        if !self.endpoint.path.starts_with('/') {
            return Err(invalid(format!(
                "endpoint path must start with '/': {:?}",
                self.endpoint.path
            )));
        }
        if self.device_addresses.len() != DEVICE_COUNT {
            return Err(TelemetryError::DeviceCount {
                expected: DEVICE_COUNT,
                actual: self.device_addresses.len(),
            });
        }
        for (i, address) in self.device_addresses.iter().enumerate() {
            if self.device_addresses[..i].contains(address) {
                return Err(invalid(format!("duplicate device address 0x{:02X}", address)));
            }
        }
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than zero"));
        }
        if self.response_timeout_ms == Some(0) {
            return Err(invalid("response_timeout_ms must be greater than zero"));
        }
        if let Some(factor) = self.millivolts_per_count {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(invalid(format!("millivolts_per_count must be positive: {}", factor)));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> TelemetryError {
    TelemetryError::InvalidConfig(message.into())
}
