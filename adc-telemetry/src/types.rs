//! Core types for the telemetry node
//!
//! This module defines the fundamental values that flow through one
//! acquisition cycle. Nothing here outlives a cycle except the fixed channel
//! topology.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp used in cycle reports
pub type Timestamp = DateTime<Utc>;

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Number of converter devices on the bus
pub const DEVICE_COUNT: usize = 4;

/// Number of single-ended inputs on each converter device
pub const CHANNELS_PER_DEVICE: usize = 4;

/// Size of the logical channel space
pub const CHANNEL_COUNT: usize = DEVICE_COUNT * CHANNELS_PER_DEVICE;

/// Errors that can occur while acquiring or encoding a cycle
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid logical channel: {0} (expected 0..16)")]
    InvalidChannel(u8),

    #[error("Wrong number of converter devices: expected {expected}, got {actual}")]
    DeviceCount { expected: usize, actual: usize },

    #[error("Wrong number of channel values: expected {expected}, got {actual}")]
    ChannelCount { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A logical input slot in `[0, 16)`
///
/// Channels are numbered uniformly across all converter devices: channel `c`
/// lives on device `c / 4`, input `c % 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LogicalChannel(u8);

impl LogicalChannel {
    /// Create a channel, rejecting anything outside `[0, 16)`
    pub fn new(index: u8) -> Result<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Ok(Self(index))
        } else {
            Err(TelemetryError::InvalidChannel(index))
        }
    }

    /// All channels in ascending order
    pub fn all() -> impl Iterator<Item = LogicalChannel> {
        (0..CHANNEL_COUNT as u8).map(LogicalChannel)
    }

    pub const fn index(&self) -> u8 {
        self.0
    }

    /// Index of the converter device that owns this channel
    pub const fn device_index(&self) -> usize {
        self.0 as usize / CHANNELS_PER_DEVICE
    }

    /// Input number on the owning device
    pub const fn local_channel(&self) -> u8 {
        self.0 % CHANNELS_PER_DEVICE as u8
    }
}

impl TryFrom<u8> for LogicalChannel {
    type Error = TelemetryError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalChannel> for u8 {
    fn from(channel: LogicalChannel) -> Self {
        channel.0
    }
}

impl fmt::Display for LogicalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed conversion result straight from a converter
pub type RawSample = i16;

/// Non-negative voltage in millivolts
pub type ScaledSample = f64;

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Connection established, request written, response drained
    Delivered,
    /// Endpoint unreachable or refused
    ConnectionFailed,
    /// Connection dropped while writing the request or reading the response
    TransportError,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered => write!(f, "Delivered"),
            DeliveryOutcome::ConnectionFailed => write!(f, "ConnectionFailed"),
            DeliveryOutcome::TransportError => write!(f, "TransportError"),
        }
    }
}

/// One channel's values within a cycle report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub channel: LogicalChannel,
    pub label: String,
    pub raw: RawSample,
    pub millivolts: ScaledSample,
}

/// Diagnostic record of one completed acquisition cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Sequence number, starting at 1
    pub cycle: u64,
    /// Wall-clock time the cycle started
    pub started_at: Timestamp,
    /// Readings in channel order
    pub readings: Vec<ChannelReading>,
    /// Encoded request body
    pub body: String,
    pub outcome: DeliveryOutcome,
}
