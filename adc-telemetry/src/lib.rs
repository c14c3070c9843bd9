//! ADC Telemetry Node Library
//!
//! Periodic acquisition and delivery loop for a sensing node with sixteen
//! analog inputs spread over four four-channel converters.
//!
//! # Architecture
//!
//! Each cycle runs to completion on the caller's thread:
//! - `CycleScheduler` admits at most one cycle per interval
//! - `ConverterBank` reads all sixteen logical channels
//! - `SampleScaler` turns counts into millivolts
//! - `PayloadEncoder` renders the labelled, form-encoded body
//! - `DeliveryClient` POSTs it to the collector over a fresh connection
//!
//! The library does NOT:
//! - Buffer or retry payloads across cycles
//! - Authenticate or encrypt the payload
//! - Join networks or discover devices
//!
//! # Example Usage
//!
//! ```no_run
//! use adc_telemetry::{simulated_bank, Endpoint, NodeConfig, TelemetryNode, DEFAULT_ADDRESSES};
//!
//! let config = NodeConfig::new(Endpoint::new("192.168.1.20", 5176))
//!     .with_interval_ms(60_000);
//!
//! let raw = vec![0i16; 16];
//! let bank = simulated_bank(&DEFAULT_ADDRESSES, &raw, &[], 0).unwrap();
//!
//! let mut node = TelemetryNode::new(config, bank).unwrap();
//! node.run(None, |report| println!("cycle {}: {}", report.cycle, report.outcome));
//! ```

// Public modules
pub mod config;
pub mod converter;
pub mod delivery;
pub mod node;
pub mod payload;
pub mod scaler;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use config::NodeConfig;
pub use converter::{
    simulated_bank, ConverterBank, ConverterDevice, DeviceError, DeviceStatus,
    SimulatedConverter, DEFAULT_ADDRESSES,
};
pub use delivery::{format_request, DeliveryClient, Endpoint, DEFAULT_PATH};
pub use node::TelemetryNode;
pub use payload::{channel_label, Payload, PayloadEncoder, CHANNEL_LABELS};
pub use scaler::{Gain, SampleScaler};
pub use scheduler::{Clock, CycleScheduler, ManualClock, MonotonicTime, SystemClock};
pub use types::{
    ChannelReading, CycleReport, DeliveryOutcome, LogicalChannel, RawSample, Result,
    ScaledSample, TelemetryError, Timestamp, CHANNEL_COUNT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: the label table covers every channel
        assert_eq!(CHANNEL_LABELS.len(), CHANNEL_COUNT);
        assert_eq!(LogicalChannel::all().count(), CHANNEL_COUNT);
    }
}
