//! Payload assembly
//!
//! Pairs each scaled channel value with its fixed label and renders the set
//! as a form-encoded body: `X1=18.75&X2=37.50&...`.

use crate::types::{LogicalChannel, Result, ScaledSample, TelemetryError, CHANNEL_COUNT};

/// Field names in logical channel order
pub const CHANNEL_LABELS: [&str; CHANNEL_COUNT] = [
    "X1", "X2", "Y1", "Y2", "Z1", "Z2", "D1", "D2", "P1", "P2", "P3", "P4", "P5", "EX1", "EX2",
    "EX3",
];

/// Name of the optional node clock field
pub const TIMESTAMP_FIELD: &str = "timestamp";

const FIELD_SEPARATOR: char = '&';

/// Label for a logical channel
pub fn channel_label(channel: LogicalChannel) -> &'static str {
    CHANNEL_LABELS[channel.index() as usize]
}

/// An encoded request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    body: String,
}

impl Payload {
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Body length in bytes
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// `(name, value)` pairs in body order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.body
            .split(FIELD_SEPARATOR)
            .filter_map(|field| field.split_once('='))
    }

    pub fn into_string(self) -> String {
        self.body
    }
}

/// Builds payloads from one cycle's scaled values
#[derive(Debug, Clone, Default)]
pub struct PayloadEncoder {
    timestamp: Option<i64>,
}

impl PayloadEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `timestamp=<secs>` after the channel fields
    pub fn with_timestamp(mut self, epoch_secs: i64) -> Self {
        self.timestamp = Some(epoch_secs);
        self
    }

    /// Encode exactly sixteen values, in channel order
    pub fn encode(&self, samples: &[ScaledSample]) -> Result<Payload> {
        if samples.len() != CHANNEL_COUNT {
            return Err(TelemetryError::ChannelCount {
                expected: CHANNEL_COUNT,
                actual: samples.len(),
            });
        }

        let mut fields: Vec<String> = CHANNEL_LABELS
            .iter()
            .zip(samples)
            .map(|(label, value)| format!("{}={:.2}", label, round_half_up(*value)))
            .collect();

        if let Some(secs) = self.timestamp {
            fields.push(format!("{}={}", TIMESTAMP_FIELD, secs));
        }

        let body = fields.join(&FIELD_SEPARATOR.to_string());
        log::debug!("Encoded payload ({} bytes)", body.len());
        Ok(Payload { body })
    }
}

/// Round to two decimals, ties away from zero
///
/// `{:.2}` alone rounds exact ties to even (`1.125` → `1.12`); the wire format
/// carries `1.13`.
fn round_half_up(value: ScaledSample) -> ScaledSample {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::SampleScaler;

    fn ramp_mv() -> Vec<ScaledSample> {
        (1..=16).map(|i| i as f64 * 18.75).collect()
    }

    #[test]
    fn test_encode_label_order_and_precision() {
        let payload = PayloadEncoder::new().encode(&ramp_mv()).unwrap();
        assert!(payload.as_str().starts_with("X1=18.75&X2=37.50&Y1=56.25&"));
        assert!(payload.as_str().ends_with("&EX3=300.00"));

        let fields: Vec<(&str, &str)> = payload.fields().collect();
        assert_eq!(fields.len(), 16);
        for ((name, value), label) in fields.iter().zip(CHANNEL_LABELS) {
            assert_eq!(*name, label);
            let (_, decimals) = value.split_once('.').unwrap();
            assert_eq!(decimals.len(), 2);
        }
    }

    #[test]
    fn test_encode_rounds_to_two_decimals() {
        let mut values = vec![0.0; 16];
        values[0] = 0.194;
        values[15] = 1234.5678;
        let payload = PayloadEncoder::new().encode(&values).unwrap();
        assert!(payload.as_str().starts_with("X1=0.19&X2=0.00&"));
        assert!(payload.as_str().ends_with("EX3=1234.57"));
    }

    #[test]
    fn test_encode_rounds_ties_up() {
        let scaler = SampleScaler::new(0.1875);
        let mut values = vec![0.0; 16];
        values[0] = scaler.scale(6);
        values[1] = scaler.scale(14);
        values[2] = scaler.scale(2);
        values[3] = scaler.scale(-6);
        let payload = PayloadEncoder::new().encode(&values).unwrap();
        assert!(payload
            .as_str()
            .starts_with("X1=1.13&X2=2.63&Y1=0.38&Y2=1.13&Z1=0.00&"));
    }

    #[test]
    fn test_encode_rejects_wrong_count() {
        let encoder = PayloadEncoder::new();
        for count in [0, 15, 17] {
            let values = vec![1.0; count];
            match encoder.encode(&values) {
                Err(TelemetryError::ChannelCount { expected, actual }) => {
                    assert_eq!(expected, 16);
                    assert_eq!(actual, count);
                }
                other => panic!("expected ChannelCount error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_timestamp_field_is_appended() {
        let payload = PayloadEncoder::new()
            .with_timestamp(1_700_000_000)
            .encode(&ramp_mv())
            .unwrap();
        assert!(payload.as_str().ends_with("&EX3=300.00&timestamp=1700000000"));
        assert_eq!(payload.fields().count(), 17);
    }

    #[test]
    fn test_channel_label_lookup() {
        assert_eq!(channel_label(LogicalChannel::new(0).unwrap()), "X1");
        assert_eq!(channel_label(LogicalChannel::new(12).unwrap()), "P5");
        assert_eq!(channel_label(LogicalChannel::new(15).unwrap()), "EX3");
    }
}
