//! Raw count to millivolt conversion
//!
//! The converters are 16-bit devices with a programmable gain amplifier.
//! Each gain setting fixes the full-scale range and therefore the
//! millivolts represented by one count.

use crate::types::{RawSample, ScaledSample};
use serde::{Deserialize, Serialize};

/// Programmable gain amplifier setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    /// ±6.144 V full scale
    #[default]
    TwoThirds,
    /// ±4.096 V
    One,
    /// ±2.048 V
    Two,
    /// ±1.024 V
    Four,
    /// ±0.512 V
    Eight,
    /// ±0.256 V
    Sixteen,
}

impl Gain {
    /// Millivolts per count at this gain
    pub const fn millivolts_per_count(&self) -> f64 {
        match self {
            Gain::TwoThirds => 0.1875,
            Gain::One => 0.125,
            Gain::Two => 0.0625,
            Gain::Four => 0.03125,
            Gain::Eight => 0.015625,
            Gain::Sixteen => 0.0078125,
        }
    }

    /// Full-scale range in volts
    pub const fn full_scale_volts(&self) -> f64 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
            Gain::Four => 1.024,
            Gain::Eight => 0.512,
            Gain::Sixteen => 0.256,
        }
    }
}

/// Converts raw readings into millivolts
///
/// `scale(raw) = |raw * resolution|`. The sign reported by the converter is
/// dropped; the collector stores unsigned magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleScaler {
    resolution: f64,
}

impl SampleScaler {
    /// Scaler with an explicit millivolts-per-count factor
    pub const fn new(resolution: f64) -> Self {
        Self { resolution }
    }

    pub const fn from_gain(gain: Gain) -> Self {
        Self::new(gain.millivolts_per_count())
    }

    pub const fn resolution(&self) -> f64 {
        self.resolution
    }

    #[inline]
    pub fn scale(&self, raw: RawSample) -> ScaledSample {
        (raw as f64 * self.resolution).abs()
    }
}

impl Default for SampleScaler {
    fn default() -> Self {
        Self::from_gain(Gain::default())
    }
}
