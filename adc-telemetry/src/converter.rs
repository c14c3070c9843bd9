//! Converter devices and the unified channel space
//!
//! `ConverterDevice` is the port a bus driver implements. `ConverterBank`
//! owns the four devices and routes every logical channel through a lookup
//! table built once at construction.

use crate::types::{
    LogicalChannel, RawSample, Result, TelemetryError, CHANNEL_COUNT, DEVICE_COUNT,
};
use serde::{Deserialize, Serialize};

/// Default bus addresses, one per device, in device order
pub const DEFAULT_ADDRESSES: [u8; DEVICE_COUNT] = [0x48, 0x49, 0x4A, 0x4B];

/// Errors reported by a device during startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("Device at 0x{address:02X} did not acknowledge")]
    NotAcknowledged { address: u8 },
}

/// Port for one addressable multi-channel converter
///
/// Reads never fail at this boundary: a device that cannot deliver a
/// conversion returns its own failure sentinel instead.
pub trait ConverterDevice {
    /// Bus address of the device
    fn address(&self) -> u8;

    /// Address and configure the device. Called once at startup.
    fn begin(&mut self) -> std::result::Result<(), DeviceError>;

    /// Single-ended conversion on input `channel` (0..4)
    fn read_single_ended(&mut self, channel: u8) -> RawSample;
}

/// Startup result for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub address: u8,
    pub ready: bool,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    device: usize,
    local: u8,
}

/// All converter devices behind one logical channel space
pub struct ConverterBank {
    devices: Vec<Box<dyn ConverterDevice>>,
    routes: [Route; CHANNEL_COUNT],
    status: Vec<DeviceStatus>,
}

impl ConverterBank {
    /// Build the bank from exactly four devices, in device order
    pub fn new(devices: Vec<Box<dyn ConverterDevice>>) -> Result<Self> {
        if devices.len() != DEVICE_COUNT {
            return Err(TelemetryError::DeviceCount {
                expected: DEVICE_COUNT,
                actual: devices.len(),
            });
        }

        let mut routes = [Route { device: 0, local: 0 }; CHANNEL_COUNT];
        for channel in LogicalChannel::all() {
            routes[channel.index() as usize] = Route {
                device: channel.device_index(),
                local: channel.local_channel(),
            };
        }

        let status = devices
            .iter()
            .map(|d| DeviceStatus {
                address: d.address(),
                ready: false,
            })
            .collect();

        Ok(Self {
            devices,
            routes,
            status,
        })
    }

    /// Start every device once
    ///
    /// A device that fails to start is reported and left in place; its
    /// channels are still read on every cycle. Returns the number of ready
    /// devices.
    pub fn initialize(&mut self) -> usize {
        for (index, device) in self.devices.iter_mut().enumerate() {
            let address = device.address();
            match device.begin() {
                Ok(()) => {
                    log::info!("Converter #{} (0x{:02X}) ready", index + 1, address);
                    self.status[index].ready = true;
                }
                Err(e) => {
                    log::warn!("Converter #{} (0x{:02X}) init failed: {}", index + 1, address, e);
                    self.status[index].ready = false;
                }
            }
        }
        self.status.iter().filter(|s| s.ready).count()
    }

    /// Read one logical channel
    pub fn sample(&mut self, channel: LogicalChannel) -> RawSample {
        let route = self.routes[channel.index() as usize];
        self.devices[route.device].read_single_ended(route.local)
    }

    /// Read all channels in ascending order
    pub fn sample_all(&mut self) -> [RawSample; CHANNEL_COUNT] {
        let mut raw = [0; CHANNEL_COUNT];
        for channel in LogicalChannel::all() {
            raw[channel.index() as usize] = self.sample(channel);
        }
        raw
    }

    /// Startup status per device, in device order
    pub fn device_status(&self) -> &[DeviceStatus] {
        &self.status
    }
}

/// Converter adapter that serves fixed readings
///
/// Stands in for bus hardware on hosts without one attached. A simulated
/// device can be told to fail `begin()`, after which every read returns the
/// failure sentinel.
#[derive(Debug, Clone)]
pub struct SimulatedConverter {
    address: u8,
    readings: [RawSample; 4],
    fail_init: bool,
    sentinel: RawSample,
    ready: bool,
}

impl SimulatedConverter {
    pub fn new(address: u8, readings: [RawSample; 4]) -> Self {
        Self {
            address,
            readings,
            fail_init: false,
            sentinel: 0,
            ready: false,
        }
    }

    /// Make `begin()` report a missing acknowledgement
    pub fn with_init_failure(mut self, fail: bool) -> Self {
        self.fail_init = fail;
        self
    }

    /// Value returned by reads when the device is not ready
    pub fn with_sentinel(mut self, sentinel: RawSample) -> Self {
        self.sentinel = sentinel;
        self
    }
}

impl ConverterDevice for SimulatedConverter {
    fn address(&self) -> u8 {
        self.address
    }

    fn begin(&mut self) -> std::result::Result<(), DeviceError> {
        if self.fail_init {
            self.ready = false;
            return Err(DeviceError::NotAcknowledged {
                address: self.address,
            });
        }
        self.ready = true;
        Ok(())
    }

    fn read_single_ended(&mut self, channel: u8) -> RawSample {
        if !self.ready {
            return self.sentinel;
        }
        self.readings
            .get(channel as usize)
            .copied()
            .unwrap_or(self.sentinel)
    }
}

/// Build a bank of simulated devices from 16 channel readings
///
/// `failing` lists bus addresses whose startup should fail.
pub fn simulated_bank(
    addresses: &[u8],
    readings: &[RawSample],
    failing: &[u8],
    sentinel: RawSample,
) -> Result<ConverterBank> {
    if readings.len() != CHANNEL_COUNT {
        return Err(TelemetryError::ChannelCount {
            expected: CHANNEL_COUNT,
            actual: readings.len(),
        });
    }
    let devices = addresses
        .iter()
        .zip(readings.chunks(4))
        .map(|(&address, chunk)| {
            let mut values = [0; 4];
            values.copy_from_slice(chunk);
            Box::new(
                SimulatedConverter::new(address, values)
                    .with_init_failure(failing.contains(&address))
                    .with_sentinel(sentinel),
            ) as Box<dyn ConverterDevice>
        })
        .collect();
    ConverterBank::new(devices)
}
