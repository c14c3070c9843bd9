//! Acquisition loop driver
//!
//! `TelemetryNode` owns the converters, the delivery slot and the scheduler,
//! and runs sample → scale → encode → deliver to completion each time the
//! scheduler admits a cycle.

use crate::config::NodeConfig;
use crate::converter::{ConverterBank, DeviceStatus};
use crate::delivery::DeliveryClient;
use crate::payload::{channel_label, PayloadEncoder};
use crate::scaler::SampleScaler;
use crate::scheduler::{Clock, CycleScheduler, SystemClock};
use crate::types::{
    ChannelReading, CycleReport, DeliveryOutcome, LogicalChannel, Result, ScaledSample,
    Timestamp, CHANNEL_COUNT,
};
use chrono::Utc;
use std::time::Duration;

/// The telemetry node
pub struct TelemetryNode<C: Clock = SystemClock> {
    config: NodeConfig,
    bank: ConverterBank,
    scaler: SampleScaler,
    client: DeliveryClient,
    scheduler: CycleScheduler,
    clock: C,
    cycles: u64,
}

impl TelemetryNode<SystemClock> {
    /// Create a node driven by the system monotonic clock
    pub fn new(config: NodeConfig, bank: ConverterBank) -> Result<Self> {
        Self::with_clock(config, bank, SystemClock::new())
    }
}

impl<C: Clock> TelemetryNode<C> {
    /// Create a node driven by `clock`
    ///
    /// Validates `config` and starts every converter once. Devices that fail
    /// to start are reported and kept.
    pub fn with_clock(config: NodeConfig, mut bank: ConverterBank, clock: C) -> Result<Self> {
        config.validate()?;

        let ready = bank.initialize();
        log::info!(
            "{} of {} converters ready; delivering to {} every {}ms",
            ready,
            bank.device_status().len(),
            config.endpoint,
            config.interval_ms
        );

        Ok(Self {
            scaler: config.scaler(),
            scheduler: CycleScheduler::from_millis(config.interval_ms),
            client: DeliveryClient::new()
                .with_response_timeout(config.response_timeout_ms.map(Duration::from_millis)),
            config,
            bank,
            clock,
            cycles: 0,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn device_status(&self) -> &[DeviceStatus] {
        self.bank.device_status()
    }

    /// Number of cycles run so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run a cycle if the scheduler admits one now
    pub fn poll(&mut self) -> Result<Option<CycleReport>> {
        let now = self.clock.now();
        if !self.scheduler.should_run(now) {
            return Ok(None);
        }
        self.run_cycle().map(Some)
    }

    /// Run one full cycle immediately, bypassing the scheduler
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;
        let started_at = Utc::now();
        log::info!("Starting acquisition cycle {}", self.cycles);

        let raw = self.bank.sample_all();
        let mut readings = Vec::with_capacity(CHANNEL_COUNT);
        for channel in LogicalChannel::all() {
            let value = raw[channel.index() as usize];
            let millivolts = self.scaler.scale(value);
            log::info!(
                "CH {} | ADC: {} | Voltage: {:.2} mV",
                channel,
                value,
                millivolts
            );
            readings.push(ChannelReading {
                channel,
                label: channel_label(channel).to_string(),
                raw: value,
                millivolts,
            });
        }

        let scaled: Vec<ScaledSample> = readings.iter().map(|r| r.millivolts).collect();
        let (body, outcome) = self.encode_and_deliver(&scaled, started_at)?;

        Ok(CycleReport {
            cycle: self.cycles,
            started_at,
            readings,
            body,
            outcome,
        })
    }

    /// Encode already-scaled values and deliver them
    ///
    /// Fails without contacting the collector when `samples` does not hold
    /// exactly one value per channel.
    pub fn deliver_samples(&mut self, samples: &[ScaledSample]) -> Result<DeliveryOutcome> {
        self.encode_and_deliver(samples, Utc::now())
            .map(|(_, outcome)| outcome)
    }

    /// Poll until `max_cycles` cycles have run, or forever when `None`
    ///
    /// `on_report` sees every completed cycle. A cycle that fails to encode is
    /// logged and skipped; the loop waits for the next interval as usual.
    pub fn run<F>(&mut self, max_cycles: Option<u64>, mut on_report: F) -> u64
    where
        F: FnMut(&CycleReport),
    {
        let mut completed = 0;
        let poll = self.config.poll_interval_ms;

        while !max_cycles.is_some_and(|max| completed >= max) {
            match self.poll() {
                Ok(Some(report)) => {
                    completed += 1;
                    on_report(&report);
                }
                Ok(None) => {}
                Err(e) => log::error!("Cycle aborted: {}", e),
            }

            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }

            let wait = self.scheduler.remaining(self.clock.now()).min(poll);
            if wait > 0 {
                std::thread::sleep(Duration::from_millis(wait));
            }
        }

        completed
    }

    fn encode_and_deliver(
        &mut self,
        samples: &[ScaledSample],
        started_at: Timestamp,
    ) -> Result<(String, DeliveryOutcome)> {
        let mut encoder = PayloadEncoder::new();
        if self.config.include_timestamp {
            encoder = encoder.with_timestamp(started_at.timestamp());
        }

        let payload = encoder.encode(samples)?;
        log::info!("Sending data: {}", payload.as_str());

        let outcome = self.client.deliver(&payload, &self.config.endpoint);
        match outcome {
            DeliveryOutcome::Delivered => log::info!("Data sent successfully"),
            DeliveryOutcome::ConnectionFailed => log::warn!("Connection to collector failed"),
            DeliveryOutcome::TransportError => log::error!("Delivery interrupted"),
        }

        Ok((payload.into_string(), outcome))
    }
}
