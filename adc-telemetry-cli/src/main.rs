//! ADC Telemetry Node CLI
//!
//! Runs the acquisition and delivery loop of the `adc-telemetry` library.
//! It adds:
//! - TOML configuration loading with command-line overrides
//! - Logging setup
//! - Simulated converters for hosts without a converter bus
//! - Human-readable or JSON cycle reports

use adc_telemetry::{simulated_bank, CycleReport, Endpoint, TelemetryNode};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

mod config;

use config::AppConfig;

/// ADC Telemetry Node - sample sixteen channels and deliver them to a collector
#[derive(Parser, Debug)]
#[command(name = "adc-telemetry-cli")]
#[command(about = "Sample ADC channels and POST them to a collector", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Collector host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Collector port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Request path on the collector
    #[arg(long, value_name = "PATH")]
    path: Option<String>,

    /// Minimum time between cycles in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Run a single cycle immediately and exit
    #[arg(long)]
    once: bool,

    /// Stop after this many cycles
    #[arg(long, value_name = "COUNT")]
    cycles: Option<u64>,

    /// Print each cycle report as a JSON line
    #[arg(long)]
    json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("ADC Telemetry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using telemetry library v{}", adc_telemetry::VERSION);

    let config = resolve_config(&args)?;
    let bank = simulated_bank(
        &config.node.device_addresses,
        &config.simulation.readings,
        &config.simulation.failing_devices,
        config.simulation.sentinel,
    )
    .context("Failed to set up converters")?;

    let mut node = TelemetryNode::new(config.node, bank).context("Failed to start node")?;

    if args.once {
        let report = node.run_cycle().context("Cycle failed")?;
        print_report(&report, args.json)?;
        if !report.outcome.is_delivered() {
            bail!("Delivery failed: {}", report.outcome);
        }
        return Ok(());
    }

    let mut print_error = None;
    let completed = node.run(args.cycles, |report| {
        if let Err(e) = print_report(report, args.json) {
            print_error.get_or_insert(e);
        }
    });
    if let Some(e) = print_error {
        return Err(e);
    }

    log::info!("Stopped after {} cycles", completed);
    Ok(())
}

/// Merge the config file (if any) with command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match (&args.config, &args.host, args.port) {
        (Some(path), _, _) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        (None, Some(host), Some(port)) => AppConfig::for_endpoint(Endpoint::new(host, port)),
        (None, _, _) => bail!("Either --config or both --host and --port are required"),
    };

    if let Some(host) = &args.host {
        config.node.endpoint.host = host.clone();
    }
    if let Some(port) = args.port {
        config.node.endpoint.port = port;
    }
    if let Some(path) = &args.path {
        config.node.endpoint.path = path.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.node.interval_ms = interval_ms;
    }

    config.validate()?;
    log::debug!("Configuration resolved: {:?}", config);
    Ok(config)
}

/// Print one cycle report to stdout
fn print_report(report: &CycleReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    println!(
        "Cycle {} at {}",
        report.cycle,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for reading in &report.readings {
        println!(
            "  CH {:>2}  {:<4} ADC {:>6}  {:>9.2} mV",
            reading.channel.index(), reading.label, reading.raw, reading.millivolts
        );
    }
    println!("  Outcome: {}", report.outcome);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port_without_config() {
        let args = Args::parse_from(["adc-telemetry-cli", "--host", "10.0.0.9", "--port", "5176"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.node.endpoint, Endpoint::new("10.0.0.9", 5176));
        assert_eq!(config.node.interval_ms, 60_000);
    }

    #[test]
    fn test_missing_endpoint_is_an_error() {
        let args = Args::parse_from(["adc-telemetry-cli", "--host", "10.0.0.9"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "adc-telemetry-cli",
            "--host",
            "collector",
            "--port",
            "80",
            "--path",
            "/phpfiles/save_val.php",
            "--interval-ms",
            "5000",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.node.endpoint.path, "/phpfiles/save_val.php");
        assert_eq!(config.node.interval_ms, 5000);
    }
}
