//! # rvgen Binary
//!
//! Automatic generator start/stop controller driven by battery voltage and,
//! optionally, ambient temperature.
//!
//! # Usage
//!
//! ```bash
//! # Run against the simulated plant
//! rvgen --simulate
//!
//! # Run on the target with an explicit config file
//! rvgen --config /etc/rvgen/rvgen.toml --driver linux
//!
//! # Print the effective configuration (file + environment) and exit
//! VOLTAGE_START=12.3 rvgen --check-config
//! ```

use clap::Parser;
use rvgen_common::hal::config::GeneratorConfig;
use rvgen_hal::core::GeneratorCore;
use rvgen_hal::driver_registry::DriverRegistry;
use rvgen_hal::drivers::{default_driver, register_all_drivers};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// rvgen - automatic generator start/stop controller
#[derive(Parser, Debug)]
#[command(name = "rvgen")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Automatic generator start/stop controller with pluggable drivers")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file. Without it /etc/rvgen/rvgen.toml is
    /// used when present, built-in defaults otherwise. Environment variables
    /// override both.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force the simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Driver to load
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Validate and print the effective configuration, then exit
    #[arg(long)]
    check_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("rvgen startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Resolve before tracing so the configured log level applies; report
    // the error once tracing is up.
    let config = GeneratorConfig::resolve(args.config.as_deref());
    let level = match (&config, args.verbose) {
        (_, true) => Level::DEBUG,
        (Ok(config), false) => config.shared.log_level.into(),
        (Err(_), false) => Level::INFO,
    };
    setup_tracing(level, args.json);
    let config = config?;

    if args.check_config {
        println!("{}", toml::to_string_pretty(&redacted(&config))?);
        return Ok(());
    }

    info!("rvgen v{} starting...", env!("CARGO_PKG_VERSION"));

    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else {
        args.driver.clone().unwrap_or_else(|| default_driver().to_string())
    };

    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry);

    let mut core = GeneratorCore::new(config, registry)?;
    core.init(&driver_name)?;

    // The handler drops the relays itself; the loop may be mid-pulse.
    let shutdown = core.shutdown_handle();
    let relay = core.relay_handle();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        if let Some(relay) = &relay {
            if let Err(e) = relay.force_all_inactive() {
                error!("Failed to force relays inactive: {e}");
            }
        }
        shutdown.trigger();
    })?;

    if let Err(e) = core.run() {
        error!("Control loop error: {}", e);
    }

    core.shutdown()?;

    info!("rvgen shutdown complete");
    Ok(())
}

/// Configuration with secrets masked, for printing.
fn redacted(config: &GeneratorConfig) -> GeneratorConfig {
    let mut config = config.clone();
    if let Some(smtp) = config.smtp.as_mut() {
        if smtp.password.is_some() {
            smtp.password = Some("********".to_string());
        }
    }
    config
}

/// Setup tracing subscriber.
fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
