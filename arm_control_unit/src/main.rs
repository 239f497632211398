//! # Arm Control Unit
//!
//! Fixed-rate command loop for a servo arm.
//!
//! Loads the mechanism (TOML file or built-in preset), opens the actuator
//! bus through the driver registry, opens the host channel (stdio or a
//! serial device), runs the startup sequence and then the control loop
//! until SIGINT/SIGTERM.
//!
//! Status lines go to the host channel; logs always go to stderr.

use arm_common::config::{ArmConfig, ConfigError, Preset};
use arm_control_unit::config::{ConfigOverrides, load_config};
use arm_control_unit::cycle::CycleRunner;
use arm_control_unit::transport;
use arm_hal::DriverRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Arm Control Unit: servo arm command loop
#[derive(Parser, Debug)]
#[command(name = "arm_control_unit")]
#[command(version)]
#[command(about = "Framed-command control loop for a multi-joint servo arm")]
struct Args {
    /// Mechanism configuration TOML. Takes precedence over --preset.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Built-in mechanism: four, six, seven, dual-seven (default: seven).
    #[arg(long, value_name = "NAME")]
    preset: Option<Preset>,

    /// Bus driver override (simulation, dynamixel).
    #[arg(long)]
    driver: Option<String>,

    /// Actuator bus serial device override.
    #[arg(long, value_name = "DEV")]
    bus_port: Option<String>,

    /// Host channel serial device; selects the serial transport.
    #[arg(long, value_name = "DEV")]
    port: Option<String>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let overrides = ConfigOverrides {
        driver: args.driver.clone(),
        bus_port: args.bus_port.clone(),
        host_port: args.port.clone(),
    };
    let config = load_config(args.config.as_deref(), args.preset, &overrides);
    setup_tracing(&args, config.as_ref().ok());

    info!("Arm Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config
        .map_err(|e: ConfigError| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&config))
    {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Arm Control Unit shutdown complete");
}

fn run(config: &ArmConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.shared.service_name,
        arm = %config.arm.name,
        joints = config.joints.len(),
        leader = config.leader.len(),
        cycle_ms = config.control.cycle_time_ms,
        "Config OK"
    );

    let registry = DriverRegistry::with_builtin_drivers();
    let bus = registry.create_bus(config)?;
    let host = transport::open(&config.transport)?;

    let mut runner = CycleRunner::new(config, bus, host)?;
    runner.startup();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    runner.run(&running);
    runner.shutdown()?;
    Ok(())
}

/// Setup tracing on stderr. `-v` wins over the configured level.
fn setup_tracing(args: &Args, config: Option<&ArmConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config
            .and_then(|c| c.shared.log_level.as_str().parse().ok())
            .unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
