//! CLI Entry Point for daq-usb-serial
//!
//! Inspects the driver registry without touching hardware:
//! - `drivers`: list registered drivers and the VID/PID pairs they claim
//! - `match <vid> <pid>`: show which driver would handle a device
//!
//! # Usage
//!
//! ```bash
//! daq_usb_serial drivers
//! daq_usb_serial --test-mode match 0403 6001
//! DAQ_USB_FTDI__BAUD_POLICY=strict daq_usb_serial --config lab.toml drivers
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use daq_usb_serial::config::{AppConfig, DEFAULT_CONFIG_PATH};
use daq_usb_serial::{diagnostics, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daq_usb_serial")]
#[command(about = "USB serial driver registry diagnostics", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Register the mock driver (VID/PID ffff:ffff)
    #[arg(long, global = true)]
    test_mode: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered drivers and their device filters
    Drivers,

    /// Show the driver matching a device
    Match {
        /// Vendor ID in hex (e.g. 0403)
        #[arg(value_parser = diagnostics::parse_hex_id)]
        vendor_id: u16,

        /// Product ID in hex (e.g. 6001)
        #[arg(value_parser = diagnostics::parse_hex_id)]
        product_id: u16,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = AppConfig::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if cli.test_mode {
        config.registry.test_mode = true;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    logging::init_from_config(&config).map_err(|e| anyhow!(e))?;
    tracing::debug!(config = %path.display(), "Configuration loaded");

    let registry = config.build_registry();

    match cli.command {
        Commands::Drivers => print!("{}", diagnostics::driver_report(&registry)),
        Commands::Match {
            vendor_id,
            product_id,
        } => println!(
            "{}",
            diagnostics::match_report(&registry, vendor_id, product_id)
        ),
    }

    Ok(())
}
