//! Configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/daq_usb_serial.toml` (or an explicit path)
//! 2. Environment variables prefixed with `DAQ_USB_`, nested with `__`
//!
//! Every section is optional; a missing file yields the defaults.
//!
//! # Example
//! ```no_run
//! use daq_usb_serial::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! let registry = config.build_registry();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ```toml
//! [application]
//! log_level = "debug"
//!
//! [serial]
//! baud_rate = 115200
//! parity = "even"
//!
//! [ftdi]
//! baud_policy = "strict"
//!
//! [registry]
//! test_mode = true
//! ```

use crate::logging::OutputFormat;
use daq_core::serial::SerialOpenOptions;
use daq_driver_ftdi::BaudPolicy;
use daq_hardware::{DriverRegistry, RegistryConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/daq_usb_serial.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "DAQ_USB_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Default options for opening serial ports
    pub serial: SerialOpenOptions,
    /// FTDI driver settings
    pub ftdi: FtdiConfig,
    /// Driver registry settings
    pub registry: RegistryConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "daq-usb-serial".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::default(),
        }
    }
}

/// FTDI driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtdiConfig {
    /// Handling of baud rates missing from the divisor table
    pub baud_policy: BaudPolicy,
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// Example override: `DAQ_USB_SERIAL__BAUD_RATE=115200`
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// Provider stack: defaults, then the TOML file, then the environment.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.application.name.trim().is_empty() {
            return Err("application.name must not be empty".to_string());
        }

        if self.serial.baud_rate == 0 {
            return Err("serial.baud_rate must be greater than 0".to_string());
        }

        if self.ftdi.baud_policy == BaudPolicy::Strict
            && daq_driver_ftdi::baud::lookup(self.serial.baud_rate).is_none()
        {
            return Err(format!(
                "serial.baud_rate {} is not supported by FTDI devices and ftdi.baud_policy is strict",
                self.serial.baud_rate
            ));
        }

        Ok(())
    }

    /// Build the startup driver registry described by this configuration.
    pub fn build_registry(&self) -> DriverRegistry {
        DriverRegistry::from_config(&self.registry, self.ftdi.baud_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_core::serial::{DataBits, FlowControl, Parity, StopBits};
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.ftdi.baud_policy, BaudPolicy::Fallback);
        assert!(!config.registry.test_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_full_file() {
        let file = write_config(
            r#"
            [application]
            name = "bench"
            log_level = "debug"
            log_format = "json"

            [serial]
            baud_rate = 115200
            data_bits = 7
            stop_bits = 2
            parity = "even"
            flow_control = "hardware"

            [ftdi]
            baud_policy = "strict"

            [registry]
            test_mode = true
            "#,
        );

        let config = AppConfig::load_from(file.path()).unwrap();

        assert_eq!(config.application.name, "bench");
        assert_eq!(config.application.log_format, OutputFormat::Json);
        assert_eq!(
            config.serial,
            SerialOpenOptions::default()
                .with_baud_rate(115_200)
                .with_data_bits(DataBits::Seven)
                .with_stop_bits(StopBits::Two)
                .with_parity(Parity::Even)
                .with_flow_control(FlowControl::Hardware)
        );
        assert_eq!(config.ftdi.baud_policy, BaudPolicy::Strict);
        assert!(config.registry.test_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[serial]\nbaud_rate = 57600\n");

        let config = AppConfig::load_from(file.path()).unwrap();

        assert_eq!(config.serial.baud_rate, 57600);
        assert_eq!(config.serial.parity, Parity::None);
        assert_eq!(config.application.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_invalid_data_bits_rejected() {
        let file = write_config("[serial]\ndata_bits = 9\n");
        assert!(AppConfig::load_from(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config("[serial]\nbaud_rate = 57600\n");
        std::env::set_var("DAQ_USB_SERIAL__BAUD_RATE", "230400");
        std::env::set_var("DAQ_USB_REGISTRY__TEST_MODE", "true");

        let result = AppConfig::load_from(file.path());

        std::env::remove_var("DAQ_USB_SERIAL__BAUD_RATE");
        std::env::remove_var("DAQ_USB_REGISTRY__TEST_MODE");

        let config = result.unwrap();
        assert_eq!(config.serial.baud_rate, 230_400);
        assert!(config.registry.test_mode);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AppConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.application.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_policy_requires_table_rate() {
        let mut config = AppConfig::default();
        config.ftdi.baud_policy = BaudPolicy::Strict;
        config.serial.baud_rate = 14_400;
        assert!(config.validate().unwrap_err().contains("14400"));

        config.ftdi.baud_policy = BaudPolicy::Fallback;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_baud_rejected() {
        let mut config = AppConfig::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_registry() {
        let mut config = AppConfig::default();
        assert!(!config.build_registry().is_test_mode());

        config.registry.test_mode = true;
        let registry = config.build_registry();
        assert!(registry.is_test_mode());
        assert!(registry.find_driver_for_device(0xffff, 0xffff).is_some());
    }
}
