//! # daq-usb-serial
//!
//! Serial ports over USB-to-serial bridge chips, driven entirely through a
//! minimal USB device capability supplied by the host.
//!
//! ## Crate Structure
//!
//! - **`daq_core`**: the `UsbDevice` capability, the `SerialPort` and
//!   `SerialDriver` contracts, open options and the error taxonomy.
//! - **`daq_driver_ftdi`**: the FTDI vendor protocol (`FtdiSerial`, `FtdiDriver`).
//! - **`daq_driver_mock`**: `MockSerial`/`MockSerialDriver` test doubles and the
//!   recording `MockUsbDevice`.
//! - **`daq_hardware`**: the `DriverRegistry` matching devices to drivers.
//!
//! This crate adds the application layer on top:
//!
//! - **`config`**: Figment-based `AppConfig` (TOML file plus `DAQ_USB_` env overrides).
//! - **`logging`**: `tracing-subscriber` setup driven by `AppConfig`.
//! - **`diagnostics`**: registry reports used by the `daq_usb_serial` binary.
//!
//! ## Example
//!
//! ```rust,ignore
//! use daq_usb_serial::{config::AppConfig, SerialOpenOptions};
//!
//! let config = AppConfig::load()?;
//! let registry = config.build_registry();
//!
//! // `device` comes from the host's enumeration and permission flow
//! let mut port = registry.connect(device)?;
//! port.open(config.serial).await?;
//! port.write(b"*IDN?\r\n").await?;
//! let reply = port.read(64).await?;
//! port.close().await?;
//! ```

pub mod config;
pub mod diagnostics;
pub mod logging;

pub use daq_core::{
    wrap_shared, DataBits, DeviceFilter, DynSerialPort, FlowControl, Parity, SerialDriver,
    SerialError, SerialOpenOptions, SerialPort, SerialResult, SharedSerialPort, StateError,
    StopBits, TransferStatus, UsbDevice, UsbError,
};
pub use daq_driver_ftdi::{BaudPolicy, FtdiDriver, FtdiSerial, ModemStatus, PortState};
pub use daq_driver_mock::{MockSerial, MockSerialDriver, MockUsbDevice};
pub use daq_hardware::{DriverRegistry, RegistryConfig};
