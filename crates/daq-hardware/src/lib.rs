//! `daq-hardware`
//!
//! Matches USB devices to the serial drivers that can talk to them. See
//! [`registry::DriverRegistry`].

pub mod registry;

pub use registry::{DriverRegistry, RegistryConfig};

// Drivers installed by the registry, re-exported for callers that build their own
pub use daq_driver_ftdi::{BaudPolicy, FtdiDriver, FTDI_DRIVER_NAME};
pub use daq_driver_mock::{MockSerial, MockSerialDriver, MOCK_DRIVER_NAME};
