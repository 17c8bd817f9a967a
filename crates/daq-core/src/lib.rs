//! `daq-core`
//!
//! Core trait definitions and types for talking to USB-attached instruments
//! through a transport-independent serial interface.
//!
//! ## Layers
//!
//! - **Device capability** ([`usb::UsbDevice`]): what the host USB stack must expose
//! - **Serial port** ([`serial::SerialPort`]): uniform open/close/read/write contract
//! - **Serial driver** ([`driver::SerialDriver`]): factory from device handle to port,
//!   plus the VID/PID filters used for matching
//!
//! Concrete drivers live in their own crates (`daq-driver-ftdi`,
//! `daq-driver-mock`) and are matched to devices by the registry in
//! `daq-hardware`.

pub mod driver;
pub mod error;
pub mod serial;
pub mod usb;

pub use driver::{DeviceFilter, SerialDriver};
pub use error::{SerialError, SerialResult, StateError};
pub use serial::{
    wrap_shared, DataBits, DynSerialPort, FlowControl, Parity, SerialOpenOptions, SerialPort,
    SharedSerialPort, StopBits,
};
pub use usb::{TransferStatus, UsbDevice, UsbError};
