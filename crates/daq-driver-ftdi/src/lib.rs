//! FTDI USB-to-serial driver for rust-daq
//!
//! Implements the FTDI vendor protocol on top of the [`daq_core::usb::UsbDevice`]
//! capability, so the same code runs against any host USB stack.
//!
//! ## Supported Chips
//!
//! | PID      | Chip          |
//! |----------|---------------|
//! | `0x6001` | FT232R / FT245R |
//! | `0x6010` | FT2232C/D/H   |
//! | `0x6011` | FT4232H       |
//! | `0x6014` | FT232H        |
//! | `0x6015` | FT-X series   |
//!
//! All under vendor ID `0x0403`. Only interface 0 is driven on multi-port chips.
//!
//! ## Baud Rates
//!
//! Rates come from a fixed divisor table (300 to 921600). Other rates fall back
//! to 9600 with a warning unless the driver is built with
//! [`BaudPolicy::Strict`].

pub mod baud;
pub mod framing;
mod ftdi;

pub use baud::{BaudDivisor, BaudPolicy};
pub use framing::ModemStatus;
pub use ftdi::{
    Endpoints, FtdiDriver, FtdiSerial, PortState, FTDI_DRIVER_NAME, FTDI_VENDOR_ID, SIO_RESET,
    SIO_RTS_CTS_HS, SIO_SET_BAUD_RATE, SIO_SET_DATA, SIO_SET_FLOW_CTRL,
};
