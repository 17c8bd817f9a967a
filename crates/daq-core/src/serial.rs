//! Serial Port Abstractions for Driver Crates
//!
//! This module defines the transport-independent serial contract shared by all
//! driver crates, plus the line settings used to open a port.
//!
//! # Types
//!
//! - [`SerialPort`]: open/close/read/write contract implemented by every driver
//! - [`SerialOpenOptions`]: baud rate and line characteristics (defaults 9600 8N1)
//! - [`DynSerialPort`]: type-erased boxed port as returned by drivers
//! - [`SharedSerialPort`]: async-mutex wrapper for handing one port to several tasks
//!
//! # Lifecycle
//!
//! A port is created closed by its driver, becomes open on a successful
//! [`SerialPort::open`], and returns to closed on [`SerialPort::close`]. Every
//! operation except `open` requires an open port; `open` requires a closed one.
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_core::serial::{SerialOpenOptions, SerialPort};
//!
//! async fn poll(port: &mut dyn SerialPort) -> daq_core::error::SerialResult<()> {
//!     port.open(SerialOpenOptions::default().with_baud_rate(115_200)).await?;
//!     port.write(b"*IDN?\r\n").await?;
//!
//!     // Short reads are normal: an empty buffer means "nothing queued yet".
//!     let reply = port.read(64).await?;
//!     tracing::debug!(len = reply.len(), "Got reply");
//!
//!     port.close().await
//! }
//! ```

use crate::error::SerialResult;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

// =============================================================================
// Line Settings
// =============================================================================

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    /// 7 data bits
    Seven,
    /// 8 data bits
    #[default]
    Eight,
}

impl DataBits {
    /// Number of bits as an integer.
    pub fn bits(&self) -> u8 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("Invalid data bits {}: must be 7 or 8", other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(value: DataBits) -> Self {
        value.bits()
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    /// 1 stop bit
    #[default]
    One,
    /// 2 stop bits
    Two,
}

impl StopBits {
    /// Number of bits as an integer.
    pub fn bits(&self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("Invalid stop bits {}: must be 1 or 2", other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(value: StopBits) -> Self {
        value.bits()
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No handshake
    #[default]
    None,
    /// RTS/CTS hardware handshake
    Hardware,
}

/// Default baud rate used when none is requested.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Settings applied when a port is opened.
///
/// Every field is optional in serialized form and falls back to 9600 baud,
/// 8 data bits, 1 stop bit, no parity and no flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialOpenOptions {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Parity mode
    pub parity: Parity,
    /// Flow control mode
    pub flow_control: FlowControl,
}

impl Default for SerialOpenOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            flow_control: FlowControl::default(),
        }
    }
}

impl SerialOpenOptions {
    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the data bits.
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the stop bits.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the parity mode.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the flow control mode.
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}

// =============================================================================
// Serial Port Trait
// =============================================================================

/// Uniform serial contract hiding the underlying transport.
///
/// Implementations are single-reader/single-writer: overlapping calls on one
/// port must be serialized by the caller (see [`SharedSerialPort`]).
#[async_trait]
pub trait SerialPort: Send {
    /// Open the port with the given settings.
    ///
    /// Fails with [`StateError::AlreadyOpen`](crate::error::StateError::AlreadyOpen)
    /// if the port is already open.
    async fn open(&mut self, options: SerialOpenOptions) -> SerialResult<()>;

    /// Release all transport resources.
    ///
    /// Cleanup is best-effort: failures of the underlying handle are logged and
    /// the port still ends up closed. Fails with
    /// [`StateError::NotOpen`](crate::error::StateError::NotOpen) on a closed port.
    async fn close(&mut self) -> SerialResult<()>;

    /// Read at most `length` bytes.
    ///
    /// Returning fewer bytes than requested, including none, means no more data
    /// is currently available and is not an error.
    async fn read(&mut self, length: usize) -> SerialResult<Bytes>;

    /// Write the whole buffer, suspending until the transport accepts it.
    async fn write(&mut self, data: &[u8]) -> SerialResult<()>;

    /// Whether the port is currently open.
    fn is_open(&self) -> bool;
}

/// Type-erased boxed serial port.
pub type DynSerialPort = Box<dyn SerialPort>;

/// Serial port shared between tasks.
///
/// The mutex serializes reads and writes so a polling task and a command task
/// can use the same port without interleaving transfers.
pub type SharedSerialPort = Arc<Mutex<DynSerialPort>>;

/// Create a [`SharedSerialPort`] from a type-erased port.
pub fn wrap_shared(port: DynSerialPort) -> SharedSerialPort {
    Arc::new(Mutex::new(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_9600_8n1() {
        let options = SerialOpenOptions::default();
        assert_eq!(options.baud_rate, 9600);
        assert_eq!(options.data_bits, DataBits::Eight);
        assert_eq!(options.stop_bits, StopBits::One);
        assert_eq!(options.parity, Parity::None);
        assert_eq!(options.flow_control, FlowControl::None);
    }

    #[test]
    fn test_builder_methods() {
        let options = SerialOpenOptions::default()
            .with_baud_rate(115_200)
            .with_data_bits(DataBits::Seven)
            .with_stop_bits(StopBits::Two)
            .with_parity(Parity::Even)
            .with_flow_control(FlowControl::Hardware);

        assert_eq!(options.baud_rate, 115_200);
        assert_eq!(options.data_bits.bits(), 7);
        assert_eq!(options.stop_bits.bits(), 2);
        assert_eq!(options.parity, Parity::Even);
        assert_eq!(options.flow_control, FlowControl::Hardware);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: SerialOpenOptions = toml::from_str("baud_rate = 19200\nparity = \"odd\"").unwrap();
        assert_eq!(options.baud_rate, 19200);
        assert_eq!(options.parity, Parity::Odd);
        assert_eq!(options.data_bits, DataBits::Eight);
        assert_eq!(options.stop_bits, StopBits::One);

        let empty: SerialOpenOptions = toml::from_str("").unwrap();
        assert_eq!(empty, SerialOpenOptions::default());
    }

    #[test]
    fn test_bit_counts_serialize_as_integers() {
        let options = SerialOpenOptions::default().with_data_bits(DataBits::Seven);
        let json = serde_json::to_value(options).unwrap();
        assert_eq!(json["data_bits"], 7);
        assert_eq!(json["stop_bits"], 1);
    }

    #[test]
    fn test_invalid_bit_counts_rejected() {
        assert!(toml::from_str::<SerialOpenOptions>("data_bits = 6").is_err());
        assert!(toml::from_str::<SerialOpenOptions>("stop_bits = 3").is_err());
        assert!(DataBits::try_from(9).is_err());
        assert_eq!(StopBits::try_from(2), Ok(StopBits::Two));
    }
}
