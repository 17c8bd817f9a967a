//! Error types for serial ports and USB transports.
//!
//! The taxonomy follows how callers are expected to react:
//!
//! - **`SerialError::State`**: an operation was attempted in the wrong lifecycle
//!   state ("already open", "not open"). Always a usage error; never retried.
//! - **`SerialError::Transfer`**: the transport reported a non-success status for a
//!   write or for a control transfer during the open handshake.
//! - **`SerialError::OpenFailed`**: any failure during the open handshake. The port
//!   is guaranteed to be closed again and the original cause is kept as the
//!   error source.
//! - **`SerialError::Device`**: the capability layer itself failed (handle gone,
//!   claim rejected) rather than reporting a transfer status.
//!
//! Short reads are not errors. A read that yields fewer bytes than requested,
//! including zero, is a normal return value meaning "try again later".

use crate::usb::{TransferStatus, UsbError};
use thiserror::Error;

/// Convenience alias for results of serial port operations.
pub type SerialResult<T> = std::result::Result<T, SerialError>;

/// Lifecycle violation on a serial port.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// `open` was called on a port that is already open.
    #[error("already open")]
    AlreadyOpen,
    /// `read`, `write` or `close` was called on a closed port.
    #[error("not open")]
    NotOpen,
}

/// Primary error type for serial port operations.
#[derive(Error, Debug)]
pub enum SerialError {
    /// Operation attempted in the wrong lifecycle state.
    #[error("Serial port {0}")]
    State(#[from] StateError),

    /// The transport reported a non-success transfer status.
    #[error("USB transfer failed with status '{status}'")]
    Transfer {
        /// Status reported by the capability layer
        status: TransferStatus,
    },

    /// The open handshake failed; the port has been closed again.
    #[error("Failed to open serial port: {0}")]
    OpenFailed(#[source] Box<SerialError>),

    /// The USB capability layer returned an error.
    #[error(transparent)]
    Device(#[from] UsbError),

    /// The requested baud rate has no divisor entry and the strict policy is active.
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// No registered driver claims the device.
    #[error("No serial driver for device {vendor_id:04x}:{product_id:04x}")]
    NoDriver {
        /// USB vendor ID of the unmatched device
        vendor_id: u16,
        /// USB product ID of the unmatched device
        product_id: u16,
    },
}

impl SerialError {
    /// Wrap a handshake failure.
    pub fn open_failed(cause: SerialError) -> Self {
        SerialError::OpenFailed(Box::new(cause))
    }

    /// True for lifecycle violations.
    pub fn is_state_error(&self) -> bool {
        matches!(self, SerialError::State(_))
    }

    /// True for non-success transfer statuses.
    pub fn is_transfer_error(&self) -> bool {
        matches!(self, SerialError::Transfer { .. })
    }

    /// True for a failed open handshake.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, SerialError::OpenFailed(_))
    }

    /// The lifecycle violation, if this is one.
    pub fn state(&self) -> Option<StateError> {
        match self {
            SerialError::State(state) => Some(*state),
            _ => None,
        }
    }

    /// The handshake failure cause, if this is an open failure.
    pub fn open_cause(&self) -> Option<&SerialError> {
        match self {
            SerialError::OpenFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<TransferStatus> for SerialError {
    fn from(status: TransferStatus) -> Self {
        SerialError::Transfer { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_state_error_messages() {
        let err = SerialError::from(StateError::AlreadyOpen);
        assert_eq!(err.to_string(), "Serial port already open");
        assert!(err.is_state_error());
        assert_eq!(err.state(), Some(StateError::AlreadyOpen));

        let err = SerialError::from(StateError::NotOpen);
        assert_eq!(err.to_string(), "Serial port not open");
    }

    #[test]
    fn test_transfer_error_carries_status_string() {
        let err = SerialError::from(TransferStatus::Stall);
        assert!(err.is_transfer_error());
        assert!(err.to_string().contains("'stall'"));
    }

    #[test]
    fn test_open_failed_keeps_source() {
        let err = SerialError::open_failed(SerialError::from(TransferStatus::Babble));
        assert!(err.is_open_failure());
        assert!(!err.is_transfer_error());

        let cause = err.open_cause().unwrap();
        assert!(cause.is_transfer_error());

        let source = err.source().unwrap();
        assert!(source.to_string().contains("babble"));
    }

    #[test]
    fn test_device_error_is_transparent() {
        let err = SerialError::from(UsbError::new("claim_interface", "interface busy"));
        assert_eq!(err.to_string(), "USB claim_interface failed: interface busy");
    }

    #[test]
    fn test_no_driver_formats_ids_as_hex() {
        let err = SerialError::NoDriver {
            vendor_id: 0x0403,
            product_id: 0x6001,
        };
        assert_eq!(err.to_string(), "No serial driver for device 0403:6001");
    }
}
