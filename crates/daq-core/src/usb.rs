//! USB Device Capability
//!
//! The minimal set of operations a host USB stack must expose for the serial
//! drivers in this workspace. Nothing here talks to hardware: hosts implement
//! [`UsbDevice`] over whatever stack they have (WebUSB, libusb, nusb), and tests
//! implement it with a scripted fake.
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_core::usb::{ControlSetup, UsbDevice};
//!
//! async fn reset(device: &mut dyn UsbDevice) -> anyhow::Result<()> {
//!     device.open().await?;
//!     device.claim_interface(0).await?;
//!     let result = device.control_transfer_out(ControlSetup::vendor(0, 0, 0), &[]).await?;
//!     anyhow::ensure!(result.status.is_ok(), "reset rejected: {}", result.status);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for capability-layer results.
pub type UsbResult<T> = std::result::Result<T, UsbError>;

/// Failure raised by the capability layer itself.
///
/// Distinct from a transfer that completed with a non-success
/// [`TransferStatus`]: this means the operation could not be performed at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("USB {operation} failed: {message}")]
pub struct UsbError {
    /// Capability operation that failed (e.g. "claim_interface")
    pub operation: &'static str,
    /// Host-provided description
    pub message: String,
}

impl UsbError {
    /// Create a new capability error.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// Completion status of a USB transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Transfer completed
    Ok,
    /// Endpoint halted
    Stall,
    /// Device sent more data than requested
    Babble,
}

impl TransferStatus {
    /// Wire name of the status ("ok", "stall", "babble").
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Ok => "ok",
            TransferStatus::Stall => "stall",
            TransferStatus::Babble => "babble",
        }
    }

    /// True when the transfer completed successfully.
    pub fn is_ok(&self) -> bool {
        matches!(self, TransferStatus::Ok)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an IN (device to host) transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InTransfer {
    /// Completion status
    pub status: TransferStatus,
    /// Bytes received (may be shorter than requested)
    pub data: Bytes,
}

impl InTransfer {
    /// A completed transfer carrying `data`.
    pub fn ok(data: impl Into<Bytes>) -> Self {
        Self {
            status: TransferStatus::Ok,
            data: data.into(),
        }
    }

    /// A transfer that completed with `status` and no data.
    pub fn with_status(status: TransferStatus) -> Self {
        Self {
            status,
            data: Bytes::new(),
        }
    }
}

/// Result of an OUT (host to device) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutTransfer {
    /// Completion status
    pub status: TransferStatus,
    /// Number of bytes the device accepted
    pub bytes_written: usize,
}

impl OutTransfer {
    /// A completed transfer of `bytes_written` bytes.
    pub fn ok(bytes_written: usize) -> Self {
        Self {
            status: TransferStatus::Ok,
            bytes_written,
        }
    }

    /// A transfer that completed with `status` and nothing written.
    pub fn with_status(status: TransferStatus) -> Self {
        Self {
            status,
            bytes_written: 0,
        }
    }
}

/// Control request type (bits 5..6 of bmRequestType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// USB-defined request
    Standard,
    /// Class-defined request
    Class,
    /// Vendor-defined request
    Vendor,
}

/// Control request recipient (bits 0..4 of bmRequestType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The device as a whole
    Device,
    /// A specific interface
    Interface,
    /// A specific endpoint
    Endpoint,
    /// Anything else
    Other,
}

/// Setup packet for an OUT control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlSetup {
    /// Request type
    pub request_type: RequestType,
    /// Request recipient
    pub recipient: Recipient,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
}

impl ControlSetup {
    /// A vendor request addressed to the device.
    pub fn vendor(request: u8, value: u16, index: u16) -> Self {
        Self {
            request_type: RequestType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index,
        }
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// Endpoint direction relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// Endpoint transfer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    /// Bulk endpoint
    Bulk,
    /// Interrupt endpoint
    Interrupt,
    /// Isochronous endpoint
    Isochronous,
}

/// Endpoint descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbEndpoint {
    /// Endpoint number without the direction bit
    pub endpoint_number: u8,
    /// Transfer direction
    pub direction: Direction,
    /// Transfer type
    pub transfer_type: EndpointType,
}

impl UsbEndpoint {
    /// A bulk endpoint.
    pub fn bulk(endpoint_number: u8, direction: Direction) -> Self {
        Self {
            endpoint_number,
            direction,
            transfer_type: EndpointType::Bulk,
        }
    }
}

/// One alternate setting of an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbAlternate {
    /// bAlternateSetting
    pub alternate_setting: u8,
    /// Endpoints in descriptor order
    pub endpoints: Vec<UsbEndpoint>,
}

/// Interface descriptor with its alternate settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbInterface {
    /// bInterfaceNumber
    pub interface_number: u8,
    /// Alternate settings in descriptor order
    pub alternates: Vec<UsbAlternate>,
}

/// The active configuration of a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbConfiguration {
    /// bConfigurationValue
    pub configuration_value: u8,
    /// Interfaces in descriptor order
    pub interfaces: Vec<UsbInterface>,
}

impl UsbConfiguration {
    /// Look up an interface by number.
    pub fn interface(&self, interface_number: u8) -> Option<&UsbInterface> {
        self.interfaces
            .iter()
            .find(|iface| iface.interface_number == interface_number)
    }
}

// =============================================================================
// Capability Trait
// =============================================================================

/// Operations a host USB stack exposes for one physical device.
///
/// A handle is owned by exactly one serial port at a time, so every operation
/// takes `&mut self`. Transfers that complete with a non-success status return
/// `Ok` with that status; `Err` is reserved for operations that could not be
/// performed at all.
#[async_trait]
pub trait UsbDevice: Send {
    /// USB vendor ID.
    fn vendor_id(&self) -> u16;

    /// USB product ID.
    fn product_id(&self) -> u16;

    /// The currently selected configuration, if any.
    fn configuration(&self) -> Option<UsbConfiguration>;

    /// Open the device handle.
    async fn open(&mut self) -> UsbResult<()>;

    /// Close the device handle.
    async fn close(&mut self) -> UsbResult<()>;

    /// Select a configuration by its bConfigurationValue.
    async fn select_configuration(&mut self, configuration_value: u8) -> UsbResult<()>;

    /// Claim an interface for exclusive use.
    async fn claim_interface(&mut self, interface_number: u8) -> UsbResult<()>;

    /// Release a previously claimed interface.
    async fn release_interface(&mut self, interface_number: u8) -> UsbResult<()>;

    /// Issue an OUT control transfer.
    async fn control_transfer_out(
        &mut self,
        setup: ControlSetup,
        data: &[u8],
    ) -> UsbResult<OutTransfer>;

    /// Issue a bulk IN transfer of up to `length` bytes.
    async fn transfer_in(&mut self, endpoint_number: u8, length: usize) -> UsbResult<InTransfer>;

    /// Issue a bulk OUT transfer.
    async fn transfer_out(&mut self, endpoint_number: u8, data: &[u8]) -> UsbResult<OutTransfer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_status_strings() {
        assert_eq!(TransferStatus::Ok.as_str(), "ok");
        assert_eq!(TransferStatus::Stall.to_string(), "stall");
        assert_eq!(TransferStatus::Babble.to_string(), "babble");
        assert!(TransferStatus::Ok.is_ok());
        assert!(!TransferStatus::Stall.is_ok());
    }

    #[test]
    fn test_transfer_status_serde() {
        let json = serde_json::to_string(&TransferStatus::Stall).unwrap();
        assert_eq!(json, "\"stall\"");
        let parsed: TransferStatus = serde_json::from_str("\"babble\"").unwrap();
        assert_eq!(parsed, TransferStatus::Babble);
    }

    #[test]
    fn test_vendor_setup() {
        let setup = ControlSetup::vendor(3, 0x4138, 0);
        assert_eq!(setup.request_type, RequestType::Vendor);
        assert_eq!(setup.recipient, Recipient::Device);
        assert_eq!(setup.request, 3);
        assert_eq!(setup.value, 0x4138);
    }

    #[test]
    fn test_configuration_interface_lookup() {
        let config = UsbConfiguration {
            configuration_value: 1,
            interfaces: vec![
                UsbInterface {
                    interface_number: 0,
                    alternates: vec![],
                },
                UsbInterface {
                    interface_number: 1,
                    alternates: vec![UsbAlternate::default()],
                },
            ],
        };

        assert_eq!(config.interface(1).map(|i| i.alternates.len()), Some(1));
        assert!(config.interface(2).is_none());
    }

    #[test]
    fn test_transfer_constructors() {
        let transfer = InTransfer::ok(vec![1u8, 2, 3]);
        assert!(transfer.status.is_ok());
        assert_eq!(&transfer.data[..], &[1, 2, 3]);

        let transfer = InTransfer::with_status(TransferStatus::Stall);
        assert!(transfer.data.is_empty());

        assert_eq!(OutTransfer::ok(4).bytes_written, 4);
        assert_eq!(OutTransfer::with_status(TransferStatus::Babble).bytes_written, 0);
    }
}
