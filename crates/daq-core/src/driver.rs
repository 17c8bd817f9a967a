//! Serial Driver Factory Types
//!
//! A driver turns a raw USB device handle into a [`SerialPort`] and declares
//! which chips it can drive. Drivers are registered with the `DriverRegistry`
//! in `daq-hardware`, which matches physical devices against
//! [`SerialDriver::supported_devices`].
//!
//! # Example: Implementing a Driver
//!
//! ```rust,ignore
//! use daq_core::driver::{DeviceFilter, SerialDriver};
//! use daq_core::serial::DynSerialPort;
//! use daq_core::usb::UsbDevice;
//!
//! static CP210X_DEVICES: &[DeviceFilter] = &[DeviceFilter::new(0x10c4, 0xea60)];
//!
//! pub struct Cp210xDriver;
//!
//! impl SerialDriver for Cp210xDriver {
//!     fn driver_name(&self) -> &'static str { "CP210x" }
//!     fn supported_devices(&self) -> &[DeviceFilter] { CP210X_DEVICES }
//!
//!     fn connect(&self, device: Box<dyn UsbDevice>) -> DynSerialPort {
//!         Box::new(Cp210xSerial::new(device))
//!     }
//! }
//! ```

use crate::serial::DynSerialPort;
use crate::usb::UsbDevice;
use serde::{Deserialize, Serialize};

/// Exact-match identity of a supported chip variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFilter {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
}

impl DeviceFilter {
    /// Create a filter for one VID/PID pair.
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Whether a device with these IDs matches the filter.
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl std::fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Factory producing serial ports for the devices it supports.
///
/// `connect` performs no I/O; the returned port is closed until
/// [`SerialPort::open`](crate::serial::SerialPort::open) is called. The port
/// takes exclusive ownership of the device handle.
pub trait SerialDriver: Send + Sync {
    /// Unique driver name used for lookup and registration.
    fn driver_name(&self) -> &'static str;

    /// VID/PID pairs this driver can handle.
    fn supported_devices(&self) -> &[DeviceFilter];

    /// Wrap a device handle in a closed serial port.
    fn connect(&self, device: Box<dyn UsbDevice>) -> DynSerialPort;

    /// Whether any supported filter matches the given IDs.
    fn supports(&self, vendor_id: u16, product_id: u16) -> bool {
        self.supported_devices()
            .iter()
            .any(|filter| filter.matches(vendor_id, product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_exact_pair_only() {
        let filter = DeviceFilter::new(0x0403, 0x6001);
        assert!(filter.matches(0x0403, 0x6001));
        assert!(!filter.matches(0x0403, 0x6010));
        assert!(!filter.matches(0x0404, 0x6001));
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(DeviceFilter::new(0xffff, 0x0001).to_string(), "ffff:0001");
    }

    #[test]
    fn test_filter_serde_roundtrip_fields() {
        let filter: DeviceFilter =
            toml::from_str("vendor_id = 1027\nproduct_id = 24577").unwrap();
        assert_eq!(filter, DeviceFilter::new(0x0403, 0x6001));
    }
}
