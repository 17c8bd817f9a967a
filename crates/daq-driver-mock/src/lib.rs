//! Mock Serial Drivers for daq-usb-serial
//!
//! This crate provides test doubles for developing and testing serial
//! consumers without physical hardware.
//!
//! # Available Mocks
//!
//! - [`MockSerial`] - Serial port with a scripted FIFO response queue and a write log
//! - [`MockSerialDriver`] - Driver claiming the fictional `ffff:ffff` device and
//!   handing out [`MockSerial`] ports
//! - [`MockUsbDevice`] - Recording fake of the USB device capability, used to
//!   test protocol drivers such as the FTDI driver
//!
//! # Test Mode
//!
//! The registry in `daq-hardware` registers [`MockSerialDriver`] alongside the
//! production drivers when test mode is enabled:
//!
//! ```rust,ignore
//! use daq_hardware::DriverRegistry;
//!
//! let registry = DriverRegistry::new();
//! let mock = registry.enable_test_mode();
//!
//! let driver = registry.find_driver_for_device(0xffff, 0xffff).unwrap();
//! let port = driver.connect(Box::new(MockUsbDevice::new(0xffff, 0xffff)));
//! mock.last_mock_serial().unwrap().queue_response(b"READY\r\n");
//! ```

mod mock_serial;
mod mock_usb;

pub use mock_serial::{MockSerial, MockSerialDriver, MOCK_DEVICE, MOCK_DRIVER_NAME};
pub use mock_usb::{single_port_configuration, MockUsbDevice, UsbCall};
