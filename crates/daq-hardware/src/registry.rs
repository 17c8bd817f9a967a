//! Driver Registry for USB Serial Devices
//!
//! Central catalog of installed [`SerialDriver`]s. Given a device's VID/PID the
//! registry picks the driver that claims it; the driver then wraps the device
//! handle in a [`SerialPort`](daq_core::serial::SerialPort).
//!
//! ```text
//! ┌──────────────┐   vid/pid   ┌────────────────┐  connect  ┌──────────────┐
//! │ host device  │ ──────────▶ │ DriverRegistry │ ────────▶ │ DynSerialPort│
//! │   handle     │             │  FTDI | Mock   │           │  open/read.. │
//! └──────────────┘             └────────────────┘           └──────────────┘
//! ```
//!
//! The registry is an ordinary value: build one at startup and share it as an
//! `Arc<DriverRegistry>`. Tests construct their own or call
//! [`DriverRegistry::reset_registry`] between cases.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use daq_hardware::DriverRegistry;
//!
//! let registry = DriverRegistry::new();
//! let mock = registry.enable_test_mode();
//!
//! let driver = registry.find_driver_for_device(0xffff, 0xffff).unwrap();
//! assert_eq!(driver.driver_name(), "MockSerial");
//!
//! let mut port = registry.connect(Box::new(usb_device))?;
//! port.open(Default::default()).await?;
//! ```

use daq_core::driver::{DeviceFilter, SerialDriver};
use daq_core::error::{SerialError, SerialResult};
use daq_core::serial::DynSerialPort;
use daq_core::usb::UsbDevice;
use daq_driver_ftdi::{BaudPolicy, FtdiDriver};
use daq_driver_mock::{MockSerialDriver, MOCK_DRIVER_NAME};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Startup options for the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Register the mock driver alongside the production drivers
    pub test_mode: bool,
}

// =============================================================================
// Driver Registry
// =============================================================================

/// Ordered set of serial drivers, unique by [`SerialDriver::driver_name`].
///
/// All methods take `&self`; the driver list and the test-mode handle share
/// one internal lock, so every change is applied atomically.
pub struct DriverRegistry {
    inner: RwLock<RegistryInner>,

    /// Baud policy of the FTDI driver installed by `reset_registry`
    baud_policy: BaudPolicy,
}

/// State guarded by the registry lock.
///
/// When `mock` is set, the same `Arc` is the entry named
/// [`MOCK_DRIVER_NAME`] in `drivers`.
#[derive(Default)]
struct RegistryInner {
    /// Registered drivers in registration order
    drivers: Vec<Arc<dyn SerialDriver>>,

    /// Typed handle to the mock driver while test mode is on
    mock: Option<Arc<MockSerialDriver>>,
}

impl RegistryInner {
    fn with_drivers(drivers: Vec<Arc<dyn SerialDriver>>) -> Self {
        Self {
            drivers,
            mock: None,
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.drivers
            .iter()
            .position(|driver| driver.driver_name() == name)
    }
}

impl DriverRegistry {
    /// Registry holding the production driver set (FTDI only).
    pub fn new() -> Self {
        Self::with_baud_policy(BaudPolicy::default())
    }

    /// Production registry whose FTDI driver uses `baud_policy`.
    pub fn with_baud_policy(baud_policy: BaudPolicy) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::with_drivers(Self::production_drivers(
                baud_policy,
            ))),
            baud_policy,
        }
    }

    /// Registry with no drivers at all.
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            baud_policy: BaudPolicy::default(),
        }
    }

    /// Build the startup registry from configuration.
    pub fn from_config(config: &RegistryConfig, baud_policy: BaudPolicy) -> Self {
        let registry = Self::with_baud_policy(baud_policy);
        if config.test_mode {
            registry.enable_test_mode();
        }
        tracing::info!(
            drivers = ?registry.driver_names(),
            test_mode = config.test_mode,
            ?baud_policy,
            "Driver registry initialized"
        );
        registry
    }

    fn production_drivers(baud_policy: BaudPolicy) -> Vec<Arc<dyn SerialDriver>> {
        vec![Arc::new(FtdiDriver::with_baud_policy(baud_policy))]
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First driver, in registration order, whose filters contain the pair.
    pub fn find_driver_for_device(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Option<Arc<dyn SerialDriver>> {
        self.inner
            .read()
            .drivers
            .iter()
            .find(|driver| driver.supports(vendor_id, product_id))
            .cloned()
    }

    /// Driver registered under exactly `name`.
    pub fn find_driver_by_name(&self, name: &str) -> Option<Arc<dyn SerialDriver>> {
        self.inner
            .read()
            .drivers
            .iter()
            .find(|driver| driver.driver_name() == name)
            .cloned()
    }

    /// Snapshot of all registered drivers.
    pub fn all_drivers(&self) -> Vec<Arc<dyn SerialDriver>> {
        self.inner.read().drivers.clone()
    }

    /// Names of all registered drivers, in registration order.
    pub fn driver_names(&self) -> Vec<&'static str> {
        self.inner
            .read()
            .drivers
            .iter()
            .map(|driver| driver.driver_name())
            .collect()
    }

    /// Every filter of every registered driver, in registration order.
    pub fn all_supported_devices(&self) -> Vec<DeviceFilter> {
        self.inner
            .read()
            .drivers
            .iter()
            .flat_map(|driver| driver.supported_devices().iter().copied())
            .collect()
    }

    /// Number of registered drivers.
    pub fn len(&self) -> usize {
        self.inner.read().drivers.len()
    }

    /// True when no driver is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().drivers.is_empty()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Add `driver` unless one with the same name is already registered.
    ///
    /// A duplicate name is a silent no-op: the existing instance stays.
    pub fn register_driver(&self, driver: Arc<dyn SerialDriver>) {
        let mut inner = self.inner.write();
        let name = driver.driver_name();
        if inner.position(name).is_some() {
            tracing::debug!(driver = name, "Driver already registered, keeping existing");
            return;
        }
        tracing::info!(
            driver = name,
            devices = driver.supported_devices().len(),
            "Registered serial driver"
        );
        inner.drivers.push(driver);
    }

    /// Remove the driver called `name`. Returns whether one was removed.
    pub fn unregister_driver(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        let Some(index) = inner.position(name) else {
            return false;
        };

        inner.drivers.remove(index);
        if name == MOCK_DRIVER_NAME {
            inner.mock = None;
        }
        tracing::info!(driver = name, "Unregistered serial driver");
        true
    }

    /// Register the mock driver (VID/PID `ffff:ffff`) next to the production
    /// drivers and return it.
    ///
    /// Calling this again returns the already registered mock. A driver that
    /// was registered under [`MOCK_DRIVER_NAME`] by other means is replaced in
    /// place, so the returned handle is always the instance `connect` uses.
    pub fn enable_test_mode(&self) -> Arc<MockSerialDriver> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.mock.as_ref() {
            return existing.clone();
        }

        let driver = Arc::new(MockSerialDriver::new());
        let entry: Arc<dyn SerialDriver> = driver.clone();
        match inner.position(MOCK_DRIVER_NAME) {
            Some(index) => {
                tracing::debug!(
                    driver = MOCK_DRIVER_NAME,
                    "Replacing untracked mock driver"
                );
                inner.drivers[index] = entry;
            }
            None => inner.drivers.push(entry),
        }
        inner.mock = Some(driver.clone());
        tracing::info!("Driver registry test mode enabled");
        driver
    }

    /// Whether the mock driver installed by [`enable_test_mode`](Self::enable_test_mode)
    /// is registered.
    pub fn is_test_mode(&self) -> bool {
        self.inner.read().mock.is_some()
    }

    /// Restore the production driver set, dropping test mode and custom drivers.
    pub fn reset_registry(&self) {
        *self.inner.write() =
            RegistryInner::with_drivers(Self::production_drivers(self.baud_policy));
        tracing::info!("Driver registry reset to production drivers");
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Match `device` by its IDs and wrap it in a closed serial port.
    pub fn connect(&self, device: Box<dyn UsbDevice>) -> SerialResult<DynSerialPort> {
        let vendor_id = device.vendor_id();
        let product_id = device.product_id();

        let Some(driver) = self.find_driver_for_device(vendor_id, product_id) else {
            tracing::warn!(
                vendor_id = format_args!("{:04x}", vendor_id),
                product_id = format_args!("{:04x}", product_id),
                "No serial driver for device"
            );
            return Err(SerialError::NoDriver {
                vendor_id,
                product_id,
            });
        };

        tracing::debug!(
            driver = driver.driver_name(),
            vendor_id = format_args!("{:04x}", vendor_id),
            product_id = format_args!("{:04x}", product_id),
            "Connecting device"
        );
        Ok(driver.connect(device))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.driver_names())
            .field("test_mode", &self.is_test_mode())
            .field("baud_policy", &self.baud_policy)
            .finish()
    }
}
