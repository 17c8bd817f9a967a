//! FTDI USB-to-serial driver
//!
//! Protocol Overview:
//! - Vendor control requests on the default pipe configure the UART
//! - Open sequence: reset (0), set baud rate (3), set data (4), and set flow
//!   control (2) when hardware flow control is requested
//! - Data flows over the bulk endpoints of interface 0
//! - Every bulk IN packet is prefixed with 2 modem status bytes
//!
//! # Usage
//!
//! ```rust,ignore
//! use daq_core::driver::SerialDriver;
//! use daq_driver_ftdi::FtdiDriver;
//!
//! let driver = FtdiDriver::new();
//! let mut port = driver.connect(device);
//! port.open(SerialOpenOptions::default().with_baud_rate(115_200)).await?;
//! port.write(b"*IDN?\r\n").await?;
//! let reply = port.read(64).await?;
//! ```

use crate::baud::{self, BaudPolicy};
use crate::framing::{self, ModemStatus, MODEM_STATUS_LEN};
use async_trait::async_trait;
use bytes::Bytes;
use daq_core::driver::{DeviceFilter, SerialDriver};
use daq_core::error::{SerialError, SerialResult, StateError};
use daq_core::serial::{DynSerialPort, FlowControl, SerialOpenOptions, SerialPort};
use daq_core::usb::{ControlSetup, Direction, UsbConfiguration, UsbDevice};
use tracing::instrument;

/// Reset the chip (purges both FIFOs).
pub const SIO_RESET: u8 = 0;
/// Set flow control mode.
pub const SIO_SET_FLOW_CTRL: u8 = 2;
/// Set baud rate divisor.
pub const SIO_SET_BAUD_RATE: u8 = 3;
/// Set data bits, parity and stop bits.
pub const SIO_SET_DATA: u8 = 4;
/// wIndex of the flow control request enabling RTS/CTS.
pub const SIO_RTS_CTS_HS: u16 = 0x0100;

const FTDI_INTERFACE: u8 = 0;
const DEFAULT_CONFIGURATION: u8 = 1;

// =============================================================================
// FtdiDriver - SerialDriver implementation
// =============================================================================

/// Name the FTDI driver registers under.
pub const FTDI_DRIVER_NAME: &str = "FTDI";

/// FTDI vendor ID.
pub const FTDI_VENDOR_ID: u16 = 0x0403;

/// FT232R, FT2232, FT4232H, FT232H and FT-X.
static FTDI_DEVICES: &[DeviceFilter] = &[
    DeviceFilter::new(FTDI_VENDOR_ID, 0x6001),
    DeviceFilter::new(FTDI_VENDOR_ID, 0x6010),
    DeviceFilter::new(FTDI_VENDOR_ID, 0x6011),
    DeviceFilter::new(FTDI_VENDOR_ID, 0x6014),
    DeviceFilter::new(FTDI_VENDOR_ID, 0x6015),
];

/// Driver producing [`FtdiSerial`] ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtdiDriver {
    baud_policy: BaudPolicy,
}

impl FtdiDriver {
    /// Driver using the default fallback baud policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver handing out ports with `policy`.
    pub fn with_baud_policy(policy: BaudPolicy) -> Self {
        Self {
            baud_policy: policy,
        }
    }

    /// Baud policy given to every connected port.
    pub fn baud_policy(&self) -> BaudPolicy {
        self.baud_policy
    }
}

impl SerialDriver for FtdiDriver {
    fn driver_name(&self) -> &'static str {
        FTDI_DRIVER_NAME
    }

    fn supported_devices(&self) -> &[DeviceFilter] {
        FTDI_DEVICES
    }

    fn connect(&self, device: Box<dyn UsbDevice>) -> DynSerialPort {
        Box::new(FtdiSerial::with_baud_policy(device, self.baud_policy))
    }
}

// =============================================================================
// FtdiSerial
// =============================================================================

/// Lifecycle state of an [`FtdiSerial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Idle; only `open` is allowed
    Closed,
    /// Handshake in progress
    Opening,
    /// Ready for I/O
    Open,
    /// Teardown in progress
    Closing,
}

/// Bulk endpoint numbers used for data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    /// Bulk IN endpoint
    pub input: u8,
    /// Bulk OUT endpoint
    pub output: u8,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            input: 1,
            output: 2,
        }
    }
}

impl Endpoints {
    /// Endpoints of interface 0, first alternate setting.
    ///
    /// The first endpoint of each direction wins. Directions missing from the
    /// descriptor keep their default number.
    pub fn discover(configuration: Option<&UsbConfiguration>) -> Self {
        let defaults = Self::default();
        let Some(alternate) = configuration
            .and_then(|config| config.interface(FTDI_INTERFACE))
            .and_then(|iface| iface.alternates.first())
        else {
            return defaults;
        };

        let first = |direction: Direction| {
            alternate
                .endpoints
                .iter()
                .find(|endpoint| endpoint.direction == direction)
                .map(|endpoint| endpoint.endpoint_number)
        };
        Self {
            input: first(Direction::In).unwrap_or(defaults.input),
            output: first(Direction::Out).unwrap_or(defaults.output),
        }
    }
}

/// Serial port over an FTDI USB-to-UART chip.
pub struct FtdiSerial {
    device: Box<dyn UsbDevice>,
    state: PortState,
    endpoints: Endpoints,
    baud_policy: BaudPolicy,
    options: Option<SerialOpenOptions>,
    modem_status: Option<ModemStatus>,
}

impl std::fmt::Debug for FtdiSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtdiSerial")
            .field("vendor_id", &format_args!("{:04x}", self.device.vendor_id()))
            .field("product_id", &format_args!("{:04x}", self.device.product_id()))
            .field("state", &self.state)
            .field("endpoints", &self.endpoints)
            .field("baud_policy", &self.baud_policy)
            .finish()
    }
}

impl FtdiSerial {
    /// Wrap `device` in a closed port using the fallback baud policy.
    pub fn new(device: Box<dyn UsbDevice>) -> Self {
        Self::with_baud_policy(device, BaudPolicy::default())
    }

    /// Wrap `device` in a closed port using `baud_policy`.
    pub fn with_baud_policy(device: Box<dyn UsbDevice>, baud_policy: BaudPolicy) -> Self {
        Self {
            device,
            state: PortState::Closed,
            endpoints: Endpoints::default(),
            baud_policy,
            options: None,
            modem_status: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PortState {
        self.state
    }

    /// Endpoints in use (defaults until the first successful open).
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
    }

    /// Status bytes of the most recent successful IN packet, including
    /// status-only packets.
    pub fn modem_status(&self) -> Option<ModemStatus> {
        self.modem_status
    }

    /// Options of the current or most recent open.
    pub fn options(&self) -> Option<SerialOpenOptions> {
        self.options
    }

    async fn vendor_request(&mut self, request: u8, value: u16, index: u16) -> SerialResult<()> {
        tracing::debug!(request, value, index, "FTDI control request");
        let result = self
            .device
            .control_transfer_out(ControlSetup::vendor(request, value, index), &[])
            .await?;
        if !result.status.is_ok() {
            tracing::debug!(request, status = %result.status, "FTDI control request rejected");
            return Err(result.status.into());
        }
        Ok(())
    }

    async fn handshake(&mut self, options: &SerialOpenOptions) -> SerialResult<()> {
        self.device.open().await?;

        if self.device.configuration().is_none() {
            self.device
                .select_configuration(DEFAULT_CONFIGURATION)
                .await?;
        }
        self.device.claim_interface(FTDI_INTERFACE).await?;

        self.vendor_request(SIO_RESET, 0, 0).await?;

        let divisor = baud::resolve(options.baud_rate, self.baud_policy)?;
        self.vendor_request(SIO_SET_BAUD_RATE, divisor.value, divisor.index)
            .await?;

        self.vendor_request(SIO_SET_DATA, framing::encode_line_properties(options), 0)
            .await?;

        if options.flow_control == FlowControl::Hardware {
            self.vendor_request(SIO_SET_FLOW_CTRL, 0, SIO_RTS_CTS_HS)
                .await?;
        }

        self.endpoints = Endpoints::discover(self.device.configuration().as_ref());
        tracing::debug!(
            input = self.endpoints.input,
            output = self.endpoints.output,
            "FTDI endpoints discovered"
        );
        Ok(())
    }

    fn ensure_open(&self) -> SerialResult<()> {
        if self.state != PortState::Open {
            return Err(StateError::NotOpen.into());
        }
        Ok(())
    }
}

#[async_trait]
impl SerialPort for FtdiSerial {
    #[instrument(skip(self), fields(baud_rate = options.baud_rate), err)]
    async fn open(&mut self, options: SerialOpenOptions) -> SerialResult<()> {
        if self.state == PortState::Open {
            return Err(StateError::AlreadyOpen.into());
        }

        self.state = PortState::Opening;
        self.modem_status = None;

        if let Err(cause) = self.handshake(&options).await {
            if let Err(close_err) = self.device.close().await {
                tracing::warn!(error = %close_err, "Failed to close FTDI device after open failure");
            }
            self.state = PortState::Closed;
            return Err(SerialError::open_failed(cause));
        }

        self.options = Some(options);
        self.state = PortState::Open;
        tracing::info!(
            vendor_id = self.device.vendor_id(),
            product_id = self.device.product_id(),
            baud_rate = options.baud_rate,
            "FTDI serial port opened"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> SerialResult<()> {
        if self.state == PortState::Closed {
            return Err(StateError::NotOpen.into());
        }

        self.state = PortState::Closing;
        if let Err(err) = self.device.release_interface(FTDI_INTERFACE).await {
            tracing::warn!(error = %err, "Failed to release FTDI interface");
        }
        if let Err(err) = self.device.close().await {
            tracing::warn!(error = %err, "Failed to close FTDI device");
        }
        self.state = PortState::Closed;
        tracing::info!("FTDI serial port closed");
        Ok(())
    }

    async fn read(&mut self, length: usize) -> SerialResult<Bytes> {
        self.ensure_open()?;

        let transfer = self
            .device
            .transfer_in(self.endpoints.input, length.saturating_add(MODEM_STATUS_LEN))
            .await?;

        if !transfer.status.is_ok() {
            tracing::debug!(status = %transfer.status, "FTDI read returned no data");
            return Ok(Bytes::new());
        }
        // Status-only packets still refresh the modem lines
        if let Some(status) = ModemStatus::from_packet(&transfer.data) {
            self.modem_status = Some(status);
        }
        if transfer.data.len() <= MODEM_STATUS_LEN {
            return Ok(Bytes::new());
        }

        let mut payload = framing::strip_modem_status(transfer.data);
        payload.truncate(length);
        tracing::trace!(requested = length, len = payload.len(), "FTDI read");
        Ok(payload)
    }

    async fn write(&mut self, data: &[u8]) -> SerialResult<()> {
        self.ensure_open()?;

        let transfer = self.device.transfer_out(self.endpoints.output, data).await?;
        if !transfer.status.is_ok() {
            return Err(transfer.status.into());
        }
        tracing::trace!(len = data.len(), written = transfer.bytes_written, "FTDI write");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_core::usb::{UsbAlternate, UsbEndpoint, UsbInterface};

    fn config_with(endpoints: Vec<UsbEndpoint>) -> UsbConfiguration {
        UsbConfiguration {
            configuration_value: 1,
            interfaces: vec![UsbInterface {
                interface_number: 0,
                alternates: vec![UsbAlternate {
                    alternate_setting: 0,
                    endpoints,
                }],
            }],
        }
    }

    #[test]
    fn test_endpoint_discovery_defaults() {
        assert_eq!(Endpoints::discover(None), Endpoints { input: 1, output: 2 });
        assert_eq!(
            Endpoints::discover(Some(&UsbConfiguration::default())),
            Endpoints::default()
        );
    }

    #[test]
    fn test_endpoint_discovery_from_descriptor() {
        let config = config_with(vec![
            UsbEndpoint::bulk(3, Direction::In),
            UsbEndpoint::bulk(4, Direction::Out),
        ]);
        assert_eq!(
            Endpoints::discover(Some(&config)),
            Endpoints { input: 3, output: 4 }
        );
    }

    #[test]
    fn test_endpoint_discovery_first_of_each_direction() {
        let config = config_with(vec![
            UsbEndpoint::bulk(6, Direction::Out),
            UsbEndpoint::bulk(3, Direction::In),
            UsbEndpoint::bulk(7, Direction::Out),
            UsbEndpoint::bulk(8, Direction::In),
        ]);
        assert_eq!(
            Endpoints::discover(Some(&config)),
            Endpoints { input: 3, output: 6 }
        );
    }

    #[test]
    fn test_endpoint_discovery_partial_descriptor() {
        let config = config_with(vec![UsbEndpoint::bulk(5, Direction::In)]);
        assert_eq!(
            Endpoints::discover(Some(&config)),
            Endpoints { input: 5, output: 2 }
        );
    }

    #[test]
    fn test_driver_identity() {
        let driver = FtdiDriver::new();
        assert_eq!(driver.driver_name(), "FTDI");
        assert!(driver.supports(0x0403, 0x6001));
        assert!(driver.supports(0x0403, 0x6015));
        assert!(!driver.supports(0x0403, 0x1234));
        assert!(!driver.supports(0x10c4, 0x6001));
        assert_eq!(driver.baud_policy(), BaudPolicy::Fallback);
        assert_eq!(
            FtdiDriver::with_baud_policy(BaudPolicy::Strict).baud_policy(),
            BaudPolicy::Strict
        );
    }
}
