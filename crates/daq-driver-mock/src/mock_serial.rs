//! Mock serial port with a scripted response queue and a write log.
//!
//! [`MockSerial`] enforces the same lifecycle rules as a real port but never
//! touches hardware. Reads pop canned responses in FIFO order; writes are
//! recorded for later assertions.
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_driver_mock::MockSerial;
//!
//! let mut serial = MockSerial::new();
//! serial.queue_response(b"1.234E-3\r\n");
//! serial.open(Default::default()).await?;
//! serial.write(b"D?\r\n").await?;
//!
//! assert_eq!(serial.write_log(), vec![Bytes::from_static(b"D?\r\n")]);
//! let reply = serial.read(64).await?;
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use daq_core::driver::{DeviceFilter, SerialDriver};
use daq_core::error::{SerialResult, StateError};
use daq_core::serial::{DynSerialPort, SerialOpenOptions, SerialPort};
use daq_core::usb::UsbDevice;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// =============================================================================
// MockSerialDriver - SerialDriver implementation
// =============================================================================

/// Name the mock driver registers under.
pub const MOCK_DRIVER_NAME: &str = "MockSerial";

/// Fictional VID/PID claimed by the mock driver.
pub const MOCK_DEVICE: DeviceFilter = DeviceFilter::new(0xffff, 0xffff);

static MOCK_SERIAL_DEVICES: &[DeviceFilter] = &[MOCK_DEVICE];

/// Driver handing out [`MockSerial`] ports.
///
/// The most recently connected port is remembered so tests can script and
/// inspect the port a consumer is using.
#[derive(Debug, Default)]
pub struct MockSerialDriver {
    last: Mutex<Option<MockSerial>>,
}

impl MockSerialDriver {
    /// Create a driver with no connected ports.
    pub fn new() -> Self {
        Self::default()
    }

    /// The port created by the latest `connect` call.
    pub fn last_mock_serial(&self) -> Option<MockSerial> {
        self.last.lock().clone()
    }
}

impl SerialDriver for MockSerialDriver {
    fn driver_name(&self) -> &'static str {
        MOCK_DRIVER_NAME
    }

    fn supported_devices(&self) -> &[DeviceFilter] {
        MOCK_SERIAL_DEVICES
    }

    fn connect(&self, device: Box<dyn UsbDevice>) -> DynSerialPort {
        tracing::debug!(
            vendor_id = device.vendor_id(),
            product_id = device.product_id(),
            "Connecting mock serial port"
        );
        let serial = MockSerial::new();
        *self.last.lock() = Some(serial.clone());
        Box::new(serial)
    }
}

// =============================================================================
// MockSerial
// =============================================================================

#[derive(Debug, Default)]
struct MockSerialState {
    open: bool,
    options: Option<SerialOpenOptions>,
    responses: VecDeque<Bytes>,
    write_log: Vec<Bytes>,
}

/// Deterministic serial port test double.
///
/// Clones share state, so a clone kept by a test observes everything done
/// through the boxed port handed to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    state: Arc<Mutex<MockSerialState>>,
}

impl MockSerial {
    /// Create a closed port with an empty queue and log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one response to the read queue.
    pub fn queue_response(&self, response: impl AsRef<[u8]>) {
        self.state
            .lock()
            .responses
            .push_back(Bytes::copy_from_slice(response.as_ref()));
    }

    /// Append several responses to the read queue, preserving order.
    pub fn queue_responses<I, B>(&self, responses: I)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut state = self.state.lock();
        state.responses.extend(
            responses
                .into_iter()
                .map(|response| Bytes::copy_from_slice(response.as_ref())),
        );
    }

    /// Every buffer written so far, in call order.
    pub fn write_log(&self) -> Vec<Bytes> {
        self.state.lock().write_log.clone()
    }

    /// Forget all recorded writes.
    pub fn clear_write_log(&self) {
        self.state.lock().write_log.clear();
    }

    /// Drop all queued responses.
    pub fn clear_response_queue(&self) {
        self.state.lock().responses.clear();
    }

    /// Number of responses still queued.
    pub fn pending_responses(&self) -> usize {
        self.state.lock().responses.len()
    }

    /// Options passed to the most recent successful `open`.
    pub fn open_options(&self) -> Option<SerialOpenOptions> {
        self.state.lock().options
    }

    /// Return to closed with an empty queue and an empty log.
    pub fn reset(&self) {
        *self.state.lock() = MockSerialState::default();
    }
}

#[async_trait]
impl SerialPort for MockSerial {
    async fn open(&mut self, options: SerialOpenOptions) -> SerialResult<()> {
        let mut state = self.state.lock();
        if state.open {
            return Err(StateError::AlreadyOpen.into());
        }
        state.open = true;
        state.options = Some(options);
        tracing::debug!(baud_rate = options.baud_rate, "Mock serial opened");
        Ok(())
    }

    async fn close(&mut self) -> SerialResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StateError::NotOpen.into());
        }
        state.open = false;
        tracing::debug!("Mock serial closed");
        Ok(())
    }

    async fn read(&mut self, length: usize) -> SerialResult<Bytes> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StateError::NotOpen.into());
        }

        // Bytes past `length` in the popped response are discarded, not re-queued.
        let response = match state.responses.pop_front() {
            Some(mut response) => {
                response.truncate(length);
                response
            }
            None => Bytes::new(),
        };
        tracing::trace!(requested = length, len = response.len(), "Mock serial read");
        Ok(response)
    }

    async fn write(&mut self, data: &[u8]) -> SerialResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(StateError::NotOpen.into());
        }
        state.write_log.push(Bytes::copy_from_slice(data));
        tracing::trace!(len = data.len(), "Mock serial write");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockUsbDevice;

    async fn opened() -> MockSerial {
        let mut serial = MockSerial::new();
        serial.open(SerialOpenOptions::default()).await.unwrap();
        serial
    }

    #[tokio::test]
    async fn test_double_open_fails() {
        let mut serial = opened().await;
        let err = serial.open(SerialOpenOptions::default()).await.unwrap_err();
        assert_eq!(err.state(), Some(StateError::AlreadyOpen));
        assert!(serial.is_open());
    }

    #[tokio::test]
    async fn test_operations_before_open_fail() {
        let mut serial = MockSerial::new();
        assert_eq!(
            serial.read(1).await.unwrap_err().state(),
            Some(StateError::NotOpen)
        );
        assert_eq!(
            serial.write(&[1]).await.unwrap_err().state(),
            Some(StateError::NotOpen)
        );
        assert_eq!(
            serial.close().await.unwrap_err().state(),
            Some(StateError::NotOpen)
        );
    }

    #[tokio::test]
    async fn test_read_truncates_and_discards_remainder() {
        let mut serial = MockSerial::new();
        serial.queue_response([1u8, 2, 3, 4, 5]);
        serial.open(SerialOpenOptions::default()).await.unwrap();

        let data = serial.read(3).await.unwrap();
        assert_eq!(&data[..], &[1, 2, 3]);

        // Leftover [4, 5] was dropped along with the popped response
        assert!(serial.read(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_responses_are_fifo() {
        let mut serial = MockSerial::new();
        serial.queue_responses([vec![1u8], vec![2u8]]);
        serial.open(SerialOpenOptions::default()).await.unwrap();

        assert_eq!(&serial.read(10).await.unwrap()[..], &[1]);
        assert_eq!(&serial.read(10).await.unwrap()[..], &[2]);
        assert!(serial.read(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_log_records_copies_in_order() {
        let mut serial = opened().await;
        let mut buffer = vec![1u8];
        serial.write(&buffer).await.unwrap();
        buffer[0] = 9;
        serial.write(&[2]).await.unwrap();

        let log = serial.write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log, vec![Bytes::from_static(&[1]), Bytes::from_static(&[2])]);

        serial.clear_write_log();
        assert!(serial.write_log().is_empty());
    }

    #[tokio::test]
    async fn test_reset_returns_to_pristine_state() {
        let mut serial = opened().await;
        serial.write(&[1, 2]).await.unwrap();
        serial.queue_responses([[7u8], [8u8]]);

        serial.reset();

        assert!(!serial.is_open());
        assert!(serial.write_log().is_empty());
        assert_eq!(serial.pending_responses(), 0);
        assert!(serial.open_options().is_none());
    }

    #[tokio::test]
    async fn test_clear_response_queue() {
        let serial = MockSerial::new();
        serial.queue_response(b"abc");
        assert_eq!(serial.pending_responses(), 1);
        serial.clear_response_queue();
        assert_eq!(serial.pending_responses(), 0);
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let mut serial = opened().await;
        serial.close().await.unwrap();
        assert!(!serial.is_open());

        let options = SerialOpenOptions::default().with_baud_rate(115_200);
        serial.open(options).await.unwrap();
        assert_eq!(serial.open_options(), Some(options));
    }

    #[tokio::test]
    async fn test_driver_remembers_last_port() {
        let driver = MockSerialDriver::new();
        assert_eq!(driver.driver_name(), "MockSerial");
        assert_eq!(driver.supported_devices(), &[DeviceFilter::new(0xffff, 0xffff)]);
        assert!(driver.last_mock_serial().is_none());

        let mut port = driver.connect(Box::new(MockUsbDevice::new(0xffff, 0xffff)));
        assert!(!port.is_open());

        let handle = driver.last_mock_serial().unwrap();
        handle.queue_response(b"ok");

        port.open(SerialOpenOptions::default()).await.unwrap();
        port.write(b"ping").await.unwrap();
        assert_eq!(&port.read(8).await.unwrap()[..], b"ok");

        assert!(handle.is_open());
        assert_eq!(handle.write_log(), vec![Bytes::from_static(b"ping")]);
    }
}
