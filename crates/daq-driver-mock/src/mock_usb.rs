//! Scriptable fake of the USB device capability.
//!
//! [`MockUsbDevice`] records every capability call so protocol drivers can be
//! checked against the exact control and bulk traffic they generate, without a
//! USB stack. Responses to IN transfers are scripted, OUT transfers and control
//! transfers report a configurable status, and any operation can be made to
//! fail outright.
//!
//! # Example
//!
//! ```rust,ignore
//! use daq_driver_mock::{MockUsbDevice, UsbCall};
//!
//! let usb = MockUsbDevice::new(0x0403, 0x6001);
//! usb.queue_in_data([0x01, 0x60, b'O', b'K']);
//!
//! let mut port = FtdiSerial::new(Box::new(usb.clone()));
//! port.open(Default::default()).await?;
//!
//! assert!(usb.calls().contains(&UsbCall::ClaimInterface(0)));
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use daq_core::usb::{
    ControlSetup, Direction, InTransfer, OutTransfer, TransferStatus, UsbAlternate,
    UsbConfiguration, UsbDevice, UsbEndpoint, UsbError, UsbInterface, UsbResult,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsbCall {
    /// `open`
    Open,
    /// `close`
    Close,
    /// `select_configuration(value)`
    SelectConfiguration(u8),
    /// `claim_interface(number)`
    ClaimInterface(u8),
    /// `release_interface(number)`
    ReleaseInterface(u8),
    /// `control_transfer_out(setup, data)`
    ControlOut {
        /// Setup packet
        setup: ControlSetup,
        /// Data stage
        data: Vec<u8>,
    },
    /// `transfer_in(endpoint, length)`
    TransferIn {
        /// Endpoint number
        endpoint: u8,
        /// Requested length
        length: usize,
    },
    /// `transfer_out(endpoint, data)`
    TransferOut {
        /// Endpoint number
        endpoint: u8,
        /// Payload
        data: Vec<u8>,
    },
}

#[derive(Debug)]
struct MockUsbState {
    calls: Vec<UsbCall>,
    in_responses: VecDeque<InTransfer>,
    control_status: TransferStatus,
    out_status: TransferStatus,
    failing: HashSet<&'static str>,
    available: UsbConfiguration,
    active: Option<UsbConfiguration>,
    opened: bool,
    claimed: BTreeSet<u8>,
}

/// Recording fake implementing [`UsbDevice`].
///
/// Clones share state: keep one clone in the test and hand another, boxed, to
/// the driver under test.
#[derive(Debug, Clone)]
pub struct MockUsbDevice {
    vendor_id: u16,
    product_id: u16,
    state: Arc<Mutex<MockUsbState>>,
}

/// Single-interface configuration shaped like an FTDI FT232R: interface 0 with
/// bulk IN endpoint 1 and bulk OUT endpoint 2.
pub fn single_port_configuration() -> UsbConfiguration {
    UsbConfiguration {
        configuration_value: 1,
        interfaces: vec![UsbInterface {
            interface_number: 0,
            alternates: vec![UsbAlternate {
                alternate_setting: 0,
                endpoints: vec![
                    UsbEndpoint::bulk(1, Direction::In),
                    UsbEndpoint::bulk(2, Direction::Out),
                ],
            }],
        }],
    }
}

impl MockUsbDevice {
    /// Create an unconfigured device offering [`single_port_configuration`].
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            state: Arc::new(Mutex::new(MockUsbState {
                calls: Vec::new(),
                in_responses: VecDeque::new(),
                control_status: TransferStatus::Ok,
                out_status: TransferStatus::Ok,
                failing: HashSet::new(),
                available: single_port_configuration(),
                active: None,
                opened: false,
                claimed: BTreeSet::new(),
            })),
        }
    }

    /// Offer a different configuration descriptor.
    pub fn with_configuration(self, configuration: UsbConfiguration) -> Self {
        {
            let mut state = self.state.lock();
            if state.active.is_some() {
                state.active = Some(configuration.clone());
            }
            state.available = configuration;
        }
        self
    }

    /// Start with the offered configuration already selected.
    pub fn configured(self) -> Self {
        {
            let mut state = self.state.lock();
            state.active = Some(state.available.clone());
        }
        self
    }

    /// Queue the result of the next IN transfer.
    pub fn queue_in(&self, transfer: InTransfer) {
        self.state.lock().in_responses.push_back(transfer);
    }

    /// Queue a successful IN transfer carrying `data`.
    pub fn queue_in_data(&self, data: impl AsRef<[u8]>) {
        self.queue_in(InTransfer::ok(Bytes::copy_from_slice(data.as_ref())));
    }

    /// Status reported by subsequent control transfers.
    pub fn set_control_status(&self, status: TransferStatus) {
        self.state.lock().control_status = status;
    }

    /// Status reported by subsequent OUT transfers.
    pub fn set_out_status(&self, status: TransferStatus) {
        self.state.lock().out_status = status;
    }

    /// Make every later call of `operation` (e.g. "claim_interface") fail.
    pub fn fail_operation(&self, operation: &'static str) {
        self.state.lock().failing.insert(operation);
    }

    /// Stop failing `operation`.
    pub fn heal_operation(&self, operation: &'static str) {
        self.state.lock().failing.remove(operation);
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<UsbCall> {
        self.state.lock().calls.clone()
    }

    /// Setup packets of all control transfers, in order.
    pub fn control_transfers(&self) -> Vec<ControlSetup> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                UsbCall::ControlOut { setup, .. } => Some(*setup),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Whether the handle is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().opened
    }

    /// Interfaces currently claimed.
    pub fn claimed_interfaces(&self) -> Vec<u8> {
        self.state.lock().claimed.iter().copied().collect()
    }

    fn record(&self, operation: &'static str, call: UsbCall) -> UsbResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(UsbError::new(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UsbDevice for MockUsbDevice {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn configuration(&self) -> Option<UsbConfiguration> {
        self.state.lock().active.clone()
    }

    async fn open(&mut self) -> UsbResult<()> {
        self.record("open", UsbCall::Open)?;
        self.state.lock().opened = true;
        Ok(())
    }

    async fn close(&mut self) -> UsbResult<()> {
        self.record("close", UsbCall::Close)?;
        let mut state = self.state.lock();
        state.opened = false;
        state.claimed.clear();
        Ok(())
    }

    async fn select_configuration(&mut self, configuration_value: u8) -> UsbResult<()> {
        self.record(
            "select_configuration",
            UsbCall::SelectConfiguration(configuration_value),
        )?;
        let mut state = self.state.lock();
        if state.available.configuration_value != configuration_value {
            return Err(UsbError::new(
                "select_configuration",
                format!("no configuration {}", configuration_value),
            ));
        }
        state.active = Some(state.available.clone());
        Ok(())
    }

    async fn claim_interface(&mut self, interface_number: u8) -> UsbResult<()> {
        self.record("claim_interface", UsbCall::ClaimInterface(interface_number))?;
        self.state.lock().claimed.insert(interface_number);
        Ok(())
    }

    async fn release_interface(&mut self, interface_number: u8) -> UsbResult<()> {
        self.record(
            "release_interface",
            UsbCall::ReleaseInterface(interface_number),
        )?;
        self.state.lock().claimed.remove(&interface_number);
        Ok(())
    }

    async fn control_transfer_out(
        &mut self,
        setup: ControlSetup,
        data: &[u8],
    ) -> UsbResult<OutTransfer> {
        self.record(
            "control_transfer_out",
            UsbCall::ControlOut {
                setup,
                data: data.to_vec(),
            },
        )?;
        let status = self.state.lock().control_status;
        Ok(match status {
            TransferStatus::Ok => OutTransfer::ok(data.len()),
            other => OutTransfer::with_status(other),
        })
    }

    async fn transfer_in(&mut self, endpoint_number: u8, length: usize) -> UsbResult<InTransfer> {
        self.record(
            "transfer_in",
            UsbCall::TransferIn {
                endpoint: endpoint_number,
                length,
            },
        )?;
        let mut transfer = self
            .state
            .lock()
            .in_responses
            .pop_front()
            .unwrap_or_else(|| InTransfer::ok(Bytes::new()));
        // A host never hands back more than it asked for.
        transfer.data.truncate(length);
        Ok(transfer)
    }

    async fn transfer_out(&mut self, endpoint_number: u8, data: &[u8]) -> UsbResult<OutTransfer> {
        self.record(
            "transfer_out",
            UsbCall::TransferOut {
                endpoint: endpoint_number,
                data: data.to_vec(),
            },
        )?;
        let status = self.state.lock().out_status;
        Ok(match status {
            TransferStatus::Ok => OutTransfer::ok(data.len()),
            other => OutTransfer::with_status(other),
        })
    }
}
