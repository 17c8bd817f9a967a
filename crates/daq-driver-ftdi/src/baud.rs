//! FTDI baud rate divisors.
//!
//! FTDI chips derive the serial clock from a 3 MHz reference. The "set baud
//! rate" request carries the divisor split across wValue and wIndex, with the
//! sub-integer part encoded in the top two bits of wValue (0 = .0, 1 = .5,
//! 2 = .25, 3 = .125). Only the rates below are supported.

use daq_core::error::{SerialError, SerialResult};
use daq_core::serial::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};

/// Encoded register pair for the "set baud rate" control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaudDivisor {
    /// wValue of the control transfer
    pub value: u16,
    /// wIndex of the control transfer
    pub index: u16,
}

impl BaudDivisor {
    const fn new(value: u16, index: u16) -> Self {
        Self { value, index }
    }
}

static BAUD_DIVISORS: &[(u32, BaudDivisor)] = &[
    (300, BaudDivisor::new(0x2710, 0)),
    (600, BaudDivisor::new(0x1388, 0)),
    (1200, BaudDivisor::new(0x09C4, 0)),
    (2400, BaudDivisor::new(0x04E2, 0)),
    (4800, BaudDivisor::new(0x0271, 0)),
    (9600, BaudDivisor::new(0x4138, 0)),
    (19200, BaudDivisor::new(0x809C, 0)),
    (38400, BaudDivisor::new(0xC04E, 0)),
    (57600, BaudDivisor::new(0x0034, 0)),
    (115200, BaudDivisor::new(0x001A, 0)),
    (230400, BaudDivisor::new(0x000D, 0)),
    (460800, BaudDivisor::new(0x4006, 0)),
    (921600, BaudDivisor::new(0x8003, 0)),
];

/// Divisor table entries in ascending baud order.
pub fn divisor_table() -> &'static [(u32, BaudDivisor)] {
    BAUD_DIVISORS
}

/// Exact table lookup.
pub fn lookup(baud_rate: u32) -> Option<BaudDivisor> {
    BAUD_DIVISORS
        .iter()
        .find(|(rate, _)| *rate == baud_rate)
        .map(|(_, divisor)| *divisor)
}

/// Baud rates with a table entry.
pub fn supported_baud_rates() -> impl Iterator<Item = u32> {
    BAUD_DIVISORS.iter().map(|(rate, _)| *rate)
}

/// What to do when the requested baud rate has no table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaudPolicy {
    /// Use the 9600 entry and log a warning
    #[default]
    Fallback,
    /// Fail the open with [`SerialError::UnsupportedBaudRate`]
    Strict,
}

/// Resolve the divisor for `baud_rate` under `policy`.
pub fn resolve(baud_rate: u32, policy: BaudPolicy) -> SerialResult<BaudDivisor> {
    if let Some(divisor) = lookup(baud_rate) {
        return Ok(divisor);
    }

    match policy {
        BaudPolicy::Strict => Err(SerialError::UnsupportedBaudRate(baud_rate)),
        BaudPolicy::Fallback => {
            tracing::warn!(
                requested = baud_rate,
                fallback = DEFAULT_BAUD_RATE,
                "Unsupported FTDI baud rate, falling back to 9600"
            );
            Ok(FALLBACK_DIVISOR)
        }
    }
}

const FALLBACK_DIVISOR: BaudDivisor = BaudDivisor::new(0x4138, 0);
