//! FTDI packet framing and line property encoding.
//!
//! Every bulk IN packet from an FTDI chip starts with two status bytes: the
//! modem status register followed by the line status register. They are not
//! part of the serial payload.

use bytes::Bytes;
use daq_core::serial::{Parity, SerialOpenOptions, StopBits};

/// Length of the status prefix on every IN packet.
pub const MODEM_STATUS_LEN: usize = 2;

/// Remove the status prefix from a raw IN transfer.
///
/// Returns an empty buffer when the transfer carried no payload.
pub fn strip_modem_status(raw: Bytes) -> Bytes {
    if raw.len() <= MODEM_STATUS_LEN {
        return Bytes::new();
    }
    raw.slice(MODEM_STATUS_LEN..)
}

/// Encode data bits, parity and stop bits for the "set data" request.
///
/// Low byte carries the data bit count, bits 8..10 the parity code and bits
/// 11..13 the stop bit code.
pub fn encode_line_properties(options: &SerialOpenOptions) -> u16 {
    let parity: u16 = match options.parity {
        Parity::None => 0,
        Parity::Odd => 1,
        Parity::Even => 2,
    };
    let stop_bits: u16 = match options.stop_bits {
        StopBits::One => 0,
        StopBits::Two => 2,
    };
    u16::from(options.data_bits.bits()) | (parity << 8) | (stop_bits << 10)
}

/// Decoded modem and line status from an IN packet prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemStatus {
    /// Raw modem status register
    pub modem: u8,
    /// Raw line status register
    pub line: u8,
}

impl ModemStatus {
    /// Decode the prefix of a raw IN transfer, if it is long enough.
    pub fn from_packet(raw: &[u8]) -> Option<Self> {
        match raw {
            [modem, line, ..] => Some(Self {
                modem: *modem,
                line: *line,
            }),
            _ => None,
        }
    }

    /// Clear to send
    pub fn cts(&self) -> bool {
        self.modem & 0x10 != 0
    }

    /// Data set ready
    pub fn dsr(&self) -> bool {
        self.modem & 0x20 != 0
    }

    /// Ring indicator
    pub fn ring_indicator(&self) -> bool {
        self.modem & 0x40 != 0
    }

    /// Carrier detect
    pub fn carrier_detect(&self) -> bool {
        self.modem & 0x80 != 0
    }

    /// Receive overrun
    pub fn overrun_error(&self) -> bool {
        self.line & 0x02 != 0
    }

    /// Parity error
    pub fn parity_error(&self) -> bool {
        self.line & 0x04 != 0
    }

    /// Framing error
    pub fn framing_error(&self) -> bool {
        self.line & 0x08 != 0
    }

    /// Break received
    pub fn break_interrupt(&self) -> bool {
        self.line & 0x10 != 0
    }

    /// Transmitter holding register empty
    pub fn transmitter_holding_empty(&self) -> bool {
        self.line & 0x20 != 0
    }

    /// Transmitter empty
    pub fn transmitter_empty(&self) -> bool {
        self.line & 0x40 != 0
    }

    /// Error in receiver FIFO
    pub fn fifo_error(&self) -> bool {
        self.line & 0x80 != 0
    }

    /// Any line error (overrun, parity, framing, break, FIFO).
    pub fn has_line_error(&self) -> bool {
        self.line & 0x9E != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_core::serial::DataBits;

    #[test]
    fn test_strip_returns_payload_after_prefix() {
        let raw = Bytes::from_static(&[0x01, 0x60, b'a', b'b', b'c']);
        assert_eq!(&strip_modem_status(raw)[..], b"abc");
    }

    #[test]
    fn test_strip_short_packets_yield_empty() {
        assert!(strip_modem_status(Bytes::new()).is_empty());
        assert!(strip_modem_status(Bytes::from_static(&[0x01])).is_empty());
        assert!(strip_modem_status(Bytes::from_static(&[0x01, 0x60])).is_empty());
    }

    #[test]
    fn test_strip_keeps_final_bytes_for_any_length() {
        for n in 1..200usize {
            let raw: Vec<u8> = (0..n + 2).map(|i| i as u8).collect();
            let payload = strip_modem_status(Bytes::from(raw.clone()));
            assert_eq!(payload.len(), n);
            assert_eq!(&payload[..], &raw[2..]);
        }
    }

    #[test]
    fn test_line_properties_8n1() {
        assert_eq!(encode_line_properties(&SerialOpenOptions::default()), 0x0008);
    }

    #[test]
    fn test_line_properties_bitfields() {
        let options = SerialOpenOptions::default()
            .with_data_bits(DataBits::Seven)
            .with_parity(Parity::Even)
            .with_stop_bits(StopBits::Two);
        // 7 | even(2) << 8 | two stop bits -> bit 11
        assert_eq!(encode_line_properties(&options), 0x0807 | 0x0200);

        let odd = SerialOpenOptions::default().with_parity(Parity::Odd);
        assert_eq!(encode_line_properties(&odd), 0x0108);
    }

    #[test]
    fn test_modem_status_decoding() {
        let status = ModemStatus::from_packet(&[0x31, 0x60, 0xAA]).unwrap();
        assert!(status.cts());
        assert!(status.dsr());
        assert!(!status.ring_indicator());
        assert!(!status.carrier_detect());
        assert!(status.transmitter_holding_empty());
        assert!(status.transmitter_empty());
        assert!(!status.has_line_error());

        let errors = ModemStatus { modem: 0, line: 0x0E };
        assert!(errors.overrun_error());
        assert!(errors.parity_error());
        assert!(errors.framing_error());
        assert!(errors.has_line_error());

        assert!(ModemStatus::from_packet(&[0x01]).is_none());
    }
}
