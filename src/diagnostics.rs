//! Registry reports for the diagnostics CLI.
//!
//! Pure formatting over a [`DriverRegistry`]; nothing here touches hardware.

use daq_hardware::DriverRegistry;
use std::fmt::Write as _;

/// Parse a USB ID written in hex, with or without a `0x` prefix.
pub fn parse_hex_id(text: &str) -> Result<u16, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid USB ID '{}': {}", text, e))
}

/// One line per driver followed by its VID/PID filters.
pub fn driver_report(registry: &DriverRegistry) -> String {
    let drivers = registry.all_drivers();
    if drivers.is_empty() {
        return "no drivers registered\n".to_string();
    }

    let mut report = String::new();
    for driver in drivers {
        let devices = driver.supported_devices();
        let _ = writeln!(report, "{} ({} devices)", driver.driver_name(), devices.len());
        for filter in devices {
            let _ = writeln!(report, "  {}", filter);
        }
    }
    report
}

/// Name of the driver claiming the device, or "no driver".
pub fn match_report(registry: &DriverRegistry, vendor_id: u16, product_id: u16) -> String {
    match registry.find_driver_for_device(vendor_id, product_id) {
        Some(driver) => format!(
            "{:04x}:{:04x} -> {}",
            vendor_id,
            product_id,
            driver.driver_name()
        ),
        None => format!("{:04x}:{:04x} -> no driver", vendor_id, product_id),
    }
}
