//! End-to-end: configuration file -> registry -> connected port.

use daq_core::usb::ControlSetup;
use daq_driver_ftdi::{SIO_SET_BAUD_RATE, SIO_SET_DATA, SIO_SET_FLOW_CTRL};
use daq_usb_serial::config::AppConfig;
use daq_usb_serial::{MockUsbDevice, SerialError, SerialPort};
use std::io::Write;
use tempfile::NamedTempFile;

fn load(contents: &str) -> AppConfig {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();
    config
}

#[tokio::test]
async fn test_configured_options_reach_the_chip() {
    let config = load(
        r#"
        [serial]
        baud_rate = 38400
        parity = "even"
        flow_control = "hardware"
        "#,
    );
    let registry = config.build_registry();
    let usb = MockUsbDevice::new(0x0403, 0x6001);

    let mut port = registry.connect(Box::new(usb.clone())).unwrap();
    port.open(config.serial).await.unwrap();

    let setups = usb.control_transfers();
    assert_eq!(
        &setups[1..],
        &[
            ControlSetup::vendor(SIO_SET_BAUD_RATE, 0xC04E, 0),
            ControlSetup::vendor(SIO_SET_DATA, 0x0208, 0),
            ControlSetup::vendor(SIO_SET_FLOW_CTRL, 0, 0x0100),
        ]
    );
}

#[tokio::test]
async fn test_strict_policy_from_config() {
    let config = load(
        r#"
        [ftdi]
        baud_policy = "strict"
        "#,
    );
    let registry = config.build_registry();
    let usb = MockUsbDevice::new(0x0403, 0x6015);

    let mut port = registry.connect(Box::new(usb.clone())).unwrap();
    let err = port
        .open(config.serial.with_baud_rate(31_250))
        .await
        .unwrap_err();

    assert!(matches!(
        err.open_cause(),
        Some(SerialError::UnsupportedBaudRate(31_250))
    ));
    assert!(!usb.is_open());
}

#[tokio::test]
async fn test_test_mode_from_config() {
    let config = load("[registry]\ntest_mode = true\n");
    let registry = config.build_registry();

    let mut port = registry
        .connect(Box::new(MockUsbDevice::new(0xffff, 0xffff)))
        .unwrap();
    let mock = registry.enable_test_mode().last_mock_serial().unwrap();
    mock.queue_response(b"READY");

    port.open(config.serial).await.unwrap();
    assert_eq!(&port.read(5).await.unwrap()[..], b"READY");
}
