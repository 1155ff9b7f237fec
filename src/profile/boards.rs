//! Compiled-in board profiles.

use super::{
    BoardProfile, BoardSensor, ExtenderProfile, GpioProfile, I2cProfile, NetworkDefaults,
    OneWireProfile, PlcPins, RelayLed, SpiProfile, UartProfile,
};
use crate::gpio::PinKind;
use crate::onewire::RomAddress;

// ============================================================================
// PLC ESP32 v1
// ============================================================================

const V1_I2C: [I2cProfile; 1] = [I2cProfile {
    id: 1,
    sda: 21,
    scl: 22,
    enabled: true,
}];

const V1_ONEWIRE: [OneWireProfile; 1] = [OneWireProfile {
    id: 1,
    pin: 4,
    enabled: true,
}];

const V1_EXTENDERS: [ExtenderProfile; 2] = [
    // relay bank
    ExtenderProfile {
        id: 1,
        i2c: 1,
        address: 0x20,
        enabled: true,
    },
    // button bank
    ExtenderProfile {
        id: 2,
        i2c: 1,
        address: 0x21,
        enabled: true,
    },
];

const V1_GPIO: [GpioProfile; 25] = [
    GpioProfile::native_output(1, 2, PinKind::Generic),
    GpioProfile::native_output(2, 15, PinKind::Generic),
    GpioProfile::native_output(3, 12, PinKind::Buzzer),
    GpioProfile::native_output(4, 13, PinKind::Relay),
    GpioProfile::native_input(5, 32, PinKind::Input),
    GpioProfile::native_input(6, 33, PinKind::Input),
    GpioProfile::native_input(7, 25, PinKind::Input),
    GpioProfile::ext_output(9, 1, 0, PinKind::Relay),
    GpioProfile::ext_output(10, 1, 1, PinKind::Relay),
    GpioProfile::ext_output(11, 1, 2, PinKind::Relay),
    GpioProfile::ext_output(12, 1, 3, PinKind::Relay),
    GpioProfile::ext_output(13, 1, 4, PinKind::Relay),
    GpioProfile::ext_output(14, 1, 5, PinKind::Relay),
    GpioProfile::ext_output(15, 1, 6, PinKind::Relay),
    GpioProfile::ext_output(16, 1, 7, PinKind::Relay),
    GpioProfile::ext_input(17, 2, 0, PinKind::Input),
    GpioProfile::ext_input(18, 2, 1, PinKind::Input),
    GpioProfile::ext_input(19, 2, 2, PinKind::Input),
    GpioProfile::ext_input(20, 2, 3, PinKind::Input),
    GpioProfile::ext_input(21, 2, 4, PinKind::Input),
    GpioProfile::ext_input(22, 2, 5, PinKind::Input),
    GpioProfile::ext_input(23, 2, 6, PinKind::Input),
    GpioProfile::ext_input(24, 2, 7, PinKind::Input),
    GpioProfile::native_output(25, 26, PinKind::Generic),
    GpioProfile::native_output(26, 27, PinKind::Generic),
];

const V1_RELAY_LEDS: [RelayLed; 2] = [RelayLed { relay: 9, led: 25 }, RelayLed { relay: 10, led: 26 }];

const V1_SPI: [SpiProfile; 1] = [SpiProfile {
    id: 1,
    sck: 18,
    miso: 19,
    mosi: 23,
    cs: 5,
    enabled: false,
}];

const V1_UART: [UartProfile; 1] = [UartProfile {
    id: 1,
    rx: 16,
    tx: 17,
    baud: 115_200,
    enabled: false,
}];

/// Main PLC board: 8 relays on extender 1, 8 buttons on extender 2.
pub const PLC_ESP32_V1: BoardProfile = BoardProfile {
    name: "PLC ESP32 v1",
    i2c: &V1_I2C,
    onewire: &V1_ONEWIRE,
    extenders: &V1_EXTENDERS,
    gpio: &V1_GPIO,
    spi: &V1_SPI,
    uart: &V1_UART,
    plc: PlcPins {
        alarm_led: Some(1),
        status_led: Some(2),
        buzzer: Some(3),
        fan: Some(4),
        buttons: [Some(5), Some(6), Some(7)],
        relay_leds: &V1_RELAY_LEDS,
        board_sensor: Some(BoardSensor {
            bus: 1,
            address: RomAddress([0x28, 0xFF, 0x64, 0x1E, 0x87, 0x16, 0x03, 0xD7]),
        }),
    },
    network: NetworkDefaults {
        hostname: "plc",
        ap_ssid: "PLC-Setup",
        ethernet: false,
        gsm: false,
    },
};

// ============================================================================
// Devkit
// ============================================================================

const DEVKIT_GPIO: [GpioProfile; 4] = [
    GpioProfile::native_output(1, 2, PinKind::Generic),
    GpioProfile::native_output(9, 16, PinKind::Relay),
    GpioProfile::native_output(10, 17, PinKind::Relay),
    GpioProfile::native_input(17, 0, PinKind::Input),
];

/// Bare ESP32 devkit: native pins only, no buses.
pub const DEVKIT: BoardProfile = BoardProfile {
    name: "ESP32 devkit",
    i2c: &[],
    onewire: &[],
    extenders: &[],
    gpio: &DEVKIT_GPIO,
    spi: &[],
    uart: &[],
    plc: PlcPins {
        status_led: Some(1),
        ..PlcPins::NONE
    },
    network: NetworkDefaults {
        hostname: "plc-devkit",
        ap_ssid: "PLC-Devkit",
        ethernet: false,
        gsm: false,
    },
};
