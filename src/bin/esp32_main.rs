//! ESP32 PLC firmware.
//!
//! Brings up the board from its profile, then runs a cooperative main loop
//! that ticks, once per pass:
//!
//! - the PLC supervisor (alarm LED, buzzer, fan, status display)
//! - the socket controller (buttons and relays)
//! - the meteo controller (DS18B20 sampling)
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32
//! cargo build --release --features esp32,display
//! ```

use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use log::{info, warn};
use rs_plc::hal::esp32::{Esp32Clock, Esp32Gpio, Esp32OneWire, NvsEeprom};
use rs_plc::onewire::FAMILY_DS18B20;
use rs_plc::profile::boards::PLC_ESP32_V1;
use rs_plc::profile::{I2cProfile, OneWireProfile};
use rs_plc::storage::EepromSocketDb;
use rs_plc::traits::Clock;
use rs_plc::{
    Board, Config, MeteoController, MeteoEvent, PlcMod, PlcSupervisor, RomAddress, SensorSettings,
    SocketController, SocketEvent, SocketPersistence, SocketSettings,
};
use std::thread;
use std::time::Duration;

/// Main loop interval in milliseconds.
const LOOP_INTERVAL_MS: u64 = 10;

/// Emulated EEPROM size in bytes.
const EEPROM_SIZE: usize = 512;

/// First relay and first button of the socket bank on this board.
const FIRST_RELAY: u8 = 9;
const FIRST_BUTTON: u8 = 17;
const SOCKET_COUNT: u8 = 8;

fn default_config() -> Config {
    #[cfg(feature = "json-db")]
    if let Some(text) = option_env!("PLC_CONFIG_JSON") {
        match Config::from_json(text) {
            Ok(config) => return config,
            Err(e) => warn!("PLC_CONFIG_JSON ignored: {}", e),
        }
    }

    let mut config = Config::default();
    for i in 0..SOCKET_COUNT {
        let name = format!("Socket {}", i + 1);
        config = config.with_socket_entry(
            SocketSettings::new(i, &name, FIRST_RELAY + i).with_button(FIRST_BUTTON + i),
        );
    }
    config
}

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    let profile = PLC_ESP32_V1;
    let mut config = default_config();
    info!("{} starting on board {}", config.device.name, profile.name);

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Board bring-up
    // =========================================================================
    let mut i2c_controllers = [Some(peripherals.i2c0)];
    let open_i2c = |bus: &I2cProfile, hz: u32| -> anyhow::Result<I2cDriver<'static>> {
        let controller = i2c_controllers
            .iter_mut()
            .find_map(Option::take)
            .ok_or_else(|| anyhow::anyhow!("no free I2C controller for bus {}", bus.id))?;
        // SAFETY: the profile assigns these pins to this bus only
        let (sda, scl) = unsafe { (AnyIOPin::new(i32::from(bus.sda)), AnyIOPin::new(i32::from(bus.scl))) };
        let driver = I2cDriver::new(controller, sda, scl, &I2cConfig::new().baudrate(hz.Hz()))?;
        Ok(driver)
    };
    let open_onewire = |bus: &OneWireProfile| Esp32OneWire::new(bus.pin);

    let mut board = Board::begin(profile, Esp32Gpio::new(), open_i2c, open_onewire);

    // =========================================================================
    // Status display (SSD1306 on the second I2C controller) - Optional
    // =========================================================================
    #[cfg(feature = "display")]
    let display = {
        use rs_plc::hal::esp32::{pins, Esp32Display};
        // SAFETY: the OLED pins are outside the board profile
        let (sda, scl) = unsafe { (AnyIOPin::new(pins::OLED_SDA), AnyIOPin::new(pins::OLED_SCL)) };
        let i2c = I2cDriver::new(peripherals.i2c1, sda, scl, &I2cConfig::new().baudrate(400.kHz().into()))?;
        Esp32Display::new(i2c)
    };
    #[cfg(not(feature = "display"))]
    let display = rs_plc::NoDisplay;

    // =========================================================================
    // Persistence
    // =========================================================================
    let nvs = EspNvs::new(EspDefaultNvsPartition::take()?, "plc", true)?;
    let store = SocketPersistence::new().with_store(EepromSocketDb::new(NvsEeprom::new(nvs, EEPROM_SIZE)?));

    // =========================================================================
    // Controllers
    // =========================================================================
    let clock = Esp32Clock::new();
    let now = clock.now_ms();

    if config.sensors.is_empty() {
        match board.scan_onewire(config.meteo.bus) {
            Ok(found) => {
                for (id, hex) in found.iter().enumerate() {
                    let is_ds18b20 = RomAddress::from_hex(hex).is_some_and(|rom| rom.family() == FAMILY_DS18B20);
                    let is_board = profile
                        .plc
                        .board_sensor
                        .is_some_and(|s| s.address.to_hex() == *hex);
                    if is_ds18b20 && !is_board {
                        let name = format!("Sensor {}", id + 1);
                        config = config.with_sensor_entry(SensorSettings::new(id as u8, &name, hex));
                    }
                }
            }
            Err(e) => warn!("1-Wire scan failed: {}", e),
        }
    }

    let mut plc = PlcSupervisor::new(config.plc, &config.device.name, display);
    let mut sockets = SocketController::new(config.socket, store);
    let mut meteo = MeteoController::new(config.meteo);

    plc.begin(&profile.plc, &mut board.gpio, &mut board.onewire, now);
    sockets.begin(&config.sockets, &mut board.gpio);
    meteo.begin(&config.sensors, &board.onewire, now);

    info!("entering main loop");

    // =========================================================================
    // Main loop
    // =========================================================================
    loop {
        let now = clock.now_ms();

        plc.tick(now, &mut board.gpio, &mut board.onewire);

        if let Some(SocketEvent::Toggled { id, status }) = sockets.tick(now, &mut board.gpio) {
            info!("socket {} switched {}", id, if status { "on" } else { "off" });
        }

        match meteo.tick(now, &mut board.onewire) {
            Some(MeteoEvent::SensorFailed { .. }) => plc.set_alarm(PlcMod::Meteo, true, &mut board.gpio),
            Some(MeteoEvent::SensorRecovered { .. }) => {
                let all_ok = meteo.sensors().all(|s| s.value().map_or(true, |v| v > rs_plc::SENSOR_ERROR_VALUE));
                if all_ok {
                    plc.set_alarm(PlcMod::Meteo, false, &mut board.gpio);
                }
            }
            None => {}
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
