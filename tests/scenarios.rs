//! End-to-end scenarios on the PLC board profile with simulated hardware.

use rs_plc::{
    hal::{MockDisplay, MockEeprom, MockGpio, MockI2c, MockOneWire},
    onewire::FAMILY_DS18B20,
    profile::boards::{DEVKIT, PLC_ESP32_V1},
    storage::EepromSocketDb,
    Board, Config, MeteoConfig, MeteoController, MeteoEvent, MeteoPhase, PinError, PlcMod, PlcSupervisor,
    RomAddress, SensorSettings, SocketController, SocketEvent, SocketPersistence, SocketSettings,
    SENSOR_ERROR_VALUE,
};

type PlcBoard = Board<MockGpio, MockI2c, MockOneWire>;

const RELAY_BANK: u8 = 0x20;
const INPUT_BANK: u8 = 0x21;

fn board_rom() -> RomAddress {
    RomAddress([0x28, 0xFF, 0x64, 0x1E, 0x87, 0x16, 0x03, 0xD7])
}

fn outdoor_rom() -> RomAddress {
    RomAddress::new(FAMILY_DS18B20, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06])
}

fn plc_board(i2c: MockI2c, line: MockOneWire) -> PlcBoard {
    Board::begin(PLC_ESP32_V1, MockGpio::new(), |_, _| Ok::<_, ()>(i2c.clone()), |_| {
        Ok::<_, ()>(line.clone())
    })
}

fn both_banks() -> MockI2c {
    MockI2c::new().with_device(RELAY_BANK).with_device(INPUT_BANK)
}

/// Board line with only the on-board sensor. Clones share the sensors.
fn board_line() -> MockOneWire {
    MockOneWire::new().with_sensor(board_rom(), 30.0)
}

fn full_board() -> PlcBoard {
    plc_board(both_banks(), board_line())
}

fn input_bank(board: &mut PlcBoard) -> &mut MockI2c {
    board.gpio.i2c_mut().bus_mut(1).unwrap().handle_mut()
}

// ============================================================================
// Inactive extender
// ============================================================================

#[test]
fn unresponsive_relay_extender_keeps_pins() {
    let mut board = plc_board(
        MockI2c::new().with_device(INPUT_BANK),
        MockOneWire::new(),
    );
    assert!(!board.healthy());

    let ext = board.gpio.extenders().get(1).unwrap();
    assert!(!ext.active());
    assert_eq!(ext.address(), RELAY_BANK);

    for id in [9, 10] {
        let pin = board.gpio.pin(id).unwrap();
        assert_eq!(pin.extender(), Some(1));
    }

    // hardware-inert: the write fails, the cache follows
    assert!(board.gpio.write(9, true).is_err());
    assert_eq!(board.gpio.state(9), Ok(true));

    // the other extender is unaffected
    assert!(board.gpio.extenders().get(2).unwrap().active());
    assert!(board.gpio.read(17).is_ok());
}

// ============================================================================
// Kitchen socket timeline
// ============================================================================

#[test]
fn kitchen_button_timeline() {
    let mut board = full_board();
    let eeprom = MockEeprom::new(64);
    let store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom.clone()));
    let config = Config::default().with_socket_entry(SocketSettings::new(0, "Kitchen", 9).with_button(17));
    let mut sockets = SocketController::new(config.socket, store);
    assert!(sockets.begin(&config.sockets, &mut board.gpio));
    assert_eq!(sockets.status(0), Some(false));

    // t=0: pressed, not held
    input_bank(&mut board).set_input(INPUT_BANK, 0, false);
    assert_eq!(
        sockets.tick(0, &mut board.gpio),
        Some(SocketEvent::Toggled { id: 0, status: true })
    );
    assert_eq!(board.gpio.state(9), Ok(true));
    let mut reopened = EepromSocketDb::new(eeprom.clone());
    reopened.load_socket_db().unwrap();
    assert_eq!(reopened.socket_status(0), Ok(true));

    // t=500: still low, inside the hold window
    assert_eq!(sockets.tick(500, &mut board.gpio), None);
    assert_eq!(sockets.status(0), Some(true));

    // t=1100: hold expired, button released
    input_bank(&mut board).set_input(INPUT_BANK, 0, true);
    assert_eq!(sockets.tick(1100, &mut board.gpio), None);

    // t=1200: new press toggles back
    input_bank(&mut board).set_input(INPUT_BANK, 0, false);
    assert_eq!(
        sockets.tick(1200, &mut board.gpio),
        Some(SocketEvent::Toggled { id: 0, status: false })
    );
    assert_eq!(board.gpio.state(9), Ok(false));
}

#[test]
fn socket_state_survives_reboot() {
    let eeprom = MockEeprom::new(64);
    let settings = [SocketSettings::new(0, "Kitchen", 9), SocketSettings::new(1, "Garage", 10)];

    {
        let mut board = full_board();
        let store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom.clone()));
        let mut sockets = SocketController::new(Default::default(), store);
        sockets.begin(&settings, &mut board.gpio);
        sockets.set_status(1, true, true, &mut board.gpio).unwrap();
    }

    let mut board = full_board();
    let store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom));
    let mut sockets = SocketController::new(Default::default(), store);
    sockets.begin(&settings, &mut board.gpio);
    assert_eq!(sockets.status(0), Some(false));
    assert_eq!(sockets.status(1), Some(true));
    assert_eq!(board.gpio.state(10), Ok(true));
}

// ============================================================================
// Pin cache and input liveness
// ============================================================================

#[test]
fn output_state_comes_from_cache() {
    let mut board: PlcBoard = Board::begin(
        DEVKIT,
        MockGpio::new(),
        |_, _| Ok::<_, ()>(MockI2c::new()),
        |_| Ok::<_, ()>(MockOneWire::new()),
    );
    for level in [true, false, true] {
        board.gpio.write(9, level).unwrap();
        assert_eq!(board.gpio.state(9), Ok(level));
    }
    assert_eq!(board.gpio.native().reads(16), 0);
}

#[test]
fn input_state_is_live() {
    let mut board: PlcBoard = Board::begin(
        DEVKIT,
        MockGpio::new(),
        |_, _| Ok::<_, ()>(MockI2c::new()),
        |_| Ok::<_, ()>(MockOneWire::new()),
    );
    board.gpio.native_mut().set_input(0, false);
    assert_eq!(board.gpio.state(17), Ok(false));
    board.gpio.native_mut().set_input(0, true);
    assert_eq!(board.gpio.state(17), Ok(true));
    assert_eq!(board.gpio.native().reads(0), 2);
}

#[test]
fn unknown_pin_reports_error() {
    let mut board = full_board();
    assert_eq!(board.gpio.state(99), Err(PinError::Unknown(99)));
}

// ============================================================================
// Supervisor
// ============================================================================

fn supervisor(board: &mut PlcBoard) -> PlcSupervisor<MockDisplay> {
    let mut plc = PlcSupervisor::new(Default::default(), "PLC", MockDisplay::new());
    assert!(plc.begin(&PLC_ESP32_V1.plc, &mut board.gpio, &mut board.onewire, 0));
    plc
}

fn rotate(plc: &mut PlcSupervisor<MockDisplay>, board: &mut PlcBoard, now: u64) {
    for _ in 0..4 {
        plc.tick(now, &mut board.gpio, &mut board.onewire);
    }
}

#[test]
fn alarm_sources_combine() {
    let mut board = full_board();
    let mut plc = supervisor(&mut board);

    plc.set_alarm(PlcMod::Wifi, true, &mut board.gpio);
    let once = plc.alarm_mask();
    plc.set_alarm(PlcMod::Wifi, true, &mut board.gpio);
    assert_eq!(plc.alarm_mask(), once);

    plc.set_alarm(PlcMod::Gsm, false, &mut board.gpio);
    assert_eq!(plc.alarm_mask(), once);

    rotate(&mut plc, &mut board, 500);
    assert_eq!(board.gpio.state(1), Ok(true));

    plc.set_alarm(PlcMod::Wifi, false, &mut board.gpio);
    assert_eq!(plc.alarm_mask(), 0);
    assert_eq!(board.gpio.state(1), Ok(false));

    // no source: blinking stops
    for t in [1000, 1500, 2000] {
        rotate(&mut plc, &mut board, t);
        assert_eq!(board.gpio.state(1), Ok(false));
    }
}

#[test]
fn fan_switches_once_each_way() {
    let line = board_line();
    let mut board = plc_board(both_banks(), line.clone());
    let mut plc = supervisor(&mut board);
    let rom = board_rom();

    let temperatures = [30.0, 45.0, 51.0, 48.0, 45.0, 42.0, 41.0, 39.0, 45.0, 38.0];
    let mut transitions = Vec::new();
    let mut was_on = false;
    for (i, celsius) in temperatures.iter().enumerate() {
        line.set_temperature(&rom, *celsius);
        rotate(&mut plc, &mut board, 5000 * (i as u64 + 1));
        if plc.fan_on() != was_on {
            was_on = plc.fan_on();
            transitions.push((*celsius, was_on));
        }
    }
    assert_eq!(transitions, vec![(51.0, true), (39.0, false)]);
    assert_eq!(board.gpio.state(4), Ok(false));
}

#[test]
fn display_shows_name_and_temperature() {
    let line = board_line();
    let mut board = plc_board(both_banks(), line.clone());
    let mut plc = supervisor(&mut board);
    line.set_temperature(&board_rom(), 41.5);

    rotate(&mut plc, &mut board, 0);
    assert_eq!(plc.display().line2(), Some("T:--.-C FAN:OFF"));

    rotate(&mut plc, &mut board, 5000);
    assert_eq!(plc.display().line1(), Some("PLC"));
    assert_eq!(plc.display().line2(), Some("T:41.5C FAN:OFF"));

    plc.set_alarm(PlcMod::Fan, true, &mut board.gpio);
    rotate(&mut plc, &mut board, 10_000);
    assert_eq!(plc.display().line2(), Some("ALARM"));
}

#[test]
fn relay_leds_follow_relays() {
    let mut board = full_board();
    let mut plc = supervisor(&mut board);
    board.gpio.write(9, true).unwrap();
    rotate(&mut plc, &mut board, 0);
    assert_eq!(board.gpio.state(25), Ok(true));
    assert_eq!(board.gpio.state(26), Ok(false));
}

// ============================================================================
// Sensor failure
// ============================================================================

/// Ticks every 100 ms from `from` until `reads` more sensor reads happened.
///
/// With a single sensor a read is exactly a tick that leaves `Waiting`.
fn run_reads(
    meteo: &mut MeteoController,
    board: &mut PlcBoard,
    from: u64,
    reads: usize,
    events: &mut Vec<MeteoEvent>,
) -> u64 {
    let mut t = from;
    let mut done = 0;
    while done < reads {
        let waiting = meteo.phase() == MeteoPhase::Waiting;
        if let Some(event) = meteo.tick(t, &mut board.onewire) {
            events.push(event);
        }
        if waiting && meteo.phase() != MeteoPhase::Waiting {
            done += 1;
        }
        t += 100;
    }
    t
}

#[test]
fn failing_sensor_reports_sentinel_once() {
    let rom = outdoor_rom();
    let line = MockOneWire::new().with_sensor(rom, 20.0);
    let mut board = plc_board(both_banks(), line.clone());
    let mut meteo = MeteoController::new(MeteoConfig::default());
    assert!(meteo.begin(&[SensorSettings::new(0, "Outside", &rom.to_hex())], &board.onewire, 0));

    let mut events = Vec::new();
    let t = run_reads(&mut meteo, &mut board, 0, 1, &mut events);
    assert_eq!(meteo.temperature(0), Some(20.0));

    line.disconnect(&rom);
    let t = run_reads(&mut meteo, &mut board, t, 3, &mut events);
    assert_eq!(meteo.temperature(0), Some(20.0));
    assert!(events.is_empty());

    let t = run_reads(&mut meteo, &mut board, t, 3, &mut events);
    assert_eq!(meteo.temperature(0), Some(SENSOR_ERROR_VALUE));
    assert_eq!(events, vec![MeteoEvent::SensorFailed { id: 0 }]);

    line.connect(&rom);
    let t = run_reads(&mut meteo, &mut board, t, 1, &mut events);
    assert_eq!(meteo.temperature(0), Some(20.0));
    assert_eq!(events.last(), Some(&MeteoEvent::SensorRecovered { id: 0 }));

    line.disconnect(&rom);
    run_reads(&mut meteo, &mut board, t, 4, &mut events);
    assert_eq!(
        events,
        vec![
            MeteoEvent::SensorFailed { id: 0 },
            MeteoEvent::SensorRecovered { id: 0 },
            MeteoEvent::SensorFailed { id: 0 },
        ]
    );
}
