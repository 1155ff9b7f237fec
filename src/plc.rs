//! PLC supervisor: alarm indication, buzzer, fan and status display.
//!
//! The supervisor is a four-phase round robin. Every [`tick`] runs exactly
//! one phase and moves to the next one, whatever happened:
//!
//! ```text
//! BuzzerOff -> AlarmBlink -> FanControl -> StatusDisplay -> BuzzerOff ...
//! ```
//!
//! Each phase has its own timer, so a phase whose timer has not elapsed
//! does nothing on its turn. Per call the work is bounded by one phase.
//!
//! Alarm and buzzer requests are bitmasks with one bit per [`PlcMod`]. Any
//! number of sources can assert at once; the outputs blink while the mask is
//! non-zero and are forced off the moment it reaches zero.
//!
//! [`tick`]: PlcSupervisor::tick

use core::fmt::Write as _;

use embedded_hal::i2c::I2c;
use heapless::String;
use log::{debug, info, warn};

use crate::config::{PlcConfig, ShortString};
use crate::gpio::GpioManager;
use crate::onewire::OneWireManager;
use crate::profile::{BoardSensor, PlcPins, RelayLed};
use crate::timer::Interval;
use crate::traits::{NativeGpio, OneWire, StatusDisplay};

/// Subsystem that can raise an alarm or buzzer request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PlcMod {
    /// WiFi link down.
    Wifi = 0,
    /// Ethernet link down.
    Ethernet = 1,
    /// GSM modem unavailable.
    Gsm = 2,
    /// Chat bot unreachable.
    Telegram = 3,
    /// Storage failure.
    Storage = 4,
    /// Temperature sensor failure.
    Meteo = 5,
    /// Board overheating.
    Fan = 6,
}

impl PlcMod {
    /// Mask bit of this source.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Scheduler phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlcPhase {
    /// Silence the buzzer after a beep.
    BuzzerOff,
    /// Toggle the alarm LED and buzzer.
    AlarmBlink,
    /// Board temperature hysteresis.
    FanControl,
    /// Refresh the display and relay indicators.
    StatusDisplay,
}

impl PlcPhase {
    /// Phase visited after this one.
    pub const fn next(self) -> Self {
        match self {
            Self::BuzzerOff => Self::AlarmBlink,
            Self::AlarmBlink => Self::FanControl,
            Self::FanControl => Self::StatusDisplay,
            Self::StatusDisplay => Self::BuzzerOff,
        }
    }
}

/// Resolved role pins; a role whose pin is missing is `None`.
#[derive(Clone, Copy, Debug, Default)]
struct Roles {
    alarm_led: Option<u8>,
    status_led: Option<u8>,
    buzzer: Option<u8>,
    fan: Option<u8>,
    relay_leds: &'static [RelayLed],
    board_sensor: Option<BoardSensor>,
}

/// Alarm, buzzer, fan and display supervisor.
#[derive(Debug)]
pub struct PlcSupervisor<D> {
    config: PlcConfig,
    name: ShortString,
    display: D,
    roles: Roles,
    phase: PlcPhase,
    alarm: u8,
    buzzer: u8,
    blink_on: bool,
    buzzer_on: bool,
    last_blink_ms: Option<u64>,
    fan_enabled: bool,
    fan_on: bool,
    temperature: Option<f32>,
    alarm_timer: Interval,
    fan_timer: Interval,
    display_timer: Interval,
    enabled: bool,
}

fn drive<G: NativeGpio, I: I2c>(gpio: &mut GpioManager<G, I>, pin: Option<u8>, high: bool, role: &str) {
    if let Some(id) = pin {
        if let Err(e) = gpio.write(id, high) {
            warn!("{} (pin {}): {}", role, id, e);
        }
    }
}

impl<D: StatusDisplay> PlcSupervisor<D> {
    /// Creates a supervisor; `name` is the first display line.
    pub fn new(config: PlcConfig, name: &str, display: D) -> Self {
        Self {
            alarm_timer: Interval::new(u64::from(config.alarm_period_ms)),
            fan_timer: Interval::new(u64::from(config.fan_period_ms)),
            display_timer: Interval::new(u64::from(config.display_period_ms)),
            fan_enabled: config.fan_monitoring,
            enabled: config.enabled,
            config,
            name: crate::config::short_string(name),
            display,
            roles: Roles::default(),
            phase: PlcPhase::BuzzerOff,
            alarm: 0,
            buzzer: 0,
            blink_on: false,
            buzzer_on: false,
            last_blink_ms: None,
            fan_on: false,
            temperature: None,
        }
    }

    /// Resolves role pins, drives every output to its idle level, turns on
    /// the status LED and starts the first board temperature conversion.
    ///
    /// Missing pins, bus or sensor are logged once and the matching feature
    /// stays off. Returns `false` when disabled or when anything is missing.
    pub fn begin<G: NativeGpio, I: I2c, W: OneWire>(
        &mut self,
        pins: &PlcPins,
        gpio: &mut GpioManager<G, I>,
        onewire: &mut OneWireManager<W>,
        now_ms: u64,
    ) -> bool {
        if !self.enabled {
            debug!("PLC supervisor disabled");
            return false;
        }
        let mut ok = true;
        let mut resolve = |role: &str, pin: Option<u8>| match pin {
            Some(id) if gpio.pin(id).is_none() => {
                warn!("PLC {}: pin {} not available", role, id);
                ok = false;
                None
            }
            other => other,
        };
        let mut roles = Roles {
            alarm_led: resolve("alarm LED", pins.alarm_led),
            status_led: resolve("status LED", pins.status_led),
            buzzer: resolve("buzzer", pins.buzzer),
            fan: resolve("fan", pins.fan),
            relay_leds: pins.relay_leds,
            board_sensor: pins.board_sensor,
        };

        if let Some(sensor) = roles.board_sensor {
            if let Err(e) = onewire.request_temperatures(sensor.bus) {
                warn!("PLC board sensor unavailable: {}", e);
                roles.board_sensor = None;
                ok = false;
            }
        }
        self.roles = roles;

        drive(gpio, self.roles.alarm_led, false, "alarm LED");
        drive(gpio, self.roles.buzzer, false, "buzzer");
        drive(gpio, self.roles.fan, false, "fan");
        drive(gpio, self.roles.status_led, true, "status LED");

        if let Err(e) = self.display.init() {
            warn!("status display init failed: {:?}", e);
            ok = false;
        }

        self.alarm_timer.reset(now_ms);
        self.fan_timer.reset(now_ms);
        self.display_timer.expire();
        info!("PLC supervisor started");
        ok
    }

    /// Runs the current phase and advances to the next. Returns the phase
    /// that ran.
    pub fn tick<G: NativeGpio, I: I2c, W: OneWire>(
        &mut self,
        now_ms: u64,
        gpio: &mut GpioManager<G, I>,
        onewire: &mut OneWireManager<W>,
    ) -> PlcPhase {
        let current = self.phase;
        if !self.enabled {
            return current;
        }
        match current {
            PlcPhase::BuzzerOff => self.buzzer_off(now_ms, gpio),
            PlcPhase::AlarmBlink => self.alarm_blink(now_ms, gpio),
            PlcPhase::FanControl => self.fan_control(now_ms, gpio, onewire),
            PlcPhase::StatusDisplay => self.status_display(now_ms, gpio),
        }
        self.phase = current.next();
        current
    }

    fn buzzer_off<G: NativeGpio, I: I2c>(&mut self, now_ms: u64, gpio: &mut GpioManager<G, I>) {
        let Some(last) = self.last_blink_ms else {
            return;
        };
        if self.buzzer_on && now_ms.saturating_sub(last) >= u64::from(self.config.buzzer_off_ms) {
            drive(gpio, self.roles.buzzer, false, "buzzer");
            self.buzzer_on = false;
        }
    }

    fn alarm_blink<G: NativeGpio, I: I2c>(&mut self, now_ms: u64, gpio: &mut GpioManager<G, I>) {
        if !self.alarm_timer.poll(now_ms) || (self.alarm == 0 && self.buzzer == 0) {
            return;
        }
        self.blink_on = !self.blink_on;
        self.last_blink_ms = Some(now_ms);
        if self.alarm != 0 {
            drive(gpio, self.roles.alarm_led, self.blink_on, "alarm LED");
        }
        if self.buzzer != 0 {
            drive(gpio, self.roles.buzzer, self.blink_on, "buzzer");
            self.buzzer_on = self.blink_on;
        }
    }

    fn fan_control<G: NativeGpio, I: I2c, W: OneWire>(
        &mut self,
        now_ms: u64,
        gpio: &mut GpioManager<G, I>,
        onewire: &mut OneWireManager<W>,
    ) {
        if !self.fan_enabled || !self.fan_timer.poll(now_ms) {
            return;
        }
        let Some(sensor) = self.roles.board_sensor else {
            return;
        };
        match onewire.read_temperature(sensor.bus, &sensor.address) {
            Ok(celsius) => {
                self.temperature = Some(celsius);
                if celsius > self.config.fan_on_celsius && !self.fan_on {
                    info!("board at {:.1}°C, fan on", celsius);
                    self.set_fan(true, gpio);
                } else if celsius < self.config.fan_off_celsius && self.fan_on {
                    info!("board at {:.1}°C, fan off", celsius);
                    self.set_fan(false, gpio);
                }
            }
            Err(e) => debug!("board temperature read failed: {}", e),
        }
        // next reading is ready by the next fan period
        if let Err(e) = onewire.request_temperatures(sensor.bus) {
            debug!("board temperature request failed: {}", e);
        }
    }

    fn set_fan<G: NativeGpio, I: I2c>(&mut self, on: bool, gpio: &mut GpioManager<G, I>) {
        drive(gpio, self.roles.fan, on, "fan");
        self.fan_on = on;
    }

    fn status_display<G: NativeGpio, I: I2c>(&mut self, now_ms: u64, gpio: &mut GpioManager<G, I>) {
        if !self.display_timer.poll(now_ms) {
            return;
        }
        for rl in self.roles.relay_leds {
            match gpio.state(rl.relay) {
                Ok(on) => drive(gpio, Some(rl.led), on, "relay LED"),
                Err(e) => debug!("relay {} state unavailable: {}", rl.relay, e),
            }
        }
        let line2 = self.status_line();
        if let Err(e) = self.display.show_lines(&self.name, &line2) {
            debug!("status display refresh failed: {:?}", e);
        }
    }

    /// Second display line.
    pub fn status_line(&self) -> String<32> {
        let mut line = String::new();
        let fan = if self.fan_on { "ON" } else { "OFF" };
        let _ = if self.alarm != 0 {
            line.push_str("ALARM").map_err(|_| core::fmt::Error)
        } else if let Some(t) = self.temperature {
            write!(line, "T:{:.1}C FAN:{}", t, fan)
        } else {
            write!(line, "T:--.-C FAN:{}", fan)
        };
        line
    }

    /// Asserts or clears an alarm source.
    pub fn set_alarm<G: NativeGpio, I: I2c>(&mut self, source: PlcMod, on: bool, gpio: &mut GpioManager<G, I>) {
        let before = self.alarm;
        self.alarm = apply(self.alarm, source, on);
        if before != 0 && self.alarm == 0 {
            drive(gpio, self.roles.alarm_led, false, "alarm LED");
            self.settle_blink();
        }
    }

    /// Asserts or clears a buzzer source.
    pub fn set_buzzer<G: NativeGpio, I: I2c>(&mut self, source: PlcMod, on: bool, gpio: &mut GpioManager<G, I>) {
        let before = self.buzzer;
        self.buzzer = apply(self.buzzer, source, on);
        if before != 0 && self.buzzer == 0 {
            drive(gpio, self.roles.buzzer, false, "buzzer");
            self.buzzer_on = false;
            self.settle_blink();
        }
    }

    fn settle_blink(&mut self) {
        if self.alarm == 0 && self.buzzer == 0 {
            self.blink_on = false;
        }
    }

    /// Active alarm sources.
    pub fn alarm_mask(&self) -> u8 {
        self.alarm
    }

    /// Active buzzer sources.
    pub fn buzzer_mask(&self) -> u8 {
        self.buzzer
    }

    /// Enables or disables fan monitoring. Disabling turns the fan off and
    /// forgets the board temperature.
    pub fn set_fan_enabled<G: NativeGpio, I: I2c>(&mut self, enabled: bool, gpio: &mut GpioManager<G, I>) {
        self.fan_enabled = enabled;
        if !enabled {
            self.set_fan(false, gpio);
            self.temperature = None;
        }
    }

    /// Whether the fan is running.
    pub fn fan_on(&self) -> bool {
        self.fan_on
    }

    /// Last board temperature.
    pub fn board_temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Phase the next tick will run.
    pub fn phase(&self) -> PlcPhase {
        self.phase
    }

    /// Status display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Mutable status display.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Enables or disables the supervisor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

fn apply(mask: u8, source: PlcMod, on: bool) -> u8 {
    if on {
        mask | source.bit()
    } else {
        mask & !source.bit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extender::ExtenderManager;
    use crate::gpio::PinKind;
    use crate::hal::{MockDisplay, MockGpio, MockI2c, MockOneWire};
    use crate::i2c::I2cManager;
    use crate::onewire::RomAddress;
    use crate::profile::{GpioProfile, OneWireProfile};

    type Gpio = GpioManager<MockGpio, MockI2c>;

    const PINS: PlcPins = PlcPins {
        alarm_led: Some(1),
        status_led: Some(2),
        buzzer: Some(3),
        fan: None,
        buttons: [None; 3],
        relay_leds: &[RelayLed { relay: 9, led: 25 }],
        board_sensor: None,
    };

    fn setup() -> (PlcSupervisor<MockDisplay>, Gpio, OneWireManager<MockOneWire>) {
        let mut gpio = GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
        gpio.begin(&[
            GpioProfile::native_output(1, 2, PinKind::Generic),
            GpioProfile::native_output(2, 15, PinKind::Generic),
            GpioProfile::native_output(3, 12, PinKind::Buzzer),
            GpioProfile::native_output(9, 16, PinKind::Relay),
            GpioProfile::native_output(25, 26, PinKind::Generic),
        ]);
        let mut ow = OneWireManager::new();
        let mut plc = PlcSupervisor::new(PlcConfig::default(), "PLC", MockDisplay::new());
        assert!(plc.begin(&PINS, &mut gpio, &mut ow, 0));
        (plc, gpio, ow)
    }

    #[test]
    fn phases_rotate_unconditionally() {
        let (mut plc, mut gpio, mut ow) = setup();
        let ran: Vec<PlcPhase> = (0..5).map(|_| plc.tick(0, &mut gpio, &mut ow)).collect();
        assert_eq!(
            ran,
            vec![
                PlcPhase::BuzzerOff,
                PlcPhase::AlarmBlink,
                PlcPhase::FanControl,
                PlcPhase::StatusDisplay,
                PlcPhase::BuzzerOff,
            ]
        );
    }

    #[test]
    fn begin_sets_idle_levels() {
        let (plc, gpio, _) = setup();
        assert_eq!(gpio.native().level(15), Some(true));
        assert_eq!(gpio.native().level(2), Some(false));
        assert_eq!(gpio.native().level(12), Some(false));
        assert!(plc.display().initialized);
    }

    #[test]
    fn missing_role_pin_degrades() {
        let mut gpio: Gpio = GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
        let mut ow: OneWireManager<MockOneWire> = OneWireManager::new();
        let mut plc = PlcSupervisor::new(PlcConfig::default(), "PLC", MockDisplay::new());
        assert!(!plc.begin(&PINS, &mut gpio, &mut ow, 0));
        plc.set_alarm(PlcMod::Wifi, true, &mut gpio);
        for t in 0..8 {
            plc.tick(t * 500, &mut gpio, &mut ow);
        }
        assert_eq!(gpio.native().write_count, 0);
    }

    #[test]
    fn alarm_blinks_while_asserted() {
        let (mut plc, mut gpio, mut ow) = setup();
        plc.set_alarm(PlcMod::Wifi, true, &mut gpio);

        // AlarmBlink runs on the second tick of each rotation
        plc.tick(500, &mut gpio, &mut ow);
        plc.tick(500, &mut gpio, &mut ow);
        assert_eq!(gpio.native().level(2), Some(true));

        plc.tick(1000, &mut gpio, &mut ow);
        plc.tick(1000, &mut gpio, &mut ow);
        plc.tick(1000, &mut gpio, &mut ow);
        plc.tick(1000, &mut gpio, &mut ow);
        assert_eq!(gpio.native().level(2), Some(false));
    }

    #[test]
    fn buzzer_silenced_after_beep() {
        let (mut plc, mut gpio, mut ow) = setup();
        plc.set_buzzer(PlcMod::Gsm, true, &mut gpio);
        plc.tick(500, &mut gpio, &mut ow); // BuzzerOff, nothing yet
        plc.tick(500, &mut gpio, &mut ow); // AlarmBlink: beep
        assert_eq!(gpio.native().level(12), Some(true));
        plc.tick(550, &mut gpio, &mut ow);
        plc.tick(550, &mut gpio, &mut ow);
        plc.tick(599, &mut gpio, &mut ow); // BuzzerOff, 99 ms
        assert_eq!(gpio.native().level(12), Some(true));
        for t in [600, 600, 600, 600] {
            plc.tick(t, &mut gpio, &mut ow);
        }
        assert_eq!(gpio.native().level(12), Some(false));
    }

    #[test]
    fn status_line_formats() {
        let (mut plc, mut gpio, _) = setup();
        assert_eq!(plc.status_line().as_str(), "T:--.-C FAN:OFF");
        plc.temperature = Some(21.54);
        assert_eq!(plc.status_line().as_str(), "T:21.5C FAN:OFF");
        plc.set_alarm(PlcMod::Storage, true, &mut gpio);
        assert_eq!(plc.status_line().as_str(), "ALARM");
    }

    #[test]
    fn display_phase_mirrors_relays() {
        let (mut plc, mut gpio, mut ow) = setup();
        gpio.write(9, true).unwrap();
        for _ in 0..4 {
            plc.tick(0, &mut gpio, &mut ow);
        }
        assert_eq!(gpio.native().level(26), Some(true));
        assert_eq!(plc.display().line1(), Some("PLC"));
        assert_eq!(plc.display().render_count, 1);
    }

    #[test]
    fn alarm_mask_is_idempotent() {
        let (mut plc, mut gpio, mut ow) = setup();
        plc.set_alarm(PlcMod::Wifi, true, &mut gpio);
        plc.set_alarm(PlcMod::Wifi, true, &mut gpio);
        plc.set_alarm(PlcMod::Meteo, true, &mut gpio);
        assert_eq!(plc.alarm_mask(), PlcMod::Wifi.bit() | PlcMod::Meteo.bit());

        plc.tick(500, &mut gpio, &mut ow);
        plc.tick(500, &mut gpio, &mut ow);
        assert_eq!(gpio.native().level(2), Some(true));

        plc.set_alarm(PlcMod::Wifi, false, &mut gpio);
        assert_eq!(gpio.native().level(2), Some(true));
        plc.set_alarm(PlcMod::Meteo, false, &mut gpio);
        plc.set_alarm(PlcMod::Meteo, false, &mut gpio);
        assert_eq!(plc.alarm_mask(), 0);
        assert_eq!(gpio.native().level(2), Some(false));
    }

    // ========================================================================
    // Fan
    // ========================================================================

    fn fan_rom() -> RomAddress {
        RomAddress::from_hex("28FF641E871603D7").unwrap()
    }

    /// Supervisor with a fan relay and a board sensor; the returned line
    /// shares state with the bus.
    fn fan_setup() -> (PlcSupervisor<MockDisplay>, Gpio, OneWireManager<MockOneWire>, MockOneWire) {
        let rom = fan_rom();
        let mut gpio = GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
        gpio.begin(&[GpioProfile::native_output(4, 13, PinKind::Relay)]);
        let mut ow = OneWireManager::new();
        let line = MockOneWire::new().with_sensor(rom, 30.0);
        assert!(ow.begin(&[OneWireProfile { id: 1, pin: 4, enabled: true }], |_| {
            Ok::<_, ()>(line.clone())
        }));
        let pins = PlcPins {
            fan: Some(4),
            board_sensor: Some(BoardSensor { bus: 1, address: rom }),
            ..PlcPins::NONE
        };
        let mut plc = PlcSupervisor::new(PlcConfig::default(), "PLC", MockDisplay::new());
        assert!(plc.begin(&pins, &mut gpio, &mut ow, 0));
        (plc, gpio, ow, line)
    }

    fn rotate(plc: &mut PlcSupervisor<MockDisplay>, now: u64, gpio: &mut Gpio, ow: &mut OneWireManager<MockOneWire>) {
        for _ in 0..4 {
            plc.tick(now, gpio, ow);
        }
    }

    #[test]
    fn fan_follows_hysteresis() {
        let (mut plc, mut gpio, mut ow, line) = fan_setup();
        let set = |c: f32| line.set_temperature(&fan_rom(), c);

        rotate(&mut plc, 5000, &mut gpio, &mut ow);
        assert_eq!(plc.board_temperature(), Some(30.0));
        assert!(!plc.fan_on());

        set(55.0);
        rotate(&mut plc, 10_000, &mut gpio, &mut ow);
        assert!(plc.fan_on());
        assert_eq!(gpio.native().level(13), Some(true));

        // inside the band: no change
        set(45.0);
        rotate(&mut plc, 15_000, &mut gpio, &mut ow);
        assert!(plc.fan_on());

        set(39.0);
        rotate(&mut plc, 20_000, &mut gpio, &mut ow);
        assert!(!plc.fan_on());
        assert_eq!(gpio.native().level(13), Some(false));
    }

    #[test]
    fn fan_waits_for_period() {
        let (mut plc, mut gpio, mut ow, _) = fan_setup();
        rotate(&mut plc, 4999, &mut gpio, &mut ow);
        assert_eq!(plc.board_temperature(), None);
    }

    #[test]
    fn disabling_fan_turns_it_off() {
        let (mut plc, mut gpio, mut ow, line) = fan_setup();
        line.set_temperature(&fan_rom(), 60.0);
        rotate(&mut plc, 5000, &mut gpio, &mut ow);
        assert!(plc.fan_on());

        plc.set_fan_enabled(false, &mut gpio);
        assert!(!plc.fan_on());
        assert_eq!(plc.board_temperature(), None);
        assert_eq!(gpio.native().level(13), Some(false));

        rotate(&mut plc, 10_000, &mut gpio, &mut ow);
        assert!(!plc.fan_on());
    }

    #[test]
    fn disabled_supervisor_does_not_advance() {
        let (mut plc, mut gpio, mut ow) = setup();
        plc.set_enabled(false);
        assert_eq!(plc.tick(0, &mut gpio, &mut ow), PlcPhase::BuzzerOff);
        assert_eq!(plc.phase(), PlcPhase::BuzzerOff);
    }
}
