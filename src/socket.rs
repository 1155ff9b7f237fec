//! Relay sockets with debounced local buttons.
//!
//! A socket pairs a relay output with an optional push button. Each
//! [`SocketController::tick`] does two things:
//!
//! 1. releases the debounce hold of every socket whose hold has lasted
//!    `button_wait_ms`
//! 2. samples the button of exactly one socket, if `button_read_ms` has
//!    passed since the previous sample; a shared cursor walks the sockets
//!    that have a button and wraps after the last one
//!
//! A button reading low outside its hold toggles the socket, saves the new
//! state and starts the hold.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::config::{SocketConfig, SocketSettings};
//! use rs_plc::extender::ExtenderManager;
//! use rs_plc::gpio::{GpioManager, PinKind};
//! use rs_plc::hal::{MockEeprom, MockGpio, MockI2c};
//! use rs_plc::i2c::I2cManager;
//! use rs_plc::profile::GpioProfile;
//! use rs_plc::socket::{SocketController, SocketEvent};
//! use rs_plc::storage::{EepromSocketDb, SocketPersistence};
//!
//! let mut gpio: GpioManager<MockGpio, MockI2c> =
//!     GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
//! gpio.begin(&[
//!     GpioProfile::native_output(9, 16, PinKind::Relay),
//!     GpioProfile::native_input(17, 0, PinKind::Input),
//! ]);
//!
//! let store = SocketPersistence::new().with_store(EepromSocketDb::new(MockEeprom::new(64)));
//! let mut sockets = SocketController::new(SocketConfig::default(), store);
//! sockets.begin(&[SocketSettings::new(1, "Kitchen", 9).with_button(17)], &mut gpio);
//!
//! gpio.native_mut().set_input(0, false); // press
//! assert_eq!(sockets.tick(0, &mut gpio), Some(SocketEvent::Toggled { id: 1, status: true }));
//! assert_eq!(gpio.native().level(16), Some(true));
//! ```

use embedded_hal::i2c::I2c;
use log::{debug, error, info, warn};

use crate::arena::Slots;
use crate::config::{ShortString, SocketConfig, SocketSettings};
use crate::gpio::{GpioManager, PinError};
use crate::storage::{SocketPersistence, StoreError};
use crate::timer::Interval;
use crate::traits::NativeGpio;

/// Size of the socket table.
pub const SOCKET_MAX: usize = 32;

/// Errors raised by socket operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// No socket with this id.
    #[error("socket {0} not configured")]
    Unknown(u8),
    /// The socket is out of service.
    #[error("socket {0} is disabled")]
    Disabled(u8),
    /// Id beyond the socket table.
    #[error("socket id {0} out of range")]
    IdOutOfRange(u8),
    /// Button or relay pin not registered.
    #[error("socket pin {0} not registered")]
    UnknownPin(u8),
    /// Relay or button I/O failed.
    #[error(transparent)]
    Pin(#[from] PinError),
    /// State could not be saved.
    #[error("persisting state failed: {0}")]
    Persist(#[from] StoreError),
}

/// Event reported by [`SocketController::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    /// A button press switched a socket.
    Toggled {
        /// Socket id.
        id: u8,
        /// New state.
        status: bool,
    },
}

/// One relay + button pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Socket {
    id: u8,
    name: ShortString,
    status: bool,
    reading: bool,
    hold_started_ms: u64,
    button: Option<u8>,
    relay: u8,
    enabled: bool,
}

impl Socket {
    /// Socket id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current on/off state.
    pub fn status(&self) -> bool {
        self.status
    }

    /// Whether the button is in its post-press hold.
    pub fn reading(&self) -> bool {
        self.reading
    }

    /// Button pin id.
    pub fn button(&self) -> Option<u8> {
        self.button
    }

    /// Relay pin id.
    pub fn relay(&self) -> u8 {
        self.relay
    }

    /// Whether the socket is in service.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn sampleable(&self) -> bool {
        self.enabled && self.button.is_some()
    }
}

/// Bank of relay sockets.
#[derive(Debug)]
pub struct SocketController {
    config: SocketConfig,
    sockets: Slots<Socket, SOCKET_MAX>,
    store: SocketPersistence,
    read_timer: Interval,
    cursor: usize,
    enabled: bool,
}

impl SocketController {
    /// Creates an empty controller.
    pub fn new(config: SocketConfig, store: SocketPersistence) -> Self {
        Self {
            read_timer: Interval::new(u64::from(config.button_read_ms)),
            enabled: config.enabled,
            config,
            sockets: Slots::new(),
            store,
            cursor: 0,
        }
    }

    /// Registers the configured sockets and restores their saved states.
    ///
    /// Returns `false` when disabled or when any socket was rejected.
    pub fn begin<G: NativeGpio, I: I2c>(
        &mut self,
        settings: &[SocketSettings],
        gpio: &mut GpioManager<G, I>,
    ) -> bool {
        if !self.enabled {
            debug!("socket controller disabled");
            return false;
        }
        let mut ok = true;
        for s in settings {
            if let Err(e) = self.add_socket(s, gpio) {
                error!("socket {} ({}): {}", s.id, s.name, e);
                ok = false;
            }
        }
        self.load_states(gpio);
        info!("{} socket(s) ready", self.sockets.len());
        ok
    }

    /// Adds or replaces a socket after checking its pins exist.
    pub fn add_socket<G: NativeGpio, I: I2c>(
        &mut self,
        settings: &SocketSettings,
        gpio: &GpioManager<G, I>,
    ) -> Result<(), SocketError> {
        if usize::from(settings.id) >= SOCKET_MAX {
            return Err(SocketError::IdOutOfRange(settings.id));
        }
        if gpio.pin(settings.relay).is_none() {
            return Err(SocketError::UnknownPin(settings.relay));
        }
        if let Some(button) = settings.button {
            if gpio.pin(button).is_none() {
                return Err(SocketError::UnknownPin(button));
            }
        }
        let socket = Socket {
            id: settings.id,
            name: settings.name.clone(),
            status: false,
            reading: false,
            hold_started_ms: 0,
            button: settings.button,
            relay: settings.relay,
            enabled: settings.enabled,
        };
        self.sockets
            .insert(usize::from(settings.id), socket)
            .map_err(|_| SocketError::IdOutOfRange(settings.id))?;
        Ok(())
    }

    /// Removes a socket.
    pub fn remove_socket(&mut self, id: u8) -> Option<Socket> {
        self.sockets.remove(usize::from(id))
    }

    /// Loads the store and drives every enabled socket's relay to its saved
    /// state, without saving again.
    ///
    /// Sockets with no saved state come up off. Returns `false` if the store
    /// could not be loaded or a relay could not be driven.
    pub fn load_states<G: NativeGpio, I: I2c>(&mut self, gpio: &mut GpioManager<G, I>) -> bool {
        let mut ok = true;
        if let Err(e) = self.store.load() {
            warn!("socket states not restored: {}", e);
            ok = false;
        }
        let ids: heapless::Vec<u8, SOCKET_MAX> = self
            .sockets
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(_, s)| s.id)
            .collect();
        for id in ids {
            let saved = self
                .sockets
                .get(usize::from(id))
                .and_then(|s| self.store.status(id, &s.name))
                .unwrap_or(false);
            if let Err(e) = self.set_status(id, saved, false, gpio) {
                warn!("socket {}: restoring state failed: {}", id, e);
                ok = false;
            }
        }
        ok
    }

    /// Switches a socket.
    ///
    /// The relay is always driven and the in-memory state always changes.
    /// With `save` the new state is also persisted. The first failure is
    /// returned after both steps have been attempted.
    pub fn set_status<G: NativeGpio, I: I2c>(
        &mut self,
        id: u8,
        status: bool,
        save: bool,
        gpio: &mut GpioManager<G, I>,
    ) -> Result<(), SocketError> {
        let socket = self
            .sockets
            .get_mut(usize::from(id))
            .ok_or(SocketError::Unknown(id))?;
        if !socket.enabled {
            return Err(SocketError::Disabled(id));
        }
        socket.status = status;

        let switched = gpio.write(socket.relay, status).map_err(SocketError::from);
        match &switched {
            Ok(()) => debug!("socket {}: relay {}", id, if status { "on" } else { "off" }),
            Err(e) => error!("socket {}: relay write failed: {}", id, e),
        }

        if !save {
            return switched;
        }
        let saved = self
            .store
            .persist(id, &socket.name, status)
            .map_err(SocketError::from);
        match &saved {
            Ok(()) => info!("socket {}: state {} saved", id, status),
            Err(e) => error!("socket {}: {}", id, e),
        }
        switched.and(saved)
    }

    /// Runs debounce expiry and one round-robin button sample.
    pub fn tick<G: NativeGpio, I: I2c>(
        &mut self,
        now_ms: u64,
        gpio: &mut GpioManager<G, I>,
    ) -> Option<SocketEvent> {
        if !self.enabled {
            return None;
        }

        let wait = u64::from(self.config.button_wait_ms);
        for (_, socket) in self.sockets.iter_mut() {
            if socket.reading && now_ms.saturating_sub(socket.hold_started_ms) >= wait {
                socket.reading = false;
            }
        }

        if !self.read_timer.is_due(now_ms) {
            return None;
        }
        let next = self
            .sockets
            .next_from(self.cursor, Socket::sampleable)
            .or_else(|| self.sockets.next_from(0, Socket::sampleable))?;
        self.read_timer.reset(now_ms);
        self.cursor = next + 1;

        let socket = self.sockets.get(next)?;
        let (id, button, held, status) = (socket.id, socket.button?, socket.reading, socket.status);
        let pressed = match gpio.read(button) {
            Ok(level) => !level,
            Err(e) => {
                debug!("socket {}: button read failed: {}", id, e);
                false
            }
        };
        if !pressed || held {
            return None;
        }

        let toggled = !status;
        info!("socket {}: button pressed", id);
        // relay and in-memory state follow even if saving fails
        if let Err(e) = self.set_status(id, toggled, true, gpio) {
            debug!("socket {}: toggle applied with error: {}", id, e);
        }
        if let Some(socket) = self.sockets.get_mut(next) {
            socket.reading = true;
            socket.hold_started_ms = now_ms;
        }
        Some(SocketEvent::Toggled { id, status: toggled })
    }

    /// Current state of a socket.
    pub fn status(&self, id: u8) -> Option<bool> {
        self.socket(id).map(Socket::status)
    }

    /// Socket by id.
    pub fn socket(&self, id: u8) -> Option<&Socket> {
        self.sockets.get(usize::from(id))
    }

    /// All sockets in id order.
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.sockets.iter().map(|(_, s)| s)
    }

    /// Sockets in service.
    pub fn enabled_sockets(&self) -> impl Iterator<Item = &Socket> {
        self.sockets().filter(|s| s.enabled)
    }

    /// Enables or disables the whole controller.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the controller runs.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Persistence backends.
    pub fn store(&self) -> &SocketPersistence {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extender::ExtenderManager;
    use crate::gpio::PinKind;
    use crate::hal::{MockEeprom, MockGpio, MockI2c};
    use crate::i2c::I2cManager;
    use crate::profile::GpioProfile;
    use crate::storage::EepromSocketDb;

    type Gpio = GpioManager<MockGpio, MockI2c>;

    // relays 9, 10, 11 on native 16, 17, 18; buttons 17, 18 on native 0, 2
    fn gpio() -> Gpio {
        let mut gpio = GpioManager::new(MockGpio::new(), I2cManager::new(), ExtenderManager::new());
        gpio.begin(&[
            GpioProfile::native_output(9, 16, PinKind::Relay),
            GpioProfile::native_output(10, 17, PinKind::Relay),
            GpioProfile::native_output(11, 18, PinKind::Relay),
            GpioProfile::native_input(17, 0, PinKind::Input),
            GpioProfile::native_input(18, 2, PinKind::Input),
        ]);
        gpio
    }

    fn controller(eeprom: &MockEeprom) -> SocketController {
        let store = SocketPersistence::new().with_store(EepromSocketDb::new(eeprom.clone()));
        SocketController::new(SocketConfig::default(), store)
    }

    fn two_sockets() -> [SocketSettings; 2] {
        [
            SocketSettings::new(1, "Kitchen", 9).with_button(17),
            SocketSettings::new(2, "Garage", 10).with_button(18),
        ]
    }

    // =========================================================================
    // Configuration Tests
    // =========================================================================

    #[test]
    fn unknown_pins_rejected() {
        let gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        assert_eq!(
            c.add_socket(&SocketSettings::new(1, "x", 99), &gpio),
            Err(SocketError::UnknownPin(99))
        );
        assert_eq!(
            c.add_socket(&SocketSettings::new(1, "x", 9).with_button(98), &gpio),
            Err(SocketError::UnknownPin(98))
        );
        assert_eq!(
            c.add_socket(&SocketSettings::new(32, "x", 9), &gpio),
            Err(SocketError::IdOutOfRange(32))
        );
        assert_eq!(c.sockets().count(), 0);
    }

    #[test]
    fn enabled_sockets_filters() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(
            &[
                SocketSettings::new(1, "a", 9),
                SocketSettings::new(2, "b", 10).with_enabled(false),
            ],
            &mut gpio,
        );
        let ids: Vec<u8> = c.enabled_sockets().map(Socket::id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(c.set_status(2, true, false, &mut gpio), Err(SocketError::Disabled(2)));
    }

    // =========================================================================
    // Status Tests
    // =========================================================================

    #[test]
    fn set_status_drives_relay_and_saves() {
        let eeprom = MockEeprom::new(64);
        let mut gpio = gpio();
        let mut c = controller(&eeprom);
        c.begin(&two_sockets(), &mut gpio);

        c.set_status(2, true, true, &mut gpio).unwrap();
        assert_eq!(gpio.native().level(17), Some(true));
        assert_eq!(c.status(2), Some(true));
        assert_eq!(eeprom.bytes()[2], 0b0000_0100);
    }

    #[test]
    fn set_status_without_save_leaves_store() {
        let eeprom = MockEeprom::new(64);
        let mut gpio = gpio();
        let mut c = controller(&eeprom);
        c.begin(&two_sockets(), &mut gpio);
        c.set_status(1, true, false, &mut gpio).unwrap();
        assert_eq!(eeprom.bytes()[0], 0xFF);
    }

    #[test]
    fn persistence_failure_still_switches_relay() {
        let mut eeprom = MockEeprom::new(64);
        eeprom.fail = true;
        let mut gpio = gpio();
        let mut c = controller(&eeprom);
        c.begin(&two_sockets(), &mut gpio);

        let result = c.set_status(1, true, true, &mut gpio);
        assert_eq!(result, Err(SocketError::Persist(StoreError::Medium)));
        assert_eq!(gpio.native().level(16), Some(true));
        assert_eq!(c.status(1), Some(true));
    }

    #[test]
    fn load_states_restores_after_reboot() {
        let eeprom = MockEeprom::new(64);
        {
            let mut gpio = gpio();
            let mut c = controller(&eeprom);
            c.begin(&two_sockets(), &mut gpio);
            c.set_status(2, true, true, &mut gpio).unwrap();
        }
        let mut gpio = gpio();
        let mut c = controller(&eeprom);
        c.begin(&two_sockets(), &mut gpio);
        assert_eq!(c.status(1), Some(false));
        assert_eq!(c.status(2), Some(true));
        assert_eq!(gpio.native().level(17), Some(true));
    }

    // =========================================================================
    // Button Tests
    // =========================================================================

    #[test]
    fn cursor_samples_one_socket_per_period() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(&two_sockets(), &mut gpio);

        c.tick(0, &mut gpio);
        assert_eq!(gpio.native().reads(0), 1);
        assert_eq!(gpio.native().reads(2), 0);

        c.tick(50, &mut gpio);
        assert_eq!(gpio.native().reads(2), 0);

        c.tick(100, &mut gpio);
        assert_eq!(gpio.native().reads(2), 1);

        // wraps back to the first socket
        c.tick(200, &mut gpio);
        assert_eq!(gpio.native().reads(0), 2);
    }

    #[test]
    fn removing_socket_under_cursor_wraps() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(&two_sockets(), &mut gpio);

        // socket 1 sampled, cursor now on socket 2
        c.tick(0, &mut gpio);
        let removed = c.remove_socket(2).unwrap();
        assert_eq!(removed.id(), 2);
        assert_eq!(c.status(2), None);

        c.tick(100, &mut gpio);
        assert_eq!(gpio.native().reads(0), 2);
        assert_eq!(gpio.native().reads(2), 0);

        assert!(c.remove_socket(1).is_some());
        assert!(c.remove_socket(1).is_none());
        assert_eq!(c.tick(200, &mut gpio), None);
        assert_eq!(gpio.native().reads(0), 2);
    }

    #[test]
    fn socket_without_button_is_skipped() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(
            &[
                SocketSettings::new(1, "a", 9).with_button(17),
                SocketSettings::new(3, "pump", 11),
            ],
            &mut gpio,
        );
        c.tick(0, &mut gpio);
        c.tick(100, &mut gpio);
        assert_eq!(gpio.native().reads(0), 2);
    }

    #[test]
    fn held_button_does_not_retoggle_within_hold() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(&two_sockets()[..1], &mut gpio);

        gpio.native_mut().set_input(0, false);
        assert!(c.tick(0, &mut gpio).is_some());
        for t in (100..1000).step_by(100) {
            assert_eq!(c.tick(t, &mut gpio), None);
        }
        assert_eq!(c.status(1), Some(true));
        assert!(c.socket(1).unwrap().reading());
    }

    #[test]
    fn button_toggles_even_when_saving_fails() {
        let mut eeprom = MockEeprom::new(64);
        eeprom.fail = true;
        let mut gpio = gpio();
        let mut c = controller(&eeprom);
        c.begin(&two_sockets()[..1], &mut gpio);

        gpio.native_mut().set_input(0, false);
        assert_eq!(c.tick(0, &mut gpio), Some(SocketEvent::Toggled { id: 1, status: true }));
        assert_eq!(gpio.native().level(16), Some(true));
        assert_eq!(c.status(1), Some(true));
        assert!(c.socket(1).unwrap().reading());
    }

    #[test]
    fn disabled_controller_does_nothing() {
        let mut gpio = gpio();
        let mut c = controller(&MockEeprom::new(64));
        c.begin(&two_sockets(), &mut gpio);
        c.set_enabled(false);
        gpio.native_mut().set_input(0, false);
        assert_eq!(c.tick(0, &mut gpio), None);
        assert_eq!(gpio.native().reads(0), 0);
    }
}
