//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`. Every timing and threshold of the
//! control loop is a field here with its factory value as the default.
//!
//! # Example
//!
//! ```rust
//! use rs_plc::config::{Config, PlcConfig, SocketSettings};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.plc.fan_on_celsius, 50.0);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_plc(PlcConfig::default().with_fan_thresholds(45.0, 35.0))
//!     .with_socket_entry(SocketSettings::new(1, "Kitchen", 9).with_button(17));
//! assert_eq!(config.sockets.len(), 1);
//! ```

use heapless::String as HString;
use heapless::Vec as HVec;

use crate::profile::NetworkDefaults;

/// Maximum length for short config strings (names, hostnames)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum number of configured sockets
pub const MAX_SOCKETS: usize = 32;

/// Maximum number of configured temperature sensors
pub const MAX_SENSORS: usize = 16;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating at a char boundary if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Device identification
    pub device: DeviceConfig,
    /// Network identity (bring-up itself is platform code)
    pub network: NetworkConfig,
    /// PLC supervisor timings and thresholds
    pub plc: PlcConfig,
    /// Socket controller timings
    pub socket: SocketConfig,
    /// Meteo controller timings
    pub meteo: MeteoConfig,
    /// Configured sockets
    pub sockets: HVec<SocketSettings, MAX_SOCKETS>,
    /// Configured temperature sensors
    pub sensors: HVec<SensorSettings, MAX_SENSORS>,
}

impl Config {
    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Set network configuration
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set PLC configuration
    pub fn with_plc(mut self, plc: PlcConfig) -> Self {
        self.plc = plc;
        self
    }

    /// Set socket controller configuration
    pub fn with_socket(mut self, socket: SocketConfig) -> Self {
        self.socket = socket;
        self
    }

    /// Set meteo controller configuration
    pub fn with_meteo(mut self, meteo: MeteoConfig) -> Self {
        self.meteo = meteo;
        self
    }

    /// Add a socket definition (ignored once the table is full)
    pub fn with_socket_entry(mut self, socket: SocketSettings) -> Self {
        let _ = self.sockets.push(socket);
        self
    }

    /// Add a sensor definition (ignored once the table is full)
    pub fn with_sensor_entry(mut self, sensor: SensorSettings) -> Self {
        let _ = self.sensors.push(sensor);
        self
    }

    /// Parse a JSON configuration; missing fields keep their defaults
    #[cfg(feature = "json-db")]
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize to pretty JSON
    #[cfg(feature = "json-db")]
    pub fn to_json(&self) -> Result<std::string::String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// PLC Config
// ============================================================================

/// PLC supervisor configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlcConfig {
    /// Delay after an alarm blink before the buzzer is silenced
    pub buzzer_off_ms: u32,
    /// Alarm LED / buzzer blink period
    pub alarm_period_ms: u32,
    /// Fan control period
    pub fan_period_ms: u32,
    /// Status display refresh period
    pub display_period_ms: u32,
    /// Fan turns on above this board temperature
    pub fan_on_celsius: f32,
    /// Fan turns off below this board temperature
    pub fan_off_celsius: f32,
    /// Whether the fan follows the board temperature
    pub fan_monitoring: bool,
    /// Whether the supervisor runs at all
    pub enabled: bool,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            buzzer_off_ms: 100,
            alarm_period_ms: 500,
            fan_period_ms: 5000,
            display_period_ms: 5000,
            fan_on_celsius: 50.0,
            fan_off_celsius: 40.0,
            fan_monitoring: true,
            enabled: true,
        }
    }
}

impl PlcConfig {
    /// Set the fan hysteresis band
    pub fn with_fan_thresholds(mut self, on_celsius: f32, off_celsius: f32) -> Self {
        self.fan_on_celsius = on_celsius;
        self.fan_off_celsius = off_celsius.min(on_celsius);
        self
    }

    /// Enable or disable fan monitoring
    pub fn with_fan_monitoring(mut self, enabled: bool) -> Self {
        self.fan_monitoring = enabled;
        self
    }

    /// Set the alarm blink period
    pub fn with_alarm_period_ms(mut self, ms: u32) -> Self {
        self.alarm_period_ms = ms;
        self
    }

    /// Set the fan control period
    pub fn with_fan_period_ms(mut self, ms: u32) -> Self {
        self.fan_period_ms = ms;
        self
    }

    /// Set the display refresh period
    pub fn with_display_period_ms(mut self, ms: u32) -> Self {
        self.display_period_ms = ms;
        self
    }

    /// Enable or disable the supervisor
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Socket Config
// ============================================================================

/// Socket controller configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SocketConfig {
    /// One socket button is sampled per period
    pub button_read_ms: u32,
    /// Debounce hold after a detected press
    pub button_wait_ms: u32,
    /// Whether the controller runs at all
    pub enabled: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            button_read_ms: 100,
            button_wait_ms: 1000,
            enabled: true,
        }
    }
}

impl SocketConfig {
    /// Set the sampling period
    pub fn with_button_read_ms(mut self, ms: u32) -> Self {
        self.button_read_ms = ms;
        self
    }

    /// Set the debounce hold
    pub fn with_button_wait_ms(mut self, ms: u32) -> Self {
        self.button_wait_ms = ms;
        self
    }

    /// Enable or disable the controller
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// One socket definition
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketSettings {
    /// Socket id (0-31)
    pub id: u8,
    /// Display name, also the JSON database key
    pub name: ShortString,
    /// Button pin id, if the socket has a local button
    #[cfg_attr(feature = "serde", serde(default))]
    pub button: Option<u8>,
    /// Relay pin id
    pub relay: u8,
    /// Whether the socket is in service
    #[cfg_attr(feature = "serde", serde(default = "enabled_default"))]
    pub enabled: bool,
}

#[cfg(feature = "serde")]
fn enabled_default() -> bool {
    true
}

impl SocketSettings {
    /// Enabled socket without a button
    pub fn new(id: u8, name: &str, relay: u8) -> Self {
        Self {
            id,
            name: short_string(name),
            button: None,
            relay,
            enabled: true,
        }
    }

    /// Set the button pin
    pub fn with_button(mut self, pin: u8) -> Self {
        self.button = Some(pin);
        self
    }

    /// Enable or disable the socket
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Meteo Config
// ============================================================================

/// Meteo controller configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeteoConfig {
    /// Delay from cycle start to the bus-wide conversion request
    pub request_period_ms: u32,
    /// Delay from cycle start to sampling
    pub sample_period_ms: u32,
    /// Consecutive failed reads before a sensor reports the error value
    pub errors_max: u8,
    /// 1-Wire bus id the sensors share
    pub bus: u8,
    /// Whether the controller runs at all
    pub enabled: bool,
}

impl Default for MeteoConfig {
    fn default() -> Self {
        Self {
            request_period_ms: 3000,
            sample_period_ms: 5000,
            errors_max: 4,
            bus: 1,
            enabled: true,
        }
    }
}

impl MeteoConfig {
    /// Set the sensor bus
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Set the failure threshold
    pub fn with_errors_max(mut self, errors: u8) -> Self {
        self.errors_max = errors.max(1);
        self
    }

    /// Enable or disable the controller
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// One temperature sensor definition
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSettings {
    /// Sensor id (0-15)
    pub id: u8,
    /// Display name
    pub name: ShortString,
    /// ROM code as 16 hex digits
    pub address: ShortString,
    /// Whether the sensor is sampled
    #[cfg_attr(feature = "serde", serde(default = "enabled_default"))]
    pub enabled: bool,
}

impl SensorSettings {
    /// Enabled sensor
    pub fn new(id: u8, name: &str, address: &str) -> Self {
        Self {
            id,
            name: short_string(name),
            address: short_string(address),
            enabled: true,
        }
    }
}

// ============================================================================
// Network Config
// ============================================================================

/// Network identity configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkConfig {
    /// Hostname announced on the network
    pub hostname: ShortString,
    /// WiFi network SSID (empty = not configured)
    pub wifi_ssid: ShortString,
    /// WiFi password
    pub wifi_password: ShortString,
    /// Configuration access point SSID
    pub ap_ssid: ShortString,
    /// Whether Ethernet is used
    pub ethernet: bool,
    /// Whether the GSM modem is used
    pub gsm: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from_defaults(&crate::profile::boards::PLC_ESP32_V1.network)
    }
}

impl NetworkConfig {
    /// Configuration seeded from a board's network defaults
    pub fn from_defaults(defaults: &NetworkDefaults) -> Self {
        Self {
            hostname: short_string(defaults.hostname),
            wifi_ssid: ShortString::new(),
            wifi_password: ShortString::new(),
            ap_ssid: short_string(defaults.ap_ssid),
            ethernet: defaults.ethernet,
            gsm: defaults.gsm,
        }
    }

    /// Set WiFi credentials
    pub fn with_wifi(mut self, ssid: &str, password: &str) -> Self {
        self.wifi_ssid = short_string(ssid);
        self.wifi_password = short_string(password);
        self
    }

    /// Check if WiFi credentials are configured
    pub fn wifi_configured(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Human-readable device name, first line of the status display
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("PLC"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
