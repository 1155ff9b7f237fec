//! Round-robin DS18B20 sampling.
//!
//! All sensors share one 1-Wire bus. A cycle starts when both timers are
//! armed at time `T`:
//!
//! - at `T + request_period_ms` a bus-wide conversion is triggered
//! - from `T + sample_period_ms` one sensor is read per tick until every
//!   enabled sensor has been read, then both timers re-arm
//!
//! A sensor that fails `errors_max` consecutive reads reports
//! [`SENSOR_ERROR_VALUE`] and one [`MeteoEvent::SensorFailed`]; the next
//! good read reports [`MeteoEvent::SensorRecovered`].

use log::{debug, error, info, warn};

use crate::arena::Slots;
use crate::config::{MeteoConfig, SensorSettings, ShortString};
use crate::onewire::{OneWireManager, RomAddress};
use crate::timer::Interval;
use crate::traits::OneWire;

/// Size of the sensor table.
pub const METEO_MAX_SENSORS: usize = 16;

/// Value reported by a sensor after too many failed reads.
pub const SENSOR_ERROR_VALUE: f32 = -127.0;

/// Errors raised when configuring sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MeteoError {
    /// Id beyond the sensor table.
    #[error("sensor id {0} out of range")]
    IdOutOfRange(u8),
    /// Address is not 16 hex digits.
    #[error("sensor {0}: malformed ROM address")]
    BadAddress(u8),
}

/// Event reported by [`MeteoController::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeteoEvent {
    /// A sensor reached the failure threshold.
    SensorFailed {
        /// Sensor id.
        id: u8,
    },
    /// A failed sensor answered again.
    SensorRecovered {
        /// Sensor id.
        id: u8,
    },
}

/// Position in the request / wait / sample cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeteoPhase {
    /// Waiting to trigger the conversion.
    Request,
    /// Conversion triggered, waiting to sample.
    Waiting,
    /// Reading sensors, next candidate at `cursor`.
    Sampling {
        /// Next sensor id to consider.
        cursor: usize,
    },
}

/// One temperature sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Sensor {
    id: u8,
    name: ShortString,
    address: RomAddress,
    enabled: bool,
    value: Option<f32>,
    errors: u8,
    error_reported: bool,
    last_read_ms: Option<u64>,
}

impl Sensor {
    /// Sensor id.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ROM code.
    pub fn address(&self) -> RomAddress {
        self.address
    }

    /// Whether the sensor is sampled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Last temperature in °C, [`SENSOR_ERROR_VALUE`] once failed, `None`
    /// before the first read.
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    /// Consecutive failed reads.
    pub fn errors(&self) -> u8 {
        self.errors
    }

    /// Time of the last good read.
    pub fn last_read_ms(&self) -> Option<u64> {
        self.last_read_ms
    }
}

/// Temperature sensor poller.
#[derive(Debug)]
pub struct MeteoController {
    config: MeteoConfig,
    sensors: Slots<Sensor, METEO_MAX_SENSORS>,
    phase: MeteoPhase,
    request_timer: Interval,
    sample_timer: Interval,
    bus_ready: bool,
    enabled: bool,
}

impl MeteoController {
    /// Creates a controller with no sensors.
    pub fn new(config: MeteoConfig) -> Self {
        Self {
            request_timer: Interval::started(u64::from(config.request_period_ms), 0),
            sample_timer: Interval::started(u64::from(config.sample_period_ms), 0),
            enabled: config.enabled,
            config,
            sensors: Slots::new(),
            phase: MeteoPhase::Request,
            bus_ready: false,
        }
    }

    /// Registers the configured sensors and starts the first cycle at
    /// `now_ms`.
    ///
    /// A missing bus is logged once and leaves the controller idle.
    pub fn begin<W: OneWire>(
        &mut self,
        settings: &[SensorSettings],
        onewire: &OneWireManager<W>,
        now_ms: u64,
    ) -> bool {
        if !self.enabled {
            debug!("meteo controller disabled");
            return false;
        }
        let mut ok = true;
        for s in settings {
            if let Err(e) = self.add_sensor(s) {
                error!("{}", e);
                ok = false;
            }
        }
        self.bus_ready = onewire.bus(self.config.bus).is_some();
        if !self.bus_ready {
            error!("meteo: 1-Wire bus {} not available", self.config.bus);
            return false;
        }
        self.rearm(now_ms);
        info!("meteo: {} sensor(s) on bus {}", self.sensors.len(), self.config.bus);
        ok
    }

    /// Adds or replaces a sensor.
    pub fn add_sensor(&mut self, settings: &SensorSettings) -> Result<(), MeteoError> {
        if usize::from(settings.id) >= METEO_MAX_SENSORS {
            return Err(MeteoError::IdOutOfRange(settings.id));
        }
        let address =
            RomAddress::from_hex(&settings.address).ok_or(MeteoError::BadAddress(settings.id))?;
        let sensor = Sensor {
            id: settings.id,
            name: settings.name.clone(),
            address,
            enabled: settings.enabled,
            value: None,
            errors: 0,
            error_reported: false,
            last_read_ms: None,
        };
        self.sensors
            .insert(usize::from(settings.id), sensor)
            .map_err(|_| MeteoError::IdOutOfRange(settings.id))?;
        Ok(())
    }

    fn rearm(&mut self, now_ms: u64) {
        self.request_timer.reset(now_ms);
        self.sample_timer.reset(now_ms);
        self.phase = MeteoPhase::Request;
    }

    /// Advances the cycle by one step.
    pub fn tick<W: OneWire>(
        &mut self,
        now_ms: u64,
        onewire: &mut OneWireManager<W>,
    ) -> Option<MeteoEvent> {
        if !self.enabled || !self.bus_ready {
            return None;
        }
        match self.phase {
            MeteoPhase::Request => {
                if self.request_timer.is_due(now_ms) {
                    if let Err(e) = onewire.request_temperatures(self.config.bus) {
                        debug!("meteo: conversion request failed: {}", e);
                    }
                    self.phase = MeteoPhase::Waiting;
                }
                None
            }
            MeteoPhase::Waiting => {
                if !self.sample_timer.is_due(now_ms) {
                    return None;
                }
                self.sample(0, now_ms, onewire)
            }
            MeteoPhase::Sampling { cursor } => self.sample(cursor, now_ms, onewire),
        }
    }

    fn sample<W: OneWire>(
        &mut self,
        cursor: usize,
        now_ms: u64,
        onewire: &mut OneWireManager<W>,
    ) -> Option<MeteoEvent> {
        let Some(next) = self.sensors.next_from(cursor, |s| s.enabled) else {
            self.rearm(now_ms);
            return None;
        };
        self.phase = MeteoPhase::Sampling { cursor: next + 1 };

        let errors_max = self.config.errors_max;
        let sensor = self.sensors.get_mut(next)?;
        match onewire.read_temperature(self.config.bus, &sensor.address) {
            Ok(celsius) => {
                sensor.value = Some(celsius);
                sensor.errors = 0;
                sensor.last_read_ms = Some(now_ms);
                if sensor.error_reported {
                    sensor.error_reported = false;
                    info!("sensor {} ({}) recovered: {:.1}°C", sensor.id, sensor.name, celsius);
                    return Some(MeteoEvent::SensorRecovered { id: sensor.id });
                }
                None
            }
            Err(e) => {
                sensor.errors = sensor.errors.saturating_add(1);
                debug!("sensor {}: read failed ({}): {}", sensor.id, sensor.errors, e);
                if sensor.errors < errors_max {
                    return None;
                }
                sensor.value = Some(SENSOR_ERROR_VALUE);
                if sensor.error_reported {
                    return None;
                }
                sensor.error_reported = true;
                error!(
                    "sensor {} ({}) failed {} consecutive reads",
                    sensor.id, sensor.name, sensor.errors
                );
                warn!("sensor {} now reports {}", sensor.id, SENSOR_ERROR_VALUE);
                Some(MeteoEvent::SensorFailed { id: sensor.id })
            }
        }
    }

    /// Last value of a sensor.
    pub fn temperature(&self, id: u8) -> Option<f32> {
        self.sensor(id).and_then(Sensor::value)
    }

    /// Sensor by id.
    pub fn sensor(&self, id: u8) -> Option<&Sensor> {
        self.sensors.get(usize::from(id))
    }

    /// All sensors in id order.
    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter().map(|(_, s)| s)
    }

    /// Current cycle position.
    pub fn phase(&self) -> MeteoPhase {
        self.phase
    }

    /// Enables or disables the controller.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
