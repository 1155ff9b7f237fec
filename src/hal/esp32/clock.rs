//! Monotonic clock from the ESP-IDF high resolution timer.

use crate::traits::Clock;

/// Milliseconds since boot.
///
/// # Example
///
/// ```ignore
/// use rs_plc::hal::esp32::Esp32Clock;
/// use rs_plc::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let now = clock.now_ms();
/// plc.tick(now, &mut board.gpio, &mut board.onewire);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a clock handle.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // microseconds since boot, never negative
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
