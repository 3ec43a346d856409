//! Monotonic time adapters for the [`TimeSource`] port.

use crate::ports::TimeSource;

/// ESP-IDF monotonic clock (µs hardware timer, truncated to ms).
#[cfg(feature = "espidf")]
pub struct EspMonotonic;

#[cfg(feature = "espidf")]
impl TimeSource for EspMonotonic {
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time has no preconditions after IDF boot.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        (us / 1000) as u64
    }
}

/// Host-side monotonic clock, counted from construction.
#[cfg(not(target_os = "espidf"))]
pub struct StdMonotonic {
    epoch: std::time::Instant,
}

#[cfg(not(target_os = "espidf"))]
impl StdMonotonic {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimeSource for StdMonotonic {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
