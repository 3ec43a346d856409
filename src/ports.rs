//! Port traits — the boundary between the sampling core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ sampling core
//! ```
//!
//! Driven adapters (the BH1750 driver, the monotonic clock, test mocks)
//! implement these traits. The core consumes them via generics or trait
//! objects, so it never touches a bus directly and the whole sampling cycle
//! runs against mocks on the host.

use crate::exposure::ResolutionMode;

// ───────────────────────────────────────────────────────────────
// Light sensor device port
// ───────────────────────────────────────────────────────────────

/// A one-shot ambient-light sensor, already reachable on its bus.
///
/// Transport bring-up happens outside the core; each device object is
/// exclusively owned and mutated by exactly one sampler instance.
pub trait LightDevice {
    /// Put the device in `mode` at I2C address `addr`.
    ///
    /// Failure is non-fatal to callers: the core logs it and keeps
    /// sampling, expecting degraded values. It does not retry.
    fn initialize(&mut self, mode: ResolutionMode, addr: u8) -> bool;

    /// Non-blocking poll for conversion completeness. Safe to call
    /// repeatedly on every cooperative tick until it returns `true`.
    ///
    /// `reset_timer` restarts the conversion-time bookkeeping once the
    /// measurement is ready, arming the check for the next cycle.
    fn measurement_ready(&mut self, reset_timer: bool) -> bool;

    /// Read the converted value in lux.
    ///
    /// Valid only immediately after [`measurement_ready`] returned `true`;
    /// a one-shot device goes idle afterwards. Negative values signal an
    /// anomaly (bus fault, stale data) and are classified into the Error
    /// band downstream.
    ///
    /// [`measurement_ready`]: LightDevice::measurement_ready
    fn read_value(&mut self) -> f32;

    /// Write the measurement-time (MTreg) register for the next cycle.
    fn set_gain_register(&mut self, mtreg: u8);

    /// Select the resolution mode for the next cycle. On a one-shot part
    /// this also re-arms the conversion.
    fn configure(&mut self, mode: ResolutionMode);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait TimeSource {
    fn now_ms(&self) -> u64;
}
