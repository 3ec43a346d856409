//! Adaptive exposure control for the BH1750 light sensor.
//!
//! The sensor's dynamic range (fractions of a lux up to direct sunlight
//! above 40 klx) exceeds what one fixed integration time can resolve, so
//! after every completed reading the controller classifies the value into a
//! light-intensity band and reprograms the measurement-time register
//! ("MTreg" — the sensor's ISO/shutter analogue) and resolution mode for the
//! measurement the *next* cycle will take.
//!
//! Classification is intentionally memoryless: no hysteresis, no smoothing.
//! The band is a pure function of the just-read value, and the stored state
//! exists only for diagnostics.

use log::{debug, warn};

use crate::ports::LightDevice;

// ───────────────────────────────────────────────────────────────
// Bands and modes
// ───────────────────────────────────────────────────────────────

/// Light-intensity band driving the exposure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightBand {
    /// Non-positive (or NaN) reading — sensor anomaly, non-fatal.
    Error,
    /// 0 < lux <= 1: moonlight and darker.
    VeryLow,
    /// 1 < lux <= 10: deep dusk.
    Low,
    /// 10 < lux <= 40000: ordinary indoor/outdoor light.
    Normal,
    /// lux > 40000: direct sunlight.
    DirectSun,
}

/// One-shot resolution modes of the BH1750.
///
/// One-shot (rather than continuous) mode because continuous conversion
/// cannot be retuned between samples, and one-shot lets the part idle
/// between the scheduler's polling cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResolutionMode {
    /// 1 lx resolution, single measurement then idle.
    OneTimeHighRes = 0x20,
    /// 0.5 lx resolution variant — highest sensitivity.
    OneTimeHighRes2 = 0x21,
    /// 4 lx resolution, shortest conversion — highest light tolerance.
    OneTimeLowRes = 0x23,
}

// ───────────────────────────────────────────────────────────────
// Policy
// ───────────────────────────────────────────────────────────────

/// Lux threshold above which the reading counts as direct sunlight.
pub const LUX_DIRECT_SUN: f32 = 40_000.0;
/// Lux floor of the Normal band.
pub const LUX_NORMAL_FLOOR: f32 = 10.0;
/// Lux floor of the Low band.
pub const LUX_LOW_FLOOR: f32 = 1.0;

/// MTreg values per band.
///
/// These are tuning policy, not physical law — confirm against the BH1750
/// datasheet for a given board before changing them. The datasheet bounds
/// are 31..=254 with 69 as the power-on default.
#[derive(Debug, Clone, Copy)]
pub struct ExposurePolicy {
    /// Lowest sensitivity — direct sunlight.
    pub mtreg_min: u8,
    /// Power-on default — normal light.
    pub mtreg_default: u8,
    /// Increased sensitivity — low light.
    pub mtreg_low_light: u8,
    /// Maximum sensitivity — very low light.
    pub mtreg_max: u8,
}

impl Default for ExposurePolicy {
    fn default() -> Self {
        Self {
            mtreg_min: 31,
            mtreg_default: 69,
            mtreg_low_light: 138,
            mtreg_max: 254,
        }
    }
}

impl ExposurePolicy {
    /// Sanity-check the register values against the datasheet bounds and
    /// each other.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.mtreg_min < 31 || self.mtreg_max < self.mtreg_min {
            return Err("MTreg bounds out of range");
        }
        if self.mtreg_default < self.mtreg_min
            || self.mtreg_low_light < self.mtreg_default
            || self.mtreg_max < self.mtreg_low_light
        {
            return Err("MTreg values must increase with sensitivity");
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Diagnostic snapshot of the controller, mutated exactly once per
/// completed sampling cycle.
#[derive(Debug, Clone, Copy)]
pub struct ExposureState {
    /// Most recent raw reading. Negative values signal an anomaly;
    /// -2.0 is the before-first-read sentinel.
    pub last_lux: f32,
    /// Band of the most recent reading.
    pub current_band: LightBand,
    /// MTreg value last written to the sensor.
    pub current_mtreg: u8,
    /// Resolution mode last written to the sensor.
    pub current_mode: ResolutionMode,
}

/// Closed-loop exposure controller.
///
/// Consumes each raw reading, classifies it, and issues the register/mode
/// commands that put the sensor in the right configuration for the next
/// cycle. Anomalies are logged, never propagated — the design favours
/// "keep sampling" over halting.
pub struct ExposureController {
    policy: ExposurePolicy,
    state: ExposureState,
}

impl ExposureController {
    pub fn new(policy: ExposurePolicy) -> Self {
        debug_assert!(policy.validate().is_ok());
        Self {
            policy,
            state: ExposureState {
                last_lux: -2.0,
                current_band: LightBand::Normal,
                current_mtreg: policy.mtreg_default,
                current_mode: ResolutionMode::OneTimeHighRes,
            },
        }
    }

    /// Classify a reading into its band.
    ///
    /// Total over every `f32`: negatives, zero and NaN all land in
    /// [`LightBand::Error`] (NaN fails every comparison and falls through).
    pub fn classify(lux: f32) -> LightBand {
        if lux > LUX_DIRECT_SUN {
            LightBand::DirectSun
        } else if lux > LUX_NORMAL_FLOOR {
            LightBand::Normal
        } else if lux > LUX_LOW_FLOOR {
            LightBand::Low
        } else if lux > 0.0 {
            LightBand::VeryLow
        } else {
            LightBand::Error
        }
    }

    /// Classify `lux` and reprogram the device for the next cycle.
    ///
    /// Non-Error bands issue exactly one register write and one mode select.
    /// The Error band leaves the register untouched and only reverts the
    /// mode to the default high-resolution one-shot, so the next cycle
    /// attempts a clean reading. State is updated unconditionally.
    pub fn classify_and_reconfigure(&mut self, lux: f32, device: &mut dyn LightDevice) {
        let band = Self::classify(lux);

        match band {
            LightBand::DirectSun => {
                self.retune(device, self.policy.mtreg_min, ResolutionMode::OneTimeLowRes);
            }
            LightBand::Normal => {
                self.retune(device, self.policy.mtreg_default, ResolutionMode::OneTimeHighRes);
            }
            LightBand::Low => {
                self.retune(device, self.policy.mtreg_low_light, ResolutionMode::OneTimeHighRes);
            }
            LightBand::VeryLow => {
                self.retune(device, self.policy.mtreg_max, ResolutionMode::OneTimeHighRes2);
            }
            LightBand::Error => {
                warn!("exposure: anomalous reading {lux} lx, reverting to default mode");
                device.configure(ResolutionMode::OneTimeHighRes);
                self.state.current_mode = ResolutionMode::OneTimeHighRes;
            }
        }

        self.state.last_lux = lux;
        self.state.current_band = band;
        debug!(
            "exposure: {lux} lx -> {band:?} (MTreg {}, {:?})",
            self.state.current_mtreg, self.state.current_mode
        );
    }

    /// Diagnostic state after the most recent reading.
    pub fn state(&self) -> &ExposureState {
        &self.state
    }

    fn retune(&mut self, device: &mut dyn LightDevice, mtreg: u8, mode: ResolutionMode) {
        device.set_gain_register(mtreg);
        device.configure(mode);
        self.state.current_mtreg = mtreg;
        self.state.current_mode = mode;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
