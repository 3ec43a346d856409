//! BH1750 ambient-light sensor driver over an `embedded-hal` I2C bus.
//!
//! Implements the [`LightDevice`] port for the real part. Only the one-shot
//! modes are driven (the exposure controller re-arms the device every
//! cycle); continuous modes, interrupt and threshold features are not used.
//!
//! The part exposes no data-ready flag, so readiness is tracked as elapsed
//! conversion time since the last arming opcode, scaled by the current
//! MTreg value, using the datasheet's worst-case conversion times.
//!
//! Bus faults degrade rather than fail: `initialize` reports `false`,
//! `read_value` returns `-1.0` (which the exposure controller classifies
//! into the Error band), and the fault is logged.

use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::error::SensorError;
use crate::exposure::ResolutionMode;
use crate::ports::{LightDevice, TimeSource};

/// I2C address with the ADD pin below 0.7·VCC (the usual wiring).
pub const BH1750_ADDR_VCC_LOW: u8 = 0x23;
/// I2C address with the ADD pin tied to VCC.
pub const BH1750_ADDR_VCC_HIGH: u8 = 0x5C;
pub const BH1750_ADDR_DEFAULT: u8 = BH1750_ADDR_VCC_LOW;

const CMD_POWER_ON: u8 = 0x01;
const CMD_RESET: u8 = 0x07;
/// MTreg writes are split: opcode carries the top 3 bits, then the low 5.
const MTREG_HIGH_PREFIX: u8 = 0x40;
const MTREG_LOW_PREFIX: u8 = 0x60;

const MTREG_MIN: u8 = 31;
const MTREG_DEFAULT: u8 = 69;
const MTREG_MAX: u8 = 254;

/// Worst-case conversion times at the default MTreg (datasheet).
const CONV_MS_HIGH_RES: u64 = 180;
const CONV_MS_LOW_RES: u64 = 24;

/// BH1750 over an owned I2C bus handle and a monotonic clock.
pub struct Bh1750<I2C, C> {
    i2c: I2C,
    clock: C,
    addr: u8,
    mtreg: u8,
    mode: ResolutionMode,
    /// Clock reading when the current conversion was armed; `None` while
    /// the part is idle.
    armed_at_ms: Option<u64>,
}

impl<I2C, C> Bh1750<I2C, C>
where
    I2C: I2c,
    C: TimeSource,
{
    pub fn new(i2c: I2C, clock: C) -> Self {
        Self {
            i2c,
            clock,
            addr: BH1750_ADDR_DEFAULT,
            mtreg: MTREG_DEFAULT,
            mode: ResolutionMode::OneTimeHighRes,
            armed_at_ms: None,
        }
    }

    /// Give the bus handle back (for sharing or shutdown paths).
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, opcode: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.addr, &[opcode])
            .map_err(|_| SensorError::BusWrite)
    }

    /// Conversion time for the current mode, scaled linearly by MTreg.
    fn conversion_time_ms(&self) -> u64 {
        let base = match self.mode {
            ResolutionMode::OneTimeLowRes => CONV_MS_LOW_RES,
            ResolutionMode::OneTimeHighRes | ResolutionMode::OneTimeHighRes2 => CONV_MS_HIGH_RES,
        };
        base * u64::from(self.mtreg) / u64::from(MTREG_DEFAULT)
    }
}

impl<I2C, C> LightDevice for Bh1750<I2C, C>
where
    I2C: I2c,
    C: TimeSource,
{
    fn initialize(&mut self, mode: ResolutionMode, addr: u8) -> bool {
        self.addr = addr;
        let sequence = self
            .command(CMD_POWER_ON)
            .and_then(|()| self.command(CMD_RESET));
        match sequence {
            Ok(()) => {
                self.configure(mode);
                debug!("BH1750 at {addr:#04x} powered on");
                true
            }
            Err(e) => {
                warn!("BH1750 at {addr:#04x}: power-on failed: {e}");
                false
            }
        }
    }

    fn measurement_ready(&mut self, reset_timer: bool) -> bool {
        let Some(armed_at) = self.armed_at_ms else {
            // Never armed (or already consumed): nothing to wait for. The
            // subsequent read returns stale or degraded data by design.
            return true;
        };
        let ready = self.clock.now_ms() >= armed_at + self.conversion_time_ms();
        if ready && reset_timer {
            self.armed_at_ms = None;
        }
        ready
    }

    fn read_value(&mut self) -> f32 {
        let mut buf = [0u8; 2];
        if let Err(e) = self
            .i2c
            .read(self.addr, &mut buf)
            .map_err(|_| SensorError::BusRead)
        {
            warn!("BH1750 at {:#04x}: {e}", self.addr);
            return -1.0;
        }

        let raw = f32::from(u16::from_be_bytes(buf));
        // Datasheet count-to-lux divisor, corrected for the MTreg in effect.
        let mut lux = raw / 1.2 * (f32::from(MTREG_DEFAULT) / f32::from(self.mtreg));
        if self.mode == ResolutionMode::OneTimeHighRes2 {
            lux /= 2.0;
        }
        lux
    }

    fn set_gain_register(&mut self, mtreg: u8) {
        let mtreg = mtreg.clamp(MTREG_MIN, MTREG_MAX);
        let split = self
            .command(MTREG_HIGH_PREFIX | (mtreg >> 5))
            .and_then(|()| self.command(MTREG_LOW_PREFIX | (mtreg & 0b1_1111)));
        match split {
            Ok(()) => self.mtreg = mtreg,
            Err(e) => warn!("BH1750 at {:#04x}: MTreg write failed: {e}", self.addr),
        }
    }

    fn configure(&mut self, mode: ResolutionMode) {
        // Writing a one-shot opcode arms the next conversion.
        match self.command(mode as u8) {
            Ok(()) => {
                self.mode = mode;
                self.armed_at_ms = Some(self.clock.now_ms());
            }
            Err(e) => warn!("BH1750 at {:#04x}: mode select failed: {e}", self.addr),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
