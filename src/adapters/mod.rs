//! Driven adapters — implementations of the port traits.
//!
//! The BH1750 driver is target-agnostic (any `embedded-hal` I2C bus); the
//! time adapters are per-target.

pub mod bh1750;
pub mod time;
