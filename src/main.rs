//! Luxsense firmware — main entry point.
//!
//! Composition root: brings up the I2C bus, constructs one adaptive light
//! sampler per sensor, and runs the cooperative event loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │                                                          │
//! │   Bh1750 (LightDevice)        EspMonotonic (TimeSource)  │
//! │                                                          │
//! │   ───────────── Port trait boundary ─────────────        │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  EventLoop · RepeatSampler · ExposureController    │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The composition root owns every sampler and device for the lifetime of
//! the process — there is no global registry of retained objects.
#![deny(unused_must_use)]

use anyhow::Result;
use log::info;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;

use luxsense::adapters::bh1750::{Bh1750, BH1750_ADDR_DEFAULT};
use luxsense::adapters::time::EspMonotonic;
use luxsense::config::SamplerConfig;
use luxsense::cycle::light_sampler;
use luxsense::exposure::{ExposureController, ExposurePolicy};
use luxsense::ports::TimeSource;
use luxsense::scheduler::EventLoop;

/// Cooperative tick period. Short enough that a pending one-shot
/// conversion (≤ ~660 ms at MTreg max) is polled promptly.
const TICK_MS: u32 = 10;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("luxsense v{} starting", env!("CARGO_PKG_VERSION"));

    // ── I2C bring-up (outside the sampling core) ──────────────
    let peripherals = Peripherals::take()?;
    let i2c_config = I2cConfig::new().baudrate(100u32.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &i2c_config,
    )?;
    let device = Bh1750::new(i2c, EspMonotonic);

    // ── Sampler construction ──────────────────────────────────
    let config = SamplerConfig::default();
    let mut ev = EventLoop::new();
    let mut sampler = light_sampler(
        &mut ev,
        "outside",
        BH1750_ADDR_DEFAULT,
        config.repeat_interval_ms,
        device,
        ExposureController::new(ExposurePolicy::default()),
    );

    // Downstream sinks attach here; the serial log is the built-in one.
    sampler.attach(Box::new(|lux| {
        info!("outside light sensor value: {lux} lx");
    }));

    // Externally provided config (NVS, provisioning) would be applied the
    // same way at runtime.
    sampler.apply_config(&mut ev, &config);

    info!("system ready, entering event loop");

    // ── Cooperative event loop ────────────────────────────────
    let clock = EspMonotonic;
    loop {
        FreeRtos::delay_ms(TICK_MS);

        for id in ev.tick(clock.now_ms()) {
            if sampler.owns(id) {
                sampler.fire();
            }
        }
        sampler.poll();
    }
}
