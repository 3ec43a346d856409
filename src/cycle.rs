//! The composed light-sampling cycle.
//!
//! One instance per physical sensor, built on the emitting callback shape
//! of [`RepeatSampler`]:
//!
//! ```text
//! Idle ──timer due──▶ AwaitingReady ──ready──▶ Classifying ──▶ Reconfiguring ──▶ Idle
//!                        │    ▲
//!                        └────┘  cooperative yield, one readiness poll per tick
//! ```
//!
//! `AwaitingReady` is the only state where control is relinquished
//! mid-cycle: each tick polls [`LightDevice::measurement_ready`] once and
//! yields back to the event loop, so other periodic tasks sharing the
//! scheduler are not starved while the conversion runs. Once ready, the
//! read, classification, reconfiguration and publish all happen within the
//! same tick. The cycle has no terminal state — it restarts at `Idle` every
//! time the timer is due, for the lifetime of the sampler.

use log::{debug, error};

use crate::exposure::{ExposureController, ResolutionMode};
use crate::ports::LightDevice;
use crate::sampler::{RepeatSampler, SampleCallback};
use crate::scheduler::EventLoop;

/// Default repeat interval. One second works well for ambient light while
/// leaving the one-shot part asleep most of the time.
pub const DEFAULT_READ_INTERVAL_MS: u32 = 1000;

/// Build the periodic light sampler for one sensor.
///
/// Initialises the device in the default high-resolution one-shot mode at
/// `addr`; an initialisation failure is logged and sampling proceeds
/// anyway — later reads against the degraded device come back negative and
/// land in the Error band. There is no automatic re-initialisation.
///
/// `location` labels the sensor in log output ("inside", "outside", ...).
pub fn light_sampler<D>(
    ev: &mut EventLoop,
    location: &'static str,
    addr: u8,
    interval_ms: u32,
    mut device: D,
    mut controller: ExposureController,
) -> RepeatSampler<f32>
where
    D: LightDevice + 'static,
{
    if device.initialize(ResolutionMode::OneTimeHighRes, addr) {
        debug!("light sensor '{location}' initialized at address {addr:#04x}");
    } else {
        error!("light sensor '{location}' initialization failed");
    }

    RepeatSampler::new(
        ev,
        location,
        interval_ms,
        SampleCallback::Emitting(Box::new(move |out| {
            // AwaitingReady: one non-blocking poll per tick, then yield.
            if !device.measurement_ready(true) {
                debug!("waiting for '{location}' light measurement to be ready");
                return;
            }

            // Classifying: take the reading and hand it to the controller.
            let lux = device.read_value();

            // Reconfiguring: retune the one-shot device for the next cycle,
            // then publish. Anomalous values still reach the sinks.
            controller.classify_and_reconfigure(lux, &mut device);
            out.publish(lux);
        })),
    )
}
