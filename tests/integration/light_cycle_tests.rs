//! End-to-end tests of the composed sampling cycle: scheduler, sampler,
//! exposure controller and device port wired together as in `main`.

use std::cell::RefCell;
use std::rc::Rc;

use luxsense::config::SamplerConfig;
use luxsense::cycle::light_sampler;
use luxsense::exposure::{ExposureController, ExposurePolicy, ResolutionMode};
use luxsense::sampler::RepeatSampler;
use luxsense::scheduler::EventLoop;

use crate::mock_device::{DeviceCall, MockLightDevice};

const ADDR: u8 = 0x23;

fn new_sampler(
    ev: &mut EventLoop,
    device: &MockLightDevice,
    interval_ms: u32,
) -> RepeatSampler<f32> {
    light_sampler(
        ev,
        "outside",
        ADDR,
        interval_ms,
        device.clone(),
        ExposureController::new(ExposurePolicy::default()),
    )
}

fn attach_recorder(sampler: &mut RepeatSampler<f32>) -> Rc<RefCell<Vec<f32>>> {
    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&published);
    sampler.attach(Box::new(move |lux| sink.borrow_mut().push(*lux)));
    published
}

/// Drive the loop the way `main` does: advance in small ticks, dispatch
/// due timers, poll in-flight cycles.
fn run_ms(ev: &mut EventLoop, sampler: &mut RepeatSampler<f32>, ms: u64) {
    const TICK_MS: u64 = 10;
    for _ in 0..ms.div_ceil(TICK_MS) {
        for id in ev.advance(TICK_MS) {
            if sampler.owns(id) {
                sampler.fire();
            }
        }
        sampler.poll();
    }
}

#[test]
fn four_cycle_band_sequence_and_device_writes() {
    let device = MockLightDevice::new(&[50_000.0, 5.0, 0.5, -1.0]);
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    run_ms(&mut ev, &mut sampler, 4000);

    // Every reading reaches the sinks, including the anomalous one.
    assert_eq!(*published.borrow(), vec![50_000.0, 5.0, 0.5, -1.0]);

    // DirectSun, Low, VeryLow write register+mode; Error writes mode only.
    assert_eq!(device.gain_writes(), vec![31, 138, 254]);
    assert_eq!(
        device.mode_writes(),
        vec![
            ResolutionMode::OneTimeLowRes,
            ResolutionMode::OneTimeHighRes,
            ResolutionMode::OneTimeHighRes2,
            ResolutionMode::OneTimeHighRes,
        ]
    );

    // Exactly one initialize, in the default high-res one-shot mode.
    assert_eq!(
        device.calls()[0],
        DeviceCall::Initialize {
            mode: ResolutionMode::OneTimeHighRes,
            addr: ADDR,
        }
    );
    assert_eq!(
        device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::Initialize { .. }))
            .count(),
        1
    );
}

#[test]
fn cycle_yields_until_measurement_ready() {
    const READY_AFTER: u32 = 3;
    let device = MockLightDevice::new(&[120.0]).with_ready_after_polls(READY_AFTER);
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    for id in ev.advance(1000) {
        if sampler.owns(id) {
            sampler.fire();
        }
    }

    // The firing checked readiness once (poll 1 of 3) and yielded.
    assert!(!sampler.is_idle());
    assert!(published.borrow().is_empty());

    // Two more polls still yield; nothing is published before readiness.
    sampler.poll();
    sampler.poll();
    assert!(!sampler.is_idle());
    assert!(published.borrow().is_empty());

    // Fourth check reports ready: read, classify, reconfigure, publish.
    sampler.poll();
    assert!(sampler.is_idle());
    assert_eq!(*published.borrow(), vec![120.0]);
    assert_eq!(device.gain_writes(), vec![69]);
}

#[test]
fn initialization_failure_is_nonfatal() {
    let device = MockLightDevice::new(&[100.0]).with_failing_init();
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    run_ms(&mut ev, &mut sampler, 1000);

    // The sampler still runs its cycle and publishes; no init retry.
    assert_eq!(*published.borrow(), vec![100.0]);
    assert_eq!(
        device
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::Initialize { .. }))
            .count(),
        1
    );
}

#[test]
fn exhausted_device_script_lands_in_error_band() {
    let device = MockLightDevice::new(&[200.0]);
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    run_ms(&mut ev, &mut sampler, 2000);

    // Second cycle reads the degraded-device sentinel: published, mode
    // reverted, register untouched.
    assert_eq!(*published.borrow(), vec![200.0, -1.0]);
    assert_eq!(device.gain_writes(), vec![69]);
    assert_eq!(
        device.mode_writes().last(),
        Some(&ResolutionMode::OneTimeHighRes)
    );
}

#[test]
fn interval_change_lets_inflight_cycle_complete_once() {
    let device = MockLightDevice::new(&[100.0]).with_ready_after_polls(5);
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    for id in ev.advance(1000) {
        if sampler.owns(id) {
            sampler.fire();
        }
    }
    assert!(!sampler.is_idle());

    // Reschedule while the cycle is awaiting readiness.
    sampler.set_interval(&mut ev, 2000);
    assert_eq!(ev.active_count(), 1);

    // The in-flight cycle still completes, exactly once.
    for _ in 0..10 {
        sampler.poll();
    }
    assert_eq!(*published.borrow(), vec![100.0]);

    // Next firing honours the new interval.
    assert!(ev.advance(1999).is_empty());
    assert_eq!(ev.advance(1).len(), 1);
}

#[test]
fn external_config_overrides_interval() {
    let device = MockLightDevice::new(&[300.0, 301.0]);
    let mut ev = EventLoop::new();
    let mut sampler = new_sampler(&mut ev, &device, 1000);
    let published = attach_recorder(&mut sampler);

    let config: SamplerConfig = serde_json::from_str(r#"{"repeat_interval_ms":250}"#).unwrap();
    sampler.apply_config(&mut ev, &config);

    run_ms(&mut ev, &mut sampler, 500);
    assert_eq!(*published.borrow(), vec![300.0, 301.0]);
}
