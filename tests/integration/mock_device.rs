//! Mock light device for integration tests.
//!
//! Records every configuration command so tests can assert on the full
//! write history, and serves a scripted sequence of lux readings with a
//! configurable readiness delay (in cooperative polls).
//!
//! The device is moved into the sampler's emitting callback, so its state
//! lives behind a shared handle: clone the mock before handing it over and
//! inspect the clone afterwards.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use luxsense::exposure::ResolutionMode;
use luxsense::ports::LightDevice;

// ── Device command record ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCall {
    Initialize { mode: ResolutionMode, addr: u8 },
    SetGain(u8),
    Configure(ResolutionMode),
}

// ── MockLightDevice ───────────────────────────────────────────

struct Inner {
    calls: Vec<DeviceCall>,
    readings: VecDeque<f32>,
    /// How many readiness polls return `false` before each measurement.
    ready_after_polls: u32,
    polls_remaining: u32,
    init_ok: bool,
}

#[derive(Clone)]
pub struct MockLightDevice {
    inner: Rc<RefCell<Inner>>,
}

#[allow(dead_code)]
impl MockLightDevice {
    pub fn new(readings: &[f32]) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                calls: Vec::new(),
                readings: readings.iter().copied().collect(),
                ready_after_polls: 0,
                polls_remaining: 0,
                init_ok: true,
            })),
        }
    }

    /// Make every measurement take `polls` readiness checks before it
    /// reports ready.
    pub fn with_ready_after_polls(self, polls: u32) -> Self {
        {
            let mut inner = self.inner.borrow_mut();
            inner.ready_after_polls = polls;
            inner.polls_remaining = polls;
        }
        self
    }

    /// Make `initialize` report failure.
    pub fn with_failing_init(self) -> Self {
        self.inner.borrow_mut().init_ok = false;
        self
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn gain_writes(&self) -> Vec<u8> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::SetGain(mtreg) => Some(*mtreg),
                _ => None,
            })
            .collect()
    }

    pub fn mode_writes(&self) -> Vec<ResolutionMode> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Configure(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }
}

impl LightDevice for MockLightDevice {
    fn initialize(&mut self, mode: ResolutionMode, addr: u8) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(DeviceCall::Initialize { mode, addr });
        inner.init_ok
    }

    fn measurement_ready(&mut self, reset_timer: bool) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.polls_remaining > 0 {
            inner.polls_remaining -= 1;
            return false;
        }
        if reset_timer {
            inner.polls_remaining = inner.ready_after_polls;
        }
        true
    }

    fn read_value(&mut self) -> f32 {
        // Running past the script signals a degraded device.
        self.inner.borrow_mut().readings.pop_front().unwrap_or(-1.0)
    }

    fn set_gain_register(&mut self, mtreg: u8) {
        self.inner.borrow_mut().calls.push(DeviceCall::SetGain(mtreg));
    }

    fn configure(&mut self, mode: ResolutionMode) {
        self.inner.borrow_mut().calls.push(DeviceCall::Configure(mode));
    }
}
