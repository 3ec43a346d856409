//! Value-generic periodic sampler on the cooperative event loop.
//!
//! [`RepeatSampler`] invokes a sampling operation at a fixed cadence and
//! publishes the produced value to attached observers, without ever holding
//! the scheduling thread for longer than one sampling step.
//!
//! Two callback shapes exist, selected at construction as a tagged variant:
//!
//! - [`SampleCallback::Returning`] computes and returns the value
//!   synchronously within the tick.
//! - [`SampleCallback::Emitting`] is handed the sampler's output half and
//!   publishes the value itself. An emitting operation that cannot finish in
//!   one invocation simply returns without publishing; the sampler re-invokes
//!   it on every cooperative tick (via [`RepeatSampler::poll`]) until it
//!   publishes. That is the only suspension point in a cycle, and there is no
//!   cancellation — an in-flight cycle always runs to completion.

use log::{debug, error, info, warn};

use crate::config::SamplerConfig;
use crate::scheduler::{EventLoop, TimerId};

// ───────────────────────────────────────────────────────────────
// Output half: current value + observers
// ───────────────────────────────────────────────────────────────

/// Handle for a single attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(usize);

type Observer<T> = Box<dyn FnMut(&T)>;

/// The publish side of a sampler: the current output value and the
/// attached downstream observers.
///
/// Split out from [`RepeatSampler`] so an emitting callback can borrow it
/// while the sampler drives the callback.
pub struct Output<T> {
    current: Option<T>,
    observers: Vec<Option<Observer<T>>>,
    published_in_cycle: bool,
}

impl<T> Output<T> {
    fn new() -> Self {
        Self {
            current: None,
            observers: Vec::new(),
            published_in_cycle: false,
        }
    }

    /// Attach an observer. Observers are notified synchronously, in
    /// attachment order, on every published value.
    pub fn attach(&mut self, observer: Observer<T>) -> ObserverId {
        self.observers.push(Some(observer));
        ObserverId(self.observers.len() - 1)
    }

    /// Detach an observer. The slot is tombstoned rather than removed, so
    /// detaching never perturbs the notification order of the others.
    pub fn detach(&mut self, id: ObserverId) -> bool {
        match self.observers.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Make `value` the current output and notify every attached observer
    /// exactly once, in attachment order.
    pub fn publish(&mut self, value: T) {
        for slot in &mut self.observers {
            if let Some(observer) = slot {
                observer(&value);
            }
        }
        self.current = Some(value);
        self.published_in_cycle = true;
    }

    /// The most recently published value, if any.
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }
}

// ───────────────────────────────────────────────────────────────
// Callback shapes
// ───────────────────────────────────────────────────────────────

/// The sampling operation, selected at construction.
pub enum SampleCallback<T> {
    /// Synchronous producer: computes and returns the value within the
    /// tick; the sampler publishes it.
    Returning(Box<dyn FnMut() -> T>),
    /// Self-publishing producer: receives the output half and calls
    /// [`Output::publish`] itself, possibly only after several cooperative
    /// re-invocations (multi-step work such as polling a one-shot sensor).
    Emitting(Box<dyn FnMut(&mut Output<T>)>),
}

/// Where the sampler is within its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    /// Timer not yet due.
    Idle,
    /// An emitting cycle started but has not published yet; the callback
    /// is re-invoked on every poll. `polls` counts the cooperative yields.
    InFlight { polls: u32 },
}

// ───────────────────────────────────────────────────────────────
// RepeatSampler
// ───────────────────────────────────────────────────────────────

/// Periodic sampler: one repeating timer, one sampling operation, one
/// output.
pub struct RepeatSampler<T> {
    label: &'static str,
    interval_ms: u32,
    /// At most one live registration per sampler, or none (misconfigured).
    timer: Option<TimerId>,
    callback: SampleCallback<T>,
    output: Output<T>,
    phase: CyclePhase,
}

impl<T> RepeatSampler<T> {
    /// Construct a sampler and register its repeating timer on `ev`.
    ///
    /// `interval_ms` must be positive; a rejected registration (zero
    /// interval, full timer table) is logged and leaves the instance
    /// timer-less — it will never fire, and `set_interval` on it reports
    /// the misconfiguration.
    pub fn new(
        ev: &mut EventLoop,
        label: &'static str,
        interval_ms: u32,
        callback: SampleCallback<T>,
    ) -> Self {
        let timer = ev.on_repeat(interval_ms);
        if timer.is_none() {
            error!("sampler '{label}': timer registration failed");
        }
        Self {
            label,
            interval_ms,
            timer,
            callback,
            output: Output::new(),
            phase: CyclePhase::Idle,
        }
    }

    /// Whether `id` is this sampler's live timer. The main loop uses this
    /// to dispatch due handles.
    pub fn owns(&self, id: TimerId) -> bool {
        self.timer == Some(id)
    }

    /// The configured repeat interval.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Change the repeat interval.
    ///
    /// Cancels the existing registration and installs the new interval as a
    /// single scheduling step, effective from the next due cycle. With no
    /// live timer (misconfigured instance) this logs an internal error and
    /// is a no-op rather than crashing.
    pub fn set_interval(&mut self, ev: &mut EventLoop, new_interval_ms: u32) {
        if new_interval_ms == 0 {
            error!("sampler '{}': rejected zero interval", self.label);
            return;
        }
        match self.timer {
            Some(id) => {
                if ev.reschedule(id, new_interval_ms) {
                    info!(
                        "sampler '{}': interval {} -> {} ms",
                        self.label, self.interval_ms, new_interval_ms
                    );
                    self.interval_ms = new_interval_ms;
                } else {
                    error!("sampler '{}': stale timer handle on reschedule", self.label);
                }
            }
            None => {
                error!(
                    "sampler '{}': set_interval with no registered timer",
                    self.label
                );
            }
        }
    }

    /// Apply the external configuration surface.
    ///
    /// The one recognized field, `repeat_interval_ms`, overrides the
    /// interval via [`set_interval`]. Invalid configs are logged and
    /// ignored.
    ///
    /// [`set_interval`]: RepeatSampler::set_interval
    pub fn apply_config(&mut self, ev: &mut EventLoop, config: &SamplerConfig) {
        if let Err(e) = config.validate() {
            error!("sampler '{}': config rejected: {e}", self.label);
            return;
        }
        if config.repeat_interval_ms != self.interval_ms {
            self.set_interval(ev, config.repeat_interval_ms);
        }
    }

    /// Run the sampling operation for a due timer firing.
    ///
    /// Exactly one invocation of the configured operation per firing. A
    /// returning operation publishes immediately; an emitting operation may
    /// leave the cycle in flight, to be driven by [`poll`].
    ///
    /// [`poll`]: RepeatSampler::poll
    pub fn fire(&mut self) {
        if let CyclePhase::InFlight { polls } = self.phase {
            // The previous cycle outlived the interval. Keep polling it to
            // completion; this firing is skipped.
            warn!(
                "sampler '{}': timer due with cycle still in flight ({polls} polls)",
                self.label
            );
            self.poll();
            return;
        }

        self.output.published_in_cycle = false;
        match &mut self.callback {
            SampleCallback::Returning(operation) => {
                let value = operation();
                self.output.publish(value);
            }
            SampleCallback::Emitting(operation) => {
                operation(&mut self.output);
                if !self.output.published_in_cycle {
                    self.phase = CyclePhase::InFlight { polls: 0 };
                }
            }
        }
    }

    /// Cooperative re-entry point for an in-flight emitting cycle.
    ///
    /// Call once per event-loop tick; a no-op while idle. Each invocation
    /// that does not publish counts as one cooperative yield.
    pub fn poll(&mut self) {
        let CyclePhase::InFlight { polls } = self.phase else {
            return;
        };
        let SampleCallback::Emitting(operation) = &mut self.callback else {
            // A returning sampler can never be in flight.
            debug_assert!(false, "returning sampler polled in flight");
            self.phase = CyclePhase::Idle;
            return;
        };

        operation(&mut self.output);
        if self.output.published_in_cycle {
            debug!(
                "sampler '{}': cycle completed after {} yields",
                self.label,
                polls + 1
            );
            self.phase = CyclePhase::Idle;
        } else {
            self.phase = CyclePhase::InFlight { polls: polls + 1 };
        }
    }

    /// Whether no cycle is currently in flight.
    pub fn is_idle(&self) -> bool {
        self.phase == CyclePhase::Idle
    }

    /// Attach a downstream observer.
    pub fn attach(&mut self, observer: Observer<T>) -> ObserverId {
        self.output.attach(observer)
    }

    /// Detach a downstream observer.
    pub fn detach(&mut self, id: ObserverId) -> bool {
        self.output.detach(id)
    }

    /// The most recently published value.
    pub fn current(&self) -> Option<&T> {
        self.output.current()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
