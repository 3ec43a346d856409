//! Cooperative event loop — the single-threaded timer scheduler.
//!
//! Exactly one execution context runs every timer callback and poll; there
//! is never true parallelism, so no locking is needed anywhere in the core.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  EventLoop                                             │
//! │  ┌─────────┬─────────────┬─────────────┐               │
//! │  │ TimerId │ interval_ms │ next_due_ms │               │
//! │  ├─────────┼─────────────┼─────────────┤               │
//! │  │   0     │    1000     │   t+1000    │ ◀─ sampler A  │
//! │  │   1     │    5000     │   t+5000    │ ◀─ sampler B  │
//! │  └─────────┴─────────────┴─────────────┘               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The main loop advances the clock with [`EventLoop::tick`] and dispatches
//! the returned due handles to their owners. A timer fires at most once per
//! tick, and the next due time is computed from the tick that fired it, so a
//! late tick never produces a burst of catch-up firings.

use heapless::Vec;
use log::{debug, error};

/// Maximum number of concurrent timer registrations (stack-allocated).
pub const MAX_TIMERS: usize = 8;

/// Opaque handle to a repeating timer registration.
///
/// Handles are never reused within one `EventLoop`; a removed handle stays
/// dead forever, so a stale handle can be detected rather than silently
/// retargeting another registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u32);

#[derive(Debug, Clone)]
struct TimerEntry {
    id: TimerId,
    interval_ms: u32,
    next_due_ms: u64,
}

/// The cooperative timer scheduler.
pub struct EventLoop {
    timers: Vec<TimerEntry, MAX_TIMERS>,
    next_id: u32,
    now_ms: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
            now_ms: 0,
        }
    }

    /// Current scheduler clock in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Register a repeating timer with the given interval.
    ///
    /// The first firing is one full interval from now — registration never
    /// fires retroactively. Returns `None` (logged) for a zero interval or
    /// when the timer table is full.
    pub fn on_repeat(&mut self, interval_ms: u32) -> Option<TimerId> {
        if interval_ms == 0 {
            error!("EventLoop: rejected zero repeat interval");
            return None;
        }

        let id = TimerId(self.next_id);
        let entry = TimerEntry {
            id,
            interval_ms,
            next_due_ms: self.now_ms + u64::from(interval_ms),
        };
        if self.timers.push(entry).is_err() {
            error!("EventLoop: timer table full ({MAX_TIMERS} slots)");
            return None;
        }

        self.next_id += 1;
        debug!("EventLoop: registered timer {id:?} every {interval_ms} ms");
        Some(id)
    }

    /// Cancel a registration. Returns `false` for a stale or unknown handle.
    pub fn remove(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|e| e.id == id) {
            Some(idx) => {
                // Plain remove keeps registration order, so firing order
                // stays deterministic for the remaining timers.
                let _ = self.timers.remove(idx);
                debug!("EventLoop: removed timer {id:?}");
                true
            }
            None => false,
        }
    }

    /// Cancel-and-reinstall a registration with a new interval, as a single
    /// scheduling step.
    ///
    /// The handle stays valid and exactly one registration is live before,
    /// during, and after the call — the loop is single-threaded and there is
    /// no yield inside, so no window exists where zero or two timers for the
    /// same owner coexist. The new interval takes effect from the next due
    /// cycle; it never fires immediately.
    pub fn reschedule(&mut self, id: TimerId, new_interval_ms: u32) -> bool {
        if new_interval_ms == 0 {
            error!("EventLoop: rejected zero interval on reschedule of {id:?}");
            return false;
        }

        match self.timers.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.interval_ms = new_interval_ms;
                entry.next_due_ms = self.now_ms + u64::from(new_interval_ms);
                debug!("EventLoop: rescheduled {id:?} to every {new_interval_ms} ms");
                true
            }
            None => {
                error!("EventLoop: reschedule of unknown timer {id:?}");
                false
            }
        }
    }

    /// Whether a handle refers to a live registration.
    pub fn registered(&self, id: TimerId) -> bool {
        self.timers.iter().any(|e| e.id == id)
    }

    /// Number of live registrations.
    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Advance the clock to `now_ms` and collect the timers that are due.
    ///
    /// Each due timer appears at most once, in registration order. The
    /// caller dispatches the handles to their owners, then polls any
    /// in-flight cycles — that round-trip is the cooperative yield.
    pub fn tick(&mut self, now_ms: u64) -> Vec<TimerId, MAX_TIMERS> {
        debug_assert!(now_ms >= self.now_ms, "scheduler clock moved backwards");
        self.now_ms = now_ms;

        let mut due: Vec<TimerId, MAX_TIMERS> = Vec::new();
        for entry in &mut self.timers {
            if now_ms >= entry.next_due_ms {
                entry.next_due_ms = now_ms + u64::from(entry.interval_ms);
                // Capacity matches the table, push cannot fail.
                let _ = due.push(entry.id);
            }
        }
        due
    }

    /// Advance the clock by a delta. Convenience for tests and sim loops.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<TimerId, MAX_TIMERS> {
        self.tick(self.now_ms + delta_ms)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
