//! Deferred task scheduling
//!
//! A thread-safe queue of time-stamped callbacks, drained once per frame by
//! the tick thread. Producers on any thread may call [`Scheduler::schedule`];
//! only the tick thread calls [`Scheduler::tick`].
//!
//! # Guarantees
//!
//! 1. A task never runs before `now + delay_ms` as observed when it was scheduled
//! 2. A task runs at most once, on the first drain at or after its due time
//! 3. A panicking task is logged and discarded; the rest of the drain proceeds
//! 4. Tasks scheduled while draining land in the queue, never in the current drain
//!
//! Ordering among tasks due on the same drain is unspecified.

use crate::core::context::SimContext;
use crate::core::time::SimClock;
use crate::models::event::Event;
use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A scheduled callback; receives the tick thread's context
pub type Action = Box<dyn FnOnce(&mut SimContext) + Send + 'static>;

/// A callback paired with its earliest run time
pub struct ScheduledTask {
    run_at: u64,
    action: Action,
}

impl ScheduledTask {
    /// Earliest simulation time (ms) this task may run at
    pub fn run_at(&self) -> u64 {
        self.run_at
    }
}

/// Outcome of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks that ran to completion
    pub completed: usize,
    /// Tasks that panicked
    pub failed: usize,
}

/// Shared handle to the task queue
///
/// Clones refer to the same queue and clock.
///
/// # Example
/// ```
/// use dispatch_sim_core_rs::{SimConfig, SimContext};
///
/// let mut ctx = SimContext::new(SimConfig::default());
/// ctx.scheduler.schedule(100, |ctx| ctx.world.notify("done"));
///
/// let scheduler = ctx.scheduler.clone();
/// assert_eq!(scheduler.tick(&mut ctx).completed, 0);
///
/// ctx.time.advance_ms(100);
/// assert_eq!(scheduler.tick(&mut ctx).completed, 1);
/// assert_eq!(ctx.world.notifications()[0], "done");
/// ```
#[derive(Clone)]
pub struct Scheduler {
    queue: Arc<Mutex<Vec<ScheduledTask>>>,
    clock: SimClock,
}

impl Scheduler {
    pub fn new(clock: SimClock) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    /// Run `action` no earlier than `delay_ms` from now
    ///
    /// Callable from any thread. There is no cancellation handle: an action
    /// that may become stale checks the world itself and returns early.
    pub fn schedule<F>(&self, delay_ms: u64, action: F)
    where
        F: FnOnce(&mut SimContext) + Send + 'static,
    {
        let run_at = self.clock.now_ms().saturating_add(delay_ms);
        self.lock().push(ScheduledTask {
            run_at,
            action: Box::new(action),
        });
    }

    /// Number of queued tasks (due or not)
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Remove and return every task due at `now_ms`
    ///
    /// The lock is held only for the hand-off.
    pub fn take_due(&self, now_ms: u64) -> Vec<ScheduledTask> {
        let mut queue = self.lock();
        let (due, waiting): (Vec<_>, Vec<_>) =
            queue.drain(..).partition(|task| task.run_at <= now_ms);
        *queue = waiting;
        due
    }

    /// Drain and run every due task
    ///
    /// Must be called from the tick thread only. Tasks run outside the lock,
    /// so they may schedule follow-ups freely.
    pub fn tick(&self, ctx: &mut SimContext) -> DrainReport {
        let now = ctx.time.now_ms();
        let mut report = DrainReport::default();

        for task in self.take_due(now) {
            let action = task.action;
            match catch_unwind(AssertUnwindSafe(|| action(ctx))) {
                Ok(()) => report.completed += 1,
                Err(payload) => {
                    report.failed += 1;
                    let reason = panic_message(payload.as_ref());
                    error!("scheduled task due at {}ms panicked: {}", task.run_at, reason);
                    ctx.events.log(Event::TaskFailed { time: now, reason });
                }
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScheduledTask>> {
        // A panic while holding the lock cannot leave the Vec half-written,
        // so a poisoned queue is still usable.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_due_splits_queue() {
        let clock = SimClock::new();
        let scheduler = Scheduler::new(clock.clone());

        scheduler.schedule(0, |_| {});
        scheduler.schedule(50, |_| {});
        scheduler.schedule(100, |_| {});

        let due = scheduler.take_due(50);
        assert_eq!(due.len(), 2);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_delay_is_relative_to_clock() {
        let clock = SimClock::new();
        let scheduler = Scheduler::new(clock.clone());

        clock.advance(1000);
        scheduler.schedule(250, |_| {});

        let due = scheduler.take_due(1249);
        assert!(due.is_empty());
        let due = scheduler.take_due(1250);
        assert_eq!(due[0].run_at(), 1250);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
