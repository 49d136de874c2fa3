//! Crash guard for background producers
//!
//! Work running off the tick thread must never take the process down. A
//! guarded thread catches its own panic, logs it, and hands a notification
//! back to the tick thread through the scheduler.

use crate::models::event::Event;
use crate::scheduler::{panic_message, Scheduler};
use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Run `work` on a background thread under the crash guard
///
/// The returned handle always joins with `Ok(())`: a panic inside `work` is
/// observed here, logged, and turned into an in-world notification plus an
/// [`Event::BackgroundFault`] delivered on the next scheduler drain.
pub fn spawn_guarded<F>(source: &str, scheduler: Scheduler, work: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    let source = source.to_string();
    thread::spawn(move || {
        let Err(payload) = catch_unwind(AssertUnwindSafe(work)) else {
            return;
        };

        let reason = panic_message(payload.as_ref());
        error!("background task '{}' panicked: {}", source, reason);

        scheduler.schedule(0, move |ctx| {
            ctx.world
                .notify(format!("Background task '{}' failed", source));
            let time = ctx.now_ms();
            ctx.log_event(Event::BackgroundFault {
                time,
                source,
                reason,
            });
        });
    })
}
