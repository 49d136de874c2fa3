//! Scheduler: due-time, at-most-once, failure isolation, cross-thread producers

use dispatch_sim_core_rs::{SimConfig, SimContext};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn context() -> SimContext {
    SimContext::new(SimConfig::default())
}

/// Drain once at the context's current time
fn drain(ctx: &mut SimContext) -> (usize, usize) {
    let scheduler = ctx.scheduler.clone();
    let report = scheduler.tick(ctx);
    (report.completed, report.failed)
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let reader = count.clone();
    (count, move || reader.load(Ordering::SeqCst))
}

#[test]
fn test_task_not_run_before_due() {
    let mut ctx = context();
    let (count, runs) = counter();

    ctx.time.set_now_ms(1000);
    ctx.scheduler.schedule(500, move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    ctx.time.set_now_ms(1499);
    drain(&mut ctx);
    assert_eq!(runs(), 0);

    ctx.time.set_now_ms(1500);
    drain(&mut ctx);
    assert_eq!(runs(), 1);
}

#[test]
fn test_zero_delay_runs_on_next_drain() {
    let mut ctx = context();
    let (count, runs) = counter();

    ctx.scheduler.schedule(0, move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    drain(&mut ctx);

    assert_eq!(runs(), 1);
}

#[test]
fn test_task_runs_at_most_once() {
    let mut ctx = context();
    let (count, runs) = counter();
    ctx.scheduler.schedule(100, move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    for step in 0..50 {
        ctx.time.set_now_ms(step * 100);
        drain(&mut ctx);
    }

    assert_eq!(runs(), 1);
    assert_eq!(ctx.scheduler.pending(), 0);
}

#[test]
fn test_panicking_task_does_not_stop_siblings() {
    let mut ctx = context();
    let (count, runs) = counter();

    for i in 0..5 {
        let count = count.clone();
        ctx.scheduler.schedule(0, move |_| {
            if i == 2 {
                panic!("task {} exploded", i);
            }
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    let (completed, failed) = drain(&mut ctx);

    assert_eq!(runs(), 4);
    assert_eq!((completed, failed), (4, 1));
    let failures = ctx.events.events_of_type("TaskFailed");
    assert_eq!(failures.len(), 1);
}

#[test]
fn test_queue_usable_after_panic() {
    let mut ctx = context();
    ctx.scheduler.schedule(0, |_| panic!("boom"));
    drain(&mut ctx);

    let (count, runs) = counter();
    ctx.scheduler.schedule(0, move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    drain(&mut ctx);

    assert_eq!(runs(), 1);
}

#[test]
fn test_task_scheduled_during_drain_waits_for_next_drain() {
    let mut ctx = context();
    let (count, runs) = counter();

    ctx.scheduler.schedule(0, move |ctx| {
        ctx.scheduler.schedule(0, move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    });

    drain(&mut ctx);
    assert_eq!(runs(), 0);
    assert_eq!(ctx.scheduler.pending(), 1);

    drain(&mut ctx);
    assert_eq!(runs(), 1);
}

#[test]
fn test_tasks_can_touch_the_world() {
    let mut ctx = context();
    ctx.scheduler.schedule(250, |ctx| ctx.world.notify("dinner is ready"));

    ctx.time.advance_ms(250);
    drain(&mut ctx);

    assert_eq!(ctx.world.notifications(), ["dinner is ready".to_string()]);
}

#[test]
fn test_producers_on_other_threads() {
    let mut ctx = context();
    let (count, runs) = counter();

    let producers: Vec<_> = (0..8)
        .map(|_| {
            let scheduler = ctx.scheduler.clone();
            let count = count.clone();
            thread::spawn(move || {
                for delay in 0..100 {
                    let count = count.clone();
                    scheduler.schedule(delay, move |_| {
                        count.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    // drain concurrently with the producers
    for step in 0..20 {
        ctx.time.set_now_ms(step * 5);
        drain(&mut ctx);
    }
    for producer in producers {
        producer.join().unwrap();
    }

    ctx.time.set_now_ms(10_000);
    drain(&mut ctx);

    assert_eq!(runs(), 800);
    assert_eq!(ctx.scheduler.pending(), 0);
}

proptest! {
    /// A task fires exactly once, on the first drain at or after its due time
    #[test]
    fn prop_fires_once_on_first_due_drain(
        start in 0u64..10_000,
        delay in 0u64..5_000,
        steps in proptest::collection::vec(1u64..400, 1..60),
    ) {
        let mut ctx = context();
        ctx.time.set_now_ms(start);

        let fired_at = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = fired_at.clone();
        ctx.scheduler.schedule(delay, move |ctx| {
            sink.lock().unwrap().push(ctx.now_ms());
        });

        let due = start + delay;
        let mut first_due_drain = None;
        for step in steps {
            let now = ctx.now_ms();
            if now >= due && first_due_drain.is_none() {
                first_due_drain = Some(now);
            }
            drain(&mut ctx);
            ctx.time.advance_ms(step);
        }

        let fired = fired_at.lock().unwrap().clone();
        match first_due_drain {
            Some(at) => prop_assert_eq!(fired, vec![at]),
            None => prop_assert!(fired.is_empty()),
        }
    }

    /// Every task in a batch runs exactly once regardless of which panic
    #[test]
    fn prop_failures_do_not_leak(panics in proptest::collection::vec(any::<bool>(), 1..30)) {
        let mut ctx = context();
        let (count, runs) = counter();
        let expected_ok = panics.iter().filter(|p| !**p).count();

        for should_panic in panics.iter().copied() {
            let count = count.clone();
            ctx.scheduler.schedule(0, move |_| {
                if should_panic {
                    panic!("scheduled failure");
                }
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        let (completed, failed) = drain(&mut ctx);
        prop_assert_eq!(runs(), expected_ok);
        prop_assert_eq!(completed, expected_ok);
        prop_assert_eq!(failed, panics.len() - expected_ok);
        prop_assert_eq!(ctx.scheduler.pending(), 0);
    }
}
