//! Time management for the simulation
//!
//! The simulation advances in discrete frames. Every frame moves the
//! millisecond clock forward by a fixed `frame_ms`. All timers in the crate
//! (scheduled tasks, incident lifetimes, resolution windows) compare against
//! the millisecond clock, never against the frame counter.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared millisecond clock
///
/// Cloning yields another handle to the same clock. Reads are safe from any
/// thread; only the tick thread advances it.
///
/// # Example
/// ```
/// use dispatch_sim_core_rs::SimClock;
///
/// let clock = SimClock::new();
/// let handle = clock.clone();
/// clock.advance(250);
/// assert_eq!(handle.now_ms(), 250);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ms: Arc<AtomicU64>,
}

impl SimClock {
    /// Create a clock starting at 0 ms
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Acquire)
    }

    /// Move the clock forward by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::AcqRel);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, now_ms: u64) {
        self.now_ms.fetch_max(now_ms, Ordering::AcqRel);
    }
}

/// Manages simulation time in frames and milliseconds
///
/// # Example
/// ```
/// use dispatch_sim_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(16); // 16 ms per frame
/// assert_eq!(time.current_tick(), 0);
/// assert_eq!(time.now_ms(), 0);
///
/// time.advance_tick();
/// assert_eq!(time.current_tick(), 1);
/// assert_eq!(time.now_ms(), 16);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Frames elapsed since simulation start
    current_tick: u64,
    /// Milliseconds per frame
    frame_ms: u64,
    #[serde(skip)]
    clock: SimClock,
}

impl TimeManager {
    /// Create a new TimeManager
    ///
    /// # Arguments
    /// * `frame_ms` - Milliseconds that one frame represents
    pub fn new(frame_ms: u64) -> Self {
        assert!(frame_ms > 0, "frame_ms must be positive");
        Self {
            current_tick: 0,
            frame_ms,
            clock: SimClock::new(),
        }
    }

    /// Advance time by one frame
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
        self.clock.advance(self.frame_ms);
    }

    /// Advance the millisecond clock without counting a frame
    ///
    /// Tests use this to place the clock at exact timestamps.
    ///
    /// # Example
    /// ```
    /// use dispatch_sim_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(16);
    /// time.advance_ms(2500);
    /// assert_eq!(time.now_ms(), 2500);
    /// assert_eq!(time.current_tick(), 0);
    /// ```
    pub fn advance_ms(&mut self, delta_ms: u64) {
        self.clock.advance(delta_ms);
    }

    /// Place the clock at an absolute time (monotonic)
    pub fn set_now_ms(&mut self, now_ms: u64) {
        self.clock.set(now_ms);
    }

    /// Frames elapsed since start
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Current simulation time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Milliseconds per frame
    pub fn frame_ms(&self) -> u64 {
        self.frame_ms
    }

    /// Handle to the underlying clock, for producers on other threads
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }
}
