//! Clock abstraction used to pace simulation loops.
//!
//! Drivers sleep between steps to run in (scaled) real time. Tests swap the
//! wall clock for a [`VirtualClock`] that advances instantly and records
//! every requested sleep.

use crate::error::EnvError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Source of time and blocking delays for a simulation loop.
pub trait SimClock: Send + Sync {
    /// Returns the elapsed time since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// On the wall clock this blocks the calling thread; on the virtual
    /// clock it advances time without blocking.
    fn sleep(&self, duration: Duration);
}

/// Computes the real-time pause between two steps.
///
/// A `real_time_factor` of 2.0 runs twice as fast as real time.
pub fn pacing_interval(step_time: f64, real_time_factor: f64) -> Result<Duration, EnvError> {
    if !step_time.is_finite() || step_time < 0.0 {
        return Err(EnvError::pacing(format!("step time {step_time} must be finite and >= 0")));
    }
    if !real_time_factor.is_finite() || real_time_factor <= 0.0 {
        return Err(EnvError::pacing(format!(
            "real-time factor {real_time_factor} must be finite and > 0"
        )));
    }
    Ok(Duration::from_secs_f64(step_time / real_time_factor))
}

/// Production clock backed by the OS monotonic clock.
pub struct WallClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl WallClock {
    /// Creates a new WallClock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock for WallClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock whose time only moves when slept on or advanced.
///
/// Clones share the same timeline.
#[derive(Clone, Default)]
pub struct VirtualClock {
    /// Current virtual time (nanoseconds since creation)
    time_ns: Arc<Mutex<u64>>,

    /// Every duration passed to `sleep`, in call order
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl VirtualClock {
    /// Creates a new VirtualClock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.time_ns.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration.as_nanos() as u64;
    }

    /// Returns all sleeps requested so far.
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SimClock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(*self.time_ns.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        self.advance_time(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_time() {
        let clock = VirtualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.sleep(Duration::from_millis(200));
        clock.sleep(Duration::from_millis(300));

        assert_eq!(clock.now(), Duration::from_millis(500));
        assert_eq!(
            clock.recorded_sleeps(),
            vec![Duration::from_millis(200), Duration::from_millis(300)]
        );
    }

    #[test]
    fn test_virtual_clock_clone_shares_time() {
        let clock1 = VirtualClock::new();
        let clock2 = clock1.clone();

        clock1.advance_time(Duration::from_secs(5));

        assert_eq!(clock1.now(), clock2.now());
        // advance_time is not a sleep
        assert!(clock2.recorded_sleeps().is_empty());
    }

    #[test]
    fn test_wall_clock_sleep() {
        let clock = WallClock::new();
        let t1 = clock.now();
        clock.sleep(Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_pacing_interval() {
        assert_eq!(pacing_interval(0.2, 1.0).unwrap(), Duration::from_secs_f64(0.2));
        assert_eq!(pacing_interval(0.2, 2.0).unwrap(), Duration::from_secs_f64(0.1));
        assert!(pacing_interval(0.2, 0.0).is_err());
        assert!(pacing_interval(0.2, f64::NAN).is_err());
        assert!(pacing_interval(-1.0, 1.0).is_err());
    }
}
