//! General time utility functions and the clock abstraction used by the
//! scheduler.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{self, DateTime, Timelike, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of microseconds in a second
pub const MICROS_PER_SECOND: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of time.
///
/// The scheduler only ever reads time through this trait so that it can be
/// driven by a deterministic clock in tests.
pub trait Clock {
    /// Monotonic time elapsed since an arbitrary, fixed origin.
    fn monotonic(&self) -> Duration;

    /// Current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Suspend the calling thread for the given duration.
    fn sleep(&self, dur: Duration);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Clock backed by the operating system.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

/// A clock which only moves when told to.
///
/// Cloning a `ManualClock` gives another handle onto the same time, which
/// lets fake task bodies advance time as if they took a while to run.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualClockInner>>,
}

#[derive(Debug)]
struct ManualClockInner {
    monotonic: Duration,
    wall: DateTime<Utc>,
    slept: Vec<Duration>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur)
    }
}

impl ManualClock {
    /// Create a new clock with the given wall-clock time and zero monotonic
    /// time.
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualClockInner {
                monotonic: Duration::from_secs(0),
                wall,
                slept: Vec::new(),
            })),
        }
    }

    /// Move both the monotonic and wall-clock time forward.
    pub fn advance(&self, dur: Duration) {
        let mut inner = self.lock();
        inner.monotonic += dur;
        inner.wall = inner.wall
            + chrono::Duration::from_std(dur).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// All durations passed to `sleep` so far, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().slept.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClockInner> {
        // A poisoned clock only happens if a test already panicked
        match self.inner.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }
}

impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        self.lock().monotonic
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.lock().wall
    }

    fn sleep(&self, dur: Duration) {
        self.lock().slept.push(dur);
        self.advance(dur);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of microseconds from `now` until the next whole second.
///
/// A time already exactly on a second boundary waits a full second, so every
/// robot of the fleet starts on the same boundary regardless of rounding.
pub fn micros_to_next_second(now: &DateTime<Utc>) -> u64 {
    // Leap seconds are reported as nanos >= 1e9, clamp them into the second
    let micros_in_second = (now.nanosecond() as u64 / 1_000).min(MICROS_PER_SECOND - 1);

    MICROS_PER_SECOND - micros_in_second
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_micros_to_next_second() {
        let t = Utc.timestamp_opt(1_600_000_000, 250_000_000).unwrap();
        assert_eq!(micros_to_next_second(&t), 750_000);

        let t = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        assert_eq!(micros_to_next_second(&t), 1_000_000);

        let t = Utc.timestamp_opt(1_600_000_000, 999_999_000).unwrap();
        assert_eq!(micros_to_next_second(&t), 1);
    }

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new(Utc.timestamp_opt(1_600_000_000, 0).unwrap());
        let other = clock.clone();

        clock.sleep(Duration::from_millis(40));
        other.advance(Duration::from_millis(2));

        assert_eq!(clock.monotonic(), Duration::from_millis(42));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(40)]);
        assert_eq!(
            clock.now_utc(),
            Utc.timestamp_opt(1_600_000_000, 42_000_000).unwrap()
        );
    }
}
