//! Monotonic clock shared by the hardware and on-screen input sources.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock reading, measured from the owning [`Clock`]'s origin.
///
/// Used for ordering and for hardware de-duplication, so equality is exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    #[inline]
    pub fn from_duration(since_origin: Duration) -> Self {
        Self(since_origin)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    #[inline]
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    #[inline]
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    #[inline]
    pub fn checked_add(&self, duration: Duration) -> Option<Timestamp> {
        self.0.checked_add(duration).map(Timestamp)
    }
}

#[derive(Debug, Default)]
struct ManualTime {
    /// Microseconds since origin, advanced explicitly.
    micros: AtomicU64,
    /// One past the last stamped microsecond.
    next_stamp: AtomicU64,
}

#[derive(Clone, Debug)]
enum ClockSource {
    System(Instant),
    Manual(Arc<ManualTime>),
}

/// Shared monotonic clock.
///
/// Clone is cheap; clones observe the same origin, so events stamped by
/// different producers are comparable.
#[derive(Clone, Debug)]
pub struct Clock {
    source: ClockSource,
}

impl Clock {
    /// Wall-monotonic clock starting now.
    pub fn system() -> Self {
        Self {
            source: ClockSource::System(Instant::now()),
        }
    }

    /// Clock that only moves when [`advance`](Clock::advance) is called.
    pub fn manual() -> Self {
        Self {
            source: ClockSource::Manual(Arc::new(ManualTime::default())),
        }
    }

    pub fn now(&self) -> Timestamp {
        match &self.source {
            ClockSource::System(origin) => Timestamp(origin.elapsed()),
            ClockSource::Manual(time) => {
                Timestamp(Duration::from_micros(time.micros.load(Ordering::Acquire)))
            }
        }
    }

    /// Converts an `Instant` captured elsewhere (e.g. in a device callback)
    /// into this clock's timeline.
    ///
    /// Manual clocks ignore the instant. Their stamps are strictly
    /// increasing: while the clock stands still, each stamp is one
    /// microsecond after the previous one.
    pub fn stamp(&self, instant: Instant) -> Timestamp {
        match &self.source {
            ClockSource::System(origin) => Timestamp(instant.saturating_duration_since(*origin)),
            ClockSource::Manual(time) => {
                let now = time.micros.load(Ordering::Acquire);
                let previous = time
                    .next_stamp
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                        Some(next.max(now) + 1)
                    })
                    .unwrap_or(now);
                Timestamp(Duration::from_micros(previous.max(now)))
            }
        }
    }

    /// Moves a manual clock forward. No-op on a system clock.
    pub fn advance(&self, by: Duration) {
        if let ClockSource::Manual(time) = &self.source {
            time.micros.fetch_add(by.as_micros() as u64, Ordering::AcqRel);
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.source, ClockSource::Manual(_))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
