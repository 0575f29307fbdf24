// Time source for stores and the session registry
// Decision: Inject the clock so TTL expiry and timestamps are testable
// Decision: Timestamps carry microsecond precision, matching PostgreSQL TIMESTAMPTZ

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Drop sub-microsecond precision; valid for every representable timestamp
pub(crate) fn truncate_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(ts.nanosecond() / 1_000 * 1_000)
        .unwrap_or(ts)
}

/// Current time truncated to whole microseconds
pub(crate) fn now_micros(clock: &dyn Clock) -> DateTime<Utc> {
    truncate_micros(clock.now())
}

/// Next `updated_at` for a row last stamped at `previous`; always strictly later
pub(crate) fn next_updated_at(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > previous {
        now
    } else {
        floor
    }
}
