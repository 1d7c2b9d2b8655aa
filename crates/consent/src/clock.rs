use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

pub const MS_IN_DAY: i64 = 1000 * 60 * 60 * 24;

/// Source of the current instant, in milliseconds since the Unix epoch.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for hosts that replay time, and for tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: Cell<i64>,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self { now: Cell::new(now_ms) }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance_days(&self, days: i64) {
        self.now.set(self.now.get() + days * MS_IN_DAY);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Render an epoch-millisecond instant as RFC 3339 for log output.
pub fn to_rfc3339(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|datetime| datetime.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
