//! System clock implementation.

use chrono::{DateTime, Utc};

use super::ports::ClockPort;

/// Production clock backed by the system time.
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
