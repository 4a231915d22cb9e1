//! The fixed enumeration of daily slot start times.
//!
//! Every bookable slot starts on the hour between 09:00 and 17:00. The
//! enumeration is closed: provisioning creates exactly one slot per variant
//! per (unit, date), and the wire format is the `"HH:MM"` string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A slot's start time, one of the nine fixed daily openings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SlotTime {
    T0900,
    T1000,
    T1100,
    T1200,
    T1300,
    T1400,
    T1500,
    T1600,
    T1700,
}

impl SlotTime {
    /// All start times, in chronological order.
    pub fn all() -> &'static [SlotTime] {
        &[
            SlotTime::T0900,
            SlotTime::T1000,
            SlotTime::T1100,
            SlotTime::T1200,
            SlotTime::T1300,
            SlotTime::T1400,
            SlotTime::T1500,
            SlotTime::T1600,
            SlotTime::T1700,
        ]
    }

    /// The `"HH:MM"` form stored in the database and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotTime::T0900 => "09:00",
            SlotTime::T1000 => "10:00",
            SlotTime::T1100 => "11:00",
            SlotTime::T1200 => "12:00",
            SlotTime::T1300 => "13:00",
            SlotTime::T1400 => "14:00",
            SlotTime::T1500 => "15:00",
            SlotTime::T1600 => "16:00",
            SlotTime::T1700 => "17:00",
        }
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotTime {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "09:00" => Ok(SlotTime::T0900),
            "10:00" => Ok(SlotTime::T1000),
            "11:00" => Ok(SlotTime::T1100),
            "12:00" => Ok(SlotTime::T1200),
            "13:00" => Ok(SlotTime::T1300),
            "14:00" => Ok(SlotTime::T1400),
            "15:00" => Ok(SlotTime::T1500),
            "16:00" => Ok(SlotTime::T1600),
            "17:00" => Ok(SlotTime::T1700),
            other => Err(DomainError::Parse(format!("unknown slot time: {other}"))),
        }
    }
}

impl TryFrom<String> for SlotTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.as_str().to_string()
    }
}
