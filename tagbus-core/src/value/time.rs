//! Absolute timestamps and relative intervals, both as floating-point seconds.
//!
//! Comparison is exact numeric comparison; there is no epsilon, so a value
//! survives an encode/decode cycle bit for bit.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Seconds since the Unix epoch. No timezone is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Time(f64);

impl Time {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        let now = Utc::now();
        Self(now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    /// The instant as a UTC date, if it is representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.0.is_finite() {
            return None;
        }
        let whole = self.0.floor();
        let nanos = ((self.0 - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A span of time in seconds. May be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Interval(f64);

impl Interval {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_formats_as_utc_instant() {
        let t = Time::from_secs(1_700_000_000.5);
        assert_eq!(t.to_string(), "2023-11-14T22:13:20.500000Z");
    }

    #[test]
    fn non_finite_time_falls_back_to_number() {
        assert_eq!(Time::from_secs(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(Time::now() > Time::from_secs(0.0));
    }

    #[test]
    fn interval_display_and_ordering() {
        assert_eq!(Interval::from_secs(120.0).to_string(), "120s");
        assert_eq!(Interval::from_secs(0.0).to_string(), "0s");
        assert!(Interval::from_secs(-1.0) < Interval::default());
    }
}
