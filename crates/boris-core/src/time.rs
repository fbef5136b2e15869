//! Exact decimal time primitives.
//!
//! Observation times are decimal seconds. Binary floats drift over long
//! recordings, so every timestamp is a [`Decimal`] and conversions to `f64`
//! only happen when a statistic is computed.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A point on an observation timeline, in exact decimal seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(Decimal);

impl Timestamp {
    /// Largest magnitude accepted for media and live observations.
    ///
    /// Downstream consumers store seconds in signed 32-bit integers.
    pub const MAX_ABS: Self = Self(Decimal::from_parts(2_147_483_647, 0, 0, false, 0));

    /// The zero timestamp.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// One millisecond.
    pub const MILLISECOND: Self = Self(Decimal::from_parts(1, 0, 0, false, 3));

    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Whole seconds.
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        Self(Decimal::from(secs))
    }

    /// Milliseconds, kept exact.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(Decimal::new(millis, 3))
    }

    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Lossy conversion for statistics.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Returns true if the magnitude fits in a signed 32-bit second count.
    #[must_use]
    pub fn is_within_range(self) -> bool {
        self.0.abs() <= Self::MAX_ABS.0
    }

    /// Rounds to `decimal_places`, which may be negative.
    ///
    /// `round_to(-1)` rounds to tens of seconds, `round_to(2)` to
    /// hundredths. Ties go to the even neighbour.
    #[must_use]
    pub fn round_to(self, decimal_places: i32) -> Self {
        let strategy = RoundingStrategy::MidpointNearestEven;
        if decimal_places >= 0 {
            return Self(self.0.round_dp_with_strategy(decimal_places.unsigned_abs(), strategy));
        }
        let Some(factor) = 10_i64
            .checked_pow(decimal_places.unsigned_abs())
            .map(Decimal::from)
        else {
            // Coarser than any representable factor: everything collapses to zero.
            return Self::ZERO;
        };
        let scaled = (self.0 / factor).round_dp_with_strategy(0, strategy);
        Self((scaled * factor).normalize())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Timestamp {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Timestamp {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Timestamp {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Timestamp {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

/// The time field of a coded event.
///
/// `NotAvailable` is the "no timestamp" sentinel used by image observations
/// whose pictures carry no time information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Timestamp>", into = "Option<Timestamp>")]
pub enum EventTime {
    Seconds(Timestamp),
    NotAvailable,
}

impl EventTime {
    #[must_use]
    pub const fn seconds(self) -> Option<Timestamp> {
        match self {
            Self::Seconds(t) => Some(t),
            Self::NotAvailable => None,
        }
    }
}

impl From<Option<Timestamp>> for EventTime {
    fn from(value: Option<Timestamp>) -> Self {
        value.map_or(Self::NotAvailable, Self::Seconds)
    }
}

impl From<EventTime> for Option<Timestamp> {
    fn from(value: EventTime) -> Self {
        value.seconds()
    }
}

impl From<Timestamp> for EventTime {
    fn from(value: Timestamp) -> Self {
        Self::Seconds(value)
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(t) => write!(f, "{t}"),
            Self::NotAvailable => write!(f, "NA"),
        }
    }
}

/// A half-open interval `[start, stop)` on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: Timestamp,
    pub stop: Timestamp,
}

impl Interval {
    #[must_use]
    pub const fn new(start: Timestamp, stop: Timestamp) -> Self {
        Self { start, stop }
    }

    #[must_use]
    pub fn duration(&self) -> Timestamp {
        self.stop - self.start
    }

    /// True for zero-length intervals (instantaneous events).
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.start == self.stop
    }

    #[must_use]
    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t < self.stop
    }

    /// Overlap of two intervals, `None` when they do not share any time.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        (start < stop).then_some(Self { start, stop })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_decimal_addition_does_not_drift() {
        let mut acc = Timestamp::ZERO;
        for _ in 0..10 {
            acc = acc + t("0.1");
        }
        assert_eq!(acc, Timestamp::from_secs(1));
    }

    #[test]
    fn test_millisecond_constant_matches_from_millis() {
        assert_eq!(Timestamp::MILLISECOND, Timestamp::from_millis(1));
        assert_eq!(t("10") - Timestamp::MILLISECOND, t("9.999"));
    }

    #[test]
    fn test_range_check_uses_signed_32_bit_bound() {
        assert!(t("2147483647").is_within_range());
        assert!(t("-2147483647").is_within_range());
        assert!(!t("2147483647.001").is_within_range());
        assert!(!t("-2147483648").is_within_range());
    }

    #[test]
    fn test_round_to_positive_places() {
        assert_eq!(t("1.2345").round_to(2), t("1.23"));
        assert_eq!(t("1.235").round_to(2), t("1.24"));
        assert_eq!(t("1.225").round_to(2), t("1.22"));
    }

    #[test]
    fn test_round_to_negative_places() {
        assert_eq!(t("14").round_to(-1), t("10"));
        assert_eq!(t("16").round_to(-1), t("20"));
        assert_eq!(t("250").round_to(-2), t("200"));
        assert_eq!(t("350").round_to(-2), t("400"));
        assert_eq!(t("123").round_to(-30), Timestamp::ZERO);
    }

    #[test]
    fn test_event_time_serde_uses_null_for_missing() {
        let json = serde_json::to_string(&EventTime::NotAvailable).unwrap();
        assert_eq!(json, "null");
        let parsed: EventTime = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, EventTime::NotAvailable);
        let parsed: EventTime = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(parsed, EventTime::Seconds(t("1.5")));
    }

    #[test]
    fn test_interval_contains_is_half_open() {
        let i = Interval::new(t("0"), t("5"));
        assert!(i.contains(t("0")));
        assert!(i.contains(t("4.999")));
        assert!(!i.contains(t("5")));
    }

    #[test]
    fn test_interval_intersection() {
        let a = Interval::new(t("0"), t("5"));
        let b = Interval::new(t("3"), t("8"));
        assert_eq!(a.intersection(&b), Some(Interval::new(t("3"), t("5"))));
        let c = Interval::new(t("5"), t("6"));
        assert_eq!(a.intersection(&c), None);
        assert_eq!(b.duration(), t("5"));
        assert!(Interval::new(t("2"), t("2")).is_instant());
    }

    #[test]
    fn test_display_is_normalized() {
        assert_eq!(t("1.500").to_string(), "1.5");
        assert_eq!(EventTime::NotAvailable.to_string(), "NA");
    }
}
