//! Rational presentation timestamps and time ranges
//!
//! # Spell: RationalTime
//! ^ Intent: represent media time as `value / scale` seconds with exact arithmetic
//!
//! @Timestamp
//!   : (value, scale) -> Timestamp
//!   ! comparison_is_exact_across_scales
//!   ! addition_never_rounds_when_representable
//!   - floating_point_accumulation
//!
//! Frame placement decisions in the resampler compare sums of intervals
//! against source timestamps, so every operation here works on integers.
//! Mixed scales are brought to their least common multiple using 128-bit
//! intermediates. Both parts are `i64`, so a nanosecond clock mixed with any
//! frame rate stays exact; only a result that cannot be represented in
//! `i64 / i64` even after reduction is rounded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Nanosecond timescale, the usual scale for host-clock derived timestamps
pub const NANOSECOND_SCALE: i64 = 1_000_000_000;

/// A rational point (or span) in media time: `value / scale` seconds
///
/// `scale` must be positive for the timestamp to be valid. Two timestamps
/// with different scales compare equal when they denote the same instant,
/// so `Timestamp::new(1, 2) == Timestamp::new(2, 4)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timestamp {
    /// Number of ticks
    pub value: i64,
    /// Ticks per second
    pub scale: i64,
}

impl Timestamp {
    /// Time zero
    pub const ZERO: Timestamp = Timestamp { value: 0, scale: 1 };

    /// Create a timestamp of `value` ticks at `scale` ticks per second
    pub const fn new(value: i64, scale: i64) -> Self {
        Self { value, scale }
    }

    /// Whole seconds
    pub const fn from_secs(secs: i64) -> Self {
        Self { value: secs, scale: 1 }
    }

    /// Milliseconds
    pub const fn from_millis(millis: i64) -> Self {
        Self {
            value: millis,
            scale: 1000,
        }
    }

    /// Convert seconds to a timestamp at the given scale
    ///
    /// This rounds and is meant for configuration input only; pipeline
    /// arithmetic never goes through floating point.
    pub fn from_seconds_f64(seconds: f64, scale: i64) -> Self {
        Self {
            value: (seconds * scale as f64).round() as i64,
            scale,
        }
    }

    /// A timestamp is valid when its scale is positive
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.scale > 0
    }

    /// Valid and strictly greater than zero
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.is_valid() && self.value > 0
    }

    /// Convert to seconds (lossy, for display and statistics)
    #[inline]
    pub fn as_secs_f64(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.value as f64 / self.scale as f64
    }

    /// Express this timestamp at another scale, rounding half away from zero
    pub fn rescale(&self, scale: i64) -> Self {
        if scale == self.scale || !self.is_valid() || scale <= 0 {
            return *self;
        }
        let numerator = self.value as i128 * scale as i128;
        let value = div_round(numerator, self.scale as i128);
        Self {
            value: clamp_i64(value),
            scale,
        }
    }

    /// The later of two timestamps
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// The earlier of two timestamps
    pub fn min(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Build a timestamp from wide parts, reducing the fraction if it does
    /// not fit and rounding only as a last resort.
    fn from_wide(value: i128, scale: i128) -> Self {
        if let (Ok(v), Ok(s)) = (i64::try_from(value), i64::try_from(scale)) {
            return Self { value: v, scale: s };
        }

        let divisor = gcd(value.unsigned_abs(), scale.unsigned_abs()) as i128;
        let (value, scale) = if divisor > 1 {
            (value / divisor, scale / divisor)
        } else {
            (value, scale)
        };
        if let (Ok(v), Ok(s)) = (i64::try_from(value), i64::try_from(scale)) {
            return Self { value: v, scale: s };
        }

        // Not representable exactly; fall back to nanoseconds.
        let target = NANOSECOND_SCALE as i128;
        let rounded = div_round(value.saturating_mul(target), scale);
        Self {
            value: clamp_i64(rounded),
            scale: NANOSECOND_SCALE,
        }
    }

    /// Both operands expressed over a common scale
    fn common(self, other: Self) -> (i128, i128, i128) {
        if self.scale == other.scale {
            return (self.value as i128, other.value as i128, self.scale as i128);
        }
        let a = self.scale as i128;
        let b = other.scale as i128;
        let lcm = a / gcd(a.unsigned_abs(), b.unsigned_abs()) as i128 * b;
        (
            self.value as i128 * (lcm / a),
            other.value as i128 * (lcm / b),
            lcm,
        )
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.scale == other.scale {
            return self.value.cmp(&other.value);
        }
        let lhs = self.value as i128 * other.scale as i128;
        let rhs = other.value as i128 * self.scale as i128;
        lhs.cmp(&rhs)
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        if !rhs.is_valid() {
            return self;
        }
        if !self.is_valid() {
            return rhs;
        }
        let (a, b, scale) = self.common(rhs);
        Timestamp::from_wide(a + b, scale)
    }
}

impl AddAssign for Timestamp {
    fn add_assign(&mut self, rhs: Timestamp) {
        *self = *self + rhs;
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        if !rhs.is_valid() {
            return self;
        }
        if !self.is_valid() {
            return -rhs;
        }
        let (a, b, scale) = self.common(rhs);
        Timestamp::from_wide(a - b, scale)
    }
}

impl SubAssign for Timestamp {
    fn sub_assign(&mut self, rhs: Timestamp) {
        *self = *self - rhs;
    }
}

impl Neg for Timestamp {
    type Output = Timestamp;

    fn neg(self) -> Timestamp {
        Timestamp::from_wide(-(self.value as i128), self.scale as i128)
    }
}

impl Mul<i64> for Timestamp {
    type Output = Timestamp;

    fn mul(self, rhs: i64) -> Timestamp {
        Timestamp::from_wide(self.value as i128 * rhs as i128, self.scale as i128)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}/{} ({:.6}s)", self.value, self.scale, self.as_secs_f64())
        } else {
            write!(f, "INVALID")
        }
    }
}

/// A span of media time starting at `start` and lasting `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub duration: Timestamp,
}

impl TimeRange {
    pub fn new(start: Timestamp, duration: Timestamp) -> Self {
        Self { start, duration }
    }

    /// Range covering `[start, end)`
    pub fn from_start_end(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    /// Exclusive end of the range
    #[inline]
    pub fn end(&self) -> Timestamp {
        self.start + self.duration
    }

    /// A range with no positive duration covers no time
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.duration.is_positive()
    }

    /// Whether `t` lies in `[start, end)`
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t < self.end()
    }

    /// Smallest range covering both ranges
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        TimeRange::from_start_end(start, end)
    }

    /// Overlap of both ranges, `None` when they do not overlap
    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if end > start {
            Some(TimeRange::from_start_end(start, end))
        } else {
            None
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}s, {:.6}s)",
            self.start.as_secs_f64(),
            self.end().as_secs_f64()
        )
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

/// Integer division rounding half away from zero
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if (numerator < 0) != (denominator < 0) {
            quotient - 1
        } else {
            quotient + 1
        }
    } else {
        quotient
    }
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}
