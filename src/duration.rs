/*!
A signed duration of real time.

This is the duration value type consumed by [`Instant`](crate::Instant)
arithmetic. Calendar-unit spans (months, years) are a different concept
entirely and are not modeled by this crate.
*/

use crate::error::Error;

const NANOS_PER_SEC: i32 = 1_000_000_000;
const SECS_PER_MIN: i64 = 60;
const MINS_PER_HOUR: i64 = 60;

/// A signed duration of time represented as a 96-bit integer of
/// nanoseconds.
///
/// Unlike `std::time::Duration`, this type can represent a negative span
/// of time. Its seconds and fractional nanoseconds always have the same
/// sign (or are zero).
///
/// # Example
///
/// ```
/// use zoneline::SignedDuration;
///
/// let duration = SignedDuration::new(59, 1_500_000_000);
/// assert_eq!(duration.as_secs(), 60);
/// assert_eq!(duration.subsec_nanos(), 500_000_000);
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignedDuration {
    second: i64,
    nanosecond: i32,
}

impl SignedDuration {
    /// A duration of zero time.
    pub const ZERO: SignedDuration =
        SignedDuration { second: 0, nanosecond: 0 };

    /// The minimum possible duration.
    pub const MIN: SignedDuration =
        SignedDuration { second: i64::MIN, nanosecond: -999_999_999 };

    /// The maximum possible duration.
    pub const MAX: SignedDuration =
        SignedDuration { second: i64::MAX, nanosecond: 999_999_999 };

    /// Creates a new signed duration from the given number of whole seconds
    /// and additional nanoseconds.
    ///
    /// If the absolute value of the nanoseconds is greater than or equal to
    /// 1 second, then the excess balances into the number of whole seconds.
    ///
    /// # Panics
    ///
    /// When the absolute value of the nanoseconds is greater than or equal
    /// to 1 second and the excess that carries over into seconds overflows
    /// `i64::MIN` or `i64::MAX`.
    #[inline]
    pub const fn new(second: i64, nanosecond: i32) -> SignedDuration {
        let mut second = second;
        let mut nanosecond = nanosecond;
        if nanosecond >= NANOS_PER_SEC || nanosecond <= -NANOS_PER_SEC {
            second = match second.checked_add((nanosecond / NANOS_PER_SEC) as i64)
            {
                Some(second) => second,
                None => panic!("overflow when constructing signed duration"),
            };
            nanosecond %= NANOS_PER_SEC;
        }
        if second > 0 && nanosecond < 0 {
            second -= 1;
            nanosecond += NANOS_PER_SEC;
        } else if second < 0 && nanosecond > 0 {
            second = match second.checked_add(1) {
                Some(second) => second,
                None => panic!("overflow when constructing signed duration"),
            };
            nanosecond -= NANOS_PER_SEC;
        }
        SignedDuration { second, nanosecond }
    }

    /// Creates a new signed duration from the given number of whole
    /// seconds.
    #[inline]
    pub const fn from_secs(second: i64) -> SignedDuration {
        SignedDuration { second, nanosecond: 0 }
    }

    /// Creates a new signed duration from the given number of whole
    /// minutes.
    ///
    /// # Panics
    ///
    /// When the number of minutes, after conversion to seconds, overflows
    /// the limits of this type.
    #[inline]
    pub const fn from_mins(minutes: i64) -> SignedDuration {
        match minutes.checked_mul(SECS_PER_MIN) {
            Some(second) => SignedDuration { second, nanosecond: 0 },
            None => panic!("minutes overflowed signed duration"),
        }
    }

    /// Creates a new signed duration from the given number of whole hours.
    ///
    /// # Panics
    ///
    /// When the number of hours, after conversion to seconds, overflows the
    /// limits of this type.
    #[inline]
    pub const fn from_hours(hours: i64) -> SignedDuration {
        match hours.checked_mul(SECS_PER_MIN * MINS_PER_HOUR) {
            Some(second) => SignedDuration { second, nanosecond: 0 },
            None => panic!("hours overflowed signed duration"),
        }
    }

    /// Returns the number of whole seconds in this duration.
    ///
    /// The value returned is negative when the duration is negative.
    #[inline]
    pub const fn as_secs(&self) -> i64 {
        self.second
    }

    /// Returns the fractional part of this duration in whole nanoseconds.
    ///
    /// The value returned is negative when the duration is negative, and is
    /// guaranteed to have the same sign as (or be zero alongside) the value
    /// returned by [`SignedDuration::as_secs`].
    #[inline]
    pub const fn subsec_nanos(&self) -> i32 {
        self.nanosecond
    }

    /// Returns true when this duration is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.second == 0 && self.nanosecond == 0
    }

    /// Returns true when this duration is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.second < 0 || self.nanosecond < 0
    }

    /// Adds one duration to another, returning an error on overflow.
    #[inline]
    pub fn checked_add(
        &self,
        other: SignedDuration,
    ) -> Result<SignedDuration, Error> {
        let Some(mut second) = self.second.checked_add(other.second) else {
            return Err(Error::range(
                "signed duration seconds",
                i128::from(self.second) + i128::from(other.second),
                i64::MIN,
                i64::MAX,
            ));
        };
        // Neither operand's fraction exceeds a second in magnitude, so the
        // sum carries at most one whole second.
        let mut nanosecond = self.nanosecond + other.nanosecond;
        if nanosecond >= NANOS_PER_SEC {
            nanosecond -= NANOS_PER_SEC;
            second = second.checked_add(1).ok_or_else(|| {
                Error::range(
                    "signed duration seconds",
                    i128::from(second) + 1,
                    i64::MIN,
                    i64::MAX,
                )
            })?;
        } else if nanosecond <= -NANOS_PER_SEC {
            nanosecond += NANOS_PER_SEC;
            second = second.checked_sub(1).ok_or_else(|| {
                Error::range(
                    "signed duration seconds",
                    i128::from(second) - 1,
                    i64::MIN,
                    i64::MAX,
                )
            })?;
        }
        Ok(SignedDuration::new(second, nanosecond))
    }

    /// Subtracts one duration from another, returning an error on overflow.
    #[inline]
    pub fn checked_sub(
        &self,
        other: SignedDuration,
    ) -> Result<SignedDuration, Error> {
        let other = other.checked_neg().ok_or_else(|| {
            Error::range(
                "signed duration seconds",
                i128::from(other.second),
                i64::MIN + 1,
                i64::MAX,
            )
        })?;
        self.checked_add(other)
    }

    /// Returns the negation of this duration, or `None` when the seconds
    /// are `i64::MIN` and cannot be negated.
    #[inline]
    pub const fn checked_neg(self) -> Option<SignedDuration> {
        let Some(second) = self.second.checked_neg() else { return None };
        Some(SignedDuration { second, nanosecond: -self.nanosecond })
    }
}

impl core::fmt::Debug for SignedDuration {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.nanosecond == 0 {
            write!(f, "{}s", self.second)
        } else if self.second == 0 {
            write!(f, "{}ns", self.nanosecond)
        } else {
            write!(f, "{}s{}ns", self.second, self.nanosecond.abs())
        }
    }
}
