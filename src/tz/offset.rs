use crate::{
    civil::DateTime,
    error::Error,
    instant::Instant,
};

/// The maximum offset magnitude in seconds, corresponding to `18:00:00`.
///
/// Every offset that has ever been used by a real time zone fits well
/// within this bound.
pub(crate) const SECONDS_MAX: i32 = 18 * 60 * 60;

/// An enum indicating whether a particular instant is in DST or not.
///
/// DST stands for "daylight saving time." It is a label applied to points
/// in time as a way to contrast them with "standard time." When DST takes
/// effect is usually determined by governments, and the rules can vary
/// depending on the location.
///
/// In general, most users should never need to deal with this type. But it
/// can be occasionally useful when callers need to know whether DST is
/// active for the interval reported by
/// [`ZoneInterval::dst`](crate::tz::ZoneInterval::dst).
///
/// This type has a `From<bool>` trait implementation, where the bool is
/// interpreted as being `true` when DST is active.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Dst {
    /// DST is not in effect. In other words, standard time is in effect.
    No,
    /// DST is in effect.
    Yes,
}

impl Dst {
    /// Returns true when this value is equal to `Dst::Yes`.
    pub fn is_dst(self) -> bool {
        matches!(self, Dst::Yes)
    }

    /// Returns true when this value is equal to `Dst::No`.
    ///
    /// `std` in this context refers to "standard time." That is, it is the
    /// offset from UTC used when DST is not in effect.
    pub fn is_std(self) -> bool {
        matches!(self, Dst::No)
    }
}

impl From<bool> for Dst {
    fn from(is_dst: bool) -> Dst {
        if is_dst {
            Dst::Yes
        } else {
            Dst::No
        }
    }
}

/// Represents a fixed time zone offset.
///
/// Negative offsets correspond to time zones west of the prime meridian,
/// while positive offsets correspond to time zones east of the prime
/// meridian. Equivalently, in all cases, `civil-time - offset = UTC`.
///
/// # Display format
///
/// This type implements the `std::fmt::Display` trait. It will convert the
/// offset to a string format in the form
/// `{sign}{hours}[:{minutes}[:{seconds}]]`, where `minutes` and `seconds`
/// are only present when non-zero. For example:
///
/// ```
/// use zoneline::tz::Offset;
///
/// let o = Offset::constant(-5);
/// assert_eq!(o.to_string(), "-05");
/// let o = Offset::constant_seconds(-18_060);
/// assert_eq!(o.to_string(), "-05:01");
/// let o = Offset::constant_seconds(-18_062);
/// assert_eq!(o.to_string(), "-05:01:02");
/// // No offset.
/// let o = Offset::constant(0);
/// assert_eq!(o.to_string(), "+00");
/// ```
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Offset {
    second: i32,
}

impl Offset {
    /// The minimum possible time zone offset, `-18:00:00`.
    pub const MIN: Offset = Offset { second: -SECONDS_MAX };

    /// The maximum possible time zone offset, `18:00:00`.
    pub const MAX: Offset = Offset { second: SECONDS_MAX };

    /// The offset corresponding to UTC. That is, no offset at all.
    ///
    /// This is defined to always be equivalent to `Offset::ZERO`, but it is
    /// semantically distinct. This ought to be used when UTC is desired
    /// specifically, while `Offset::ZERO` ought to be used when one wants
    /// to express "no offset."
    pub const UTC: Offset = Offset::ZERO;

    /// The offset corresponding to no offset at all.
    pub const ZERO: Offset = Offset { second: 0 };

    /// Creates a new time zone offset in a `const` context from a given
    /// number of hours.
    ///
    /// The fallible non-const version of this constructor is
    /// [`Offset::from_seconds`].
    ///
    /// # Panics
    ///
    /// This routine panics when the given number of hours is out of range.
    /// Namely, `hours` must be in the range `-18..=18`.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::tz::Offset;
    ///
    /// let o = Offset::constant(-5);
    /// assert_eq!(o.seconds(), -18_000);
    /// ```
    #[inline]
    pub const fn constant(hours: i8) -> Offset {
        if !(-18 <= hours && hours <= 18) {
            panic!("invalid time zone offset hours");
        }
        Offset::constant_seconds((hours as i32) * 60 * 60)
    }

    /// Creates a new time zone offset in a `const` context from a given
    /// number of seconds.
    ///
    /// # Panics
    ///
    /// This routine panics when the given number of seconds is out of
    /// range. The range corresponds to the offsets `-18:00:00..=18:00:00`,
    /// or in units of seconds, `-64,800..=64,800`.
    #[inline]
    pub const fn constant_seconds(seconds: i32) -> Offset {
        if !(-SECONDS_MAX <= seconds && seconds <= SECONDS_MAX) {
            panic!("invalid time zone offset seconds");
        }
        Offset { second: seconds }
    }

    /// Creates a new time zone offset from a given number of seconds.
    ///
    /// # Errors
    ///
    /// This routine returns an error when the given number of seconds is
    /// out of range. The range corresponds to the offsets
    /// `-18:00:00..=18:00:00`, or in units of seconds, `-64,800..=64,800`.
    #[inline]
    pub fn from_seconds(seconds: i32) -> Result<Offset, Error> {
        if !(-SECONDS_MAX <= seconds && seconds <= SECONDS_MAX) {
            return Err(Error::range(
                "offset seconds",
                seconds,
                -SECONDS_MAX,
                SECONDS_MAX,
            ));
        }
        Ok(Offset { second: seconds })
    }

    /// Returns the total number of seconds in this offset.
    ///
    /// Negative values correspond to time zones west of the prime meridian.
    #[inline]
    pub const fn seconds(self) -> i32 {
        self.second
    }

    /// Returns the negation of this offset.
    ///
    /// A negative offset will become positive and vice versa. This is a
    /// no-op if the offset is zero. This never panics.
    #[inline]
    pub const fn negate(self) -> Offset {
        Offset { second: -self.second }
    }

    /// Returns true if and only if this offset is less than zero.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.second < 0
    }

    /// Converts the given instant to a civil datetime using this offset.
    ///
    /// This conversion is infallible: the range of [`Instant`] is restricted
    /// such that the result is always a representable civil datetime.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{civil::DateTime, tz::Offset, Instant};
    ///
    /// assert_eq!(
    ///     Offset::constant(-8).to_datetime(Instant::UNIX_EPOCH),
    ///     DateTime::constant(1969, 12, 31, 16, 0, 0, 0),
    /// );
    /// ```
    #[inline]
    pub fn to_datetime(self, instant: Instant) -> DateTime {
        instant.to_datetime_with_offset(self)
    }

    /// Converts the given civil datetime to an instant using this offset.
    ///
    /// # Errors
    ///
    /// This returns an error if the resulting instant would be outside its
    /// minimum and maximum values. This can only happen for civil datetimes
    /// within the maximum offset magnitude of the civil range boundaries.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{civil::DateTime, tz::Offset, Instant};
    ///
    /// let dt = DateTime::constant(1969, 12, 31, 16, 0, 0, 0);
    /// assert_eq!(
    ///     Offset::constant(-8).to_instant(dt)?,
    ///     Instant::UNIX_EPOCH,
    /// );
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    #[inline]
    pub fn to_instant(self, dt: DateTime) -> Result<Instant, Error> {
        Instant::from_datetime_with_offset(dt, self)
    }
}

impl Offset {
    /// This creates an `Offset` via hours/minutes/seconds components.
    ///
    /// Every component should have the same sign, or be zero. It exists
    /// because it's convenient for use in tests that exercise zones with
    /// non-whole-hour offsets.
    #[cfg(test)]
    #[inline]
    pub(crate) const fn hms(hours: i8, minutes: i8, seconds: i8) -> Offset {
        let total = (hours as i32 * 60 * 60)
            + (minutes as i32 * 60)
            + (seconds as i32);
        Offset::constant_seconds(total)
    }

    #[inline]
    const fn part_hours(self) -> i32 {
        self.second / (60 * 60)
    }

    #[inline]
    const fn part_minutes(self) -> i32 {
        (self.second / 60) % 60
    }

    #[inline]
    const fn part_seconds(self) -> i32 {
        self.second % 60
    }
}

impl core::fmt::Debug for Offset {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let sign = if self.second < 0 { "-" } else { "" };
        write!(
            f,
            "Offset({sign}{:02}:{:02}:{:02})",
            self.part_hours().abs(),
            self.part_minutes().abs(),
            self.part_seconds().abs(),
        )
    }
}

impl core::fmt::Display for Offset {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let sign = if self.second < 0 { "-" } else { "+" };
        let hours = self.part_hours().abs();
        let minutes = self.part_minutes().abs();
        let seconds = self.part_seconds().abs();
        if self.second == 0 {
            write!(f, "+00")
        } else if minutes == 0 && seconds == 0 {
            write!(f, "{sign}{hours:02}")
        } else if seconds == 0 {
            write!(f, "{sign}{hours:02}:{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}:{minutes:02}:{seconds:02}")
        }
    }
}
