use crate::{
    civil::{self, DateTime},
    duration::SignedDuration,
    error::Error,
    tz::{self, Offset, TimeZone},
    zoned::Zoned,
};

/// The minimum instant second.
///
/// The minimum is chosen such that this instant combined with any valid
/// time zone offset converts infallibly to a civil [`DateTime`]. That is,
/// the instant range is the civil range shrunk by the maximum offset
/// magnitude on both ends.
pub(crate) const SECOND_MIN: i64 =
    civil::datetime::CIVIL_SECOND_MIN + (tz::offset::SECONDS_MAX as i64);

/// The maximum instant second. See [`SECOND_MIN`].
pub(crate) const SECOND_MAX: i64 =
    civil::datetime::CIVIL_SECOND_MAX - (tz::offset::SECONDS_MAX as i64);

/// An instant in time represented as the number of seconds (and fractional
/// nanoseconds) elapsed since the Unix epoch.
///
/// An `Instant` names a precise point on the UTC timeline, with no calendar
/// or time zone attached. Converting between instants and civil datetimes
/// always goes through a [`tz::Offset`](crate::tz::Offset), usually
/// indirectly via a [`TimeZone`].
///
/// # Range
///
/// The supported range is approximately `-9999-01-01..=9999-12-31` in UTC,
/// shrunk by the maximum possible offset (18 hours) on both ends so that
/// every `Instant` paired with every valid offset produces a representable
/// civil datetime. The minimum and maximum values are available as
/// [`Instant::MIN`] and [`Instant::MAX`].
///
/// # Example
///
/// ```
/// use zoneline::Instant;
///
/// let epoch = Instant::from_unix(0, 0)?;
/// assert_eq!(epoch, Instant::UNIX_EPOCH);
/// assert_eq!(epoch.second(), 0);
/// # Ok::<(), zoneline::Error>(())
/// ```
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Instant {
    second: i64,
    nanosecond: i32,
}

impl Instant {
    /// The Unix epoch, `1970-01-01T00:00:00Z`.
    pub const UNIX_EPOCH: Instant = Instant { second: 0, nanosecond: 0 };

    /// The minimum representable instant.
    pub const MIN: Instant = Instant { second: SECOND_MIN, nanosecond: 0 };

    /// The maximum representable instant.
    pub const MAX: Instant =
        Instant { second: SECOND_MAX, nanosecond: 999_999_999 };

    /// A sentinel one step before [`Instant::MIN`].
    ///
    /// This represents "negative infinity" for the starting bound of a
    /// [`ZoneInterval`](crate::tz::ZoneInterval) whose interval extends
    /// indefinitely into the past. It is never exposed as an ordinary
    /// instant and never participates in offset arithmetic: shifting a
    /// sentinel yields the corresponding local sentinel unchanged.
    pub(crate) const BEFORE_MIN: Instant =
        Instant { second: SECOND_MIN - 1, nanosecond: 0 };

    /// A sentinel one step after [`Instant::MAX`]. See
    /// [`Instant::BEFORE_MIN`].
    pub(crate) const AFTER_MAX: Instant =
        Instant { second: SECOND_MAX + 1, nanosecond: 0 };

    /// Creates an instant from the number of seconds (and fractional
    /// nanoseconds) elapsed since the Unix epoch.
    ///
    /// Negative values name instants before the epoch. The fractional
    /// nanosecond must be in the range `0..=999_999_999`: it always moves
    /// forward in time, even for negative seconds.
    ///
    /// # Errors
    ///
    /// This returns an error when the given components are outside the
    /// supported range documented on [`Instant`].
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::Instant;
    ///
    /// let instant = Instant::from_unix(-1, 999_999_999)?;
    /// assert_eq!(instant.second(), -1);
    /// // One nanosecond before the epoch.
    /// assert!(instant < Instant::UNIX_EPOCH);
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    #[inline]
    pub fn from_unix(second: i64, nanosecond: i32) -> Result<Instant, Error> {
        if !(SECOND_MIN <= second && second <= SECOND_MAX) {
            return Err(Error::range(
                "instant second",
                second,
                SECOND_MIN,
                SECOND_MAX,
            ));
        }
        if !(0 <= nanosecond && nanosecond <= 999_999_999) {
            return Err(Error::range(
                "instant nanosecond",
                nanosecond,
                0,
                999_999_999,
            ));
        }
        Ok(Instant { second, nanosecond })
    }

    /// Creates an instant in a `const` context.
    ///
    /// # Panics
    ///
    /// This panics when [`Instant::from_unix`] would return an error.
    #[inline]
    pub const fn constant(second: i64, nanosecond: i32) -> Instant {
        if !(SECOND_MIN <= second && second <= SECOND_MAX) {
            panic!("invalid instant second");
        }
        if !(0 <= nanosecond && nanosecond <= 999_999_999) {
            panic!("invalid instant nanosecond");
        }
        Instant { second, nanosecond }
    }

    /// Returns the current time.
    ///
    /// # Panics
    ///
    /// This panics if the system clock is set to a value outside of the
    /// supported instant range. It is reasonable to expect the system clock
    /// to be set to a somewhat sane, if imprecise, value.
    #[cfg(feature = "std")]
    pub fn now() -> Instant {
        use std::time::SystemTime;

        let now = SystemTime::now();
        let instant = match now.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_secs())
                .map_err(|_| ())
                .and_then(|second| {
                    Instant::from_unix(second, elapsed.subsec_nanos() as i32)
                        .map_err(|_| ())
                }),
            Err(before_epoch) => {
                let elapsed = before_epoch.duration();
                i64::try_from(elapsed.as_secs()).map_err(|_| ()).and_then(
                    |second| {
                        let nanosecond = elapsed.subsec_nanos() as i32;
                        let (second, nanosecond) = if nanosecond == 0 {
                            (-second, 0)
                        } else {
                            (-second - 1, 1_000_000_000 - nanosecond)
                        };
                        Instant::from_unix(second, nanosecond).map_err(|_| ())
                    },
                )
            }
        };
        instant.expect("system clock reports a representable time")
    }

    /// Returns the number of whole seconds since the Unix epoch for this
    /// instant.
    #[inline]
    pub const fn second(self) -> i64 {
        self.second
    }

    /// Returns the fractional nanosecond of this instant, in the range
    /// `0..=999_999_999`.
    #[inline]
    pub const fn nanosecond(self) -> i32 {
        self.nanosecond
    }

    /// Pairs this instant with a time zone, producing a [`Zoned`] value
    /// carrying the corresponding civil datetime.
    ///
    /// This conversion is infallible: every instant has exactly one civil
    /// projection in every time zone.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{civil::DateTime, tz::{Offset, TimeZone}, Instant};
    ///
    /// let tz = TimeZone::fixed(Offset::constant(-5));
    /// let zdt = Instant::UNIX_EPOCH.to_zoned(tz);
    /// assert_eq!(
    ///     zdt.datetime(),
    ///     DateTime::constant(1969, 12, 31, 19, 0, 0, 0),
    /// );
    /// ```
    #[inline]
    pub fn to_zoned(self, tz: TimeZone) -> Zoned {
        Zoned::new(self, tz)
    }

    /// Adds the given duration to this instant.
    ///
    /// # Errors
    ///
    /// This returns an error when the result would fall outside the
    /// supported instant range.
    #[inline]
    pub fn checked_add(
        self,
        duration: SignedDuration,
    ) -> Result<Instant, Error> {
        let second =
            self.second.checked_add(duration.as_secs()).ok_or_else(|| {
                Error::range(
                    "instant second",
                    i128::from(self.second) + i128::from(duration.as_secs()),
                    SECOND_MIN,
                    SECOND_MAX,
                )
            })?;
        let mut second = second;
        let mut nanosecond = self.nanosecond + duration.subsec_nanos();
        if nanosecond >= 1_000_000_000 {
            nanosecond -= 1_000_000_000;
            second = second.saturating_add(1);
        } else if nanosecond < 0 {
            nanosecond += 1_000_000_000;
            second = second.saturating_sub(1);
        }
        Instant::from_unix(second, nanosecond)
    }

    /// Subtracts the given duration from this instant.
    ///
    /// # Errors
    ///
    /// This returns an error when the result would fall outside the
    /// supported instant range.
    #[inline]
    pub fn checked_sub(
        self,
        duration: SignedDuration,
    ) -> Result<Instant, Error> {
        let duration = duration.checked_neg().ok_or_else(|| {
            Error::range(
                "signed duration seconds",
                i128::from(duration.as_secs()),
                i64::MIN + 1,
                i64::MAX,
            )
        })?;
        self.checked_add(duration)
    }

    /// Returns the duration of time elapsed since the other instant given.
    ///
    /// The duration returned is negative when `other` is later than this
    /// instant. This can never fail: the interval between any two instants
    /// is always representable.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{Instant, SignedDuration};
    ///
    /// let i1 = Instant::from_unix(5, 500_000_000)?;
    /// let i2 = Instant::from_unix(3, 0)?;
    /// assert_eq!(i1.since(i2), SignedDuration::new(2, 500_000_000));
    /// assert_eq!(i2.since(i1), SignedDuration::new(-2, -500_000_000));
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    #[inline]
    pub fn since(self, other: Instant) -> SignedDuration {
        SignedDuration::new(
            self.second - other.second,
            self.nanosecond - other.nanosecond,
        )
    }

    /// Returns the duration of time from this instant until the other
    /// instant given. This is the negation of [`Instant::since`].
    #[inline]
    pub fn until(self, other: Instant) -> SignedDuration {
        other.since(self)
    }
}

impl Instant {
    /// Creates an instant from a whole number of seconds, without range
    /// checks. Used for transition timestamps that were validated at table
    /// construction time.
    #[inline]
    pub(crate) const fn from_second(second: i64) -> Instant {
        debug_assert!(SECOND_MIN <= second && second <= SECOND_MAX);
        Instant { second, nanosecond: 0 }
    }

    /// Returns the raw second of this instant, which may be a sentinel
    /// value.
    #[inline]
    pub(crate) const fn second_raw(self) -> i64 {
        self.second
    }

    /// Returns this instant with the given fractional nanosecond in place
    /// of its own. Callers must ensure `0 <= nanosecond <= 999_999_999`.
    #[inline]
    pub(crate) const fn with_nanosecond(self, nanosecond: i32) -> Instant {
        debug_assert!(0 <= nanosecond && nanosecond <= 999_999_999);
        Instant { second: self.second, nanosecond }
    }

    /// Returns true when this is the "negative infinity" sentinel.
    #[inline]
    pub(crate) fn is_before_min(self) -> bool {
        self == Instant::BEFORE_MIN
    }

    /// Returns true when this is the "positive infinity" sentinel.
    #[inline]
    pub(crate) fn is_after_max(self) -> bool {
        self == Instant::AFTER_MAX
    }

    /// Returns the instant one nanosecond before this one.
    ///
    /// This is used by the resolution engine to probe the zone interval
    /// immediately preceding a transition boundary. The caller must ensure
    /// this instant is not a sentinel. Note that the predecessor of
    /// `Instant::MIN` shares its second with the `BEFORE_MIN` sentinel,
    /// which is fine: interval search treats everything at or before the
    /// first transition identically.
    #[inline]
    pub(crate) fn prev_tick(self) -> Instant {
        debug_assert!(!self.is_before_min() && !self.is_after_max());
        if self.nanosecond > 0 {
            Instant { second: self.second, nanosecond: self.nanosecond - 1 }
        } else {
            Instant { second: self.second - 1, nanosecond: 999_999_999 }
        }
    }

    /// Converts this instant to the civil datetime obtained by applying the
    /// given offset.
    ///
    /// This is total: the instant range is restricted such that every
    /// instant plus every valid offset is a representable civil datetime.
    #[inline]
    pub(crate) fn to_datetime_with_offset(self, offset: Offset) -> DateTime {
        debug_assert!(!self.is_before_min() && !self.is_after_max());
        let second = self.second + i64::from(offset.seconds());
        DateTime::from_second_nanosecond(second, self.nanosecond)
    }

    /// Converts the given civil datetime to the instant it names under the
    /// given offset.
    ///
    /// # Errors
    ///
    /// This returns an error when the result falls outside the supported
    /// instant range, which can happen for civil datetimes within the
    /// maximum offset magnitude of the boundaries of the civil range.
    #[inline]
    pub(crate) fn from_datetime_with_offset(
        dt: DateTime,
        offset: Offset,
    ) -> Result<Instant, Error> {
        let (second, nanosecond) = dt.to_second_nanosecond();
        let second = second - i64::from(offset.seconds());
        Instant::from_unix(second, nanosecond)
    }
}

impl core::fmt::Debug for Instant {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.is_before_min() {
            return f.write_str("-infinity");
        }
        if self.is_after_max() {
            return f.write_str("+infinity");
        }
        write!(f, "{}Z", self.to_datetime_with_offset(Offset::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_convert_with_extreme_offsets() {
        let dt = Instant::MIN.to_datetime_with_offset(Offset::MIN);
        assert_eq!(dt, DateTime::constant(-9999, 1, 1, 0, 0, 0, 0));
        let dt = Instant::MAX.to_datetime_with_offset(Offset::MAX);
        assert_eq!(
            dt,
            DateTime::constant(9999, 12, 31, 23, 59, 59, 999_999_999),
        );

        // And the conversions invert exactly.
        let instant = Instant::from_datetime_with_offset(
            DateTime::constant(-9999, 1, 1, 0, 0, 0, 0),
            Offset::MIN,
        )
        .unwrap();
        assert_eq!(instant, Instant::MIN);
    }

    #[test]
    fn civil_boundaries_out_of_range_for_small_offsets() {
        // The civil minimum at UTC is below the instant minimum.
        let err = Instant::from_datetime_with_offset(
            DateTime::constant(-9999, 1, 1, 0, 0, 0, 0),
            Offset::ZERO,
        )
        .unwrap_err();
        assert!(err.is_range());
    }

    #[test]
    fn unix_epoch_to_datetime() {
        let dt = Instant::UNIX_EPOCH.to_datetime_with_offset(Offset::ZERO);
        assert_eq!(dt, DateTime::constant(1970, 1, 1, 0, 0, 0, 0));
        let dt =
            Instant::UNIX_EPOCH.to_datetime_with_offset(Offset::constant(-5));
        assert_eq!(dt, DateTime::constant(1969, 12, 31, 19, 0, 0, 0));
    }

    #[test]
    fn checked_arithmetic() {
        let instant = Instant::UNIX_EPOCH;
        let later =
            instant.checked_add(SignedDuration::new(1, 500_000_000)).unwrap();
        assert_eq!((later.second(), later.nanosecond()), (1, 500_000_000));

        let earlier =
            instant.checked_sub(SignedDuration::new(0, 1)).unwrap();
        assert_eq!(
            (earlier.second(), earlier.nanosecond()),
            (-1, 999_999_999),
        );

        assert!(Instant::MAX
            .checked_add(SignedDuration::new(0, 1))
            .unwrap_err()
            .is_range());
        assert!(Instant::MIN
            .checked_sub(SignedDuration::new(0, 1))
            .unwrap_err()
            .is_range());
    }

    #[test]
    fn prev_tick_crosses_second_boundaries() {
        let instant = Instant::from_unix(10, 0).unwrap();
        let prev = instant.prev_tick();
        assert_eq!((prev.second(), prev.nanosecond()), (9, 999_999_999));
        let prev = Instant::from_unix(10, 1).unwrap().prev_tick();
        assert_eq!((prev.second(), prev.nanosecond()), (10, 0));
    }

    #[test]
    fn sentinels_bracket_the_valid_range() {
        assert!(Instant::BEFORE_MIN < Instant::MIN);
        assert!(Instant::AFTER_MAX > Instant::MAX);
    }
}
