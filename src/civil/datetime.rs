use crate::civil::{date, Date, Time};

/// The number of seconds in a civil day.
pub(crate) const SECONDS_PER_DAY: i64 = 86_400;

/// A representation of a civil datetime in the proleptic Gregorian
/// calendar.
///
/// A `DateTime` is a pair of a [`Date`] and a [`Time`]. It carries no time
/// zone or UTC offset: the same `DateTime` value names different points on
/// the UTC timeline depending on the zone it is resolved in, and near
/// daylight saving transitions it may name zero or two of them. Use
/// [`TimeZone::map_local`](crate::tz::TimeZone::map_local) to resolve a
/// `DateTime` into a [`Zoned`](crate::Zoned) value.
///
/// # Comparisons
///
/// `DateTime` implements `Eq` and `Ord`: when a datetime `dt1` occurs
/// before a datetime `dt2`, then `dt1 < dt2`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DateTime {
    date: Date,
    time: Time,
}

impl DateTime {
    /// The minimum representable datetime, `-9999-01-01T00:00:00`.
    pub const MIN: DateTime = DateTime::new(Date::MIN, Time::MIN);

    /// The maximum representable datetime,
    /// `9999-12-31T23:59:59.999999999`.
    pub const MAX: DateTime = DateTime::new(Date::MAX, Time::MAX);

    /// Creates a new `DateTime` from its date and clock time components.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::civil::{Date, DateTime, Time};
    ///
    /// let dt = DateTime::new(
    ///     Date::constant(2024, 3, 10),
    ///     Time::constant(2, 30, 0, 0),
    /// );
    /// assert_eq!(dt, DateTime::constant(2024, 3, 10, 2, 30, 0, 0));
    /// ```
    #[inline]
    pub const fn new(date: Date, time: Time) -> DateTime {
        DateTime { date, time }
    }

    /// Creates a new `DateTime` value in a `const` context from its
    /// component fields.
    ///
    /// # Panics
    ///
    /// This panics when [`Date::constant`] or [`Time::constant`] would
    /// panic for the respective components.
    #[inline]
    pub const fn constant(
        year: i16,
        month: i8,
        day: i8,
        hour: i8,
        minute: i8,
        second: i8,
        subsec_nanosecond: i32,
    ) -> DateTime {
        DateTime {
            date: Date::constant(year, month, day),
            time: Time::constant(hour, minute, second, subsec_nanosecond),
        }
    }

    /// Returns the date component of this datetime.
    #[inline]
    pub const fn date(self) -> Date {
        self.date
    }

    /// Returns the clock time component of this datetime.
    #[inline]
    pub const fn time(self) -> Time {
        self.time
    }

    /// Returns this datetime as a count of elapsed seconds (and a
    /// fractional nanosecond) since the Unix epoch *in the civil frame*.
    /// That is, no offset is applied; midnight `1970-01-01` is `(0, 0)`
    /// regardless of any time zone.
    #[inline]
    pub(crate) const fn to_second_nanosecond(self) -> (i64, i32) {
        let second = (self.date.to_epoch_day() as i64) * SECONDS_PER_DAY
            + (self.time.second_of_day() as i64);
        (second, self.time.subsec_nanosecond())
    }

    /// The inverse of [`DateTime::to_second_nanosecond`].
    ///
    /// Callers must ensure the seconds correspond to a date in the
    /// supported range and that `0 <= nanosecond <= 999_999_999`.
    #[inline]
    pub(crate) fn from_second_nanosecond(
        second: i64,
        nanosecond: i32,
    ) -> DateTime {
        let epoch_day = second.div_euclid(SECONDS_PER_DAY);
        let second_of_day = second.rem_euclid(SECONDS_PER_DAY);
        let date = Date::from_epoch_day_unchecked(epoch_day as i32);
        let time = Time::from_second_of_day_unchecked(second_of_day as i32)
            .with_subsec_nanosecond(nanosecond);
        DateTime::new(date, time)
    }
}

impl core::fmt::Debug for DateTime {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl core::fmt::Display for DateTime {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}T{}", self.date(), self.time())
    }
}

/// The minimum civil second, corresponding to `-9999-01-01T00:00:00`.
pub(crate) const CIVIL_SECOND_MIN: i64 =
    (date::EPOCH_DAY_MIN as i64) * SECONDS_PER_DAY;

/// The maximum civil second, corresponding to `9999-12-31T23:59:59`.
pub(crate) const CIVIL_SECOND_MAX: i64 =
    (date::EPOCH_DAY_MAX as i64) * SECONDS_PER_DAY + 86_399;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_conversion_round_trips() {
        let cases = [
            (DateTime::constant(1970, 1, 1, 0, 0, 0, 0), 0, 0),
            (DateTime::constant(1970, 1, 1, 2, 30, 0, 0), 9000, 0),
            (
                DateTime::constant(1969, 12, 31, 23, 59, 59, 999_999_999),
                -1,
                999_999_999,
            ),
            (DateTime::constant(2024, 3, 10, 2, 30, 0, 0), 1_710_037_800, 0),
            (DateTime::MIN, CIVIL_SECOND_MIN, 0),
            (DateTime::MAX, CIVIL_SECOND_MAX, 999_999_999),
        ];
        for (dt, second, nanosecond) in cases {
            assert_eq!(dt.to_second_nanosecond(), (second, nanosecond), "{dt}");
            assert_eq!(
                DateTime::from_second_nanosecond(second, nanosecond),
                dt,
            );
        }
    }

    #[test]
    fn ordering_is_chronological() {
        let dt1 = DateTime::constant(2024, 3, 10, 2, 30, 0, 0);
        let dt2 = DateTime::constant(2024, 3, 10, 2, 30, 0, 1);
        let dt3 = DateTime::constant(2024, 3, 11, 0, 0, 0, 0);
        assert!(dt1 < dt2);
        assert!(dt2 < dt3);
        assert!(DateTime::MIN < DateTime::MAX);
    }
}
