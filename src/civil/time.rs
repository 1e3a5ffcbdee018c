use crate::error::Error;

/// A representation of civil "wall clock" time.
///
/// A `Time` value corresponds to an hour, minute, second and fractional
/// second (to nanosecond precision). Leap seconds are not representable.
///
/// # Comparisons
///
/// `Time` implements `Eq` and `Ord`: when a time `t1` occurs before a time
/// `t2` on the same day, then `t1 < t2`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Time {
    hour: i8,
    minute: i8,
    second: i8,
    subsec_nanosecond: i32,
}

impl Time {
    /// The minimum representable time, `00:00:00`, i.e., midnight.
    pub const MIN: Time = Time::midnight();

    /// The maximum representable time, `23:59:59.999999999`.
    pub const MAX: Time = Time::constant(23, 59, 59, 999_999_999);

    /// Returns midnight, the first instant of a civil day.
    #[inline]
    pub const fn midnight() -> Time {
        Time { hour: 0, minute: 0, second: 0, subsec_nanosecond: 0 }
    }

    /// Creates a new `Time` value from its component hour, minute, second
    /// and fractional nanosecond values.
    ///
    /// # Errors
    ///
    /// This returns an error unless all of the following are true:
    ///
    /// * The hour is in the range `0..=23`.
    /// * The minute and second are in the range `0..=59`.
    /// * The fractional nanosecond is in the range `0..=999_999_999`.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::civil::Time;
    ///
    /// let t = Time::new(2, 30, 0, 0)?;
    /// assert_eq!(t.hour(), 2);
    /// assert_eq!(t.minute(), 30);
    ///
    /// assert!(Time::new(24, 0, 0, 0).is_err());
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    #[inline]
    pub fn new(
        hour: i8,
        minute: i8,
        second: i8,
        subsec_nanosecond: i32,
    ) -> Result<Time, Error> {
        if !(0 <= hour && hour <= 23) {
            return Err(Error::range("hour", hour, 0, 23));
        }
        if !(0 <= minute && minute <= 59) {
            return Err(Error::range("minute", minute, 0, 59));
        }
        if !(0 <= second && second <= 59) {
            return Err(Error::range("second", second, 0, 59));
        }
        if !(0 <= subsec_nanosecond && subsec_nanosecond <= 999_999_999) {
            return Err(Error::range(
                "subsecond nanosecond",
                subsec_nanosecond,
                0,
                999_999_999,
            ));
        }
        Ok(Time { hour, minute, second, subsec_nanosecond })
    }

    /// Creates a new `Time` value in a `const` context.
    ///
    /// # Panics
    ///
    /// This routine panics when [`Time::new`] would return an error.
    #[inline]
    pub const fn constant(
        hour: i8,
        minute: i8,
        second: i8,
        subsec_nanosecond: i32,
    ) -> Time {
        if !(0 <= hour && hour <= 23) {
            panic!("invalid hour");
        }
        if !(0 <= minute && minute <= 59) {
            panic!("invalid minute");
        }
        if !(0 <= second && second <= 59) {
            panic!("invalid second");
        }
        if !(0 <= subsec_nanosecond && subsec_nanosecond <= 999_999_999) {
            panic!("invalid subsecond nanosecond");
        }
        Time { hour, minute, second, subsec_nanosecond }
    }

    /// Returns the hour of this time, in the range `0..=23`.
    #[inline]
    pub const fn hour(self) -> i8 {
        self.hour
    }

    /// Returns the minute of this time, in the range `0..=59`.
    #[inline]
    pub const fn minute(self) -> i8 {
        self.minute
    }

    /// Returns the second of this time, in the range `0..=59`.
    #[inline]
    pub const fn second(self) -> i8 {
        self.second
    }

    /// Returns the fractional nanosecond of this time, in the range
    /// `0..=999_999_999`.
    #[inline]
    pub const fn subsec_nanosecond(self) -> i32 {
        self.subsec_nanosecond
    }

    /// Returns this time as a whole number of seconds since midnight, in
    /// the range `0..=86_399`. The fractional nanosecond is not included.
    #[inline]
    pub(crate) const fn second_of_day(self) -> i32 {
        (self.hour as i32) * 3600
            + (self.minute as i32) * 60
            + (self.second as i32)
    }

    /// Creates a time from a whole number of seconds since midnight.
    ///
    /// Callers must ensure `0 <= second < 86_400`.
    #[inline]
    pub(crate) const fn from_second_of_day_unchecked(second: i32) -> Time {
        debug_assert!(0 <= second && second < 86_400);
        Time {
            hour: (second / 3600) as i8,
            minute: (second / 60 % 60) as i8,
            second: (second % 60) as i8,
            subsec_nanosecond: 0,
        }
    }

    /// Returns this time with the given fractional nanosecond in place of
    /// its own.
    #[inline]
    pub(crate) const fn with_subsec_nanosecond(self, nanosecond: i32) -> Time {
        debug_assert!(0 <= nanosecond && nanosecond <= 999_999_999);
        Time {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            subsec_nanosecond: nanosecond,
        }
    }
}

impl core::fmt::Debug for Time {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl core::fmt::Display for Time {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )?;
        if self.subsec_nanosecond() != 0 {
            write!(f, ".{:09}", self.subsec_nanosecond())?;
        }
        Ok(())
    }
}
