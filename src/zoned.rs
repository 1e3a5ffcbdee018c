use crate::{
    civil::DateTime,
    error::Error,
    instant::Instant,
    tz::{Offset, TimeZone},
};

/// An instant paired with the time zone it is being viewed in.
///
/// A `Zoned` value carries its civil projection, the datetime a wall
/// clock in its zone showed at its instant, computed once at
/// construction, along with the offset that was in effect. Both are
/// derived data: the instant and the time zone fully determine them.
///
/// # Construction
///
/// `Zoned` values come from [`Instant::to_zoned`], from resolving a civil
/// datetime via [`TimeZone::map_local`](crate::tz::TimeZone::map_local),
/// or from [`TimeZone::at_start_of_day`](crate::tz::TimeZone::at_start_of_day).
///
/// # Comparisons
///
/// Equality and ordering consider only the instant: two `Zoned` values in
/// different time zones are equal when they name the same point on the UTC
/// timeline.
///
/// ```
/// use zoneline::{tz::{Offset, TimeZone}, Instant};
///
/// let utc = Instant::UNIX_EPOCH.to_zoned(TimeZone::UTC);
/// let ny = Instant::UNIX_EPOCH.to_zoned(TimeZone::fixed(Offset::constant(-5)));
/// assert_eq!(utc, ny);
/// assert_ne!(utc.datetime(), ny.datetime());
/// ```
#[derive(Clone)]
pub struct Zoned {
    instant: Instant,
    tz: TimeZone,
    offset: Offset,
    datetime: DateTime,
}

impl Zoned {
    /// Creates a new zoned value from an instant and a time zone.
    ///
    /// This is infallible: every instant has exactly one civil projection
    /// in every time zone.
    pub fn new(instant: Instant, tz: TimeZone) -> Zoned {
        let offset = tz.to_offset(instant);
        let datetime = offset.to_datetime(instant);
        Zoned { instant, tz, offset, datetime }
    }

    /// Returns the instant this zoned value names.
    #[inline]
    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Returns the civil datetime a wall clock in this zone showed at this
    /// instant.
    #[inline]
    pub fn datetime(&self) -> DateTime {
        self.datetime
    }

    /// Returns the offset from UTC that was in effect at this instant in
    /// this zone.
    #[inline]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Returns the time zone this value is being viewed in.
    #[inline]
    pub fn time_zone(&self) -> &TimeZone {
        &self.tz
    }

    /// Returns this value with a different time zone: the same instant,
    /// viewed from elsewhere.
    #[inline]
    pub fn with_time_zone(&self, tz: TimeZone) -> Zoned {
        Zoned::new(self.instant, tz)
    }

    /// Returns the earliest valid wall-clock time on this value's calendar
    /// date, in its time zone.
    ///
    /// See [`TimeZone::at_start_of_day`](crate::tz::TimeZone::at_start_of_day)
    /// for the treatment of days whose midnight was skipped by a
    /// transition.
    #[inline]
    pub fn start_of_day(&self) -> Result<Zoned, Error> {
        self.tz.at_start_of_day(self.datetime.date())
    }
}

impl Eq for Zoned {}

impl PartialEq for Zoned {
    #[inline]
    fn eq(&self, rhs: &Zoned) -> bool {
        self.instant == rhs.instant
    }
}

impl Ord for Zoned {
    #[inline]
    fn cmp(&self, rhs: &Zoned) -> core::cmp::Ordering {
        self.instant.cmp(&rhs.instant)
    }
}

impl PartialOrd for Zoned {
    #[inline]
    fn partial_cmp(&self, rhs: &Zoned) -> Option<core::cmp::Ordering> {
        Some(self.cmp(rhs))
    }
}

impl core::hash::Hash for Zoned {
    #[inline]
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

impl core::fmt::Debug for Zoned {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(self, f)
    }
}

impl core::fmt::Display for Zoned {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{}{}[{}]",
            self.datetime(),
            self.offset(),
            self.time_zone().id(),
        )
    }
}
