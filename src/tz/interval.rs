use alloc::sync::Arc;

use crate::{
    civil::{self, DateTime},
    instant::{self, Instant},
    tz::offset::{Dst, Offset},
};

/// A "naive" count of elapsed time in the time-zone-neutral civil frame.
///
/// A `LocalInstant` has the same representation as an [`Instant`], but its
/// value is measured on the civil timeline: it is what you get by taking a
/// wall-clock reading and pretending it is UTC. It exists only inside the
/// zone resolution engine, never in the public API. The engine compares
/// local instants against zone interval boundaries shifted by their own
/// offsets to decide containment.
///
/// Invariant: values are only ever constructed from civil datetimes (and
/// hence lie in the civil range), except for the two boundary sentinels.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct LocalInstant {
    second: i64,
    nanosecond: i32,
}

impl LocalInstant {
    /// The "negative infinity" sentinel, one step below the civil range.
    pub(crate) const BEFORE_MIN: LocalInstant = LocalInstant {
        second: civil::datetime::CIVIL_SECOND_MIN - 1,
        nanosecond: 0,
    };

    /// The "positive infinity" sentinel, one step above the civil range.
    pub(crate) const AFTER_MAX: LocalInstant = LocalInstant {
        second: civil::datetime::CIVIL_SECOND_MAX + 1,
        nanosecond: 0,
    };

    /// Creates a local instant from the civil datetime given.
    #[inline]
    pub(crate) fn from_datetime(dt: DateTime) -> LocalInstant {
        let (second, nanosecond) = dt.to_second_nanosecond();
        LocalInstant { second, nanosecond }
    }

    /// Returns the number of whole seconds in this local instant. Used by
    /// the engine's offset-bound pruning checks, which work at second
    /// precision.
    #[inline]
    pub(crate) fn second(self) -> i64 {
        self.second
    }

    /// Reinterprets this local instant's value as a UTC instant.
    ///
    /// This is the engine's first guess when searching for the interval
    /// containing a wall-clock reading: the guess is within one offset
    /// magnitude of the true instant, and the engine's neighbor probes
    /// correct from there. The civil range exceeds the instant range by the
    /// maximum offset on both ends, so values near the boundary clamp; the
    /// clamped guess remains within probing distance of the target.
    #[inline]
    pub(crate) fn as_first_guess(self) -> Instant {
        if self.second < instant::SECOND_MIN {
            Instant::MIN
        } else if self.second > instant::SECOND_MAX {
            Instant::MAX
        } else {
            Instant::from_second(self.second)
                .with_nanosecond(self.nanosecond)
        }
    }
}

/// The name of a zone interval.
///
/// Interval names for precomputed zones are shared out of the zone's name
/// pool, while built-in zones (UTC) use static strings. This keeps interval
/// construction allocation-free in both cases.
#[derive(Clone, Debug)]
pub(crate) enum IntervalName {
    Static(&'static str),
    Shared(Arc<str>),
}

impl IntervalName {
    fn as_str(&self) -> &str {
        match *self {
            IntervalName::Static(name) => name,
            IntervalName::Shared(ref name) => name,
        }
    }
}

impl Eq for IntervalName {}

impl PartialEq for IntervalName {
    fn eq(&self, rhs: &IntervalName) -> bool {
        self.as_str() == rhs.as_str()
    }
}

/// A maximal run of instants sharing one UTC offset, name and DST flag.
///
/// Every instant belongs to exactly one interval of its time zone: the
/// intervals returned by [`TimeZone::interval_at`](crate::tz::TimeZone::interval_at)
/// tile the timeline with no gaps or overlaps. An interval covers the
/// half-open range `[start, end)`; the first interval of a zone extends
/// indefinitely into the past and the last indefinitely into the future,
/// which is represented by [`ZoneInterval::start`] and
/// [`ZoneInterval::end`] returning `None`.
///
/// # Example
///
/// ```
/// use zoneline::{tz::TimeZone, Instant};
///
/// let interval = TimeZone::UTC.interval_at(Instant::UNIX_EPOCH);
/// assert_eq!(interval.name(), "UTC");
/// assert_eq!(interval.start(), None);
/// assert_eq!(interval.end(), None);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZoneInterval {
    name: IntervalName,
    dst: Dst,
    /// The start of the interval, inclusive. May be the `BEFORE_MIN`
    /// sentinel, which denotes an interval extending indefinitely into the
    /// past.
    start: Instant,
    /// The end of the interval, exclusive. May be the `AFTER_MAX`
    /// sentinel.
    end: Instant,
    offset: Offset,
}

impl ZoneInterval {
    #[inline]
    pub(crate) fn new(
        name: IntervalName,
        dst: Dst,
        start: Instant,
        end: Instant,
        offset: Offset,
    ) -> ZoneInterval {
        debug_assert!(start < end);
        ZoneInterval { name, dst, start, end, offset }
    }

    /// Returns the name of this interval, e.g., `EST` or `EDT` for the
    /// standard and daylight saving intervals of `America/New_York`.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether daylight saving time is in effect for this interval.
    #[inline]
    pub fn dst(&self) -> Dst {
        self.dst
    }

    /// Returns the offset from UTC in effect for every instant in this
    /// interval.
    #[inline]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Returns the inclusive start of this interval, or `None` when the
    /// interval extends indefinitely into the past.
    ///
    /// A finite start is the instant of the time zone transition that began
    /// this interval.
    #[inline]
    pub fn start(&self) -> Option<Instant> {
        if self.start.is_before_min() {
            None
        } else {
            Some(self.start)
        }
    }

    /// Returns the exclusive end of this interval, or `None` when the
    /// interval extends indefinitely into the future.
    #[inline]
    pub fn end(&self) -> Option<Instant> {
        if self.end.is_after_max() {
            None
        } else {
            Some(self.end)
        }
    }

    /// Returns true when the given instant falls in `[start, end)`.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{tz::TimeZone, Instant};
    ///
    /// let interval = TimeZone::UTC.interval_at(Instant::UNIX_EPOCH);
    /// assert!(interval.contains(Instant::UNIX_EPOCH));
    /// assert!(interval.contains(Instant::MIN));
    /// assert!(interval.contains(Instant::MAX));
    /// ```
    #[inline]
    pub fn contains(&self, instant: Instant) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Returns the raw, possibly-sentinel start of this interval.
    #[inline]
    pub(crate) fn start_raw(&self) -> Instant {
        self.start
    }

    /// Returns the raw, possibly-sentinel end of this interval.
    #[inline]
    pub(crate) fn end_raw(&self) -> Instant {
        self.end
    }

    /// Returns the start of this interval on the local (wall-clock)
    /// timeline, i.e., shifted by this interval's own offset. Sentinels
    /// absorb the shift.
    #[inline]
    pub(crate) fn local_start(&self) -> LocalInstant {
        shift(self.start, self.offset)
    }

    /// Returns the end of this interval on the local timeline. See
    /// [`ZoneInterval::local_start`].
    #[inline]
    pub(crate) fn local_end(&self) -> LocalInstant {
        shift(self.end, self.offset)
    }

    /// Returns true when the given local instant falls inside this
    /// interval's range of wall-clock readings, i.e., in
    /// `[start + offset, end + offset)`.
    ///
    /// This is the containment test the resolution engine is built on: a
    /// wall-clock reading can satisfy it for zero, one or two consecutive
    /// intervals of a zone.
    #[inline]
    pub(crate) fn contains_local(&self, local: LocalInstant) -> bool {
        self.local_start() <= local && local < self.local_end()
    }
}

/// Shifts an instant onto the local timeline by adding the offset given.
///
/// The sentinels are absorbing: infinity plus any offset is infinity. This
/// is what keeps boundary comparisons exact for the unbounded first and
/// last intervals of a zone.
#[inline]
fn shift(instant: Instant, offset: Offset) -> LocalInstant {
    if instant.is_before_min() {
        LocalInstant::BEFORE_MIN
    } else if instant.is_after_max() {
        LocalInstant::AFTER_MAX
    } else {
        LocalInstant {
            second: instant.second_raw() + i64::from(offset.seconds()),
            nanosecond: instant.nanosecond(),
        }
    }
}

/// The result of searching a zone for the intervals containing a local
/// instant: zero, one or two of a zone's intervals can contain any given
/// wall-clock reading.
///
/// This is a closed three-way variant rather than a pair of optional
/// intervals so that "no match" can't be confused with a partially
/// initialized result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ZoneIntervalPair {
    /// The local instant was skipped: it falls in the gap of a forward
    /// transition.
    NoMatch,
    /// Exactly one interval contains the local instant. The common case.
    Single(ZoneInterval),
    /// Two consecutive intervals contain the local instant: it falls in
    /// the fold of a backward transition. `earlier` always starts
    /// chronologically before `later`.
    Pair { earlier: ZoneInterval, later: ZoneInterval },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(
        start: Instant,
        end: Instant,
        offset_hours: i8,
    ) -> ZoneInterval {
        ZoneInterval::new(
            IntervalName::Static("TEST"),
            Dst::No,
            start,
            end,
            Offset::constant(offset_hours),
        )
    }

    #[test]
    fn contains_is_half_open() {
        let start = Instant::from_unix(100, 0).unwrap();
        let end = Instant::from_unix(200, 0).unwrap();
        let iv = interval(start, end, 0);
        assert!(iv.contains(start));
        assert!(iv.contains(Instant::from_unix(199, 999_999_999).unwrap()));
        assert!(!iv.contains(end));
        assert!(!iv.contains(start.prev_tick()));
    }

    #[test]
    fn infinite_bounds_are_none_but_contain_everything() {
        let iv = interval(Instant::BEFORE_MIN, Instant::AFTER_MAX, 0);
        assert_eq!(iv.start(), None);
        assert_eq!(iv.end(), None);
        assert!(iv.contains(Instant::MIN));
        assert!(iv.contains(Instant::MAX));
    }

    #[test]
    fn local_containment_shifts_by_the_interval_offset() {
        // [100, 200) at +1 hour covers local [3700, 3800).
        let start = Instant::from_unix(100, 0).unwrap();
        let end = Instant::from_unix(200, 0).unwrap();
        let iv = interval(start, end, 1);
        let local = |second| {
            LocalInstant::from_datetime(
                crate::tz::Offset::ZERO
                    .to_datetime(Instant::from_unix(second, 0).unwrap()),
            )
        };
        assert!(iv.contains_local(local(3700)));
        assert!(iv.contains_local(local(3799)));
        assert!(!iv.contains_local(local(3800)));
        assert!(!iv.contains_local(local(3699)));
    }

    #[test]
    fn sentinels_absorb_local_shifts() {
        // An interval starting at -infinity locally starts at -infinity no
        // matter its offset, so it contains the earliest local readings.
        let end = Instant::from_unix(0, 0).unwrap();
        let iv = interval(Instant::BEFORE_MIN, end, 18);
        let earliest = LocalInstant::from_datetime(
            crate::civil::DateTime::constant(-9999, 1, 1, 0, 0, 0, 0),
        );
        assert!(iv.contains_local(earliest));
    }
}
