use alloc::{string::ToString, sync::Arc};

use crate::{
    civil::{Date, DateTime, Time},
    error::{err, Error, ErrorContext},
    instant::Instant,
    tz::{
        interval::{
            IntervalName, LocalInstant, ZoneInterval, ZoneIntervalPair,
        },
        offset::{Dst, Offset},
        table::ZoneTable,
    },
    zoned::Zoned,
};

/// A representation of a time zone.
///
/// A time zone is a function from instants to UTC offsets: at every point
/// on the UTC timeline, exactly one offset (and name, and DST flag) is in
/// effect, described by a [`ZoneInterval`]. The inverse direction is the
/// interesting one. A wall-clock reading may correspond to one instant,
/// two instants (a backward transition repeated it) or none at all (a
/// forward transition skipped it); [`TimeZone::map_local`] classifies
/// every civil datetime into exactly one of those cases.
///
/// # Construction
///
/// There are three kinds of time zone:
///
/// * [`TimeZone::UTC`], the zero-offset zone.
/// * [`TimeZone::fixed`], a zone with one offset and no transitions.
/// * [`TimeZone::from_table`], a zone backed by a precomputed
///   [`ZoneTable`] of transitions, usually obtained from binary zone data
///   via [`ZoneTable::from_bytes`] or a
///   [`TimeZoneDatabase`](crate::tz::TimeZoneDatabase).
///
/// # Cheap clones
///
/// A `TimeZone` is a reference-counted handle: cloning it is cheap and
/// clones share the underlying transition table. Every
/// [`Zoned`](crate::Zoned) value carries one.
#[derive(Clone)]
pub struct TimeZone {
    kind: Option<Arc<TimeZoneKind>>,
}

impl TimeZone {
    /// The UTC time zone.
    ///
    /// Its offset is zero everywhere and it has no transitions.
    pub const UTC: TimeZone = TimeZone { kind: None };

    /// Creates a time zone with a fixed offset and no transitions.
    ///
    /// The zone's ID is the string representation of its offset, e.g.,
    /// `-05`. A zero offset returns [`TimeZone::UTC`].
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::tz::{Offset, TimeZone};
    ///
    /// let tz = TimeZone::fixed(Offset::constant(-5));
    /// assert_eq!(tz.id(), "-05");
    /// assert!(tz.is_fixed());
    /// assert_eq!(TimeZone::fixed(Offset::ZERO), TimeZone::UTC);
    /// ```
    pub fn fixed(offset: Offset) -> TimeZone {
        if offset == Offset::UTC {
            return TimeZone::UTC;
        }
        let fixed = TimeZoneFixed::new(offset);
        let kind = TimeZoneKind::Fixed(fixed);
        TimeZone { kind: Some(Arc::new(kind)) }
    }

    /// Creates a time zone backed by the precomputed transition table
    /// given.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{
    ///     tz::{Dst, Offset, TimeZone, ZoneTable},
    ///     Instant,
    /// };
    ///
    /// let table = ZoneTable::builder("Test/Zone")
    ///     .initial(Offset::constant(0), Dst::No, "TST")
    ///     .transition(
    ///         Instant::from_unix(7200, 0)?,
    ///         Offset::constant(1),
    ///         Dst::Yes,
    ///         "TDT",
    ///     )
    ///     .build()?;
    /// let tz = TimeZone::from_table(table);
    /// assert_eq!(tz.id(), "Test/Zone");
    /// assert!(!tz.is_fixed());
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    pub fn from_table(table: ZoneTable) -> TimeZone {
        let kind = TimeZoneKind::Precomputed(table);
        TimeZone { kind: Some(Arc::new(kind)) }
    }

    /// Returns the stable identifier of this time zone.
    ///
    /// For precomputed zones this is the ID the zone data was registered
    /// under, e.g., `America/New_York`. For fixed zones it is the offset in
    /// string form, and for UTC it is `UTC`.
    pub fn id(&self) -> &str {
        let Some(ref kind) = self.kind else { return "UTC" };
        match **kind {
            TimeZoneKind::Fixed(ref tz) => tz.name(),
            TimeZoneKind::Precomputed(ref table) => table.id(),
        }
    }

    /// Returns true when this time zone has no transitions: its offset is
    /// the same for all instants.
    ///
    /// This is an optimization hint (resolving a civil datetime in a
    /// fixed zone requires no search), but it is a verified one. It is
    /// impossible to construct a `TimeZone` for which `is_fixed` returns
    /// true while transitions exist: [`ZoneTable`] construction checks it.
    pub fn is_fixed(&self) -> bool {
        let Some(ref kind) = self.kind else { return true };
        match **kind {
            TimeZoneKind::Fixed(_) => true,
            TimeZoneKind::Precomputed(ref table) => table.is_fixed(),
        }
    }

    /// Returns the offset from UTC in effect at the instant given.
    ///
    /// This is equivalent to `self.interval_at(instant).offset()`, but
    /// fixed zones answer without consulting any interval.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{tz::{Offset, TimeZone}, Instant};
    ///
    /// let tz = TimeZone::fixed(Offset::constant(-5));
    /// assert_eq!(tz.to_offset(Instant::UNIX_EPOCH), Offset::constant(-5));
    /// ```
    pub fn to_offset(&self, instant: Instant) -> Offset {
        let Some(ref kind) = self.kind else { return Offset::UTC };
        match **kind {
            TimeZoneKind::Fixed(ref tz) => tz.offset(),
            TimeZoneKind::Precomputed(ref table) => {
                table.interval_at(instant).offset()
            }
        }
    }

    /// Returns the [`ZoneInterval`] containing the instant given.
    ///
    /// This never fails: a zone's intervals tile the entire timeline, with
    /// virtual unbounded intervals covering the ends.
    pub fn interval_at(&self, instant: Instant) -> ZoneInterval {
        let Some(ref kind) = self.kind else {
            return utc_interval();
        };
        match **kind {
            TimeZoneKind::Fixed(ref tz) => tz.interval(),
            TimeZoneKind::Precomputed(ref table) => table.interval_at(instant),
        }
    }

    /// Converts the instant given to the civil datetime shown on wall
    /// clocks in this time zone.
    pub fn to_datetime(&self, instant: Instant) -> DateTime {
        self.to_offset(instant).to_datetime(instant)
    }

    /// Resolves a civil datetime against this time zone.
    ///
    /// The result classifies the datetime as unambiguous, ambiguous (it
    /// falls in the fold of a backward transition and names two instants)
    /// or skipped (it falls in the gap of a forward transition and names
    /// none). Use the accessors on [`ZoneLocalMapping`] to pick a policy.
    ///
    /// # Example
    ///
    /// ```
    /// use zoneline::{
    ///     civil::DateTime,
    ///     tz::{Dst, Offset, TimeZone, ZoneTable},
    ///     Instant,
    /// };
    ///
    /// // A zone that falls back from +01 to +00 at 1970-01-01T01:00:00Z,
    /// // repeating the local hour starting at 01:00.
    /// let table = ZoneTable::builder("Test/Fold")
    ///     .initial(Offset::constant(1), Dst::Yes, "TDT")
    ///     .transition(
    ///         Instant::from_unix(3600, 0)?,
    ///         Offset::constant(0),
    ///         Dst::No,
    ///         "TST",
    ///     )
    ///     .build()?;
    /// let tz = TimeZone::from_table(table);
    ///
    /// let mapping = tz.map_local(DateTime::constant(1970, 1, 1, 1, 30, 0, 0));
    /// assert!(mapping.is_ambiguous());
    /// let earlier = mapping.clone().earlier()?;
    /// let later = mapping.later()?;
    /// assert_eq!(earlier.offset(), Offset::constant(1));
    /// assert_eq!(later.offset(), Offset::constant(0));
    /// # Ok::<(), zoneline::Error>(())
    /// ```
    pub fn map_local(&self, datetime: DateTime) -> ZoneLocalMapping {
        let kind = self.map_local_kind(datetime);
        ZoneLocalMapping { tz: self.clone(), datetime, kind }
    }

    fn map_local_kind(&self, datetime: DateTime) -> ZoneLocalMappingKind {
        let Some(ref kind) = self.kind else {
            return ZoneLocalMappingKind::Unambiguous(utc_interval());
        };
        match **kind {
            TimeZoneKind::Fixed(ref tz) => {
                ZoneLocalMappingKind::Unambiguous(tz.interval())
            }
            TimeZoneKind::Precomputed(ref table) => {
                // A fixed table needs no search, and `is_fixed` is
                // verified at construction, so this is always sound.
                if table.is_fixed() {
                    return ZoneLocalMappingKind::Unambiguous(
                        table.interval_at(Instant::UNIX_EPOCH),
                    );
                }
                let local = LocalInstant::from_datetime(datetime);
                match matching_intervals(table, local) {
                    ZoneIntervalPair::Single(interval) => {
                        ZoneLocalMappingKind::Unambiguous(interval)
                    }
                    ZoneIntervalPair::Pair { earlier, later } => {
                        ZoneLocalMappingKind::Ambiguous { earlier, later }
                    }
                    ZoneIntervalPair::NoMatch => {
                        let (before, after) = gap_brackets(table, local);
                        ZoneLocalMappingKind::Gap { before, after }
                    }
                }
            }
        }
    }

    /// Returns the earliest valid wall-clock time on the date given, as a
    /// [`Zoned`] value in this time zone.
    ///
    /// This is usually midnight. When midnight is ambiguous, the earlier of
    /// the two instants is returned. When midnight was skipped by a
    /// forward transition, the day starts at the transition itself, i.e.,
    /// the first instant after the gap, rather than failing.
    ///
    /// # Errors
    ///
    /// This can only return an error for dates at the very boundaries of
    /// the supported range, where the resolved instant would be out of
    /// range.
    pub fn at_start_of_day(&self, date: Date) -> Result<Zoned, Error> {
        let datetime = DateTime::new(date, Time::midnight());
        let mapping = self.map_local(datetime);
        match mapping.kind {
            ZoneLocalMappingKind::Unambiguous(ref interval) => {
                to_zoned(self.clone(), datetime, interval)
            }
            ZoneLocalMappingKind::Ambiguous { ref earlier, .. } => {
                to_zoned(self.clone(), datetime, earlier)
            }
            ZoneLocalMappingKind::Gap { ref after, .. } => {
                // Midnight fell in a gap, so the day begins at the
                // transition ending it. A gap implies a real transition, so
                // the start of the following interval is finite.
                let instant = after.start_raw();
                debug_assert!(!instant.is_before_min());
                Ok(Zoned::new(instant, self.clone()))
            }
        }
    }

    fn fixed_offset(&self) -> Option<Offset> {
        let Some(ref kind) = self.kind else { return Some(Offset::UTC) };
        match **kind {
            TimeZoneKind::Fixed(ref tz) => Some(tz.offset()),
            TimeZoneKind::Precomputed(_) => None,
        }
    }
}

impl core::fmt::Debug for TimeZone {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let field: &dyn core::fmt::Debug = match self.kind {
            None => &"UTC",
            Some(ref kind) => match &**kind {
                TimeZoneKind::Fixed(ref tz) => tz,
                TimeZoneKind::Precomputed(ref table) => table,
            },
        };
        f.debug_tuple("TimeZone").field(field).finish()
    }
}

impl Eq for TimeZone {}

/// When two time zones are equal, they are guaranteed to produce the same
/// offsets in all cases.
///
/// The inverse is not necessarily true: two time zones may produce the
/// same offsets everywhere and still compare unequal, since a true
/// extensional comparison is impractical. Fixed zones compare by offset.
/// Precomputed zones compare by ID and by a checksum of their encoded
/// transition table, so zones decoded from the same source data compare
/// equal across database instances.
impl PartialEq for TimeZone {
    fn eq(&self, rhs: &TimeZone) -> bool {
        match (self.fixed_offset(), rhs.fixed_offset()) {
            (Some(off1), Some(off2)) => return off1 == off2,
            (None, Some(_)) | (Some(_), None) => return false,
            (None, None) => {}
        }
        // Both are precomputed at this point.
        let (Some(kind1), Some(kind2)) = (&self.kind, &rhs.kind) else {
            unreachable!("fixed_offset is None only for precomputed zones")
        };
        match (&**kind1, &**kind2) {
            (
                TimeZoneKind::Precomputed(ref t1),
                TimeZoneKind::Precomputed(ref t2),
            ) => t1.id() == t2.id() && t1.checksum() == t2.checksum(),
            _ => unreachable!(
                "fixed_offset is None only for precomputed zones"
            ),
        }
    }
}

#[derive(Debug)]
enum TimeZoneKind {
    Fixed(TimeZoneFixed),
    Precomputed(ZoneTable),
}

struct TimeZoneFixed {
    offset: Offset,
    name: Arc<str>,
}

impl TimeZoneFixed {
    fn new(offset: Offset) -> TimeZoneFixed {
        let name = Arc::from(offset.to_string().as_str());
        TimeZoneFixed { offset, name }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn offset(&self) -> Offset {
        self.offset
    }

    fn interval(&self) -> ZoneInterval {
        ZoneInterval::new(
            IntervalName::Shared(self.name.clone()),
            Dst::No,
            Instant::BEFORE_MIN,
            Instant::AFTER_MAX,
            self.offset,
        )
    }
}

impl core::fmt::Debug for TimeZoneFixed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_tuple("Fixed").field(&self.offset()).finish()
    }
}

fn utc_interval() -> ZoneInterval {
    ZoneInterval::new(
        IntervalName::Static("UTC"),
        Dst::No,
        Instant::BEFORE_MIN,
        Instant::AFTER_MAX,
        Offset::UTC,
    )
}

impl ZoneIntervals for TimeZoneFixed {
    fn interval_at(&self, _instant: Instant) -> ZoneInterval {
        self.interval()
    }

    fn min_offset(&self) -> Offset {
        self.offset
    }

    fn max_offset(&self) -> Offset {
        self.offset
    }
}

/// The capability the resolution engine is written against.
///
/// Any zone representation that can report the interval containing an
/// instant, along with precomputed bounds on the offsets it will ever
/// return, can be driven by [`matching_intervals`]. The bounds exist
/// purely to prune neighbor probes: an interval can only "reach" a local
/// instant within its own offset's distance of its boundary, so a probe
/// whose necessary condition fails (computed from the bounds) is skipped
/// without fetching the neighbor.
pub(crate) trait ZoneIntervals {
    /// Returns the unique interval containing the instant given.
    fn interval_at(&self, instant: Instant) -> ZoneInterval;

    /// A lower bound on every offset this zone can return.
    fn min_offset(&self) -> Offset;

    /// An upper bound on every offset this zone can return.
    fn max_offset(&self) -> Offset;
}

/// Finds the zone intervals containing the local instant given.
///
/// This is the core of local datetime resolution. The first guess
/// reinterprets the local instant's value as a UTC instant, which lands in
/// the correct interval or an adjacent one (the error is bounded by the
/// offset in effect). From there:
///
/// * If the guessed interval contains the local instant, an adjacent
///   interval might *also* contain it (that's a fold). Probe the previous
///   and next intervals, and report a pair if either matches.
/// * Otherwise the guess landed next to the target. A matching neighbor is
///   the unique answer; no matching neighbor means the local instant was
///   skipped.
///
/// When two intervals match, the chronologically earlier-starting interval
/// is always the `earlier` of the pair, regardless of their offsets.
pub(crate) fn matching_intervals<Z: ZoneIntervals>(
    zone: &Z,
    local: LocalInstant,
) -> ZoneIntervalPair {
    let guess = zone.interval_at(local.as_first_guess());
    if guess.contains_local(local) {
        if let Some(earlier) = earlier_matching(zone, &guess, local) {
            return ZoneIntervalPair::Pair { earlier, later: guess };
        }
        if let Some(later) = later_matching(zone, &guess, local) {
            return ZoneIntervalPair::Pair { earlier: guess, later };
        }
        ZoneIntervalPair::Single(guess)
    } else {
        if let Some(earlier) = earlier_matching(zone, &guess, local) {
            return ZoneIntervalPair::Single(earlier);
        }
        if let Some(later) = later_matching(zone, &guess, local) {
            return ZoneIntervalPair::Single(later);
        }
        ZoneIntervalPair::NoMatch
    }
}

/// Probes the interval immediately preceding `interval` for containment of
/// the local instant given.
///
/// The probe is skipped when it cannot possibly succeed: the previous
/// interval ends at `interval.start`, so it contains the local instant
/// only if `interval.start + its offset` reaches past it, and that offset
/// is at most the zone's maximum. The filter is a necessary condition, not
/// a sufficient one; fetching the neighbor is what decides.
fn earlier_matching<Z: ZoneIntervals>(
    zone: &Z,
    interval: &ZoneInterval,
    local: LocalInstant,
) -> Option<ZoneInterval> {
    let start = interval.start()?;
    let reach = start.second() + i64::from(zone.max_offset().seconds());
    if reach <= local.second() {
        return None;
    }
    let candidate = zone.interval_at(start.prev_tick());
    if candidate.contains_local(local) {
        Some(candidate)
    } else {
        None
    }
}

/// Probes the interval immediately following `interval`. The symmetric
/// counterpart of [`earlier_matching`], pruned with the zone's minimum
/// offset.
fn later_matching<Z: ZoneIntervals>(
    zone: &Z,
    interval: &ZoneInterval,
    local: LocalInstant,
) -> Option<ZoneInterval> {
    let end = interval.end()?;
    let reach = end.second() + i64::from(zone.min_offset().seconds());
    if reach > local.second() {
        return None;
    }
    let candidate = zone.interval_at(end);
    if candidate.contains_local(local) {
        Some(candidate)
    } else {
        None
    }
}

/// Returns the intervals bracketing the gap a skipped local instant falls
/// in.
///
/// The caller must have established that no interval contains `local`.
/// The first guess then lands either in the interval preceding the gap or
/// the one following it, and one step in the right direction finds the
/// other side.
fn gap_brackets<Z: ZoneIntervals>(
    zone: &Z,
    local: LocalInstant,
) -> (ZoneInterval, ZoneInterval) {
    let guess = zone.interval_at(local.as_first_guess());
    if local < guess.local_start() {
        // The guess follows the gap, so its start is a real transition.
        let before = zone.interval_at(guess.start_raw().prev_tick());
        (before, guess)
    } else {
        // The guess precedes the gap, so its end is a real transition.
        let after = zone.interval_at(guess.end_raw());
        (guess, after)
    }
}

/// The result of resolving a civil datetime in a time zone.
///
/// Produced by [`TimeZone::map_local`]. The [`kind`](ZoneLocalMapping::kind)
/// classifies the datetime; the consuming accessors apply a policy and
/// produce a [`Zoned`] value:
///
/// * [`exactly`](ZoneLocalMapping::exactly) errors unless the datetime is
///   unambiguous.
/// * [`earlier`](ZoneLocalMapping::earlier) and
///   [`later`](ZoneLocalMapping::later) pick a side of a fold, but still
///   error on a gap.
/// * [`compatible`](ZoneLocalMapping::compatible) picks the earlier side
///   of a fold and shifts a gapped datetime forward by the length of the
///   gap, so it never errors on classification grounds.
#[derive(Clone, Debug)]
pub struct ZoneLocalMapping {
    tz: TimeZone,
    datetime: DateTime,
    kind: ZoneLocalMappingKind,
}

/// The three possible classifications of a civil datetime in a time zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ZoneLocalMappingKind {
    /// Exactly one instant corresponds to the datetime. This is the
    /// overwhelmingly common case.
    Unambiguous(
        /// The interval the datetime's single instant falls in.
        ZoneInterval,
    ),
    /// Two instants correspond to the datetime: it was repeated by a
    /// backward (fall-back) transition.
    Ambiguous {
        /// The interval containing the chronologically earlier instant.
        earlier: ZoneInterval,
        /// The interval containing the chronologically later instant.
        later: ZoneInterval,
    },
    /// No instant corresponds to the datetime: it was skipped by a forward
    /// (spring-forward) transition.
    Gap {
        /// The interval that ends at the transition that skipped the
        /// datetime.
        before: ZoneInterval,
        /// The interval that begins at that transition.
        after: ZoneInterval,
    },
}

impl ZoneLocalMapping {
    /// Returns the classification of the resolved datetime.
    pub fn kind(&self) -> &ZoneLocalMappingKind {
        &self.kind
    }

    /// Returns the time zone the datetime was resolved in.
    pub fn time_zone(&self) -> &TimeZone {
        &self.tz
    }

    /// Returns the civil datetime that was resolved.
    pub fn datetime(&self) -> DateTime {
        self.datetime
    }

    /// Returns the number of instants the datetime corresponds to: `1`,
    /// `2` or `0` for the unambiguous, ambiguous and gap cases
    /// respectively.
    pub fn match_count(&self) -> usize {
        match self.kind {
            ZoneLocalMappingKind::Unambiguous(_) => 1,
            ZoneLocalMappingKind::Ambiguous { .. } => 2,
            ZoneLocalMappingKind::Gap { .. } => 0,
        }
    }

    /// Returns true when the datetime did not resolve to exactly one
    /// instant.
    pub fn is_ambiguous(&self) -> bool {
        !matches!(self.kind, ZoneLocalMappingKind::Unambiguous(_))
    }

    /// Resolves to the unique instant, erroring when the datetime is
    /// ambiguous or skipped.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`Error::is_ambiguous_time`] is true
    /// when the datetime falls in a fold, and one for which
    /// [`Error::is_skipped_time`] is true when it falls in a gap. Both
    /// carry the offending datetime, the zone ID and the bracketing
    /// offsets in their messages.
    pub fn exactly(self) -> Result<Zoned, Error> {
        match self.kind {
            ZoneLocalMappingKind::Unambiguous(ref interval) => {
                to_zoned(self.tz.clone(), self.datetime, interval)
            }
            ZoneLocalMappingKind::Ambiguous { ref earlier, ref later } => {
                Err(Error::ambiguous_time(
                    self.tz.id(),
                    self.datetime,
                    earlier.offset(),
                    later.offset(),
                ))
            }
            ZoneLocalMappingKind::Gap { ref before, ref after } => {
                Err(Error::skipped_time(
                    self.tz.id(),
                    self.datetime,
                    before.offset(),
                    after.offset(),
                ))
            }
        }
    }

    /// Resolves to the chronologically earlier instant when the datetime
    /// is ambiguous. Still errors when the datetime was skipped.
    pub fn earlier(self) -> Result<Zoned, Error> {
        match self.kind {
            ZoneLocalMappingKind::Unambiguous(ref interval)
            | ZoneLocalMappingKind::Ambiguous { earlier: ref interval, .. } => {
                to_zoned(self.tz.clone(), self.datetime, interval)
            }
            ZoneLocalMappingKind::Gap { ref before, ref after } => {
                Err(Error::skipped_time(
                    self.tz.id(),
                    self.datetime,
                    before.offset(),
                    after.offset(),
                ))
            }
        }
    }

    /// Resolves to the chronologically later instant when the datetime is
    /// ambiguous. Still errors when the datetime was skipped.
    pub fn later(self) -> Result<Zoned, Error> {
        match self.kind {
            ZoneLocalMappingKind::Unambiguous(ref interval)
            | ZoneLocalMappingKind::Ambiguous { later: ref interval, .. } => {
                to_zoned(self.tz.clone(), self.datetime, interval)
            }
            ZoneLocalMappingKind::Gap { ref before, ref after } => {
                Err(Error::skipped_time(
                    self.tz.id(),
                    self.datetime,
                    before.offset(),
                    after.offset(),
                ))
            }
        }
    }

    /// Resolves every classification to an instant.
    ///
    /// An ambiguous datetime resolves to its earlier instant. A skipped
    /// datetime resolves by applying the offset in effect *before* the
    /// gap, which lands just past the transition. That is, the wall-clock
    /// reading is shifted forward by the length of the gap.
    ///
    /// # Errors
    ///
    /// Only for datetimes at the very boundaries of the supported range,
    /// where the resolved instant would be out of range.
    pub fn compatible(self) -> Result<Zoned, Error> {
        match self.kind {
            ZoneLocalMappingKind::Unambiguous(ref interval)
            | ZoneLocalMappingKind::Ambiguous { earlier: ref interval, .. }
            | ZoneLocalMappingKind::Gap { before: ref interval, .. } => {
                to_zoned(self.tz.clone(), self.datetime, interval)
            }
        }
    }
}

/// Builds the zoned value naming the instant obtained by interpreting
/// `datetime` with the interval's offset.
fn to_zoned(
    tz: TimeZone,
    datetime: DateTime,
    interval: &ZoneInterval,
) -> Result<Zoned, Error> {
    let instant = Instant::from_datetime_with_offset(
        datetime,
        interval.offset(),
    )
    .with_context(|| {
        err!(
            "failed to resolve {datetime} in time zone {id}",
            id = tz.id(),
        )
    })?;
    Ok(Zoned::new(instant, tz))
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use crate::tz::testdata;

    use super::*;

    /// A wrapper over any interval source that counts interval fetches.
    ///
    /// The resolution engine promises that a local datetime far from any
    /// transition resolves with a single fetch; this makes that promise
    /// testable.
    struct CountingZone<'a, Z> {
        zone: &'a Z,
        fetches: Cell<usize>,
    }

    impl<'a, Z: ZoneIntervals> CountingZone<'a, Z> {
        fn new(zone: &'a Z) -> CountingZone<'a, Z> {
            CountingZone { zone, fetches: Cell::new(0) }
        }
    }

    impl<'a, Z: ZoneIntervals> ZoneIntervals for CountingZone<'a, Z> {
        fn interval_at(&self, instant: Instant) -> ZoneInterval {
            self.fetches.set(self.fetches.get() + 1);
            self.zone.interval_at(instant)
        }

        fn min_offset(&self) -> Offset {
            self.zone.min_offset()
        }

        fn max_offset(&self) -> Offset {
            self.zone.max_offset()
        }
    }

    fn local(dt: DateTime) -> LocalInstant {
        LocalInstant::from_datetime(dt)
    }

    #[test]
    fn spring_forward_gap() {
        // Spring forward at 1970-01-01T02:00:00 local: the clock jumps
        // from 02:00 to 03:00 and the offset changes from +00 to +01.
        let tz = TimeZone::from_table(testdata::gap_1970());

        let mapping = tz.map_local(DateTime::constant(1970, 1, 1, 2, 30, 0, 0));
        assert_eq!(mapping.match_count(), 0);
        let ZoneLocalMappingKind::Gap { before, after } = mapping.kind().clone()
        else {
            panic!("expected gap, got {:?}", mapping.kind());
        };
        assert_eq!(before.offset(), Offset::constant(0));
        assert_eq!(after.offset(), Offset::constant(1));
        assert_eq!(after.start(), Some(Instant::from_unix(7200, 0).unwrap()));

        let err = mapping.clone().exactly().unwrap_err();
        assert!(err.is_skipped_time());
        assert!(mapping.clone().earlier().unwrap_err().is_skipped_time());
        assert!(mapping.clone().later().unwrap_err().is_skipped_time());

        // The compatible strategy pushes the reading past the gap: 02:30
        // resolved with the pre-gap offset (+00) is 02:30Z, i.e. local
        // 03:30 at +01.
        let zdt = mapping.compatible().unwrap();
        assert_eq!(zdt.instant(), Instant::from_unix(9000, 0).unwrap());
        assert_eq!(
            zdt.datetime(),
            DateTime::constant(1970, 1, 1, 3, 30, 0, 0),
        );

        // Midnight exists in this zone, so the day starts normally.
        let start = tz.at_start_of_day(Date::constant(1970, 1, 1)).unwrap();
        assert_eq!(start.instant(), Instant::from_unix(0, 0).unwrap());
        assert_eq!(
            start.datetime(),
            DateTime::constant(1970, 1, 1, 0, 0, 0, 0),
        );
    }

    #[test]
    fn start_of_day_when_midnight_is_skipped() {
        // The clock jumps from 00:00 to 01:00 at the start of
        // 1970-01-02, so that date has no midnight. The day starts at the
        // transition instead.
        let tz = TimeZone::from_table(testdata::midnight_gap_1970());
        let start = tz.at_start_of_day(Date::constant(1970, 1, 2)).unwrap();
        assert_eq!(start.instant(), Instant::from_unix(86_400, 0).unwrap());
        assert_eq!(
            start.datetime(),
            DateTime::constant(1970, 1, 2, 1, 0, 0, 0),
        );
        assert_eq!(start.offset(), Offset::constant(1));
    }

    #[test]
    fn fall_back_ambiguity() {
        // Fall back at 1970-01-01T02:00:00 local: the clock jumps from
        // 02:00 to 01:00 and the offset changes from +01 to +00.
        let tz = TimeZone::from_table(testdata::fold_1970());

        let mapping = tz.map_local(DateTime::constant(1970, 1, 1, 1, 30, 0, 0));
        assert_eq!(mapping.match_count(), 2);
        let ZoneLocalMappingKind::Ambiguous { earlier, later } =
            mapping.kind().clone()
        else {
            panic!("expected ambiguous, got {:?}", mapping.kind());
        };
        assert_eq!(earlier.offset(), Offset::constant(1));
        assert_eq!(later.offset(), Offset::constant(0));

        assert!(mapping.clone().exactly().unwrap_err().is_ambiguous_time());

        // 01:30 at +01 is 00:30Z; 01:30 at +00 is 01:30Z.
        let early = mapping.clone().earlier().unwrap();
        assert_eq!(early.instant(), Instant::from_unix(1800, 0).unwrap());
        let late = mapping.clone().later().unwrap();
        assert_eq!(late.instant(), Instant::from_unix(5400, 0).unwrap());
        // The compatible strategy agrees with `earlier` for folds.
        assert_eq!(
            mapping.compatible().unwrap().instant(),
            early.instant(),
        );
    }

    #[test]
    fn boundaries_of_gap_and_fold_are_exact() {
        let gap = TimeZone::from_table(testdata::gap_1970());
        // 01:59:59.999999999 still exists; 02:00:00 is the first skipped
        // reading; 03:00:00 is the first reading after the gap.
        let dt = DateTime::constant(1970, 1, 1, 1, 59, 59, 999_999_999);
        assert_eq!(gap.map_local(dt).match_count(), 1);
        let dt = DateTime::constant(1970, 1, 1, 2, 0, 0, 0);
        assert_eq!(gap.map_local(dt).match_count(), 0);
        let dt = DateTime::constant(1970, 1, 1, 2, 59, 59, 999_999_999);
        assert_eq!(gap.map_local(dt).match_count(), 0);
        let dt = DateTime::constant(1970, 1, 1, 3, 0, 0, 0);
        assert_eq!(gap.map_local(dt).match_count(), 1);

        let fold = TimeZone::from_table(testdata::fold_1970());
        // 00:59:59.999999999 is unambiguous; 01:00:00 is the first
        // repeated reading; 02:00:00 is unambiguous again.
        let dt = DateTime::constant(1970, 1, 1, 0, 59, 59, 999_999_999);
        assert_eq!(fold.map_local(dt).match_count(), 1);
        let dt = DateTime::constant(1970, 1, 1, 1, 0, 0, 0);
        assert_eq!(fold.map_local(dt).match_count(), 2);
        let dt = DateTime::constant(1970, 1, 1, 1, 59, 59, 999_999_999);
        assert_eq!(fold.map_local(dt).match_count(), 2);
        let dt = DateTime::constant(1970, 1, 1, 2, 0, 0, 0);
        assert_eq!(fold.map_local(dt).match_count(), 1);
    }

    #[test]
    fn new_york_transitions() {
        let tz = TimeZone::from_table(testdata::new_york());
        let cases: &[((i16, i8, i8, i8, i8, i8, i32), usize, i32)] = &[
            // Far from any transition.
            ((2024, 6, 15, 12, 0, 0, 0), 1, -4 * 3600),
            ((2024, 1, 15, 12, 0, 0, 0), 1, -5 * 3600),
            // Around the 2024 spring forward (02:00 -> 03:00 local).
            ((2024, 3, 10, 1, 59, 59, 999_999_999), 1, -5 * 3600),
            ((2024, 3, 10, 2, 0, 0, 0), 0, 0),
            ((2024, 3, 10, 2, 59, 59, 999_999_999), 0, 0),
            ((2024, 3, 10, 3, 0, 0, 0), 1, -4 * 3600),
            // Around the 2024 fall back (02:00 -> 01:00 local).
            ((2024, 11, 3, 0, 59, 59, 999_999_999), 1, -4 * 3600),
            ((2024, 11, 3, 1, 0, 0, 0), 2, -4 * 3600),
            ((2024, 11, 3, 1, 59, 59, 999_999_999), 2, -4 * 3600),
            ((2024, 11, 3, 2, 0, 0, 0), 1, -5 * 3600),
        ];
        for &((y, mo, d, h, mi, s, ns), count, offset_seconds) in cases {
            let dt = DateTime::constant(y, mo, d, h, mi, s, ns);
            let mapping = tz.map_local(dt);
            assert_eq!(mapping.match_count(), count, "{dt}");
            if count > 0 {
                let zdt = mapping.earlier().unwrap();
                assert_eq!(
                    zdt.offset(),
                    Offset::from_seconds(offset_seconds).unwrap(),
                    "{dt}",
                );
                // Round trip: the zoned value projects back to the civil
                // datetime we started from.
                assert_eq!(zdt.datetime(), dt, "{dt}");
            }
        }
    }

    #[test]
    fn double_length_gap_and_fold() {
        // A two hour jump, like Antarctica/Troll: readings stay skipped
        // (or repeated) for two whole hours.
        let tz = TimeZone::from_table(testdata::double_gap_and_fold());
        // Gap: [01:00, 03:00) local on 1970-01-01.
        assert_eq!(
            tz.map_local(DateTime::constant(1970, 1, 1, 0, 59, 59, 0))
                .match_count(),
            1,
        );
        for hour in [1, 2] {
            let dt = DateTime::constant(1970, 1, 1, hour, 30, 0, 0);
            assert_eq!(tz.map_local(dt).match_count(), 0, "{dt}");
        }
        assert_eq!(
            tz.map_local(DateTime::constant(1970, 1, 1, 3, 0, 0, 0))
                .match_count(),
            1,
        );
        // Fold: [01:00, 03:00) local on 1970-06-01.
        assert_eq!(
            tz.map_local(DateTime::constant(1970, 6, 1, 0, 59, 59, 0))
                .match_count(),
            1,
        );
        for hour in [1, 2] {
            let dt = DateTime::constant(1970, 6, 1, hour, 30, 0, 0);
            assert_eq!(tz.map_local(dt).match_count(), 2, "{dt}");
        }
        assert_eq!(
            tz.map_local(DateTime::constant(1970, 6, 1, 3, 0, 0, 0))
                .match_count(),
            1,
        );
    }

    #[test]
    fn half_hour_offset_zone() {
        // Offsets with minute components, like America/St_Johns.
        let tz = TimeZone::from_table(testdata::half_hour());
        let dt = DateTime::constant(1970, 3, 1, 2, 15, 0, 0);
        let mapping = tz.map_local(dt);
        assert_eq!(mapping.match_count(), 0);
        let dt = DateTime::constant(1970, 1, 15, 12, 0, 0, 0);
        let zdt = tz.map_local(dt).exactly().unwrap();
        assert_eq!(zdt.offset(), Offset::hms(-3, -30, 0));
    }

    #[test]
    fn far_from_transition_needs_one_fetch() {
        let table = testdata::new_york();
        let counting = CountingZone::new(&table);
        // Noon in the middle of summer is hours away from any transition,
        // so both neighbor probes must be pruned by the offset bounds.
        let result = matching_intervals(
            &counting,
            local(DateTime::constant(2024, 6, 15, 12, 0, 0, 0)),
        );
        assert!(matches!(result, ZoneIntervalPair::Single(_)));
        assert_eq!(counting.fetches.get(), 1);
    }

    #[test]
    fn near_transition_probes_neighbors() {
        let table = testdata::new_york();
        let counting = CountingZone::new(&table);
        // In the fold, the earlier interval matches on the first probe.
        let result = matching_intervals(
            &counting,
            local(DateTime::constant(2024, 11, 3, 1, 30, 0, 0)),
        );
        assert!(matches!(result, ZoneIntervalPair::Pair { .. }));
        assert_eq!(counting.fetches.get(), 2);
    }

    #[test]
    fn engine_over_fixed_zone_is_always_single() {
        let fixed = TimeZoneFixed::new(Offset::constant(-5));
        for dt in [
            DateTime::constant(1970, 1, 1, 0, 0, 0, 0),
            DateTime::constant(2024, 3, 10, 2, 30, 0, 0),
            DateTime::constant(-9999, 1, 1, 0, 0, 0, 0),
            DateTime::constant(9999, 12, 31, 23, 59, 59, 999_999_999),
        ] {
            let result = matching_intervals(&fixed, local(dt));
            assert!(matches!(result, ZoneIntervalPair::Single(_)), "{dt}");
        }
    }

    #[test]
    fn classification_agrees_with_brute_force() {
        let _ = env_logger::try_init();
        // For every sampled local datetime, count the instants that
        // project onto it by trying every offset the zone can ever
        // return. That count must agree with the classification.
        let tables =
            [testdata::new_york(), testdata::gap_1970(), testdata::fold_1970()];
        for table in tables {
            let tz = TimeZone::from_table(table.clone());
            let offsets = table.distinct_offsets();
            // Sample around all transitions at 15 minute steps.
            for transition in table.transition_instants() {
                for step in -16i64..=16 {
                    let second = transition.second() + step * 900;
                    let instant = Instant::from_unix(second, 0).unwrap();
                    let dt = tz.to_datetime(instant);
                    let mut hits = 0;
                    for &offset in &offsets {
                        let candidate = offset.to_instant(dt).unwrap();
                        if tz.to_offset(candidate) == offset {
                            hits += 1;
                        }
                    }
                    let got = tz.map_local(dt).match_count();
                    // A reading obtained from a real instant is never
                    // skipped, and ambiguity shows up as two hits.
                    assert_eq!(got, hits, "{}: {dt}", tz.id());
                    assert!(hits == 1 || hits == 2);
                }
            }
        }
    }

    #[test]
    fn map_local_in_utc_and_fixed_zones() {
        let dt = DateTime::constant(2024, 3, 10, 2, 30, 0, 0);
        let mapping = TimeZone::UTC.map_local(dt);
        assert_eq!(mapping.match_count(), 1);
        let zdt = mapping.exactly().unwrap();
        assert_eq!(zdt.offset(), Offset::ZERO);

        let tz = TimeZone::fixed(Offset::constant(-5));
        let zdt = tz.map_local(dt).exactly().unwrap();
        assert_eq!(zdt.offset(), Offset::constant(-5));
        assert_eq!(zdt.datetime(), dt);
    }

    #[test]
    fn time_zone_equality() {
        assert_eq!(TimeZone::UTC, TimeZone::fixed(Offset::ZERO));
        assert_eq!(
            TimeZone::fixed(Offset::constant(-5)),
            TimeZone::fixed(Offset::constant(-5)),
        );
        assert_ne!(
            TimeZone::fixed(Offset::constant(-5)),
            TimeZone::fixed(Offset::constant(-4)),
        );
        let tz1 = TimeZone::from_table(testdata::new_york());
        let tz2 = TimeZone::from_table(testdata::new_york());
        assert_eq!(tz1, tz2);
        assert_ne!(tz1, TimeZone::fixed(Offset::constant(-5)));
        assert_ne!(tz1, TimeZone::from_table(testdata::gap_1970()));
    }

    #[test]
    fn interval_lookup_is_idempotent() {
        let tz = TimeZone::from_table(testdata::new_york());
        let instant = Instant::from_unix(1_710_054_000, 0).unwrap();
        assert_eq!(tz.interval_at(instant), tz.interval_at(instant));
    }

    #[test]
    fn time_zone_size() {
        // Every `Zoned` carries a `TimeZone`, so keep it one word.
        let word = core::mem::size_of::<usize>();
        assert_eq!(word, core::mem::size_of::<TimeZone>());
    }
}
