use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};

use crate::{
    error::{err, Error},
    instant::{self, Instant},
    tz::{
        interval::{IntervalName, ZoneInterval},
        offset::{Dst, Offset},
        timezone::ZoneIntervals,
        zpak,
    },
};

/// A precomputed table of time zone transitions.
///
/// A `ZoneTable` is the storage behind a transition-based
/// [`TimeZone`](crate::tz::TimeZone): a chronologically sorted sequence of
/// transition instants, each selecting a time type (offset, DST flag and
/// name) that applies until the next transition. The first interval
/// extends indefinitely into the past and the last indefinitely into the
/// future; any recurring rules were resolved into discrete transitions
/// before the table was built.
///
/// Tables come from two places: decoding binary zone data with
/// [`ZoneTable::from_bytes`], or building one programmatically with
/// [`ZoneTable::builder`]. Both enforce the same invariants: transitions
/// are strictly increasing, every index is in bounds and no two adjacent
/// intervals are identical (they would have been merged).
///
/// # Example
///
/// ```
/// use zoneline::{
///     tz::{Dst, Offset, ZoneTable},
///     Instant,
/// };
///
/// let table = ZoneTable::builder("America/New_York")
///     .initial(Offset::constant(-5), Dst::No, "EST")
///     .transition(
///         Instant::from_unix(1710054000, 0)?,
///         Offset::constant(-4),
///         Dst::Yes,
///         "EDT",
///     )
///     .build()?;
/// assert_eq!(table.id(), "America/New_York");
///
/// // The table round trips through its binary encoding exactly.
/// let bytes = table.to_bytes();
/// assert_eq!(ZoneTable::from_bytes("America/New_York", &bytes)?, table);
/// # Ok::<(), zoneline::Error>(())
/// ```
#[derive(Clone)]
pub struct ZoneTable {
    id: Box<str>,
    /// CRC-32 of the encoded form of this table. Zones decoded from
    /// byte-identical blocks share a checksum, which is what zone equality
    /// is built on.
    checksum: u32,
    /// De-duplicated interval names. Intervals hand out `Arc` clones of
    /// these, so lookups never allocate.
    pool: Vec<Arc<str>>,
    types: Vec<TimeType>,
    /// Sorted transitions. The first entry is synthetic: it sits at the
    /// "negative infinity" sentinel and carries the time type in effect
    /// before the first real transition. Binary search therefore never has
    /// to treat "before all transitions" as a special case.
    transitions: Vec<Transition>,
    min_offset: Offset,
    max_offset: Offset,
}

/// A single time type: what a transition switches the zone to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct TimeType {
    pub(crate) offset: Offset,
    pub(crate) dst: Dst,
    /// Index into the name pool.
    pub(crate) name: u8,
}

/// A transition to a different time type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Transition {
    /// The second at which this transition starts. Transitions have
    /// whole-second resolution. The transition applies up to and not
    /// including the next transition's second.
    pub(crate) second: i64,
    /// Index into the time type table.
    pub(crate) type_index: u8,
}

impl ZoneTable {
    /// Returns a builder for assembling a table from an initial time type
    /// and a sequence of transitions.
    pub fn builder(id: impl Into<String>) -> ZoneTableBuilder {
        ZoneTableBuilder {
            id: id.into().into_boxed_str(),
            pool: Vec::new(),
            types: Vec::new(),
            initial: None,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Decodes a table from its binary encoding, attaching the given zone
    /// ID.
    ///
    /// # Errors
    ///
    /// Malformed or truncated data is fatal: an error for which
    /// [`Error::is_invalid_zone_data`](crate::Error::is_invalid_zone_data)
    /// is true is returned and no table is constructed. Decoding is
    /// deterministic: the same bytes always produce an identical table.
    pub fn from_bytes(
        id: impl Into<String>,
        bytes: &[u8],
    ) -> Result<ZoneTable, Error> {
        zpak::decode_block(id.into().into_boxed_str(), bytes)
    }

    /// Encodes this table into its binary form.
    ///
    /// Decoding the returned bytes yields a table equal to this one.
    pub fn to_bytes(&self) -> Vec<u8> {
        zpak::encode_block(self)
    }

    /// Returns the ID this table was registered under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true when this table has no transitions, i.e., a single
    /// interval covers the entire timeline.
    pub fn is_fixed(&self) -> bool {
        self.transitions.len() == 1
    }

    pub(crate) fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Assembles and validates a table from its parts.
    ///
    /// `raw_transitions` excludes the synthetic first transition, which
    /// this routine inserts. The checksum is left at zero; callers that
    /// decoded the parts from bytes overwrite it with the checksum of
    /// those bytes, and the builder overwrites it with the checksum of the
    /// canonical encoding.
    pub(crate) fn from_parts(
        id: Box<str>,
        pool: Vec<Arc<str>>,
        types: Vec<TimeType>,
        initial_type: u8,
        raw_transitions: Vec<(i64, u8)>,
    ) -> Result<ZoneTable, Error> {
        if types.is_empty() {
            return Err(Error::invalid_zone_data(format_args!(
                "zone {id} has no time types",
            )));
        }
        if types.len() > 256 {
            return Err(Error::invalid_zone_data(format_args!(
                "zone {id} has {} time types, but the maximum is 256",
                types.len(),
            )));
        }
        if pool.len() > 256 {
            return Err(Error::invalid_zone_data(format_args!(
                "zone {id} has {} names, but the maximum is 256",
                pool.len(),
            )));
        }
        for typ in types.iter() {
            if usize::from(typ.name) >= pool.len() {
                return Err(Error::invalid_zone_data(format_args!(
                    "zone {id} has a time type referencing name {}, \
                     but only {} names exist",
                    typ.name,
                    pool.len(),
                )));
            }
        }
        let type_at = |index: u8| -> Result<&TimeType, Error> {
            types.get(usize::from(index)).ok_or_else(|| {
                Error::invalid_zone_data(format_args!(
                    "zone {id} references time type {index}, \
                     but only {} types exist",
                    types.len(),
                ))
            })
        };

        let mut transitions = Vec::with_capacity(raw_transitions.len() + 1);
        transitions.push(Transition {
            second: Instant::BEFORE_MIN.second_raw(),
            type_index: initial_type,
        });
        let mut prev_type = type_at(initial_type)?;
        let mut prev_second = Instant::BEFORE_MIN.second_raw();
        for &(second, type_index) in raw_transitions.iter() {
            if !(instant::SECOND_MIN <= second
                && second <= instant::SECOND_MAX)
            {
                return Err(Error::invalid_zone_data(format_args!(
                    "zone {id} has transition at second {second}, \
                     which is outside the supported instant range",
                )));
            }
            if second <= prev_second {
                return Err(Error::invalid_zone_data(format_args!(
                    "zone {id} has transition at second {second} \
                     that does not come after its predecessor at \
                     {prev_second}",
                )));
            }
            let this_type = type_at(type_index)?;
            if this_type == prev_type {
                return Err(Error::invalid_zone_data(format_args!(
                    "zone {id} has adjacent intervals with identical \
                     offset, DST flag and name at second {second}; \
                     they should have been merged",
                )));
            }
            transitions.push(Transition { second, type_index });
            prev_type = this_type;
            prev_second = second;
        }

        // The offset bounds only consider types actually reachable from a
        // transition. Superfluous entries in the type table are allowed,
        // as long as their indices are coherent.
        let mut min_offset = Offset::MAX;
        let mut max_offset = Offset::MIN;
        for transition in transitions.iter() {
            let offset = types[usize::from(transition.type_index)].offset;
            min_offset = min_offset.min(offset);
            max_offset = max_offset.max(offset);
        }

        Ok(ZoneTable {
            id,
            checksum: 0,
            pool,
            types,
            transitions,
            min_offset,
            max_offset,
        })
    }

    pub(crate) fn with_checksum(mut self, checksum: u32) -> ZoneTable {
        self.checksum = checksum;
        self
    }

    /// Returns the interval containing the instant given by binary
    /// searching the transition table for the greatest transition at or
    /// before it.
    pub(crate) fn interval_at(&self, instant: Instant) -> ZoneInterval {
        self.interval(self.index_of(instant))
    }

    fn index_of(&self, instant: Instant) -> usize {
        // It is an optimization to compare only by the second instead of
        // the second and the nanosecond. This works for two reasons.
        // Firstly, transitions are limited to second precision. Secondly,
        // an instant with non-zero fractional seconds landing exactly on a
        // transition second compares equal when it is actually later, but
        // equality resolves to the same index that `Err(i) -> i-1` would.
        let search = self
            .transitions
            .binary_search_by_key(&instant.second_raw(), |t| t.second);
        match search {
            Ok(i) => i,
            // Since the first transition is always at the minimum
            // sentinel, it's impossible for any instant to sort before it.
            Err(0) => unreachable!("impossible to come before the sentinel"),
            // i points to the position immediately after the insertion
            // point. And since we know that i>0 because of the Err(0)
            // check above, we can safely subtract 1.
            Err(i) => i - 1,
        }
    }

    fn interval(&self, index: usize) -> ZoneInterval {
        let transition = &self.transitions[index];
        let start = if index == 0 {
            Instant::BEFORE_MIN
        } else {
            Instant::from_second(transition.second)
        };
        let end = match self.transitions.get(index + 1) {
            Some(next) => Instant::from_second(next.second),
            None => Instant::AFTER_MAX,
        };
        let typ = &self.types[usize::from(transition.type_index)];
        ZoneInterval::new(
            IntervalName::Shared(self.pool[usize::from(typ.name)].clone()),
            typ.dst,
            start,
            end,
            typ.offset,
        )
    }

    pub(crate) fn pool(&self) -> &[Arc<str>] {
        &self.pool
    }

    pub(crate) fn types(&self) -> &[TimeType] {
        &self.types
    }

    /// All transitions, including the synthetic first one.
    pub(crate) fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The instants of all real transitions, in order.
    #[cfg(test)]
    pub(crate) fn transition_instants(&self) -> Vec<Instant> {
        self.transitions[1..]
            .iter()
            .map(|t| Instant::from_second(t.second))
            .collect()
    }

    /// Every distinct offset reachable from a transition.
    #[cfg(test)]
    pub(crate) fn distinct_offsets(&self) -> Vec<Offset> {
        let mut offsets: Vec<Offset> = self
            .transitions
            .iter()
            .map(|t| self.types[usize::from(t.type_index)].offset)
            .collect();
        offsets.sort();
        offsets.dedup();
        offsets
    }
}

impl ZoneIntervals for ZoneTable {
    fn interval_at(&self, instant: Instant) -> ZoneInterval {
        ZoneTable::interval_at(self, instant)
    }

    fn min_offset(&self) -> Offset {
        self.min_offset
    }

    fn max_offset(&self) -> Offset {
        self.max_offset
    }
}

impl Eq for ZoneTable {}

/// Equality is structural: ID, names, types and transitions. The checksum
/// and offset bounds are derived data and don't participate.
impl PartialEq for ZoneTable {
    fn eq(&self, rhs: &ZoneTable) -> bool {
        self.id == rhs.id
            && self.pool == rhs.pool
            && self.types == rhs.types
            && self.transitions == rhs.transitions
    }
}

// Dumping all transitions would be far too much noise.
impl core::fmt::Debug for ZoneTable {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("ZoneTable")
            .field("id", &self.id)
            .field("transitions", &(self.transitions.len() - 1))
            .finish()
    }
}

/// A builder for [`ZoneTable`] values.
///
/// Returned by [`ZoneTable::builder`]. Configure the time type in effect
/// before the first transition with [`initial`](ZoneTableBuilder::initial),
/// then add transitions in chronological order. Adjacent transitions to an
/// identical time type are merged away, matching the invariant the decoder
/// enforces.
#[derive(Debug)]
pub struct ZoneTableBuilder {
    id: Box<str>,
    pool: Vec<Arc<str>>,
    types: Vec<TimeType>,
    initial: Option<u8>,
    transitions: Vec<(i64, u8)>,
    /// The first hard error encountered while adding entries. Surfaced by
    /// `build`, so that callers can chain adds without checking each one.
    error: Option<Error>,
}

impl ZoneTableBuilder {
    /// Sets the time type in effect before the first transition (or, for a
    /// table with no transitions at all, everywhere).
    ///
    /// This must be called exactly once, before `build`.
    pub fn initial(
        mut self,
        offset: Offset,
        dst: Dst,
        name: &str,
    ) -> ZoneTableBuilder {
        if self.initial.is_some() {
            self.set_error(err!(
                "initial time type for zone {id} was set twice",
                id = self.id,
            ));
            return self;
        }
        match self.intern_type(offset, dst, name) {
            Ok(index) => self.initial = Some(index),
            Err(error) => self.set_error(error),
        }
        self
    }

    /// Adds a transition: starting at the instant given, the zone uses the
    /// offset, DST flag and name given, until the next transition.
    ///
    /// Transitions must be added in strictly increasing order and must
    /// have whole-second precision. A transition that changes nothing
    /// relative to the previous time type is dropped.
    pub fn transition(
        mut self,
        at: Instant,
        offset: Offset,
        dst: Dst,
        name: &str,
    ) -> ZoneTableBuilder {
        if at.nanosecond() != 0 {
            self.set_error(err!(
                "transition for zone {id} at {at:?} has fractional \
                 seconds, but transitions have whole-second resolution",
                id = self.id,
            ));
            return self;
        }
        let type_index = match self.intern_type(offset, dst, name) {
            Ok(index) => index,
            Err(error) => {
                self.set_error(error);
                return self;
            }
        };
        let effective = self
            .transitions
            .last()
            .map(|&(_, index)| index)
            .or(self.initial);
        if effective == Some(type_index) {
            // Nothing changes at this transition. Merge it away rather
            // than storing an interval boundary that isn't one.
            debug!(
                "dropping redundant transition at {at:?} for zone {id}",
                id = self.id,
            );
            return self;
        }
        self.transitions.push((at.second(), type_index));
        self
    }

    /// Validates the accumulated parts and builds the table.
    ///
    /// # Errors
    ///
    /// This returns an error when no initial time type was set, when any
    /// entry was rejected as it was added, or when validation of the
    /// assembled table fails (e.g., out-of-order transitions).
    pub fn build(self) -> Result<ZoneTable, Error> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let Some(initial) = self.initial else {
            return Err(err!(
                "zone {id} has no initial time type",
                id = self.id,
            ));
        };
        let table = ZoneTable::from_parts(
            self.id,
            self.pool,
            self.types,
            initial,
            self.transitions,
        )?;
        // The checksum fingerprints the canonical encoding, the same way
        // decoding fingerprints the bytes it read.
        let checksum = crate::util::crc32::sum(&zpak::encode_block(&table));
        Ok(table.with_checksum(checksum))
    }

    /// Returns the index of the time type with the given content, adding
    /// it (and interning its name) if necessary.
    fn intern_type(
        &mut self,
        offset: Offset,
        dst: Dst,
        name: &str,
    ) -> Result<u8, Error> {
        let name = self.intern_name(name)?;
        let typ = TimeType { offset, dst, name };
        if let Some(index) = self.types.iter().position(|t| *t == typ) {
            return Ok(index as u8);
        }
        if self.types.len() >= 256 {
            return Err(err!(
                "zone {id} has more than 256 distinct time types",
                id = self.id,
            ));
        }
        self.types.push(typ);
        Ok((self.types.len() - 1) as u8)
    }

    fn intern_name(&mut self, name: &str) -> Result<u8, Error> {
        if name.len() > 255 {
            return Err(err!(
                "zone {id} has interval name of {} bytes, \
                 but the maximum is 255",
                name.len(),
                id = self.id,
            ));
        }
        if let Some(index) =
            self.pool.iter().position(|pooled| &**pooled == name)
        {
            return Ok(index as u8);
        }
        if self.pool.len() >= 256 {
            return Err(err!(
                "zone {id} has more than 256 distinct interval names",
                id = self.id,
            ));
        }
        self.pool.push(Arc::from(name));
        Ok((self.pool.len() - 1) as u8)
    }

    fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}
