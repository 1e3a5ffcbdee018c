/*!
Time zone support.

The central type here is [`TimeZone`]: a function from instants to the
[`ZoneInterval`] (offset, name, DST flag and validity range) in effect
at that instant, together with the inverse mapping from civil datetimes
back to instants, which is where daylight saving gaps and folds surface as
[`ZoneLocalMapping`] classifications.

Transition-based zones are backed by a [`ZoneTable`]: a sorted, binary
searchable table of precomputed transitions, loaded from a compact binary
encoding (see [`ZoneTable::from_bytes`]) or assembled with
[`ZoneTable::builder`]. The [`TimeZoneDatabase`] provider maps zone IDs to
cached `TimeZone` values on top of a multi-zone blob produced by
[`encode_database`].

# Resolving civil datetimes

```
use zoneline::{
    civil::DateTime,
    tz::{Dst, Offset, TimeZone, ZoneTable},
    Instant,
};

// A zone that springs forward from +00 to +01 at 1970-01-01T02:00:00
// local, skipping the hour from 02:00 to 03:00.
let table = ZoneTable::builder("Test/Gap")
    .initial(Offset::constant(0), Dst::No, "TST")
    .transition(
        Instant::from_unix(7200, 0)?,
        Offset::constant(1),
        Dst::Yes,
        "TDT",
    )
    .build()?;
let tz = TimeZone::from_table(table);

// 02:30 never happened in this zone.
let mapping = tz.map_local(DateTime::constant(1970, 1, 1, 2, 30, 0, 0));
assert_eq!(mapping.match_count(), 0);
assert!(mapping.exactly().unwrap_err().is_skipped_time());
# Ok::<(), zoneline::Error>(())
```
*/

pub use self::{
    interval::ZoneInterval,
    offset::{Dst, Offset},
    table::{ZoneTable, ZoneTableBuilder},
    timezone::{TimeZone, ZoneLocalMapping, ZoneLocalMappingKind},
    zpak::encode_database,
};

#[cfg(feature = "std")]
pub use self::db::TimeZoneDatabase;

#[cfg(feature = "std")]
mod db;
pub(crate) mod interval;
pub(crate) mod offset;
pub(crate) mod table;
#[cfg(test)]
pub(crate) mod testdata;
pub(crate) mod timezone;
pub(crate) mod zpak;
