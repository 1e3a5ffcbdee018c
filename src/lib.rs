/*!
Zoneline is a calendar-aware date/time library built around a
transition-table time zone engine.

The crate provides a small set of immutable value types ([`Instant`],
[`civil::Date`], [`civil::Time`], [`civil::DateTime`], [`tz::Offset`],
[`SignedDuration`] and [`Zoned`]) and the machinery to resolve civil
(wall-clock) time against UTC: [`tz::TimeZone`], its classified mapping
result [`tz::ZoneLocalMapping`], the precomputed [`tz::ZoneTable`] backing
it, the binary encoding the table is loaded from and the
[`tz::TimeZoneDatabase`] provider that caches zones by ID.

# Example

```
use zoneline::{civil::DateTime, tz::TimeZone};

let tz = TimeZone::fixed(zoneline::tz::Offset::constant(-5));
let dt = DateTime::constant(1969, 12, 31, 19, 0, 0, 0);
let zdt = tz.map_local(dt).exactly()?;
assert_eq!(zdt.instant(), zoneline::Instant::UNIX_EPOCH);
# Ok::<(), zoneline::Error>(())
```

# Time zone resolution

The interesting part of this crate is [`tz::TimeZone::map_local`]: mapping
a civil datetime into a time zone is not a function. Around a daylight
saving transition a wall-clock reading may correspond to zero instants (it
was skipped by a spring-forward jump) or two instants (it was repeated by a
fall-back jump). Rather than guessing, `map_local` returns a
[`tz::ZoneLocalMapping`] that classifies the datetime as unambiguous,
ambiguous or skipped, and callers pick a policy via
[`exactly`](tz::ZoneLocalMapping::exactly),
[`earlier`](tz::ZoneLocalMapping::earlier),
[`later`](tz::ZoneLocalMapping::later) or
[`compatible`](tz::ZoneLocalMapping::compatible).

# Crate features

* **std** (enabled by default) - Enables the [`tz::TimeZoneDatabase`]
  provider (which needs locking) and the `std::error::Error` impl for
  [`Error`]. The rest of the crate is `core`+`alloc` only.
* **logging** - Emits diagnostics through the [`log`](https://docs.rs/log)
  crate when loading zone data.
*/

#![no_std]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(any(test, feature = "std"))]
extern crate std;

// Dynamic memory allocation is required: time zone data, interval names and
// error values all live on the heap. A core-only mode would need a
// different API altogether.
extern crate alloc;

pub use crate::{
    duration::SignedDuration, error::Error, instant::Instant,
    tz::TimeZone, zoned::Zoned,
};

#[macro_use]
mod logging;

pub mod civil;
mod duration;
mod error;
mod instant;
pub mod tz;
mod util;
mod zoned;
