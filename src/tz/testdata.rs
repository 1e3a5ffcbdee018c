/*!
Prebuilt transition tables shared by the time zone test modules.

Real zoneinfo data is deliberately absent: every table here is small
enough to reason about by hand, and the interesting transitions sit at
round numbers close to the epoch so expected instants can be written down
directly in tests.
*/

use crate::{
    instant::Instant,
    tz::{
        offset::{Dst, Offset},
        table::ZoneTable,
    },
};

fn at(second: i64) -> Instant {
    Instant::from_unix(second, 0).unwrap()
}

/// Springs forward at 1970-01-01T02:00:00 local: the clock jumps to
/// 03:00 and the offset changes from +00 to +01.
pub(crate) fn gap_1970() -> ZoneTable {
    ZoneTable::builder("Test/Gap1970")
        .initial(Offset::constant(0), Dst::No, "TST")
        .transition(at(7200), Offset::constant(1), Dst::Yes, "TDT")
        .build()
        .unwrap()
}

/// Springs forward at 1970-01-02T00:00:00 local: the clock jumps straight
/// from midnight to 01:00, so 1970-01-02 has no midnight at all.
pub(crate) fn midnight_gap_1970() -> ZoneTable {
    ZoneTable::builder("Test/MidnightGap")
        .initial(Offset::constant(0), Dst::No, "TST")
        .transition(at(86_400), Offset::constant(1), Dst::Yes, "TDT")
        .build()
        .unwrap()
}

/// Falls back at 1970-01-01T02:00:00 local: the clock jumps to 01:00 and
/// the offset changes from +01 to +00, repeating the hour from 01:00.
pub(crate) fn fold_1970() -> ZoneTable {
    ZoneTable::builder("Test/Fold1970")
        .initial(Offset::constant(1), Dst::Yes, "TDT")
        .transition(at(3600), Offset::constant(0), Dst::No, "TST")
        .build()
        .unwrap()
}

/// America/New_York with its 2023 and 2024 transitions.
pub(crate) fn new_york() -> ZoneTable {
    let est = Offset::constant(-5);
    let edt = Offset::constant(-4);
    ZoneTable::builder("America/New_York")
        .initial(est, Dst::No, "EST")
        // 2023-03-12T07:00:00Z
        .transition(at(1_678_604_400), edt, Dst::Yes, "EDT")
        // 2023-11-05T06:00:00Z
        .transition(at(1_699_164_000), est, Dst::No, "EST")
        // 2024-03-10T07:00:00Z
        .transition(at(1_710_054_000), edt, Dst::Yes, "EDT")
        // 2024-11-03T06:00:00Z
        .transition(at(1_730_613_600), est, Dst::No, "EST")
        .build()
        .unwrap()
}

/// A zone with two hour jumps, like Antarctica/Troll: the gap covers
/// local [01:00, 03:00) on 1970-01-01 and the fold covers local
/// [01:00, 03:00) on 1970-06-01.
pub(crate) fn double_gap_and_fold() -> ZoneTable {
    ZoneTable::builder("Test/Troll")
        .initial(Offset::constant(0), Dst::No, "TST")
        .transition(at(3600), Offset::constant(2), Dst::Yes, "TDT")
        // 1970-06-01T01:00:00 local at +02 is 13050000Z.
        .transition(at(13_050_000), Offset::constant(0), Dst::No, "TST")
        .build()
        .unwrap()
}

/// A zone with minute-granular offsets, like America/St_Johns: -03:30
/// standard time with a spring forward to -02:30 at 1970-03-01T02:00:00
/// local.
pub(crate) fn half_hour() -> ZoneTable {
    ZoneTable::builder("Test/HalfHour")
        .initial(Offset::hms(-3, -30, 0), Dst::No, "NST")
        .transition(at(5_117_400), Offset::hms(-2, -30, 0), Dst::Yes, "NDT")
        .build()
        .unwrap()
}
