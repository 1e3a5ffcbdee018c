/*!
Civil (wall-clock) datetime types.

The types in this module represent "naive" time: a reading you'd see on a
calendar and a clock on the wall, with no time zone or UTC offset attached.
A civil datetime only becomes a precise point in time once it is resolved
through a [`TimeZone`](crate::tz::TimeZone), and that resolution is where
all of the interesting failure modes live. See
[`TimeZone::map_local`](crate::tz::TimeZone::map_local).

The calendar is the proleptic Gregorian calendar, limited to the years
`-9999..=9999`. Conversion between dates and a linear day count (days since
the Unix epoch) is provided by [`Date::to_epoch_day`] and
[`Date::from_epoch_day`]; this linear view is the only calendar interface
the time zone engine consumes.
*/

pub use self::{date::Date, datetime::DateTime, time::Time};

mod date;
pub(crate) mod datetime;
mod time;
