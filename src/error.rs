use alloc::{boxed::Box, sync::Arc};

use crate::{civil::DateTime, tz::Offset};

/// Creates a new ad hoc error via `format_args!`.
macro_rules! err {
    ($($tt:tt)*) => {{
        crate::error::Error::adhoc(format_args!($($tt)*))
    }}
}

pub(crate) use err;

/// An error that can occur in this crate.
///
/// Most errors are a result of a value being out of range, but the time
/// zone machinery produces a few kinds that callers may want to
/// distinguish:
///
/// * A civil datetime that was skipped by a forward time zone transition.
///   See [`Error::is_skipped_time`].
/// * A civil datetime repeated by a backward transition, when resolved via
///   a strict query. See [`Error::is_ambiguous_time`].
/// * Malformed binary time zone data. See [`Error::is_invalid_zone_data`].
/// * A time zone ID missing from a database. See [`Error::is_unknown_zone`].
///
/// # Design
///
/// This crate follows the "one true error type" pattern: a single opaque
/// error for all operations, with coarse predicates instead of an exposed
/// kind enum. Finer grained error types compose poorly across a crate where
/// nearly every fallible routine can be a step in a larger computation.
#[derive(Clone)]
pub struct Error {
    /// The internal representation of an error.
    ///
    /// The `Arc` makes an `Error` cheap to clone and keeps its size to one
    /// word, which matters because many hot routines in this crate return
    /// `Result<T, Error>`.
    inner: Arc<ErrorInner>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

#[derive(Debug)]
enum ErrorKind {
    /// A free-form error message.
    Adhoc(Box<str>),
    /// A value that is out of its permitted range.
    Range { what: &'static str, given: i128, min: i128, max: i128 },
    /// A civil datetime that falls in a fold and was resolved strictly.
    AmbiguousTime {
        zone_id: Box<str>,
        datetime: DateTime,
        earlier: Offset,
        later: Offset,
    },
    /// A civil datetime that falls in a gap.
    SkippedTime {
        zone_id: Box<str>,
        datetime: DateTime,
        before: Offset,
        after: Offset,
    },
    /// Malformed or truncated binary time zone data.
    InvalidZoneData(Box<str>),
    /// A zone ID that isn't present in a time zone database.
    UnknownZone(Box<str>),
}

impl Error {
    /// Returns true when this error is the result of a value being out of
    /// its supported range.
    pub fn is_range(&self) -> bool {
        matches!(self.root().kind(), ErrorKind::Range { .. })
    }

    /// Returns true when this error came from strictly resolving a civil
    /// datetime that is ambiguous in its time zone (a fold).
    pub fn is_ambiguous_time(&self) -> bool {
        matches!(self.root().kind(), ErrorKind::AmbiguousTime { .. })
    }

    /// Returns true when this error came from resolving a civil datetime
    /// that doesn't exist in its time zone (a gap).
    pub fn is_skipped_time(&self) -> bool {
        matches!(self.root().kind(), ErrorKind::SkippedTime { .. })
    }

    /// Returns true when this error came from decoding malformed binary
    /// time zone data.
    ///
    /// This is always distinguishable from [`Error::is_unknown_zone`]: a
    /// corrupt zone block is fatal for that zone, while an unknown ID is an
    /// ordinary lookup miss.
    pub fn is_invalid_zone_data(&self) -> bool {
        matches!(self.root().kind(), ErrorKind::InvalidZoneData(_))
    }

    /// Returns true when this error came from looking up a zone ID that a
    /// time zone database doesn't contain.
    pub fn is_unknown_zone(&self) -> bool {
        matches!(self.root().kind(), ErrorKind::UnknownZone(_))
    }
}

impl Error {
    pub(crate) fn adhoc<'a>(message: core::fmt::Arguments<'a>) -> Error {
        use alloc::string::ToString;

        Error::from(ErrorKind::Adhoc(message.to_string().into_boxed_str()))
    }

    /// Creates a new error indicating that a `given` value is out of the
    /// specified `min..=max` range. The given `what` label is used in the
    /// error message as a human readable description of what exactly is
    /// out of range. (e.g., "seconds")
    #[inline(never)]
    #[cold]
    pub(crate) fn range(
        what: &'static str,
        given: impl Into<i128>,
        min: impl Into<i128>,
        max: impl Into<i128>,
    ) -> Error {
        Error::from(ErrorKind::Range {
            what,
            given: given.into(),
            min: min.into(),
            max: max.into(),
        })
    }

    #[inline(never)]
    #[cold]
    pub(crate) fn ambiguous_time(
        zone_id: &str,
        datetime: DateTime,
        earlier: Offset,
        later: Offset,
    ) -> Error {
        Error::from(ErrorKind::AmbiguousTime {
            zone_id: zone_id.into(),
            datetime,
            earlier,
            later,
        })
    }

    #[inline(never)]
    #[cold]
    pub(crate) fn skipped_time(
        zone_id: &str,
        datetime: DateTime,
        before: Offset,
        after: Offset,
    ) -> Error {
        Error::from(ErrorKind::SkippedTime {
            zone_id: zone_id.into(),
            datetime,
            before,
            after,
        })
    }

    #[inline(never)]
    #[cold]
    pub(crate) fn invalid_zone_data<'a>(
        message: core::fmt::Arguments<'a>,
    ) -> Error {
        use alloc::string::ToString;

        Error::from(ErrorKind::InvalidZoneData(
            message.to_string().into_boxed_str(),
        ))
    }

    #[inline(never)]
    #[cold]
    pub(crate) fn unknown_zone(zone_id: &str) -> Error {
        Error::from(ErrorKind::UnknownZone(zone_id.into()))
    }

    /// Contextualizes this error with the consequent error given.
    ///
    /// In other words, "consequent is caused by self."
    pub(crate) fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        let inner = Arc::get_mut(&mut err.inner)
            .expect("newly created consequent error has one reference");
        assert!(inner.cause.is_none(), "cause of consequent must be `None`");
        inner.cause = Some(self);
        err
    }

    /// Returns the root error in this chain.
    fn root(&self) -> &Error {
        // OK because `Error::chain` is guaranteed to return a non-empty
        // iterator.
        self.chain().last().unwrap()
    }

    /// Returns a chain of error values, starting with the highest level
    /// context and ending with the root cause.
    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = Some(self);
        core::iter::from_fn(move || {
            let this = err?;
            err = this.inner.cause.as_ref();
            Some(this)
        })
    }

    fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            f.debug_struct("Error")
                .field("kind", &self.inner.kind)
                .field("cause", &self.inner.cause)
                .finish()
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::Adhoc(ref message) => f.write_str(message),
            ErrorKind::Range { what, given, min, max } => {
                write!(
                    f,
                    "parameter '{what}' with value {given} \
                     is not in the required range of {min}..={max}",
                )
            }
            ErrorKind::AmbiguousTime {
                ref zone_id,
                datetime,
                earlier,
                later,
            } => {
                write!(
                    f,
                    "civil datetime {datetime} is ambiguous in time zone \
                     {zone_id} since it falls in a fold between offsets \
                     {earlier} and {later}",
                )
            }
            ErrorKind::SkippedTime {
                ref zone_id,
                datetime,
                before,
                after,
            } => {
                write!(
                    f,
                    "civil datetime {datetime} does not exist in time zone \
                     {zone_id} since it falls in a gap between offsets \
                     {before} and {after}",
                )
            }
            ErrorKind::InvalidZoneData(ref message) => {
                write!(f, "invalid time zone data: {message}")
            }
            ErrorKind::UnknownZone(ref zone_id) => {
                write!(
                    f,
                    "failed to find time zone `{zone_id}` in time zone \
                     database",
                )
            }
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { inner: Arc::new(ErrorInner { kind, cause: None }) }
    }
}

/// A simple trait to encapsulate automatic conversion to `Error`.
///
/// This trait exists to make `Error::context` work without public `From`
/// impls, which would otherwise become part of the crate's API.
pub(crate) trait IntoError {
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    fn into_error(self) -> Error {
        self
    }
}

/// A trait for contextualizing error values.
///
/// This makes it easy to contextualize either `Error` or
/// `Result<T, Error>`. Specifically, in the latter case, it absolves one of
/// the need to call `map_err` everywhere one wants to add context to an
/// error. This trick was borrowed from `anyhow`.
pub(crate) trait ErrorContext<T> {
    /// Contextualize the given consequent error with this (`self`) error as
    /// the cause.
    fn context(self, consequent: impl IntoError) -> Result<T, Error>;

    /// Like `context`, but hides error construction within a closure.
    ///
    /// This is useful when the creation of the consequent error is
    /// potentially costly (it allocates). The closure avoids paying for
    /// contextual error creation in the happy path.
    fn with_context<C: IntoError>(
        self,
        consequent: impl FnOnce() -> C,
    ) -> Result<T, Error>;
}

impl<T> ErrorContext<T> for Result<T, Error> {
    fn context(self, consequent: impl IntoError) -> Result<T, Error> {
        self.map_err(|err| err.context_impl(consequent.into_error()))
    }

    fn with_context<C: IntoError>(
        self,
        consequent: impl FnOnce() -> C,
    ) -> Result<T, Error> {
        self.map_err(|err| err.context_impl(consequent().into_error()))
    }
}
