#![deny(missing_docs)]

//! Error handling for h5x.
//!
//! Every failure in the marshaling layer is a distinct [`H5xError`] variant. Native failures
//! always carry the name of the failing operation and the status code returned by the engine.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{fmt, str};

// Alias so thiserror does not treat the field as a backtrace source, which needs nightly.
type CapturedBacktrace = Backtrace;

/// A string that can be used as an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Direction of a dataset or attribute transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Engine to memory.
    Read,
    /// Memory to engine.
    Write,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// The top-level error type for h5x.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum H5xError {
    /// A value type cannot be mapped to a native type descriptor.
    #[error("unsupported type: {0}")]
    UnsupportedType(ErrString),
    /// The offsets computed for a compound type disagree with its real layout.
    #[error(
        "compound layout mismatch in {type_name}: {context} (expected {expected}, computed {computed})"
    )]
    CompoundLayoutMismatch {
        /// Name of the record type being resolved.
        type_name: ErrString,
        /// What was being compared.
        context: ErrString,
        /// The value taken from the in-memory layout.
        expected: usize,
        /// The value produced by sequential packing.
        computed: usize,
    },
    /// A buffer does not have the shape of the dataspace it is transferred against.
    #[error("shape mismatch: dataspace has shape {expected:?}, buffer has shape {actual:?}")]
    ShapeMismatch {
        /// Shape resolved from the dataspace.
        expected: Vec<u64>,
        /// Shape of the supplied buffer.
        actual: Vec<u64>,
    },
    /// A selection reaches outside the extent of its dataspace.
    #[error("invalid selection: {0}")]
    SelectionInvalid(ErrString),
    /// The engine rejected a hyperslab selection.
    #[error("native hyperslab selection failed with status {status}")]
    SelectionFailed {
        /// Native status code.
        status: i64,
    },
    /// The engine failed a dataset or attribute transfer.
    #[error("native {direction} failed with status {status}")]
    TransferFailed {
        /// Whether the transfer was a read or a write.
        direction: Direction,
        /// Native status code.
        status: i64,
    },
    /// The engine failed to reclaim variable-length memory.
    #[error("native variable-length reclaim failed with status {status}")]
    ReclaimFailed {
        /// Native status code.
        status: i64,
    },
    /// Any other native primitive returned an error status.
    #[error("native call {op} failed with status {status}")]
    Native {
        /// Name of the native primitive.
        op: &'static str,
        /// Native status code.
        status: i64,
    },
    /// A borrowed (built-in) descriptor was about to be mutated.
    #[error("descriptor is immutable: {0}")]
    ImmutableDescriptor(ErrString),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, CapturedBacktrace),
    /// String data read from the engine is not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] str::Utf8Error),
}

impl H5xError {
    /// The native status code carried by this error, if it came from the engine.
    pub fn native_status(&self) -> Option<i64> {
        match self {
            H5xError::SelectionFailed { status }
            | H5xError::TransferFailed { status, .. }
            | H5xError::ReclaimFailed { status }
            | H5xError::Native { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Debug for H5xError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return H5xErrors as their error type.
pub type H5xResult<T> = Result<T, H5xError>;

/// A trait for unwrapping an H5xResult where the error is an invariant violation.
pub trait H5xExpect {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (invariant
    /// violation).
    fn h5x_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> H5xExpect for Result<T, E>
where
    E: Into<H5xError>,
{
    type Output = T;

    #[inline(always)]
    fn h5x_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| h5x_panic!("{msg}: {e}"))
    }
}

impl<T> H5xExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn h5x_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| h5x_panic!("{msg}"))
    }
}

/// Construct an [`H5xError`] from a variant name and a format string.
#[macro_export]
macro_rules! h5x_err {
    (UnsupportedType: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use(
            $crate::H5xError::UnsupportedType(format!($fmt, $($arg),*).into())
        )
    };
    (SelectionInvalid: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use(
            $crate::H5xError::SelectionInvalid(format!($fmt, $($arg),*).into())
        )
    };
    (ImmutableDescriptor: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::__private::must_use(
            $crate::H5xError::ImmutableDescriptor(format!($fmt, $($arg),*).into())
        )
    };
    (Native: $op:expr, $status:expr $(,)?) => {
        $crate::__private::must_use($crate::H5xError::Native {
            op: $op,
            status: i64::from($status),
        })
    };
    (InvalidArgument: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::H5xError::InvalidArgument(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::h5x_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// Return early from a function with an [`H5xError`].
#[macro_export]
macro_rules! h5x_bail {
    ($($tt:tt)+) => {
        return Err($crate::h5x_err!($($tt)+))
    };
}

/// Panic with an [`H5xError`] built from a format string.
#[macro_export]
macro_rules! h5x_panic {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err = $crate::h5x_err!($fmt, $($arg),*);
        panic!("{}", err)
    }};
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn must_use(error: crate::H5xError) -> crate::H5xError {
        error
    }
}
