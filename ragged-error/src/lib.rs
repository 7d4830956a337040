#![deny(missing_docs)]

//! The error type and result alias shared by every crate in the workspace.
//!
//! Errors are cheap to construct and carry a formatted message. The
//! [`ragged_err!`] and [`ragged_bail!`] macros are the preferred way to
//! build them: `ragged_bail!("bad {}", thing)` produces an
//! `InvalidArgument`, while `ragged_bail!(ValidityError: "bad {}", thing)`
//! selects the kind explicitly.

use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};

/// A string that is either a static literal or an owned formatted message.
#[derive(Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// The errors that operations over ragged arrays can produce.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RaggedError {
    /// A node violates one of its structural invariants (bad index, short
    /// child, non-monotone offsets, length mismatch).
    #[error("validity error: {0}")]
    ValidityError(ErrString),
    /// The caller supplied an ill-formed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrString),
    /// The operation does not apply to this node variant. Reaching one of
    /// these through the public slicing pipeline indicates a caller bug.
    #[error("unsupported operation: {0}")]
    Unsupported(ErrString),
    /// A bounded structure outgrew its representation, e.g. a union with
    /// more than 127 arms.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(ErrString),
    /// An invariant the library itself relies on was violated.
    #[error("internal error: {0}")]
    Internal(ErrString),
}

/// The result alias used throughout the workspace.
pub type RaggedResult<T> = Result<T, RaggedError>;

/// Construct a [`RaggedError`] from a format string.
///
/// An optional leading `Kind:` token selects the error kind; without one
/// the error is an `InvalidArgument`.
#[macro_export]
macro_rules! ragged_err {
    (ValidityError: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::ValidityError(format!($fmt $(, $arg)*).into())
    };
    (InvalidArgument: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::InvalidArgument(format!($fmt $(, $arg)*).into())
    };
    (Unsupported: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::Unsupported(format!($fmt $(, $arg)*).into())
    };
    (CapacityExceeded: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::CapacityExceeded(format!($fmt $(, $arg)*).into())
    };
    (Internal: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::Internal(format!($fmt $(, $arg)*).into())
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::RaggedError::InvalidArgument(format!($fmt $(, $arg)*).into())
    };
}

/// Return early with a [`RaggedError`] built by [`ragged_err!`].
#[macro_export]
macro_rules! ragged_bail {
    ($($tt:tt)+) => {
        return Err($crate::ragged_err!($($tt)+))
    };
}

/// Panic with a [`RaggedError`]. Reserved for unrecoverable internal states.
#[macro_export]
macro_rules! ragged_panic {
    ($($tt:tt)+) => {{
        let err = $crate::ragged_err!($($tt)+);
        panic!("{}", err)
    }};
}

#[cfg(test)]
mod test {
    use crate::RaggedError;

    fn fallible(limit: usize) -> crate::RaggedResult<usize> {
        if limit > 127 {
            ragged_bail!(CapacityExceeded: "{} arms is more than 127", limit);
        }
        Ok(limit)
    }

    #[test]
    fn bail_selects_kind() {
        assert!(matches!(
            fallible(128),
            Err(RaggedError::CapacityExceeded(_))
        ));
        assert!(matches!(fallible(5), Ok(5)));
    }

    #[test]
    fn default_kind_is_invalid_argument() {
        let err = ragged_err!("axis {} out of range", -3);
        assert!(matches!(err, RaggedError::InvalidArgument(_)));
        assert_eq!(
            err.to_string(),
            "invalid argument: axis -3 out of range"
        );
    }
}
