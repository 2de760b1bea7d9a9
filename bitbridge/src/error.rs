use std::sync::Arc;

use tokio::task::JoinError;

use crate::CellId;

/// The single error type for all bitbridge operations.
///
/// Every fallible API returns `bitbridge::Result<T>` (alias for
/// `Result<T, bitbridge::Error>`). Failures raised by the signal or
/// visualization domain are carried unchanged inside [`Error::External`];
/// the bridge never retries them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("State length {state_len} does not match bank width {width}")]
    Configuration { width: usize, state_len: usize },

    #[error("A bit bank needs at least one cell")]
    ZeroWidth,

    #[error("Bank width {width} exceeds the supported maximum of {max}")]
    TooWide { width: usize, max: usize },

    #[error("Cell id {0} not found")]
    NotFound(CellId),

    #[error("Bit string has length {actual}, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid character {character:?} at position {position} in bit string")]
    InvalidCharacter { character: char, position: usize },

    #[error("Monitor already started")]
    AlreadyStarted,

    #[error("Monitor never started")]
    NotStarted,

    #[error("Change notifier closed")]
    QueueClosed,

    #[error("External error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("Internal bitbridge error {0}")]
    Internal(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    pub(crate) fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Internal(Arc::new(e))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (
                Configuration {
                    width: w1,
                    state_len: s1,
                },
                Configuration {
                    width: w2,
                    state_len: s2,
                },
            ) => w1 == w2 && s1 == s2,
            (ZeroWidth, ZeroWidth) => true,
            (TooWide { width: a, max: m1 }, TooWide { width: b, max: m2 }) => a == b && m1 == m2,
            (NotFound(a), NotFound(b)) => a == b,
            (
                LengthMismatch {
                    expected: e1,
                    actual: a1,
                },
                LengthMismatch {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (
                InvalidCharacter {
                    character: c1,
                    position: p1,
                },
                InvalidCharacter {
                    character: c2,
                    position: p2,
                },
            ) => c1 == c2 && p1 == p2,
            (AlreadyStarted, AlreadyStarted) => true,
            (NotStarted, NotStarted) => true,
            (QueueClosed, QueueClosed) => true,
            (External(a), External(b)) => Arc::ptr_eq(a, b),
            (Internal(a), Internal(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::internal(e)
    }
}
