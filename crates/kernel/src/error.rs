//! Engine error types.

use std::fmt;

use thiserror::Error;

/// Stable machine-readable codes attached to [`BagError::InvalidArgument`].
///
/// The string form is part of the public contract: callers match on it,
/// so variants may be added but existing strings never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A strictly validated uid list contained a malformed token.
    MalformedUidList,
    /// A single uid argument was zero or negative.
    NonPositiveUid,
    /// A time-frame key is not one of the known windows.
    UnknownTimeFrame,
    /// A sort expression referenced a column the entity cannot sort by.
    UnknownSortColumn,
    /// A limit specification was not `count` or `offset,count`.
    MalformedLimit,
    /// A price bound was negative.
    NegativePrice,
    /// An age was negative.
    NegativeAge,
    /// An event status key is not known.
    UnknownStatus,
}

impl ErrorCode {
    /// Stable string form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MalformedUidList => "malformed_uid_list",
            ErrorCode::NonPositiveUid => "non_positive_uid",
            ErrorCode::UnknownTimeFrame => "unknown_time_frame",
            ErrorCode::UnknownSortColumn => "unknown_sort_column",
            ErrorCode::MalformedLimit => "malformed_limit",
            ErrorCode::NegativePrice => "negative_price",
            ErrorCode::NegativeAge => "negative_age",
            ErrorCode::UnknownStatus => "unknown_status",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store failure: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors raised by bag builders and bags.
#[derive(Debug, Error)]
pub enum BagError {
    #[error("invalid argument [{code}]: {message}")]
    InvalidArgument { code: ErrorCode, message: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BagError {
    /// Shorthand for an [`BagError::InvalidArgument`].
    pub fn invalid_argument(code: ErrorCode, message: impl Into<String>) -> Self {
        BagError::InvalidArgument {
            code,
            message: message.into(),
        }
    }

    /// The stable code, if this is an argument error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            BagError::InvalidArgument { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using BagError.
pub type BagResult<T> = Result<T, BagError>;
