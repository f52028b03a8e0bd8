//! Error types for page ACL core values.

use thiserror::Error;

/// Input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No entry id was supplied, or it was empty or zero.
    #[error("no ACL id given")]
    MissingEntryId,

    /// The supplied entry id is not a plain non-negative integer.
    #[error("invalid ACL id: {0:?}")]
    InvalidEntryId(String),

    /// A page id that must be positive was not.
    #[error("invalid page id: {0:?}")]
    InvalidPageId(String),

    #[error("unknown subject type code: {0}")]
    UnknownSubjectType(i64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
