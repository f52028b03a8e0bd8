//! Error types for ACL resolution.

use page_acl_core::PageId;
use page_acl_store::StoreError;
use thiserror::Error;

/// Errors that abort a resolution pass.
///
/// A failed pass never yields a partial tree.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A store read failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The traversal reached the same page twice.
    #[error("page tree cycle detected at page {0}")]
    Cycle(PageId),
}

/// Result type for resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;
