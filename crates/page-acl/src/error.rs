//! Error types for the ACL service.

use page_acl_core::ValidationError;
use page_acl_resolve::ResolveError;
use page_acl_store::StoreError;
use thiserror::Error;

/// A mutation refused by the gateway before anything was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct AuthorizationError {
    pub reason: String,
}

impl AuthorizationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during ACL service operations.
#[derive(Debug, Error)]
pub enum AclError {
    /// Caller input rejected before any store access.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Gateway refused the mutation.
    #[error("not authorized: {0}")]
    Authorization(#[from] AuthorizationError),

    /// The mutation engine failed after authorization passed.
    #[error("mutation rejected: {0}")]
    MutationRejected(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Resolution error.
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Action name or parameters this service does not handle.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
}

impl AclError {
    /// HTTP-style status class for the error.
    pub fn status(&self) -> u16 {
        match self {
            AclError::Validation(_) => 400,
            AclError::Authorization(_) | AclError::MutationRejected(_) => 403,
            AclError::UnsupportedAction(_) => 404,
            AclError::Store(StoreError::NotFound(_))
            | AclError::Resolve(ResolveError::Store(StoreError::NotFound(_))) => 404,
            AclError::Store(_) | AclError::Resolve(_) => 500,
        }
    }
}

/// Result type for ACL service operations.
pub type Result<T> = std::result::Result<T, AclError>;

#[cfg(test)]
mod tests {
    use super::*;
    use page_acl_core::PageId;

    #[test]
    fn test_status_classes() {
        assert_eq!(AclError::from(ValidationError::MissingEntryId).status(), 400);
        assert_eq!(AclError::from(AuthorizationError::new("nope")).status(), 403);
        assert_eq!(AclError::MutationRejected("gone".into()).status(), 403);
        assert_eq!(AclError::UnsupportedAction("edit".into()).status(), 404);
        assert_eq!(AclError::from(StoreError::NotFound("page 9".into())).status(), 404);
        assert_eq!(AclError::from(ResolveError::Cycle(PageId(3))).status(), 500);
        assert_eq!(
            AclError::from(StoreError::LockPoisoned("x".into())).status(),
            500
        );
    }

    #[test]
    fn test_authorization_message_is_reason() {
        let err = AclError::from(AuthorizationError::new("table is read-only"));
        assert_eq!(err.to_string(), "not authorized: table is read-only");
    }
}
