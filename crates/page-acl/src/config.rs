//! Service configuration.

use std::path::Path;

use page_acl_core::ValidationError;
use page_acl_resolve::AncestorPrecedence;
use serde::{Deserialize, Serialize};

/// Configuration for the ACL service.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Name of the entity kind holding ACL entries. Mutations are only
    /// authorized against this table.
    pub acl_table: String,
    /// Show the user/group selector in the overview. When off, every
    /// subject counts as selected.
    pub enable_filter_selector: bool,
    /// Passed through to the overview for the caller's UI.
    pub disable_old_permission_system: bool,
    /// Which ancestor's recursive grant a subtree inherits.
    pub ancestor_precedence: AncestorPrecedence,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            acl_table: "page_acl".to_string(),
            enable_filter_selector: false,
            disable_old_permission_system: false,
            ancestor_precedence: AncestorPrecedence::default(),
        }
    }
}

impl AclConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.acl_table.trim().is_empty() {
            return Err(ValidationError::InvalidConfig(
                "acl_table must not be empty".into(),
            ));
        }
        Ok(())
    }
}
