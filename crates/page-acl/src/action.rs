//! Action routing for form-style requests.
//!
//! Requests carry an action name plus string parameters. Only actions this
//! crate knows are parsed; everything else comes back as
//! [`AclError::UnsupportedAction`] so the caller can route it elsewhere.

use std::collections::BTreeMap;

use page_acl_core::{parse_page_id, PageId};
use serde::Serialize;

use crate::error::{AclError, Result};
use crate::gateway::DeleteAck;

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclAction {
    /// Delete one ACL entry. The id is kept raw and validated on dispatch.
    DeleteAcl { page: PageId, raw_id: Option<String> },
}

impl AclAction {
    pub const DELETE_ACL: &'static str = "delete_acl";

    /// Parse an action name and its parameters.
    ///
    /// Every action needs a positive `page` parameter.
    pub fn parse(name: &str, params: &BTreeMap<String, String>) -> Result<Self> {
        let page = parse_page_id(params.get("page").map(String::as_str))
            .map_err(|_| AclError::UnsupportedAction(format!("{name} without a page")))?;

        match name {
            Self::DELETE_ACL => Ok(AclAction::DeleteAcl {
                page,
                raw_id: params.get("acl").cloned(),
            }),
            other => Err(AclError::UnsupportedAction(other.to_string())),
        }
    }

    pub fn page(&self) -> PageId {
        match self {
            AclAction::DeleteAcl { page, .. } => *page,
        }
    }
}

/// Response body of a handled action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse {
    Deleted(DeleteAck),
}

impl ActionResponse {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_delete() {
        let action =
            AclAction::parse("delete_acl", &params(&[("page", "4"), ("acl", "12")])).unwrap();
        assert_eq!(
            action,
            AclAction::DeleteAcl {
                page: PageId(4),
                raw_id: Some("12".into())
            }
        );
        assert_eq!(action.page(), PageId(4));

        // A missing id is left for the handler to reject.
        let action = AclAction::parse("delete_acl", &params(&[("page", "4")])).unwrap();
        assert!(matches!(action, AclAction::DeleteAcl { raw_id: None, .. }));
    }

    #[test]
    fn test_unhandled_actions() {
        for (name, pairs) in [
            ("change_owner", vec![("page", "4")]),
            ("delete_acl", vec![("acl", "12")]),
            ("delete_acl", vec![("page", "0"), ("acl", "12")]),
            ("delete_acl", vec![("page", "x"), ("acl", "12")]),
        ] {
            let err = AclAction::parse(name, &params(&pairs)).unwrap_err();
            assert!(matches!(err, AclError::UnsupportedAction(_)), "{name} {pairs:?}");
        }
    }

    #[test]
    fn test_response_json_is_bare_ack() {
        let json = ActionResponse::Deleted(DeleteAck::deleted()).to_json().unwrap();
        assert_eq!(json, r#"{"title":"Success","message":"ACL entry deleted"}"#);
    }
}
