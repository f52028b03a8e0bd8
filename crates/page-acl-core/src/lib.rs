//! # Page ACL Core
//!
//! Pure value types for inheritance-aware page permissions.
//!
//! This crate contains no I/O and no storage. It defines what an ACL entry
//! is, what a resolved permission set looks like, and how raw identifiers
//! from callers are validated.
//!
//! ## Key Types
//!
//! - [`AclEntry`] - A stored grant of a permission bitmask to a user or group on a page
//! - [`SubjectType`] / [`Subject`] - Who an entry grants permissions to
//! - [`Permissions`] - The granted bitmask
//! - [`AclSet`] - One winning entry per subject
//! - [`EffectiveAclSet`] - Resolved permissions of one page plus summary counts
//! - [`AclTree`] - Effective sets for every page of a subtree

pub mod acl;
pub mod effective;
pub mod error;
pub mod types;
pub mod validation;

pub use acl::{AclEntry, AppliedAcl, NewAclEntry, PageNode, Permissions, Subject, SubjectType};
pub use effective::{
    AclMeta, AclMetaCounts, AclSet, AclTree, AncestorAclSet, EffectiveAclSet, SubjectFilter,
};
pub use error::ValidationError;
pub use types::{AclEntryId, PageId, SubjectId};
pub use validation::{parse_entry_id, parse_page_id};
