//! # Page ACL
//!
//! Effective page permissions from inherited access-control entries, and
//! an authorized gateway for changing those entries.
//!
//! ## Overview
//!
//! Pages form a tree. An ACL entry grants a user or a group a permission
//! bitmask on one page:
//!
//! - **Recursive** entries apply to the page and everything below it, until
//!   a closer entry for the same subject takes over.
//! - **Non-recursive** entries apply to their page only and win there over
//!   any recursive grant.
//!
//! Resolution walks the tree once, depth first, and returns an [`AclTree`]
//! holding the winning entry per subject for every page plus summary
//! counts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use page_acl::{AclConfig, AclService, ActingSubject, PageId, SubjectId, SubjectType};
//! use page_acl::store::SqliteStore;
//!
//! async fn example() -> page_acl::Result<()> {
//!     let store = SqliteStore::open("acl.db")?;
//!     let service = AclService::new(store, AclConfig::default());
//!
//!     // What may group 5 do on page 12?
//!     let perms = service
//!         .get_effective_permissions(PageId(12), SubjectType::Group, SubjectId(5))
//!         .await?;
//!     println!("{perms:?}");
//!
//!     // Remove an entry on behalf of an administrator.
//!     let ack = service
//!         .delete_acl_entry(Some("42"), &ActingSubject::admin(1))
//!         .await?;
//!     println!("{}", ack.message);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `page_acl::core` - Core types (AclEntry, Permissions, AclTree, etc.)
//! - `page_acl::store` - Storage abstraction, SQLite and in-memory stores
//! - `page_acl::resolve` - Ancestor and tree resolvers

pub mod action;
pub mod config;
pub mod error;
pub mod gateway;
pub mod overview;
pub mod service;

// Re-export component crates
pub use page_acl_core as core;
pub use page_acl_resolve as resolve;
pub use page_acl_store as store;

// Re-export main types for convenience
pub use action::{AclAction, ActionResponse};
pub use config::AclConfig;
pub use error::{AclError, AuthorizationError, Result};
pub use gateway::{
    ActingSubject, Command, CommandMap, DeleteAck, MutationEngine, MutationGateway,
    RecordAuthorizer, StoreAuthorizer, StoreMutationEngine,
};
pub use overview::{AclOverview, SubjectOption, SubjectSelection};
pub use service::AclService;

// Re-export commonly used core types
pub use page_acl_core::{
    AclEntry, AclEntryId, AclTree, EffectiveAclSet, NewAclEntry, PageId, PageNode, Permissions,
    Subject, SubjectId, SubjectType,
};
pub use page_acl_resolve::AncestorPrecedence;
