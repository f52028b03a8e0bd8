//! # Page ACL Store
//!
//! Storage abstraction for ACL rows and the page tree. Provides a
//! trait-based interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The resolver reads through the [`AclStore`] trait and never sees how
//! rows are kept. The primary implementation is [`SqliteStore`], with
//! [`MemoryStore`] for tests and fixtures.
//!
//! ## Key Types
//!
//! - [`AclStore`] - The async trait for all storage operations
//! - [`AclStoreExt`] - Convenience queries built on top of it
//! - [`AclQuery`] - Filter for listing ACL entries
//! - [`AclChange`] - One modification inside an atomic batch
//!
//! ## Usage
//!
//! ```rust,no_run
//! use page_acl_core::{NewAclEntry, PageId, PageNode, Permissions, Subject};
//! use page_acl_store::{AclStore, AclStoreExt, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("acl.db").unwrap();
//!
//!     store.insert_page(PageNode::root(1), 0).await.unwrap();
//!     store
//!         .insert_acl_entry(&NewAclEntry::new(
//!             PageId(1),
//!             Subject::group(5),
//!             Permissions::ALL,
//!             true,
//!         ))
//!         .await
//!         .unwrap();
//!
//!     let entries = store.entries_on_page(PageId(1)).await.unwrap();
//!     assert_eq!(entries.len(), 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Deterministic order**: entries by id, children by sorting key then id
//! - **Atomic batches**: [`AclStore::apply_changes`] applies all or nothing
//! - **Loop detection**: a parent chain that revisits a page is `InvalidData`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AclChange, AclQuery, AclStore, AclStoreExt};
