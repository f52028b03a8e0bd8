//! # Page ACL Resolve
//!
//! Computes effective, inheritance-aware permissions for a page tree.
//!
//! ## Overview
//!
//! Permissions are never stored per page. They are derived from ACL entries
//! scattered across the tree:
//!
//! 1. [`resolve_ancestor_acls`] collects the recursive grants on the root
//!    path of a starting page.
//! 2. [`resolve_tree`] walks the starting page and every descendant,
//!    merging each page's own entries with what it inherits.
//! 3. [`merge_page`] holds the precedence rules used at every page.
//!
//! ## Precedence
//!
//! - A non-recursive entry wins on its own page and is never passed down.
//! - A recursive entry wins on its page unless a non-recursive entry for
//!   the same subject sits next to it, and always becomes what children
//!   inherit.
//! - A nearer recursive entry replaces a farther one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use page_acl_core::{PageId, Subject, SubjectFilter};
//! use page_acl_resolve::{AclResolver, AncestorPrecedence};
//! use page_acl_store::MemoryStore;
//!
//! async fn example(store: &MemoryStore) {
//!     let resolver = AclResolver::new(store, AncestorPrecedence::Nearest);
//!
//!     let tree = resolver.tree(PageId(1), &SubjectFilter::any()).await.unwrap();
//!     let perms = tree.permissions(PageId(2), Subject::group(5));
//! }
//! ```

pub mod ancestor;
pub mod error;
pub mod merge;
pub mod resolver;
pub mod tree;

pub use ancestor::{resolve_ancestor_acls, AncestorPrecedence};
pub use error::{ResolveError, Result};
pub use merge::{merge_page, PageMerge};
pub use resolver::AclResolver;
pub use tree::resolve_tree;
