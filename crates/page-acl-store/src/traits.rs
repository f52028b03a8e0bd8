//! Store trait: the abstract interface for ACL rows and the page tree.
//!
//! The resolver only ever reads through this trait. Writes go through
//! [`AclStore::apply_changes`] so a batch of modifications lands in one
//! transaction.

use async_trait::async_trait;
use page_acl_core::{AclEntry, AclEntryId, NewAclEntry, PageId, PageNode, SubjectType};

use crate::error::Result;

/// Filter for [`AclStore::list_acl_entries`].
///
/// Every `None` field matches anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AclQuery {
    pub page_id: Option<PageId>,
    pub subject_type: Option<SubjectType>,
    pub recursive: Option<bool>,
}

impl AclQuery {
    /// Match every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Entries attached to one page.
    pub fn on_page(page_id: PageId) -> Self {
        Self {
            page_id: Some(page_id),
            ..Self::default()
        }
    }

    /// Recursive entries attached to one page.
    pub fn recursive_on_page(page_id: PageId) -> Self {
        Self::on_page(page_id).with_recursive(true)
    }

    /// Entries granted to one subject type.
    pub fn of_type(subject_type: SubjectType) -> Self {
        Self {
            subject_type: Some(subject_type),
            ..Self::default()
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Whether an entry passes the filter.
    pub fn matches(&self, entry: &AclEntry) -> bool {
        self.page_id.map_or(true, |p| entry.page_id == p)
            && self.subject_type.map_or(true, |t| entry.subject_type == t)
            && self.recursive.map_or(true, |r| entry.recursive == r)
    }
}

/// One modification of a stored ACL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclChange {
    /// Remove the entry.
    Delete(AclEntryId),
    /// Replace the entry's field values, keeping its id.
    Update(AclEntryId, NewAclEntry),
}

impl AclChange {
    pub fn entry_id(&self) -> AclEntryId {
        match self {
            AclChange::Delete(id) | AclChange::Update(id, _) => *id,
        }
    }
}

/// The store trait: async interface for ACL rows and the page tree.
///
/// All methods are async to support both blocking (SQLite) and in-memory
/// backends. The SQLite backend moves work onto `spawn_blocking`.
///
/// # Ordering
///
/// - ACL entries come back ordered by entry id.
/// - Child pages come back ordered by their sorting key, then page id.
/// - Root paths come back root first.
#[async_trait]
pub trait AclStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // ACL Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// List ACL entries passing the filter, ordered by id.
    async fn list_acl_entries(&self, query: &AclQuery) -> Result<Vec<AclEntry>>;

    /// Get one ACL entry by id.
    async fn get_acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>>;

    /// Insert a new ACL entry and return its assigned id.
    ///
    /// Fails with `NotFound` if the target page does not exist.
    async fn insert_acl_entry(&self, entry: &NewAclEntry) -> Result<AclEntryId>;

    /// Apply a batch of changes atomically.
    ///
    /// Either every change is applied or none is. A change naming a
    /// missing entry fails the whole batch with `NotFound`.
    async fn apply_changes(&self, changes: &[AclChange]) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Page Tree Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a page. `sorting` orders it among its siblings.
    ///
    /// Fails with `AlreadyExists` for a duplicate id and with `NotFound`
    /// if the parent does not exist.
    async fn insert_page(&self, page: PageNode, sorting: i64) -> Result<()>;

    /// Get a page by id.
    async fn get_page(&self, id: PageId) -> Result<Option<PageNode>>;

    /// Direct children of a page, ordered by sorting key then id.
    async fn list_child_pages(&self, parent: PageId) -> Result<Vec<PageId>>;

    /// Ancestors of a page from the root down to its parent, excluding the
    /// page itself.
    ///
    /// Fails with `NotFound` for an unknown page and with `InvalidData` if
    /// the parent chain loops.
    async fn get_root_path(&self, page: PageId) -> Result<Vec<PageNode>>;
}

/// Extension trait for common store patterns.
#[async_trait]
pub trait AclStoreExt: AclStore {
    /// Every entry attached directly to a page.
    async fn entries_on_page(&self, page_id: PageId) -> Result<Vec<AclEntry>>;

    /// Recursive entries attached directly to a page.
    async fn recursive_entries_on_page(&self, page_id: PageId) -> Result<Vec<AclEntry>>;

    /// Delete a single entry.
    async fn delete_acl_entry(&self, id: AclEntryId) -> Result<()>;

    /// Replace a single entry's field values.
    async fn update_acl_entry(&self, id: AclEntryId, entry: &NewAclEntry) -> Result<()>;
}

#[async_trait]
impl<S: AclStore + ?Sized> AclStoreExt for S {
    async fn entries_on_page(&self, page_id: PageId) -> Result<Vec<AclEntry>> {
        self.list_acl_entries(&AclQuery::on_page(page_id)).await
    }

    async fn recursive_entries_on_page(&self, page_id: PageId) -> Result<Vec<AclEntry>> {
        self.list_acl_entries(&AclQuery::recursive_on_page(page_id))
            .await
    }

    async fn delete_acl_entry(&self, id: AclEntryId) -> Result<()> {
        self.apply_changes(&[AclChange::Delete(id)]).await
    }

    async fn update_acl_entry(&self, id: AclEntryId, entry: &NewAclEntry) -> Result<()> {
        self.apply_changes(&[AclChange::Update(id, entry.clone())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_acl_core::{Permissions, Subject};

    fn entry(page: u64, subject: Subject, recursive: bool) -> AclEntry {
        AclEntry::from_parts(
            AclEntryId(1),
            NewAclEntry::new(PageId(page), subject, Permissions::ALL, recursive),
        )
    }

    #[test]
    fn test_query_matches() {
        let e = entry(3, Subject::group(5), true);

        assert!(AclQuery::all().matches(&e));
        assert!(AclQuery::on_page(PageId(3)).matches(&e));
        assert!(!AclQuery::on_page(PageId(4)).matches(&e));
        assert!(AclQuery::recursive_on_page(PageId(3)).matches(&e));
        assert!(!AclQuery::on_page(PageId(3)).with_recursive(false).matches(&e));
        assert!(AclQuery::of_type(SubjectType::Group).matches(&e));
        assert!(!AclQuery::of_type(SubjectType::User).matches(&e));
    }
}
