//! In-memory implementation of the AclStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use page_acl_core::{AclEntry, AclEntryId, NewAclEntry, PageId, PageNode};

use crate::error::{Result, StoreError};
use crate::traits::{AclChange, AclQuery, AclStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Pages indexed by id.
    pages: BTreeMap<PageId, StoredPage>,

    /// ACL entries indexed by id, which keeps them in id order.
    entries: BTreeMap<AclEntryId, AclEntry>,

    /// Last assigned entry id.
    last_entry_id: u64,
}

struct StoredPage {
    node: PageNode,
    sorting: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AclStore for MemoryStore {
    async fn list_acl_entries(&self, query: &AclQuery) -> Result<Vec<AclEntry>> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn get_acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        let inner = self.read()?;
        Ok(inner.entries.get(&id).cloned())
    }

    async fn insert_acl_entry(&self, entry: &NewAclEntry) -> Result<AclEntryId> {
        let mut inner = self.write()?;

        if !inner.pages.contains_key(&entry.page_id) {
            return Err(StoreError::NotFound(format!("page {}", entry.page_id)));
        }

        inner.last_entry_id += 1;
        let id = AclEntryId(inner.last_entry_id);
        inner
            .entries
            .insert(id, AclEntry::from_parts(id, entry.clone()));

        Ok(id)
    }

    async fn apply_changes(&self, changes: &[AclChange]) -> Result<()> {
        let mut inner = self.write()?;

        // Validate the whole batch before touching anything.
        let mut deleted = BTreeSet::new();
        for change in changes {
            let id = change.entry_id();
            if !inner.entries.contains_key(&id) || deleted.contains(&id) {
                return Err(StoreError::NotFound(format!("ACL entry {}", id)));
            }
            match change {
                AclChange::Delete(id) => {
                    deleted.insert(*id);
                }
                AclChange::Update(_, data) => {
                    if !inner.pages.contains_key(&data.page_id) {
                        return Err(StoreError::NotFound(format!("page {}", data.page_id)));
                    }
                }
            }
        }

        for change in changes {
            match change {
                AclChange::Delete(id) => {
                    inner.entries.remove(id);
                }
                AclChange::Update(id, data) => {
                    inner
                        .entries
                        .insert(*id, AclEntry::from_parts(*id, data.clone()));
                }
            }
        }

        Ok(())
    }

    async fn insert_page(&self, page: PageNode, sorting: i64) -> Result<()> {
        let mut inner = self.write()?;

        if inner.pages.contains_key(&page.id) {
            return Err(StoreError::AlreadyExists(format!("page {}", page.id)));
        }
        if let Some(parent) = page.parent_id {
            if !inner.pages.contains_key(&parent) {
                return Err(StoreError::NotFound(format!("parent page {}", parent)));
            }
        }

        inner.pages.insert(
            page.id,
            StoredPage {
                node: page,
                sorting,
            },
        );
        Ok(())
    }

    async fn get_page(&self, id: PageId) -> Result<Option<PageNode>> {
        let inner = self.read()?;
        Ok(inner.pages.get(&id).map(|p| p.node))
    }

    async fn list_child_pages(&self, parent: PageId) -> Result<Vec<PageId>> {
        let inner = self.read()?;

        let mut children: Vec<(i64, PageId)> = inner
            .pages
            .values()
            .filter(|p| p.node.parent_id == Some(parent))
            .map(|p| (p.sorting, p.node.id))
            .collect();

        children.sort();
        Ok(children.into_iter().map(|(_, id)| id).collect())
    }

    async fn get_root_path(&self, page: PageId) -> Result<Vec<PageNode>> {
        let inner = self.read()?;

        let start = inner
            .pages
            .get(&page)
            .ok_or_else(|| StoreError::NotFound(format!("page {}", page)))?;

        let mut path = Vec::new();
        let mut seen = BTreeSet::from([page]);
        let mut next = start.node.parent_id;

        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(StoreError::InvalidData(format!(
                    "parent chain of page {} loops at page {}",
                    page, id
                )));
            }
            let stored = inner
                .pages
                .get(&id)
                .ok_or_else(|| StoreError::InvalidData(format!("dangling parent page {}", id)))?;
            path.push(stored.node);
            next = stored.node.parent_id;
        }

        path.reverse();
        Ok(path)
    }
}
