//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a declarative page tree with
//! ACL entries that loads into any store, and store wrappers that count
//! or break calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use page_acl_core::{AclEntry, AclEntryId, NewAclEntry, PageId, PageNode, Permissions, Subject};
use page_acl_store::{AclChange, AclQuery, AclStore, MemoryStore, Result, StoreError};

/// A page tree with ACL entries, described up front.
///
/// Siblings are sorted in the order they were added. Entries receive ids
/// in the order they were added when loaded into an empty store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSpec {
    pub pages: Vec<PageNode>,
    pub entries: Vec<NewAclEntry>,
}

impl TreeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, id: u64) -> Self {
        self.pages.push(PageNode::root(id));
        self
    }

    pub fn child(mut self, id: u64, parent: u64) -> Self {
        self.pages.push(PageNode::child(id, parent));
        self
    }

    /// Add an entry granting `perms` to `subject` on `page`.
    pub fn grant(mut self, page: u64, subject: Subject, perms: u32, recursive: bool) -> Self {
        self.entries.push(NewAclEntry::new(
            PageId(page),
            subject,
            Permissions(perms),
            recursive,
        ));
        self
    }

    /// Insert pages and entries into `store`, returning the stored entries
    /// in insertion order.
    pub async fn load<S: AclStore + ?Sized>(&self, store: &S) -> Result<Vec<AclEntry>> {
        let mut next_sorting: HashMap<Option<PageId>, i64> = HashMap::new();
        for page in &self.pages {
            let sorting = next_sorting.entry(page.parent_id).or_insert(0);
            store.insert_page(*page, *sorting).await?;
            *sorting += 1;
        }

        let mut stored = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let id = store.insert_acl_entry(entry).await?;
            stored.push(AclEntry::from_parts(id, entry.clone()));
        }
        Ok(stored)
    }

    /// A fresh in-memory store holding this tree.
    pub async fn memory_store(&self) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        self.load(&store).await?;
        Ok(store)
    }
}

/// Store wrapper counting every call that reaches the inner store.
pub struct CountingStore<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S: AclStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: AclStore> AclStore for CountingStore<S> {
    async fn list_acl_entries(&self, query: &AclQuery) -> Result<Vec<AclEntry>> {
        self.hit();
        self.inner.list_acl_entries(query).await
    }

    async fn get_acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        self.hit();
        self.inner.get_acl_entry(id).await
    }

    async fn insert_acl_entry(&self, entry: &NewAclEntry) -> Result<AclEntryId> {
        self.hit();
        self.inner.insert_acl_entry(entry).await
    }

    async fn apply_changes(&self, changes: &[AclChange]) -> Result<()> {
        self.hit();
        self.inner.apply_changes(changes).await
    }

    async fn insert_page(&self, page: PageNode, sorting: i64) -> Result<()> {
        self.hit();
        self.inner.insert_page(page, sorting).await
    }

    async fn get_page(&self, id: PageId) -> Result<Option<PageNode>> {
        self.hit();
        self.inner.get_page(id).await
    }

    async fn list_child_pages(&self, parent: PageId) -> Result<Vec<PageId>> {
        self.hit();
        self.inner.list_child_pages(parent).await
    }

    async fn get_root_path(&self, page: PageId) -> Result<Vec<PageNode>> {
        self.hit();
        self.inner.get_root_path(page).await
    }
}

/// Store wrapper whose reads fail for one page.
///
/// Listing entries or children of `broken` returns an error; everything
/// else passes through.
pub struct FaultyStore<S> {
    inner: S,
    broken: PageId,
}

impl<S: AclStore> FaultyStore<S> {
    pub fn new(inner: S, broken: PageId) -> Self {
        Self { inner, broken }
    }

    fn check(&self, page: Option<PageId>) -> Result<()> {
        if page == Some(self.broken) {
            return Err(StoreError::InvalidData(format!(
                "injected read failure at page {}",
                self.broken
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: AclStore> AclStore for FaultyStore<S> {
    async fn list_acl_entries(&self, query: &AclQuery) -> Result<Vec<AclEntry>> {
        self.check(query.page_id)?;
        self.inner.list_acl_entries(query).await
    }

    async fn get_acl_entry(&self, id: AclEntryId) -> Result<Option<AclEntry>> {
        self.inner.get_acl_entry(id).await
    }

    async fn insert_acl_entry(&self, entry: &NewAclEntry) -> Result<AclEntryId> {
        self.inner.insert_acl_entry(entry).await
    }

    async fn apply_changes(&self, changes: &[AclChange]) -> Result<()> {
        self.inner.apply_changes(changes).await
    }

    async fn insert_page(&self, page: PageNode, sorting: i64) -> Result<()> {
        self.inner.insert_page(page, sorting).await
    }

    async fn get_page(&self, id: PageId) -> Result<Option<PageNode>> {
        self.inner.get_page(id).await
    }

    async fn list_child_pages(&self, parent: PageId) -> Result<Vec<PageId>> {
        self.check(Some(parent))?;
        self.inner.list_child_pages(parent).await
    }

    async fn get_root_path(&self, page: PageId) -> Result<Vec<PageNode>> {
        self.inner.get_root_path(page).await
    }
}
