//! Depth-first resolution of a whole subtree.
//!
//! The walk uses an explicit stack, so tree depth is bounded by memory
//! rather than by the call stack. Pages are visited root to leaf and
//! siblings in store order. Each child receives its own copy of the set its
//! parent propagates, so siblings never observe each other's entries.

use std::collections::HashSet;

use page_acl_core::{AclTree, AncestorAclSet, PageId};
use page_acl_store::{AclStore, AclStoreExt};

use crate::error::{ResolveError, Result};
use crate::merge::merge_page;

/// Resolve effective ACLs for `root` and every page below it.
///
/// `inherited` is what `root` inherits from its ancestors, usually the
/// output of [`resolve_ancestor_acls`](crate::resolve_ancestor_acls). Any
/// store failure aborts the whole pass.
pub async fn resolve_tree<S: AclStore + ?Sized>(
    store: &S,
    inherited: AncestorAclSet,
    root: PageId,
) -> Result<AclTree> {
    let mut tree = AclTree::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root, inherited)];

    while let Some((page_id, inherited)) = stack.pop() {
        if !visited.insert(page_id) {
            return Err(ResolveError::Cycle(page_id));
        }

        let entries = store.entries_on_page(page_id).await?;
        let merge = merge_page(&inherited, &entries);

        tracing::trace!(
            page = %page_id,
            own = entries.len(),
            effective = merge.effective.acls.len(),
            "merged page ACLs"
        );
        tree.insert(page_id, merge.effective);

        let children = store.list_child_pages(page_id).await?;
        // Reversed so the first child is popped first.
        for child in children.into_iter().rev() {
            stack.push((child, merge.propagated.clone()));
        }
    }

    tracing::debug!(root = %root, pages = tree.len(), "resolved ACL tree");
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use page_acl_core::{
        AclEntry, AclEntryId, AclSet, NewAclEntry, PageNode, Permissions, Subject, SubjectType,
    };
    use page_acl_store::{AclChange, AclQuery, MemoryStore, StoreError};

    async fn add(store: &MemoryStore, page: u64, subject: Subject, perms: u32, recursive: bool) {
        store
            .insert_acl_entry(&NewAclEntry::new(
                PageId(page),
                subject,
                Permissions(perms),
                recursive,
            ))
            .await
            .unwrap();
    }

    //   1
    //   ├── 2
    //   │   ├── 4
    //   │   └── 5
    //   └── 3
    async fn tree() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_page(PageNode::root(1), 0).await.unwrap();
        store.insert_page(PageNode::child(2, 1), 0).await.unwrap();
        store.insert_page(PageNode::child(3, 1), 1).await.unwrap();
        store.insert_page(PageNode::child(4, 2), 0).await.unwrap();
        store.insert_page(PageNode::child(5, 2), 1).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_empty_tree_has_empty_sets() {
        let store = tree().await;
        let result = resolve_tree(&store, AclSet::new(), PageId(1)).await.unwrap();

        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|(_, set)| set.is_empty()));
    }

    #[tokio::test]
    async fn test_sibling_entries_do_not_leak() {
        let store = tree().await;
        add(&store, 2, Subject::group(5), 31, true).await;
        add(&store, 4, Subject::user(1), 1, true).await;

        let result = resolve_tree(&store, AclSet::new(), PageId(1)).await.unwrap();

        assert_eq!(result.permissions(PageId(4), Subject::group(5)), Some(Permissions(31)));
        assert_eq!(result.permissions(PageId(5), Subject::group(5)), Some(Permissions(31)));
        assert_eq!(result.permissions(PageId(4), Subject::user(1)), Some(Permissions(1)));
        assert_eq!(result.permissions(PageId(5), Subject::user(1)), None);
        assert_eq!(result.permissions(PageId(3), Subject::group(5)), None);
        assert_eq!(result.permissions(PageId(1), Subject::group(5)), None);
    }

    #[tokio::test]
    async fn test_inherited_seed_applies_to_subtree() {
        let store = tree().await;
        add(&store, 1, Subject::group(5), 31, true).await;
        add(&store, 2, Subject::group(5), 1, false).await;

        let mut seed = AclSet::new();
        let root_entry = store.entries_on_page(PageId(1)).await.unwrap().remove(0);
        seed.insert(Subject::group(5), (&root_entry).into());

        let result = resolve_tree(&store, seed, PageId(2)).await.unwrap();
        assert!(!result.contains(PageId(1)));
        assert!(!result.contains(PageId(3)));
        assert_eq!(result.permissions(PageId(2), Subject::group(5)), Some(Permissions(1)));
        assert_eq!(result.permissions(PageId(4), Subject::group(5)), Some(Permissions(31)));

        let meta = result.get(PageId(2)).unwrap().meta;
        assert_eq!(meta.get(SubjectType::Group).inherited, 1);
        assert_eq!(meta.get(SubjectType::Group).acls, 1);
    }

    /// Store whose parent links form a loop below page 1.
    struct LoopingStore;

    #[async_trait]
    impl AclStore for LoopingStore {
        async fn list_acl_entries(&self, _: &AclQuery) -> page_acl_store::Result<Vec<AclEntry>> {
            Ok(Vec::new())
        }
        async fn get_acl_entry(&self, _: AclEntryId) -> page_acl_store::Result<Option<AclEntry>> {
            Ok(None)
        }
        async fn insert_acl_entry(&self, _: &NewAclEntry) -> page_acl_store::Result<AclEntryId> {
            Err(StoreError::InvalidData("read only".into()))
        }
        async fn apply_changes(&self, _: &[AclChange]) -> page_acl_store::Result<()> {
            Err(StoreError::InvalidData("read only".into()))
        }
        async fn insert_page(&self, _: PageNode, _: i64) -> page_acl_store::Result<()> {
            Err(StoreError::InvalidData("read only".into()))
        }
        async fn get_page(&self, id: PageId) -> page_acl_store::Result<Option<PageNode>> {
            Ok(Some(PageNode { id, parent_id: None }))
        }
        async fn list_child_pages(&self, parent: PageId) -> page_acl_store::Result<Vec<PageId>> {
            Ok(match parent.get() {
                1 => vec![PageId(2)],
                2 => vec![PageId(1)],
                _ => Vec::new(),
            })
        }
        async fn get_root_path(&self, _: PageId) -> page_acl_store::Result<Vec<PageNode>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_cycle_aborts() {
        let result = resolve_tree(&LoopingStore, AclSet::new(), PageId(1)).await;
        assert!(matches!(result, Err(ResolveError::Cycle(PageId(1)))));
    }
}
