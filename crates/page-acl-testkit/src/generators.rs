//! Proptest generators for property-based testing.

use proptest::prelude::*;

use page_acl_core::{NewAclEntry, PageId, PageNode, Permissions, Subject, SubjectType};

use crate::fixtures::TreeSpec;

/// Generate a subject from a small id range, so subjects collide often.
pub fn subject() -> impl Strategy<Value = Subject> {
    (
        prop_oneof![Just(SubjectType::User), Just(SubjectType::Group)],
        1u64..=4,
    )
        .prop_map(|(kind, id)| match kind {
            SubjectType::User => Subject::user(id),
            SubjectType::Group => Subject::group(id),
        })
}

/// Generate a permission bitmask.
pub fn permissions() -> impl Strategy<Value = Permissions> {
    (0u32..=Permissions::ALL.bits()).prop_map(Permissions)
}

/// Generate a tree of up to `max_pages` pages rooted at page 1, with up to
/// `max_entries` ACL entries on random pages.
///
/// Page `n + 1` always has a parent among pages `1..=n`.
pub fn tree_spec(max_pages: usize, max_entries: usize) -> impl Strategy<Value = TreeSpec> {
    (1..=max_pages.max(1))
        .prop_flat_map(move |pages| {
            let parents: Vec<_> = (1..pages).map(|i| 0..i).collect();
            let entries = prop::collection::vec(
                (0..pages, subject(), permissions(), any::<bool>()),
                0..=max_entries,
            );
            (Just(pages), parents, entries)
        })
        .prop_map(|(pages, parents, entries)| {
            let mut nodes = Vec::with_capacity(pages);
            nodes.push(PageNode::root(1));
            for (i, parent) in parents.into_iter().enumerate() {
                nodes.push(PageNode::child(i as u64 + 2, parent as u64 + 1));
            }
            TreeSpec {
                pages: nodes,
                entries: entries
                    .into_iter()
                    .map(|(page, subject, perms, recursive)| {
                        NewAclEntry::new(PageId(page as u64 + 1), subject, perms, recursive)
                    })
                    .collect(),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use page_acl_core::{AclTree, SubjectFilter};
    use page_acl_resolve::{resolve_tree, AclResolver, AncestorPrecedence};
    use page_acl_store::MemoryStore;

    use crate::model::reference_tree;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    fn resolve(store: &MemoryStore, root: PageId) -> AclTree {
        runtime().block_on(async {
            AclResolver::new(store, AncestorPrecedence::Nearest)
                .tree(root, &SubjectFilter::any())
                .await
                .unwrap()
        })
    }

    fn load(spec: &TreeSpec) -> (MemoryStore, Vec<page_acl_core::AclEntry>) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            let entries = spec.load(&store).await.unwrap();
            (store, entries)
        })
    }

    fn descendants(spec: &TreeSpec, root: PageId) -> BTreeSet<PageId> {
        let mut found = BTreeSet::from([root]);
        // Parents always precede children in generated specs.
        for page in &spec.pages {
            if page.parent_id.map_or(false, |p| found.contains(&p)) {
                found.insert(page.id);
            }
        }
        found
    }

    proptest! {
        #[test]
        fn test_resolver_matches_model(spec in tree_spec(12, 16)) {
            let (store, entries) = load(&spec);
            let tree = resolve(&store, PageId(1));
            let expected = reference_tree(&spec.pages, &entries, PageId(1), &SubjectFilter::any());

            prop_assert_eq!(tree, expected);
        }

        #[test]
        fn test_subtree_matches_full_tree(
            spec in tree_spec(12, 16),
            pick in any::<prop::sample::Index>(),
        ) {
            let (store, _) = load(&spec);
            let start = spec.pages[pick.index(spec.pages.len())].id;

            let full = resolve(&store, PageId(1));
            let sub = resolve(&store, start);

            prop_assert_eq!(sub.len(), descendants(&spec, start).len());
            for (page, set) in sub.iter() {
                prop_assert_eq!(Some(set), full.get(page));
            }
        }

        #[test]
        fn test_every_page_resolved_once(spec in tree_spec(20, 0)) {
            let (store, _) = load(&spec);
            let tree = resolve(&store, PageId(1));

            prop_assert_eq!(tree.len(), spec.pages.len());
            prop_assert!(tree.iter().all(|(_, set)| set.is_empty()));
        }

        #[test]
        fn test_local_entries_stay_local(spec in tree_spec(12, 16)) {
            let (store, entries) = load(&spec);
            let tree = resolve(&store, PageId(1));

            for entry in entries.iter().filter(|e| !e.recursive) {
                for page in descendants(&spec, entry.page_id) {
                    if page == entry.page_id {
                        continue;
                    }
                    let winner = tree.get(page).and_then(|set| set.get(entry.subject()));
                    prop_assert!(winner.map_or(true, |w| w.id != entry.id));
                }
            }
        }

        #[test]
        fn test_meta_counts_own_entries(spec in tree_spec(12, 16)) {
            let (store, entries) = load(&spec);
            let tree = resolve(&store, PageId(1));

            for (page, set) in tree.iter() {
                for kind in SubjectType::ALL {
                    let own = entries
                        .iter()
                        .filter(|e| e.page_id == page && e.subject_type == kind)
                        .count();
                    prop_assert_eq!(set.meta.get(kind).acls as usize, own);
                    let inherited = set.meta.get(kind).inherited as usize;
                    prop_assert!(set.acls.count(kind) <= own + inherited);
                }
            }
        }
    }

    #[test]
    fn test_resolve_tree_directly_with_empty_seed() {
        let spec = TreeSpec::new()
            .root(1)
            .child(2, 1)
            .grant(1, Subject::user(1), 1, true);
        let (store, _) = load(&spec);
        let tree = runtime()
            .block_on(resolve_tree(&store, Default::default(), PageId(1)))
            .unwrap();
        assert_eq!(tree.permissions(PageId(2), Subject::user(1)), Some(Permissions(1)));
    }
}
