//! Reference model of ACL resolution.
//!
//! Computes every page independently by looking at its full root path.
//! Slow, but written directly from the precedence rules, so property tests
//! can hold the traversal-based resolver against it. Ancestor precedence
//! is nearest-wins.

use std::collections::{BTreeSet, HashMap};

use page_acl_core::{
    AclEntry, AclTree, AppliedAcl, EffectiveAclSet, PageId, PageNode, Subject, SubjectFilter,
};

/// Effective ACLs for `root` and its subtree.
///
/// `filter` applies to grants above `root` only, like the real resolver.
pub fn reference_tree(
    pages: &[PageNode],
    entries: &[AclEntry],
    root: PageId,
    filter: &SubjectFilter,
) -> AclTree {
    let parents: HashMap<PageId, Option<PageId>> =
        pages.iter().map(|p| (p.id, p.parent_id)).collect();
    let subjects: BTreeSet<Subject> = entries.iter().map(AclEntry::subject).collect();

    let mut tree = AclTree::new();
    for page in pages {
        let path = root_path(&parents, page.id);
        let Some(root_at) = path.iter().position(|id| *id == root) else {
            continue;
        };
        // Strict ancestors of the page, split at the subtree root.
        let above = &path[..root_at];
        let inside = &path[root_at..path.len() - 1];

        let mut set = EffectiveAclSet::default();
        for entry in entries.iter().filter(|e| e.page_id == page.id) {
            set.meta.get_mut(entry.subject_type).acls += 1;
        }

        for &subject in &subjects {
            let inherited = nearest_recursive(entries, inside, subject).or_else(|| {
                filter
                    .allows(subject)
                    .then(|| nearest_recursive(entries, above, subject))
                    .flatten()
            });
            if inherited.is_some() {
                set.meta.get_mut(subject.kind).inherited += 1;
            }

            let own_local = last_on(entries, page.id, subject, false);
            let own_recursive = last_on(entries, page.id, subject, true);
            if let Some(winner) = own_local.or(own_recursive).or(inherited) {
                set.acls.insert(subject, AppliedAcl::from(winner));
            }
        }

        tree.insert(page.id, set);
    }
    tree
}

/// Pages from the root down to and including `page`.
fn root_path(parents: &HashMap<PageId, Option<PageId>>, page: PageId) -> Vec<PageId> {
    let mut path = vec![page];
    let mut current = page;
    while let Some(Some(parent)) = parents.get(&current) {
        if path.contains(parent) {
            break;
        }
        path.push(*parent);
        current = *parent;
    }
    path.reverse();
    path
}

/// The last entry of one kind for `subject` attached to `page`.
fn last_on(
    entries: &[AclEntry],
    page: PageId,
    subject: Subject,
    recursive: bool,
) -> Option<&AclEntry> {
    entries
        .iter()
        .filter(|e| e.page_id == page && e.subject() == subject && e.recursive == recursive)
        .max_by_key(|e| e.id)
}

/// The recursive grant for `subject` on the page of `path` closest to its
/// end.
fn nearest_recursive<'a>(
    entries: &'a [AclEntry],
    path: &[PageId],
    subject: Subject,
) -> Option<&'a AclEntry> {
    path.iter()
        .rev()
        .find_map(|page| last_on(entries, *page, subject, true))
}
