//! Collection of recursive grants enclosing a starting page.
//!
//! The tree resolver needs to know what a subtree inherits before it starts
//! walking it. That is the set of recursive entries on the root path of the
//! starting page, one per subject.

use serde::{Deserialize, Serialize};

use page_acl_core::{AncestorAclSet, AppliedAcl, PageId, SubjectFilter};
use page_acl_store::{AclStore, AclStoreExt};

use crate::error::Result;

/// Which ancestor's recursive grant wins when several ancestors carry one
/// for the same subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorPrecedence {
    /// The grant closest to the starting page wins. Matches how the tree
    /// resolver lets a nearer recursive entry replace a farther one, so a
    /// subtree resolves the same whether it is walked from the root or
    /// from its own top page.
    #[default]
    Nearest,
    /// The grant closest to the root wins.
    Farthest,
}

/// Collect the recursive grants enclosing `start`.
///
/// Ancestors are read root first. Subjects not allowed by `filter` are
/// dropped. `start` itself is not consulted.
pub async fn resolve_ancestor_acls<S: AclStore + ?Sized>(
    store: &S,
    start: PageId,
    filter: &SubjectFilter,
    precedence: AncestorPrecedence,
) -> Result<AncestorAclSet> {
    let root_path = store.get_root_path(start).await?;
    let mut acls = AncestorAclSet::new();

    for ancestor in &root_path {
        for entry in store.recursive_entries_on_page(ancestor.id).await? {
            let subject = entry.subject();
            if !filter.allows(subject) {
                continue;
            }

            let applied = AppliedAcl::from(&entry);
            match precedence {
                AncestorPrecedence::Nearest => {
                    acls.insert(subject, applied);
                }
                AncestorPrecedence::Farthest => {
                    acls.insert_if_absent(subject, applied);
                }
            }
        }
    }

    tracing::debug!(
        page = %start,
        depth = root_path.len(),
        inherited = acls.len(),
        ?precedence,
        "collected ancestor ACLs"
    );

    Ok(acls)
}
