//! Store-bound resolver combining the ancestor walk and the tree walk.

use page_acl_core::{
    AclTree, AncestorAclSet, EffectiveAclSet, PageId, Permissions, Subject, SubjectFilter,
};
use page_acl_store::{AclStore, AclStoreExt};

use crate::ancestor::{resolve_ancestor_acls, AncestorPrecedence};
use crate::error::Result;
use crate::merge::merge_page;
use crate::tree::resolve_tree;

/// Resolves effective ACLs against one store.
///
/// Holds no state between calls; every call is an independent pass.
pub struct AclResolver<'a, S: AclStore + ?Sized> {
    store: &'a S,
    precedence: AncestorPrecedence,
}

impl<'a, S: AclStore + ?Sized> AclResolver<'a, S> {
    pub fn new(store: &'a S, precedence: AncestorPrecedence) -> Self {
        Self { store, precedence }
    }

    pub fn precedence(&self) -> AncestorPrecedence {
        self.precedence
    }

    /// Recursive grants `page` inherits from its ancestors.
    pub async fn ancestors(&self, page: PageId, filter: &SubjectFilter) -> Result<AncestorAclSet> {
        resolve_ancestor_acls(self.store, page, filter, self.precedence).await
    }

    /// Effective ACLs for `root` and its whole subtree.
    ///
    /// `filter` restricts what is inherited from above `root`; entries
    /// inside the subtree are always taken into account.
    pub async fn tree(&self, root: PageId, filter: &SubjectFilter) -> Result<AclTree> {
        let inherited = self.ancestors(root, filter).await?;
        resolve_tree(self.store, inherited, root).await
    }

    /// Effective ACLs of a single page, without walking its subtree.
    pub async fn page(&self, page: PageId, filter: &SubjectFilter) -> Result<EffectiveAclSet> {
        let inherited = self.ancestors(page, filter).await?;
        let own = self.store.entries_on_page(page).await?;
        Ok(merge_page(&inherited, &own).effective)
    }

    /// Winning permissions of one subject at one page.
    pub async fn effective_permissions(
        &self,
        page: PageId,
        subject: Subject,
    ) -> Result<Option<Permissions>> {
        let set = self.page(page, &SubjectFilter::only(subject)).await?;
        Ok(set.permissions(subject))
    }
}
