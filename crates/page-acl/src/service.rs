//! The ACL service: resolution, overview and mutation behind one API.

use std::sync::Arc;

use page_acl_core::{
    parse_entry_id, AclEntry, AclEntryId, AclTree, NewAclEntry, PageId, Permissions, Subject,
    SubjectFilter, SubjectId, SubjectType,
};
use page_acl_resolve::AclResolver;
use page_acl_store::{AclStore, AclStoreExt};

use crate::action::{AclAction, ActionResponse};
use crate::config::AclConfig;
use crate::error::Result;
use crate::gateway::{
    ActingSubject, DeleteAck, MutationGateway, StoreAuthorizer, StoreMutationEngine,
};
use crate::overview::{self, AclOverview, SubjectOption, SubjectSelection};

/// Entry point for callers.
///
/// Reads resolve against the store on every call; nothing is cached.
/// Writes go through the [`MutationGateway`].
pub struct AclService<S: AclStore + 'static> {
    store: Arc<S>,
    config: AclConfig,
    gateway: MutationGateway,
}

impl<S: AclStore + 'static> AclService<S> {
    /// Create a service with the store-backed authorizer and engine.
    pub fn new(store: S, config: AclConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    pub fn from_arc(store: Arc<S>, config: AclConfig) -> Self {
        let authorizer = StoreAuthorizer::new(
            Arc::clone(&store),
            config.acl_table.clone(),
            config.ancestor_precedence,
        );
        let engine = StoreMutationEngine::new(Arc::clone(&store), config.acl_table.clone());
        let gateway = MutationGateway::new(Arc::new(authorizer), Arc::new(engine));
        Self::with_gateway(store, config, gateway)
    }

    /// Create a service with a custom gateway.
    pub fn with_gateway(store: Arc<S>, config: AclConfig, gateway: MutationGateway) -> Self {
        Self {
            store,
            config,
            gateway,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    fn resolver(&self) -> AclResolver<'_, S> {
        AclResolver::new(&*self.store, self.config.ancestor_precedence)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Winning permissions of one subject at one page, `None` if no entry
    /// applies.
    pub async fn get_effective_permissions(
        &self,
        page: PageId,
        subject_type: SubjectType,
        subject_id: SubjectId,
    ) -> Result<Option<Permissions>> {
        let subject = Subject {
            kind: subject_type,
            id: subject_id,
        };
        Ok(self.resolver().effective_permissions(page, subject).await?)
    }

    /// Effective ACLs for `root` and its subtree.
    ///
    /// Inheritance from above `root` is limited to the given subjects.
    pub async fn compute_acl_tree(
        &self,
        root: PageId,
        user_ids: impl IntoIterator<Item = SubjectId>,
        group_ids: impl IntoIterator<Item = SubjectId>,
    ) -> Result<AclTree> {
        let filter = SubjectFilter::new(user_ids, group_ids);
        Ok(self.resolver().tree(root, &filter).await?)
    }

    /// Entries attached directly to a page.
    pub async fn page_acls(&self, page: PageId) -> Result<Vec<AclEntry>> {
        Ok(self.store.entries_on_page(page).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Overview
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn subject_options(
        &self,
        kind: SubjectType,
        selection: &SubjectSelection,
    ) -> Result<Vec<SubjectOption>> {
        let filter_enabled = self.config.enable_filter_selector;
        overview::subject_options(&*self.store, kind, selection, filter_enabled).await
    }

    /// Subject options plus the tree below `page` for every subject owning
    /// an entry.
    pub async fn acl_overview(
        &self,
        page: PageId,
        selection: &SubjectSelection,
    ) -> Result<AclOverview> {
        let users = self.subject_options(SubjectType::User, selection).await?;
        let groups = self.subject_options(SubjectType::Group, selection).await?;

        let tree = self
            .compute_acl_tree(
                page,
                users.iter().map(|o| o.subject.id),
                groups.iter().map(|o| o.subject.id),
            )
            .await?;

        let filter_enabled = self.config.enable_filter_selector;
        Ok(AclOverview {
            page_id: page,
            enable_filter_selector: filter_enabled,
            disable_old_permission_system: self.config.disable_old_permission_system,
            selected_users: overview::selected(&users, filter_enabled),
            selected_groups: overview::selected(&groups, filter_enabled),
            users,
            groups,
            tree,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete an entry given its raw request id.
    ///
    /// The id is validated before the store is touched.
    pub async fn delete_acl_entry(
        &self,
        raw_id: Option<&str>,
        actor: &ActingSubject,
    ) -> Result<DeleteAck> {
        let id = parse_entry_id(raw_id)?;
        self.gateway
            .authorize_and_delete(&self.config.acl_table, id, actor)
            .await
    }

    pub async fn update_acl_entry(
        &self,
        id: AclEntryId,
        entry: NewAclEntry,
        actor: &ActingSubject,
    ) -> Result<()> {
        self.gateway
            .authorize_and_update(&self.config.acl_table, id, entry, actor)
            .await
    }

    /// Run a parsed action.
    pub async fn dispatch(
        &self,
        action: AclAction,
        actor: &ActingSubject,
    ) -> Result<ActionResponse> {
        match action {
            AclAction::DeleteAcl { page, raw_id } => {
                tracing::debug!(page = %page, "dispatching delete_acl");
                let ack = self.delete_acl_entry(raw_id.as_deref(), actor).await?;
                Ok(ActionResponse::Deleted(ack))
            }
        }
    }
}
