//! Authorized mutation of ACL entries.
//!
//! Every change goes through [`MutationGateway`]. The gateway stages the
//! change in a [`CommandMap`], checks each staged command against a
//! [`RecordAuthorizer`], and only then hands the map to a
//! [`MutationEngine`]. Checks and execution run under one lock, so no
//! other mutation can slip in between them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use page_acl_core::{
    AclEntryId, NewAclEntry, PageId, Permissions, Subject, SubjectFilter, SubjectId,
};
use page_acl_resolve::{AclResolver, AncestorPrecedence};
use page_acl_store::{AclChange, AclStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AclError, AuthorizationError, Result};

/// The backend user on whose behalf a mutation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActingSubject {
    pub user_id: SubjectId,
    pub group_ids: BTreeSet<SubjectId>,
    /// Administrators pass every table and record check.
    pub admin: bool,
    /// Tables a non-admin may modify at all.
    pub modifiable_tables: BTreeSet<String>,
}

impl ActingSubject {
    pub fn admin(user_id: u64) -> Self {
        Self {
            user_id: SubjectId(user_id),
            admin: true,
            ..Self::default()
        }
    }

    pub fn user(user_id: u64, group_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            user_id: SubjectId(user_id),
            group_ids: group_ids.into_iter().map(SubjectId).collect(),
            ..Self::default()
        }
    }

    /// Allow modifying `table`.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.modifiable_tables.insert(table.into());
        self
    }

    /// The user itself followed by each of its groups.
    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        std::iter::once(Subject::user(self.user_id.get()))
            .chain(self.group_ids.iter().map(|id| Subject::group(id.get())))
    }
}

/// Decides whether an actor may touch a table or a record.
#[async_trait]
pub trait RecordAuthorizer: Send + Sync {
    /// Whether `table` names an entity kind at all.
    fn is_known_table(&self, table: &str) -> bool;

    fn is_read_only(&self, table: &str) -> bool;

    fn can_modify_table(&self, actor: &ActingSubject, table: &str) -> bool;

    /// Record-level edit check. Unknown records are not editable.
    ///
    /// Lookup failures are errors, never a silent refusal.
    async fn has_record_edit_access(
        &self,
        actor: &ActingSubject,
        table: &str,
        id: AclEntryId,
    ) -> Result<bool>;

    /// Whether the actor may attach records of `table` to `page`.
    async fn has_page_edit_access(
        &self,
        actor: &ActingSubject,
        table: &str,
        page: PageId,
    ) -> Result<bool>;
}

/// One staged modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Delete,
    Update(NewAclEntry),
}

/// Staged modifications, keyed by table and record id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMap {
    tables: BTreeMap<String, BTreeMap<AclEntryId, Command>>,
}

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a command, replacing any earlier one for the same record.
    pub fn stage(&mut self, table: impl Into<String>, id: AclEntryId, command: Command) {
        self.tables
            .entry(table.into())
            .or_default()
            .insert(id, command);
    }

    pub fn delete(table: impl Into<String>, id: AclEntryId) -> Self {
        let mut map = Self::new();
        map.stage(table, id, Command::Delete);
        map
    }

    pub fn update(table: impl Into<String>, id: AclEntryId, entry: NewAclEntry) -> Self {
        let mut map = Self::new();
        map.stage(table, id, Command::Update(entry));
        map
    }

    /// Whether any command is staged for `table`.
    pub fn stages(&self, table: &str) -> bool {
        self.tables.get(table).map_or(false, |cmds| !cmds.is_empty())
    }

    pub fn table(&self, table: &str) -> Option<&BTreeMap<AclEntryId, Command>> {
        self.tables.get(table)
    }

    /// Every staged command as `(table, id, command)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, AclEntryId, &Command)> + '_ {
        self.tables.iter().flat_map(|(table, cmds)| {
            cmds.iter()
                .map(move |(id, cmd)| (table.as_str(), *id, cmd))
        })
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes an authorized command map.
#[async_trait]
pub trait MutationEngine: Send + Sync {
    async fn process(&self, commands: &CommandMap) -> std::result::Result<(), StoreError>;
}

/// Mutation engine writing to an [`AclStore`] in one batch.
pub struct StoreMutationEngine<S: AclStore + ?Sized> {
    store: Arc<S>,
    table: String,
}

impl<S: AclStore + ?Sized> StoreMutationEngine<S> {
    pub fn new(store: Arc<S>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }
}

#[async_trait]
impl<S: AclStore + ?Sized> MutationEngine for StoreMutationEngine<S> {
    async fn process(&self, commands: &CommandMap) -> std::result::Result<(), StoreError> {
        let mut changes = Vec::with_capacity(commands.len());
        for (table, id, command) in commands.iter() {
            if table != self.table {
                return Err(StoreError::InvalidData(format!(
                    "no storage for table {table}"
                )));
            }
            changes.push(match command {
                Command::Delete => AclChange::Delete(id),
                Command::Update(entry) => AclChange::Update(id, entry.clone()),
            });
        }
        self.store.apply_changes(&changes).await
    }
}

/// Authorizer backed by the ACL store itself.
///
/// Only the configured ACL table is writable. A non-admin needs the table
/// in its modifiable set and content-edit permission on the page the
/// record is attached to, as resolved from the ACLs themselves. Moving a
/// record needs the same permission on the destination page.
pub struct StoreAuthorizer<S: AclStore + ?Sized> {
    store: Arc<S>,
    acl_table: String,
    read_only_tables: BTreeSet<String>,
    precedence: AncestorPrecedence,
}

impl<S: AclStore + ?Sized> StoreAuthorizer<S> {
    pub fn new(
        store: Arc<S>,
        acl_table: impl Into<String>,
        precedence: AncestorPrecedence,
    ) -> Self {
        Self {
            store,
            acl_table: acl_table.into(),
            read_only_tables: BTreeSet::new(),
            precedence,
        }
    }

    /// Register a known table that may never be modified.
    pub fn with_read_only_table(mut self, table: impl Into<String>) -> Self {
        self.read_only_tables.insert(table.into());
        self
    }

    async fn can_edit_page(&self, actor: &ActingSubject, page: PageId) -> Result<bool> {
        let filter = SubjectFilter::new([actor.user_id], actor.group_ids.iter().copied());
        let resolver = AclResolver::new(&*self.store, self.precedence);
        let set = resolver.page(page, &filter).await?;

        Ok(actor.subjects().any(|subject| {
            set.permissions(subject)
                .map_or(false, |p| p.contains(Permissions::EDIT_CONTENT))
        }))
    }
}

#[async_trait]
impl<S: AclStore + ?Sized> RecordAuthorizer for StoreAuthorizer<S> {
    fn is_known_table(&self, table: &str) -> bool {
        table == self.acl_table || self.read_only_tables.contains(table)
    }

    fn is_read_only(&self, table: &str) -> bool {
        self.read_only_tables.contains(table)
    }

    fn can_modify_table(&self, actor: &ActingSubject, table: &str) -> bool {
        actor.admin || actor.modifiable_tables.contains(table)
    }

    async fn has_record_edit_access(
        &self,
        actor: &ActingSubject,
        table: &str,
        id: AclEntryId,
    ) -> Result<bool> {
        if table != self.acl_table {
            return Ok(false);
        }
        let Some(entry) = self.store.get_acl_entry(id).await? else {
            return Ok(false);
        };
        if actor.admin {
            return Ok(true);
        }
        self.can_edit_page(actor, entry.page_id).await
    }

    async fn has_page_edit_access(
        &self,
        actor: &ActingSubject,
        table: &str,
        page: PageId,
    ) -> Result<bool> {
        if table != self.acl_table {
            return Ok(false);
        }
        if actor.admin {
            return Ok(true);
        }
        self.can_edit_page(actor, page).await
    }
}

/// Acknowledgement returned after a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub title: String,
    pub message: String,
}

impl DeleteAck {
    pub fn deleted() -> Self {
        Self {
            title: "Success".to_string(),
            message: "ACL entry deleted".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Checks and executes mutations.
pub struct MutationGateway {
    authorizer: Arc<dyn RecordAuthorizer>,
    engine: Arc<dyn MutationEngine>,
    lock: Mutex<()>,
}

impl MutationGateway {
    pub fn new(authorizer: Arc<dyn RecordAuthorizer>, engine: Arc<dyn MutationEngine>) -> Self {
        Self {
            authorizer,
            engine,
            lock: Mutex::new(()),
        }
    }

    /// Delete one record after authorizing the actor.
    pub async fn authorize_and_delete(
        &self,
        table: &str,
        id: AclEntryId,
        actor: &ActingSubject,
    ) -> Result<DeleteAck> {
        self.execute(&CommandMap::delete(table, id), actor).await?;
        Ok(DeleteAck::deleted())
    }

    /// Replace one record's values after authorizing the actor.
    pub async fn authorize_and_update(
        &self,
        table: &str,
        id: AclEntryId,
        entry: NewAclEntry,
        actor: &ActingSubject,
    ) -> Result<()> {
        self.execute(&CommandMap::update(table, id, entry), actor).await
    }

    /// Authorize every staged command, then run the whole map.
    ///
    /// The first failing check aborts without mutating anything.
    pub async fn execute(&self, commands: &CommandMap, actor: &ActingSubject) -> Result<()> {
        let _guard = self.lock.lock().await;

        for (table, id, command) in commands.iter() {
            match self.check_modify_access(table, id, command, commands, actor).await {
                Ok(()) => {}
                Err(AclError::Authorization(e)) => {
                    tracing::warn!(
                        user = %actor.user_id,
                        table,
                        %id,
                        reason = %e.reason,
                        "mutation refused"
                    );
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::error!(
                        user = %actor.user_id,
                        table,
                        %id,
                        error = %e,
                        "access check failed"
                    );
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.engine.process(commands).await {
            tracing::warn!(user = %actor.user_id, error = %e, "mutation engine failed");
            return Err(AclError::MutationRejected(e.to_string()));
        }

        tracing::info!(user = %actor.user_id, commands = commands.len(), "mutation applied");
        Ok(())
    }

    async fn check_modify_access(
        &self,
        table: &str,
        id: AclEntryId,
        command: &Command,
        commands: &CommandMap,
        actor: &ActingSubject,
    ) -> Result<()> {
        if !self.authorizer.is_known_table(table) || self.authorizer.is_read_only(table) {
            return Err(refuse(format!("table {table} is not modifiable")));
        }
        if !self.authorizer.can_modify_table(actor, table) {
            return Err(refuse(format!("no permission to modify table {table}")));
        }
        if !commands.stages(table) {
            return Err(refuse(format!("no command staged for table {table}")));
        }
        if id.get() == 0 {
            return Err(refuse("no record id given"));
        }
        if !self.authorizer.has_record_edit_access(actor, table, id).await? {
            return Err(refuse(format!("no edit access to record {table}:{id}")));
        }
        if let Command::Update(entry) = command {
            let page = entry.page_id;
            if !self.authorizer.has_page_edit_access(actor, table, page).await? {
                return Err(refuse(format!("no edit access to page {page}")));
            }
        }
        Ok(())
    }
}

fn refuse(reason: impl Into<String>) -> AclError {
    AuthorizationError::new(reason).into()
}
