//! Subject listings for the ACL overview screen.

use std::collections::{BTreeMap, BTreeSet};

use page_acl_core::{AclEntry, AclTree, PageId, Subject, SubjectId, SubjectType};
use page_acl_store::{AclQuery, AclStore};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Users and groups picked in the overview's filter selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSelection {
    #[serde(default)]
    pub users: BTreeSet<SubjectId>,
    #[serde(default)]
    pub groups: BTreeSet<SubjectId>,
}

impl SubjectSelection {
    pub fn new(
        users: impl IntoIterator<Item = u64>,
        groups: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            users: users.into_iter().map(SubjectId).collect(),
            groups: groups.into_iter().map(SubjectId).collect(),
        }
    }

    pub fn of_type(&self, kind: SubjectType) -> &BTreeSet<SubjectId> {
        match kind {
            SubjectType::User => &self.users,
            SubjectType::Group => &self.groups,
        }
    }

    pub fn contains(&self, subject: Subject) -> bool {
        self.of_type(subject.kind).contains(&subject.id)
    }
}

/// A subject owning at least one ACL entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectOption {
    pub subject: Subject,
    /// The last stored entry of this subject.
    pub entry: AclEntry,
    pub selected: bool,
}

/// Everything the overview screen shows for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclOverview {
    pub page_id: PageId,
    pub enable_filter_selector: bool,
    pub disable_old_permission_system: bool,
    pub users: Vec<SubjectOption>,
    pub groups: Vec<SubjectOption>,
    /// Users shown in the tree columns.
    pub selected_users: Vec<SubjectOption>,
    pub selected_groups: Vec<SubjectOption>,
    pub tree: AclTree,
}

/// One option per subject of `kind` that owns an entry, ordered by
/// subject id.
///
/// Options are only marked selected while the filter selector is enabled.
pub async fn subject_options<S: AclStore + ?Sized>(
    store: &S,
    kind: SubjectType,
    selection: &SubjectSelection,
    filter_enabled: bool,
) -> Result<Vec<SubjectOption>> {
    let mut by_subject = BTreeMap::new();
    for entry in store.list_acl_entries(&AclQuery::of_type(kind)).await? {
        by_subject.insert(entry.subject_id, entry);
    }

    Ok(by_subject
        .into_values()
        .map(|entry| {
            let subject = entry.subject();
            SubjectOption {
                subject,
                selected: filter_enabled && selection.contains(subject),
                entry,
            }
        })
        .collect())
}

/// The options counted as selected: all of them when the selector is off.
pub(crate) fn selected(options: &[SubjectOption], filter_enabled: bool) -> Vec<SubjectOption> {
    options
        .iter()
        .filter(|option| !filter_enabled || option.selected)
        .cloned()
        .collect()
}
