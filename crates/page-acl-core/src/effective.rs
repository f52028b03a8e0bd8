//! Resolved permission sets: per-page effective ACLs and the tree mapping.
//!
//! These are plain values. The resolver builds them during one traversal
//! and hands them to the caller; nothing here is shared or mutated
//! afterwards.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::acl::{AppliedAcl, Permissions, Subject, SubjectType};
use crate::types::{PageId, SubjectId};

/// One winning entry per subject, grouped by subject type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AclSet {
    users: BTreeMap<SubjectId, AppliedAcl>,
    groups: BTreeMap<SubjectId, AppliedAcl>,
}

/// The recursive grants enclosing a starting page, collected from its
/// root path. Same shape as any other [`AclSet`].
pub type AncestorAclSet = AclSet;

impl AclSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of one subject type, keyed by subject id.
    pub fn of_type(&self, kind: SubjectType) -> &BTreeMap<SubjectId, AppliedAcl> {
        match kind {
            SubjectType::User => &self.users,
            SubjectType::Group => &self.groups,
        }
    }

    fn of_type_mut(&mut self, kind: SubjectType) -> &mut BTreeMap<SubjectId, AppliedAcl> {
        match kind {
            SubjectType::User => &mut self.users,
            SubjectType::Group => &mut self.groups,
        }
    }

    pub fn get(&self, subject: Subject) -> Option<&AppliedAcl> {
        self.of_type(subject.kind).get(&subject.id)
    }

    pub fn contains(&self, subject: Subject) -> bool {
        self.get(subject).is_some()
    }

    /// Set the winning entry for a subject, returning the one it replaced.
    pub fn insert(&mut self, subject: Subject, acl: AppliedAcl) -> Option<AppliedAcl> {
        self.of_type_mut(subject.kind).insert(subject.id, acl)
    }

    /// Insert only if the subject has no entry yet. Returns whether the
    /// entry was inserted.
    pub fn insert_if_absent(&mut self, subject: Subject, acl: AppliedAcl) -> bool {
        use std::collections::btree_map::Entry;

        match self.of_type_mut(subject.kind).entry(subject.id) {
            Entry::Vacant(slot) => {
                slot.insert(acl);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Number of distinct subjects of one type.
    pub fn count(&self, kind: SubjectType) -> usize {
        self.of_type(kind).len()
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    /// All entries, users first, each type ordered by subject id.
    pub fn iter(&self) -> impl Iterator<Item = (Subject, &AppliedAcl)> + '_ {
        SubjectType::ALL.into_iter().flat_map(move |kind| {
            self.of_type(kind)
                .iter()
                .map(move |(id, acl)| (Subject { kind, id: *id }, acl))
        })
    }
}

/// Summary counts for one subject type at one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AclMeta {
    /// Entries attached directly to the page, recursive or not.
    pub acls: u32,
    /// Subjects inherited from ancestors before the page's own entries
    /// were merged.
    pub inherited: u32,
}

/// [`AclMeta`] for each subject type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AclMetaCounts {
    pub user: AclMeta,
    pub group: AclMeta,
}

impl AclMetaCounts {
    pub fn get(&self, kind: SubjectType) -> &AclMeta {
        match kind {
            SubjectType::User => &self.user,
            SubjectType::Group => &self.group,
        }
    }

    pub fn get_mut(&mut self, kind: SubjectType) -> &mut AclMeta {
        match kind {
            SubjectType::User => &mut self.user,
            SubjectType::Group => &mut self.group,
        }
    }
}

/// The effective permissions of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveAclSet {
    pub acls: AclSet,
    pub meta: AclMetaCounts,
}

impl EffectiveAclSet {
    pub fn get(&self, subject: Subject) -> Option<&AppliedAcl> {
        self.acls.get(subject)
    }

    /// The winning permission bitmask for a subject, if any entry applies.
    pub fn permissions(&self, subject: Subject) -> Option<Permissions> {
        self.get(subject).map(|acl| acl.permissions)
    }

    pub fn is_empty(&self) -> bool {
        self.acls.is_empty()
    }
}

/// Effective ACL sets for every page of a resolved subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AclTree {
    pages: BTreeMap<PageId, EffectiveAclSet>,
}

impl AclTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the effective set of a page, returning any previous one.
    pub fn insert(&mut self, page_id: PageId, set: EffectiveAclSet) -> Option<EffectiveAclSet> {
        self.pages.insert(page_id, set)
    }

    pub fn get(&self, page_id: PageId) -> Option<&EffectiveAclSet> {
        self.pages.get(&page_id)
    }

    /// Shortcut for the winning permissions of a subject at a page.
    pub fn permissions(&self, page_id: PageId, subject: Subject) -> Option<Permissions> {
        self.get(page_id).and_then(|set| set.permissions(subject))
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageId, &EffectiveAclSet)> + '_ {
        self.pages.iter().map(|(id, set)| (*id, set))
    }

    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.keys().copied()
    }
}

/// Which subjects the ancestor walk keeps.
///
/// `None` for a type means every subject of that type passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFilter {
    users: Option<BTreeSet<SubjectId>>,
    groups: Option<BTreeSet<SubjectId>>,
}

impl SubjectFilter {
    /// Let every subject through.
    pub fn any() -> Self {
        Self::default()
    }

    /// Drop every subject.
    pub fn none() -> Self {
        Self {
            users: Some(BTreeSet::new()),
            groups: Some(BTreeSet::new()),
        }
    }

    /// Keep only the listed users and groups.
    pub fn new(
        users: impl IntoIterator<Item = SubjectId>,
        groups: impl IntoIterator<Item = SubjectId>,
    ) -> Self {
        Self {
            users: Some(users.into_iter().collect()),
            groups: Some(groups.into_iter().collect()),
        }
    }

    /// Keep exactly one subject.
    pub fn only(subject: Subject) -> Self {
        let one = BTreeSet::from([subject.id]);
        match subject.kind {
            SubjectType::User => Self {
                users: Some(one),
                groups: Some(BTreeSet::new()),
            },
            SubjectType::Group => Self {
                users: Some(BTreeSet::new()),
                groups: Some(one),
            },
        }
    }

    pub fn allows(&self, subject: Subject) -> bool {
        let ids = match subject.kind {
            SubjectType::User => &self.users,
            SubjectType::Group => &self.groups,
        };
        ids.as_ref().map_or(true, |ids| ids.contains(&subject.id))
    }
}
