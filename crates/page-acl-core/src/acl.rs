//! ACL entries, subjects, permission bitmasks and page nodes.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{AclEntryId, PageId, SubjectId};

/// Kind of subject an ACL entry grants permissions to.
///
/// Stored as an integer code: `0` for users, `1` for groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    User,
    Group,
}

impl SubjectType {
    /// Every subject type, in code order.
    pub const ALL: [SubjectType; 2] = [SubjectType::User, SubjectType::Group];

    /// The stored integer code.
    pub const fn code(self) -> i64 {
        match self {
            SubjectType::User => 0,
            SubjectType::Group => 1,
        }
    }

    /// Parse from the stored integer code.
    pub fn from_code(code: i64) -> Result<Self, ValidationError> {
        match code {
            0 => Ok(SubjectType::User),
            1 => Ok(SubjectType::Group),
            other => Err(ValidationError::UnknownSubjectType(other)),
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectType::User => f.write_str("user"),
            SubjectType::Group => f.write_str("group"),
        }
    }
}

/// A user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectType,
    pub id: SubjectId,
}

impl Subject {
    pub const fn user(id: u64) -> Self {
        Self {
            kind: SubjectType::User,
            id: SubjectId(id),
        }
    }

    pub const fn group(id: u64) -> Self {
        Self {
            kind: SubjectType::Group,
            id: SubjectId(id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Permission bitmask granted by an ACL entry.
///
/// The resolver treats this as an opaque value; only overwrite semantics
/// matter there. The named bits follow the page permission layout of the
/// backend the ACL rows come from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u32);

impl Permissions {
    pub const NONE: Self = Self(0);
    /// Show the page in the tree.
    pub const SHOW: Self = Self(1);
    /// Edit page properties.
    pub const EDIT: Self = Self(2);
    /// Delete the page.
    pub const DELETE: Self = Self(4);
    /// Create subpages.
    pub const NEW: Self = Self(8);
    /// Edit page content.
    pub const EDIT_CONTENT: Self = Self(16);
    pub const ALL: Self = Self(31);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permissions({:#07b})", self.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Unique, immutable identifier.
    pub id: AclEntryId,
    /// Page the entry is attached to.
    pub page_id: PageId,
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    pub permissions: Permissions,
    /// If set, the entry also applies to every descendant page unless
    /// overridden closer to it.
    pub recursive: bool,
}

impl AclEntry {
    /// Assemble an entry from its id and field values.
    pub fn from_parts(id: AclEntryId, data: NewAclEntry) -> Self {
        Self {
            id,
            page_id: data.page_id,
            subject_type: data.subject_type,
            subject_id: data.subject_id,
            permissions: data.permissions,
            recursive: data.recursive,
        }
    }

    pub fn subject(&self) -> Subject {
        Subject {
            kind: self.subject_type,
            id: self.subject_id,
        }
    }
}

/// Field values of an ACL entry, without the identifier.
///
/// Used both for inserting new rows and for updating existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAclEntry {
    pub page_id: PageId,
    pub subject_type: SubjectType,
    pub subject_id: SubjectId,
    pub permissions: Permissions,
    pub recursive: bool,
}

impl NewAclEntry {
    pub fn new(
        page_id: PageId,
        subject: Subject,
        permissions: Permissions,
        recursive: bool,
    ) -> Self {
        Self {
            page_id,
            subject_type: subject.kind,
            subject_id: subject.id,
            permissions,
            recursive,
        }
    }
}

/// The winning entry for one subject at one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAcl {
    pub id: AclEntryId,
    pub permissions: Permissions,
    pub recursive: bool,
    /// Page the entry is attached to, which differs from the page it is
    /// applied to when it was inherited.
    pub page_id: PageId,
}

impl From<&AclEntry> for AppliedAcl {
    fn from(entry: &AclEntry) -> Self {
        Self {
            id: entry.id,
            permissions: entry.permissions,
            recursive: entry.recursive,
            page_id: entry.page_id,
        }
    }
}

/// A node of the page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    pub id: PageId,
    /// `None` for a root page.
    pub parent_id: Option<PageId>,
}

impl PageNode {
    pub const fn root(id: u64) -> Self {
        Self {
            id: PageId(id),
            parent_id: None,
        }
    }

    pub const fn child(id: u64, parent: u64) -> Self {
        Self {
            id: PageId(id),
            parent_id: Some(PageId(parent)),
        }
    }

    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_type_codes() {
        for kind in SubjectType::ALL {
            assert_eq!(SubjectType::from_code(kind.code()).unwrap(), kind);
        }
        assert!(matches!(
            SubjectType::from_code(2),
            Err(ValidationError::UnknownSubjectType(2))
        ));
    }

    #[test]
    fn test_permission_bits() {
        let perms = Permissions::SHOW | Permissions::EDIT_CONTENT;
        assert_eq!(perms.bits(), 17);
        assert!(perms.contains(Permissions::SHOW));
        assert!(!perms.contains(Permissions::DELETE));
        assert!(Permissions::ALL.contains(perms));
        assert_eq!(
            Permissions::SHOW
                | Permissions::EDIT
                | Permissions::DELETE
                | Permissions::NEW
                | Permissions::EDIT_CONTENT,
            Permissions::ALL
        );
    }

    #[test]
    fn test_applied_acl_keeps_origin_page() {
        let entry = AclEntry::from_parts(
            AclEntryId(3),
            NewAclEntry::new(PageId(10), Subject::group(5), Permissions::ALL, true),
        );
        let applied = AppliedAcl::from(&entry);
        assert_eq!(applied.page_id, PageId(10));
        assert_eq!(applied.id, AclEntryId(3));
        assert!(applied.recursive);
        assert_eq!(entry.subject(), Subject::group(5));
    }
}
