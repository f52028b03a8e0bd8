//! Strong identifier types for pages, ACL entries and subjects.
//!
//! All identifiers are newtypes over `u64` so a page id can never be passed
//! where an entry id or subject id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create from a raw integer.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw integer.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a page in the content tree.
    PageId,
    "PageId"
);

id_newtype!(
    /// Identifier of a stored ACL entry.
    AclEntryId,
    "AclEntryId"
);

id_newtype!(
    /// Identifier of a user or a group, depending on the accompanying
    /// [`SubjectType`](crate::SubjectType).
    SubjectId,
    "SubjectId"
);
