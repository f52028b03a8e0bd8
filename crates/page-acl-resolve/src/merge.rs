//! Precedence rules for merging a page's own entries into what it inherits.
//!
//! | Situation                                   | Wins on the page  | Passed to children |
//! |---------------------------------------------|-------------------|--------------------|
//! | Only an inherited entry                     | inherited         | inherited          |
//! | Non-recursive entry                         | non-recursive     | inherited          |
//! | Recursive entry, no non-recursive override  | recursive         | recursive          |
//! | Both kinds for the same subject             | non-recursive     | recursive          |
//!
//! Between two entries of the same kind for the same subject on one page,
//! the later one in store order wins.

use page_acl_core::{AclEntry, AclSet, AppliedAcl, EffectiveAclSet, SubjectType};

/// Result of merging one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMerge {
    /// What applies on the page itself.
    pub effective: EffectiveAclSet,
    /// What the page's children inherit. Differs from `effective` by the
    /// page-local non-recursive overrides.
    pub propagated: AclSet,
}

/// Merge the entries attached to a page with the set it inherits.
pub fn merge_page(inherited: &AclSet, own_entries: &[AclEntry]) -> PageMerge {
    let mut effective = EffectiveAclSet {
        acls: inherited.clone(),
        ..EffectiveAclSet::default()
    };
    for kind in SubjectType::ALL {
        effective.meta.get_mut(kind).inherited = inherited.count(kind) as u32;
    }

    let mut propagated = inherited.clone();
    let mut overrides = AclSet::new();

    for entry in own_entries {
        let subject = entry.subject();
        let applied = AppliedAcl::from(entry);

        if entry.recursive {
            propagated.insert(subject, applied);
            let winner = overrides.get(subject).copied().unwrap_or(applied);
            effective.acls.insert(subject, winner);
        } else {
            effective.acls.insert(subject, applied);
            overrides.insert(subject, applied);
        }

        effective.meta.get_mut(entry.subject_type).acls += 1;
    }

    PageMerge {
        effective,
        propagated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_acl_core::{AclEntryId, NewAclEntry, PageId, Permissions, Subject};

    fn entry(id: u64, page: u64, subject: Subject, perms: u32, recursive: bool) -> AclEntry {
        AclEntry::from_parts(
            AclEntryId(id),
            NewAclEntry::new(PageId(page), subject, Permissions(perms), recursive),
        )
    }

    fn inherited_group5() -> AclSet {
        let mut set = AclSet::new();
        set.insert(
            Subject::group(5),
            AppliedAcl::from(&entry(1, 1, Subject::group(5), 31, true)),
        );
        set
    }

    #[test]
    fn test_no_entries_inherits_verbatim() {
        let inherited = inherited_group5();
        let merge = merge_page(&inherited, &[]);

        assert_eq!(merge.effective.acls, inherited);
        assert_eq!(merge.propagated, inherited);
        assert_eq!(merge.effective.meta.group.inherited, 1);
        assert_eq!(merge.effective.meta.group.acls, 0);
        assert_eq!(merge.effective.meta.user.inherited, 0);
    }

    #[test]
    fn test_non_recursive_overrides_page_only() {
        let inherited = inherited_group5();
        let merge = merge_page(&inherited, &[entry(2, 2, Subject::group(5), 1, false)]);

        assert_eq!(
            merge.effective.permissions(Subject::group(5)),
            Some(Permissions(1))
        );
        assert_eq!(
            merge.propagated.get(Subject::group(5)).map(|a| a.permissions),
            Some(Permissions(31))
        );
        assert_eq!(merge.effective.meta.group.acls, 1);
        assert_eq!(merge.effective.meta.group.inherited, 1);
    }

    #[test]
    fn test_recursive_applies_and_propagates() {
        let merge = merge_page(&inherited_group5(), &[entry(2, 2, Subject::group(5), 4, true)]);

        let here = merge.effective.get(Subject::group(5)).unwrap();
        assert_eq!(here.permissions, Permissions(4));
        assert_eq!(here.page_id, PageId(2));
        assert_eq!(
            merge.propagated.get(Subject::group(5)).unwrap().id,
            AclEntryId(2)
        );
    }

    #[test]
    fn test_non_recursive_beats_recursive_in_either_order() {
        let recursive = entry(10, 3, Subject::user(7), 16, true);
        let local = entry(11, 3, Subject::user(7), 2, false);

        for entries in [
            vec![recursive.clone(), local.clone()],
            vec![local.clone(), recursive.clone()],
        ] {
            let merge = merge_page(&AclSet::new(), &entries);
            assert_eq!(
                merge.effective.permissions(Subject::user(7)),
                Some(Permissions(2))
            );
            assert_eq!(
                merge.propagated.get(Subject::user(7)).map(|a| a.permissions),
                Some(Permissions(16))
            );
            assert_eq!(merge.effective.meta.user.acls, 2);
            assert_eq!(merge.effective.meta.user.inherited, 0);
        }
    }

    #[test]
    fn test_meta_counts_per_type() {
        let entries = [
            entry(1, 1, Subject::user(1), 1, true),
            entry(2, 1, Subject::user(2), 1, false),
            entry(3, 1, Subject::group(1), 1, false),
        ];
        let merge = merge_page(&inherited_group5(), &entries);

        assert_eq!(merge.effective.meta.user.acls, 2);
        assert_eq!(merge.effective.meta.group.acls, 1);
        assert_eq!(merge.effective.meta.group.inherited, 1);
        assert_eq!(merge.effective.acls.len(), 4);
        // Only the recursive user entry joins the inherited group grant.
        assert_eq!(merge.propagated.len(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn entries() -> impl Strategy<Value = Vec<AclEntry>> {
            prop::collection::vec((1u64..=3, any::<bool>(), 0u32..=31, any::<bool>()), 0..12)
                .prop_map(|rows| {
                    rows.into_iter()
                        .enumerate()
                        .map(|(i, (id, is_user, perms, recursive))| {
                            let subject = if is_user {
                                Subject::user(id)
                            } else {
                                Subject::group(id)
                            };
                            entry(i as u64 + 10, 2, subject, perms, recursive)
                        })
                        .collect()
                })
        }

        proptest! {
            #[test]
            fn test_local_entries_never_propagate(own in entries()) {
                let merge = merge_page(&inherited_group5(), &own);

                for acl in merge.propagated.iter().map(|(_, acl)| acl) {
                    prop_assert!(acl.recursive);
                }
                for e in own.iter().filter(|e| !e.recursive) {
                    let winner = merge.effective.get(e.subject());
                    prop_assert!(winner.map_or(false, |w| !w.recursive));
                }
            }

            #[test]
            fn test_every_own_entry_counted(own in entries()) {
                let merge = merge_page(&AclSet::new(), &own);
                let total = merge.effective.meta.user.acls + merge.effective.meta.group.acls;
                prop_assert_eq!(total as usize, own.len());
                prop_assert!(merge.effective.acls.len() <= own.len());
            }
        }
    }
}
