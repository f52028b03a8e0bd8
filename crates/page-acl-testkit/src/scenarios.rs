//! Named scenarios with known outcomes.
//!
//! Each scenario is a small tree plus the permissions particular subjects
//! must end up with. They double as documentation of the precedence rules.

use page_acl_core::{PageId, Permissions, Subject, SubjectFilter};
use page_acl_resolve::{AclResolver, AncestorPrecedence};

use crate::fixtures::TreeSpec;

/// One expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub page: PageId,
    pub subject: Subject,
    /// `None` when no entry may apply.
    pub permissions: Option<Permissions>,
}

/// A named scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Human-readable name for the scenario.
    pub name: &'static str,
    pub tree: TreeSpec,
    /// Page the resolution starts from.
    pub root: PageId,
    pub precedence: AncestorPrecedence,
    pub expectations: Vec<Expectation>,
}

fn expect(page: u64, subject: Subject, permissions: Option<u32>) -> Expectation {
    Expectation {
        page: PageId(page),
        subject,
        permissions: permissions.map(Permissions),
    }
}

/// Get all named scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "recursive grant reaches children",
            tree: TreeSpec::new()
                .root(1)
                .child(2, 1)
                .grant(1, Subject::group(5), 31, true),
            root: PageId(1),
            precedence: AncestorPrecedence::Nearest,
            expectations: vec![
                expect(1, Subject::group(5), Some(31)),
                expect(2, Subject::group(5), Some(31)),
            ],
        },
        Scenario {
            name: "non-recursive override stays on its page",
            tree: TreeSpec::new()
                .root(1)
                .child(2, 1)
                .child(3, 2)
                .grant(1, Subject::group(5), 31, true)
                .grant(2, Subject::group(5), 1, false),
            root: PageId(1),
            precedence: AncestorPrecedence::Nearest,
            expectations: vec![
                expect(2, Subject::group(5), Some(1)),
                expect(3, Subject::group(5), Some(31)),
            ],
        },
        Scenario {
            name: "both kinds on one page",
            tree: TreeSpec::new()
                .root(1)
                .child(2, 1)
                .child(3, 1)
                .grant(1, Subject::user(7), 16, true)
                .grant(1, Subject::user(7), 2, false),
            root: PageId(1),
            precedence: AncestorPrecedence::Nearest,
            expectations: vec![
                expect(1, Subject::user(7), Some(2)),
                expect(2, Subject::user(7), Some(16)),
                expect(3, Subject::user(7), Some(16)),
            ],
        },
        Scenario {
            name: "no entries anywhere",
            tree: TreeSpec::new().root(1).child(2, 1),
            root: PageId(1),
            precedence: AncestorPrecedence::Nearest,
            expectations: vec![
                expect(1, Subject::group(5), None),
                expect(2, Subject::user(7), None),
            ],
        },
        Scenario {
            name: "nearest ancestor wins above the start page",
            tree: TreeSpec::new()
                .root(1)
                .child(2, 1)
                .child(3, 2)
                .grant(1, Subject::group(5), 31, true)
                .grant(2, Subject::group(5), 3, true),
            root: PageId(3),
            precedence: AncestorPrecedence::Nearest,
            expectations: vec![expect(3, Subject::group(5), Some(3))],
        },
        Scenario {
            name: "farthest ancestor wins above the start page",
            tree: TreeSpec::new()
                .root(1)
                .child(2, 1)
                .child(3, 2)
                .grant(1, Subject::group(5), 31, true)
                .grant(2, Subject::group(5), 3, true),
            root: PageId(3),
            precedence: AncestorPrecedence::Farthest,
            expectations: vec![expect(3, Subject::group(5), Some(31))],
        },
    ]
}

/// Resolve one scenario against a fresh in-memory store and compare.
///
/// Returns a description of every mismatch.
pub async fn verify_scenario(scenario: &Scenario) -> Vec<String> {
    let store = match scenario.tree.memory_store().await {
        Ok(store) => store,
        Err(e) => return vec![format!("{}: setup failed: {e}", scenario.name)],
    };
    let tree = match AclResolver::new(&store, scenario.precedence)
        .tree(scenario.root, &SubjectFilter::any())
        .await
    {
        Ok(tree) => tree,
        Err(e) => return vec![format!("{}: resolution failed: {e}", scenario.name)],
    };

    scenario
        .expectations
        .iter()
        .filter_map(|exp| {
            let got = tree.permissions(exp.page, exp.subject);
            (got != exp.permissions).then(|| {
                format!(
                    "{}: page {} {}: expected {:?}, got {:?}",
                    scenario.name, exp.page, exp.subject, exp.permissions, got
                )
            })
        })
        .collect()
}

/// Verify every named scenario, returning `(name, mismatches)` pairs.
pub async fn verify_all_scenarios() -> Vec<(&'static str, Vec<String>)> {
    let mut results = Vec::new();
    for scenario in all_scenarios() {
        let mismatches = verify_scenario(&scenario).await;
        results.push((scenario.name, mismatches));
    }
    results
}
