//! # Page ACL Testkit
//!
//! Testing utilities for page ACL resolution.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Scenarios**: Small trees with known outcomes for every precedence rule
//! - **Model**: A naive reference resolver to check the real one against
//! - **Generators**: Proptest strategies for random trees and entries
//! - **Fixtures**: Declarative tree setup and instrumented store wrappers
//!
//! ## Scenarios
//!
//! ```rust
//! use page_acl_testkit::scenarios::verify_all_scenarios;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! for (name, mismatches) in verify_all_scenarios().await {
//!     assert!(mismatches.is_empty(), "{name}: {mismatches:?}");
//! }
//! # });
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use page_acl_testkit::generators::tree_spec;
//!
//! proptest! {
//!     #[test]
//!     fn every_page_resolved(spec in tree_spec(12, 16)) {
//!         // load `spec` into a store and resolve from page 1
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use page_acl_testkit::fixtures::TreeSpec;
//! use page_acl_core::Subject;
//!
//! let spec = TreeSpec::new()
//!     .root(1)
//!     .child(2, 1)
//!     .grant(1, Subject::group(5), 31, true);
//! assert_eq!(spec.pages.len(), 2);
//! ```

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod scenarios;

pub use fixtures::{CountingStore, FaultyStore, TreeSpec};
pub use generators::tree_spec;
pub use model::reference_tree;
pub use scenarios::{all_scenarios, verify_all_scenarios, verify_scenario, Expectation, Scenario};
