//! Property-based test generators using proptest.
//!
//! Provides strategies for generating store contents that the reference
//! library accepts.

use natrix_ffi::{NxKind, NX_KIND_BLOB, NX_KIND_COMMIT, NX_KIND_TREE};
use proptest::prelude::*;

/// Strategy for generating concrete object kinds.
pub fn kind_strategy() -> impl Strategy<Value = NxKind> {
    prop_oneof![Just(NX_KIND_BLOB), Just(NX_KIND_TREE), Just(NX_KIND_COMMIT)]
}

/// Strategy for generating object payloads (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for generating a batch of objects to store.
///
/// Duplicate `(kind, payload)` pairs may occur; the store deduplicates them.
pub fn objects_strategy(max: usize) -> impl Strategy<Value = Vec<(NxKind, Vec<u8>)>> {
    prop::collection::vec((kind_strategy(), payload_strategy()), 0..max)
}

/// Strategy for generating entry names such as `core.editor`.
pub fn entry_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,7}(\\.[a-z][a-z0-9]{0,7}){0,2}")
        .expect("Invalid regex")
}

/// Strategy for generating entry values (printable, no nul bytes).
pub fn entry_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,32}").expect("Invalid regex")
}

/// Strategy for generating entries with unique names, sorted by name.
pub fn entries_strategy(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map(entry_name_strategy(), entry_value_strategy(), 0..max)
        .prop_map(|entries| entries.into_iter().collect())
}

/// A conflict to record in a store.
#[derive(Debug, Clone)]
pub struct ConflictSpec {
    /// Conflicting path.
    pub path: String,
    /// Common ancestor, absent for add/add conflicts.
    pub ancestor: Option<String>,
    /// Our side.
    pub ours: String,
    /// Their side.
    pub theirs: String,
}

/// Strategy for generating conflicts with unique paths.
pub fn conflicts_strategy(max: usize) -> impl Strategy<Value = Vec<ConflictSpec>> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,8}/[a-z]{1,8}\\.txt").expect("Invalid regex"),
        (
            prop::option::of(entry_value_strategy()),
            entry_value_strategy(),
            entry_value_strategy(),
        ),
        0..max,
    )
    .prop_map(|conflicts| {
        conflicts
            .into_iter()
            .map(|(path, (ancestor, ours, theirs))| ConflictSpec {
                path,
                ancestor,
                ours,
                theirs,
            })
            .collect()
    })
}

/// Strategy for picking how many items to consume before abandoning an
/// iteration, given how many exist.
pub fn consumed_strategy(total: usize) -> impl Strategy<Value = usize> {
    0..=total
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
