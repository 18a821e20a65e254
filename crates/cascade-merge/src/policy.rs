//! Merge policy: which top-level keys are deeply merged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Top-level keys that are deeply merged out of the box.
///
/// These are multi-valued extension points where every layer of the cascade
/// is expected to contribute entries rather than replace the whole list.
pub const DEFAULT_DEEPLY_MERGED_FIELDS: &[&str] = &[
    "extensions",
    "motd",
    "notices",
    "quicklinks",
    "search.repositoryGroups",
    "search.savedQueries",
    "search.scopes",
];

/// The set of top-level keys that receive deep-merge treatment.
///
/// Every key outside the set is overridden by the most specific layer.
/// The set is fixed once the policy is built; it is only ever consulted for
/// top-level keys, never for nested ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePolicy {
    deeply_merged: BTreeSet<String>,
}

impl MergePolicy {
    /// Build a policy from an explicit list of deeply merged keys.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            deeply_merged: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// A policy where every key is overridden.
    pub fn override_all() -> Self {
        Self {
            deeply_merged: BTreeSet::new(),
        }
    }

    /// Whether `key` (a top-level key) is deeply merged.
    pub fn is_deeply_merged(&self, key: &str) -> bool {
        self.deeply_merged.contains(key)
    }

    /// Deeply merged keys, in lexicographic order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.deeply_merged.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.deeply_merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deeply_merged.is_empty()
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DEEPLY_MERGED_FIELDS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = MergePolicy::default();
        assert_eq!(policy.len(), DEFAULT_DEEPLY_MERGED_FIELDS.len());
        assert!(policy.is_deeply_merged("search.scopes"));
        assert!(policy.is_deeply_merged("motd"));
        assert!(!policy.is_deeply_merged("search"));
        assert!(!policy.is_deeply_merged("editor.fontSize"));
    }

    #[test]
    fn test_override_all() {
        let policy = MergePolicy::override_all();
        assert!(policy.is_empty());
        assert!(!policy.is_deeply_merged("motd"));
    }

    #[test]
    fn test_fields_sorted_and_deduplicated() {
        let policy = MergePolicy::new(["b", "a", "b"]);
        assert_eq!(policy.fields().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_policy_serialization() {
        let policy = MergePolicy::new(["notices", "motd"]);
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"["motd","notices"]"#);
        let parsed: MergePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }
}
