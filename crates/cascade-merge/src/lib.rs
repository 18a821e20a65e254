//! Cascade merge engine for layered settings documents.
//!
//! Takes JSON-with-comments documents ordered from least to most specific
//! and folds them into one object. Top-level keys are overridden by later
//! documents, except for the keys named in the [`MergePolicy`], which are
//! deeply merged:
//!
//! - `null` contributes nothing
//! - arrays are concatenated in cascade order
//! - objects are merged one level deep (later keys win, nested values are
//!   replaced wholesale)
//! - any other combination falls back to override
//!
//! A syntax error in any document fails the whole merge.

mod error;
mod format;
mod normalize;
mod policy;

pub use error::{MergeError, SyntaxError};
pub use format::{sorted, to_sorted_compact, to_sorted_pretty};
pub use normalize::normalize;
pub use policy::{MergePolicy, DEFAULT_DEEPLY_MERGED_FIELDS};

use serde_json::map::Entry;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Merges ordered settings documents under a fixed [`MergePolicy`].
///
/// The engine holds no mutable state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    policy: Arc<MergePolicy>,
}

impl MergeEngine {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn with_shared_policy(policy: Arc<MergePolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Normalize and merge raw documents, lowest precedence first.
    ///
    /// Every document is normalized before any merging happens, so a bad
    /// document anywhere in the list yields an error and nothing else.
    pub fn merge<S: AsRef<str>>(&self, documents: &[S]) -> Result<Value, MergeError> {
        let normalized = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                normalize(doc.as_ref()).map_err(|source| MergeError::Syntax { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.merge_values(normalized)
    }

    /// Merge already-normalized documents, lowest precedence first.
    pub fn merge_values<I>(&self, documents: I) -> Result<Value, MergeError>
    where
        I: IntoIterator<Item = Value>,
    {
        let documents: Vec<Value> = documents.into_iter().collect();
        if let Some(index) = documents.iter().position(|doc| !doc.is_object()) {
            return Err(MergeError::NotAnObject { index });
        }

        let mut merged = Map::new();
        for document in documents {
            let Value::Object(fields) = document else {
                continue;
            };
            for (key, incoming) in fields {
                if self.policy.is_deeply_merged(&key) {
                    merge_deep_field(&mut merged, key, incoming);
                } else {
                    merged.insert(key, incoming);
                }
            }
        }

        Ok(Value::Object(merged))
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}

fn merge_deep_field(merged: &mut Map<String, Value>, key: String, incoming: Value) {
    if incoming.is_null() {
        return;
    }

    match merged.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(incoming);
        }
        Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
            (Value::Array(current), Value::Array(items)) => current.extend(items),
            // One level only: nested objects are replaced, not merged.
            (Value::Object(current), Value::Object(fields)) => current.extend(fields),
            (current, incoming) => *current = incoming,
        },
    }
}
