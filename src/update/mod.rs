//! Write path: optimistic-concurrency edits to one subject's document.
//!
//! An edit touches exactly one layer. It is applied to the subject's own
//! document (never the merged cascade) and committed only if the stored
//! version still equals the version the client last saw. There is no retry
//! loop; on conflict the caller re-reads and decides.

use std::sync::Arc;

use cascade_merge::{normalize, to_sorted_pretty};
use cascade_store::{version_of, SettingsDocument, SettingsStore, StoreError, Subject, SubjectDirectory};
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// A single top-level property edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Set the key, replacing any previous value (never deep-merged).
    Set(Value),
    /// Remove the key if present.
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub subject: Subject,
    /// Version the client last observed (0 if the subject had no settings).
    pub expected_version: u64,
    pub key: String,
    pub edit: Edit,
    pub author: String,
}

pub struct UpdateCoordinator {
    store: Arc<dyn SettingsStore>,
    directory: Arc<dyn SubjectDirectory>,
}

impl UpdateCoordinator {
    pub fn new(store: Arc<dyn SettingsStore>, directory: Arc<dyn SubjectDirectory>) -> Self {
        Self { store, directory }
    }

    /// Apply the edit and commit a new version of the subject's document.
    pub fn update_configuration(&self, request: UpdateRequest) -> Result<SettingsDocument, SettingsError> {
        let UpdateRequest {
            subject,
            expected_version,
            key,
            edit,
            author,
        } = request;

        if key.is_empty() {
            return Err(SettingsError::Validation("property key must not be empty".to_string()));
        }
        if author.is_empty() {
            return Err(SettingsError::Validation("author must not be empty".to_string()));
        }
        if !self.directory.subject_exists(&subject)? {
            return Err(SettingsError::SubjectNotFound(subject));
        }

        let current = self.store.get_current(&subject)?;
        let actual = version_of(current.as_ref());
        if actual != expected_version {
            tracing::warn!(%subject, expected_version, actual, "rejected edit from stale view");
            return Err(SettingsError::Conflict {
                subject,
                expected: expected_version,
                actual,
            });
        }

        let mut fields = match &current {
            Some(document) => parse_object(&subject, &document.contents)?,
            None => Map::new(),
        };
        match edit {
            Edit::Set(value) => {
                fields.insert(key.clone(), value);
            }
            Edit::Remove => {
                fields.remove(&key);
            }
        }

        let contents = to_sorted_pretty(&Value::Object(fields))
            .map_err(|e| SettingsError::Validation(format!("settings serialization failed: {}", e)))?;

        let document = self
            .store
            .create_if_version_matches(&subject, expected_version, &contents, &author)
            .map_err(|e| {
                if let StoreError::VersionConflict { actual, .. } = &e {
                    tracing::warn!(%subject, expected_version, actual, "lost concurrent edit race");
                }
                SettingsError::from(e)
            })?;

        tracing::info!(
            %subject,
            version = document.version,
            property = %key,
            author = %document.author,
            "committed settings edit"
        );
        Ok(document)
    }
}

fn parse_object(subject: &Subject, contents: &str) -> Result<Map<String, Value>, SettingsError> {
    match normalize(contents) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(SettingsError::Validation(format!(
            "settings for {} must be a JSON object",
            subject
        ))),
        Err(error) => Err(SettingsError::Syntax {
            subject: subject.clone(),
            error,
        }),
    }
}
