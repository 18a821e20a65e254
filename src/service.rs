//! Query and mutation API over the settings cascade.

use std::sync::Arc;

use cascade_merge::{MergeEngine, MergePolicy};
use cascade_protocol::ops::{
    DocumentInfo, GetSettingsRequest, SettingsView, UpdateSettingsRequest, UpdateSettingsResponse,
};
use cascade_store::{SettingsDocument, SettingsStore, Subject, SubjectDirectory};

use crate::cascade::{CascadeResolver, MergedConfiguration};
use crate::error::SettingsError;
use crate::update::{Edit, UpdateCoordinator, UpdateRequest};

/// Author recorded when a mutation does not name one.
pub const DEFAULT_AUTHOR: &str = "system";

/// Entry point used by the CLI and the RPC dispatcher.
pub struct SettingsService {
    resolver: CascadeResolver,
    coordinator: UpdateCoordinator,
}

impl SettingsService {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        directory: Arc<dyn SubjectDirectory>,
        policy: MergePolicy,
    ) -> Self {
        Self {
            resolver: CascadeResolver::new(store.clone(), directory.clone(), MergeEngine::new(policy)),
            coordinator: UpdateCoordinator::new(store, directory),
        }
    }

    /// Build a service over a store that is also its own subject directory.
    pub fn with_store<S>(store: Arc<S>, policy: MergePolicy) -> Self
    where
        S: SettingsStore + SubjectDirectory + 'static,
    {
        Self::new(store.clone(), store, policy)
    }

    pub fn policy(&self) -> &MergePolicy {
        self.resolver.engine().policy()
    }

    /// Merged configuration for the subject's full cascade.
    pub fn merged(&self, subject: &Subject) -> Result<MergedConfiguration, SettingsError> {
        self.resolver.resolve(subject)
    }

    /// Edit one layer. Returns the new document without merging.
    pub fn update_configuration(&self, request: UpdateRequest) -> Result<SettingsDocument, SettingsError> {
        self.coordinator.update_configuration(request)
    }

    /// Query API: `{subject}` to merged view.
    pub fn get(&self, request: &GetSettingsRequest) -> Result<SettingsView, SettingsError> {
        let subject: Subject = request.subject.parse()?;
        Ok(self.merged(&subject)?.to_view())
    }

    /// Mutation API: edit one property, then return the new merged view.
    ///
    /// The whole cascade must merge before anything is written, so a broken
    /// ancestor layer rejects the edit. Once the write is committed the call
    /// succeeds; if the cascade cannot be merged afterwards the response
    /// carries no view.
    pub fn update(&self, request: UpdateSettingsRequest) -> Result<UpdateSettingsResponse, SettingsError> {
        let subject: Subject = request.subject.parse()?;
        self.merged(&subject)?;

        let edit = if request.remove {
            Edit::Remove
        } else {
            Edit::Set(request.value)
        };

        let document = self.update_configuration(UpdateRequest {
            subject: subject.clone(),
            expected_version: request.last_version,
            key: request.property,
            edit,
            author: request.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        })?;

        let view = match self.merged(&subject) {
            Ok(merged) => Some(merged.to_view()),
            Err(e) => {
                tracing::warn!(%subject, version = document.version, error = %e, "committed edit but cascade no longer merges");
                None
            }
        };

        Ok(UpdateSettingsResponse {
            document: DocumentInfo {
                subject: document.subject.to_string(),
                version: document.version,
                author: document.author,
                created_at: document.created_at,
            },
            view,
        })
    }
}
