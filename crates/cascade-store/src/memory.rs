//! In-memory settings store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::directory::{Directory, SubjectDirectory};
use crate::document::SettingsDocument;
use crate::error::StoreError;
use crate::subject::Subject;
use crate::{version_of, SettingsStore};

/// Process-local store.
///
/// One mutex guards all document chains, so the version check and the
/// append in [`SettingsStore::create_if_version_matches`] happen under the
/// same lock. The store can be switched into an unavailable state to
/// exercise infrastructure-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<Subject, Vec<SettingsDocument>>>,
    directory: RwLock<Directory>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn register_org(&self, name: &str) -> Result<Subject, StoreError> {
        let org = Subject::org(name)?;
        self.directory_mut()?.add_org(&org)?;
        Ok(org)
    }

    pub fn register_user(&self, name: &str, orgs: &[&str]) -> Result<Subject, StoreError> {
        let user = Subject::user(name)?;
        let orgs: Vec<String> = orgs.iter().map(|o| o.to_string()).collect();
        self.directory_mut()?.add_user(&user, &orgs)?;
        Ok(user)
    }

    pub fn join(&self, user: &str, org: &str) -> Result<(), StoreError> {
        self.directory_mut()?.join(user, org)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn documents(&self) -> Result<MutexGuard<'_, HashMap<Subject, Vec<SettingsDocument>>>, StoreError> {
        self.check_available()?;
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("document lock poisoned".to_string()))
    }

    fn directory_mut(&self) -> Result<RwLockWriteGuard<'_, Directory>, StoreError> {
        self.check_available()?;
        self.directory
            .write()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }

    fn directory(&self) -> Result<RwLockReadGuard<'_, Directory>, StoreError> {
        self.check_available()?;
        self.directory
            .read()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl SettingsStore for MemoryStore {
    fn get_current(&self, subject: &Subject) -> Result<Option<SettingsDocument>, StoreError> {
        let documents = self.documents()?;
        Ok(documents
            .get(subject)
            .and_then(|chain| chain.last())
            .cloned())
    }

    fn create_if_version_matches(
        &self,
        subject: &Subject,
        expected_version: u64,
        contents: &str,
        author: &str,
    ) -> Result<SettingsDocument, StoreError> {
        let mut documents = self.documents()?;
        let chain = documents.entry(subject.clone()).or_default();

        let actual = version_of(chain.last());
        if actual != expected_version {
            tracing::debug!(%subject, expected_version, actual, "memory store rejected stale write");
            return Err(StoreError::VersionConflict {
                subject: subject.clone(),
                expected: expected_version,
                actual,
            });
        }

        let document = SettingsDocument::new(
            subject.clone(),
            expected_version + 1,
            contents.to_string(),
            author.to_string(),
        );
        chain.push(document.clone());
        Ok(document)
    }

    fn history(&self, subject: &Subject) -> Result<Vec<SettingsDocument>, StoreError> {
        let documents = self.documents()?;
        Ok(documents.get(subject).cloned().unwrap_or_default())
    }
}

impl SubjectDirectory for MemoryStore {
    fn subject_exists(&self, subject: &Subject) -> Result<bool, StoreError> {
        Ok(self.directory()?.contains(subject))
    }

    fn organizations_of(&self, user: &str) -> Result<Vec<String>, StoreError> {
        self.directory()?.organizations_of(user)
    }
}
