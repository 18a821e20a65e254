//! Filesystem-backed settings store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/directory.json                        subject directory
//! <root>/settings/global/<version>.json        one record per version
//! <root>/settings/org/<name>/<version>.json
//! <root>/settings/user/<name>/<version>.json
//! <root>/.tmp/                                 staging for atomic publish
//! ```
//!
//! Versions are zero-padded to 20 digits so lexical and numeric order agree.
//! A version is published by hard-linking a fully written temp file onto
//! its final name; the link fails if that version already exists, which is
//! what makes compare-and-swap safe across threads and processes.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::directory::{Directory, SubjectDirectory};
use crate::document::SettingsDocument;
use crate::error::StoreError;
use crate::subject::Subject;
use crate::{SettingsStore, NO_VERSION};

/// Sequence for unique temp file names within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const DIRECTORY_FILE: &str = "directory.json";

#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    /// Serializes directory read-modify-write within this process.
    directory_lock: Mutex<()>,
}

impl FsStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("settings"))?;
        fs::create_dir_all(root.join(".tmp"))?;

        let store = Self {
            root,
            directory_lock: Mutex::new(()),
        };

        // Verify the store is writable
        let probe = store.temp_path();
        File::create(&probe)?;
        fs::remove_file(&probe)?;

        tracing::debug!(root = %store.root.display(), "opened settings store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn register_org(&self, name: &str) -> Result<Subject, StoreError> {
        let org = Subject::org(name)?;
        self.update_directory(|dir| dir.add_org(&org))?;
        Ok(org)
    }

    pub fn register_user(&self, name: &str, orgs: &[String]) -> Result<Subject, StoreError> {
        let user = Subject::user(name)?;
        self.update_directory(|dir| dir.add_user(&user, orgs))?;
        Ok(user)
    }

    pub fn join(&self, user: &str, org: &str) -> Result<(), StoreError> {
        self.update_directory(|dir| dir.join(user, org))
    }

    fn subject_dir(&self, subject: &Subject) -> PathBuf {
        let settings = self.root.join("settings");
        match subject {
            Subject::Global => settings.join("global"),
            Subject::Org(name) => settings.join("org").join(name),
            Subject::User(name) => settings.join("user").join(name),
        }
    }

    fn version_path(dir: &Path, version: u64) -> PathBuf {
        dir.join(format!("{:020}.json", version))
    }

    /// Stored versions for a subject directory, ascending.
    fn versions(dir: &Path) -> Result<Vec<u64>, StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let parsed = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(version) = parsed {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn read_record(path: &Path) -> Result<SettingsDocument, StoreError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        self.root.join(".tmp").join(format!(
            ".tmp.{}.{}.{}",
            std::process::id(),
            nanos,
            TEMP_COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }

    fn write_temp(&self, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let temp = self.temp_path();
        let result = File::create(&temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(temp)
    }

    fn load_directory(&self) -> Result<Directory, StoreError> {
        let path = self.root.join(DIRECTORY_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Directory::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn update_directory<F>(&self, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Directory) -> Result<(), StoreError>,
    {
        let _guard = self
            .directory_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))?;

        let mut directory = self.load_directory()?;
        edit(&mut directory)?;

        let bytes = serde_json::to_vec_pretty(&directory).map_err(|e| StoreError::Corrupt {
            path: self.root.join(DIRECTORY_FILE),
            message: e.to_string(),
        })?;
        let temp = self.write_temp(&bytes)?;
        if let Err(e) = fs::rename(&temp, self.root.join(DIRECTORY_FILE)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl SettingsStore for FsStore {
    fn get_current(&self, subject: &Subject) -> Result<Option<SettingsDocument>, StoreError> {
        let dir = self.subject_dir(subject);
        match Self::versions(&dir)?.last() {
            Some(&version) => Self::read_record(&Self::version_path(&dir, version)).map(Some),
            None => Ok(None),
        }
    }

    fn create_if_version_matches(
        &self,
        subject: &Subject,
        expected_version: u64,
        contents: &str,
        author: &str,
    ) -> Result<SettingsDocument, StoreError> {
        let dir = self.subject_dir(subject);
        fs::create_dir_all(&dir)?;

        let conflict = |actual: u64| StoreError::VersionConflict {
            subject: subject.clone(),
            expected: expected_version,
            actual,
        };

        // Versions are contiguous and never removed, so once the expected
        // version is confirmed current, the only way to lose is for someone
        // else to publish expected + 1 first, which the link below detects.
        let actual = Self::versions(&dir)?.last().copied().unwrap_or(NO_VERSION);
        if actual != expected_version {
            return Err(conflict(actual));
        }

        let document = SettingsDocument::new(
            subject.clone(),
            expected_version + 1,
            contents.to_string(),
            author.to_string(),
        );
        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| StoreError::Corrupt {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        let temp = self.write_temp(&bytes)?;
        let target = Self::version_path(&dir, document.version);
        let linked = fs::hard_link(&temp, &target);
        let _ = fs::remove_file(&temp);

        match linked {
            Ok(()) => {
                tracing::debug!(%subject, version = document.version, "published settings version");
                Ok(document)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let actual = Self::versions(&dir)?.last().copied().unwrap_or(NO_VERSION);
                tracing::debug!(%subject, expected_version, actual, "lost publish race");
                Err(conflict(actual))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn history(&self, subject: &Subject) -> Result<Vec<SettingsDocument>, StoreError> {
        let dir = self.subject_dir(subject);
        Self::versions(&dir)?
            .into_iter()
            .map(|version| Self::read_record(&Self::version_path(&dir, version)))
            .collect()
    }
}

impl SubjectDirectory for FsStore {
    fn subject_exists(&self, subject: &Subject) -> Result<bool, StoreError> {
        Ok(self.load_directory()?.contains(subject))
    }

    fn organizations_of(&self, user: &str) -> Result<Vec<String>, StoreError> {
        self.load_directory()?.organizations_of(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_layout() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::open(temp.path().join("store")).unwrap();
        assert!(store.root().join("settings").is_dir());
        assert!(store.get_current(&Subject::Global).unwrap().is_none());
    }

    #[test]
    fn test_write_and_read_back() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::open(temp.path()).unwrap();
        let org = store.register_org("acme").unwrap();

        let doc = store
            .create_if_version_matches(&org, 0, "{\"a\": 1 // c\n}", "admin")
            .unwrap();
        assert_eq!(doc.version, 1);

        let path = temp
            .path()
            .join("settings/org/acme/00000000000000000001.json");
        assert!(path.exists());

        let current = store.get_current(&org).unwrap().unwrap();
        assert_eq!(current, doc);
    }

    #[test]
    fn test_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let store = FsStore::open(temp.path()).unwrap();
            store.register_org("acme").unwrap();
            store.register_user("alice", &["acme".to_string()]).unwrap();
            store
                .create_if_version_matches(&Subject::Global, 0, "{}", "admin")
                .unwrap();
        }

        let store = FsStore::open(temp.path()).unwrap();
        assert_eq!(store.organizations_of("alice").unwrap(), vec!["acme"]);
        assert_eq!(
            store.get_current(&Subject::Global).unwrap().unwrap().version,
            1
        );
    }

    #[test]
    fn test_stale_write_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::open(temp.path()).unwrap();
        store
            .create_if_version_matches(&Subject::Global, 0, "{}", "a")
            .unwrap();
        store
            .create_if_version_matches(&Subject::Global, 1, "{}", "a")
            .unwrap();

        let err = store
            .create_if_version_matches(&Subject::Global, 1, "{}", "b")
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { expected: 1, actual: 2, .. }
        ));
        assert_eq!(store.history(&Subject::Global).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_writers_one_wins() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(FsStore::open(temp.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.create_if_version_matches(
                        &Subject::Global,
                        0,
                        &format!("{{\"writer\": {}}}", i),
                        "w",
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::VersionConflict { .. })));
        assert_eq!(store.history(&Subject::Global).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_record() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::open(temp.path()).unwrap();
        let dir = temp.path().join("settings/global");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("00000000000000000001.json"), "not json").unwrap();

        assert!(matches!(
            store.get_current(&Subject::Global),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::open(temp.path()).unwrap();
        let dir = temp.path().join("settings/global");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();

        assert!(store.get_current(&Subject::Global).unwrap().is_none());
    }
}
