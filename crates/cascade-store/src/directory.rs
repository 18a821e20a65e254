//! Subject directory: which orgs and users exist, and memberships.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::subject::Subject;

/// Lookup of subjects and organization memberships.
///
/// The global subject always exists.
pub trait SubjectDirectory: Send + Sync {
    fn subject_exists(&self, subject: &Subject) -> Result<bool, StoreError>;

    /// Organizations the user belongs to, ascending by name.
    ///
    /// Fails with [`StoreError::UnknownSubject`] for an unregistered user.
    fn organizations_of(&self, user: &str) -> Result<Vec<String>, StoreError>;
}

/// Serializable membership table shared by the store implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    orgs: BTreeSet<String>,
    #[serde(default)]
    users: BTreeMap<String, BTreeSet<String>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        match subject {
            Subject::Global => true,
            Subject::Org(name) => self.orgs.contains(name),
            Subject::User(name) => self.users.contains_key(name),
        }
    }

    pub fn organizations_of(&self, user: &str) -> Result<Vec<String>, StoreError> {
        self.users
            .get(user)
            .map(|orgs| orgs.iter().cloned().collect())
            .ok_or_else(|| StoreError::UnknownSubject(Subject::User(user.to_string())))
    }

    pub fn add_org(&mut self, org: &Subject) -> Result<(), StoreError> {
        let Subject::Org(name) = org else {
            return Err(StoreError::UnknownSubject(org.clone()));
        };
        if !self.orgs.insert(name.clone()) {
            return Err(StoreError::AlreadyRegistered(org.clone()));
        }
        Ok(())
    }

    /// Register a user. Every listed org must already be registered.
    pub fn add_user(&mut self, user: &Subject, orgs: &[String]) -> Result<(), StoreError> {
        let Subject::User(name) = user else {
            return Err(StoreError::UnknownSubject(user.clone()));
        };
        if self.users.contains_key(name) {
            return Err(StoreError::AlreadyRegistered(user.clone()));
        }
        if let Some(missing) = orgs.iter().find(|org| !self.orgs.contains(*org)) {
            return Err(StoreError::UnknownSubject(Subject::Org(missing.clone())));
        }
        self.users
            .insert(name.clone(), orgs.iter().cloned().collect());
        Ok(())
    }

    /// Add an existing user to an existing org. Idempotent.
    pub fn join(&mut self, user: &str, org: &str) -> Result<(), StoreError> {
        if !self.orgs.contains(org) {
            return Err(StoreError::UnknownSubject(Subject::Org(org.to_string())));
        }
        let memberships = self
            .users
            .get_mut(user)
            .ok_or_else(|| StoreError::UnknownSubject(Subject::User(user.to_string())))?;
        memberships.insert(org.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str) -> Subject {
        Subject::org(name).unwrap()
    }

    fn user(name: &str) -> Subject {
        Subject::user(name).unwrap()
    }

    #[test]
    fn test_global_always_exists() {
        assert!(Directory::new().contains(&Subject::Global));
    }

    #[test]
    fn test_memberships_sorted() {
        let mut dir = Directory::new();
        dir.add_org(&org("zeta")).unwrap();
        dir.add_org(&org("alpha")).unwrap();
        dir.add_user(&user("alice"), &["zeta".into(), "alpha".into()])
            .unwrap();

        assert_eq!(dir.organizations_of("alice").unwrap(), vec!["alpha", "zeta"]);
        assert!(dir.contains(&user("alice")));
        assert!(dir.contains(&org("zeta")));
    }

    #[test]
    fn test_unknown_user() {
        let dir = Directory::new();
        assert!(matches!(
            dir.organizations_of("ghost"),
            Err(StoreError::UnknownSubject(_))
        ));
    }

    #[test]
    fn test_add_user_requires_orgs() {
        let mut dir = Directory::new();
        let err = dir.add_user(&user("bob"), &["missing".into()]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownSubject(Subject::Org(ref n)) if n == "missing"));
        assert!(!dir.contains(&user("bob")));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut dir = Directory::new();
        dir.add_org(&org("acme")).unwrap();
        assert!(matches!(
            dir.add_org(&org("acme")),
            Err(StoreError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_join() {
        let mut dir = Directory::new();
        dir.add_org(&org("acme")).unwrap();
        dir.add_user(&user("carol"), &[]).unwrap();
        dir.join("carol", "acme").unwrap();
        dir.join("carol", "acme").unwrap();
        assert_eq!(dir.organizations_of("carol").unwrap(), vec!["acme"]);
    }
}
