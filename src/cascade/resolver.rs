//! Cascade resolution: which documents make up a subject's settings.

use std::sync::Arc;
use std::thread;

use cascade_merge::{MergeEngine, MergeError};
use cascade_store::{version_of, SettingsDocument, SettingsStore, StoreError, Subject, SubjectDirectory};

use super::merged::{LayerVersion, MergedConfiguration};
use crate::error::SettingsError;

/// Contents used for a layer whose subject never wrote settings.
const EMPTY_DOCUMENT: &str = "{}";

/// One layer of a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub subject: Subject,
    /// Current document, or `None` if the subject has no settings yet.
    pub document: Option<SettingsDocument>,
}

impl Layer {
    pub fn contents(&self) -> &str {
        self.document
            .as_ref()
            .map(|d| d.contents.as_str())
            .unwrap_or(EMPTY_DOCUMENT)
    }

    pub fn version(&self) -> u64 {
        version_of(self.document.as_ref())
    }
}

/// Resolves and merges a subject's cascade against the settings store.
#[derive(Clone)]
pub struct CascadeResolver {
    store: Arc<dyn SettingsStore>,
    directory: Arc<dyn SubjectDirectory>,
    engine: MergeEngine,
}

impl CascadeResolver {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        directory: Arc<dyn SubjectDirectory>,
        engine: MergeEngine,
    ) -> Self {
        Self {
            store,
            directory,
            engine,
        }
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// Subjects of the cascade, least specific first.
    pub fn cascade_subjects(&self, subject: &Subject) -> Result<Vec<Subject>, SettingsError> {
        if !self.directory.subject_exists(subject)? {
            return Err(SettingsError::SubjectNotFound(subject.clone()));
        }

        let mut chain = vec![Subject::Global];
        match subject {
            Subject::Global => {}
            Subject::Org(_) => chain.push(subject.clone()),
            Subject::User(name) => {
                let mut orgs = self.directory.organizations_of(name)?;
                orgs.sort();
                orgs.dedup();
                chain.extend(orgs.into_iter().map(Subject::Org));
                chain.push(subject.clone());
            }
        }
        Ok(chain)
    }

    /// Fetch the current document of every cascade layer.
    ///
    /// Layers are fetched concurrently; the result is always in cascade
    /// order. Any store failure fails the whole resolution.
    pub fn resolve_cascade(&self, subject: &Subject) -> Result<Vec<Layer>, SettingsError> {
        let subjects = self.cascade_subjects(subject)?;
        let store = self.store.as_ref();

        let fetched: Vec<Result<Option<SettingsDocument>, StoreError>> = thread::scope(|scope| {
            let handles: Vec<_> = subjects
                .iter()
                .map(|layer| scope.spawn(move || store.get_current(layer)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(StoreError::Unavailable("layer fetch panicked".to_string()))
                    })
                })
                .collect()
        });

        subjects
            .into_iter()
            .zip(fetched)
            .map(|(subject, document)| {
                let document = document.map_err(|e| {
                    tracing::warn!(%subject, error = %e, "failed to fetch settings layer");
                    SettingsError::from(e)
                })?;
                Ok(Layer { subject, document })
            })
            .collect()
    }

    /// Resolve and merge the subject's cascade.
    pub fn resolve(&self, subject: &Subject) -> Result<MergedConfiguration, SettingsError> {
        let layers = self.resolve_cascade(subject)?;
        let contents: Vec<&str> = layers.iter().map(Layer::contents).collect();

        let settings = self.engine.merge(contents.as_slice()).map_err(|e| {
            let layer = &layers[e.index()];
            tracing::warn!(subject = %layer.subject, error = %e, "settings layer failed to merge");
            match e {
                MergeError::Syntax { source, .. } => SettingsError::Syntax {
                    subject: layer.subject.clone(),
                    error: source,
                },
                MergeError::NotAnObject { .. } => SettingsError::Validation(format!(
                    "settings for {} must be a JSON object",
                    layer.subject
                )),
            }
        })?;

        let own_version = layers.last().map(Layer::version).unwrap_or_default();
        let sources = layers
            .iter()
            .filter_map(|layer| {
                layer.document.as_ref().map(|doc| LayerVersion {
                    subject: layer.subject.clone(),
                    version: doc.version,
                })
            })
            .collect();

        tracing::debug!(%subject, layers = layers.len(), "resolved settings cascade");
        MergedConfiguration::new(subject.clone(), own_version, settings, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_merge::MergePolicy;
    use cascade_store::MemoryStore;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, CascadeResolver) {
        let store = Arc::new(MemoryStore::new());
        store.register_org("zeta").unwrap();
        store.register_org("acme").unwrap();
        store.register_user("alice", &["zeta", "acme"]).unwrap();
        store.register_user("bob", &[]).unwrap();

        let resolver = CascadeResolver::new(
            store.clone(),
            store.clone(),
            MergeEngine::new(MergePolicy::new(["notices"])),
        );
        (store, resolver)
    }

    fn write(store: &MemoryStore, subject: &Subject, contents: &str) {
        let version = version_of(store.get_current(subject).unwrap().as_ref());
        store
            .create_if_version_matches(subject, version, contents, "test")
            .unwrap();
    }

    #[test]
    fn test_cascade_order_for_user() {
        let (_, resolver) = setup();
        let alice = Subject::user("alice").unwrap();
        let chain = resolver.cascade_subjects(&alice).unwrap();
        assert_eq!(
            chain,
            vec![
                Subject::Global,
                Subject::Org("acme".into()),
                Subject::Org("zeta".into()),
                alice,
            ]
        );
    }

    #[test]
    fn test_cascade_for_org_and_global() {
        let (_, resolver) = setup();
        assert_eq!(
            resolver.cascade_subjects(&Subject::Global).unwrap(),
            vec![Subject::Global]
        );
        let acme = Subject::org("acme").unwrap();
        assert_eq!(
            resolver.cascade_subjects(&acme).unwrap(),
            vec![Subject::Global, acme]
        );
    }

    #[test]
    fn test_unknown_subject() {
        let (_, resolver) = setup();
        let err = resolver
            .resolve(&Subject::user("ghost").unwrap())
            .unwrap_err();
        assert!(matches!(err, SettingsError::SubjectNotFound(_)));
    }

    #[test]
    fn test_missing_layers_are_empty() {
        let (_, resolver) = setup();
        let merged = resolver.resolve(&Subject::user("bob").unwrap()).unwrap();
        assert_eq!(merged.settings, json!({}));
        assert!(merged.sources.is_empty());
        assert_eq!(merged.version, 0);
    }

    #[test]
    fn test_resolve_merges_in_order() {
        let (store, resolver) = setup();
        let alice = Subject::user("alice").unwrap();
        write(&store, &Subject::Global, r#"{"theme":"light","notices":["g"]}"#);
        write(&store, &Subject::Org("acme".into()), r#"{"theme":"dark","notices":["acme"]}"#);
        write(&store, &Subject::Org("zeta".into()), r#"{"notices":null}"#);
        write(&store, &alice, "// mine\n{\"notices\":[\"alice\"]}");
        write(&store, &alice, "{\"notices\":[\"alice2\"],}");

        let merged = resolver.resolve(&alice).unwrap();
        assert_eq!(
            merged.settings,
            json!({"theme": "dark", "notices": ["g", "acme", "alice2"]})
        );
        assert_eq!(merged.version, 2);
        assert_eq!(
            merged.sources,
            vec![
                LayerVersion { subject: Subject::Global, version: 1 },
                LayerVersion { subject: Subject::Org("acme".into()), version: 1 },
                LayerVersion { subject: Subject::Org("zeta".into()), version: 1 },
                LayerVersion { subject: alice.clone(), version: 2 },
            ]
        );
    }

    #[test]
    fn test_syntax_error_names_layer() {
        let (store, resolver) = setup();
        write(&store, &Subject::Org("zeta".into()), "{ broken");
        write(&store, &Subject::Global, r#"{"a":1}"#);

        let err = resolver
            .resolve(&Subject::user("alice").unwrap())
            .unwrap_err();
        match err {
            SettingsError::Syntax { subject, .. } => assert_eq!(subject, Subject::Org("zeta".into())),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_object_layer_is_validation_error() {
        let (store, resolver) = setup();
        write(&store, &Subject::Global, "[1,2,3]");
        let err = resolver.resolve(&Subject::Global).unwrap_err();
        assert!(matches!(err, SettingsError::Validation(_)));
    }

    #[test]
    fn test_store_unavailable_propagates() {
        let (store, resolver) = setup();
        store.set_unavailable(true);
        let err = resolver.resolve(&Subject::Global).unwrap_err();
        assert!(matches!(err, SettingsError::StoreUnavailable(_)));
    }
}
