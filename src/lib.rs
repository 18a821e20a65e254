//! Settings Cascade
//!
//! Layered configuration for global, organization, and user subjects.
//! Each subject owns a versioned JSON-with-comments document; a subject's
//! effective settings are the merge of its cascade (global, then its
//! organizations, then itself). Edits touch one layer and are committed
//! only if the client's last-seen version is still current.

pub mod cascade;
pub mod config;
pub mod error;
pub mod rpc;
pub mod service;
pub mod update;

pub use cascade::{CascadeResolver, Layer, LayerVersion, MergedConfiguration};
pub use cascade_merge::{normalize, MergeEngine, MergeError, MergePolicy, SyntaxError};
pub use cascade_store::{
    FsStore, MemoryStore, SettingsDocument, SettingsStore, StoreError, Subject, SubjectDirectory,
    NO_VERSION,
};
pub use config::ServiceConfig;
pub use error::SettingsError;
pub use rpc::RpcHandler;
pub use service::SettingsService;
pub use update::{Edit, UpdateCoordinator, UpdateRequest};
