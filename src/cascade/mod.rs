//! Read path: resolve a subject's cascade and merge it.
//!
//! The cascade of a subject is, least specific first:
//! 1. the global layer
//! 2. each organization the subject belongs to (users only), by name
//! 3. the subject's own layer

mod merged;
mod resolver;

pub use merged::{LayerVersion, MergedConfiguration};
pub use resolver::{CascadeResolver, Layer};
