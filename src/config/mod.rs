//! Service configuration
//!
//! Layered the same way for every command:
//! 1. Built-in defaults
//! 2. Config file (`--config`, or ./settings-cascade.toml if present)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_CONFIG_FILE};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, ServiceConfig};
pub use merge::{deep_merge, merge_layers};
