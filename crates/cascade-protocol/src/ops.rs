//! Operation-specific types.

pub mod probe;
pub mod settings;

pub use probe::ProbeResponse;
pub use settings::{
    DocumentInfo, GetSettingsRequest, LayerSource, SettingsView, UpdateSettingsRequest,
    UpdateSettingsResponse,
};

/// Known operation names.
pub mod names {
    pub const PROBE: &str = "probe";
    pub const SETTINGS_GET: &str = "settings.get";
    pub const SETTINGS_UPDATE: &str = "settings.update";

    /// All operations, in the order they are advertised by probe.
    pub const ALL: &[&str] = &[PROBE, SETTINGS_GET, SETTINGS_UPDATE];
}
