pub mod settings;
pub mod source;

pub use settings::{ServerSettings, SettingsError, SettingsOverrides, TransportKind};
pub use source::{
    config_source_from_location, ConfigSource, FileConfigSource, HttpConfigSource,
    StaticConfigSource,
};
