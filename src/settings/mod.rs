//! Settings module for clash-rewrite
//!
//! Holds the YAML backed process configuration: the shared token, the
//! upstream subscription URL and the local proxies to inject.

pub mod settings_struct;

pub use settings_struct::{Settings, SettingsError, DEFAULT_SETTINGS_PATH};
