//! Data model of a Clash profile
//!
//! Only the parts of the profile the rewriter touches are typed precisely;
//! everything else is kept as raw YAML so it can be written back verbatim.

pub mod app_state;
pub mod clash_config;
pub mod proxy;

pub use app_state::AppState;
pub use clash_config::{ClashConfig, ClashForAndroid, Dns, ExtraOptions, FallbackFilter, Profile};
pub use proxy::{Proxy, ProxyGroup};
