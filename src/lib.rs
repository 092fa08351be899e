pub mod interfaces;
pub mod models;
pub mod settings;
pub mod utils;
#[cfg(feature = "web-api")]
pub mod web_handlers;

// Re-export the main profile types for easier access
pub use models::{ClashConfig, Proxy, ProxyGroup};

pub use interfaces::RewriteError;
pub use settings::Settings;
