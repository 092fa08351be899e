pub mod file;
pub mod http;
pub mod yaml;

// Re-export common utilities
pub use file::{file_exists, file_get, file_write};
pub use http::{web_get_async, FetchError, FetchOptions};
pub use yaml::{value_kind, value_preview};
