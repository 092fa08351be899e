pub mod interfaces;

pub use interfaces::{rewrite_handler, RewriteQuery, FALLBACK_GREETING};
