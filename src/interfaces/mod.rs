pub mod rewriter;

pub use rewriter::{fetch_and_rewrite, merge_local_proxies, rewrite, to_proxy_list, RewriteError};
