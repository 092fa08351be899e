use crate::settings::Settings;

/// Application state structure for the web server
///
/// Built once at startup and shared behind an `Arc`; request handlers only
/// ever read from it.
#[derive(Debug)]
pub struct AppState {
    /// Global application settings
    pub config: Settings,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Whether `token` grants access to the merged profile
    pub fn is_authorized(&self, token: Option<&str>) -> bool {
        !self.config.token.is_empty() && token == Some(self.config.token.as_str())
    }
}
