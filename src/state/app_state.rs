// Application state
// Immutable per-process context injected into handlers through axum's `State`

use crate::config::Config;
use crate::services::ScratchDir;
use std::sync::Arc;

/// Shared application state
///
/// Cloning is cheap; every clone points at the same configuration.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    scratch: ScratchDir,
}

impl AppState {
    /// Build the state from a loaded configuration
    pub fn new(config: Config) -> Self {
        let scratch = ScratchDir::new(config.storage.scratch_dir.clone());
        Self {
            config: Arc::new(config),
            scratch,
        }
    }

    /// Application configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scratch storage for uploads and protected copies
    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Password to apply when the request supplied `submitted`
    ///
    /// Returns `None` when no usable password was submitted and the fallback
    /// is disabled.
    pub fn effective_password(&self, submitted: Option<String>) -> Option<String> {
        match submitted.filter(|p| !p.is_empty()) {
            Some(password) => Some(password),
            None if self.config.protection.require_password => None,
            None => Some(self.config.protection.default_password.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_new_uses_configured_scratch_dir() {
        let mut config = Config::default();
        config.storage.scratch_dir = "/tmp/pdf-protector-test".into();
        let state = AppState::new(config);
        assert_eq!(state.scratch().root(), Path::new("/tmp/pdf-protector-test"));
    }

    #[test]
    fn test_effective_password_prefers_submitted() {
        let state = AppState::new(Config::default());
        assert_eq!(
            state.effective_password(Some("secret".to_string())),
            Some("secret".to_string())
        );
    }

    #[test]
    fn test_effective_password_falls_back() {
        let state = AppState::new(Config::default());
        assert_eq!(state.effective_password(None), Some("defaultPassword".to_string()));
        assert_eq!(
            state.effective_password(Some(String::new())),
            Some("defaultPassword".to_string())
        );
    }

    #[test]
    fn test_effective_password_required() {
        let mut config = Config::default();
        config.protection.require_password = true;
        let state = AppState::new(config);
        assert_eq!(state.effective_password(None), None);
        assert_eq!(state.effective_password(Some(String::new())), None);
        assert_eq!(state.effective_password(Some("pw".to_string())), Some("pw".to_string()));
    }
}
