// State management module
// Holds the configuration and scratch storage shared by every request

/// Shared state injected into handlers
pub mod app_state;

pub use app_state::AppState;
