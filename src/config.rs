//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;

/// Fallback password applied when a caller submits none
pub const DEFAULT_PASSWORD: &str = "defaultPassword";

/// Default request body limit (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Scratch storage configuration
    pub storage: StorageConfig,
    /// Document protection configuration
    pub protection: ProtectionConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// The single origin browsers may call the service from
    pub allowed_origin: String,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

/// Scratch storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding per-request scratch files
    pub scratch_dir: PathBuf,
}

/// Document protection configuration
#[derive(Clone)]
pub struct ProtectionConfig {
    /// Password used when the request carries none
    pub default_password: String,
    /// Reject uploads without a password instead of falling back
    pub require_password: bool,
}

impl std::fmt::Debug for ProtectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectionConfig")
            .field("default_password", &"<redacted>")
            .field("require_password", &self.require_password)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 5001,
                host: "0.0.0.0".to_string(),
                allowed_origin: "http://localhost:3000".to_string(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            storage: StorageConfig {
                scratch_dir: PathBuf::from("uploads"),
            },
            protection: ProtectionConfig {
                default_password: DEFAULT_PASSWORD.to_string(),
                require_password: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
                allowed_origin: env::var("ALLOWED_ORIGIN")
                    .ok()
                    .filter(|o| !o.trim().is_empty())
                    .unwrap_or(defaults.server.allowed_origin),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(defaults.server.max_upload_bytes),
            },
            storage: StorageConfig {
                scratch_dir: env::var_os("SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.scratch_dir),
            },
            protection: ProtectionConfig {
                default_password: env::var("DEFAULT_PASSWORD")
                    .ok()
                    .filter(|p| !p.is_empty())
                    .unwrap_or(defaults.protection.default_password),
                require_password: env::var("REQUIRE_PASSWORD")
                    .ok()
                    .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(defaults.protection.require_password),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
