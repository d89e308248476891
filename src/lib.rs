//! PDF Protector Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
/// Application state management
///
/// Holds the configuration and scratch storage injected into handlers.
pub mod state;
