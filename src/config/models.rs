//! Configuration data models
//!
//! This module defines the data structures used for application configuration.

use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name of the active UI language (one of `locale::LANGUAGES`)
    pub language: String,
    /// Add a virtual display automatically when Windows reports no monitors at all
    pub fallback_display: bool,
    /// Check for a new release when the window is first shown
    pub check_update_on_startup: bool,
    /// Window state for persistence
    pub window_state: WindowState,
}

/// Window position persisted between sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowState {
    /// X position
    pub x: i32,
    /// Y position
    pub y: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: crate::locale::DEFAULT_LANGUAGE.to_string(),
            fallback_display: false,
            check_update_on_startup: true,
            window_state: WindowState::default(),
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self { x: 100, y: 100 }
    }
}
