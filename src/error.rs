//! Error types for `ParsecVDisplay`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Error variants use `#[source]` to preserve error chains for better
//! observability and debugging.

use thiserror::Error;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `ParsecVDisplay`
#[derive(Debug, Error)]
pub enum VdisplayError {
    /// The Parsec VDD adapter could not be found or opened
    #[error("Parsec virtual display adapter not found")]
    DriverNotFound,

    /// A request to the virtual display driver failed
    /// Preserves the underlying error source for full error chain transparency
    #[error("Virtual display driver error: {0}")]
    DriverError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The driver already exposes the maximum number of virtual displays
    #[error("Virtual display limit reached ({max})")]
    DisplayLimitReached {
        /// Maximum number of displays supported by the driver
        max: usize,
    },

    /// Update check failed (network, HTTP status, or release parsing)
    #[error("Update check failed: {0}")]
    UpdateCheckFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    /// Preserves the underlying error source for full error chain transparency
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// System tray setup failed
    #[error("System tray error: {0}")]
    TrayError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Windows API error
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `ParsecVDisplay` operations
pub type Result<T> = std::result::Result<T, VdisplayError>;

/// Convert an error to a user-friendly message
///
/// This function takes a `VdisplayError` and returns a message suitable
/// for displaying to end users in error dialogs.
pub fn get_user_friendly_error(error: &VdisplayError) -> String {
    match error {
        VdisplayError::DriverNotFound => "The Parsec Virtual Display driver was not found.\n\n\
             Please ensure:\n\
             - The Parsec VDD driver is installed\n\
             - The device is enabled in Device Manager\n\
             - Windows has been restarted after installation"
            .to_string(),
        VdisplayError::DriverError(e) => {
            format!(
                "The virtual display driver rejected the request:\n\n{e}\n\n\
                 Try the sync button, or restart the application."
            )
        }
        VdisplayError::DisplayLimitReached { max } => {
            format!("You cannot add more than {max} virtual displays.")
        }
        VdisplayError::UpdateCheckFailed(_) => "Unable to check for updates.\n\n\
             Please check your internet connection and try again later."
            .to_string(),
        VdisplayError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that you have write permissions to:\n\
             %APPDATA%\\ParsecVDisplay"
            .to_string(),
        VdisplayError::TrayError(_) => "Unable to create the system tray icon.\n\n\
             The window will stay available, but minimizing to the tray will not work."
            .to_string(),
        #[cfg(windows)]
        VdisplayError::WindowsApiError(e) => {
            format!(
                "A Windows API error occurred:\n\n{e}\n\n\
                 Please ensure your Windows installation is up to date."
            )
        }
        VdisplayError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        VdisplayError::JsonError(e) => {
            format!(
                "Configuration file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
    }
}
