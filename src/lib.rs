//! `ParsecVDisplay` - Virtual display manager for the Parsec VDD driver
//!
//! Adds and removes virtual monitors exposed by the Parsec virtual display driver,
//! keeps a tray-resident window listing them, and checks for application updates.
//! The window logic lives in [`shell::Shell`], a UI-independent state machine driven
//! by a [`vdd::DisplayDriver`] and a [`shell::ShellHost`], so the binary only wires
//! Slint, the tray icon and message dialogs to it.
//!
//! # Requirements
//!
//! - Windows 10 or Windows 11 with the Parsec VDD driver installed
//! - Non-Windows builds run against [`vdd::SimulatedDriver`]

// Module declarations
pub mod config;
pub mod error;
pub mod locale;
pub mod platform;
pub mod shell;
pub mod utils;
pub mod vdd;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use error::{Result, VdisplayError};
