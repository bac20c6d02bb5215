//! Window shell
//!
//! UI-independent state machine behind the main window. It owns all view state
//! (display list, view mode, language menu, add/update enablement) and reacts to
//! user actions and driver notifications. Everything with a visible side effect
//! (tray, dialogs, window visibility, URLs, quitting) goes through [`ShellHost`], so
//! the Slint window is a thin adapter and the logic is testable without a UI.
//!
//! # Event Flow
//!
//! ```text
//! GUI callbacks ──▶ Shell ──requests──▶ DisplayDriver
//!                     ▲                      │
//! GUI timer ──pump────┘◀── DisplayChange ────┘
//! ```

mod state;
mod window_shell;

pub use state::{
    AddOutcome, CloseOutcome, CustomView, ExitOutcome, LanguageEntry, LanguageMenu, ShellState,
    UpdateOrigin, ViewMode,
};
pub use window_shell::Shell;

use crate::error::Result;

/// Side effects the shell asks its window to perform
pub trait ShellHost {
    /// Create the tray icon and its menu
    fn init_tray(&mut self) -> Result<()>;

    /// Remove the tray icon
    fn uninit_tray(&mut self);

    /// Show, restore and focus the main window
    fn show_app(&mut self);

    /// Hide the main window, leaving the tray icon
    fn hide_window(&mut self);

    /// Modal warning dialog
    fn show_warning(&mut self, title: &str, message: &str);

    /// Modal informational dialog
    fn show_info(&mut self, title: &str, message: &str);

    /// Modal yes/no question; true when the user answered yes
    fn ask_yes_no(&mut self, title: &str, message: &str) -> bool;

    /// Open a URL or URI with the system handler
    fn open_url(&mut self, url: &str) -> Result<()>;

    /// Terminate the application event loop
    fn quit(&mut self);
}
