//! Utility modules
//!
//! Auto-start registration, logging, single instance enforcement and the update checker.

pub mod autostart;
pub mod logging;
pub mod single_instance;
pub mod update_checker;

pub use autostart::AutoStartManager;
pub use logging::init_logging;
pub use single_instance::SingleInstanceGuard;
pub use update_checker::{UpdateChecker, UpdateSource};
