//! GUI module
//!
//! Slint window, system tray icon and message dialogs. Everything here is a thin
//! adapter over [`parsec_vdisplay::shell::Shell`]; the behaviour lives in the library.

pub mod gui_controller;
pub mod host;
pub mod icon;
pub mod tray;

pub use gui_controller::GuiController;
