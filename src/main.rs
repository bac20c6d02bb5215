//! `ParsecVDisplay` - Virtual display manager for the Parsec VDD driver
//!
//! Adds and removes Parsec virtual displays from a small tray-resident window.
//! Pass `-silent` to start hidden in the system tray (used by run-on-startup).

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![expect(
    missing_docs,
    reason = "Slint-generated code from include_modules! lacks doc comments"
)]
#![allow(clippy::unwrap_used)] // Slint-generated code from include_modules! uses .unwrap() extensively

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use gui::GuiController;
use gui::gui_controller::Driver;
use parsec_vdisplay::config::ConfigManager;
use parsec_vdisplay::error::get_user_friendly_error;
use parsec_vdisplay::utils;
use tracing::{error, info};

// Include Slint-generated code
slint::include_modules!();

/// Command-line switches that start the app hidden in the tray
const SILENT_ARGS: [&str; 2] = ["-silent", "--silent"];

fn main() -> Result<()> {
    utils::init_logging().context("Failed to initialize logging system")?;

    let _single_instance_guard = match utils::SingleInstanceGuard::new() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Single instance check failed: {}", e);
            show_error_and_exit(
                "Another instance of ParsecVDisplay is already running.\n\n\
                 Check the system tray for the ParsecVDisplay icon.",
            );
            return Err(e.into());
        }
    };

    let silent = std::env::args().skip(1).any(|arg| is_silent_arg(&arg));
    info!("Silent start: {}", silent);

    let config = ConfigManager::load().context("Failed to load application configuration")?;
    info!("Configuration loaded (language: {})", config.language);

    let driver = match open_driver() {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to open virtual display driver: {}", e);
            show_error_and_exit(&get_user_friendly_error(&e));
            return Err(e.into());
        }
    };

    let gui_controller =
        GuiController::new(driver, config, silent).context("Failed to create GUI controller")?;
    gui_controller
        .run()
        .context("GUI event loop terminated with error")?;

    info!("ParsecVDisplay shutting down");
    Ok(())
}

fn is_silent_arg(arg: &str) -> bool {
    SILENT_ARGS.iter().any(|s| arg.eq_ignore_ascii_case(s))
}

/// Open the Parsec adapter, refusing to start unless its device node is healthy
#[cfg(windows)]
fn open_driver() -> parsec_vdisplay::Result<Driver> {
    use parsec_vdisplay::VdisplayError;
    use parsec_vdisplay::error::StringError;
    use parsec_vdisplay::vdd::{DriverStatus, ParsecVdd};
    use std::sync::Arc;

    let status = ParsecVdd::query_device_status();
    info!("Parsec VDD status: {}", status);
    match status {
        DriverStatus::Ok => Ok(Arc::new(ParsecVdd::open()?)),
        DriverStatus::NotInstalled => Err(VdisplayError::DriverNotFound),
        other => Err(VdisplayError::DriverError(StringError::new(format!(
            "Parsec VDD adapter is not ready (status: {other})"
        )))),
    }
}

/// Without the Windows driver the app runs against an in-memory adapter
#[cfg(not(windows))]
fn open_driver() -> parsec_vdisplay::Result<Driver> {
    use parsec_vdisplay::vdd::SimulatedDriver;
    use std::sync::Arc;

    tracing::warn!("Parsec VDD is Windows-only; using the simulated driver");
    Ok(Arc::new(SimulatedDriver::new()))
}

/// Shows an error dialog and exits the application.
fn show_error_and_exit(message: &str) {
    use rfd::MessageDialog;

    MessageDialog::new()
        .set_title("ParsecVDisplay - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();

    std::process::exit(1);
}
