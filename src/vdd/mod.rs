//! Virtual display driver control
//!
//! This module abstracts the Parsec virtual display driver behind the
//! [`DisplayDriver`] trait. The driver is the single source of truth for which
//! virtual displays exist; callers request changes and learn about the result
//! through [`DisplayChange`] notifications delivered on a [`Subscription`].
//!
//! # Architecture
//!
//! - `DisplayDriver`: request/query surface plus notification subscription
//! - `ChangeNotifier`: subscriber registry shared by every backend
//! - `ParsecVdd`: Windows backend talking to the Parsec VDD adapter via IOCTLs
//! - `SimulatedDriver`: in-memory backend for non-Windows builds and tests
//!
//! # Event Flow
//!
//! ```text
//! Shell ──add/remove/invalidate──▶ DisplayDriver
//!   ▲                                   │ (WM_DISPLAYCHANGE / enumeration)
//!   └──── DisplayChange ◀── ChangeNotifier
//! ```

pub mod notifier;
pub mod simulated;

#[cfg(windows)]
pub mod display_monitor;
#[cfg(windows)]
pub mod parsec;

pub use notifier::{ChangeNotifier, Subscription};
#[cfg(windows)]
pub use parsec::ParsecVdd;
pub use simulated::SimulatedDriver;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// Maximum number of virtual displays the Parsec VDD adapter supports
pub const MAX_DISPLAYS: usize = 8;

/// One virtual monitor as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    /// Position of this display among the virtual displays, in driver order
    pub index: u32,
    /// GDI device name (e.g. `\\.\DISPLAY3`)
    pub device_name: String,
    /// Current horizontal resolution in pixels
    pub width: u32,
    /// Current vertical resolution in pixels
    pub height: u32,
    /// Current refresh rate in Hz
    pub refresh_rate: u32,
}

impl Display {
    /// Text shown for this display in the window list
    pub fn label(&self) -> String {
        let name = self.device_name.trim_start_matches(r"\\.\");
        if self.width == 0 || self.height == 0 {
            name.to_string()
        } else {
            format!(
                "{name}  {}×{} @ {} Hz",
                self.width, self.height, self.refresh_rate
            )
        }
    }
}

/// Full display set pushed to subscribers whenever it may have changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayChange {
    /// Every virtual display, in driver order
    pub displays: Vec<Display>,
    /// True when Windows reports no active monitor at all, physical or virtual
    pub no_monitors: bool,
}

/// Device node status of the virtual display adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    /// Adapter is installed and running
    Ok,
    /// Adapter is present but could not be opened
    Inaccessible,
    /// Status could not be determined
    Unknown,
    /// Device node reports a problem code with no specific mapping
    UnknownProblem,
    /// Device is disabled in Device Manager
    Disabled,
    /// Driver failed to start
    DriverError,
    /// A reboot is required to finish installation or update
    RestartRequired,
    /// The driver service is disabled
    DisabledService,
    /// Driver is not installed
    NotInstalled,
}

// Configuration Manager values used by `DriverStatus::from_devnode` (cfgmgr32.h)
const CR_SUCCESS: u32 = 0x00;
const CR_NO_SUCH_DEVINST: u32 = 0x0D;
const CR_NO_SUCH_VALUE: u32 = 0x25;
const DN_STARTED: u32 = 0x0000_0008;
const DN_HAS_PROBLEM: u32 = 0x0000_0400;
const CM_PROB_FAILED_START: u32 = 0x0A;
const CM_PROB_NEED_RESTART: u32 = 0x0E;
const CM_PROB_DISABLED: u32 = 0x16;
const CM_PROB_HARDWARE_DISABLED: u32 = 0x1D;
const CM_PROB_DISABLED_SERVICE: u32 = 0x20;
const CM_PROB_FAILED_DRIVER_ENTRY: u32 = 0x25;
const CM_PROB_FAILED_POST_START: u32 = 0x2B;

impl DriverStatus {
    /// Map a `CM_Get_DevNode_Status` result to a driver status
    pub fn from_devnode(config_ret: u32, status_flags: u32, problem: u32) -> Self {
        match config_ret {
            CR_SUCCESS => {}
            CR_NO_SUCH_DEVINST | CR_NO_SUCH_VALUE => return Self::NotInstalled,
            _ => return Self::Unknown,
        }

        if problem == CM_PROB_NEED_RESTART {
            return Self::RestartRequired;
        }

        if status_flags & DN_HAS_PROBLEM != 0 {
            return match problem {
                CM_PROB_DISABLED | CM_PROB_HARDWARE_DISABLED => Self::Disabled,
                CM_PROB_DISABLED_SERVICE => Self::DisabledService,
                CM_PROB_FAILED_START | CM_PROB_FAILED_DRIVER_ENTRY | CM_PROB_FAILED_POST_START => {
                    Self::DriverError
                }
                _ => Self::UnknownProblem,
            };
        }

        if status_flags & DN_STARTED != 0 {
            Self::Ok
        } else {
            Self::Inaccessible
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "OK",
            Self::Inaccessible => "INACCESSIBLE",
            Self::Unknown => "UNKNOWN",
            Self::UnknownProblem => "UNKNOWN_PROBLEM",
            Self::Disabled => "DISABLED",
            Self::DriverError => "DRIVER_ERROR",
            Self::RestartRequired => "RESTART_REQUIRED",
            Self::DisabledService => "DISABLED_SERVICE",
            Self::NotInstalled => "NOT_INSTALLED",
        };
        f.write_str(text)
    }
}

/// Control surface of a virtual display driver
///
/// Request methods return once the request is issued; the resulting display set
/// arrives later as a [`DisplayChange`] on every live subscription. A backend
/// must publish at least one notification after every successful request.
pub trait DisplayDriver {
    /// Request one more virtual display
    fn add_display(&self) -> Result<()>;

    /// Request removal of the most recently added virtual display
    fn remove_last_display(&self) -> Result<()>;

    /// Re-enumerate displays and publish a fresh notification
    fn invalidate(&self) -> Result<()>;

    /// Current adapter status
    fn query_status(&self) -> DriverStatus;

    /// Driver version string (e.g. `0.45`)
    fn query_version(&self) -> Result<String>;

    /// Number of virtual displays currently present
    fn display_count(&self) -> usize;

    /// Maximum number of virtual displays
    fn max_displays(&self) -> usize {
        MAX_DISPLAYS
    }

    /// Register for change notifications until the returned guard is dropped
    fn subscribe(&self) -> (Subscription, Receiver<DisplayChange>);
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for Arc<D> {
    fn add_display(&self) -> Result<()> {
        (**self).add_display()
    }

    fn remove_last_display(&self) -> Result<()> {
        (**self).remove_last_display()
    }

    fn invalidate(&self) -> Result<()> {
        (**self).invalidate()
    }

    fn query_status(&self) -> DriverStatus {
        (**self).query_status()
    }

    fn query_version(&self) -> Result<String> {
        (**self).query_version()
    }

    fn display_count(&self) -> usize {
        (**self).display_count()
    }

    fn max_displays(&self) -> usize {
        (**self).max_displays()
    }

    fn subscribe(&self) -> (Subscription, Receiver<DisplayChange>) {
        (**self).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label() {
        let display = Display {
            index: 0,
            device_name: r"\\.\DISPLAY3".to_string(),
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        };
        assert_eq!(display.label(), "DISPLAY3  1920×1080 @ 60 Hz");
    }

    #[test]
    fn test_display_label_without_mode() {
        let display = Display {
            index: 1,
            device_name: r"\\.\DISPLAY4".to_string(),
            width: 0,
            height: 0,
            refresh_rate: 0,
        };
        assert_eq!(display.label(), "DISPLAY4");
    }

    #[test]
    fn test_status_from_devnode() {
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_STARTED, 0),
            DriverStatus::Ok
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_NO_SUCH_DEVINST, 0, 0),
            DriverStatus::NotInstalled
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_HAS_PROBLEM, CM_PROB_DISABLED),
            DriverStatus::Disabled
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_HAS_PROBLEM, CM_PROB_DISABLED_SERVICE),
            DriverStatus::DisabledService
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_HAS_PROBLEM, CM_PROB_FAILED_POST_START),
            DriverStatus::DriverError
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_HAS_PROBLEM, 0x99),
            DriverStatus::UnknownProblem
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, DN_STARTED, CM_PROB_NEED_RESTART),
            DriverStatus::RestartRequired
        );
        assert_eq!(
            DriverStatus::from_devnode(CR_SUCCESS, 0, 0),
            DriverStatus::Inaccessible
        );
        assert_eq!(DriverStatus::from_devnode(0x1F, 0, 0), DriverStatus::Unknown);
    }

    #[test]
    fn test_driver_status_display() {
        assert_eq!(DriverStatus::Ok.to_string(), "OK");
        assert_eq!(DriverStatus::NotInstalled.to_string(), "NOT_INSTALLED");
        assert_eq!(
            DriverStatus::RestartRequired.to_string(),
            "RESTART_REQUIRED"
        );
    }
}
