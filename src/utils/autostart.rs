//! Auto-start registry management
//!
//! "Run on startup" is a value under `HKCU\Software\Microsoft\Windows\CurrentVersion\Run`
//! that launches the executable with `-silent`, so it starts hidden in the tray.

use crate::error::Result;

#[cfg(windows)]
use crate::error::VdisplayError;

/// Registry key holding per-user startup commands
#[cfg(windows)]
const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Value name under [`RUN_KEY`]
pub const VALUE_NAME: &str = "ParsecVDisplay";

/// Command line stored in the Run key for `exe`
pub fn startup_command(exe: &std::path::Path) -> String {
    format!("\"{}\" -silent", exe.display())
}

/// Auto-start manager
pub struct AutoStartManager;

#[cfg(windows)]
impl AutoStartManager {
    /// Whether the Run key points at this executable
    pub fn is_enabled() -> Result<bool> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(key) = hkcu.open_subkey(RUN_KEY) else {
            return Ok(false);
        };
        let Ok(command) = key.get_value::<String, _>(VALUE_NAME) else {
            return Ok(false);
        };
        let exe = std::env::current_exe()?;
        Ok(command == startup_command(&exe))
    }

    /// Register this executable to run at login
    pub fn enable() -> Result<()> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        let exe = std::env::current_exe()?;
        let (key, _) = RegKey::predef(HKEY_CURRENT_USER)
            .create_subkey(RUN_KEY)
            .map_err(|e| VdisplayError::ConfigError(Box::new(e)))?;
        let command = startup_command(&exe);
        key.set_value(VALUE_NAME, &command)
            .map_err(|e| VdisplayError::ConfigError(Box::new(e)))?;
        tracing::info!("Run on startup enabled: {}", command);
        Ok(())
    }

    /// Remove the Run value; succeeds if it was already absent
    pub fn disable() -> Result<()> {
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};

        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let Ok(key) = hkcu.open_subkey_with_flags(RUN_KEY, KEY_SET_VALUE) else {
            return Ok(());
        };
        match key.delete_value(VALUE_NAME) {
            Ok(()) => {
                tracing::info!("Run on startup disabled");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VdisplayError::ConfigError(Box::new(e))),
        }
    }
}

#[cfg(not(windows))]
impl AutoStartManager {
    pub fn is_enabled() -> Result<bool> {
        Ok(false)
    }

    pub fn enable() -> Result<()> {
        tracing::warn!("Run on startup is only supported on Windows");
        Ok(())
    }

    pub fn disable() -> Result<()> {
        Ok(())
    }
}

/// Enable or disable auto-start
pub fn set_enabled(enabled: bool) -> Result<()> {
    if enabled {
        AutoStartManager::enable()
    } else {
        AutoStartManager::disable()
    }
}
