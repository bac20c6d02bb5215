//! Single instance enforcement
//!
//! A second launch would open the adapter again and fight the first instance over
//! display slots, so only one process may run. Windows uses a named mutex.

use crate::error::Result;

#[cfg(windows)]
use crate::error::{StringError, VdisplayError};
#[cfg(windows)]
use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE};
#[cfg(windows)]
use windows::Win32::System::Threading::CreateMutexW;

/// Session-local mutex name
#[cfg(windows)]
const MUTEX_NAME: &str = "Local\\ParsecVDisplay_SingleInstance";

/// Held for the lifetime of the process; releases the named mutex on drop
#[cfg(windows)]
pub struct SingleInstanceGuard {
    mutex_handle: HANDLE,
}

#[cfg(windows)]
impl SingleInstanceGuard {
    /// Claim the instance mutex, failing if another instance holds it
    #[allow(unsafe_code)] // Windows FFI for mutex
    pub fn new() -> Result<Self> {
        use tracing::{debug, warn};
        use windows::core::HSTRING;

        let name = HSTRING::from(MUTEX_NAME);
        unsafe {
            let handle = CreateMutexW(None, true, &name)?;
            if GetLastError() == ERROR_ALREADY_EXISTS {
                warn!("Another instance of ParsecVDisplay is already running");
                let _ = CloseHandle(handle);
                return Err(VdisplayError::ConfigError(StringError::new(
                    "Another instance of ParsecVDisplay is already running",
                )));
            }
            debug!("Single instance mutex acquired");
            Ok(Self {
                mutex_handle: handle,
            })
        }
    }
}

#[cfg(windows)]
impl Drop for SingleInstanceGuard {
    #[allow(unsafe_code)] // Windows FFI for mutex cleanup
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.mutex_handle);
        }
        tracing::debug!("Single instance mutex released");
    }
}

/// No-op guard for non-Windows builds
#[cfg(not(windows))]
pub struct SingleInstanceGuard;

#[cfg(not(windows))]
impl SingleInstanceGuard {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(windows)]
    fn test_second_guard_is_refused_until_first_drops() {
        let first = SingleInstanceGuard::new();
        assert!(first.is_ok());
        assert!(SingleInstanceGuard::new().is_err());

        drop(first);
        assert!(SingleInstanceGuard::new().is_ok());
    }

    #[test]
    #[cfg(not(windows))]
    fn test_stub_always_succeeds() {
        let _a = SingleInstanceGuard::new().unwrap();
        let _b = SingleInstanceGuard::new().unwrap();
    }
}
