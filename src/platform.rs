//! OS integration helpers
//!
//! Opening URLs and settings pages, and the drop shadow for the borderless main window.

use crate::error::{Result, VdisplayError};
use tracing::{debug, warn};

/// Project page opened from the window's status link
pub const REPO_URL: &str = "https://github.com/nomi-san/parsec-vdd";

/// Windows Settings page for display arrangement and resolution
pub const DISPLAY_SETTINGS_URI: &str = "ms-settings:display";

/// Open a URL or URI with the system handler
pub fn open_url(url: &str) -> Result<()> {
    debug!("Opening {}", url);
    open::that_detached(url).map_err(|e| {
        warn!("Failed to open {}: {}", url, e);
        VdisplayError::IoError(e)
    })
}

/// Extend the DWM frame one pixel into the client area so a borderless window keeps
/// its system drop shadow
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for DWM
pub fn enable_drop_shadow(hwnd: windows::Win32::Foundation::HWND) -> Result<()> {
    use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
    use windows::Win32::UI::Controls::MARGINS;

    let margins = MARGINS {
        cxLeftWidth: 1,
        cxRightWidth: 1,
        cyTopHeight: 1,
        cyBottomHeight: 1,
    };
    unsafe { DwmExtendFrameIntoClientArea(hwnd, &raw const margins)? };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_well_formed() {
        assert!(REPO_URL.starts_with("https://"));
        assert!(DISPLAY_SETTINGS_URI.starts_with("ms-settings:"));
    }
}
