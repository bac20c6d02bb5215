//! [`ShellHost`] backed by the Slint window, the tray icon and `rfd` message boxes

use crate::MainWindow;
use crate::gui::tray::{TrayIcon, TrayLabels};
use parsec_vdisplay::Result;
use parsec_vdisplay::platform;
use parsec_vdisplay::shell::ShellHost;
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use slint::ComponentHandle;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Whether the borderless window has its DWM shadow yet
///
/// The native window only exists once it has been shown, so every show retries
/// until one attempt succeeds.
#[derive(Debug, Clone, Default)]
struct DropShadow {
    applied: Rc<Cell<bool>>,
}

impl DropShadow {
    fn pending(&self) -> bool {
        !self.applied.get()
    }

    fn record(&self, applied: bool) {
        if applied {
            self.applied.set(true);
        }
    }

    /// Apply the shadow to the window titled `title` shortly after it is shown
    fn schedule(&self, title: String) {
        if !self.pending() {
            return;
        }

        #[cfg(windows)]
        {
            let shadow = self.clone();
            slint::Timer::single_shot(std::time::Duration::from_millis(100), move || {
                shadow.record(apply_drop_shadow(&title));
            });
        }

        // Other platforms draw their own decorations
        #[cfg(not(windows))]
        {
            drop(title);
            self.record(true);
        }
    }
}

/// Window-side effects requested by the shell
pub struct WindowHost {
    window: slint::Weak<MainWindow>,
    tray: Option<TrayIcon>,
    tray_labels: TrayLabels,
    run_on_startup: bool,
    shadow: DropShadow,
}

impl WindowHost {
    /// Host for `window`; the tray is created later by [`ShellHost::init_tray`]
    pub fn new(window: slint::Weak<MainWindow>, tray_labels: TrayLabels, run_on_startup: bool) -> Self {
        Self {
            window,
            tray: None,
            tray_labels,
            run_on_startup,
            shadow: DropShadow::default(),
        }
    }

    /// Give the shown window its drop shadow, unless an earlier show already did
    pub fn ensure_drop_shadow(&self) {
        if let Some(window) = self.window.upgrade() {
            self.shadow.schedule(window.get_app_title().to_string());
        }
    }

    /// The tray icon, once initialized
    pub fn tray(&self) -> Option<&TrayIcon> {
        self.tray.as_ref()
    }

    /// Update tray texts after a language change
    pub fn relabel_tray(&mut self, labels: TrayLabels) {
        if let Some(tray) = &self.tray {
            tray.set_labels(&labels);
        }
        self.tray_labels = labels;
    }

    /// Reflect the run-on-startup state in the tray menu
    pub fn set_run_on_startup(&mut self, enabled: bool) {
        self.run_on_startup = enabled;
        if let Some(tray) = &self.tray {
            tray.set_run_on_startup(enabled);
        }
    }

    fn dialog(title: &str, message: &str, level: MessageLevel, buttons: MessageButtons) -> MessageDialogResult {
        MessageDialog::new()
            .set_title(title)
            .set_description(message)
            .set_level(level)
            .set_buttons(buttons)
            .show()
    }
}

impl ShellHost for WindowHost {
    fn init_tray(&mut self) -> Result<()> {
        if self.tray.is_none() {
            self.tray = Some(TrayIcon::new(&self.tray_labels, self.run_on_startup)?);
        }
        Ok(())
    }

    fn uninit_tray(&mut self) {
        if self.tray.take().is_some() {
            debug!("System tray icon removed");
        }
    }

    fn show_app(&mut self) {
        if let Some(window) = self.window.upgrade() {
            if let Err(e) = window.show() {
                warn!("Failed to show main window: {}", e);
            }
            window.window().set_minimized(false);
        }
        self.ensure_drop_shadow();
    }

    fn hide_window(&mut self) {
        if let Some(window) = self.window.upgrade()
            && let Err(e) = window.hide()
        {
            warn!("Failed to hide main window: {}", e);
        }
    }

    fn show_warning(&mut self, title: &str, message: &str) {
        Self::dialog(title, message, MessageLevel::Warning, MessageButtons::Ok);
    }

    fn show_info(&mut self, title: &str, message: &str) {
        Self::dialog(title, message, MessageLevel::Info, MessageButtons::Ok);
    }

    fn ask_yes_no(&mut self, title: &str, message: &str) -> bool {
        Self::dialog(title, message, MessageLevel::Warning, MessageButtons::YesNo)
            == MessageDialogResult::Yes
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        platform::open_url(url)
    }

    fn quit(&mut self) {
        if let Err(e) = slint::quit_event_loop() {
            warn!("Failed to quit event loop: {}", e);
        }
    }
}

/// Find the borderless main window by title and give it a DWM shadow
#[cfg(windows)]
#[allow(unsafe_code)] // Windows FFI for FindWindowW
fn apply_drop_shadow(title: &str) -> bool {
    use windows::Win32::UI::WindowsAndMessaging::FindWindowW;
    use windows::core::{HSTRING, PCWSTR};

    match unsafe { FindWindowW(PCWSTR::null(), &HSTRING::from(title)) } {
        Ok(hwnd) => match platform::enable_drop_shadow(hwnd) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to enable drop shadow: {}", e);
                false
            }
        },
        Err(e) => {
            debug!("Main window not found for drop shadow: {}", e);
            false
        }
    }
}
