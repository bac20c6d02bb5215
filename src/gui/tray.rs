//! System tray integration
//!
//! The tray icon keeps the application reachable while the window is hidden. Left
//! click shows the window; the context menu mirrors the window's main actions.
//! Menu events are polled by the GUI timer and mapped to a [`TrayAction`].

use parsec_vdisplay::locale::Localizer;

/// Action bound to a tray menu item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(windows), expect(dead_code, reason = "tray menu only exists on Windows"))]
pub enum TrayAction {
    Show,
    AddDisplay,
    RemoveDisplay,
    DriverStatus,
    CheckUpdate,
    ToggleRunOnStartup,
    Exit,
}

/// Localized tray texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayLabels {
    pub tooltip: String,
    pub show: String,
    pub add_display: String,
    pub remove_display: String,
    pub driver_status: String,
    pub check_update: String,
    pub run_on_startup: String,
    pub exit: String,
}

impl TrayLabels {
    pub fn from_localizer(localizer: &Localizer) -> Self {
        Self {
            tooltip: localizer.get("t_app_name"),
            show: localizer.get("t_show"),
            add_display: localizer.get("t_add_display"),
            remove_display: localizer.get("t_remove_display"),
            driver_status: localizer.get("t_driver_status"),
            check_update: localizer.get("t_check_update"),
            run_on_startup: localizer.get("t_run_on_startup"),
            exit: localizer.get("t_exit"),
        }
    }
}

#[cfg(windows)]
pub use windows_tray::TrayIcon;

#[cfg(windows)]
mod windows_tray {
    use super::{TrayAction, TrayLabels};
    use parsec_vdisplay::error::{Result, VdisplayError};
    use tracing::{debug, info};
    use tray_icon::TrayIconBuilder;
    use tray_icon::menu::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem};

    fn tray_error(e: impl std::error::Error + Send + Sync + 'static) -> VdisplayError {
        VdisplayError::TrayError(Box::new(e))
    }

    /// Tray icon with its context menu
    pub struct TrayIcon {
        tray: tray_icon::TrayIcon,
        show: MenuItem,
        add_display: MenuItem,
        remove_display: MenuItem,
        driver_status: MenuItem,
        check_update: MenuItem,
        run_on_startup: CheckMenuItem,
        exit: MenuItem,
    }

    impl TrayIcon {
        /// Create the icon and menu
        pub fn new(labels: &TrayLabels, run_on_startup: bool) -> Result<Self> {
            info!("Creating system tray icon");

            let show = MenuItem::new(&labels.show, true, None);
            let add_display = MenuItem::new(&labels.add_display, true, None);
            let remove_display = MenuItem::new(&labels.remove_display, true, None);
            let driver_status = MenuItem::new(&labels.driver_status, true, None);
            let check_update = MenuItem::new(&labels.check_update, true, None);
            let run_on_startup =
                CheckMenuItem::new(&labels.run_on_startup, true, run_on_startup, None);
            let exit = MenuItem::new(&labels.exit, true, None);

            let menu = Menu::new();
            menu.append_items(&[
                &show,
                &PredefinedMenuItem::separator(),
                &add_display,
                &remove_display,
                &PredefinedMenuItem::separator(),
                &driver_status,
                &check_update,
                &run_on_startup,
                &PredefinedMenuItem::separator(),
                &exit,
            ])
            .map_err(tray_error)?;

            let tray = TrayIconBuilder::new()
                .with_menu(Box::new(menu))
                .with_menu_on_left_click(false)
                .with_tooltip(&labels.tooltip)
                .with_icon(crate::gui::icon::tray_icon()?)
                .build()
                .map_err(tray_error)?;

            debug!("System tray icon created");
            Ok(Self {
                tray,
                show,
                add_display,
                remove_display,
                driver_status,
                check_update,
                run_on_startup,
                exit,
            })
        }

        /// Re-apply texts after a language change
        pub fn set_labels(&self, labels: &TrayLabels) {
            self.show.set_text(&labels.show);
            self.add_display.set_text(&labels.add_display);
            self.remove_display.set_text(&labels.remove_display);
            self.driver_status.set_text(&labels.driver_status);
            self.check_update.set_text(&labels.check_update);
            self.run_on_startup.set_text(&labels.run_on_startup);
            self.exit.set_text(&labels.exit);
            let _ = self.tray.set_tooltip(Some(&labels.tooltip));
        }

        pub fn set_update_enabled(&self, enabled: bool) {
            self.check_update.set_enabled(enabled);
        }

        /// Add and remove stay disabled while a display request is pending
        pub fn set_requests_enabled(&self, enabled: bool) {
            self.add_display.set_enabled(enabled);
            self.remove_display.set_enabled(enabled);
        }

        pub fn set_run_on_startup(&self, checked: bool) {
            self.run_on_startup.set_checked(checked);
        }

        /// Map a menu event ID to its action
        pub fn action_for(&self, id: &MenuId) -> Option<TrayAction> {
            let actions = [
                (self.show.id(), TrayAction::Show),
                (self.add_display.id(), TrayAction::AddDisplay),
                (self.remove_display.id(), TrayAction::RemoveDisplay),
                (self.driver_status.id(), TrayAction::DriverStatus),
                (self.check_update.id(), TrayAction::CheckUpdate),
                (self.run_on_startup.id(), TrayAction::ToggleRunOnStartup),
                (self.exit.id(), TrayAction::Exit),
            ];
            actions
                .into_iter()
                .find_map(|(item, action)| (item == id).then_some(action))
        }
    }
}

/// No tray on non-Windows builds; the window stays the only surface
#[cfg(not(windows))]
pub struct TrayIcon;

#[cfg(not(windows))]
impl TrayIcon {
    pub fn new(_labels: &TrayLabels, _run_on_startup: bool) -> parsec_vdisplay::Result<Self> {
        tracing::debug!("System tray is not available on this platform");
        Ok(Self)
    }

    pub fn set_labels(&self, _labels: &TrayLabels) {}

    pub fn set_update_enabled(&self, _enabled: bool) {}

    pub fn set_requests_enabled(&self, _enabled: bool) {}

    pub fn set_run_on_startup(&self, _checked: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_language() {
        let mut localizer = Localizer::new("English").unwrap();
        let english = TrayLabels::from_localizer(&localizer);
        assert_eq!(english.show, "Show");
        assert_eq!(english.exit, "Exit");

        localizer.set_language("简体中文");
        let chinese = TrayLabels::from_localizer(&localizer);
        assert_ne!(chinese.exit, english.exit);
    }
}
