//! Window shell state machine

use super::ShellHost;
use super::state::{
    AddOutcome, CloseOutcome, CustomView, ExitOutcome, LanguageMenu, ShellState, UpdateOrigin,
    ViewMode,
};
use crate::config::{AppConfig, ConfigManager, WindowState};
use crate::error::{Result, VdisplayError};
use crate::locale::{self, Localizer};
use crate::platform::{DISPLAY_SETTINGS_URI, REPO_URL};
use crate::utils::update_checker::DOWNLOAD_URL;
use crate::vdd::{Display, DisplayChange, DisplayDriver, Subscription};
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Active,
    TornDown,
}

/// Main window logic over a display driver `D` and a window host `H`
pub struct Shell<D: DisplayDriver, H: ShellHost> {
    driver: D,
    host: H,
    config: AppConfig,
    localizer: Localizer,
    state: ShellState,
    subscription: Option<(Subscription, Receiver<DisplayChange>)>,
    lifecycle: Lifecycle,
    tray_active: bool,
    silent: bool,
}

impl<D: DisplayDriver, H: ShellHost> Shell<D, H> {
    /// Create a shell in its initial state; nothing happens until [`Shell::activate`]
    pub fn new(driver: D, host: H, config: AppConfig) -> Result<Self> {
        let localizer = Localizer::new(&config.language)?;
        Ok(Self {
            driver,
            host,
            config,
            localizer,
            state: ShellState::default(),
            subscription: None,
            lifecycle: Lifecycle::Created,
            tray_active: false,
            silent: false,
        })
    }

    /// Hide the window to the tray as soon as it is activated
    #[must_use]
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Window loaded: set up the tray, language menu and driver subscription
    ///
    /// Returns true when a startup update check was begun; the caller then runs the
    /// fetch and reports back through [`Shell::finish_update_check`]. Only the first
    /// call has any effect.
    pub fn activate(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Created {
            debug!("Shell already activated; activate() ignored");
            return false;
        }
        self.lifecycle = Lifecycle::Active;
        info!("Activating window shell");

        match self.host.init_tray() {
            Ok(()) => self.tray_active = true,
            Err(e) => error!("Failed to initialize tray icon: {}", e),
        }

        if self.silent {
            info!("Silent start, hiding window to tray");
            self.host.hide_window();
        }

        self.state.languages = LanguageMenu::build(&self.config.language);

        self.subscription = Some(self.driver.subscribe());
        if let Err(e) = self.driver.invalidate() {
            self.report_driver_failure("invalidate", &e);
        }

        self.config.check_update_on_startup && self.begin_update_check(UpdateOrigin::Startup)
    }

    /// Release the driver subscription and the tray icon
    ///
    /// Runs on exit, window unload and drop; later calls do nothing.
    pub fn teardown(&mut self) {
        if self.lifecycle != Lifecycle::Active {
            return;
        }
        self.lifecycle = Lifecycle::TornDown;

        if let Some((subscription, _rx)) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if self.tray_active {
            self.host.uninit_tray();
            self.tray_active = false;
        }
        info!("Window shell torn down");
    }

    /// Apply every notification queued on the driver subscription, returning how many
    pub fn pump_notifications(&mut self) -> usize {
        let queued: Vec<DisplayChange> = match &self.subscription {
            Some((_, rx)) => rx.try_iter().collect(),
            None => return 0,
        };
        let count = queued.len();
        for change in queued {
            self.on_display_changed(change);
        }
        count
    }

    /// Rebuild the display list from a driver notification
    pub fn on_display_changed(&mut self, change: DisplayChange) {
        debug!(
            "Display change: {} display(s), no_monitors={}",
            change.displays.len(),
            change.no_monitors
        );

        self.state.placeholder_visible = change.displays.is_empty();
        self.state.displays = change.displays;
        self.state.pending_refresh = false;

        if change.no_monitors && self.config.fallback_display {
            info!("No active monitor, adding fallback virtual display");
            self.add_display();
        }
    }

    /// Request one more virtual display, warning instead when the limit is reached
    pub fn add_display(&mut self) -> AddOutcome {
        if self.refresh_pending("add display") {
            return AddOutcome::Pending;
        }

        let max = self.driver.max_displays();
        if self.driver.display_count() >= max {
            info!("Display limit of {} reached, add request refused", max);
            let message = self
                .localizer
                .translate("t_msg_exceeded_display_limit", &[&max]);
            let title = self.title();
            self.host.show_warning(&title, &message);
            return AddOutcome::LimitReached;
        }

        self.state.pending_refresh = true;
        match self.driver.add_display() {
            Ok(()) => AddOutcome::Requested,
            Err(e) => {
                self.report_driver_failure("add display", &e);
                AddOutcome::Failed
            }
        }
    }

    /// Request removal of the most recently added virtual display
    ///
    /// Returns false when nothing was sent because a request is still pending.
    pub fn remove_last_display(&mut self) -> bool {
        if self.refresh_pending("remove display") {
            return false;
        }
        self.state.pending_refresh = true;
        if let Err(e) = self.driver.remove_last_display() {
            self.report_driver_failure("remove display", &e);
        }
        true
    }

    /// Clear the list and ask the driver to re-enumerate
    ///
    /// Returns false when nothing was sent because a request is still pending.
    pub fn resync(&mut self) -> bool {
        if self.refresh_pending("invalidate") {
            return false;
        }
        self.state.pending_refresh = true;
        self.state.displays.clear();
        if let Err(e) = self.driver.invalidate() {
            self.report_driver_failure("invalidate", &e);
        }
        true
    }

    /// Bring the window up and show the driver's version and status
    pub fn query_status(&mut self) {
        self.host.show_app();

        let status = self.driver.query_status();
        let version = self.driver.query_version().unwrap_or_else(|e| {
            warn!("Failed to query driver version: {}", e);
            "?".to_string()
        });
        info!("Driver status: {}, version {}", status, version);

        let message = format!(
            "Parsec Virtual Display v{version}\n{}: {status}",
            self.localizer.get("t_msg_driver_status")
        );
        let title = self.title();
        self.host.show_info(&title, &message);
    }

    /// Switch to the custom-resolution view with a fresh page
    pub fn open_custom(&mut self) {
        self.state.custom = Some(CustomView {
            title: self.localizer.get("t_custom_title"),
            hint: self.localizer.get("t_custom_hint"),
        });
        self.state.view = ViewMode::Custom;
    }

    /// Close button: leave the custom view, or hide to the tray from the list
    pub fn request_close(&mut self) -> CloseOutcome {
        match self.state.view {
            ViewMode::Custom => {
                self.state.custom = None;
                self.state.view = ViewMode::List;
                CloseOutcome::ReturnedToList
            }
            ViewMode::List => {
                self.host.hide_window();
                CloseOutcome::HiddenToTray
            }
        }
    }

    /// Open the Windows display settings page
    pub fn open_display_settings(&mut self) {
        self.open(DISPLAY_SETTINGS_URI);
    }

    /// Open the project page
    pub fn open_repo_link(&mut self) {
        self.open(REPO_URL);
    }

    /// Exit the application, confirming first while virtual displays exist
    pub fn exit(&mut self) -> ExitOutcome {
        if self.driver.display_count() > 0 {
            let message = self.localizer.get("t_msg_prompt_leave_all");
            let title = self.title();
            if !self.host.ask_yes_no(&title, &message) {
                info!("Exit cancelled by user");
                return ExitOutcome::Cancelled;
            }
        }

        info!("Exiting");
        self.teardown();
        self.host.quit();
        ExitOutcome::Exited
    }

    /// Start an update check unless one is already running
    ///
    /// Menu-started checks disable the menu item until [`Shell::finish_update_check`].
    pub fn begin_update_check(&mut self, origin: UpdateOrigin) -> bool {
        if self.state.update_in_flight {
            debug!("Update check already in flight; {:?} request ignored", origin);
            return false;
        }
        self.state.update_in_flight = true;
        if origin == UpdateOrigin::Menu {
            self.state.update_menu_enabled = false;
        }
        true
    }

    /// Handle the result of an update check started with [`Shell::begin_update_check`]
    pub fn finish_update_check(&mut self, origin: UpdateOrigin, result: Result<Option<String>>) {
        self.state.update_in_flight = false;
        self.state.update_menu_enabled = true;

        match result {
            Ok(Some(version)) => {
                let message = self
                    .localizer
                    .translate("t_msg_update_available", &[&version]);
                let title = self.title();
                if self.host.ask_yes_no(&title, &message) {
                    self.open(DOWNLOAD_URL);
                }
            }
            Ok(None) => {
                if origin == UpdateOrigin::Menu {
                    let message = self.localizer.get("t_msg_up_to_date");
                    let title = self.title();
                    self.host.show_info(&title, &message);
                }
            }
            Err(e) => {
                warn!("Update check failed: {}", e);
                if origin == UpdateOrigin::Menu {
                    let message = self.localizer.translate("t_msg_update_failed", &[&e]);
                    let title = self.title();
                    self.host.show_warning(&title, &message);
                }
            }
        }
    }

    /// Activate a language from the menu and persist it; unknown names are ignored
    pub fn select_language(&mut self, name: &str) -> bool {
        if !locale::is_supported(name) || !self.state.languages.select(name) {
            warn!("Ignoring selection of unknown language '{}'", name);
            return false;
        }

        self.localizer.set_language(name);
        self.config.language = name.to_string();
        self.persist_config();
        info!("Language changed to {}", name);
        true
    }

    /// Toggle adding a virtual display when no monitor is active, and persist it
    pub fn set_fallback_display(&mut self, enabled: bool) {
        self.config.fallback_display = enabled;
        self.persist_config();
    }

    /// Remember the window position for the next start
    pub fn save_window_position(&mut self, x: i32, y: i32) {
        let position = WindowState { x, y };
        if self.config.window_state != position {
            self.config.window_state = position;
            self.persist_config();
        }
    }

    /// Title bar text, e.g. `Parsec Virtual Display v0.45.1`
    pub fn window_title(&self) -> String {
        format!("{} v{}", self.title(), env!("CARGO_PKG_VERSION"))
    }

    /// Everything the window renders
    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Current window content
    pub fn view_mode(&self) -> ViewMode {
        self.state.view
    }

    /// Displays from the latest notification, in driver order
    pub fn displays(&self) -> &[Display] {
        &self.state.displays
    }

    /// Whether the "no display" placeholder is shown
    pub fn placeholder_visible(&self) -> bool {
        self.state.placeholder_visible
    }

    /// Whether add and remove requests are accepted
    pub fn add_enabled(&self) -> bool {
        self.state.add_enabled()
    }

    /// Language entries with the active one checked
    pub fn language_menu(&self) -> &LanguageMenu {
        &self.state.languages
    }

    /// Current settings, including unsaved window position changes
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Translations for the active language
    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// The display driver this shell requests changes from
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The window host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the window host, e.g. for tray updates
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether the driver subscription is held
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    fn title(&self) -> String {
        self.localizer.get("t_app_name")
    }

    fn open(&mut self, url: &str) {
        if let Err(e) = self.host.open_url(url) {
            warn!("Failed to open {}: {}", url, e);
        }
    }

    /// Only one display request may be outstanding until the next notification
    fn refresh_pending(&self, request: &str) -> bool {
        if self.state.pending_refresh {
            debug!("Driver {} request ignored, waiting for a display change", request);
        }
        self.state.pending_refresh
    }

    fn persist_config(&self) {
        if let Err(e) = ConfigManager::save(&self.config) {
            error!("Failed to save configuration: {}", e);
        }
    }

    /// A rejected request produces no notification, so re-arm the add control here
    fn report_driver_failure(&mut self, request: &str, e: &VdisplayError) {
        error!("Driver {} request failed: {}", request, e);
        self.state.pending_refresh = false;
        let message = self
            .localizer
            .translate("t_msg_driver_request_failed", &[e]);
        let title = self.title();
        self.host.show_warning(&title, &message);
    }
}

impl<D: DisplayDriver, H: ShellHost> Drop for Shell<D, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
