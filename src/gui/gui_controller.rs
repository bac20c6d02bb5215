//! GUI controller
//!
//! Connects the Slint window to the window shell:
//!
//! - window callbacks call shell actions, then re-render the window from shell state
//! - a 100ms event-loop timer drains driver notifications, finished update checks and
//!   tray events
//! - update checks run on a worker thread and report back through a channel
//!
//! Message boxes are modal, so a callback can fire while another one is still inside
//! the shell; such re-entrant calls are dropped instead of double-borrowing it.

use crate::gui::host::WindowHost;
use crate::gui::icon;
use crate::gui::tray::{TrayAction, TrayLabels};
use crate::{DisplayItem, Labels, LanguageItem, MainWindow};
use parsec_vdisplay::config::AppConfig;
use parsec_vdisplay::error::get_user_friendly_error;
use parsec_vdisplay::locale::Localizer;
use parsec_vdisplay::shell::{Shell, ShellHost, UpdateOrigin, ViewMode};
use parsec_vdisplay::utils::autostart::{self, AutoStartManager};
use parsec_vdisplay::utils::update_checker::{UpdateChecker, spawn_check};
use parsec_vdisplay::vdd::DisplayDriver;
use parsec_vdisplay::{Result, VdisplayError};
use slint::{ComponentHandle, ModelRc, VecModel};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Driver shared between the shell and its background threads
pub type Driver = Arc<dyn DisplayDriver>;

type GuiShell = Shell<Driver, WindowHost>;
type UpdateReport = (UpdateOrigin, Result<Option<String>>);

/// How often the event loop drains notifications and tray events
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the window, the shell and the polling timer
pub struct GuiController {
    window: MainWindow,
    ctx: Context,
    update_rx: Rc<mpsc::Receiver<UpdateReport>>,
    poll_timer: slint::Timer,
    silent: bool,
}

/// Handles shared by every window callback
#[derive(Clone)]
struct Context {
    shell: Rc<RefCell<GuiShell>>,
    window: slint::Weak<MainWindow>,
    update_tx: mpsc::Sender<UpdateReport>,
}

impl GuiController {
    /// Build the window and shell; `silent` starts hidden in the tray
    pub fn new(driver: Driver, config: AppConfig, silent: bool) -> anyhow::Result<Self> {
        use anyhow::Context as _;

        let window = MainWindow::new().context("Failed to create main window")?;
        window.set_app_icon(icon::window_icon());

        let run_on_startup = AutoStartManager::is_enabled().unwrap_or_else(|e| {
            warn!("Failed to read run-on-startup state: {}", e);
            false
        });
        window.set_run_on_startup(run_on_startup);

        let position = config.window_state;
        let tray_labels = TrayLabels::from_localizer(&Localizer::new(&config.language)?);
        let host = WindowHost::new(window.as_weak(), tray_labels, run_on_startup);
        let shell = Shell::new(driver, host, config)?.with_silent(silent);

        window
            .window()
            .set_position(slint::PhysicalPosition::new(position.x, position.y));

        let (update_tx, update_rx) = mpsc::channel();
        let ctx = Context {
            shell: Rc::new(RefCell::new(shell)),
            window: window.as_weak(),
            update_tx,
        };

        let controller = Self {
            window,
            ctx,
            update_rx: Rc::new(update_rx),
            poll_timer: slint::Timer::default(),
            silent,
        };
        controller.connect_callbacks();
        Ok(controller)
    }

    /// Show the window, activate the shell and run the event loop until exit
    pub fn run(self) -> anyhow::Result<()> {
        if !self.silent {
            self.window.show()?;
        }

        let startup_check = self.ctx.act(Shell::activate).unwrap_or(false);
        if startup_check {
            self.ctx.spawn_update_fetch(UpdateOrigin::Startup);
        }

        if !self.silent {
            self.ctx.act(|shell| shell.host().ensure_drop_shadow());
        }

        let ctx = self.ctx.clone();
        let update_rx = Rc::clone(&self.update_rx);
        self.poll_timer
            .start(slint::TimerMode::Repeated, POLL_INTERVAL, move || {
                ctx.poll(&update_rx);
            });

        info!("Starting GUI event loop");
        // The window may be hidden in the tray, so only an explicit quit ends the loop
        slint::run_event_loop_until_quit()?;

        self.poll_timer.stop();
        self.ctx.shell.borrow_mut().teardown();
        Ok(())
    }

    fn connect_callbacks(&self) {
        let w = &self.window;

        let ctx = self.ctx.clone();
        w.on_add_display(move || {
            ctx.act(|shell| {
                shell.add_display();
            });
        });

        let ctx = self.ctx.clone();
        w.on_remove_last_display(move || {
            ctx.act(Shell::remove_last_display);
        });

        let ctx = self.ctx.clone();
        w.on_open_custom(move || {
            ctx.act(Shell::open_custom);
        });

        let ctx = self.ctx.clone();
        w.on_open_display_settings(move || {
            ctx.act(Shell::open_display_settings);
        });

        let ctx = self.ctx.clone();
        w.on_sync(move || {
            ctx.act(Shell::resync);
        });

        let ctx = self.ctx.clone();
        w.on_query_status(move || {
            ctx.act(Shell::query_status);
        });

        let ctx = self.ctx.clone();
        w.on_open_repo(move || {
            ctx.act(Shell::open_repo_link);
        });

        let ctx = self.ctx.clone();
        w.on_check_update(move || ctx.start_update_check(UpdateOrigin::Menu));

        let ctx = self.ctx.clone();
        w.on_select_language(move |name| {
            ctx.act(|shell| {
                if shell.select_language(&name) {
                    let labels = TrayLabels::from_localizer(shell.localizer());
                    shell.host_mut().relabel_tray(labels);
                }
            });
        });

        let ctx = self.ctx.clone();
        w.on_fallback_display_toggled(move |enabled| {
            ctx.act(|shell| shell.set_fallback_display(enabled));
        });

        let ctx = self.ctx.clone();
        w.on_run_on_startup_toggled(move |enabled| ctx.set_run_on_startup(enabled));

        let ctx = self.ctx.clone();
        w.on_close_clicked(move || ctx.close());

        let ctx = self.ctx.clone();
        w.window().on_close_requested(move || {
            ctx.close();
            slint::CloseRequestResponse::KeepWindowShown
        });

        let ctx = self.ctx.clone();
        w.on_exit_clicked(move || ctx.exit());

        let weak = w.as_weak();
        w.on_move_window(move |dx, dy| {
            if let Some(window) = weak.upgrade() {
                let window = window.window();
                let scale = window.scale_factor();
                let position = window.position();
                #[expect(clippy::cast_possible_truncation, reason = "pixel deltas are small")]
                window.set_position(slint::PhysicalPosition::new(
                    position.x + (dx * scale) as i32,
                    position.y + (dy * scale) as i32,
                ));
            }
        });
    }
}

impl Context {
    /// Run `f` on the shell and re-render; `None` when the shell is busy
    fn act<R>(&self, f: impl FnOnce(&mut GuiShell) -> R) -> Option<R> {
        let Ok(mut shell) = self.shell.try_borrow_mut() else {
            debug!("Shell busy (modal dialog open), ignoring action");
            return None;
        };
        let result = f(&mut shell);
        if let Some(window) = self.window.upgrade() {
            render(&window, &shell);
        }
        Some(result)
    }

    /// Timer tick: notifications, finished update checks, tray events
    fn poll(&self, update_rx: &mpsc::Receiver<UpdateReport>) {
        let Ok(mut shell) = self.shell.try_borrow_mut() else {
            return;
        };

        let mut changed = shell.pump_notifications() > 0;
        while let Ok((origin, result)) = update_rx.try_recv() {
            shell.finish_update_check(origin, result);
            changed = true;
        }

        if changed && let Some(window) = self.window.upgrade() {
            render(&window, &shell);
        }
        drop(shell);

        #[cfg(windows)]
        self.poll_tray();
    }

    #[cfg(windows)]
    fn poll_tray(&self) {
        use tray_icon::menu::MenuEvent;
        use tray_icon::{MouseButton, MouseButtonState, TrayIconEvent};

        while let Ok(event) = MenuEvent::receiver().try_recv() {
            let action = self.shell.try_borrow().ok().and_then(|shell| {
                shell
                    .host()
                    .tray()
                    .and_then(|tray| tray.action_for(&event.id))
            });
            if let Some(action) = action {
                self.handle_tray_action(action);
            }
        }

        while let Ok(event) = TrayIconEvent::receiver().try_recv() {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                self.act(|shell| shell.host_mut().show_app());
            }
        }
    }

    #[cfg_attr(not(windows), expect(dead_code, reason = "tray menu only exists on Windows"))]
    fn handle_tray_action(&self, action: TrayAction) {
        debug!("Tray action: {:?}", action);
        match action {
            TrayAction::Show => {
                self.act(|shell| shell.host_mut().show_app());
            }
            TrayAction::AddDisplay => {
                self.act(|shell| {
                    shell.add_display();
                });
            }
            TrayAction::RemoveDisplay => {
                self.act(Shell::remove_last_display);
            }
            TrayAction::DriverStatus => {
                self.act(Shell::query_status);
            }
            TrayAction::CheckUpdate => self.start_update_check(UpdateOrigin::Menu),
            TrayAction::ToggleRunOnStartup => {
                let enabled = AutoStartManager::is_enabled().unwrap_or(false);
                self.set_run_on_startup(!enabled);
            }
            TrayAction::Exit => self.exit(),
        }
    }

    fn start_update_check(&self, origin: UpdateOrigin) {
        if self.act(|shell| shell.begin_update_check(origin)) == Some(true) {
            self.spawn_update_fetch(origin);
        }
    }

    /// Run the fetch for a check already begun on the shell
    fn spawn_update_fetch(&self, origin: UpdateOrigin) {
        let tx = self.update_tx.clone();
        let spawned = UpdateChecker::for_current_build().and_then(|checker| {
            spawn_check(checker, move |result| {
                // The receiver is gone only after the event loop ended
                let _ = tx.send((origin, result));
            })
            .map_err(VdisplayError::from)
        });

        if let Err(e) = spawned {
            self.act(|shell| shell.finish_update_check(origin, Err(e)));
        }
    }

    fn set_run_on_startup(&self, enabled: bool) {
        let result = autostart::set_enabled(enabled);
        let actual = AutoStartManager::is_enabled().unwrap_or(enabled);

        self.act(|shell| {
            if let Err(e) = &result {
                warn!("Failed to change run-on-startup: {}", e);
                let title = shell.localizer().get("t_app_name");
                let message = get_user_friendly_error(e);
                shell.host_mut().show_warning(&title, &message);
            }
            shell.host_mut().set_run_on_startup(actual);
        });

        if let Some(window) = self.window.upgrade() {
            window.set_run_on_startup(actual);
        }
    }

    fn close(&self) {
        let position = self.window.upgrade().map(|w| w.window().position());
        self.act(|shell| {
            if let (ViewMode::List, Some(position)) = (shell.view_mode(), position) {
                shell.save_window_position(position.x, position.y);
            }
            shell.request_close();
        });
    }

    fn exit(&self) {
        let position = self.window.upgrade().map(|w| w.window().position());
        self.act(|shell| {
            if let Some(position) = position {
                shell.save_window_position(position.x, position.y);
            }
            shell.exit();
        });
    }
}

/// Copy shell state into the window's properties
fn render(window: &MainWindow, shell: &GuiShell) {
    let localizer = shell.localizer();
    let state = shell.state();

    window.set_app_title(shell.window_title().into());
    window.set_labels(labels(localizer));

    let items: Vec<DisplayItem> = shell
        .displays()
        .iter()
        .map(|d| DisplayItem {
            label: d.label().into(),
        })
        .collect();
    window.set_displays(ModelRc::new(VecModel::from(items)));
    window.set_placeholder_visible(shell.placeholder_visible());
    window.set_add_enabled(shell.add_enabled());

    window.set_custom_visible(state.custom.is_some());
    if let Some(custom) = &state.custom {
        window.set_custom_title(custom.title.as_str().into());
        window.set_custom_hint(custom.hint.as_str().into());
    }

    let languages: Vec<LanguageItem> = shell
        .language_menu()
        .entries()
        .iter()
        .map(|entry| LanguageItem {
            name: entry.name.into(),
            checked: entry.checked,
        })
        .collect();
    window.set_languages(ModelRc::new(VecModel::from(languages)));
    window.set_active_language(localizer.language().into());

    window.set_update_enabled(state.update_menu_enabled);
    window.set_fallback_display(shell.config().fallback_display);

    if let Some(tray) = shell.host().tray() {
        tray.set_update_enabled(state.update_menu_enabled);
        tray.set_requests_enabled(shell.add_enabled());
    }
}

fn labels(l: &Localizer) -> Labels {
    Labels {
        add_display: l.get("t_add_display").into(),
        remove_display: l.get("t_remove_display").into(),
        no_display: l.get("t_no_display").into(),
        custom: l.get("t_custom").into(),
        display_settings: l.get("t_display_settings").into(),
        sync: l.get("t_sync").into(),
        driver_status: l.get("t_driver_status").into(),
        check_update: l.get("t_check_update").into(),
        language: l.get("t_language").into(),
        run_on_startup: l.get("t_run_on_startup").into(),
        fallback_display: l.get("t_fallback_display").into(),
        exit: l.get("t_exit").into(),
    }
}
