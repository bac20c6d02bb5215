#![allow(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `ParsecVDisplay` unit tests.
//!
//! Provides an `APPDATA` override for config persistence tests and a recording
//! `ShellHost` that captures every dialog and tray call the shell makes.

use crate::shell::ShellHost;
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize tests that modify the APPDATA environment variable.
static APPDATA_LOCK: Mutex<()> = Mutex::new(());

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// RAII guard that sets the APPDATA environment variable for a test scope
/// and restores the original value when dropped.
///
/// **Safety Invariants:**
/// 1. Each test gets its own unique `TempDir`, so parallel tests write to different paths
/// 2. The guard restores the original value on drop, even on panic
/// 3. The `APPDATA_LOCK` mutex ensures tests modify APPDATA serially, not concurrently
pub struct AppdataGuard {
    original: Option<String>,
    // Held for the lifetime of the guard
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only code that modifies environment variables with documented safety invariants."
)]
impl AppdataGuard {
    /// Create a new guard that sets APPDATA to the given temp directory path.
    pub fn new(temp_dir: &TempDir) -> Self {
        // A test that panicked while holding the lock poisons it; the guarded data is ()
        let lock = APPDATA_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let original = std::env::var("APPDATA").ok();
        // SAFETY: APPDATA_LOCK serializes every writer and each test uses its own TempDir.
        unsafe {
            std::env::set_var("APPDATA", temp_dir.path());
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only code that restores environment variables with documented safety invariants."
)]
impl Drop for AppdataGuard {
    fn drop(&mut self) {
        // SAFETY: still holding APPDATA_LOCK; restores the value captured in new().
        if let Some(ref original) = self.original {
            unsafe {
                std::env::set_var("APPDATA", original);
            }
        } else {
            unsafe {
                std::env::remove_var("APPDATA");
            }
        }
    }
}

/// One observable side effect requested by the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    InitTray,
    UninitTray,
    ShowApp,
    HideWindow,
    Warning(String),
    Info(String),
    Question(String),
    OpenUrl(String),
    Quit,
}

/// `ShellHost` that records calls and answers yes/no prompts from a queue
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Vec<HostCall>,
    /// Answers for `ask_yes_no`, consumed front to back; an empty queue answers "no"
    pub answers: VecDeque<bool>,
    pub tray_initialized: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next yes/no prompt
    pub fn answer(mut self, yes: bool) -> Self {
        self.answers.push_back(yes);
        self
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::Warning(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::Info(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn dialog_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    HostCall::Warning(_) | HostCall::Info(_) | HostCall::Question(_)
                )
            })
            .count()
    }

    pub fn count(&self, call: &HostCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl ShellHost for RecordingHost {
    fn init_tray(&mut self) -> crate::Result<()> {
        self.tray_initialized = true;
        self.calls.push(HostCall::InitTray);
        Ok(())
    }

    fn uninit_tray(&mut self) {
        self.tray_initialized = false;
        self.calls.push(HostCall::UninitTray);
    }

    fn show_app(&mut self) {
        self.calls.push(HostCall::ShowApp);
    }

    fn hide_window(&mut self) {
        self.calls.push(HostCall::HideWindow);
    }

    fn show_warning(&mut self, _title: &str, message: &str) {
        self.calls.push(HostCall::Warning(message.to_string()));
    }

    fn show_info(&mut self, _title: &str, message: &str) {
        self.calls.push(HostCall::Info(message.to_string()));
    }

    fn ask_yes_no(&mut self, _title: &str, message: &str) -> bool {
        self.calls.push(HostCall::Question(message.to_string()));
        self.answers.pop_front().unwrap_or(false)
    }

    fn open_url(&mut self, url: &str) -> crate::Result<()> {
        self.calls.push(HostCall::OpenUrl(url.to_string()));
        Ok(())
    }

    fn quit(&mut self) {
        self.calls.push(HostCall::Quit);
    }
}

#[test]
fn recording_host_answers_in_order() {
    let mut host = RecordingHost::new().answer(true).answer(false);
    assert!(host.ask_yes_no("t", "first"));
    assert!(!host.ask_yes_no("t", "second"));
    assert!(!host.ask_yes_no("t", "third"));
    assert_eq!(host.dialog_count(), 3);
    assert_eq!(host.count(&HostCall::Quit), 0);
}
