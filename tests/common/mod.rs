//! Helpers shared by the integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]
#![allow(clippy::unwrap_used, reason = "Tests use .unwrap() for brevity")]

use parsec_vdisplay::Result;
use parsec_vdisplay::shell::ShellHost;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

static APPDATA_LOCK: Mutex<()> = Mutex::new(());

/// Points APPDATA at a private temp directory for the lifetime of the guard
pub struct TempAppdata {
    pub dir: TempDir,
    original: Option<String>,
    _lock: MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Tests modify APPDATA while holding APPDATA_LOCK"
)]
impl TempAppdata {
    pub fn new() -> Self {
        let lock = APPDATA_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::var("APPDATA").ok();
        // SAFETY: APPDATA_LOCK serializes every writer in this test binary.
        unsafe {
            std::env::set_var("APPDATA", dir.path());
        }
        Self {
            dir,
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Tests restore APPDATA while holding APPDATA_LOCK"
)]
impl Drop for TempAppdata {
    fn drop(&mut self) {
        // SAFETY: still holding APPDATA_LOCK.
        unsafe {
            match &self.original {
                Some(original) => std::env::set_var("APPDATA", original),
                None => std::env::remove_var("APPDATA"),
            }
        }
    }
}

/// Host that keeps a transcript of what the shell asked for
#[derive(Debug, Default)]
pub struct TranscriptHost {
    pub transcript: Vec<String>,
    pub answer_yes: bool,
}

impl TranscriptHost {
    pub fn answering(yes: bool) -> Self {
        Self {
            transcript: Vec::new(),
            answer_yes: yes,
        }
    }

    pub fn entries(&self, prefix: &str) -> Vec<&str> {
        self.transcript
            .iter()
            .filter_map(|line| line.strip_prefix(prefix))
            .collect()
    }
}

impl ShellHost for TranscriptHost {
    fn init_tray(&mut self) -> Result<()> {
        self.transcript.push("tray:init".to_string());
        Ok(())
    }

    fn uninit_tray(&mut self) {
        self.transcript.push("tray:uninit".to_string());
    }

    fn show_app(&mut self) {
        self.transcript.push("window:show".to_string());
    }

    fn hide_window(&mut self) {
        self.transcript.push("window:hide".to_string());
    }

    fn show_warning(&mut self, _title: &str, message: &str) {
        self.transcript.push(format!("warning:{message}"));
    }

    fn show_info(&mut self, _title: &str, message: &str) {
        self.transcript.push(format!("info:{message}"));
    }

    fn ask_yes_no(&mut self, _title: &str, message: &str) -> bool {
        self.transcript.push(format!("ask:{message}"));
        self.answer_yes
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        self.transcript.push(format!("open:{url}"));
        Ok(())
    }

    fn quit(&mut self) {
        self.transcript.push("quit".to_string());
    }
}
