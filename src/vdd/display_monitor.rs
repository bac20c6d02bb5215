//! Display topology change monitoring
//!
//! Windows has no event API for "a monitor was attached"; the documented trigger is
//! the `WM_DISPLAYCHANGE` broadcast. This module runs a hidden top-level window on a
//! background thread and invokes a callback once a burst of display change messages
//! has settled.
//!
//! # How It Works
//!
//! 1. Register a window class and create a hidden window positioned off-screen
//!    (message-only windows do NOT receive broadcast messages)
//! 2. On `WM_DISPLAYCHANGE` or `WM_DEVICECHANGE`, (re)arm a settle timer
//! 3. When the timer fires with no further messages, kill it and run the callback
//! 4. `DisplayMonitor::stop` posts `WM_CLOSE`, which ends the message loop

use crate::error::{Result, VdisplayError};
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, Ordering};
use tracing::{debug, error, info};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, KillTimer,
    MSG, PostMessageW, PostQuitMessage, RegisterClassW, SetTimer, UnregisterClassW,
    WINDOW_EX_STYLE, WM_CLOSE, WM_DESTROY, WM_DEVICECHANGE, WM_DISPLAYCHANGE, WM_TIMER,
    WNDCLASSW, WS_OVERLAPPEDWINDOW,
};

/// Quiet period after the last display message before the callback runs
const SETTLE_DELAY_MS: u32 = 300;

/// Timer ID for the settle timer
const TIMER_ID_SETTLE: usize = 1;

type Callback = Arc<dyn Fn() + Send + Sync>;

// Thread-local storage for the window procedure's callback
thread_local! {
    static CALLBACK_TLS: std::cell::RefCell<Option<Callback>> = const { std::cell::RefCell::new(None) };
}

/// Handle to the running monitor thread
pub struct DisplayMonitor {
    hwnd: Arc<AtomicIsize>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl DisplayMonitor {
    /// Start monitoring in a background thread, calling `on_change` after each
    /// settled burst of display change messages
    pub fn start(on_change: impl Fn() + Send + Sync + 'static) -> Self {
        let hwnd = Arc::new(AtomicIsize::new(0));
        let hwnd_slot = Arc::clone(&hwnd);
        let callback: Callback = Arc::new(on_change);

        let thread = std::thread::spawn(move || {
            info!("Starting display change monitor thread");
            if let Err(e) = run_message_loop(callback, &hwnd_slot) {
                error!("Display change monitor failed: {}", e);
            }
            info!("Display change monitor thread exited");
        });

        Self {
            hwnd,
            thread: Some(thread),
        }
    }

    /// Close the hidden window and wait for the thread to exit
    #[allow(unsafe_code)] // Windows FFI for PostMessageW
    pub fn stop(&mut self) {
        let raw = self.hwnd.swap(0, Ordering::SeqCst);
        if raw != 0 {
            let hwnd = HWND(raw as *mut std::ffi::c_void);
            unsafe {
                let _ = PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DisplayMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run the Windows message loop until the hidden window is destroyed
#[allow(unsafe_code)] // Windows FFI for message loop
fn run_message_loop(callback: Callback, hwnd_slot: &AtomicIsize) -> Result<()> {
    use windows::core::w;

    let class_name = w!("ParsecVDisplay_DisplayMonitor");

    CALLBACK_TLS.with(|cell| {
        *cell.borrow_mut() = Some(callback);
    });

    unsafe {
        let wnd_class = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            lpszClassName: class_name,
            ..Default::default()
        };

        if RegisterClassW(&raw const wnd_class) == 0 {
            return Err(VdisplayError::WindowsApiError(
                windows::core::Error::from_thread(),
            ));
        }

        // Hidden, off-screen, and without HWND_MESSAGE so broadcasts still arrive
        let hwnd = match CreateWindowExW(
            WINDOW_EX_STYLE(0),
            class_name,
            w!("ParsecVDisplay Display Monitor"),
            WS_OVERLAPPEDWINDOW,
            -32000,
            -32000,
            1,
            1,
            None,
            None,
            None,
            None,
        ) {
            Ok(hwnd) => hwnd,
            Err(e) => {
                let _ = UnregisterClassW(class_name, None);
                return Err(e.into());
            }
        };

        hwnd_slot.store(hwnd.0 as isize, Ordering::SeqCst);
        debug!("Created hidden window for display change monitoring");

        let mut msg = MSG::default();
        while GetMessageW(&raw mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&raw const msg);
        }

        hwnd_slot.store(0, Ordering::SeqCst);
        let _ = UnregisterClassW(class_name, None);
        debug!("Unregistered display monitor window class");
    }

    CALLBACK_TLS.with(|cell| {
        cell.borrow_mut().take();
    });
    Ok(())
}

/// Window procedure for the hidden window
#[allow(unsafe_code)] // Windows FFI callback
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_DISPLAYCHANGE | WM_DEVICECHANGE => {
            debug!("Received display change message {:#x}", msg);
            // Re-arming an existing timer ID resets its countdown
            unsafe {
                SetTimer(Some(hwnd), TIMER_ID_SETTLE, SETTLE_DELAY_MS, None);
            }
            LRESULT(0)
        }
        WM_TIMER if wparam.0 == TIMER_ID_SETTLE => {
            unsafe {
                let _ = KillTimer(Some(hwnd), TIMER_ID_SETTLE);
            }
            CALLBACK_TLS.with(|cell| {
                if let Some(callback) = cell.borrow().as_ref() {
                    callback();
                }
            });
            LRESULT(0)
        }
        WM_CLOSE => {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            unsafe {
                let _ = KillTimer(Some(hwnd), TIMER_ID_SETTLE);
                PostQuitMessage(0);
            }
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
