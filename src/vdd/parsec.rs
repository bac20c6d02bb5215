//! Parsec VDD backend
//!
//! Talks to the Parsec Virtual Display Adapter through its device interface:
//!
//! - **Discovery**: SetupAPI lookup of the adapter interface GUID
//! - **Requests**: overlapped `DeviceIoControl` calls (add / remove / update / version)
//! - **Keep-alive**: the adapter unplugs every virtual display if it is not pinged with
//!   the update IOCTL at least once per second, so a background thread pings every 100ms
//! - **Enumeration**: `EnumDisplayDevicesW`, matching monitors whose ID contains `PSCCDD0`
//! - **Notifications**: a [`DisplayMonitor`] re-enumerates after `WM_DISPLAYCHANGE`
//!
//! The adapter keeps no ownership record, so `display_count` tracks the slots this
//! process added; displays vanish with the keep-alive when the process exits.

use crate::error::{Result, StringError, VdisplayError};
use crate::vdd::display_monitor::DisplayMonitor;
use crate::vdd::{
    ChangeNotifier, Display, DisplayChange, DisplayDriver, DriverStatus, MAX_DISPLAYS,
    Subscription,
};
use parking_lot::Mutex;
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    CM_DEVNODE_STATUS_FLAGS, CM_Get_DevNode_Status, CM_PROB, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT,
    SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W, SP_DEVINFO_DATA, SPDRP_HARDWAREID,
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiEnumDeviceInterfaces,
    SetupDiGetClassDevsW, SetupDiGetDeviceInterfaceDetailW, SetupDiGetDeviceRegistryPropertyW,
};
use windows::Win32::Foundation::{
    CloseHandle, ERROR_IO_PENDING, GENERIC_READ, GENERIC_WRITE, HANDLE,
};
use windows::Win32::Graphics::Gdi::{
    DEVMODEW, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP, DISPLAY_DEVICEW, ENUM_CURRENT_SETTINGS,
    EnumDisplayDevicesW, EnumDisplaySettingsW,
};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_FLAG_NO_BUFFERING, FILE_FLAG_OVERLAPPED,
    FILE_FLAG_WRITE_THROUGH, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows::Win32::System::IO::{
    CancelIoEx, DeviceIoControl, GetOverlappedResult, GetOverlappedResultEx, OVERLAPPED,
};
use windows::Win32::System::Threading::CreateEventW;
use windows::core::{GUID, PCWSTR};

/// Device interface GUID of the Parsec Virtual Display Adapter
const VDD_ADAPTER_GUID: GUID = GUID::from_u128(0x00b41627_04c4_429e_a26e_0265cf50c8fa);

/// Setup class GUID of display adapters
const DISPLAY_CLASS_GUID: GUID = GUID::from_u128(0x4d36e968_e325_11ce_bfc1_08002be10318);

/// Hardware ID of the adapter's device node
const VDD_HARDWARE_ID: &str = r"Root\Parsec\VDA";

/// Monitor ID fragment identifying Parsec virtual monitors
const VDD_DISPLAY_ID: &str = "PSCCDD0";

const IOCTL_ADD: u32 = 0x0022_e004;
const IOCTL_REMOVE: u32 = 0x0022_a008;
const IOCTL_UPDATE: u32 = 0x0022_a00c;
const IOCTL_VERSION: u32 = 0x0022_e010;

/// Upper bound on a single IOCTL round-trip
const IOCTL_TIMEOUT_MS: u32 = 5000;

/// Keep-alive period; the adapter drops displays after ~1s without a ping
const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(100);

/// Owned device handle, closed on drop
struct DeviceHandle(HANDLE);

// SAFETY: the handle is an opaque kernel object reference; concurrent IOCTLs on one
// handle are serialized by `Inner::io_lock`.
#[allow(unsafe_code)]
unsafe impl Send for DeviceHandle {}
#[allow(unsafe_code)]
unsafe impl Sync for DeviceHandle {}

impl Drop for DeviceHandle {
    #[allow(unsafe_code)] // Windows FFI for handle cleanup
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

struct Inner {
    device: DeviceHandle,
    io_lock: Mutex<()>,
    notifier: ChangeNotifier,
    /// Slot indices returned by the add IOCTL, oldest first
    added: Mutex<Vec<u16>>,
    running: AtomicBool,
}

/// [`DisplayDriver`] backed by the Parsec Virtual Display Adapter
pub struct ParsecVdd {
    inner: Arc<Inner>,
    keepalive: Option<std::thread::JoinHandle<()>>,
    monitor: Option<DisplayMonitor>,
}

impl ParsecVdd {
    /// Open the adapter, start the keep-alive thread and the display change monitor
    pub fn open() -> Result<Self> {
        let path = find_device_path()?;
        let device = open_device(&path)?;
        info!("Opened Parsec virtual display adapter");

        let inner = Arc::new(Inner {
            device,
            io_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
            added: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        });

        let keepalive = {
            let inner = Arc::clone(&inner);
            std::thread::spawn(move || keepalive_loop(&inner))
        };

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let monitor = DisplayMonitor::start(move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        });

        Ok(Self {
            inner,
            keepalive: Some(keepalive),
            monitor: Some(monitor),
        })
    }

    /// Query the adapter's device node status without opening it
    #[allow(unsafe_code)] // Windows FFI for SetupAPI / CfgMgr32
    pub fn query_device_status() -> DriverStatus {
        unsafe {
            let Ok(devinfo) =
                SetupDiGetClassDevsW(Some(&DISPLAY_CLASS_GUID), PCWSTR::null(), None, DIGCF_PRESENT)
            else {
                warn!("SetupDiGetClassDevsW failed for the display class");
                return DriverStatus::Unknown;
            };

            let mut status = DriverStatus::NotInstalled;
            let mut index = 0;
            loop {
                let mut data = SP_DEVINFO_DATA {
                    cbSize: size_of::<SP_DEVINFO_DATA>() as u32,
                    ..Default::default()
                };
                if SetupDiEnumDeviceInfo(devinfo, index, &raw mut data).is_err() {
                    break;
                }
                index += 1;

                let mut buffer = [0u8; 1024];
                if SetupDiGetDeviceRegistryPropertyW(
                    devinfo,
                    &raw const data,
                    SPDRP_HARDWAREID,
                    None,
                    Some(&mut buffer),
                    None,
                )
                .is_err()
                {
                    continue;
                }

                let matches = multi_sz_strings(&buffer)
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(VDD_HARDWARE_ID));
                if !matches {
                    continue;
                }

                let mut flags = CM_DEVNODE_STATUS_FLAGS(0);
                let mut problem = CM_PROB(0);
                let ret = CM_Get_DevNode_Status(&raw mut flags, &raw mut problem, data.DevInst, 0);
                status = DriverStatus::from_devnode(ret.0, flags.0, problem.0);
                break;
            }

            let _ = SetupDiDestroyDeviceInfoList(devinfo);
            debug!("Parsec VDD device status: {}", status);
            status
        }
    }
}

impl Inner {
    /// Issue one IOCTL with a 32-byte input buffer and a u32 output
    #[allow(unsafe_code)] // Windows FFI for overlapped DeviceIoControl
    fn ioctl(&self, code: u32, input: &[u8; 32]) -> Result<u32> {
        let _guard = self.io_lock.lock();

        unsafe {
            let event = CreateEventW(None, true, false, PCWSTR::null())?;
            let mut overlapped = OVERLAPPED {
                hEvent: event,
                ..Default::default()
            };
            let mut output: u32 = 0;

            let issued = DeviceIoControl(
                self.device.0,
                code,
                Some(input.as_ptr().cast()),
                input.len() as u32,
                Some((&raw mut output).cast()),
                size_of::<u32>() as u32,
                None,
                Some(&raw mut overlapped),
            );

            if let Err(e) = issued {
                if e.code() != ERROR_IO_PENDING.to_hresult() {
                    let _ = CloseHandle(event);
                    return Err(VdisplayError::DriverError(Box::new(e)));
                }
            }

            // `overlapped` and `output` must outlive the request, even on timeout
            let completed = wait_overlapped(self.device.0, &overlapped, IOCTL_TIMEOUT_MS);
            let _ = CloseHandle(event);
            completed.map_err(|e| VdisplayError::DriverError(Box::new(e)))?;

            Ok(output)
        }
    }

    fn ping(&self) -> Result<()> {
        self.ioctl(IOCTL_UPDATE, &[0u8; 32]).map(|_| ())
    }

    /// Enumerate displays and publish the result
    fn refresh(&self) {
        let change = enumerate_displays();
        debug!(
            "Enumerated {} Parsec display(s), no_monitors={}",
            change.displays.len(),
            change.no_monitors
        );
        self.notifier.publish(&change);
    }
}

fn keepalive_loop(inner: &Inner) {
    info!("Parsec VDD keep-alive thread started");
    let mut failing = false;
    while inner.running.load(Ordering::SeqCst) {
        match inner.ping() {
            Ok(()) if failing => {
                info!("Parsec VDD keep-alive recovered");
                failing = false;
            }
            Ok(()) => {}
            Err(e) if !failing => {
                error!("Parsec VDD keep-alive failed: {}", e);
                failing = true;
            }
            Err(_) => {}
        }
        std::thread::sleep(KEEPALIVE_INTERVAL);
    }
    info!("Parsec VDD keep-alive thread stopped");
}

impl DisplayDriver for ParsecVdd {
    fn add_display(&self) -> Result<()> {
        let mut added = self.inner.added.lock();
        if added.len() >= MAX_DISPLAYS {
            return Err(VdisplayError::DisplayLimitReached { max: MAX_DISPLAYS });
        }

        let slot = self.inner.ioctl(IOCTL_ADD, &[0u8; 32])?;
        let slot = u16::try_from(slot).map_err(|_| {
            VdisplayError::DriverError(StringError::new(format!(
                "adapter returned invalid display slot {slot}"
            )))
        })?;
        added.push(slot);
        drop(added);

        self.inner.ping()?;
        info!("Requested virtual display in slot {}", slot);
        Ok(())
    }

    fn remove_last_display(&self) -> Result<()> {
        let Some(slot) = self.inner.added.lock().pop() else {
            debug!("No virtual display to remove, re-enumerating");
            self.inner.refresh();
            return Ok(());
        };

        // The slot index is passed big-endian in the first two bytes
        let mut input = [0u8; 32];
        input[..2].copy_from_slice(&slot.to_be_bytes());
        self.inner.ioctl(IOCTL_REMOVE, &input)?;
        self.inner.ping()?;

        info!("Requested removal of virtual display in slot {}", slot);
        Ok(())
    }

    fn invalidate(&self) -> Result<()> {
        self.inner.refresh();
        Ok(())
    }

    fn query_status(&self) -> DriverStatus {
        Self::query_device_status()
    }

    fn query_version(&self) -> Result<String> {
        let minor = self.inner.ioctl(IOCTL_VERSION, &[0u8; 32])?;
        Ok(format!("0.{minor}"))
    }

    fn display_count(&self) -> usize {
        self.inner.added.lock().len()
    }

    fn subscribe(&self) -> (Subscription, Receiver<DisplayChange>) {
        self.inner.notifier.subscribe()
    }
}

impl Drop for ParsecVdd {
    fn drop(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
        }

        let slots: Vec<u16> = self.inner.added.lock().drain(..).rev().collect();
        for slot in slots {
            let mut input = [0u8; 32];
            input[..2].copy_from_slice(&slot.to_be_bytes());
            if let Err(e) = self.inner.ioctl(IOCTL_REMOVE, &input) {
                warn!("Failed to remove virtual display in slot {}: {}", slot, e);
            }
        }

        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.keepalive.take() {
            let _ = handle.join();
        }
        info!("Closed Parsec virtual display adapter");
    }
}

/// Locate the adapter's device interface path (NUL-terminated UTF-16)
#[allow(unsafe_code)] // Windows FFI for SetupAPI
fn find_device_path() -> Result<Vec<u16>> {
    unsafe {
        let devinfo = SetupDiGetClassDevsW(
            Some(&VDD_ADAPTER_GUID),
            PCWSTR::null(),
            None,
            DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
        )?;

        let result = (|| {
            let mut iface = SP_DEVICE_INTERFACE_DATA {
                cbSize: size_of::<SP_DEVICE_INTERFACE_DATA>() as u32,
                ..Default::default()
            };
            SetupDiEnumDeviceInterfaces(devinfo, None, &VDD_ADAPTER_GUID, 0, &raw mut iface)
                .map_err(|_| VdisplayError::DriverNotFound)?;

            let mut required: u32 = 0;
            // Size query; fails with ERROR_INSUFFICIENT_BUFFER by design
            let _ = SetupDiGetDeviceInterfaceDetailW(
                devinfo,
                &raw const iface,
                None,
                0,
                Some(&raw mut required),
                None,
            );
            if required == 0 {
                return Err(VdisplayError::DriverNotFound);
            }

            // u64 storage keeps the detail struct suitably aligned
            let mut storage = vec![0u64; (required as usize).div_ceil(8)];
            let detail = storage
                .as_mut_ptr()
                .cast::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>();
            (*detail).cbSize = size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;

            SetupDiGetDeviceInterfaceDetailW(
                devinfo,
                &raw const iface,
                Some(detail),
                required,
                None,
                None,
            )?;

            let path_ptr = (&raw const (*detail).DevicePath).cast::<u16>();
            let mut len = 0;
            while *path_ptr.add(len) != 0 {
                len += 1;
            }
            Ok(std::slice::from_raw_parts(path_ptr, len + 1).to_vec())
        })();

        let _ = SetupDiDestroyDeviceInfoList(devinfo);
        result
    }
}

#[allow(unsafe_code)] // Windows FFI for CreateFileW
fn open_device(path: &[u16]) -> Result<DeviceHandle> {
    unsafe {
        let handle = CreateFileW(
            PCWSTR(path.as_ptr()),
            (GENERIC_READ | GENERIC_WRITE).0,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            None,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL
                | FILE_FLAG_NO_BUFFERING
                | FILE_FLAG_OVERLAPPED
                | FILE_FLAG_WRITE_THROUGH,
            None,
        )
        .map_err(|e| {
            warn!("Failed to open Parsec VDD adapter: {}", e);
            VdisplayError::DriverError(Box::new(e))
        })?;
        Ok(DeviceHandle(handle))
    }
}

/// Wait up to `timeout_ms` for an overlapped request on `handle` to complete
///
/// A request that times out or fails is cancelled and waited out before returning,
/// so the kernel no longer references `overlapped` or the request buffers.
///
/// # Safety
///
/// `overlapped` must belong to a request issued on `handle`, with a manual-reset event.
#[allow(unsafe_code)] // Windows FFI for overlapped I/O completion
unsafe fn wait_overlapped(
    handle: HANDLE,
    overlapped: &OVERLAPPED,
    timeout_ms: u32,
) -> windows::core::Result<u32> {
    let mut transferred: u32 = 0;
    let completed = unsafe {
        GetOverlappedResultEx(handle, overlapped, &raw mut transferred, timeout_ms, false)
    };

    if let Err(e) = completed {
        warn!("Overlapped request did not complete: {}", e);
        unsafe {
            // ERROR_NOT_FOUND here only means the request already finished
            let _ = CancelIoEx(handle, Some(std::ptr::from_ref(overlapped)));
            let _ = GetOverlappedResult(handle, overlapped, &raw mut transferred, true);
        }
        return Err(e);
    }
    Ok(transferred)
}

/// Enumerate attached displays, collecting the Parsec ones
#[allow(unsafe_code)] // Windows FFI for display enumeration
fn enumerate_displays() -> DisplayChange {
    let mut displays = Vec::new();
    let mut attached = 0usize;

    unsafe {
        let mut adapter_index = 0;
        loop {
            let mut adapter = DISPLAY_DEVICEW {
                cb: size_of::<DISPLAY_DEVICEW>() as u32,
                ..Default::default()
            };
            if !EnumDisplayDevicesW(PCWSTR::null(), adapter_index, &raw mut adapter, 0).as_bool() {
                break;
            }
            adapter_index += 1;

            if (adapter.StateFlags & DISPLAY_DEVICE_ATTACHED_TO_DESKTOP).0 == 0 {
                continue;
            }
            attached += 1;

            let mut is_parsec = false;
            let mut monitor_index = 0;
            loop {
                let mut monitor = DISPLAY_DEVICEW {
                    cb: size_of::<DISPLAY_DEVICEW>() as u32,
                    ..Default::default()
                };
                if !EnumDisplayDevicesW(
                    PCWSTR(adapter.DeviceName.as_ptr()),
                    monitor_index,
                    &raw mut monitor,
                    0,
                )
                .as_bool()
                {
                    break;
                }
                monitor_index += 1;
                if wide_to_string(&monitor.DeviceID).contains(VDD_DISPLAY_ID) {
                    is_parsec = true;
                    break;
                }
            }

            if !is_parsec {
                continue;
            }

            let mut mode = DEVMODEW {
                dmSize: size_of::<DEVMODEW>() as u16,
                ..Default::default()
            };
            let has_mode = EnumDisplaySettingsW(
                PCWSTR(adapter.DeviceName.as_ptr()),
                ENUM_CURRENT_SETTINGS,
                &raw mut mode,
            )
            .as_bool();

            displays.push(Display {
                index: displays.len() as u32,
                device_name: wide_to_string(&adapter.DeviceName),
                width: if has_mode { mode.dmPelsWidth } else { 0 },
                height: if has_mode { mode.dmPelsHeight } else { 0 },
                refresh_rate: if has_mode { mode.dmDisplayFrequency } else { 0 },
            });
        }
    }

    DisplayChange {
        displays,
        no_monitors: attached == 0,
    }
}

/// Decode a NUL-terminated UTF-16 buffer
fn wide_to_string(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Split a REG_MULTI_SZ byte buffer (UTF-16LE) into strings
fn multi_sz_strings(bytes: &[u8]) -> Vec<String> {
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    wide.split(|&c| c == 0)
        .take_while(|s| !s.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use .unwrap() for brevity")]

    use super::*;

    #[test]
    fn test_wide_to_string_stops_at_nul() {
        let mut buffer = [0u16; 16];
        for (slot, c) in buffer.iter_mut().zip(r"\\.\DISPLAY9".encode_utf16()) {
            *slot = c;
        }
        assert_eq!(wide_to_string(&buffer), r"\\.\DISPLAY9");
    }

    #[test]
    fn test_multi_sz_strings() {
        let mut bytes = Vec::new();
        for s in [r"Root\Parsec\VDA", "Other"] {
            for c in s.encode_utf16().chain(std::iter::once(0)) {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(
            multi_sz_strings(&bytes),
            vec![r"Root\Parsec\VDA".to_string(), "Other".to_string()]
        );
    }

    /// Directory watch that stays pending until something changes in `dir`
    #[allow(unsafe_code)] // Windows FFI for overlapped directory reads
    fn watch_directory(
        dir: &std::path::Path,
        buffer: &mut [u32; 256],
        overlapped: &mut OVERLAPPED,
    ) -> HANDLE {
        use windows::Win32::Storage::FileSystem::{
            FILE_FLAG_BACKUP_SEMANTICS, FILE_LIST_DIRECTORY, FILE_NOTIFY_CHANGE_FILE_NAME,
            FILE_SHARE_DELETE, ReadDirectoryChangesW,
        };
        use windows::core::HSTRING;

        unsafe {
            let handle = CreateFileW(
                &HSTRING::from(dir.as_os_str()),
                FILE_LIST_DIRECTORY.0,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                None,
                OPEN_EXISTING,
                FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OVERLAPPED,
                None,
            )
            .unwrap();
            overlapped.hEvent = CreateEventW(None, true, false, PCWSTR::null()).unwrap();
            let issued = ReadDirectoryChangesW(
                handle,
                buffer.as_mut_ptr().cast(),
                u32::try_from(size_of::<[u32; 256]>()).unwrap(),
                false,
                FILE_NOTIFY_CHANGE_FILE_NAME,
                None,
                Some(std::ptr::from_mut(overlapped)),
                None,
            );
            if let Err(e) = issued {
                assert_eq!(e.code(), ERROR_IO_PENDING.to_hresult());
            }
            handle
        }
    }

    #[test]
    #[allow(unsafe_code)] // Windows FFI for overlapped directory reads
    fn test_timed_out_request_is_cancelled_before_return() {
        const STATUS_PENDING: usize = 0x103;

        let dir = tempfile::tempdir().unwrap();
        let mut buffer = [0u32; 256];
        let mut overlapped = OVERLAPPED::default();
        let handle = watch_directory(dir.path(), &mut buffer, &mut overlapped);

        let result = unsafe { wait_overlapped(handle, &overlapped, 50) };
        assert!(result.is_err());
        // The kernel has let go of the request
        assert_ne!(overlapped.Internal, STATUS_PENDING);

        unsafe {
            let _ = CloseHandle(overlapped.hEvent);
            let _ = CloseHandle(handle);
        }
    }

    #[test]
    #[allow(unsafe_code)] // Windows FFI for overlapped directory reads
    fn test_completed_request_reports_transferred_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = [0u32; 256];
        let mut overlapped = OVERLAPPED::default();
        let handle = watch_directory(dir.path(), &mut buffer, &mut overlapped);

        std::fs::write(dir.path().join("changed.txt"), b"x").unwrap();
        let transferred = unsafe { wait_overlapped(handle, &overlapped, 5000) }.unwrap();
        assert!(transferred > 0);

        unsafe {
            let _ = CloseHandle(overlapped.hEvent);
            let _ = CloseHandle(handle);
        }
    }

    #[test]
    fn test_query_device_status_does_not_panic() {
        let _status = ParsecVdd::query_device_status();
    }
}
