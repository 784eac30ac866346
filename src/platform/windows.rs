//! Windows implementations of the platform collaborator interfaces.
//!
//! Frame grabbing goes through GDI (BitBlt into a memory DC, then GetDIBits);
//! window and monitor resolution use the user32 queries; idle time comes from
//! GetLastInputInfo; key translation uses ToUnicodeEx with the live modifier
//! state so the result respects the active keyboard layout.

use std::ffi::c_void;
use std::mem;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    GetMonitorInfoW, MonitorFromWindow, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER,
    BI_RGB, DIB_RGB_COLORS, MONITORINFO, MONITOR_DEFAULTTONEAREST, SRCCOPY,
};
use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, GetKeyState, GetKeyboardLayout, GetKeyboardState, GetLastInputInfo,
    ToUnicodeEx, LASTINPUTINFO, VK_CAPITAL, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW};

use crate::hooks::WindowHandle;
use crate::platform::{
    ticks_since, Bounds, CaptureError, DesktopQuery, Frame, FrameGrabber, IdleQuery, KeyTranslator,
};

fn to_hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

/// Window and monitor resolution through user32.
#[derive(Default)]
pub struct WinDesktopQuery;

impl DesktopQuery for WinDesktopQuery {
    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            None
        } else {
            Some(WindowHandle(hwnd.0 as isize))
        }
    }

    fn window_title(&self, window: WindowHandle) -> Option<String> {
        let mut buffer = [0u16; 512];
        let len = unsafe { GetWindowTextW(to_hwnd(window), &mut buffer) };
        if len <= 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..len as usize]))
    }

    fn monitor_bounds(&self, window: WindowHandle) -> Option<Bounds> {
        unsafe {
            let monitor = MonitorFromWindow(to_hwnd(window), MONITOR_DEFAULTTONEAREST);
            if monitor.is_invalid() {
                return None;
            }
            let mut info = MONITORINFO {
                cbSize: mem::size_of::<MONITORINFO>() as u32,
                ..Default::default()
            };
            if !GetMonitorInfoW(monitor, &mut info).as_bool() {
                return None;
            }
            let rect = info.rcMonitor;
            Some(Bounds {
                x: rect.left,
                y: rect.top,
                width: rect.right - rect.left,
                height: rect.bottom - rect.top,
            })
        }
    }
}

/// GDI screen capture for a monitor region.
#[derive(Default)]
pub struct GdiFrameGrabber;

impl FrameGrabber for GdiFrameGrabber {
    fn grab(&self, bounds: Bounds) -> Result<Frame, CaptureError> {
        let width = bounds.width;
        let height = bounds.height;
        if width <= 0 || height <= 0 {
            return Err(CaptureError::Grab(format!(
                "invalid capture region {width}x{height}"
            )));
        }

        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(CaptureError::Grab("GetDC failed".into()));
            }
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
            let old_bitmap = SelectObject(mem_dc, bitmap);

            let release = |msg: String| {
                SelectObject(mem_dc, old_bitmap);
                let _ = DeleteObject(bitmap);
                let _ = DeleteDC(mem_dc);
                ReleaseDC(None, screen_dc);
                CaptureError::Grab(msg)
            };

            if BitBlt(
                mem_dc,
                0,
                0,
                width,
                height,
                screen_dc,
                bounds.x,
                bounds.y,
                SRCCOPY,
            )
            .is_err()
            {
                return Err(release("BitBlt failed".into()));
            }

            let mut info = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height requests a top-down DIB.
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 24,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            // Rows are padded to a 4-byte boundary.
            let stride = ((width as usize * 3 + 3) / 4) * 4;
            let mut padded = vec![0u8; stride * height as usize];

            let copied = GetDIBits(
                mem_dc,
                bitmap,
                0,
                height as u32,
                Some(padded.as_mut_ptr() as *mut c_void),
                &mut info as *mut BITMAPINFOHEADER as *mut BITMAPINFO,
                DIB_RGB_COLORS,
            );
            if copied == 0 {
                return Err(release("GetDIBits failed".into()));
            }

            SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);

            // Strip the row padding so downstream sees tightly packed BGR.
            let row_bytes = width as usize * 3;
            let mut pixels = Vec::with_capacity(row_bytes * height as usize);
            for row in 0..height as usize {
                let start = row * stride;
                pixels.extend_from_slice(&padded[start..start + row_bytes]);
            }

            Ok(Frame {
                pixels,
                width: width as u32,
                height: height as u32,
                channels: 3,
            })
        }
    }
}

/// Global last-input query with wraparound-safe tick arithmetic.
#[derive(Default)]
pub struct WinIdleQuery;

impl IdleQuery for WinIdleQuery {
    fn idle_millis(&self) -> u64 {
        let mut info = LASTINPUTINFO {
            cbSize: mem::size_of::<LASTINPUTINFO>() as u32,
            dwTime: 0,
        };
        if !unsafe { GetLastInputInfo(&mut info) }.as_bool() {
            return 0;
        }
        let now = unsafe { GetTickCount() };
        ticks_since(now, info.dwTime) as u64
    }
}

/// Keyboard-layout translation through ToUnicodeEx.
#[derive(Default)]
pub struct LayoutKeyTranslator;

impl KeyTranslator for LayoutKeyTranslator {
    fn translate(&self, vk: u32, scan_code: u32) -> Option<String> {
        unsafe {
            let mut key_state = [0u8; 256];
            if GetKeyboardState(&mut key_state).is_err() {
                return None;
            }

            // The snapshot from GetKeyboardState can lag the low-level hook;
            // refresh shift and caps-lock from the live key state.
            if (GetAsyncKeyState(VK_SHIFT.0 as i32) as u16) & 0x8000 != 0 {
                key_state[VK_SHIFT.0 as usize] |= 0x80;
            }
            if (GetKeyState(VK_CAPITAL.0 as i32) as u16) & 0x0001 != 0 {
                key_state[VK_CAPITAL.0 as usize] |= 0x01;
            }

            let layout = GetKeyboardLayout(0);
            let mut buffer = [0u16; 8];
            let written = ToUnicodeEx(vk, scan_code, &key_state, &mut buffer, 0, layout);
            if written <= 0 {
                return None;
            }
            Some(String::from_utf16_lossy(&buffer[..written as usize]))
        }
    }
}
