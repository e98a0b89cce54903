//! Win32 implementation of [`WindowSystem`].
//!
//! All unsafe code in the crate lives here. Handles crossing this boundary
//! are plain `isize` values so the rest of the crate stays `Send`-friendly;
//! they are rewrapped into `HWND` per call.

use anyhow::{Context, Result};
use tracing::debug;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, RECT};
use windows::Win32::System::Threading::GetCurrentProcessId;
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowLongPtrW, GetWindowRect, GetWindowTextW,
    GetWindowThreadProcessId, IsWindow, IsWindowVisible, SetForegroundWindow,
    SetLayeredWindowAttributes, SetWindowLongPtrW, SetWindowPos, ShowWindow, GWL_EXSTYLE,
    HWND_NOTOPMOST, HWND_TOPMOST, LWA_ALPHA, SWP_FRAMECHANGED, SWP_NOMOVE, SWP_NOSIZE,
    SW_MINIMIZE, SW_RESTORE, WS_EX_APPWINDOW, WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT,
};

use super::WindowSystem;
use crate::types::{Rect, WindowHandle};

#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Windows;

impl Win32Windows {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut std::ffi::c_void)
}

struct EnumState {
    own_pid: u32,
    windows: Vec<(WindowHandle, String)>,
}

unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> windows::core::BOOL {
    unsafe {
        if !IsWindowVisible(hwnd).as_bool() {
            return true.into();
        }

        let mut pid = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));

        let state = &mut *(lparam.0 as *mut EnumState);
        // Skip our own windows (overlays, dialogs) to avoid feedback loops
        if pid == state.own_pid {
            return true.into();
        }

        let mut buf = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut buf);
        if len == 0 {
            return true.into();
        }
        let title = String::from_utf16_lossy(&buf[..len as usize]);
        if title.trim().is_empty() {
            return true.into();
        }

        // Tool windows that don't opt back into the taskbar are utility
        // surfaces (tooltips, tray popups), not user-facing windows
        let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32;
        if ex_style & WS_EX_TOOLWINDOW.0 != 0 && ex_style & WS_EX_APPWINDOW.0 == 0 {
            return true.into();
        }

        state.windows.push((WindowHandle(hwnd.0 as isize), title));
        true.into()
    }
}

impl WindowSystem for Win32Windows {
    fn enumerate(&self) -> Vec<(WindowHandle, String)> {
        let mut state = EnumState {
            own_pid: unsafe { GetCurrentProcessId() },
            windows: Vec::new(),
        };
        let lparam = LPARAM(&mut state as *mut EnumState as isize);
        if let Err(e) = unsafe { EnumWindows(Some(enum_proc), lparam) } {
            debug!(error = %e, "EnumWindows aborted early");
        }
        state.windows
    }

    fn exists(&self, handle: WindowHandle) -> bool {
        unsafe { IsWindow(Some(hwnd(handle))).as_bool() }
    }

    fn title(&self, handle: WindowHandle) -> String {
        if !self.exists(handle) {
            return String::new();
        }
        let mut buf = [0u16; 512];
        let len = unsafe { GetWindowTextW(hwnd(handle), &mut buf) };
        String::from_utf16_lossy(&buf[..len as usize])
    }

    fn rect(&self, handle: WindowHandle) -> Option<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd(handle), &mut rect) }.ok()?;
        Some(Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }

    fn foreground(&self) -> Option<WindowHandle> {
        let fg = unsafe { GetForegroundWindow() };
        if fg.0.is_null() {
            None
        } else {
            Some(WindowHandle(fg.0 as isize))
        }
    }

    fn set_topmost(&self, handle: WindowHandle, on: bool) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        let insert_after = if on { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(
                hwnd(handle),
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE,
            )
        }
        .context("SetWindowPos failed")
    }

    fn minimize(&self, handle: WindowHandle) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        unsafe {
            let _ = ShowWindow(hwnd(handle), SW_MINIMIZE);
        }
        Ok(())
    }

    fn restore(&self, handle: WindowHandle) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        unsafe {
            let _ = ShowWindow(hwnd(handle), SW_RESTORE);
        }
        Ok(())
    }

    fn focus(&self, handle: WindowHandle) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        unsafe {
            let _ = ShowWindow(hwnd(handle), SW_RESTORE);
            // The OS refuses this for background processes sometimes; the
            // restore above still surfaces the window, so don't fail the call
            if !SetForegroundWindow(hwnd(handle)).as_bool() {
                debug!(window = %handle, "SetForegroundWindow declined");
            }
        }
        Ok(())
    }

    fn set_opacity(&self, handle: WindowHandle, alpha: u8) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        unsafe {
            let ex = GetWindowLongPtrW(hwnd(handle), GWL_EXSTYLE);
            SetWindowLongPtrW(hwnd(handle), GWL_EXSTYLE, ex | WS_EX_LAYERED.0 as isize);
            SetLayeredWindowAttributes(hwnd(handle), COLORREF(0), alpha, LWA_ALPHA)
                .context("SetLayeredWindowAttributes failed")
        }
    }

    fn set_clickthrough(&self, handle: WindowHandle, on: bool) -> Result<()> {
        if !self.exists(handle) {
            return Ok(());
        }
        unsafe {
            let ex = GetWindowLongPtrW(hwnd(handle), GWL_EXSTYLE);
            let new = if on {
                ex | WS_EX_TRANSPARENT.0 as isize
            } else {
                ex & !(WS_EX_TRANSPARENT.0 as isize)
            };
            SetWindowLongPtrW(hwnd(handle), GWL_EXSTYLE, new);
            // Frame-changed repaint so the style change takes effect
            SetWindowPos(
                hwnd(handle),
                None,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_FRAMECHANGED,
            )
            .context("SetWindowPos (frame refresh) failed")
        }
    }
}
