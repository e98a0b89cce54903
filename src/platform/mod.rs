//! OS window access behind a single trait seam.
//!
//! Everything above this module treats window handles as potentially stale:
//! queries answer about whatever currently exists, and mutations on a dead
//! handle are a quiet no-op. The Win32 implementation lives in [`win32`];
//! tests run against [`fake::FakeWindows`].

#[cfg(test)]
pub mod fake;
#[cfg(target_os = "windows")]
pub mod win32;

#[cfg(target_os = "windows")]
pub use win32::Win32Windows;

use anyhow::Result;

use crate::types::{Rect, WindowHandle};

pub trait WindowSystem {
    /// Visible, titled, top-level windows belonging to other processes.
    /// Tool windows (WS_EX_TOOLWINDOW set without WS_EX_APPWINDOW) are
    /// excluded, as are this process's own windows.
    fn enumerate(&self) -> Vec<(WindowHandle, String)>;

    fn exists(&self, handle: WindowHandle) -> bool;

    /// Window title, or an empty string for a stale handle
    fn title(&self, handle: WindowHandle) -> String;

    fn rect(&self, handle: WindowHandle) -> Option<Rect>;

    fn foreground(&self) -> Option<WindowHandle>;

    // Mutations. All are best-effort: a stale handle is a silent no-op and an
    // OS failure surfaces as Err for the caller to log and move past.

    fn set_topmost(&self, handle: WindowHandle, on: bool) -> Result<()>;

    fn minimize(&self, handle: WindowHandle) -> Result<()>;

    fn restore(&self, handle: WindowHandle) -> Result<()>;

    /// Restore and bring to the foreground
    fn focus(&self, handle: WindowHandle) -> Result<()>;

    /// Set the layered-window alpha (0-255)
    fn set_opacity(&self, handle: WindowHandle, alpha: u8) -> Result<()>;

    /// Make the window pass mouse input through to whatever is beneath it
    fn set_clickthrough(&self, handle: WindowHandle, on: bool) -> Result<()>;
}
