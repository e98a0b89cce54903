//! In-memory stand-in for the Win32 window system, used by unit tests.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;

use super::WindowSystem;
use crate::types::{Rect, WindowHandle};

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub title: String,
    pub minimized: bool,
    pub topmost: bool,
    pub alpha: u8,
    pub clickthrough: bool,
    pub rect: Rect,
    /// When set, every mutating call on this window fails
    pub broken: bool,
}

impl FakeWindow {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            minimized: false,
            topmost: false,
            alpha: 255,
            clickthrough: false,
            rect: Rect {
                left: 0,
                top: 0,
                right: 800,
                bottom: 600,
            },
            broken: false,
        }
    }
}

/// BTreeMap keeps enumeration order deterministic across test runs.
#[derive(Debug, Default)]
pub struct FakeWindows {
    windows: RefCell<BTreeMap<WindowHandle, FakeWindow>>,
    foreground: RefCell<Option<WindowHandle>>,
}

impl FakeWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handle: isize, title: &str) -> WindowHandle {
        let handle = WindowHandle(handle);
        self.windows
            .borrow_mut()
            .insert(handle, FakeWindow::new(title));
        handle
    }

    pub fn destroy(&self, handle: WindowHandle) {
        self.windows.borrow_mut().remove(&handle);
        let mut fg = self.foreground.borrow_mut();
        if *fg == Some(handle) {
            *fg = None;
        }
    }

    pub fn set_foreground(&self, handle: WindowHandle) {
        *self.foreground.borrow_mut() = Some(handle);
    }

    pub fn break_window(&self, handle: WindowHandle) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&handle) {
            w.broken = true;
        }
    }

    pub fn window(&self, handle: WindowHandle) -> FakeWindow {
        self.windows.borrow()[&handle].clone()
    }

    pub fn minimized_handles(&self) -> Vec<WindowHandle> {
        self.windows
            .borrow()
            .iter()
            .filter(|(_, w)| w.minimized)
            .map(|(h, _)| *h)
            .collect()
    }

    fn mutate(
        &self,
        handle: WindowHandle,
        f: impl FnOnce(&mut FakeWindow),
    ) -> Result<()> {
        let mut windows = self.windows.borrow_mut();
        match windows.get_mut(&handle) {
            Some(w) if w.broken => bail!("window {handle} rejected the call"),
            Some(w) => {
                f(w);
                Ok(())
            }
            // Stale handle: quiet no-op, like the Win32 layer
            None => Ok(()),
        }
    }
}

impl WindowSystem for FakeWindows {
    fn enumerate(&self) -> Vec<(WindowHandle, String)> {
        self.windows
            .borrow()
            .iter()
            .map(|(h, w)| (*h, w.title.clone()))
            .collect()
    }

    fn exists(&self, handle: WindowHandle) -> bool {
        self.windows.borrow().contains_key(&handle)
    }

    fn title(&self, handle: WindowHandle) -> String {
        self.windows
            .borrow()
            .get(&handle)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn rect(&self, handle: WindowHandle) -> Option<Rect> {
        self.windows.borrow().get(&handle).map(|w| w.rect)
    }

    fn foreground(&self) -> Option<WindowHandle> {
        *self.foreground.borrow()
    }

    fn set_topmost(&self, handle: WindowHandle, on: bool) -> Result<()> {
        self.mutate(handle, |w| w.topmost = on)
    }

    fn minimize(&self, handle: WindowHandle) -> Result<()> {
        self.mutate(handle, |w| w.minimized = true)
    }

    fn restore(&self, handle: WindowHandle) -> Result<()> {
        self.mutate(handle, |w| w.minimized = false)
    }

    fn focus(&self, handle: WindowHandle) -> Result<()> {
        self.mutate(handle, |w| w.minimized = false)?;
        if self.exists(handle) {
            self.set_foreground(handle);
        }
        Ok(())
    }

    fn set_opacity(&self, handle: WindowHandle, alpha: u8) -> Result<()> {
        self.mutate(handle, |w| w.alpha = alpha)
    }

    fn set_clickthrough(&self, handle: WindowHandle, on: bool) -> Result<()> {
        self.mutate(handle, |w| w.clickthrough = on)
    }
}
