//! Global hotkey registration and the listener thread.
//!
//! The listener owns all hotkey registrations for its lifetime. Rebinding is
//! a full teardown and respawn rather than incremental re-registration, so
//! there is never a moment where old and new chords are both live.

use anyhow::Result;
use std::sync::mpsc::Sender;

use crate::config::HotkeyBindings;
use crate::dispatcher::{Action, HotkeyEvent};

/// Virtual-key code for a single ASCII alphanumeric key name. Case does not
/// matter; anything else is unbindable.
pub fn vk_code(key: &str) -> Option<u32> {
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let c = c.to_ascii_uppercase();
    if c.is_ascii_digit() || c.is_ascii_uppercase() {
        Some(c as u32)
    } else {
        None
    }
}

/// Hotkey ids as seen in WM_HOTKEY. Digits use their group number directly.
const ACTION_ID_BASE: i32 = 100;

const ACTIONS: [(Action, i32); 4] = [
    (Action::Topmost, ACTION_ID_BASE),
    (Action::ShowOnly, ACTION_ID_BASE + 1),
    (Action::Transparent, ACTION_ID_BASE + 2),
    (Action::OpenGroupManager, ACTION_ID_BASE + 3),
];

fn event_for_id(id: i32) -> Option<HotkeyEvent> {
    if (0..crate::constants::groups::GROUP_COUNT as i32).contains(&id) {
        return Some(HotkeyEvent::Group(id as u8));
    }
    ACTIONS
        .iter()
        .find(|(_, action_id)| *action_id == id)
        .map(|&(action, _)| HotkeyEvent::Action(action))
}

fn action_key<'a>(bindings: &'a HotkeyBindings, action: Action) -> &'a str {
    match action {
        Action::Topmost => &bindings.topmost,
        Action::ShowOnly => &bindings.show_only,
        Action::Transparent => &bindings.transparent,
        Action::OpenGroupManager => &bindings.open_group_manager,
    }
}

#[cfg(target_os = "windows")]
mod listener {
    use super::*;
    use anyhow::{bail, Context};
    use std::sync::mpsc::channel;
    use std::thread::{self, JoinHandle};
    use tracing::{debug, error, info, warn};
    use windows::Win32::Foundation::{LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        RegisterHotKey, UnregisterHotKey, MOD_ALT, MOD_CONTROL,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetMessageW, PostThreadMessageW, MSG, WM_HOTKEY, WM_QUIT,
    };

    /// Running listener thread. Dropping it without calling `shutdown` leaks
    /// the thread until process exit, which is fine for the main instance but
    /// not for a rebind.
    pub struct HotkeyListener {
        thread_id: u32,
        handle: JoinHandle<()>,
    }

    impl HotkeyListener {
        pub fn shutdown(self) {
            // SAFETY: posting WM_QUIT to a message-pumping thread is the
            // documented way to end its GetMessageW loop.
            unsafe {
                if let Err(e) = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                    warn!(error = %e, "failed to post quit to hotkey thread");
                    return;
                }
            }
            if self.handle.join().is_err() {
                warn!("hotkey thread panicked during shutdown");
            }
        }
    }

    /// Spawn the listener thread and register every chord on it. Hotkeys are
    /// thread-affine on Windows, so registration must happen on the thread
    /// that pumps messages.
    pub fn spawn_listener(
        bindings: &HotkeyBindings,
        sender: Sender<HotkeyEvent>,
    ) -> Result<HotkeyListener> {
        bindings.validate()?;
        let bindings = bindings.clone();
        let (ready_tx, ready_rx) = channel();

        let handle = thread::spawn(move || {
            let thread_id = unsafe { GetCurrentThreadId() };
            let registered = register_all(&bindings);
            let ok = !registered.is_empty();
            let _ = ready_tx.send(if ok { Ok(thread_id) } else { Err(()) });
            if !ok {
                return;
            }

            info!(count = registered.len(), "hotkey listener started");
            pump(&sender);

            for id in registered {
                // SAFETY: unregistering ids this thread registered above
                if let Err(e) = unsafe { UnregisterHotKey(None, id) } {
                    debug!(id, error = %e, "unregister failed");
                }
            }
            info!("hotkey listener stopped");
        });

        match ready_rx.recv().context("hotkey thread died before ready")? {
            Ok(thread_id) => Ok(HotkeyListener { thread_id, handle }),
            Err(()) => {
                let _ = handle.join();
                bail!("no hotkeys could be registered (another instance running?)")
            }
        }
    }

    /// Register digit and action chords, returning the ids that took. A chord
    /// already claimed by another application logs and is skipped; the rest
    /// keep working.
    fn register_all(bindings: &HotkeyBindings) -> Vec<i32> {
        let mods = MOD_CONTROL | MOD_ALT;
        let mut registered = Vec::new();

        for group in 0..crate::constants::groups::GROUP_COUNT {
            let id = group as i32;
            let vk = b'0' as u32 + group as u32;
            // SAFETY: thread-local registration, unregistered before exit
            match unsafe { RegisterHotKey(None, id, mods, vk) } {
                Ok(()) => registered.push(id),
                Err(e) => warn!(group, error = %e, "failed to register group chord"),
            }
        }

        for (action, id) in ACTIONS {
            let key = action_key(bindings, action);
            let Some(vk) = vk_code(key) else {
                error!(key, ?action, "unbindable key, skipping");
                continue;
            };
            match unsafe { RegisterHotKey(None, id, mods, vk) } {
                Ok(()) => registered.push(id),
                Err(e) => warn!(key, ?action, error = %e, "failed to register action chord"),
            }
        }

        registered
    }

    fn pump(sender: &Sender<HotkeyEvent>) {
        let mut msg = MSG::default();
        // SAFETY: plain message pump; GetMessageW returns 0 on WM_QUIT
        while unsafe { GetMessageW(&mut msg, None, 0, 0) }.as_bool() {
            if msg.message != WM_HOTKEY {
                continue;
            }
            let Some(event) = event_for_id(msg.wParam.0 as i32) else {
                debug!(id = msg.wParam.0, "unknown hotkey id");
                continue;
            };
            if sender.send(event).is_err() {
                // Main loop is gone, stop pumping
                return;
            }
        }
    }
}

#[cfg(target_os = "windows")]
pub use listener::{spawn_listener, HotkeyListener};

#[cfg(not(target_os = "windows"))]
mod listener {
    use super::*;
    use anyhow::bail;

    pub struct HotkeyListener;

    impl HotkeyListener {
        pub fn shutdown(self) {}
    }

    pub fn spawn_listener(
        bindings: &HotkeyBindings,
        _sender: Sender<HotkeyEvent>,
    ) -> Result<HotkeyListener> {
        bindings.validate()?;
        bail!("global hotkeys are only available on Windows")
    }
}

#[cfg(not(target_os = "windows"))]
pub use listener::{spawn_listener, HotkeyListener};
