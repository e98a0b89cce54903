//! Two-stage hotkey chords.
//!
//! A digit chord arms a pending group for a few seconds; an action chord
//! within that window applies the action to every live member of the group.
//! An action chord with nothing pending targets the foreground window
//! instead. All timing is deadline-based, so an expired pending group can
//! never fire late from a background timer.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::hotkeys::PENDING_GROUP_TIMEOUT;
use crate::engine::TransformEngine;
use crate::groups::GroupRegistry;
use crate::platform::WindowSystem;
use crate::types::{GroupId, WindowHandle};
use crate::ui::UiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Topmost,
    ShowOnly,
    Transparent,
    OpenGroupManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    Group(GroupId),
    Action(Action),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    group: GroupId,
    expires: Instant,
}

pub struct Dispatcher {
    pending: Option<Pending>,
    /// Overlay window -> the transparent window it controls. Hotkeys landing
    /// on an overlay act on its target instead.
    overlays: HashMap<WindowHandle, WindowHandle>,
    timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_timeout(PENDING_GROUP_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: None,
            overlays: HashMap::new(),
            timeout,
        }
    }

    pub fn register_overlay(&mut self, overlay: WindowHandle, target: WindowHandle) {
        self.overlays.insert(overlay, target);
    }

    pub fn unregister_overlay(&mut self, overlay: WindowHandle) {
        self.overlays.remove(&overlay);
    }

    pub fn handle(
        &mut self,
        ws: &dyn WindowSystem,
        registry: &mut GroupRegistry,
        engine: &mut TransformEngine,
        event: HotkeyEvent,
    ) {
        self.handle_at(Instant::now(), ws, registry, engine, event);
    }

    pub fn handle_at(
        &mut self,
        now: Instant,
        ws: &dyn WindowSystem,
        registry: &mut GroupRegistry,
        engine: &mut TransformEngine,
        event: HotkeyEvent,
    ) {
        match event {
            HotkeyEvent::Group(group) => {
                debug!(group, "group chord, arming");
                self.pending = Some(Pending {
                    group,
                    expires: now + self.timeout,
                });
                engine.send_ui(UiEvent::PromptGroup(group));
            }
            HotkeyEvent::Action(Action::OpenGroupManager) => {
                // Leaves any armed pending group alone
                let focused = self.resolve_foreground(ws);
                engine.send_ui(UiEvent::OpenGroupManager(focused));
            }
            HotkeyEvent::Action(action) => {
                let pending = self.take_pending(now);
                self.run_action(ws, registry, engine, action, pending);
            }
        }
    }

    /// Consume the pending group if it has not expired. A later digit chord
    /// replaces the pending slot outright, so only the latest one can fire.
    fn take_pending(&mut self, now: Instant) -> Option<GroupId> {
        let pending = self.pending.take()?;
        if now < pending.expires {
            Some(pending.group)
        } else {
            debug!(group = pending.group, "pending group expired");
            None
        }
    }

    fn run_action(
        &mut self,
        ws: &dyn WindowSystem,
        registry: &mut GroupRegistry,
        engine: &mut TransformEngine,
        action: Action,
        group: Option<GroupId>,
    ) {
        let targets = match group {
            Some(group) => {
                let members = registry.live_members(ws, group);
                if members.is_empty() {
                    engine.notify(format!("{} is empty", registry.group_name(group)));
                    return;
                }
                members
            }
            None => match self.resolve_foreground(ws) {
                Some(handle) => vec![handle],
                None => {
                    debug!("action chord with no foreground window");
                    return;
                }
            },
        };

        match action {
            Action::Topmost => {
                for handle in targets {
                    engine.toggle_topmost(ws, handle);
                }
            }
            Action::ShowOnly => {
                // Group isolation anchors on the first member; the engine
                // widens it back out to the whole group.
                engine.toggle_isolate(ws, registry, targets[0]);
            }
            Action::Transparent => {
                for handle in targets {
                    engine.toggle_transparent(ws, handle);
                }
            }
            Action::OpenGroupManager => {}
        }
    }

    fn resolve_foreground(&self, ws: &dyn WindowSystem) -> Option<WindowHandle> {
        let handle = ws.foreground()?;
        Some(self.overlays.get(&handle).copied().unwrap_or(handle))
    }
}
