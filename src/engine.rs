//! Per-window transform state machine.
//!
//! Tracks three overlapping kinds of state: a per-window always-on-top flag
//! (memory-only), a single global isolation slot, and per-window
//! transparency state. OS calls are best-effort everywhere; one window
//! failing never stops the rest of a batch.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::constants::transparency::{DEFAULT_ALPHA, MIN_ALPHA, OPAQUE};
use crate::groups::GroupRegistry;
use crate::platform::WindowSystem;
use crate::types::WindowHandle;
use crate::ui::UiEvent;

/// Remembered per-window transparency state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparencyState {
    pub alpha: u8,
    pub clickthrough: bool,
    /// Topmost flag before transparency forced it on, restored on cancel
    was_topmost: bool,
}

#[derive(Debug)]
struct Isolation {
    /// The handle the user toggled; toggling the same handle again restores
    anchor: WindowHandle,
    /// Exactly the windows this isolation minimized, and no others
    minimized: Vec<WindowHandle>,
}

pub struct TransformEngine {
    ui: Sender<UiEvent>,
    topmost: HashMap<WindowHandle, bool>,
    isolation: Option<Isolation>,
    transparency: HashMap<WindowHandle, TransparencyState>,
    default_alpha: u8,
    default_clickthrough: bool,
}

impl TransformEngine {
    pub fn new(ui: Sender<UiEvent>) -> Self {
        Self {
            ui,
            topmost: HashMap::new(),
            isolation: None,
            transparency: HashMap::new(),
            default_alpha: DEFAULT_ALPHA,
            default_clickthrough: false,
        }
    }

    pub fn is_topmost(&self, handle: WindowHandle) -> bool {
        self.topmost.get(&handle).copied().unwrap_or(false)
    }

    pub fn transparency_state(&self, handle: WindowHandle) -> Option<TransparencyState> {
        self.transparency.get(&handle).copied()
    }

    /// Handle whose toggle started the active isolation, if one is active
    pub fn isolated(&self) -> Option<WindowHandle> {
        self.isolation.as_ref().map(|iso| iso.anchor)
    }

    pub fn default_alpha(&self) -> u8 {
        self.default_alpha
    }

    pub fn default_clickthrough(&self) -> bool {
        self.default_clickthrough
    }

    /// Flip the always-on-top flag. Optimistic: the in-memory flag flips even
    /// if the OS call fails (it is retried implicitly on the next toggle).
    pub fn toggle_topmost(&mut self, ws: &dyn WindowSystem, handle: WindowHandle) {
        if !ws.exists(handle) {
            return;
        }
        let on = !self.is_topmost(handle);
        if let Err(e) = ws.set_topmost(handle, on) {
            warn!(window = %handle, error = %e, "set_topmost failed");
        }
        self.topmost.insert(handle, on);
        let title = ws.title(handle);
        if on {
            self.notify(format!("{title}: always on top"));
        } else {
            self.notify(format!("{title}: always on top off"));
        }
    }

    /// Isolate ("show only") a window or its whole group, or restore if the
    /// same handle is toggled again.
    ///
    /// Windows with the topmost flag set are treated as pinned and never
    /// minimized. Starting a new isolation while another is active replaces
    /// the slot without restoring the old set first; windows minimized by the
    /// replaced isolation stay minimized until restored by hand.
    pub fn toggle_isolate(
        &mut self,
        ws: &dyn WindowSystem,
        registry: &GroupRegistry,
        handle: WindowHandle,
    ) {
        if let Some(iso) = self.isolation.take_if(|iso| iso.anchor == handle) {
            for h in iso.minimized {
                if !ws.exists(h) {
                    continue;
                }
                if let Err(e) = ws.restore(h) {
                    warn!(window = %h, error = %e, "restore failed");
                }
            }
            self.notify("restored all windows".to_string());
            return;
        }

        if !ws.exists(handle) {
            return;
        }

        // A grouped window isolates its whole group
        let targets = match registry.group_of(handle) {
            Some(group) => registry.live_members(ws, group),
            None => vec![handle],
        };

        let mut minimized = Vec::new();
        for (h, _) in ws.enumerate() {
            if targets.contains(&h) || self.is_topmost(h) {
                continue;
            }
            match ws.minimize(h) {
                Ok(()) => minimized.push(h),
                Err(e) => warn!(window = %h, error = %e, "minimize failed, skipping window"),
            }
        }
        for &h in &targets {
            if let Err(e) = ws.restore(h) {
                warn!(window = %h, error = %e, "restore failed");
            }
        }
        if let Err(e) = ws.focus(handle) {
            warn!(window = %handle, error = %e, "focus failed");
        }

        info!(anchor = %handle, shown = targets.len(), minimized = minimized.len(), "isolation active");
        self.isolation = Some(Isolation {
            anchor: handle,
            minimized,
        });
        let titles: Vec<String> = targets.iter().map(|&h| ws.title(h)).collect();
        self.notify(format!("show only: {}", titles.join(", ")));
    }

    /// Apply transparency with the engine-wide defaults, or cancel it if the
    /// window already has transparency state.
    pub fn toggle_transparent(&mut self, ws: &dyn WindowSystem, handle: WindowHandle) {
        if let Some(state) = self.transparency.remove(&handle) {
            if ws.exists(handle) {
                if let Err(e) = ws.set_opacity(handle, OPAQUE) {
                    warn!(window = %handle, error = %e, "opacity reset failed");
                }
                if let Err(e) = ws.set_clickthrough(handle, false) {
                    warn!(window = %handle, error = %e, "clickthrough reset failed");
                }
                if let Err(e) = ws.set_topmost(handle, state.was_topmost) {
                    warn!(window = %handle, error = %e, "topmost restore failed");
                }
                self.notify(format!("{}: transparency off", ws.title(handle)));
            }
            self.send(UiEvent::DestroyOverlay(handle));
            return;
        }

        if !ws.exists(handle) {
            return;
        }

        let was_topmost = self.is_topmost(handle);
        if let Err(e) = ws.set_topmost(handle, true) {
            warn!(window = %handle, error = %e, "set_topmost failed");
        }
        if let Err(e) = ws.set_opacity(handle, self.default_alpha) {
            warn!(window = %handle, error = %e, "set_opacity failed");
        }
        if let Err(e) = ws.set_clickthrough(handle, self.default_clickthrough) {
            warn!(window = %handle, error = %e, "set_clickthrough failed");
        }
        self.transparency.insert(
            handle,
            TransparencyState {
                alpha: self.default_alpha,
                clickthrough: self.default_clickthrough,
                was_topmost,
            },
        );
        self.send(UiEvent::CreateOverlay(handle));
        self.notify(format!("{}: transparency on", ws.title(handle)));
    }

    /// Change the shared alpha and push it to every currently-transparent
    /// window immediately (the overlay slider feeds this).
    pub fn set_default_alpha(&mut self, ws: &dyn WindowSystem, alpha: u8) {
        let alpha = alpha.max(MIN_ALPHA);
        self.default_alpha = alpha;
        for (&handle, state) in &mut self.transparency {
            if !ws.exists(handle) {
                continue;
            }
            match ws.set_opacity(handle, alpha) {
                Ok(()) => state.alpha = alpha,
                Err(e) => warn!(window = %handle, error = %e, "live alpha update failed"),
            }
        }
    }

    /// Change the shared click-through flag, propagated the same way
    pub fn set_default_clickthrough(&mut self, ws: &dyn WindowSystem, on: bool) {
        self.default_clickthrough = on;
        for (&handle, state) in &mut self.transparency {
            if !ws.exists(handle) {
                continue;
            }
            match ws.set_clickthrough(handle, on) {
                Ok(()) => state.clickthrough = on,
                Err(e) => warn!(window = %handle, error = %e, "live clickthrough update failed"),
            }
        }
    }

    pub fn notify(&self, text: String) {
        self.send(UiEvent::Notice(text));
    }

    pub fn send_ui(&self, event: UiEvent) {
        self.send(event);
    }

    fn send(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            debug!("ui channel closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::platform::fake::FakeWindows;
    use std::path::PathBuf;
    use std::sync::mpsc::{channel, Receiver};

    fn engine() -> (TransformEngine, Receiver<UiEvent>) {
        let (tx, rx) = channel();
        (TransformEngine::new(tx), rx)
    }

    fn empty_registry() -> GroupRegistry {
        GroupRegistry::new(Settings::default(), PathBuf::from("/proc/wingroup-test.json"))
    }

    fn drain(rx: &Receiver<UiEvent>) -> Vec<UiEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn topmost_toggles_on_and_off() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "editor");
        let (mut engine, rx) = engine();

        engine.toggle_topmost(&ws, a);
        assert!(engine.is_topmost(a));
        assert!(ws.window(a).topmost);

        engine.toggle_topmost(&ws, a);
        assert!(!engine.is_topmost(a));
        assert!(!ws.window(a).topmost);

        let notices = drain(&rx);
        assert_eq!(notices[0], UiEvent::Notice("editor: always on top".into()));
        assert_eq!(notices[1], UiEvent::Notice("editor: always on top off".into()));
    }

    #[test]
    fn topmost_on_stale_handle_is_silent_noop() {
        let ws = FakeWindows::new();
        let (mut engine, rx) = engine();
        engine.toggle_topmost(&ws, WindowHandle(404));
        assert!(!engine.is_topmost(WindowHandle(404)));
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn topmost_flag_flips_even_when_os_call_fails() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "stubborn");
        ws.break_window(a);
        let (mut engine, _rx) = engine();

        engine.toggle_topmost(&ws, a);
        assert!(engine.is_topmost(a));
        assert!(!ws.window(a).topmost);
    }

    #[test]
    fn isolate_then_restore_touches_exactly_the_minimized_set() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "target");
        let b = ws.add(2, "other");
        let c = ws.add(3, "another");
        let (mut engine, _rx) = engine();
        let registry = empty_registry();

        engine.toggle_isolate(&ws, &registry, a);
        assert_eq!(engine.isolated(), Some(a));
        assert_eq!(ws.minimized_handles(), vec![b, c]);
        assert_eq!(ws.foreground(), Some(a), "anchor brought to front");

        // A window minimized by hand in the meantime must stay minimized
        // after restore only if it was not in the isolation's record; here b
        // and c were both recorded, so both come back.
        engine.toggle_isolate(&ws, &registry, a);
        assert_eq!(engine.isolated(), None);
        assert!(ws.minimized_handles().is_empty());
    }

    #[test]
    fn isolate_spares_topmost_windows() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "target");
        let pinned = ws.add(2, "pinned");
        let b = ws.add(3, "other");
        let (mut engine, _rx) = engine();
        let registry = empty_registry();

        engine.toggle_topmost(&ws, pinned);
        engine.toggle_isolate(&ws, &registry, a);

        assert_eq!(ws.minimized_handles(), vec![b]);
        assert!(!ws.window(pinned).minimized);
    }

    #[test]
    fn isolate_resolves_whole_group_of_anchor() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "alpha");
        let b = ws.add(2, "beta");
        let c = ws.add(3, "gamma");
        let mut registry = empty_registry();
        registry.add(&ws, 3, a);
        registry.add(&ws, 3, b);
        let (mut engine, _rx) = engine();

        engine.toggle_isolate(&ws, &registry, a);
        assert_eq!(ws.minimized_handles(), vec![c]);
        assert!(!ws.window(b).minimized);

        engine.toggle_isolate(&ws, &registry, a);
        assert!(ws.minimized_handles().is_empty());
    }

    #[test]
    fn new_isolation_replaces_slot_without_restoring() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "first");
        let b = ws.add(2, "second");
        let c = ws.add(3, "bystander");
        let (mut engine, _rx) = engine();
        let registry = empty_registry();

        engine.toggle_isolate(&ws, &registry, a);
        assert_eq!(ws.minimized_handles(), vec![b, c]);

        // Anchor moved to b: a and c minimize, but nothing is restored first
        engine.toggle_isolate(&ws, &registry, b);
        assert_eq!(engine.isolated(), Some(b));
        assert_eq!(ws.minimized_handles(), vec![a, c]);

        // Restoring the second isolation brings back only its own set
        engine.toggle_isolate(&ws, &registry, b);
        assert!(ws.minimized_handles().is_empty());
    }

    #[test]
    fn one_broken_window_does_not_stop_the_batch() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "target");
        let bad = ws.add(2, "bad");
        let c = ws.add(3, "good");
        ws.break_window(bad);
        let (mut engine, _rx) = engine();
        let registry = empty_registry();

        engine.toggle_isolate(&ws, &registry, a);
        // bad is skipped and, crucially, not recorded for restore
        assert_eq!(ws.minimized_handles(), vec![c]);

        engine.toggle_isolate(&ws, &registry, a);
        assert!(ws.minimized_handles().is_empty());
    }

    #[test]
    fn transparent_round_trip_restores_topmost_and_clears_state() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "glass");
        let (mut engine, rx) = engine();

        engine.toggle_transparent(&ws, a);
        let w = ws.window(a);
        assert_eq!(w.alpha, DEFAULT_ALPHA);
        assert!(w.topmost);
        assert!(!w.clickthrough);
        assert_eq!(
            engine.transparency_state(a).map(|s| s.alpha),
            Some(DEFAULT_ALPHA)
        );
        assert!(drain(&rx).contains(&UiEvent::CreateOverlay(a)));

        engine.toggle_transparent(&ws, a);
        let w = ws.window(a);
        assert_eq!(w.alpha, OPAQUE);
        assert!(!w.topmost, "pre-transparency topmost (off) restored");
        assert!(engine.transparency_state(a).is_none());
        assert!(drain(&rx).contains(&UiEvent::DestroyOverlay(a)));
    }

    #[test]
    fn transparent_cancel_restores_earlier_topmost_on() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "glass");
        let (mut engine, _rx) = engine();

        engine.toggle_topmost(&ws, a);
        engine.toggle_transparent(&ws, a);
        engine.toggle_transparent(&ws, a);

        assert!(ws.window(a).topmost, "window was topmost before transparency");
        assert!(engine.is_topmost(a));
    }

    #[test]
    fn transparent_cancel_on_destroyed_window_still_clears_state() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "gone");
        let (mut engine, rx) = engine();

        engine.toggle_transparent(&ws, a);
        ws.destroy(a);
        engine.toggle_transparent(&ws, a);

        assert!(engine.transparency_state(a).is_none());
        let events = drain(&rx);
        assert!(events.contains(&UiEvent::DestroyOverlay(a)));
        // No notice for a window that no longer has a title to show
        assert!(!events.contains(&UiEvent::Notice(": transparency off".into())));
    }

    #[test]
    fn default_alpha_propagates_to_all_transparent_windows() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "one");
        let b = ws.add(2, "two");
        let c = ws.add(3, "opaque");
        let (mut engine, _rx) = engine();

        engine.toggle_transparent(&ws, a);
        engine.toggle_transparent(&ws, b);
        engine.set_default_alpha(&ws, 120);

        assert_eq!(ws.window(a).alpha, 120);
        assert_eq!(ws.window(b).alpha, 120);
        assert_eq!(ws.window(c).alpha, 255);
        assert_eq!(engine.transparency_state(b).map(|s| s.alpha), Some(120));
    }

    #[test]
    fn default_alpha_clamps_to_floor() {
        let ws = FakeWindows::new();
        let (mut engine, _rx) = engine();
        engine.set_default_alpha(&ws, 5);
        assert_eq!(engine.default_alpha(), MIN_ALPHA);
    }

    #[test]
    fn clickthrough_propagates_live() {
        let ws = FakeWindows::new();
        let a = ws.add(1, "one");
        let (mut engine, _rx) = engine();

        engine.toggle_transparent(&ws, a);
        assert!(!ws.window(a).clickthrough);

        engine.set_default_clickthrough(&ws, true);
        assert!(ws.window(a).clickthrough);
        assert_eq!(
            engine.transparency_state(a).map(|s| s.clickthrough),
            Some(true)
        );

        // A window made transparent afterwards picks the new default up
        let b = ws.add(2, "two");
        engine.toggle_transparent(&ws, b);
        assert!(ws.window(b).clickthrough);
    }
}
