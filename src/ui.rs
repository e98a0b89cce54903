//! Events consumed by the presentation layer (tray, dialogs, overlays).
//!
//! The core never draws anything itself; it pushes these over a channel and
//! whatever front end is attached decides how to show them.

use crate::types::{GroupId, WindowHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Transient status text ("Firefox: always on top", "Group 3 is empty", ...)
    Notice(String),

    /// A window just became transparent; attach a slider/checkbox overlay to it
    CreateOverlay(WindowHandle),

    /// Transparency was cancelled; tear the overlay down
    DestroyOverlay(WindowHandle),

    /// User hit the group-manager chord; the captured foreground window (if
    /// any) should be pre-selected in the manager dialog
    OpenGroupManager(Option<WindowHandle>),

    /// A group digit was pressed; show the "press an action key" prompt
    PromptGroup(GroupId),
}
