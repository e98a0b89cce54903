//! Group registry: ten fixed groups of window handles with display names.
//!
//! Every mutation persists synchronously. Persistence failure is logged and
//! otherwise ignored; the in-memory state stays authoritative for the
//! session.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{HotkeyBindings, Settings};
use crate::constants::groups::GROUP_COUNT;
use crate::platform::WindowSystem;
use crate::types::{GroupId, WindowHandle};

pub struct GroupRegistry {
    settings: Settings,
    path: PathBuf,
}

impl GroupRegistry {
    pub fn new(settings: Settings, path: PathBuf) -> Self {
        Self { settings, path }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn group_name(&self, group: GroupId) -> String {
        self.settings.group_name(group)
    }

    /// Lowest-numbered group containing the handle, if any
    pub fn group_of(&self, handle: WindowHandle) -> Option<GroupId> {
        self.settings
            .groups
            .iter()
            .find(|(_, members)| members.contains(&handle))
            .map(|(id, _)| *id)
    }

    /// Members of the group that still exist, in stored order
    pub fn live_members(&self, ws: &dyn WindowSystem, group: GroupId) -> Vec<WindowHandle> {
        self.settings
            .groups
            .get(&group)
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .filter(|&h| ws.exists(h))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a window to a group. No-op for stale handles, duplicates and
    /// out-of-range group ids.
    pub fn add(&mut self, ws: &dyn WindowSystem, group: GroupId, handle: WindowHandle) {
        if group >= GROUP_COUNT {
            warn!(group, "ignoring add to out-of-range group");
            return;
        }
        if !ws.exists(handle) {
            return;
        }
        let members = self.settings.groups.entry(group).or_default();
        if members.contains(&handle) {
            return;
        }
        members.push(handle);
        info!(group, window = %handle, "added window to group");
        self.persist();
    }

    pub fn remove(&mut self, group: GroupId, handle: WindowHandle) {
        let Some(members) = self.settings.groups.get_mut(&group) else {
            return;
        };
        let before = members.len();
        members.retain(|&h| h != handle);
        if members.len() != before {
            info!(group, window = %handle, "removed window from group");
            self.persist();
        }
    }

    /// Replace a group's full member list (bulk edit from the manager UI).
    /// Stale handles are filtered out before storing.
    pub fn replace(
        &mut self,
        ws: &dyn WindowSystem,
        group: GroupId,
        handles: Vec<WindowHandle>,
    ) {
        if group >= GROUP_COUNT {
            warn!(group, "ignoring replace of out-of-range group");
            return;
        }
        let mut members = Vec::with_capacity(handles.len());
        for handle in handles {
            if ws.exists(handle) && !members.contains(&handle) {
                members.push(handle);
            }
        }
        self.settings.groups.insert(group, members);
        self.persist();
    }

    pub fn rename(&mut self, group: GroupId, name: String) {
        if group >= GROUP_COUNT {
            warn!(group, "ignoring rename of out-of-range group");
            return;
        }
        self.settings.group_names.insert(group, name);
        self.persist();
    }

    /// Swap in new hotkey bindings and persist them. The caller is expected
    /// to tear down and respawn the hotkey listener afterwards.
    pub fn rebind(&mut self, bindings: HotkeyBindings) -> anyhow::Result<()> {
        bindings.validate()?;
        self.settings.hotkeys = bindings;
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.settings.save(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to persist config, keeping in-memory state");
        }
    }
}
