//! On-disk settings: group membership, group names, hotkey bindings.
//!
//! The file is a single JSON object with three sections (`groups`,
//! `group_names`, `hotkeys`), ids string-encoded 0-9. Each section is parsed
//! independently so a corrupt `hotkeys` entry does not throw away valid
//! `groups` data; whatever fails to parse falls back to defaults with a
//! logged warning.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{config as cfg, groups::GROUP_COUNT, hotkeys};
use crate::types::{GroupId, WindowHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBindings {
    #[serde(default = "default_topmost_key")]
    pub topmost: String,
    #[serde(default = "default_show_only_key")]
    pub show_only: String,
    #[serde(default = "default_transparent_key")]
    pub transparent: String,
    #[serde(default = "default_group_manager_key")]
    pub open_group_manager: String,
}

fn default_topmost_key() -> String {
    hotkeys::DEFAULT_TOPMOST_KEY.to_string()
}

fn default_show_only_key() -> String {
    hotkeys::DEFAULT_SHOW_ONLY_KEY.to_string()
}

fn default_transparent_key() -> String {
    hotkeys::DEFAULT_TRANSPARENT_KEY.to_string()
}

fn default_group_manager_key() -> String {
    hotkeys::DEFAULT_GROUP_MANAGER_KEY.to_string()
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            topmost: default_topmost_key(),
            show_only: default_show_only_key(),
            transparent: default_transparent_key(),
            open_group_manager: default_group_manager_key(),
        }
    }
}

impl HotkeyBindings {
    /// Every action needs exactly one alphanumeric key, and no key may be
    /// shared between actions (duplicate chords would dispatch ambiguously).
    pub fn validate(&self) -> Result<()> {
        let keys = [
            ("topmost", &self.topmost),
            ("show_only", &self.show_only),
            ("transparent", &self.transparent),
            ("open_group_manager", &self.open_group_manager),
        ];
        for (action, key) in &keys {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => {}
                _ => bail!("binding for {action} must be a single letter or digit, got {key:?}"),
            }
        }
        for i in 0..keys.len() {
            for j in i + 1..keys.len() {
                if keys[i].1.eq_ignore_ascii_case(keys[j].1) {
                    bail!(
                        "actions {} and {} share the key {:?}",
                        keys[i].0,
                        keys[j].0,
                        keys[i].1
                    );
                }
            }
        }
        Ok(())
    }
}

/// Full persisted state. In-memory state is authoritative for the session;
/// the file is a best-effort mirror.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub groups: BTreeMap<GroupId, Vec<WindowHandle>>,
    #[serde(default)]
    pub group_names: BTreeMap<GroupId, String>,
    #[serde(default)]
    pub hotkeys: HotkeyBindings,
}

impl Settings {
    /// Display name for a group: the stored rename, or "Group N"
    pub fn group_name(&self, group: GroupId) -> String {
        self.group_names
            .get(&group)
            .cloned()
            .unwrap_or_else(|| format!("Group {group}"))
    }

    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, starting with defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read config file, using defaults");
                return Self::default();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config file is not valid JSON, using defaults");
                return Self::default();
            }
        };

        Self::from_sections(&value)
    }

    /// Parse each top-level section independently, falling back per section
    fn from_sections(value: &serde_json::Value) -> Self {
        let mut settings = Self::default();

        if let Some(section) = value.get("groups") {
            match serde_json::from_value::<BTreeMap<GroupId, Vec<WindowHandle>>>(section.clone()) {
                Ok(groups) => {
                    for (id, members) in groups {
                        if id >= GROUP_COUNT {
                            warn!(group = id, "skipping group with out-of-range id");
                            continue;
                        }
                        settings.groups.insert(id, dedup_preserving_order(members));
                    }
                }
                Err(e) => warn!(error = %e, "malformed 'groups' section, using empty groups"),
            }
        }

        if let Some(section) = value.get("group_names") {
            match serde_json::from_value::<BTreeMap<GroupId, String>>(section.clone()) {
                Ok(names) => {
                    settings
                        .group_names
                        .extend(names.into_iter().filter(|(id, _)| *id < GROUP_COUNT));
                }
                Err(e) => warn!(error = %e, "malformed 'group_names' section, using default names"),
            }
        }

        if let Some(section) = value.get("hotkeys") {
            match serde_json::from_value::<HotkeyBindings>(section.clone()) {
                Ok(bindings) => match bindings.validate() {
                    Ok(()) => settings.hotkeys = bindings,
                    Err(e) => warn!(error = %e, "invalid hotkey bindings, using defaults"),
                },
                Err(e) => warn!(error = %e, "malformed 'hotkeys' section, using default bindings"),
            }
        }

        settings
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

fn dedup_preserving_order(members: Vec<WindowHandle>) -> Vec<WindowHandle> {
    let mut seen = Vec::with_capacity(members.len());
    for handle in members {
        if !seen.contains(&handle) {
            seen.push(handle);
        }
    }
    seen
}

/// Config file location: CLI override, else the user config dir
pub fn config_path(cli_override: Option<PathBuf>) -> PathBuf {
    cli_override.unwrap_or_else(|| {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(cfg::APP_DIR);
        path.push(cfg::FILENAME);
        path
    })
}
