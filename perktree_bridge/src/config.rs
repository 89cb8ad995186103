use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the stock menu slot that gets replaced.
pub const LEVEL_UP_MENU: &str = "LevelUpMenu";

/// Member under which the bridge object is attached to the view root.
pub const CODE_OBJECT_MEMBER: &str = "BGSCodeObj";

/// Root method invoked once every native function is in place.
pub const READY_CALLBACK: &str = "onCodeObjCreate";

/// Plugin identity reported during the host handshake.
pub const PLUGIN_NAME: &str = "VaultGirlPerkTreeVR";
pub const PLUGIN_VERSION: u32 = 1;

/// Pack a host runtime version the way the host does.
pub const fn make_runtime_version(major: u32, minor: u32, build: u32) -> u32 {
    (major << 24) | (minor << 16) | ((build & 0x0FFF) << 4)
}

pub const MIN_RUNTIME_VERSION: u32 = make_runtime_version(1, 2, 72);

/// Opaque presentation bitfield interpreted by the host's render/input layers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuFlags(u32);

impl MenuFlags {
    /// Flags the stock level-up menu registers with.
    pub const LEVEL_UP: MenuFlags = MenuFlags(0x040C_8049);

    pub const fn from_bits(bits: u32) -> Self {
        MenuFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for MenuFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MenuFlags({:08X})", self.0)
    }
}

impl fmt::Display for MenuFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub menu_name: String,
    pub menu_flags: MenuFlags,
    pub menu_depth: i32,
    /// Asset to load for the view; the menu name when unset.
    pub view_asset: Option<String>,
    pub root_binding: String,
    pub view_load_flags: u32,
    pub min_runtime_version: u32,
    pub documents_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_level: String,
    /// Newest event journal entries kept in memory.
    pub journal_limit: usize,
}

impl Default for ShimConfig {
    fn default() -> Self {
        ShimConfig {
            menu_name: LEVEL_UP_MENU.to_string(),
            menu_flags: MenuFlags::LEVEL_UP,
            menu_depth: 1,
            view_asset: None,
            root_binding: "root1".to_string(),
            view_load_flags: 0,
            min_runtime_version: MIN_RUNTIME_VERSION,
            documents_dir: None,
            log_file: PathBuf::from("My Games")
                .join("Fallout4VR")
                .join("F4SE")
                .join(format!("{PLUGIN_NAME}.log")),
            log_level: "info".to_string(),
            journal_limit: 256,
        }
    }
}

impl ShimConfig {
    /// Load a JSON config. No path, or a path that does not exist, yields the
    /// defaults.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(ShimConfig::default());
        };
        if !path.exists() {
            return Ok(ShimConfig::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn view_asset(&self) -> &str {
        self.view_asset.as_deref().unwrap_or(&self.menu_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_level_up_menu() {
        let config = ShimConfig::default();
        assert_eq!(config.menu_name, "LevelUpMenu");
        assert_eq!(config.menu_flags.bits(), 0x040C8049);
        assert_eq!(config.menu_depth, 1);
        assert_eq!(config.view_asset(), "LevelUpMenu");
        assert_eq!(config.root_binding, "root1");
    }

    #[test]
    fn minimum_runtime_packs_major_minor_build() {
        assert_eq!(MIN_RUNTIME_VERSION, 0x0102_0480);
        assert!(make_runtime_version(1, 2, 71) < MIN_RUNTIME_VERSION);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("perktree.json");
        fs::write(
            &path,
            r#"{ "view_asset": "PerkGridVR", "menu_flags": 16, "log_level": "debug" }"#,
        )?;

        let config = ShimConfig::from_json_file(Some(&path))?;
        assert_eq!(config.view_asset(), "PerkGridVR");
        assert_eq!(config.menu_flags, MenuFlags::from_bits(16));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.menu_name, "LevelUpMenu");

        let missing = ShimConfig::from_json_file(Some(&dir.path().join("absent.json")))?;
        assert_eq!(missing, ShimConfig::default());
        Ok(())
    }
}
