//! Scripted views: one Lua state per loaded view asset.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info};
use mlua::{Lua, LuaOptions, StdLib, Table, Value};

use crate::error::ViewError;

/// Where view scripts come from.
pub trait ViewAssets {
    /// Source text of `asset`, or `None` when no such asset exists.
    fn read_view(&self, asset: &str) -> Result<Option<String>, ViewError>;
}

/// Views stored as `<root>/<asset>.lua`.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryAssets { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_path(&self, asset: &str) -> PathBuf {
        self.root.join(format!("{asset}.lua"))
    }
}

impl ViewAssets for DirectoryAssets {
    fn read_view(&self, asset: &str) -> Result<Option<String>, ViewError> {
        let path = self.asset_path(asset);
        match fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ViewError::Io { path, source }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    views: BTreeMap<String, String>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, asset: &str, source: &str) -> Self {
        self.insert(asset, source);
        self
    }

    pub fn insert(&mut self, asset: &str, source: &str) {
        self.views.insert(asset.to_string(), source.to_string());
    }
}

impl ViewAssets for InMemoryAssets {
    fn read_view(&self, asset: &str) -> Result<Option<String>, ViewError> {
        Ok(self.views.get(asset).cloned())
    }
}

/// Loads view assets into fresh script states.
#[derive(Clone)]
pub struct ViewLoader {
    assets: Rc<dyn ViewAssets>,
}

impl ViewLoader {
    pub fn new(assets: Rc<dyn ViewAssets>) -> Self {
        ViewLoader { assets }
    }

    /// Execute `asset` in a new sandboxed state. A table returned by the chunk
    /// is bound as the global `root_binding`; otherwise the chunk is expected
    /// to define that global itself.
    pub fn load_view(&self, asset: &str, root_binding: &str, flags: u32) -> Result<View, ViewError> {
        let source = self
            .assets
            .read_view(asset)?
            .ok_or_else(|| ViewError::AssetNotFound(asset.to_string()))?;
        let lua =
            Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default()).map_err(ViewError::Runtime)?;

        // Script values borrow the state; release them before it moves into the view.
        {
            let returned: Value = lua
                .load(source.as_str())
                .set_name(format!("{asset}.lua"))
                .eval()
                .map_err(|source| ViewError::Script {
                    asset: asset.to_string(),
                    source,
                })?;
            if let Value::Table(root) = returned {
                lua.globals()
                    .set(root_binding, root)
                    .map_err(ViewError::Runtime)?;
                debug!("{asset}: bound returned root as {root_binding}");
            }
        }
        info!("loaded view {asset} (flags {flags:08X})");

        Ok(View {
            lua,
            asset: asset.to_string(),
            root_binding: root_binding.to_string(),
            flags,
        })
    }
}

impl fmt::Debug for ViewLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewLoader")
    }
}

/// A loaded view. Owns its script state: dropping the view destroys every
/// object created inside it.
pub struct View {
    lua: Lua,
    asset: String,
    root_binding: String,
    flags: u32,
}

impl View {
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn root_binding(&self) -> &str {
        &self.root_binding
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// The object bound under the root name, if the view defined one.
    pub fn root(&self) -> Option<Table<'_>> {
        match self.lua.globals().get::<_, Value>(self.root_binding.as_str()) {
            Ok(Value::Table(table)) => Some(table),
            _ => None,
        }
    }

    /// Resolve a dotted path such as `root1.BGSCodeObj.PlaySound`. Missing
    /// segments resolve to nil.
    pub fn get_variable(&self, path: &str) -> mlua::Result<Value<'_>> {
        let mut current = Value::Table(self.lua.globals());
        for segment in path.split('.') {
            current = match current {
                Value::Table(table) => table.get(segment)?,
                _ => return Ok(Value::Nil),
            };
        }
        Ok(current)
    }

    /// Run host-provided script inside the view.
    pub fn exec(&self, chunk: &str, label: &str) -> mlua::Result<()> {
        self.lua.load(chunk).set_name(label).exec()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("asset", &self.asset)
            .field("root_binding", &self.root_binding)
            .field("flags", &self.flags)
            .finish()
    }
}
