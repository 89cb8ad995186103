use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use log::{error, info, warn};
use serde::Serialize;

use crate::bridge::attach_code_object;
use crate::config::MenuFlags;
use crate::context::ShimContext;
use crate::error::ConstructionError;
use crate::handlers::BridgeState;
use crate::view::{View, ViewLoader};

/// What the host's UI manager needs from an open menu.
pub trait HostMenu {
    fn menu_name(&self) -> &str;
    fn flags(&self) -> MenuFlags;
    fn depth(&self) -> i32;
    fn state(&self) -> MenuState;
    /// Host hook for late function registration.
    fn register_functions(&mut self);
    /// Release everything the menu owns. Called when the host closes it.
    fn teardown(&mut self);
    fn view(&self) -> Option<&View> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuState {
    Constructing,
    Ready,
    Failed,
    Destroyed,
}

impl MenuState {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuState::Constructing => "constructing",
            MenuState::Ready => "ready",
            MenuState::Failed => "failed",
            MenuState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for MenuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The replacement level-up menu. Owns its view and the bridge living in it.
pub struct MenuInstance {
    name: String,
    flags: MenuFlags,
    depth: i32,
    state: MenuState,
    failure: Option<ConstructionError>,
    view: Option<View>,
    bridge: Option<Rc<RefCell<BridgeState>>>,
    context: Rc<ShimContext>,
}

impl MenuInstance {
    /// Build the menu. Construction never fails outright: a step that cannot
    /// proceed is logged and leaves the menu in [`MenuState::Failed`].
    pub fn construct(context: Rc<ShimContext>, loader: &ViewLoader) -> Self {
        let config = context.config();
        let mut menu = MenuInstance {
            name: config.menu_name.clone(),
            flags: config.menu_flags,
            depth: config.menu_depth,
            state: MenuState::Constructing,
            failure: None,
            view: None,
            bridge: None,
            context: context.clone(),
        };
        info!(
            "constructing {} (flags {}, depth {})",
            menu.name, menu.flags, menu.depth
        );
        context.log_event(format!("menu.construct {}", menu.name));

        match menu.initialize(loader) {
            Ok(()) => {
                menu.state = MenuState::Ready;
                info!("{} initialization complete", menu.name);
            }
            Err(err) => {
                error!("{} construction failed: {err}", menu.name);
                context.log_event(format!("menu.failed {}: {err}", menu.name));
                menu.state = MenuState::Failed;
                menu.failure = Some(err);
            }
        }
        menu
    }

    fn initialize(&mut self, loader: &ViewLoader) -> Result<(), ConstructionError> {
        let config = self.context.config();
        let asset = config.view_asset().to_string();
        let view = loader
            .load_view(&asset, &config.root_binding, config.view_load_flags)
            .map_err(|source| ConstructionError::ViewLoad {
                asset: asset.clone(),
                source,
            })?;

        // The view stays with the menu even when the bridge cannot be attached.
        let bridge = match view.root() {
            Some(root) => attach_code_object(&view, &root, &self.name, self.context.clone()),
            None => Err(ConstructionError::MissingRootVariable {
                binding: view.root_binding().to_string(),
            }),
        };
        self.view = Some(view);
        self.bridge = Some(bridge?);
        Ok(())
    }

    pub fn failure(&self) -> Option<&ConstructionError> {
        self.failure.as_ref()
    }

    pub fn bridge_state(&self) -> Option<Ref<'_, BridgeState>> {
        self.bridge.as_ref().map(|state| state.borrow())
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }
}

impl HostMenu for MenuInstance {
    fn menu_name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> MenuFlags {
        self.flags
    }

    fn depth(&self) -> i32 {
        self.depth
    }

    fn state(&self) -> MenuState {
        self.state
    }

    fn register_functions(&mut self) {
        info!("{} register_functions called", self.name);
    }

    fn teardown(&mut self) {
        if self.state == MenuState::Destroyed {
            return;
        }
        // Script objects hold the bridge state; drop them before the state.
        self.view = None;
        self.bridge = None;
        self.state = MenuState::Destroyed;
        info!("{} destroyed", self.name);
        self.context.log_event(format!("menu.destroy {}", self.name));
    }

    fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }
}

impl Drop for MenuInstance {
    fn drop(&mut self) {
        if self.state != MenuState::Destroyed {
            warn!("{} dropped without teardown", self.name);
            self.teardown();
        }
    }
}

impl fmt::Debug for MenuInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuInstance")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("depth", &self.depth)
            .field("state", &self.state)
            .field("view", &self.view)
            .field("bridge", &self.bridge.is_some())
            .finish()
    }
}
