//! Host handshake: version query, listener registration and the one-time
//! menu takeover once the game has loaded.

use std::rc::Rc;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::{ShimConfig, PLUGIN_NAME, PLUGIN_VERSION};
use crate::context::ShimContext;
use crate::error::InitError;
use crate::registry::{take_over_menu, MenuRegistry, TakeoverOutcome};
use crate::view::ViewLoader;

/// Sender whose broadcasts the plugin listens to.
pub const MESSAGE_SENDER: &str = "F4SE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    pub is_editor: bool,
    pub runtime_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: u32,
}

/// Decide whether the plugin can run inside `host`.
pub fn query(host: &HostInfo, config: &ShimConfig) -> Result<PluginInfo, InitError> {
    if host.is_editor {
        error!("editor is not supported");
        return Err(InitError::EditorUnsupported);
    }
    if host.runtime_version < config.min_runtime_version {
        error!("unsupported runtime version {:08X}", host.runtime_version);
        return Err(InitError::RuntimeUnsupported {
            found: host.runtime_version,
            minimum: config.min_runtime_version,
        });
    }
    Ok(PluginInfo {
        name: PLUGIN_NAME.to_string(),
        version: PLUGIN_VERSION,
    })
}

/// Host messaging interface.
pub trait HostMessaging {
    /// Subscribe the plugin to messages broadcast by `sender`.
    fn register_listener(&mut self, sender: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMessage {
    PostLoad,
    PostPostLoad,
    PreLoadGame,
    PostLoadGame,
    InputLoaded,
    GameDataReady,
    GameLoaded,
    NewGame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Ignored,
    TookOver(TakeoverOutcome),
    AlreadyTakenOver,
}

pub struct Plugin {
    context: Rc<ShimContext>,
    loader: ViewLoader,
    loaded: bool,
    takeover_attempted: bool,
}

impl Plugin {
    pub fn new(context: Rc<ShimContext>, loader: ViewLoader) -> Self {
        Plugin {
            context,
            loader,
            loaded: false,
            takeover_attempted: false,
        }
    }

    pub fn context(&self) -> &Rc<ShimContext> {
        &self.context
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn takeover_attempted(&self) -> bool {
        self.takeover_attempted
    }

    pub fn load(&mut self, messaging: Option<&mut dyn HostMessaging>) -> Result<(), InitError> {
        info!("{PLUGIN_NAME} loading");
        let Some(messaging) = messaging else {
            error!("messaging interface unavailable");
            return Err(InitError::MessagingUnavailable);
        };
        if !messaging.register_listener(MESSAGE_SENDER) {
            warn!("host refused listener registration for {MESSAGE_SENDER}");
        }
        self.loaded = true;
        self.context.log_event(format!("plugin.load listener={MESSAGE_SENDER}"));
        Ok(())
    }

    /// React to a host broadcast. Only the first `GameLoaded` does anything;
    /// a failed takeover is not retried.
    pub fn handle_message(
        &mut self,
        message: HostMessage,
        registry: Option<&mut dyn MenuRegistry>,
    ) -> Result<MessageOutcome, InitError> {
        if message != HostMessage::GameLoaded {
            debug!("ignoring {message:?}");
            return Ok(MessageOutcome::Ignored);
        }
        if self.takeover_attempted {
            info!("game loaded again; menu takeover already done");
            return Ok(MessageOutcome::AlreadyTakenOver);
        }

        info!("game loaded, initializing {PLUGIN_NAME}");
        self.takeover_attempted = true;
        take_over_menu(registry, &self.context, &self.loader).map(MessageOutcome::TookOver)
    }
}
