//! Replacement level-up menu: takes over the host's `LevelUpMenu` slot,
//! loads a scripted view and attaches a `BGSCodeObj` whose functions call
//! back into native code.

pub mod bridge;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod menu;
pub mod plugin;
pub mod recording;
pub mod registry;
pub mod value;
pub mod view;

pub use bridge::attach_code_object;
pub use collaborators::{Collaborators, PlaceholderDomain, UiMessageKind, XpInfo};
pub use config::{MenuFlags, ShimConfig};
pub use context::ShimContext;
pub use dispatch::DispatchTable;
pub use error::{CallError, ConstructionError, InitError, RegistryError, ViewError};
pub use handlers::{BridgeState, NativeHandler};
pub use menu::{HostMenu, MenuInstance, MenuState};
pub use plugin::{HostInfo, HostMessage, HostMessaging, MessageOutcome, Plugin, PluginInfo};
pub use recording::{DomainEvent, RecordingDomain, UiMessage, UiMessageQueue};
pub use registry::{InMemoryMenuRegistry, MenuFactory, MenuRegistry, RegistryOperation};
pub use value::{MarshaledValue, ObjectRef};
pub use view::{DirectoryAssets, InMemoryAssets, View, ViewAssets, ViewLoader};
