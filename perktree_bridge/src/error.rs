use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::value::{ValueError, ValueType};

/// Conditions that stop the plugin from activating at all.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("editor hosts are not supported")]
    EditorUnsupported,
    #[error("unsupported runtime version {found:08X} (minimum {minimum:08X})")]
    RuntimeUnsupported { found: u32, minimum: u32 },
    #[error("host messaging interface unavailable")]
    MessagingUnavailable,
    #[error("UI menu registry unavailable; cannot register `{menu}`")]
    RegistryUnavailable { menu: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("menu `{0}` already has a registered factory")]
    AlreadyRegistered(String),
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view asset `{0}` not found")]
    AssetNotFound(String),
    #[error("reading view asset {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("creating script runtime")]
    Runtime(#[source] mlua::Error),
    #[error("executing view asset `{asset}`: {source}")]
    Script {
        asset: String,
        #[source]
        source: mlua::Error,
    },
}

/// A menu construction step that could not proceed. The menu stays open in a
/// degraded state; nothing is raised to the host.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("loading view `{asset}`")]
    ViewLoad {
        asset: String,
        #[source]
        source: ViewError,
    },
    #[error("root variable `{binding}` is missing or not an object")]
    MissingRootVariable { binding: String },
    #[error("creating bridge object: {0}")]
    CreateObject(#[source] mlua::Error),
    #[error("registering native function `{name}`: {source}")]
    RegisterHandler {
        name: &'static str,
        #[source]
        source: mlua::Error,
    },
    #[error("attaching bridge object to `{binding}`: {source}")]
    Attach {
        binding: String,
        #[source]
        source: mlua::Error,
    },
}

/// Failure of a single native call. Logged by the dispatcher; the call
/// becomes a no-op.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("expected at least {expected} argument(s), received {received}")]
    Arity { expected: usize, received: usize },
    #[error("argument {index} should be {expected}, found {found}")]
    ArgumentType {
        index: usize,
        expected: ValueType,
        found: ValueType,
    },
    #[error("argument {index} cannot be marshaled: {source}")]
    Unmarshalable {
        index: usize,
        #[source]
        source: ValueError,
    },
    #[error("{0} is not available")]
    CollaboratorUnavailable(&'static str),
    #[error(transparent)]
    Script(#[from] mlua::Error),
}

impl CallError {
    /// True for the errors caused by what the script passed in.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            CallError::Arity { .. } | CallError::ArgumentType { .. } | CallError::Unmarshalable { .. }
        )
    }
}
