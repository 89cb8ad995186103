//! The host's menu registry and the takeover of the level-up slot.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::{error, info};
use serde::Serialize;

use crate::context::ShimContext;
use crate::error::{InitError, RegistryError};
use crate::menu::{HostMenu, MenuInstance};
use crate::view::ViewLoader;

pub type MenuFactory = Rc<dyn Fn() -> Box<dyn HostMenu>>;

/// Menu registration facility owned by the host UI manager.
pub trait MenuRegistry {
    fn is_registered(&self, name: &str) -> bool;
    /// Remove the factory for `name`; `force` drops it even while instances
    /// are open. Returns whether anything was removed.
    fn unregister(&mut self, name: &str, force: bool) -> bool;
    fn register(&mut self, name: &str, factory: MenuFactory) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryOperation {
    IsRegistered { name: String, registered: bool },
    Unregister { name: String, force: bool, removed: bool },
    Register { name: String },
    Open { name: String },
}

/// Name-to-factory table that records every operation in order.
#[derive(Default)]
pub struct InMemoryMenuRegistry {
    factories: BTreeMap<String, MenuFactory>,
    operations: RefCell<Vec<RegistryOperation>>,
}

impl InMemoryMenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<RegistryOperation> {
        self.operations.borrow().clone()
    }

    fn record(&self, operation: RegistryOperation) {
        self.operations.borrow_mut().push(operation);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Create a menu through its registered factory, as the host does when a
    /// menu opens.
    pub fn open(&mut self, name: &str) -> Option<Box<dyn HostMenu>> {
        let factory = self.factories.get(name)?.clone();
        self.record(RegistryOperation::Open {
            name: name.to_string(),
        });
        Some(factory())
    }
}

impl MenuRegistry for InMemoryMenuRegistry {
    fn is_registered(&self, name: &str) -> bool {
        let registered = self.factories.contains_key(name);
        self.record(RegistryOperation::IsRegistered {
            name: name.to_string(),
            registered,
        });
        registered
    }

    fn unregister(&mut self, name: &str, force: bool) -> bool {
        let removed = self.factories.remove(name).is_some();
        self.record(RegistryOperation::Unregister {
            name: name.to_string(),
            force,
            removed,
        });
        removed
    }

    fn register(&mut self, name: &str, factory: MenuFactory) -> Result<(), RegistryError> {
        if self.factories.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        self.record(RegistryOperation::Register {
            name: name.to_string(),
        });
        Ok(())
    }
}

impl fmt::Debug for InMemoryMenuRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryMenuRegistry")
            .field("menus", &self.factories.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.borrow().len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeoverOutcome {
    pub replaced_stock: bool,
}

/// Factory that builds a [`MenuInstance`] each time the host opens the menu.
pub fn menu_factory(context: Rc<ShimContext>, loader: ViewLoader) -> MenuFactory {
    Rc::new(move || Box::new(MenuInstance::construct(context.clone(), &loader)) as Box<dyn HostMenu>)
}

/// Swap the stock menu for ours: unregister whatever owns the slot, then
/// register our factory.
pub fn take_over_menu(
    registry: Option<&mut dyn MenuRegistry>,
    context: &Rc<ShimContext>,
    loader: &ViewLoader,
) -> Result<TakeoverOutcome, InitError> {
    let menu = context.config().menu_name.clone();
    let Some(registry) = registry else {
        error!("UI system not available; failed to register {menu}");
        return Err(InitError::RegistryUnavailable { menu });
    };

    let replaced_stock = if registry.is_registered(&menu) {
        info!("unregistering stock {menu}");
        registry.unregister(&menu, true)
    } else {
        false
    };

    info!("registering replacement {menu}");
    registry.register(&menu, menu_factory(context.clone(), loader.clone()))?;
    context.log_event(format!("takeover {menu} (replaced stock: {replaced_stock})"));
    info!("menu registration complete");
    Ok(TakeoverOutcome { replaced_stock })
}
