use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info, warn};
use mlua::{Function, Table, Value};

use crate::config::{CODE_OBJECT_MEMBER, READY_CALLBACK};
use crate::context::ShimContext;
use crate::dispatch::DispatchTable;
use crate::error::ConstructionError;
use crate::handlers::{BridgeState, HandlerScope};
use crate::view::View;

/// Build the code object on `root`, populate it with the standard native
/// functions and tell the view it is ready.
///
/// `onCodeObjCreate` only runs after every function is attached. An error
/// raised by that callback is logged; the bridge itself stays usable.
pub fn attach_code_object<'lua>(
    view: &'lua View,
    root: &Table<'lua>,
    menu_name: &str,
    context: Rc<ShimContext>,
) -> Result<Rc<RefCell<BridgeState>>, ConstructionError> {
    let lua = view.lua();
    let state = Rc::new(RefCell::new(BridgeState::default()));
    let scope = HandlerScope::new(menu_name, context.clone(), state.clone());

    let code_obj = lua.create_table().map_err(ConstructionError::CreateObject)?;
    info!("created {CODE_OBJECT_MEMBER}");

    let table = DispatchTable::standard();
    table.install(lua, &code_obj, &scope)?;
    info!("registered {} native functions", table.len());

    root.set(CODE_OBJECT_MEMBER, code_obj)
        .map_err(|source| ConstructionError::Attach {
            binding: view.root_binding().to_string(),
            source,
        })?;
    info!("attached {CODE_OBJECT_MEMBER} to {}", view.root_binding());
    context.log_event(format!("bridge.attach {menu_name}"));

    match root.get::<_, Value>(READY_CALLBACK) {
        Ok(Value::Function(callback)) => signal_ready(callback, root, &state, menu_name, &context),
        Ok(_) => warn!("{} has no {READY_CALLBACK}; view not notified", view.root_binding()),
        Err(err) => error!("reading {READY_CALLBACK}: {err}"),
    }

    Ok(state)
}

fn signal_ready<'lua>(
    callback: Function<'lua>,
    root: &Table<'lua>,
    state: &Rc<RefCell<BridgeState>>,
    menu_name: &str,
    context: &ShimContext,
) {
    match callback.call::<_, ()>(root.clone()) {
        Ok(()) => {
            state.borrow_mut().mark_ready_signaled();
            context.log_event(format!("bridge.ready {menu_name}"));
            info!("called {READY_CALLBACK}");
        }
        Err(err) => {
            error!("{READY_CALLBACK} raised: {err}");
            context.log_event(format!("bridge.ready_failed {menu_name}"));
        }
    }
}
