use std::ffi::c_void;

use log::{debug, error};
use mlua::{IntoLua, Lua, Table, Value, Variadic};
use thiserror::Error;

use crate::error::ConstructionError;
use crate::handlers::{HandlerScope, NativeCall, NativeHandler};
use crate::value::marshal_slots;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("native function `{0}` is already registered")]
    Duplicate(&'static str),
}

/// Named native entry points, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    entries: Vec<NativeHandler>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ten functions the level-up view expects.
    pub fn standard() -> Self {
        DispatchTable {
            entries: NativeHandler::ALL.to_vec(),
        }
    }

    pub fn register(&mut self, handler: NativeHandler) -> Result<(), DispatchError> {
        if self.get(handler.exposed_name()).is_some() {
            return Err(DispatchError::Duplicate(handler.exposed_name()));
        }
        self.entries.push(handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<NativeHandler> {
        self.entries
            .iter()
            .copied()
            .find(|handler| handler.exposed_name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|handler| handler.exposed_name())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create one script function per entry and store it on `target` under
    /// the entry's exposed name.
    pub fn install<'lua>(
        &self,
        lua: &'lua Lua,
        target: &Table<'lua>,
        scope: &HandlerScope,
    ) -> Result<(), ConstructionError> {
        let receiver = target.to_pointer();
        for &handler in &self.entries {
            let name = handler.exposed_name();
            let handler_scope = scope.clone();
            let function = lua
                .create_function(move |lua_ctx, args: Variadic<Value>| {
                    dispatch(lua_ctx, handler, &handler_scope, receiver, args)
                })
                .map_err(|source| ConstructionError::RegisterHandler { name, source })?;
            target
                .set(name, function)
                .map_err(|source| ConstructionError::RegisterHandler { name, source })?;
            debug!("registered {name}");
        }
        Ok(())
    }
}

/// Entry point for every script-side call. Failures are logged and the
/// script receives nil; nothing is raised back into the view.
fn dispatch<'lua>(
    lua: &'lua Lua,
    handler: NativeHandler,
    scope: &HandlerScope,
    receiver: *const c_void,
    args: Variadic<Value<'lua>>,
) -> mlua::Result<Value<'lua>> {
    let values = strip_receiver(args, receiver);
    let mut call = NativeCall::from_slots(lua, marshal_slots(values));
    let outcome = handler.invoke(scope, &mut call).map(|()| call.into_result());
    match outcome {
        Ok(result) => {
            debug!("{handler} completed");
            match result {
                Some(value) => value.into_lua(lua),
                None => Ok(Value::Nil),
            }
        }
        Err(err) => {
            error!("{handler} on {}: {err}", scope.menu_name());
            scope
                .context()
                .log_event(format!("call.error {handler}: {err}"));
            Ok(Value::Nil)
        }
    }
}

// Colon calls (`obj:Fn(x)`) pass the bridge object first; drop it.
fn strip_receiver<'lua>(args: Variadic<Value<'lua>>, receiver: *const c_void) -> Vec<Value<'lua>> {
    let mut values: Vec<Value> = args.into_iter().collect();
    if matches!(values.first(), Some(Value::Table(table)) if table.to_pointer() == receiver) {
        values.remove(0);
    }
    values
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::collaborators::Collaborators;
    use crate::config::ShimConfig;
    use crate::context::ShimContext;
    use crate::handlers::BridgeState;
    use crate::recording::{DomainEvent, RecordingDomain};

    fn install_into_global(lua: &Lua, domain: RecordingDomain) -> Rc<ShimContext> {
        let context = Rc::new(ShimContext::new(
            ShimConfig::default(),
            Collaborators::from_domain(Rc::new(domain)),
        ));
        let scope = HandlerScope::new(
            "LevelUpMenu",
            context.clone(),
            Rc::new(RefCell::new(BridgeState::default())),
        );
        let code = lua.create_table().expect("code object");
        DispatchTable::standard()
            .install(lua, &code, &scope)
            .expect("install handlers");
        lua.globals().set("code", code).expect("bind code object");
        context
    }

    #[test]
    fn standard_table_refuses_duplicates() {
        let mut table = DispatchTable::standard();
        assert_eq!(table.len(), 10);
        assert_eq!(
            table.register(NativeHandler::CloseMenu),
            Err(DispatchError::Duplicate("CloseMenu"))
        );
        assert_eq!(table.len(), 10);

        let mut empty = DispatchTable::new();
        assert!(empty.register(NativeHandler::GridAdded).is_ok());
        assert_eq!(empty.get("onGridAddedToStage"), Some(NativeHandler::GridAdded));
    }

    #[test]
    fn every_name_resolves_to_a_function() {
        let lua = Lua::new();
        install_into_global(&lua, RecordingDomain::new());
        let code: Table = lua.globals().get("code").expect("code object");
        for name in DispatchTable::standard().names() {
            assert!(
                matches!(code.get::<_, Value>(name), Ok(Value::Function(_))),
                "{name} should be callable"
            );
        }
    }

    #[test]
    fn dot_and_colon_calls_reach_the_same_handler() {
        let lua = Lua::new();
        let domain = RecordingDomain::new().with_description("clip_x", 3, "Steady hands");
        install_into_global(&lua, domain.clone());

        let (dot, colon): (String, String) = lua
            .load(
                r#"
                return code.GetPerkInfoByRank("clip_x", 3), code:GetPerkInfoByRank("clip_x", 3)
                "#,
            )
            .eval()
            .expect("calls succeed");
        assert_eq!(dot, "Steady hands");
        assert_eq!(colon, "Steady hands");

        lua.load(r#"code:SelectPerk("clip_y", 2)"#)
            .exec()
            .expect("select perk");
        assert_eq!(domain.selections(), vec![("clip_y".to_string(), 2)]);
    }

    #[test]
    fn ignored_arguments_may_be_anything() {
        let lua = Lua::new();
        let domain = RecordingDomain::new();
        let context = install_into_global(&lua, domain.clone());

        lua.load(
            r#"
            code:StopPerkSound(function() end)
            code:onGridAddedToStage(print)
            code:PlaySound("UIMenuOK", function() end)
            "#,
        )
        .exec()
        .expect("calls succeed");

        assert_eq!(
            domain.events(),
            vec![
                DomainEvent::StopPerkSound,
                DomainEvent::PlaySound {
                    sound_id: "UIMenuOK".to_string()
                },
            ]
        );
        assert!(context
            .journal()
            .iter()
            .all(|entry| !entry.starts_with("call.error")));
    }

    #[test]
    fn bad_calls_return_nil_instead_of_raising() {
        let lua = Lua::new();
        let context = install_into_global(&lua, RecordingDomain::new());

        let results: (Value, Value, Value) = lua
            .load(
                r#"
                return code.GetPerkInfoByRank(3, "clip_x"),
                       code.PlaySound(function() end),
                       code.GetXPInfo()
                "#,
            )
            .eval()
            .expect("bad calls do not raise");
        assert!(matches!(results.0, Value::Nil));
        assert!(matches!(results.1, Value::Nil));
        assert!(matches!(results.2, Value::Nil));

        let journal = context.journal();
        assert_eq!(
            journal
                .iter()
                .filter(|entry| entry.starts_with("call.error"))
                .count(),
            3
        );
    }
}
