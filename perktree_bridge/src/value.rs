//! Values crossing the boundary between native code and view scripts.
//!
//! Script values are copied into [`MarshaledValue`] before any handler looks
//! at them. Tables stay in the runtime and are reached through [`ObjectRef`].

use std::fmt;

use mlua::{IntoLua, Lua, Table, Value};
use thiserror::Error;

use crate::error::CallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Bool,
    Integer,
    Number,
    String,
    Object,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Bool => "boolean",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("script {0} values cannot cross the bridge")]
    Unsupported(&'static str),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone)]
pub enum MarshaledValue<'lua> {
    Undefined,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Object(ObjectRef<'lua>),
}

impl<'lua> MarshaledValue<'lua> {
    pub fn value_type(&self) -> ValueType {
        match self {
            MarshaledValue::Undefined => ValueType::Undefined,
            MarshaledValue::Bool(_) => ValueType::Bool,
            MarshaledValue::Integer(_) => ValueType::Integer,
            MarshaledValue::Number(_) => ValueType::Number,
            MarshaledValue::String(_) => ValueType::String,
            MarshaledValue::Object(_) => ValueType::Object,
        }
    }

    pub fn from_lua_value(value: Value<'lua>) -> Result<Self, ValueError> {
        match value {
            Value::Nil => Ok(MarshaledValue::Undefined),
            Value::Boolean(flag) => Ok(MarshaledValue::Bool(flag)),
            Value::Integer(i) => Ok(MarshaledValue::Integer(i)),
            Value::Number(n) => Ok(number_to_value(n)),
            Value::String(text) => text
                .to_str()
                .map(|s| MarshaledValue::String(s.to_string()))
                .map_err(|_| ValueError::InvalidUtf8),
            Value::Table(table) => Ok(MarshaledValue::Object(ObjectRef::new(table))),
            other => Err(ValueError::Unsupported(other.type_name())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarshaledValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MarshaledValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MarshaledValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef<'lua>> {
        match self {
            MarshaledValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl fmt::Display for MarshaledValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarshaledValue::Undefined => f.write_str("undefined"),
            MarshaledValue::Bool(flag) => write!(f, "{flag}"),
            MarshaledValue::Integer(i) => write!(f, "{i}"),
            MarshaledValue::Number(n) => write!(f, "{n}"),
            MarshaledValue::String(text) => write!(f, "{text:?}"),
            MarshaledValue::Object(object) => write!(f, "{object}"),
        }
    }
}

// Lua 5.1 has a single number type; integral values are the runtime's ints.
fn number_to_value<'lua>(n: f64) -> MarshaledValue<'lua> {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        MarshaledValue::Integer(n as i64)
    } else {
        MarshaledValue::Number(n)
    }
}

impl<'lua> IntoLua<'lua> for MarshaledValue<'lua> {
    fn into_lua(self, lua: &'lua Lua) -> mlua::Result<Value<'lua>> {
        Ok(match self {
            MarshaledValue::Undefined => Value::Nil,
            MarshaledValue::Bool(flag) => Value::Boolean(flag),
            MarshaledValue::Integer(i) => Value::Integer(i),
            MarshaledValue::Number(n) => Value::Number(n),
            MarshaledValue::String(text) => Value::String(lua.create_string(&text)?),
            MarshaledValue::Object(object) => Value::Table(object.into_table()),
        })
    }
}

/// Marshal each argument on its own. A value with no native counterpart
/// only fails a call whose handler reads that slot.
pub fn marshal_slots<'lua>(
    args: impl IntoIterator<Item = Value<'lua>>,
) -> Vec<Result<MarshaledValue<'lua>, ValueError>> {
    args.into_iter().map(MarshaledValue::from_lua_value).collect()
}

/// Reference to an object living in the script runtime.
#[derive(Clone)]
pub struct ObjectRef<'lua> {
    table: Table<'lua>,
}

impl<'lua> ObjectRef<'lua> {
    pub fn new(table: Table<'lua>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table<'lua> {
        &self.table
    }

    pub fn into_table(self) -> Table<'lua> {
        self.table
    }

    /// Read a member. `Ok(None)` when the member is absent.
    pub fn get_member(&self, name: &str) -> Result<Option<MarshaledValue<'lua>>, CallError> {
        let value: Value = self.table.get(name)?;
        if matches!(value, Value::Nil) {
            return Ok(None);
        }
        MarshaledValue::from_lua_value(value)
            .map(Some)
            .map_err(|source| CallError::Unmarshalable { index: 0, source })
    }

    pub fn set_member(&self, name: &str, value: MarshaledValue<'lua>) -> mlua::Result<()> {
        self.table.set(name, value)
    }

    /// Call `name` as a method: the object is passed as the first argument.
    pub fn invoke(
        &self,
        lua: &'lua Lua,
        name: &str,
        args: Vec<MarshaledValue<'lua>>,
    ) -> mlua::Result<Option<MarshaledValue<'lua>>> {
        let method = match self.table.get::<_, Value>(name)? {
            Value::Function(function) => function,
            _ => return Ok(None),
        };
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Value::Table(self.table.clone()));
        for arg in args {
            call_args.push(arg.into_lua(lua)?);
        }
        let result: Value = method.call(mlua::MultiValue::from_vec(call_args))?;
        MarshaledValue::from_lua_value(result)
            .map(Some)
            .map_err(|err| mlua::Error::RuntimeError(err.to_string()))
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:p})", self.table.to_pointer())
    }
}

impl fmt::Display for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object@{:p}", self.table.to_pointer())
    }
}
