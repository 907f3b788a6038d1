use crate::debugger::variable::{Value, Variable};
use std::borrow::Cow;

pub const NULL_REPR: &str = "<None>";
pub const OBJECT_REPR: &str = "<...>";
pub const STRING_TYPE: &str = "System.String";

pub trait RenderRepr {
    fn r#type(&self) -> &str;
    fn value(&self) -> Cow<str>;
}

impl RenderRepr for Value {
    fn r#type(&self) -> &str {
        match self {
            Value::Primitive(p) => p.type_name(),
            Value::String(_) => STRING_TYPE,
            Value::Null { type_name } | Value::Object { type_name } => type_name,
        }
    }

    fn value(&self) -> Cow<str> {
        match self {
            Value::Primitive(p) => Cow::Owned(p.to_string()),
            Value::String(s) => Cow::Owned(format!("\"{s}\"")),
            Value::Null { .. } => Cow::Borrowed(NULL_REPR),
            Value::Object { .. } => Cow::Borrowed(OBJECT_REPR),
        }
    }
}

impl RenderRepr for Variable {
    /// Empty for variables whose value can't be extracted.
    fn r#type(&self) -> &str {
        match &self.value {
            Ok(v) => v.r#type(),
            Err(_) => "",
        }
    }

    fn value(&self) -> Cow<str> {
        match &self.value {
            Ok(v) => v.value(),
            Err(e) => Cow::Owned(e.to_string()),
        }
    }
}
