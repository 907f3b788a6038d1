//! Value inspector.
//!
//! Runtime values are snapshots ([`RawValue`]) taken while debugee is stopped. Inspector
//! dereferences and unboxes them and turns the result into a [`Value`].

pub mod render;

use crate::debugger::debugee::{Debugee, ElementType, RawValue, ThreadId};
use crate::debugger::error::Error;
use crate::debugger::symbol::{LocalScope, LocalVariable, SymbolStore};
use std::fmt::{Display, Formatter};

/// Runtime call site cache, never interesting for a user.
pub const SITE_LOCAL: &str = "$site";
/// Prefix of compiler generated names.
pub const HIDDEN_PREFIX: char = '$';

/// Value types, that are primitives in disguise.
const PRIMITIVE_TYPES: &[(&str, ElementType)] = &[
    ("System.Boolean", ElementType::Boolean),
    ("System.SByte", ElementType::I1),
    ("System.Byte", ElementType::U1),
    ("System.Int16", ElementType::I2),
    ("System.UInt16", ElementType::U2),
    ("System.Int32", ElementType::I4),
    ("System.UInt32", ElementType::U4),
    ("System.IntPtr", ElementType::I),
    ("System.UIntPtr", ElementType::U),
    ("System.Int64", ElementType::I8),
    ("System.UInt64", ElementType::U8),
    ("System.Single", ElementType::R4),
    ("System.Double", ElementType::R8),
    ("System.Char", ElementType::Char),
];

fn primitive_kind(type_name: &str) -> Option<ElementType> {
    PRIMITIVE_TYPES
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    Char(char),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    ISize(i64),
    USize(u64),
}

impl Primitive {
    /// Runtime type name of a primitive.
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Bool(_) => "System.Boolean",
            Primitive::Char(_) => "System.Char",
            Primitive::I8(_) => "System.SByte",
            Primitive::U8(_) => "System.Byte",
            Primitive::I16(_) => "System.Int16",
            Primitive::U16(_) => "System.UInt16",
            Primitive::I32(_) => "System.Int32",
            Primitive::U32(_) => "System.UInt32",
            Primitive::I64(_) => "System.Int64",
            Primitive::U64(_) => "System.UInt64",
            Primitive::F32(_) => "System.Single",
            Primitive::F64(_) => "System.Double",
            Primitive::ISize(_) => "System.IntPtr",
            Primitive::USize(_) => "System.UIntPtr",
        }
    }

    fn decode(kind: ElementType, data: &[u8]) -> Result<Self, Error> {
        fn le<const N: usize>(kind: ElementType, data: &[u8]) -> Result<[u8; N], Error> {
            data.try_into()
                .map_err(|_| Error::ValueDecode(kind, data.into()))
        }

        let value = match kind {
            ElementType::Boolean => Primitive::Bool(le::<1>(kind, data)?[0] != 0),
            ElementType::Char => {
                let unit = u16::from_le_bytes(le(kind, data)?);
                Primitive::Char(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            ElementType::I1 => Primitive::I8(i8::from_le_bytes(le(kind, data)?)),
            ElementType::U1 => Primitive::U8(u8::from_le_bytes(le(kind, data)?)),
            ElementType::I2 => Primitive::I16(i16::from_le_bytes(le(kind, data)?)),
            ElementType::U2 => Primitive::U16(u16::from_le_bytes(le(kind, data)?)),
            ElementType::I4 => Primitive::I32(i32::from_le_bytes(le(kind, data)?)),
            ElementType::U4 => Primitive::U32(u32::from_le_bytes(le(kind, data)?)),
            ElementType::I8 => Primitive::I64(i64::from_le_bytes(le(kind, data)?)),
            ElementType::U8 => Primitive::U64(u64::from_le_bytes(le(kind, data)?)),
            ElementType::R4 => Primitive::F32(f32::from_le_bytes(le(kind, data)?)),
            ElementType::R8 => Primitive::F64(f64::from_le_bytes(le(kind, data)?)),
            // native integers, 32 or 64 bit wide
            ElementType::I => match data.len() {
                4 => Primitive::ISize(i32::from_le_bytes(le(kind, data)?) as i64),
                _ => Primitive::ISize(i64::from_le_bytes(le(kind, data)?)),
            },
            ElementType::U => match data.len() {
                4 => Primitive::USize(u32::from_le_bytes(le(kind, data)?) as u64),
                _ => Primitive::USize(u64::from_le_bytes(le(kind, data)?)),
            },
            _ => return Err(Error::UnsupportedValue(kind)),
        };
        Ok(value)
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Primitive::Bool(b) => f.write_str(if *b { "True" } else { "False" }),
            Primitive::Char(c) => write!(f, "{c}"),
            Primitive::I8(v) => write!(f, "{v}"),
            Primitive::U8(v) => write!(f, "{v}"),
            Primitive::I16(v) => write!(f, "{v}"),
            Primitive::U16(v) => write!(f, "{v}"),
            Primitive::I32(v) => write!(f, "{v}"),
            Primitive::U32(v) => write!(f, "{v}"),
            Primitive::I64(v) => write!(f, "{v}"),
            Primitive::U64(v) => write!(f, "{v}"),
            Primitive::F32(v) => write!(f, "{v}"),
            Primitive::F64(v) => write!(f, "{v}"),
            Primitive::ISize(v) => write!(f, "{v}"),
            Primitive::USize(v) => write!(f, "{v}"),
        }
    }
}

/// Extracted value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    String(String),
    /// Null reference, contains declared type of the reference.
    Null { type_name: String },
    /// Object handle, fields are not inspected.
    Object { type_name: String },
}

/// Dereference, unbox and classify a runtime value.
pub fn extract_value(raw: &RawValue) -> Result<Value, Error> {
    match raw {
        RawValue::Reference {
            declared_type,
            target,
        } => match target {
            None => Ok(Value::Null {
                type_name: declared_type.clone(),
            }),
            Some(target) => extract_value(target),
        },
        RawValue::Boxed { inner } => extract_value(inner),
        RawValue::Data {
            kind,
            type_name,
            data,
        } => match kind {
            ElementType::Boolean
            | ElementType::Char
            | ElementType::I1
            | ElementType::U1
            | ElementType::I2
            | ElementType::U2
            | ElementType::I4
            | ElementType::U4
            | ElementType::I8
            | ElementType::U8
            | ElementType::R4
            | ElementType::R8
            | ElementType::I
            | ElementType::U => Ok(Value::Primitive(Primitive::decode(*kind, data)?)),
            ElementType::String => Ok(Value::String(String::from_utf8(data.clone())?)),
            ElementType::ValueType => match primitive_kind(type_name) {
                Some(kind) => Ok(Value::Primitive(Primitive::decode(kind, data)?)),
                None => Ok(Value::Object {
                    type_name: type_name.clone(),
                }),
            },
            ElementType::Class | ElementType::Object => Ok(Value::Object {
                type_name: type_name.clone(),
            }),
            _ => Err(Error::UnsupportedValue(*kind)),
        },
    }
}

/// Named value of a frame.
#[derive(Debug)]
pub struct Variable {
    pub name: String,
    /// Extraction error doesn't affect other variables of a frame.
    pub value: Result<Value, Error>,
}

fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Collect variables of a scope and all nested scopes containing `offset`.
pub fn scope_locals<'a>(
    scope: &'a LocalScope,
    offset: u32,
    show_hidden: bool,
    out: &mut Vec<&'a LocalVariable>,
) {
    out.extend(
        scope
            .locals
            .iter()
            .filter(|var| var.name != SITE_LOCAL)
            .filter(|var| show_hidden || !is_hidden_name(&var.name)),
    );
    scope
        .children
        .iter()
        .filter(|child| child.contains(offset))
        .for_each(|child| scope_locals(child, offset, show_hidden, out));
}

/// Read local variables of a thread frame.
///
/// Names come from lexical scopes, if method has no scope information
/// locals are named by its slots (`local_0`, `local_1`, etc.).
pub fn read_locals(
    debugee: &dyn Debugee,
    symbols: &SymbolStore,
    thread: ThreadId,
    frame_num: usize,
    show_hidden: bool,
) -> Result<Vec<Variable>, Error> {
    let frames = debugee.frames(thread)?;
    let frame = frames.get(frame_num).ok_or(Error::FrameNotFound(frame_num))?;
    let Some(function) = frame.function else {
        return Ok(vec![]);
    };

    let read = |name: String, slot: u32| Variable {
        name,
        value: debugee
            .local(thread, frame_num, slot)
            .and_then(|raw| extract_value(&raw)),
    };

    let root_scope = symbols
        .index(function.module)
        .and_then(|index| index.root_scope(function.token));
    let vars = match root_scope {
        Some(scope) => {
            let mut locals = vec![];
            scope_locals(scope, frame.ip, show_hidden, &mut locals);
            locals
                .into_iter()
                .map(|var| read(var.name.clone(), var.slot))
                .collect()
        }
        None => (0..debugee.local_count(thread, frame_num)?)
            .map(|slot| read(format!("local_{slot}"), slot))
            .collect(),
    };
    Ok(vars)
}

/// Read arguments of a thread frame, implicit receiver (position 0) is skipped.
pub fn read_arguments(
    debugee: &dyn Debugee,
    thread: ThreadId,
    frame_num: usize,
    show_hidden: bool,
) -> Result<Vec<Variable>, Error> {
    let frames = debugee.frames(thread)?;
    let frame = frames.get(frame_num).ok_or(Error::FrameNotFound(frame_num))?;
    let Some(function) = frame.function else {
        return Ok(vec![]);
    };

    let method = debugee.method_info(function)?;
    let args = method
        .params
        .into_iter()
        .filter(|param| param.position != 0)
        .filter(|param| show_hidden || !is_hidden_name(&param.name))
        .map(|param| Variable {
            value: debugee
                .argument(thread, frame_num, param.position)
                .and_then(|raw| extract_value(&raw)),
            name: param.name,
        })
        .collect();
    Ok(args)
}
