//! Field classification rules shared by the generic and the compiled encoder.
//!
//! Both encoders route every field through [`classify`] and write values with
//! the helpers below, so the two can only differ in *when* a rule is applied
//! (on every call or once per type), never in *what* it decides.

use crate::error::{Error, Result};
use crate::long::{long_ne, LongBits};
use crate::schema::{FieldDescriptor, FieldType, MessageType, ScalarKind, Schema, TypeId, WireType};
use crate::value::{Message, Value};
use crate::writer::Writer;

/// Field number of the key inside a map entry.
pub(crate) const MAP_KEY_ID: u32 = 1;
/// Field number of the value inside a map entry.
pub(crate) const MAP_VALUE_ID: u32 = 2;

/// `(id << 3) | wire_type`
#[inline]
pub const fn tag(id: u32, wire_type: WireType) -> u32 {
    (id << 3) | wire_type as u32
}

/// How a single value of a field is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// Tag plus one scalar of the effective kind. Enums are `uint32`.
    Scalar { kind: ScalarKind },
    /// A recursive encode of `child`.
    Embedded { child: TypeId, group: bool },
}

/// The encoding shape of a field, derived from its descriptor flags.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape<'a> {
    Map {
        key: ScalarKind,
        value: Target,
    },
    Packed {
        kind: ScalarKind,
    },
    Repeated {
        target: Target,
    },
    /// Member of the named oneof, written only when selected.
    Member {
        oneof: &'a str,
        target: Target,
    },
    Single {
        target: Target,
        check: DefaultCheck,
    },
}

/// Classifies `field` of `mtype`.
///
/// Fails on message fields without a resolved child and on map fields with a
/// key kind protobuf does not allow.
pub(crate) fn classify<'a>(
    schema: &Schema,
    mtype: &'a MessageType,
    field: &'a FieldDescriptor,
) -> Result<Shape<'a>> {
    let target = target(schema, field)?;

    if let Some(key) = field.map_key() {
        return Ok(Shape::Map {
            key: map_key_kind(field, key)?,
            value: target,
        });
    }

    if field.is_repeated() {
        return Ok(match target {
            Target::Scalar { kind } if field.is_packed() && kind.is_packable() => {
                Shape::Packed { kind }
            }
            target => Shape::Repeated { target },
        });
    }

    if let Some(oneof) = mtype.oneof_of(field) {
        return Ok(Shape::Member {
            oneof: oneof.name(),
            target,
        });
    }

    Ok(Shape::Single {
        target,
        check: DefaultCheck::for_field(field, target)?,
    })
}

fn target(schema: &Schema, field: &FieldDescriptor) -> Result<Target> {
    match field.field_type() {
        FieldType::Scalar(kind) => Ok(Target::Scalar { kind: *kind }),
        FieldType::Enum(_) => Ok(Target::Scalar {
            kind: ScalarKind::Uint32,
        }),
        FieldType::Message {
            resolved: Some(child),
            ..
        } => Ok(Target::Embedded {
            child: *child,
            group: schema.get(*child)?.is_group(),
        }),
        FieldType::Message {
            name,
            resolved: None,
        } => Err(Error::UnresolvedType {
            field: field.name().to_string(),
            type_name: name.clone(),
        }),
    }
}

fn map_key_kind(field: &FieldDescriptor, key: &FieldType) -> Result<ScalarKind> {
    match key {
        // enum keys only occur as resolved key types
        FieldType::Enum(_) => Ok(ScalarKind::Uint32),
        FieldType::Scalar(kind) if kind.is_map_key() => Ok(*kind),
        other => Err(Error::InvalidMapKey {
            field: field.name().to_string(),
            key: other.to_string(),
        }),
    }
}

/// Default elision of a singular, non-oneof field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DefaultCheck {
    /// No default to compare against (embedded messages); any value is written.
    None,
    /// 64-bit kinds compare against the default's word pair.
    Long { kind: ScalarKind, bits: LongBits },
    Scalar { kind: ScalarKind, default: Value },
}

impl DefaultCheck {
    fn for_field(field: &FieldDescriptor, target: Target) -> Result<Self> {
        let Target::Scalar { kind } = target else {
            return Ok(DefaultCheck::None);
        };
        let Some(default) = field.default_value() else {
            return Ok(DefaultCheck::None);
        };
        if !kind.is_long() {
            return Ok(DefaultCheck::Scalar { kind, default });
        }
        coerce(kind, &default)
            .and_then(Scalar::long_bits)
            .map(|bits| DefaultCheck::Long { kind, bits })
            .ok_or_else(|| mismatch(field.name(), kind, &default))
    }

    /// Whether `value` differs from the default and must be written.
    pub(crate) fn differs(&self, value: &Value) -> bool {
        match self {
            DefaultCheck::None => true,
            DefaultCheck::Long { kind, bits } => coerce(*kind, value)
                .and_then(Scalar::long_bits)
                .map_or(true, |v| long_ne(v, bits.low, bits.high)),
            DefaultCheck::Scalar { kind, default } => {
                match (coerce(*kind, value), coerce(*kind, default)) {
                    (Some(a), Some(b)) => a != b,
                    _ => true,
                }
            }
        }
    }
}

/// A value converted to the representation of one scalar kind.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(&'a str),
    Bytes(&'a [u8]),
}

impl Scalar<'_> {
    fn long_bits(self) -> Option<LongBits> {
        match self {
            Scalar::I64(v) => Some(v.into()),
            Scalar::U64(v) => Some(v.into()),
            _ => None,
        }
    }
}

fn coerce(kind: ScalarKind, value: &Value) -> Option<Scalar<'_>> {
    Some(match kind {
        ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => {
            Scalar::I32(value.as_integer()? as i32)
        }
        ScalarKind::Uint32 | ScalarKind::Fixed32 => Scalar::U32(value.as_integer()? as u32),
        ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => {
            Scalar::I64(value.as_integer()?)
        }
        ScalarKind::Uint64 | ScalarKind::Fixed64 => Scalar::U64(value.as_integer()? as u64),
        ScalarKind::Float => Scalar::F32(value.as_float()? as f32),
        ScalarKind::Double => Scalar::F64(value.as_float()?),
        ScalarKind::Bool => Scalar::Bool(value.as_bool()?),
        ScalarKind::String => Scalar::Str(value.as_str()?),
        ScalarKind::Bytes => Scalar::Bytes(value.as_bytes()?),
    })
}

pub(crate) fn mismatch(field: &str, expected: impl ToString, found: &Value) -> Error {
    Error::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        found: found.type_name(),
    }
}

/// Writes `value` as a bare scalar of `kind`, without a tag.
pub(crate) fn write_scalar(
    writer: &mut Writer,
    kind: ScalarKind,
    value: &Value,
    field: &str,
) -> Result<()> {
    let scalar = coerce(kind, value).ok_or_else(|| mismatch(field, kind, value))?;
    match (kind, scalar) {
        (ScalarKind::Int32, Scalar::I32(v)) => writer.int32(v),
        (ScalarKind::Sint32, Scalar::I32(v)) => writer.sint32(v),
        (ScalarKind::Sfixed32, Scalar::I32(v)) => writer.sfixed32(v),
        (ScalarKind::Uint32, Scalar::U32(v)) => writer.uint32(v),
        (ScalarKind::Fixed32, Scalar::U32(v)) => writer.fixed32(v),
        (ScalarKind::Int64, Scalar::I64(v)) => writer.int64(v),
        (ScalarKind::Sint64, Scalar::I64(v)) => writer.sint64(v),
        (ScalarKind::Sfixed64, Scalar::I64(v)) => writer.sfixed64(v),
        (ScalarKind::Uint64, Scalar::U64(v)) => writer.uint64(v),
        (ScalarKind::Fixed64, Scalar::U64(v)) => writer.fixed64(v),
        (ScalarKind::Float, Scalar::F32(v)) => writer.float(v),
        (ScalarKind::Double, Scalar::F64(v)) => writer.double(v),
        (ScalarKind::Bool, Scalar::Bool(v)) => writer.bool(v),
        (ScalarKind::String, Scalar::Str(v)) => writer.string(v),
        (ScalarKind::Bytes, Scalar::Bytes(v)) => writer.bytes(v),
        _ => return Err(mismatch(field, kind, value)),
    };
    Ok(())
}

/// Writes a map key given in its text form as a bare scalar of `kind`.
pub(crate) fn write_map_key(
    writer: &mut Writer,
    kind: ScalarKind,
    key: &str,
    field: &str,
) -> Result<()> {
    let invalid = || Error::MapKey {
        field: field.to_string(),
        key: key.to_string(),
        kind,
    };
    let value = match kind {
        ScalarKind::String => {
            writer.string(key);
            return Ok(());
        }
        ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => {
            Value::I32(key.parse().map_err(|_| invalid())?)
        }
        ScalarKind::Uint32 | ScalarKind::Fixed32 => {
            Value::U32(key.parse().map_err(|_| invalid())?)
        }
        ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => {
            Value::I64(key.parse().map_err(|_| invalid())?)
        }
        ScalarKind::Uint64 | ScalarKind::Fixed64 => {
            Value::U64(key.parse().map_err(|_| invalid())?)
        }
        ScalarKind::Bool => Value::Bool(key.parse().map_err(|_| invalid())?),
        ScalarKind::Float | ScalarKind::Double | ScalarKind::Bytes => {
            return Err(Error::InvalidMapKey {
                field: field.to_string(),
                key: kind.to_string(),
            })
        }
    };
    write_scalar(writer, kind, &value, field)
}

/// How an embedded message is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Start and end group tags around the body, no length.
    Group { start: u32, end: u32 },
    /// Tag and length before the body. An empty body is dropped entirely
    /// unless `keep_empty` is set.
    Delimited { id: u32, keep_empty: bool },
}

impl Framing {
    pub(crate) const fn new(id: u32, group: bool, keep_empty: bool) -> Self {
        if group {
            Framing::Group {
                start: tag(id, WireType::SGroup),
                end: tag(id, WireType::EGroup),
            }
        } else {
            Framing::Delimited { id, keep_empty }
        }
    }

    /// Frames whatever `body` writes.
    pub(crate) fn emit<F>(self, writer: &mut Writer, body: F) -> Result<()>
    where
        F: FnOnce(&mut Writer) -> Result<()>,
    {
        match self {
            Framing::Group { start, end } => {
                writer.uint32(start);
                body(writer)?;
                writer.uint32(end);
            }
            Framing::Delimited { id, keep_empty } => {
                scoped(writer, body)?;
                if keep_empty || !writer.is_empty() {
                    writer.ldelim(Some(id));
                } else {
                    writer.reset();
                }
            }
        }
        Ok(())
    }
}

/// Runs `body` inside a new [`Writer::fork`] scope, which the caller closes on
/// success. On failure the scope is dropped again, so the writer is left at
/// the depth it had before.
pub(crate) fn scoped<F>(writer: &mut Writer, body: F) -> Result<()>
where
    F: FnOnce(&mut Writer) -> Result<()>,
{
    writer.fork();
    if let Err(err) = body(writer) {
        writer.reset();
        return Err(err);
    }
    Ok(())
}

/// Recursion into the encoder of a child message type.
pub(crate) trait EncodeChild {
    fn encode_child(&self, child: TypeId, message: &Message, writer: &mut Writer) -> Result<()>;
}

/// The embedded message held by `value`.
pub(crate) fn expect_message<'v>(value: &'v Value, field: &str) -> Result<&'v Message> {
    value
        .as_message()
        .ok_or_else(|| mismatch(field, "message", value))
}

pub(crate) fn expect_list<'v>(value: &'v Value, field: &str) -> Result<&'v [Value]> {
    value
        .as_list()
        .ok_or_else(|| mismatch(field, "list", value))
}

pub(crate) fn expect_map<'v>(value: &'v Value, field: &str) -> Result<&'v [(String, Value)]> {
    value.as_map().ok_or_else(|| mismatch(field, "map", value))
}
