//! The encoder generator.
//!
//! [`generate`] turns a message type into a [`CompiledEncoder`]: a flat table
//! of steps, one per field, with tags, wire kinds, defaults and field shapes
//! decided up front. Encoding then runs the table without looking at a
//! descriptor. Child types are referenced by [`TypeId`] and reached through the
//! codec at encode time, so recursive schemas compile to finite tables.

use std::fmt;

use crate::classify::{
    classify, expect_list, expect_map, expect_message, scoped, tag, write_map_key,
    write_scalar, DefaultCheck, EncodeChild, Framing, Shape, Target, MAP_KEY_ID, MAP_VALUE_ID,
};
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::schema::{ScalarKind, Schema, TypeId, WireType};
use crate::value::{Message, Value};
use crate::writer::Writer;

/// A message type's encoder with every per-field decision baked in.
///
/// Obtain one with [`Codec::generate`], which caches it per type.
pub struct CompiledEncoder {
    ty: TypeId,
    name: String,
    steps: Box<[Step]>,
}

/// Writing a single value with a fixed tag.
#[derive(Debug, Clone, PartialEq)]
enum Op {
    Scalar { tag: u32, kind: ScalarKind },
    Embedded { child: TypeId, framing: Framing },
}

#[derive(Debug, Clone, PartialEq)]
enum MapValue {
    Scalar { tag: u32, kind: ScalarKind },
    Message { child: TypeId },
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Map {
        field: String,
        tag: u32,
        key_tag: u32,
        key: ScalarKind,
        value: MapValue,
    },
    Packed {
        field: String,
        tag: u32,
        kind: ScalarKind,
    },
    Repeated {
        field: String,
        op: Op,
    },
    /// Oneof member, dispatched on the oneof's discriminator.
    Case {
        field: String,
        oneof: String,
        op: Op,
    },
    Single {
        field: String,
        required: bool,
        check: DefaultCheck,
        op: Op,
    },
}

impl Op {
    fn new(id: u32, target: Target, keep_empty: bool) -> Self {
        match target {
            Target::Scalar { kind } => Op::Scalar {
                tag: tag(id, kind.wire_type()),
                kind,
            },
            Target::Embedded { child, group } => Op::Embedded {
                child,
                framing: Framing::new(id, group, keep_empty),
            },
        }
    }

    fn emit(&self, codec: &Codec, writer: &mut Writer, value: &Value, field: &str) -> Result<()> {
        match self {
            Op::Scalar { tag, kind } => {
                writer.uint32(*tag);
                write_scalar(writer, *kind, value, field)
            }
            Op::Embedded { child, framing } => {
                let message = expect_message(value, field)?;
                framing.emit(writer, |w| codec.encode_child(*child, message, w))
            }
        }
    }
}

/// Builds the encoder of `ty`.
///
/// Pure: the result depends on the schema only. Fails when a message field has
/// no resolved child type or a map field has an invalid key kind.
pub fn generate(schema: &Schema, ty: TypeId) -> Result<CompiledEncoder> {
    let mtype = schema.get(ty)?;
    let mut steps = Vec::with_capacity(mtype.fields().len());

    for field in mtype.fields() {
        let id = field.id();
        let name = field.name().to_string();
        let step = match classify(schema, mtype, field)? {
            Shape::Map { key, value } => Step::Map {
                field: name,
                tag: tag(id, WireType::Len),
                key_tag: tag(MAP_KEY_ID, key.wire_type()),
                key,
                value: match value {
                    Target::Scalar { kind } => MapValue::Scalar {
                        tag: tag(MAP_VALUE_ID, kind.wire_type()),
                        kind,
                    },
                    Target::Embedded { child, .. } => MapValue::Message { child },
                },
            },
            Shape::Packed { kind } => Step::Packed {
                field: name,
                tag: tag(id, WireType::Len),
                kind,
            },
            Shape::Repeated { target } => Step::Repeated {
                field: name,
                op: Op::new(id, target, true),
            },
            Shape::Member { oneof, target } => Step::Case {
                field: name,
                oneof: oneof.to_string(),
                op: Op::new(id, target, field.is_required()),
            },
            Shape::Single { target, check } => Step::Single {
                field: name,
                required: field.is_required(),
                check,
                op: Op::new(id, target, field.is_required()),
            },
        };
        steps.push(step);
    }

    Ok(CompiledEncoder {
        ty,
        name: mtype.name().to_string(),
        steps: steps.into_boxed_slice(),
    })
}

impl CompiledEncoder {
    /// The type this encoder was generated for.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }

    /// Number of fields in the step table.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Encodes `message` into `writer`, creating a writer if none is given.
    /// Child messages are encoded with their own compiled encoders from `codec`.
    pub fn encode(&self, codec: &Codec, message: &Message, writer: Option<Writer>) -> Result<Writer> {
        let mut writer = writer.unwrap_or_else(|| codec.writer());
        self.encode_into(codec, message, &mut writer)?;
        Ok(writer)
    }

    pub fn encode_into(&self, codec: &Codec, message: &Message, writer: &mut Writer) -> Result<()> {
        for step in self.steps.iter() {
            match step {
                Step::Map {
                    field,
                    tag,
                    key_tag,
                    key,
                    value,
                } => {
                    let Some(entries) = message.get(field) else { continue };
                    for (k, v) in expect_map(entries, field)? {
                        writer.uint32(*tag);
                        scoped(writer, |w| {
                            w.uint32(*key_tag);
                            write_map_key(w, *key, k, field)?;
                            match value {
                                MapValue::Scalar { tag, kind } => {
                                    w.uint32(*tag);
                                    write_scalar(w, *kind, v, field)
                                }
                                MapValue::Message { child } => {
                                    let child_message = expect_message(v, field)?;
                                    Framing::new(MAP_VALUE_ID, false, true)
                                        .emit(w, |w| codec.encode_child(*child, child_message, w))
                                }
                            }
                        })?;
                        writer.ldelim(None);
                    }
                }

                Step::Packed { field, tag, kind } => {
                    let Some(values) = message.get(field) else { continue };
                    let values = expect_list(values, field)?;
                    if values.is_empty() {
                        continue;
                    }
                    writer.uint32(*tag);
                    scoped(writer, |w| {
                        values
                            .iter()
                            .try_for_each(|v| write_scalar(w, *kind, v, field))
                    })?;
                    writer.ldelim(None);
                }

                Step::Repeated { field, op } => {
                    let Some(values) = message.get(field) else { continue };
                    for v in expect_list(values, field)? {
                        op.emit(codec, writer, v, field)?;
                    }
                }

                Step::Case { field, oneof, op } => {
                    if message.which_oneof(oneof) != Some(field.as_str()) {
                        continue;
                    }
                    if let Some(value) = message.get(field) {
                        op.emit(codec, writer, value, field)?;
                    }
                }

                Step::Single {
                    field,
                    required,
                    check,
                    op,
                } => match message.get(field) {
                    Some(value) if *required || check.differs(value) => {
                        op.emit(codec, writer, value, field)?;
                    }
                    Some(_) => {}
                    None if *required => {
                        return Err(Error::MissingRequired {
                            field: field.clone(),
                        })
                    }
                    None => {}
                },
            }
        }
        Ok(())
    }
}

impl fmt::Debug for CompiledEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledEncoder")
            .field("ty", &self.ty)
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}
