//! The generic encoder: walks the descriptors of a message type on every call.

use log::trace;

use crate::classify::{
    classify, expect_list, expect_map, expect_message, scoped, tag, write_map_key,
    write_scalar, EncodeChild, Framing, Shape, Target, MAP_KEY_ID, MAP_VALUE_ID,
};
use crate::error::{Error, Result};
use crate::schema::{Schema, TypeId, WireType};
use crate::value::{Message, Value};
use crate::writer::Writer;

/// Encodes messages by interpreting their type's field descriptors.
///
/// Every call re-classifies every field. Use a [`crate::CompiledEncoder`] (via
/// [`crate::Codec`]) when the same type is encoded repeatedly; both produce the
/// same bytes.
///
/// ## Example
///
/// ```
/// # use schemabuf::{FieldDescriptor, GenericEncoder, Message, MessageType, ScalarKind, SchemaBuilder};
/// let mut builder = SchemaBuilder::new();
/// let test1 = builder
///     .add(MessageType::new("Test1").field(FieldDescriptor::scalar("a", 1, ScalarKind::Int32)))
///     .unwrap();
/// let schema = builder.build().unwrap();
///
/// let writer = GenericEncoder::new(&schema)
///     .encode(test1, &Message::new().with("a", 150), None)
///     .unwrap();
/// assert_eq!(writer.into_vec(), [0x08, 0x96, 0x01]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GenericEncoder<'s> {
    schema: &'s Schema,
}

impl<'s> GenericEncoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Encodes `message` as type `ty` into `writer`, creating a writer if none
    /// is given, and returns the writer.
    pub fn encode(&self, ty: TypeId, message: &Message, writer: Option<Writer>) -> Result<Writer> {
        let mut writer = writer.unwrap_or_default();
        self.encode_into(ty, message, &mut writer)?;
        Ok(writer)
    }

    /// Encodes `message` as type `ty`, appending to the current scope of `writer`.
    pub fn encode_into(&self, ty: TypeId, message: &Message, writer: &mut Writer) -> Result<()> {
        let mtype = self.schema.get(ty)?;
        trace!("generic encode of {} ({} fields)", mtype.name(), mtype.fields().len());

        for field in mtype.fields() {
            let name = field.name();
            let id = field.id();
            let value = message.get(name);

            match classify(self.schema, mtype, field)? {
                Shape::Map { key, value: target } => {
                    let Some(value) = value else { continue };
                    for (k, v) in expect_map(value, name)? {
                        writer.uint32(tag(id, WireType::Len));
                        scoped(writer, |w| {
                            w.uint32(tag(MAP_KEY_ID, key.wire_type()));
                            write_map_key(w, key, k, name)?;
                            match target {
                                Target::Scalar { kind } => {
                                    w.uint32(tag(MAP_VALUE_ID, kind.wire_type()));
                                    write_scalar(w, kind, v, name)
                                }
                                // map values are never groups
                                Target::Embedded { child, .. } => {
                                    let child_message = expect_message(v, name)?;
                                    Framing::new(MAP_VALUE_ID, false, true).emit(w, |w| {
                                        self.encode_child(child, child_message, w)
                                    })
                                }
                            }
                        })?;
                        writer.ldelim(None);
                    }
                }

                Shape::Packed { kind } => {
                    let Some(value) = value else { continue };
                    let values = expect_list(value, name)?;
                    if values.is_empty() {
                        continue;
                    }
                    writer.uint32(tag(id, WireType::Len));
                    scoped(writer, |w| {
                        values
                            .iter()
                            .try_for_each(|v| write_scalar(w, kind, v, name))
                    })?;
                    writer.ldelim(None);
                }

                Shape::Repeated { target } => {
                    let Some(value) = value else { continue };
                    for v in expect_list(value, name)? {
                        // empty elements are kept so the element count survives
                        self.write_target(writer, id, target, true, v, name)?;
                    }
                }

                Shape::Member { oneof, target } => {
                    if message.which_oneof(oneof) != Some(name) {
                        continue;
                    }
                    if let Some(value) = value {
                        self.write_target(writer, id, target, field.is_required(), value, name)?;
                    }
                }

                Shape::Single { target, check } => match value {
                    Some(value) if field.is_required() || check.differs(value) => {
                        self.write_target(writer, id, target, field.is_required(), value, name)?;
                    }
                    Some(_) => {}
                    None if field.is_required() => {
                        return Err(Error::MissingRequired {
                            field: name.to_string(),
                        })
                    }
                    None => {}
                },
            }
        }
        Ok(())
    }

    fn write_target(
        &self,
        writer: &mut Writer,
        id: u32,
        target: Target,
        keep_empty: bool,
        value: &Value,
        field: &str,
    ) -> Result<()> {
        match target {
            Target::Scalar { kind } => {
                writer.uint32(tag(id, kind.wire_type()));
                write_scalar(writer, kind, value, field)
            }
            Target::Embedded { child, group } => {
                let message = expect_message(value, field)?;
                Framing::new(id, group, keep_empty)
                    .emit(writer, |w| self.encode_child(child, message, w))
            }
        }
    }
}

impl EncodeChild for GenericEncoder<'_> {
    fn encode_child(&self, child: TypeId, message: &Message, writer: &mut Writer) -> Result<()> {
        self.encode_into(child, message, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldType, MessageType, ScalarKind, SchemaBuilder};
    use hex_literal::hex;

    fn single(ty: MessageType) -> (Schema, TypeId) {
        let mut builder = SchemaBuilder::new();
        let id = builder.add(ty).unwrap();
        (builder.build().unwrap(), id)
    }

    fn encode(schema: &Schema, ty: TypeId, message: &Message) -> Vec<u8> {
        GenericEncoder::new(schema)
            .encode(ty, message, None)
            .unwrap()
            .into_vec()
    }

    #[test]
    fn scalars_work() {
        // echo "number: 4; on: true; name: \"testing\"" | protoc --encode=Room *.proto | xxd -p
        let (schema, ty) = single(
            MessageType::new("Room")
                .field(FieldDescriptor::scalar("number", 1, ScalarKind::Uint64))
                .field(FieldDescriptor::scalar("name", 2, ScalarKind::String))
                .field(FieldDescriptor::scalar("on", 3, ScalarKind::Bool)),
        );
        let room = Message::new()
            .with("number", 4u64)
            .with("on", true)
            .with("name", "testing");
        // declaration order, not insertion order
        assert_eq!(encode(&schema, ty, &room), hex!("0804 120774657374696e67 1801"));
    }

    #[test]
    fn default_values_are_elided() {
        let (schema, ty) = single(
            MessageType::new("T")
                .field(FieldDescriptor::scalar("a", 1, ScalarKind::Int32))
                .field(FieldDescriptor::scalar("b", 2, ScalarKind::String))
                .field(FieldDescriptor::scalar("c", 3, ScalarKind::Int32).with_default(7))
                .field(FieldDescriptor::scalar("d", 4, ScalarKind::Sint64))
                .field(FieldDescriptor::enumeration("e", 5, "Color")),
        );
        let msg = Message::new()
            .with("a", 0)
            .with("b", "")
            .with("c", 7)
            .with("d", 0i64)
            .with("e", Value::EnumNumber(0));
        assert_eq!(encode(&schema, ty, &msg), hex!(""));

        // A zero is not the default of c
        let msg = Message::new().with("c", 0).with("e", Value::EnumNumber(2));
        assert_eq!(encode(&schema, ty, &msg), hex!("1800 2802"));
    }

    #[test]
    fn required_fields_bypass_default_elision() {
        let (schema, ty) = single(
            MessageType::new("T").field(FieldDescriptor::scalar("a", 1, ScalarKind::Int32).required()),
        );
        assert_eq!(encode(&schema, ty, &Message::new().with("a", 0)), hex!("0800"));
        assert_eq!(
            GenericEncoder::new(&schema)
                .encode(ty, &Message::new(), None)
                .unwrap_err(),
            Error::MissingRequired {
                field: "a".to_string()
            }
        );
    }

    #[test]
    fn packed_repeated_works() {
        let (schema, ty) = single(
            MessageType::new("T")
                .field(FieldDescriptor::scalar("values", 5, ScalarKind::Int32).repeated().packed()),
        );
        let msg = Message::new().with("values", Value::list([1, 2, 3]));
        assert_eq!(encode(&schema, ty, &msg), hex!("2a03010203"));

        let msg = Message::new().with("values", Value::List(vec![]));
        assert_eq!(encode(&schema, ty, &msg), hex!(""));
    }

    #[test]
    fn unpacked_repeated_works() {
        // echo "id: \"bools\"; booleans: [false, false, true, true, false]" | protoc --encode=Collection *.proto | xxd -p -c 9999
        let (schema, ty) = single(
            MessageType::new("Collection")
                .field(FieldDescriptor::scalar("id", 1, ScalarKind::String))
                .field(FieldDescriptor::scalar("booleans", 8, ScalarKind::Bool).repeated()),
        );
        let msg = Message::new()
            .with("id", "bools")
            .with("booleans", Value::list([false, false, true, true, false]));
        assert_eq!(
            encode(&schema, ty, &msg),
            hex!("0a05626f6f6c7340004000400140014000")
        );
    }

    #[test]
    fn map_works() {
        let (schema, ty) = single(MessageType::new("T").field(FieldDescriptor::map(
            "scores",
            7,
            FieldType::Scalar(ScalarKind::String),
            FieldType::Scalar(ScalarKind::Int32),
        )));
        let msg = Message::new().with("scores", Value::map([("a", 1), ("b", 2)]));
        assert_eq!(
            encode(&schema, ty, &msg),
            hex!("3a050a01611001 3a050a01621002")
        );
    }

    #[test]
    fn oneof_writes_selected_member_only() {
        let (schema, ty) = single(
            MessageType::new("T")
                .field(FieldDescriptor::scalar("a", 1, ScalarKind::Int32))
                .field(FieldDescriptor::scalar("b", 2, ScalarKind::Int32))
                .oneof("kind", &["a", "b"]),
        );
        let msg = Message::new()
            .with_oneof("kind", "a", 9)
            .with_oneof("kind", "b", 5);
        assert_eq!(encode(&schema, ty, &msg), hex!("1005"));

        // selected members ignore default elision
        let msg = Message::new().with_oneof("kind", "a", 0);
        assert_eq!(encode(&schema, ty, &msg), hex!("0800"));

        // nothing selected, nothing written
        let msg = Message::new().with("a", 3);
        assert_eq!(encode(&schema, ty, &msg), hex!(""));
    }

    #[test]
    fn embedded_messages_work() {
        let mut builder = SchemaBuilder::new();
        let lights = builder
            .add(MessageType::new("Lights").field(FieldDescriptor::scalar("on", 3, ScalarKind::Bool)))
            .unwrap();
        let room = builder
            .add(
                MessageType::new("Room")
                    .field(FieldDescriptor::scalar("number", 1, ScalarKind::Uint64))
                    .field(FieldDescriptor::message("lights", 2, "Lights", lights))
                    .field(FieldDescriptor::scalar("size", 3, ScalarKind::Uint64)),
            )
            .unwrap();
        let schema = builder.build().unwrap();

        // echo "number: 4; lights: {on: true}; size: 56" | protoc --encode=Room *.proto | hexdump -C
        let msg = Message::new()
            .with("number", 4)
            .with("lights", Message::new().with("on", true))
            .with("size", 56);
        assert_eq!(encode(&schema, room, &msg), b"\x08\x04\x12\x02\x18\x01\x18\x38");

        // empty optional submessage is dropped
        let msg = Message::new().with("lights", Message::new().with("on", false));
        assert_eq!(encode(&schema, room, &msg), hex!(""));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let (schema, ty) = single(
            MessageType::new("T").field(FieldDescriptor::scalar("list", 1, ScalarKind::Int32).repeated()),
        );
        let msg = Message::new().with("list", 1);
        assert_eq!(
            GenericEncoder::new(&schema).encode(ty, &msg, None).unwrap_err(),
            Error::TypeMismatch {
                field: "list".to_string(),
                expected: "list".to_string(),
                found: "i32"
            }
        );
    }

    #[test]
    fn unsigned_values_keep_magnitude_in_float_fields() {
        let (schema, ty) = single(
            MessageType::new("T")
                .field(FieldDescriptor::scalar("d", 1, ScalarKind::Double))
                .field(FieldDescriptor::scalar("f", 2, ScalarKind::Float)),
        );
        let msg = Message::new()
            .with("d", u64::MAX)
            .with("f", u64::MAX);
        assert_eq!(
            encode(&schema, ty, &msg),
            hex!("09000000000000f043 150000805f")
        );
    }

    fn nested_failures() -> (Schema, TypeId) {
        let mut builder = SchemaBuilder::new();
        let inner = builder
            .add(MessageType::new("C").field(FieldDescriptor::scalar("x", 1, ScalarKind::Int32)))
            .unwrap();
        let outer = builder
            .add(
                MessageType::new("T")
                    .field(FieldDescriptor::message("c", 1, "C", inner))
                    .field(FieldDescriptor::map(
                        "m",
                        2,
                        FieldType::Scalar(ScalarKind::Int32),
                        FieldType::Message {
                            name: "C".into(),
                            resolved: Some(inner),
                        },
                    ))
                    .field(FieldDescriptor::scalar("p", 3, ScalarKind::Int32).repeated().packed()),
            )
            .unwrap();
        (builder.build().unwrap(), outer)
    }

    #[test]
    fn failed_nested_encode_leaves_writer_balanced() {
        let (schema, ty) = nested_failures();
        let encoder = GenericEncoder::new(&schema);
        let bad = Message::new().with("x", "bad");
        let cases = [
            Message::new().with("c", bad.clone()),
            Message::new().with("m", Value::map([("1", bad)])),
            Message::new().with("m", Value::map([("one", Message::new())])),
            Message::new().with("p", Value::list([Value::I32(1), Value::Bool(true)])),
        ];
        for msg in &cases {
            let mut writer = Writer::new();
            writer.uint32(0x10).uint32(1);
            assert!(encoder.encode_into(ty, msg, &mut writer).is_err());
            assert_eq!(writer.depth(), 0);
            assert_eq!(writer.into_vec(), hex!("1001"));
        }
    }

    #[test]
    fn appends_to_given_writer() {
        let (schema, ty) = single(
            MessageType::new("T").field(FieldDescriptor::scalar("a", 1, ScalarKind::Int32)),
        );
        let mut writer = Writer::new();
        writer.uint32(0x10).uint32(1);
        let writer = GenericEncoder::new(&schema)
            .encode(ty, &Message::new().with("a", 2), Some(writer))
            .unwrap();
        assert_eq!(writer.into_vec(), hex!("1001 0802"));
    }
}
