//! Runtime message descriptors.
//!
//! Descriptors arrive fully resolved: every message-typed field points at its
//! child type through a [`TypeId`], enums are known by name only and defaults
//! are already filled in. [`SchemaBuilder`] is a thin assembly layer, it does no
//! name resolution of its own.

use std::collections::HashMap;
use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};
use crate::value::Value;

/// The protobuf wire types
///
/// <https://protobuf.dev/programming-guides/encoding/#structure>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WireType {
    /// Variable length field (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
    Varint = 0,
    /// 8 byte little endian (fixed64, sfixed64, double)
    I64 = 1,
    /// Lengths prefixed field (string, bytes, embedded messages, packed repeated fields)
    Len = 2,
    /// Group start
    SGroup = 3,
    /// Group end
    EGroup = 4,
    /// 4 byte little endian (fixed32, sfixed32, float)
    I32 = 5,
}

/// The scalar field types, named as in `.proto` files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Uint32,
    Sint32,
    Fixed32,
    Sfixed32,
    Int64,
    Uint64,
    Sint64,
    Fixed64,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    pub const fn wire_type(self) -> WireType {
        match self {
            ScalarKind::Double | ScalarKind::Fixed64 | ScalarKind::Sfixed64 => WireType::I64,
            ScalarKind::Float | ScalarKind::Fixed32 | ScalarKind::Sfixed32 => WireType::I32,
            ScalarKind::String | ScalarKind::Bytes => WireType::Len,
            _ => WireType::Varint,
        }
    }

    /// Whether repeated values of this kind may use packed encoding.
    pub const fn is_packable(self) -> bool {
        !matches!(self, ScalarKind::String | ScalarKind::Bytes)
    }

    /// The 64-bit integer kinds, whose defaults are compared as word pairs.
    pub const fn is_long(self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    /// Map keys may be any integer kind, bool or string.
    pub const fn is_map_key(self) -> bool {
        !matches!(
            self,
            ScalarKind::Double | ScalarKind::Float | ScalarKind::Bytes
        )
    }

    /// The proto3 zero value of this kind.
    pub fn zero(self) -> Value {
        match self {
            ScalarKind::Double => Value::F64(0.0),
            ScalarKind::Float => Value::F32(0.0),
            ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => Value::I32(0),
            ScalarKind::Uint32 | ScalarKind::Fixed32 => Value::U32(0),
            ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => Value::I64(0),
            ScalarKind::Uint64 | ScalarKind::Fixed64 => Value::U64(0),
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::Bytes => Value::Bytes(Vec::new()),
        }
    }
}

/// Handle of a message type inside a [`Schema`].
///
/// Handles are handed out before the type is defined, which is how recursive
/// schemas refer to themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The declared type of a field (or of a map key).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarKind),
    /// An enum type. Values are encoded as `uint32`.
    Enum(String),
    /// A message or group type. `resolved` is `None` when resolution failed.
    Message {
        name: String,
        resolved: Option<TypeId>,
    },
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(kind) => fmt::Display::fmt(kind, f),
            FieldType::Enum(name) | FieldType::Message { name, .. } => f.write_str(name),
        }
    }
}

/// A resolved field of a message type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) ty: FieldType,
    pub(crate) required: bool,
    pub(crate) repeated: bool,
    pub(crate) packed: bool,
    pub(crate) map_key: Option<FieldType>,
    pub(crate) default_value: Option<Value>,
    pub(crate) part_of: Option<usize>,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, id: u32, ty: FieldType) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            required: false,
            repeated: false,
            packed: false,
            map_key: None,
            default_value: None,
            part_of: None,
        }
    }

    /// A scalar field.
    ///
    /// ## Example
    ///
    /// ```
    /// # use schemabuf::{FieldDescriptor, ScalarKind};
    /// let numbers = FieldDescriptor::scalar("numbers", 5, ScalarKind::Int32)
    ///     .repeated()
    ///     .packed();
    /// assert_eq!(numbers.id(), 5);
    /// assert!(numbers.is_packed());
    /// ```
    pub fn scalar(name: impl Into<String>, id: u32, kind: ScalarKind) -> Self {
        Self::new(name, id, FieldType::Scalar(kind))
    }

    /// A field of the named enum type.
    pub fn enumeration(name: impl Into<String>, id: u32, enum_name: impl Into<String>) -> Self {
        Self::new(name, id, FieldType::Enum(enum_name.into()))
    }

    /// A message or group field resolved to `child`.
    pub fn message(
        name: impl Into<String>,
        id: u32,
        type_name: impl Into<String>,
        child: TypeId,
    ) -> Self {
        Self::new(
            name,
            id,
            FieldType::Message {
                name: type_name.into(),
                resolved: Some(child),
            },
        )
    }

    /// A message field whose type name could not be resolved.
    pub fn unresolved_message(
        name: impl Into<String>,
        id: u32,
        type_name: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            id,
            FieldType::Message {
                name: type_name.into(),
                resolved: None,
            },
        )
    }

    /// A map field from `key` to `value`.
    pub fn map(name: impl Into<String>, id: u32, key: FieldType, value: FieldType) -> Self {
        let mut field = Self::new(name, id, value);
        field.map_key = Some(key);
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Requests packed encoding. Ignored for kinds that cannot be packed.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    /// Overrides the zero default of a singular field.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[inline]
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        self.map_key.is_some()
    }

    pub fn map_key(&self) -> Option<&FieldType> {
        self.map_key.as_ref()
    }

    /// Index of the owning oneof within the message type, if any.
    #[inline]
    pub fn part_of(&self) -> Option<usize> {
        self.part_of
    }

    /// The value this field is compared against for default elision.
    ///
    /// Scalars default to their zero value and enums to `0`. Message fields
    /// have no default, so any present message differs from it.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(value) = &self.default_value {
            return Some(value.clone());
        }
        match &self.ty {
            FieldType::Scalar(kind) => Some(kind.zero()),
            FieldType::Enum(_) => Some(Value::EnumNumber(0)),
            FieldType::Message { .. } => None,
        }
    }
}

/// A set of fields sharing storage, at most one of which is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofDescriptor {
    name: String,
    fields: Vec<usize>,
}

impl OneofDescriptor {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Indices of the member fields in the owning [`MessageType`].
    pub fn fields(&self) -> &[usize] {
        &self.fields
    }
}

/// A message type: its fields in declaration order and its oneofs.
///
/// ## Example
///
/// ```
/// # use schemabuf::{FieldDescriptor, MessageType, ScalarKind};
/// let shape = MessageType::new("Shape")
///     .field(FieldDescriptor::scalar("name", 1, ScalarKind::String))
///     .field(FieldDescriptor::scalar("radius", 2, ScalarKind::Double))
///     .field(FieldDescriptor::scalar("side", 3, ScalarKind::Double))
///     .oneof("size", &["radius", "side"]);
/// assert_eq!(shape.fields()[2].part_of(), Some(0));
/// assert_eq!(shape.oneofs()[0].name(), "size");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType {
    name: String,
    fields: Vec<FieldDescriptor>,
    oneofs: Vec<OneofDescriptor>,
    group: bool,
}

impl MessageType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            oneofs: Vec::new(),
            group: false,
        }
    }

    /// A type encoded in the legacy group form when embedded.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            group: true,
            ..Self::new(name)
        }
    }

    /// Appends a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a oneof over already added fields.
    ///
    /// Names that match no field are skipped.
    pub fn oneof(mut self, name: impl Into<String>, members: &[&str]) -> Self {
        let index = self.oneofs.len();
        let mut fields = Vec::with_capacity(members.len());
        for member in members {
            if let Some(pos) = self.fields.iter().position(|f| f.name == *member) {
                self.fields[pos].part_of = Some(index);
                fields.push(pos);
            }
        }
        self.oneofs.push(OneofDescriptor {
            name: name.into(),
            fields,
        });
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        self.group
    }

    /// The oneof owning `field`, if any.
    pub fn oneof_of(&self, field: &FieldDescriptor) -> Option<&OneofDescriptor> {
        field.part_of.and_then(|index| self.oneofs.get(index))
    }
}

/// An immutable set of message types, addressed by [`TypeId`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: Vec<MessageType>,
    names: HashMap<String, TypeId>,
}

impl Schema {
    pub fn get(&self, id: TypeId) -> Result<&MessageType> {
        self.types.get(id.0).ok_or(Error::UnknownType(id))
    }

    pub fn type_id(&self, name: &str) -> Result<TypeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownTypeName(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (TypeId, &MessageType)> + '_ {
        self.types.iter().enumerate().map(|(i, ty)| (TypeId(i), ty))
    }
}

/// Assembles a [`Schema`].
///
/// ## Example
///
/// ```
/// # use schemabuf::{FieldDescriptor, MessageType, ScalarKind, SchemaBuilder};
/// // message Node { int32 value = 1; Node next = 2; }
/// let mut builder = SchemaBuilder::new();
/// let node = builder.reserve("Node");
/// builder
///     .define(
///         node,
///         MessageType::new("Node")
///             .field(FieldDescriptor::scalar("value", 1, ScalarKind::Int32))
///             .field(FieldDescriptor::message("next", 2, "Node", node)),
///     )
///     .unwrap();
/// let schema = builder.build().unwrap();
/// assert_eq!(schema.type_id("Node").unwrap(), node);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    slots: Vec<(String, Option<MessageType>)>,
    names: HashMap<String, TypeId>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `name`, allocating one if the name is new.
    pub fn reserve(&mut self, name: impl Into<String>) -> TypeId {
        let name = name.into();
        if let Some(id) = self.names.get(&name) {
            return *id;
        }
        let id = TypeId(self.slots.len());
        self.slots.push((name.clone(), None));
        self.names.insert(name, id);
        id
    }

    /// Fills a reserved slot.
    pub fn define(&mut self, id: TypeId, ty: MessageType) -> Result<()> {
        let (name, slot) = self.slots.get_mut(id.0).ok_or(Error::UnknownType(id))?;
        if slot.is_some() {
            return Err(Error::DuplicateType(name.clone()));
        }
        if ty.name != *name {
            self.names.entry(ty.name.clone()).or_insert(id);
        }
        *slot = Some(ty);
        Ok(())
    }

    /// Reserves and defines a type in one step.
    pub fn add(&mut self, ty: MessageType) -> Result<TypeId> {
        let id = self.reserve(ty.name.clone());
        self.define(id, ty)?;
        Ok(id)
    }

    /// Fails if a reserved type was never defined.
    pub fn build(self) -> Result<Schema> {
        let mut types = Vec::with_capacity(self.slots.len());
        for (name, slot) in self.slots {
            types.push(slot.ok_or(Error::UndefinedType(name))?);
        }
        Ok(Schema {
            types,
            names: self.names,
        })
    }
}
