use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;

use crate::classify::EncodeChild;
use crate::config::{Config, Strategy};
use crate::encode::GenericEncoder;
use crate::error::Result;
use crate::generate::{generate, CompiledEncoder};
use crate::schema::{Schema, TypeId};
use crate::value::Message;
use crate::writer::Writer;

/// Encodes messages of a [`Schema`] with either strategy.
///
/// Compiled encoders are generated lazily, once per type, and shared by all
/// threads using the codec. Generation is pure, so when two threads race on
/// the same type both may generate and the first insertion wins.
///
/// ## Example
///
/// ```
/// # use schemabuf::{Codec, FieldDescriptor, Message, MessageType, ScalarKind, SchemaBuilder, Value};
/// let mut builder = SchemaBuilder::new();
/// let ty = builder
///     .add(
///         MessageType::new("Sample")
///             .field(FieldDescriptor::scalar("values", 5, ScalarKind::Int32).repeated().packed()),
///     )
///     .unwrap();
/// let codec = Codec::new(builder.build().unwrap());
///
/// let message = Message::new().with("values", Value::list([1, 2, 3]));
/// let compiled = codec.encode_compiled(ty, &message, None).unwrap().into_vec();
/// let generic = codec.encode_generic(ty, &message, None).unwrap().into_vec();
/// assert_eq!(compiled, [0x2a, 0x03, 0x01, 0x02, 0x03]);
/// assert_eq!(compiled, generic);
/// ```
#[derive(Debug)]
pub struct Codec {
    schema: Arc<Schema>,
    config: Config,
    compiled: DashMap<TypeId, Arc<CompiledEncoder>>,
}

impl Codec {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_config(schema, Config::default())
    }

    pub fn with_config(schema: impl Into<Arc<Schema>>, config: Config) -> Self {
        Self {
            schema: schema.into(),
            config,
            compiled: DashMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Looks up a message type by name.
    pub fn type_id(&self, name: &str) -> Result<TypeId> {
        self.schema.type_id(name)
    }

    /// A fresh writer sized by [`Config::initial_capacity`].
    pub fn writer(&self) -> Writer {
        Writer::with_capacity(self.config.initial_capacity)
    }

    /// Encodes with the configured [`Strategy`].
    pub fn encode(&self, ty: TypeId, message: &Message, writer: Option<Writer>) -> Result<Writer> {
        match self.config.strategy {
            Strategy::Compiled => self.encode_compiled(ty, message, writer),
            Strategy::Generic => self.encode_generic(ty, message, writer),
        }
    }

    pub fn encode_generic(
        &self,
        ty: TypeId,
        message: &Message,
        writer: Option<Writer>,
    ) -> Result<Writer> {
        let mut writer = writer.unwrap_or_else(|| self.writer());
        GenericEncoder::new(&self.schema).encode_into(ty, message, &mut writer)?;
        Ok(writer)
    }

    pub fn encode_compiled(
        &self,
        ty: TypeId,
        message: &Message,
        writer: Option<Writer>,
    ) -> Result<Writer> {
        self.generate(ty)?.encode(self, message, writer)
    }

    /// Encodes with the configured strategy and returns the bytes.
    pub fn encode_to_vec(&self, ty: TypeId, message: &Message) -> Result<Vec<u8>> {
        Ok(self.encode(ty, message, None)?.into_vec())
    }

    /// Encodes `message` preceded by its length as a varint, the framing used
    /// for streams of messages.
    pub fn encode_length_delimited(
        &self,
        ty: TypeId,
        message: &Message,
        writer: Option<Writer>,
    ) -> Result<Writer> {
        let mut writer = writer.unwrap_or_else(|| self.writer());
        writer.fork();
        writer = self.encode(ty, message, Some(writer))?;
        writer.ldelim(None);
        Ok(writer)
    }

    /// Returns the compiled encoder of `ty`, generating and caching it on first use.
    ///
    /// A failed generation caches nothing.
    pub fn generate(&self, ty: TypeId) -> Result<Arc<CompiledEncoder>> {
        if let Some(encoder) = self.compiled.get(&ty) {
            return Ok(Arc::clone(encoder.value()));
        }

        let encoder = Arc::new(generate(&self.schema, ty)?);
        match self.compiled.entry(ty) {
            Entry::Occupied(existing) => {
                debug!("discarding duplicate encoder for {}", encoder.type_name());
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                debug!(
                    "compiled encoder for {} {} with {} steps",
                    encoder.type_name(),
                    ty,
                    encoder.len()
                );
                Ok(Arc::clone(slot.insert(encoder).value()))
            }
        }
    }

    /// Whether an encoder for `ty` is cached.
    pub fn is_compiled(&self, ty: TypeId) -> bool {
        self.compiled.contains_key(&ty)
    }

    /// Number of cached compiled encoders.
    pub fn compiled_count(&self) -> usize {
        self.compiled.len()
    }
}

impl EncodeChild for Codec {
    fn encode_child(&self, child: TypeId, message: &Message, writer: &mut Writer) -> Result<()> {
        self.generate(child)?.encode_into(self, message, writer)
    }
}
