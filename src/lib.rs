//! A protobuf encoder driven by message schemas resolved at runtime.
//!
//! Messages are plain [`Message`] instances (field name to [`Value`]) and their
//! layout comes from a [`Schema`] of [`MessageType`] descriptors, so no code has
//! to be generated ahead of time for a `.proto` file.
//!
//! Two encoders produce byte-identical output:
//!
//! - [`GenericEncoder`] walks the field descriptors on every call
//! - [`CompiledEncoder`] runs a per-type step table in which tags, wire types,
//!   field shapes and defaults were decided once by [`generate`]
//!
//! [`Codec`] ties both together and caches compiled encoders per type.
//!
//! ## Supported
//!
//! - All scalar types (varint, zigzag, fixed 32/64 bit, float/double, bool, string, bytes)
//! - Enums (encoded as `uint32`)
//! - Embedded messages and groups
//! - Repeated fields, packed and unpacked
//! - Maps with integer, bool and string keys
//! - Oneofs with an explicit discriminator
//! - Default elision for singular fields, `required` fields always written
//!
//! ## Non goals
//!
//! - Decoding
//! - Text or JSON formats
//! - Resolving `.proto` files into descriptors
//!
//! ## Example
//!
//! ```
//! use schemabuf::{Codec, FieldDescriptor, Message, MessageType, ScalarKind, SchemaBuilder};
//!
//! let mut builder = SchemaBuilder::new();
//! let lights = builder
//!     .add(MessageType::new("Lights").field(FieldDescriptor::scalar("on", 3, ScalarKind::Bool)))
//!     .unwrap();
//! let room = builder
//!     .add(
//!         MessageType::new("Room")
//!             .field(FieldDescriptor::scalar("number", 1, ScalarKind::Uint64))
//!             .field(FieldDescriptor::message("lights", 2, "Lights", lights))
//!             .field(FieldDescriptor::scalar("size", 3, ScalarKind::Uint64)),
//!     )
//!     .unwrap();
//! let codec = Codec::new(builder.build().unwrap());
//!
//! let message = Message::new()
//!     .with("number", 4u64)
//!     .with("lights", Message::new().with("on", true))
//!     .with("size", 56u64);
//! let bytes = codec.encode_to_vec(room, &message).unwrap();
//! assert_eq!(bytes, b"\x08\x04\x12\x02\x18\x01\x18\x38");
//! ```

mod classify;
mod codec;
mod config;
mod encode;
mod error;
mod generate;
mod long;
mod schema;
mod value;
mod varint;
mod writer;

pub use classify::tag;
pub use codec::Codec;
pub use config::{Config, Strategy};
pub use encode::GenericEncoder;
pub use error::{Error, Result};
pub use generate::{generate, CompiledEncoder};
pub use long::{long_ne, LongBits};
pub use schema::{
    FieldDescriptor, FieldType, MessageType, OneofDescriptor, ScalarKind, Schema, SchemaBuilder,
    TypeId, WireType,
};
pub use value::{Message, Value};
pub use writer::Writer;
