use std::collections::HashMap;

use strum::IntoStaticStr;

/// A field value of a [`Message`] instance.
///
/// Numeric variants are converted to the field's kind when written, so an
/// `I32` may be stored in a `uint64` field and vice versa.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Value {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// The number of an enum value.
    EnumNumber(i32),
    Message(Message),
    /// Elements of a repeated field.
    List(Vec<Value>),
    /// Entries of a map field in insertion order, keyed by the key's text form.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Builds a [`Value::List`].
    pub fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    /// Builds a [`Value::Map`], keeping the iteration order.
    ///
    /// ## Example
    ///
    /// ```
    /// # use schemabuf::Value;
    /// let scores = Value::map([("alice", 3), ("bob", 5)]);
    /// assert_eq!(scores, Value::Map(vec![
    ///     ("alice".to_string(), Value::I32(3)),
    ///     ("bob".to_string(), Value::I32(5)),
    /// ]));
    /// ```
    pub fn map<K: ToString, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        self.into()
    }

    /// The integer held by any integer variant. 64-bit unsigned values keep
    /// their bit pattern.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::I32(v) | Value::EnumNumber(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U64(v) => Some(v as i64),
            _ => None,
        }
    }

    /// The number held by any numeric variant, as a double. Unsigned values
    /// convert by magnitude.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => Some(v as f64),
            _ => self.as_integer().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of a `Bytes` or `String` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            Value::String(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    Message => Message,
    Vec<Value> => List,
}

/// An instance of a message type: field values by name plus the selected
/// member of every oneof.
///
/// Oneof selection is explicit. A member value left behind after the
/// discriminator moved to a sibling is never encoded.
///
/// ## Example
///
/// ```
/// # use schemabuf::{Message, Value};
/// let shape = Message::new()
///     .with("name", "unit circle")
///     .with_oneof("size", "radius", 1.0);
/// assert_eq!(shape.which_oneof("size"), Some("radius"));
/// assert_eq!(shape.get("radius"), Some(&Value::F64(1.0)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: HashMap<String, Value>,
    /// oneof name -> selected member field name
    cases: HashMap<String, String>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field and returns the instance.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a oneof member, selects it and returns the instance.
    pub fn with_oneof(
        mut self,
        oneof: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.set_oneof(oneof, field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a oneof member and selects it. Values of sibling members are kept
    /// but no longer encoded.
    pub fn set_oneof(
        &mut self,
        oneof: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        let field = field.into();
        self.cases.insert(oneof.into(), field.clone());
        self.fields.insert(field, value.into());
        self
    }

    /// Moves the discriminator of `oneof` to `field` without touching values.
    pub fn select(&mut self, oneof: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.cases.insert(oneof.into(), field.into());
        self
    }

    /// Clears the selection of `oneof`, returning the previously selected member.
    pub fn clear_oneof(&mut self, oneof: &str) -> Option<String> {
        self.cases.remove(oneof)
    }

    /// The member selected for `oneof`.
    pub fn which_oneof(&self, oneof: &str) -> Option<&str> {
        self.cases.get(oneof).map(String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields with a value.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
