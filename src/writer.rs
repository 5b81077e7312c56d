use crate::schema::WireType;
use crate::varint::{to_zigzag32, to_zigzag64, unsigned_varint_encode, varint_len};

/// An append-only protobuf byte sink.
///
/// Every scalar writer appends exactly the wire representation of one value,
/// without a tag. Tags are written with [`Writer::uint32`] like any other varint.
///
/// Length-delimited regions are written through nested scopes: [`Writer::fork`]
/// opens a scope, [`Writer::ldelim`] closes it and splices its bytes into the
/// enclosing scope behind a varint length (optionally preceded by a tag), and
/// [`Writer::reset`] throws the open scope away.
///
/// ## Example
///
/// ```
/// # use schemabuf::Writer;
/// // field 2 holding an embedded message { 3: true }
/// let mut writer = Writer::new();
/// writer.fork();
/// writer.uint32(3 << 3).bool(true);
/// writer.ldelim(Some(2));
/// assert_eq!(writer.into_vec(), [0x12, 0x02, 0x18, 0x01]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    output: Vec<u8>,
    /// Enclosing scopes, innermost last.
    scopes: Vec<Vec<u8>>,
}

impl Writer {
    /// Creates an empty writer.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer whose root scope can hold `capacity` bytes
    /// before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: Vec::with_capacity(capacity),
            scopes: Vec::new(),
        }
    }

    /// Number of bytes written in the current scope.
    #[inline]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Number of scopes opened with [`Writer::fork`] and not yet closed.
    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Appends a uint32 varint. Tags are written with this too.
    ///
    /// ## Example
    ///
    /// ```
    /// # use schemabuf::Writer;
    /// // tag of field 1 (varint), then 150
    /// let mut writer = Writer::new();
    /// writer.uint32(1 << 3).uint32(150);
    /// assert_eq!(writer.into_vec(), [0x08, 0x96, 0x01]);
    /// ```
    pub fn uint32(&mut self, value: u32) -> &mut Self {
        unsigned_varint_encode(value.into(), &mut self.output);
        self
    }

    /// Appends an int32 varint. Negative values are sign extended to 64 bits
    /// and take 10 bytes, as protobuf requires.
    pub fn int32(&mut self, value: i32) -> &mut Self {
        unsigned_varint_encode(value as i64 as u64, &mut self.output);
        self
    }

    /// Appends a sint32 varint using zigzag encoding, so small negative values stay short.
    pub fn sint32(&mut self, value: i32) -> &mut Self {
        unsigned_varint_encode(to_zigzag32(value).into(), &mut self.output);
        self
    }

    /// Appends a fixed32 as 4 little endian bytes.
    pub fn fixed32(&mut self, value: u32) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a sfixed32 as 4 little endian bytes.
    pub fn sfixed32(&mut self, value: i32) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a float as 4 little endian bytes.
    pub fn float(&mut self, value: f32) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a uint64 varint.
    pub fn uint64(&mut self, value: u64) -> &mut Self {
        unsigned_varint_encode(value, &mut self.output);
        self
    }

    /// Appends an int64 varint. Negative values take 10 bytes.
    pub fn int64(&mut self, value: i64) -> &mut Self {
        unsigned_varint_encode(value as u64, &mut self.output);
        self
    }

    /// Appends a sint64 varint using zigzag encoding.
    ///
    /// ## Example
    ///
    /// ```
    /// # use schemabuf::Writer;
    /// let mut writer = Writer::new();
    /// writer.sint64(-1).sint64(1).sint64(-2);
    /// assert_eq!(writer.into_vec(), [0x01, 0x02, 0x03]);
    /// ```
    pub fn sint64(&mut self, value: i64) -> &mut Self {
        unsigned_varint_encode(to_zigzag64(value), &mut self.output);
        self
    }

    /// Appends a fixed64 as 8 little endian bytes.
    pub fn fixed64(&mut self, value: u64) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a sfixed64 as 8 little endian bytes.
    pub fn sfixed64(&mut self, value: i64) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a double as 8 little endian bytes.
    pub fn double(&mut self, value: f64) -> &mut Self {
        self.output.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a bool as a single varint byte.
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.output.push(value.into());
        self
    }

    /// Writes a length prefix followed by the raw bytes.
    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        unsigned_varint_encode(value.len() as u64, &mut self.output);
        self.output.extend_from_slice(value);
        self
    }

    /// Writes a length prefix followed by the UTF-8 bytes.
    #[inline]
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    /// Opens a nested scope. Subsequent writes go to the new scope until it is
    /// closed with [`Writer::ldelim`] or dropped with [`Writer::reset`].
    pub fn fork(&mut self) -> &mut Self {
        let outer = std::mem::take(&mut self.output);
        self.scopes.push(outer);
        self
    }

    /// Closes the current scope and appends it to the enclosing one as a
    /// length-delimited value. With `Some(field_number)` the tag
    /// `(field_number << 3) | 2` is written before the length.
    ///
    /// Called without an open scope, the whole root buffer is wrapped.
    pub fn ldelim(&mut self, field_number: Option<u32>) -> &mut Self {
        let payload = std::mem::replace(&mut self.output, self.scopes.pop().unwrap_or_default());
        let len = payload.len() as u64;
        let tag = field_number.map(|id| (id << 3) | WireType::Len as u32);
        self.output.reserve(
            tag.map_or(0, |tag| varint_len(tag.into())) + varint_len(len) + payload.len(),
        );
        if let Some(tag) = tag {
            unsigned_varint_encode(tag.into(), &mut self.output);
        }
        unsigned_varint_encode(len, &mut self.output);
        self.output.extend_from_slice(&payload);
        self
    }

    /// Drops everything written since the matching [`Writer::fork`].
    ///
    /// Called without an open scope, the root buffer is cleared.
    pub fn reset(&mut self) -> &mut Self {
        match self.scopes.pop() {
            Some(outer) => self.output = outer,
            None => self.output.clear(),
        }
        self
    }

    /// The bytes of the current scope.
    pub fn as_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Takes the writer and returns the encoded bytes.
    ///
    /// All scopes must be closed; scopes still open are discarded.
    pub fn into_vec(mut self) -> Vec<u8> {
        debug_assert!(self.scopes.is_empty(), "unbalanced fork");
        match self.scopes.drain(..).next() {
            Some(root) => root,
            None => self.output,
        }
    }
}
