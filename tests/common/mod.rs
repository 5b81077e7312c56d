//! A small protobuf wire reader used to check encoder output.
#![allow(dead_code)]

use std::collections::HashMap;

/// A mutable reader of an immutable data source
pub struct SliceReader<'x> {
    data: &'x [u8],
    pos: usize,
}

impl<'x> SliceReader<'x> {
    pub fn new(data: &'x [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn read(&mut self, n: usize) -> Option<&'x [u8]> {
        if self.data.len() - self.pos < n {
            return None;
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    pub fn read_varint(&mut self) -> Option<u64> {
        let mut out = 0u64;
        for shift in (0..70).step_by(7) {
            let byte = *self.read(1)?.first()?;
            out |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(out);
            }
        }
        None
    }
}

/// One decoded value, as it appears on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Varint(u64),
    I64(u64),
    Len(Vec<u8>),
    Group(Vec<(u32, Raw)>),
    I32(u32),
}

impl Raw {
    pub fn varint(&self) -> u64 {
        match self {
            Raw::Varint(v) => *v,
            other => panic!("expected varint, got {other:?}"),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Raw::Len(v) => v,
            other => panic!("expected length delimited, got {other:?}"),
        }
    }

    pub fn fields(&self) -> Fields {
        match self {
            Raw::Len(v) => decode(v),
            Raw::Group(fields) => Fields(fields.clone()),
            other => panic!("expected message, got {other:?}"),
        }
    }
}

/// Fields of a decoded message in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(pub Vec<(u32, Raw)>);

impl Fields {
    /// All values of field `id`, in wire order.
    pub fn all(&self, id: u32) -> Vec<&Raw> {
        self.0.iter().filter(|(n, _)| *n == id).map(|(_, v)| v).collect()
    }

    /// The last value of field `id`, the protobuf merge rule for singular fields.
    pub fn last(&self, id: u32) -> Option<&Raw> {
        self.0.iter().rev().find(|(n, _)| *n == id).map(|(_, v)| v)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.0.iter().map(|(n, _)| *n).collect()
    }

    /// Map entries of field `id` as (key, value) pairs.
    pub fn map_entries(&self, id: u32) -> Vec<(Raw, Raw)> {
        self.all(id)
            .into_iter()
            .map(|entry| {
                let entry = entry.fields();
                (
                    entry.last(1).cloned().expect("map key"),
                    entry.last(2).cloned().expect("map value"),
                )
            })
            .collect()
    }

    pub fn by_id(&self) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for (id, _) in &self.0 {
            *counts.entry(*id).or_default() += 1;
        }
        counts
    }
}

/// Decodes a complete message. Panics on malformed input.
pub fn decode(data: &[u8]) -> Fields {
    let mut reader = SliceReader::new(data);
    let fields = read_fields(&mut reader, None);
    assert!(reader.is_empty(), "trailing data");
    Fields(fields)
}

/// Decodes packed varints.
pub fn unpack_varints(data: &[u8]) -> Vec<u64> {
    let mut reader = SliceReader::new(data);
    let mut out = Vec::new();
    while !reader.is_empty() {
        out.push(reader.read_varint().expect("packed varint"));
    }
    out
}

pub fn from_zigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

fn read_fields(reader: &mut SliceReader, group: Option<u32>) -> Vec<(u32, Raw)> {
    let mut out = Vec::new();
    while !reader.is_empty() {
        let tag = reader.read_varint().expect("tag");
        let id = (tag >> 3) as u32;
        let value = match tag & 0x07 {
            0 => Raw::Varint(reader.read_varint().expect("varint")),
            1 => Raw::I64(u64::from_le_bytes(
                reader.read(8).expect("fixed64").try_into().unwrap(),
            )),
            2 => {
                let len = reader.read_varint().expect("length") as usize;
                Raw::Len(reader.read(len).expect("payload").to_vec())
            }
            3 => Raw::Group(read_fields(reader, Some(id))),
            4 => {
                assert_eq!(group, Some(id), "unbalanced end group");
                return out;
            }
            5 => Raw::I32(u32::from_le_bytes(
                reader.read(4).expect("fixed32").try_into().unwrap(),
            )),
            other => panic!("unsupported wire type {other}"),
        };
        out.push((id, value));
    }
    assert_eq!(group, None, "missing end group");
    out
}
