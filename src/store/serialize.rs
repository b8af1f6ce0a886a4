//! Tiered serializer/deserializer function handles and byte streams.
//!
//! Components encode as their raw field bytes in declaration order — the
//! fixed-size native layout the `Pod` bound guarantees, with no padding
//! beyond natural field alignment. The size-prefixed tier frames each record
//! as an `i32` byte count (native endian) followed by the payload, enabling
//! self-describing streams and cross-record skipping.
//!
//! Like the access handles, each factory yields a `Copy` struct of
//! monomorphized `fn` pointers, generated once per component type and cached
//! process-wide.
//!
//! ## Failure policy
//!
//! * `plain` serialization is infallible (the writer grows as needed).
//! * `validated` tiers additionally check stream state: a writer past its
//!   configured limit or a fully exhausted reader fails with
//!   `InvalidHandle`.
//! * Every deserializer tier fails with `CorruptData` when fewer bytes
//!   remain than the type requires; the size-prefixed tier also fails with
//!   `CorruptData` when the declared size disagrees with the component's
//!   byte size.

use std::mem::size_of;

use crate::store::component::Component;
use crate::store::error::{StoreError, StoreResult};


/// Growable byte sink for component serialization.
pub struct ByteWriter {
    buffer: Vec<u8>,
    limit: Option<usize>,
}

impl ByteWriter {
    /// Creates an unbounded writer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            limit: None,
        }
    }

    /// Creates a writer that the validated tier refuses to grow past
    /// `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Appends raw bytes without checking the limit.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Appends raw bytes, honoring the configured limit.
    ///
    /// ## Errors
    /// [`StoreError::InvalidHandle`] if the write would exceed the limit.
    pub fn try_write_bytes(&mut self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(limit) = self.limit {
            if self.buffer.len() + bytes.len() > limit {
                return Err(StoreError::InvalidHandle("byte writer past its limit"));
            }
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// View of the written bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, yielding its buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor over a byte source for component deserialization.
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader over `data`, positioned at the start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Current read offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Consumes and returns the next `len` bytes.
    ///
    /// ## Errors
    /// [`StoreError::CorruptData`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> StoreResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(StoreError::CorruptData {
                reason: "source ended early",
                expected: len,
                found: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }
}

/// Serialization handles for component type `T`, one per tier.
#[derive(Clone, Copy)]
pub struct SerializerSet<T: Component> {
    /// Writes the raw field bytes; never fails.
    pub plain: fn(&T, &mut ByteWriter),

    /// Writes the raw field bytes, honoring the writer's limit.
    pub validated: fn(&T, &mut ByteWriter) -> StoreResult<()>,

    /// Writes an `i32` byte-count prefix followed by the raw field bytes.
    pub size_prefixed: fn(&T, &mut ByteWriter),
}

/// Deserialization handles for component type `T`, one per tier.
#[derive(Clone, Copy)]
pub struct DeserializerSet<T: Component> {
    /// Reads `size_of::<T>()` raw bytes.
    pub plain: fn(&mut ByteReader<'_>) -> StoreResult<T>,

    /// Reads raw bytes after checking the reader still has content.
    pub validated: fn(&mut ByteReader<'_>) -> StoreResult<T>,

    /// Reads and verifies the `i32` size prefix, then the payload.
    pub size_prefixed: fn(&mut ByteReader<'_>) -> StoreResult<T>,
}

fn plain_serialize<T: Component>(value: &T, writer: &mut ByteWriter) {
    writer.write_bytes(bytemuck::bytes_of(value));
}

fn validated_serialize<T: Component>(value: &T, writer: &mut ByteWriter) -> StoreResult<()> {
    writer.try_write_bytes(bytemuck::bytes_of(value))
}

fn size_prefixed_serialize<T: Component>(value: &T, writer: &mut ByteWriter) {
    let len = size_of::<T>() as i32;
    writer.write_bytes(&len.to_ne_bytes());
    writer.write_bytes(bytemuck::bytes_of(value));
}

fn read_payload<T: Component>(reader: &mut ByteReader<'_>) -> StoreResult<T> {
    let bytes = reader.read_bytes(size_of::<T>())?;
    Ok(bytemuck::pod_read_unaligned(bytes))
}

fn plain_deserialize<T: Component>(reader: &mut ByteReader<'_>) -> StoreResult<T> {
    read_payload::<T>(reader)
}

fn validated_deserialize<T: Component>(reader: &mut ByteReader<'_>) -> StoreResult<T> {
    if reader.remaining() == 0 {
        return Err(StoreError::InvalidHandle("byte reader exhausted"));
    }
    read_payload::<T>(reader)
}

fn size_prefixed_deserialize<T: Component>(reader: &mut ByteReader<'_>) -> StoreResult<T> {
    let prefix = reader.read_bytes(size_of::<i32>())?;
    let declared = i32::from_ne_bytes(prefix.try_into().expect("prefix read is four bytes"));

    if declared < 0 || declared as usize != size_of::<T>() {
        return Err(StoreError::CorruptData {
            reason: "size prefix mismatch",
            expected: size_of::<T>(),
            found: declared.max(0) as usize,
        });
    }

    read_payload::<T>(reader)
}

/// Builds the serializer tier set for `T`.
pub fn make_serializer_set<T: Component>() -> SerializerSet<T> {
    SerializerSet {
        plain: plain_serialize::<T>,
        validated: validated_serialize::<T>,
        size_prefixed: size_prefixed_serialize::<T>,
    }
}

/// Builds the deserializer tier set for `T`.
pub fn make_deserializer_set<T: Component>() -> DeserializerSet<T> {
    DeserializerSet {
        plain: plain_deserialize::<T>,
        validated: validated_deserialize::<T>,
        size_prefixed: size_prefixed_deserialize::<T>,
    }
}
