//! Archetypes: one storage partition per distinct signature.
//!
//! An [`Archetype`] pairs a permanent [`BitSet`] signature with the ordered
//! list of chunks holding every row whose attribute set is exactly that
//! signature. Exactly one archetype exists per signature at a time; the
//! manager creates them lazily on first use and never merges or splits them.
//! Chunks within an archetype may be emptied and returned to the pool, but
//! only from the tail of the list so `(chunk, slot)` records stay stable.

use crate::store::chunk::ArchetypeChunk;
use crate::store::error::StoreResult;
use crate::store::pool::ChunkPool;
use crate::store::types::BitSet;


/// A signature plus the ordered chunks storing its rows.
pub struct Archetype {
    signature: BitSet,
    chunks: Vec<ArchetypeChunk>,
}

impl Archetype {
    pub(crate) fn new(signature: BitSet) -> Self {
        Self {
            signature,
            chunks: Vec::new(),
        }
    }

    /// The permanent signature identifying this archetype.
    #[inline]
    pub fn signature(&self) -> &BitSet {
        &self.signature
    }

    /// Number of chunks currently owned (including empty non-tail chunks).
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// All chunks, in storage order.
    #[inline]
    pub fn chunks(&self) -> &[ArchetypeChunk] {
        &self.chunks
    }

    /// Total number of rows across all chunks.
    pub fn entity_count(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.count()).sum()
    }

    /// Returns `true` if this archetype's signature is a superset of `mask`.
    #[inline]
    pub fn matches(&self, mask: &BitSet) -> bool {
        self.signature.has_all(mask)
    }

    pub(crate) fn chunk(&self, index: usize) -> &ArchetypeChunk {
        &self.chunks[index]
    }

    pub(crate) fn chunk_mut(&mut self, index: usize) -> &mut ArchetypeChunk {
        &mut self.chunks[index]
    }

    /// Index of a chunk with a free row, renting a new chunk from the pool
    /// when every existing one is full.
    ///
    /// ## Errors
    /// Propagates chunk-construction failures from the pool (signatures
    /// containing raw-registered components have no column constructors).
    pub(crate) fn chunk_with_room(
        &mut self,
        pool: &mut ChunkPool,
        capacity: usize,
    ) -> StoreResult<usize> {
        if let Some(index) = self.chunks.iter().position(|chunk| chunk.has_room()) {
            return Ok(index);
        }
        let chunk = pool.rent(&self.signature, capacity)?;
        self.chunks.push(chunk);
        Ok(self.chunks.len() - 1)
    }

    /// Returns trailing empty chunks to the pool.
    ///
    /// Only the tail is released: removing an interior chunk would shift the
    /// indices stored in entity location records.
    pub(crate) fn release_trailing_empty(&mut self, pool: &mut ChunkPool) {
        while self.chunks.last().map(|chunk| chunk.is_empty()).unwrap_or(false) {
            let chunk = self.chunks.pop().expect("tail chunk checked above");
            pool.return_chunk(chunk);
        }
    }
}
