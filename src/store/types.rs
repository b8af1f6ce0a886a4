//! Core identifiers, the signature bitset, and layout constants.
//!
//! This module defines the **fundamental types and bit-level layouts** shared
//! by every other part of the store: entity handles, component type ids, the
//! fixed-width [`BitSet`] used both as an archetype's permanent signature and
//! as a transient query mask, and the capacity constants that size chunks and
//! the component id space.
//!
//! ## Design
//!
//! The store is built around:
//!
//! - **Dense columnar storage** addressed by `(chunk, slot)` coordinates,
//! - **Bitset signatures** with word-wise subset/intersection tests,
//! - **Stable small numeric identifiers** for component types,
//! - **Generation-tagged entity handles** for stale-reference detection.
//!
//! ## Entity representation
//!
//! An [`EntityId`] is a `{index, generation}` pair. `index` names a slot in
//! the manager's dense entity table; `generation` is bumped when the slot is
//! freed, so handles held across a destroy/reuse cycle stop resolving. Two
//! ids are equal iff both fields match. An `EntityId` is a lookup key, never
//! an owner of storage.
//!
//! ## Signatures
//!
//! Component sets are fixed 256-bit vectors stored as four `u64` words.
//! Signature comparison (`has_all`, `has_any`) is four word compares with no
//! allocation, which keeps archetype matching cheap enough to run per query.

use crate::store::error::{StoreError, StoreResult};


/// Unique identifier for a registered component type.
pub type ComponentTypeId = u16;

/// Maximum number of distinct component types the registry can hold.
pub const MAX_COMPONENT_TYPES: usize = 256;

/// Number of `u64` words backing a full [`BitSet`].
pub const SIGNATURE_WORDS: usize = MAX_COMPONENT_TYPES / 64;

/// Default number of rows per archetype chunk.
pub const CHUNK_CAPACITY: usize = 1024;

/// Handle identifying one live entity.
///
/// ## Semantics
/// * `index` — slot in the manager's dense entity table.
/// * `generation` — bumped each time the slot is freed; a handle whose
///   generation no longer matches the table is stale and resolves to nothing.
///
/// Two handles are equal iff both fields match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EntityId {
    /// Slot in the dense entity table.
    pub index: u32,

    /// Reuse counter for the slot.
    pub generation: u32,
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity {}v{}", self.index, self.generation)
    }
}

/// Fixed-width (256-bit) set over component type ids.
///
/// Used both as an archetype's permanent signature and as a transient query
/// mask. The width never changes; indexing at or past
/// [`MAX_COMPONENT_TYPES`] fails with [`StoreError::OutOfRange`].
///
/// ## Complexity
/// `set`/`clear`/`is_set` are O(1); `has_all`/`has_any` are word-wise
/// (four compares).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: [u64; SIGNATURE_WORDS],
}

impl BitSet {
    /// Creates an empty set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a list of bit indices.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if any index is `>= MAX_COMPONENT_TYPES`.
    pub fn from_bits(bits: &[usize]) -> StoreResult<Self> {
        let mut set = Self::default();
        for &bit in bits {
            set.set(bit)?;
        }
        Ok(set)
    }

    #[inline]
    fn split(index: usize) -> StoreResult<(usize, u64)> {
        if index >= MAX_COMPONENT_TYPES {
            return Err(StoreError::OutOfRange {
                index,
                limit: MAX_COMPONENT_TYPES,
            });
        }
        Ok((index / 64, 1u64 << (index % 64)))
    }

    /// Sets the bit at `index`.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    pub fn set(&mut self, index: usize) -> StoreResult<()> {
        let (word, mask) = Self::split(index)?;
        self.words[word] |= mask;
        Ok(())
    }

    /// Clears the bit at `index`.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    pub fn clear(&mut self, index: usize) -> StoreResult<()> {
        let (word, mask) = Self::split(index)?;
        self.words[word] &= !mask;
        Ok(())
    }

    /// Returns `true` if the bit at `index` is set.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if `index >= MAX_COMPONENT_TYPES`.
    #[inline]
    pub fn is_set(&self, index: usize) -> StoreResult<bool> {
        let (word, mask) = Self::split(index)?;
        Ok(self.words[word] & mask != 0)
    }

    /// Returns `true` if every bit set in `other` is also set in `self`
    /// (`self ⊇ other`).
    #[inline]
    pub fn has_all(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| (mine & theirs) == *theirs)
    }

    /// Returns `true` if the intersection with `other` is non-empty.
    #[inline]
    pub fn has_any(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(mine, theirs)| (mine & theirs) != 0)
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over all set bit indices in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(base + tz)
            })
        })
    }
}
