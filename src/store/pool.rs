//! Memory pools for chunks and generic backing arrays.
//!
//! Archetype migration and batch processing churn through chunks and scratch
//! arrays at high rates; both pools here exist to recycle those allocations
//! instead of handing them back to the allocator.
//!
//! Policy: pooled objects are reused, not re-zeroed beyond what callers
//! explicitly overwrite — renters must not assume previous contents are
//! cleared. Retention is bounded per bucket; buckets whose signature carries
//! a `Hot`-classified component are retained more aggressively.
//!
//! Neither pool is internally synchronized. The manager keeps the chunk pool
//! under its single-writer discipline and wraps the array pool in a `Mutex`
//! where worker-phase buffers are rented around a parallel region.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::trace;

use crate::store::chunk::ArchetypeChunk;
use crate::store::classify::Heat;
use crate::store::component::component_info_by_id;
use crate::store::error::StoreResult;
use crate::store::types::{BitSet, ComponentTypeId};


/// Aggregate usage statistics reported by every pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Total rent requests served.
    pub rents: u64,

    /// Rents satisfied from pooled storage rather than fresh allocation.
    pub reuses: u64,

    /// Objects handed back to the pool.
    pub returns: u64,

    /// Estimated bytes currently retained for reuse.
    pub bytes_retained: usize,
}

impl PoolReport {
    /// Folds another report into this one.
    pub fn merge(self, other: PoolReport) -> PoolReport {
        PoolReport {
            rents: self.rents + other.rents,
            reuses: self.reuses + other.reuses,
            returns: self.returns + other.returns,
            bytes_retained: self.bytes_retained + other.bytes_retained,
        }
    }
}

/// Unifying reporting facade over the pools.
pub trait PoolStats {
    /// Snapshot of the pool's aggregate statistics.
    fn report(&self) -> PoolReport;
}

/// Recycles archetype chunks, keyed by signature.
///
/// Rented chunks come back logically empty (`count == 0`) with their backing
/// arrays retained; column contents are stale until overwritten.
pub struct ChunkPool {
    buckets: HashMap<BitSet, Vec<ArchetypeChunk>>,
    base_retention: usize,
    rents: u64,
    reuses: u64,
    returns: u64,
    bytes_retained: usize,
}

/// Chunks retained per signature bucket before returns are dropped.
const CHUNK_RETENTION: usize = 8;

/// Retention multiplier for buckets containing a `Hot` component.
const HOT_RETENTION_FACTOR: usize = 4;

impl ChunkPool {
    /// Creates an empty pool with the default retention policy.
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            base_retention: CHUNK_RETENTION,
            rents: 0,
            reuses: 0,
            returns: 0,
            bytes_retained: 0,
        }
    }

    /// Returns a pooled chunk for `signature` if one with matching capacity
    /// exists, otherwise builds a fresh one from the registry's column
    /// constructors.
    ///
    /// ## Errors
    /// Chunk construction fails with `ComponentNotFound` when the signature
    /// contains a component registered without column constructors.
    pub fn rent(&mut self, signature: &BitSet, capacity: usize) -> StoreResult<ArchetypeChunk> {
        self.rents += 1;

        if let Some(bucket) = self.buckets.get_mut(signature) {
            if let Some(index) = bucket.iter().position(|chunk| chunk.capacity() == capacity) {
                let mut chunk = bucket.swap_remove(index);
                self.bytes_retained = self.bytes_retained.saturating_sub(chunk.footprint_bytes());
                chunk.reset_for_reuse();
                self.reuses += 1;
                trace!(capacity, "chunk pool reuse");
                return Ok(chunk);
            }
        }

        trace!(capacity, "chunk pool fresh allocation");
        ArchetypeChunk::build(signature, capacity)
    }

    /// Hands a chunk back for reuse.
    ///
    /// The chunk is retained up to the bucket's retention cap (larger for
    /// signatures carrying a `Hot` component) and dropped past it.
    pub fn return_chunk(&mut self, mut chunk: ArchetypeChunk) {
        self.returns += 1;
        chunk.reset_for_reuse();

        let cap = if signature_is_hot(chunk.signature()) {
            self.base_retention * HOT_RETENTION_FACTOR
        } else {
            self.base_retention
        };

        let bucket = self.buckets.entry(*chunk.signature()).or_default();
        if bucket.len() < cap {
            self.bytes_retained += chunk.footprint_bytes();
            bucket.push(chunk);
            trace!("chunk pool retained return");
        }
        // Past the cap the chunk simply drops.
    }

    /// Number of chunks currently held for reuse.
    pub fn pooled_chunks(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }
}

impl Default for ChunkPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolStats for ChunkPool {
    fn report(&self) -> PoolReport {
        PoolReport {
            rents: self.rents,
            reuses: self.reuses,
            returns: self.returns,
            bytes_retained: self.bytes_retained,
        }
    }
}

fn signature_is_hot(signature: &BitSet) -> bool {
    signature.ones().any(|id| {
        component_info_by_id(id as ComponentTypeId)
            .map(|info| info.classification.heat == Heat::Hot)
            .unwrap_or(false)
    })
}

/// Recycles backing arrays, keyed by element type and size bucket.
///
/// Requested lengths round up to a power-of-two bucket so arrays of similar
/// size share a free list.
pub struct ArrayPool {
    buckets: HashMap<(TypeId, usize), Vec<Box<dyn Any + Send>>>,
    rents: u64,
    reuses: u64,
    returns: u64,
    bytes_retained: usize,
}

const ARRAY_RETENTION: usize = 8;
const MIN_ARRAY_BUCKET: usize = 64;

fn bucket_for(len: usize) -> usize {
    len.next_power_of_two().max(MIN_ARRAY_BUCKET)
}

impl ArrayPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            rents: 0,
            reuses: 0,
            returns: 0,
            bytes_retained: 0,
        }
    }

    /// Rents an empty `Vec<T>` with capacity for at least `min_len`
    /// elements.
    pub fn rent<T: Send + 'static>(&mut self, min_len: usize) -> Vec<T> {
        self.rents += 1;
        let key = (TypeId::of::<T>(), bucket_for(min_len));

        if let Some(boxed) = self.buckets.get_mut(&key).and_then(|bucket| bucket.pop()) {
            let mut vec = *boxed
                .downcast::<Vec<T>>()
                .expect("array pool bucket keyed by element type");
            self.bytes_retained = self
                .bytes_retained
                .saturating_sub(vec.capacity() * std::mem::size_of::<T>());
            vec.clear();
            if vec.capacity() < min_len {
                vec.reserve(min_len);
            }
            self.reuses += 1;
            return vec;
        }

        Vec::with_capacity(key.1)
    }

    /// Hands an array back for reuse. Contents are dropped; capacity is
    /// retained up to the bucket's retention cap.
    pub fn give_back<T: Send + 'static>(&mut self, mut vec: Vec<T>) {
        self.returns += 1;
        vec.clear();

        let key = (TypeId::of::<T>(), bucket_for(vec.capacity().max(1)));
        let bucket = self.buckets.entry(key).or_default();
        if bucket.len() < ARRAY_RETENTION {
            self.bytes_retained += vec.capacity() * std::mem::size_of::<T>();
            bucket.push(Box::new(vec));
        }
    }

    /// Number of arrays currently held for reuse.
    pub fn pooled_arrays(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }
}

impl Default for ArrayPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolStats for ArrayPool {
    fn report(&self) -> PoolReport {
        PoolReport {
            rents: self.rents,
            reuses: self.reuses,
            returns: self.returns,
            bytes_retained: self.bytes_retained,
        }
    }
}
