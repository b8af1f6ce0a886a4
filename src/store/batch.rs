//! Batch partitioning and parallel bulk processing.
//!
//! Bulk transformation runs in two phases so user callbacks never touch
//! storage internals from worker threads:
//!
//! 1. **Load** — the manager walks every matching archetype chunk on the
//!    calling thread and pre-fetches `(EntityId, components...)` tuples into
//!    a pooled buffer through the cached raw accessors.
//! 2. **Process** — the tuple buffer is partitioned into batch ranges and
//!    the caller's closure runs over those ranges on the rayon pool.
//!
//! The write-back variants add a third phase: new values collected during
//! the parallel phase are committed sequentially through the cached
//! validated setters, preserving the storage's single-writer discipline.
//!
//! Within one batch range entities are visited in slot order; no ordering
//! holds across ranges assigned to different workers. Storage must be
//! structurally stable for the duration of a call — the batch APIs take the
//! manager by reference and must not race structural mutation.

use std::ops::Range;

use rayon::prelude::*;

use crate::store::cache::{cached_accessors, cached_setters};
use crate::store::component::{component_info_of, Component};
use crate::store::error::StoreResult;
use crate::store::manager::EntityManager;
use crate::store::types::{BitSet, EntityId};


/// Smallest batch size the sizing heuristic will recommend.
pub const MIN_BATCH_SIZE: usize = 64;

/// Partitions `0..total` into consecutive ranges of at most `batch_size`
/// elements, covering every index exactly once. The final range may be
/// shorter. A zero `batch_size` is treated as 1.
pub fn compute_batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch = batch_size.max(1);
    let mut ranges = Vec::with_capacity(total.div_ceil(batch));
    let mut start = 0;
    while start < total {
        let end = (start + batch).min(total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Heuristic batch size for `total` elements over `workers` workers:
/// `ceil(total / workers)` clamped to [`MIN_BATCH_SIZE`]. Any positive batch
/// size is equally valid input to the processing APIs.
pub fn recommended_batch_size(total: usize, workers: usize) -> usize {
    let workers = workers.max(1);
    total.div_ceil(workers).max(MIN_BATCH_SIZE)
}

/// Number of worker threads the processing APIs can use.
pub fn max_parallelism() -> usize {
    rayon::current_num_threads()
}

impl EntityManager {
    fn load_tuples1<A: Component>(&self) -> StoreResult<Vec<(EntityId, A)>> {
        let info = component_info_of::<A>()?;
        let accessors = cached_accessors::<A>();
        let mask = BitSet::from_bits(&[info.id as usize])?;

        let mut tuples = self
            .array_pool
            .lock()
            .unwrap()
            .rent::<(EntityId, A)>(self.entity_count());

        for archetype in self.matching_archetypes(&mask) {
            for chunk in archetype.chunks() {
                for slot in 0..chunk.count() {
                    let entity = chunk.entities()[slot];
                    tuples.push((entity, (accessors.raw)(chunk, info.id, slot)));
                }
            }
        }
        Ok(tuples)
    }

    fn load_tuples2<A: Component, B: Component>(&self) -> StoreResult<Vec<(EntityId, A, B)>> {
        let info_a = component_info_of::<A>()?;
        let info_b = component_info_of::<B>()?;
        let accessors_a = cached_accessors::<A>();
        let accessors_b = cached_accessors::<B>();
        let mask = BitSet::from_bits(&[info_a.id as usize, info_b.id as usize])?;

        let mut tuples = self
            .array_pool
            .lock()
            .unwrap()
            .rent::<(EntityId, A, B)>(self.entity_count());

        for archetype in self.matching_archetypes(&mask) {
            for chunk in archetype.chunks() {
                for slot in 0..chunk.count() {
                    let entity = chunk.entities()[slot];
                    tuples.push((
                        entity,
                        (accessors_a.raw)(chunk, info_a.id, slot),
                        (accessors_b.raw)(chunk, info_b.id, slot),
                    ));
                }
            }
        }
        Ok(tuples)
    }

    /// Runs `f` once for every entity carrying component `A`, in parallel
    /// batches of `batch_size`. Returns the number of entities processed.
    ///
    /// Storage must be structurally stable for the duration of the call.
    pub fn par_process1<A, F>(&self, batch_size: usize, f: F) -> StoreResult<usize>
    where
        A: Component,
        F: Fn(EntityId, A) + Send + Sync,
    {
        let tuples = self.load_tuples1::<A>()?;
        let processed = tuples.len();

        compute_batch_ranges(tuples.len(), batch_size)
            .into_par_iter()
            .for_each(|range| {
                for &(entity, a) in &tuples[range] {
                    f(entity, a);
                }
            });

        self.array_pool.lock().unwrap().give_back(tuples);
        Ok(processed)
    }

    /// Runs `f` once for every entity carrying components `A` and `B`, in
    /// parallel batches of `batch_size`. Returns the number of entities
    /// processed.
    pub fn par_process2<A, B, F>(&self, batch_size: usize, f: F) -> StoreResult<usize>
    where
        A: Component,
        B: Component,
        F: Fn(EntityId, A, B) + Send + Sync,
    {
        let tuples = self.load_tuples2::<A, B>()?;
        let processed = tuples.len();

        compute_batch_ranges(tuples.len(), batch_size)
            .into_par_iter()
            .for_each(|range| {
                for &(entity, a, b) in &tuples[range] {
                    f(entity, a, b);
                }
            });

        self.array_pool.lock().unwrap().give_back(tuples);
        Ok(processed)
    }

    /// Computes a replacement value of `A` for every entity carrying it,
    /// in parallel, then commits all writes sequentially through the cached
    /// validated setter. Returns the number of entities transformed.
    pub fn par_transform1<A, F>(&mut self, batch_size: usize, f: F) -> StoreResult<usize>
    where
        A: Component,
        F: Fn(EntityId, A) -> A + Send + Sync,
    {
        let tuples = self.load_tuples1::<A>()?;
        let processed = tuples.len();

        let mut batches: Vec<Vec<(EntityId, A)>> = Vec::new();
        compute_batch_ranges(tuples.len(), batch_size)
            .into_par_iter()
            .map(|range| {
                tuples[range]
                    .iter()
                    .map(|&(entity, a)| (entity, f(entity, a)))
                    .collect()
            })
            .collect_into_vec(&mut batches);

        self.array_pool.lock().unwrap().give_back(tuples);

        let info = component_info_of::<A>()?;
        let setters = cached_setters::<A>();
        for batch in batches {
            for (entity, value) in batch {
                let record = self.record(entity)?;
                (setters.validated)(
                    self.chunk_mut_at(record.archetype, record.chunk),
                    info.id,
                    record.slot,
                    value,
                )?;
            }
        }
        Ok(processed)
    }

    /// Two-component variant of [`par_transform1`]: `f` returns the
    /// replacement `(A, B)` pair per entity; writes commit sequentially
    /// after the parallel phase.
    ///
    /// [`par_transform1`]: EntityManager::par_transform1
    pub fn par_transform2<A, B, F>(&mut self, batch_size: usize, f: F) -> StoreResult<usize>
    where
        A: Component,
        B: Component,
        F: Fn(EntityId, A, B) -> (A, B) + Send + Sync,
    {
        let tuples = self.load_tuples2::<A, B>()?;
        let processed = tuples.len();

        let mut batches: Vec<Vec<(EntityId, A, B)>> = Vec::new();
        compute_batch_ranges(tuples.len(), batch_size)
            .into_par_iter()
            .map(|range| {
                tuples[range]
                    .iter()
                    .map(|&(entity, a, b)| {
                        let (new_a, new_b) = f(entity, a, b);
                        (entity, new_a, new_b)
                    })
                    .collect()
            })
            .collect_into_vec(&mut batches);

        self.array_pool.lock().unwrap().give_back(tuples);

        let info_a = component_info_of::<A>()?;
        let info_b = component_info_of::<B>()?;
        let setters_a = cached_setters::<A>();
        let setters_b = cached_setters::<B>();
        for batch in batches {
            for (entity, a, b) in batch {
                let record = self.record(entity)?;
                (setters_a.validated)(
                    self.chunk_mut_at(record.archetype, record.chunk),
                    info_a.id,
                    record.slot,
                    a,
                )?;
                (setters_b.validated)(
                    self.chunk_mut_at(record.archetype, record.chunk),
                    info_b.id,
                    record.slot,
                    b,
                )?;
            }
        }
        Ok(processed)
    }
}
