//! Entity lifecycle and archetype orchestration.
//!
//! [`EntityManager`] owns the dense entity table, the free-list/generation
//! counter, the signature→archetype map, and the chunk pool. It is the only
//! type that performs **structural mutation**: creating and destroying
//! entities, and migrating rows between archetypes when components are added
//! or removed.
//!
//! ## Concurrency model
//!
//! Structural mutation is single-writer by construction: every structural
//! operation takes `&mut self`, so the borrow checker enforces the
//! discipline the design requires. Read-only iteration and the parallel
//! batch APIs (`&self`) assume storage is structurally stable for the
//! duration of the call.
//!
//! ## Migration
//!
//! Adding or removing a component computes the destination signature,
//! locates or lazily creates the destination archetype, rents a chunk with
//! room, copies every shared column value into the new row, swap-removes the
//! old row (repairing the displaced entity's record), and updates the moved
//! entity's location. Removing an entity's **last** component migrates it
//! back to the empty-signature archetype — only [`destroy_entity`] frees the
//! id slot.
//!
//! [`destroy_entity`]: EntityManager::destroy_entity

use std::collections::HashMap;
use std::sync::Mutex;

use bytemuck::Zeroable;
use tracing::debug;

use crate::store::archetype::Archetype;
use crate::store::cache::{cached_accessors, cached_setters};
use crate::store::chunk::ArchetypeChunk;
use crate::store::component::{component_info_of, register_component, Component};
use crate::store::error::{StoreError, StoreResult};
use crate::store::pool::{ArrayPool, ChunkPool, PoolReport, PoolStats};
use crate::store::types::{BitSet, ComponentTypeId, EntityId, CHUNK_CAPACITY};


/// Aggregate counters exposed to presentation and diagnostics layers.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreStatistics {
    /// Live entities.
    pub total_entities: usize,

    /// Distinct archetypes created so far.
    pub total_archetypes: usize,

    /// Chunks currently owned by archetypes.
    pub total_chunks: usize,

    /// Freed entity slots awaiting reuse.
    pub reusable_ids: usize,

    /// Chunk pool usage.
    pub chunk_pool: PoolReport,

    /// Array pool usage.
    pub array_pool: PoolReport,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct EntityRecord {
    pub(crate) generation: u32,
    pub(crate) alive: bool,
    pub(crate) archetype: usize,
    pub(crate) chunk: usize,
    pub(crate) slot: usize,
}

/// Top-level orchestrator over entities, archetypes, chunks, and pools.
pub struct EntityManager {
    records: Vec<EntityRecord>,
    free: Vec<u32>,
    archetypes: Vec<Archetype>,
    by_signature: HashMap<BitSet, usize>,
    chunk_pool: ChunkPool,
    pub(crate) array_pool: Mutex<ArrayPool>,
    chunk_capacity: usize,
}

impl EntityManager {
    /// Creates a manager using the default chunk capacity.
    pub fn new() -> Self {
        Self::with_chunk_capacity(CHUNK_CAPACITY)
    }

    /// Creates a manager whose chunks hold `chunk_capacity` rows.
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        let mut manager = Self {
            records: Vec::new(),
            free: Vec::new(),
            archetypes: Vec::new(),
            by_signature: HashMap::new(),
            chunk_pool: ChunkPool::new(),
            array_pool: Mutex::new(ArrayPool::new()),
            chunk_capacity: chunk_capacity.max(1),
        };
        // The empty-signature archetype is where fresh entities live.
        manager.ensure_archetype(BitSet::new());
        manager
    }

    fn ensure_archetype(&mut self, signature: BitSet) -> usize {
        if let Some(&index) = self.by_signature.get(&signature) {
            return index;
        }
        let index = self.archetypes.len();
        self.by_signature.insert(signature, index);
        self.archetypes.push(Archetype::new(signature));
        debug!(archetype = index, components = signature.count_ones(), "created archetype");
        index
    }

    pub(crate) fn record(&self, entity: EntityId) -> StoreResult<EntityRecord> {
        let record = self
            .records
            .get(entity.index as usize)
            .ok_or(StoreError::InvalidHandle("unknown entity index"))?;
        if !record.alive || record.generation != entity.generation {
            return Err(StoreError::InvalidHandle("stale or dead entity"));
        }
        Ok(*record)
    }

    pub(crate) fn chunk_mut_at(&mut self, archetype: usize, chunk: usize) -> &mut ArchetypeChunk {
        self.archetypes[archetype].chunk_mut(chunk)
    }

    /// Creates a new entity in the empty-signature archetype.
    ///
    /// Freed slots are reused with their bumped generation, so handles to
    /// the slot's previous occupant no longer resolve.
    pub fn create_entity(&mut self) -> StoreResult<EntityId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.records.len() as u32;
                self.records.push(EntityRecord::default());
                index
            }
        };

        let generation = self.records[index as usize].generation;
        let entity = EntityId { index, generation };

        let archetype_index = self.ensure_archetype(BitSet::new());
        let capacity = self.chunk_capacity;
        let chunk_index =
            self.archetypes[archetype_index].chunk_with_room(&mut self.chunk_pool, capacity)?;
        let slot = self.archetypes[archetype_index]
            .chunk_mut(chunk_index)
            .add_entity(entity)?;

        self.records[index as usize] = EntityRecord {
            generation,
            alive: true,
            archetype: archetype_index,
            chunk: chunk_index,
            slot,
        };
        Ok(entity)
    }

    /// Destroys an entity, returning its id slot to the free list with the
    /// generation incremented.
    ///
    /// ## Errors
    /// [`StoreError::InvalidHandle`] if the handle is stale or dead.
    pub fn destroy_entity(&mut self, entity: EntityId) -> StoreResult<()> {
        let record = self.record(entity)?;
        self.remove_row(record)?;

        let slot_record = &mut self.records[entity.index as usize];
        slot_record.alive = false;
        slot_record.generation = slot_record.generation.wrapping_add(1);
        self.free.push(entity.index);
        Ok(())
    }

    fn remove_row(&mut self, record: EntityRecord) -> StoreResult<()> {
        let displaced = self.archetypes[record.archetype]
            .chunk_mut(record.chunk)
            .remove_at(record.slot)?;

        if let Some(moved) = displaced {
            let moved_record = &mut self.records[moved.index as usize];
            moved_record.chunk = record.chunk;
            moved_record.slot = record.slot;
        }

        self.archetypes[record.archetype].release_trailing_empty(&mut self.chunk_pool);
        Ok(())
    }

    /// Moves an entity's row into the archetype matching `dest_signature`,
    /// copying every shared column value. Returns the destination
    /// `(archetype, chunk, slot)`.
    fn migrate_entity(
        &mut self,
        entity: EntityId,
        dest_signature: BitSet,
    ) -> StoreResult<(usize, usize, usize)> {
        let record = self.record(entity)?;
        let dest_index = self.ensure_archetype(dest_signature);
        let source_index = record.archetype;
        debug_assert_ne!(source_index, dest_index, "migration requires distinct signatures");

        let capacity = self.chunk_capacity;
        let (source, dest) = archetype_pair_mut(&mut self.archetypes, source_index, dest_index);

        let dest_chunk_index = dest.chunk_with_room(&mut self.chunk_pool, capacity)?;
        let dest_chunk = dest.chunk_mut(dest_chunk_index);
        let dest_slot = dest_chunk.add_entity(entity)?;

        let source_chunk = source.chunk(record.chunk);
        let source_signature = *source.signature();
        for id in source_signature.ones() {
            if dest_signature.is_set(id)? {
                dest_chunk.copy_slot_from_chunk(
                    source_chunk,
                    id as ComponentTypeId,
                    record.slot,
                    dest_slot,
                )?;
            }
        }

        let displaced = source.chunk_mut(record.chunk).remove_at(record.slot)?;
        if let Some(moved) = displaced {
            let moved_record = &mut self.records[moved.index as usize];
            moved_record.chunk = record.chunk;
            moved_record.slot = record.slot;
        }
        source.release_trailing_empty(&mut self.chunk_pool);

        self.records[entity.index as usize] = EntityRecord {
            generation: record.generation,
            alive: true,
            archetype: dest_index,
            chunk: dest_chunk_index,
            slot: dest_slot,
        };
        Ok((dest_index, dest_chunk_index, dest_slot))
    }

    /// Adds component `T` to an entity, migrating it to the widened
    /// archetype. If the entity already carries `T`, the value is set in
    /// place without migration.
    ///
    /// Registers `T` on first use.
    ///
    /// ## Errors
    /// `InvalidHandle` for stale handles; `RegistryExhausted` if `T` is the
    /// 257th distinct component type.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> StoreResult<()> {
        let info = register_component::<T>()?;
        let record = self.record(entity)?;

        let signature = *self.archetypes[record.archetype].signature();
        if signature.is_set(info.id as usize)? {
            return self.archetypes[record.archetype]
                .chunk_mut(record.chunk)
                .set::<T>(info.id, record.slot, value);
        }

        let mut dest_signature = signature;
        dest_signature.set(info.id as usize)?;

        let (archetype, chunk, slot) = self.migrate_entity(entity, dest_signature)?;
        self.archetypes[archetype].chunk_mut(chunk).set::<T>(info.id, slot, value)
    }

    /// Removes component `T` from an entity, migrating it to the narrowed
    /// archetype. The entity stays alive even when its last component is
    /// removed.
    ///
    /// ## Errors
    /// `ComponentNotFound` if the entity does not carry `T`;
    /// `InvalidHandle` for stale handles.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> StoreResult<()> {
        let info = component_info_of::<T>()?;
        let record = self.record(entity)?;

        let signature = *self.archetypes[record.archetype].signature();
        if !signature.is_set(info.id as usize)? {
            return Err(StoreError::ComponentNotFound { name: info.name });
        }

        let mut dest_signature = signature;
        dest_signature.clear(info.id as usize)?;
        self.migrate_entity(entity, dest_signature)?;
        Ok(())
    }

    /// Sets component `T` on an entity that already carries it, through the
    /// cached validated setter.
    ///
    /// ## Errors
    /// `ComponentNotFound` if the entity lacks `T`; `InvalidHandle` for
    /// stale handles.
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) -> StoreResult<()> {
        let info = component_info_of::<T>()?;
        let record = self.record(entity)?;
        let setters = cached_setters::<T>();
        (setters.validated)(
            self.archetypes[record.archetype].chunk_mut(record.chunk),
            info.id,
            record.slot,
            value,
        )
    }

    /// Reads component `T` from an entity through the cached validated
    /// accessor.
    ///
    /// ## Errors
    /// `ComponentNotFound` if the entity lacks `T`; `InvalidHandle` for
    /// stale handles.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> StoreResult<T> {
        let info = component_info_of::<T>()?;
        let record = self.record(entity)?;
        let accessors = cached_accessors::<T>();
        (accessors.validated)(
            self.archetypes[record.archetype].chunk(record.chunk),
            info.id,
            record.slot,
        )
    }

    /// Reads component `T`, returning the type's zero value when the entity
    /// lacks it (or the handle is stale). Never fails.
    pub fn get_component_or_default<T: Component>(&self, entity: EntityId) -> T {
        let Ok(info) = component_info_of::<T>() else {
            return T::zeroed();
        };
        let Ok(record) = self.record(entity) else {
            return T::zeroed();
        };
        let accessors = cached_accessors::<T>();
        (accessors.or_default)(
            self.archetypes[record.archetype].chunk(record.chunk),
            info.id,
            record.slot,
        )
    }

    /// Returns `true` if the entity is live and carries component `T`.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        let Ok(info) = component_info_of::<T>() else {
            return false;
        };
        let Ok(record) = self.record(entity) else {
            return false;
        };
        self.archetypes[record.archetype]
            .signature()
            .is_set(info.id as usize)
            .unwrap_or(false)
    }

    /// Adds component `T` when the entity lacks it, otherwise sets it in
    /// place. The upsert setter tier's entry point.
    ///
    /// ## Errors
    /// `InvalidHandle` for a stale or dead entity handle.
    pub(crate) fn upsert_component<T: Component>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> StoreResult<()> {
        self.record(entity)?;
        self.add_component(entity, value)
    }

    /// Returns `true` if the handle refers to a live entity.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.record(entity).is_ok()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.records.len() - self.free.len()
    }

    /// All archetypes, in creation order.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub(crate) fn matching_archetypes(&self, mask: &BitSet) -> impl Iterator<Item = &Archetype> + '_ {
        let mask = *mask;
        self.archetypes.iter().filter(move |archetype| archetype.matches(&mask))
    }

    /// Collects the ids of every live entity whose signature contains all
    /// bits of `mask`.
    pub fn entities_with(&self, mask: &BitSet) -> Vec<EntityId> {
        let mut out = Vec::new();
        for archetype in self.matching_archetypes(mask) {
            for chunk in archetype.chunks() {
                out.extend_from_slice(chunk.entities());
            }
        }
        out
    }

    /// Visits every non-empty chunk of every archetype matching `mask`.
    pub fn for_each_chunk(&self, mask: &BitSet, mut f: impl FnMut(&ArchetypeChunk)) {
        for archetype in self.matching_archetypes(mask) {
            for chunk in archetype.chunks().iter().filter(|chunk| !chunk.is_empty()) {
                f(chunk);
            }
        }
    }

    /// The chunk currently holding an entity's row.
    ///
    /// ## Errors
    /// `InvalidHandle` for stale handles.
    pub fn chunk_of(&self, entity: EntityId) -> StoreResult<&ArchetypeChunk> {
        let record = self.record(entity)?;
        Ok(self.archetypes[record.archetype].chunk(record.chunk))
    }

    /// Aggregate store statistics.
    pub fn statistics(&self) -> StoreStatistics {
        StoreStatistics {
            total_entities: self.entity_count(),
            total_archetypes: self.archetypes.len(),
            total_chunks: self.archetypes.iter().map(|archetype| archetype.chunk_count()).sum(),
            reusable_ids: self.free.len(),
            chunk_pool: self.chunk_pool.report(),
            array_pool: self.array_pool.lock().unwrap().report(),
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Disjoint mutable references to two distinct archetypes.
///
/// ## Panics
/// Panics if `a == b`.
fn archetype_pair_mut(
    archetypes: &mut [Archetype],
    a: usize,
    b: usize,
) -> (&mut Archetype, &mut Archetype) {
    assert!(a != b);

    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = archetypes.split_at_mut(high);

    let left = &mut head[low];
    let right = &mut tail[0];

    if a < b {
        (left, right)
    } else {
        (right, left)
    }
}
