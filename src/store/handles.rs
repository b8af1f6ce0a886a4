//! Tiered accessor, setter, and copier function handles.
//!
//! Each factory here produces, for a concrete component type `T`, a small
//! `Copy` struct of **monomorphized `fn` pointers** — one per behavioral
//! tier. The pointers are generated once per type (the
//! [`cache`](crate::store::cache) module memoizes the sets process-wide) and
//! involve no per-call boxing or dynamic dispatch beyond the pointer itself.
//!
//! ## Tiers
//!
//! | Tier | Semantics | Failure policy |
//! |---|---|---|
//! | `raw` | direct chunk/slot read or write | caller owns preconditions; panics only past hard capacity |
//! | `validated` | checks slot bounds and component presence | typed [`StoreError`] |
//! | `or_default` (accessor) | zero value when absent or out of range | never fails |
//! | `upsert` (setter) | adds the component (migrating) when missing, else sets in place | fails only on `InvalidHandle` |
//! | `skipping` (copier) | silently performs no copy on any invalid index | never fails |
//!
//! The skipping copier's silent-skip policy is intentional and asymmetric
//! with the other tiers: bulk-copy loops depend on its no-fail guarantee.
//!
//! [`StoreError`]: crate::store::error::StoreError

use std::marker::PhantomData;

use bytemuck::Zeroable;

use crate::store::chunk::ArchetypeChunk;
use crate::store::component::Component;
use crate::store::error::StoreResult;
use crate::store::manager::EntityManager;
use crate::store::types::{ComponentTypeId, EntityId};


/// Read handles for component type `T`, one per tier.
#[derive(Clone, Copy)]
pub struct AccessorSet<T: Component> {
    /// Direct indexed read. Skips the occupancy check; the caller must have
    /// validated the slot. Panics if the column is absent or the slot is
    /// past hard capacity.
    pub raw: fn(&ArchetypeChunk, ComponentTypeId, usize) -> T,

    /// Checked read: fails with `OutOfRange` or `ComponentNotFound`.
    pub validated: fn(&ArchetypeChunk, ComponentTypeId, usize) -> StoreResult<T>,

    /// Returns `T`'s zero value instead of failing when the component is
    /// absent or the slot is invalid.
    pub or_default: fn(&ArchetypeChunk, ComponentTypeId, usize) -> T,
}

/// Write handles for component type `T`, one per tier.
#[derive(Clone, Copy)]
pub struct SetterSet<T: Component> {
    /// Direct indexed write. Same precondition contract as the raw accessor.
    pub raw: fn(&mut ArchetypeChunk, ComponentTypeId, usize, T),

    /// Checked write: fails with `OutOfRange` or `ComponentNotFound`.
    pub validated: fn(&mut ArchetypeChunk, ComponentTypeId, usize, T) -> StoreResult<()>,

    /// Adds the component to the entity (triggering archetype migration)
    /// when missing, otherwise sets it in place. Fails only with
    /// `InvalidHandle` for a stale or dead entity.
    pub upsert: fn(&mut EntityManager, EntityId, T) -> StoreResult<()>,
}

/// Cross-chunk copy handles for component type `T`, one per tier.
#[derive(Clone, Copy)]
pub struct CopierSet<T: Component> {
    /// Direct slot-to-slot copy. Caller owns preconditions.
    pub raw: fn(ComponentTypeId, &ArchetypeChunk, usize, &mut ArchetypeChunk, usize),

    /// Checked copy: fails with `OutOfRange` or `ComponentNotFound`.
    pub validated:
        fn(ComponentTypeId, &ArchetypeChunk, usize, &mut ArchetypeChunk, usize) -> StoreResult<()>,

    /// Bounds-skipping copy: if either index is negative or out of range,
    /// the copy is silently skipped — no error, no side effect.
    pub skipping: fn(ComponentTypeId, &ArchetypeChunk, isize, &mut ArchetypeChunk, isize),

    marker: PhantomData<fn(T)>,
}

fn raw_get<T: Component>(chunk: &ArchetypeChunk, id: ComponentTypeId, slot: usize) -> T {
    chunk.raw_column_slice::<T>(id)[slot]
}

fn validated_get<T: Component>(
    chunk: &ArchetypeChunk,
    id: ComponentTypeId,
    slot: usize,
) -> StoreResult<T> {
    chunk.get::<T>(id, slot)
}

fn default_get<T: Component>(chunk: &ArchetypeChunk, id: ComponentTypeId, slot: usize) -> T {
    chunk.get::<T>(id, slot).unwrap_or_else(|_| T::zeroed())
}

fn raw_set<T: Component>(chunk: &mut ArchetypeChunk, id: ComponentTypeId, slot: usize, value: T) {
    chunk.raw_column_slice_mut::<T>(id)[slot] = value;
}

fn validated_set<T: Component>(
    chunk: &mut ArchetypeChunk,
    id: ComponentTypeId,
    slot: usize,
    value: T,
) -> StoreResult<()> {
    chunk.set::<T>(id, slot, value)
}

fn upsert_set<T: Component>(
    manager: &mut EntityManager,
    entity: EntityId,
    value: T,
) -> StoreResult<()> {
    manager.upsert_component::<T>(entity, value)
}

fn raw_copy<T: Component>(
    id: ComponentTypeId,
    source: &ArchetypeChunk,
    from: usize,
    dest: &mut ArchetypeChunk,
    to: usize,
) {
    let value = source.raw_column_slice::<T>(id)[from];
    dest.raw_column_slice_mut::<T>(id)[to] = value;
}

fn validated_copy<T: Component>(
    id: ComponentTypeId,
    source: &ArchetypeChunk,
    from: usize,
    dest: &mut ArchetypeChunk,
    to: usize,
) -> StoreResult<()> {
    let value = source.get::<T>(id, from)?;
    dest.set::<T>(id, to, value)
}

fn skipping_copy<T: Component>(
    id: ComponentTypeId,
    source: &ArchetypeChunk,
    from: isize,
    dest: &mut ArchetypeChunk,
    to: isize,
) {
    if from < 0 || to < 0 {
        return;
    }
    let (from, to) = (from as usize, to as usize);
    if from >= source.count() || to >= dest.count() {
        return;
    }
    if let Ok(value) = source.get::<T>(id, from) {
        let _ = dest.set::<T>(id, to, value);
    }
}

/// Builds the accessor tier set for `T`.
pub fn make_accessor_set<T: Component>() -> AccessorSet<T> {
    AccessorSet {
        raw: raw_get::<T>,
        validated: validated_get::<T>,
        or_default: default_get::<T>,
    }
}

/// Builds the setter tier set for `T`.
pub fn make_setter_set<T: Component>() -> SetterSet<T> {
    SetterSet {
        raw: raw_set::<T>,
        validated: validated_set::<T>,
        upsert: upsert_set::<T>,
    }
}

/// Builds the copier tier set for `T`.
pub fn make_copier_set<T: Component>() -> CopierSet<T> {
    CopierSet {
        raw: raw_copy::<T>,
        validated: validated_copy::<T>,
        skipping: skipping_copy::<T>,
        marker: PhantomData,
    }
}
