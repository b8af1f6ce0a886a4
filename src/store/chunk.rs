//! Fixed-capacity columnar chunk storage.
//!
//! An [`ArchetypeChunk`] is the unit of storage for one archetype: a
//! fixed-capacity block holding one contiguous array per component type in
//! the archetype's signature, a parallel entity-id array, and an occupied
//! count. Rows live at `(chunk, slot)` coordinates; all storage below `count`
//! is dense and valid.
//!
//! # Storage model
//!
//! Each component type contributes a [`Column<T>`], a zero-initialized
//! `Box<[T]>` of `capacity` rows. Because components are
//! [`Component`](crate::store::component::Component) (`Pod`), columns can be
//! allocated zeroed, rows move with plain copies, and byte views are safe
//! casts — no uninitialized memory is ever exposed.
//!
//! # Core operations
//!
//! - **Insert**: [`ArchetypeChunk::add_entity`] claims the next slot; fails
//!   with `CapacityExceeded` when the chunk is full.
//! - **Remove**: [`ArchetypeChunk::remove_at`] deletes a row in O(1) by
//!   copying the last occupied row into the removed slot (swap-remove),
//!   reporting which entity moved so the caller can fix its record.
//! - **Access**: [`ArchetypeChunk::get`]/[`ArchetypeChunk::set`] perform
//!   direct indexed column reads/writes, validated against the count and the
//!   chunk's signature.
//!
//! These operations preserve dense packing but not element order.
//!
//! # Invariants
//!
//! - `count <= capacity` at all times.
//! - `entities[0..count)` and every column's `[0..count)` region hold valid
//!   rows; nothing at or past `count` is ever read.
//! - Slots at or past `count` may hold stale values from earlier occupants —
//!   a chunk rented from the pool is logically empty but is **not**
//!   re-zeroed.
//!
//! # Type erasure
//!
//! [`TypeErasedColumn`] lets archetype and pool code manage heterogeneous
//! columns behind trait objects: element identity, downcasting hooks, raw
//! byte views, and the slot-move operations migration needs. Typed access
//! succeeds only when the requested type matches the column's element type.

use std::any::{type_name, Any, TypeId};

use bytemuck::Zeroable;

use crate::store::component::{column_ops, Component};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{BitSet, ComponentTypeId, EntityId};


/// Type-erased interface over one component column.
///
/// Implementations must keep `[0, capacity)` fully initialized (zeroed at
/// construction) so every slot move is a plain copy. Typed views are only
/// handed out when the caller's type matches [`element_type_id`].
///
/// [`element_type_id`]: TypeErasedColumn::element_type_id
pub trait TypeErasedColumn: Any + Send + Sync {
    /// `TypeId` of the element type stored by this column.
    fn element_type_id(&self) -> TypeId;

    /// Human-readable name of the element type.
    fn element_type_name(&self) -> &'static str;

    /// Size of one element in bytes.
    fn element_size(&self) -> usize;

    /// Row capacity of the column.
    fn capacity(&self) -> usize;

    /// Immutable type-erased reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable type-erased reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Copies the element at `from` over the element at `to` within this
    /// column. Both slots must be below capacity.
    fn move_within(&mut self, from: usize, to: usize);

    /// Copies one element from `source` at `from` into `self` at `to`.
    ///
    /// ## Errors
    /// * [`StoreError::ComponentNotFound`] if `source` stores a different
    ///   element type.
    /// * [`StoreError::OutOfRange`] if either slot is out of capacity.
    fn copy_slot_from(
        &mut self,
        source: &dyn TypeErasedColumn,
        from: usize,
        to: usize,
    ) -> StoreResult<()>;

    /// Byte view over the first `count` elements.
    fn as_bytes(&self, count: usize) -> &[u8];

    /// Mutable byte view over the first `count` elements.
    fn as_bytes_mut(&mut self, count: usize) -> &mut [u8];
}

/// Contiguous storage for `capacity` elements of one component type.
pub struct Column<T: Component> {
    data: Box<[T]>,
}

impl<T: Component> Column<T> {
    /// Allocates a zero-initialized column with `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::zeroed(); capacity].into_boxed_slice(),
        }
    }

    /// The full backing slice, including slots past any occupied count.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable full backing slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Component> TypeErasedColumn for Column<T> {
    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn element_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn move_within(&mut self, from: usize, to: usize) {
        self.data[to] = self.data[from];
    }

    fn copy_slot_from(
        &mut self,
        source: &dyn TypeErasedColumn,
        from: usize,
        to: usize,
    ) -> StoreResult<()> {
        let source = source
            .as_any()
            .downcast_ref::<Column<T>>()
            .ok_or(StoreError::ComponentNotFound {
                name: type_name::<T>(),
            })?;

        if from >= source.data.len() {
            return Err(StoreError::OutOfRange {
                index: from,
                limit: source.data.len(),
            });
        }
        if to >= self.data.len() {
            return Err(StoreError::OutOfRange {
                index: to,
                limit: self.data.len(),
            });
        }

        self.data[to] = source.data[from];
        Ok(())
    }

    fn as_bytes(&self, count: usize) -> &[u8] {
        bytemuck::cast_slice(&self.data[..count])
    }

    fn as_bytes_mut(&mut self, count: usize) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data[..count])
    }
}

/// Fixed-capacity columnar block of rows sharing one signature.
///
/// A chunk belongs to exactly one archetype at a time; when returned to the
/// pool it is logically emptied (`count = 0`) but its backing arrays are
/// retained for reuse.
pub struct ArchetypeChunk {
    signature: BitSet,
    capacity: usize,
    count: usize,
    entities: Box<[EntityId]>,
    columns: Vec<(ComponentTypeId, Box<dyn TypeErasedColumn>)>,
}

impl ArchetypeChunk {
    /// Builds an empty chunk for `signature` using the registry's column
    /// constructors.
    ///
    /// ## Errors
    /// [`StoreError::ComponentNotFound`] if any component in the signature
    /// was registered without a column constructor (raw registration).
    pub(crate) fn build(signature: &BitSet, capacity: usize) -> StoreResult<Self> {
        let mut columns = Vec::with_capacity(signature.count_ones());
        for id in signature.ones() {
            let ops = column_ops(id as ComponentTypeId)?;
            columns.push((id as ComponentTypeId, (ops.new_column)(capacity)));
        }

        Ok(Self {
            signature: *signature,
            capacity,
            count: 0,
            entities: vec![EntityId::default(); capacity].into_boxed_slice(),
            columns,
        })
    }

    /// The signature this chunk stores rows for.
    #[inline]
    pub fn signature(&self) -> &BitSet {
        &self.signature
    }

    /// Row capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied rows.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if no row is occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` if another row can be inserted.
    #[inline]
    pub fn has_room(&self) -> bool {
        self.count < self.capacity
    }

    /// Returns `true` if every row is occupied.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// The occupied prefix of the entity-id array.
    #[inline]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities[..self.count]
    }

    /// Entity id at `slot`.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if `slot >= count`.
    pub fn entity_at(&self, slot: usize) -> StoreResult<EntityId> {
        if slot >= self.count {
            return Err(StoreError::OutOfRange {
                index: slot,
                limit: self.count,
            });
        }
        Ok(self.entities[slot])
    }

    /// Returns `true` if the chunk carries a column for `id`.
    #[inline]
    pub fn has_column(&self, id: ComponentTypeId) -> bool {
        self.column_index(id).is_some()
    }

    #[inline]
    fn column_index(&self, id: ComponentTypeId) -> Option<usize> {
        self.columns.binary_search_by_key(&id, |(cid, _)| *cid).ok()
    }

    pub(crate) fn column(&self, id: ComponentTypeId) -> Option<&dyn TypeErasedColumn> {
        self.column_index(id).map(|i| self.columns[i].1.as_ref())
    }

    pub(crate) fn column_mut(&mut self, id: ComponentTypeId) -> Option<&mut (dyn TypeErasedColumn + 'static)> {
        let index = self.column_index(id)?;
        Some(self.columns[index].1.as_mut())
    }

    /// Claims the next free slot for `entity`, returning its slot index.
    ///
    /// The new row's column values are whatever occupied the slot before
    /// (zero on a fresh chunk); callers overwrite them through setters or
    /// copiers.
    ///
    /// ## Errors
    /// [`StoreError::CapacityExceeded`] if the chunk is full.
    pub fn add_entity(&mut self, entity: EntityId) -> StoreResult<usize> {
        if self.count == self.capacity {
            return Err(StoreError::CapacityExceeded { cap: self.capacity });
        }
        let slot = self.count;
        self.entities[slot] = entity;
        self.count += 1;
        Ok(slot)
    }

    /// Removes the row at `slot` by swap-with-last.
    ///
    /// If the removed row was not the last occupied row, the last row's
    /// entity id and every column value are copied into `slot` and the
    /// displaced entity's id is returned so the caller can repair its
    /// location record. Density of `[0, count)` is preserved.
    ///
    /// ## Errors
    /// [`StoreError::OutOfRange`] if `slot >= count`.
    ///
    /// ## Complexity
    /// O(columns), independent of occupancy.
    pub fn remove_at(&mut self, slot: usize) -> StoreResult<Option<EntityId>> {
        if slot >= self.count {
            return Err(StoreError::OutOfRange {
                index: slot,
                limit: self.count,
            });
        }

        let last = self.count - 1;
        let displaced = if slot != last {
            self.entities[slot] = self.entities[last];
            for (_, column) in self.columns.iter_mut() {
                column.move_within(last, slot);
            }
            Some(self.entities[slot])
        } else {
            None
        };

        self.count = last;
        Ok(displaced)
    }

    /// Reads the component of type `T` at `slot`.
    ///
    /// ## Errors
    /// * [`StoreError::OutOfRange`] if `slot >= count`.
    /// * [`StoreError::ComponentNotFound`] if `id` is not in this chunk's
    ///   signature or stores a different type.
    pub fn get<T: Component>(&self, id: ComponentTypeId, slot: usize) -> StoreResult<T> {
        if slot >= self.count {
            return Err(StoreError::OutOfRange {
                index: slot,
                limit: self.count,
            });
        }
        Ok(self.typed_column::<T>(id)?.data()[slot])
    }

    /// Writes the component of type `T` at `slot`.
    ///
    /// ## Errors
    /// Same conditions as [`ArchetypeChunk::get`].
    pub fn set<T: Component>(&mut self, id: ComponentTypeId, slot: usize, value: T) -> StoreResult<()> {
        if slot >= self.count {
            return Err(StoreError::OutOfRange {
                index: slot,
                limit: self.count,
            });
        }
        self.typed_column_mut::<T>(id)?.data_mut()[slot] = value;
        Ok(())
    }

    /// Typed view over the occupied prefix of one column.
    ///
    /// ## Errors
    /// [`StoreError::ComponentNotFound`] if `id` is absent or stores a
    /// different type.
    pub fn column_slice<T: Component>(&self, id: ComponentTypeId) -> StoreResult<&[T]> {
        let count = self.count;
        Ok(&self.typed_column::<T>(id)?.data()[..count])
    }

    /// Mutable typed view over the occupied prefix of one column.
    ///
    /// ## Errors
    /// [`StoreError::ComponentNotFound`] if `id` is absent or stores a
    /// different type.
    pub fn column_slice_mut<T: Component>(&mut self, id: ComponentTypeId) -> StoreResult<&mut [T]> {
        let count = self.count;
        Ok(&mut self.typed_column_mut::<T>(id)?.data_mut()[..count])
    }

    // Raw-tier access: full-capacity slice, panics on a missing or mistyped
    // column. Callers own precondition validation.
    pub(crate) fn raw_column_slice<T: Component>(&self, id: ComponentTypeId) -> &[T] {
        self.typed_column::<T>(id)
            .expect("raw access to a column that is absent or mistyped")
            .data()
    }

    pub(crate) fn raw_column_slice_mut<T: Component>(&mut self, id: ComponentTypeId) -> &mut [T] {
        self.typed_column_mut::<T>(id)
            .expect("raw access to a column that is absent or mistyped")
            .data_mut()
    }

    fn typed_column<T: Component>(&self, id: ComponentTypeId) -> StoreResult<&Column<T>> {
        self.column(id)
            .and_then(|c| c.as_any().downcast_ref::<Column<T>>())
            .ok_or(StoreError::ComponentNotFound {
                name: type_name::<T>(),
            })
    }

    fn typed_column_mut<T: Component>(&mut self, id: ComponentTypeId) -> StoreResult<&mut Column<T>> {
        self.column_mut(id)
            .and_then(|c| c.as_any_mut().downcast_mut::<Column<T>>())
            .ok_or(StoreError::ComponentNotFound {
                name: type_name::<T>(),
            })
    }

    /// Copies the column value for `id` at `source[from]` into `self[to]`.
    ///
    /// Used by migration to move a row's shared columns between chunks.
    ///
    /// ## Errors
    /// [`StoreError::ComponentNotFound`] if either chunk lacks the column;
    /// [`StoreError::OutOfRange`] if a slot is out of capacity.
    pub(crate) fn copy_slot_from_chunk(
        &mut self,
        source: &ArchetypeChunk,
        id: ComponentTypeId,
        from: usize,
        to: usize,
    ) -> StoreResult<()> {
        let name = crate::store::component::component_info_by_id(id)
            .map(|info| info.name)
            .unwrap_or("<unregistered>");
        let source_column = source
            .column(id)
            .ok_or(StoreError::ComponentNotFound { name })?;
        let dest_column = self
            .column_mut(id)
            .ok_or(StoreError::ComponentNotFound { name })?;
        dest_column.copy_slot_from(source_column, from, to)
    }

    /// Logically empties the chunk, retaining all backing storage.
    ///
    /// Previous row contents are left in place; callers must not assume
    /// slots are cleared.
    pub(crate) fn reset_for_reuse(&mut self) {
        self.count = 0;
    }

    /// Estimated footprint of the chunk's backing storage in bytes.
    pub fn footprint_bytes(&self) -> usize {
        let column_bytes: usize = self
            .columns
            .iter()
            .map(|(_, c)| c.element_size() * c.capacity())
            .sum();
        column_bytes + self.capacity * std::mem::size_of::<EntityId>()
    }
}
