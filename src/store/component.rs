//! # Component type registry
//!
//! Assigns a stable [`ComponentTypeId`] to each distinct component type on
//! first use and stores the per-type metadata and column constructors the
//! rest of the store needs to work with that type behind type erasure.
//!
//! ## Design
//! - Types are registered once and receive a compact id in
//!   `[0, MAX_COMPONENT_TYPES)`; registration is idempotent per type.
//! - A per-type column constructor (`fn` pointer, monomorphized at
//!   registration) is installed so chunks and pools can allocate columns for
//!   a signature without knowing any `T`.
//! - Registration consults the heat/alignment classifier and stores the
//!   effective classification on the descriptor.
//!
//! ## Invariants
//! - Ids are unique and stable for the lifetime of the process.
//! - At most [`MAX_COMPONENT_TYPES`] live types; the next registration fails
//!   with [`StoreError::RegistryExhausted`].
//!
//! ## Concurrency
//! The registry is process-wide behind `OnceLock<RwLock<..>>`: concurrent
//! reads, serialized writes. It is created once and never torn down during
//! normal operation; `reset_for_tests` exists for test isolation only.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::mem::{align_of, size_of};
use std::sync::{OnceLock, RwLock};

use bytemuck::Pod;
use tracing::debug;

use crate::store::chunk::{Column, TypeErasedColumn};
use crate::store::classify::{classify, ClassificationInfo};
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{ComponentTypeId, MAX_COMPONENT_TYPES};


/// Marker for types storable as component columns.
///
/// `Pod` supplies the fixed-size, copy-by-value contract the store assumes:
/// columns can be zero-initialized, moved with plain copies, and viewed as
/// raw bytes for serialization. Blanket-implemented; never implement by hand.
pub trait Component: Pod + Send + Sync {}

impl<T: Pod + Send + Sync> Component for T {}

/// Per-type column constructors installed at registration time.
///
/// This is the compile-time replacement for runtime code generation: each
/// registered type contributes one monomorphized `fn` pointer, and everything
/// downstream (chunk construction, pooling, migration) dispatches through it.
#[derive(Clone, Copy)]
pub(crate) struct ColumnOps {
    /// Builds an empty zero-initialized column with the given row capacity.
    pub new_column: fn(usize) -> Box<dyn TypeErasedColumn>,
}

fn new_column_for<T: Component>(capacity: usize) -> Box<dyn TypeErasedColumn> {
    Box::new(Column::<T>::new(capacity))
}

/// Describes one registered component type.
///
/// Immutable after assignment; `Copy` and safe to pass around freely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Runtime identifier assigned by the registry.
    pub id: ComponentTypeId,

    /// Type name for diagnostics and classifier lookup.
    pub name: &'static str,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Effective alignment in bytes (natural alignment, or the classifier
    /// override when stricter).
    pub align: usize,

    /// Runtime `TypeId`; `None` for dynamically described registrations.
    pub type_id: Option<TypeId>,

    /// Heat/alignment classification captured at registration.
    pub classification: ClassificationInfo,
}

struct Registry {
    next_id: ComponentTypeId,
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<&'static str, ComponentTypeId>,
    infos: Vec<Option<ComponentInfo>>,
    ops: Vec<Option<ColumnOps>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            next_id: 0,
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            infos: vec![None; MAX_COMPONENT_TYPES],
            ops: vec![None; MAX_COMPONENT_TYPES],
        }
    }

    fn alloc_id(&mut self) -> StoreResult<ComponentTypeId> {
        let id = self.next_id;
        if (id as usize) >= MAX_COMPONENT_TYPES {
            return Err(StoreError::RegistryExhausted {
                cap: MAX_COMPONENT_TYPES,
            });
        }
        self.next_id = id + 1;
        Ok(id)
    }
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Registers component type `T`, returning its descriptor.
///
/// Idempotent: re-registering a type returns the existing descriptor. The
/// first registration assigns the next free id, captures the classifier's
/// verdict for the type name, and installs the type's column constructor.
///
/// ## Errors
/// [`StoreError::RegistryExhausted`] once [`MAX_COMPONENT_TYPES`] distinct
/// types are live.
pub fn register_component<T: Component>() -> StoreResult<ComponentInfo> {
    let type_id = TypeId::of::<T>();

    {
        let registry = registry().read().unwrap();
        if let Some(&id) = registry.by_type.get(&type_id) {
            return Ok(registry.infos[id as usize].expect("registered id must carry a descriptor"));
        }
    }

    let mut registry = registry().write().unwrap();

    // Re-check under the write lock; another thread may have won the race.
    if let Some(&id) = registry.by_type.get(&type_id) {
        return Ok(registry.infos[id as usize].expect("registered id must carry a descriptor"));
    }

    let id = registry.alloc_id()?;
    let name = type_name::<T>();
    let classification = classify(name);

    let info = ComponentInfo {
        id,
        name,
        size: size_of::<T>(),
        align: align_of::<T>().max(classification.alignment),
        type_id: Some(type_id),
        classification,
    };

    registry.by_type.insert(type_id, id);
    registry.by_name.insert(name, id);
    registry.infos[id as usize] = Some(info);
    registry.ops[id as usize] = Some(ColumnOps {
        new_column: new_column_for::<T>,
    });

    debug!(component = name, id, size = info.size, "registered component type");
    Ok(info)
}

/// Registers a dynamically described component type by name.
///
/// Used for components whose layout is only known at runtime (FFI and test
/// harnesses). Raw registrations consume an id and participate in signatures,
/// but carry no column constructor: chunks cannot be built for signatures
/// containing them.
///
/// ## Errors
/// [`StoreError::RegistryExhausted`] once the id space is full.
pub fn register_raw(name: &'static str, size: usize, align: usize) -> StoreResult<ComponentInfo> {
    let mut registry = registry().write().unwrap();

    if let Some(&id) = registry.by_name.get(name) {
        return Ok(registry.infos[id as usize].expect("registered id must carry a descriptor"));
    }

    let id = registry.alloc_id()?;
    let classification = classify(name);

    let info = ComponentInfo {
        id,
        name,
        size,
        align: align.max(classification.alignment),
        type_id: None,
        classification,
    };

    registry.by_name.insert(name, id);
    registry.infos[id as usize] = Some(info);

    debug!(component = name, id, "registered raw component type");
    Ok(info)
}

/// Returns the descriptor for `T`.
///
/// ## Errors
/// [`StoreError::ComponentNotFound`] if `T` was never registered.
pub fn component_info_of<T: Component>() -> StoreResult<ComponentInfo> {
    let registry = registry().read().unwrap();
    registry
        .by_type
        .get(&TypeId::of::<T>())
        .and_then(|&id| registry.infos[id as usize])
        .ok_or(StoreError::ComponentNotFound {
            name: type_name::<T>(),
        })
}

/// Returns the descriptor for a component id, if registered.
pub fn component_info_by_id(id: ComponentTypeId) -> Option<ComponentInfo> {
    let registry = registry().read().unwrap();
    registry.infos.get(id as usize).copied().flatten()
}

/// Number of currently registered component types.
pub fn registered_count() -> usize {
    registry().read().unwrap().next_id as usize
}

pub(crate) fn column_ops(id: ComponentTypeId) -> StoreResult<ColumnOps> {
    let registry = registry().read().unwrap();
    registry
        .ops
        .get(id as usize)
        .copied()
        .flatten()
        .ok_or_else(|| {
            let name = registry.infos[id as usize].map(|i| i.name).unwrap_or("<unregistered>");
            StoreError::ComponentNotFound { name }
        })
}

/// Clears the registry, releasing all ids.
///
/// Test/diagnostic use only: not safe to call while any manager, chunk, or
/// cached function handle built against the old ids is still in use.
pub fn reset_components_for_tests() {
    let mut registry = registry().write().unwrap();
    *registry = Registry::new();
}
