//! # Archetype Store
//!
//! In-memory entity/component data store that groups records by their exact
//! attribute-set signature ("archetype"), packs them into fixed-capacity
//! columnar chunks, and serves per-frame simulation workloads with many
//! small records and very high query/iteration rates.
//!
//! ## Design Goals
//! - Archetype-partitioned SoA storage for cache efficiency
//! - O(1) insert/remove via swap-with-last dense packing
//! - Generate-once, reuse-forever typed function handles
//! - Allocation reuse through chunk and array pools
//! - Parallel bulk transformation without violating the storage's
//!   single-writer discipline

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod store;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use store::types::{
    BitSet,
    ComponentTypeId,
    EntityId,
    CHUNK_CAPACITY,
    MAX_COMPONENT_TYPES,
};

pub use store::error::{
    StoreError,
    StoreResult,
};

pub use store::component::{
    component_info_by_id,
    component_info_of,
    register_component,
    register_raw,
    registered_count,
    reset_components_for_tests,
    Component,
    ComponentInfo,
};

pub use store::classify::{
    classify,
    install_classification_overrides,
    reset_classification_for_tests,
    ClassificationInfo,
    Heat,
};

pub use store::chunk::{
    ArchetypeChunk,
    Column,
    TypeErasedColumn,
};

pub use store::archetype::Archetype;

pub use store::manager::{
    EntityManager,
    StoreStatistics,
};

pub use store::handles::{
    make_accessor_set,
    make_copier_set,
    make_setter_set,
    AccessorSet,
    CopierSet,
    SetterSet,
};

pub use store::serialize::{
    make_deserializer_set,
    make_serializer_set,
    ByteReader,
    ByteWriter,
    DeserializerSet,
    SerializerSet,
};

pub use store::cache::{
    cached_accessors,
    cached_copiers,
    cached_deserializers,
    cached_serializers,
    cached_setters,
    clear_all_function_caches,
};

pub use store::pool::{
    ArrayPool,
    ChunkPool,
    PoolReport,
    PoolStats,
};

pub use store::batch::{
    compute_batch_ranges,
    max_parallelism,
    recommended_batch_size,
    MIN_BATCH_SIZE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used store types.
///
/// Import with:
/// ```rust
/// use archetype_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        cached_accessors,
        cached_copiers,
        cached_deserializers,
        cached_serializers,
        cached_setters,
        register_component,
        BitSet,
        Component,
        EntityId,
        EntityManager,
        StoreError,
        StoreResult,
    };
}
