//! Process-wide function-handle cache.
//!
//! One independent map exists per function kind (accessor, setter, copier,
//! serializer, deserializer), each mapping a component type to its generated
//! handle set. Handles are generated at most once per type per kind and
//! reused for the lifetime of the process.
//!
//! ## Read path
//!
//! Lookups take an optimistic shared read lock. On a miss the kind's single
//! creation lock is acquired and the map is **re-checked** before generating
//! (double-checked pattern), so first-access races still produce exactly one
//! constructed set. Publication happens under the write lock; the lock
//! release is the memory barrier that makes the new entry visible to every
//! thread.
//!
//! This is the one structure in the store that is safe for unsynchronized
//! concurrent reads at any time. First-time misses serialize on the creation
//! lock, which is acceptable: each type is generated once and cached
//! forever.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, RwLock};

use tracing::debug;

use crate::store::component::Component;
use crate::store::handles::{
    make_accessor_set, make_copier_set, make_setter_set, AccessorSet, CopierSet, SetterSet,
};
use crate::store::serialize::{
    make_deserializer_set, make_serializer_set, DeserializerSet, SerializerSet,
};


type HandleMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

struct KindCache {
    kind: &'static str,
    map: RwLock<HandleMap>,
    creation: Mutex<()>,
}

impl KindCache {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            map: RwLock::new(HashMap::new()),
            creation: Mutex::new(()),
        }
    }

    fn get_or_build<S: Copy + Send + Sync + 'static>(&self, build: fn() -> S) -> S {
        let key = TypeId::of::<S>();

        if let Some(entry) = self.map.read().unwrap().get(&key) {
            return *entry.downcast_ref::<S>().expect("cache entry keyed by its own type");
        }

        let _creation = self.creation.lock().unwrap();

        // Another thread may have generated and published while we waited.
        if let Some(entry) = self.map.read().unwrap().get(&key) {
            return *entry.downcast_ref::<S>().expect("cache entry keyed by its own type");
        }

        debug!(kind = self.kind, "generating function handle set");
        let set = build();
        self.map.write().unwrap().insert(key, Box::new(set));
        set
    }

    fn clear(&self) {
        self.map.write().unwrap().clear();
    }
}

static ACCESSORS: OnceLock<KindCache> = OnceLock::new();
static SETTERS: OnceLock<KindCache> = OnceLock::new();
static COPIERS: OnceLock<KindCache> = OnceLock::new();
static SERIALIZERS: OnceLock<KindCache> = OnceLock::new();
static DESERIALIZERS: OnceLock<KindCache> = OnceLock::new();

fn accessors() -> &'static KindCache {
    ACCESSORS.get_or_init(|| KindCache::new("accessor"))
}

fn setters() -> &'static KindCache {
    SETTERS.get_or_init(|| KindCache::new("setter"))
}

fn copiers() -> &'static KindCache {
    COPIERS.get_or_init(|| KindCache::new("copier"))
}

fn serializers() -> &'static KindCache {
    SERIALIZERS.get_or_init(|| KindCache::new("serializer"))
}

fn deserializers() -> &'static KindCache {
    DESERIALIZERS.get_or_init(|| KindCache::new("deserializer"))
}

/// Cached accessor tier set for `T`, generated on first request.
pub fn cached_accessors<T: Component>() -> AccessorSet<T> {
    accessors().get_or_build(make_accessor_set::<T>)
}

/// Cached setter tier set for `T`, generated on first request.
pub fn cached_setters<T: Component>() -> SetterSet<T> {
    setters().get_or_build(make_setter_set::<T>)
}

/// Cached copier tier set for `T`, generated on first request.
pub fn cached_copiers<T: Component>() -> CopierSet<T> {
    copiers().get_or_build(make_copier_set::<T>)
}

/// Cached serializer tier set for `T`, generated on first request.
pub fn cached_serializers<T: Component>() -> SerializerSet<T> {
    serializers().get_or_build(make_serializer_set::<T>)
}

/// Cached deserializer tier set for `T`, generated on first request.
pub fn cached_deserializers<T: Component>() -> DeserializerSet<T> {
    deserializers().get_or_build(make_deserializer_set::<T>)
}

/// Resets every function-handle map.
///
/// Test/diagnostic use only — not safe to call concurrently with active
/// readers.
pub fn clear_all_function_caches() {
    accessors().clear();
    setters().clear();
    copiers().clear();
    serializers().clear();
    deserializers().clear();
}
