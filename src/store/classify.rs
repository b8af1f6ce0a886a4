//! Per-type heat/alignment classification.
//!
//! Chunk layout and pooling consult a small piece of metadata per component
//! type: how frequently it is accessed (`Hot`/`Cold`), whether it wants an
//! alignment stricter than its natural one, and whether it is intended for
//! SIMD-friendly iteration. The table is populated from an externally loaded
//! override source; this module only owns the resulting lookup. The types
//! derive `serde` traits so callers can deserialize an override table from
//! whatever format they load it from.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use serde::{Deserialize, Serialize};


/// Access-frequency class of a component type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heat {
    /// Touched on most frames; pooling keeps its storage around aggressively.
    Hot,

    /// Touched rarely; storage is reclaimed sooner.
    #[default]
    Cold,
}

/// Classification metadata for one component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationInfo {
    /// Access-frequency class.
    pub heat: Heat,

    /// Required alignment in bytes; `0` means the type's natural alignment.
    pub alignment: usize,

    /// Whether the type is laid out for SIMD-width iteration.
    pub simd: bool,
}

impl Default for ClassificationInfo {
    fn default() -> Self {
        Self {
            heat: Heat::Cold,
            alignment: 0,
            simd: false,
        }
    }
}

static OVERRIDES: OnceLock<RwLock<HashMap<String, ClassificationInfo>>> = OnceLock::new();

fn overrides() -> &'static RwLock<HashMap<String, ClassificationInfo>> {
    OVERRIDES.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Installs (replacing any previous table) the classification override table.
///
/// Keys are component type names as reported by
/// [`ComponentInfo::name`](crate::store::component::ComponentInfo). Types
/// absent from the table classify as the default (`Cold`, natural alignment,
/// no SIMD).
pub fn install_classification_overrides(table: HashMap<String, ClassificationInfo>) {
    let mut current = overrides().write().unwrap();
    *current = table;
}

/// Looks up the classification for a component type name.
///
/// Returns the default classification for unknown names; never fails.
pub fn classify(type_name: &str) -> ClassificationInfo {
    overrides()
        .read()
        .unwrap()
        .get(type_name)
        .copied()
        .unwrap_or_default()
}

/// Clears the override table.
///
/// Test/diagnostic use only; not safe to call concurrently with active
/// registration.
pub fn reset_classification_for_tests() {
    overrides().write().unwrap().clear();
}
