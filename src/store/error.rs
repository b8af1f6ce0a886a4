//! Error types for storage, registration, and (de)serialization.
//!
//! One variant exists per failure mode the store can surface; each carries
//! enough structured context to make logs actionable without reproducing the
//! failure. `Display` messages are single-line and operator-oriented.
//!
//! ## Propagation policy
//!
//! * The **raw** function tiers never check and never report — callers own
//!   precondition validation on known-good internal paths.
//! * The **validated** tiers surface every precondition violation
//!   synchronously as one of these variants; nothing is retried internally.
//! * The **skipping** and **default-returning** tiers convert what would
//!   otherwise be errors into silent no-ops/defaults; that is policy, not a
//!   gap, and those tiers never construct a `StoreError` at all.

use thiserror::Error;


/// Result alias used throughout the store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Every failure the store can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A stale or dead entity handle, or an invalid stream state, was used
    /// where a live one was required.
    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// A slot or index addressed storage outside its valid region.
    #[error("index {index} out of range (limit {limit})")]
    OutOfRange {
        /// Offending index.
        index: usize,

        /// Exclusive upper bound that was violated.
        limit: usize,
    },

    /// A validated accessor or setter was invoked for a component the target
    /// does not carry, or the component type was never registered.
    #[error("component not found: {name}")]
    ComponentNotFound {
        /// Component type name for diagnostics.
        name: &'static str,
    },

    /// Deserialization found fewer bytes than the type requires, or a size
    /// prefix that disagrees with the component's byte size.
    #[error("corrupt data: {reason} (expected {expected} bytes, found {found})")]
    CorruptData {
        /// What check failed.
        reason: &'static str,

        /// Bytes the component type requires.
        expected: usize,

        /// Bytes actually available or declared.
        found: usize,
    },

    /// The component type registry is full.
    #[error("component registry exhausted ({cap} types)")]
    RegistryExhausted {
        /// Maximum number of registrable types.
        cap: usize,
    },

    /// An insert was attempted on a full chunk.
    #[error("chunk capacity exceeded ({cap} rows)")]
    CapacityExceeded {
        /// Row capacity of the chunk.
        cap: usize,
    },
}
