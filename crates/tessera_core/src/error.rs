//! # Error Types
//!
//! Expected absence (no component, stale handle on a query) is reported with
//! `bool` / `Option`. The types here cover the other two cases:
//!
//! - [`EcsError`]: a "required" accessor was called against a precondition
//!   the caller can recover from.
//! - [`InvariantViolation`]: the sparse/dense structure of a storage is
//!   corrupt. Never recovered from; debug builds panic with it.

use thiserror::Error;

use crate::ecs::{component_name, Component, EntityId};

/// Recoverable errors returned by required accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The handle is not alive (destroyed, stale, null, or never issued).
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),

    /// The entity is alive but has no component of the requested type.
    #[error("entity {entity} has no component {component}")]
    MissingComponent {
        /// The entity that was queried.
        entity: EntityId,
        /// Type name of the missing component.
        component: &'static str,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EcsError {
    /// Builds an [`EcsError::MissingComponent`] for component type `C`.
    #[must_use]
    pub fn missing_component<C: Component>(entity: EntityId) -> Self {
        Self::MissingComponent {
            entity,
            component: component_name::<C>(),
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Structural corruption detected in a component storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Dense handle and payload arrays differ in length.
    #[error("dense arrays misaligned: {entities} handles, {payloads} payloads")]
    DenseLengthMismatch {
        /// Length of the dense handle array.
        entities: usize,
        /// Length of the dense payload array.
        payloads: usize,
    },

    /// A dense handle's slot lies outside the sparse table.
    #[error("dense position {position} holds slot {slot} beyond sparse length {sparse_len}")]
    SlotOutOfRange {
        /// The dense position.
        position: usize,
        /// The slot stored there.
        slot: u32,
        /// Current sparse table length.
        sparse_len: usize,
    },

    /// The sparse entry for a dense handle does not point back to it.
    #[error("sparse[{slot}] = {found:?}, expected dense position {position}")]
    BrokenBackPointer {
        /// The slot whose sparse entry is wrong.
        slot: u32,
        /// The dense position holding that slot.
        position: usize,
        /// What the sparse table holds (`None` = absent).
        found: Option<u32>,
    },

    /// A sparse entry points past the end of the dense arrays.
    #[error("sparse[{slot}] = {position} is past dense length {dense_len}")]
    DanglingSparseEntry {
        /// The slot whose sparse entry dangles.
        slot: usize,
        /// The dense position it points to.
        position: u32,
        /// Current dense length.
        dense_len: usize,
    },

    /// A sparse entry points at a dense handle for a different slot.
    #[error("sparse[{slot}] points at dense position {position} owned by slot {owner}")]
    ForeignSparseEntry {
        /// The slot whose sparse entry is wrong.
        slot: usize,
        /// The dense position it points to.
        position: u32,
        /// The slot actually stored at that position.
        owner: u32,
    },
}
