//! # Entity Handles
//!
//! Entities are lightweight identifiers consisting of:
//! - A slot index into the allocator's generation table
//! - A generation counter for safe slot reuse

use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Unique identifier for an entity.
///
/// A handle is a capability token: it carries no ownership and is checked
/// against the [`EntityAllocator`](super::EntityAllocator) every time it is
/// used. Two handles are equal iff both the slot and the generation match.
///
/// The layout is two plain `u32`s, so a slice of handles can be viewed as
/// bytes with [`bytemuck::cast_slice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
#[repr(C)]
pub struct EntityId {
    slot: u32,
    generation: u32,
}

impl EntityId {
    /// Null/invalid entity ID. Never issued by an allocator and never alive.
    pub const NULL: Self = Self {
        slot: u32::MAX,
        generation: u32::MAX,
    };

    /// Creates a new entity ID from slot and generation.
    ///
    /// # Arguments
    ///
    /// * `slot` - The slot index in the allocator
    /// * `generation` - The generation counter of that slot
    #[inline]
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Returns the slot portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.slot == u32::MAX && self.generation == u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("NULL")
        } else {
            write!(f, "{}#{}", self.slot, self.generation)
        }
    }
}
