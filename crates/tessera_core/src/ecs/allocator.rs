//! # Entity Allocator
//!
//! Owns the authoritative generation table and the free list.
//!
//! ## Slot Lifecycle
//!
//! ```text
//! create  (new slot)      -> generation 0
//! destroy                 -> generation += 1, slot pushed to free list
//! create  (recycled slot) -> last freed slot, current generation
//! ```
//!
//! Slots are never removed from the table, so slot indices are stable for the
//! allocator's lifetime and generations never decrease.

use super::entity::EntityId;

/// Generation value that is never issued. A slot whose generation reaches it
/// is retired instead of recycled.
const RETIRED: u32 = u32::MAX;

/// Default reserve hint for the generation table.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Generational entity allocator.
///
/// Hands out [`EntityId`]s, recycles destroyed slots last-freed-first-reused,
/// and answers liveness queries in O(1).
///
/// # Example
///
/// ```rust
/// use tessera_core::EntityAllocator;
///
/// let mut entities = EntityAllocator::new();
/// let a = entities.create();
/// assert!(entities.destroy(a));
///
/// let b = entities.create();
/// assert_eq!(a.slot(), b.slot());
/// assert!(b.generation() > a.generation());
/// assert!(!entities.is_alive(a));
/// ```
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    /// Current generation per slot (index = slot).
    generations: Vec<u32>,
    /// Free slots, reused from the back.
    free_list: Vec<u32>,
    /// Number of slots retired on generation overflow.
    retired: usize,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    /// Creates an allocator with the default reserve hint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ENTITY_CAPACITY)
    }

    /// Creates an allocator with room for `capacity` slots before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            retired: 0,
        }
    }

    /// Issues a new entity handle.
    ///
    /// Reuses the most recently freed slot if there is one, otherwise appends
    /// a fresh slot at generation 0.
    ///
    /// # Panics
    ///
    /// Panics if every slot index below `u32::MAX` is in use. `u32::MAX` is
    /// reserved for [`EntityId::NULL`].
    pub fn create(&mut self) -> EntityId {
        let id = if let Some(slot) = self.free_list.pop() {
            EntityId::new(slot, self.generations[slot as usize])
        } else {
            let slot = u32::try_from(self.generations.len())
                .ok()
                .filter(|&slot| slot != u32::MAX)
                .unwrap_or_else(|| panic!("entity slot space exhausted"));
            self.generations.push(0);
            EntityId::new(slot, 0)
        };

        tracing::trace!("entity created: {}", id);
        id
    }

    /// Destroys an entity, freeing its slot for reuse.
    ///
    /// Destroying a dead, stale, null, or out-of-range handle is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the entity was alive and is now destroyed.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }

        let slot = id.slot();
        let next = id.generation() + 1;
        self.generations[slot as usize] = next;

        if next == RETIRED {
            // Recycling would eventually wrap and resurrect old handles.
            self.retired += 1;
            tracing::warn!("entity slot {} retired after generation overflow", slot);
        } else {
            self.free_list.push(slot);
        }

        tracing::trace!("entity destroyed: {}", id);
        true
    }

    /// Checks if an entity handle is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        id.generation() != RETIRED
            && self
                .generations
                .get(id.slot() as usize)
                .is_some_and(|&generation| generation == id.generation())
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len() - self.retired
    }

    /// Returns the number of slots ever allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }

    /// Returns the number of slots waiting to be reused.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the number of slots permanently retired.
    #[inline]
    #[must_use]
    pub const fn retired_count(&self) -> usize {
        self.retired
    }

    /// Returns the stored generation of a slot, or `None` if the slot was
    /// never allocated.
    #[inline]
    #[must_use]
    pub fn current_generation(&self, slot: u32) -> Option<u32> {
        self.generations.get(slot as usize).copied()
    }

    /// Iterates over all alive handles in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        let free = self.free_mask();
        self.generations
            .iter()
            .zip(free)
            .enumerate()
            .filter(|&(_, (&generation, is_free))| !is_free && generation != RETIRED)
            .map(|(slot, (&generation, _))| {
                // Slot indices fit in u32: `create` never hands out more.
                #[allow(clippy::cast_possible_truncation)]
                let slot = slot as u32;
                EntityId::new(slot, generation)
            })
    }

    /// Destroys every alive entity. All outstanding handles become stale.
    ///
    /// # Returns
    ///
    /// Number of entities destroyed.
    pub fn clear(&mut self) -> usize {
        let alive: Vec<EntityId> = self.iter_alive().collect();
        for &id in &alive {
            self.destroy(id);
        }
        alive.len()
    }

    fn free_mask(&self) -> Vec<bool> {
        let mut free = vec![false; self.generations.len()];
        for &slot in &self.free_list {
            free[slot as usize] = true;
        }
        free
    }

    /// Forces a slot's generation. Used to exercise overflow handling.
    #[cfg(test)]
    pub(crate) fn set_generation(&mut self, slot: u32, generation: u32) {
        self.generations[slot as usize] = generation;
    }
}
