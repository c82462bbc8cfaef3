//! # Component Storage
//!
//! Sparse-set storage for a single component type.
//!
//! ```text
//! sparse:          [ 1 | - | 0 | - | 2 ]      slot -> dense position
//! dense_entities:  [ 2#0 | 0#0 | 4#1 ]        owning handle per position
//! dense_data:      [ C2  | C0  | C4  ]        payload per position
//! ```
//!
//! - Membership, insert and remove are O(1)
//! - Payloads are contiguous, so iteration is a linear scan
//! - Removal swaps the last element into the hole, so dense order is not
//!   stable across removals
//!
//! The storage does not know which handles are alive. Operations that need
//! liveness take the [`EntityAllocator`] explicitly; the public surface for
//! them is [`ComponentPool`](super::ComponentPool), which carries the
//! allocator borrow.

use std::iter::{FusedIterator, Zip};
use std::slice;

use super::allocator::EntityAllocator;
use super::component::{component_name, Component};
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult, InvariantViolation};

/// Sparse entry for a slot with no payload.
const ABSENT: u32 = u32::MAX;

/// Sparse-set storage for components of type `C`.
///
/// # Invariants
///
/// - `dense_entities` and `dense_data` have equal length
/// - `sparse[dense_entities[p].slot()] == p` for every dense position `p`
/// - every non-absent sparse entry points at a dense handle for that slot
///
/// Dense entries may belong to handles that were destroyed through the
/// allocator after insertion ("stale" entries). They are never returned by
/// lookups or iteration, are overwritten in place when a newer handle for the
/// same slot is inserted, and are swept by [`purge`](Self::purge).
pub struct ComponentStorage<C>
where
    C: Component,
{
    /// Owning handle for each dense position.
    dense_entities: Vec<EntityId>,
    /// Payloads, aligned with `dense_entities`.
    dense_data: Vec<C>,
    /// Slot index -> dense position, or `ABSENT`.
    sparse: Vec<u32>,
}

impl<C> Default for ComponentStorage<C>
where
    C: Component,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ComponentStorage<C>
where
    C: Component,
{
    /// Creates an empty component storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dense_entities: Vec::new(),
            dense_data: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Creates an empty storage with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense_entities: Vec::with_capacity(capacity),
            dense_data: Vec::with_capacity(capacity),
            sparse: Vec::with_capacity(capacity),
        }
    }

    /// Number of dense entries, including stale ones not yet cleaned up.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense_data.len()
    }

    /// Returns `true` if there are no dense entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense_data.is_empty()
    }

    /// Capacity of the dense payload array.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.dense_data.capacity()
    }

    /// Reserves room for at least `additional` more components.
    pub fn reserve(&mut self, additional: usize) {
        self.dense_entities.reserve(additional);
        self.dense_data.reserve(additional);
    }

    /// Dense handle array in storage order, including stale handles.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.dense_entities
    }

    /// Length of the sparse table (one past the highest slot ever inserted).
    #[inline]
    #[must_use]
    pub fn sparse_len(&self) -> usize {
        self.sparse.len()
    }

    /// Drops every payload. The sparse table keeps its length.
    pub fn clear(&mut self) {
        self.dense_entities.clear();
        self.dense_data.clear();
        self.sparse.fill(ABSENT);
        self.debug_check_invariants();
    }

    /// Number of dense entries whose handle is no longer alive.
    #[must_use]
    pub fn stale_count(&self, entities: &EntityAllocator) -> usize {
        self.dense_entities
            .iter()
            .filter(|&&id| !entities.is_alive(id))
            .count()
    }

    /// Verifies the sparse/dense structure.
    ///
    /// This is a pure check over the storage state; it does not consult any
    /// allocator, so stale entries are not violations.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let dense_len = self.dense_data.len();
        if self.dense_entities.len() != dense_len {
            return Err(InvariantViolation::DenseLengthMismatch {
                entities: self.dense_entities.len(),
                payloads: dense_len,
            });
        }

        for (position, id) in self.dense_entities.iter().enumerate() {
            let slot = id.slot();
            let Some(&entry) = self.sparse.get(slot as usize) else {
                return Err(InvariantViolation::SlotOutOfRange {
                    position,
                    slot,
                    sparse_len: self.sparse.len(),
                });
            };
            if entry as usize != position {
                return Err(InvariantViolation::BrokenBackPointer {
                    slot,
                    position,
                    found: (entry != ABSENT).then_some(entry),
                });
            }
        }

        for (slot, &position) in self.sparse.iter().enumerate() {
            if position == ABSENT {
                continue;
            }
            let Some(owner) = self.dense_entities.get(position as usize) else {
                return Err(InvariantViolation::DanglingSparseEntry {
                    slot,
                    position,
                    dense_len,
                });
            };
            if owner.slot() as usize != slot {
                return Err(InvariantViolation::ForeignSparseEntry {
                    slot,
                    position,
                    owner: owner.slot(),
                });
            }
        }

        Ok(())
    }

    // =========================================================================
    // Allocator-aware operations, exposed through the pool views
    // =========================================================================

    /// Dense position of exactly `id`, ignoring liveness.
    #[inline]
    fn position(&self, id: EntityId) -> Option<usize> {
        let position = *self.sparse.get(id.slot() as usize)?;
        if position == ABSENT {
            return None;
        }
        let position = position as usize;
        (self.dense_entities[position] == id).then_some(position)
    }

    /// Dense position of `id` if it is alive and has a payload.
    #[inline]
    fn live_position(&self, entities: &EntityAllocator, id: EntityId) -> Option<usize> {
        if !entities.is_alive(id) {
            return None;
        }
        self.position(id)
    }

    #[inline]
    pub(crate) fn contains(&self, entities: &EntityAllocator, id: EntityId) -> bool {
        self.live_position(entities, id).is_some()
    }

    #[inline]
    pub(crate) fn get(&self, entities: &EntityAllocator, id: EntityId) -> Option<&C> {
        let position = self.live_position(entities, id)?;
        Some(&self.dense_data[position])
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, entities: &EntityAllocator, id: EntityId) -> Option<&mut C> {
        let position = self.live_position(entities, id)?;
        Some(&mut self.dense_data[position])
    }

    /// Required lookup: distinguishes a dead handle from a missing payload.
    pub(crate) fn require(&self, entities: &EntityAllocator, id: EntityId) -> EcsResult<&C> {
        if !entities.is_alive(id) {
            return Err(EcsError::DeadEntity(id));
        }
        self.get(entities, id)
            .ok_or_else(|| EcsError::missing_component::<C>(id))
    }

    /// Mutable form of [`require`](Self::require).
    pub(crate) fn require_mut(
        &mut self,
        entities: &EntityAllocator,
        id: EntityId,
    ) -> EcsResult<&mut C> {
        if !entities.is_alive(id) {
            return Err(EcsError::DeadEntity(id));
        }
        self.get_mut(entities, id)
            .ok_or_else(|| EcsError::missing_component::<C>(id))
    }

    /// Upserts a payload for an alive handle.
    pub(crate) fn try_insert_with<F>(
        &mut self,
        entities: &EntityAllocator,
        id: EntityId,
        make: F,
    ) -> EcsResult<&mut C>
    where
        F: FnOnce() -> C,
    {
        if !entities.is_alive(id) {
            return Err(EcsError::DeadEntity(id));
        }

        // `make` may panic; nothing is written until it has returned.
        let component = make();

        let slot = id.slot() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, ABSENT);
        }

        let position = match self.sparse[slot] {
            ABSENT => {
                let position = self.dense_data.len();
                self.dense_entities.push(id);
                self.dense_data.push(component);
                self.sparse[slot] = dense_index(position);
                position
            }
            position => {
                // Either the same handle (overwrite) or a stale handle for an
                // older generation of this slot (replace in place).
                let position = position as usize;
                self.dense_data[position] = component;
                self.dense_entities[position] = id;
                position
            }
        };

        self.debug_check_invariants();
        Ok(&mut self.dense_data[position])
    }

    /// Fail-fast insert used by the public `insert` paths.
    pub(crate) fn insert_with<F>(&mut self, entities: &EntityAllocator, id: EntityId, make: F) -> &mut C
    where
        F: FnOnce() -> C,
    {
        match self.try_insert_with(entities, id, make) {
            Ok(component) => component,
            Err(err) => panic!("insert {} failed: {err}", component_name::<C>()),
        }
    }

    /// Swap-removes the payload of an alive handle.
    pub(crate) fn remove(&mut self, entities: &EntityAllocator, id: EntityId) -> Option<C> {
        let position = self.live_position(entities, id)?;
        let component = self.remove_at(position);
        self.debug_check_invariants();
        Some(component)
    }

    /// Swap-removes every entry whose handle is no longer alive.
    pub(crate) fn purge(&mut self, entities: &EntityAllocator) -> usize {
        let mut removed = 0;
        let mut position = 0;
        while position < self.dense_entities.len() {
            if entities.is_alive(self.dense_entities[position]) {
                position += 1;
            } else {
                // The element swapped into `position` still needs a check.
                drop(self.remove_at(position));
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(
                "purged {} stale {} components",
                removed,
                component_name::<C>()
            );
        }
        self.debug_check_invariants();
        removed
    }

    pub(crate) fn iter<'a>(&'a self, entities: &'a EntityAllocator) -> Iter<'a, C> {
        Iter {
            entities,
            inner: self.dense_entities.iter().zip(self.dense_data.iter()),
        }
    }

    pub(crate) fn iter_mut<'a>(&'a mut self, entities: &'a EntityAllocator) -> IterMut<'a, C> {
        IterMut {
            entities,
            inner: self.dense_entities.iter().zip(self.dense_data.iter_mut()),
        }
    }

    /// Moves the last dense element into `position` and shrinks by one.
    fn remove_at(&mut self, position: usize) -> C {
        let removed = self.dense_entities.swap_remove(position);
        let component = self.dense_data.swap_remove(position);

        self.sparse[removed.slot() as usize] = ABSENT;
        if let Some(moved) = self.dense_entities.get(position) {
            self.sparse[moved.slot() as usize] = dense_index(position);
        }

        component
    }

    #[inline]
    fn debug_check_invariants(&self) {
        #[cfg(debug_assertions)]
        if let Err(violation) = self.check_invariants() {
            panic!(
                "component storage {} corrupted: {violation}",
                component_name::<C>()
            );
        }
    }
}

/// Converts a dense position to its sparse representation.
///
/// A storage holds at most one entry per slot and slots stay below
/// `u32::MAX`, so positions always fit.
#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn dense_index(position: usize) -> u32 {
    position as u32
}

/// Iterator over live `(handle, &payload)` pairs in dense order.
pub struct Iter<'a, C> {
    entities: &'a EntityAllocator,
    inner: Zip<slice::Iter<'a, EntityId>, slice::Iter<'a, C>>,
}

impl<'a, C> Iterator for Iter<'a, C> {
    type Item = (EntityId, &'a C);

    fn next(&mut self) -> Option<Self::Item> {
        let entities = self.entities;
        self.inner
            .find(|(id, _)| entities.is_alive(**id))
            .map(|(id, component)| (*id, component))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<C> FusedIterator for Iter<'_, C> {}

/// Iterator over live `(handle, &mut payload)` pairs in dense order.
pub struct IterMut<'a, C> {
    entities: &'a EntityAllocator,
    inner: Zip<slice::Iter<'a, EntityId>, slice::IterMut<'a, C>>,
}

impl<'a, C> Iterator for IterMut<'a, C> {
    type Item = (EntityId, &'a mut C);

    fn next(&mut self) -> Option<Self::Item> {
        let entities = self.entities;
        self.inner
            .find(|(id, _)| entities.is_alive(**id))
            .map(|(id, component)| (*id, component))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<C> FusedIterator for IterMut<'_, C> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(count: usize) -> (EntityAllocator, Vec<EntityId>, ComponentStorage<i32>) {
        let mut entities = EntityAllocator::new();
        let ids = (0..count).map(|_| entities.create()).collect();
        (entities, ids, ComponentStorage::new())
    }

    #[test]
    fn test_storage_creation() {
        let storage: ComponentStorage<i32> = ComponentStorage::with_capacity(64);
        assert!(storage.is_empty());
        assert!(storage.capacity() >= 64);
        assert_eq!(storage.check_invariants(), Ok(()));
    }

    #[test]
    fn test_insert_grows_sparse() {
        let (entities, ids, mut storage) = setup(1000);
        let last = ids[999];

        storage.insert_with(&entities, last, || 9);
        assert_eq!(storage.sparse_len(), 1000);
        assert!(storage.contains(&entities, last));
        assert!(!storage.contains(&entities, ids[0]));
    }

    #[test]
    fn test_upsert_keeps_position() {
        let (entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);
        storage.insert_with(&entities, ids[1], || 2);
        storage.insert_with(&entities, ids[0], || 7);

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.entities(), &[ids[0], ids[1]]);
        assert_eq!(storage.get(&entities, ids[0]), Some(&7));
    }

    #[test]
    fn test_swap_remove_updates_sparse() {
        let (entities, ids, mut storage) = setup(3);
        for (value, &id) in [10, 20, 30].iter().zip(&ids) {
            storage.insert_with(&entities, id, || *value);
        }

        assert_eq!(storage.remove(&entities, ids[0]), Some(10));
        // Last element moved into position 0.
        assert_eq!(storage.entities(), &[ids[2], ids[1]]);
        assert_eq!(storage.get(&entities, ids[2]), Some(&30));
        assert_eq!(storage.get(&entities, ids[1]), Some(&20));
        assert_eq!(storage.check_invariants(), Ok(()));
    }

    #[test]
    fn test_remove_last_touches_nothing_else() {
        let (entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);
        storage.insert_with(&entities, ids[1], || 2);

        assert_eq!(storage.remove(&entities, ids[1]), Some(2));
        assert_eq!(storage.entities(), &[ids[0]]);
        assert_eq!(storage.get(&entities, ids[0]), Some(&1));
    }

    #[test]
    fn test_stale_entry_replaced_in_place() {
        let (mut entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);
        storage.insert_with(&entities, ids[1], || 2);

        entities.destroy(ids[0]);
        let recycled = entities.create();
        assert_eq!(recycled.slot(), ids[0].slot());
        assert!(!storage.contains(&entities, recycled));
        assert_eq!(storage.stale_count(&entities), 1);

        storage.insert_with(&entities, recycled, || 5);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.stale_count(&entities), 0);
        assert_eq!(storage.get(&entities, recycled), Some(&5));
        assert_eq!(storage.get(&entities, ids[0]), None);
        assert_eq!(storage.check_invariants(), Ok(()));
    }

    #[test]
    fn test_remove_stale_handle_spares_new_occupant() {
        let (mut entities, ids, mut storage) = setup(1);
        storage.insert_with(&entities, ids[0], || 1);
        entities.destroy(ids[0]);
        let recycled = entities.create();
        storage.insert_with(&entities, recycled, || 2);

        assert_eq!(storage.remove(&entities, ids[0]), None);
        assert_eq!(storage.get(&entities, recycled), Some(&2));
    }

    #[test]
    fn test_purge() {
        let (mut entities, ids, mut storage) = setup(4);
        for (value, &id) in (0..4).zip(&ids) {
            storage.insert_with(&entities, id, || value);
        }
        entities.destroy(ids[0]);
        entities.destroy(ids[3]);

        assert_eq!(storage.purge(&entities), 2);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.stale_count(&entities), 0);
        assert_eq!(storage.get(&entities, ids[1]), Some(&1));
        assert_eq!(storage.get(&entities, ids[2]), Some(&2));
        assert_eq!(storage.purge(&entities), 0);
    }

    #[test]
    fn test_iter_skips_stale() {
        let (mut entities, ids, mut storage) = setup(3);
        for (value, &id) in [1, 2, 3].iter().zip(&ids) {
            storage.insert_with(&entities, id, || *value);
        }
        entities.destroy(ids[1]);

        let seen: Vec<_> = storage.iter(&entities).collect();
        assert_eq!(seen, vec![(ids[0], &1), (ids[2], &3)]);

        for (_, value) in storage.iter_mut(&entities) {
            *value *= 10;
        }
        assert_eq!(storage.get(&entities, ids[2]), Some(&30));
    }

    #[test]
    fn test_require_distinguishes_errors() {
        let (mut entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);

        assert_eq!(
            storage.require(&entities, ids[1]),
            Err(EcsError::missing_component::<i32>(ids[1]))
        );
        entities.destroy(ids[0]);
        assert_eq!(
            storage.require(&entities, ids[0]),
            Err(EcsError::DeadEntity(ids[0]))
        );
    }

    #[test]
    fn test_try_insert_dead() {
        let (mut entities, ids, mut storage) = setup(1);
        entities.destroy(ids[0]);
        assert_eq!(
            storage.try_insert_with(&entities, ids[0], || 1).err(),
            Some(EcsError::DeadEntity(ids[0]))
        );
        assert!(storage.is_empty());
    }

    #[test]
    #[should_panic(expected = "is not alive")]
    fn test_insert_dead_panics() {
        let (mut entities, ids, mut storage) = setup(1);
        entities.destroy(ids[0]);
        storage.insert_with(&entities, ids[0], || 1);
    }

    #[test]
    fn test_panicking_constructor_leaves_storage_untouched() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let (entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);

        let result = catch_unwind(AssertUnwindSafe(|| {
            storage.insert_with(&entities, ids[1], || panic!("constructor failed"));
        }));
        assert!(result.is_err());
        assert_eq!(storage.check_invariants(), Ok(()));
        assert_eq!(storage.len(), 1);
        assert!(!storage.contains(&entities, ids[1]));
        assert_eq!(storage.get(&entities, ids[0]), Some(&1));
    }

    #[test]
    fn test_panicking_constructor_on_recycled_slot_keeps_old_payload_hidden() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let mut entities = EntityAllocator::new();
        let mut storage = ComponentStorage::new();
        let old = entities.create();
        storage.insert_with(&entities, old, || String::from("owned by old"));
        entities.destroy(old);
        let new = entities.create();
        assert_eq!(new.slot(), old.slot());

        let result = catch_unwind(AssertUnwindSafe(|| {
            storage.insert_with(&entities, new, || -> String { panic!("constructor failed") });
        }));
        assert!(result.is_err());
        assert_eq!(storage.check_invariants(), Ok(()));
        assert!(!storage.contains(&entities, new));
        assert_eq!(storage.get(&entities, new), None);
        assert_eq!(storage.entities(), &[old]);
    }

    #[test]
    fn test_clear() {
        let (entities, ids, mut storage) = setup(3);
        for &id in &ids {
            storage.insert_with(&entities, id, || 0);
        }
        storage.clear();
        assert!(storage.is_empty());
        assert!(!storage.contains(&entities, ids[1]));
        assert_eq!(storage.check_invariants(), Ok(()));
    }

    #[test]
    fn test_check_invariants_detects_corruption() {
        let (entities, ids, mut storage) = setup(2);
        storage.insert_with(&entities, ids[0], || 1);
        storage.insert_with(&entities, ids[1], || 2);

        let mut broken = ComponentStorage {
            dense_entities: storage.dense_entities.clone(),
            dense_data: storage.dense_data.clone(),
            sparse: storage.sparse.clone(),
        };
        broken.sparse[ids[1].slot() as usize] = 0;
        assert!(matches!(
            broken.check_invariants(),
            Err(InvariantViolation::BrokenBackPointer { .. })
        ));

        broken.sparse = storage.sparse.clone();
        broken.dense_data.pop();
        assert_eq!(
            broken.check_invariants(),
            Err(InvariantViolation::DenseLengthMismatch {
                entities: 2,
                payloads: 1,
            })
        );

        storage.sparse.push(7);
        assert!(matches!(
            storage.check_invariants(),
            Err(InvariantViolation::DanglingSparseEntry { slot: 2, .. })
        ));
    }
}
