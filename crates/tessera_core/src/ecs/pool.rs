//! # Component Pools
//!
//! A pool is a [`ComponentStorage`] bound to the [`EntityAllocator`] that
//! issued its handles. The allocator is borrowed, never owned: a pool cannot
//! outlive the allocator, and the allocator cannot be mutated while a pool
//! borrowed from it is in use.
//!
//! ```rust
//! use tessera_core::{ComponentPool, ComponentStorage, EntityAllocator};
//!
//! let mut entities = EntityAllocator::new();
//! let mut storage = ComponentStorage::new();
//!
//! let e = entities.create();
//! let mut pool = ComponentPool::new(&entities, &mut storage);
//! pool.insert(e, 42_u32);
//! assert_eq!(pool.try_get(e), Some(&42));
//! ```
//!
//! ## Iteration Order
//!
//! Pools iterate in dense order. Removal moves the last element into the
//! removed position, so **iteration order is not stable across removals**
//! and must not be relied upon.

use super::allocator::EntityAllocator;
use super::component::Component;
use super::entity::EntityId;
use super::storage::{ComponentStorage, Iter, IterMut};
use crate::error::EcsResult;

/// Mutable view of a component storage bound to its allocator.
pub struct ComponentPool<'a, C>
where
    C: Component,
{
    entities: &'a EntityAllocator,
    storage: &'a mut ComponentStorage<C>,
}

/// Read-only view of a component storage bound to its allocator.
pub struct ComponentPoolRef<'a, C>
where
    C: Component,
{
    entities: &'a EntityAllocator,
    storage: &'a ComponentStorage<C>,
}

// Derived Clone/Copy would require `C: Clone`.
impl<C> Clone for ComponentPoolRef<'_, C>
where
    C: Component,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ComponentPoolRef<'_, C> where C: Component {}

impl<'a, C> ComponentPool<'a, C>
where
    C: Component,
{
    /// Binds a storage to the allocator whose handles it holds.
    #[must_use]
    pub fn new(entities: &'a EntityAllocator, storage: &'a mut ComponentStorage<C>) -> Self {
        Self { entities, storage }
    }

    /// Reborrows this pool as a read-only view.
    #[must_use]
    pub fn view(&self) -> ComponentPoolRef<'_, C> {
        ComponentPoolRef {
            entities: self.entities,
            storage: &*self.storage,
        }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &ComponentStorage<C> {
        &*self.storage
    }

    /// Returns `true` if `id` is alive and has a component in this pool.
    #[inline]
    #[must_use]
    pub fn has(&self, id: EntityId) -> bool {
        self.storage.contains(self.entities, id)
    }

    /// Retrieves the component of `id`, if it is alive and has one.
    #[inline]
    #[must_use]
    pub fn try_get(&self, id: EntityId) -> Option<&C> {
        self.storage.get(self.entities, id)
    }

    /// Mutable form of [`try_get`](Self::try_get).
    #[inline]
    pub fn try_get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        self.storage.get_mut(self.entities, id)
    }

    /// Retrieves the component of `id`, which the caller expects to exist.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DeadEntity`](crate::EcsError::DeadEntity) if `id` is not alive
    /// - [`EcsError::MissingComponent`](crate::EcsError::MissingComponent) if it
    ///   has no component in this pool
    #[inline]
    pub fn get(&self, id: EntityId) -> EcsResult<&C> {
        self.storage.require(self.entities, id)
    }

    /// Mutable form of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> EcsResult<&mut C> {
        self.storage.require_mut(self.entities, id)
    }

    /// Attaches `component` to `id`, overwriting any existing one in place.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive. Use [`try_insert`](Self::try_insert) to
    /// get an error instead.
    pub fn insert(&mut self, id: EntityId, component: C) -> &mut C {
        self.storage.insert_with(self.entities, id, || component)
    }

    /// Attaches a component built by `make`, which runs only for alive handles.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    pub fn insert_with<F>(&mut self, id: EntityId, make: F) -> &mut C
    where
        F: FnOnce() -> C,
    {
        self.storage.insert_with(self.entities, id, make)
    }

    /// Non-panicking form of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DeadEntity`](crate::EcsError::DeadEntity) if `id`
    /// is not alive; the pool is left untouched.
    pub fn try_insert(&mut self, id: EntityId, component: C) -> EcsResult<&mut C> {
        self.storage.try_insert_with(self.entities, id, || component)
    }

    /// Detaches the component of `id`.
    ///
    /// # Returns
    ///
    /// `false` if `id` had no component here (or is not alive).
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.storage.remove(self.entities, id).is_some()
    }

    /// Detaches and returns the component of `id`.
    pub fn take(&mut self, id: EntityId) -> Option<C> {
        self.storage.remove(self.entities, id)
    }

    /// Iterates over live components in dense order.
    pub fn iter(&self) -> impl Iterator<Item = &C> + '_ {
        self.iter_with_entities().map(|(_, component)| component)
    }

    /// Iterates mutably over live components in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut C> + '_ {
        self.storage
            .iter_mut(self.entities)
            .map(|(_, component)| component)
    }

    /// Iterates over live `(handle, component)` pairs in dense order.
    #[must_use]
    pub fn iter_with_entities(&self) -> Iter<'_, C> {
        self.storage.iter(self.entities)
    }

    /// Iterates mutably over live `(handle, component)` pairs in dense order.
    pub fn iter_with_entities_mut(&mut self) -> IterMut<'_, C> {
        self.storage.iter_mut(self.entities)
    }

    /// Number of dense entries, including stale ones not yet purged.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the pool has no dense entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Capacity of the dense arrays.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of components owned by alive entities.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.len() - self.storage.stale_count(self.entities)
    }

    /// Reserves room for at least `additional` more components.
    pub fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    /// Removes components left behind by destroyed entities.
    ///
    /// # Returns
    ///
    /// Number of stale components dropped.
    pub fn purge(&mut self) -> usize {
        self.storage.purge(self.entities)
    }

    /// Drops every component in the pool.
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

impl<'a, C> ComponentPoolRef<'a, C>
where
    C: Component,
{
    /// Binds a storage to the allocator whose handles it holds.
    #[must_use]
    pub fn new(entities: &'a EntityAllocator, storage: &'a ComponentStorage<C>) -> Self {
        Self { entities, storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &'a ComponentStorage<C> {
        self.storage
    }

    /// Returns `true` if `id` is alive and has a component in this pool.
    #[inline]
    #[must_use]
    pub fn has(&self, id: EntityId) -> bool {
        self.storage.contains(self.entities, id)
    }

    /// Retrieves the component of `id`, if it is alive and has one.
    #[inline]
    #[must_use]
    pub fn try_get(&self, id: EntityId) -> Option<&'a C> {
        self.storage.get(self.entities, id)
    }

    /// Retrieves the component of `id`, which the caller expects to exist.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DeadEntity`](crate::EcsError::DeadEntity) if `id` is not alive
    /// - [`EcsError::MissingComponent`](crate::EcsError::MissingComponent) if it
    ///   has no component in this pool
    #[inline]
    pub fn get(&self, id: EntityId) -> EcsResult<&'a C> {
        self.storage.require(self.entities, id)
    }

    /// Iterates over live components in dense order.
    pub fn iter(&self) -> impl Iterator<Item = &'a C> + 'a {
        self.iter_with_entities().map(|(_, component)| component)
    }

    /// Iterates over live `(handle, component)` pairs in dense order.
    #[must_use]
    pub fn iter_with_entities(&self) -> Iter<'a, C> {
        self.storage.iter(self.entities)
    }

    /// Number of dense entries, including stale ones not yet purged.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns `true` if the pool has no dense entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Capacity of the dense arrays.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of components owned by alive entities.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.len() - self.storage.stale_count(self.entities)
    }
}

impl<'a, C> IntoIterator for ComponentPoolRef<'a, C>
where
    C: Component,
{
    type Item = (EntityId, &'a C);
    type IntoIter = Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_with_entities()
    }
}

impl<'p, C> IntoIterator for &'p ComponentPool<'_, C>
where
    C: Component,
{
    type Item = (EntityId, &'p C);
    type IntoIter = Iter<'p, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_with_entities()
    }
}

impl<'p, C> IntoIterator for &'p mut ComponentPool<'_, C>
where
    C: Component,
{
    type Item = (EntityId, &'p mut C);
    type IntoIter = IterMut<'p, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_with_entities_mut()
    }
}
