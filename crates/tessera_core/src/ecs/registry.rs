//! # Registry
//!
//! The single facade over entity lifecycle and typed component storage.
//!
//! The registry owns one [`EntityAllocator`] and one [`ComponentStorage`] per
//! component type, created lazily the first time a type is written. Storages
//! live behind a type-erased box keyed by [`TypeId`], so their address never
//! changes once created.
//!
//! Destroying an entity does not touch any storage. Components of a destroyed
//! entity are invisible immediately (every lookup checks liveness) and are
//! physically dropped when their slot is reused by the same storage, or by
//! [`Registry::maintain`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::allocator::EntityAllocator;
use super::component::{component_name, Component};
use super::entity::EntityId;
use super::pool::{ComponentPool, ComponentPoolRef};
use super::storage::ComponentStorage;
use crate::config::RegistryConfig;
use crate::error::{EcsError, EcsResult};

/// Type-independent view of a boxed [`ComponentStorage`].
trait ErasedStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn component_name(&self) -> &'static str;

    fn dense_len(&self) -> usize;

    fn purge(&mut self, entities: &EntityAllocator) -> usize;

    fn clear(&mut self);
}

impl<C> ErasedStorage for ComponentStorage<C>
where
    C: Component,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_name(&self) -> &'static str {
        component_name::<C>()
    }

    fn dense_len(&self) -> usize {
        self.len()
    }

    fn purge(&mut self, entities: &EntityAllocator) -> usize {
        ComponentStorage::purge(self, entities)
    }

    fn clear(&mut self) {
        ComponentStorage::clear(self);
    }
}

type Storages = HashMap<TypeId, Box<dyn ErasedStorage>>;

/// Owner of all entities and component storages.
///
/// # Example
///
/// ```rust
/// use tessera_core::{EcsError, Registry};
///
/// let mut registry = Registry::new();
/// let e = registry.create_entity();
///
/// assert!(!registry.has::<i32>(e));
/// registry.add(e, 42_i32);
/// assert_eq!(registry.get::<i32>(e), Ok(&42));
///
/// registry.destroy_entity(e);
/// assert_eq!(registry.get::<i32>(e), Err(EcsError::DeadEntity(e)));
/// ```
pub struct Registry {
    storages: Storages,
    entities: EntityAllocator,
    config: RegistryConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry with the given capacity hints.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            storages: HashMap::new(),
            entities: EntityAllocator::with_capacity(config.entity_capacity),
            config,
        }
    }

    /// The configuration this registry was created with.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates a new entity.
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.create()
    }

    /// Destroys an entity. Its components become unreachable immediately.
    ///
    /// # Returns
    ///
    /// `false` if the entity was already dead.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        self.entities.destroy(id)
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Returns the number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// The entity allocator owned by this registry.
    #[inline]
    #[must_use]
    pub const fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    // =========================================================================
    // Pools
    // =========================================================================

    /// Returns the pool for `C`, creating its storage on first use.
    ///
    /// The storage is created at most once and is never moved afterwards.
    pub fn pool<C: Component>(&mut self) -> ComponentPool<'_, C> {
        let storage = storage_or_create::<C>(&mut self.storages, self.config.storage_capacity);
        ComponentPool::new(&self.entities, storage)
    }

    /// Returns a read-only pool for `C`.
    ///
    /// # Panics
    ///
    /// Panics if no storage for `C` exists yet. Read-only access never
    /// creates one; use [`try_pool_ref`](Self::try_pool_ref) when the storage
    /// may be missing.
    #[must_use]
    pub fn pool_ref<C: Component>(&self) -> ComponentPoolRef<'_, C> {
        self.try_pool_ref().unwrap_or_else(|| {
            panic!(
                "pool_ref::<{}>() called before the storage was created",
                component_name::<C>()
            )
        })
    }

    /// Returns a read-only pool for `C` if its storage exists.
    #[must_use]
    pub fn try_pool_ref<C: Component>(&self) -> Option<ComponentPoolRef<'_, C>> {
        let storage = storage_ref::<C>(&self.storages)?;
        Some(ComponentPoolRef::new(&self.entities, storage))
    }

    /// Returns `true` if a storage for `C` has been created.
    #[must_use]
    pub fn contains_storage<C: Component>(&self) -> bool {
        self.storages.contains_key(&TypeId::of::<C>())
    }

    /// Number of component storages created so far.
    #[must_use]
    pub fn storage_count(&self) -> usize {
        self.storages.len()
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Returns `true` if `id` is alive and has a `C` component.
    #[must_use]
    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        storage_ref::<C>(&self.storages).is_some_and(|storage| storage.contains(&self.entities, id))
    }

    /// Retrieves the `C` component of `id`, if any.
    #[must_use]
    pub fn try_get<C: Component>(&self, id: EntityId) -> Option<&C> {
        storage_ref::<C>(&self.storages)?.get(&self.entities, id)
    }

    /// Mutable form of [`try_get`](Self::try_get).
    pub fn try_get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        storage_mut::<C>(&mut self.storages)?.get_mut(&self.entities, id)
    }

    /// Retrieves the `C` component of `id`, which the caller expects to exist.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DeadEntity`] if `id` is not alive
    /// - [`EcsError::MissingComponent`] if `id` has no `C` component, including
    ///   when no storage for `C` exists
    pub fn get<C: Component>(&self, id: EntityId) -> EcsResult<&C> {
        match storage_ref::<C>(&self.storages) {
            Some(storage) => storage.require(&self.entities, id),
            None => Err(absence::<C>(&self.entities, id)),
        }
    }

    /// Mutable form of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        match storage_mut::<C>(&mut self.storages) {
            Some(storage) => storage.require_mut(&self.entities, id),
            None => Err(absence::<C>(&self.entities, id)),
        }
    }

    /// Attaches `component` to `id`, overwriting any existing `C` in place.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    pub fn add<C: Component>(&mut self, id: EntityId, component: C) -> &mut C {
        self.add_with(id, || component)
    }

    /// Attaches a `C` built by `make`, which runs only for alive handles.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    pub fn add_with<C, F>(&mut self, id: EntityId, make: F) -> &mut C
    where
        C: Component,
        F: FnOnce() -> C,
    {
        let storage = storage_or_create::<C>(&mut self.storages, self.config.storage_capacity);
        storage.insert_with(&self.entities, id, make)
    }

    /// Detaches the `C` component of `id`.
    ///
    /// # Returns
    ///
    /// `false` if there was nothing to remove. Never creates a storage.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> bool {
        self.take::<C>(id).is_some()
    }

    /// Detaches and returns the `C` component of `id`.
    pub fn take<C: Component>(&mut self, id: EntityId) -> Option<C> {
        storage_mut::<C>(&mut self.storages)?.remove(&self.entities, id)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Drops components left behind by destroyed entities in every storage.
    ///
    /// # Returns
    ///
    /// Total number of stale components dropped.
    pub fn maintain(&mut self) -> usize {
        let entities = &self.entities;
        let purged: usize = self
            .storages
            .values_mut()
            .map(|storage| storage.purge(entities))
            .sum();

        if purged > 0 {
            tracing::debug!(
                "maintenance purged {} components across {} storages",
                purged,
                self.storages.len()
            );
        }
        purged
    }

    /// Destroys every entity and drops every component. Storages are kept.
    ///
    /// # Returns
    ///
    /// Number of entities destroyed.
    pub fn clear(&mut self) -> usize {
        for storage in self.storages.values_mut() {
            storage.clear();
        }
        self.entities.clear()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut storages: Vec<(&'static str, usize)> = self
            .storages
            .values()
            .map(|storage| (storage.component_name(), storage.dense_len()))
            .collect();
        storages.sort_unstable();

        f.debug_struct("Registry")
            .field("alive", &self.entities.alive_count())
            .field("slots", &self.entities.capacity())
            .field("storages", &storages)
            .field("config", &self.config)
            .finish()
    }
}

// =============================================================================
// Typed access to erased storages
// =============================================================================

fn storage_ref<C: Component>(storages: &Storages) -> Option<&ComponentStorage<C>> {
    let erased = storages.get(&TypeId::of::<C>())?;
    let name = erased.component_name();
    Some(
        erased
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| storage_mismatch::<C>(name)),
    )
}

fn storage_mut<C: Component>(storages: &mut Storages) -> Option<&mut ComponentStorage<C>> {
    let erased = storages.get_mut(&TypeId::of::<C>())?;
    let name = erased.component_name();
    Some(
        erased
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| storage_mismatch::<C>(name)),
    )
}

fn storage_or_create<C: Component>(storages: &mut Storages, capacity: usize) -> &mut ComponentStorage<C> {
    let erased = storages.entry(TypeId::of::<C>()).or_insert_with(|| {
        tracing::debug!("created storage for {}", component_name::<C>());
        Box::new(ComponentStorage::<C>::with_capacity(capacity)) as Box<dyn ErasedStorage>
    });
    let name = erased.component_name();
    erased
        .as_any_mut()
        .downcast_mut()
        .unwrap_or_else(|| storage_mismatch::<C>(name))
}

/// Error for a `C` lookup on `id` when no storage for `C` exists.
fn absence<C: Component>(entities: &EntityAllocator, id: EntityId) -> EcsError {
    if entities.is_alive(id) {
        EcsError::missing_component::<C>(id)
    } else {
        EcsError::DeadEntity(id)
    }
}

/// The key is `TypeId::of::<C>()`, so a mismatch means the map is corrupt.
#[cold]
fn storage_mismatch<C: Component>(found: &'static str) -> ! {
    panic!(
        "storage keyed for {} holds {}",
        component_name::<C>(),
        found
    )
}
