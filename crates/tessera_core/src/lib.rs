//! # Tessera Core
//!
//! In-memory storage core for an Entity-Component architecture:
//! - Generational entity handles that are safe to recycle
//! - One sparse-set storage per component type, dense for iteration
//! - A registry that creates storages on first use, no type declarations
//!
//! ## Architecture Rules
//!
//! 1. **Stale handles never resolve** - every lookup checks the allocator
//! 2. **Dense storage stays dense** - removal is an O(1) swap-remove
//! 3. **Absence is a value** - missing components are `None`/`false`; only
//!    contract violations are errors or panics
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::Registry;
//!
//! let mut registry = Registry::new();
//! let a = registry.create_entity();
//! let b = registry.create_entity();
//! registry.add(a, 10_i32);
//! registry.add(b, 20_i32);
//!
//! let total: i32 = registry.pool_ref::<i32>().iter().sum();
//! assert_eq!(total, 30);
//! ```
//!
//! ## Threading
//!
//! Nothing here locks. A [`Registry`] is `Send + Sync`, so a host may share
//! it behind its own synchronization, but mutation of one registry is
//! single-writer.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::RegistryConfig;
pub use ecs::{
    component_name, Component, ComponentPool, ComponentPoolRef, ComponentStorage, EntityAllocator,
    EntityId, Iter, IterMut, Registry, DEFAULT_ENTITY_CAPACITY,
};
pub use error::{EcsError, EcsResult, InvariantViolation};
