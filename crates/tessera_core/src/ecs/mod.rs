//! # Entity Component Storage
//!
//! Sparse-set component storage keyed by generational entity handles.
//!
//! ## Design Philosophy
//!
//! - Entity handles are a slot index plus a generation counter
//! - Each component type gets its own dense array, so iteration is linear
//! - Liveness is always checked against the allocator, never cached
//! - No unsafe code and no dynamic dispatch on the lookup path

mod allocator;
mod component;
mod entity;
mod pool;
mod registry;
mod storage;

pub use allocator::{EntityAllocator, DEFAULT_ENTITY_CAPACITY};
pub use component::{component_name, Component};
pub use entity::EntityId;
pub use pool::{ComponentPool, ComponentPoolRef};
pub use registry::Registry;
pub use storage::{ComponentStorage, Iter, IterMut};
