//! # Component Marker
//!
//! Components are plain data attached to entities. Any `'static` type that
//! can be shared across threads qualifies; no registration step is needed.

use std::any::Any;

/// Marker trait for ECS components.
///
/// Implemented automatically for every `Any + Send + Sync` type, so
/// `i32`, `String` or a user struct can all be stored directly.
///
/// # Example
///
/// ```rust
/// use tessera_core::Registry;
///
/// #[derive(Debug, PartialEq)]
/// struct Health(u32);
///
/// let mut registry = Registry::new();
/// let e = registry.create_entity();
/// registry.add(e, Health(100));
/// assert_eq!(registry.get::<Health>(e), Ok(&Health(100)));
/// ```
pub trait Component: Any + Send + Sync {}

impl<T> Component for T where T: Any + Send + Sync {}

/// Returns the type name used in diagnostics for component `C`.
#[inline]
#[must_use]
pub fn component_name<C: Component>() -> &'static str {
    std::any::type_name::<C>()
}
