//! # Registry Scenarios
//!
//! End-to-end checks of the registry's public contract: attach, recycle,
//! swap-remove, upsert, no-op removal and the two error kinds of `get`.
//!
//! Run with: `cargo test --test registry_scenarios`

use tessera_core::{EcsError, Registry, RegistryConfig};

#[test]
fn attach_then_read() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    assert!(!registry.has::<i32>(e));
    registry.add(e, 42_i32);
    assert!(registry.has::<i32>(e));
    assert_eq!(registry.get::<i32>(e), Ok(&42));
}

#[test]
fn destroyed_slot_is_recycled_with_newer_generation() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    assert!(registry.destroy_entity(e));

    let recycled = registry.create_entity();
    assert_eq!(recycled.slot(), e.slot());
    assert!(recycled.generation() > e.generation());
    assert!(!registry.is_alive(e));
    assert!(registry.is_alive(recycled));
}

#[test]
fn removing_middle_keeps_neighbours() {
    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();
    let c = registry.create_entity();
    registry.add(a, 10_i32);
    registry.add(b, 20_i32);
    registry.add(c, 30_i32);

    assert!(registry.remove::<i32>(b));

    assert!(registry.has::<i32>(a));
    assert_eq!(registry.get::<i32>(a), Ok(&10));
    assert!(registry.has::<i32>(c));
    assert_eq!(registry.get::<i32>(c), Ok(&30));
    assert_eq!(registry.pool_ref::<i32>().len(), 2);
}

#[test]
fn repeated_attach_overwrites() {
    let mut registry = Registry::new();
    let e = registry.create_entity();

    registry.add(e, 1_i32);
    registry.add(e, 7_i32);

    assert_eq!(registry.pool_ref::<i32>().len(), 1);
    assert_eq!(registry.get::<i32>(e), Ok(&7));
}

#[test]
fn removing_unattached_component_is_noop() {
    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();
    registry.add(a, 1_i32);

    assert!(!registry.remove::<i32>(b));
    assert_eq!(registry.pool_ref::<i32>().len(), 1);
}

#[test]
fn missing_component_differs_from_dead_entity() {
    let mut registry = Registry::new();
    let alive = registry.create_entity();
    let dead = registry.create_entity();
    registry.destroy_entity(dead);

    let missing = registry.get::<String>(alive).unwrap_err();
    let gone = registry.get::<String>(dead).unwrap_err();

    assert!(matches!(missing, EcsError::MissingComponent { entity, .. } if entity == alive));
    assert_eq!(gone, EcsError::DeadEntity(dead));
    assert_ne!(missing, gone);
}

#[test]
fn destroyed_entity_vanishes_from_every_pool() {
    let mut registry = Registry::new();
    let e = registry.create_entity();
    registry.add(e, 1_i32);
    registry.add(e, String::from("name"));
    registry.add(e, 2.5_f64);

    registry.destroy_entity(e);

    assert!(!registry.has::<i32>(e));
    assert!(!registry.has::<String>(e));
    assert!(!registry.has::<f64>(e));
    assert_eq!(registry.pool_ref::<String>().iter().count(), 0);
}

#[test]
fn pool_iteration_covers_live_components() {
    let mut registry = Registry::new();
    let ids: Vec<_> = (0..10).map(|_| registry.create_entity()).collect();
    {
        let mut pool = registry.pool::<u64>();
        for (value, &id) in (1..).zip(&ids) {
            pool.insert(id, value);
        }
        assert!(pool.remove(ids[3]));
        for value in pool.iter_mut() {
            *value *= 2;
        }
    }
    registry.destroy_entity(ids[5]);

    let pool = registry.pool_ref::<u64>();
    let mut seen: Vec<u64> = pool.iter().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![2, 4, 6, 10, 14, 16, 18, 20]);

    for (id, value) in pool {
        assert!(registry.is_alive(id));
        assert_eq!(registry.get::<u64>(id), Ok(value));
    }
}

#[test]
fn registry_from_toml_config() {
    let config = RegistryConfig::from_toml_str(
        r"
        entity_capacity = 4096
        storage_capacity = 128
        ",
    )
    .unwrap();
    let mut registry = Registry::with_config(config);
    let e = registry.create_entity();
    registry.add(e, 'x');

    assert_eq!(registry.config().entity_capacity, 4096);
    assert!(registry.pool_ref::<char>().capacity() >= 128);
}

#[test]
fn panicking_constructor_does_not_leak_recycled_payload() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let mut registry = Registry::new();
    let old = registry.create_entity();
    registry.add(old, String::from("belongs to old"));
    registry.destroy_entity(old);
    let new = registry.create_entity();
    assert_eq!(new.slot(), old.slot());

    let result = catch_unwind(AssertUnwindSafe(|| {
        registry.add_with(new, || -> String { panic!("constructor failed") });
    }));

    assert!(result.is_err());
    assert!(!registry.has::<String>(new));
    assert_eq!(registry.try_get::<String>(new), None);
    assert_eq!(registry.pool_ref::<String>().storage().check_invariants(), Ok(()));
}

#[test]
fn panicking_constructor_keeps_fresh_storage_consistent() {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let mut registry = Registry::new();
    let a = registry.create_entity();
    let b = registry.create_entity();
    registry.add(a, 1_i32);

    let result = catch_unwind(AssertUnwindSafe(|| {
        registry.add_with(b, || -> i32 { panic!("constructor failed") });
    }));

    assert!(result.is_err());
    let pool = registry.pool_ref::<i32>();
    assert_eq!(pool.storage().check_invariants(), Ok(()));
    assert_eq!(pool.len(), 1);
    assert!(!registry.has::<i32>(b));
    assert_eq!(registry.get::<i32>(a), Ok(&1));

    registry.add(b, 2_i32);
    assert_eq!(registry.get::<i32>(b), Ok(&2));
}
