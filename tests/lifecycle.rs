mod common;

use common::{Returns, World, recording_callback, secs};
use esox_resourcepool::{ArrivalReason, EventScope, ItemState, PoolError, PoolOptions, PoolType};

#[test]
fn test_fixed_pool_exhaustion() {
    let mut world = World::new();
    world.registry.create_pool("arrow", PoolOptions::fixed(2)).unwrap();

    let first = world.registry.get("arrow").unwrap();
    let second = world.registry.get("arrow").unwrap();
    assert_ne!(first, second);

    assert_eq!(
        world.registry.get("arrow"),
        Err(PoolError::Exhausted("arrow".into()))
    );
    assert!(world.registry.try_get("arrow").is_none());
    assert_eq!(world.registry.metrics("arrow").unwrap().exhausted_events, 2);
    assert_eq!(world.registry.pool("arrow").unwrap().constructed_count(), 2);
}

#[test]
fn test_dynamic_pool_reuses_returned_handle() {
    let mut world = World::new();
    world.registry.create_pool("coin", PoolOptions::dynamic()).unwrap();
    assert_eq!(world.available("coin"), 0);

    let coin = world.registry.get("coin").unwrap();
    assert_eq!(world.registry.pool("coin").unwrap().constructed_count(), 1);

    assert!(world.registry.return_to_pool(coin));
    assert_eq!(world.available("coin"), 1);

    assert_eq!(world.registry.get("coin").unwrap(), coin);
    assert_eq!(world.registry.pool("coin").unwrap().constructed_count(), 1);
}

#[test]
fn test_conservation_across_mixed_operations() {
    let mut world = World::new();
    world.registry.create_pool("fixed", PoolOptions::fixed(4)).unwrap();
    world.registry.create_pool("dynamic", PoolOptions::dynamic().with_min(2)).unwrap();
    world.registry.create_pool("recycling", PoolOptions::recycling(5).with_min(1)).unwrap();

    let keys = ["fixed", "dynamic", "recycling"];
    let mut out = Vec::new();

    for step in 0..90u32 {
        let key = keys[(step % 3) as usize];
        if step % 7 == 3 && !out.is_empty() {
            let handle = out.remove((step as usize * 5) % out.len());
            world.registry.return_to_pool(handle);
        } else if let Ok(handle) = world.registry.get(key) {
            if !out.contains(&handle) {
                out.push(handle);
            }
        }

        for key in keys {
            let pool = world.registry.pool(key).unwrap();
            assert_eq!(pool.total_count() as u64, pool.constructed_count(), "{key} at step {step}");
        }
    }
}

#[test]
fn test_recycling_capacity_bound() {
    let mut world = World::new();
    world.registry.create_pool("bolt", PoolOptions::recycling(3)).unwrap();

    for step in 0..20 {
        let handle = world.registry.get("bolt").unwrap();
        if step % 4 == 0 {
            world.registry.return_to_pool(handle);
        }
        assert!(world.registry.pool("bolt").unwrap().total_count() <= 3);
    }
    assert_eq!(world.registry.pool("bolt").unwrap().constructed_count(), 3);
}

#[test]
fn test_recycling_evicts_in_activation_order() {
    let mut world = World::new();
    world.registry.create_pool("bolt", PoolOptions::recycling(3)).unwrap();

    let a = world.registry.get("bolt").unwrap();
    let b = world.registry.get("bolt").unwrap();
    let c = world.registry.get("bolt").unwrap();

    // Touching b does not change who is oldest
    world.body_mut(b).position.x = 10.0;
    world.clear_events();

    let d = world.registry.get("bolt").unwrap();
    assert_eq!(d, a);
    assert_eq!(world.events(), vec!["returned:root#0", "spawned:root#0"]);
    assert!(world.registry.is_active(b));
    assert!(world.registry.is_active(c));

    world.clear_events();
    assert_eq!(world.registry.get("bolt").unwrap(), b);
    assert_eq!(world.events(), vec!["returned:root#1", "spawned:root#1"]);
    assert_eq!(world.registry.metrics("bolt").unwrap().evictions, 2);
}

#[test]
fn test_double_return_is_idempotent() {
    let mut world = World::new();
    let returns = Returns::default();

    let handle = world
        .registry
        .get_with_callback("gem", recording_callback(&returns))
        .unwrap();

    assert!(world.registry.return_to_pool(handle));
    assert!(world.registry.return_to_pool(handle));

    assert_eq!(world.count("returned:"), 1);
    assert_eq!(*returns.borrow(), vec![(handle, ArrivalReason::ManualReturn)]);
    assert_eq!(world.registry.metrics("gem").unwrap().total_returned, 1);
}

#[test]
fn test_callback_belongs_to_one_activation() {
    let mut world = World::new();
    let returns = Returns::default();

    let handle = world
        .registry
        .get_with_callback("gem", recording_callback(&returns))
        .unwrap();
    world.registry.return_to_pool(handle);

    assert_eq!(world.registry.get("gem").unwrap(), handle);
    world.registry.return_to_pool(handle);

    assert_eq!(returns.borrow().len(), 1);
}

#[test]
fn test_delayed_return_finalizes_once() {
    let mut world = World::new();
    world
        .registry
        .create_pool("mob", PoolOptions::dynamic().with_delay_before_return(secs(2)))
        .unwrap();
    let returns = Returns::default();

    let mob = world
        .registry
        .get_with_callback("mob", recording_callback(&returns))
        .unwrap();
    assert!(world.registry.return_to_pool(mob));
    assert_eq!(world.registry.state(mob), Some(ItemState::ReturningPending));
    assert_eq!(world.events().last().map(String::as_str), Some("delay-start:0"));

    // A second request while pending does not reschedule
    world.registry.tick(secs(1));
    assert!(world.registry.return_to_pool(mob));
    assert_eq!(world.registry.scheduled_at(mob), Some(secs(2)));
    assert!(world.registry.is_active(mob));
    assert_eq!(world.active("mob"), 1);

    world.registry.tick(secs(1));
    assert!(!world.registry.is_active(mob));
    assert_eq!(world.available("mob"), 1);

    world.registry.tick(secs(5));
    assert_eq!(world.count("returned:"), 1);
    assert_eq!(world.count("delay-start:"), 1);
    assert_eq!(world.count("delay-end:"), 1);
    assert_eq!(
        *returns.borrow(),
        vec![(mob, ArrivalReason::DelayBeforeReturnElapsed)]
    );
}

#[test]
fn test_delay_end_hook_runs_after_finalize() {
    let mut world = World::new();
    world
        .registry
        .create_pool("mob", PoolOptions::dynamic().with_delay_before_return(secs(1)))
        .unwrap();

    let mob = world.registry.get("mob").unwrap();
    world.registry.return_to_pool(mob);
    world.registry.tick(secs(1));

    assert_eq!(
        world.events(),
        vec!["spawned:root#0", "delay-start:0", "returned:root#0", "delay-end:0"]
    );
}

#[test]
fn test_eviction_bypasses_delay_before_return() {
    let mut world = World::new();
    world
        .registry
        .create_pool("bolt", PoolOptions::recycling(1).with_delay_before_return(secs(3)))
        .unwrap();

    let first = world.registry.get("bolt").unwrap();
    world.registry.return_to_pool(first);
    assert!(world.registry.is_returning(first));

    // The pending return is cancelled by the eviction
    let again = world.registry.get("bolt").unwrap();
    assert_eq!(again, first);
    assert_eq!(world.registry.state(first), Some(ItemState::Active));
    assert_eq!(world.registry.scheduled_at(first), None);

    world.registry.tick(secs(5));
    assert!(world.registry.is_active(first));
    assert_eq!(world.count("returned:"), 1);
    assert_eq!(world.count("delay-start:"), 1);
    assert_eq!(world.count("delay-end:"), 1);
}

#[test]
fn test_teardown_ends_pending_delay() {
    let mut world = World::new();
    world
        .registry
        .create_pool("mob", PoolOptions::dynamic().with_delay_before_return(secs(3)))
        .unwrap();

    let mob = world.registry.get("mob").unwrap();
    world.registry.return_to_pool(mob);
    assert!(world.registry.remove_pool("mob"));

    assert_eq!(world.count("delay-start:"), 1);
    assert_eq!(world.count("delay-end:"), 1);
    assert_eq!(world.count("returned:"), 0);
}

#[test]
fn test_event_scope_root_only() {
    let mut world = World::new();
    world
        .registry
        .create_pool("ward", PoolOptions::dynamic().with_event_scope(EventScope::RootOnly))
        .unwrap();

    let ward = world.registry.get("ward").unwrap();
    world.registry.return_to_pool(ward);

    assert_eq!(world.events(), vec!["spawned:root#0", "returned:root#0"]);
}

#[test]
fn test_event_scope_all_attached() {
    let mut world = World::new();
    world
        .registry
        .create_pool("ward", PoolOptions::dynamic().with_event_scope(EventScope::AllAttached))
        .unwrap();

    let ward = world.registry.get("ward").unwrap();
    world.registry.return_to_pool(ward);

    assert_eq!(
        world.events(),
        vec!["spawned:root#0", "spawned:deep#0", "returned:root#0", "returned:deep#0"]
    );
}

#[test]
fn test_event_scope_none() {
    let mut world = World::new();
    world
        .registry
        .create_pool("ward", PoolOptions::dynamic().with_event_scope(EventScope::None))
        .unwrap();

    let ward = world.registry.get("ward").unwrap();
    world.registry.return_to_pool(ward);

    assert!(world.events().is_empty());
}

#[test]
fn test_unknown_key_gets_default_pool() {
    let mut world = World::new();
    assert!(!world.registry.has_pool("ghost"));

    let ghost = world.registry.get("ghost").unwrap();
    assert!(world.registry.has_pool("ghost"));
    assert_eq!(world.registry.pool_of(ghost).map(|k| k.as_str()), Some("ghost"));

    let pool = world.registry.pool("ghost").unwrap();
    assert_eq!(pool.options().pool_type, PoolType::Dynamic);
    assert_eq!(pool.options().max, 0);
}

#[test]
fn test_duplicate_pool_is_rejected_without_changes() {
    let mut world = World::new();
    world.registry.create_pool("arrow", PoolOptions::fixed(2)).unwrap();

    assert_eq!(
        world.registry.create_pool("arrow", PoolOptions::dynamic().with_min(9)),
        Err(PoolError::DuplicatePool("arrow".into()))
    );

    let pool = world.registry.pool("arrow").unwrap();
    assert_eq!(pool.options().pool_type, PoolType::Fixed);
    assert_eq!(pool.available_count(), 2);
}

#[test]
fn test_untracked_return_destroys_instance() {
    let mut world = World::new();
    let loose = world.adopt_body(99);
    assert_eq!(world.registry.instance_count(), 1);
    assert!(world.registry.pool_of(loose).is_none());

    assert!(!world.registry.return_to_pool(loose));
    assert!(world.registry.resource(loose).is_none());
    assert_eq!(world.registry.instance_count(), 0);
    assert!(world.events().is_empty());
}

#[test]
fn test_stale_handle_is_ignored() {
    let mut world = World::new();
    let stray = world.registry.get("stray").unwrap();

    assert!(world.registry.remove_pool("stray"));
    assert!(!world.registry.remove_pool("stray"));
    assert!(!world.registry.return_to_pool(stray));
    assert_eq!(world.registry.state(stray), None);

    // The slot is reused under a new generation
    let fresh = world.registry.get("stray").unwrap();
    assert_eq!(fresh.index(), stray.index());
    assert_ne!(fresh, stray);
    assert!(!world.registry.return_to_pool(stray));
    assert!(world.registry.is_active(fresh));
}

#[test]
fn test_remove_pool_drops_pending_callbacks() {
    let mut world = World::new();
    let returns = Returns::default();
    world
        .registry
        .create_pool("mob", PoolOptions::dynamic().with_delay_before_return(secs(1)))
        .unwrap();

    let mob = world
        .registry
        .get_with_callback("mob", recording_callback(&returns))
        .unwrap();
    world.registry.return_to_pool(mob);
    assert!(world.registry.remove_pool("mob"));

    world.registry.tick(secs(2));
    assert!(returns.borrow().is_empty());
    assert_eq!(world.registry.instance_count(), 0);
    assert_eq!(world.registry.scheduled_at(mob), None);
}

#[test]
fn test_shutdown_releases_everything() {
    let mut world = World::new();
    world.registry.create_pool("fixed", PoolOptions::fixed(3)).unwrap();
    world.registry.get("dynamic").unwrap();
    world.adopt_body(42);
    assert_eq!(world.registry.instance_count(), 5);
    assert_eq!(world.registry.pool_count(), 2);

    world.registry.shutdown();
}
