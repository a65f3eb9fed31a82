//! Basic usage examples for PoolRegistry

use esox_resourcepool::{
    DeathEffect, HealthThreshold, PoolOptions, PoolRegistry, Resource, ResourceKey, ReturnType,
};
use std::time::Duration;

struct Projectile {
    kind: ResourceKey,
    live: bool,
    health: f32,
}

impl Resource for Projectile {
    fn set_live(&mut self, live: bool) {
        self.live = live;
        if live {
            self.health = 1.0;
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn health_fraction(&self) -> Option<f32> {
        Some(self.health)
    }
}

fn registry() -> PoolRegistry<Projectile> {
    PoolRegistry::init(|key: &ResourceKey| Projectile {
        kind: key.clone(),
        live: false,
        health: 1.0,
    })
}

fn main() {
    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Fixed pool
    fixed_pool();

    // Example 2: Recycling pool
    recycling_pool();

    // Example 3: Timed returns and death effects
    timed_with_effects();

    // Example 4: Health thresholds
    health_thresholds();
}

fn fixed_pool() {
    println!("1. Fixed Pool:");
    let mut registry = registry();
    registry.create_pool("arrow", PoolOptions::fixed(2)).unwrap();

    let first = registry.get("arrow").unwrap();
    let _second = registry.get("arrow").unwrap();
    println!("   Third request: {:?}", registry.get("arrow").err());

    registry.return_to_pool(first);
    println!("   Available after return: {}\n", registry.pool("arrow").unwrap().available_count());
}

fn recycling_pool() {
    println!("2. Recycling Pool:");
    let mut registry = registry();
    registry.create_pool("bolt", PoolOptions::recycling(3)).unwrap();

    let handles: Vec<_> = (0..4).map(|_| registry.get("bolt").unwrap()).collect();
    println!("   Fourth bolt reused the first: {}", handles[3] == handles[0]);
    println!("   Evictions: {}\n", registry.metrics("bolt").unwrap().evictions);
}

fn timed_with_effects() {
    println!("3. Timed Returns:");
    let mut registry = registry();
    registry
        .create_pool(
            "fireball",
            PoolOptions::dynamic()
                .with_return_type(ReturnType::Timed(Duration::from_secs(1)))
                .with_death_effect(DeathEffect::new("explosion").with_duration(Duration::from_millis(500))),
        )
        .unwrap();

    let fireball = registry
        .get_with_callback("fireball", |handle, reason| {
            println!("   {handle} came back: {reason:?}");
        })
        .unwrap();

    registry.tick(Duration::from_secs(1));
    println!("   Fireball active: {}", registry.is_active(fireball));
    println!(
        "   Explosions out: {}",
        registry.pool("explosion").map_or(0, |pool| pool.active_count())
    );

    registry.tick(Duration::from_millis(500));
    println!(
        "   Explosions out after 1.5s: {}\n",
        registry.pool("explosion").map_or(0, |pool| pool.active_count())
    );
}

fn health_thresholds() {
    println!("4. Health Thresholds:");
    let mut registry = registry();
    registry
        .create_pool(
            "slime",
            PoolOptions::dynamic()
                .with_health_threshold(HealthThreshold::observe_at(0.5))
                .with_health_threshold(HealthThreshold::return_at(0.0)),
        )
        .unwrap();

    let slime = registry.get("slime").unwrap();
    for hit in [0.4, 0.2, 0.0] {
        if let Some(body) = registry.resource_mut(slime) {
            body.health = hit;
        }
        let returned = registry.notify_health_changed(slime);
        println!("   Health {hit:.1}, sent back: {returned}");
    }

    let kind = &registry.resource(slime).unwrap().kind;
    println!("   Pool of {kind}: {:?}\n", registry.metrics("slime").unwrap().export()["total_returned"]);
}
