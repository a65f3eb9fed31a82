// EsoxSolutions.ResourcePool
// Single-threaded resource lifecycle pool
// Version 1.0.0

// Small simulation that drives a registry for one second.
// Run with: RUST_LOG=debug cargo run

use esox_resourcepool::{
    DeathEffect, PoolOptions, PoolRegistry, Resource, ResourceKey, ReturnType, TickDriver, Vec3,
};
use std::time::Duration;

struct Sprite {
    live: bool,
    position: Vec3,
}

impl Resource for Sprite {
    fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn place(&mut self, position: Vec3) {
        self.position = position;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    println!("=== EsoxSolutions.ResourcePool v1.0.0 ===");
    println!("Run: cargo run --example projectiles");
    println!();

    let mut registry = PoolRegistry::init(|_: &ResourceKey| Sprite {
        live: false,
        position: Vec3::ZERO,
    });

    registry
        .create_pool(
            "bullet",
            PoolOptions::recycling(16)
                .with_min(8)
                .with_return_type(ReturnType::Timed(Duration::from_millis(300)))
                .with_death_effect(DeathEffect::new("spark").with_duration(Duration::from_millis(100))),
        )
        .expect("fresh registry has no bullet pool");

    let mut shots = 0u32;
    let frames = TickDriver::new(Duration::from_millis(16))
        .run(
            &mut registry,
            |registry| {
                shots += 1;
                if let Some(sprite) = registry
                    .get("bullet")
                    .ok()
                    .and_then(|bullet| registry.resource_mut(bullet))
                {
                    sprite.place(Vec3::new(shots as f32, 0.0, 0.0));
                }
            },
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await;

    println!("Quick Demo:");
    println!("  Frames run: {frames}");
    for key in ["bullet", "spark"] {
        if let Some(metrics) = registry.metrics(key) {
            println!(
                "  {key}: retrieved {}, returned {}, constructed {}, evicted {}",
                metrics.total_retrieved, metrics.total_returned, metrics.total_constructed, metrics.evictions
            );
        }
    }

    registry.shutdown();
}
