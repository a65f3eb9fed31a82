//! # EsoxSolutions.ResourcePool
//!
//! Single-threaded resource lifecycle pool for games and simulations:
//! effects, projectiles, pickups and bodies that are expensive to create and
//! cheap to hide.
//!
//! ## Features
//!
//! - Fixed, dynamic and recycling (bounded, evict-oldest) pools
//! - Generational handles that never alias a destroyed instance
//! - Manual, timed and external-deactivation return policies
//! - Delayed returns with start/end hooks, lifetimes, one-shot return callbacks
//! - Death effects spawned through the same pools when an instance returns
//! - Spawned/returned lifecycle events at root or whole-tree scope
//! - Health thresholds that send an instance back once it drops low enough
//! - Metrics with Prometheus export
//! - Async fixed-period tick driver
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{PoolOptions, PoolRegistry, Resource, ResourceKey};
//!
//! struct Arrow { live: bool }
//!
//! impl Resource for Arrow {
//!     fn set_live(&mut self, live: bool) { self.live = live; }
//!     fn is_live(&self) -> bool { self.live }
//! }
//!
//! let mut registry = PoolRegistry::init(|_: &ResourceKey| Arrow { live: false });
//! registry.create_pool("arrow", PoolOptions::fixed(2)).unwrap();
//!
//! let first = registry.get("arrow").unwrap();
//! let second = registry.get("arrow").unwrap();
//! assert_ne!(first, second);
//! assert!(registry.get("arrow").is_err());
//!
//! assert!(registry.return_to_pool(first));
//! assert_eq!(registry.get("arrow").unwrap(), first);
//! ```

mod config;
mod death_effect;
mod driver;
mod errors;
mod events;
mod handle;
mod item;
mod metrics;
mod pool;
mod registry;
mod resource;
mod scheduler;

pub use config::{DeathEffect, EffectPlacement, EventScope, HealthThreshold, PoolOptions, PoolType, ReturnType};
pub use death_effect::DeathEffectSpawner;
pub use driver::TickDriver;
pub use errors::{PoolError, PoolResult};
pub use events::{LifecycleEventDispatcher, PoolEvent};
pub use handle::{Handle, ResourceKey};
pub use item::{ArrivalReason, ItemState, ReturnCallback};
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use pool::Pool;
pub use registry::PoolRegistry;
pub use resource::{Instantiate, LifecycleNode, PoolLifecycle, Resource};
pub use scheduler::{ReturnScheduler, ScheduledAction};

pub use glam::Vec3;
