//! Secondary instances spawned when a pooled instance returns

use crate::config::{DeathEffect, EffectPlacement, PoolOptions};
use crate::handle::Handle;
use crate::item::ArrivalReason;
use crate::registry::PoolRegistry;
use crate::resource::Resource;
use crate::scheduler::ScheduledAction;
use glam::Vec3;

/// A death effect waiting to be spawned once the current operation completes
#[derive(Debug, Clone)]
pub(crate) struct DeathEffectRequest {
    pub effect: DeathEffect,
    pub origin: Vec3,
}

impl DeathEffectRequest {
    pub fn new(effect: DeathEffect, origin: Vec3) -> Self {
        Self { effect, origin }
    }
}

/// Spawns death effects through the registry's own get/return machinery
pub struct DeathEffectSpawner;

impl DeathEffectSpawner {
    /// Spawn one instance of `effect` for something that ended at `origin`.
    ///
    /// Pooled effects come from the effect key's pool, which is created with
    /// default options on first use. Unpooled effects are instantiated
    /// standalone and destroyed when their duration runs out. Returns `None`
    /// when the effect pool is exhausted.
    pub fn spawn<R: Resource>(
        registry: &mut PoolRegistry<R>,
        effect: &DeathEffect,
        origin: Vec3,
    ) -> Option<Handle> {
        let key = &effect.effect_key;
        let position = match effect.placement {
            EffectPlacement::AtOrigin => origin,
            EffectPlacement::Fixed(position) => position,
        };

        let handle = if effect.pooled {
            if !registry.has_pool(key) {
                registry.create_pool(key, PoolOptions::default()).ok()?;
            }
            match registry.get(key) {
                Ok(handle) => handle,
                Err(err) => {
                    log::debug!("Death effect skipped: {err}");
                    return None;
                }
            }
        } else {
            let mut resource = registry.instantiate(key);
            resource.set_live(true);
            registry.adopt(resource)
        };

        if let Some(resource) = registry.resource_mut(handle) {
            resource.place(position);
        }

        if let Some(duration) = effect.duration {
            let action = if effect.pooled {
                ScheduledAction::Return(ArrivalReason::LifetimeExpired)
            } else {
                ScheduledAction::Destroy
            };
            registry.schedule_after(handle, duration, action);
        }

        log::debug!("Spawned death effect '{key}' as {handle} at {position}");
        Some(handle)
    }

    pub(crate) fn spawn_requested<R: Resource>(
        registry: &mut PoolRegistry<R>,
        request: DeathEffectRequest,
    ) -> Option<Handle> {
        Self::spawn(registry, &request.effect, request.origin)
    }
}
