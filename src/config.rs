//! Pool configuration options

use crate::handle::ResourceKey;
use glam::Vec3;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Capacity policy of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PoolType {
    /// Hands out pre-warmed instances only; fails when empty
    Fixed,

    /// Constructs a new instance whenever the pool is empty
    #[default]
    Dynamic,

    /// Grows up to `max`, then evicts the longest-active instance
    Recycling,
}

/// How active instances find their way back to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReturnType {
    /// Only when the caller returns them
    #[default]
    Manual,

    /// Automatically, once active for the given duration
    Timed(Duration),

    /// Automatically, when something outside the pool deactivates the instance
    DetectExternalDeactivation,
}

/// Which lifecycle listeners get spawned/returned notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventScope {
    None,

    /// Listeners on the root node only
    #[default]
    RootOnly,

    /// Every listener in the tree, depth-first
    AllAttached,
}

/// Where a death effect appears
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EffectPlacement {
    /// At the position of the instance being returned
    #[default]
    AtOrigin,

    Fixed(Vec3),
}

/// Secondary resource spawned when an instance returns
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeathEffect {
    pub effect_key: ResourceKey,
    pub placement: EffectPlacement,

    /// How long the effect stays out before it is returned (or destroyed)
    pub duration: Option<Duration>,

    /// Whether the effect comes from a pool or is a standalone instance
    pub pooled: bool,
}

impl DeathEffect {
    pub fn new(effect_key: impl Into<ResourceKey>) -> Self {
        Self {
            effect_key: effect_key.into(),
            placement: EffectPlacement::AtOrigin,
            duration: None,
            pooled: true,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.placement = EffectPlacement::Fixed(position);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn unpooled(mut self) -> Self {
        self.pooled = false;
        self
    }
}

/// Health fraction below which something happens, once per activation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HealthThreshold {
    pub fraction: f32,
    pub return_to_pool: bool,
}

impl HealthThreshold {
    pub fn return_at(fraction: f32) -> Self {
        Self {
            fraction,
            return_to_pool: true,
        }
    }

    pub fn observe_at(fraction: f32) -> Self {
        Self {
            fraction,
            return_to_pool: false,
        }
    }
}

/// Configuration for one pool, fixed when the pool is created
///
/// The default is the permissive policy used when a pool is provisioned on
/// the fly: dynamic, unbounded, manually returned.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{EventScope, PoolOptions, PoolType};
/// use std::time::Duration;
///
/// let options = PoolOptions::recycling(8)
///     .with_min(4)
///     .with_event_scope(EventScope::AllAttached)
///     .with_delay_before_return(Duration::from_millis(250));
///
/// assert_eq!(options.pool_type, PoolType::Recycling);
/// assert_eq!(options.max, 8);
/// assert_eq!(options.min, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PoolOptions {
    /// Instances constructed up front
    pub min: usize,

    /// Capacity, 0 for unbounded
    pub max: usize,

    pub pool_type: PoolType,

    pub return_type: ReturnType,

    pub event_scope: EventScope,

    /// Grace window between a return request and the actual return
    pub delay_before_return: Option<Duration>,

    pub death_effect: Option<DeathEffect>,

    /// Lifetime of every activation unless the resource declares its own
    pub life_time: Option<Duration>,

    /// Whether an expired lifetime also spawns the death effect
    pub life_time_death_effect: bool,

    pub health_thresholds: Vec<HealthThreshold>,
}

impl PoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool of exactly `size` pre-warmed instances
    pub fn fixed(size: usize) -> Self {
        Self {
            min: size,
            max: size,
            pool_type: PoolType::Fixed,
            ..Self::default()
        }
    }

    pub fn dynamic() -> Self {
        Self::default()
    }

    /// Pool bounded to `max` instances that evicts the oldest activation when full
    pub fn recycling(max: usize) -> Self {
        Self {
            max,
            pool_type: PoolType::Recycling,
            ..Self::default()
        }
    }

    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_event_scope(mut self, scope: EventScope) -> Self {
        self.event_scope = scope;
        self
    }

    pub fn with_delay_before_return(mut self, delay: Duration) -> Self {
        self.delay_before_return = Some(delay);
        self
    }

    pub fn with_death_effect(mut self, effect: DeathEffect) -> Self {
        self.death_effect = Some(effect);
        self
    }

    /// Set a lifetime, and whether its expiry spawns the death effect
    pub fn with_life_time(mut self, life_time: Duration, spawn_death_effect: bool) -> Self {
        self.life_time = Some(life_time);
        self.life_time_death_effect = spawn_death_effect;
        self
    }

    pub fn with_health_threshold(mut self, threshold: HealthThreshold) -> Self {
        self.health_thresholds.push(threshold);
        self.health_thresholds
            .sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
        self
    }

    /// Number of instances to construct when the pool is created
    pub(crate) fn prewarm_count(&self) -> usize {
        match self.pool_type {
            PoolType::Recycling if self.max > 0 => self.min.min(self.max),
            _ => self.min,
        }
    }

    /// Whether the Recycling capacity bound applies
    pub(crate) fn is_bounded_recycling(&self) -> bool {
        self.pool_type == PoolType::Recycling && self.max > 0
    }
}
