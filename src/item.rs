//! Per-instance bookkeeping

use crate::handle::{Handle, ResourceKey};
use std::time::Duration;

/// Why an instance came back to its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrivalReason {
    /// Forced by the pool itself (timed sweep, eviction, health, external deactivation)
    Unspecified,
    ManualReturn,
    LifetimeExpired,
    DelayBeforeReturnElapsed,
}

/// One-shot closure run when a specific activation ends
pub type ReturnCallback = Box<dyn FnOnce(Handle, ArrivalReason)>;

/// Lifecycle state of a pooled instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Inactive,
    Active,

    /// A delayed return has been requested and not yet finalized
    ReturningPending,
}

pub(crate) struct PoolItem<R> {
    pub resource: R,

    /// Owning pool, `None` for adopted instances
    pub owner: Option<ResourceKey>,

    pub state: ItemState,
    pub activation_time: Duration,
    pub pending_callback: Option<ReturnCallback>,

    /// Parallel to the owning pool's sorted health thresholds
    pub fired_thresholds: Vec<bool>,

    pub detection_suppressed: bool,
}

impl<R> PoolItem<R> {
    pub fn pooled(resource: R, owner: ResourceKey) -> Self {
        Self::new(resource, Some(owner))
    }

    pub fn untracked(resource: R) -> Self {
        let mut item = Self::new(resource, None);
        item.state = ItemState::Active;
        item
    }

    fn new(resource: R, owner: Option<ResourceKey>) -> Self {
        Self {
            resource,
            owner,
            state: ItemState::Inactive,
            activation_time: Duration::ZERO,
            pending_callback: None,
            fired_thresholds: Vec::new(),
            detection_suppressed: false,
        }
    }

    pub fn is_returning(&self) -> bool {
        self.state == ItemState::ReturningPending
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ItemState::Active | ItemState::ReturningPending)
    }

    /// Starts a new activation, dropping any leftovers from the previous one
    pub fn begin_activation(
        &mut self,
        now: Duration,
        callback: Option<ReturnCallback>,
        thresholds: usize,
    ) {
        self.state = ItemState::Active;
        self.activation_time = now;
        self.pending_callback = callback;
        self.fired_thresholds.clear();
        self.fired_thresholds.resize(thresholds, false);
        self.detection_suppressed = false;
    }

    pub fn active_for(&self, now: Duration) -> Duration {
        now.saturating_sub(self.activation_time)
    }
}
