//! Core pool implementation

use crate::config::{PoolOptions, PoolType, ReturnType};
use crate::death_effect::DeathEffectRequest;
use crate::errors::{PoolError, PoolResult};
use crate::events::{LifecycleEventDispatcher, PoolEvent};
use crate::handle::{Arena, Handle, ResourceKey};
use crate::item::{ArrivalReason, ItemState, PoolItem, ReturnCallback};
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::registry::Deferred;
use crate::resource::{Instantiate, Resource};
use crate::scheduler::{ReturnScheduler, ScheduledAction};

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// Registry state a pool operates on, borrowed for the length of one operation
pub(crate) struct PoolContext<'a, R> {
    pub items: &'a mut Arena<PoolItem<R>>,
    pub scheduler: &'a mut ReturnScheduler,
    pub factory: &'a mut (dyn Instantiate<R> + 'static),
    pub deferred: &'a mut VecDeque<Deferred<R>>,
    pub effects: &'a mut VecDeque<DeathEffectRequest>,
    pub now: Duration,
}

/// Instances of one resource type and the policy that governs them.
///
/// Every handle the pool constructs is, at all times, either in `inactive`
/// or in `active`. `spawn_order` mirrors `active` in activation order and is
/// only kept for recycling pools.
pub struct Pool {
    key: ResourceKey,
    options: PoolOptions,
    inactive: VecDeque<Handle>,
    active: HashSet<Handle>,
    spawn_order: VecDeque<Handle>,
    metrics: MetricsTracker,
}

impl Pool {
    pub(crate) fn new<R: Resource>(
        key: ResourceKey,
        options: PoolOptions,
        ctx: &mut PoolContext<'_, R>,
    ) -> Self {
        let mut pool = Self {
            key,
            options,
            inactive: VecDeque::new(),
            active: HashSet::new(),
            spawn_order: VecDeque::new(),
            metrics: MetricsTracker::new(),
        };

        for _ in 0..pool.options.prewarm_count() {
            let handle = pool.construct(ctx);
            pool.inactive.push_back(handle);
        }

        pool
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn available_count(&self) -> usize {
        self.inactive.len()
    }

    /// Active plus inactive instances
    pub fn total_count(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    pub fn constructed_count(&self) -> u64 {
        self.metrics.total_constructed
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.active.contains(&handle)
    }

    pub fn is_available(&self, handle: Handle) -> bool {
        self.inactive.contains(&handle)
    }

    /// Active handles in activation order; empty unless the pool recycles
    pub fn spawn_order(&self) -> impl Iterator<Item = Handle> + '_ {
        self.spawn_order.iter().copied()
    }

    pub fn metrics(&self) -> PoolMetrics {
        let capacity = if self.options.max > 0 {
            self.options.max
        } else {
            self.total_count()
        };
        self.metrics
            .get_metrics(self.active.len(), self.inactive.len(), capacity)
    }

    /// Hand out an instance according to the pool type
    pub(crate) fn get<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        callback: Option<ReturnCallback>,
    ) -> PoolResult<Handle> {
        let handle = match self.next_inactive(ctx) {
            Some(handle) => handle,
            None => match self.options.pool_type {
                PoolType::Fixed => {
                    self.metrics.exhausted_events += 1;
                    log::debug!("Pool '{}' is exhausted", self.key);
                    return Err(PoolError::Exhausted(self.key.clone()));
                }
                PoolType::Dynamic => self.construct(ctx),
                PoolType::Recycling => {
                    if !self.options.is_bounded_recycling() || self.total_count() < self.options.max {
                        self.construct(ctx)
                    } else {
                        self.evict_oldest(ctx);
                        match self.next_inactive(ctx) {
                            Some(handle) => handle,
                            None => {
                                log::warn!("Pool '{}' found nothing to evict, constructing instead", self.key);
                                self.construct(ctx)
                            }
                        }
                    }
                }
            },
        };

        self.activate(ctx, handle, callback);
        self.metrics.total_retrieved += 1;
        Ok(handle)
    }

    /// Ask for an instance to come back, honouring the grace window
    pub(crate) fn return_handle<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
        reason: ArrivalReason,
    ) {
        let Some(item) = ctx.items.get_mut(handle) else {
            return;
        };

        match item.state {
            ItemState::Inactive => {
                log::debug!("{handle} is already back in pool '{}'", self.key);
                return;
            }
            ItemState::ReturningPending => {
                log::trace!("{handle} already has a return pending");
                return;
            }
            ItemState::Active => {}
        }

        ctx.scheduler.cancel(handle);

        if let Some(delay) = self.options.delay_before_return {
            item.state = ItemState::ReturningPending;
            item.resource.on_return_delay_started();

            // An expired lifetime keeps its reason so the death effect gate still applies.
            let reason = match reason {
                ArrivalReason::LifetimeExpired => reason,
                _ => ArrivalReason::DelayBeforeReturnElapsed,
            };
            ctx.scheduler.schedule(
                handle,
                ctx.now + delay,
                ScheduledAction::FinishDelayedReturn(reason),
            );
            return;
        }

        self.finalize(ctx, handle, reason);
    }

    /// Complete a return whose grace window elapsed
    pub(crate) fn finish_delayed_return<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
        reason: ArrivalReason,
    ) {
        if !ctx.items.get(handle).is_some_and(PoolItem::is_returning) {
            return;
        }

        self.finalize(ctx, handle, reason);
        if let Some(item) = ctx.items.get_mut(handle) {
            item.resource.on_return_delay_ended();
        }
    }

    /// Return immediately, skipping the grace window and any pending action.
    ///
    /// A grace window cut short still gets its end hook.
    pub(crate) fn force_return<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
        reason: ArrivalReason,
    ) {
        let Some(item) = ctx.items.get(handle) else {
            return;
        };
        if !item.is_active() {
            return;
        }
        let was_returning = item.is_returning();

        ctx.scheduler.cancel(handle);
        self.finalize(ctx, handle, reason);

        if was_returning {
            if let Some(item) = ctx.items.get_mut(handle) {
                item.resource.on_return_delay_ended();
            }
        }
    }

    /// Return active instances that outlived a timed return delay. Oldest first.
    pub(crate) fn sweep_timed<R: Resource>(&mut self, ctx: &mut PoolContext<'_, R>) -> usize {
        let ReturnType::Timed(delay) = self.options.return_type else {
            return 0;
        };

        let now = ctx.now;
        let expired = self.active_where(ctx.items, |item| {
            item.state == ItemState::Active && item.active_for(now) >= delay
        });

        for &handle in &expired {
            self.force_return(ctx, handle, ArrivalReason::Unspecified);
        }
        expired.len()
    }

    /// Return active instances that were deactivated behind the pool's back
    pub(crate) fn sweep_external<R: Resource>(&mut self, ctx: &mut PoolContext<'_, R>) -> usize {
        if self.options.return_type != ReturnType::DetectExternalDeactivation {
            return 0;
        }

        let hidden = self.active_where(ctx.items, |item| {
            item.state == ItemState::Active && !item.detection_suppressed && !item.resource.is_live()
        });

        for &handle in &hidden {
            log::debug!("{handle} was deactivated outside pool '{}'", self.key);
            self.return_handle(ctx, handle, ArrivalReason::Unspecified);
        }
        hidden.len()
    }

    pub(crate) fn sweep_health<R: Resource>(&mut self, ctx: &mut PoolContext<'_, R>) -> usize {
        if self.options.health_thresholds.is_empty() {
            return 0;
        }

        let candidates = self.active_where(ctx.items, |item| item.state == ItemState::Active);
        candidates
            .into_iter()
            .filter(|&handle| self.evaluate_health(ctx, handle))
            .count()
    }

    /// Fire every health threshold the instance is at or below and has not
    /// fired yet in this activation.
    ///
    /// Returns whether a threshold sent the instance back to the pool.
    pub(crate) fn evaluate_health<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
    ) -> bool {
        if self.options.health_thresholds.is_empty() {
            return false;
        }

        let Some(item) = ctx.items.get_mut(handle) else {
            return false;
        };
        if item.state != ItemState::Active {
            return false;
        }
        let Some(current) = item.resource.health_fraction() else {
            return false;
        };

        let mut send_back = false;
        for (index, threshold) in self.options.health_thresholds.iter().enumerate() {
            let already_fired = item.fired_thresholds.get(index).copied().unwrap_or(true);
            if already_fired || current > threshold.fraction {
                continue;
            }

            item.fired_thresholds[index] = true;
            log::debug!(
                "{handle} in pool '{}' dropped below {:.0}% health",
                self.key,
                threshold.fraction * 100.0
            );

            if threshold.return_to_pool {
                send_back = true;
                break;
            }
        }

        if send_back {
            self.return_handle(ctx, handle, ArrivalReason::Unspecified);
        }
        send_back
    }

    /// Destroy every instance of the pool. Pending callbacks are dropped unrun.
    pub(crate) fn teardown<R: Resource>(self, ctx: &mut PoolContext<'_, R>) -> usize {
        let mut destroyed = 0;
        for &handle in self.inactive.iter().chain(self.active.iter()) {
            ctx.scheduler.cancel(handle);
            if let Some(mut item) = ctx.items.remove(handle) {
                if item.is_returning() {
                    item.resource.on_return_delay_ended();
                }
                item.resource.set_controlled_by_pool(false);
                destroyed += 1;
            }
        }

        log::debug!("Pool '{}' torn down, {destroyed} instance(s) destroyed", self.key);
        destroyed
    }

    fn construct<R: Resource>(&mut self, ctx: &mut PoolContext<'_, R>) -> Handle {
        let mut resource = ctx.factory.instantiate(&self.key);
        resource.set_controlled_by_pool(true);
        resource.set_live(false);

        self.metrics.total_constructed += 1;
        let handle = ctx.items.insert(PoolItem::pooled(resource, self.key.clone()));
        log::trace!("Pool '{}' constructed {handle}", self.key);
        handle
    }

    fn next_inactive<R>(&mut self, ctx: &PoolContext<'_, R>) -> Option<Handle> {
        while let Some(handle) = self.inactive.pop_front() {
            if ctx.items.contains(handle) {
                return Some(handle);
            }
        }
        None
    }

    fn activate<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
        callback: Option<ReturnCallback>,
    ) {
        let Some(item) = ctx.items.get_mut(handle) else {
            return;
        };

        item.begin_activation(ctx.now, callback, self.options.health_thresholds.len());

        self.active.insert(handle);
        if self.options.pool_type == PoolType::Recycling {
            self.spawn_order.push_back(handle);
        }

        item.resource.set_live(true);
        LifecycleEventDispatcher::dispatch(&mut item.resource, self.options.event_scope, PoolEvent::Spawned);

        if let Some(life_time) = item.resource.life_time().or(self.options.life_time) {
            ctx.scheduler.schedule(
                handle,
                ctx.now + life_time,
                ScheduledAction::Return(ArrivalReason::LifetimeExpired),
            );
        }
    }

    fn evict_oldest<R: Resource>(&mut self, ctx: &mut PoolContext<'_, R>) {
        while let Some(victim) = self.spawn_order.pop_front() {
            if !self.active.contains(&victim) {
                continue;
            }

            log::debug!("Pool '{}' is full, evicting {victim}", self.key);
            self.metrics.evictions += 1;
            self.force_return(ctx, victim, ArrivalReason::Unspecified);
            return;
        }
    }

    fn finalize<R: Resource>(
        &mut self,
        ctx: &mut PoolContext<'_, R>,
        handle: Handle,
        reason: ArrivalReason,
    ) {
        let Some(item) = ctx.items.get_mut(handle) else {
            return;
        };

        self.active.remove(&handle);
        if self.options.pool_type == PoolType::Recycling {
            self.spawn_order.retain(|&h| h != handle);
        }

        LifecycleEventDispatcher::dispatch(&mut item.resource, self.options.event_scope, PoolEvent::Returned);

        if let Some(effect) = &self.options.death_effect {
            if self.spawns_death_effect(reason) {
                ctx.effects
                    .push_back(DeathEffectRequest::new(effect.clone(), item.resource.position()));
            }
        }

        item.resource.set_live(false);
        item.state = ItemState::Inactive;
        let callback = item.pending_callback.take();

        if let Some(callback) = callback {
            callback(handle, reason);
        }

        self.inactive.push_back(handle);
        ctx.deferred.push_back(Deferred::Park(handle));
        self.metrics.total_returned += 1;
    }

    /// Expiry only gets the effect when explicitly asked for
    fn spawns_death_effect(&self, reason: ArrivalReason) -> bool {
        reason != ArrivalReason::LifetimeExpired || self.options.life_time_death_effect
    }

    fn active_where<R>(
        &self,
        items: &Arena<PoolItem<R>>,
        predicate: impl Fn(&PoolItem<R>) -> bool,
    ) -> Vec<Handle> {
        let mut matching: Vec<(Duration, Handle)> = self
            .active
            .iter()
            .filter_map(|&handle| {
                let item = items.get(handle)?;
                predicate(item).then_some((item.activation_time, handle))
            })
            .collect();
        matching.sort_unstable();
        matching.into_iter().map(|(_, handle)| handle).collect()
    }
}
