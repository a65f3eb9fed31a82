//! Registry of pools, the composition root of the crate

use crate::config::PoolOptions;
use crate::death_effect::{DeathEffectRequest, DeathEffectSpawner};
use crate::errors::{PoolError, PoolResult};
use crate::handle::{Arena, Handle, ResourceKey};
use crate::item::{ArrivalReason, ItemState, PoolItem, ReturnCallback};
use crate::metrics::PoolMetrics;
use crate::pool::{Pool, PoolContext};
use crate::resource::{Instantiate, Resource};
use crate::scheduler::{ReturnScheduler, ScheduledAction};

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

/// Side effect applied to an instance at the end of the tick
pub(crate) enum Deferred<R> {
    /// Let a returned instance move itself out of the way
    Park(Handle),

    Call(Handle, Box<dyn FnOnce(&mut R)>),
}

/// Owns every pool, every instance and the simulation clock.
///
/// Constructed once by the caller with [`PoolRegistry::init`] and torn down
/// with [`PoolRegistry::shutdown`]. All mutation happens through `&mut self`
/// from a single owner, so there is no locking anywhere.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolOptions, PoolRegistry, Resource, ResourceKey};
/// use std::time::Duration;
///
/// struct Bolt { live: bool }
///
/// impl Resource for Bolt {
///     fn set_live(&mut self, live: bool) { self.live = live; }
///     fn is_live(&self) -> bool { self.live }
/// }
///
/// let mut registry = PoolRegistry::init(|_: &ResourceKey| Bolt { live: false });
/// registry
///     .create_pool("bolt", PoolOptions::dynamic().with_life_time(Duration::from_secs(2), false))
///     .unwrap();
///
/// let bolt = registry.get("bolt").unwrap();
/// assert!(registry.resource(bolt).unwrap().live);
///
/// registry.tick(Duration::from_secs(2));
/// assert!(!registry.is_active(bolt));
///
/// // The same instance is handed out again
/// assert_eq!(registry.get("bolt").unwrap(), bolt);
/// registry.shutdown();
/// ```
pub struct PoolRegistry<R> {
    pools: HashMap<ResourceKey, Pool>,
    items: Arena<PoolItem<R>>,
    scheduler: ReturnScheduler,
    factory: Box<dyn Instantiate<R>>,
    deferred: VecDeque<Deferred<R>>,
    effects: VecDeque<DeathEffectRequest>,
    clock: Duration,
    spawning_effects: bool,
}

impl<R: Resource> PoolRegistry<R> {
    /// Create an empty registry that builds instances with `factory`
    pub fn init(factory: impl Instantiate<R> + 'static) -> Self {
        log::info!("Pool registry initialized");
        Self {
            pools: HashMap::new(),
            items: Arena::new(),
            scheduler: ReturnScheduler::new(),
            factory: Box::new(factory),
            deferred: VecDeque::new(),
            effects: VecDeque::new(),
            clock: Duration::ZERO,
            spawning_effects: false,
        }
    }

    /// Tear down every pool and destroy every instance, pooled or not
    pub fn shutdown(mut self) {
        let pool_count = self.pools.len();
        let mut destroyed = 0;
        for key in self.sorted_keys() {
            destroyed += self.teardown_pool(&key);
        }

        let untracked = self.items.drain().len();
        self.deferred.clear();
        self.effects.clear();

        log::info!(
            "Pool registry shut down: {pool_count} pool(s), {destroyed} pooled and {untracked} untracked instance(s) destroyed"
        );
    }

    /// Create a pool for `key` and pre-warm it.
    ///
    /// Creating a pool for a key that already has one changes nothing and
    /// reports [`PoolError::DuplicatePool`].
    pub fn create_pool(&mut self, key: impl Into<ResourceKey>, options: PoolOptions) -> PoolResult<()> {
        let key = key.into();
        if self.pools.contains_key(&key) {
            log::warn!("Pool '{key}' already exists, keeping the existing one");
            return Err(PoolError::DuplicatePool(key));
        }

        let (pools, mut ctx) = self.split();
        let pool = Pool::new(key.clone(), options, &mut ctx);
        log::debug!(
            "Created {:?} pool '{key}' with {} pre-warmed instance(s)",
            pool.options().pool_type,
            pool.available_count()
        );
        pools.insert(key, pool);
        Ok(())
    }

    /// Tear down one pool, destroying its instances without running their callbacks
    pub fn remove_pool<Q>(&mut self, key: &Q) -> bool
    where
        ResourceKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(pool) = self.pools.remove(key) else {
            return false;
        };

        let (_, mut ctx) = self.split();
        pool.teardown(&mut ctx);
        true
    }

    pub fn has_pool<Q>(&self, key: &Q) -> bool
    where
        ResourceKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.pools.contains_key(key)
    }

    pub fn pool<Q>(&self, key: &Q) -> Option<&Pool>
    where
        ResourceKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.pools.get(key)
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Instances alive in the registry, pooled and adopted
    pub fn instance_count(&self) -> usize {
        self.items.len()
    }

    /// Get an instance of `key`.
    ///
    /// A key without a pool gets one with default options, with a warning.
    pub fn get(&mut self, key: impl Into<ResourceKey>) -> PoolResult<Handle> {
        self.acquire(key.into(), None)
    }

    /// Get an instance of `key` and run `on_returned` once, when this activation ends
    pub fn get_with_callback<F>(&mut self, key: impl Into<ResourceKey>, on_returned: F) -> PoolResult<Handle>
    where
        F: FnOnce(Handle, ArrivalReason) + 'static,
    {
        self.acquire(key.into(), Some(Box::new(on_returned)))
    }

    /// Try to get an instance without an error
    pub fn try_get(&mut self, key: impl Into<ResourceKey>) -> Option<Handle> {
        self.get(key).ok()
    }

    /// Return an instance to its pool.
    ///
    /// Returns `false` for handles no pool claims. A stale handle is ignored;
    /// an adopted instance is destroyed. Returning an instance that is
    /// already inactive, or already has a return pending, is a no-op.
    pub fn return_to_pool(&mut self, handle: Handle) -> bool {
        let claimed = self.return_with_reason(handle, ArrivalReason::ManualReturn);
        self.spawn_death_effects();
        claimed
    }

    /// Track an instance that belongs to no pool. Returning it destroys it.
    pub fn adopt(&mut self, resource: R) -> Handle {
        let handle = self.items.insert(PoolItem::untracked(resource));
        log::trace!("Adopted untracked instance {handle}");
        handle
    }

    /// Advance the clock by `delta` and run everything that became due.
    ///
    /// Scheduled actions run first in due order, then the timed, external
    /// deactivation and health sweeps, then death effects, then the deferred
    /// queue in the order it was filled.
    pub fn tick(&mut self, delta: Duration) {
        self.clock += delta;
        let now = self.clock;

        while let Some((handle, action)) = self.scheduler.pop_due(now) {
            self.run_scheduled(handle, action);
            self.spawn_death_effects();
        }

        for key in self.sorted_keys() {
            self.with_pool(&key, |pool, ctx| {
                let timed = pool.sweep_timed(ctx);
                let external = pool.sweep_external(ctx);
                let health = pool.sweep_health(ctx);
                if timed + external + health > 0 {
                    log::trace!("Pool '{key}' swept: {timed} timed, {external} external, {health} health");
                }
            });
        }

        self.spawn_death_effects();
        self.flush_deferred();
    }

    /// Time since the registry was initialized, as advanced by [`tick`](Self::tick)
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Re-check the health thresholds of an instance right away.
    ///
    /// Returns whether a threshold sent it back to its pool.
    pub fn notify_health_changed(&mut self, handle: Handle) -> bool {
        let Some(owner) = self.owner_of(handle) else {
            return false;
        };

        let returned = self
            .with_pool(&owner, |pool, ctx| pool.evaluate_health(ctx, handle))
            .unwrap_or(false);
        self.spawn_death_effects();
        returned
    }

    /// Stop (or resume) treating a hidden instance as externally deactivated
    pub fn suppress_external_detection(&mut self, handle: Handle, suppressed: bool) -> bool {
        match self.items.get_mut(handle) {
            Some(item) => {
                item.detection_suppressed = suppressed;
                true
            }
            None => false,
        }
    }

    /// Run `job` on the instance at the end of the current tick
    pub fn defer(&mut self, handle: Handle, job: impl FnOnce(&mut R) + 'static) -> bool {
        if !self.items.contains(handle) {
            return false;
        }
        self.deferred.push_back(Deferred::Call(handle, Box::new(job)));
        true
    }

    pub fn resource(&self, handle: Handle) -> Option<&R> {
        self.items.get(handle).map(|item| &item.resource)
    }

    pub fn resource_mut(&mut self, handle: Handle) -> Option<&mut R> {
        self.items.get_mut(handle).map(|item| &mut item.resource)
    }

    pub fn state(&self, handle: Handle) -> Option<ItemState> {
        self.items.get(handle).map(|item| item.state)
    }

    /// Whether the instance is handed out, including while a return is pending
    pub fn is_active(&self, handle: Handle) -> bool {
        self.items.get(handle).is_some_and(PoolItem::is_active)
    }

    pub fn is_returning(&self, handle: Handle) -> bool {
        self.items.get(handle).is_some_and(PoolItem::is_returning)
    }

    pub fn pool_of(&self, handle: Handle) -> Option<&ResourceKey> {
        self.items.get(handle).and_then(|item| item.owner.as_ref())
    }

    /// When the action pending for `handle` is due, if any
    pub fn scheduled_at(&self, handle: Handle) -> Option<Duration> {
        self.scheduler.due_at(handle)
    }

    pub fn metrics<Q>(&self, key: &Q) -> Option<PoolMetrics>
    where
        ResourceKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.pools.get(key).map(Pool::metrics)
    }

    /// Export one pool's metrics as a map
    pub fn export_metrics<Q>(&self, key: &Q) -> Option<HashMap<String, String>>
    where
        ResourceKey: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.metrics(key).map(|metrics| metrics.export())
    }

    /// Export the metrics of every pool in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> PoolResult<String> {
        let snapshots: Vec<(String, PoolMetrics)> = self
            .sorted_keys()
            .into_iter()
            .filter_map(|key| {
                let metrics = self.pools.get(&key)?.metrics();
                Some((key.to_string(), metrics))
            })
            .collect();

        crate::metrics::MetricsExporter::export_prometheus(&snapshots, tags)
    }

    pub(crate) fn instantiate(&mut self, key: &ResourceKey) -> R {
        self.factory.instantiate(key)
    }

    pub(crate) fn schedule_after(&mut self, handle: Handle, delay: Duration, action: ScheduledAction) {
        self.scheduler.schedule(handle, self.clock + delay, action);
    }

    fn acquire(&mut self, key: ResourceKey, callback: Option<ReturnCallback>) -> PoolResult<Handle> {
        if !self.pools.contains_key(&key) {
            log::warn!("No pool for '{key}', provisioning one with default options");
            self.create_pool(key.clone(), PoolOptions::default())?;
        }

        let result = self
            .with_pool(&key, |pool, ctx| pool.get(ctx, callback))
            .unwrap_or_else(|| Err(PoolError::Exhausted(key.clone())));
        self.spawn_death_effects();
        result
    }

    fn return_with_reason(&mut self, handle: Handle, reason: ArrivalReason) -> bool {
        let Some(item) = self.items.get(handle) else {
            log::warn!("Ignoring return of unknown or destroyed instance {handle}");
            return false;
        };

        let Some(owner) = item.owner.clone() else {
            log::warn!("Instance {handle} belongs to no pool, destroying it");
            self.destroy_untracked(handle);
            return false;
        };

        self.with_pool(&owner, |pool, ctx| pool.return_handle(ctx, handle, reason))
            .is_some()
    }

    fn run_scheduled(&mut self, handle: Handle, action: ScheduledAction) {
        match action {
            ScheduledAction::Return(reason) => {
                self.return_with_reason(handle, reason);
            }
            ScheduledAction::FinishDelayedReturn(reason) => {
                if let Some(owner) = self.owner_of(handle) {
                    self.with_pool(&owner, |pool, ctx| pool.finish_delayed_return(ctx, handle, reason));
                }
            }
            ScheduledAction::Destroy => {
                if self.items.get(handle).is_some_and(|item| item.owner.is_none()) {
                    self.destroy_untracked(handle);
                } else {
                    log::debug!("Ignoring destroy of pooled instance {handle}");
                }
            }
        }
    }

    fn destroy_untracked(&mut self, handle: Handle) {
        self.scheduler.cancel(handle);
        if self.items.remove(handle).is_some() {
            log::debug!("Destroyed untracked instance {handle}");
        }
    }

    fn spawn_death_effects(&mut self) {
        // Effects queued while draining join the same queue
        if self.spawning_effects {
            return;
        }

        self.spawning_effects = true;
        while let Some(request) = self.effects.pop_front() {
            DeathEffectSpawner::spawn_requested(self, request);
        }
        self.spawning_effects = false;
    }

    fn flush_deferred(&mut self) {
        let jobs = std::mem::take(&mut self.deferred);
        for job in jobs {
            match job {
                Deferred::Park(handle) => match self.items.get_mut(handle) {
                    Some(item) if item.state == ItemState::Inactive => item.resource.park(),
                    _ => {}
                },
                Deferred::Call(handle, job) => {
                    if let Some(item) = self.items.get_mut(handle) {
                        job(&mut item.resource);
                    }
                }
            }
        }
    }

    fn owner_of(&self, handle: Handle) -> Option<ResourceKey> {
        self.items.get(handle).and_then(|item| item.owner.clone())
    }

    fn teardown_pool(&mut self, key: &ResourceKey) -> usize {
        let Some(pool) = self.pools.remove(key) else {
            return 0;
        };

        let (_, mut ctx) = self.split();
        pool.teardown(&mut ctx)
    }

    fn sorted_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.pools.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn with_pool<T>(
        &mut self,
        key: &ResourceKey,
        f: impl FnOnce(&mut Pool, &mut PoolContext<'_, R>) -> T,
    ) -> Option<T> {
        let (pools, mut ctx) = self.split();
        let pool = pools.get_mut(key)?;
        Some(f(pool, &mut ctx))
    }

    fn split(&mut self) -> (&mut HashMap<ResourceKey, Pool>, PoolContext<'_, R>) {
        let ctx = PoolContext {
            items: &mut self.items,
            scheduler: &mut self.scheduler,
            factory: self.factory.as_mut(),
            deferred: &mut self.deferred,
            effects: &mut self.effects,
            now: self.clock,
        };
        (&mut self.pools, ctx)
    }
}
