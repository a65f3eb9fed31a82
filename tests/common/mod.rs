#![allow(dead_code)]

use esox_resourcepool::{
    ArrivalReason, Handle, LifecycleNode, PoolLifecycle, PoolRegistry, Resource, ResourceKey, Vec3,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

pub type Journal = Rc<RefCell<Vec<String>>>;

/// Lifecycle listener that writes every notification to the journal
pub struct Recorder {
    name: String,
    journal: Journal,
}

impl PoolLifecycle for Recorder {
    fn on_spawned_from_pool(&mut self) {
        self.journal.borrow_mut().push(format!("spawned:{}", self.name));
    }

    fn on_returned_to_pool(&mut self) {
        self.journal.borrow_mut().push(format!("returned:{}", self.name));
    }
}

/// Test resource: a body with a root listener and a listener two levels down
pub struct Body {
    pub id: usize,
    pub key: ResourceKey,
    pub live: bool,
    pub position: Vec3,
    pub health: f32,
    pub life_time: Option<Duration>,
    pub controlled: bool,
    pub parked: usize,
    node: LifecycleNode,
    journal: Journal,
}

impl Resource for Body {
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

    fn life_time(&self) -> Option<Duration> {
        self.life_time
    }

    fn lifecycle(&mut self) -> Option<&mut LifecycleNode> {
        Some(&mut self.node)
    }

    fn health_fraction(&self) -> Option<f32> {
        Some(self.health)
    }

    fn set_controlled_by_pool(&mut self, controlled: bool) {
        self.controlled = controlled;
    }

    fn on_return_delay_started(&mut self) {
        self.journal.borrow_mut().push(format!("delay-start:{}", self.id));
    }

    fn on_return_delay_ended(&mut self) {
        self.journal.borrow_mut().push(format!("delay-end:{}", self.id));
    }

    fn park(&mut self) {
        self.parked += 1;
    }
}

pub fn build_body(journal: &Journal, id: usize, key: &ResourceKey) -> Body {
    let node = LifecycleNode::new()
        .with_listener(Recorder {
            name: format!("root#{id}"),
            journal: journal.clone(),
        })
        .with_child(LifecycleNode::new().with_child(LifecycleNode::new().with_listener(Recorder {
            name: format!("deep#{id}"),
            journal: journal.clone(),
        })));

    Body {
        id,
        key: key.clone(),
        live: false,
        position: Vec3::ZERO,
        health: 1.0,
        life_time: None,
        controlled: false,
        parked: 0,
        node,
        journal: journal.clone(),
    }
}

pub struct World {
    pub registry: PoolRegistry<Body>,
    pub journal: Journal,
}

impl World {
    pub fn new() -> Self {
        let journal = Journal::default();
        let next_id = Rc::new(Cell::new(0));

        let factory_journal = journal.clone();
        let registry = PoolRegistry::init(move |key: &ResourceKey| {
            let id = next_id.get();
            next_id.set(id + 1);
            build_body(&factory_journal, id, key)
        });

        Self { registry, journal }
    }

    /// Hand the registry a body that belongs to no pool
    pub fn adopt_body(&mut self, id: usize) -> Handle {
        let body = build_body(&self.journal, id, &ResourceKey::from("loose"));
        self.registry.adopt(body)
    }

    pub fn events(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.journal.borrow_mut().clear();
    }

    /// Number of journal entries starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    pub fn body(&self, handle: Handle) -> &Body {
        self.registry.resource(handle).expect("handle should resolve")
    }

    pub fn body_mut(&mut self, handle: Handle) -> &mut Body {
        self.registry.resource_mut(handle).expect("handle should resolve")
    }

    pub fn active(&self, key: &str) -> usize {
        self.registry.pool(key).map_or(0, |pool| pool.active_count())
    }

    pub fn available(&self, key: &str) -> usize {
        self.registry.pool(key).map_or(0, |pool| pool.available_count())
    }
}

pub type Returns = Rc<RefCell<Vec<(Handle, ArrivalReason)>>>;

/// Callback that records every invocation
pub fn recording_callback(returns: &Returns) -> impl FnOnce(Handle, ArrivalReason) + 'static {
    let returns = returns.clone();
    move |handle, reason| returns.borrow_mut().push((handle, reason))
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
