//! Capabilities a pooled resource can expose to the pool

use crate::handle::ResourceKey;
use glam::Vec3;
use std::fmt;
use std::time::Duration;

/// A pooled resource instance.
///
/// Only visibility is mandatory. Every other capability has a no-op default,
/// so a resource opts in by overriding the methods it cares about.
pub trait Resource {
    /// Marks the instance live (visible, simulated) or not
    fn set_live(&mut self, live: bool);

    fn is_live(&self) -> bool;

    fn position(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn place(&mut self, _position: Vec3) {}

    /// Finite lifetime of one activation. Overrides the pool-wide value.
    fn life_time(&self) -> Option<Duration> {
        None
    }

    /// Root of the attached lifecycle listeners, if any
    fn lifecycle(&mut self) -> Option<&mut LifecycleNode> {
        None
    }

    /// Current health as a fraction in `0.0..=1.0`
    fn health_fraction(&self) -> Option<f32> {
        None
    }

    /// Tells the resource whether the pool decides its death
    fn set_controlled_by_pool(&mut self, _controlled: bool) {}

    fn on_return_delay_started(&mut self) {}

    fn on_return_delay_ended(&mut self) {}

    /// Deferred post-tick hook for moving a returned instance out of the way
    fn park(&mut self) {}
}

/// Listener notified when the instance it is attached to is handed out or taken back
pub trait PoolLifecycle {
    fn on_spawned_from_pool(&mut self);

    fn on_returned_to_pool(&mut self);
}

/// Declared tree of lifecycle listeners attached to one resource.
///
/// Replaces runtime discovery: the resource builds this table once, at
/// construction, and the dispatcher walks it in declaration order.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{LifecycleNode, PoolLifecycle};
///
/// struct Sound;
/// impl PoolLifecycle for Sound {
///     fn on_spawned_from_pool(&mut self) {}
///     fn on_returned_to_pool(&mut self) {}
/// }
///
/// let node = LifecycleNode::new()
///     .with_listener(Sound)
///     .with_child(LifecycleNode::new().with_listener(Sound));
///
/// assert_eq!(node.listener_count(), 2);
/// ```
#[derive(Default)]
pub struct LifecycleNode {
    listeners: Vec<Box<dyn PoolLifecycle>>,
    children: Vec<LifecycleNode>,
}

impl LifecycleNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: impl PoolLifecycle + 'static) -> Self {
        self.push_listener(listener);
        self
    }

    pub fn with_child(mut self, child: LifecycleNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_listener(&mut self, listener: impl PoolLifecycle + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn push_child(&mut self, child: LifecycleNode) {
        self.children.push(child);
    }

    /// Listeners attached to this node and all of its descendants
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
            + self
                .children
                .iter()
                .map(LifecycleNode::listener_count)
                .sum::<usize>()
    }

    pub(crate) fn listeners_mut(&mut self) -> &mut [Box<dyn PoolLifecycle>] {
        &mut self.listeners
    }

    pub(crate) fn children_mut(&mut self) -> &mut [LifecycleNode] {
        &mut self.children
    }
}

impl fmt::Debug for LifecycleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleNode")
            .field("listeners", &self.listeners.len())
            .field("children", &self.children)
            .finish()
    }
}

/// Builds new instances for a resource key
pub trait Instantiate<R> {
    fn instantiate(&mut self, key: &ResourceKey) -> R;
}

impl<R, F> Instantiate<R> for F
where
    F: FnMut(&ResourceKey) -> R,
{
    fn instantiate(&mut self, key: &ResourceKey) -> R {
        self(key)
    }
}
