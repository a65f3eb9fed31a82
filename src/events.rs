//! Lifecycle event dispatch to attached listeners

use crate::config::EventScope;
use crate::resource::{LifecycleNode, Resource};

/// Lifecycle event raised by a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    Spawned,
    Returned,
}

/// Walks a resource's listener tree and delivers one call per listener
pub struct LifecycleEventDispatcher;

impl LifecycleEventDispatcher {
    /// Dispatch `event` to the listeners within `scope`.
    ///
    /// Returns how many listeners were notified. `AllAttached` visits a node's
    /// own listeners before descending into its children, in declaration order.
    pub fn dispatch<R: Resource>(resource: &mut R, scope: EventScope, event: PoolEvent) -> usize {
        if scope == EventScope::None {
            return 0;
        }

        let Some(root) = resource.lifecycle() else {
            return 0;
        };

        let notified = match scope {
            EventScope::None => 0,
            EventScope::RootOnly => Self::notify(root, event),
            EventScope::AllAttached => Self::notify_tree(root, event),
        };

        log::trace!("Dispatched {event:?} to {notified} listener(s)");
        notified
    }

    fn notify(node: &mut LifecycleNode, event: PoolEvent) -> usize {
        let listeners = node.listeners_mut();
        for listener in listeners.iter_mut() {
            match event {
                PoolEvent::Spawned => listener.on_spawned_from_pool(),
                PoolEvent::Returned => listener.on_returned_to_pool(),
            }
        }
        listeners.len()
    }

    fn notify_tree(node: &mut LifecycleNode, event: PoolEvent) -> usize {
        let mut notified = Self::notify(node, event);
        for child in node.children_mut() {
            notified += Self::notify_tree(child, event);
        }
        notified
    }
}
