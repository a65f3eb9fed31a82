//! Cancelable delayed actions keyed by handle

use crate::handle::Handle;
use crate::item::ArrivalReason;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// What to do with a handle once its delay elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Return the instance to its pool
    Return(ArrivalReason),

    /// Finish a return that was held back by a grace window
    FinishDelayedReturn(ArrivalReason),

    /// Destroy an instance that belongs to no pool
    Destroy,
}

/// Run-once-after-a-delay service with at most one pending action per handle.
///
/// Scheduling for a handle replaces whatever was pending for it. Superseded
/// and cancelled entries stay in the heap and are skipped when they surface,
/// until they outnumber the live ones and the heap is rebuilt.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{ArrivalReason, ReturnScheduler, ScheduledAction};
/// # use esox_resourcepool::{PoolRegistry, Resource, ResourceKey};
/// use std::time::Duration;
/// # struct Dot(bool);
/// # impl Resource for Dot {
/// #     fn set_live(&mut self, live: bool) { self.0 = live; }
/// #     fn is_live(&self) -> bool { self.0 }
/// # }
/// # let mut registry = PoolRegistry::init(|_: &ResourceKey| Dot(false));
/// # let handle = registry.get("dot").unwrap();
///
/// let mut scheduler = ReturnScheduler::new();
/// scheduler.schedule(handle, Duration::from_secs(1), ScheduledAction::Destroy);
/// scheduler.schedule(
///     handle,
///     Duration::from_secs(2),
///     ScheduledAction::Return(ArrivalReason::LifetimeExpired),
/// );
///
/// assert_eq!(scheduler.pop_due(Duration::from_secs(1)), None);
/// assert_eq!(
///     scheduler.pop_due(Duration::from_secs(2)),
///     Some((handle, ScheduledAction::Return(ArrivalReason::LifetimeExpired)))
/// );
/// ```
/// Heap size below which dead entries are never compacted away
const COMPACT_FLOOR: usize = 64;

#[derive(Debug, Default)]
pub struct ReturnScheduler {
    queue: BinaryHeap<Reverse<(Duration, u64, Handle)>>,
    pending: HashMap<Handle, Pending>,
    next_seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    seq: u64,
    due: Duration,
    action: ScheduledAction,
}

impl ReturnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` for `handle` at `due`, cancelling anything pending for it
    pub fn schedule(&mut self, handle: Handle, due: Duration, action: ScheduledAction) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.pending.insert(handle, Pending { seq, due, action });
        self.queue.push(Reverse((due, seq, handle)));
        self.compact();
    }

    /// Returns whether something was pending
    pub fn cancel(&mut self, handle: Handle) -> bool {
        let cancelled = self.pending.remove(&handle).is_some();
        if self.pending.is_empty() {
            self.queue.clear();
        } else {
            self.compact();
        }
        cancelled
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        self.pending.contains_key(&handle)
    }

    pub fn due_at(&self, handle: Handle) -> Option<Duration> {
        self.pending.get(&handle).map(|pending| pending.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop superseded and cancelled entries once they make up over half the heap
    fn compact(&mut self) {
        if self.queue.len() <= COMPACT_FLOOR || self.queue.len() <= 2 * self.pending.len() {
            return;
        }

        self.queue = self
            .pending
            .iter()
            .map(|(&handle, pending)| Reverse((pending.due, pending.seq, handle)))
            .collect();
    }

    /// Earliest pending action due at or before `now`, in due-time then scheduling order
    pub fn pop_due(&mut self, now: Duration) -> Option<(Handle, ScheduledAction)> {
        while let Some(Reverse((due, seq, handle))) = self.queue.peek().copied() {
            if due > now {
                return None;
            }
            self.queue.pop();

            match self.pending.get(&handle) {
                Some(pending) if pending.seq == seq => {
                    let action = pending.action;
                    self.pending.remove(&handle);
                    return Some((handle, action));
                }
                _ => continue,
            }
        }
        None
    }
}
