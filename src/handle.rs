//! Resource keys, generational handles and the instance arena

use generational_arena::Index;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identity of a pooled resource type (a prototype), not of any one instance.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::ResourceKey;
///
/// let key = ResourceKey::from("fireball");
/// assert_eq!(key.as_str(), "fireball");
/// assert_eq!(key, ResourceKey::new("fireball"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ResourceKey(Arc<str>);

impl ResourceKey {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&ResourceKey> for ResourceKey {
    fn from(key: &ResourceKey) -> Self {
        key.clone()
    }
}

impl Borrow<str> for ResourceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generational handle to one pooled instance.
///
/// Minted by the registry when an instance is constructed and stable across
/// every reuse cycle of that instance. Once the instance is destroyed the
/// arena generation moves on, so old copies of the handle never resolve again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(Index);

impl Handle {
    pub fn index(&self) -> usize {
        self.0.into_raw_parts().0
    }

    pub fn generation(&self) -> u64 {
        self.0.into_raw_parts().1
    }
}

impl Ord for Handle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.into_raw_parts().cmp(&other.0.into_raw_parts())
    }
}

impl PartialOrd for Handle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "#{index}v{generation}")
    }
}

/// Arena owning every instance the registry knows about, addressed by [`Handle`]
pub(crate) struct Arena<T>(generational_arena::Arena<T>);

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self(generational_arena::Arena::new())
    }

    pub fn insert(&mut self, value: T) -> Handle {
        Handle(self.0.insert(value))
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.0.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.0.get_mut(handle.0)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.0.contains(handle.0)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        self.0.remove(handle.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Removes every live value, invalidating all outstanding handles
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        self.0
            .drain()
            .map(|(index, value)| (Handle(index), value))
            .collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
