//! Object pool: recycles entity instances by prefab name.
//!
//! Instances live in one arena for the lifetime of the session and are addressed by
//! [`Handle`]. Despawned instances are parked on a per-kind free list and handed back
//! out by the next spawn of the same kind. Pools never shrink.

use super::physics::Pose;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Lifecycle hooks for pooled entities.
pub trait Poolable: Clone {
    /// Extra state an entity needs when it is switched on or off.
    type Context: ?Sized;

    /// Called once after construction, with the first spawn pose already applied.
    fn on_create(&mut self) {}

    fn set_pose(&mut self, pose: Pose);

    fn on_enable(&mut self, ctx: &Self::Context);

    fn on_disable(&mut self, ctx: &Self::Context);
}

/// Named template an instance is cloned from.
#[derive(Debug, Clone)]
pub struct Prefab<T> {
    name: String,
    template: T,
}

impl<T> Prefab<T> {
    pub fn new(name: impl Into<String>, template: T) -> Self {
        Self {
            name: name.into(),
            template,
        }
    }
}

/// Typed index into an [`ObjectPool`].
pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    kind: String,
    active: bool,
    item: T,
}

#[derive(Debug, Clone)]
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free: HashMap<String, Vec<usize>>,
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: HashMap::new(),
        }
    }
}

impl<T: Poolable> ObjectPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse a parked instance of `prefab` or build a new one, then place and enable it.
    pub fn spawn(&mut self, prefab: &Prefab<T>, pose: Pose, ctx: &T::Context) -> Handle<T> {
        let reused = self.free.entry(prefab.name.clone()).or_default().pop();
        let index = match reused {
            Some(index) => {
                self.slots[index].item.set_pose(pose);
                index
            }
            None => {
                let mut item = prefab.template.clone();
                item.set_pose(pose);
                item.on_create();
                self.slots.push(Slot {
                    kind: prefab.name.clone(),
                    active: false,
                    item,
                });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.active = true;
        slot.item.on_enable(ctx);
        Handle::new(index)
    }

    /// Disable `handle` and park it under its kind for reuse.
    pub fn despawn(&mut self, handle: Handle<T>, ctx: &T::Context) {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            tracing::warn!(index = handle.index(), "despawn of unknown pool handle");
            return;
        };
        if !slot.active {
            tracing::debug!(kind = %slot.kind, index = handle.index(), "instance already parked");
            return;
        }
        slot.active = false;
        slot.item.on_disable(ctx);
        match self.free.get_mut(&slot.kind) {
            Some(parked) => parked.push(handle.index()),
            None => {
                tracing::warn!(kind = %slot.kind, "no pool registered for kind, creating one");
                self.free.insert(slot.kind.clone(), vec![handle.index()]);
            }
        }
    }

    /// Take ownership of an instance built outside the pool. It starts active and its
    /// kind is only registered once it is despawned.
    #[allow(dead_code)]
    pub fn adopt(&mut self, kind: impl Into<String>, mut item: T, ctx: &T::Context) -> Handle<T> {
        item.on_create();
        item.on_enable(ctx);
        self.slots.push(Slot {
            kind: kind.into(),
            active: true,
            item,
        });
        Handle::new(self.slots.len() - 1)
    }

    #[cfg(test)]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots.get(handle.index()).map(|s| &s.item)
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots.get_mut(handle.index()).map(|s| &mut s.item)
    }

    #[cfg(test)]
    pub fn is_active(&self, handle: Handle<T>) -> bool {
        self.slots.get(handle.index()).is_some_and(|s| s.active)
    }

    #[cfg(test)]
    pub fn kind(&self, handle: Handle<T>) -> Option<&str> {
        self.slots.get(handle.index()).map(|s| s.kind.as_str())
    }

    /// Active instances with their handles.
    pub fn active(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (Handle::new(i), &s.item))
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (Handle::new(i), &mut s.item))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Parked instances of `kind`, or `None` if the kind was never registered.
    #[cfg(test)]
    pub fn parked(&self, kind: &str) -> Option<usize> {
        self.free.get(kind).map(Vec::len)
    }
}

impl<T> Index<Handle<T>> for ObjectPool<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.slots[handle.index()].item
    }
}

impl<T> IndexMut<Handle<T>> for ObjectPool<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.slots[handle.index()].item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Debug, Clone, Default)]
    struct Dummy {
        pose: Pose,
        enabled: u32,
        disabled: u32,
        created: u32,
    }

    impl Poolable for Dummy {
        type Context = ();

        fn on_create(&mut self) {
            self.created += 1;
        }

        fn set_pose(&mut self, pose: Pose) {
            self.pose = pose;
        }

        fn on_enable(&mut self, _ctx: &()) {
            self.enabled += 1;
        }

        fn on_disable(&mut self, _ctx: &()) {
            self.disabled += 1;
        }
    }

    fn prefab() -> Prefab<Dummy> {
        Prefab::new("Dummy", Dummy::default())
    }

    #[test]
    fn test_spawn_creates_when_nothing_parked() {
        let mut pool = ObjectPool::new();
        let a = pool.spawn(&prefab(), Pose::at(Vec3::X, Vec3::ZERO), &());
        let b = pool.spawn(&prefab(), Pose::default(), &());
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.get(a).unwrap().pose.position, Vec3::X);
        assert_eq!(pool.kind(a), Some("Dummy"));
    }

    #[test]
    fn test_despawn_then_spawn_reuses_instance() {
        let mut pool = ObjectPool::new();
        let a = pool.spawn(&prefab(), Pose::default(), &());
        pool.despawn(a, &());
        assert!(!pool.is_active(a));
        assert_eq!(pool.parked("Dummy"), Some(1));

        let b = pool.spawn(&prefab(), Pose::at(Vec3::Y, Vec3::ZERO), &());
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        let item = pool.get(b).unwrap();
        assert_eq!(item.created, 1);
        assert_eq!(item.enabled, 2);
        assert_eq!(item.disabled, 1);
        assert_eq!(item.pose.position, Vec3::Y);
    }

    #[test]
    fn test_double_despawn_parks_once() {
        let mut pool = ObjectPool::new();
        let a = pool.spawn(&prefab(), Pose::default(), &());
        pool.despawn(a, &());
        pool.despawn(a, &());
        assert_eq!(pool.parked("Dummy"), Some(1));
        assert_eq!(pool.get(a).unwrap().disabled, 1);
    }

    #[test]
    fn test_despawn_of_unregistered_kind_registers_lazily() {
        let mut pool: ObjectPool<Dummy> = ObjectPool::new();
        let h = pool.adopt("Stray", Dummy::default(), &());
        assert_eq!(pool.parked("Stray"), None);
        pool.despawn(h, &());
        assert_eq!(pool.parked("Stray"), Some(1));

        let again = pool.spawn(&Prefab::new("Stray", Dummy::default()), Pose::default(), &());
        assert_eq!(again, h);
    }

    #[test]
    fn test_kinds_do_not_share_free_lists() {
        let mut pool = ObjectPool::new();
        let a = pool.spawn(&prefab(), Pose::default(), &());
        pool.despawn(a, &());
        let other = pool.spawn(&Prefab::new("Other", Dummy::default()), Pose::default(), &());
        assert_ne!(a, other);
        assert_eq!(pool.parked("Dummy"), Some(1));
    }
}
