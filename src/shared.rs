use std::{borrow::Borrow, ops::ControlFlow};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Error;
use crate::rbt::{Rbt, Stats};
use crate::walk::Walk;

/// SharedRbt guards an [`Rbt`] instance with a reader/writer lock.
///
/// Lookups and walks run concurrently under the read lock, inserts and
/// deletes serialize under the write lock. Every call holds the lock for
/// its whole duration, release of the lock publishes the result to the
/// next caller. There is no upgrade from a read lock to a write lock.
pub struct SharedRbt<K, V> {
    name: String,
    inner: RwLock<Rbt<K, V>>,
}

impl<K, V> SharedRbt<K, V>
where
    K: Ord,
{
    /// Create an empty instance, identified by `name`.
    pub fn new<S>(name: S) -> SharedRbt<K, V>
    where
        S: AsRef<str>,
    {
        SharedRbt::from_rbt(Rbt::new(name))
    }

    /// Share an existing [`Rbt`] instance.
    pub fn from_rbt(rbt: Rbt<K, V>) -> SharedRbt<K, V> {
        SharedRbt {
            name: rbt.id(),
            inner: RwLock::new(rbt),
        }
    }

    /// Unwrap the index, no other reference can exist at this point.
    pub fn into_inner(self) -> Rbt<K, V> {
        self.inner.into_inner()
    }

    /// Identify this instance.
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Acquire the read lock. The lock is held until the guard is
    /// dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, Rbt<K, V>> {
        self.inner.read()
    }

    /// Acquire the write lock. The lock is held until the guard is
    /// dropped.
    pub fn write(&self) -> RwLockWriteGuard<'_, Rbt<K, V>> {
        self.inner.write()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Refer to [`Rbt::insert`].
    pub fn insert(&self, key: K, value: V) -> Result<(), (K, V)> {
        self.write().insert(key, value)
    }

    /// Refer to [`Rbt::insert_with`], `value` is called with the write
    /// lock held.
    pub fn insert_with<F>(&self, key: K, value: F) -> Result<(), K>
    where
        F: FnOnce() -> V,
    {
        self.write().insert_with(key, value)
    }

    /// Refer to [`Rbt::set`].
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.write().set(key, value)
    }

    /// Refer to [`Rbt::delete`].
    pub fn delete<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.write().delete(key)
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.write().clear()
    }

    /// Get a copy of the value for key.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: Clone,
    {
        self.read().get(key).cloned()
    }

    /// Apply `f` on the value for key, with the read lock held.
    pub fn get_with<Q, F, T>(&self, key: &Q, f: F) -> Option<T>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&V) -> T,
    {
        self.read().get(key).map(f)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.read().contains_key(key)
    }

    /// Refer to [`Rbt::walk`], `visit` is called with the read lock held.
    pub fn walk<B, F>(&self, order: Walk, visit: F) -> Result<Option<B>, Error<K>>
    where
        F: FnMut(&K, &V) -> ControlFlow<B>,
    {
        self.read().walk(order, visit)
    }

    /// Refer to [`Rbt::validate`].
    pub fn validate(&self) -> Result<Stats, Error<K>>
    where
        K: Clone,
    {
        self.read().validate()
    }
}

impl<K, V> Default for SharedRbt<K, V>
where
    K: Ord,
{
    fn default() -> SharedRbt<K, V> {
        SharedRbt::from_rbt(Rbt::default())
    }
}

impl<K, V> From<Rbt<K, V>> for SharedRbt<K, V>
where
    K: Ord,
{
    fn from(rbt: Rbt<K, V>) -> SharedRbt<K, V> {
        SharedRbt::from_rbt(rbt)
    }
}
