use std::{
    ffi::{CStr, CString},
    ops::ControlFlow,
};

use crate::error::Error;
use crate::rbt::{IntoIter, Stats};
use crate::shared::SharedRbt;
use crate::walk::Walk;

/// StrTree index data of type `V` under null-terminated string keys,
/// ordered byte-wise the way `strcmp` orders them.
///
/// The tree owns keys of accepted entries. Data is never inspected and
/// is handed back to the caller on [`delete`](StrTree::delete) and on
/// teardown, see [`free_all`](StrTree::free_all).
///
/// ```
/// use std::ffi::CString;
/// use rbt_index::StrTree;
///
/// let tree: StrTree<u32> = StrTree::new("probe-cache");
/// let key = CString::new("oval:x:obj:1").unwrap();
/// assert!(tree.add(key.clone(), 10).is_ok());
/// assert_eq!(tree.add(key.clone(), 20), Err((key.clone(), 20)));
/// assert_eq!(tree.get(&key), Some(10));
/// ```
pub struct StrTree<V> {
    tree: SharedRbt<CString, V>,
}

impl<V> StrTree<V> {
    /// Create an empty instance, identified by `name`.
    pub fn new<S>(name: S) -> StrTree<V>
    where
        S: AsRef<str>,
    {
        StrTree {
            tree: SharedRbt::new(name),
        }
    }

    pub fn id(&self) -> String {
        self.tree.id()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Add `data` under `key`. On success the tree owns `key`. When `key`
    /// is already present nothing changes and both `key` and `data` are
    /// handed back.
    pub fn add(&self, key: CString, data: V) -> Result<(), (CString, V)> {
        let res = self.tree.insert(key, data);
        if let Err((key, _)) = &res {
            log::trace!("{}: add {:?}, duplicate key", self.tree.id(), key);
        }
        res
    }

    /// Same as [`add`](StrTree::add), with the key built from `key`.
    /// Fail with [`Error::InvalidKey`] if `key` holds a null byte.
    pub fn add_str(&self, key: &str, data: V) -> Result<Result<(), (CString, V)>, Error<CString>> {
        match CString::new(key) {
            Ok(key) => Ok(self.add(key, data)),
            Err(err) => Err(Error::InvalidKey(err.to_string())),
        }
    }

    /// Remove `key`, releasing the key and returning its data.
    pub fn delete(&self, key: &CStr) -> Option<V> {
        match self.tree.delete(key) {
            Some((_, data)) => Some(data),
            None => {
                log::trace!("{}: delete {:?}, key not found", self.tree.id(), key);
                None
            }
        }
    }

    /// Get a copy of the data for `key`.
    pub fn get(&self, key: &CStr) -> Option<V>
    where
        V: Clone,
    {
        self.tree.get(key)
    }

    /// Apply `f` on the data for `key`, with the read lock held.
    pub fn get_with<F, T>(&self, key: &CStr, f: F) -> Option<T>
    where
        F: FnOnce(&V) -> T,
    {
        self.tree.get_with(key, f)
    }

    pub fn contains_key(&self, key: &CStr) -> bool {
        self.tree.contains_key(key)
    }

    /// Visit entries in `order`. Refer to [`Rbt::walk`] for details.
    ///
    /// [`Rbt::walk`]: crate::Rbt::walk
    pub fn walk<B, F>(&self, order: Walk, mut visit: F) -> Result<Option<B>, Error<CString>>
    where
        F: FnMut(&CStr, &V) -> ControlFlow<B>,
    {
        self.tree.walk(order, |key, data| visit(key.as_c_str(), data))
    }

    pub fn validate(&self) -> Result<Stats, Error<CString>> {
        self.tree.validate()
    }

    /// Tear down the tree, handing every key and data to `release` in
    /// ascending key order.
    pub fn free_all<F>(self, mut release: F)
    where
        F: FnMut(CString, V),
    {
        let (name, entries) = (self.id(), self.into_iter());
        log::debug!("{}: releasing {} entries", name, entries.len());
        entries.for_each(|(key, data)| release(key, data));
    }
}

impl<V> Default for StrTree<V> {
    fn default() -> StrTree<V> {
        StrTree {
            tree: SharedRbt::default(),
        }
    }
}

impl<V> IntoIterator for StrTree<V> {
    type Item = (CString, V);
    type IntoIter = IntoIter<CString, V>;

    fn into_iter(self) -> IntoIter<CString, V> {
        self.tree.into_inner().into_iter()
    }
}
