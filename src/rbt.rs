use std::{
    borrow::Borrow,
    cmp::{Ord, Ordering},
    mem,
    ops::ControlFlow,
};

use crate::error::Error;
use crate::store::{Link, Node, NodeId, NodeStore, HEAD, LEFT, RIGHT};
use crate::walk::Walk;

/// Rbt manage a single instance of in-memory index using
/// [red-black][rbt] tree, balanced with a single top-down pass for
/// both insert and delete.
///
/// Rbt is not synchronized, wrap it in [`SharedRbt`] to share it
/// between threads.
///
/// [rbt]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
/// [`SharedRbt`]: crate::SharedRbt
pub struct Rbt<K, V> {
    name: String,
    store: NodeStore<K, V>,
    root: Link,
    n_count: usize, // number of entries in the tree.
}

/// Different ways to construct a new Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord,
{
    /// Create an empty instance of Rbt, identified by `name`.
    /// Applications can choose unique names.
    pub fn new<S>(name: S) -> Rbt<K, V>
    where
        S: AsRef<str>,
    {
        log::debug!("rbt {:?} created", name.as_ref());
        Rbt {
            name: name.as_ref().to_string(),
            store: NodeStore::new(),
            root: Default::default(),
            n_count: Default::default(),
        }
    }

    /// Create a new instance of Rbt tree and load it with entries
    /// from `iter`. Note that iterator should return (key, value) tuples,
    /// where key must be ``unique``.
    pub fn load_from<S, I>(name: S, iter: I) -> Result<Rbt<K, V>, Error<K>>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut rbt = Rbt::new(name);
        for (key, value) in iter {
            rbt.insert(key, value)
                .map_err(|(key, _)| Error::DuplicateKey(key))?;
        }
        Ok(rbt)
    }
}

impl<K, V> Default for Rbt<K, V>
where
    K: Ord,
{
    fn default() -> Rbt<K, V> {
        Rbt::new("")
    }
}

/// Maintenance API.
impl<K, V> Rbt<K, V> {
    /// Identify this instance. Applications can choose unique names while
    /// creating Rbt instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return quickly with basic statisics, only entries() method is valid
    /// with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K, V>>())
    }

    /// Drop all entries, the instance keeps its name.
    pub fn clear(&mut self) {
        self.store.clear();
        self.root = None;
        self.n_count = 0;
    }
}

/// Write operations on Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord,
{
    /// Create a new {key, value} entry in the index. If key is already
    /// present the index is left untouched and both key and value are
    /// handed back.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        match self.do_insert(key, move || value) {
            Ok(()) => Ok(()),
            Err((key, value)) => Err((key, value())),
        }
    }

    /// Same as insert, but `value` is only computed when key is not
    /// present. If key is already present it is handed back.
    pub fn insert_with<F>(&mut self, key: K, value: F) -> Result<(), K>
    where
        F: FnOnce() -> V,
    {
        self.do_insert(key, value).map_err(|(key, _)| key)
    }

    /// Set value for key. If there is an existing entry for key,
    /// overwrite the old value with new value and return the old value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.get_mut(&key) {
            return Some(mem::replace(slot, value));
        }
        let res = self.insert(key, value);
        debug_assert!(res.is_ok());
        None
    }

    /// Delete key from this instance and return its entry. If key is
    /// not present, then delete is effectively a no-op.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.do_delete(key)
    }

    /// Validate red-black tree with following rules:
    ///
    /// * Root node is black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Make sure keys are in sorted order.
    /// * Entry counter matches the number of reachable nodes.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<K>>
    where
        K: Clone,
    {
        if self.store.is_red(self.root) {
            return Err(Error::RedRoot);
        }
        let mut stats = Stats::new(self.n_count, mem::size_of::<Node<K, V>>());
        let mut entries = 0;
        let blacks = self.validate_tree(self.root, false, 0, 0, &mut stats, &mut entries)?;
        if entries != self.n_count || self.store.live() != self.n_count {
            let counter = self.n_count;
            return Err(Error::CountMismatch { counter, entries });
        }
        stats.set_blacks(blacks);
        Ok(stats)
    }
}

/// Read operations on Rbt instance.
impl<K, V> Rbt<K, V>
where
    K: Ord,
{
    /// Get the value for key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| self.store.node(id).value())
    }

    /// Get a mutable reference to the value for key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find(key)?;
        Some(self.store.node_mut(id).value_mut())
    }

    /// Check whether key is present in this index.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Visit entries in `order`, calling `visit` once per entry. Walk
    /// stops as soon as `visit` breaks, and returns the break value.
    pub fn walk<B, F>(&self, order: Walk, mut visit: F) -> Result<Option<B>, Error<K>>
    where
        F: FnMut(&K, &V) -> ControlFlow<B>,
    {
        match order {
            Walk::InOrder => (),
            order => return Err(Error::Unsupported(order)),
        }
        for (key, value) in self.iter() {
            if let ControlFlow::Break(res) = visit(key, value) {
                return Ok(Some(res));
            }
        }
        Ok(None)
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut link = self.root;
        while let Some(id) = link {
            let node = self.store.node(id);
            link = match key.cmp(node.key().borrow()) {
                Ordering::Less => node.link(LEFT),
                Ordering::Greater => node.link(RIGHT),
                Ordering::Equal => return Some(id),
            };
        }
        None
    }
}

impl<K, V> Rbt<K, V> {
    /// Return an iterator over all entries in this instance, in
    /// ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            store: &self.store,
            stack: Vec::with_capacity(64),
            remaining: self.n_count,
        };
        iter.push_left(self.root);
        iter
    }
}

/// Last four nodes visited by the insert descent, nearest first, and the
/// directions taken to reach them, nearest in the lowest bit.
struct Trail {
    h: [Link; 4],
    dvec: u8,
}

impl Trail {
    fn new(root: Link) -> Trail {
        Trail {
            h: [root, Some(HEAD), None, None],
            dvec: RIGHT as u8,
        }
    }

    #[inline]
    fn push(&mut self, link: Link, dir: usize) {
        self.h = [link, self.h[0], self.h[1], self.h[2]];
        self.dvec = (self.dvec << 1) | (dir as u8);
    }

    #[inline]
    fn dir(&self, n: usize) -> usize {
        ((self.dvec >> n) & 1) as usize
    }

    fn at(&self, n: usize) -> NodeId {
        match self.h[n] {
            Some(id) => id,
            None => panic!("trail: no ancestor at {}, call the programmer", n),
        }
    }
}

impl<K, V> Rbt<K, V>
where
    K: Ord,
{
    fn do_insert<F>(&mut self, key: K, value: F) -> Result<(), (K, F)>
    where
        F: FnOnce() -> V,
    {
        self.store.set_link(HEAD, RIGHT, self.root);
        let mut trail = Trail::new(self.root);

        loop {
            let q = match trail.h[0] {
                Some(q) => q,
                None => {
                    let q = self.store.alloc(key, value());
                    let p = trail.at(1);
                    self.store.set_link(p, trail.dir(0), Some(q));
                    trail.h[0] = Some(q);
                    if self.store.is_red(Some(p)) {
                        self.redfix(&trail);
                    }
                    self.reroot();
                    self.n_count += 1;
                    return Ok(());
                }
            };

            let (left, right) = (self.store.link(q, LEFT), self.store.link(q, RIGHT));
            if let (Some(l), Some(r)) = (left, right) {
                if self.store.is_red(left) && self.store.is_red(right) {
                    self.store.set_red(q);
                    self.store.set_black(l);
                    self.store.set_black(r);
                }
            }
            if self.store.is_red(Some(q)) && self.store.is_red(trail.h[1]) {
                self.redfix(&trail);
            }

            let dir = match key.cmp(self.store.node(q).key()) {
                Ordering::Less => LEFT,
                Ordering::Greater => RIGHT,
                Ordering::Equal => {
                    self.reroot();
                    return Err((key, value));
                }
            };
            trail.push(self.store.link(q, dir), dir);
        }
    }

    fn do_delete<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let root = self.root?;
        self.store.set_link(HEAD, RIGHT, Some(root));

        let mut g;
        let (mut p, mut q) = (HEAD, HEAD);
        let (mut dir, mut found) = (RIGHT, None);

        while let Some(next) = self.store.link(q, dir) {
            let last = dir;
            g = p;
            p = q;
            q = next;

            dir = match key.cmp(self.store.node(q).key().borrow()) {
                Ordering::Less => LEFT,
                Ordering::Greater => RIGHT,
                Ordering::Equal => {
                    found = Some(q);
                    LEFT
                }
            };

            // push a red node down the search path.
            if self.store.is_red(Some(q)) || self.store.is_red(self.store.link(q, dir)) {
                continue;
            }
            if self.store.is_red(self.store.link(q, 1 - dir)) {
                let sub = self.rotate(q, dir);
                self.store.set_link(p, last, Some(sub));
                p = sub;
            } else if let Some(s) = self.store.link(p, 1 - last) {
                let (sl, sr) = (self.store.link(s, LEFT), self.store.link(s, RIGHT));
                if !self.store.is_red(sl) && !self.store.is_red(sr) {
                    self.store.set_black(p);
                    self.store.set_red(s);
                    self.store.set_red(q);
                } else {
                    let gdir = if self.store.link(g, RIGHT) == Some(p) {
                        RIGHT
                    } else {
                        LEFT
                    };
                    let sub = if self.store.is_red(self.store.link(s, last)) {
                        self.rotate2(p, last)
                    } else {
                        self.rotate(p, last)
                    };
                    self.store.set_link(g, gdir, Some(sub));
                    self.store.set_red(q);
                    self.store.set_red(sub);
                    for d in [LEFT, RIGHT] {
                        if let Some(child) = self.store.link(sub, d) {
                            self.store.set_black(child);
                        }
                    }
                }
            }
        }

        let entry = found.map(|f| {
            debug_assert!(
                self.store.link(HEAD, RIGHT) == Some(q) || self.store.is_red(Some(q)),
                "do_delete(): unlinking a black node"
            );
            self.store.swap_entries(f, q);
            let child = match self.store.link(q, LEFT) {
                None => self.store.link(q, RIGHT),
                left => left,
            };
            let pdir = if self.store.link(p, RIGHT) == Some(q) {
                RIGHT
            } else {
                LEFT
            };
            self.store.set_link(p, pdir, child);
            self.n_count -= 1;
            self.store.release(q)
        });

        self.reroot();
        entry
    }

    fn validate_tree(
        &self,
        link: Link,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        stats: &mut Stats,
        entries: &mut usize,
    ) -> Result<usize, Error<K>>
    where
        K: Clone,
    {
        let id = match link {
            None => {
                stats.sample_leaf(depth);
                return Ok(nb);
            }
            Some(id) => id,
        };
        *entries += 1;

        let red = self.store.is_red(link);
        if fromred && red {
            return Err(Error::ConsecutiveReds);
        }
        if !red {
            nb += 1;
        }
        let node = self.store.node(id);
        let (left, right) = (node.link(LEFT), node.link(RIGHT));
        let lblacks = self.validate_tree(left, red, nb, depth + 1, stats, entries)?;
        let rblacks = self.validate_tree(right, red, nb, depth + 1, stats, entries)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(Error::UnbalancedBlacks(err));
        }
        if let Some(left) = left {
            let lkey = self.store.node(left).key();
            if lkey.ge(node.key()) {
                return Err(Error::SortError(lkey.clone(), node.key().clone()));
            }
        }
        if let Some(right) = right {
            let rkey = self.store.node(right).key();
            if rkey.le(node.key()) {
                return Err(Error::SortError(rkey.clone(), node.key().clone()));
            }
        }
        Ok(lblacks)
    }
}

impl<K, V> Rbt<K, V> {
    // move the real root out of the head sentinel and color it black.
    fn reroot(&mut self) {
        self.root = self.store.link(HEAD, RIGHT);
        self.store.set_link(HEAD, RIGHT, None);
        if let Some(root) = self.root {
            self.store.set_black(root);
        }
    }

    // fix a red violation between trail.h[0] and its red parent, by
    // rotating at the grandparent and relinking under the great
    // grandparent.
    fn redfix(&mut self, trail: &Trail) {
        let (g, t) = (trail.at(2), trail.at(3));
        let tdir = if self.store.link(t, RIGHT) == Some(g) {
            RIGHT
        } else {
            LEFT
        };
        let last = trail.dir(1);
        let sub = if trail.dir(0) == last {
            self.rotate(g, 1 - last)
        } else {
            self.rotate2(g, 1 - last)
        };
        self.store.set_link(t, tdir, Some(sub));
    }

    //--------- rotation routines, dir is the side node moves to ---------

    //              (i)                       (i)
    //               |                         |
    //              node                       x
    //              /  \                      / \
    //             /    \                    /   \
    //            /      \                  /     \
    //          left      x             node(r)   xr
    //                   / \            /  \
    //                 xl   xr       left   xl
    //
    //  rotate(node, LEFT); x becomes black, node becomes red.
    //
    fn rotate(&mut self, node: NodeId, dir: usize) -> NodeId {
        let x = match self.store.link(node, 1 - dir) {
            Some(x) => x,
            None => panic!("rotate(): rotating a missing child ? Call the programmer"),
        };
        self.store.set_link(node, 1 - dir, self.store.link(x, dir));
        self.store.set_link(x, dir, Some(node));
        self.store.set_red(node);
        self.store.set_black(x);
        x
    }

    //              node                      xl
    //              /  \                     /  \
    //          left    x       =>       node    x
    //                 / \               /  \   / \
    //               xl   xr          left  a  b   xr
    //              /  \
    //             a    b
    //
    //  rotate2(node, LEFT); xl becomes black, node becomes red.
    //
    fn rotate2(&mut self, node: NodeId, dir: usize) -> NodeId {
        let x = match self.store.link(node, 1 - dir) {
            Some(x) => x,
            None => panic!("rotate2(): rotating a missing child ? Call the programmer"),
        };
        let sub = self.rotate(x, 1 - dir);
        self.store.set_link(node, 1 - dir, Some(sub));
        self.rotate(node, dir)
    }
}

/// In-order iterator over borrowed entries of [`Rbt`].
pub struct Iter<'a, K, V> {
    store: &'a NodeStore<K, V>,
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut link: Link) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.store.link(id, LEFT);
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.push_left(self.store.link(id, RIGHT));
        self.remaining -= 1;
        let store = self.store;
        let node = store.node(id);
        Some((node.key(), node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> IntoIterator for &'a Rbt<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Consuming in-order iterator over [`Rbt`], every node is released as
/// its entry is handed out.
pub struct IntoIter<K, V> {
    store: NodeStore<K, V>,
    stack: Vec<NodeId>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    fn push_left(&mut self, mut link: Link) {
        while let Some(id) = link {
            self.stack.push(id);
            link = self.store.link(id, LEFT);
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.push_left(self.store.link(id, RIGHT));
        self.remaining -= 1;
        Some(self.store.release(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> IntoIterator for Rbt<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let mut iter = IntoIter {
            store: self.store,
            stack: Vec::with_capacity(64),
            remaining: self.n_count,
        };
        iter.push_left(self.root);
        iter
    }
}

// Direct access to the tree's internals, for corrupting a tree in tests.
#[cfg(test)]
impl<K, V> Rbt<K, V> {
    pub(crate) fn root_id(&self) -> Link {
        self.root
    }

    pub(crate) fn store_mut(&mut self) -> &mut NodeStore<K, V> {
        &mut self.store
    }

    pub(crate) fn set_count(&mut self, n_count: usize) {
        self.n_count = n_count
    }
}

/// Statistics on [`Rbt`] tree. [`Rbt::stats`] fills in the counters
/// that are known without walking the tree; [`Rbt::validate`] walks every
/// path and fills in the black height and leaf depths as well.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    // absent child links reached by validate, with their depth from root.
    leaves: usize,
    min_depth: usize,
    max_depth: usize,
    total_depth: usize,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            ..Default::default()
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    fn sample_leaf(&mut self, depth: usize) {
        if self.leaves == 0 || depth < self.min_depth {
            self.min_depth = depth;
        }
        self.max_depth = self.max_depth.max(depth);
        self.total_depth += depth;
        self.leaves += 1;
    }

    /// Return number entries in [`Rbt`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return the in-memory size of a single node, which depends on the
    /// key and value types.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes on every path from root to leaf.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return `(min, mean, max)` depth of the absent child links, counted
    /// in nodes from the root. Only available from [`Rbt::validate`].
    pub fn depths(&self) -> Option<(usize, usize, usize)> {
        match self.leaves {
            0 => None,
            n => Some((self.min_depth, self.total_depth / n, self.max_depth)),
        }
    }
}
