//! Node storage for [`Rbt`](crate::Rbt).
//!
//! Nodes live in a single arena and refer to their children by index.
//! Color is an explicit field on the node, there is no tagging of the
//! child references. Slot zero is reserved for the head sentinel, a
//! keyless black node whose right child is the real root while an
//! insert or delete is in progress.

use std::process;

pub(crate) const LEFT: usize = 0;
pub(crate) const RIGHT: usize = 1;

/// Synthetic parent of the root, see module documentation.
pub(crate) const HEAD: NodeId = NodeId(0);

/// Index of a node inside [`NodeStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

pub(crate) type Link = Option<NodeId>;

/// Node corresponds to a single entry in the tree.
pub(crate) struct Node<K, V> {
    entry: Option<(K, V)>, // None for head and for released slots.
    black: bool,
    child: [Link; 2],
}

impl<K, V> Node<K, V> {
    fn head() -> Node<K, V> {
        Node {
            entry: None,
            black: true,
            child: [None, None],
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        match &self.entry {
            Some((key, _)) => key,
            None => panic!("key(): keyless node in tree, call the programmer"),
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> &V {
        match &self.entry {
            Some((_, value)) => value,
            None => panic!("value(): keyless node in tree, call the programmer"),
        }
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        match &mut self.entry {
            Some((_, value)) => value,
            None => panic!("value_mut(): keyless node in tree, call the programmer"),
        }
    }

    #[inline]
    pub(crate) fn link(&self, dir: usize) -> Link {
        self.child[dir]
    }
}

/// Arena of tree nodes with a free list of released slots.
///
/// The store is not synchronized. It is only ever touched through a tree
/// which is, in turn, guarded by the reader/writer lock of its owner.
pub(crate) struct NodeStore<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
}

impl<K, V> NodeStore<K, V> {
    pub(crate) fn new() -> NodeStore<K, V> {
        NodeStore {
            nodes: vec![Node::head()],
            free: vec![],
        }
    }

    /// Allocate a red node with both children absent.
    pub(crate) fn alloc(&mut self, key: K, value: V) -> NodeId {
        let node = Node {
            entry: Some((key, value)),
            black: false,
            child: [None, None],
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                if self.nodes.len() > (u32::MAX as usize) {
                    log::error!("node store exhausted at {} nodes", self.nodes.len());
                    process::abort();
                }
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Release node `id` and return its entry. Caller must have unlinked
    /// the node from the tree.
    pub(crate) fn release(&mut self, id: NodeId) -> (K, V) {
        if id == HEAD {
            panic!("release(): releasing head node, call the programmer");
        }
        let node = &mut self.nodes[id.index()];
        node.child = [None, None];
        node.black = false;
        match node.entry.take() {
            Some(entry) => {
                self.free.push(id);
                entry
            }
            None => panic!("release(): double release, call the programmer"),
        }
    }

    /// Drop every node and return to the freshly created state.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[HEAD.index()] = Node::head();
        self.free.clear();
    }

    /// Number of live nodes, excluding the head.
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - 1 - self.free.len()
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn link(&self, id: NodeId, dir: usize) -> Link {
        self.nodes[id.index()].child[dir]
    }

    #[inline]
    pub(crate) fn set_link(&mut self, id: NodeId, dir: usize, child: Link) {
        self.nodes[id.index()].child[dir] = child
    }

    /// Absent children count as black.
    #[inline]
    pub(crate) fn is_red(&self, link: Link) -> bool {
        link.map_or(false, |id| !self.nodes[id.index()].black)
    }

    #[inline]
    pub(crate) fn set_red(&mut self, id: NodeId) {
        self.nodes[id.index()].black = false
    }

    #[inline]
    pub(crate) fn set_black(&mut self, id: NodeId) {
        self.nodes[id.index()].black = true
    }

    /// Exchange the entries of two nodes, leaving links and colors alone.
    pub(crate) fn swap_entries(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let entry = self.nodes[a.index()].entry.take();
        self.nodes[a.index()].entry = self.nodes[b.index()].entry.take();
        self.nodes[b.index()].entry = entry;
    }
}
