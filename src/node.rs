//! Trie vertices and the arena that owns them.
//!
//! Nodes are never freed: insertion only appends, widens a node in place, or
//! relinks existing nodes. Every node in the arena stays reachable from the
//! root, so an index into the arena is a stable handle for the life of the
//! trie.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::addr::{BitAddress, Prefix};

/// Index of a node in its [`NodeArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);
}

pub(crate) struct Node<V> {
    pub(crate) prefix: Prefix,
    /// `None` for the root (until `0.0.0.0/0` is registered) and for forks.
    pub(crate) value: Option<Rc<V>>,
    /// Child whose branch bit is set.
    pub(crate) left: Option<NodeId>,
    /// Child whose branch bit is clear.
    pub(crate) right: Option<NodeId>,
}

impl<V> Node<V> {
    pub(crate) fn new(prefix: Prefix, value: Option<Rc<V>>) -> Self {
        Self {
            prefix,
            value,
            left: None,
            right: None,
        }
    }

    /// Side of this node that `addr` descends into: the address bit just past
    /// this node's prefix.
    #[inline]
    pub(crate) fn branch_bit(&self, addr: BitAddress) -> bool {
        addr.bit(self.prefix.prefix_len())
    }

    #[inline]
    pub(crate) fn child(&self, bit: bool) -> Option<NodeId> {
        if bit {
            self.left
        } else {
            self.right
        }
    }

    #[inline]
    pub(crate) fn set_child(&mut self, bit: bool, child: NodeId) {
        if bit {
            self.left = Some(child);
        } else {
            self.right = Some(child);
        }
    }

    pub(crate) fn take_children(&mut self) -> [Option<NodeId>; 2] {
        [self.left.take(), self.right.take()]
    }

    pub(crate) fn holds(&self, value: &Rc<V>) -> bool {
        self.value.as_ref().is_some_and(|v| Rc::ptr_eq(v, value))
    }
}

impl<V> Clone for Node<V> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            value: self.value.clone(),
            left: self.left,
            right: self.right,
        }
    }
}

/// Owns every node of one trie. Slot 0 is the root, covering `0.0.0.0/0`.
pub(crate) struct NodeArena<V> {
    nodes: Vec<Node<V>>,
}

impl<V> NodeArena<V> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::new(Prefix::default(), None)],
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<V>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Walks the tree from the root: node, then left subtree, then right subtree.
    pub(crate) fn preorder(&self) -> Preorder<'_, V> {
        Preorder {
            arena: self,
            stack: vec![NodeId::ROOT],
        }
    }
}

impl<V> Clone for NodeArena<V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
        }
    }
}

impl<V> Index<NodeId> for NodeArena<V> {
    type Output = Node<V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.0]
    }
}

impl<V> IndexMut<NodeId> for NodeArena<V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<V> {
        &mut self.nodes[id.0]
    }
}

pub(crate) struct Preorder<'a, V> {
    arena: &'a NodeArena<V>,
    stack: Vec<NodeId>,
}

impl<'a, V> Iterator for Preorder<'a, V> {
    type Item = &'a Node<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.arena[id];
        self.stack.extend(node.right);
        self.stack.extend(node.left);
        Some(node)
    }
}
