//! # ip2net
//!
//! A longest-prefix-match table keyed by IPv4 prefixes.
//!
//! Register values against prefixes such as `10.0.0.0/8`, then ask which
//! registered value covers an address, preferring the most specific prefix.
//! Addresses not covered by any registration resolve to a default value.
//! Lookups walk at most 33 nodes.
//!
//! Values are shared handles (`Rc<V>`). Registering a broader prefix with the
//! *same handle* as an existing narrower entry folds the two together instead
//! of adding a tree level.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use ip2net::PrefixTrie;
//!
//! let viettel = Rc::new("Viettel");
//! let fpt = Rc::new("FPT");
//!
//! let mut table = PrefixTrie::new(Rc::new("QT"));
//! table.insert("10.42.0.0/16", Rc::clone(&viettel)).unwrap();
//! table.insert("10.0.0.0/8", Rc::clone(&fpt)).unwrap();
//!
//! assert_eq!(*table.lookup("10.42.42.5").unwrap(), "Viettel");
//! assert_eq!(*table.lookup("10.1.2.3").unwrap(), "FPT");
//! assert_eq!(*table.lookup("8.8.8.8").unwrap(), "QT");
//! ```

pub mod addr;
pub mod error;
mod node;

pub use addr::{BitAddress, Prefix, ADDRESS_BITS};
pub use error::{Error, Result};

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use node::{Node, NodeArena, NodeId, Preorder};

/// Where a descent stopped.
struct Descent {
    /// Deepest node whose prefix covers the target.
    anchor: NodeId,
    /// Deepest node on the path that carries a value.
    matched: Option<NodeId>,
}

// =============================================================================
// PrefixTrie
// =============================================================================

/// A binary PATRICIA trie over IPv4 prefixes with shared value handles.
///
/// Every child is strictly more specific than its parent and sits on the side
/// given by its address bit at the parent's prefix length. Nodes without a
/// value (other than the root) are forks holding two disjoint subtrees.
pub struct PrefixTrie<V> {
    nodes: NodeArena<V>,
    default: Rc<V>,
}

impl<V> PrefixTrie<V> {
    /// An empty table answering every lookup with `default`.
    pub fn new(default: Rc<V>) -> Self {
        Self {
            nodes: NodeArena::new(),
            default,
        }
    }

    /// Builds a table by inserting `entries` in order.
    ///
    /// Order matters: whether a registration merges into an existing entry
    /// or splits above it depends on what is already present.
    pub fn new_from<I, S>(entries: I, default: Rc<V>) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Rc<V>)>,
        S: AsRef<str>,
    {
        let mut trie = Self::new(default);
        for (prefix, value) in entries {
            trie.insert(prefix.as_ref(), value)?;
        }
        Ok(trie)
    }

    #[inline]
    pub fn default_value(&self) -> &Rc<V> {
        &self.default
    }

    /// Number of nodes in the tree, including the root and structural forks.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Registers `value` for a prefix written as `A.B.C.D` or `A.B.C.D/N`.
    ///
    /// A missing `/N` means a length of 0, so the registration covers every
    /// address. Returns whether `value` was stored, as for
    /// [`insert_prefix`](Self::insert_prefix).
    pub fn insert(&mut self, prefix: &str, value: Rc<V>) -> Result<bool> {
        let prefix = prefix.parse::<Prefix>()?;
        Ok(self.insert_prefix(prefix, value))
    }

    /// Registers `value` for `prefix`, returning `false` if the table was
    /// left unchanged.
    ///
    /// Re-registering a prefix that already carries a value is a no-op: the
    /// first registration wins. A broader prefix whose value is the same
    /// handle as a narrower entry it covers widens that entry in place. The
    /// narrower registration is absorbed, so a later registration of
    /// intermediate length with another value takes precedence over it.
    pub fn insert_prefix(&mut self, prefix: Prefix, value: Rc<V>) -> bool {
        let anchor = self.descend(&prefix).anchor;
        let node = &mut self.nodes[anchor];
        trace!(%prefix, anchor = %node.prefix, "insert descent stopped");

        if node.prefix == prefix {
            if node.value.is_some() {
                trace!(%prefix, "prefix already registered, ignoring");
                return false;
            }
            node.value = Some(value);
            return true;
        }

        let side = node.branch_bit(prefix.addr());
        if let Some(next) = node.child(side) {
            let next_node = &self.nodes[next];
            if prefix.covers(&next_node.prefix) && next_node.holds(&value) {
                debug!(from = %next_node.prefix, to = %prefix, "merging into same-valued entry");
                self.widen(next, prefix);
                return true;
            }
        }

        let leaf = self.nodes.alloc(Node::new(prefix, Some(value)));
        self.graft(anchor, leaf);
        true
    }

    /// Value registered for the most specific prefix covering `addr`, or the
    /// default. `addr` must be a bare dotted-quad address.
    pub fn lookup(&self, addr: &str) -> Result<Rc<V>> {
        let addr = addr.parse::<BitAddress>()?;
        Ok(self.lookup_addr(addr))
    }

    pub fn lookup_addr(&self, addr: impl Into<BitAddress>) -> Rc<V> {
        match self.longest_match(addr) {
            Some((_, value)) => Rc::clone(value),
            None => Rc::clone(&self.default),
        }
    }

    /// The most specific registered prefix covering `addr` and its value.
    ///
    /// Unlike [`lookup_addr`](Self::lookup_addr) this tells a real match apart
    /// from a default hit.
    pub fn longest_match(&self, addr: impl Into<BitAddress>) -> Option<(Prefix, &Rc<V>)> {
        let matched = self.descend(&Prefix::host(addr.into())).matched?;
        let node = &self.nodes[matched];
        node.value.as_ref().map(|value| (node.prefix, value))
    }

    /// Registered prefixes and their values, in pre-order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.nodes.preorder(),
        }
    }

    /// Walks from the root towards `target`, stepping into a child only while
    /// that child's prefix covers `target`.
    fn descend(&self, target: &Prefix) -> Descent {
        let mut cur = NodeId::ROOT;
        let mut matched = self.nodes[cur].value.as_ref().map(|_| cur);

        loop {
            let node = &self.nodes[cur];
            let Some(next) = node.child(node.branch_bit(target.addr())) else {
                break;
            };
            let next_node = &self.nodes[next];
            if !next_node.prefix.covers(target) {
                break;
            }
            cur = next;
            if next_node.value.is_some() {
                matched = Some(next);
            }
        }

        Descent {
            anchor: cur,
            matched,
        }
    }

    /// Rewrites `id` to the broader `prefix` and re-homes its children, whose
    /// branch side is now decided by a different bit.
    fn widen(&mut self, id: NodeId, prefix: Prefix) {
        let node = &mut self.nodes[id];
        debug_assert!(prefix.covers(&node.prefix));
        node.prefix = prefix;
        for child in node.take_children().into_iter().flatten() {
            self.graft(id, child);
        }
    }

    /// Links the detached subtree rooted at `child` somewhere below `parent`.
    ///
    /// `parent` must cover `child` and be strictly less specific.
    fn graft(&mut self, parent: NodeId, child: NodeId) {
        let (mut parent, mut child) = (parent, child);

        loop {
            let child_prefix = self.nodes[child].prefix;
            debug_assert!(self.nodes[parent].prefix.prefix_len() < child_prefix.prefix_len());
            let side = self.nodes[parent].branch_bit(child_prefix.addr());

            let Some(occupant) = self.nodes[parent].child(side) else {
                self.nodes[parent].set_child(side, child);
                return;
            };
            let occupant_prefix = self.nodes[occupant].prefix;

            if occupant_prefix.covers(&child_prefix) {
                debug_assert_ne!(occupant_prefix, child_prefix);
                parent = occupant;
            } else if child_prefix.covers(&occupant_prefix) {
                debug!(above = %child_prefix, below = %occupant_prefix, "split");
                self.nodes[parent].set_child(side, child);
                parent = child;
                child = occupant;
            } else {
                let fork_len = child_prefix.addr().common_prefix_len(occupant_prefix.addr());
                let fork_prefix = Prefix::truncated(child_prefix.addr(), fork_len);
                debug!(fork = %fork_prefix, new = %child_prefix, existing = %occupant_prefix, "fork");

                let mut fork = Node::new(fork_prefix, None);
                let child_side = fork.branch_bit(child_prefix.addr());
                debug_assert_ne!(child_side, fork.branch_bit(occupant_prefix.addr()));
                fork.set_child(child_side, child);
                fork.set_child(!child_side, occupant);

                let fork = self.nodes.alloc(fork);
                self.nodes[parent].set_child(side, fork);
                return;
            }
        }
    }
}

impl<V: fmt::Display> PrefixTrie<V> {
    /// One line per node in pre-order: `A.B.C.D/N`, followed by ` -> value`
    /// when the node carries one.
    pub fn dump(&self) -> Vec<String> {
        self.nodes
            .preorder()
            .map(|node| match &node.value {
                Some(value) => format!("{} -> {}", node.prefix, value),
                None => node.prefix.to_string(),
            })
            .collect()
    }
}

impl<V: Default> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new(Rc::new(V::default()))
    }
}

impl<V> Clone for PrefixTrie<V> {
    /// The clone shares value handles with `self`.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            default: Rc::clone(&self.default),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for PrefixTrie<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, V> {
    inner: Preorder<'a, V>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Prefix, &'a Rc<V>);

    fn next(&mut self) -> Option<Self::Item> {
        for node in self.inner.by_ref() {
            if let Some(value) = &node.value {
                return Some((node.prefix, value));
            }
        }
        None
    }
}

impl<'a, V> IntoIterator for &'a PrefixTrie<V> {
    type Item = (Prefix, &'a Rc<V>);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
