//! Notifier nodes and their propagation graph.
//!
//! Every node owns an optional local callback and two ordered edge lists:
//! the nodes it notifies and the nodes it is notified by. The two lists are
//! kept mutually consistent, so `a` notifies `b` exactly when `b` is
//! notified by `a`, and destroying a node unlinks it from all of its peers.
//!
//! ## Traversal
//!
//! [`NotifierGraph::notify`] walks depth-first in pre-order: a node's own
//! callback runs first, then each outgoing edge is followed in insertion
//! order. [`NotifierGraph::notify_last`] is the post-order mirror.
//!
//! The callback type `L` is chosen by the owner of the graph. It can be a
//! plain listener tag that the owner interprets after the walk, or a boxed
//! closure that the visitor calls with the notification arguments.
//!
//! ## Preconditions
//!
//! The graph induced by connected nodes must be acyclic. A cycle makes
//! traversal recurse without bound; nothing detects it.

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A stable handle to a node in a [`NotifierGraph`].
    ///
    /// Handles are generational: once a node is destroyed its id never
    /// resolves again, even if the slot is reused.
    pub struct NodeId;
}

#[derive(Debug)]
struct Node<L> {
    callback: Option<L>,
    notifies: Vec<NodeId>,
    notified_by: Vec<NodeId>,
}

impl<L> Node<L> {
    fn new(callback: Option<L>) -> Self {
        Self {
            callback,
            notifies: Vec::new(),
            notified_by: Vec::new(),
        }
    }
}

/// An arena of notifier nodes connected by directed edges.
#[derive(Debug)]
pub struct NotifierGraph<L> {
    nodes: SlotMap<NodeId, Node<L>>,
}

impl<L> NotifierGraph<L> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Create a node with no callback and no edges.
    pub fn create(&mut self) -> NodeId {
        self.nodes.insert(Node::new(None))
    }

    /// Create a node that carries `callback`.
    pub fn create_with(&mut self, callback: L) -> NodeId {
        self.nodes.insert(Node::new(Some(callback)))
    }

    /// Destroy a node, removing it from every peer's edge lists.
    ///
    /// Returns the node's callback, or `None` if the node had none or did
    /// not exist.
    pub fn destroy(&mut self, id: NodeId) -> Option<L> {
        let node = self.nodes.remove(id)?;

        for peer in node.notifies {
            if let Some(peer) = self.nodes.get_mut(peer) {
                peer.notified_by.retain(|&by| by != id);
            }
        }
        for peer in node.notified_by {
            if let Some(peer) = self.nodes.get_mut(peer) {
                peer.notifies.retain(|&to| to != id);
            }
        }

        node.callback
    }

    /// Returns `true` if the node exists.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Install `callback` on a node, returning the one it replaces.
    ///
    /// Does nothing if the node does not exist.
    pub fn on_notification(&mut self, id: NodeId, callback: L) -> Option<L> {
        let node = self.nodes.get_mut(id)?;
        node.callback.replace(callback)
    }

    /// Remove a node's callback, returning it.
    pub fn clear_notification(&mut self, id: NodeId) -> Option<L> {
        self.nodes.get_mut(id)?.callback.take()
    }

    /// Returns the callback installed on a node.
    #[must_use]
    pub fn callback(&self, id: NodeId) -> Option<&L> {
        self.nodes.get(id)?.callback.as_ref()
    }

    /// Make `from` notify `to`.
    ///
    /// Edges are not de-duplicated: connecting twice makes `to` receive
    /// every notification twice. Returns `false` if either node is missing.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return false;
        }
        self.nodes[from].notifies.push(to);
        self.nodes[to].notified_by.push(from);
        true
    }

    /// Remove one `from → to` edge.
    ///
    /// Returns `true` if an edge was removed.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(from) else {
            return false;
        };
        let Some(pos) = node.notifies.iter().position(|&n| n == to) else {
            return false;
        };
        node.notifies.remove(pos);

        if let Some(target) = self.nodes.get_mut(to)
            && let Some(pos) = target.notified_by.iter().position(|&n| n == from)
        {
            target.notified_by.remove(pos);
        }
        true
    }

    /// Returns `true` if `from` has at least one edge to `to`.
    #[must_use]
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes
            .get(from)
            .is_some_and(|node| node.notifies.contains(&to))
    }

    /// The nodes `id` notifies, in connection order.
    #[must_use]
    pub fn notifies(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.notifies.as_slice())
            .unwrap_or_default()
    }

    /// The nodes that notify `id`, in connection order.
    #[must_use]
    pub fn notified_by(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.notified_by.as_slice())
            .unwrap_or_default()
    }

    /// Notify `id` and everything reachable from it, pre-order.
    ///
    /// `visit` is called with each reached node that carries a callback,
    /// the node's own callback before those of the nodes it notifies.
    pub fn notify<F>(&mut self, id: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &mut L),
    {
        self.notify_first(id, &mut visit);
    }

    /// Notify `id` and everything reachable from it, post-order.
    ///
    /// Propagation happens first; the node's own callback runs last.
    pub fn notify_last<F>(&mut self, id: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &mut L),
    {
        self.notify_after(id, &mut visit);
    }

    fn notify_first<F>(&mut self, id: NodeId, visit: &mut F)
    where
        F: FnMut(NodeId, &mut L),
    {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let Some(callback) = node.callback.as_mut() {
            visit(id, callback);
        }

        let mut index = 0;
        while let Some(&next) = self.nodes.get(id).and_then(|n| n.notifies.get(index)) {
            self.notify_first(next, visit);
            index += 1;
        }
    }

    fn notify_after<F>(&mut self, id: NodeId, visit: &mut F)
    where
        F: FnMut(NodeId, &mut L),
    {
        let mut index = 0;
        while let Some(&next) = self.nodes.get(id).and_then(|n| n.notifies.get(index)) {
            self.notify_after(next, visit);
            index += 1;
        }

        if let Some(callback) = self.nodes.get_mut(id).and_then(|n| n.callback.as_mut()) {
            visit(id, callback);
        }
    }
}

impl<L> Default for NotifierGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}
