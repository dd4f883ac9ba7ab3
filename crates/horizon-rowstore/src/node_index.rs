//! Id → node lookup for transactions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::RowNode;

/// Maps stable row ids to the nodes of one store.
///
/// The store keeps this in step with its full row list: every data node is
/// registered on creation and unregistered when removed or destroyed.
pub struct NodeIndex<T> {
    nodes: HashMap<String, Arc<RowNode<T>>>,
}

impl<T> Default for NodeIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeIndex<T> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Registers a node under its id.
    ///
    /// Placeholders (nodes without an id) are ignored. Returns the node that
    /// was previously registered under the same id, if any.
    pub fn insert(&mut self, node: Arc<RowNode<T>>) -> Option<Arc<RowNode<T>>> {
        let id = node.id()?.to_string();
        self.nodes.insert(id, node)
    }

    /// Unregisters the node with the given id.
    pub fn remove(&mut self, id: &str) -> Option<Arc<RowNode<T>>> {
        self.nodes.remove(id)
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &str) -> Option<&Arc<RowNode<T>>> {
        self.nodes.get(id)
    }

    /// Returns `true` if a node is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Removes every registration.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
