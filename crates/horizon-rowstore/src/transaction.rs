//! Transactions: local add/remove/update batches against a loaded store.
//!
//! The store validates state and the veto, then runs the sub-operations here
//! in a fixed order (add, remove, update) against its [`RowSet`]. These
//! functions only touch the row set and the nodes themselves; re-running the
//! filter and sort passes and raising notifications is left to the store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use horizon_rowstore_core::logging::targets;
use horizon_rowstore_core::{rowstore_error, rowstore_warn};
use serde_json::{Map, Value};

use crate::node::RowNode;
use crate::node_index::NodeIndex;
use crate::params::StoreParams;

/// A batch of local row mutations.
pub struct Transaction<T> {
    /// Records to add.
    pub add: Vec<Arc<T>>,
    /// Where to insert added rows. Appended when `None`.
    pub add_index: Option<usize>,
    /// Records to remove, resolved by id or by identity.
    pub remove: Vec<Arc<T>>,
    /// Replacement records, resolved by id or by identity.
    pub update: Vec<Arc<T>>,
}

impl<T> Default for Transaction<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            add_index: None,
            remove: Vec::new(),
            update: Vec::new(),
        }
    }
}

impl<T> Clone for Transaction<T> {
    fn clone(&self) -> Self {
        Self {
            add: self.add.clone(),
            add_index: self.add_index,
            remove: self.remove.clone(),
            update: self.update.clone(),
        }
    }
}

impl<T> fmt::Debug for Transaction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("add", &self.add.len())
            .field("add_index", &self.add_index)
            .field("remove", &self.remove.len())
            .field("update", &self.update.len())
            .finish()
    }
}

impl<T> Transaction<T> {
    /// An empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records.
    pub fn with_add<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.add.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Insert added records at `index` instead of appending them.
    pub fn with_add_index(mut self, index: usize) -> Self {
        self.add_index = Some(index);
        self
    }

    /// Remove records.
    pub fn with_remove<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.remove.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Update records.
    pub fn with_update<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<T>>,
    {
        self.update.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Returns `true` if the transaction carries no rows.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.update.is_empty()
    }
}

/// Outcome of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TransactionStatus {
    /// The transaction was applied.
    Applied,
    /// The veto rejected the transaction.
    Cancelled,
    /// The store is loading; nothing was changed.
    StoreLoading,
    /// The store's last load failed; nothing was changed.
    StoreLoadingFailed,
    /// The store has not started loading; nothing was changed.
    StoreWaitingToLoad,
}

impl TransactionStatus {
    /// Returns `true` if the transaction may succeed once the store loads.
    pub fn is_pending_load(self) -> bool {
        matches!(self, Self::StoreLoading | Self::StoreWaitingToLoad)
    }
}

/// Summary of an applied (or refused) transaction.
pub struct TransactionResult<T> {
    /// Overall status.
    pub status: TransactionStatus,
    /// Nodes created for added records.
    pub add: Vec<Arc<RowNode<T>>>,
    /// Nodes removed from the store.
    pub remove: Vec<Arc<RowNode<T>>>,
    /// Nodes that received new data.
    pub update: Vec<Arc<RowNode<T>>>,
}

impl<T> TransactionResult<T> {
    /// A result with the given status and no row changes.
    pub fn with_status(status: TransactionStatus) -> Self {
        Self {
            status,
            add: Vec::new(),
            remove: Vec::new(),
            update: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for TransactionResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionResult")
            .field("status", &self.status)
            .field("add", &self.add.len())
            .field("remove", &self.remove.len())
            .field("update", &self.update.len())
            .finish()
    }
}

/// What the transaction veto is shown.
pub struct ApplyTransactionParams<'a, T> {
    /// The transaction about to be applied.
    pub transaction: &'a Transaction<T>,
    /// The group row owning the target store, or `None` at the root.
    pub parent_node: Option<&'a Arc<RowNode<T>>>,
    /// The target store's info at the time of the call.
    pub store_info: &'a Map<String, Value>,
}

/// The row containers a transaction mutates.
pub struct RowSet<T> {
    /// Every live node, in load/transaction order.
    pub all_row_nodes: Vec<Arc<RowNode<T>>>,
    /// Id lookup over `all_row_nodes`.
    pub node_index: NodeIndex<T>,
}

impl<T> Default for RowSet<T> {
    fn default() -> Self {
        Self {
            all_row_nodes: Vec::new(),
            node_index: NodeIndex::new(),
        }
    }
}

impl<T> RowSet<T> {
    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.all_row_nodes.len()
    }

    /// Returns `true` if the set holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.all_row_nodes.is_empty()
    }

    /// Append a node and register it.
    ///
    /// A node whose id is already registered is dropped with a warning and
    /// `false` is returned.
    pub fn push(&mut self, node: Arc<RowNode<T>>) -> bool {
        if !self.register(&node) {
            return false;
        }
        self.all_row_nodes.push(node);
        true
    }

    fn register(&mut self, node: &Arc<RowNode<T>>) -> bool {
        if let Some(id) = node.id()
            && self.node_index.contains(id)
        {
            rowstore_warn!(id = %id, "duplicate row id, row ignored");
            return false;
        }
        self.node_index.insert(node.clone());
        true
    }

    /// Take every node out of the set.
    pub fn take_all(&mut self) -> Vec<Arc<RowNode<T>>> {
        self.node_index.clear();
        std::mem::take(&mut self.all_row_nodes)
    }
}

/// Find the node holding `data`.
///
/// Uses the id resolver when one is configured, otherwise compares the record
/// reference itself. Unresolvable records are logged and yield `None`.
pub fn lookup_row_node<T>(
    rows: &RowSet<T>,
    params: &StoreParams<T>,
    data: &Arc<T>,
) -> Option<Arc<RowNode<T>>> {
    match params.row_id_for(data) {
        Some(id) => {
            let found = rows.node_index.get(&id).cloned();
            if found.is_none() {
                rowstore_error!(id = %id, "could not find row id in store");
            }
            found
        }
        None => {
            let found = rows
                .all_row_nodes
                .iter()
                .find(|node| node.data().is_some_and(|d| Arc::ptr_eq(&d, data)))
                .cloned();
            if found.is_none() {
                rowstore_error!("could not find data item in store; without a row id resolver, records must be the same instances that were loaded");
            }
            found
        }
    }
}

/// Create nodes for `items` and place them in the row set.
///
/// With an insertion index the new nodes end up contiguous at that position
/// in input order; the index is clamped to the current length. Items whose id
/// is already in the store are skipped.
pub fn execute_add<T, F>(
    rows: &mut RowSet<T>,
    items: &[Arc<T>],
    add_index: Option<usize>,
    mut create_node: F,
) -> Vec<Arc<RowNode<T>>>
where
    F: FnMut(Arc<T>) -> Arc<RowNode<T>>,
{
    let mut added = Vec::with_capacity(items.len());
    for item in items {
        let node = create_node(item.clone());
        if rows.register(&node) {
            added.push(node);
        }
    }

    match add_index {
        Some(index) => {
            let index = index.min(rows.all_row_nodes.len());
            rows.all_row_nodes.splice(index..index, added.iter().cloned());
        }
        None => rows.all_row_nodes.extend(added.iter().cloned()),
    }

    tracing::trace!(target: targets::TRANSACTION, count = added.len(), ?add_index, "added rows");
    added
}

/// Remove the nodes holding `items`.
///
/// Selected nodes are queued on `to_deselect`. Each removed node loses its
/// pixel position and child store and is unregistered; the full list is
/// filtered in a single pass at the end.
pub fn execute_remove<T>(
    rows: &mut RowSet<T>,
    items: &[Arc<T>],
    params: &StoreParams<T>,
    to_deselect: &mut Vec<Arc<RowNode<T>>>,
) -> Vec<Arc<RowNode<T>>>
where
    T: Send + Sync + 'static,
{
    let mut removed: Vec<Arc<RowNode<T>>> = Vec::new();
    let mut removed_ptrs: HashSet<*const RowNode<T>> = HashSet::new();

    for item in items {
        let Some(node) = lookup_row_node(rows, params, item) else {
            continue;
        };
        if !removed_ptrs.insert(Arc::as_ptr(&node)) {
            continue;
        }

        if node.is_selected() {
            to_deselect.push(node.clone());
        }
        node.clear_row_top();
        if let Some(child) = node.replace_child_store(None) {
            child.destroy();
        }
        if let Some(id) = node.id() {
            rows.node_index.remove(id);
        }
        removed.push(node);
    }

    if !removed.is_empty() {
        rows.all_row_nodes
            .retain(|node| !removed_ptrs.contains(&Arc::as_ptr(node)));
    }

    tracing::trace!(target: targets::TRANSACTION, count = removed.len(), "removed rows");
    removed
}

/// Apply replacement records to their existing nodes in place.
///
/// Nodes that become unselectable while selected are queued on `to_deselect`.
pub fn execute_update<T>(
    rows: &RowSet<T>,
    items: &[Arc<T>],
    params: &StoreParams<T>,
    to_deselect: &mut Vec<Arc<RowNode<T>>>,
) -> Vec<Arc<RowNode<T>>> {
    let mut updated = Vec::new();

    for item in items {
        let Some(node) = lookup_row_node(rows, params, item) else {
            continue;
        };

        node.update_data(
            item.clone(),
            params.row_height_for(item),
            params.is_row_selectable(item),
        );
        if node.is_selected() && !node.is_selectable() {
            to_deselect.push(node.clone());
        }
        updated.push(node);
    }

    tracing::trace!(target: targets::TRANSACTION, count = updated.len(), "updated rows");
    updated
}
