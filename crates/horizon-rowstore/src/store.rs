//! The row store: one hierarchy level of cached, filtered and sorted rows.
//!
//! A [`RowStore`] owns the rows loaded for a single parent (the root, or one
//! expanded group row). It drives the load lifecycle against the datasource,
//! derives the filtered and sorted views, hands out display indices and pixel
//! offsets, and applies local transactions.
//!
//! Stores are shared as `Arc<RowStore<T>>`. Child stores hang off their
//! group row and are only reachable through it. All deferred work (load
//! checks, flushing queued transactions) goes through the shared
//! [`TaskQueue`](horizon_rowstore_core::TaskQueue), so nothing re-enters a
//! store while it is rebuilding its rows.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_rowstore_core::logging::targets;
use horizon_rowstore_core::{
    PerfSpan, rowstore_debug, rowstore_info, rowstore_trace, rowstore_warn_once,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::datasource::{LoadCallback, LoadParams, LoadRequest, LoadSuccessParams};
use crate::display::{self, NumberSequence};
use crate::error::Error;
use crate::node::{NodeInit, RowBounds, RowNode};
use crate::params::{SelectionChanged, StoreParams, StoreUpdated};
use crate::sort::sort_nodes;
use crate::transaction::{
    ApplyTransactionParams, RowSet, Transaction, TransactionResult, TransactionStatus,
    execute_add, execute_remove, execute_update,
};

/// Load lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    /// A load has been requested but not started.
    WaitingToLoad,
    /// The datasource is fetching rows.
    Loading,
    /// Rows are loaded.
    Loaded,
    /// The last load failed.
    Failed,
}

/// Summary of one store, as reported by [`RowStore::add_store_states`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreState {
    /// Group keys leading to the store.
    pub route: Vec<String>,
    /// Rows in the store's current view.
    pub row_count: usize,
    /// Metadata supplied by the datasource.
    pub info: Map<String, Value>,
}

/// Identity and load state of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreBlockState {
    /// The prefix used for generated row ids.
    pub id: String,
    /// Current load state.
    pub state: LoadState,
}

/// Completion callback of an asynchronous transaction.
pub type TransactionCallback<T> = Box<dyn FnOnce(TransactionResult<T>) + Send>;

struct PendingTransaction<T> {
    transaction: Transaction<T>,
    callback: Option<TransactionCallback<T>>,
}

/// The sorted view either aliases the filtered view or owns a permutation.
enum SortedView<T> {
    Unsorted,
    Sorted(Vec<Arc<RowNode<T>>>),
}

#[derive(Debug, Clone, Copy)]
struct DisplayRange {
    index_start: usize,
    index_end: usize,
    top_px: f64,
    height_px: f64,
}

struct StoreInner<T> {
    state: LoadState,
    version: u64,
    rows: RowSet<T>,
    nodes_after_filter: Vec<Arc<RowNode<T>>>,
    nodes_after_sort: SortedView<T>,
    info: Map<String, Value>,
    display: Option<DisplayRange>,
    id_sequence: NumberSequence,
    last_load_error: Option<String>,
}

impl<T> StoreInner<T> {
    fn view(&self) -> &[Arc<RowNode<T>>] {
        match &self.nodes_after_sort {
            SortedView::Unsorted => &self.nodes_after_filter,
            SortedView::Sorted(nodes) => nodes,
        }
    }
}

/// A cache of the rows under one parent.
pub struct RowStore<T> {
    params: Arc<StoreParams<T>>,
    parent_node: Option<Weak<RowNode<T>>>,
    level: usize,
    route: Vec<String>,
    node_id_prefix: String,
    self_ref: Weak<RowStore<T>>,
    alive: AtomicBool,
    flush_scheduled: AtomicBool,
    inner: RwLock<StoreInner<T>>,
    pending: Mutex<VecDeque<PendingTransaction<T>>>,
}

impl<T> fmt::Debug for RowStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("RowStore")
            .field("level", &self.level)
            .field("route", &self.route)
            .field("state", &inner.state)
            .field("rows", &inner.rows.len())
            .field("alive", &self.alive.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> RowStore<T> {
    /// Create the root store and schedule its first load.
    pub fn new_root(params: Arc<StoreParams<T>>) -> Arc<Self> {
        Self::create(params, None)
    }

    fn create(params: Arc<StoreParams<T>>, parent: Option<&Arc<RowNode<T>>>) -> Arc<Self> {
        let level = parent.map_or(0, |node| node.level() + 1);
        let route = parent.map(|node| node.route()).unwrap_or_default();
        let node_id_prefix: String = route.iter().map(|key| format!("{key}-")).collect();

        let store = Arc::new_cyclic(|self_ref| Self {
            params,
            parent_node: parent.map(Arc::downgrade),
            level,
            route,
            node_id_prefix,
            self_ref: self_ref.clone(),
            alive: AtomicBool::new(true),
            flush_scheduled: AtomicBool::new(false),
            inner: RwLock::new(StoreInner {
                state: LoadState::WaitingToLoad,
                version: 0,
                rows: RowSet::default(),
                nodes_after_filter: Vec::new(),
                nodes_after_sort: SortedView::Unsorted,
                info: Map::new(),
                display: None,
                id_sequence: NumberSequence::default(),
                last_load_error: None,
            }),
            pending: Mutex::new(VecDeque::new()),
        });

        tracing::debug!(target: targets::STORE, level, route = ?store.route, "created store");
        store.schedule_load_check();
        store
    }

    // =========================================================================
    // Load lifecycle
    // =========================================================================

    fn schedule_load_check(&self) {
        let weak = self.self_ref.clone();
        self.params.tasks().post(move || {
            if let Some(store) = weak.upgrade() {
                store.load_if_waiting();
            }
        });
    }

    /// Start a datasource request if the store is waiting to load.
    pub fn load_if_waiting(&self) {
        if !self.is_alive() {
            return;
        }

        let version = {
            let mut inner = self.inner.write();
            if inner.state != LoadState::WaitingToLoad {
                return;
            }
            inner.state = LoadState::Loading;
            inner.version
        };

        let request = LoadRequest {
            route: self.route.clone(),
            level: self.level,
        };
        tracing::debug!(target: targets::LOAD, ?request, version, "requesting rows");

        self.params.datasource().get_rows(LoadParams {
            request,
            parent_node: self.parent_node(),
            callback: LoadCallback::new(self.self_ref.clone(), version),
        });
    }

    /// Accept the rows of a completed load.
    pub(crate) fn on_load_success(&self, version: u64, params: LoadSuccessParams<T>) {
        if !self.is_alive() {
            tracing::trace!(target: targets::LOAD, "ignoring load for destroyed store");
            return;
        }

        let old_nodes = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            if inner.version != version || inner.state != LoadState::Loading {
                tracing::trace!(
                    target: targets::LOAD,
                    version,
                    current = inner.version,
                    "ignoring stale load"
                );
                return;
            }

            if let Some(store_info) = params.store_info {
                inner.info.extend(store_info);
            }

            let old_nodes = inner.rows.take_all();

            let row_data = params.row_data.unwrap_or_else(|| {
                rowstore_warn_once!(
                    "RowStore.noData",
                    "datasource load succeeded without row data; treating it as empty"
                );
                Vec::new()
            });

            for data in row_data {
                let node = self.create_node(Arc::new(data), &mut inner.id_sequence);
                inner.rows.push(node);
            }

            inner.state = LoadState::Loaded;
            inner.last_load_error = None;
            self.filter_and_sort(inner);

            tracing::debug!(
                target: targets::LOAD,
                rows = inner.rows.len(),
                route = ?self.route,
                "load finished"
            );
            old_nodes
        };

        for node in old_nodes {
            node.destroy();
        }

        self.emit_store_updated();
        if !self.pending.lock().is_empty() {
            self.schedule_flush();
        }
    }

    /// Record a failed load.
    pub(crate) fn on_load_fail(&self, version: u64, reason: String) {
        if !self.is_alive() {
            return;
        }

        {
            let mut inner = self.inner.write();
            if inner.version != version || inner.state != LoadState::Loading {
                return;
            }
            tracing::error!(target: targets::LOAD, route = ?self.route, %reason, "load failed");
            inner.state = LoadState::Failed;
            inner.last_load_error = Some(reason);
        }

        // Queued transactions are reported as failed on the next turn.
        if !self.pending.lock().is_empty() {
            self.schedule_flush();
        }
    }

    /// Discard the loaded state and request a fresh load.
    ///
    /// With `show_loading`, the current rows are replaced by loading
    /// placeholders, one per visible row (at least one). Loads already in
    /// flight are ignored when they complete.
    pub fn refresh_store(&self, show_loading: bool) {
        if !self.is_alive() {
            return;
        }

        let old_nodes = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;

            let old_nodes = if show_loading {
                let placeholders = inner.view().len().max(1);
                let old_nodes = inner.rows.take_all();
                for _ in 0..placeholders {
                    let node = self.create_placeholder();
                    inner.rows.all_row_nodes.push(node);
                }
                inner.nodes_after_filter = inner.rows.all_row_nodes.clone();
                inner.nodes_after_sort = SortedView::Unsorted;
                inner.display = None;
                old_nodes
            } else {
                Vec::new()
            };

            inner.state = LoadState::WaitingToLoad;
            inner.version += 1;
            tracing::debug!(
                target: targets::STORE,
                route = ?self.route,
                show_loading,
                version = inner.version,
                "refreshing store"
            );
            old_nodes
        };

        for node in old_nodes {
            node.destroy();
        }

        self.schedule_load_check();
        self.emit_store_updated();
    }

    /// Release all rows and child stores. Pending loads and queued
    /// transactions are dropped.
    pub fn destroy(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        let old_nodes = {
            let mut inner = self.inner.write();
            inner.nodes_after_filter.clear();
            inner.nodes_after_sort = SortedView::Unsorted;
            inner.display = None;
            inner.rows.take_all()
        };
        self.pending.lock().clear();

        for node in old_nodes {
            node.destroy();
        }
        if self.parent_node.is_none() {
            rowstore_info!("root row store destroyed");
        } else {
            tracing::debug!(target: targets::STORE, route = ?self.route, "destroyed store");
        }
    }

    /// Returns `true` until the store is destroyed.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Current load state.
    pub fn state(&self) -> LoadState {
        self.inner.read().state
    }

    /// The reason of the last failed load, until the next successful one.
    pub fn last_load_error(&self) -> Option<Error> {
        self.inner.read().last_load_error.clone().map(Error::load)
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    fn create_node(&self, data: Arc<T>, ids: &mut NumberSequence) -> Arc<RowNode<T>> {
        let params = &self.params;
        let config = params.config();
        let group = config.is_group_level(self.level);

        let id = params
            .row_id_for(&data)
            .unwrap_or_else(|| format!("{}{}", self.node_id_prefix, ids.next()));
        let key = if group {
            params.group_key_for(&data, self.level)
        } else {
            None
        };

        RowNode::new(NodeInit {
            id: Some(id),
            key,
            level: self.level,
            group,
            leaf_group: group && config.is_leaf_group_level(self.level),
            parent: self.parent_node.clone(),
            row_height: params.row_height_for(&data),
            selectable: params.is_row_selectable(&data),
            data: Some(data),
        })
    }

    fn create_placeholder(&self) -> Arc<RowNode<T>> {
        let config = self.params.config();
        let group = config.is_group_level(self.level);
        RowNode::new(NodeInit {
            id: None,
            key: None,
            level: self.level,
            group,
            leaf_group: group && config.is_leaf_group_level(self.level),
            parent: self.parent_node.clone(),
            data: None,
            row_height: self.params.config().row_height,
            selectable: false,
        })
    }

    // =========================================================================
    // Filter and sort
    // =========================================================================

    fn filter_and_sort(&self, inner: &mut StoreInner<T>) {
        self.filter_pass(inner);
        self.sort_pass(inner);
    }

    fn filter_pass(&self, inner: &mut StoreInner<T>) {
        // Group rows are never filtered here.
        if self.params.config().is_group_level(self.level) {
            inner.nodes_after_filter = inner.rows.all_row_nodes.clone();
        } else {
            inner.nodes_after_filter = inner
                .rows
                .all_row_nodes
                .iter()
                .filter(|node| self.params.passes_filter(node))
                .cloned()
                .collect();

            let visible: HashSet<*const RowNode<T>> =
                inner.nodes_after_filter.iter().map(Arc::as_ptr).collect();
            for node in &inner.rows.all_row_nodes {
                if !visible.contains(&Arc::as_ptr(node)) {
                    display::clear_display_index(node);
                }
            }
        }
        inner.display = None;
    }

    fn sort_pass(&self, inner: &mut StoreInner<T>) {
        inner.nodes_after_sort = if self.params.is_sort_active() {
            let _span = PerfSpan::new("RowStore::sort");
            SortedView::Sorted(sort_nodes(&inner.nodes_after_filter, &self.params.sort_model()))
        } else {
            SortedView::Unsorted
        };
        inner.display = None;
    }

    /// Re-run the filter and sort passes here and in every child store.
    pub fn refresh_after_filter(&self) {
        if !self.is_alive() {
            return;
        }
        {
            let mut inner = self.inner.write();
            if inner.state == LoadState::Loaded {
                self.filter_and_sort(&mut inner);
            }
        }
        self.for_each_child_store_shallow(|child| child.refresh_after_filter());
    }

    /// Re-run the sort pass here and in every child store.
    pub fn refresh_after_sort(&self) {
        if !self.is_alive() {
            return;
        }
        {
            let mut inner = self.inner.write();
            if inner.state == LoadState::Loaded {
                self.sort_pass(&mut inner);
            }
        }
        self.for_each_child_store_shallow(|child| child.refresh_after_sort());
    }

    // =========================================================================
    // Display indices
    // =========================================================================

    /// Assign display indices and pixel offsets to the current view.
    ///
    /// Rows outside the view lose their position. Expanded groups continue
    /// the sequence into their child store.
    pub fn set_display_indexes(&self, sequence: &mut NumberSequence, row_top: &mut f64) {
        let _span = PerfSpan::new("RowStore::set_display_indexes");

        let (all, view) = {
            let inner = self.inner.read();
            (inner.rows.all_row_nodes.clone(), inner.view().to_vec())
        };

        let visible: HashSet<*const RowNode<T>> = view.iter().map(Arc::as_ptr).collect();
        for node in &all {
            if !visible.contains(&Arc::as_ptr(node)) {
                display::clear_display_index(node);
            }
        }

        let index_start = sequence.peek();
        let top_px = *row_top;
        for node in &view {
            display::set_display_index(node, sequence, row_top);
        }

        let range = DisplayRange {
            index_start,
            index_end: sequence.peek(),
            top_px,
            height_px: *row_top - top_px,
        };
        tracing::trace!(target: targets::DISPLAY, route = ?self.route, ?range, "display indexes set");
        self.inner.write().display = Some(range);
    }

    /// Invalidate the display range and clear every row's position.
    pub fn clear_display_indexes(&self) {
        let all = {
            let mut inner = self.inner.write();
            inner.display = None;
            inner.rows.all_row_nodes.clone()
        };
        for node in &all {
            display::clear_display_index(node);
        }
    }

    /// First display index of this store, if positioned.
    pub fn display_index_start(&self) -> Option<usize> {
        self.inner.read().display.map(|range| range.index_start)
    }

    /// One past the last display index of this store, if positioned.
    pub fn display_index_end(&self) -> Option<usize> {
        self.inner.read().display.map(|range| range.index_end)
    }

    /// Pixel offset of this store's first row, if positioned.
    pub fn top_px(&self) -> Option<f64> {
        self.inner.read().display.map(|range| range.top_px)
    }

    /// Total pixel height of this store's rows, if positioned.
    pub fn height_px(&self) -> Option<f64> {
        self.inner.read().display.map(|range| range.height_px)
    }

    /// Returns `true` if display index `index` belongs to this store.
    pub fn is_display_index_in_store(&self, index: usize) -> bool {
        self.inner
            .read()
            .display
            .is_some_and(|range| range.index_start <= index && index < range.index_end)
    }

    /// The row with display index `index`, here or in an open child store.
    pub fn get_row_using_display_index(&self, index: usize) -> Option<Arc<RowNode<T>>> {
        if !self.is_display_index_in_store(index) {
            return None;
        }
        let view = self.inner.read().view().to_vec();
        display::binary_search_for_display_index(index, &view)
    }

    /// Bounds of the row under `pixel`.
    pub fn get_row_bounds(&self, pixel: f64) -> Option<RowBounds> {
        let view = {
            let inner = self.inner.read();
            inner.display?;
            inner.view().to_vec()
        };
        view.iter()
            .find_map(|node| display::extract_row_bounds(node, pixel))
    }

    /// Returns `true` if `pixel` falls within this store's rows.
    pub fn is_pixel_in_range(&self, pixel: f64) -> bool {
        self.inner
            .read()
            .display
            .is_some_and(|range| pixel >= range.top_px && pixel < range.top_px + range.height_px)
    }

    /// Display index of the row under `pixel`, clamped to this store's rows.
    pub fn get_row_index_at_pixel(&self, pixel: f64) -> Option<usize> {
        let (range, view) = {
            let inner = self.inner.read();
            (inner.display?, inner.view().to_vec())
        };
        let first = view.first()?;
        let last = view.last()?;

        if pixel < range.top_px {
            return first.row_index();
        }
        if pixel >= range.top_px + range.height_px {
            return last.row_index();
        }

        view.iter()
            .find_map(|node| display::index_at_pixel(node, pixel))
            .or_else(|| range.index_end.checked_sub(1))
    }

    /// Display index of the top-level row at `index` in the view.
    pub fn top_level_row_displayed_index(&self, index: usize) -> Option<usize> {
        let inner = self.inner.read();
        inner.view().get(index).and_then(|node| node.row_index())
    }

    /// The rows of the view between `first` and `last`, inclusive.
    ///
    /// A missing boundary means the start of the view, so passing a single
    /// node returns everything up to it. The result is empty if neither
    /// boundary is given, a boundary is not in the view, or `last` precedes
    /// `first`.
    pub fn get_row_nodes_in_range(
        &self,
        first: Option<&Arc<RowNode<T>>>,
        last: Option<&Arc<RowNode<T>>>,
    ) -> Vec<Arc<RowNode<T>>> {
        let (start, end) = match (first, last) {
            (None, None) => return Vec::new(),
            (Some(only), None) | (None, Some(only)) => (None, only),
            (Some(first), Some(last)) => (Some(first), last),
        };

        let inner = self.inner.read();
        let mut result = Vec::new();
        let mut started = start.is_none();

        for node in inner.view() {
            if !started {
                if start.is_some_and(|start| Arc::ptr_eq(start, node)) {
                    started = true;
                } else {
                    continue;
                }
            }
            result.push(node.clone());
            if Arc::ptr_eq(end, node) {
                return result;
            }
        }
        Vec::new()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Apply a transaction to the loaded rows.
    ///
    /// Nothing is changed unless the store is loaded and the veto (if any)
    /// accepts the transaction. The caller re-runs display allocation.
    pub fn apply_transaction(&self, transaction: &Transaction<T>) -> TransactionResult<T> {
        let _span = PerfSpan::new("RowStore::apply_transaction");

        let (status, info) = {
            let inner = self.inner.read();
            (Self::status_for(inner.state), inner.info.clone())
        };
        if status != TransactionStatus::Applied {
            return TransactionResult::with_status(status);
        }

        if let Some(veto) = self.params.transaction_veto() {
            let parent_node = self.parent_node();
            let accepted = veto(&ApplyTransactionParams {
                transaction,
                parent_node: parent_node.as_ref(),
                store_info: &info,
            });
            if !accepted {
                tracing::debug!(target: targets::TRANSACTION, route = ?self.route, "transaction cancelled");
                return TransactionResult::with_status(TransactionStatus::Cancelled);
            }
        }

        let mut to_deselect = Vec::new();
        let result = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;

            // The veto runs unlocked, so the state may have moved on.
            let status = Self::status_for(inner.state);
            if status != TransactionStatus::Applied {
                return TransactionResult::with_status(status);
            }

            let ids = &mut inner.id_sequence;
            let add = execute_add(
                &mut inner.rows,
                &transaction.add,
                transaction.add_index,
                |data| self.create_node(data, ids),
            );
            let remove = execute_remove(
                &mut inner.rows,
                &transaction.remove,
                &self.params,
                &mut to_deselect,
            );
            let update = execute_update(
                &inner.rows,
                &transaction.update,
                &self.params,
                &mut to_deselect,
            );

            self.filter_and_sort(inner);

            TransactionResult {
                status: TransactionStatus::Applied,
                add,
                remove,
                update,
            }
        };

        tracing::debug!(
            target: targets::TRANSACTION,
            route = ?self.route,
            added = result.add.len(),
            removed = result.remove.len(),
            updated = result.update.len(),
            "transaction applied"
        );

        self.deselect(to_deselect);
        result
    }

    fn status_for(state: LoadState) -> TransactionStatus {
        match state {
            LoadState::Loaded => TransactionStatus::Applied,
            LoadState::Failed => TransactionStatus::StoreLoadingFailed,
            LoadState::Loading => TransactionStatus::StoreLoading,
            LoadState::WaitingToLoad => TransactionStatus::StoreWaitingToLoad,
        }
    }

    fn deselect(&self, nodes: Vec<Arc<RowNode<T>>>) {
        if nodes.is_empty() {
            return;
        }
        for node in &nodes {
            node.deselect_silently();
        }
        self.params
            .signals()
            .selection_changed
            .emit(SelectionChanged { deselected: nodes });
    }

    /// Queue a transaction to be applied on a later turn.
    ///
    /// Transactions stay queued while the store is waiting to load or
    /// loading, and are flushed on the turn after the load completes. The
    /// callback receives the result of every other outcome.
    pub fn apply_transaction_async<F>(&self, transaction: Transaction<T>, callback: Option<F>)
    where
        F: FnOnce(TransactionResult<T>) + Send + 'static,
    {
        if !self.is_alive() {
            return;
        }
        self.pending.lock().push_back(PendingTransaction {
            transaction,
            callback: callback.map(|f| Box::new(f) as TransactionCallback<T>),
        });
        if !Self::status_for(self.state()).is_pending_load() {
            self.schedule_flush();
        }
    }

    /// Number of transactions waiting to be flushed.
    pub fn pending_transaction_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn schedule_flush(&self) {
        if self.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak = self.self_ref.clone();
        self.params.tasks().post(move || {
            if let Some(store) = weak.upgrade() {
                store.flush_async_transactions();
            }
        });
    }

    fn flush_async_transactions(&self) {
        self.flush_scheduled.store(false, Ordering::SeqCst);
        if !self.is_alive() {
            return;
        }

        let batch: Vec<PendingTransaction<T>> = self.pending.lock().drain(..).collect();
        let mut still_waiting = Vec::new();
        let mut applied_any = false;

        for pending in batch {
            let result = self.apply_transaction(&pending.transaction);
            if result.status.is_pending_load() {
                still_waiting.push(pending);
                continue;
            }
            applied_any |= result.status == TransactionStatus::Applied;
            if let Some(callback) = pending.callback {
                callback(result);
            }
        }

        if !still_waiting.is_empty() {
            let mut queue = self.pending.lock();
            for pending in still_waiting.into_iter().rev() {
                queue.push_front(pending);
            }
        }

        tracing::debug!(target: targets::TRANSACTION, route = ?self.route, applied_any, "flushed queued transactions");
        if applied_any {
            self.emit_store_updated();
        }
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    fn owns(&self, node: &Arc<RowNode<T>>) -> bool {
        let inner = self.inner.read();
        node.id()
            .and_then(|id| inner.rows.node_index.get(id))
            .is_some_and(|found| Arc::ptr_eq(found, node))
    }

    /// Expand a group row of this store, creating and loading its child store.
    pub fn expand_node(&self, node: &Arc<RowNode<T>>) {
        if !node.is_group() || !self.owns(node) {
            tracing::warn!(target: targets::STORE, node = ?node.id(), "cannot expand node");
            return;
        }
        node.set_expanded(true);
        rowstore_debug!(node = ?node.id(), level = self.level, "expanding group row");
        if node.child_store().is_none() {
            let child = Self::create(self.params.clone(), Some(node));
            node.replace_child_store(Some(child));
        }
        self.emit_store_updated();
    }

    /// Collapse a group row of this store, destroying its child store.
    pub fn collapse_node(&self, node: &Arc<RowNode<T>>) {
        if !self.owns(node) {
            tracing::warn!(target: targets::STORE, node = ?node.id(), "cannot collapse node");
            return;
        }
        node.set_expanded(false);
        rowstore_debug!(node = ?node.id(), level = self.level, "collapsing group row");
        if let Some(child) = node.replace_child_store(None) {
            child.destroy();
        }
        self.emit_store_updated();
    }

    /// The store reached by following group `keys` down from this one.
    pub fn get_child_store<S: AsRef<str>>(&self, keys: &[S]) -> Option<Arc<RowStore<T>>> {
        let Some((key, rest)) = keys.split_first() else {
            return self.self_ref.upgrade();
        };
        let child = {
            let inner = self.inner.read();
            inner
                .rows
                .all_row_nodes
                .iter()
                .find(|node| node.key() == Some(key.as_ref()))
                .and_then(|node| node.child_store())
        };
        let Some(child) = child else {
            rowstore_trace!(key = key.as_ref(), route = ?self.route, "no open child store for group key");
            return None;
        };
        child.get_child_store(rest)
    }

    /// Visit every row here and in all child stores, depth first.
    ///
    /// Each row is passed together with the next value of `sequence`.
    pub fn for_each_node_deep<F>(&self, callback: &mut F, sequence: &mut NumberSequence)
    where
        F: FnMut(&Arc<RowNode<T>>, usize),
    {
        let all = self.all_row_nodes();
        for node in &all {
            callback(node, sequence.next());
            if let Some(child) = node.child_store() {
                child.for_each_node_deep(callback, sequence);
            }
        }
    }

    /// Visit the direct child stores of this store.
    pub fn for_each_child_store_shallow<F>(&self, mut callback: F)
    where
        F: FnMut(&Arc<RowStore<T>>),
    {
        for node in self.all_row_nodes() {
            if let Some(child) = node.child_store() {
                callback(&child);
            }
        }
    }

    /// Append the state of this store and all child stores to `states`.
    pub fn add_store_states(&self, states: &mut Vec<StoreState>) {
        {
            let inner = self.inner.read();
            states.push(StoreState {
                route: self.route.clone(),
                row_count: inner.view().len(),
                info: inner.info.clone(),
            });
        }
        self.for_each_child_store_shallow(|child| child.add_store_states(states));
    }

    /// Identity and load state of this store.
    pub fn block_state(&self) -> StoreBlockState {
        StoreBlockState {
            id: self.node_id_prefix.clone(),
            state: self.state(),
        }
    }

    fn emit_store_updated(&self) {
        self.params.signals().store_updated.emit(StoreUpdated {
            route: self.route.clone(),
        });
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The collaborators shared by this store tree.
    pub fn params(&self) -> &Arc<StoreParams<T>> {
        &self.params
    }

    /// The group row owning this store, or `None` for the root.
    pub fn parent_node(&self) -> Option<Arc<RowNode<T>>> {
        self.parent_node.as_ref().and_then(Weak::upgrade)
    }

    /// Hierarchy level of the rows in this store.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Group keys leading to this store.
    pub fn route(&self) -> &[String] {
        &self.route
    }

    /// Metadata merged from every load.
    pub fn info(&self) -> Map<String, Value> {
        self.inner.read().info.clone()
    }

    /// Rows in the current view.
    pub fn row_count(&self) -> usize {
        self.inner.read().view().len()
    }

    /// First row of the store; rows are held in full, so always `0`.
    pub fn start_row(&self) -> usize {
        0
    }

    /// One past the last row of the view.
    pub fn end_row(&self) -> usize {
        self.row_count()
    }

    /// Returns `true` once the row count is final, i.e. after a load.
    pub fn is_last_row_index_known(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// The node registered under `id`.
    pub fn row_node_by_id(&self, id: &str) -> Option<Arc<RowNode<T>>> {
        self.inner.read().rows.node_index.get(id).cloned()
    }

    /// Every row, in load and transaction order.
    pub fn all_row_nodes(&self) -> Vec<Arc<RowNode<T>>> {
        self.inner.read().rows.all_row_nodes.clone()
    }

    /// Rows that passed the filter, in load order.
    pub fn nodes_after_filter(&self) -> Vec<Arc<RowNode<T>>> {
        self.inner.read().nodes_after_filter.clone()
    }

    /// The current view: filtered rows in sort order.
    pub fn nodes_after_sort(&self) -> Vec<Arc<RowNode<T>>> {
        self.inner.read().view().to_vec()
    }
}

static_assertions::assert_impl_all!(RowStore<String>: Send, Sync);
