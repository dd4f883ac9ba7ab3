//! Collaborators and notifications shared by every store in a tree.
//!
//! A [`StoreParams`] is built once and handed to the root store; child stores
//! created on expansion share the same instance. The filter and the sort model
//! can be swapped at runtime, after which the owner calls
//! [`RowStore::refresh_after_filter`](crate::RowStore::refresh_after_filter) or
//! [`RowStore::refresh_after_sort`](crate::RowStore::refresh_after_sort).

use std::fmt;
use std::sync::Arc;

use horizon_rowstore_core::{Signal, TaskQueue};
use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::datasource::DataSource;
use crate::error::Result;
use crate::node::RowNode;
use crate::sort::SortKey;
use crate::transaction::ApplyTransactionParams;

/// Leaf-level filter predicate.
pub type FilterFn<T> = Arc<dyn Fn(&RowNode<T>) -> bool + Send + Sync>;
/// Resolves a stable id for a record.
pub type RowIdFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
/// Pixel height of a record's row.
pub type RowHeightFn<T> = Arc<dyn Fn(&T) -> f64 + Send + Sync>;
/// Whether a record's row may be selected.
pub type RowSelectableFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
/// Group key of a record at a grouping level.
pub type GroupKeyFn<T> = Arc<dyn Fn(&T, usize) -> Option<String> + Send + Sync>;
/// Decides whether a transaction may be applied. Returning `false` cancels it.
pub type TransactionVetoFn<T> = Arc<dyn Fn(&ApplyTransactionParams<'_, T>) -> bool + Send + Sync>;

/// Payload of [`StoreSignals::store_updated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUpdated {
    /// Route of the store that changed. Empty for the root store.
    pub route: Vec<String>,
}

/// Payload of [`StoreSignals::selection_changed`].
pub struct SelectionChanged<T> {
    /// Rows deselected by the store, in the order they were processed.
    pub deselected: Vec<Arc<RowNode<T>>>,
}

impl<T> Clone for SelectionChanged<T> {
    fn clone(&self) -> Self {
        Self {
            deselected: self.deselected.clone(),
        }
    }
}

impl<T> fmt::Debug for SelectionChanged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionChanged")
            .field("deselected", &self.deselected.len())
            .finish()
    }
}

/// Notifications raised by the stores of one tree.
pub struct StoreSignals<T> {
    /// A store's rows changed and views should re-run index allocation.
    pub store_updated: Signal<StoreUpdated>,
    /// The store deselected rows while applying a transaction.
    pub selection_changed: Signal<SelectionChanged<T>>,
}

impl<T: Send + Sync + 'static> StoreSignals<T> {
    fn new() -> Self {
        Self {
            store_updated: Signal::new(),
            selection_changed: Signal::new(),
        }
    }
}

/// Shared collaborators of a store tree.
pub struct StoreParams<T> {
    datasource: Arc<dyn DataSource<T>>,
    tasks: Arc<TaskQueue>,
    config: StoreConfig,
    row_id: Option<RowIdFn<T>>,
    row_height: Option<RowHeightFn<T>>,
    row_selectable: Option<RowSelectableFn<T>>,
    group_key: Option<GroupKeyFn<T>>,
    transaction_veto: Option<TransactionVetoFn<T>>,
    filter: RwLock<Option<FilterFn<T>>>,
    sort_model: RwLock<Vec<SortKey<T>>>,
    signals: StoreSignals<T>,
}

impl<T> fmt::Debug for StoreParams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreParams")
            .field("config", &self.config)
            .field("row_id", &self.row_id.is_some())
            .field("filter", &self.filter.read().is_some())
            .field("sort_keys", &self.sort_model.read().len())
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> StoreParams<T> {
    /// Start building parameters around a datasource.
    pub fn builder<D>(datasource: D) -> StoreParamsBuilder<T>
    where
        D: DataSource<T> + 'static,
    {
        StoreParamsBuilder {
            datasource: Arc::new(datasource),
            tasks: None,
            config: StoreConfig::default(),
            row_id: None,
            row_height: None,
            row_selectable: None,
            group_key: None,
            transaction_veto: None,
            filter: None,
            sort_model: Vec::new(),
        }
    }
}

impl<T> StoreParams<T> {
    /// The datasource rows are loaded from.
    pub fn datasource(&self) -> &Arc<dyn DataSource<T>> {
        &self.datasource
    }

    /// The queue deferred work is posted to.
    pub fn tasks(&self) -> &Arc<TaskQueue> {
        &self.tasks
    }

    /// Plain configuration values.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Notifications raised by the stores using these params.
    pub fn signals(&self) -> &StoreSignals<T> {
        &self.signals
    }

    /// Returns `true` if records carry their own ids.
    pub fn has_row_id(&self) -> bool {
        self.row_id.is_some()
    }

    /// Resolve the external id of a record.
    pub fn row_id_for(&self, data: &T) -> Option<String> {
        self.row_id.as_ref().map(|row_id| row_id(data))
    }

    /// Pixel height of a record's row.
    pub fn row_height_for(&self, data: &T) -> f64 {
        match &self.row_height {
            Some(row_height) => row_height(data),
            None => self.config.row_height,
        }
    }

    /// Whether a record's row may be selected.
    pub fn is_row_selectable(&self, data: &T) -> bool {
        self.row_selectable
            .as_ref()
            .is_none_or(|row_selectable| row_selectable(data))
    }

    /// Group key of a record at `level`.
    pub fn group_key_for(&self, data: &T, level: usize) -> Option<String> {
        self.group_key.as_ref().and_then(|group_key| group_key(data, level))
    }

    pub(crate) fn transaction_veto(&self) -> Option<&TransactionVetoFn<T>> {
        self.transaction_veto.as_ref()
    }

    /// Replace the leaf-level filter.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&RowNode<T>) -> bool + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
    }

    /// Remove the leaf-level filter.
    pub fn clear_filter(&self) {
        *self.filter.write() = None;
    }

    /// Returns `true` if a filter is installed.
    pub fn is_filter_active(&self) -> bool {
        self.filter.read().is_some()
    }

    /// Returns `true` if `node` passes the current filter.
    pub fn passes_filter(&self, node: &RowNode<T>) -> bool {
        let filter = self.filter.read().clone();
        filter.is_none_or(|filter| filter(node))
    }

    /// Replace the sort model. An empty model disables sorting.
    pub fn set_sort_model(&self, keys: Vec<SortKey<T>>) {
        *self.sort_model.write() = keys;
    }

    /// A snapshot of the current sort model.
    pub fn sort_model(&self) -> Vec<SortKey<T>> {
        self.sort_model.read().clone()
    }

    /// Returns `true` if any sort key is set.
    pub fn is_sort_active(&self) -> bool {
        !self.sort_model.read().is_empty()
    }
}

/// Builder for [`StoreParams`].
pub struct StoreParamsBuilder<T> {
    datasource: Arc<dyn DataSource<T>>,
    tasks: Option<Arc<TaskQueue>>,
    config: StoreConfig,
    row_id: Option<RowIdFn<T>>,
    row_height: Option<RowHeightFn<T>>,
    row_selectable: Option<RowSelectableFn<T>>,
    group_key: Option<GroupKeyFn<T>>,
    transaction_veto: Option<TransactionVetoFn<T>>,
    filter: Option<FilterFn<T>>,
    sort_model: Vec<SortKey<T>>,
}

impl<T: Send + Sync + 'static> StoreParamsBuilder<T> {
    /// Use an existing task queue. By default a private queue is created.
    pub fn tasks(mut self, tasks: Arc<TaskQueue>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Set the plain configuration values.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve row ids from records instead of generating them.
    pub fn row_id<F>(mut self, row_id: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.row_id = Some(Arc::new(row_id));
        self
    }

    /// Compute each row's height from its record.
    pub fn row_height<F>(mut self, row_height: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.row_height = Some(Arc::new(row_height));
        self
    }

    /// Decide per record whether its row may be selected.
    pub fn row_selectable<F>(mut self, row_selectable: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.row_selectable = Some(Arc::new(row_selectable));
        self
    }

    /// Extract the group key of a record at a grouping level.
    pub fn group_key<F>(mut self, group_key: F) -> Self
    where
        F: Fn(&T, usize) -> Option<String> + Send + Sync + 'static,
    {
        self.group_key = Some(Arc::new(group_key));
        self
    }

    /// Install a transaction veto. Returning `false` cancels the transaction.
    pub fn transaction_veto<F>(mut self, veto: F) -> Self
    where
        F: Fn(&ApplyTransactionParams<'_, T>) -> bool + Send + Sync + 'static,
    {
        self.transaction_veto = Some(Arc::new(veto));
        self
    }

    /// Install the initial leaf-level filter.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RowNode<T>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Set the initial sort model.
    pub fn sort_model(mut self, keys: Vec<SortKey<T>>) -> Self {
        self.sort_model = keys;
        self
    }

    /// Validate the configuration and build the shared params.
    pub fn build(self) -> Result<Arc<StoreParams<T>>> {
        self.config.validate()?;
        Ok(Arc::new(StoreParams {
            datasource: self.datasource,
            tasks: self.tasks.unwrap_or_default(),
            config: self.config,
            row_id: self.row_id,
            row_height: self.row_height,
            row_selectable: self.row_selectable,
            group_key: self.group_key,
            transaction_veto: self.transaction_veto,
            filter: RwLock::new(self.filter),
            sort_model: RwLock::new(self.sort_model),
            signals: StoreSignals::new(),
        }))
    }
}

static_assertions::assert_impl_all!(StoreParams<String>: Send, Sync);
