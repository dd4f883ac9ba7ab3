//! The contract between a store and the backend that supplies its rows.
//!
//! A store asks its [`DataSource`] for rows by handing over [`LoadParams`].
//! The datasource may answer immediately or at any later point by consuming
//! the enclosed [`LoadCallback`]. Answers for a store that has since been
//! destroyed or refreshed are dropped.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::node::RowNode;
use crate::store::RowStore;

/// Supplies row data to stores.
pub trait DataSource<T>: Send + Sync {
    /// Start loading the rows described by `params`.
    ///
    /// The implementation must eventually call either
    /// [`LoadCallback::success`] or [`LoadCallback::fail`] on
    /// `params.callback`, or drop it if the request is abandoned.
    fn get_rows(&self, params: LoadParams<T>);
}

impl<T, F> DataSource<T> for F
where
    F: Fn(LoadParams<T>) + Send + Sync,
{
    fn get_rows(&self, params: LoadParams<T>) {
        self(params)
    }
}

/// The backend-facing part of a load request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadRequest {
    /// Group keys of the parent rows, outermost first. Empty for the root store.
    pub route: Vec<String>,
    /// Hierarchy level of the requesting store.
    pub level: usize,
}

/// Everything a datasource receives for one load.
pub struct LoadParams<T> {
    /// What to load.
    pub request: LoadRequest,
    /// The group row whose children are requested, or `None` at the root.
    pub parent_node: Option<Arc<RowNode<T>>>,
    /// Completion handle for this load.
    pub callback: LoadCallback<T>,
}

impl<T> fmt::Debug for LoadParams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadParams")
            .field("request", &self.request)
            .field("has_parent", &self.parent_node.is_some())
            .field("callback", &self.callback)
            .finish()
    }
}

/// The payload of a successful load.
pub struct LoadSuccessParams<T> {
    /// The rows, in load order. `None` is treated as an empty set.
    pub row_data: Option<Vec<T>>,
    /// Metadata merged into the store's info.
    pub store_info: Option<Map<String, Value>>,
}

impl<T> LoadSuccessParams<T> {
    /// A successful load carrying `rows`.
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            row_data: Some(rows),
            store_info: None,
        }
    }

    /// A successful load that carried no row data.
    pub fn missing_data() -> Self {
        Self {
            row_data: None,
            store_info: None,
        }
    }

    /// Attach store metadata.
    pub fn with_info(mut self, info: Map<String, Value>) -> Self {
        self.store_info = Some(info);
        self
    }
}

impl<T> fmt::Debug for LoadSuccessParams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSuccessParams")
            .field("rows", &self.row_data.as_ref().map(Vec::len))
            .field("store_info", &self.store_info)
            .finish()
    }
}

/// Completion handle passed to the datasource.
///
/// Holds only a weak reference to the store, so a pending request never keeps
/// a destroyed store alive.
pub struct LoadCallback<T> {
    store: Weak<RowStore<T>>,
    version: u64,
}

impl<T> fmt::Debug for LoadCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCallback")
            .field("version", &self.version)
            .field("store_alive", &(self.store.strong_count() > 0))
            .finish()
    }
}

impl<T> LoadCallback<T> {
    pub(crate) fn new(store: Weak<RowStore<T>>, version: u64) -> Self {
        Self { store, version }
    }

    /// The store version this load was issued for.
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<T: Send + Sync + 'static> LoadCallback<T> {
    /// Deliver rows to the store.
    pub fn success(self, params: LoadSuccessParams<T>) {
        if let Some(store) = self.store.upgrade() {
            store.on_load_success(self.version, params);
        }
    }

    /// Report that the load failed.
    pub fn fail(self, reason: impl Into<String>) {
        if let Some(store) = self.store.upgrade() {
            store.on_load_fail(self.version, reason.into());
        }
    }
}
