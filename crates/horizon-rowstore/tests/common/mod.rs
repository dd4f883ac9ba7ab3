//! Shared harness for row store integration tests.
//!
//! The datasource captures load requests instead of answering them, so each
//! test decides when (and with what) a load completes. Deferred work only
//! runs when the test turns the task queue.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use horizon_rowstore::{
    LoadParams, LoadSuccessParams, NumberSequence, RowNode, RowStore, SelectionChanged,
    StoreParams, StoreParamsBuilder, StoreUpdated,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub group: String,
    pub value: i32,
}

pub fn row(id: &str, value: i32) -> Row {
    Row {
        id: id.to_string(),
        group: String::new(),
        value,
    }
}

pub fn grouped(id: &str, group: &str, value: i32) -> Row {
    Row {
        id: id.to_string(),
        group: group.to_string(),
        value,
    }
}

/// Rows `ids[0]..` with values `1..`.
pub fn rows(ids: &[&str]) -> Vec<Row> {
    ids.iter()
        .zip(1..)
        .map(|(id, value)| row(id, value))
        .collect()
}

pub struct Harness {
    pub params: Arc<StoreParams<Row>>,
    requests: Arc<Mutex<VecDeque<LoadParams<Row>>>>,
    updates: Arc<Mutex<Vec<StoreUpdated>>>,
    deselections: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Rows resolve their ids through `Row::id`.
    pub fn with_ids() -> Self {
        Self::with(|builder| builder.row_id(|r: &Row| r.id.clone()))
    }

    pub fn with<F>(configure: F) -> Self
    where
        F: FnOnce(StoreParamsBuilder<Row>) -> StoreParamsBuilder<Row>,
    {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let requests = Arc::new(Mutex::new(VecDeque::new()));
        let sink = requests.clone();
        let builder = StoreParams::builder(move |load: LoadParams<Row>| {
            sink.lock().push_back(load);
        });
        let params = configure(builder).build().expect("valid store params");

        let updates = Arc::new(Mutex::new(Vec::new()));
        let updates_sink = updates.clone();
        params
            .signals()
            .store_updated
            .connect(move |update: &StoreUpdated| updates_sink.lock().push(update.clone()));

        let deselections = Arc::new(Mutex::new(Vec::new()));
        let deselections_sink = deselections.clone();
        params
            .signals()
            .selection_changed
            .connect(move |change: &SelectionChanged<Row>| {
                deselections_sink.lock().push(ids(&change.deselected));
            });

        Self {
            params,
            requests,
            updates,
            deselections,
        }
    }

    pub fn root(&self) -> Arc<RowStore<Row>> {
        RowStore::new_root(self.params.clone())
    }

    pub fn run_turn(&self) -> usize {
        self.params.tasks().run_turn()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn take_request(&self) -> LoadParams<Row> {
        self.requests
            .lock()
            .pop_front()
            .expect("a pending load request")
    }

    pub fn respond(&self, rows: Vec<Row>) {
        self.take_request()
            .callback
            .success(LoadSuccessParams::new(rows));
    }

    /// A root store that has completed its first load with `rows`.
    pub fn loaded_root(&self, rows: Vec<Row>) -> Arc<RowStore<Row>> {
        let store = self.root();
        self.run_turn();
        self.respond(rows);
        store
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn updates(&self) -> Vec<StoreUpdated> {
        self.updates.lock().clone()
    }

    pub fn deselections(&self) -> Vec<Vec<String>> {
        self.deselections.lock().clone()
    }
}

pub fn ids(nodes: &[Arc<RowNode<Row>>]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| node.id().unwrap_or_default().to_string())
        .collect()
}

pub fn values(nodes: &[Arc<RowNode<Row>>]) -> Vec<i32> {
    nodes
        .iter()
        .filter_map(|node| node.data())
        .map(|data| data.value)
        .collect()
}

/// Position the store's rows starting at display index 0, pixel 0.
pub fn position(store: &RowStore<Row>) {
    store.set_display_indexes(&mut NumberSequence::default(), &mut 0.0);
}
