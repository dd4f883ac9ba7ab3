//! Transaction application tests.

mod common;

use std::sync::Arc;

use common::{Harness, Row, ids, position, row, rows, values};
use horizon_rowstore::{
    LoadState, LoadSuccessParams, Transaction, TransactionResult, TransactionStatus,
};
use parking_lot::Mutex;
use serde_json::json;

#[test]
fn test_update_applies_in_place() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b", "c"]));
    let b_before = store.row_node_by_id("b").unwrap();

    let result = store.apply_transaction(&Transaction::new().with_update([row("b", 99)]));

    assert_eq!(result.status, TransactionStatus::Applied);
    assert_eq!(result.update.len(), 1);
    assert!(result.add.is_empty());
    assert!(result.remove.is_empty());
    assert_eq!(store.all_row_nodes().len(), 3);

    let b = store.row_node_by_id("b").unwrap();
    assert!(Arc::ptr_eq(&b, &b_before));
    assert_eq!(b.data().unwrap().value, 99);
    assert_eq!(values(&store.nodes_after_sort()), vec![1, 99, 3]);
}

#[test]
fn test_transaction_before_load_is_refused() {
    let h = Harness::with_ids();
    let store = h.root();

    let tx = Transaction::new().with_add([row("x", 1)]);
    assert_eq!(
        store.apply_transaction(&tx).status,
        TransactionStatus::StoreWaitingToLoad
    );

    h.run_turn();
    assert_eq!(store.state(), LoadState::Loading);
    let result = store.apply_transaction(&tx);
    assert_eq!(result.status, TransactionStatus::StoreLoading);
    assert!(result.add.is_empty());
    assert!(store.all_row_nodes().is_empty());
}

#[test]
fn test_remove_selected_row() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b", "c"]));
    position(&store);
    let b = store.row_node_by_id("b").unwrap();
    assert!(b.set_selected(true));

    let result = store.apply_transaction(&Transaction::new().with_remove([row("b", 0)]));

    assert_eq!(result.remove.len(), 1);
    assert!(Arc::ptr_eq(&result.remove[0], &b));
    assert_eq!(h.deselections(), vec![vec!["b".to_string()]]);
    assert!(!b.is_selected());
    assert_eq!(b.row_top(), None);
    assert!(store.row_node_by_id("b").is_none());
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "c"]);

    // Removing an unselected row raises no selection change.
    store.apply_transaction(&Transaction::new().with_remove([row("c", 0)]));
    assert_eq!(h.deselections().len(), 1);
}

#[test]
fn test_row_count_follows_adds_and_resolved_removes() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b", "c"]));

    let added = store.apply_transaction(
        &Transaction::new().with_add([row("x", 10), row("y", 11), row("z", 12)]),
    );
    assert_eq!(added.add.len(), 3);
    assert_eq!(store.all_row_nodes().len(), 6);

    let removed = store.apply_transaction(&Transaction::new().with_remove([
        row("x", 0),
        row("y", 0),
        row("z", 0),
        row("missing", 0),
    ]));
    assert_eq!(removed.status, TransactionStatus::Applied);
    assert_eq!(removed.remove.len(), 3);
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b", "c"]);
}

#[test]
fn test_add_remove_update_in_one_transaction() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b", "c"]));

    let result = store.apply_transaction(
        &Transaction::new()
            .with_add([row("d", 4)])
            .with_remove([row("a", 0)])
            .with_update([row("d", 40), row("c", 30)]),
    );

    // Add runs before update, so the new row can be updated right away.
    assert_eq!(result.add.len(), 1);
    assert_eq!(result.remove.len(), 1);
    assert_eq!(result.update.len(), 2);
    assert_eq!(ids(&store.all_row_nodes()), vec!["b", "c", "d"]);
    assert_eq!(values(&store.all_row_nodes()), vec![2, 30, 40]);
}

#[test]
fn test_add_at_index_preserves_input_order() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b", "c"]));

    store.apply_transaction(
        &Transaction::new()
            .with_add([row("x", 0), row("y", 0)])
            .with_add_index(1),
    );
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "x", "y", "b", "c"]);
}

#[test]
fn test_generated_ids_continue_after_load() {
    let h = Harness::new();
    let store = h.loaded_root(rows(&["a", "b"]));

    let result = store.apply_transaction(&Transaction::new().with_add([row("c", 3)]));
    assert_eq!(result.add[0].id(), Some("2"));
}

#[test]
fn test_duplicate_id_is_not_added() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b"]));
    let a = store.row_node_by_id("a").unwrap();

    let result = store.apply_transaction(&Transaction::new().with_add([row("a", 7), row("c", 3)]));
    assert_eq!(ids(&result.add), vec!["c"]);
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b", "c"]);
    assert!(Arc::ptr_eq(&store.row_node_by_id("a").unwrap(), &a));

    let removed = store.apply_transaction(&Transaction::new().with_remove([row("a", 0)]));
    assert_eq!(removed.remove.len(), 1);
    assert_eq!(ids(&store.all_row_nodes()), vec!["b", "c"]);
}

#[test]
fn test_duplicate_id_in_load_keeps_first_row() {
    let h = Harness::with_ids();
    let store = h.loaded_root(vec![row("a", 1), row("b", 2), row("a", 3)]);

    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b"]);
    assert_eq!(store.row_node_by_id("a").unwrap().data().unwrap().value, 1);
    assert_eq!(store.row_count(), 2);
}

#[test]
fn test_identity_lookup_without_id_resolver() {
    let h = Harness::new();
    let store = h.loaded_root(rows(&["a", "b"]));
    let a_data = store.all_row_nodes()[0].data().unwrap();

    // An equal record that is not the loaded instance cannot be resolved.
    let result = store.apply_transaction(&Transaction::new().with_remove([row("a", 1)]));
    assert!(result.remove.is_empty());
    assert_eq!(store.all_row_nodes().len(), 2);

    let result = store.apply_transaction(&Transaction::new().with_remove([a_data]));
    assert_eq!(result.remove.len(), 1);
    assert_eq!(values(&store.all_row_nodes()), vec![2]);
}

#[test]
fn test_veto_cancels_without_mutation() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_veto = seen.clone();
    let h = Harness::with(move |builder| {
        builder
            .row_id(|r| r.id.clone())
            .transaction_veto(move |params| {
                seen_in_veto.lock().push((
                    params.parent_node.is_none(),
                    params.store_info.get("total").cloned(),
                    params.transaction.add.len(),
                ));
                false
            })
    });
    let store = h.root();
    h.run_turn();
    h.take_request().callback.success(
        LoadSuccessParams::new(rows(&["a"]))
            .with_info(json!({"total": 1}).as_object().cloned().unwrap()),
    );

    let result = store.apply_transaction(
        &Transaction::new()
            .with_add([row("x", 1)])
            .with_remove([row("a", 0)]),
    );

    assert_eq!(result.status, TransactionStatus::Cancelled);
    assert_eq!(ids(&store.all_row_nodes()), vec!["a"]);
    assert_eq!(*seen.lock(), vec![(true, Some(json!(1)), 1)]);
}

#[test]
fn test_update_to_unselectable_deselects() {
    let h = Harness::with(|builder| {
        builder
            .row_id(|r| r.id.clone())
            .row_selectable(|r| r.value >= 0)
    });
    let store = h.loaded_root(rows(&["a", "b"]));
    let b = store.row_node_by_id("b").unwrap();
    b.set_selected(true);

    store.apply_transaction(&Transaction::new().with_update([row("b", -1)]));

    assert!(!b.is_selected());
    assert!(!b.is_selectable());
    assert_eq!(h.deselections(), vec![vec!["b".to_string()]]);

    // Still selectable rows keep their selection through updates.
    let a = store.row_node_by_id("a").unwrap();
    a.set_selected(true);
    store.apply_transaction(&Transaction::new().with_update([row("a", 5)]));
    assert!(a.is_selected());
    assert_eq!(h.deselections().len(), 1);
}

#[test]
fn test_filter_runs_after_transaction() {
    let h = Harness::with(|builder| {
        builder
            .row_id(|r| r.id.clone())
            .filter(|node| node.data().is_some_and(|d| d.value % 2 == 0))
    });
    let store = h.loaded_root(rows(&["a", "b", "c", "d"]));
    assert_eq!(ids(&store.nodes_after_filter()), vec!["b", "d"]);

    store.apply_transaction(&Transaction::new().with_add([row("e", 6), row("f", 7)]));
    assert_eq!(ids(&store.nodes_after_sort()), vec!["b", "d", "e"]);
    assert_eq!(store.all_row_nodes().len(), 6);

    store.apply_transaction(&Transaction::new().with_update([row("a", 8)]));
    assert_eq!(ids(&store.nodes_after_sort()), vec!["a", "b", "d", "e"]);
}

#[test]
fn test_transaction_invalidates_display_range() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a", "b"]));
    position(&store);
    assert_eq!(store.display_index_end(), Some(2));

    store.apply_transaction(&Transaction::new().with_add([row("c", 3)]));
    assert_eq!(store.display_index_end(), None);
    assert!(store.get_row_using_display_index(0).is_none());

    position(&store);
    assert_eq!(store.display_index_end(), Some(3));
}

fn status_recorder() -> (
    Arc<Mutex<Vec<TransactionStatus>>>,
    impl FnOnce(TransactionResult<Row>) + Send + 'static,
) {
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    (statuses, move |result: TransactionResult<Row>| {
        sink.lock().push(result.status)
    })
}

#[test]
fn test_async_transaction_waits_for_load() {
    let h = Harness::with_ids();
    let store = h.root();
    let (statuses, callback) = status_recorder();

    store.apply_transaction_async(Transaction::new().with_add([row("x", 9)]), Some(callback));
    assert_eq!(store.pending_transaction_count(), 1);

    h.run_turn();
    assert_eq!(store.state(), LoadState::Loading);
    assert_eq!(store.pending_transaction_count(), 1);

    h.respond(rows(&["a", "b"]));
    assert_eq!(h.update_count(), 1);
    assert!(statuses.lock().is_empty(), "flush is deferred to the next turn");
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b"]);

    h.run_turn();
    assert_eq!(*statuses.lock(), vec![TransactionStatus::Applied]);
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b", "x"]);
    assert_eq!(store.pending_transaction_count(), 0);
    assert_eq!(h.update_count(), 2);
}

#[test]
fn test_async_transactions_on_loaded_store_flush_once() {
    let h = Harness::with_ids();
    let store = h.loaded_root(rows(&["a"]));
    let updates_before = h.update_count();

    store.apply_transaction_async(Transaction::new().with_add([row("b", 2)]), None::<fn(TransactionResult<Row>)>);
    store.apply_transaction_async(Transaction::new().with_add([row("c", 3)]), None::<fn(TransactionResult<Row>)>);
    assert_eq!(store.all_row_nodes().len(), 1);
    assert_eq!(h.params.tasks().pending_count(), 1);

    h.run_turn();
    assert_eq!(ids(&store.all_row_nodes()), vec!["a", "b", "c"]);
    assert_eq!(h.update_count(), updates_before + 1);
}

#[test]
fn test_async_transaction_queued_before_failed_load_reports_status() {
    let h = Harness::with_ids();
    let store = h.root();
    let (statuses, callback) = status_recorder();

    store.apply_transaction_async(Transaction::new().with_add([row("x", 1)]), Some(callback));
    h.run_turn();
    assert_eq!(store.state(), LoadState::Loading);

    h.take_request().callback.fail("down");
    assert!(statuses.lock().is_empty());

    h.params.tasks().run_until_idle(10);
    assert_eq!(*statuses.lock(), vec![TransactionStatus::StoreLoadingFailed]);
    assert_eq!(store.pending_transaction_count(), 0);
    assert!(store.all_row_nodes().is_empty());
    assert_eq!(h.update_count(), 0);
}

#[test]
fn test_async_transaction_on_failed_store_reports_status() {
    let h = Harness::with_ids();
    let store = h.root();
    h.run_turn();
    h.take_request().callback.fail("nope");

    let (statuses, callback) = status_recorder();
    store.apply_transaction_async(Transaction::new().with_add([row("x", 1)]), Some(callback));
    h.run_turn();

    assert_eq!(*statuses.lock(), vec![TransactionStatus::StoreLoadingFailed]);
    assert_eq!(store.pending_transaction_count(), 0);
    assert_eq!(h.update_count(), 0);
}
