//! Hierarchical in-memory row store for virtualized grids.
//!
//! A [`RowStore`] caches the rows of one hierarchy level (the root, or the
//! children of one expanded group row), loaded in full from a [`DataSource`].
//! On top of the loaded rows it maintains:
//!
//! - **Views**: a filtered view (leaf levels only) and a stable sorted view
//! - **Display model**: contiguous display indices and pixel offsets across
//!   the whole tree of expanded groups, with index and pixel lookups
//! - **Transactions**: local add/remove/update batches applied in place,
//!   synchronously or queued until the store has loaded
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_rowstore::{
//!     LoadParams, LoadSuccessParams, NumberSequence, RowStore, StoreParams, Transaction,
//!     TransactionStatus,
//! };
//!
//! #[derive(Debug)]
//! struct Row {
//!     id: u32,
//!     name: &'static str,
//! }
//!
//! let params = StoreParams::builder(|load: LoadParams<Row>| {
//!     load.callback.success(LoadSuccessParams::new(vec![
//!         Row { id: 1, name: "alpha" },
//!         Row { id: 2, name: "beta" },
//!     ]));
//! })
//! .row_id(|row: &Row| row.id.to_string())
//! .build()
//! .unwrap();
//!
//! let store = RowStore::new_root(params.clone());
//! params.tasks().run_until_idle(10);
//! assert_eq!(store.row_count(), 2);
//!
//! let result = store.apply_transaction(
//!     &Transaction::new().with_add([Row { id: 3, name: "gamma" }]),
//! );
//! assert_eq!(result.status, TransactionStatus::Applied);
//!
//! store.set_display_indexes(&mut NumberSequence::default(), &mut 0.0);
//! let last = store.get_row_using_display_index(2).unwrap();
//! assert_eq!(last.data().unwrap().name, "gamma");
//! ```

pub mod config;
pub mod datasource;
pub mod display;
pub mod error;
pub mod node;
pub mod node_index;
pub mod params;
pub mod sort;
pub mod store;
pub mod transaction;

pub use config::{DEFAULT_ROW_HEIGHT, StoreConfig};
pub use datasource::{DataSource, LoadCallback, LoadParams, LoadRequest, LoadSuccessParams};
pub use display::NumberSequence;
pub use error::{Error, Result};
pub use node::{RowBounds, RowNode};
pub use node_index::NodeIndex;
pub use params::{SelectionChanged, StoreParams, StoreParamsBuilder, StoreSignals, StoreUpdated};
pub use sort::{SortDirection, SortKey, SortValue, default_compare};
pub use store::{LoadState, RowStore, StoreBlockState, StoreState, TransactionCallback};
pub use transaction::{
    ApplyTransactionParams, Transaction, TransactionResult, TransactionStatus,
};
