//! Core systems for Horizon Rowstore.
//!
//! This crate provides the cooperative infrastructure the row store is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification (store updated,
//!   selection changed)
//! - **Task Queue**: A "next turn" scheduler for deferred work such as load
//!   checks and transaction flushes
//! - **Logging**: `tracing` targets, performance spans and once-only warnings
//!
//! # Signal Example
//!
//! ```
//! use horizon_rowstore_core::Signal;
//!
//! let rows_changed = Signal::<usize>::new();
//!
//! let conn_id = rows_changed.connect(|count| {
//!     println!("Store now has {} rows", count);
//! });
//!
//! rows_changed.emit(42);
//! rows_changed.disconnect(conn_id);
//! ```
//!
//! # Task Queue Example
//!
//! ```
//! use horizon_rowstore_core::TaskQueue;
//!
//! let queue = TaskQueue::new();
//! queue.post(|| println!("runs on the next turn"));
//!
//! // Nothing runs until the host drives the queue.
//! assert_eq!(queue.pending_count(), 1);
//! assert_eq!(queue.run_turn(), 1);
//! ```

pub mod logging;
pub mod signal;
mod task;

pub use logging::{PerfSpan, reset_warn_once, warn_once};
pub use signal::{ConnectionId, Signal};
pub use task::{TaskId, TaskQueue};
