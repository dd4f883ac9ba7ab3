//! Cooperative "next turn" task queue.
//!
//! Row stores never perform follow-up work synchronously from inside a load or
//! a transaction. Instead they post a task here, and the host drives the queue
//! from its event loop (or, in tests, by hand). A turn only runs the tasks that
//! were pending when it started; anything posted while a turn is running waits
//! for the next one.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::logging::targets;

/// Ticket for a posted task; pass it to [`TaskQueue::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

struct Deferred {
    id: TaskId,
    run: Box<dyn FnOnce() + Send + 'static>,
}

/// FIFO of deferred closures, drained one turn at a time.
///
/// Shared as `Arc<TaskQueue>` by the host and every store built from the same
/// params.
pub struct TaskQueue {
    queue: Mutex<VecDeque<Deferred>>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Defer `task` to the next turn.
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TaskId(TASK_SEQ.fetch_add(1, Ordering::Relaxed));
        self.queue.lock().push_back(Deferred {
            id,
            run: Box::new(task),
        });
        tracing::trace!(target: targets::TASK, task = id.as_u64(), "posted");
        id
    }

    /// Drop a task that has not run yet. Returns `false` if it already ran,
    /// was cancelled, or is running in the current turn.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut queue = self.queue.lock();
        match queue.iter().position(|deferred| deferred.id == id) {
            Some(at) => queue.remove(at).is_some(),
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the tasks that were queued when the turn began and return how many
    /// ran. Tasks posted from inside the turn wait for the next one.
    pub fn run_turn(&self) -> usize {
        let turn = std::mem::take(&mut *self.queue.lock());
        let ran = turn.len();
        for deferred in turn {
            tracing::trace!(target: targets::TASK, task = deferred.id.as_u64(), "run");
            (deferred.run)();
        }
        ran
    }

    /// Turn the queue until it drains, giving up after `max_turns` turns.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        let mut ran = 0;
        let mut turns = 0;
        while turns < max_turns && self.has_pending() {
            ran += self.run_turn();
            turns += 1;
        }
        ran
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
