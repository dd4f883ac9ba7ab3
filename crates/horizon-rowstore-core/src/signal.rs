//! Change notification for row stores.
//!
//! Every store in a hierarchy shares one set of signals through its params.
//! A store emits on them once its own locks are released, so a listener may
//! call back into the store (read rows, re-run display allocation) from
//! inside the handler.
//!
//! Handlers run on the emitting thread in the order they were connected. The
//! handler list is copied out before any handler runs: connecting or
//! disconnecting during an emission only affects later emissions.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use horizon_rowstore_core::Signal;
//!
//! let rows_changed = Signal::<Vec<String>>::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = seen.clone();
//! let id = rows_changed.connect(move |route| {
//!     counter.fetch_add(route.len(), Ordering::Relaxed);
//! });
//!
//! rows_changed.emit(vec!["Ireland".into(), "2008".into()]);
//! assert_eq!(seen.load(Ordering::Relaxed), 2);
//!
//! assert!(rows_changed.disconnect(id));
//! rows_changed.emit(vec!["Ireland".into()]);
//! assert_eq!(seen.load(Ordering::Relaxed), 2);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle for one connected handler, used to disconnect it again.
    pub struct ConnectionId;
}

type Handler<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A multicast notification carrying a payload of type `Args`.
pub struct Signal<Args> {
    handlers: Mutex<SlotMap<ConnectionId, Handler<Args>>>,
    muted: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.lock().len())
            .field("muted", &self.muted.load(Ordering::Acquire))
            .finish()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(SlotMap::with_key()),
            muted: AtomicBool::new(false),
        }
    }

    /// Register `handler`; it runs on every later emission until disconnected.
    pub fn connect<F>(&self, handler: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.handlers.lock().insert(Arc::new(handler))
    }

    /// Returns `false` when `id` was already disconnected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.handlers.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.handlers.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Mute or unmute the signal. Emissions while muted are dropped, not
    /// replayed on unmute.
    pub fn set_blocked(&self, blocked: bool) {
        self.muted.store(blocked, Ordering::Release);
    }

    pub fn is_blocked(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Deliver `args` to every connected handler.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "emission dropped, signal muted");
            return;
        }

        let snapshot: Vec<Handler<Args>> = self.handlers.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, handlers = snapshot.len(), "emit");
        for handler in &snapshot {
            handler(&args);
        }
    }
}
