//! Row nodes: the records a store hands out to views.
//!
//! A [`RowNode`] wraps one data item together with its identity, grouping
//! flags, selection state and the display metrics assigned by the last index
//! allocation pass. Nodes are shared as `Arc<RowNode<T>>`; all mutable state
//! lives behind a lock so the store can update positions while views hold
//! references.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::store::RowStore;

/// Pixel extent of a single row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBounds {
    /// Pixel offset of the row from the top of the viewport content.
    pub row_top: f64,
    /// Pixel height of the row.
    pub row_height: f64,
}

/// Mutable per-node state.
struct NodeState<T> {
    data: Option<Arc<T>>,
    row_index: Option<usize>,
    row_top: Option<f64>,
    row_height: f64,
    selected: bool,
    selectable: bool,
    expanded: bool,
}

/// Everything needed to construct a node.
pub(crate) struct NodeInit<T> {
    pub id: Option<String>,
    pub key: Option<String>,
    pub level: usize,
    pub group: bool,
    pub leaf_group: bool,
    pub parent: Option<Weak<RowNode<T>>>,
    pub data: Option<Arc<T>>,
    pub row_height: f64,
    pub selectable: bool,
}

/// A single row owned by a [`RowStore`].
///
/// Nodes without data are loading placeholders; they have no id and are never
/// registered in the node index.
pub struct RowNode<T> {
    id: Option<String>,
    key: Option<String>,
    level: usize,
    group: bool,
    leaf_group: bool,
    parent: Option<Weak<RowNode<T>>>,
    state: RwLock<NodeState<T>>,
    child_store: RwLock<Option<Arc<RowStore<T>>>>,
}

impl<T> RowNode<T> {
    pub(crate) fn new(init: NodeInit<T>) -> Arc<Self> {
        let stub = init.data.is_none();
        Arc::new(Self {
            id: init.id,
            key: init.key,
            level: init.level,
            group: init.group,
            leaf_group: init.leaf_group,
            parent: init.parent,
            state: RwLock::new(NodeState {
                data: init.data,
                row_index: None,
                row_top: None,
                row_height: init.row_height,
                selected: false,
                selectable: init.selectable && !stub,
                expanded: false,
            }),
            child_store: RwLock::new(None),
        })
    }

    /// The stable row id, or `None` for loading placeholders.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The group key of this node, for group rows.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The data item wrapped by this node.
    pub fn data(&self) -> Option<Arc<T>> {
        self.state.read().data.clone()
    }

    /// Depth of this node in the hierarchy; root-level rows are at level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns `true` if this node is a group (aggregation) row.
    pub fn is_group(&self) -> bool {
        self.group
    }

    /// Returns `true` if this node is on the last grouping level before leaf rows.
    pub fn is_leaf_group(&self) -> bool {
        self.leaf_group
    }

    /// Returns `true` if this node is a loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.id.is_none() && self.state.read().data.is_none()
    }

    /// The display index assigned by the last allocation pass.
    pub fn row_index(&self) -> Option<usize> {
        self.state.read().row_index
    }

    /// The pixel offset assigned by the last allocation pass.
    pub fn row_top(&self) -> Option<f64> {
        self.state.read().row_top
    }

    /// The rendered height of this row in pixels.
    pub fn row_height(&self) -> f64 {
        self.state.read().row_height
    }

    /// Returns the pixel extent of this row, if it is positioned.
    pub fn bounds(&self) -> Option<RowBounds> {
        let state = self.state.read();
        state.row_top.map(|row_top| RowBounds {
            row_top,
            row_height: state.row_height,
        })
    }

    /// Returns `true` if `pixel` falls inside this row's vertical span.
    pub fn is_pixel_in_range(&self, pixel: f64) -> bool {
        let state = self.state.read();
        match state.row_top {
            Some(top) => pixel >= top && pixel < top + state.row_height,
            None => false,
        }
    }

    /// Returns `true` if this row is selected.
    pub fn is_selected(&self) -> bool {
        self.state.read().selected
    }

    /// Returns `true` if this row may be selected.
    pub fn is_selectable(&self) -> bool {
        self.state.read().selectable
    }

    /// Select or deselect this row.
    ///
    /// Selecting an unselectable row is refused. Returns `true` if the
    /// selection state changed.
    pub fn set_selected(&self, selected: bool) -> bool {
        let mut state = self.state.write();
        if selected && !state.selectable {
            return false;
        }
        let changed = state.selected != selected;
        state.selected = selected;
        changed
    }

    /// Returns `true` if this group row is expanded.
    pub fn is_expanded(&self) -> bool {
        self.state.read().expanded
    }

    /// The store holding this group's children, if it is open.
    pub fn child_store(&self) -> Option<Arc<RowStore<T>>> {
        self.child_store.read().clone()
    }

    /// The group row this node belongs under, or `None` at the root level.
    pub fn parent(&self) -> Option<Arc<RowNode<T>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Group keys from the root down to and including this node.
    pub fn route(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.key.iter().cloned().collect();
        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(key) = node.key() {
                keys.push(key.to_string());
            }
            current = node.parent();
        }
        keys.reverse();
        keys
    }

    pub(crate) fn set_display_position(&self, row_index: usize, row_top: f64) {
        let mut state = self.state.write();
        state.row_index = Some(row_index);
        state.row_top = Some(row_top);
    }

    pub(crate) fn clear_display_position(&self) {
        let mut state = self.state.write();
        state.row_index = None;
        state.row_top = None;
    }

    /// Clears only the pixel position, so the viewport fades the row out
    /// instead of moving it.
    pub(crate) fn clear_row_top(&self) {
        self.state.write().row_top = None;
    }

    /// Replace the data in place. Identity, key and tree position are kept.
    pub(crate) fn update_data(&self, data: Arc<T>, row_height: f64, selectable: bool) {
        let mut state = self.state.write();
        state.data = Some(data);
        state.row_height = row_height;
        state.selectable = selectable;
    }

    /// Clear the selected flag without any notification.
    pub(crate) fn deselect_silently(&self) {
        self.state.write().selected = false;
    }

    pub(crate) fn set_expanded(&self, expanded: bool) {
        self.state.write().expanded = expanded;
    }

    pub(crate) fn replace_child_store(
        &self,
        store: Option<Arc<RowStore<T>>>,
    ) -> Option<Arc<RowStore<T>>> {
        std::mem::replace(&mut *self.child_store.write(), store)
    }
}

impl<T: Send + Sync + 'static> RowNode<T> {
    /// Release this node: destroy its child store and clear its position.
    pub(crate) fn destroy(&self) {
        if let Some(child) = self.replace_child_store(None) {
            child.destroy();
        }
        self.clear_display_position();
    }
}

impl<T> fmt::Debug for RowNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("RowNode")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("level", &self.level)
            .field("group", &self.group)
            .field("row_index", &state.row_index)
            .field("row_top", &state.row_top)
            .field("selected", &state.selected)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(RowNode<String>: Send, Sync);
