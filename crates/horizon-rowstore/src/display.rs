//! Display index and pixel allocation helpers.
//!
//! Index allocation walks a store's sorted view in order, handing each node
//! the next value of a shared [`NumberSequence`] and the current pixel cursor.
//! Expanded group rows pass both on to their child store, so indices stay
//! contiguous across the whole tree.

use std::sync::Arc;

use crate::node::{RowBounds, RowNode};
use crate::store::RowStore;

/// A monotonically increasing counter shared across a tree walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberSequence {
    value: usize,
}

impl NumberSequence {
    /// A sequence whose next value is `start`.
    pub fn new(start: usize) -> Self {
        Self { value: start }
    }

    /// Take the next value.
    pub fn next(&mut self) -> usize {
        let value = self.value;
        self.value += 1;
        value
    }

    /// The value the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> usize {
        self.value
    }
}

/// The child store of `node`, if the node is an expanded group.
pub(crate) fn open_child_store<T>(node: &RowNode<T>) -> Option<Arc<RowStore<T>>> {
    if node.is_expanded() {
        node.child_store()
    } else {
        None
    }
}

/// Position `node` and, if it is an expanded group, its child store.
///
/// Collapsed groups have their child store's positions cleared.
pub fn set_display_index<T: Send + Sync + 'static>(
    node: &RowNode<T>,
    sequence: &mut NumberSequence,
    row_top: &mut f64,
) {
    node.set_display_position(sequence.next(), *row_top);
    *row_top += node.row_height();

    if let Some(child) = node.child_store() {
        if node.is_expanded() {
            child.set_display_indexes(sequence, row_top);
        } else {
            child.clear_display_indexes();
        }
    }
}

/// Clear the position of `node` and everything below it.
pub fn clear_display_index<T: Send + Sync + 'static>(node: &RowNode<T>) {
    node.clear_display_position();
    if let Some(child) = node.child_store() {
        child.clear_display_indexes();
    }
}

/// Find the row with display index `index` among `nodes` or their open
/// child stores.
///
/// `nodes` must be a positioned view, i.e. ordered by ascending row index.
pub fn binary_search_for_display_index<T: Send + Sync + 'static>(
    index: usize,
    nodes: &[Arc<RowNode<T>>],
) -> Option<Arc<RowNode<T>>> {
    let mut low = 0;
    let mut high = nodes.len();

    while low < high {
        let mid = low + (high - low) / 2;
        let node = &nodes[mid];
        let row_index = node.row_index()?;

        if row_index == index {
            return Some(node.clone());
        }
        if let Some(child) = open_child_store(node) {
            if child.is_display_index_in_store(index) {
                return child.get_row_using_display_index(index);
            }
        }

        if row_index < index {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    None
}

/// Bounds of the row under `pixel`, looking into `node` and its open child
/// store.
pub fn extract_row_bounds<T: Send + Sync + 'static>(
    node: &RowNode<T>,
    pixel: f64,
) -> Option<RowBounds> {
    if node.is_pixel_in_range(pixel) {
        return node.bounds();
    }
    open_child_store(node)
        .filter(|child| child.is_pixel_in_range(pixel))
        .and_then(|child| child.get_row_bounds(pixel))
}

/// Display index of the row under `pixel`, looking into `node` and its open
/// child store.
pub fn index_at_pixel<T: Send + Sync + 'static>(node: &RowNode<T>, pixel: f64) -> Option<usize> {
    if node.is_pixel_in_range(pixel) {
        return node.row_index();
    }
    open_child_store(node)
        .filter(|child| child.is_pixel_in_range(pixel))
        .and_then(|child| child.get_row_index_at_pixel(pixel))
}
