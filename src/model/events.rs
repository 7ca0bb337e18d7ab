//! Change notifications emitted by the tree model.

use super::tree_model::{ScopeId, TreeIter};

/// A path from the root of the model to a row: one sibling index per level.
pub type TreePath = Vec<usize>;

/// A change notification.
///
/// Each event carries enough for a consumer to re-query the model through
/// the iterator protocol. Per mutation, structural events (insert, delete,
/// reorder) are emitted before derived ones (has-child toggles).
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A row was inserted at the position named by the iterator.
    RowInserted(TreeIter),
    /// A row's display content changed in place.
    RowChanged(TreeIter),
    /// A row was deleted. The path was computed from the live tree
    /// immediately before the row was unlinked; the iterator it would have
    /// carried is already stale.
    RowDeleted(TreePath),
    /// The children of `parent` (`None` = the top-level scope) were
    /// permuted: `new_order[new_position] = old_position`.
    RowsReordered {
        parent: Option<TreeIter>,
        new_order: Vec<usize>,
    },
    /// A row gained or lost its first child.
    HasChildToggled(TreeIter),
    /// A bound subdirectory scope was discarded; the caller driving its
    /// enumeration should stop feeding it.
    SubdirectoryUnloaded(ScopeId),
}

/// Observer callback. Listeners are invoked synchronously, in registration
/// order. A listener must not mutate the model from inside the callback;
/// deferred mutations have to be queued externally.
pub type Listener = Box<dyn Fn(&ModelEvent)>;
