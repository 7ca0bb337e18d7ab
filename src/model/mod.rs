//! The sorted tree model and its supporting types.

pub mod column;
pub mod entry;
pub mod events;
pub mod tree_model;

pub use column::{ColumnKind, ZoomLevel, NUM_BUILTIN_COLUMNS};
pub use entry::{EntryKind, FileEntry};
pub use events::{ModelEvent, TreePath};
pub use tree_model::{ColumnValue, FileTreeModel, ScopeId, SortOrder, TreeIter};
