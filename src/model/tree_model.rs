//! The sorted, incrementally-updated tree model backing the tree view.
//!
//! Rows live in one [`indextree::Arena`]; a hidden root node owns the
//! top-level scope and every expanded directory row owns one nested scope.
//! Each scope keeps its children sorted under the active comparator and
//! maintains a reverse map from entry path to arena id, so the external
//! view can address rows by stable position tokens and the watcher can
//! address them by entry.
//!
//! The model performs no I/O and is single-threaded: an external scheduler
//! feeds it filesystem events and a view re-reads it between mutations.
//! Listeners are called synchronously and must not mutate the model from
//! inside a callback.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indextree::{Arena, NodeId};
use log::warn;

use super::column::{ColumnKind, ColumnRegistry};
use super::entry::FileEntry;
use super::events::{Listener, ModelEvent, TreePath};

/// Display text for a placeholder row whose scope is still enumerating.
pub const PLACEHOLDER_LOADING: &str = "Loading…";
/// Display text for a placeholder row whose scope finished empty.
pub const PLACEHOLDER_EMPTY: &str = "(Empty)";

/// Opaque identifier of a directory scope: the top-level listing, or one
/// expanded subdirectory. Minted by [`FileTreeModel::load_subdirectory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The top-level scope, always present.
    pub const TOP: ScopeId = ScopeId(0);
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> SortOrder {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// A position token naming one row.
///
/// The token is a name, not an owner: it stays valid until the next
/// structural removal bumps the model's generation stamp, after which every
/// lookup fails cleanly by stamp mismatch; stale tokens never reach the
/// arena slot they used to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeIter {
    stamp: u64,
    id: NodeId,
}

/// Value read out of a (row, column) cell.
#[derive(Debug, Clone)]
pub enum ColumnValue {
    Entry(Option<Rc<FileEntry>>),
    Subdirectory(Option<ScopeId>),
    Icon(Option<&'static str>),
    Bool(bool),
    Text(String),
    /// Sentinel for out-of-range columns and stale iterators.
    Invalid,
}

impl ColumnValue {
    pub fn as_entry(&self) -> Option<&Rc<FileEntry>> {
        match self {
            ColumnValue::Entry(e) => e.as_ref(),
            _ => None,
        }
    }

    pub fn as_scope(&self) -> Option<ScopeId> {
        match self {
            ColumnValue::Subdirectory(s) => *s,
            _ => None,
        }
    }

    pub fn as_icon(&self) -> Option<&'static str> {
        match self {
            ColumnValue::Icon(i) => *i,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Arena payload for one row.
///
/// `file == None` marks a placeholder (and the hidden root, which is never
/// exposed as a row). `reverse_map` is present on the hidden root and on
/// rows with a bound scope.
struct Row {
    file: Option<Rc<FileEntry>>,
    subdirectory: Option<ScopeId>,
    reverse_map: Option<HashMap<PathBuf, NodeId>>,
    loaded: bool,
}

impl Row {
    fn placeholder() -> Self {
        Row {
            file: None,
            subdirectory: None,
            reverse_map: None,
            loaded: false,
        }
    }
}

/// The tree model. See the module docs for the overall shape.
pub struct FileTreeModel {
    arena: Arena<Row>,
    root: NodeId,
    /// Scope id → the row owning that scope (hidden root for `TOP`).
    scopes: HashMap<ScopeId, NodeId>,
    next_scope: u32,
    stamp: u64,
    sort_attribute: Option<String>,
    order: SortOrder,
    directories_first: bool,
    sort_suspended: bool,
    columns: ColumnRegistry,
    highlight: HashSet<PathBuf>,
    listeners: Vec<Listener>,
}

impl FileTreeModel {
    pub fn new(directories_first: bool) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Row {
            file: None,
            subdirectory: None,
            reverse_map: Some(HashMap::new()),
            loaded: false,
        });
        let mut scopes = HashMap::new();
        scopes.insert(ScopeId::TOP, root);
        Self {
            arena,
            root,
            scopes,
            next_scope: 1,
            stamp: 1,
            sort_attribute: None,
            order: SortOrder::Ascending,
            directories_first,
            sort_suspended: false,
            columns: ColumnRegistry::new(),
            highlight: HashSet::new(),
            listeners: Vec::new(),
        }
    }

    /// Register an observer. Listeners run synchronously in registration
    /// order and must not mutate the model re-entrantly.
    pub fn add_listener(&mut self, listener: impl Fn(&ModelEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&self, event: ModelEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn iter_for(&self, id: NodeId) -> TreeIter {
        TreeIter {
            stamp: self.stamp,
            id,
        }
    }

    /// Stamp check first: a stale iterator never reaches the arena slot.
    fn resolve(&self, iter: TreeIter) -> Option<NodeId> {
        if iter.stamp != self.stamp {
            return None;
        }
        match self.arena.get(iter.id) {
            Some(node) if !node.is_removed() => Some(iter.id),
            _ => None,
        }
    }

    fn position_of(&self, id: NodeId) -> usize {
        id.preceding_siblings(&self.arena).count() - 1
    }

    fn path_for(&self, id: NodeId) -> TreePath {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.position_of(current));
            current = self.arena[current]
                .parent()
                .expect("non-root rows always have a parent");
        }
        path.reverse();
        path
    }

    fn n_children_of(&self, id: NodeId) -> usize {
        id.children(&self.arena).count()
    }

    /// The sole child of `id`, provided it is a placeholder.
    fn sole_placeholder_child(&self, id: NodeId) -> Option<NodeId> {
        let first = self.arena[id].first_child()?;
        if self.arena[id].last_child() != Some(first) {
            return None;
        }
        self.arena[first].get().file.is_none().then_some(first)
    }

    /// Active comparator over rows: a placeholder sorts as the distinguished
    /// minimum and is never compared by attribute.
    fn compare_rows(&self, a: NodeId, b: NodeId) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (
            self.arena[a].get().file.as_ref(),
            self.arena[b].get().file.as_ref(),
        ) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(fa), Some(fb)) => FileEntry::compare_for_sort(
                fa,
                fb,
                self.sort_attribute.as_deref(),
                self.directories_first,
                self.order == SortOrder::Descending,
            ),
        }
    }

    /// Insert `id` among `parent`'s children at its sorted position.
    fn insert_sorted(&mut self, parent: NodeId, id: NodeId) {
        let before = parent
            .children(&self.arena)
            .find(|&child| self.compare_rows(id, child) == std::cmp::Ordering::Less);
        match before {
            Some(child) => child.insert_before(id, &mut self.arena),
            None => parent.append(id, &mut self.arena),
        }
    }

    /// Insert a placeholder row under `parent` and announce it.
    fn add_placeholder(&mut self, parent: NodeId) {
        let id = self.arena.new_node(Row::placeholder());
        self.insert_sorted(parent, id);
        self.emit(ModelEvent::RowInserted(self.iter_for(id)));
    }

    // ── Mutation API ─────────────────────────────────────────────────────

    /// Add an entry to a scope at its sorted position.
    ///
    /// Refused (with a warning, state unchanged) if the scope is unknown or
    /// the entry is already present in it. If the scope's sole child is a
    /// placeholder, the placeholder is replaced in place and the insertion
    /// is announced as a single `RowChanged` so the consuming view never
    /// sees the row collapse. Directory entries immediately get a
    /// placeholder child of their own.
    pub fn add_entry(&mut self, file: Rc<FileEntry>, scope: ScopeId) -> bool {
        let Some(&parent) = self.scopes.get(&scope) else {
            warn!("add_entry: unknown scope {:?}", scope);
            return false;
        };
        let duplicate = self.arena[parent]
            .get()
            .reverse_map
            .as_ref()
            .is_some_and(|map| map.contains_key(file.path()));
        if duplicate {
            warn!("add_entry: {} already in scope {:?}", file.path().display(), scope);
            return false;
        }

        // The first real entry proves the enumeration reached the scope.
        if scope != ScopeId::TOP {
            self.arena[parent].get_mut().loaded = true;
        }

        let mut replaced_placeholder = false;
        if parent != self.root {
            if let Some(placeholder) = self.sole_placeholder_child(parent) {
                self.stamp += 1;
                placeholder.remove(&mut self.arena);
                replaced_placeholder = true;
            }
        }

        let is_dir = file.is_dir();
        let path_key = file.path().to_path_buf();
        let id = self.arena.new_node(Row {
            file: Some(file),
            subdirectory: None,
            reverse_map: None,
            loaded: false,
        });
        if self.sort_suspended {
            parent.append(id, &mut self.arena);
        } else {
            self.insert_sorted(parent, id);
        }
        if let Some(map) = self.arena[parent].get_mut().reverse_map.as_mut() {
            map.insert(path_key, id);
        }

        let iter = self.iter_for(id);
        if replaced_placeholder {
            self.emit(ModelEvent::RowChanged(iter));
        } else {
            self.emit(ModelEvent::RowInserted(iter));
        }

        if is_dir {
            self.add_placeholder(id);
            self.emit(ModelEvent::HasChildToggled(self.iter_for(id)));
        }
        true
    }

    /// Remove an entry from a scope. Returns false if it is not currently
    /// materialized there (a normal race, not an error).
    pub fn remove_entry(&mut self, path: &Path, scope: ScopeId) -> bool {
        match self.lookup_node(path, scope) {
            Some(id) => {
                self.remove_node(id);
                true
            }
            None => false,
        }
    }

    /// Remove a row: cascade depth-first through its children, keep the
    /// parent scope's placeholder invariant, tear down any bound scope.
    fn remove_node(&mut self, id: NodeId) {
        loop {
            let Some(child) = self.arena[id].first_child() else {
                break;
            };
            if self.arena[child].get().file.is_some() {
                self.remove_node(child);
            } else {
                let path = self.path_for(child);
                self.stamp += 1;
                child.remove(&mut self.arena);
                self.emit(ModelEvent::RowDeleted(path));
            }
        }

        let file = self.arena[id].get().file.clone();
        let subdirectory = self.arena[id].get().subdirectory;
        let parent = self.arena[id]
            .parent()
            .expect("non-root rows always have a parent");

        if let Some(ref file) = file {
            if let Some(map) = self.arena[parent].get_mut().reverse_map.as_mut() {
                map.remove(file.path());
            }
        }

        // Re-add the placeholder before unlinking the last real child so
        // the parent row never visibly collapses in the view.
        let mut placeholder_readded = false;
        if parent != self.root && file.is_some() && self.n_children_of(parent) == 1 {
            self.add_placeholder(parent);
            placeholder_readded = true;
        }

        if let Some(scope) = subdirectory {
            self.emit(ModelEvent::SubdirectoryUnloaded(scope));
            self.scopes.remove(&scope);
        }

        let path = self.path_for(id);
        self.stamp += 1;
        id.remove(&mut self.arena);
        self.emit(ModelEvent::RowDeleted(path));

        if parent != self.root && (placeholder_readded || self.n_children_of(parent) == 0) {
            self.emit(ModelEvent::HasChildToggled(self.iter_for(parent)));
        }
    }

    /// React to an entry's attributes having changed: reposition it within
    /// its scope and repaint it. If the position changed, one `RowsReordered`
    /// describing a single element moving is emitted first.
    pub fn entry_changed(&mut self, path: &Path, scope: ScopeId) {
        let Some(id) = self.lookup_node(path, scope) else {
            return;
        };
        let parent = self.arena[id]
            .parent()
            .expect("non-root rows always have a parent");
        let pos_before = self.position_of(id);
        if !self.sort_suspended {
            id.detach(&mut self.arena);
            self.insert_sorted(parent, id);
        }
        let pos_after = self.position_of(id);

        if pos_before != pos_after {
            let length = self.n_children_of(parent);
            // new_order[new_position] = old_position; everything between the
            // two endpoints shifts by one slot.
            let mut new_order = vec![0usize; length];
            let mut old = 0;
            for (i, slot) in new_order.iter_mut().enumerate() {
                if i == pos_after {
                    *slot = pos_before;
                } else {
                    if old == pos_before {
                        old += 1;
                    }
                    *slot = old;
                    old += 1;
                }
            }
            let parent_iter = (parent != self.root).then(|| self.iter_for(parent));
            self.emit(ModelEvent::RowsReordered {
                parent: parent_iter,
                new_order,
            });
        }

        self.emit(ModelEvent::RowChanged(self.iter_for(id)));
    }

    /// Bind a fresh scope to a directory row so the caller can start
    /// enumerating it. Fails if the iterator is stale, names a placeholder,
    /// or the row already has a bound scope.
    pub fn load_subdirectory(&mut self, iter: TreeIter) -> Option<ScopeId> {
        let id = self.resolve(iter)?;
        {
            let row = self.arena[id].get();
            if row.file.is_none() || row.subdirectory.is_some() {
                return None;
            }
        }
        let scope = ScopeId(self.next_scope);
        self.next_scope += 1;
        self.scopes.insert(scope, id);
        {
            let row = self.arena[id].get_mut();
            row.subdirectory = Some(scope);
            row.reverse_map = Some(HashMap::new());
        }
        if self.arena[id].first_child().is_none() {
            self.add_placeholder(id);
        }
        Some(scope)
    }

    /// Remove all real children of an expanded row and discard its scope.
    /// Fails silently when the iterator is stale or nothing is bound.
    pub fn unload_subdirectory(&mut self, iter: TreeIter) {
        let Some(id) = self.resolve(iter) else {
            return;
        };
        let Some(scope) = self.arena[id].get().subdirectory else {
            return;
        };
        if self.arena[id].get().file.is_none() {
            return;
        }
        self.arena[id].get_mut().loaded = false;

        loop {
            let Some(child) = self.arena[id].first_child() else {
                break;
            };
            if self.arena[child].get().file.is_none() {
                // The placeholder stays; a collapsed row keeps one child.
                break;
            }
            self.remove_node(child);
        }

        self.emit(ModelEvent::SubdirectoryUnloaded(scope));
        self.scopes.remove(&scope);
        let row = self.arena[id].get_mut();
        row.subdirectory = None;
        row.reverse_map = None;
    }

    /// Called when the external enumeration of a scope completes. If the
    /// scope turned out empty, the still-present placeholder flips from
    /// "loading" to "empty" through one `RowChanged`; it is not reinserted.
    pub fn mark_scope_done_loading(&mut self, scope: ScopeId) {
        let Some(&parent) = self.scopes.get(&scope) else {
            return;
        };
        if parent == self.root {
            return;
        }
        if let Some(placeholder) = self.sole_placeholder_child(parent) {
            self.arena[parent].get_mut().loaded = true;
            self.emit(ModelEvent::RowChanged(self.iter_for(placeholder)));
        }
    }

    /// Remove every row, bottom-up. Used on full teardown/reload.
    pub fn clear(&mut self) {
        while let Some(first) = self.arena[self.root].first_child() {
            self.remove_node(first);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arena[self.root].first_child().is_none()
    }

    /// Number of rows in the top-level scope.
    pub fn len(&self) -> usize {
        self.n_children_of(self.root)
    }

    // ── Sort engine ──────────────────────────────────────────────────────

    /// Set the sort column (by combined column index) and direction,
    /// triggering a full resort. Refused with a warning for non-sortable
    /// column indices.
    pub fn set_sort_column(&mut self, column: usize, order: SortOrder) {
        let Some(attribute) = self.columns.attribute_for_column(column) else {
            warn!("set_sort_column: column {} is not sortable", column);
            return;
        };
        self.sort_attribute = Some(attribute.to_string());
        self.order = order;
        self.sort();
    }

    /// Current sort column and direction, if the active attribute maps to a
    /// registered column.
    pub fn sort_state(&self) -> Option<(usize, SortOrder)> {
        let attribute = self.sort_attribute.as_deref()?;
        let column = self.columns.sort_column_for_attribute(attribute)?;
        Some((column, self.order))
    }

    pub fn directories_first(&self) -> bool {
        self.directories_first
    }

    pub fn set_directories_first(&mut self, directories_first: bool) {
        if self.directories_first == directories_first {
            return;
        }
        self.directories_first = directories_first;
        self.sort();
    }

    /// Suspend sorting during a bulk load: entries are appended in arrival
    /// order, and one full resort runs when sorting resumes.
    pub fn set_sort_suspended(&mut self, suspended: bool) {
        self.sort_suspended = suspended;
        if !suspended {
            self.sort();
        }
    }

    pub fn sort_suspended(&self) -> bool {
        self.sort_suspended
    }

    /// Full resort of every scope. Scopes are visited depth-first so nested
    /// scopes settle before their parent's permutation is announced; each
    /// scope whose order actually changed gets exactly one `RowsReordered`.
    fn sort(&mut self) {
        let root = self.root;
        self.sort_scope(root);
    }

    fn sort_scope(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = parent.children(&self.arena).collect();
        for &child in &children {
            if self.arena[child].first_child().is_some() {
                self.sort_scope(child);
            }
        }
        if children.len() <= 1 {
            return;
        }

        let mut sorted = children.clone();
        sorted.sort_by(|&a, &b| self.compare_rows(a, b));
        if sorted == children {
            return;
        }

        let old_positions: HashMap<NodeId, usize> = children
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        for &id in &sorted {
            id.detach(&mut self.arena);
            parent.append(id, &mut self.arena);
        }
        let new_order: Vec<usize> = sorted.iter().map(|id| old_positions[id]).collect();
        let parent_iter = (parent != self.root).then(|| self.iter_for(parent));
        self.emit(ModelEvent::RowsReordered {
            parent: parent_iter,
            new_order,
        });
    }

    /// Sort an external entry list with the model's active comparator.
    pub fn sort_entries(&self, entries: &mut [Rc<FileEntry>]) {
        let attribute = self.sort_attribute.clone();
        let reversed = self.order == SortOrder::Descending;
        let directories_first = self.directories_first;
        entries.sort_by(|a, b| {
            FileEntry::compare_for_sort(a, b, attribute.as_deref(), directories_first, reversed)
        });
    }

    // ── Reverse lookup ───────────────────────────────────────────────────

    fn lookup_node(&self, path: &Path, scope: ScopeId) -> Option<NodeId> {
        let &owner = self.scopes.get(&scope)?;
        self.arena[owner]
            .get()
            .reverse_map
            .as_ref()?
            .get(path)
            .copied()
    }

    /// Token for an entry within one scope. A miss means "not currently
    /// materialized here", which callers treat as a normal outcome.
    pub fn find_iter(&self, path: &Path, scope: ScopeId) -> Option<TreeIter> {
        self.lookup_node(path, scope).map(|id| self.iter_for(id))
    }

    /// Tokens for every materialization of an entry, top-level scope first,
    /// then nested scopes in creation order.
    pub fn all_iters_for_entry(&self, path: &Path) -> Vec<TreeIter> {
        let mut scopes: Vec<ScopeId> = self.scopes.keys().copied().collect();
        scopes.sort();
        scopes
            .into_iter()
            .filter_map(|scope| self.find_iter(path, scope))
            .collect()
    }

    pub fn first_iter_for_entry(&self, path: &Path) -> Option<TreeIter> {
        self.all_iters_for_entry(path).into_iter().next()
    }

    // ── Iterator protocol ────────────────────────────────────────────────

    /// Descend scope by scope following sibling indices. Fails cleanly on
    /// any out-of-range index.
    pub fn get_iter(&self, path: &[usize]) -> Option<TreeIter> {
        if path.is_empty() {
            return None;
        }
        let mut node = self.root;
        for &index in path {
            node = node.children(&self.arena).nth(index)?;
        }
        Some(self.iter_for(node))
    }

    /// Path of a row, computed by walking the parent chain.
    pub fn get_path(&self, iter: TreeIter) -> Option<TreePath> {
        let id = self.resolve(iter)?;
        Some(self.path_for(id))
    }

    /// Next sibling within the same scope.
    pub fn iter_next(&self, iter: TreeIter) -> Option<TreeIter> {
        let id = self.resolve(iter)?;
        self.arena[id].next_sibling().map(|next| self.iter_for(next))
    }

    /// First child of `parent` (`None` = top-level scope).
    pub fn iter_children(&self, parent: Option<TreeIter>) -> Option<TreeIter> {
        let id = match parent {
            Some(iter) => self.resolve(iter)?,
            None => self.root,
        };
        self.arena[id].first_child().map(|child| self.iter_for(child))
    }

    pub fn iter_has_child(&self, iter: Option<TreeIter>) -> bool {
        let id = match iter {
            Some(iter) => match self.resolve(iter) {
                Some(id) => id,
                None => return false,
            },
            None => self.root,
        };
        self.arena[id].first_child().is_some()
    }

    pub fn iter_n_children(&self, iter: Option<TreeIter>) -> usize {
        let id = match iter {
            Some(iter) => match self.resolve(iter) {
                Some(id) => id,
                None => return 0,
            },
            None => self.root,
        };
        self.n_children_of(id)
    }

    pub fn iter_nth_child(&self, parent: Option<TreeIter>, n: usize) -> Option<TreeIter> {
        let id = match parent {
            Some(iter) => self.resolve(iter)?,
            None => self.root,
        };
        id.children(&self.arena).nth(n).map(|child| self.iter_for(child))
    }

    /// Parent row, `None` for top-level rows and stale iterators.
    pub fn iter_parent(&self, iter: TreeIter) -> Option<TreeIter> {
        let id = self.resolve(iter)?;
        let parent = self.arena[id].parent()?;
        (parent != self.root).then(|| self.iter_for(parent))
    }

    // ── Cell values ──────────────────────────────────────────────────────

    /// Read one cell. Stale iterators and out-of-range columns produce
    /// `ColumnValue::Invalid`.
    pub fn get_value(&self, iter: TreeIter, column: usize) -> ColumnValue {
        let Some(id) = self.resolve(iter) else {
            return ColumnValue::Invalid;
        };
        let row = self.arena[id].get();
        match self.columns.column_kind(column) {
            ColumnKind::Entry => ColumnValue::Entry(row.file.clone()),
            ColumnKind::Subdirectory => ColumnValue::Subdirectory(row.subdirectory),
            ColumnKind::Icon => ColumnValue::Icon(row.file.as_ref().map(|f| f.icon())),
            ColumnKind::Bool => {
                ColumnValue::Bool(row.file.as_ref().is_some_and(|f| f.can_rename()))
            }
            ColumnKind::Text => {
                let attribute = self
                    .columns
                    .attribute_for_column(column)
                    .expect("text columns always have a backing attribute");
                match row.file.as_ref() {
                    Some(file) => {
                        ColumnValue::Text(file.string_attribute(attribute).unwrap_or_default())
                    }
                    None if attribute == "name" => {
                        let parent = self.arena[id]
                            .parent()
                            .expect("placeholders always have a parent");
                        let text = if self.arena[parent].get().loaded {
                            PLACEHOLDER_EMPTY
                        } else {
                            PLACEHOLDER_LOADING
                        };
                        ColumnValue::Text(text.to_string())
                    }
                    None => ColumnValue::Text(String::new()),
                }
            }
            ColumnKind::Invalid => ColumnValue::Invalid,
        }
    }

    // ── Columns ──────────────────────────────────────────────────────────

    pub fn column_count(&self) -> usize {
        self.columns.column_count()
    }

    pub fn column_type(&self, index: usize) -> ColumnKind {
        self.columns.column_kind(index)
    }

    /// Register an extension column; returns its combined column index.
    pub fn add_column(&mut self, name: &str, attribute: &str) -> usize {
        self.columns.add_column(name, attribute)
    }

    pub fn column_number(&self, name: &str) -> Option<usize> {
        self.columns.column_number(name)
    }

    pub fn sort_column_for_attribute(&self, attribute: &str) -> Option<usize> {
        self.columns.sort_column_for_attribute(attribute)
    }

    // ── Highlight overlay ────────────────────────────────────────────────

    /// Replace the set of highlighted entries. Purely a display flag: only
    /// rows actually leaving or entering the set get a `RowChanged`, and
    /// nothing moves.
    pub fn set_highlight_for_entries(&mut self, paths: Vec<PathBuf>) {
        let new: HashSet<PathBuf> = paths.into_iter().collect();
        let old = std::mem::replace(&mut self.highlight, new);
        for path in old.difference(&self.highlight) {
            self.refresh_entry_rows(path);
        }
        for path in self.highlight.difference(&old) {
            self.refresh_entry_rows(path);
        }
    }

    pub fn is_highlighted(&self, path: &Path) -> bool {
        self.highlight.contains(path)
    }

    fn refresh_entry_rows(&self, path: &Path) {
        for iter in self.all_iters_for_entry(path) {
            self.emit(ModelEvent::RowChanged(iter));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::{
        ColumnKind, ENTRY_COLUMN, NAME_IS_EDITABLE_COLUMN, NUM_BUILTIN_COLUMNS,
        SUBDIRECTORY_COLUMN,
    };
    use crate::model::entry::EntryKind;
    use std::cell::RefCell;
    use std::time::{Duration, SystemTime};

    const NAME_COLUMN: usize = NUM_BUILTIN_COLUMNS;
    const SIZE_COLUMN: usize = NUM_BUILTIN_COLUMNS + 1;

    fn file(name: &str, size: u64) -> Rc<FileEntry> {
        Rc::new(FileEntry::new(
            PathBuf::from("/t").join(name),
            EntryKind::File,
            size,
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(size)),
            false,
        ))
    }

    fn dir(name: &str) -> Rc<FileEntry> {
        Rc::new(FileEntry::new(
            PathBuf::from("/t").join(name),
            EntryKind::Directory,
            0,
            None,
            false,
        ))
    }

    fn recording_model() -> (FileTreeModel, Rc<RefCell<Vec<ModelEvent>>>) {
        let mut model = FileTreeModel::new(true);
        model.add_column("Name", "name");
        model.add_column("Size", "size");
        model.add_column("Type", "type");
        model.add_column("Modified", "date_modified");
        model.set_sort_column(NAME_COLUMN, SortOrder::Ascending);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        model.add_listener(move |event| sink.borrow_mut().push(event.clone()));
        (model, events)
    }

    fn names_at_top(model: &FileTreeModel) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = model.iter_children(None);
        while let Some(iter) = cursor {
            names.push(
                model
                    .get_value(iter, NAME_COLUMN)
                    .as_text()
                    .unwrap()
                    .to_string(),
            );
            cursor = model.iter_next(iter);
        }
        names
    }

    fn assert_bijection(new_order: &[usize]) {
        let mut seen = vec![false; new_order.len()];
        for &old in new_order {
            assert!(old < new_order.len(), "index out of range");
            assert!(!seen[old], "duplicate index {}", old);
            seen[old] = true;
        }
    }

    /// Expand a directory already added to the model; returns (iter, scope).
    fn expand(model: &mut FileTreeModel, path: &Path, in_scope: ScopeId) -> (TreeIter, ScopeId) {
        let iter = model.find_iter(path, in_scope).unwrap();
        let scope = model.load_subdirectory(iter).unwrap();
        (iter, scope)
    }

    #[test]
    fn sorted_insert_by_name() {
        let (mut model, _) = recording_model();
        for name in ["b.txt", "a.txt", "z.txt"] {
            assert!(model.add_entry(file(name, 1), ScopeId::TOP));
        }
        assert_eq!(names_at_top(&model), ["a.txt", "b.txt", "z.txt"]);

        model.add_entry(file("c.txt", 1), ScopeId::TOP);
        assert_eq!(names_at_top(&model), ["a.txt", "b.txt", "c.txt", "z.txt"]);
    }

    #[test]
    fn directories_sort_before_files() {
        let (mut model, _) = recording_model();
        model.add_entry(file("note.txt", 1), ScopeId::TOP);
        model.add_entry(dir("Sub"), ScopeId::TOP);
        assert_eq!(names_at_top(&model), ["Sub", "note.txt"]);

        model.set_directories_first(false);
        assert_eq!(names_at_top(&model), ["note.txt", "Sub"]);
    }

    #[test]
    fn duplicate_add_is_refused() {
        let (mut model, events) = recording_model();
        assert!(model.add_entry(file("a.txt", 1), ScopeId::TOP));
        events.borrow_mut().clear();
        assert!(!model.add_entry(file("a.txt", 2), ScopeId::TOP));
        assert_eq!(model.len(), 1);
        assert!(events.borrow().is_empty(), "refused insert must not emit");
    }

    #[test]
    fn add_to_unknown_scope_is_refused() {
        let (mut model, _) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (iter, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        model.unload_subdirectory(iter);
        assert!(!model.add_entry(file("late.txt", 1), scope));
    }

    #[test]
    fn directory_rows_get_placeholder_and_toggle() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let recorded = events.borrow();
        assert!(matches!(recorded[0], ModelEvent::RowInserted(_)));
        assert!(matches!(recorded[1], ModelEvent::RowInserted(_))); // placeholder
        assert!(matches!(recorded[2], ModelEvent::HasChildToggled(_)));

        let sub = model.find_iter(&PathBuf::from("/t/sub"), ScopeId::TOP).unwrap();
        assert!(model.iter_has_child(Some(sub)));
        assert_eq!(model.iter_n_children(Some(sub)), 1);
    }

    #[test]
    fn placeholder_replaced_with_changed_not_delete_insert() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub_path = PathBuf::from("/t/sub");
        let (_, scope) = expand(&mut model, &sub_path, ScopeId::TOP);

        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        let placeholder = model.iter_children(Some(sub)).unwrap();
        assert_eq!(
            model.get_value(placeholder, NAME_COLUMN).as_text().unwrap(),
            PLACEHOLDER_LOADING
        );

        events.borrow_mut().clear();
        model.add_entry(file("file1", 1), scope);

        let recorded = events.borrow();
        assert_eq!(recorded.len(), 1);
        match &recorded[0] {
            ModelEvent::RowChanged(iter) => {
                assert_eq!(model.get_path(*iter).unwrap(), vec![0, 0]);
            }
            other => panic!("expected RowChanged, got {:?}", other),
        }
        drop(recorded);

        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        assert_eq!(model.iter_n_children(Some(sub)), 1);
        let child = model.iter_children(Some(sub)).unwrap();
        assert_eq!(model.get_value(child, NAME_COLUMN).as_text().unwrap(), "file1");
    }

    #[test]
    fn removing_last_child_reinserts_placeholder_and_toggles() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub_path = PathBuf::from("/t/sub");
        let (_, scope) = expand(&mut model, &sub_path, ScopeId::TOP);
        model.add_entry(file("only", 1), scope);

        events.borrow_mut().clear();
        assert!(model.remove_entry(&PathBuf::from("/t/only"), scope));

        let recorded = events.borrow();
        let kinds: Vec<&ModelEvent> = recorded.iter().collect();
        assert!(matches!(kinds[0], ModelEvent::RowInserted(_))); // placeholder
        assert!(matches!(kinds[1], ModelEvent::RowDeleted(_)));
        assert!(matches!(kinds[2], ModelEvent::HasChildToggled(_)));
        drop(recorded);

        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        assert_eq!(model.iter_n_children(Some(sub)), 1);
        let placeholder = model.iter_children(Some(sub)).unwrap();
        assert!(model.get_value(placeholder, ENTRY_COLUMN).as_entry().is_none());
    }

    #[test]
    fn remove_of_absent_entry_is_noop() {
        let (mut model, events) = recording_model();
        model.add_entry(file("a.txt", 1), ScopeId::TOP);
        events.borrow_mut().clear();
        assert!(!model.remove_entry(&PathBuf::from("/t/ghost"), ScopeId::TOP));
        assert!(events.borrow().is_empty());
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn deleted_event_carries_live_path() {
        let (mut model, events) = recording_model();
        for name in ["a.txt", "b.txt", "c.txt"] {
            model.add_entry(file(name, 1), ScopeId::TOP);
        }
        events.borrow_mut().clear();
        model.remove_entry(&PathBuf::from("/t/b.txt"), ScopeId::TOP);
        assert_eq!(events.borrow()[0], ModelEvent::RowDeleted(vec![1]));
        assert_eq!(names_at_top(&model), ["a.txt", "c.txt"]);
    }

    #[test]
    fn full_resort_emits_one_valid_permutation() {
        let (mut model, events) = recording_model();
        let sizes = [40, 10, 50, 20, 30];
        for (i, &size) in sizes.iter().enumerate() {
            model.add_entry(file(&format!("f{}", i), size), ScopeId::TOP);
        }
        // Name order: f0..f4. Size order: f1, f3, f4, f0, f2.
        events.borrow_mut().clear();
        model.set_sort_column(SIZE_COLUMN, SortOrder::Ascending);

        let recorded = events.borrow();
        assert_eq!(recorded.len(), 1);
        match &recorded[0] {
            ModelEvent::RowsReordered { parent, new_order } => {
                assert!(parent.is_none());
                assert_eq!(new_order.len(), 5);
                assert_bijection(new_order);
                // new_order[new_position] = old_position
                assert_eq!(new_order, &vec![1, 3, 4, 0, 2]);
            }
            other => panic!("expected RowsReordered, got {:?}", other),
        }
        drop(recorded);
        assert_eq!(names_at_top(&model), ["f1", "f3", "f4", "f0", "f2"]);
    }

    #[test]
    fn resort_with_unchanged_order_is_silent() {
        let (mut model, events) = recording_model();
        for name in ["a", "b", "c"] {
            model.add_entry(file(name, 1), ScopeId::TOP);
        }
        events.borrow_mut().clear();
        model.set_sort_column(NAME_COLUMN, SortOrder::Ascending);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn descending_sort_reverses_files_keeps_dirs_first() {
        let (mut model, _) = recording_model();
        for name in ["a", "b"] {
            model.add_entry(file(name, 1), ScopeId::TOP);
        }
        model.add_entry(dir("zdir"), ScopeId::TOP);
        model.set_sort_column(NAME_COLUMN, SortOrder::Descending);
        assert_eq!(names_at_top(&model), ["zdir", "b", "a"]);
    }

    #[test]
    fn entry_changed_without_move_only_repaints() {
        let (mut model, events) = recording_model();
        for name in ["a", "b", "c"] {
            model.add_entry(file(name, 1), ScopeId::TOP);
        }
        events.borrow_mut().clear();
        model.entry_changed(&PathBuf::from("/t/b"), ScopeId::TOP);
        let recorded = events.borrow();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], ModelEvent::RowChanged(_)));
    }

    #[test]
    fn entry_changed_of_unmaterialized_entry_is_noop() {
        let (mut model, events) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        events.borrow_mut().clear();
        model.entry_changed(&PathBuf::from("/t/ghost"), ScopeId::TOP);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn entry_changed_emits_single_move_permutation() {
        // Metadata lives behind the shared entry, so drive the move through
        // a real file growing on disk.
        let tmp = tempfile::TempDir::new().unwrap();
        let mover = tmp.path().join("mover");
        std::fs::write(&mover, vec![0u8; 10]).unwrap();
        std::fs::write(tmp.path().join("mid"), vec![0u8; 20]).unwrap();
        std::fs::write(tmp.path().join("big"), vec![0u8; 30]).unwrap();

        let (mut model, events) = recording_model();
        model.set_sort_column(SIZE_COLUMN, SortOrder::Ascending);
        for name in ["mover", "mid", "big"] {
            let entry = FileEntry::from_path(&tmp.path().join(name)).unwrap();
            model.add_entry(Rc::new(entry), ScopeId::TOP);
        }
        assert_eq!(names_at_top(&model), ["mover", "mid", "big"]);

        // Grow mover to 25 bytes: it must land between mid and big.
        std::fs::write(&mover, vec![0u8; 25]).unwrap();
        let iter = model.find_iter(&mover, ScopeId::TOP).unwrap();
        model
            .get_value(iter, ENTRY_COLUMN)
            .as_entry()
            .unwrap()
            .refresh()
            .unwrap();

        events.borrow_mut().clear();
        model.entry_changed(&mover, ScopeId::TOP);

        let recorded = events.borrow();
        assert_eq!(recorded.len(), 2);
        match &recorded[0] {
            ModelEvent::RowsReordered { parent, new_order } => {
                assert!(parent.is_none());
                assert_bijection(new_order);
                assert_eq!(new_order, &vec![1, 0, 2]);
            }
            other => panic!("expected RowsReordered, got {:?}", other),
        }
        assert!(matches!(recorded[1], ModelEvent::RowChanged(_)));
        drop(recorded);
        assert_eq!(names_at_top(&model), ["mid", "mover", "big"]);
    }

    #[test]
    fn nested_unload_is_depth_first() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub_path = PathBuf::from("/t/sub");
        let (_, sub_scope) = expand(&mut model, &sub_path, ScopeId::TOP);
        model.add_entry(file("a", 1), sub_scope);
        model.add_entry(dir("inner"), sub_scope);
        model.add_entry(file("c", 1), sub_scope);
        let inner_path = PathBuf::from("/t/inner");
        let (_, inner_scope) = expand(&mut model, &inner_path, sub_scope);
        model.add_entry(file("x", 1), inner_scope);
        model.add_entry(file("y", 1), inner_scope);

        events.borrow_mut().clear();
        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        model.unload_subdirectory(sub);

        let recorded = events.borrow();
        let unloads: Vec<ScopeId> = recorded
            .iter()
            .filter_map(|e| match e {
                ModelEvent::SubdirectoryUnloaded(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(unloads, vec![inner_scope, sub_scope]);
        drop(recorded);

        // The collapsed row keeps exactly one placeholder child.
        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        assert_eq!(model.iter_n_children(Some(sub)), 1);
        let placeholder = model.iter_children(Some(sub)).unwrap();
        assert!(model.get_value(placeholder, ENTRY_COLUMN).as_entry().is_none());
        assert!(model.find_iter(&PathBuf::from("/t/a"), sub_scope).is_none());
        assert!(model.find_iter(&PathBuf::from("/t/x"), inner_scope).is_none());
    }

    #[test]
    fn load_subdirectory_refuses_placeholder_and_double_load() {
        let (mut model, _) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub = model.find_iter(&PathBuf::from("/t/sub"), ScopeId::TOP).unwrap();
        let placeholder = model.iter_children(Some(sub)).unwrap();
        assert!(model.load_subdirectory(placeholder).is_none());

        assert!(model.load_subdirectory(sub).is_some());
        assert!(model.load_subdirectory(sub).is_none(), "already bound");
    }

    #[test]
    fn subdirectory_column_reports_bound_scope() {
        let (mut model, _) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub = model.find_iter(&PathBuf::from("/t/sub"), ScopeId::TOP).unwrap();
        assert_eq!(model.get_value(sub, SUBDIRECTORY_COLUMN).as_scope(), None);
        let scope = model.load_subdirectory(sub).unwrap();
        assert_eq!(
            model.get_value(sub, SUBDIRECTORY_COLUMN).as_scope(),
            Some(scope)
        );
    }

    #[test]
    fn done_loading_flips_placeholder_to_empty() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub_path = PathBuf::from("/t/sub");
        let (_, scope) = expand(&mut model, &sub_path, ScopeId::TOP);

        let sub = model.find_iter(&sub_path, ScopeId::TOP).unwrap();
        let placeholder = model.iter_children(Some(sub)).unwrap();
        assert_eq!(
            model.get_value(placeholder, NAME_COLUMN).as_text().unwrap(),
            PLACEHOLDER_LOADING
        );

        events.borrow_mut().clear();
        model.mark_scope_done_loading(scope);

        let recorded = events.borrow();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], ModelEvent::RowChanged(_)));
        drop(recorded);
        assert_eq!(
            model.get_value(placeholder, NAME_COLUMN).as_text().unwrap(),
            PLACEHOLDER_EMPTY
        );
    }

    #[test]
    fn done_loading_after_entries_is_noop() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (_, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        model.add_entry(file("kid", 1), scope);
        events.borrow_mut().clear();
        model.mark_scope_done_loading(scope);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn get_iter_get_path_round_trip() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (_, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        model.add_entry(file("x", 1), scope);
        model.add_entry(file("y", 2), scope);

        // Walk every row depth-first and verify the round trip.
        let mut stack: Vec<TreeIter> = Vec::new();
        let mut cursor = model.iter_children(None);
        let mut visited = 0;
        while let Some(iter) = cursor {
            let path = model.get_path(iter).unwrap();
            assert_eq!(model.get_iter(&path), Some(iter));
            visited += 1;
            if model.iter_has_child(Some(iter)) {
                stack.push(iter);
                cursor = model.iter_children(Some(iter));
            } else {
                cursor = model.iter_next(iter);
                while cursor.is_none() {
                    match stack.pop() {
                        Some(parent) => cursor = model.iter_next(parent),
                        None => break,
                    }
                }
            }
        }
        assert_eq!(visited, 4);
    }

    #[test]
    fn get_iter_rejects_out_of_range_paths() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        assert!(model.get_iter(&[]).is_none());
        assert!(model.get_iter(&[1]).is_none());
        assert!(model.get_iter(&[0, 0]).is_none());
        assert!(model.iter_nth_child(None, 5).is_none());
    }

    #[test]
    fn iter_parent_walks_up() {
        let (mut model, _) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let sub_path = PathBuf::from("/t/sub");
        let (_, scope) = expand(&mut model, &sub_path, ScopeId::TOP);
        model.add_entry(file("kid", 1), scope);

        let kid = model.find_iter(&PathBuf::from("/t/kid"), scope).unwrap();
        let parent = model.iter_parent(kid).unwrap();
        assert_eq!(model.get_path(parent).unwrap(), vec![0]);
        assert!(model.iter_parent(parent).is_none(), "top rows have no parent");
    }

    #[test]
    fn stale_iterators_fail_cleanly_everywhere() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        model.add_entry(file("b", 1), ScopeId::TOP);
        let stale = model.find_iter(&PathBuf::from("/t/a"), ScopeId::TOP).unwrap();

        // Any structural removal bumps the generation.
        model.remove_entry(&PathBuf::from("/t/b"), ScopeId::TOP);

        assert!(model.get_path(stale).is_none());
        assert!(model.iter_next(stale).is_none());
        assert!(model.iter_children(Some(stale)).is_none());
        assert!(!model.iter_has_child(Some(stale)));
        assert_eq!(model.iter_n_children(Some(stale)), 0);
        assert!(model.iter_nth_child(Some(stale), 0).is_none());
        assert!(model.iter_parent(stale).is_none());
        assert!(matches!(model.get_value(stale, NAME_COLUMN), ColumnValue::Invalid));
        assert!(model.load_subdirectory(stale).is_none());

        // A fresh lookup hands out a valid replacement.
        let fresh = model.find_iter(&PathBuf::from("/t/a"), ScopeId::TOP).unwrap();
        assert_eq!(model.get_path(fresh).unwrap(), vec![0]);
    }

    #[test]
    fn reverse_index_tracks_membership() {
        let (mut model, _) = recording_model();
        let a = PathBuf::from("/t/a.txt");
        assert!(model.find_iter(&a, ScopeId::TOP).is_none());
        model.add_entry(file("a.txt", 1), ScopeId::TOP);
        let iter = model.find_iter(&a, ScopeId::TOP).unwrap();
        assert_eq!(model.get_path(iter).unwrap(), vec![0]);
        model.remove_entry(&a, ScopeId::TOP);
        assert!(model.find_iter(&a, ScopeId::TOP).is_none());
    }

    #[test]
    fn entry_tracked_independently_per_scope() {
        let (mut model, _) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (_, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        // The same identity may be materialized once per scope.
        let shared = file("shared.txt", 1);
        assert!(model.add_entry(shared.clone(), ScopeId::TOP));
        assert!(model.add_entry(shared.clone(), scope));

        let all = model.all_iters_for_entry(shared.path());
        assert_eq!(all.len(), 2);
        assert_eq!(model.get_path(all[0]).unwrap(), vec![1], "top scope first");
        assert_eq!(model.get_path(all[1]).unwrap(), vec![0, 0]);
        assert_eq!(model.first_iter_for_entry(shared.path()), Some(all[0]));

        model.remove_entry(shared.path(), scope);
        assert_eq!(model.all_iters_for_entry(shared.path()).len(), 1);
        assert!(model.find_iter(shared.path(), ScopeId::TOP).is_some());
    }

    #[test]
    fn sort_suspension_appends_then_resorts() {
        let (mut model, events) = recording_model();
        model.set_sort_suspended(true);
        assert!(model.sort_suspended());
        for name in ["c", "a", "b"] {
            model.add_entry(file(name, 1), ScopeId::TOP);
        }
        assert_eq!(names_at_top(&model), ["c", "a", "b"], "arrival order kept");

        events.borrow_mut().clear();
        model.set_sort_suspended(false);
        assert_eq!(names_at_top(&model), ["a", "b", "c"]);
        let recorded = events.borrow();
        assert_eq!(recorded.len(), 1);
        match &recorded[0] {
            ModelEvent::RowsReordered { new_order, .. } => assert_bijection(new_order),
            other => panic!("expected RowsReordered, got {:?}", other),
        }
    }

    #[test]
    fn clear_tears_everything_down() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (_, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        model.add_entry(file("kid", 1), scope);
        assert!(!model.is_empty());

        model.clear();
        assert!(model.is_empty());
        assert_eq!(model.len(), 0);
        assert!(model.find_iter(&PathBuf::from("/t/a"), ScopeId::TOP).is_none());

        // The top scope survives a clear and accepts new entries.
        assert!(model.add_entry(file("again", 1), ScopeId::TOP));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn highlight_is_display_only() {
        let (mut model, events) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        model.add_entry(file("b", 1), ScopeId::TOP);
        let a = PathBuf::from("/t/a");
        let b = PathBuf::from("/t/b");

        events.borrow_mut().clear();
        model.set_highlight_for_entries(vec![a.clone()]);
        assert!(model.is_highlighted(&a));
        assert!(!model.is_highlighted(&b));
        assert_eq!(events.borrow().len(), 1);
        assert!(matches!(events.borrow()[0], ModelEvent::RowChanged(_)));

        events.borrow_mut().clear();
        model.set_highlight_for_entries(vec![b.clone()]);
        // One changed for the row leaving the set, one for the row entering.
        assert_eq!(events.borrow().len(), 2);
        assert!(!model.is_highlighted(&a));
        assert!(model.is_highlighted(&b));

        // A row staying in the set does not repaint: only the newcomer does.
        events.borrow_mut().clear();
        model.set_highlight_for_entries(vec![a.clone(), b.clone()]);
        assert_eq!(events.borrow().len(), 1);
        assert!(model.is_highlighted(&a));
        assert!(model.is_highlighted(&b));

        events.borrow_mut().clear();
        model.set_highlight_for_entries(vec![a.clone(), b.clone()]);
        assert!(events.borrow().is_empty(), "unchanged set is silent");
        assert_eq!(names_at_top(&model), ["a", "b"], "no structural effect");
    }

    #[test]
    fn invalid_column_yields_sentinel() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a", 1), ScopeId::TOP);
        let iter = model.find_iter(&PathBuf::from("/t/a"), ScopeId::TOP).unwrap();
        let bogus = model.column_count() + 3;
        assert!(matches!(model.get_value(iter, bogus), ColumnValue::Invalid));
        assert_eq!(model.column_type(bogus), ColumnKind::Invalid);
    }

    #[test]
    fn builtin_values_read_back() {
        let (mut model, _) = recording_model();
        model.add_entry(file("a.rs", 1), ScopeId::TOP);
        let iter = model.find_iter(&PathBuf::from("/t/a.rs"), ScopeId::TOP).unwrap();
        assert_eq!(
            model
                .get_value(iter, ENTRY_COLUMN)
                .as_entry()
                .unwrap()
                .name(),
            "a.rs"
        );
        assert_eq!(model.get_value(iter, NAME_IS_EDITABLE_COLUMN).as_bool(), Some(true));
        assert!(model.get_value(iter, 2).as_icon().is_some());
    }

    #[test]
    fn sort_state_round_trips_through_columns() {
        let (mut model, _) = recording_model();
        assert_eq!(model.sort_state(), Some((NAME_COLUMN, SortOrder::Ascending)));
        model.set_sort_column(SIZE_COLUMN, SortOrder::Descending);
        assert_eq!(model.sort_state(), Some((SIZE_COLUMN, SortOrder::Descending)));
        assert_eq!(model.column_number("Size"), Some(SIZE_COLUMN));
    }

    #[test]
    fn set_sort_column_refuses_builtins() {
        let (mut model, _) = recording_model();
        model.add_entry(file("b", 1), ScopeId::TOP);
        model.add_entry(file("a", 1), ScopeId::TOP);
        let before = model.sort_state();
        model.set_sort_column(ENTRY_COLUMN, SortOrder::Descending);
        assert_eq!(model.sort_state(), before, "non-sortable column refused");
    }

    #[test]
    fn sort_entries_uses_active_comparator() {
        let (mut model, _) = recording_model();
        model.set_sort_column(SIZE_COLUMN, SortOrder::Ascending);
        let mut entries = vec![file("big", 30), file("small", 10), dir("folder")];
        model.sort_entries(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["folder", "small", "big"]);
    }

    #[test]
    fn full_resort_covers_nested_scopes() {
        let (mut model, events) = recording_model();
        model.add_entry(dir("sub"), ScopeId::TOP);
        let (_, scope) = expand(&mut model, &PathBuf::from("/t/sub"), ScopeId::TOP);
        model.add_entry(file("n1", 30), scope);
        model.add_entry(file("n2", 10), scope);
        model.add_entry(file("t1", 20), ScopeId::TOP);
        model.add_entry(file("t2", 5), ScopeId::TOP);

        events.borrow_mut().clear();
        model.set_sort_column(SIZE_COLUMN, SortOrder::Ascending);

        let recorded = events.borrow();
        let reorders: Vec<bool> = recorded
            .iter()
            .filter_map(|e| match e {
                ModelEvent::RowsReordered { parent, new_order } => {
                    assert_bijection(new_order);
                    Some(parent.is_some())
                }
                _ => None,
            })
            .collect();
        // Nested scope settles before the top scope announces its permutation.
        assert_eq!(reorders, vec![true, false]);
    }
}
