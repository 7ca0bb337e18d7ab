//! Main application state: owns the tree model, maps expanded directories to
//! model scopes, and flattens the tree into the row list the UI renders.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use log::debug;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::Event;
use crate::fs::scanner::{spawn_scan, EntryInfo};
use crate::model::column::SUBDIRECTORY_COLUMN;
use crate::model::tree_model::ColumnValue;
use crate::model::{FileTreeModel, ModelEvent, ScopeId, SortOrder, TreeIter};

/// Sort attributes in the order the sort-cycle key walks them.
const SORT_ATTRIBUTES: &[&str] = &["name", "size", "type", "date_modified"];

/// One renderable line of the flattened tree.
#[derive(Debug, Clone)]
pub struct RowLine {
    pub iter: TreeIter,
    /// `None` for placeholder rows.
    pub path: Option<PathBuf>,
    pub name: String,
    pub depth: usize,
    /// For each ancestor level, whether that ancestor has further siblings
    /// (drawn as a vertical guide).
    pub guides: Vec<bool>,
    pub is_last: bool,
    pub is_dir: bool,
    pub is_expanded: bool,
    pub is_placeholder: bool,
    pub is_hidden: bool,
    pub is_marked: bool,
    pub icon: &'static str,
    pub size_text: String,
}

/// Main application state.
pub struct App {
    pub model: FileTreeModel,
    pub root_dir: PathBuf,
    pub should_quit: bool,
    pub watcher_active: bool,
    pub show_hidden: bool,
    pub use_icons: bool,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub status_message: Option<(String, Instant)>,
    pub visible: Vec<RowLine>,

    /// Expanded directory ↔ scope maps, kept in sync with the model through
    /// its `SubdirectoryUnloaded` notifications.
    scope_dirs: HashMap<ScopeId, PathBuf>,
    dir_scopes: HashMap<PathBuf, ScopeId>,

    sort_by: String,
    sort_order: SortOrder,
    marked: Vec<PathBuf>,

    name_column: usize,
    size_column: usize,
    icon_column: usize,

    tx: mpsc::UnboundedSender<Event>,
    /// Model events collected by the registered listener, drained after each
    /// mutation. The listener cannot touch `App` directly.
    pending: Rc<RefCell<Vec<ModelEvent>>>,
}

impl App {
    /// Create a new App rooted at the given path and kick off the initial
    /// scan of the top-level scope.
    pub fn new(root: &Path, config: &AppConfig, tx: mpsc::UnboundedSender<Event>) -> Result<Self> {
        if !root.is_dir() {
            return Err(AppError::InvalidPath(root.display().to_string()));
        }
        let root_dir = root.canonicalize()?;

        let mut model = FileTreeModel::new(config.dirs_first());
        let name_column = model.add_column("Name", "name");
        let size_column = model.add_column("Size", "size");
        model.add_column("Type", "type");
        model.add_column("Modified", "date_modified");

        let sort_by = config.sort_by().to_string();
        let sort_order = config.sort_order();
        if let Some(column) = model.sort_column_for_attribute(&sort_by) {
            model.set_sort_column(column, sort_order);
        } else {
            model.set_sort_column(name_column, sort_order);
        }

        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = pending.clone();
        model.add_listener(move |event: &ModelEvent| sink.borrow_mut().push(event.clone()));

        let mut scope_dirs = HashMap::new();
        let mut dir_scopes = HashMap::new();
        scope_dirs.insert(ScopeId::TOP, root_dir.clone());
        dir_scopes.insert(root_dir.clone(), ScopeId::TOP);

        let show_hidden = config.show_hidden();
        spawn_scan(root_dir.clone(), ScopeId::TOP, show_hidden, tx.clone());

        Ok(Self {
            model,
            root_dir,
            should_quit: false,
            watcher_active: true,
            show_hidden,
            use_icons: config.use_icons(),
            selected_index: 0,
            scroll_offset: 0,
            status_message: None,
            visible: Vec::new(),
            scope_dirs,
            dir_scopes,
            sort_by,
            sort_order,
            marked: Vec::new(),
            name_column,
            size_column,
            icon_column: 2,
            tx,
            pending,
        })
    }

    // ── Model event plumbing ────────────────────────────────────────────────

    /// Drain events collected during the last mutation and keep the
    /// scope/directory maps consistent with the model.
    fn drain_model_events(&mut self) {
        let events = std::mem::take(&mut *self.pending.borrow_mut());
        for event in events {
            if let ModelEvent::SubdirectoryUnloaded(scope) = event {
                if let Some(dir) = self.scope_dirs.remove(&scope) {
                    self.dir_scopes.remove(&dir);
                }
            }
        }
    }

    // ── Flattening ─────────────────────────────────────────────────────────

    /// Rebuild the flat row list from the model, preserving the selection by
    /// path where possible.
    pub fn refresh_visible(&mut self) {
        let selected_path = self
            .visible
            .get(self.selected_index)
            .and_then(|row| row.path.clone());

        let mut rows = Vec::new();
        self.walk(None, &mut Vec::new(), &mut rows);
        self.visible = rows;

        if let Some(path) = selected_path {
            if let Some(index) = self
                .visible
                .iter()
                .position(|row| row.path.as_deref() == Some(path.as_path()))
            {
                self.selected_index = index;
            }
        }
        if self.selected_index >= self.visible.len() {
            self.selected_index = self.visible.len().saturating_sub(1);
        }
    }

    fn walk(&self, parent: Option<TreeIter>, guides: &mut Vec<bool>, out: &mut Vec<RowLine>) {
        let mut cursor = self.model.iter_children(parent);
        while let Some(iter) = cursor {
            let next = self.model.iter_next(iter);
            out.push(self.row_line(iter, guides, next.is_none()));

            let expanded = self
                .model
                .get_value(iter, SUBDIRECTORY_COLUMN)
                .as_scope()
                .is_some();
            if expanded {
                guides.push(next.is_some());
                self.walk(Some(iter), guides, out);
                guides.pop();
            }
            cursor = next;
        }
    }

    fn row_line(&self, iter: TreeIter, guides: &[bool], is_last: bool) -> RowLine {
        let entry = match self.model.get_value(iter, 0) {
            ColumnValue::Entry(entry) => entry,
            _ => None,
        };
        let name = self
            .model
            .get_value(iter, self.name_column)
            .as_text()
            .unwrap_or_default()
            .to_string();
        let size_text = self
            .model
            .get_value(iter, self.size_column)
            .as_text()
            .unwrap_or_default()
            .to_string();
        let icon = self
            .model
            .get_value(iter, self.icon_column)
            .as_icon()
            .unwrap_or("");
        let is_expanded = self
            .model
            .get_value(iter, SUBDIRECTORY_COLUMN)
            .as_scope()
            .is_some();

        match entry {
            Some(entry) => RowLine {
                iter,
                name,
                depth: guides.len(),
                guides: guides.to_vec(),
                is_last,
                is_dir: entry.is_dir(),
                is_expanded,
                is_placeholder: false,
                is_hidden: entry.is_hidden(),
                is_marked: self.model.is_highlighted(entry.path()),
                icon,
                size_text,
                path: Some(entry.path().to_path_buf()),
            },
            None => RowLine {
                iter,
                name,
                depth: guides.len(),
                guides: guides.to_vec(),
                is_last,
                is_dir: false,
                is_expanded: false,
                is_placeholder: true,
                is_hidden: false,
                is_marked: false,
                icon: "",
                size_text: String::new(),
                path: None,
            },
        }
    }

    pub fn selected_row(&self) -> Option<&RowLine> {
        self.visible.get(self.selected_index)
    }

    /// Adjust the scroll offset so the selected row stays in the viewport.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index + 1 - visible_height;
        }
    }

    // ── Selection ──────────────────────────────────────────────────────────

    pub fn move_selection_down(&mut self) {
        if self.selected_index + 1 < self.visible.len() {
            self.selected_index += 1;
        }
    }

    pub fn move_selection_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn move_selection_top(&mut self) {
        self.selected_index = 0;
    }

    pub fn move_selection_bottom(&mut self) {
        self.selected_index = self.visible.len().saturating_sub(1);
    }

    // ── Expand / collapse ──────────────────────────────────────────────────

    /// Expand the selected directory: bind a scope and start scanning it.
    pub fn expand_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if !row.is_dir || row.is_expanded {
            return;
        }
        let iter = row.iter;
        let Some(path) = row.path.clone() else {
            return;
        };
        let Some(scope) = self.model.load_subdirectory(iter) else {
            return;
        };
        self.scope_dirs.insert(scope, path.clone());
        self.dir_scopes.insert(path.clone(), scope);
        spawn_scan(path, scope, self.show_hidden, self.tx.clone());
        self.drain_model_events();
        self.refresh_visible();
    }

    /// Collapse the selected directory, discarding its scope and every
    /// nested one.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if !row.is_expanded {
            return;
        }
        let iter = row.iter;
        self.model.unload_subdirectory(iter);
        self.drain_model_events();
        self.refresh_visible();
    }

    pub fn toggle_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        if row.is_expanded {
            self.collapse_selected();
        } else {
            self.expand_selected();
        }
    }

    // ── Background scan results ────────────────────────────────────────────

    /// Feed a batch of scanned entries into its scope. Batches for scopes
    /// unloaded in the meantime are dropped.
    pub fn handle_entries_loaded(&mut self, scope: ScopeId, entries: Vec<EntryInfo>) {
        if !self.scope_dirs.contains_key(&scope) {
            debug!("dropping {} entries for unloaded scope {:?}", entries.len(), scope);
            return;
        }
        self.model.set_sort_suspended(true);
        for info in entries {
            self.model.add_entry(info.into_entry(), scope);
        }
        self.model.set_sort_suspended(false);
        self.drain_model_events();
        self.refresh_visible();
    }

    /// A scan finished; an empty scope's placeholder flips to "(Empty)".
    pub fn handle_scope_loaded(&mut self, scope: ScopeId) {
        self.model.mark_scope_done_loading(scope);
        self.drain_model_events();
        self.refresh_visible();
    }

    // ── Watcher integration ────────────────────────────────────────────────

    /// Apply a debounced batch of filesystem changes. Changes inside
    /// directories that are not materialized are ignored; a change reported
    /// for the root itself triggers a full reload.
    pub fn handle_fs_change(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if path == self.root_dir {
                self.reload_all();
                return;
            }
            let Some(parent) = path.parent() else {
                continue;
            };
            let Some(&scope) = self.dir_scopes.get(parent) else {
                continue;
            };
            if path.exists() {
                match self.model.find_iter(&path, scope) {
                    Some(iter) => {
                        // Known entry: refresh shared metadata in place, then
                        // let the model reposition the row.
                        if let Some(entry) = self.model.get_value(iter, 0).as_entry() {
                            let _ = entry.refresh();
                        }
                        self.model.entry_changed(&path, scope);
                    }
                    None => {
                        let Ok(info) = EntryInfo::from_path(&path) else {
                            continue;
                        };
                        if !self.show_hidden && info.is_hidden() {
                            continue;
                        }
                        self.model.add_entry(info.into_entry(), scope);
                    }
                }
            } else {
                self.model.remove_entry(&path, scope);
            }
        }
        self.drain_model_events();
        self.refresh_visible();
    }

    /// Tear the whole tree down and rescan the root.
    pub fn reload_all(&mut self) {
        self.model.clear();
        self.drain_model_events();
        self.scope_dirs.retain(|&scope, _| scope == ScopeId::TOP);
        self.dir_scopes.retain(|_, &mut scope| scope == ScopeId::TOP);
        spawn_scan(
            self.root_dir.clone(),
            ScopeId::TOP,
            self.show_hidden,
            self.tx.clone(),
        );
        self.refresh_visible();
    }

    // ── Display toggles ────────────────────────────────────────────────────

    pub fn toggle_hidden(&mut self) {
        self.show_hidden = !self.show_hidden;
        self.reload_all();
        self.set_status_message(if self.show_hidden {
            "Showing hidden files".to_string()
        } else {
            "Hiding hidden files".to_string()
        });
    }

    // ── Sorting ────────────────────────────────────────────────────────────

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// Advance to the next sort attribute in the cycle.
    pub fn cycle_sort(&mut self) {
        let current = SORT_ATTRIBUTES
            .iter()
            .position(|a| *a == self.sort_by)
            .unwrap_or(0);
        let next = SORT_ATTRIBUTES[(current + 1) % SORT_ATTRIBUTES.len()];
        self.sort_by = next.to_string();
        self.apply_sort();
        self.set_status_message(format!("Sort: {}", next));
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_order = self.sort_order.toggled();
        self.apply_sort();
    }

    pub fn toggle_dirs_first(&mut self) {
        let dirs_first = !self.model.directories_first();
        self.model.set_directories_first(dirs_first);
        self.drain_model_events();
        self.refresh_visible();
        self.set_status_message(if dirs_first {
            "Directories first".to_string()
        } else {
            "Mixed sorting".to_string()
        });
    }

    fn apply_sort(&mut self) {
        if let Some(column) = self.model.sort_column_for_attribute(&self.sort_by) {
            self.model.set_sort_column(column, self.sort_order);
        }
        self.drain_model_events();
        self.refresh_visible();
    }

    // ── Marking ────────────────────────────────────────────────────────────

    /// Toggle the mark on the selected entry. Marks are a display overlay
    /// carried by the model's highlight set.
    pub fn toggle_mark_selected(&mut self) {
        let Some(path) = self.selected_row().and_then(|row| row.path.clone()) else {
            return;
        };
        match self.marked.iter().position(|p| *p == path) {
            Some(index) => {
                self.marked.remove(index);
            }
            None => self.marked.push(path),
        }
        self.model.set_highlight_for_entries(self.marked.clone());
        self.drain_model_events();
        self.refresh_visible();
    }

    pub fn clear_marks(&mut self) {
        self.marked.clear();
        self.model.set_highlight_for_entries(Vec::new());
        self.drain_model_events();
        self.refresh_visible();
    }

    pub fn marked(&self) -> &[PathBuf] {
        &self.marked
    }

    // ── Status line ────────────────────────────────────────────────────────

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: String) {
        self.status_message = Some((msg, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }
}
