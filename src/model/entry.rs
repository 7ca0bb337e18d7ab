use std::cell::RefCell;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Kind of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Mutable metadata of an entry, refreshed in place when the watcher reports
/// a change so that every row sharing the entry sees the new values.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub readonly: bool,
}

/// A filesystem entry shared between the tree model and the shell.
///
/// The model holds counted references (`Rc<FileEntry>`) for as long as the
/// entry is materialized in a scope; it never owns the entry exclusively.
/// Identity is the absolute path.
#[derive(Debug)]
pub struct FileEntry {
    path: PathBuf,
    name: String,
    kind: EntryKind,
    meta: RefCell<EntryMeta>,
}

impl FileEntry {
    pub fn new(
        path: PathBuf,
        kind: EntryKind,
        size: u64,
        modified: Option<SystemTime>,
        readonly: bool,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            path,
            name,
            kind,
            meta: RefCell::new(EntryMeta {
                size,
                modified,
                readonly,
            }),
        }
    }

    /// Create an entry by stat-ing the filesystem.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let kind = if metadata.is_symlink() {
            EntryKind::Symlink
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Self::new(
            path.to_path_buf(),
            kind,
            metadata.len(),
            metadata.modified().ok(),
            metadata.permissions().readonly(),
        ))
    }

    /// Re-stat the entry and update metadata in place.
    ///
    /// Callers follow up with `FileTreeModel::entry_changed` so the row gets
    /// repositioned and repainted.
    pub fn refresh(&self) -> io::Result<()> {
        let metadata = fs::symlink_metadata(&self.path)?;
        let mut meta = self.meta.borrow_mut();
        meta.size = metadata.len();
        meta.modified = metadata.modified().ok();
        meta.readonly = metadata.permissions().readonly();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub fn size(&self) -> u64 {
        self.meta.borrow().size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.meta.borrow().modified
    }

    pub fn can_rename(&self) -> bool {
        !self.meta.borrow().readonly
    }

    /// Human-readable type description, also the sort key for the "type"
    /// attribute.
    pub fn type_description(&self) -> String {
        match self.kind {
            EntryKind::Directory => "Folder".to_string(),
            EntryKind::Symlink => "Link".to_string(),
            EntryKind::File => match self.name.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => format!("{} file", ext.to_lowercase()),
                _ => "file".to_string(),
            },
        }
    }

    /// String value of a named attribute, for stringly-typed extension
    /// columns. Unknown attributes yield `None`.
    pub fn string_attribute(&self, attribute: &str) -> Option<String> {
        match attribute {
            "name" => Some(self.name.clone()),
            "size" => Some(if self.is_dir() {
                "--".to_string()
            } else {
                format_size(self.size())
            }),
            "type" => Some(self.type_description()),
            "date_modified" => Some(match self.modified() {
                Some(time) => {
                    let local: DateTime<Local> = time.into();
                    local.format("%Y-%m-%d %H:%M").to_string()
                }
                None => "unknown".to_string(),
            }),
            _ => None,
        }
    }

    /// Nerd-font glyph for the entry, used by the icon columns.
    pub fn icon(&self) -> &'static str {
        match self.kind {
            EntryKind::Directory => "",
            EntryKind::Symlink => "",
            EntryKind::File => icon_by_extension(&self.name),
        }
    }

    /// Compare two entries for sorting.
    ///
    /// Directories-first is applied before the attribute comparator and is
    /// NOT flipped by `reversed`: a descending sort still lists directories
    /// ahead of files. Ties break by case-insensitive name, then full path,
    /// so the ordering is a strict weak order that is deterministic for
    /// identical inputs.
    pub fn compare_for_sort(
        a: &FileEntry,
        b: &FileEntry,
        attribute: Option<&str>,
        directories_first: bool,
        reversed: bool,
    ) -> Ordering {
        if a.path == b.path {
            return Ordering::Equal;
        }

        if directories_first {
            match (a.is_dir(), b.is_dir()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }

        let result = match attribute.unwrap_or("name") {
            "size" => a.size().cmp(&b.size()).then_with(|| a.path.cmp(&b.path)),
            "type" => a
                .type_description()
                .cmp(&b.type_description())
                .then_with(|| a.path.cmp(&b.path)),
            "date_modified" | "modification_date" => a
                .modified()
                .cmp(&b.modified())
                .then_with(|| a.path.cmp(&b.path)),
            // "name" and any unknown attribute fall back to name ordering.
            _ => compare_names(&a.name, &b.name).then_with(|| a.path.cmp(&b.path)),
        };

        if reversed {
            result.reverse()
        } else {
            result
        }
    }
}

/// Case-insensitive name comparison with a case-sensitive tiebreak.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Format a byte count as a short human-readable string.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} {}", bytes, UNITS[0]);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Nerd-font icon for a file based on its extension.
fn icon_by_extension(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "rs" => "",
        "py" => "",
        "js" | "jsx" => "",
        "ts" | "tsx" => "",
        "html" | "htm" => "",
        "css" | "scss" | "sass" => "",
        "json" => "",
        "toml" | "yaml" | "yml" | "ini" | "cfg" => "",
        "md" | "markdown" | "rst" | "txt" => "",
        "sh" | "bash" | "zsh" | "fish" => "",
        "go" => "",
        "c" | "h" => "",
        "cpp" | "cxx" | "cc" | "hpp" => "",
        "lock" => "",
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "ico" | "webp" => "",
        "zip" | "tar" | "gz" | "xz" | "bz2" | "rar" | "7z" => "",
        "pdf" => "",
        _ => "",
    }
}
