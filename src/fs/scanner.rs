//! Background directory enumeration.
//!
//! The tree model is single-threaded, so scans run on blocking tasks and
//! ship plain `EntryInfo` snapshots back over the event channel. The main
//! loop turns them into shared entries and feeds the scope they were read
//! for; the model refuses batches for scopes unloaded in the meantime.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use log::debug;
use tokio::sync::mpsc;

use crate::event::Event;
use crate::model::{EntryKind, FileEntry, ScopeId};

/// Entries per `EntriesLoaded` batch. Large directories stream in chunks so
/// the UI shows progress instead of one long stall.
const SCAN_BATCH_SIZE: usize = 200;

/// A thread-safe snapshot of one directory entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub readonly: bool,
}

impl EntryInfo {
    /// Snapshot an entry by stat-ing the filesystem.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let kind = if metadata.is_symlink() {
            EntryKind::Symlink
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            kind,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            readonly: metadata.permissions().readonly(),
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Convert into the shared entry type the model stores.
    pub fn into_entry(self) -> Rc<FileEntry> {
        Rc::new(FileEntry::new(
            self.path,
            self.kind,
            self.size,
            self.modified,
            self.readonly,
        ))
    }
}

/// Enumerate `dir` on a blocking task, streaming `EntriesLoaded` batches for
/// `scope` followed by one `ScopeLoaded`.
///
/// Unreadable entries are silently skipped, matching what a listing shows.
pub fn spawn_scan(
    dir: PathBuf,
    scope: ScopeId,
    show_hidden: bool,
    tx: mpsc::UnboundedSender<Event>,
) {
    tokio::task::spawn_blocking(move || {
        debug!("scanning {} for scope {:?}", dir.display(), scope);
        let mut batch = Vec::new();
        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let info = match EntryInfo::from_path(&entry.path()) {
                    Ok(info) => info,
                    Err(_) => continue,
                };
                if !show_hidden && info.is_hidden() {
                    continue;
                }
                batch.push(info);
                if batch.len() >= SCAN_BATCH_SIZE {
                    let entries = std::mem::take(&mut batch);
                    if tx.send(Event::EntriesLoaded { scope, entries }).is_err() {
                        return;
                    }
                }
            }
        }
        if !batch.is_empty()
            && tx
                .send(Event::EntriesLoaded {
                    scope,
                    entries: batch,
                })
                .is_err()
        {
            return;
        }
        let _ = tx.send(Event::ScopeLoaded(scope));
    });
}
