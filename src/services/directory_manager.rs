//! Directory listing engine.
//!
//! Owns the sorted entry list of one directory and keeps it in sync with watcher
//! events one event at a time, emitting fine-grained `DirectoryEvent`s so a
//! presentation layer can patch its views instead of rebuilding them.

use crate::config::Config;
use crate::error::{DirError, Result};
use crate::file_utils::{self, FileFilter, PathExt};
use crate::services::directory_watcher::{DirectoryWatcher, NotifyWatcher, WatchEvent};
use crate::services::trash_service::{SystemTrash, TrashService};
use crate::sorting::{Comparator, SortingMode};
use crate::state::{Direction, Entry, EntryStore};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};

/// Change notifications for subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A directory was scanned and is now the current one.
    Loaded(PathBuf),
    /// The whole list was re-sorted.
    SortingChanged,
    FileAdded(String),
    /// `index` is where the entry was before removal.
    FileRemoved { name: String, index: usize },
    FileModified(String),
    FileRenamed {
        from: String,
        index_from: usize,
        to: String,
        index_to: usize,
    },
    /// A modification changed the sort key and the entry moved.
    FileMoved { name: String, from: usize, to: usize },
}

/// A name without separators or `.`/`..` components.
fn is_plain_name(name: &str) -> bool {
    Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

fn ensure_plain_name(name: &str) -> Result<()> {
    if is_plain_name(name) {
        Ok(())
    } else {
        Err(DirError::StaleEvent(format!("{} is not a plain file name", name)))
    }
}

pub struct DirectoryManager {
    current_path: Option<PathBuf>,
    filter: FileFilter,
    sorting_mode: SortingMode,
    store: EntryStore,
    watcher: Box<dyn DirectoryWatcher>,
    trash: Box<dyn TrashService>,
    listeners: Vec<Sender<DirectoryEvent>>,
}

impl DirectoryManager {
    /// Creates an unattached manager with a notify-backed watcher and the system trash.
    pub fn new(config: &Config) -> Result<Self> {
        let watcher = NotifyWatcher::new(&config.watcher)?;
        Self::with_services(config, Box::new(watcher), Box::new(SystemTrash))
    }

    pub fn with_services(
        config: &Config,
        watcher: Box<dyn DirectoryWatcher>,
        trash: Box<dyn TrashService>,
    ) -> Result<Self> {
        Ok(Self {
            current_path: None,
            filter: FileFilter::new(&config.filter_pattern)?,
            sorting_mode: config.sorting_mode,
            store: EntryStore::new(),
            watcher,
            trash,
            listeners: Vec::new(),
        })
    }

    /// Registers a listener. Dropped receivers are pruned on the next emit.
    pub fn subscribe(&mut self) -> Receiver<DirectoryEvent> {
        let (tx, rx) = channel();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, event: DirectoryEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn comparator(&self) -> Comparator {
        self.sorting_mode.comparator()
    }

    fn attached_dir(&self) -> Result<PathBuf> {
        self.current_path
            .clone()
            .ok_or_else(|| DirError::NotFound("no directory attached".to_string()))
    }

    // ------------------------------------------------------------------
    // Attaching
    // ------------------------------------------------------------------

    /// Scans `path` and makes it the current directory.
    ///
    /// Returns false and leaves the current state untouched if the path is missing,
    /// is not a directory, or cannot be read. Re-selecting the current directory is a
    /// no-op that returns true.
    pub fn set_directory(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.attach(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot open directory {}: {}", path.format_for_log(), e);
                false
            }
        }
    }

    fn attach(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(DirError::PathNotFound(path.to_path_buf()));
        }
        let metadata =
            fs::metadata(path).map_err(|_| DirError::PathNotFound(path.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(DirError::NotADirectory(path.to_path_buf()));
        }
        let path = std::path::absolute(path)?;
        if self.current_path.as_ref() == Some(&path) {
            debug!("{} is already open", path.format_for_log());
            return Ok(());
        }

        let entries = file_utils::scan_directory(&path, &self.filter)?;
        let comparator = self.comparator();
        self.store.replace_all(entries, &comparator);
        self.current_path = Some(path.clone());
        info!(
            "Loaded {} ({} files, sorted by {})",
            path.format_for_log(),
            self.store.len(),
            self.sorting_mode
        );
        self.emit(DirectoryEvent::Loaded(path.clone()));

        // 監視に失敗しても一覧自体は有効なので attach は成功扱い
        if let Err(e) = self
            .watcher
            .set_watch_path(&path)
            .and_then(|()| self.watcher.observe())
        {
            warn!("Live updates disabled for {}: {}", path.format_for_log(), e);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Re-reads the filter pattern and sorting mode.
    ///
    /// The new pattern applies to later scans and watcher events only. An invalid
    /// pattern keeps the previous filter and returns false; the sorting mode is
    /// applied either way. Watcher settings are fixed at construction.
    pub fn reconfigure(&mut self, config: &Config) -> bool {
        let filter_ok = match FileFilter::new(&config.filter_pattern) {
            Ok(filter) => {
                if filter.pattern() != self.filter.pattern() {
                    debug!("Filter pattern changed to {}", filter.pattern());
                }
                self.filter = filter;
                true
            }
            Err(e) => {
                warn!("Keeping previous filter: {}", e);
                false
            }
        };
        self.set_sorting_mode(config.sorting_mode);
        filter_ok
    }

    pub fn set_sorting_mode(&mut self, mode: SortingMode) {
        if mode == self.sorting_mode {
            return;
        }
        self.sorting_mode = mode;
        if self.store.len() > 1 {
            let comparator = self.comparator();
            self.store.sort_all(&comparator);
            debug!("Re-sorted {} files by {}", self.store.len(), mode);
            self.emit(DirectoryEvent::SortingChanged);
        }
    }

    pub fn sorting_mode(&self) -> SortingMode {
        self.sorting_mode
    }

    // ------------------------------------------------------------------
    // Watcher reconciliation
    // ------------------------------------------------------------------

    /// Applies everything the watcher observed since the last call. Returns the
    /// number of events processed.
    pub fn process_pending_events(&mut self) -> usize {
        let events = self.watcher.poll_events();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    /// Applies one watcher event. Never fails: events that no longer match the
    /// filesystem or the store are dropped and logged.
    pub fn handle_event(&mut self, event: WatchEvent) {
        if self.current_path.is_none() {
            debug!("Dropping {:?}: no directory attached", event);
            return;
        }
        let result = match &event {
            WatchEvent::Created(name) => {
                ensure_plain_name(name).and_then(|()| self.on_file_created(name))
            }
            WatchEvent::Deleted(name) => {
                ensure_plain_name(name).and_then(|()| self.on_file_removed(name))
            }
            WatchEvent::Modified(name) => {
                ensure_plain_name(name).and_then(|()| self.on_file_modified(name))
            }
            WatchEvent::Renamed { from, to } => ensure_plain_name(from)
                .and_then(|()| ensure_plain_name(to))
                .and_then(|()| self.on_file_renamed(from, to)),
        };
        match result {
            Ok(()) => {}
            Err(DirError::StaleEvent(msg)) => debug!("Ignoring {:?}: {}", event, msg),
            Err(e) => warn!("Dropped {:?}: {}", event, e),
        }
    }

    fn on_file_created(&mut self, name: &str) -> Result<()> {
        let dir = self.attached_dir()?;
        if !self.filter.is_supported_file(&dir.join(name)) {
            return Err(DirError::StaleEvent(format!("{} is not a supported file", name)));
        }
        if self.store.contains(name) {
            return self.on_file_modified(name);
        }
        let entry = file_utils::stat_entry(&dir, name)?;
        let comparator = self.comparator();
        self.store.insert_sorted(entry, &comparator)?;
        self.emit(DirectoryEvent::FileAdded(name.to_string()));
        Ok(())
    }

    fn on_file_removed(&mut self, name: &str) -> Result<()> {
        let dir = self.attached_dir()?;
        let index = self
            .store
            .index_of(name)
            .ok_or_else(|| DirError::StaleEvent(format!("{} is not listed", name)))?;
        if dir.join(name).exists() {
            return Err(DirError::StaleEvent(format!("{} still exists", name)));
        }
        self.store.remove_at(index);
        self.emit(DirectoryEvent::FileRemoved {
            name: name.to_string(),
            index,
        });
        Ok(())
    }

    fn on_file_modified(&mut self, name: &str) -> Result<()> {
        let dir = self.attached_dir()?;
        let current = self
            .store
            .get_by_name(name)
            .ok_or_else(|| DirError::StaleEvent(format!("{} is not listed", name)))?;
        let fresh = file_utils::stat_entry(&dir, name)?;

        let mode = self.sorting_mode;
        let reorder = (mode.depends_on_time() && fresh.modify_time != current.modify_time)
            || (mode.depends_on_size() && fresh.size != current.size);

        if reorder {
            let comparator = self.comparator();
            let (from, _) = self
                .store
                .remove_by_name(name)
                .ok_or_else(|| DirError::NotFound(name.to_string()))?;
            let to = self.store.insert_sorted(fresh, &comparator)?;
            self.emit(DirectoryEvent::FileModified(name.to_string()));
            if from != to {
                self.emit(DirectoryEvent::FileMoved {
                    name: name.to_string(),
                    from,
                    to,
                });
            }
        } else {
            if let Some(entry) = self.store.get_mut_by_name(name) {
                entry.modify_time = fresh.modify_time;
                entry.size = fresh.size;
            }
            self.emit(DirectoryEvent::FileModified(name.to_string()));
        }
        Ok(())
    }

    fn on_file_renamed(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return self.on_file_modified(to);
        }
        if !self.store.contains(from) {
            return if self.store.contains(to) {
                self.on_file_modified(to)
            } else {
                self.on_file_created(to)
            };
        }

        let dir = self.attached_dir()?;
        if !self.filter.is_supported_file(&dir.join(to)) {
            return self.on_file_removed(from);
        }

        // stat first so a failure leaves the store as it was
        let entry = file_utils::stat_entry(&dir, to)?;
        if let Some((index, _)) = self.store.remove_by_name(to) {
            self.emit(DirectoryEvent::FileRemoved {
                name: to.to_string(),
                index,
            });
        }
        let (index_from, _) = self
            .store
            .remove_by_name(from)
            .ok_or_else(|| DirError::NotFound(from.to_string()))?;
        let comparator = self.comparator();
        let index_to = self.store.insert_sorted(entry, &comparator)?;
        self.emit(DirectoryEvent::FileRenamed {
            from: from.to_string(),
            index_from,
            to: to.to_string(),
            index_to,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Explicit file operations
    // ------------------------------------------------------------------

    /// Adds a file the filter would normally exclude, e.g. one opened by exact path.
    ///
    /// Succeeds only for an existing regular file that is not listed yet.
    pub fn force_insert(&mut self, name: &str) -> bool {
        let Some(dir) = self.current_path.clone() else {
            return false;
        };
        if !is_plain_name(name) || !file_utils::is_file(&dir.join(name)) || self.contains(name) {
            return false;
        }
        let entry = match file_utils::stat_entry(&dir, name) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot insert {}: {}", name, e);
                return false;
            }
        };
        let comparator = self.comparator();
        if self.store.insert_sorted(entry, &comparator).is_err() {
            return false;
        }
        self.emit(DirectoryEvent::FileAdded(name.to_string()));
        true
    }

    /// Deletes the file (or moves it to the trash), then drops its entry.
    ///
    /// The store is unchanged if the file is not listed or the deletion fails.
    pub fn remove_file(&mut self, name: &str, trash: bool) -> bool {
        match self.try_remove_file(name, trash) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not remove {}: {}", name, e);
                false
            }
        }
    }

    fn try_remove_file(&mut self, name: &str, trash: bool) -> Result<()> {
        let dir = self.attached_dir()?;
        let index = self
            .store
            .index_of(name)
            .ok_or_else(|| DirError::NotFound(name.to_string()))?;
        let path = dir.join(name);
        if trash {
            self.trash.move_to_trash(&path)?;
        } else {
            fs::remove_file(&path)?;
            info!("File removed: {}", path.format_for_log());
        }
        self.store.remove_at(index);
        self.emit(DirectoryEvent::FileRemoved {
            name: name.to_string(),
            index,
        });
        Ok(())
    }

    /// Copies a listed file into `dest_dir` under the same name.
    ///
    /// Refuses to overwrite an existing file or to copy into the current directory.
    pub fn copy_to(&self, dest_dir: impl AsRef<Path>, name: &str) -> bool {
        let dest_dir = dest_dir.as_ref();
        match self.try_copy_to(dest_dir, name) {
            Ok(bytes) => {
                debug!("Copied {} to {} ({} bytes)", name, dest_dir.format_for_log(), bytes);
                true
            }
            Err(e) => {
                warn!("Could not copy {}: {}", name, e);
                false
            }
        }
    }

    fn try_copy_to(&self, dest_dir: &Path, name: &str) -> Result<u64> {
        let dir = self.attached_dir()?;
        if !self.store.contains(name) {
            return Err(DirError::NotFound(name.to_string()));
        }
        if !dest_dir.exists() {
            return Err(DirError::PathNotFound(dest_dir.to_path_buf()));
        }
        if !dest_dir.is_dir() {
            return Err(DirError::NotADirectory(dest_dir.to_path_buf()));
        }
        if fs::canonicalize(dest_dir)? == fs::canonicalize(&dir)? {
            return Err(DirError::NameCollision(format!(
                "{} is already in {}",
                name,
                dest_dir.format_for_log()
            )));
        }
        let target = dest_dir.join(name);
        if target.exists() {
            return Err(DirError::NameCollision(target.display().to_string()));
        }
        Ok(fs::copy(dir.join(name), target)?)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The current directory, or None while unattached.
    pub fn directory(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.store.index_of(name)
    }

    pub fn check_range(&self, index: usize) -> bool {
        index < self.store.len()
    }

    pub fn file_name_at(&self, index: usize) -> Option<&str> {
        self.store.get(index).map(|e| e.name.as_str())
    }

    pub fn file_path_at(&self, index: usize) -> Option<PathBuf> {
        let dir = self.current_path.as_ref()?;
        self.store.get(index).map(|e| dir.join(&e.name))
    }

    /// Joins `name` onto the current directory. Does not check that it is listed.
    pub fn full_file_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        self.current_path.as_ref().map(|dir| dir.join(name))
    }

    pub fn file_count(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.store.get_by_name(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.store.iter()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.store.names()
    }

    pub fn first(&self) -> Option<&str> {
        self.store.first().map(|e| e.name.as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.store.last().map(|e| e.name.as_str())
    }

    pub fn prev_of(&self, name: &str) -> Option<&str> {
        self.store
            .neighbor_of(name, Direction::Previous)
            .map(|e| e.name.as_str())
    }

    pub fn next_of(&self, name: &str) -> Option<&str> {
        self.store
            .neighbor_of(name, Direction::Next)
            .map(|e| e.name.as_str())
    }

    /// Modification time of a listed file, read from disk.
    pub fn last_modified(&self, name: &str) -> Option<DateTime<Local>> {
        if !self.contains(name) {
            return None;
        }
        let path = self.full_file_path(name)?;
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
        Some(DateTime::<Local>::from(modified))
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        self.filter.is_supported_file(path)
    }

    pub fn is_file(&self, path: &Path) -> bool {
        file_utils::is_file(path)
    }

    pub fn is_directory(&self, path: &Path) -> bool {
        file_utils::is_directory(path)
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let mut names: Vec<&str> = self.store.names();
        let sorted = self.store.is_sorted_by(&self.comparator());
        names.sort_unstable();
        names.dedup();
        sorted && names.len() == self.store.len()
    }
}
