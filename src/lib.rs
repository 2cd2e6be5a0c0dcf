//! Directory listing engine for an image viewer.
//!
//! Enumerates a folder's supported files, keeps them in a stably sorted, indexable
//! list and reconciles that list against filesystem-watcher events without
//! re-scanning the directory.

pub mod config;
pub mod error;
pub mod file_utils;
pub mod services;
pub mod sorting;
pub mod state;

pub use config::{Config, WatcherBackend, WatcherConfig};
pub use error::{DirError, Result};
pub use file_utils::FileFilter;
pub use services::{
    DirectoryEvent, DirectoryManager, DirectoryWatcher, NotifyWatcher, SystemTrash, TrashService,
    WatchEvent,
};
pub use sorting::{Comparator, SortingMode};
pub use state::{Direction, Entry, EntryStore};
