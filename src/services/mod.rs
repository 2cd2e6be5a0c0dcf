//! Service layer for the directory listing engine.
//!
//! `DirectoryManager` holds the business logic; the watcher and the trash sit behind
//! traits so the manager can be driven and tested without OS facilities.

pub mod directory_manager;
pub mod directory_watcher;
pub mod trash_service;

pub use directory_manager::{DirectoryEvent, DirectoryManager};
pub use directory_watcher::{DirectoryWatcher, NotifyWatcher, WatchEvent};
pub use trash_service::{SystemTrash, TrashService};
