//! Unified error types for the directory listing engine.

use std::fmt;
use std::path::PathBuf;

/// Directory-listing errors.
#[derive(Debug)]
pub enum DirError {
    /// The requested path does not exist
    PathNotFound(PathBuf),
    /// The requested path exists but is not a directory
    NotADirectory(PathBuf),
    /// An entry with the same name is already in the store
    NameCollision(String),
    /// No entry with this name, or index out of range
    NotFound(String),
    /// stat / delete / copy failure
    Io(String),
    /// A watcher event describes a state that is no longer true
    StaleEvent(String),
    /// The file filter pattern does not compile
    InvalidPattern(String),
    /// The filesystem watcher could not be created or retargeted
    Watcher(String),
    /// Moving a file to the trash failed
    Trash(String),
    /// A sorting mode name that does not parse
    UnknownSortingMode(String),
}

impl fmt::Display for DirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirError::PathNotFound(path) => write!(f, "path does not exist: {}", path.display()),
            DirError::NotADirectory(path) => {
                write!(f, "path is not a directory: {}", path.display())
            }
            DirError::NameCollision(name) => write!(f, "entry already exists: {}", name),
            DirError::NotFound(what) => write!(f, "not found: {}", what),
            DirError::Io(msg) => write!(f, "I/O error: {}", msg),
            DirError::StaleEvent(msg) => write!(f, "stale watcher event: {}", msg),
            DirError::InvalidPattern(msg) => write!(f, "invalid filter pattern: {}", msg),
            DirError::Watcher(msg) => write!(f, "watcher error: {}", msg),
            DirError::Trash(msg) => write!(f, "move to trash failed: {}", msg),
            DirError::UnknownSortingMode(name) => write!(f, "unknown sorting mode: {}", name),
        }
    }
}

impl std::error::Error for DirError {}

impl From<std::io::Error> for DirError {
    fn from(err: std::io::Error) -> Self {
        DirError::Io(err.to_string())
    }
}

impl From<regex::Error> for DirError {
    fn from(err: regex::Error) -> Self {
        DirError::InvalidPattern(err.to_string())
    }
}

impl From<notify::Error> for DirError {
    fn from(err: notify::Error) -> Self {
        DirError::Watcher(err.to_string())
    }
}

impl From<trash::Error> for DirError {
    fn from(err: trash::Error) -> Self {
        DirError::Trash(err.to_string())
    }
}

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, DirError>;
