//! Configuration for the directory listing engine.

use crate::sorting::SortingMode;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported image file extensions for scanning directories.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Filter pattern matching any file name ending in a supported extension.
pub static DEFAULT_FILTER_PATTERN: Lazy<String> =
    Lazy::new(|| format!(r"^.*\.({})$", SUPPORTED_IMAGE_EXTENSIONS.join("|")));

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_RENAME_TIMEOUT_MS: u64 = 500;

/// Which notify backend observes the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherBackend {
    /// inotify / FSEvents / ReadDirectoryChangesW
    #[default]
    Native,
    /// Periodic rescans; for network shares and other filesystems without native events.
    Poll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub backend: WatcherBackend,
    /// Only used by the poll backend.
    pub poll_interval_ms: u64,
    /// How long a rename-from half waits for its rename-to before it is reported as a deletion.
    pub rename_timeout_ms: u64,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rename_timeout(&self) -> Duration {
        Duration::from_millis(self.rename_timeout_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            backend: WatcherBackend::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            rename_timeout_ms: DEFAULT_RENAME_TIMEOUT_MS,
        }
    }
}

/// Settings read by `DirectoryManager` at construction and on `reconfigure`.
///
/// A changed `filter_pattern` only affects later scans and watcher events; entries
/// already in the store are not re-filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regular expression matched case-insensitively against file names.
    pub filter_pattern: String,
    pub sorting_mode: SortingMode,
    pub watcher: WatcherConfig,
}

impl Config {
    /// Builds a config whose filter accepts exactly the given extensions.
    pub fn with_extensions(extensions: &[&str]) -> Self {
        let escaped: Vec<String> = extensions.iter().map(|ext| regex::escape(ext)).collect();
        Self {
            filter_pattern: format!(r"^.*\.({})$", escaped.join("|")),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_pattern: DEFAULT_FILTER_PATTERN.clone(),
            sorting_mode: SortingMode::default(),
            watcher: WatcherConfig::default(),
        }
    }
}
