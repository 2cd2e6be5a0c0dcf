//! Sort modes and the comparators they resolve to.

use crate::error::DirError;
use crate::state::Entry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which field orders the listing, and in which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortingMode {
    #[default]
    Name,
    NameDesc,
    Time,
    TimeDesc,
    Size,
    SizeDesc,
}

impl SortingMode {
    pub const ALL: [SortingMode; 6] = [
        SortingMode::Name,
        SortingMode::NameDesc,
        SortingMode::Time,
        SortingMode::TimeDesc,
        SortingMode::Size,
        SortingMode::SizeDesc,
    ];

    /// Resolves the mode to a concrete comparator.
    pub fn comparator(self) -> Comparator {
        Comparator { mode: self }
    }

    pub fn depends_on_time(self) -> bool {
        matches!(self, SortingMode::Time | SortingMode::TimeDesc)
    }

    pub fn depends_on_size(self) -> bool {
        matches!(self, SortingMode::Size | SortingMode::SizeDesc)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortingMode::Name => "name",
            SortingMode::NameDesc => "name_desc",
            SortingMode::Time => "time",
            SortingMode::TimeDesc => "time_desc",
            SortingMode::Size => "size",
            SortingMode::SizeDesc => "size_desc",
        }
    }
}

impl fmt::Display for SortingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortingMode {
    type Err = DirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        SortingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| DirError::UnknownSortingMode(s.to_string()))
    }
}

/// Numeric-aware name comparison: "img2" < "img10", case folded.
///
/// Names that differ only in case fall back to a plain comparison so the order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    alphanumeric_sort::compare_str(a.to_lowercase(), b.to_lowercase()).then_with(|| a.cmp(b))
}

/// A total order over entries for one `SortingMode`.
///
/// Equal times or sizes fall back to ascending name order, so an incrementally
/// maintained list and a fresh scan agree on where ties go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    mode: SortingMode,
}

impl Comparator {
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        let by_name = || compare_names(&a.name, &b.name);
        match self.mode {
            SortingMode::Name => by_name(),
            SortingMode::NameDesc => compare_names(&b.name, &a.name),
            SortingMode::Time => a.modify_time.cmp(&b.modify_time).then_with(by_name),
            SortingMode::TimeDesc => b.modify_time.cmp(&a.modify_time).then_with(by_name),
            SortingMode::Size => a.size.cmp(&b.size).then_with(by_name),
            SortingMode::SizeDesc => b.size.cmp(&a.size).then_with(by_name),
        }
    }
}
