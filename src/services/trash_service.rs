//! Moving files to the desktop trash.

use crate::error::Result;
use crate::file_utils::PathExt;
use log::info;
use std::path::Path;

/// Capability to relocate a file into the platform trash.
pub trait TrashService {
    fn move_to_trash(&self, path: &Path) -> Result<()>;
}

/// Uses the platform trash (FreeDesktop trash, recycle bin, Finder trash) via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashService for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> Result<()> {
        trash::delete(path)?;
        info!("Moved to trash: {}", path.format_for_log());
        Ok(())
    }
}
