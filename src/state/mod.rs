//! In-memory state of the directory listing.

pub mod entry_store;

pub use entry_store::{Direction, Entry, EntryStore};
