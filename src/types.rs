//! Shared result and outcome types for the scrolls application.
use std::path::PathBuf;

use crate::{Note, NoteError};

/// A specialized Result type for scrolls operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// What happened to a backing image file after a best-effort removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCleanup {
    /// The caller did not ask for the file to be removed
    NotRequested,
    /// The file was removed
    Removed(PathBuf),
    /// Another note still points at the file, so it was left in place
    Retained(PathBuf),
    /// Removal was attempted and failed; the data change still stands
    Failed { path: PathBuf, message: String },
}

/// Result of deleting a note from the store
#[derive(Debug, Clone)]
pub struct Removed {
    /// The note as it was just before deletion
    pub note: Note,
    pub image_cleanup: FileCleanup,
}

/// Result of replacing the backing image of an image note
#[derive(Debug, Clone)]
pub struct Recaptured {
    /// The updated note, already persisted
    pub note: Note,
    /// Image path before the replacement
    pub previous_image: PathBuf,
    pub old_image_cleanup: FileCleanup,
}

/// Operations reachable from the interactive menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Inscribe,
    Capture,
    Archive,
    Reveal,
    Seek,
    Modify,
    Retitle,
    Retag,
    Recapture,
    Erase,
    Wisdom,
    Depart,
}
