//! Error types for the scrolls application.
//!
//! This module defines the error kinds reported back to the interactive loop.
//! None of them terminate the session except a failure to create the data
//! directory at startup.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::NoteKind;

/// The main error type for the scrolls application.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Note was not found when performing an operation.
    #[error("Scroll #{id} not found in the archives")]
    NoteNotFound { id: u64 },

    /// A required field was empty or a value could not be parsed.
    #[error("{message}")]
    InvalidInput { message: String },

    /// The operation does not apply to this kind of note.
    #[error("Scroll #{id} is a {actual} scroll, expected {expected}")]
    WrongKind {
        id: u64,
        expected: NoteKind,
        actual: NoteKind,
    },

    /// The external capture program failed or produced no file.
    #[error("Capture failed: {message}")]
    CaptureFailed { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },
}

impl NoteError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        NoteError::InvalidInput {
            message: message.into(),
        }
    }

    /// True for errors caused by the user's input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NoteError::InvalidInput { .. } | NoteError::WrongKind { .. }
        )
    }
}
