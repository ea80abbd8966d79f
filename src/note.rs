//! Core note structure for the scrolls application.
//!
//! A note is either a text scroll or a reference to a captured image. The
//! serialized field names match the archive files written by earlier
//! versions of the tool, so old archives load unchanged.
use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Discriminates text scrolls from captured images. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "screenshot", alias = "image")]
    Image,
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteKind::Text => f.write_str("text"),
            NoteKind::Image => f.write_str("image"),
        }
    }
}

/// Kind-specific payload of a note, stored inline under the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NoteBody {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        content: String,
    },
    #[serde(rename = "screenshot", alias = "image")]
    Image {
        file_path: PathBuf,
        /// Bare file name of the image, kept for older readers
        #[serde(default)]
        screenshot: String,
    },
}

impl NoteBody {
    pub fn image(file_path: PathBuf) -> Self {
        let screenshot = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        NoteBody::Image {
            file_path,
            screenshot,
        }
    }
}

/// Represents a single note in the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier, never reused
    pub id: u64,
    /// Display title
    pub title: String,
    /// Text content or image reference
    #[serde(flatten)]
    pub body: NoteBody,
    /// Tags for organization
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Creates a new text note stamped with `now`
    pub fn new_text(
        id: u64,
        title: String,
        content: String,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Note {
            id,
            title,
            body: NoteBody::Text { content },
            tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new image note pointing at an already captured file
    pub fn new_image(
        id: u64,
        title: String,
        file_path: PathBuf,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Note {
            id,
            title,
            body: NoteBody::image(file_path),
            tags,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> NoteKind {
        match self.body {
            NoteBody::Text { .. } => NoteKind::Text,
            NoteBody::Image { .. } => NoteKind::Image,
        }
    }

    /// Text body, `None` for image notes.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            NoteBody::Text { content } => Some(content),
            NoteBody::Image { .. } => None,
        }
    }

    /// Backing image file, `None` for text notes.
    pub fn image_path(&self) -> Option<&Path> {
        match &self.body {
            NoteBody::Image { file_path, .. } => Some(file_path),
            NoteBody::Text { .. } => None,
        }
    }

    /// Bumps `updated_at`, keeping it strictly after the previous value even
    /// when the clock has not advanced.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }

    /// Case-insensitive substring match against title, text content and tags.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .content()
                .is_some_and(|content| content.to_lowercase().contains(needle))
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

// Older archives write `"tags": null` for untagged notes
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
