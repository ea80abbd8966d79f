use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{Local, Utc};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    capture_file_name, Config, FileCleanup, ImageCapture, Note, NoteBody, NoteError, NoteKind,
    Recaptured, Removed, Result,
};

/// The whole archive as written to disk: every note plus the ID counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub next_id: u64,
}

impl Collection {
    /// Smallest ID that cannot collide with a loaded note, whatever the
    /// persisted counter says. Fails when a loaded note already holds the
    /// largest representable ID.
    fn reconcile_next_id(&mut self) -> Result<()> {
        let max_id = self.notes.iter().map(|n| n.id).max().unwrap_or(0);
        let after_max = max_id.checked_add(1).ok_or_else(|| {
            NoteError::invalid(format!("Note ID {} leaves no room for new notes", max_id))
        })?;
        let reconciled = self.next_id.max(after_max);
        if reconciled != self.next_id {
            warn!(
                "Persisted next_id {} is stale, using {}",
                self.next_id, reconciled
            );
        }
        self.next_id = reconciled;
        Ok(())
    }

    /// Hands out the current counter value and advances it.
    fn allocate_id(&mut self) -> Result<u64> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| NoteError::invalid("No note IDs left to assign"))?;
        Ok(id)
    }

    fn find_mut(&mut self, id: u64) -> Result<&mut Note> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(NoteError::NoteNotFound { id })
    }
}

/// Owns the note collection and its JSON backing file.
///
/// Every mutation is applied to a draft copy of the collection, the draft is
/// written to disk, and only then does it replace the live collection. A
/// failed write therefore leaves memory and disk as they were.
#[derive(Debug)]
pub struct NoteStore {
    /// Application configuration
    config: Config,

    /// In-memory collection, mirrors the file after every mutation
    collection: Collection,
}

impl NoteStore {
    /// Opens the archive described by `config`.
    ///
    /// This constructor:
    /// 1. Ensures the data and image directories exist
    /// 2. Loads the collection document, if there is one
    /// 3. Reconciles the ID counter with the loaded notes
    ///
    /// # Arguments
    ///
    /// * `config` - The directory layout of the archive
    ///
    /// # Returns
    ///
    /// The opened store, or `DirectoryError` when a directory cannot be
    /// created. A missing or unreadable collection file is not an error; it
    /// yields an empty archive.
    pub fn open(config: Config) -> Result<Self> {
        info!(
            "Opening archive: data_dir={}, images_dir={}",
            config.data_dir.display(),
            config.images_dir.display()
        );

        for dir in [&config.data_dir, &config.images_dir] {
            if !dir.exists() {
                debug!("Directory does not exist, creating: {}", dir.display());
                fs::create_dir_all(dir).map_err(|e| {
                    error!("Failed to create directory {}: {}", dir.display(), e);
                    NoteError::DirectoryError { path: dir.clone() }
                })?;
            }
        }

        let collection = load_collection(&config.collection_file);
        info!("Loaded {} notes", collection.notes.len());

        Ok(Self { config, collection })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Counter value the next created note will receive
    pub fn next_id(&self) -> u64 {
        self.collection.next_id
    }

    pub fn len(&self) -> usize {
        self.collection.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.notes.is_empty()
    }

    /// Creates a text note and persists the archive
    pub fn create_text(&mut self, title: &str, content: &str, tags: Vec<String>) -> Result<Note> {
        let title = required_title(title)?;
        let content = content.trim().to_string();

        let note = self.commit(|draft| {
            let id = draft.allocate_id()?;
            let note = Note::new_text(id, title, content, tags, Utc::now());
            draft.notes.push(note.clone());
            Ok(note)
        })?;

        info!("Created text note #{}", note.id);
        Ok(note)
    }

    /// Captures an image through `capture` and records it as a new note.
    ///
    /// # Arguments
    ///
    /// * `title` - Title of the note, must not be blank
    /// * `tags` - Tags to attach, in order
    /// * `capture` - The screenshot collaborator that writes the image file
    ///
    /// # Returns
    ///
    /// The persisted note. Nothing is recorded and the ID counter is
    /// untouched if the capture fails or leaves no file behind.
    pub fn create_image(
        &mut self,
        title: &str,
        tags: Vec<String>,
        capture: &dyn ImageCapture,
    ) -> Result<Note> {
        let title = required_title(title)?;
        let id = self.collection.next_id;
        // Fail before running the capture tool if no ID is left
        if id.checked_add(1).is_none() {
            return Err(NoteError::invalid("No note IDs left to assign"));
        }
        let target = self.capture_into_fresh_path(id, capture)?;

        let result = self.commit(|draft| {
            let id = draft.allocate_id()?;
            let note = Note::new_image(id, title, target.clone(), tags, Utc::now());
            draft.notes.push(note.clone());
            Ok(note)
        });

        match result {
            Ok(note) => {
                info!("Created image note #{} at {}", note.id, target.display());
                Ok(note)
            }
            Err(e) => {
                // The note was never recorded, so the capture is an orphan
                discard_file(&target);
                Err(e)
            }
        }
    }

    /// All notes, newest first
    pub fn list(&self) -> Vec<Note> {
        let mut notes = self.collection.notes.clone();
        sort_newest_first(&mut notes);
        notes
    }

    pub fn get(&self, id: u64) -> Result<Note> {
        trace!("Retrieving note #{}", id);
        self.collection
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(NoteError::NoteNotFound { id })
    }

    /// Notes whose title, text content or any tag contains `query`, ignoring
    /// case. Same order as [`NoteStore::list`].
    pub fn search(&self, query: &str) -> Vec<Note> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Note> = self
            .collection
            .notes
            .iter()
            .filter(|n| n.matches(&needle))
            .cloned()
            .collect();
        sort_newest_first(&mut matches);
        debug!("Search '{}' matched {} notes", query, matches.len());
        matches
    }

    /// Replaces the title, content and/or tags of a note in one write.
    /// Blank or missing title and content keep the current value; `None`
    /// tags keep the current list while `Some` replaces it. If nothing
    /// changes, nothing is written.
    pub fn edit_text(
        &mut self,
        id: u64,
        new_title: Option<&str>,
        new_content: Option<&str>,
        new_tags: Option<Vec<String>>,
    ) -> Result<Note> {
        let new_title = non_blank(new_title);
        let new_content = non_blank(new_content);
        let new_tags = new_tags.map(clean_tags);

        let current = self.get(id)?;
        if new_content.is_some() && current.kind() != NoteKind::Text {
            return Err(NoteError::WrongKind {
                id,
                expected: NoteKind::Text,
                actual: current.kind(),
            });
        }

        let title_changes = new_title.is_some_and(|t| t != current.title);
        let content_changes = new_content.is_some_and(|c| Some(c) != current.content());
        let tags_change = new_tags.as_ref().is_some_and(|t| *t != current.tags);
        if !title_changes && !content_changes && !tags_change {
            debug!("Edit of note #{} changes nothing", id);
            return Ok(current);
        }

        let note = self.commit(|draft| {
            let note = draft.find_mut(id)?;
            if let Some(title) = new_title {
                note.title = title.to_string();
            }
            if let (Some(new_content), NoteBody::Text { content }) = (new_content, &mut note.body)
            {
                *content = new_content.to_string();
            }
            if let Some(tags) = new_tags {
                note.tags = tags;
            }
            note.touch();
            Ok(note.clone())
        })?;

        info!("Edited note #{}", id);
        Ok(note)
    }

    pub fn retitle(&mut self, id: u64, new_title: &str) -> Result<Note> {
        let title = required_title(new_title)?;
        let note = self.commit(|draft| {
            let note = draft.find_mut(id)?;
            note.title = title;
            note.touch();
            Ok(note.clone())
        })?;

        info!("Retitled note #{}", id);
        Ok(note)
    }

    /// Replaces the tag list; an empty list clears every tag.
    pub fn retag(&mut self, id: u64, new_tags: Vec<String>) -> Result<Note> {
        let tags = clean_tags(new_tags);

        let note = self.commit(|draft| {
            let note = draft.find_mut(id)?;
            note.tags = tags;
            note.touch();
            Ok(note.clone())
        })?;

        info!("Retagged note #{} with {} tags", id, note.tags.len());
        Ok(note)
    }

    /// Captures a fresh image for an existing image note.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of an image note
    /// * `capture` - The screenshot collaborator that writes the new file
    /// * `delete_old` - Whether to remove the previous image afterwards
    ///
    /// # Returns
    ///
    /// The updated note together with the outcome of removing the old file.
    /// That removal may fail without undoing the update. Text notes are
    /// rejected with `WrongKind` and nothing changes.
    pub fn replace_image(
        &mut self,
        id: u64,
        capture: &dyn ImageCapture,
        delete_old: bool,
    ) -> Result<Recaptured> {
        let current = self.get(id)?;
        let previous_image = match current.image_path() {
            Some(path) => path.to_path_buf(),
            None => {
                return Err(NoteError::WrongKind {
                    id,
                    expected: NoteKind::Image,
                    actual: current.kind(),
                })
            }
        };

        let target = self.capture_into_fresh_path(id, capture)?;
        let result = self.commit(|draft| {
            let note = draft.find_mut(id)?;
            note.body = NoteBody::image(target.clone());
            note.touch();
            Ok(note.clone())
        });

        let note = match result {
            Ok(note) => note,
            Err(e) => {
                discard_file(&target);
                return Err(e);
            }
        };
        info!("Replaced image of note #{} with {}", id, target.display());

        let old_image_cleanup = if delete_old {
            self.remove_unreferenced_file(&previous_image)
        } else {
            FileCleanup::NotRequested
        };

        Ok(Recaptured {
            note,
            previous_image,
            old_image_cleanup,
        })
    }

    /// Deletes a note from the archive
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the note to delete
    /// * `delete_image_file` - For image notes, also remove the backing file
    ///   unless another note still uses it
    ///
    /// # Returns
    ///
    /// The removed note and what happened to its image file, or
    /// `NoteNotFound` if no note has this ID
    pub fn delete(&mut self, id: u64, delete_image_file: bool) -> Result<Removed> {
        info!("Deleting note #{}", id);
        let note = self.commit(|draft| {
            let index = draft
                .notes
                .iter()
                .position(|n| n.id == id)
                .ok_or(NoteError::NoteNotFound { id })?;
            Ok(draft.notes.remove(index))
        })?;

        let image_cleanup = match note.image_path() {
            Some(path) if delete_image_file => self.remove_unreferenced_file(path),
            _ => FileCleanup::NotRequested,
        };

        info!("Note #{} successfully deleted", id);
        Ok(Removed {
            note,
            image_cleanup,
        })
    }

    /// Applies `mutate` to a draft of the collection, writes the draft, and
    /// swaps it in only once the write succeeded.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut Collection) -> Result<T>) -> Result<T> {
        let mut draft = self.collection.clone();
        let output = mutate(&mut draft)?;
        self.write_collection(&draft)?;
        self.collection = draft;
        Ok(output)
    }

    /// Saves the collection using atomic operations to prevent data corruption
    fn write_collection(&self, collection: &Collection) -> Result<()> {
        let file_path = &self.config.collection_file;
        debug!("Writing {} notes to {}", collection.notes.len(), file_path.display());

        let dir = file_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NoteError::Io(e)
        })?;

        let json = serde_json::to_string_pretty(collection).map_err(|e| {
            error!("Failed to serialize collection: {}", e);
            NoteError::Serialization(e)
        })?;

        temp_file.write_all(json.as_bytes())?;
        temp_file.flush()?;

        temp_file.persist(file_path).map_err(|e| {
            error!("Failed to persist file {}: {}", file_path.display(), e.error);
            NoteError::Io(e.error)
        })?;

        trace!("Collection written");
        Ok(())
    }

    /// Runs `capture` against a not-yet-existing path in the image directory
    /// and checks that a file actually appeared there.
    fn capture_into_fresh_path(&self, id: u64, capture: &dyn ImageCapture) -> Result<PathBuf> {
        let target = self.fresh_image_path(id);
        debug!("Capturing image for note #{} into {}", id, target.display());

        capture.capture(&target).map_err(|e| {
            warn!("Capture for note #{} failed: {}", id, e);
            e
        })?;

        if !target.is_file() {
            warn!("Capture finished but {} does not exist", target.display());
            return Err(NoteError::CaptureFailed {
                message: "capture was cancelled or produced no file".to_string(),
            });
        }
        Ok(target)
    }

    fn fresh_image_path(&self, id: u64) -> PathBuf {
        let name = capture_file_name(Utc::now(), id);
        let candidate = self.config.images_dir.join(&name);
        if !candidate.exists() {
            return candidate;
        }

        let stem = name.trim_end_matches(".png");
        (2u32..)
            .map(|n| self.config.images_dir.join(format!("{}_{}.png", stem, n)))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }

    fn remove_unreferenced_file(&self, path: &Path) -> FileCleanup {
        let still_used = self
            .collection
            .notes
            .iter()
            .any(|n| n.image_path() == Some(path));
        if still_used {
            debug!("Keeping {}, another note references it", path.display());
            return FileCleanup::Retained(path.to_path_buf());
        }

        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed image file {}", path.display());
                FileCleanup::Removed(path.to_path_buf())
            }
            Err(e) => {
                warn!("Failed to remove image file {}: {}", path.display(), e);
                FileCleanup::Failed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Reads the collection document, falling back to an empty archive when the
/// file is missing or cannot be parsed. A file that fails to parse is moved
/// aside first so the next write does not destroy it.
pub fn load_collection(path: &Path) -> Collection {
    if !path.exists() {
        debug!("No collection file at {}, starting empty", path.display());
        return Collection {
            notes: Vec::new(),
            next_id: 1,
        };
    }

    let parsed = fs::read_to_string(path)
        .map_err(NoteError::Io)
        .and_then(|raw| serde_json::from_str::<Collection>(&raw).map_err(NoteError::Serialization));

    let mut collection = match parsed {
        Ok(collection) => collection,
        Err(e) => {
            error!("Failed to load notes from {}: {}", path.display(), e);
            quarantine(path);
            Collection::default()
        }
    };
    if let Err(e) = collection.reconcile_next_id() {
        error!("Unusable collection in {}: {}", path.display(), e);
        quarantine(path);
        return Collection {
            notes: Vec::new(),
            next_id: 1,
        };
    }
    collection
}

fn quarantine(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(".corrupt-{}", Local::now().format("%Y%m%d_%H%M%S")));
    match fs::rename(path, &aside) {
        Ok(()) => warn!("Moved unreadable collection to {}", Path::new(&aside).display()),
        Err(e) => warn!("Could not move unreadable collection aside: {}", e),
    }
}

fn discard_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove orphaned capture {}: {}", path.display(), e);
    }
}

fn sort_newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

fn required_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(NoteError::invalid("A title is required"));
    }
    Ok(title.to_string())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
