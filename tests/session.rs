use std::{
    cell::RefCell,
    fs,
    io::Cursor,
    path::{Path, PathBuf},
    rc::Rc,
};

use scrolls::{App, Config, FileOpener, ImageCapture, NoteError, NoteKind, NoteStore, Result};
use tempfile::TempDir;

/// Writes a stand-in PNG wherever it is asked to
struct FakeCapture;

impl ImageCapture for FakeCapture {
    fn capture(&self, target: &Path) -> Result<()> {
        fs::write(target, b"\x89PNG fake")?;
        Ok(())
    }
}

struct BrokenCapture;

impl ImageCapture for BrokenCapture {
    fn capture(&self, _target: &Path) -> Result<()> {
        Err(NoteError::CaptureFailed {
            message: "no display".to_string(),
        })
    }
}

/// Remembers which files the user asked to open
#[derive(Clone, Default)]
struct RecordingOpener {
    opened: Rc<RefCell<Vec<PathBuf>>>,
}

impl FileOpener for RecordingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

fn open_store(dir: &TempDir) -> NoteStore {
    NoteStore::open(Config::from_data_dir(dir.path())).unwrap()
}

/// Feeds `script` line by line to a fresh session and returns the final store
/// together with everything printed.
fn run_session_with(
    store: NoteStore,
    capture: Box<dyn ImageCapture>,
    opener: RecordingOpener,
    script: &str,
) -> (NoteStore, String) {
    let mut app = App::new(
        store,
        capture,
        Box::new(opener),
        Cursor::new(script.as_bytes().to_vec()),
        Vec::new(),
    );
    app.run().unwrap();
    let (store, output) = app.into_parts();
    (store, String::from_utf8(output).unwrap())
}

fn run_session(dir: &TempDir, script: &str) -> (NoteStore, String) {
    run_session_with(
        open_store(dir),
        Box::new(FakeCapture),
        RecordingOpener::default(),
        script,
    )
}

#[test]
fn test_gate_code_session() {
    let dir = TempDir::new().unwrap();
    let script = "inscribe\nGate Code\n4471\nsecurity, door\n\
                  list\n\
                  search\ndoor\n\
                  search\nnope\n\
                  delete\n1\ny\n\
                  list\n\
                  quit\n";
    let (store, output) = run_session(&dir, script);

    assert!(output.contains("Created scroll #1: Gate Code"));
    assert!(output.contains("security, door"));
    assert!(output.contains("No scrolls found containing 'nope'"));
    assert!(output.contains("Scroll #1 has been erased from the archives."));
    assert!(output.contains("No scrolls found in the archives."));
    assert!(output.contains("Farewell"));
    assert!(store.is_empty());
    assert!(open_store(&dir).is_empty());
}

#[test]
fn test_numeric_codes_and_case_insensitive_mnemonics() {
    let dir = TempDir::new().unwrap();
    let script = "1\nFirst\nbody\n\nINSCRIBE\nSecond\n\n\n3\n12\n";
    let (store, output) = run_session(&dir, script);

    assert_eq!(store.len(), 2);
    let table = &output[output.find("The Archive").unwrap()..];
    // newest first
    assert!(table.find("Second").unwrap() < table.find("First").unwrap());
    assert!(table.contains("2 scrolls"));
}

#[test]
fn test_unknown_command_keeps_loop_alive() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session(&dir, "frobnicate\n\nadd\nAfter\n\n\n");

    assert!(output.contains("Unknown command"));
    assert!(output.contains("frobnicate"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_end_of_input_ends_session_cleanly() {
    let dir = TempDir::new().unwrap();
    let (store, _) = run_session(&dir, "add\nHalf written");
    assert!(store.is_empty());
}

#[test]
fn test_invalid_id_never_reaches_store() {
    let dir = TempDir::new().unwrap();
    let (_, output) = run_session(&dir, "view\nabc\nedit\n-1\ndelete\nseven\nquit\n");
    assert_eq!(output.matches("Invalid scroll ID").count(), 3);
}

#[test]
fn test_unknown_id_is_reported() {
    let dir = TempDir::new().unwrap();
    let (_, output) = run_session(&dir, "view\n42\nquit\n");
    assert!(output.contains("Scroll #42 not found"));
}

#[test]
fn test_empty_title_and_empty_query_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session(&dir, "add\n   \nsearch\n\nquit\n");
    assert!(output.contains("A title is required"));
    assert!(output.contains("A search query is required"));
    assert!(store.is_empty());
}

#[test]
fn test_delete_needs_confirmation() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session(&dir, "add\nKeep me\n\n\ndelete\n1\nno\nquit\n");
    assert!(output.contains("Nothing was changed."));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_modify_keeps_blank_fields() {
    let dir = TempDir::new().unwrap();
    let script = "add\nDraft\nv1\na, b\n\
                  edit\n1\n\nv2\n\n\
                  quit\n";
    let (store, output) = run_session(&dir, script);

    let note = store.get(1).unwrap();
    assert_eq!(note.title, "Draft");
    assert_eq!(note.content(), Some("v2"));
    assert_eq!(note.tags, vec!["a", "b"]);
    assert!(note.updated_at > note.created_at);
    assert!(output.contains("Scroll #1 has been modified."));
}

#[test]
fn test_modify_applies_title_content_and_tags_together() {
    let dir = TempDir::new().unwrap();
    let (store, _) = run_session(&dir, "add\nDraft\nv1\na\nquit\n");
    let created = store.get(1).unwrap();

    let (store, output) = run_session_with(
        store,
        Box::new(FakeCapture),
        RecordingOpener::default(),
        "edit\n1\nFinal\nv2\nb, c\nquit\n",
    );

    assert!(output.contains("Scroll #1 has been modified."));
    let note = store.get(1).unwrap();
    assert_eq!(note.title, "Final");
    assert_eq!(note.content(), Some("v2"));
    assert_eq!(note.tags, vec!["b", "c"]);
    assert!(note.updated_at > created.updated_at);
    assert_eq!(open_store(&dir).get(1).unwrap(), note);
}

#[test]
fn test_modify_with_nothing_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session(&dir, "add\nDraft\nv1\n\nedit\n1\n\n\n\nquit\n");
    let note = store.get(1).unwrap();
    assert_eq!(note.updated_at, note.created_at);
    assert!(output.contains("Scroll #1 kept as it was."));
}

#[test]
fn test_retitle_and_retag() {
    let dir = TempDir::new().unwrap();
    let script = "add\nOld\n\nx\n\
                  retitle\n1\n\n\
                  retitle\n1\nNew\n\
                  retag\n1\n\n\
                  quit\n";
    let (store, output) = run_session(&dir, script);

    assert!(output.contains("Title unchanged."));
    assert!(output.contains("retitled to: New"));
    assert!(output.contains("All tags removed from scroll #1"));
    let note = store.get(1).unwrap();
    assert_eq!(note.title, "New");
    assert!(note.tags.is_empty());
}

#[test]
fn test_capture_view_recapture_and_erase_image() {
    let dir = TempDir::new().unwrap();
    let opener = RecordingOpener::default();
    let script = "capture\nWhiteboard\nmeeting\n\
                  view\n1\ny\n\
                  recapture\n1\nyes\n\
                  erase\n1\ny\ny\n\
                  quit\n";
    let (store, output) = run_session_with(
        open_store(&dir),
        Box::new(FakeCapture),
        opener.clone(),
        script,
    );

    assert!(output.contains("Image captured and saved as scroll #1: Whiteboard"));
    assert!(output.contains("image has been recaptured"));
    assert!(output.contains("Scroll #1 has been erased"));
    assert!(store.is_empty());
    assert_eq!(opener.opened.borrow().len(), 1);

    let images_left = fs::read_dir(dir.path().join("screenshots")).unwrap().count();
    assert_eq!(images_left, 0);
}

#[test]
fn test_failed_capture_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session_with(
        open_store(&dir),
        Box::new(BrokenCapture),
        RecordingOpener::default(),
        "capture\nShot\n\nadd\nText\n\n\nquit\n",
    );

    assert!(output.contains("Capture failed: no display"));
    assert_eq!(store.len(), 1);
    // The failed capture did not consume an ID
    assert_eq!(store.list()[0].id, 1);
}

#[test]
fn test_recapture_on_text_note_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (store, output) = run_session(&dir, "add\nText\nbody\n\nrecapture\n1\nquit\n");

    assert!(output.contains("is a text scroll, expected image"));
    let note = store.get(1).unwrap();
    assert_eq!(note.kind(), NoteKind::Text);
    assert_eq!(note.updated_at, note.created_at);
}

#[test]
fn test_archive_survives_restart() {
    let dir = TempDir::new().unwrap();
    run_session(&dir, "add\nOne\n\n\nadd\nTwo\n\n\ndelete\n2\ny\nquit\n");
    let (store, _) = run_session(&dir, "add\nThree\n\n\nquit\n");

    let ids: Vec<u64> = store.list().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![3, 1]);
}
