//! Interactive command interpreter for the scrolls application
//!
//! Reads one command per line, collects whatever parameters the command
//! needs from the following lines, calls the note store, and renders the
//! result. Errors are reported and the loop carries on.
use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use console::style;
use log::{debug, info};

use crate::{
    is_affirmative, parse_tags, render_detail, render_table, Command, FileCleanup, FileOpener,
    ImageCapture, NoteError, NoteKind, NoteStore, Result,
};

/// Menu entries: command, numeric code, mnemonics, help text
pub const COMMAND_TABLE: &[(Command, &str, &[&str], &str)] = &[
    (Command::Inscribe, "1", &["inscribe", "add", "create", "new"], "Inscribe a new text scroll"),
    (Command::Capture, "2", &["capture", "screenshot"], "Capture an image scroll"),
    (Command::Archive, "3", &["archive", "list", "ls"], "View all scrolls in the archive"),
    (Command::Reveal, "4", &["reveal", "view", "show"], "Reveal a specific scroll"),
    (Command::Seek, "5", &["seek", "search", "find"], "Seek knowledge within scrolls"),
    (Command::Modify, "6", &["modify", "edit"], "Modify an existing scroll"),
    (Command::Retitle, "7", &["retitle"], "Change a scroll's title"),
    (Command::Retag, "8", &["retag"], "Update a scroll's tags"),
    (Command::Recapture, "9", &["recapture"], "Replace a captured image"),
    (Command::Erase, "10", &["erase", "delete", "rm"], "Erase a scroll from existence"),
    (Command::Wisdom, "11", &["wisdom", "help", "?"], "Show these commands"),
    (Command::Depart, "12", &["depart", "quit", "exit", "q"], "Depart from the archives"),
];

const COMMAND_PROMPT: &str = "\nSpeak your command (or 'wisdom' for guidance): ";
const NOT_CHANGED: &str = "Nothing was changed.";

/// Whether the loop should keep reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Builds the token lookup used by the loop. Keys are lowercase.
pub fn command_lookup() -> HashMap<&'static str, Command> {
    let mut lookup = HashMap::new();
    for (command, code, mnemonics, _) in COMMAND_TABLE {
        lookup.insert(*code, *command);
        for mnemonic in mnemonics.iter() {
            lookup.insert(*mnemonic, *command);
        }
    }
    lookup
}

/// CLI application handler - reads commands and interfaces with NoteStore
pub struct App<R, W> {
    /// The note store backend
    store: NoteStore,

    /// Screenshot collaborator used by capture and recapture
    capture: Box<dyn ImageCapture>,

    /// Shows image files on request
    opener: Box<dyn FileOpener>,

    commands: HashMap<&'static str, Command>,

    input: R,

    output: W,
}

impl<R: BufRead, W: Write> App<R, W> {
    pub fn new(
        store: NoteStore,
        capture: Box<dyn ImageCapture>,
        opener: Box<dyn FileOpener>,
        input: R,
        output: W,
    ) -> Self {
        Self {
            store,
            capture,
            opener,
            commands: command_lookup(),
            input,
            output,
        }
    }

    /// Hands back the store and the output sink once the session is over
    pub fn into_parts(self) -> (NoteStore, W) {
        (self.store, self.output)
    }

    /// Runs the read-eval-print loop until quit or end of input
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "{}", style("Welcome to The Scrolls of Skelos!").bold())?;
        writeln!(
            self.output,
            "The archives are stored in: {}",
            self.store.config().data_dir.display()
        )?;
        self.show_help()?;

        loop {
            let Some(line) = self.prompt(COMMAND_PROMPT)? else {
                writeln!(self.output)?;
                break;
            };

            let token = line.trim().to_lowercase();
            if token.is_empty() {
                continue;
            }

            let Some(command) = self.commands.get(token.as_str()).copied() else {
                writeln!(self.output, "{} {}", style("Unknown command:").red(), line.trim())?;
                writeln!(self.output, "Speak 'wisdom' to learn the commands.")?;
                continue;
            };

            debug!("Dispatching {:?}", command);
            match self.dispatch(command) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => self.report(&e)?,
            }
        }

        info!("Session finished");
        Ok(())
    }

    /// Runs a single command; the caller reports any error
    pub fn dispatch(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Inscribe => self.inscribe(),
            Command::Capture => self.capture_image(),
            Command::Archive => self.archive(),
            Command::Reveal => self.reveal(),
            Command::Seek => self.seek(),
            Command::Modify => self.modify(),
            Command::Retitle => self.retitle(),
            Command::Retag => self.retag(),
            Command::Recapture => self.recapture(),
            Command::Erase => self.erase(),
            Command::Wisdom => {
                self.show_help()?;
                Ok(Flow::Continue)
            }
            Command::Depart => {
                writeln!(self.output, "May the ancient wisdom guide you. Farewell!")?;
                Ok(Flow::Quit)
            }
        }
    }

    fn inscribe(&mut self) -> Result<Flow> {
        let Some(title) = self.prompt("Enter the title of your scroll: ")? else {
            return Ok(Flow::Quit);
        };
        if title.trim().is_empty() {
            return Err(NoteError::invalid("A title is required"));
        }
        let Some(content) = self.prompt("Inscribe your knowledge: ")? else {
            return Ok(Flow::Quit);
        };
        let Some(tags) = self.prompt("Tags (comma-separated, optional): ")? else {
            return Ok(Flow::Quit);
        };

        let note = self.store.create_text(&title, &content, parse_tags(&tags))?;
        writeln!(self.output, "Created scroll #{}: {}", note.id, note.title)?;
        Ok(Flow::Continue)
    }

    fn capture_image(&mut self) -> Result<Flow> {
        let Some(title) = self.prompt("Enter the title for your captured image: ")? else {
            return Ok(Flow::Quit);
        };
        if title.trim().is_empty() {
            return Err(NoteError::invalid("A title is required"));
        }
        let Some(tags) = self.prompt("Tags (comma-separated, optional): ")? else {
            return Ok(Flow::Quit);
        };

        writeln!(self.output, "Capturing... (follow the system prompts)")?;
        self.output.flush()?;
        let note = self
            .store
            .create_image(&title, parse_tags(&tags), self.capture.as_ref())?;
        writeln!(
            self.output,
            "Image captured and saved as scroll #{}: {}",
            note.id, note.title
        )?;
        Ok(Flow::Continue)
    }

    fn archive(&mut self) -> Result<Flow> {
        let notes = self.store.list();
        if notes.is_empty() {
            writeln!(self.output, "No scrolls found in the archives.")?;
        } else {
            render_table(&mut self.output, "The Archive", &notes)?;
        }
        Ok(Flow::Continue)
    }

    fn reveal(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to reveal: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;
        render_detail(&mut self.output, &note)?;

        if let Some(path) = note.image_path() {
            let Some(answer) = self.prompt("Open this image? (y/n): ")? else {
                return Ok(Flow::Quit);
            };
            if is_affirmative(&answer) {
                if let Err(e) = self.opener.open(path) {
                    self.warn(&e.to_string())?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn seek(&mut self) -> Result<Flow> {
        let Some(query) = self.prompt("What knowledge do you seek?: ")? else {
            return Ok(Flow::Quit);
        };
        let query = query.trim();
        if query.is_empty() {
            return Err(NoteError::invalid("A search query is required"));
        }

        let matches = self.store.search(query);
        if matches.is_empty() {
            writeln!(self.output, "No scrolls found containing '{}'", query)?;
        } else {
            render_table(&mut self.output, &format!("Found: '{}'", query), &matches)?;
        }
        Ok(Flow::Continue)
    }

    fn modify(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to modify: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;

        writeln!(self.output, "\n=== Modifying scroll #{} ===", note.id)?;
        writeln!(self.output, "Current title: {}", note.title)?;
        writeln!(self.output, "Type: {}", note.kind())?;
        let Some(title) = self.prompt("New title (Enter keeps current): ")? else {
            return Ok(Flow::Quit);
        };

        let mut content = String::new();
        if let Some(current) = note.content() {
            writeln!(self.output, "Current content:\n{}\n", current)?;
            let Some(line) = self.prompt("New content (Enter keeps current): ")? else {
                return Ok(Flow::Quit);
            };
            content = line;
        }

        writeln!(self.output, "Current tags: {}", tag_summary(&note.tags))?;
        let Some(tags) = self.prompt("New tags (comma-separated, Enter keeps current): ")? else {
            return Ok(Flow::Quit);
        };

        let new_tags = (!tags.trim().is_empty()).then(|| parse_tags(&tags));
        let updated = self
            .store
            .edit_text(id, Some(title.as_str()), Some(content.as_str()), new_tags)?;

        if updated.updated_at == note.updated_at {
            writeln!(self.output, "Scroll #{} kept as it was.", id)?;
        } else {
            writeln!(self.output, "Scroll #{} has been modified.", id)?;
        }
        Ok(Flow::Continue)
    }

    fn retitle(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to retitle: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;
        writeln!(self.output, "Current title: {}", note.title)?;

        let Some(title) = self.prompt("Enter new title: ")? else {
            return Ok(Flow::Quit);
        };
        if title.trim().is_empty() {
            writeln!(self.output, "Title unchanged.")?;
            return Ok(Flow::Continue);
        }

        let note = self.store.retitle(id, &title)?;
        writeln!(self.output, "Scroll #{} has been retitled to: {}", id, note.title)?;
        Ok(Flow::Continue)
    }

    fn retag(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to retag: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;
        writeln!(self.output, "Current tags: {}", tag_summary(&note.tags))?;

        let Some(tags) = self.prompt("New tags (comma-separated, leave empty to remove all): ")?
        else {
            return Ok(Flow::Quit);
        };

        let note = self.store.retag(id, parse_tags(&tags))?;
        if note.tags.is_empty() {
            writeln!(self.output, "All tags removed from scroll #{}", id)?;
        } else {
            writeln!(
                self.output,
                "Scroll #{} tags updated to: {}",
                id,
                note.tags.join(", ")
            )?;
        }
        Ok(Flow::Continue)
    }

    fn recapture(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to recapture: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;
        let Some(old_path) = note.image_path() else {
            return Err(NoteError::WrongKind {
                id,
                expected: NoteKind::Image,
                actual: note.kind(),
            });
        };

        let question = format!(
            "Delete the old captured image '{}'? (y/n): ",
            old_path.display()
        );
        let Some(answer) = self.prompt(&question)? else {
            return Ok(Flow::Quit);
        };

        writeln!(self.output, "Recapturing... (follow the system prompts)")?;
        self.output.flush()?;
        let outcome =
            self.store
                .replace_image(id, self.capture.as_ref(), is_affirmative(&answer))?;

        if let Some(path) = outcome.note.image_path() {
            writeln!(
                self.output,
                "Scroll #{} image has been recaptured: {}",
                id,
                path.display()
            )?;
        }
        self.report_cleanup(&outcome.old_image_cleanup)?;
        Ok(Flow::Continue)
    }

    fn erase(&mut self) -> Result<Flow> {
        let Some(id) = self.prompt_id("Enter the scroll ID to erase from existence: ")? else {
            return Ok(Flow::Quit);
        };
        let note = self.store.get(id)?;

        let question = format!(
            "Are you certain you wish to erase scroll #{} '{}'? (y/n): ",
            note.id, note.title
        );
        let Some(confirm) = self.prompt(&question)? else {
            return Ok(Flow::Quit);
        };
        if !is_affirmative(&confirm) {
            writeln!(self.output, "The scroll remains preserved. {}", NOT_CHANGED)?;
            return Ok(Flow::Continue);
        }

        let mut delete_image = false;
        if let Some(path) = note.image_path() {
            let question = format!(
                "Destroy the captured image '{}' as well? (y/n): ",
                path.display()
            );
            let Some(answer) = self.prompt(&question)? else {
                return Ok(Flow::Quit);
            };
            delete_image = is_affirmative(&answer);
        }

        let removed = self.store.delete(id, delete_image)?;
        writeln!(
            self.output,
            "Scroll #{} has been erased from the archives.",
            removed.note.id
        )?;
        self.report_cleanup(&removed.image_cleanup)?;
        Ok(Flow::Continue)
    }

    fn show_help(&mut self) -> Result<()> {
        writeln!(self.output, "\n{}", style("=== Commands ===").bold())?;
        for (_, code, mnemonics, description) in COMMAND_TABLE {
            let label = format!("{} or {}", code, mnemonics[0]);
            writeln!(self.output, "  {:<16} - {}", label, description)?;
        }
        Ok(())
    }

    /// Prints `message` and reads one line. `None` means the input ended.
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!("End of input");
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Reads a note ID. A non-numeric answer is an error, end of input is `None`.
    fn prompt_id(&mut self, message: &str) -> Result<Option<u64>> {
        let Some(line) = self.prompt(message)? else {
            return Ok(None);
        };
        line.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| NoteError::invalid("Invalid scroll ID. Please enter a number."))
    }

    fn report(&mut self, error: &NoteError) -> Result<()> {
        writeln!(self.output, "{} {}", style("Error:").red(), error)?;
        Ok(())
    }

    fn warn(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{} {}", style("Warning:").yellow(), message)?;
        Ok(())
    }

    fn report_cleanup(&mut self, cleanup: &FileCleanup) -> Result<()> {
        match cleanup {
            FileCleanup::NotRequested => Ok(()),
            FileCleanup::Removed(path) => {
                writeln!(self.output, "Removed image file {}", path.display())?;
                Ok(())
            }
            FileCleanup::Retained(path) => self.warn(&format!(
                "Kept {}, another scroll still uses it",
                path.display()
            )),
            FileCleanup::Failed { path, message } => self.warn(&format!(
                "Could not delete {}: {}",
                path.display(),
                message
            )),
        }
    }
}

fn tag_summary(tags: &[String]) -> String {
    if tags.is_empty() {
        "none".to_string()
    } else {
        tags.join(", ")
    }
}
