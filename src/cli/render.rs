//! Text rendering for notes: the fixed-width summary table used by list and
//! search, and the full detail view.
use std::io::Write;

use chrono::{DateTime, Local, Utc};
use console::style;

use crate::{truncate_display, Note, Result};

pub const ID_WIDTH: usize = 5;
pub const TITLE_WIDTH: usize = 30;
pub const DATE_WIDTH: usize = 16;
pub const KIND_WIDTH: usize = 6;
pub const TAGS_WIDTH: usize = 24;

fn local(timestamp: &DateTime<Utc>, pattern: &str) -> String {
    timestamp.with_timezone(&Local).format(pattern).to_string()
}

/// One line per note, newest first as given
pub fn render_table(out: &mut impl Write, heading: &str, notes: &[Note]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", style(format!("=== {} ===", heading)).bold())?;
    writeln!(
        out,
        "{:<iw$} {:<tw$} {:<dw$} {:<kw$} {}",
        "ID",
        "TITLE",
        "CREATED",
        "KIND",
        "TAGS",
        iw = ID_WIDTH,
        tw = TITLE_WIDTH,
        dw = DATE_WIDTH,
        kw = KIND_WIDTH,
    )?;
    writeln!(
        out,
        "{}",
        "-".repeat(ID_WIDTH + TITLE_WIDTH + DATE_WIDTH + KIND_WIDTH + TAGS_WIDTH + 4)
    )?;

    for note in notes {
        writeln!(
            out,
            "{:<iw$} {:<tw$} {:<dw$} {:<kw$} {}",
            note.id,
            truncate_display(&note.title, TITLE_WIDTH),
            local(&note.created_at, "%Y-%m-%d %H:%M"),
            note.kind().to_string(),
            truncate_display(&note.tags.join(", "), TAGS_WIDTH),
            iw = ID_WIDTH,
            tw = TITLE_WIDTH,
            dw = DATE_WIDTH,
            kw = KIND_WIDTH,
        )?;
    }

    writeln!(
        out,
        "\n{} scroll{}",
        notes.len(),
        if notes.len() == 1 { "" } else { "s" }
    )?;
    Ok(())
}

/// Every field of a note, including full content or the image path
pub fn render_detail(out: &mut impl Write, note: &Note) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        style(format!("=== Scroll #{} ===", note.id)).bold()
    )?;
    writeln!(out, "Title:   {}", note.title)?;
    writeln!(out, "Type:    {}", note.kind())?;
    writeln!(out, "Created: {}", local(&note.created_at, "%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Updated: {}", local(&note.updated_at, "%Y-%m-%d %H:%M:%S"))?;

    if note.tags.is_empty() {
        writeln!(out, "Tags:    none")?;
    } else {
        writeln!(out, "Tags:    {}", style(note.tags.join(", ")).cyan())?;
    }

    match (note.content(), note.image_path()) {
        (Some(content), _) => writeln!(out, "\nContent:\n{}", content)?,
        (None, Some(path)) => writeln!(out, "\nImage:   {}", path.display())?,
        (None, None) => {}
    }
    Ok(())
}
