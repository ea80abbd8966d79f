use chrono::{DateTime, Local, Utc};

/// Marker appended to values cut down for display
pub const ELLIPSIS: &str = "...";

// Helper method for parsing tags
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Cuts `value` to at most `width` characters, ending in [`ELLIPSIS`] when
/// anything was dropped. Counts chars, not bytes.
pub fn truncate_display(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= ELLIPSIS.len() {
        return value.chars().take(width).collect();
    }
    let kept: String = value.chars().take(width - ELLIPSIS.len()).collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// Accepts `y` or `yes` in any case; everything else is a refusal.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// File name for a capture taken at `at` for note `id`
pub fn capture_file_name(at: DateTime<Utc>, id: u64) -> String {
    format!(
        "scroll_capture_{}_{}.png",
        at.with_timezone(&Local).format("%Y%m%d_%H%M%S"),
        id
    )
}
