//! Derived display strings for the chat sidebar
//!
//! Everything here is pure string/date shaping: titles, previews and
//! relative timestamps are computed fresh on every draw, never stored.

use chrono::{DateTime, Utc};

use super::Conversation;
use crate::docs::DocumentLibrary;

/// Character budget for sidebar titles
pub const TITLE_MAX_CHARS: usize = 32;
/// Character budget for sidebar preview lines
pub const PREVIEW_MAX_CHARS: usize = 48;
/// How many document names appear in an auto-derived title
const AUTO_NAME_DOCS: usize = 2;

/// Title shown when a conversation has no name and no usable document links
pub const UNTITLED: &str = "New chat";
/// Preview shown for conversations with an empty message history
pub const EMPTY_PREVIEW: &str = "No messages yet";

/// Shorten to at most `max_chars` characters, ellipsis included.
/// Counts characters rather than bytes so multibyte names never split.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars - 1).collect();
    shortened.push('…');
    shortened
}

/// Compose a title from the conversation's linked documents. Dangling
/// links (ids with no matching document) are skipped; if nothing usable
/// remains the caller falls back to [`UNTITLED`].
pub fn auto_name(conversation: &Conversation, documents: &DocumentLibrary) -> Option<String> {
    let names: Vec<&str> = conversation
        .document_ids
        .iter()
        .filter_map(|id| documents.get(id))
        .map(|document| document.name.as_str())
        .collect();

    if names.is_empty() {
        return None;
    }

    let mut title = names
        .iter()
        .take(AUTO_NAME_DOCS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > AUTO_NAME_DOCS {
        title.push_str(&format!(" +{}", names.len() - AUTO_NAME_DOCS));
    }
    Some(title)
}

/// The sidebar title: explicit name first, then document-derived,
/// then the untitled fallback. Always truncated to the title budget.
pub fn display_title(conversation: &Conversation, documents: &DocumentLibrary) -> String {
    let name = conversation.name.trim();
    if !name.is_empty() {
        return truncate(name, TITLE_MAX_CHARS);
    }
    match auto_name(conversation, documents) {
        Some(title) => truncate(&title, TITLE_MAX_CHARS),
        None => UNTITLED.to_string(),
    }
}

/// One-line preview of the newest message. Internal whitespace collapses
/// so multi-line replies stay on a single sidebar row.
pub fn preview_line(conversation: &Conversation) -> String {
    let Some(message) = conversation.messages.last() else {
        return EMPTY_PREVIEW.to_string();
    };
    let collapsed = message.content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return EMPTY_PREVIEW.to_string();
    }
    truncate(&collapsed, PREVIEW_MAX_CHARS)
}

/// Bucketed age of a timestamp: "just now", minutes, hours, days,
/// then an absolute date once it is a week old. Future timestamps
/// (clock skew between machines) clamp to "just now".
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp);

    if age.num_seconds() < 60 {
        "just now".to_string()
    } else if age.num_minutes() < 60 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_hours() < 24 {
        format!("{}h ago", age.num_hours())
    } else if age.num_days() < 7 {
        format!("{}d ago", age.num_days())
    } else {
        timestamp.format("%b %-d, %Y").to_string()
    }
}
