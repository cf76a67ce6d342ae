//! Deictic reference resolution
//!
//! Maps phrases like "that email", "next meeting" or a bare "it" to the
//! entity currently held in session memory. Resolution is a prioritized
//! case-insensitive substring match, pure over a memory snapshot; no match
//! (or an empty slot) is simply `None`, never an error.

use crate::services::Service;
use crate::session::memory::SessionMemory;
use serde_json::Value;

/// What kind of entity a reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Email,
    Event,
    File,
    /// A positional pick out of the last command's result sequence
    Item(Service),
}

const EMAIL_PHRASES: &[&str] = &["that email", "the email", "this email", "last email"];
const MEETING_PHRASES: &[&str] = &["that meeting", "the meeting", "this meeting"];
const NEXT_MEETING_PHRASES: &[&str] = &["next meeting", "upcoming meeting"];
const FILE_PHRASES: &[&str] = &["that file", "the file", "this file"];

/// Resolve a deictic phrase against session memory
pub fn resolve_reference(memory: &SessionMemory, text: &str) -> Option<(RefKind, Value)> {
    let text_lower = text.to_lowercase();

    if EMAIL_PHRASES.iter().any(|p| text_lower.contains(p)) {
        return slot(memory, "last_email", RefKind::Email);
    }

    if MEETING_PHRASES.iter().any(|p| text_lower.contains(p)) {
        return slot(memory, "last_event", RefKind::Event);
    }

    if NEXT_MEETING_PHRASES.iter().any(|p| text_lower.contains(p)) {
        return slot(memory, "next_meeting", RefKind::Event);
    }

    if FILE_PHRASES.iter().any(|p| text_lower.contains(p)) {
        return slot(memory, "last_file", RefKind::File);
    }

    // A bare pronoun picks the entity kind from the last command's service.
    if matches!(text_lower.as_str(), "it" | "that" | "this") {
        let last = memory.get_last_command()?;
        return match last.service {
            Service::Mail => slot(memory, "last_email", RefKind::Email),
            Service::Calendar => slot(memory, "last_event", RefKind::Event),
            Service::Drive => slot(memory, "last_file", RefKind::File),
        };
    }

    if text_lower.contains("first") {
        return positional(memory, 0);
    }
    if text_lower.contains("second") {
        return positional(memory, 1);
    }

    None
}

fn slot(memory: &SessionMemory, key: &str, kind: RefKind) -> Option<(RefKind, Value)> {
    memory.get_reference(key).map(|v| (kind, v.clone()))
}

/// "first one" / "second one" index into the last result sequence,
/// only when that result is a sequence and the index exists.
fn positional(memory: &SessionMemory, index: usize) -> Option<(RefKind, Value)> {
    let last = memory.get_last_command()?;
    let items = last.result.as_ref()?.as_array()?;
    items
        .get(index)
        .map(|item| (RefKind::Item(last.service), item.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn memory_after_search(service: Service, intent: &str, result: Value) -> SessionMemory {
        let mut memory = SessionMemory::new("test");
        memory.add_command("cmd", service, intent, Map::new(), Some(result), true, None);
        memory
    }

    #[test]
    fn test_email_phrase_resolves_last_email() {
        let memory = memory_after_search(
            Service::Mail,
            "search_email",
            json!([{"id": "m1"}, {"id": "m2"}]),
        );
        let (kind, value) = resolve_reference(&memory, "delete that email").unwrap();
        assert_eq!(kind, RefKind::Email);
        assert_eq!(value["id"], "m1");
    }

    #[test]
    fn test_bare_pronoun_follows_last_service() {
        let memory = memory_after_search(Service::Drive, "search_file", json!([{"id": "f1"}]));
        let (kind, value) = resolve_reference(&memory, "it").unwrap();
        assert_eq!(kind, RefKind::File);
        assert_eq!(value["id"], "f1");
    }

    #[test]
    fn test_positional_second_one() {
        let memory = memory_after_search(
            Service::Mail,
            "search_email",
            json!([{"id": "m1"}, {"id": "m2"}]),
        );
        let (kind, value) = resolve_reference(&memory, "read the second one").unwrap();
        assert_eq!(kind, RefKind::Item(Service::Mail));
        assert_eq!(value["id"], "m2");
    }

    #[test]
    fn test_positional_out_of_bounds() {
        let memory = memory_after_search(Service::Mail, "search_email", json!([{"id": "m1"}]));
        assert!(resolve_reference(&memory, "the second one").is_none());
    }

    #[test]
    fn test_no_match_yields_none() {
        let memory = SessionMemory::new("test");
        assert!(resolve_reference(&memory, "send a status update").is_none());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let memory = memory_after_search(
            Service::Calendar,
            "list_events",
            json!([{"id": "e1", "summary": "Standup"}]),
        );
        let first = resolve_reference(&memory, "cancel the meeting");
        let second = resolve_reference(&memory, "cancel the meeting");
        assert_eq!(first.as_ref().map(|(k, _)| *k), second.as_ref().map(|(k, _)| *k));
        assert_eq!(
            first.map(|(_, v)| v),
            second.map(|(_, v)| v)
        );
    }
}
