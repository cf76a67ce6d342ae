//! Renders pending actions for the confirmation prompt.

use serde_json::{Map, Value};

pub struct ActionPreview;

impl ActionPreview {
    pub fn preview_email(parameters: &Map<String, Value>) -> String {
        let recipients = match parameters.get("to") {
            Some(Value::Array(list)) => list
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            Some(Value::String(addr)) => addr.clone(),
            _ => "(none)".to_string(),
        };
        let subject = parameters
            .get("subject")
            .and_then(Value::as_str)
            .unwrap_or("(no subject)");
        let body = parameters
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or("");
        let body_preview: String = if body.chars().count() > 200 {
            let truncated: String = body.chars().take(200).collect();
            format!("{truncated}...")
        } else {
            body.to_string()
        };

        let mut out = format!("To: {recipients}\nSubject: {subject}\n");
        if let Some(cc) = parameters.get("cc").and_then(Value::as_array) {
            if !cc.is_empty() {
                let cc_list = cc
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("Cc: {cc_list}\n"));
            }
        }
        out.push_str(&format!("\n{body_preview}"));
        out
    }

    pub fn preview_event(parameters: &Map<String, Value>) -> String {
        let summary = parameters
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("Untitled event");
        let start = parameters
            .get("start_time")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let end = parameters
            .get("end_time")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let mut out = format!("Event: {summary}\nStart: {start}\nEnd: {end}\n");
        if let Some(location) = parameters.get("location").and_then(Value::as_str) {
            out.push_str(&format!("Location: {location}\n"));
        }
        if let Some(attendees) = parameters.get("attendees").and_then(Value::as_array) {
            if !attendees.is_empty() {
                let list = attendees
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push_str(&format!("Attendees: {list}\n"));
            }
        }
        out
    }

    pub fn preview_file_share(parameters: &Map<String, Value>) -> String {
        let file = parameters
            .get("file_name")
            .or_else(|| parameters.get("file_id"))
            .and_then(Value::as_str)
            .unwrap_or("unknown file");
        let email = parameters
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or("unknown recipient");
        let role = parameters
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or("reader");
        format!("Share '{file}' with {email} as {role}")
    }

    pub fn preview_deletion(intent: &str, parameters: &Map<String, Value>) -> String {
        let (kind, key) = match intent {
            "delete_email" => ("email", "email_id"),
            "delete_event" => ("calendar event", "event_id"),
            "delete_file" => ("file", "file_id"),
            _ => ("item", "id"),
        };
        let id = parameters
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        format!("Permanently delete {kind} {id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_email_preview_truncates_long_body() {
        let body = "x".repeat(300);
        let preview = ActionPreview::preview_email(&params(json!({
            "to": ["a@x.com"],
            "subject": "Hello",
            "body": body,
        })));
        assert!(preview.contains("To: a@x.com"));
        assert!(preview.contains("..."));
        assert!(preview.len() < 300);
    }

    #[test]
    fn test_event_preview_includes_attendees() {
        let preview = ActionPreview::preview_event(&params(json!({
            "summary": "Standup",
            "start_time": "2026-09-01T09:00:00Z",
            "end_time": "2026-09-01T09:15:00Z",
            "attendees": ["a@x.com", "b@x.com"],
        })));
        assert!(preview.contains("Standup"));
        assert!(preview.contains("a@x.com, b@x.com"));
    }

    #[test]
    fn test_deletion_preview() {
        let preview =
            ActionPreview::preview_deletion("delete_file", &params(json!({"file_id": "f9"})));
        assert_eq!(preview, "Permanently delete file f9");
    }
}
