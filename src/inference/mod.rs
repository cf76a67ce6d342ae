//! Context-aware parameter inference
//!
//! Augments a partially-specified intent's parameters from session memory
//! and light text heuristics, with read-only service lookups to
//! materialize references like "next meeting" or "last email from X".
//! Every rule degrades independently: a failed lookup is logged and
//! swallowed, never escalated, because the worst case is simply "no
//! enrichment for that rule".

use crate::services::{CalendarService, MailService};
use crate::session::SessionMemory;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::{Arc, OnceLock};

const EVENT_INTENTS: &[&str] = &["search_event", "update_event", "delete_event", "list_events"];
const MAIL_INTENTS: &[&str] = &["send_email", "read_email", "delete_email", "search_email"];

fn days_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last\s+(\d+)\s+days?").expect("static pattern"))
}

fn weeks_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last\s+(\d+)\s+weeks?").expect("static pattern"))
}

fn months_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"last\s+(\d+)\s+months?").expect("static pattern"))
}

pub struct ParameterInference {
    mail: Option<Arc<dyn MailService>>,
    calendar: Option<Arc<dyn CalendarService>>,
}

impl ParameterInference {
    pub fn new(
        mail: Option<Arc<dyn MailService>>,
        calendar: Option<Arc<dyn CalendarService>>,
    ) -> Self {
        Self { mail, calendar }
    }

    /// Enrich `parameters` for the given command and intent.
    ///
    /// Mutates nothing remote; the only writes are into the returned map
    /// and the session's `next_meeting` reference when a lookup
    /// materializes one.
    pub async fn infer_parameters(
        &self,
        memory: &mut SessionMemory,
        command: &str,
        intent: &str,
        parameters: Map<String, Value>,
    ) -> Map<String, Value> {
        let command_lower = command.to_lowercase();
        let mut params = parameters;

        if EVENT_INTENTS.contains(&intent) {
            params = self.infer_meeting_params(memory, &command_lower, params).await;
        }
        if MAIL_INTENTS.contains(&intent) {
            params = self.infer_mail_params(&command_lower, params).await;
        }
        if intent == "send_email" && command_lower.contains("attendees") {
            params = infer_attendees(memory, &command_lower, params);
        }
        resolve_pronouns(memory, &command_lower, intent, params)
    }

    async fn infer_meeting_params(
        &self,
        memory: &mut SessionMemory,
        command: &str,
        mut params: Map<String, Value>,
    ) -> Map<String, Value> {
        if command.contains("next meeting") || command.contains("upcoming meeting") {
            if let Some(calendar) = &self.calendar {
                match calendar.list(7, 1).await {
                    Ok(events) => {
                        if let Some(next_event) = events.first() {
                            tracing::info!(
                                "inferred next meeting: {}",
                                next_event["summary"].as_str().unwrap_or("?")
                            );
                            memory.set_reference("next_meeting", next_event.clone());
                            params.insert("inferred_event".into(), next_event.clone());
                            if let Some(id) = next_event.get("id") {
                                params.insert("event_id".into(), id.clone());
                            }
                            if let Some(summary) = next_event.get("summary") {
                                params.insert("summary".into(), summary.clone());
                            }
                        }
                    }
                    Err(e) => tracing::warn!("failed to infer next meeting: {e}"),
                }
            }
        }

        // Coarse date windows
        if command.contains("today") && command.contains("meeting") {
            params.insert("days".into(), json!(1));
        } else if command.contains("this week") {
            params.insert("days".into(), json!(7));
        } else if command.contains("next week") {
            params.insert("days".into(), json!(14));
        }

        params
    }

    async fn infer_mail_params(
        &self,
        command: &str,
        mut params: Map<String, Value>,
    ) -> Map<String, Value> {
        if command.contains("last email") && command.contains("from") {
            if let Some(sender) = sender_after_from(command) {
                if let Some(mail) = &self.mail {
                    match mail.search(&format!("from:{sender}"), 1).await {
                        Ok(emails) => {
                            if let Some(last_email) = emails.first() {
                                tracing::info!("inferred last email from {sender}");
                                params.insert("inferred_email".into(), last_email.clone());
                                if let Some(id) = last_email.get("id") {
                                    params.insert("email_id".into(), id.clone());
                                }
                            }
                        }
                        Err(e) => tracing::warn!("failed to infer last email: {e}"),
                    }
                }
            }
        }

        if command.contains("unread") {
            append_query_token(&mut params, "is:unread");
        }
        if command.contains("important") || command.contains("priority") {
            append_query_token(&mut params, "is:important");
        }

        let days_match = days_pattern().captures(command);
        if let Some(days) = capture_number(&days_match) {
            append_query_token(&mut params, &format!("newer_than:{days}d"));
        }
        let weeks_match = weeks_pattern().captures(command);
        if let Some(weeks) = capture_number(&weeks_match) {
            append_query_token(&mut params, &format!("newer_than:{}d", weeks * 7));
        }
        let months_match = months_pattern().captures(command);
        if let Some(months) = capture_number(&months_match) {
            append_query_token(&mut params, &format!("newer_than:{}d", months * 30));
        }

        // Bare "last week"/"last month" only when no numeric form matched.
        if command.contains("last week") && weeks_match.is_none() {
            append_query_token(&mut params, "newer_than:7d");
        }
        if command.contains("last month") && months_match.is_none() {
            append_query_token(&mut params, "newer_than:30d");
        }

        params
    }

    /// Read-only probes that produce proactive suggestion strings.
    pub async fn smart_suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();

        if let Some(mail) = &self.mail {
            if let Ok(unread) = mail.search("is:unread", 1).await {
                if !unread.is_empty() {
                    suggestions.push("You have unread emails".into());
                }
            }
        }

        if let Some(calendar) = &self.calendar {
            if let Ok(events) = calendar.list(1, 1).await {
                if let Some(next_event) = events.first() {
                    let summary = next_event["summary"].as_str().unwrap_or("Meeting");
                    suggestions.push(format!("Upcoming: {summary}"));
                }
            }
        }

        suggestions
    }
}

/// The word right after "from " in the command, if any.
fn sender_after_from(command: &str) -> Option<String> {
    let from_idx = command.find("from")?;
    let tail = command[from_idx + 4..].trim_start();
    tail.split_whitespace().next().map(String::from)
}

fn capture_number(captures: &Option<regex::Captures<'_>>) -> Option<u32> {
    captures
        .as_ref()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Append a filter token to the query parameter. Tokens are additive,
/// space-joined; an existing query is never replaced.
fn append_query_token(params: &mut Map<String, Value>, token: &str) {
    let existing = params
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.is_empty());
    let query = match existing {
        Some(q) => format!("{q} {token}"),
        None => token.to_string(),
    };
    params.insert("query".into(), json!(query));
}

fn infer_attendees(
    memory: &SessionMemory,
    command: &str,
    mut params: Map<String, Value>,
) -> Map<String, Value> {
    let mut attendees: Vec<String> = Vec::new();

    if command.contains("meeting attendees") || command.contains("event attendees") {
        if let Some(event) = event_reference(memory) {
            attendees = attendee_emails(&event);
            tracing::info!("inferred {} attendees from event", attendees.len());
        }
    } else if command.contains("the attendees") || command.contains("all attendees") {
        // Flatten every event in the most recent calendar result.
        if let Some(last) = memory.get_last_command() {
            if last.service == crate::services::Service::Calendar {
                if let Some(events) = last.result.as_ref().and_then(Value::as_array) {
                    for event in events {
                        attendees.extend(attendee_emails(event));
                    }
                    tracing::info!(
                        "inferred {} attendees from last calendar command",
                        attendees.len()
                    );
                }
            }
        }
    }

    if attendees.is_empty() {
        return params;
    }

    let merged = match params.get("to") {
        None | Some(Value::Null) => attendees,
        Some(Value::Array(existing)) => {
            let mut to: Vec<String> = existing
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
            to.extend(attendees);
            to
        }
        Some(Value::String(s)) if s.is_empty() => attendees,
        Some(single) => {
            let mut to = vec![single.as_str().unwrap_or_default().to_string()];
            to.extend(attendees);
            to
        }
    };
    params.insert("to".into(), json!(merged));
    params.insert("inferred_attendees".into(), json!(true));
    params
}

fn resolve_pronouns(
    memory: &SessionMemory,
    command: &str,
    intent: &str,
    mut params: Map<String, Value>,
) -> Map<String, Value> {
    let padded = format!(" {command} ");
    let has_pronoun = matches!(command, "it" | "that" | "this")
        || padded.contains(" it ")
        || padded.contains(" that ")
        || padded.contains(" this ");

    if has_pronoun {
        match intent {
            "share_file" | "download_file" | "delete_file" => {
                if let Some(file) = memory.get_reference("last_file").cloned() {
                    if let Some(id) = file.get("id") {
                        params.insert("file_id".into(), id.clone());
                    }
                    tracing::info!(
                        "resolved pronoun to file: {}",
                        file["name"].as_str().unwrap_or("?")
                    );
                    params.insert("inferred_file".into(), file);
                }
            }
            "read_email" | "delete_email" => {
                if let Some(email) = memory.get_reference("last_email").cloned() {
                    if let Some(id) = email.get("id") {
                        params.insert("email_id".into(), id.clone());
                    }
                    params.insert("inferred_email".into(), email);
                }
            }
            "update_event" | "delete_event" => {
                if let Some(event) = memory.get_reference("last_event").cloned() {
                    if let Some(id) = event.get("id") {
                        params.insert("event_id".into(), id.clone());
                    }
                    params.insert("inferred_event".into(), event);
                }
            }
            _ => {}
        }
    }

    if padded.contains(" them ") || command.starts_with("them") {
        if let Some(event) = event_reference(memory) {
            let attendees = attendee_emails(&event);
            if !attendees.is_empty() {
                if intent == "send_email" {
                    tracing::info!("resolved 'them' to {} attendees", attendees.len());
                    params.insert("to".into(), json!(attendees));
                } else if intent == "share_file" {
                    tracing::info!("resolved 'them' to {} attendees for sharing", attendees.len());
                    let first = json!(attendees[0].clone());
                    params.insert(
                        "email".into(),
                        if attendees.len() == 1 { first } else { json!(attendees) },
                    );
                    params.insert("emails".into(), json!(attendees));
                }
            }
        }
    }

    params
}

/// `next_meeting` wins over `last_event` when both are set.
fn event_reference(memory: &SessionMemory) -> Option<Value> {
    memory
        .get_reference("next_meeting")
        .or_else(|| memory.get_reference("last_event"))
        .cloned()
}

fn attendee_emails(event: &Value) -> Vec<String> {
    event["attendees"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|a| a["email"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::{MockCalendarService, MockMailService};
    use crate::services::Service;

    fn engine_with_calendar(events: Vec<Value>) -> ParameterInference {
        ParameterInference::new(None, Some(Arc::new(MockCalendarService::with_events(events))))
    }

    fn bare_engine() -> ParameterInference {
        ParameterInference::new(None, None)
    }

    #[tokio::test]
    async fn test_this_week_sets_seven_days() {
        let mut memory = SessionMemory::new("t");
        let params = bare_engine()
            .infer_parameters(&mut memory, "show meetings this week", "list_events", Map::new())
            .await;
        assert_eq!(params["days"], json!(7));
    }

    #[tokio::test]
    async fn test_today_sets_one_day() {
        let mut memory = SessionMemory::new("t");
        let params = bare_engine()
            .infer_parameters(&mut memory, "show today's meetings", "list_events", Map::new())
            .await;
        assert_eq!(params["days"], json!(1));
    }

    #[tokio::test]
    async fn test_next_meeting_lookup_sets_event_and_reference() {
        let engine = engine_with_calendar(vec![json!({
            "id": "e1",
            "summary": "Planning",
            "attendees": [{"email": "a@b.com"}],
        })]);
        let mut memory = SessionMemory::new("t");
        let params = engine
            .infer_parameters(&mut memory, "cancel my next meeting", "delete_event", Map::new())
            .await;
        assert_eq!(params["event_id"], "e1");
        assert_eq!(params["summary"], "Planning");
        assert!(params.contains_key("inferred_event"));
        assert_eq!(memory.get_reference("next_meeting").unwrap()["id"], "e1");
    }

    #[tokio::test]
    async fn test_unread_important_tokens_additive() {
        let mut memory = SessionMemory::new("t");
        let params = bare_engine()
            .infer_parameters(
                &mut memory,
                "show unread important emails",
                "search_email",
                Map::new(),
            )
            .await;
        let query = params["query"].as_str().unwrap();
        assert!(query.contains("is:unread"));
        assert!(query.contains("is:important"));
    }

    #[tokio::test]
    async fn test_tokens_never_replace_existing_query() {
        let mut memory = SessionMemory::new("t");
        let mut initial = Map::new();
        initial.insert("query".into(), json!("project alpha"));
        let params = bare_engine()
            .infer_parameters(&mut memory, "unread emails about this", "search_email", initial)
            .await;
        let query = params["query"].as_str().unwrap();
        assert!(query.starts_with("project alpha"));
        assert!(query.contains("is:unread"));
    }

    #[tokio::test]
    async fn test_numeric_date_window() {
        let mut memory = SessionMemory::new("t");
        let params = bare_engine()
            .infer_parameters(
                &mut memory,
                "emails from the last 3 weeks",
                "search_email",
                Map::new(),
            )
            .await;
        assert!(params["query"].as_str().unwrap().contains("newer_than:21d"));
    }

    #[tokio::test]
    async fn test_bare_last_week_only_without_numeric() {
        let mut memory = SessionMemory::new("t");
        let params = bare_engine()
            .infer_parameters(&mut memory, "emails from last week", "search_email", Map::new())
            .await;
        assert_eq!(params["query"], json!("newer_than:7d"));
    }

    #[tokio::test]
    async fn test_last_email_from_sender_lookup() {
        let mail = Arc::new(MockMailService::with_messages(vec![
            json!({"id": "m9", "from": "alice@example.com"}),
        ]));
        let engine = ParameterInference::new(Some(mail), None);
        let mut memory = SessionMemory::new("t");
        let params = engine
            .infer_parameters(
                &mut memory,
                "delete the last email from alice",
                "delete_email",
                Map::new(),
            )
            .await;
        assert_eq!(params["email_id"], "m9");
        assert!(params.contains_key("inferred_email"));
    }

    #[tokio::test]
    async fn test_pronoun_resolves_file_id() {
        let mut memory = SessionMemory::new("t");
        memory.add_command(
            "find the report",
            Service::Drive,
            "search_file",
            Map::new(),
            Some(json!([{"id": "f1", "name": "report"}])),
            true,
            None,
        );
        let mut initial = Map::new();
        initial.insert("email".into(), json!("x@y.com"));
        let params = bare_engine()
            .infer_parameters(&mut memory, "share it with x@y.com", "share_file", initial)
            .await;
        assert_eq!(params["file_id"], "f1");
        assert_eq!(params["email"], "x@y.com");
    }

    #[tokio::test]
    async fn test_them_resolves_attendees_for_send() {
        let mut memory = SessionMemory::new("t");
        memory.set_reference(
            "next_meeting",
            json!({"id": "e1", "attendees": [{"email": "a@b.com"}, {"email": "c@d.com"}]}),
        );
        let params = bare_engine()
            .infer_parameters(&mut memory, "send them the agenda", "send_email", Map::new())
            .await;
        assert_eq!(params["to"], json!(["a@b.com", "c@d.com"]));
    }

    #[tokio::test]
    async fn test_meeting_attendees_appended_to_existing_to() {
        let mut memory = SessionMemory::new("t");
        memory.set_reference(
            "next_meeting",
            json!({"attendees": [{"email": "a@b.com"}]}),
        );
        let mut initial = Map::new();
        initial.insert("to".into(), json!(["boss@example.com"]));
        let params = bare_engine()
            .infer_parameters(
                &mut memory,
                "email the meeting attendees",
                "send_email",
                initial,
            )
            .await;
        assert_eq!(params["to"], json!(["boss@example.com", "a@b.com"]));
        assert_eq!(params["inferred_attendees"], json!(true));
    }

    #[tokio::test]
    async fn test_all_attendees_flattened_from_last_calendar_command() {
        let mut memory = SessionMemory::new("t");
        memory.add_command(
            "list events",
            Service::Calendar,
            "list_events",
            Map::new(),
            Some(json!([
                {"id": "e1", "attendees": [{"email": "a@b.com"}]},
                {"id": "e2", "attendees": [{"email": "c@d.com"}, {"email": "e@f.com"}]},
            ])),
            true,
            None,
        );
        let params = bare_engine()
            .infer_parameters(&mut memory, "email all attendees", "send_email", Map::new())
            .await;
        assert_eq!(params["to"], json!(["a@b.com", "c@d.com", "e@f.com"]));
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_quietly() {
        let calendar = Arc::new(MockCalendarService::new());
        calendar.fail_next();
        let engine = ParameterInference::new(None, Some(calendar));
        let mut memory = SessionMemory::new("t");
        let params = engine
            .infer_parameters(&mut memory, "update my next meeting", "update_event", Map::new())
            .await;
        // No enrichment, no error
        assert!(!params.contains_key("event_id"));
    }

    #[tokio::test]
    async fn test_smart_suggestions() {
        let mail = Arc::new(MockMailService::with_messages(vec![
            json!({"id": "m1", "unread": true}),
        ]));
        let calendar = Arc::new(MockCalendarService::with_events(vec![
            json!({"id": "e1", "summary": "Review"}),
        ]));
        let engine = ParameterInference::new(Some(mail), Some(calendar));
        let suggestions = engine.smart_suggestions().await;
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[1].contains("Review"));
    }
}
