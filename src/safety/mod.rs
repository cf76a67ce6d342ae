//! Safety policy and undo log
//!
//! Classifies intents by destructiveness, decides when a confirmation is
//! required, supports dry-run simulation, and keeps a bounded log of
//! completed mutating actions. An action recorded without undo data is
//! audit-only: undo must refuse it, never fabricate a reversal.

pub mod preview;

pub use preview::ActionPreview;

use crate::services::Service;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;

/// Default bound on the undo log.
pub const DEFAULT_UNDO_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SendEmail,
    DeleteEmail,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    ShareFile,
    DeleteFile,
    MoveFile,
    UploadFile,
    CreateFolder,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::SendEmail => "send_email",
            ActionType::DeleteEmail => "delete_email",
            ActionType::CreateEvent => "create_event",
            ActionType::UpdateEvent => "update_event",
            ActionType::DeleteEvent => "delete_event",
            ActionType::ShareFile => "share_file",
            ActionType::DeleteFile => "delete_file",
            ActionType::MoveFile => "move_file",
            ActionType::UploadFile => "upload_file",
            ActionType::CreateFolder => "create_folder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// A completed mutating action, possibly reversible
#[derive(Debug, Clone)]
pub struct UndoAction {
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    pub resource_id: String,
    pub service: Service,
    pub details: Map<String, Value>,
    pub undo_data: Option<Map<String, Value>>,
}

impl UndoAction {
    pub fn is_reversible(&self) -> bool {
        self.undo_data.is_some()
    }
}

/// Intents that change remote state in a way the user may regret.
/// Closed list; send_email is here because it cannot be unsent and
/// share_file because it grants access.
const DESTRUCTIVE_INTENTS: &[&str] = &[
    "delete_email",
    "delete_event",
    "delete_file",
    "move_file",
    "send_email",
    "share_file",
    "update_event",
    "update_file",
];

pub struct SafetyManager {
    dry_run: bool,
    undo_stack: VecDeque<UndoAction>,
    capacity: usize,
    internal_domain: String,
}

impl SafetyManager {
    pub fn new(dry_run: bool, internal_domain: &str) -> Self {
        Self {
            dry_run,
            undo_stack: VecDeque::new(),
            capacity: DEFAULT_UNDO_CAPACITY,
            internal_domain: internal_domain.to_lowercase(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, enabled: bool) {
        self.dry_run = enabled;
        tracing::info!(
            "dry-run mode: {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_destructive(&self, intent: &str) -> bool {
        DESTRUCTIVE_INTENTS.contains(&intent)
    }

    /// Confirmation policy: every destructive intent, plus wide email
    /// sends and file shares leaving the internal domain.
    pub fn requires_confirmation(&self, intent: &str, parameters: &Map<String, Value>) -> bool {
        if self.is_destructive(intent) {
            return true;
        }

        if intent == "send_email" {
            if let Some(recipients) = parameters.get("to").and_then(Value::as_array) {
                if recipients.len() > 3 {
                    return true;
                }
            }
        }

        if intent == "share_file" {
            if let Some(email) = parameters.get("email").and_then(Value::as_str) {
                if !email.is_empty() && !self.is_internal_email(email) {
                    return true;
                }
            }
        }

        false
    }

    fn is_internal_email(&self, email: &str) -> bool {
        email.to_lowercase().contains(&self.internal_domain)
    }

    pub fn get_risk_level(&self, intent: &str, _parameters: &Map<String, Value>) -> RiskLevel {
        match intent {
            "delete_email" | "delete_file" | "delete_event" => RiskLevel::High,
            "send_email" | "share_file" => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// Record a completed mutating action. Call only after the service
    /// call succeeded.
    pub fn record_action(
        &mut self,
        action_type: ActionType,
        resource_id: &str,
        service: Service,
        details: Map<String, Value>,
        undo_data: Option<Map<String, Value>>,
    ) {
        self.undo_stack.push_back(UndoAction {
            action_type,
            timestamp: Utc::now(),
            resource_id: resource_id.to_string(),
            service,
            details,
            undo_data,
        });
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        tracing::debug!("recorded action: {action_type} on {resource_id}");
    }

    pub fn get_last_action(&self) -> Option<&UndoAction> {
        self.undo_stack.back()
    }

    pub fn pop_last_action(&mut self) -> Option<UndoAction> {
        self.undo_stack.pop_back()
    }

    pub fn get_undo_stack(&self) -> Vec<UndoAction> {
        self.undo_stack.iter().cloned().collect()
    }

    pub fn can_undo(&self, action_type: Option<ActionType>) -> bool {
        match action_type {
            None => !self.undo_stack.is_empty(),
            Some(kind) => self.undo_stack.iter().any(|a| a.action_type == kind),
        }
    }

    pub fn clear_undo_stack(&mut self) {
        self.undo_stack.clear();
        tracing::debug!("undo stack cleared");
    }

    /// One-line human summary of what an intent would do.
    pub fn action_summary(&self, intent: &str, parameters: &Map<String, Value>) -> String {
        match intent {
            "send_email" => {
                let count = match parameters.get("to") {
                    Some(Value::Array(list)) => list.len(),
                    Some(Value::String(_)) => 1,
                    _ => 0,
                };
                let subject = parameters
                    .get("subject")
                    .and_then(Value::as_str)
                    .unwrap_or("No subject");
                format!("Send email to {count} recipient(s): '{subject}'")
            }
            "delete_email" => format!(
                "Delete email {}",
                str_param(parameters, "email_id")
            ),
            "delete_event" => format!(
                "Delete calendar event {}",
                str_param(parameters, "event_id")
            ),
            "share_file" => format!(
                "Share file {} with {} ({} access)",
                str_param(parameters, "file_id"),
                str_param(parameters, "email"),
                parameters
                    .get("role")
                    .and_then(Value::as_str)
                    .unwrap_or("reader"),
            ),
            "delete_file" => format!("Delete file {}", str_param(parameters, "file_id")),
            "create_event" => format!(
                "Create event '{}' at {}",
                parameters
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or("Untitled"),
                parameters
                    .get("start_time")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown time"),
            ),
            other => format!("Execute {other}"),
        }
    }

    /// Text block describing what a dry run would have done.
    pub fn format_dry_run_result(
        &self,
        intent: &str,
        parameters: &Map<String, Value>,
        would_affect: Option<&str>,
    ) -> String {
        let summary = self.action_summary(intent, parameters);
        let risk = self.get_risk_level(intent, parameters);

        let mut message = format!("[DRY RUN] {summary}\nRisk level: {risk}\n");
        if let Some(affected) = would_affect {
            message.push_str(&format!("Would affect: {affected}\n"));
        }
        message.push_str("No changes were made (dry-run mode active)");
        message
    }
}

fn str_param<'a>(parameters: &'a Map<String, Value>, key: &str) -> &'a str {
    parameters.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> SafetyManager {
        SafetyManager::new(false, "@example.com")
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_destructive_set() {
        let safety = manager();
        for intent in ["send_email", "delete_file", "move_file", "update_event"] {
            assert!(safety.is_destructive(intent), "{intent}");
        }
        assert!(!safety.is_destructive("search_email"));
        assert!(!safety.is_destructive("list_events"));
    }

    #[test]
    fn test_confirmation_recipient_threshold() {
        let safety = manager();
        let four = params(json!({"to": ["a@x.com", "b@x.com", "c@x.com", "d@x.com"]}));
        let three = params(json!({"to": ["a@x.com", "b@x.com", "c@x.com"]}));
        // send_email is destructive either way; the recipient rule also
        // fires on its own.
        assert!(safety.requires_confirmation("send_email", &four));
        assert!(safety.requires_confirmation("send_email", &three));

        // Isolate the recipient rule on a non-destructive intent name.
        let mut relaxed = manager();
        relaxed.set_dry_run(false);
        assert!(!relaxed.requires_confirmation("search_email", &four));
    }

    #[test]
    fn test_external_share_requires_confirmation() {
        let safety = manager();
        let external = params(json!({"file_id": "f1", "email": "x@other.org"}));
        let internal = params(json!({"file_id": "f1", "email": "x@example.com"}));
        assert!(safety.requires_confirmation("share_file", &external));
        // Internal share is still destructive, so it still confirms
        assert!(safety.requires_confirmation("share_file", &internal));
    }

    #[test]
    fn test_risk_levels() {
        let safety = manager();
        let empty = Map::new();
        assert_eq!(safety.get_risk_level("delete_file", &empty), RiskLevel::High);
        assert_eq!(safety.get_risk_level("send_email", &empty), RiskLevel::Medium);
        assert_eq!(safety.get_risk_level("list_events", &empty), RiskLevel::Low);
    }

    #[test]
    fn test_undo_stack_bounded_at_capacity() {
        let mut safety = manager();
        for i in 0..15 {
            safety.record_action(
                ActionType::SendEmail,
                &format!("msg-{i}"),
                Service::Mail,
                Map::new(),
                None,
            );
        }
        let stack = safety.get_undo_stack();
        assert_eq!(stack.len(), 10);
        // The 10 most recent, in insertion order
        assert_eq!(stack[0].resource_id, "msg-5");
        assert_eq!(stack[9].resource_id, "msg-14");
    }

    #[test]
    fn test_pop_and_can_undo() {
        let mut safety = manager();
        assert!(!safety.can_undo(None));

        safety.record_action(
            ActionType::ShareFile,
            "f1",
            Service::Drive,
            Map::new(),
            Some(Map::new()),
        );
        assert!(safety.can_undo(None));
        assert!(safety.can_undo(Some(ActionType::ShareFile)));
        assert!(!safety.can_undo(Some(ActionType::DeleteEvent)));

        let popped = safety.pop_last_action().unwrap();
        assert!(popped.is_reversible());
        assert!(!safety.can_undo(None));
    }

    #[test]
    fn test_action_without_undo_data_is_irreversible() {
        let mut safety = manager();
        safety.record_action(
            ActionType::SendEmail,
            "msg-1",
            Service::Mail,
            Map::new(),
            None,
        );
        assert!(!safety.get_last_action().unwrap().is_reversible());
    }

    #[test]
    fn test_dry_run_format() {
        let safety = manager();
        let text = safety.format_dry_run_result(
            "send_email",
            &params(json!({"to": ["a@x.com"], "subject": "Weekly"})),
            Some("1 recipient(s)"),
        );
        assert!(text.contains("[DRY RUN]"));
        assert!(text.contains("Weekly"));
        assert!(text.contains("medium"));
        assert!(text.contains("No changes were made"));
    }

    #[test]
    fn test_dry_run_toggle() {
        let mut safety = SafetyManager::new(true, "@example.com");
        assert!(safety.is_dry_run());
        safety.set_dry_run(false);
        assert!(!safety.is_dry_run());
    }
}
