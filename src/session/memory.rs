//! Per-session conversational memory
//!
//! Holds the append-only command history plus the derived reference cache
//! that powers pronoun and deixis resolution. References are a cache over
//! history, never independently authoritative: every update flows through
//! `add_command` (or an explicit inference write for `next_meeting`).

use crate::services::Service;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One attempted top-level command, never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    pub service: Service,
    pub intent: String,
    pub parameters: Map<String, Value>,
    pub result: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
}

/// Conversational state for one authenticated session
#[derive(Debug, Clone)]
pub struct SessionMemory {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    history: Vec<CommandRecord>,
    references: HashMap<String, Value>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            started_at: now,
            last_active: now,
            history: Vec::new(),
            references: HashMap::new(),
        }
    }

    /// Append a command record and refresh the reference cache.
    #[allow(clippy::too_many_arguments)]
    pub fn add_command(
        &mut self,
        command: &str,
        service: Service,
        intent: &str,
        parameters: Map<String, Value>,
        result: Option<Value>,
        success: bool,
        error: Option<String>,
    ) {
        let record = CommandRecord {
            command: command.to_string(),
            timestamp: Utc::now(),
            service,
            intent: intent.to_string(),
            parameters,
            result,
            success,
            error,
        };
        self.update_references(&record);
        self.history.push(record);
        self.last_active = Utc::now();
    }

    fn update_references(&mut self, record: &CommandRecord) {
        if let Ok(as_value) = serde_json::to_value(record) {
            self.references
                .insert(format!("last_{}_command", record.service), as_value.clone());
            self.references.insert("last_command".into(), as_value);
        }

        if !record.success {
            return;
        }
        let Some(result) = record.result.as_ref().filter(|r| !r.is_null()) else {
            return;
        };

        // Kind-specific slots for the designated (service, intent) pairs.
        // Sequence results also pin their first element.
        match (record.service, record.intent.as_str()) {
            (Service::Mail, "search_email") => {
                self.references.insert("last_emails".into(), result.clone());
                if let Some(first) = first_element(result) {
                    self.references.insert("last_email".into(), first);
                }
            }
            (Service::Mail, "send_email") => {
                self.references
                    .insert("last_sent_email".into(), result.clone());
            }
            (Service::Calendar, "list_events" | "search_event") => {
                self.references.insert("last_events".into(), result.clone());
                if let Some(first) = first_element(result) {
                    self.references.insert("last_event".into(), first.clone());
                    self.references.insert("next_meeting".into(), first);
                }
            }
            (Service::Calendar, "create_event") => {
                self.references
                    .insert("last_created_event".into(), result.clone());
            }
            (Service::Drive, "search_file") => {
                self.references.insert("last_files".into(), result.clone());
                if let Some(first) = first_element(result) {
                    self.references.insert("last_file".into(), first);
                }
            }
            _ => {}
        }
    }

    pub fn get_last_command(&self) -> Option<&CommandRecord> {
        self.history.last()
    }

    pub fn get_last_n_commands(&self, n: usize) -> &[CommandRecord] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn history(&self) -> &[CommandRecord] {
        &self.history
    }

    pub fn get_reference(&self, key: &str) -> Option<&Value> {
        self.references.get(key)
    }

    /// Direct reference write, used when inference materializes an entity
    /// outside the add_command path.
    pub fn set_reference(&mut self, key: &str, value: Value) {
        self.references.insert(key.to_string(), value);
        self.last_active = Utc::now();
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Short textual summary of recent activity for prompts and the CLI.
    pub fn context_summary(&self) -> String {
        if self.history.is_empty() {
            return "No previous commands in this session.".into();
        }
        let mut parts = vec!["Recent commands:".to_string()];
        for (i, cmd) in self.get_last_n_commands(3).iter().enumerate() {
            let status = if cmd.success { "ok" } else { "failed" };
            parts.push(format!(
                "{}. [{}] [{}] {}: {}",
                i + 1,
                status,
                cmd.service,
                cmd.intent,
                cmd.command
            ));
        }
        let available: Vec<&str> = ["last_email", "next_meeting", "last_file"]
            .into_iter()
            .filter(|key| self.references.contains_key(*key))
            .collect();
        if !available.is_empty() {
            parts.push(format!("Available references: {}", available.join(", ")));
        }
        parts.join("\n")
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.references.clear();
    }
}

/// First element of a sequence result, if any.
/// A mapping result (single entity) has no "first element".
fn first_element(result: &Value) -> Option<Value> {
    result.as_array().and_then(|items| items.first().cloned())
}
