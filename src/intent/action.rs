//! Typed actions
//!
//! The LLM boundary hands us an open string-keyed parameter map; call
//! sites historically spelled the same thing several ways (`to` vs
//! `emails`, `email` vs `emails`, `file_id` vs `items`). This module
//! normalizes that slop into one tagged variant per supported
//! (service, intent) pair, so dispatch works on concrete fields.
//! Missing required parameters surface here, before anything executes.

use crate::core::error::{OrchestraError, Result};
use crate::services::Service;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceAction {
    // Mail
    SendEmail {
        to: Vec<String>,
        subject: String,
        body: String,
        cc: Vec<String>,
    },
    SearchEmail {
        query: String,
    },
    ReadEmail {
        email_id: String,
    },
    DeleteEmail {
        email_id: String,
    },

    // Calendar
    CreateEvent {
        summary: String,
        start_time: String,
        end_time: Option<String>,
        description: Option<String>,
        location: Option<String>,
        attendees: Vec<String>,
    },
    ListEvents {
        days: i64,
    },
    SearchEvent {
        query: String,
    },
    UpdateEvent {
        event_id: String,
        changes: Map<String, Value>,
    },
    DeleteEvent {
        event_id: String,
    },

    // Drive
    SearchFile {
        query: String,
        mime_type: Option<String>,
    },
    UploadFile {
        local_path: String,
        name: Option<String>,
        folder_id: Option<String>,
    },
    DownloadFile {
        file_id: String,
    },
    ShareFile {
        file_ids: Vec<String>,
        emails: Vec<String>,
        role: String,
    },
    CreateFolder {
        name: String,
        parent_id: Option<String>,
    },
    DeleteFile {
        file_id: String,
    },
    MoveFile {
        file_id: String,
        folder_id: String,
    },
    ListRecentFiles,
}

impl ServiceAction {
    /// Validate and normalize an open parameter map into a typed action.
    pub fn from_intent(service: Service, name: &str, params: &Map<String, Value>) -> Result<Self> {
        match (service, name) {
            (Service::Mail, "send_email") => {
                let mut to = string_list(params, "to");
                if to.is_empty() {
                    to = string_list(params, "emails");
                }
                if to.is_empty() {
                    return Err(OrchestraError::MissingParameter("to"));
                }
                Ok(ServiceAction::SendEmail {
                    to,
                    subject: required_str(params, "subject")?,
                    body: required_str(params, "body")?,
                    cc: string_list(params, "cc"),
                })
            }
            (Service::Mail, "search_email") => {
                // Assemble the query from the loose fields the model may
                // have produced alongside (or instead of) `query`.
                let mut parts = Vec::new();
                if let Some(q) = opt_str(params, "query") {
                    if !q.is_empty() {
                        parts.push(q);
                    }
                }
                if let Some(from) = opt_str(params, "from") {
                    parts.push(format!("from:{from}"));
                }
                if let Some(after) = opt_str(params, "after") {
                    parts.push(format!("after:{after}"));
                }
                if let Some(before) = opt_str(params, "before") {
                    parts.push(format!("before:{before}"));
                }
                let query = parts.join(" ");
                if query.is_empty() {
                    return Err(OrchestraError::MissingParameter("query"));
                }
                Ok(ServiceAction::SearchEmail { query })
            }
            (Service::Mail, "read_email") => Ok(ServiceAction::ReadEmail {
                email_id: required_str(params, "email_id")?,
            }),
            (Service::Mail, "delete_email") => Ok(ServiceAction::DeleteEmail {
                email_id: required_str(params, "email_id")?,
            }),

            (Service::Calendar, "create_event") => Ok(ServiceAction::CreateEvent {
                summary: required_str(params, "summary")?,
                start_time: required_str(params, "start_time")?,
                end_time: opt_str(params, "end_time"),
                description: opt_str(params, "description"),
                location: opt_str(params, "location"),
                attendees: string_list(params, "attendees"),
            }),
            (Service::Calendar, "list_events") => Ok(ServiceAction::ListEvents {
                days: params.get("days").and_then(Value::as_i64).unwrap_or(7),
            }),
            (Service::Calendar, "search_event") => Ok(ServiceAction::SearchEvent {
                query: opt_str(params, "query").unwrap_or_default(),
            }),
            (Service::Calendar, "update_event") => {
                let event_id = required_str(params, "event_id")?;
                let mut changes = params.clone();
                changes.remove("event_id");
                Ok(ServiceAction::UpdateEvent { event_id, changes })
            }
            (Service::Calendar, "delete_event") => Ok(ServiceAction::DeleteEvent {
                event_id: required_str(params, "event_id")?,
            }),

            (Service::Drive, "search_file") => Ok(ServiceAction::SearchFile {
                query: opt_str(params, "query").unwrap_or_default(),
                mime_type: opt_str(params, "mime_type"),
            }),
            (Service::Drive, "upload_file") => Ok(ServiceAction::UploadFile {
                local_path: required_str(params, "local_path")?,
                name: opt_str(params, "name"),
                folder_id: opt_str(params, "folder_id"),
            }),
            (Service::Drive, "download_file") => Ok(ServiceAction::DownloadFile {
                file_id: required_str(params, "file_id")?,
            }),
            (Service::Drive, "share_file") => {
                let mut file_ids = string_list(params, "file_id");
                if file_ids.is_empty() {
                    // Workflow context injection attaches prior search
                    // results as `items`.
                    if let Some(items) = params.get("items").and_then(Value::as_array) {
                        file_ids = items
                            .iter()
                            .filter_map(|item| item["id"].as_str().map(String::from))
                            .collect();
                    }
                }
                if file_ids.is_empty() {
                    return Err(OrchestraError::MissingParameter("file_id"));
                }
                let mut emails = string_list(params, "emails");
                if emails.is_empty() {
                    emails = string_list(params, "email");
                }
                if emails.is_empty() {
                    return Err(OrchestraError::MissingParameter("email"));
                }
                Ok(ServiceAction::ShareFile {
                    file_ids,
                    emails,
                    role: opt_str(params, "role").unwrap_or_else(|| "reader".into()),
                })
            }
            (Service::Drive, "create_folder") => Ok(ServiceAction::CreateFolder {
                name: required_str(params, "name")?,
                parent_id: opt_str(params, "parent_id"),
            }),
            (Service::Drive, "delete_file") => Ok(ServiceAction::DeleteFile {
                file_id: required_str(params, "file_id")?,
            }),
            (Service::Drive, "move_file") => Ok(ServiceAction::MoveFile {
                file_id: required_str(params, "file_id")?,
                folder_id: required_str(params, "folder_id")?,
            }),
            (Service::Drive, "list_recent") => Ok(ServiceAction::ListRecentFiles),

            _ => Err(OrchestraError::UnknownIntent {
                service: service.to_string(),
                intent: name.to_string(),
            }),
        }
    }

    /// Whether the action changes remote state (and therefore passes
    /// through the safety gate and the undo log).
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            ServiceAction::SearchEmail { .. }
                | ServiceAction::ReadEmail { .. }
                | ServiceAction::ListEvents { .. }
                | ServiceAction::SearchEvent { .. }
                | ServiceAction::SearchFile { .. }
                | ServiceAction::DownloadFile { .. }
                | ServiceAction::ListRecentFiles
        )
    }
}

fn required_str(params: &Map<String, Value>, key: &'static str) -> Result<String> {
    opt_str(params, key).ok_or(OrchestraError::MissingParameter(key))
}

fn opt_str(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Accept both a single string and an array of strings for list fields.
fn string_list(params: &Map<String, Value>, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
