//! In-memory service implementations
//!
//! Deterministic stand-ins for the real backends, used by the test suite
//! and available to callers that want a fully offline rig. Seeded data is
//! plain JSON values shaped like the real API payloads the orchestrator
//! cares about (`id`, `summary`, `attendees`, ...).

use crate::core::error::{OrchestraError, Result};
use crate::services::{CalendarService, DriveService, MailService};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

/// In-memory mail backend
#[derive(Default)]
pub struct MockMailService {
    messages: Mutex<Vec<Value>>,
    sent: Mutex<Vec<Value>>,
    fail_next: Mutex<bool>,
}

impl MockMailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Value>) -> Self {
        Self {
            messages: Mutex::new(messages),
            ..Self::default()
        }
    }

    /// Messages sent through this mock, in send order.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// Make the next call return a service error.
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn check_failure(&self) -> Result<()> {
        let mut flag = self.fail_next.lock().unwrap();
        if *flag {
            *flag = false;
            return Err(OrchestraError::Service("mail backend unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MailService for MockMailService {
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
        cc: &[String],
    ) -> Result<Value> {
        self.check_failure()?;
        let id = format!("msg-{}", self.sent.lock().unwrap().len() + 1);
        let message = json!({
            "id": id,
            "to": to,
            "cc": cc,
            "subject": subject,
            "body": body,
        });
        self.sent.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>> {
        self.check_failure()?;
        let messages = self.messages.lock().unwrap();
        let results = messages
            .iter()
            .filter(|m| matches_query(m, query))
            .take(max_results)
            .cloned()
            .collect();
        Ok(results)
    }

    async fn get(&self, message_id: &str) -> Result<Value> {
        self.check_failure()?;
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m["id"] == message_id)
            .cloned()
            .ok_or_else(|| OrchestraError::Service(format!("no such message: {message_id}")))
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        self.check_failure()?;
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m["id"] != message_id);
        if messages.len() == before {
            return Err(OrchestraError::Service(format!(
                "no such message: {message_id}"
            )));
        }
        Ok(())
    }

    async fn profile(&self) -> Result<Value> {
        Ok(json!({"emailAddress": "me@example.com"}))
    }
}

/// Match a message against the query tokens the orchestrator produces.
/// Supports `from:<addr>` and `is:unread`; anything else matches all.
fn matches_query(message: &Value, query: &str) -> bool {
    for token in query.split_whitespace() {
        if let Some(sender) = token.strip_prefix("from:") {
            let from = message["from"].as_str().unwrap_or("");
            if !from.contains(sender) {
                return false;
            }
        } else if token == "is:unread" && message["unread"] != json!(true) {
            return false;
        }
    }
    true
}

/// In-memory calendar backend
#[derive(Default)]
pub struct MockCalendarService {
    events: Mutex<Vec<Value>>,
    fail_next: Mutex<bool>,
}

impl MockCalendarService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Value>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn check_failure(&self) -> Result<()> {
        let mut flag = self.fail_next.lock().unwrap();
        if *flag {
            *flag = false;
            return Err(OrchestraError::Service(
                "calendar backend unavailable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarService for MockCalendarService {
    async fn create(
        &self,
        summary: &str,
        start_time: &str,
        end_time: Option<&str>,
        description: Option<&str>,
        location: Option<&str>,
        attendees: &[String],
    ) -> Result<Value> {
        self.check_failure()?;
        let mut events = self.events.lock().unwrap();
        let event = json!({
            "id": format!("evt-{}", events.len() + 1),
            "summary": summary,
            "start": {"dateTime": start_time},
            "end": {"dateTime": end_time},
            "description": description,
            "location": location,
            "attendees": attendees.iter().map(|a| json!({"email": a})).collect::<Vec<_>>(),
        });
        events.push(event.clone());
        Ok(event)
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>> {
        self.check_failure()?;
        let query_lower = query.to_lowercase();
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| {
                query_lower.is_empty()
                    || e["summary"]
                        .as_str()
                        .map(|s| s.to_lowercase().contains(&query_lower))
                        .unwrap_or(false)
            })
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn list(&self, _days_ahead: i64, max_results: usize) -> Result<Vec<Value>> {
        self.check_failure()?;
        let events = self.events.lock().unwrap();
        Ok(events.iter().take(max_results).cloned().collect())
    }

    async fn get(&self, event_id: &str) -> Result<Value> {
        self.check_failure()?;
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e["id"] == event_id)
            .cloned()
            .ok_or_else(|| OrchestraError::Service(format!("no such event: {event_id}")))
    }

    async fn update(&self, event_id: &str, changes: &Value) -> Result<Value> {
        self.check_failure()?;
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e["id"] == event_id)
            .ok_or_else(|| OrchestraError::Service(format!("no such event: {event_id}")))?;
        if let (Some(target), Some(source)) = (event.as_object_mut(), changes.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(event.clone())
    }

    async fn delete(&self, event_id: &str) -> Result<()> {
        self.check_failure()?;
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e["id"] != event_id);
        if events.len() == before {
            return Err(OrchestraError::Service(format!("no such event: {event_id}")));
        }
        Ok(())
    }
}

/// In-memory file storage backend
#[derive(Default)]
pub struct MockDriveService {
    files: Mutex<Vec<Value>>,
    shares: Mutex<Vec<Value>>,
    fail_next: Mutex<bool>,
}

impl MockDriveService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: Vec<Value>) -> Self {
        Self {
            files: Mutex::new(files),
            ..Self::default()
        }
    }

    /// Permissions granted through this mock, in grant order.
    pub fn shares(&self) -> Vec<Value> {
        self.shares.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    fn check_failure(&self) -> Result<()> {
        let mut flag = self.fail_next.lock().unwrap();
        if *flag {
            *flag = false;
            return Err(OrchestraError::Service("drive backend unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DriveService for MockDriveService {
    async fn search(
        &self,
        query: &str,
        mime_type: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Value>> {
        self.check_failure()?;
        let query_lower = query.to_lowercase();
        let files = self.files.lock().unwrap();
        Ok(files
            .iter()
            .filter(|f| {
                let name_matches = query_lower.is_empty()
                    || f["name"]
                        .as_str()
                        .map(|n| n.to_lowercase().contains(&query_lower))
                        .unwrap_or(false);
                let mime_matches = mime_type
                    .map(|m| f["mimeType"] == m)
                    .unwrap_or(true);
                name_matches && mime_matches
            })
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn get(&self, file_id: &str) -> Result<Value> {
        self.check_failure()?;
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f["id"] == file_id)
            .cloned()
            .ok_or_else(|| OrchestraError::Service(format!("no such file: {file_id}")))
    }

    async fn upload(
        &self,
        local_path: &str,
        name: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Value> {
        self.check_failure()?;
        let mut files = self.files.lock().unwrap();
        let file = json!({
            "id": format!("file-{}", files.len() + 1),
            "name": name.unwrap_or(local_path),
            "parents": folder_id.map(|f| vec![f]),
        });
        files.push(file.clone());
        Ok(file)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        self.check_failure()?;
        let files = self.files.lock().unwrap();
        if files.iter().any(|f| f["id"] == file_id) {
            Ok(Vec::new())
        } else {
            Err(OrchestraError::Service(format!("no such file: {file_id}")))
        }
    }

    async fn share(&self, file_id: &str, email: &str, role: &str) -> Result<bool> {
        self.check_failure()?;
        if !self.files.lock().unwrap().iter().any(|f| f["id"] == file_id) {
            return Err(OrchestraError::Service(format!("no such file: {file_id}")));
        }
        self.shares.lock().unwrap().push(json!({
            "file_id": file_id,
            "email": email,
            "role": role,
        }));
        Ok(true)
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Value> {
        self.check_failure()?;
        let mut files = self.files.lock().unwrap();
        let folder = json!({
            "id": format!("folder-{}", files.len() + 1),
            "name": name,
            "mimeType": "application/vnd.folder",
            "parents": parent_id.map(|p| vec![p]),
        });
        files.push(folder.clone());
        Ok(folder)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        self.check_failure()?;
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f["id"] != file_id);
        if files.len() == before {
            return Err(OrchestraError::Service(format!("no such file: {file_id}")));
        }
        Ok(())
    }

    async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<Value> {
        self.check_failure()?;
        let mut files = self.files.lock().unwrap();
        let file = files
            .iter_mut()
            .find(|f| f["id"] == file_id)
            .ok_or_else(|| OrchestraError::Service(format!("no such file: {file_id}")))?;
        file["parents"] = json!([folder_id]);
        Ok(file.clone())
    }

    async fn list_recent(&self, max_results: usize) -> Result<Vec<Value>> {
        self.check_failure()?;
        let files = self.files.lock().unwrap();
        Ok(files.iter().rev().take(max_results).cloned().collect())
    }
}
