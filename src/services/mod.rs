//! Service capability interfaces
//!
//! The orchestrator never talks to a backend directly; it goes through
//! these traits. Concrete adapters (and their OAuth/credential handling)
//! live outside this crate. Write operations must not be blindly retried
//! by any wrapping resilience layer - the orchestrator calls them at most
//! once per user confirmation.

pub mod mock;

use crate::core::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A backend a command can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Mail,
    Calendar,
    Drive,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Mail => "mail",
            Service::Calendar => "calendar",
            Service::Drive => "drive",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mail" | "gmail" | "email" => Ok(Service::Mail),
            "calendar" => Ok(Service::Calendar),
            "drive" | "files" | "storage" => Ok(Service::Drive),
            other => Err(format!("unknown service: {other}")),
        }
    }
}

/// Mail backend capabilities
#[async_trait]
pub trait MailService: Send + Sync {
    /// Send a message. Returns the created message (with an `id`).
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
        cc: &[String],
    ) -> Result<Value>;

    /// Search messages by a query string (`is:unread`, `from:x`, ...).
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>>;

    /// Fetch a single message by id.
    async fn get(&self, message_id: &str) -> Result<Value>;

    /// Move a message to trash.
    async fn delete(&self, message_id: &str) -> Result<()>;

    /// The authenticated user's profile.
    async fn profile(&self) -> Result<Value>;
}

/// Calendar backend capabilities
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn create(
        &self,
        summary: &str,
        start_time: &str,
        end_time: Option<&str>,
        description: Option<&str>,
        location: Option<&str>,
        attendees: &[String],
    ) -> Result<Value>;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Value>>;

    /// Upcoming events within `days_ahead` days, soonest first.
    async fn list(&self, days_ahead: i64, max_results: usize) -> Result<Vec<Value>>;

    async fn get(&self, event_id: &str) -> Result<Value>;

    async fn update(&self, event_id: &str, changes: &Value) -> Result<Value>;

    async fn delete(&self, event_id: &str) -> Result<()>;
}

/// File storage backend capabilities
#[async_trait]
pub trait DriveService: Send + Sync {
    async fn search(
        &self,
        query: &str,
        mime_type: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Value>>;

    async fn get(&self, file_id: &str) -> Result<Value>;

    async fn upload(
        &self,
        local_path: &str,
        name: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Value>;

    async fn download(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Grant `email` the given role on a file. Returns whether the
    /// permission was created.
    async fn share(&self, file_id: &str, email: &str, role: &str) -> Result<bool>;

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<Value>;

    async fn delete(&self, file_id: &str) -> Result<()>;

    async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<Value>;

    async fn list_recent(&self, max_results: usize) -> Result<Vec<Value>>;
}
