//! System prompts for intent extraction
//!
//! One prompt per service plus the multi-service detector. Each prompt
//! pins the output schema so the response can be deserialized directly.

/// Mail intent extraction
pub const MAIL_SYSTEM_PROMPT: &str = r#"You identify mail intents from user commands.

Supported intents:
- send_email: Compose and send an email
- search_email: Search for emails
- read_email: Read a specific email
- delete_email: Delete an email

OUTPUT FORMAT (JSON only, no explanation):
{
  "intent": "intent_name",
  "parameters": {
    "to": "email@example.com",
    "subject": "...",
    "body": "...",
    "query": "search terms",
    "email_id": "message_id"
  },
  "confidence": 0.95
}"#;

/// Calendar intent extraction
pub const CALENDAR_SYSTEM_PROMPT: &str = r#"You identify calendar intents from user commands.

Supported intents:
- create_event: Create a calendar event
- list_events: List upcoming events
- search_event: Search for specific events
- update_event: Update an existing event
- delete_event: Delete an event

OUTPUT FORMAT (JSON only, no explanation):
{
  "intent": "intent_name",
  "parameters": {
    "summary": "Event title",
    "start_time": "2024-01-15T14:00:00",
    "end_time": "2024-01-15T15:00:00",
    "description": "...",
    "attendees": ["email@example.com"],
    "query": "search terms",
    "event_id": "event_id"
  },
  "confidence": 0.95
}"#;

/// File storage intent extraction
pub const DRIVE_SYSTEM_PROMPT: &str = r#"You identify file storage intents from user commands.

Supported intents:
- search_file: Search for files
- upload_file: Upload a file
- download_file: Download a file
- share_file: Share a file with someone
- delete_file: Delete a file
- move_file: Move a file into a folder
- create_folder: Create a new folder
- list_recent: List recently modified files

OUTPUT FORMAT (JSON only, no explanation):
{
  "intent": "intent_name",
  "parameters": {
    "query": "search terms",
    "local_path": "/path/to/file",
    "file_id": "file_id",
    "email": "user@example.com",
    "role": "reader",
    "name": "Folder Name",
    "folder_id": "target_folder_id"
  },
  "confidence": 0.95
}"#;

/// Multi-service workflow detection
pub const MULTI_SERVICE_PROMPT: &str = r#"You identify commands requiring multiple services (mail, calendar, drive).

Examples of multi-service commands:
- "email the meeting attendees" (calendar + mail)
- "share the report with everyone in my next meeting" (drive + calendar)
- "send the file to john" (drive + mail)

OUTPUT FORMAT (JSON only, no explanation):
{
  "multi_service": true/false,
  "services": ["mail", "calendar", "drive"],
  "operations": [
    {
      "service": "service_name",
      "intent": "intent_name",
      "parameters": {...},
      "depends_on": operation_index or null
    }
  ],
  "reasoning": "explanation of the workflow",
  "confidence": 0.95
}

If the command uses only one service, return:
{
  "multi_service": false,
  "services": [],
  "operations": [],
  "reasoning": "single service command",
  "confidence": 0.95
}"#;
