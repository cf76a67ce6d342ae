//! Command driver
//!
//! Wires the router, inference, workflow engine, safety policy and
//! session memory into one `process_command` entry point. Capability
//! failures become recorded history entries, never panics.

use crate::core::config::Settings;
use crate::core::error::{OrchestraError, Result};
use crate::inference::ParameterInference;
use crate::intent::{Intent, IntentRouter, ServiceAction, CONFIDENCE_THRESHOLD};
use crate::llm::CompletionModel;
use crate::safety::{ActionPreview, ActionType, SafetyManager, UndoAction};
use crate::services::{CalendarService, DriveService, MailService, Service};
use crate::session::{resolve_reference, SessionMemory};
use crate::workflow::{MultiServiceIntent, StepStatus, WorkflowContext, WorkflowEngine, WorkflowStep};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Confidence attached to internally synthesized workflow-step intents.
const WORKFLOW_STEP_CONFIDENCE: f32 = 0.9;

const DEFAULT_MAX_RESULTS: usize = 10;

/// What one processed command produced, shaped for a CLI or API caller.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    pub needs_confirmation: bool,
}

impl CommandOutcome {
    fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            needs_confirmation: false,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            needs_confirmation: false,
        }
    }

    fn confirmation(preview: impl Into<String>) -> Self {
        Self {
            success: false,
            message: preview.into(),
            data: None,
            needs_confirmation: true,
        }
    }
}

pub struct Orchestrator {
    router: IntentRouter,
    engine: WorkflowEngine,
    inference: ParameterInference,
    safety: SafetyManager,
    memory: SessionMemory,
    mail: Option<Arc<dyn MailService>>,
    calendar: Option<Arc<dyn CalendarService>>,
    drive: Option<Arc<dyn DriveService>>,
    auto_confirm: bool,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn CompletionModel>, settings: &Settings) -> Self {
        Self {
            router: IntentRouter::new(model.clone(), settings.max_llm_retries),
            engine: WorkflowEngine::new(model, settings.max_llm_retries),
            inference: ParameterInference::new(None, None),
            safety: SafetyManager::new(false, &settings.internal_domain)
                .with_capacity(settings.undo_capacity),
            memory: SessionMemory::new(settings.default_session.clone()),
            mail: None,
            calendar: None,
            drive: None,
            auto_confirm: false,
        }
    }

    pub fn with_mail(mut self, mail: Arc<dyn MailService>) -> Self {
        self.mail = Some(mail);
        self.rebuild_inference();
        self
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarService>) -> Self {
        self.calendar = Some(calendar);
        self.rebuild_inference();
        self
    }

    pub fn with_drive(mut self, drive: Arc<dyn DriveService>) -> Self {
        self.drive = Some(drive);
        self
    }

    pub fn auto_confirm(mut self, enabled: bool) -> Self {
        self.auto_confirm = enabled;
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.safety.set_dry_run(enabled);
        self
    }

    fn rebuild_inference(&mut self) {
        self.inference = ParameterInference::new(self.mail.clone(), self.calendar.clone());
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut SessionMemory {
        &mut self.memory
    }

    pub fn safety(&self) -> &SafetyManager {
        &self.safety
    }

    pub fn recent_actions(&self) -> Vec<UndoAction> {
        self.safety.get_undo_stack()
    }

    pub async fn suggestions(&self) -> Vec<String> {
        self.inference.smart_suggestions().await
    }

    /// Process one natural-language command end to end.
    pub async fn process_command(&mut self, command: &str) -> CommandOutcome {
        let command = command.trim();
        if command.is_empty() {
            return CommandOutcome::failure("Empty command");
        }
        tracing::info!("processing command: {command}");

        if let Some(outcome) = self.try_smart_query(command).await {
            return outcome;
        }

        if let Some((kind, value)) = resolve_reference(&self.memory, command) {
            tracing::debug!("resolved reference {kind:?}: {value}");
        }

        if let Some(multi_intent) = self.engine.detect_multi_service(command).await {
            return self.run_workflow(command, &multi_intent).await;
        }

        let (intent, service) = self.router.route(command).await;
        let Some(intent) = intent else {
            self.record(command, service, "unknown", Map::new(), None, false,
                Some("command not understood".into()));
            return CommandOutcome::failure(
                "Sorry, I couldn't understand that command. Try rephrasing it.",
            );
        };

        if !self.router.is_confident(&intent, CONFIDENCE_THRESHOLD) {
            self.record(command, service, &intent.name, intent.parameters.clone(), None,
                false, Some(format!("low confidence ({:.2})", intent.confidence)));
            return CommandOutcome::failure(format!(
                "I'm not sure what you meant (confidence {:.0}%). Could you be more specific?",
                intent.confidence * 100.0
            ));
        }

        let parameters = self
            .inference
            .infer_parameters(&mut self.memory, command, &intent.name, intent.parameters.clone())
            .await;

        self.execute(command, service, &intent.name, parameters).await
    }

    /// Shortcut paths that bypass the LLM entirely but still leave
    /// history and references behind.
    async fn try_smart_query(&mut self, command: &str) -> Option<CommandOutcome> {
        let lower = command.to_lowercase();

        if lower.contains("next meeting") {
            let calendar = self.calendar.clone()?;
            let outcome = match calendar.list(7, 1).await {
                Ok(events) => match events.into_iter().next() {
                    Some(event) => {
                        self.memory.set_reference("next_meeting", event.clone());
                        self.record(command, Service::Calendar, "get_next_meeting",
                            Map::new(), Some(event.clone()), true, None);
                        let summary = event["summary"].as_str().unwrap_or("Meeting");
                        let start = event["start_time"].as_str().unwrap_or("unknown time");
                        CommandOutcome::ok(
                            format!("Your next meeting is '{summary}' at {start}"),
                            Some(event),
                        )
                    }
                    None => {
                        self.record(command, Service::Calendar, "get_next_meeting",
                            Map::new(), Some(json!([])), true, None);
                        CommandOutcome::ok("No upcoming meetings in the next 7 days", None)
                    }
                },
                Err(err) => {
                    tracing::warn!("next-meeting lookup failed: {err}");
                    self.record(command, Service::Calendar, "get_next_meeting",
                        Map::new(), None, false, Some(err.to_string()));
                    CommandOutcome::failure(format!("Calendar lookup failed: {err}"))
                }
            };
            return Some(outcome);
        }

        if lower.contains("unread email") || lower.contains("unread mail") {
            let mail = self.mail.clone()?;
            let outcome = match mail.search("is:unread", DEFAULT_MAX_RESULTS).await {
                Ok(messages) => {
                    let count = messages.len();
                    let data = json!(messages);
                    let mut params = Map::new();
                    params.insert("query".into(), json!("is:unread"));
                    self.record(command, Service::Mail, "search_email", params,
                        Some(data.clone()), true, None);
                    CommandOutcome::ok(format!("You have {count} unread email(s)"), Some(data))
                }
                Err(err) => {
                    tracing::warn!("unread lookup failed: {err}");
                    self.record(command, Service::Mail, "search_email", Map::new(),
                        None, false, Some(err.to_string()));
                    CommandOutcome::failure(format!("Mail lookup failed: {err}"))
                }
            };
            return Some(outcome);
        }

        None
    }

    /// Validate, gate and dispatch a single routed intent.
    async fn execute(
        &mut self,
        command: &str,
        service: Service,
        intent_name: &str,
        parameters: Map<String, Value>,
    ) -> CommandOutcome {
        let action = match ServiceAction::from_intent(service, intent_name, &parameters) {
            Ok(action) => action,
            Err(err) => {
                self.record(command, service, intent_name, parameters, None, false,
                    Some(err.to_string()));
                return CommandOutcome::failure(err.to_string());
            }
        };

        if action.is_mutating() {
            if self.safety.is_dry_run() {
                let message =
                    self.safety
                        .format_dry_run_result(intent_name, &parameters, None);
                self.record(command, service, intent_name, parameters,
                    Some(json!({"dry_run": true})), true, None);
                return CommandOutcome::ok(message, None);
            }
            if !self.auto_confirm && self.safety.requires_confirmation(intent_name, &parameters) {
                let preview = preview_for(intent_name, &parameters);
                self.record(command, service, intent_name, parameters, None, false,
                    Some("confirmation required".into()));
                return CommandOutcome::confirmation(format!(
                    "This action needs confirmation:\n{preview}\nRe-run with confirmation enabled to proceed."
                ));
            }
        }

        match self.dispatch(&action).await {
            Ok(result) => {
                if action.is_mutating() {
                    self.log_undo(&action, intent_name, &result);
                }
                self.record(command, service, intent_name, parameters,
                    Some(result.clone()), true, None);
                CommandOutcome::ok(describe_result(intent_name, &result), Some(result))
            }
            Err(err) => {
                tracing::warn!("dispatch failed for {intent_name}: {err}");
                self.record(command, service, intent_name, parameters, None, false,
                    Some(err.to_string()));
                CommandOutcome::failure(format!("Action failed: {err}"))
            }
        }
    }

    /// Multi-pass workflow driver. Each pass runs every step whose
    /// dependency has settled; stops when a pass makes no progress.
    pub async fn run_workflow(
        &mut self,
        command: &str,
        multi_intent: &MultiServiceIntent,
    ) -> CommandOutcome {
        let mut steps = match self.engine.create_workflow(multi_intent) {
            Ok(steps) => steps,
            Err(err) => {
                self.record(command, Service::Mail, "multi_service", Map::new(), None,
                    false, Some(err.to_string()));
                return CommandOutcome::failure(format!("Could not plan workflow: {err}"));
            }
        };
        let mut ctx = WorkflowContext::new();

        loop {
            let mut progressed = false;
            for index in 0..steps.len() {
                if steps[index].status != StepStatus::Pending {
                    continue;
                }
                if let Some(dep) = steps[index].depends_on {
                    if ctx.failed_steps.contains(&dep) {
                        tracing::warn!("step {index} skipped: dependency {dep} failed");
                        steps[index].status = StepStatus::Failed;
                        ctx.mark_failed(index);
                        progressed = true;
                        continue;
                    }
                }
                if !self.engine.can_execute_step(&steps[index], &ctx.completed_steps) {
                    continue;
                }

                self.engine.inject_context(&mut steps[index], &ctx.results);
                steps[index].status = StepStatus::Running;
                match self.run_step(&steps[index]).await {
                    Ok(result) => {
                        steps[index].result = Some(result.clone());
                        steps[index].status = StepStatus::Completed;
                        ctx.add_result(index, result);
                    }
                    Err(err) => {
                        tracing::warn!("workflow step {index} failed: {err}");
                        steps[index].status = StepStatus::Failed;
                        ctx.mark_failed(index);
                    }
                }
                progressed = true;
            }
            if !progressed {
                break;
            }
        }

        // Steps still pending have unsatisfiable dependencies.
        for (index, step) in steps.iter_mut().enumerate() {
            if step.status == StepStatus::Pending {
                tracing::warn!("step {index} never became runnable");
                step.status = StepStatus::Failed;
                ctx.mark_failed(index);
            }
        }

        let completed = ctx.completed_steps.len();
        let failed = ctx.failed_steps.len();
        let summary = format!(
            "Workflow finished: {completed} step(s) completed, {failed} failed"
        );
        let data = json!(steps
            .iter()
            .map(|s| json!({
                "service": s.service.as_str(),
                "intent": s.intent,
                "status": format!("{:?}", s.status).to_lowercase(),
                "result": s.result,
            }))
            .collect::<Vec<_>>());

        self.record(command, steps.first().map(|s| s.service).unwrap_or(Service::Mail),
            "multi_service", Map::new(), Some(data.clone()), failed == 0, None);
        if failed == 0 {
            CommandOutcome::ok(summary, Some(data))
        } else {
            CommandOutcome {
                success: false,
                message: summary,
                data: Some(data),
                needs_confirmation: false,
            }
        }
    }

    async fn run_step(&mut self, step: &WorkflowStep) -> Result<Value> {
        let intent = Intent::synthetic(
            &step.intent,
            step.parameters.clone(),
            WORKFLOW_STEP_CONFIDENCE,
        );
        let action = ServiceAction::from_intent(step.service, &intent.name, &intent.parameters)?;
        if action.is_mutating() && self.safety.is_dry_run() {
            return Ok(json!({
                "dry_run": true,
                "summary": self.safety.action_summary(&intent.name, &intent.parameters),
            }));
        }
        let result = self.dispatch(&action).await?;
        if action.is_mutating() {
            self.log_undo(&action, &intent.name, &result);
        }
        Ok(result)
    }

    /// Undo the most recent recorded action, when it carries undo data.
    pub async fn undo_last_action(&mut self) -> CommandOutcome {
        let Some(last) = self.safety.get_last_action() else {
            return CommandOutcome::failure("Nothing to undo");
        };
        let Some(undo_data) = last.undo_data.clone() else {
            return CommandOutcome::failure(format!(
                "The last action ({}) cannot be undone",
                last.action_type
            ));
        };

        let action = match self.safety.pop_last_action() {
            Some(action) => action,
            None => return CommandOutcome::failure("Nothing to undo"),
        };
        let result = match action.action_type {
            ActionType::CreateEvent => match (&self.calendar, undo_data.get("event_id")) {
                (Some(calendar), Some(Value::String(id))) => calendar.delete(id).await,
                _ => Err(OrchestraError::Service("no calendar service configured".into())),
            },
            ActionType::UploadFile | ActionType::CreateFolder => {
                match (&self.drive, undo_data.get("file_id")) {
                    (Some(drive), Some(Value::String(id))) => drive.delete(id).await,
                    _ => Err(OrchestraError::Service("no drive service configured".into())),
                }
            }
            other => Err(OrchestraError::Service(format!(
                "no undo handler for {other}"
            ))),
        };

        match result {
            Ok(()) => CommandOutcome::ok(
                format!("Undid {} on {}", action.action_type, action.resource_id),
                None,
            ),
            Err(err) => {
                tracing::warn!("undo failed: {err}");
                CommandOutcome::failure(format!("Undo failed: {err}"))
            }
        }
    }

    async fn dispatch(&self, action: &ServiceAction) -> Result<Value> {
        match action {
            ServiceAction::SendEmail { to, subject, body, cc } => {
                self.mail()?.send(to, subject, body, cc).await
            }
            ServiceAction::SearchEmail { query } => {
                let messages = self.mail()?.search(query, DEFAULT_MAX_RESULTS).await?;
                Ok(json!(messages))
            }
            ServiceAction::ReadEmail { email_id } => self.mail()?.get(email_id).await,
            ServiceAction::DeleteEmail { email_id } => {
                self.mail()?.delete(email_id).await?;
                Ok(json!({"deleted": true, "email_id": email_id}))
            }

            ServiceAction::CreateEvent {
                summary,
                start_time,
                end_time,
                description,
                location,
                attendees,
            } => {
                self.calendar()?
                    .create(
                        summary,
                        start_time,
                        end_time.as_deref(),
                        description.as_deref(),
                        location.as_deref(),
                        attendees,
                    )
                    .await
            }
            ServiceAction::ListEvents { days } => {
                let events = self.calendar()?.list(*days, DEFAULT_MAX_RESULTS).await?;
                Ok(json!(events))
            }
            ServiceAction::SearchEvent { query } => {
                let events = self.calendar()?.search(query, DEFAULT_MAX_RESULTS).await?;
                Ok(json!(events))
            }
            ServiceAction::UpdateEvent { event_id, changes } => {
                self.calendar()?
                    .update(event_id, &Value::Object(changes.clone()))
                    .await
            }
            ServiceAction::DeleteEvent { event_id } => {
                self.calendar()?.delete(event_id).await?;
                Ok(json!({"deleted": true, "event_id": event_id}))
            }

            ServiceAction::SearchFile { query, mime_type } => {
                let files = self
                    .drive()?
                    .search(query, mime_type.as_deref(), DEFAULT_MAX_RESULTS)
                    .await?;
                Ok(json!(files))
            }
            ServiceAction::UploadFile {
                local_path,
                name,
                folder_id,
            } => {
                self.drive()?
                    .upload(local_path, name.as_deref(), folder_id.as_deref())
                    .await
            }
            ServiceAction::DownloadFile { file_id } => {
                let bytes = self.drive()?.download(file_id).await?;
                Ok(json!({"file_id": file_id, "bytes": bytes.len()}))
            }
            ServiceAction::ShareFile {
                file_ids,
                emails,
                role,
            } => {
                let drive = self.drive()?;
                let mut grants = Vec::new();
                for file_id in file_ids {
                    for email in emails {
                        let shared = drive.share(file_id, email, role).await?;
                        grants.push(json!({
                            "file_id": file_id,
                            "email": email,
                            "role": role,
                            "shared": shared,
                        }));
                    }
                }
                Ok(json!(grants))
            }
            ServiceAction::CreateFolder { name, parent_id } => {
                self.drive()?.create_folder(name, parent_id.as_deref()).await
            }
            ServiceAction::DeleteFile { file_id } => {
                self.drive()?.delete(file_id).await?;
                Ok(json!({"deleted": true, "file_id": file_id}))
            }
            ServiceAction::MoveFile { file_id, folder_id } => {
                self.drive()?.move_file(file_id, folder_id).await
            }
            ServiceAction::ListRecentFiles => {
                let files = self.drive()?.list_recent(DEFAULT_MAX_RESULTS).await?;
                Ok(json!(files))
            }
        }
    }

    /// Push a completed mutating action onto the undo log, with undo
    /// data when the action created a resource we can delete again.
    fn log_undo(&mut self, action: &ServiceAction, intent_name: &str, result: &Value) {
        let Some(action_type) = action_type_for(intent_name) else {
            return;
        };
        let resource_id = result["id"].as_str().unwrap_or("unknown").to_string();
        let undo_data = match action_type {
            ActionType::CreateEvent => result["id"].as_str().map(|id| {
                let mut data = Map::new();
                data.insert("event_id".into(), json!(id));
                data
            }),
            ActionType::UploadFile | ActionType::CreateFolder => {
                result["id"].as_str().map(|id| {
                    let mut data = Map::new();
                    data.insert("file_id".into(), json!(id));
                    data
                })
            }
            // Sends, deletes and shares are not reversed through the
            // capability traits.
            _ => None,
        };
        let service = match action_type {
            ActionType::SendEmail | ActionType::DeleteEmail => Service::Mail,
            ActionType::CreateEvent | ActionType::UpdateEvent | ActionType::DeleteEvent => {
                Service::Calendar
            }
            _ => Service::Drive,
        };
        let mut details = Map::new();
        details.insert("intent".into(), json!(intent_name));
        self.safety
            .record_action(action_type, &resource_id, service, details, undo_data);
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        command: &str,
        service: Service,
        intent: &str,
        parameters: Map<String, Value>,
        result: Option<Value>,
        success: bool,
        error: Option<String>,
    ) {
        self.memory
            .add_command(command, service, intent, parameters, result, success, error);
    }

    fn mail(&self) -> Result<&Arc<dyn MailService>> {
        self.mail
            .as_ref()
            .ok_or_else(|| OrchestraError::Service("no mail service configured".into()))
    }

    fn calendar(&self) -> Result<&Arc<dyn CalendarService>> {
        self.calendar
            .as_ref()
            .ok_or_else(|| OrchestraError::Service("no calendar service configured".into()))
    }

    fn drive(&self) -> Result<&Arc<dyn DriveService>> {
        self.drive
            .as_ref()
            .ok_or_else(|| OrchestraError::Service("no drive service configured".into()))
    }
}

fn action_type_for(intent: &str) -> Option<ActionType> {
    Some(match intent {
        "send_email" => ActionType::SendEmail,
        "delete_email" => ActionType::DeleteEmail,
        "create_event" => ActionType::CreateEvent,
        "update_event" => ActionType::UpdateEvent,
        "delete_event" => ActionType::DeleteEvent,
        "share_file" => ActionType::ShareFile,
        "delete_file" => ActionType::DeleteFile,
        "move_file" => ActionType::MoveFile,
        "upload_file" => ActionType::UploadFile,
        "create_folder" => ActionType::CreateFolder,
        _ => return None,
    })
}

fn preview_for(intent: &str, parameters: &Map<String, Value>) -> String {
    match intent {
        "send_email" => ActionPreview::preview_email(parameters),
        "create_event" | "update_event" => ActionPreview::preview_event(parameters),
        "share_file" => ActionPreview::preview_file_share(parameters),
        "delete_email" | "delete_event" | "delete_file" => {
            ActionPreview::preview_deletion(intent, parameters)
        }
        other => format!("Execute {other}"),
    }
}

fn describe_result(intent: &str, result: &Value) -> String {
    match result {
        Value::Array(items) => format!("Found {} result(s)", items.len()),
        Value::Object(map) => {
            if let Some(id) = map.get("id").and_then(Value::as_str) {
                format!("Done ({intent}: {id})")
            } else {
                format!("Done ({intent})")
            }
        }
        _ => format!("Done ({intent})"),
    }
}
