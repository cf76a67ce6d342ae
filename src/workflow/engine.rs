//! Multi-service workflow detection and step plumbing
//!
//! Detection delegates to the model with its own schema; only a
//! `multi_service = true` result with a non-empty operations list yields a
//! workflow. Step creation preserves operation order verbatim - there is
//! no reordering and no cycle detection, just a list with optional
//! back-references by index. The driving loop (in the orchestrator) runs
//! repeated passes, so a dependency declared out of order still executes
//! as long as the graph is acyclic.

use crate::core::error::{OrchestraError, Result};
use crate::llm::{parse_structured, prompts, CompletionModel, ValidateResponse};
use crate::services::Service;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Model output for multi-service detection
#[derive(Debug, Clone, Deserialize)]
pub struct MultiServiceIntent {
    pub multi_service: bool,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub operations: Vec<Value>,
    pub reasoning: String,
    pub confidence: f32,
}

impl ValidateResponse for MultiServiceIntent {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(OrchestraError::Llm(format!(
                "confidence {} out of range [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One (service, intent, parameters) unit within a multi-service plan
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    pub service: Service,
    pub intent: String,
    pub parameters: Map<String, Value>,
    pub depends_on: Option<usize>,
    pub result: Option<Value>,
    pub status: StepStatus,
}

/// Shape of a dependency's result, driving parameter binding
#[derive(Debug)]
enum ResultShape<'a> {
    Entity(&'a Map<String, Value>),
    Sequence(&'a [Value]),
    Opaque,
}

fn classify_shape(result: &Value) -> ResultShape<'_> {
    match result {
        Value::Object(map) => ResultShape::Entity(map),
        Value::Array(items) => ResultShape::Sequence(items),
        _ => ResultShape::Opaque,
    }
}

pub struct WorkflowEngine {
    model: Arc<dyn CompletionModel>,
    max_retries: u32,
}

impl WorkflowEngine {
    pub fn new(model: Arc<dyn CompletionModel>, max_retries: u32) -> Self {
        Self { model, max_retries }
    }

    /// Ask the model whether this command spans multiple services.
    pub async fn detect_multi_service(&self, command: &str) -> Option<MultiServiceIntent> {
        let intent: MultiServiceIntent = parse_structured(
            self.model.as_ref(),
            prompts::MULTI_SERVICE_PROMPT,
            command,
            self.max_retries,
        )
        .await?;

        if intent.multi_service && !intent.operations.is_empty() {
            tracing::info!(
                "multi-service workflow detected: {} operations",
                intent.operations.len()
            );
            return Some(intent);
        }
        None
    }

    /// Build steps from the detected operations, order preserved.
    pub fn create_workflow(&self, multi_intent: &MultiServiceIntent) -> Result<Vec<WorkflowStep>> {
        let mut steps = Vec::with_capacity(multi_intent.operations.len());
        for op in &multi_intent.operations {
            let service: Service = op["service"]
                .as_str()
                .unwrap_or_default()
                .parse()
                .map_err(OrchestraError::Workflow)?;
            steps.push(WorkflowStep {
                service,
                intent: op["intent"].as_str().unwrap_or_default().to_string(),
                parameters: op["parameters"].as_object().cloned().unwrap_or_default(),
                depends_on: step_index(&op["depends_on"]),
                result: None,
                status: StepStatus::Pending,
            });
        }
        tracing::debug!("created workflow with {} steps", steps.len());
        Ok(steps)
    }

    /// A step may run iff it has no dependency or the dependency already
    /// completed.
    pub fn can_execute_step(&self, step: &WorkflowStep, completed_steps: &[usize]) -> bool {
        match step.depends_on {
            None => true,
            Some(index) => completed_steps.contains(&index),
        }
    }

    /// Best-effort structural propagation of a dependency's result into
    /// the step's parameters. Unresolvable shapes pass through unchanged.
    pub fn inject_context(
        &self,
        step: &mut WorkflowStep,
        previous_results: &HashMap<usize, Value>,
    ) {
        let Some(dependency) = step.depends_on else {
            return;
        };
        let Some(result) = previous_results.get(&dependency) else {
            return;
        };

        match classify_shape(result) {
            ResultShape::Entity(entity) => {
                if let Some(id) = entity.get("id") {
                    if !step.parameters.contains_key("id") {
                        step.parameters.insert("id".into(), id.clone());
                    }
                }
                if let Some(attendees) = entity.get("attendees").and_then(Value::as_array) {
                    if !step.parameters.contains_key("emails") {
                        let emails: Vec<&str> = attendees
                            .iter()
                            .filter_map(|a| a["email"].as_str())
                            .collect();
                        step.parameters.insert("emails".into(), json!(emails));
                    }
                }
            }
            ResultShape::Sequence(items) => {
                if !step.parameters.contains_key("ids") {
                    step.parameters.insert("items".into(), json!(items));
                }
            }
            ResultShape::Opaque => {}
        }
    }
}

/// `depends_on` may arrive as a number, a numeric string, or null.
fn step_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
