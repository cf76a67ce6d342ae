//! Per-run workflow state

use serde_json::Value;
use std::collections::HashMap;

/// Results and bookkeeping for one workflow execution.
/// Discarded after the run; only the resulting command records persist.
#[derive(Debug, Default)]
pub struct WorkflowContext {
    pub results: HashMap<usize, Value>,
    pub completed_steps: Vec<usize>,
    pub failed_steps: Vec<usize>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, step_index: usize, result: Value) {
        self.results.insert(step_index, result);
        self.completed_steps.push(step_index);
        tracing::debug!("step {step_index} completed, result stored");
    }

    pub fn mark_failed(&mut self, step_index: usize) {
        self.failed_steps.push(step_index);
        tracing::warn!("step {step_index} marked as failed");
    }

    pub fn get_result(&self, step_index: usize) -> Option<&Value> {
        self.results.get(&step_index)
    }

    pub fn is_settled(&self, step_index: usize) -> bool {
        self.completed_steps.contains(&step_index) || self.failed_steps.contains(&step_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_bookkeeping() {
        let mut context = WorkflowContext::new();
        context.add_result(0, json!({"id": "e1"}));
        context.mark_failed(2);

        assert_eq!(context.get_result(0).unwrap()["id"], "e1");
        assert!(context.get_result(1).is_none());
        assert!(context.is_settled(0));
        assert!(context.is_settled(2));
        assert!(!context.is_settled(1));
    }
}
