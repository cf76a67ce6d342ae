//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use orchestra::core::error::{OrchestraError, Result};
use orchestra::llm::CompletionModel;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Response used whenever a test wants the multi-service detector to
/// pass through to single-service routing.
pub const NOT_MULTI: &str =
    r#"{"multi_service": false, "operations": [], "reasoning": "single service", "confidence": 0.95}"#;

/// Completion model that replays canned responses in order and errors
/// once the script runs out.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OrchestraError::Llm("scripted model exhausted".into()))
    }
}
