//! Structured intents extracted from free text

pub mod action;
pub mod classifier;
pub mod router;

pub use action::ServiceAction;
pub use classifier::{KeywordClassifier, ServiceClassifier};
pub use router::{IntentRouter, CONFIDENCE_THRESHOLD};

use crate::core::error::{OrchestraError, Result};
use crate::llm::ValidateResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Intent extracted for one target service
///
/// `parameters` stays an open map at this boundary - its shape depends on
/// what the model produced. Validation into a typed [`ServiceAction`]
/// happens before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "intent")]
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Intent {
    /// Synthesize an intent internally (workflow steps bypass the LLM).
    pub fn synthetic(name: &str, parameters: Map<String, Value>, confidence: f32) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            confidence,
            reasoning: None,
        }
    }
}

impl ValidateResponse for Intent {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(OrchestraError::Llm(format!(
                "confidence {} out of range [0, 1]",
                self.confidence
            )));
        }
        if self.name.is_empty() {
            return Err(OrchestraError::Llm("empty intent name".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_llm_shape() {
        let json = r#"{
            "intent": "send_email",
            "parameters": {"to": "a@b.com", "subject": "Hi", "body": "Hello"},
            "confidence": 0.92
        }"#;
        let intent: Intent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.name, "send_email");
        assert_eq!(intent.parameters["to"], "a@b.com");
        assert!(intent.validate().is_ok());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let intent = Intent::synthetic("send_email", Map::new(), 1.3);
        assert!(intent.validate().is_err());
    }

    #[test]
    fn test_missing_parameters_defaults_empty() {
        let intent: Intent =
            serde_json::from_str(r#"{"intent": "list_events", "confidence": 0.8}"#).unwrap();
        assert!(intent.parameters.is_empty());
        assert!(intent.reasoning.is_none());
    }
}
