//! Intent routing
//!
//! Classifies a raw command into a target service, then asks the model for
//! a structured intent using that service's prompt. The router never
//! blocks on low confidence; it exposes the predicate and leaves the
//! confirmation decision to the caller.

use crate::intent::classifier::{KeywordClassifier, ServiceClassifier};
use crate::intent::Intent;
use crate::llm::{parse_structured, prompts, CompletionModel};
use crate::services::Service;
use std::sync::Arc;

/// Below this confidence callers should ask the user before executing.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

pub struct IntentRouter {
    model: Arc<dyn CompletionModel>,
    classifier: Box<dyn ServiceClassifier>,
    max_retries: u32,
}

impl IntentRouter {
    pub fn new(model: Arc<dyn CompletionModel>, max_retries: u32) -> Self {
        Self {
            model,
            classifier: Box::new(KeywordClassifier),
            max_retries,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn ServiceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Route a command to a service and extract its intent.
    ///
    /// `None` means the model could not produce a schema-valid intent
    /// within its retry budget - "command not understood", not an error.
    pub async fn route(&self, command: &str) -> (Option<Intent>, Service) {
        let service = self.classifier.classify(command);
        let system_prompt = match service {
            Service::Mail => prompts::MAIL_SYSTEM_PROMPT,
            Service::Calendar => prompts::CALENDAR_SYSTEM_PROMPT,
            Service::Drive => prompts::DRIVE_SYSTEM_PROMPT,
        };

        let intent: Option<Intent> =
            parse_structured(self.model.as_ref(), system_prompt, command, self.max_retries).await;

        if let Some(parsed) = &intent {
            tracing::debug!(
                service = %service,
                intent = %parsed.name,
                confidence = parsed.confidence,
                "intent parsed"
            );
        }
        (intent, service)
    }

    /// Confidence gate. Boundary inclusive: exactly 0.7 passes at the
    /// default threshold.
    pub fn is_confident(&self, intent: &Intent, threshold: f32) -> bool {
        let confident = intent.confidence >= threshold;
        if !confident {
            if let Some(reasoning) = &intent.reasoning {
                tracing::warn!("low confidence: {reasoning}");
            }
        }
        confident
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use async_trait::async_trait;
    use serde_json::Map;

    struct FixedModel(String);

    #[async_trait]
    impl CompletionModel for FixedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_route_classifies_and_parses() {
        let model = Arc::new(FixedModel(
            r#"{"intent": "list_events", "parameters": {"days": 7}, "confidence": 0.9}"#.into(),
        ));
        let router = IntentRouter::new(model, 2);

        let (intent, service) = router.route("show my meetings this week").await;
        assert_eq!(service, Service::Calendar);
        let intent = intent.unwrap();
        assert_eq!(intent.name, "list_events");
    }

    #[tokio::test]
    async fn test_route_garbage_returns_none_with_service() {
        let model = Arc::new(FixedModel("no json here".into()));
        let router = IntentRouter::new(model, 1);

        let (intent, service) = router.route("upload the report").await;
        assert!(intent.is_none());
        assert_eq!(service, Service::Drive);
    }

    #[tokio::test]
    async fn test_confidence_boundary_inclusive() {
        let model = Arc::new(FixedModel(String::new()));
        let router = IntentRouter::new(model, 0);

        let at_boundary = Intent::synthetic("send_email", Map::new(), 0.7);
        let below = Intent::synthetic("send_email", Map::new(), 0.69);
        assert!(router.is_confident(&at_boundary, CONFIDENCE_THRESHOLD));
        assert!(!router.is_confident(&below, CONFIDENCE_THRESHOLD));
    }
}
