//! Runtime configuration
//!
//! Settings are read from environment variables with an optional TOML
//! overlay file for anything that is awkward to pass through the
//! environment (internal domain, undo capacity).

use crate::core::error::{OrchestraError, Result};
use serde::Deserialize;

/// Configuration for the orchestrator and its collaborators
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API key for the LLM backend. Without it the orchestrator still
    /// runs, but natural language commands are unavailable.
    pub api_key: Option<String>,

    /// Endpoint URL. Anthropic and OpenAI-compatible formats are
    /// detected from the URL.
    pub api_url: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Retries after a malformed or schema-invalid LLM response.
    ///
    /// With 2 retries a command costs at most 3 completion calls before
    /// the router reports "not understood".
    pub max_llm_retries: u32,

    /// Domain suffix considered internal for file sharing.
    ///
    /// Sharing to any address outside this domain always requires
    /// confirmation.
    pub internal_domain: String,

    /// Maximum recorded undo actions. Oldest entries are evicted first.
    pub undo_capacity: usize,

    /// Session id used when the caller does not supply one.
    pub default_session: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-3-haiku-20240307".into(),
            max_llm_retries: 2,
            internal_domain: "@example.com".into(),
            undo_capacity: 10,
            default_session: "default".into(),
        }
    }
}

impl Settings {
    /// Build settings from environment variables
    ///
    /// Recognized: LLM_API_KEY, LLM_API_URL, LLM_MODEL,
    /// ORCHESTRA_INTERNAL_DOMAIN, ORCHESTRA_SESSION.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.api_key = std::env::var("LLM_API_KEY").ok();
        if let Ok(url) = std::env::var("LLM_API_URL") {
            settings.api_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            settings.model = model;
        }
        if let Ok(domain) = std::env::var("ORCHESTRA_INTERNAL_DOMAIN") {
            settings.internal_domain = domain;
        }
        if let Ok(session) = std::env::var("ORCHESTRA_SESSION") {
            settings.default_session = session;
        }
        settings
    }

    /// Load settings from a TOML file, then apply environment overrides
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&text)
            .map_err(|e| OrchestraError::Config(format!("{}: {}", path.display(), e)))?;

        // Environment always wins over the file.
        let env = Self::from_env();
        if env.api_key.is_some() {
            settings.api_key = env.api_key;
        }
        if std::env::var("LLM_API_URL").is_ok() {
            settings.api_url = env.api_url;
        }
        if std::env::var("LLM_MODEL").is_ok() {
            settings.model = env.model;
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.undo_capacity, 10);
        assert_eq!(settings.max_llm_retries, 2);
        assert!(settings.internal_domain.starts_with('@'));
    }

    #[test]
    fn test_toml_overlay() {
        let settings: Settings =
            toml::from_str("internal_domain = \"@corp.test\"\nundo_capacity = 5\n").unwrap();
        assert_eq!(settings.internal_domain, "@corp.test");
        assert_eq!(settings.undo_capacity, 5);
        // Unset fields fall back to defaults
        assert_eq!(settings.default_session, "default");
    }
}
