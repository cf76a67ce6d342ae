use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestraError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Unknown intent '{intent}' for service {service}")]
    UnknownIntent { service: String, intent: String },

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, OrchestraError>;
