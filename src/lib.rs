//! Orchestra - natural-language command orchestration over mail,
//! calendar and file-storage capabilities

pub mod core;
pub mod inference;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod safety;
pub mod services;
pub mod session;
pub mod workflow;
