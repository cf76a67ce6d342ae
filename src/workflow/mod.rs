pub mod context;
pub mod engine;

pub use context::WorkflowContext;
pub use engine::{MultiServiceIntent, StepStatus, WorkflowEngine, WorkflowStep};
