pub mod config;
pub mod error;

pub use config::Settings;
pub use error::{OrchestraError, Result};
