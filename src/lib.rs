pub mod admin;
pub mod cluster;
pub mod config;
pub mod converge;
pub mod dispatch;
pub mod error;
pub mod orchestrator;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{Orchestrator, Report, RunRequest};
