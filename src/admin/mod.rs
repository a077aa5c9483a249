//! Access to the Riak command-line administration tools.
//!
//! - [`AdminExecutor`]: the injected capability that runs one [`Invocation`]
//! - [`ProcessExecutor`]: production executor spawning `riak` / `riak-admin`
//! - [`markers`]: named predicates over the tools' text output

pub mod executor;
pub mod markers;

pub use executor::{AdminExecutor, AdminTool, CommandOutput, Invocation, ProcessExecutor};
