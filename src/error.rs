use thiserror::Error;

/// The bounded wait that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    Stats,
    Handoffs,
    Ring,
}

impl std::fmt::Display for WaitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitStage::Stats => write!(f, "Timeout, could not fetch Riak stats."),
            WaitStage::Handoffs => write!(f, "Timeout waiting for handoffs."),
            WaitStage::Ring => write!(f, "Timeout waiting for nodes to agree on ring."),
        }
    }
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("{0}")]
    Timeout(WaitStage),

    #[error("Could not parse Riak stats: {0}")]
    InvalidResponse(String),

    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl OrchestratorError {
    /// Raw output of the failing admin command, if this error carries one.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            OrchestratorError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
