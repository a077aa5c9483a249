use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::AdminConfig;
use crate::error::{OrchestratorError, Result};

/// Which Riak command-line tool an invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTool {
    /// The `riak` control script (`ping`, `version`).
    Riak,
    /// The admin interface (`riak-admin`, or `riak admin`).
    RiakAdmin,
}

impl std::fmt::Display for AdminTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminTool::Riak => write!(f, "riak"),
            AdminTool::RiakAdmin => write!(f, "riak-admin"),
        }
    }
}

/// A single administrative command line, independent of where the tools live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: AdminTool,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn riak<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: AdminTool::Riak,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn admin<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: AdminTool::RiakAdmin,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn version() -> Self {
        Self::riak(["version"])
    }

    pub fn ping(target_node: &str) -> Self {
        Self::riak(["ping", target_node])
    }

    pub fn kv_test() -> Self {
        Self::admin(["test"])
    }

    pub fn cluster_join(target_node: &str) -> Self {
        Self::admin(["cluster", "join", target_node])
    }

    pub fn cluster_plan() -> Self {
        Self::admin(["cluster", "plan"])
    }

    pub fn cluster_commit() -> Self {
        Self::admin(["cluster", "commit"])
    }

    pub fn transfers() -> Self {
        Self::admin(["transfers"])
    }

    pub fn ring_ready() -> Self {
        Self::admin(["ringready"])
    }

    pub fn wait_for_service(service: &str, node_name: &str) -> Self {
        Self::admin(["wait_for_service", service, node_name])
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tool)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status and captured text of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// stdout followed by stderr.
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs administrative invocations against the local Riak installation.
#[async_trait]
pub trait AdminExecutor: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

#[async_trait]
impl<T: AdminExecutor + ?Sized> AdminExecutor for Arc<T> {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).run(invocation).await
    }
}

/// Spawns the configured `riak` / `riak-admin` binaries.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: AdminConfig,
}

impl ProcessExecutor {
    pub fn new(config: AdminConfig) -> Self {
        Self { config }
    }

    /// Program and argument vector for an invocation.
    pub fn command_line(&self, invocation: &Invocation) -> (PathBuf, Vec<String>) {
        match (invocation.tool, &self.config.riak_admin_bin) {
            (AdminTool::Riak, _) => (self.config.riak_bin.clone(), invocation.args.clone()),
            (AdminTool::RiakAdmin, Some(admin)) => (admin.clone(), invocation.args.clone()),
            (AdminTool::RiakAdmin, None) => {
                let mut args = Vec::with_capacity(invocation.args.len() + 1);
                args.push("admin".to_string());
                args.extend(invocation.args.iter().cloned());
                (self.config.riak_bin.clone(), args)
            }
        }
    }
}

#[async_trait]
impl AdminExecutor for ProcessExecutor {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let (program, args) = self.command_line(invocation);
        tracing::debug!(program = %program.display(), ?args, "Running admin command");

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                tracing::error!(program = %program.display(), error = %e, "Admin command could not be started");
                OrchestratorError::Spawn {
                    program: program.display().to_string(),
                    source: e,
                }
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code();

        tracing::debug!(command = %invocation, exit_code = ?exit_code, "Admin command finished");

        Ok(CommandOutput {
            exit_code,
            output: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_display_reads_like_a_shell_line() {
        assert_eq!(
            Invocation::cluster_join("riak@10.0.0.2").to_string(),
            "riak-admin cluster join riak@10.0.0.2"
        );
        assert_eq!(Invocation::ping("riak@a").to_string(), "riak ping riak@a");
        assert_eq!(
            Invocation::wait_for_service("riak_kv", "riak@a").to_string(),
            "riak-admin wait_for_service riak_kv riak@a"
        );
    }

    #[test]
    fn admin_invocations_fall_back_to_riak_admin_subcommand() {
        let executor = ProcessExecutor::new(AdminConfig::default());
        let (program, args) = executor.command_line(&Invocation::ring_ready());
        assert_eq!(program, PathBuf::from("riak"));
        assert_eq!(args, vec!["admin", "ringready"]);

        let (program, args) = executor.command_line(&Invocation::version());
        assert_eq!(program, PathBuf::from("riak"));
        assert_eq!(args, vec!["version"]);
    }

    #[test]
    fn admin_invocations_use_standalone_binary_when_configured() {
        let executor =
            ProcessExecutor::new(AdminConfig::default().with_riak_admin("/opt/riak/riak-admin"));
        let (program, args) = executor.command_line(&Invocation::transfers());
        assert_eq!(program, PathBuf::from("/opt/riak/riak-admin"));
        assert_eq!(args, vec!["transfers"]);
    }

    #[test]
    fn command_output_success_requires_zero_exit() {
        assert!(CommandOutput::new(0, "").success());
        assert!(!CommandOutput::new(1, "").success());
        let killed = CommandOutput {
            exit_code: None,
            output: String::new(),
        };
        assert!(!killed.success());
    }
}
