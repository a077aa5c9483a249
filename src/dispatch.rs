use crate::admin::markers;
use crate::admin::{AdminExecutor, CommandOutput, Invocation};
use crate::cluster::ClusterSnapshot;
use crate::error::{OrchestratorError, Result};

/// Reported instead of running `cluster join` when the node is already a member.
pub const ALREADY_JOINED: &str = "Node is already in cluster or staged to be in cluster.";

/// One administrative operation requested for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping { target_node: String },
    KvTest,
    Join { target_node: String },
    Plan,
    Commit,
}

impl Command {
    /// Key under which the command's output is reported.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "ping",
            Command::KvTest => "kv_test",
            Command::Join { .. } => "join",
            Command::Plan => "plan",
            Command::Commit => "commit",
        }
    }

    /// Node the command is aimed at, for commands that take one.
    pub fn target_node(&self) -> Option<&str> {
        match self {
            Command::Ping { target_node } | Command::Join { target_node } => Some(target_node),
            Command::KvTest | Command::Plan | Command::Commit => None,
        }
    }

    fn invocation(&self) -> Invocation {
        match self {
            Command::Ping { target_node } => Invocation::ping(target_node),
            Command::KvTest => Invocation::kv_test(),
            Command::Join { target_node } => Invocation::cluster_join(target_node),
            Command::Plan => Invocation::cluster_plan(),
            Command::Commit => Invocation::cluster_commit(),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: Command,
    pub raw_output: String,
    /// Durable cluster state was (or may have been) modified.
    pub changed: bool,
}

/// Run an invocation and turn a non-zero exit into `CommandFailed`.
pub(crate) async fn run_checked<E>(admin: &E, invocation: &Invocation) -> Result<CommandOutput>
where
    E: AdminExecutor + ?Sized,
{
    let result = admin.run(invocation).await?;
    if result.success() {
        Ok(result)
    } else {
        tracing::error!(
            command = %invocation,
            exit_code = ?result.exit_code,
            "Admin command failed"
        );
        Err(OrchestratorError::CommandFailed {
            command: invocation.to_string(),
            output: result.output,
        })
    }
}

/// Execute `command` against the cluster described by `snapshot`.
pub async fn dispatch<E>(
    admin: &E,
    snapshot: &ClusterSnapshot,
    command: &Command,
) -> Result<CommandOutcome>
where
    E: AdminExecutor + ?Sized,
{
    // `cluster join` errors out on nodes that already joined, so membership
    // has to be decided from the snapshot first.
    if matches!(command, Command::Join { .. }) && snapshot.already_joined() {
        tracing::info!(
            node_name = %snapshot.node_name,
            ring_members = snapshot.ring_members.len(),
            "Node already in cluster, skipping join"
        );
        return Ok(CommandOutcome {
            command: command.clone(),
            raw_output: ALREADY_JOINED.to_string(),
            changed: false,
        });
    }

    let invocation = command.invocation();
    tracing::info!(command = %command, invocation = %invocation, "Dispatching admin command");
    let result = run_checked(admin, &invocation).await?;

    let changed = match command {
        Command::Ping { .. } | Command::KvTest => false,
        Command::Join { .. } | Command::Commit => true,
        Command::Plan => markers::has_staged_changes(&result.output),
    };

    tracing::info!(command = %command, changed, "Admin command succeeded");
    Ok(CommandOutcome {
        command: command.clone(),
        raw_output: result.output,
        changed,
    })
}
