//! Sequencing of a single orchestration run.
//!
//! A run captures a [`ClusterSnapshot`], then executes an ordered list of
//! [`Stage`]s (command dispatch, handoff drain, service wait, ring wait) and
//! finally records whether the ring agrees. The first failing stage aborts the
//! run; no partial [`Report`] is returned.

use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::admin::{AdminExecutor, ProcessExecutor};
use crate::cluster::{fetch_snapshot, ClusterSnapshot, HttpStatsClient, StatsSource};
use crate::config::OrchestratorConfig;
use crate::converge::{self, Service, WaitOutcome, HANDOFFS_COMPLETE};
use crate::dispatch::{dispatch, Command, CommandOutcome};
use crate::error::Result;

/// Convergence waits requested for a run. Zero durations disable a wait.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergenceRequest {
    pub wait_for_handoffs: Duration,
    pub wait_for_ring: Duration,
    pub wait_for_service: Option<Service>,
}

/// Everything the caller asks of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub command: Option<Command>,
    pub convergence: ConvergenceRequest,
}

impl RunRequest {
    pub fn command(command: Command) -> Self {
        Self {
            command: Some(command),
            ..Default::default()
        }
    }

    pub fn with_handoff_wait(mut self, timeout: Duration) -> Self {
        self.convergence.wait_for_handoffs = timeout;
        self
    }

    pub fn with_ring_wait(mut self, timeout: Duration) -> Self {
        self.convergence.wait_for_ring = timeout;
        self
    }

    pub fn with_service_wait(mut self, service: Service) -> Self {
        self.convergence.wait_for_service = Some(service);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Dispatch(Command),
    HandoffDrain(Duration),
    ServiceReady(Service),
    RingAgreement(Duration),
}

/// Stages to run for `request`, in execution order.
pub fn plan_stages(request: &RunRequest) -> Vec<Stage> {
    let mut stages = Vec::new();
    if let Some(command) = &request.command {
        stages.push(Stage::Dispatch(command.clone()));
    }
    let waits = &request.convergence;
    if !waits.wait_for_handoffs.is_zero() {
        stages.push(Stage::HandoffDrain(waits.wait_for_handoffs));
    }
    if let Some(service) = waits.wait_for_service {
        stages.push(Stage::ServiceReady(service));
    }
    if !waits.wait_for_ring.is_zero() {
        stages.push(Stage::RingAgreement(waits.wait_for_ring));
    }
    stages
}

#[derive(Debug)]
enum StageOutcome {
    Command(CommandOutcome),
    HandoffsDrained,
    Service(String),
    Ring(WaitOutcome),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub node_name: String,
    pub nodes: Vec<String>,
    pub ring_size: u64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kv_test: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoffs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ring_wait: Option<WaitOutcome>,
    pub ring_ready: bool,
    pub changed: bool,
}

impl Report {
    fn new(snapshot: &ClusterSnapshot) -> Self {
        Self {
            node_name: snapshot.node_name.clone(),
            nodes: snapshot.ring_members.clone(),
            ring_size: snapshot.ring_creation_size,
            version: snapshot.software_version.clone(),
            ping: None,
            kv_test: None,
            join: None,
            plan: None,
            commit: None,
            handoffs: None,
            service: None,
            ring_wait: None,
            ring_ready: false,
            changed: false,
        }
    }

    /// Output of whichever command ran, if any.
    pub fn command_output(&self) -> Option<&str> {
        [&self.ping, &self.kv_test, &self.join, &self.plan, &self.commit]
            .into_iter()
            .find_map(|field| field.as_deref())
    }

    fn apply(&mut self, outcome: StageOutcome) {
        match outcome {
            StageOutcome::Command(outcome) => {
                let slot = match outcome.command {
                    Command::Ping { .. } => &mut self.ping,
                    Command::KvTest => &mut self.kv_test,
                    Command::Join { .. } => &mut self.join,
                    Command::Plan => &mut self.plan,
                    Command::Commit => &mut self.commit,
                };
                *slot = Some(outcome.raw_output);
                self.changed |= outcome.changed;
            }
            StageOutcome::HandoffsDrained => {
                self.handoffs = Some(HANDOFFS_COMPLETE.to_string());
            }
            StageOutcome::Service(output) => self.service = Some(output),
            StageOutcome::Ring(wait) => self.ring_wait = Some(wait),
        }
    }
}

/// Drives one run against a cluster through the injected collaborators.
pub struct Orchestrator<S, E> {
    config: OrchestratorConfig,
    stats: S,
    admin: E,
}

impl Orchestrator<HttpStatsClient, ProcessExecutor> {
    /// Production wiring: reqwest for `/stats`, spawned processes for the CLI.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self> {
        let stats = HttpStatsClient::new(&config.stats)?;
        let admin = ProcessExecutor::new(config.admin.clone());
        Ok(Self::new(config, stats, admin))
    }
}

impl<S, E> Orchestrator<S, E>
where
    S: StatsSource,
    E: AdminExecutor,
{
    pub fn new(config: OrchestratorConfig, stats: S, admin: E) -> Self {
        Self {
            config,
            stats,
            admin,
        }
    }

    /// Execute `request` and return the assembled report.
    pub async fn run(&self, request: &RunRequest) -> Result<Report> {
        let run_id = Uuid::new_v4();
        let target_node = request
            .command
            .as_ref()
            .and_then(Command::target_node)
            .unwrap_or_default();
        let span = tracing::info_span!("orchestrate", %run_id, target_node);
        self.run_stages(request).instrument(span).await
    }

    async fn run_stages(&self, request: &RunRequest) -> Result<Report> {
        let snapshot = fetch_snapshot(&self.stats, &self.admin, &self.config.stats).await?;
        let mut report = Report::new(&snapshot);

        for stage in plan_stages(request) {
            tracing::info!(stage = ?stage, "Running stage");
            let outcome = self.run_stage(&snapshot, stage).await?;
            report.apply(outcome);
        }

        report.ring_ready = converge::ring_agrees(&self.admin).await;
        tracing::info!(
            changed = report.changed,
            ring_ready = report.ring_ready,
            "Orchestration finished"
        );
        Ok(report)
    }

    async fn run_stage(&self, snapshot: &ClusterSnapshot, stage: Stage) -> Result<StageOutcome> {
        let outcome = match stage {
            Stage::Dispatch(command) => {
                StageOutcome::Command(dispatch(&self.admin, snapshot, &command).await?)
            }
            Stage::HandoffDrain(timeout) => {
                converge::wait_for_handoffs(&self.admin, timeout, self.config.poll_interval)
                    .await?;
                StageOutcome::HandoffsDrained
            }
            Stage::ServiceReady(service) => StageOutcome::Service(
                converge::wait_for_service(&self.admin, service, &snapshot.node_name).await?,
            ),
            Stage::RingAgreement(timeout) => StageOutcome::Ring(
                converge::wait_for_ring(
                    &self.admin,
                    timeout,
                    self.config.poll_interval,
                    self.config.ring_deadline,
                )
                .await?,
            ),
        };
        Ok(outcome)
    }
}
