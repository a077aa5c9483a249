//! Waiters for asynchronous cluster conditions.
//!
//! Each waiter polls an admin command on a fixed interval. Deadlines are
//! computed once, when the waiter starts.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};

use crate::admin::markers;
use crate::admin::{AdminExecutor, Invocation};
use crate::config::RingDeadline;
use crate::dispatch::run_checked;
use crate::error::{OrchestratorError, Result, WaitStage};

/// Status string reported once handoffs have drained.
pub const HANDOFFS_COMPLETE: &str = "No transfers active.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitOutcome {
    Completed,
    TimedOut,
}

/// Riak services that can be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Kv,
}

impl Service {
    /// Name understood by `riak-admin wait_for_service`.
    pub fn admin_name(&self) -> &'static str {
        match self {
            Service::Kv => "riak_kv",
        }
    }
}

/// Deadline `timeout` from now. `None` when the sum does not fit in an
/// `Instant`, which means the wait has no deadline.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() > deadline)
}

/// One `ringready` query. Failures to run the tool count as disagreement.
pub async fn ring_agrees<E>(admin: &E) -> bool
where
    E: AdminExecutor + ?Sized,
{
    match admin.run(&Invocation::ring_ready()).await {
        Ok(result) => markers::ring_agrees(&result),
        Err(e) => {
            tracing::warn!(error = %e, "Ring readiness check could not run");
            false
        }
    }
}

/// Poll `transfers` until no handoffs are active or `timeout` elapses.
pub async fn wait_for_handoffs<E>(
    admin: &E,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<WaitOutcome>
where
    E: AdminExecutor + ?Sized,
{
    let deadline = deadline_after(timeout);
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let result = admin.run(&Invocation::transfers()).await?;
        if markers::handoffs_drained(&result.output) {
            tracing::info!(polls, "Handoffs drained");
            return Ok(WaitOutcome::Completed);
        }
        tracing::debug!(polls, "Handoffs still active");

        sleep(poll_interval).await;
        if expired(deadline) {
            tracing::error!(polls, timeout_secs = timeout.as_secs(), "Handoffs did not drain in time");
            return Err(OrchestratorError::Timeout(WaitStage::Handoffs));
        }
    }
}

/// Poll `ringready` until all members agree on the ring.
///
/// With [`RingDeadline::AfterAgreement`] and [`RingDeadline::Flagged`] the
/// loop itself is unbounded: `timeout` is only compared once agreement has
/// been reached. A ring that never converges keeps this future pending.
pub async fn wait_for_ring<E>(
    admin: &E,
    timeout: Duration,
    poll_interval: Duration,
    policy: RingDeadline,
) -> Result<WaitOutcome>
where
    E: AdminExecutor + ?Sized,
{
    let deadline = deadline_after(timeout);
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        if ring_agrees(admin).await {
            break;
        }
        tracing::debug!(polls, "Ring not yet agreed");
        sleep(poll_interval).await;

        if policy == RingDeadline::Enforced && expired(deadline) {
            tracing::error!(polls, timeout_secs = timeout.as_secs(), "Ring did not converge in time");
            return Err(OrchestratorError::Timeout(WaitStage::Ring));
        }
    }

    if !expired(deadline) {
        tracing::info!(polls, "All nodes agree on the ring");
        return Ok(WaitOutcome::Completed);
    }

    match policy {
        RingDeadline::Flagged => {
            tracing::warn!(polls, timeout_secs = timeout.as_secs(), "Ring agreed after the deadline");
            Ok(WaitOutcome::TimedOut)
        }
        RingDeadline::AfterAgreement | RingDeadline::Enforced => {
            tracing::error!(polls, timeout_secs = timeout.as_secs(), "Ring agreed after the deadline");
            Err(OrchestratorError::Timeout(WaitStage::Ring))
        }
    }
}

/// Block on `wait_for_service` until `service` is up on `node_name`.
/// Returns the tool's output.
pub async fn wait_for_service<E>(admin: &E, service: Service, node_name: &str) -> Result<String>
where
    E: AdminExecutor + ?Sized,
{
    tracing::info!(service = service.admin_name(), node_name, "Waiting for service");
    let invocation = Invocation::wait_for_service(service.admin_name(), node_name);
    let result = run_checked(admin, &invocation).await?;
    Ok(result.output)
}
