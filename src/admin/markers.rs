//! Output predicates for the admin tools.
//!
//! The Riak CLI has no structured output, so cluster conditions are read by
//! looking for fixed phrases. Each condition lives behind its own function so
//! callers never match on text directly.

use super::executor::CommandOutput;

pub const STAGED_CHANGES: &str = "Staged Changes";
pub const NO_TRANSFERS: &str = "No transfers active";
pub const RING_AGREES: &str = "TRUE All nodes agree on the ring";

/// `cluster plan` reported pending membership changes.
pub fn has_staged_changes(output: &str) -> bool {
    output.contains(STAGED_CHANGES)
}

/// `transfers` reported no handoffs in flight. The exit code is not consulted.
pub fn handoffs_drained(output: &str) -> bool {
    output.contains(NO_TRANSFERS)
}

/// `ringready` succeeded and every member holds the same ring.
pub fn ring_agrees(result: &CommandOutput) -> bool {
    result.success() && result.output.contains(RING_AGREES)
}
