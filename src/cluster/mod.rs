//! Cluster snapshot capture.
//!
//! - [`ClusterSnapshot`]: node identity, ring membership, ring size and version
//! - [`StatsSource`]: HTTP GET capability; [`HttpStatsClient`] is the reqwest one
//! - [`fetch_snapshot`]: deadline-bounded retry against `/stats`

pub mod snapshot;
pub mod stats;

pub use snapshot::{ClusterSnapshot, StatsPayload};
pub use stats::{
    fetch_snapshot, fetch_stats, HttpStatsClient, StatsResponse, StatsSource, TransportError,
};
