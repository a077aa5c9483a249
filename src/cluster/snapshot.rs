use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// The subset of `/stats` the orchestrator relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsPayload {
    pub nodename: String,
    pub ring_members: Vec<String>,
    pub ring_creation_size: u64,
}

impl StatsPayload {
    pub fn decode(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| OrchestratorError::InvalidResponse(e.to_string()))
    }
}

/// Cluster state captured once at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSnapshot {
    /// This node's name as the cluster knows it.
    pub node_name: String,
    /// Ring membership in the order the cluster reported it, duplicates kept.
    pub ring_members: Vec<String>,
    pub ring_creation_size: u64,
    pub software_version: String,
}

impl ClusterSnapshot {
    pub fn from_payload(payload: StatsPayload, software_version: impl Into<String>) -> Self {
        Self {
            node_name: payload.nodename,
            ring_members: payload.ring_members,
            ring_creation_size: payload.ring_creation_size,
            software_version: software_version.into(),
        }
    }

    /// Number of times this node appears in the ring member list.
    pub fn membership_count(&self) -> usize {
        self.ring_members
            .iter()
            .filter(|member| **member == self.node_name)
            .count()
    }

    /// This node already belongs to (or is staged into) a multi-node ring,
    /// so issuing another join would be redundant.
    pub fn already_joined(&self) -> bool {
        self.membership_count() > 0 && self.ring_members.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(node: &str, members: &[&str]) -> ClusterSnapshot {
        ClusterSnapshot {
            node_name: node.to_string(),
            ring_members: members.iter().map(|m| m.to_string()).collect(),
            ring_creation_size: 64,
            software_version: "3.0.1".to_string(),
        }
    }

    #[test]
    fn decode_stats_payload() {
        let body = br#"{
            "nodename": "riak@10.0.0.1",
            "ring_members": ["riak@10.0.0.1", "riak@10.0.0.2"],
            "ring_creation_size": 64,
            "riak_kv_version": "3.0.1",
            "vnode_gets": 12
        }"#;
        let payload = StatsPayload::decode(body).unwrap();
        assert_eq!(payload.nodename, "riak@10.0.0.1");
        assert_eq!(payload.ring_members.len(), 2);
        assert_eq!(payload.ring_creation_size, 64);

        let snap = ClusterSnapshot::from_payload(payload, "riak 3.0.1");
        assert_eq!(snap.node_name, "riak@10.0.0.1");
        assert_eq!(snap.software_version, "riak 3.0.1");
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let body = br#"{"nodename": "riak@10.0.0.1", "ring_creation_size": 64}"#;
        assert!(matches!(
            StatsPayload::decode(body),
            Err(OrchestratorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(matches!(
            StatsPayload::decode(b"<html>starting</html>"),
            Err(OrchestratorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn already_joined_needs_membership_and_peers() {
        assert!(snapshot("a", &["a", "b"]).already_joined());
        assert!(!snapshot("a", &["a"]).already_joined());
        assert!(!snapshot("a", &["b", "c"]).already_joined());
        assert!(!snapshot("a", &[]).already_joined());
    }

    #[test]
    fn membership_count_keeps_duplicates() {
        let snap = snapshot("a", &["a", "b", "a"]);
        assert_eq!(snap.membership_count(), 2);
        assert!(snap.already_joined());
    }
}
