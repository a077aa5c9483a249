use std::path::PathBuf;
use std::time::Duration;

/// Where and how the cluster statistics endpoint is polled.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Address of the Riak HTTP listener, `host:port` or a full base URL.
    pub http_conn: String,
    /// Verify TLS certificates when the endpoint is served over https.
    pub validate_certs: bool,
    /// Overall wall-clock budget for obtaining a successful response.
    pub deadline: Duration,
    /// Pause between attempts after a non-success response.
    pub retry_interval: Duration,
    /// Timeout applied to each individual GET.
    pub request_timeout: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            http_conn: "127.0.0.1:8098".to_string(),
            validate_certs: true,
            deadline: Duration::from_secs(120),
            retry_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl StatsConfig {
    pub fn new(http_conn: impl Into<String>) -> Self {
        Self {
            http_conn: http_conn.into(),
            ..Default::default()
        }
    }

    /// Full URL of the `/stats` resource.
    pub fn stats_url(&self) -> String {
        let base = self.http_conn.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}/stats", base)
        } else {
            format!("http://{}/stats", base)
        }
    }
}

/// Locations of the Riak command-line tools.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// The `riak` control script. Resolved through `PATH` when relative.
    pub riak_bin: PathBuf,
    /// A standalone `riak-admin` script. When absent, admin commands run as
    /// `riak admin <args>`.
    pub riak_admin_bin: Option<PathBuf>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            riak_bin: PathBuf::from("riak"),
            riak_admin_bin: None,
        }
    }
}

impl AdminConfig {
    /// Look for a `riak-admin` executable on `PATH`, keeping the default
    /// `riak` binary otherwise.
    pub fn discover() -> Self {
        let riak_admin_bin = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join("riak-admin"))
                .find(|candidate| candidate.is_file())
        });
        Self {
            riak_admin_bin,
            ..Default::default()
        }
    }

    pub fn with_riak_admin(mut self, path: impl Into<PathBuf>) -> Self {
        self.riak_admin_bin = Some(path.into());
        self
    }
}

/// How the `wait_for_ring` duration is applied.
///
/// The classic behaviour only compares the clock once agreement has been
/// reached, so a ring that never agrees keeps the run polling forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingDeadline {
    /// Poll until agreement, then fail if the deadline has passed.
    #[default]
    AfterAgreement,
    /// Poll until agreement, then record a late agreement as timed out
    /// without failing the run.
    Flagged,
    /// Check the deadline after every poll and fail as soon as it passes.
    Enforced,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub stats: StatsConfig,
    pub admin: AdminConfig,
    /// Pause between transfer-status and ring-readiness polls.
    pub poll_interval: Duration,
    pub ring_deadline: RingDeadline,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stats: StatsConfig::default(),
            admin: AdminConfig::default(),
            poll_interval: Duration::from_secs(10),
            ring_deadline: RingDeadline::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_admin(mut self, admin: AdminConfig) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_ring_deadline(mut self, ring_deadline: RingDeadline) -> Self {
        self.ring_deadline = ring_deadline;
        self
    }
}
