
use std::time::Duration;

use tokio::time::Instant;

use riak_orchestrator::admin::CommandOutput;
use riak_orchestrator::cluster::{
    fetch_snapshot, fetch_stats, HttpStatsClient, StatsResponse,
};
use riak_orchestrator::config::StatsConfig;
use riak_orchestrator::error::WaitStage;
use riak_orchestrator::OrchestratorError;
use test_harness::{stats_body, ScriptedExecutor, ScriptedStats, StatsServer};

fn scripted_config() -> StatsConfig {
    StatsConfig::new("10.0.0.1:8098")
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_from_first_response() {
    let stats = ScriptedStats::ok(stats_body(
        "riak@10.0.0.1",
        &["riak@10.0.0.1", "riak@10.0.0.2"],
        64,
    ));
    let admin = ScriptedExecutor::new().respond("riak version", vec![CommandOutput::new(0, "3.0.1\n")]);

    let snapshot = fetch_snapshot(&stats, &admin, &scripted_config())
        .await
        .expect("snapshot should be captured");

    assert_eq!(snapshot.node_name, "riak@10.0.0.1");
    assert_eq!(snapshot.ring_members, vec!["riak@10.0.0.1", "riak@10.0.0.2"]);
    assert_eq!(snapshot.ring_creation_size, 64);
    assert_eq!(snapshot.software_version, "3.0.1");
    assert_eq!(stats.attempts(), 1);
    assert_eq!(admin.calls(), vec!["riak version"]);
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_endpoint_is_up() {
    let stats = ScriptedStats::new(vec![
        Ok(StatsResponse::new(503, "")),
        Err("connection refused".to_string()),
        Ok(StatsResponse::new(500, "")),
        Ok(StatsResponse::new(200, stats_body("riak@10.0.0.1", &["riak@10.0.0.1"], 64))),
    ]);

    let start = Instant::now();
    let body = fetch_stats(&stats, &scripted_config())
        .await
        .expect("stats should eventually be fetched");

    assert!(!body.is_empty());
    assert_eq!(stats.attempts(), 4);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));

    let times = stats.attempt_times();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_endpoint_times_out() {
    let stats = ScriptedStats::unavailable();
    let admin = ScriptedExecutor::healthy();

    let start = Instant::now();
    let result = fetch_snapshot(&stats, &admin, &scripted_config()).await;
    let elapsed = start.elapsed();

    assert!(matches!(
        result,
        Err(OrchestratorError::Timeout(WaitStage::Stats))
    ));
    assert!(elapsed >= Duration::from_secs(120));
    assert!(elapsed <= Duration::from_secs(125), "elapsed {:?}", elapsed);
    assert!(
        stats.attempts() >= 24,
        "expected at least 24 attempts, got {}",
        stats.attempts()
    );
    // The version is only queried once stats are in hand.
    assert!(admin.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_and_interval_are_configurable() {
    let stats = ScriptedStats::unavailable();
    let config = StatsConfig {
        deadline: Duration::from_secs(10),
        retry_interval: Duration::from_secs(3),
        ..scripted_config()
    };

    let result = fetch_stats(&stats, &config).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Timeout(WaitStage::Stats))
    ));
    // Attempts at 0s, 3s, 6s and 9s; the check at 12s gives up.
    assert_eq!(stats.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_deadline_keeps_retrying() {
    let stats = ScriptedStats::new(vec![
        Ok(StatsResponse::new(503, "")),
        Ok(StatsResponse::new(200, stats_body("riak@10.0.0.1", &["riak@10.0.0.1"], 64))),
    ]);
    let config = StatsConfig {
        deadline: Duration::from_secs(u64::MAX),
        ..scripted_config()
    };

    let body = fetch_stats(&stats, &config).await.unwrap();

    assert!(!body.is_empty());
    assert_eq!(stats.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_stats_fail_without_retry() {
    let stats = ScriptedStats::ok(b"{\"nodename\": \"riak@10.0.0.1\"}".to_vec());
    let admin = ScriptedExecutor::healthy();

    let result = fetch_snapshot(&stats, &admin, &scripted_config()).await;

    assert!(matches!(result, Err(OrchestratorError::InvalidResponse(_))));
    assert_eq!(stats.attempts(), 1);
}

#[tokio::test]
async fn test_http_client_reads_stats_endpoint() {
    let server = StatsServer::spawn(
        stats_body("riak@127.0.0.1", &["riak@127.0.0.1", "riak@127.0.0.2"], 128),
        0,
    )
    .await;
    let config = StatsConfig::new(server.addr.to_string());
    let client = HttpStatsClient::new(&config).unwrap();
    let admin = ScriptedExecutor::healthy();

    let snapshot = fetch_snapshot(&client, &admin, &config)
        .await
        .expect("snapshot should be captured over HTTP");

    assert_eq!(snapshot.node_name, "riak@127.0.0.1");
    assert_eq!(snapshot.ring_creation_size, 128);
    assert_eq!(snapshot.ring_members.len(), 2);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_http_client_retries_service_unavailable() {
    let server = StatsServer::spawn(stats_body("riak@127.0.0.1", &["riak@127.0.0.1"], 64), 2).await;
    let config = StatsConfig {
        retry_interval: Duration::from_millis(20),
        deadline: Duration::from_secs(10),
        ..StatsConfig::new(format!("http://{}", server.addr))
    };
    let client = HttpStatsClient::new(&config).unwrap();

    let body = fetch_stats(&client, &config)
        .await
        .expect("stats should be fetched after retries");

    assert!(String::from_utf8(body).unwrap().contains("riak@127.0.0.1"));
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_http_client_treats_refused_connection_as_transient() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = StatsConfig {
        retry_interval: Duration::from_millis(20),
        deadline: Duration::from_millis(200),
        request_timeout: Duration::from_millis(100),
        ..StatsConfig::new(addr.to_string())
    };
    let client = HttpStatsClient::new(&config).unwrap();

    let result = fetch_stats(&client, &config).await;
    assert!(matches!(
        result,
        Err(OrchestratorError::Timeout(WaitStage::Stats))
    ));
}
