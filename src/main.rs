use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use riak_orchestrator::config::{AdminConfig, OrchestratorConfig, RingDeadline, StatsConfig};
use riak_orchestrator::converge::Service;
use riak_orchestrator::dispatch::Command;
use riak_orchestrator::orchestrator::ConvergenceRequest;
use riak_orchestrator::{Orchestrator, Report, RunRequest};

#[derive(Parser, Debug)]
#[command(name = "riak-orchestrator")]
#[command(version)]
#[command(about = "Run an administrative command against a Riak cluster and wait for it to converge")]
struct Args {
    /// Operation to perform against the cluster
    #[arg(long, value_enum)]
    command: Option<CommandArg>,

    /// Address of the Riak HTTP listener (host:port or base URL)
    #[arg(long, default_value = "127.0.0.1:8098")]
    http_conn: String,

    /// Target node for join and ping
    #[arg(long, default_value = "riak@127.0.0.1")]
    target_node: String,

    /// Seconds to wait for handoffs to complete (0 disables)
    #[arg(long, default_value = "0")]
    wait_for_handoffs: u64,

    /// Seconds to wait for all nodes to agree on the ring (0 disables)
    #[arg(long, default_value = "0")]
    wait_for_ring: u64,

    /// Wait for a Riak service to come online
    #[arg(long, value_enum)]
    wait_for_service: Option<ServiceArg>,

    /// How the ring wait applies its deadline
    #[arg(long, value_enum, default_value = "after-agreement")]
    ring_deadline: RingDeadlineArg,

    /// Do not validate TLS certificates of the stats endpoint.
    /// Only use this against self-signed, personally controlled nodes.
    #[arg(long)]
    no_validate_certs: bool,

    /// Path to the `riak` control script
    #[arg(long, default_value = "riak")]
    riak_bin: PathBuf,

    /// Path to a standalone `riak-admin` script (looked up on PATH when omitted)
    #[arg(long)]
    riak_admin_bin: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CommandArg {
    Ping,
    #[value(name = "kv_test")]
    KvTest,
    Join,
    Plan,
    Commit,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ServiceArg {
    Kv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RingDeadlineArg {
    AfterAgreement,
    Flagged,
    Enforced,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Argument mapping
// =============================================================================

fn build_config(args: &Args) -> OrchestratorConfig {
    let stats = StatsConfig {
        validate_certs: !args.no_validate_certs,
        ..StatsConfig::new(args.http_conn.clone())
    };

    let riak_admin_bin = match &args.riak_admin_bin {
        Some(path) => Some(path.clone()),
        None => AdminConfig::discover().riak_admin_bin,
    };
    let admin = AdminConfig {
        riak_bin: args.riak_bin.clone(),
        riak_admin_bin,
    };

    let ring_deadline = match args.ring_deadline {
        RingDeadlineArg::AfterAgreement => RingDeadline::AfterAgreement,
        RingDeadlineArg::Flagged => RingDeadline::Flagged,
        RingDeadlineArg::Enforced => RingDeadline::Enforced,
    };

    OrchestratorConfig::default()
        .with_stats(stats)
        .with_admin(admin)
        .with_ring_deadline(ring_deadline)
}

fn build_request(args: &Args) -> RunRequest {
    let command = args.command.map(|command| match command {
        CommandArg::Ping => Command::Ping {
            target_node: args.target_node.clone(),
        },
        CommandArg::KvTest => Command::KvTest,
        CommandArg::Join => Command::Join {
            target_node: args.target_node.clone(),
        },
        CommandArg::Plan => Command::Plan,
        CommandArg::Commit => Command::Commit,
    });

    RunRequest {
        command,
        convergence: ConvergenceRequest {
            wait_for_handoffs: Duration::from_secs(args.wait_for_handoffs),
            wait_for_ring: Duration::from_secs(args.wait_for_ring),
            wait_for_service: args.wait_for_service.map(|service| match service {
                ServiceArg::Kv => Service::Kv,
            }),
        },
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_report(report: &Report, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => {
            println!("Riak Node");
            println!("{}", "=".repeat(40));
            println!("Node:       {}", report.node_name);
            println!("Version:    {}", report.version);
            println!("Ring Size:  {}", report.ring_size);
            println!("Ring Ready: {}", report.ring_ready);
            println!("Changed:    {}", report.changed);
            println!();
            println!("Ring Members:");
            for node in &report.nodes {
                println!("  {}", node);
            }
            if let Some(output) = report.command_output() {
                println!();
                println!("Command Output:");
                for line in output.lines() {
                    println!("  {}", line);
                }
            }
            if let Some(handoffs) = &report.handoffs {
                println!();
                println!("Handoffs:   {}", handoffs);
            }
            if let Some(ring_wait) = &report.ring_wait {
                println!("Ring Wait:  {:?}", ring_wait);
            }
            if let Some(service) = &report.service {
                println!("Service:    {}", service.trim());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&args);
    let request = build_request(&args);

    tracing::info!(
        stats_url = %config.stats.stats_url(),
        command = ?request.command,
        ring_deadline = ?config.ring_deadline,
        "Starting riak orchestration"
    );

    let orchestrator = Orchestrator::from_config(config)?;
    match orchestrator.run(&request).await {
        Ok(report) => print_report(&report, &args.output)?,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(output) = e.raw_output() {
                for line in output.lines() {
                    eprintln!("  {}", line);
                }
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
