//! uibot CLI.
//!
//! Small utilities against a live automation agent, handy while authoring
//! scenarios:
//!
//!   Wait for the agent to come up:
//!     $ cargo run --bin uibot -- ping --agent-url http://localhost:8082
//!
//!   Dump the component hierarchy (to a file, or stdout with --stdout):
//!     $ cargo run --bin uibot -- dump --out hierarchy.html --delay-seconds 5

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use tokio::time::sleep;
use uibot::config::{UiBotConfig, Verbosity};
use uibot::session::UiSession;
use uibot::{HierarchySink, RemoteAgentClient};

#[derive(Parser)]
#[command(name = "uibot", author, version, about = "Remote UI-automation agent utilities")]
struct Cli {
    /// Base URL of the automation agent (overrides UIBOT_AGENT_URL).
    #[arg(long, global = true)]
    agent_url: Option<String>,

    /// Increase log verbosity (pass multiple times for DEBUG).
    #[arg(long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait until the agent answers a ping.
    Ping(PingArgs),
    /// Fetch the component hierarchy and write it out.
    Dump(DumpArgs),
}

#[derive(Args)]
struct PingArgs {
    /// Give up after this many seconds.
    #[arg(long, default_value_t = 240)]
    timeout_seconds: u64,
}

#[derive(Args)]
struct DumpArgs {
    /// Destination file for the hierarchy snapshot.
    #[arg(long, default_value = "componentHierarchy.html")]
    out: PathBuf,

    /// Print to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Seconds to wait before the snapshot is collected, to let the UI
    /// reach the state of interest.
    #[arg(long, default_value_t = 0)]
    delay_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_env_logger();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match cli.command {
        Command::Ping(args) => run_ping(config, args).await,
        Command::Dump(args) => run_dump(config, args).await,
    }
}

async fn run_ping(mut config: UiBotConfig, args: PingArgs) -> Result<()> {
    config.startup_timeout_ms = args.timeout_seconds * 1_000;

    let agent = RemoteAgentClient::new(config.agent_url.clone())
        .context("failed to construct agent client")?;
    let session = UiSession::new(agent, config);

    session
        .ensure_agent_ready()
        .await
        .context("agent did not become ready")?;
    info!("agent is ready");
    Ok(())
}

async fn run_dump(config: UiBotConfig, args: DumpArgs) -> Result<()> {
    if args.delay_seconds > 0 {
        info!(
            "collecting the hierarchy snapshot in {} seconds",
            args.delay_seconds
        );
        sleep(Duration::from_secs(args.delay_seconds)).await;
    }

    let agent = RemoteAgentClient::new(config.agent_url.clone())
        .context("failed to construct agent client")?;

    let sink = if args.stdout {
        HierarchySink::Stdout
    } else {
        HierarchySink::File(args.out.clone())
    };

    agent
        .dump_component_hierarchy(&sink)
        .await
        .context("failed to collect the component hierarchy")?;

    if let HierarchySink::File(path) = &sink {
        info!("component hierarchy written to {}", path.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<UiBotConfig> {
    let mut config = UiBotConfig::from_env().context("failed to load configuration")?;
    if let Some(agent_url) = &cli.agent_url {
        config.agent_url = agent_url.clone();
    }
    config.verbose = match cli.verbose {
        0 => Verbosity::Medium,
        _ => Verbosity::Detailed,
    };
    Ok(config)
}

fn init_env_logger() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .format_timestamp_secs()
        .try_init();
}
