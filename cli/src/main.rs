//! hubrun CLI - run RunningHub workflows from the terminal.
//!
//! ```text
//! main() -> load config -> build HttpTransport -> WorkflowRunner
//!                                                   |
//!                      novel-to-script / run  ------+--> stdout (text) | stderr (error)
//! ```
//!
//! Logs go to stderr so stdout carries only the workflow output. Ctrl-C
//! cancels the run at the next poll tick.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::time::Instant;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hubrun_client::hubrun_types::{JobSpec, NodeParam};
use hubrun_client::{
    CancellationToken, HttpTransport, RunnerSettings, Transport, WorkflowRunner, build_http_client,
    deadline_after,
};
use hubrun_config::{ClientSettings, HubrunConfig};
use hubrun_tools::{ToolOutput, ToolRegistry};

/// Run RunningHub workflows and print their text output
#[derive(Parser)]
#[command(name = "hubrun")]
#[command(about = "Run RunningHub workflows and print their text output", long_about = None)]
struct Cli {
    /// Override the run deadline, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert novel text into a screenplay
    #[command(name = "novel-to-script")]
    NovelToScript {
        /// Novel text
        #[arg(short, long)]
        text: String,

        /// Optional random seed
        #[arg(short, long)]
        seed: Option<String>,
    },

    /// Run any workflow with explicit node inputs
    Run {
        /// Workflow ID
        #[arg(short, long)]
        workflow: String,

        /// Node input as NODE:FIELD=VALUE (repeatable, order preserved)
        #[arg(short, long = "param", value_parser = parse_node_param)]
        params: Vec<NodeParam>,
    },

    /// List available workflow tools
    Tools,
}

fn parse_node_param(raw: &str) -> Result<NodeParam, String> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NODE:FIELD=VALUE, got {raw:?}"))?;
    let (node, field) = target
        .split_once(':')
        .ok_or_else(|| format!("expected NODE:FIELD before '=', got {target:?}"))?;
    if node.is_empty() || field.is_empty() {
        return Err(format!("node and field must be non-empty in {raw:?}"));
    }
    Ok(NodeParam::new(node, field, value))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn load_settings() -> Result<ClientSettings> {
    let config = HubrunConfig::load()
        .context("loading hubrun config")?
        .unwrap_or_default();
    if let Some(path) = HubrunConfig::path() {
        tracing::debug!(path = %path.display(), "Config path");
    }
    config.resolve().context("resolving RunningHub settings")
}

fn build_runner(settings: &ClientSettings) -> Result<WorkflowRunner> {
    let client =
        build_http_client(settings.request_timeout).context("building HTTP client")?;
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(client, settings.base_url.clone()));
    Ok(WorkflowRunner::new(transport).with_settings(RunnerSettings {
        poll_interval: settings.poll_interval,
        default_timeout: settings.run_timeout,
    }))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling run");
            token.cancel();
        }
    });
}

fn list_tools() -> Result<String> {
    let registry = ToolRegistry::with_builtins()?;
    let listing: Vec<String> = registry
        .definitions()
        .into_iter()
        .map(|def| format!("{}\t{}\t{}", def.name, def.workflow_id, def.description))
        .collect();
    Ok(listing.join("\n"))
}

fn run_deadline(timeout_secs: Option<u64>) -> Option<Instant> {
    timeout_secs.map(|secs| deadline_after(Instant::now(), Duration::from_secs(secs)))
}

/// Everything a single workflow run needs from the environment.
struct Session {
    settings: ClientSettings,
    runner: WorkflowRunner,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Session {
    fn start(timeout_secs: Option<u64>) -> Result<Self> {
        let settings = load_settings()?;
        let runner = build_runner(&settings)?;
        let deadline = run_deadline(timeout_secs);
        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());
        Ok(Self {
            settings,
            runner,
            deadline,
            cancel,
        })
    }
}

async fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Commands::Tools => list_tools(),
        Commands::NovelToScript { text, seed } => {
            let session = Session::start(cli.timeout_secs)?;
            let registry = ToolRegistry::with_builtins()?;
            let tool = registry.lookup("novel_to_script")?;
            let args = json!({ "text": text, "seed": seed });
            let output = hubrun_tools::invoke(
                tool,
                &session.runner,
                &args,
                session.settings.api_key,
                session.deadline,
                &session.cancel,
            )
            .await;
            match output {
                ToolOutput::Text(text) => Ok(text),
                ToolOutput::Error(message) => bail!(message),
            }
        }
        Commands::Run { workflow, params } => {
            let session = Session::start(cli.timeout_secs)?;
            let spec = params.into_iter().fold(
                JobSpec::new(session.settings.api_key, workflow),
                JobSpec::with_param,
            );
            let text = session
                .runner
                .run_workflow(&spec, session.deadline, &session.cancel)
                .await?;
            Ok(text)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
