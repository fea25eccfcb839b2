//! `agentrun` -- command-line front-end for the agent execution service.
//!
//! Submits a chat question or a schedule validation job, follows it to
//! completion and prints the result.
//!
//! # Environment variables
//!
//! | Variable                     | Required | Default | Description                       |
//! |------------------------------|----------|---------|-----------------------------------|
//! | `AGENT_API_BASE_URL`         | yes      | --      | Service root URL                  |
//! | `AGENT_API_TOKEN`            | yes      | --      | Bearer credential                 |
//! | `AGENT_ACCOUNT_ID`           | yes      | --      | Account path segment              |
//! | `AGENT_ID`                   | yes      | --      | Agent path segment                |
//! | `AGENT_REQUEST_TIMEOUT_SECS` | no       | `30`    | Per-request transport timeout     |
//! | `AGENT_POLL_INTERVAL_SECS`   | no       | `5`     | Seconds between status polls      |
//! | `AGENT_MAX_RETRIES`          | no       | `5`     | Consecutive transient failures    |
//! | `AGENT_SESSION_TIMEOUT_SECS` | no       | `600`   | Wall-clock budget per job         |

mod render;

use std::sync::Arc;

use agentrun_client::{
    AgentApi, ClientConfig, JobRunner, MonitorConfig, MonitorEvent, StatusFetcher,
};
use agentrun_core::{ChatRequest, FileData, JobHandle, JobRequest, ScheduleInputs};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the chat agent a question and print its answer
    Chat {
        prompt: String,
        /// URL of an already uploaded file to attach
        #[arg(long, requires = "file_name")]
        file_url: Option<String>,
        /// Display name of the attached file
        #[arg(long, requires = "file_url")]
        file_name: Option<String>,
    },
    /// Run the schedule validation agent and print its report
    Validate {
        /// Optional access token forwarded to the agent
        #[arg(long)]
        ms_token: Option<String>,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        input_folder: String,
        #[arg(long)]
        output_file: String,
    },
    /// Fetch the current status of an execution once
    Status { execution_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json_logs);

    let client_config = ClientConfig::from_env()?;
    let monitor_config = MonitorConfig::from_env()?;
    let api = Arc::new(AgentApi::new(client_config).context("failed to build HTTP client")?);

    let request = match args.command {
        Command::Status { execution_id } => {
            match api.fetch_status(&JobHandle::new(execution_id)).await {
                Ok(snapshot) => {
                    println!("{}", snapshot.state);
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Status check failed");
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        Command::Chat {
            prompt,
            file_url,
            file_name,
        } => {
            let mut chat = ChatRequest::new(prompt);
            if let (Some(url), Some(file_name)) = (file_url, file_name) {
                chat = chat.with_file(FileData { url, file_name });
            }
            JobRequest::Chat(chat)
        }
        Command::Validate {
            ms_token,
            user_id,
            input_folder,
            output_file,
        } => JobRequest::Schedule(ScheduleInputs {
            ms_token,
            user_id,
            input_folder,
            output_file,
        }),
    };

    let runner = JobRunner::from_api(api, monitor_config);
    tokio::spawn(log_events(runner.monitor().subscribe()));

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            ctrl_c_cancel.cancel();
        }
    });

    match runner.run(&request, &cancel).await {
        Ok(completion) => {
            println!("{}", render::render_payload(completion.payload.as_ref()));
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Request did not complete");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agentrun=info,agentrun_client=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Log session progress until the monitor goes away.
async fn log_events(mut rx: broadcast::Receiver<MonitorEvent>) {
    loop {
        match rx.recv().await {
            Ok(MonitorEvent::Progress {
                execution_id,
                state,
                ..
            }) => {
                tracing::info!(execution_id = %execution_id, state = %state, "Status update");
            }
            Ok(MonitorEvent::Connectivity {
                execution_id,
                status,
                attempt,
            }) => {
                tracing::info!(
                    execution_id = %execution_id,
                    connectivity = %status,
                    attempt,
                    "Connectivity changed",
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
