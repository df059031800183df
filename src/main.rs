//! chatopera CLI - Inspect, train and query a Chatopera chatbot.

use anyhow::{Context, Result};
use chatopera_sdk::{CancellationToken, Chatbot, Chatopera, Config, PollPolicy, SubmitOutcome};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "chatopera")]
#[command(author = "Chatopera <info@chatopera.com>")]
#[command(version)]
#[command(about = "Signed REST client and training driver for Chatopera chatbots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (environment only when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the training status of every domain
    Status,

    /// Submit training for every pending domain
    Train {
        /// Wait until all domains are synchronized
        #[arg(short, long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Wait until all domains are synchronized
    Wait {
        /// Give up after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Send a raw command and print the reply
    Command {
        /// HTTP method (GET, POST, PUT, DELETE)
        method: String,

        /// Path relative to the chatbot (or the account with --admin)
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Use the account-level access token instead of chatbot credentials
        #[arg(long)]
        admin: bool,
    },

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

fn print_example_config() {
    let example = r#"# chatopera configuration file

[chatbot]
# Credentials (can also use BOT_CLIENT_ID / BOT_CLIENT_SECRET env vars)
# client_id = "..."
# client_secret = "${MY_SECRET}"
base_url = "https://bot.chatopera.com"   # BOT_PROVIDER overrides
timeout_secs = 60

[admin]
# Account-level token (can also use BOT_ACCESS_TOKEN env var)
# access_token = "..."

[training]
poll_interval_secs = 10
backoff_factor = 1.0     # 1.0 = fixed interval
max_interval_secs = 60
# deadline_secs = 600

[logging]
trace = false            # CHATOPERA_SDK_LOG_TRACE=on also enables it
"#;
    println!("{example}");
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}")),
        None => Ok(Config::from_env()),
    }
}

/// Cancellation token fired by Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn wait(bot: &Chatbot, config: &Config, deadline_secs: Option<u64>) -> Result<()> {
    let mut policy = PollPolicy::from_config(&config.training);
    if let Some(secs) = deadline_secs {
        policy = policy.with_deadline(Duration::from_secs(secs));
    }

    let converged = bot
        .training()
        .wait_for_convergence(&policy, &ctrl_c_token())
        .await
        .context("Training did not converge")?;

    println!("\n=== Training Converged ===");
    println!("Reads:       {}", converged.reads);
    println!("{}", serde_json::to_string_pretty(&converged.status)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Example = cli.command {
        print_example_config();
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    setup_logging(cli.verbose || config.logging.trace);

    match cli.command {
        Commands::Example => {}

        Commands::Status => {
            let bot = Chatbot::from_config(&config).context("Failed to create chatbot client")?;
            let status = bot.training().status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Train {
            wait: should_wait,
            deadline_secs,
        } => {
            let bot = Chatbot::from_config(&config).context("Failed to create chatbot client")?;
            let report = bot.training().train_all().await;

            println!("\n=== Training Submitted ===");
            for (domain, result) in report.results() {
                let line = match result {
                    Ok(SubmitOutcome::AlreadySynced) => "already synced".to_string(),
                    Ok(SubmitOutcome::Submitted) => "submitted".to_string(),
                    Ok(SubmitOutcome::NothingToTrain { rc }) => format!("nothing to train (rc {rc})"),
                    Ok(SubmitOutcome::Rejected { rc, message }) => {
                        format!("rejected (rc {rc}) {message}")
                    }
                    Err(e) => format!("failed: {e}"),
                };
                println!("{:<13}{line}", format!("{domain}:"));
            }

            if should_wait {
                wait(&bot, &config, deadline_secs).await?;
            }

            let failures = report.failures();
            if !failures.is_empty() {
                anyhow::bail!("Training could not be submitted for {failures:?}");
            }
        }

        Commands::Wait { deadline_secs } => {
            let bot = Chatbot::from_config(&config).context("Failed to create chatbot client")?;
            wait(&bot, &config, deadline_secs).await?;
        }

        Commands::Command {
            method,
            path,
            body,
            admin,
        } => {
            let payload: Option<Value> = body
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Body is not valid JSON")?;

            let envelope = if admin {
                Chatopera::from_config(&config)
                    .context("Failed to create admin client")?
                    .command(&method, &path, payload.as_ref())
                    .await?
            } else {
                Chatbot::from_config(&config)
                    .context("Failed to create chatbot client")?
                    .command(&method, &path, payload.as_ref())
                    .await?
            };

            if !envelope.is_success() {
                info!(rc = envelope.rc(), "Command returned non-zero rc");
            }
            println!("{}", serde_json::to_string_pretty(&envelope.to_json())?);
        }
    }

    Ok(())
}
