use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use buddy_core::wake::DetectionEvent;
use buddy_core::{AppContext, Config};

/// Buddy - conversation orchestration core for a voice assistant
#[derive(Parser)]
#[command(name = "buddy", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "BUDDY_CONFIG", default_value = "buddy.toml")]
    config: PathBuf,

    /// Override the configured wake phrase
    #[arg(long, env = "BUDDY_WAKE_PHRASE")]
    wake_phrase: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,buddy_core=info",
        1 => "info,buddy_core=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(phrase) = cli.wake_phrase {
        config.wake.phrase = phrase;
    }

    let ctx = AppContext::from_config(config)?;
    tracing::info!(wake_phrase = %ctx.wake.wake_phrase(), "buddy core ready");

    // Start listening if the recognizer supports continuous recognition;
    // text queries still work without it.
    match ctx.wake.start().await {
        Ok(()) => {}
        Err(e) => tracing::warn!(error = %e, "wake word listening unavailable"),
    }

    let mut subscriber = ctx.wake.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            event = subscriber.next() => {
                match event {
                    Some(DetectionEvent::Detection(detection)) => {
                        tracing::info!(
                            command = %detection.command_text,
                            confidence = detection.confidence,
                            "wake command"
                        );
                    }
                    Some(DetectionEvent::Heartbeat { .. }) | None => {}
                }
            }
        }
    }

    if ctx.wake.is_listening().await {
        ctx.wake.stop().await?;
    }
    Ok(())
}
