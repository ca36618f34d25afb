mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use sluice_core::app::Runtime;
use sluice_core::domain::Batch;
use sluice_core::protocol::{Request, Response};
use sluice_core::sample::sample_runtime;

#[derive(Parser, Debug)]
#[command(name = "sluice", about = "Sample destination adapter host shim")]
struct Args {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides RUST_LOG and the config file
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registration response
    Register,
    /// Process one request document (or a bare batch) from FILE
    Process { file: PathBuf },
    /// Serve newline-delimited JSON requests on stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config = CliConfig::load(args.config.as_deref())?;

    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = config.log_filter(args.log_filter.as_deref(), rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("invalid log filter '{filter}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let runtime = sample_runtime(config.processor.clone())?;

    match args.command {
        Command::Register => {
            let response = runtime.handle(Request::RegistrationRequest).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Process { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let request = parse_document(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;
            let response = runtime.handle(request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(if response.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Serve => {
            serve(&runtime).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// A document with a `type` tag is a protocol request; anything else is
/// read as a bare event batch.
fn parse_document(raw: &str) -> anyhow::Result<Request> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.get("type").is_some() {
        Ok(serde_json::from_value(value)?)
    } else {
        let batch: Batch = serde_json::from_value(value)?;
        Ok(Request::EventProcessingRequest(batch))
    }
}

async fn serve(runtime: &Runtime) -> anyhow::Result<()> {
    info!("serving requests on stdin");
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response: Response = runtime.handle_json(trimmed).await;
        debug!(error = response.is_error(), "request answered");

        stdout.write_all(serde_json::to_string(&response)?.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed");
    Ok(())
}
