//! streampress: config-file based preparation of streaming media.
//!
//! Wraps FFmpeg and Shaka Packager behind two declarative YAML files,
//! for both VOD and live content, with optional mirroring to cloud
//! storage.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streampress_core::{
    load_input_config, load_pipeline_config, validate_destination, ProcessNodeFactory, RunFailure,
    Supervisor, SupervisorConfig,
};

#[derive(Debug, Parser)]
#[command(name = "streampress", version, about)]
struct Args {
    /// The path to the input config file (required).
    #[arg(short = 'i', long)]
    input_config: PathBuf,

    /// The path to the pipeline config file (required).
    #[arg(short = 'p', long)]
    pipeline_config: PathBuf,

    /// The Google Cloud Storage URL to upload to.
    #[arg(short = 'c', long)]
    cloud_url: Option<String>,

    /// The output folder to write files to. Used even if uploading to
    /// cloud storage.
    #[arg(short = 'o', long, default_value = "output_files")]
    output: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Reject an unusable destination before touching anything.
    if let Some(url) = &args.cloud_url {
        validate_destination(url).context("Invalid cloud URL")?;
    }

    info!("Loading input config from {:?}", args.input_config);
    let input_config = load_input_config(&args.input_config)
        .with_context(|| format!("Failed to load input config from {:?}", args.input_config))?;

    info!("Loading pipeline config from {:?}", args.pipeline_config);
    let pipeline_config = load_pipeline_config(&args.pipeline_config).with_context(|| {
        format!(
            "Failed to load pipeline config from {:?}",
            args.pipeline_config
        )
    })?;

    // Recreate the output directory empty for this run.
    if args.output.exists() {
        fs::remove_dir_all(&args.output)
            .with_context(|| format!("Failed to clear output directory {:?}", args.output))?;
    }
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory {:?}", args.output))?;

    let config = SupervisorConfig::default();
    let factory = ProcessNodeFactory::new(&config);
    let supervisor = Supervisor::new(config, factory);

    if let Err(e) = supervisor
        .start(
            &args.output,
            &input_config,
            &pipeline_config,
            args.cloud_url.as_deref(),
        )
        .await
    {
        // Shut down any external processes that were already started
        // before re-raising the error. stop() is idempotent.
        supervisor.stop().await;
        return Err(e.into());
    }

    // Sleep so long as the pipeline is still running; an interrupt
    // translates into a single stop call.
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if !supervisor.is_running().await {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Interrupt received, shutting down pipeline");
                supervisor.stop().await;
                break;
            }
        }
    }

    match supervisor.failure().await {
        Some(RunFailure::NodeExited { node, status }) => {
            bail!("pipeline failed: node {} exited with {:?}", node, status);
        }
        Some(RunFailure::Teardown { node, reason }) => {
            warn!("Pipeline stopped, but node {} had teardown trouble: {}", node, reason);
        }
        None => info!("Pipeline finished"),
    }

    Ok(())
}
