//! Face detection pipeline binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facetrack_runner::{Credentials, Pipeline, RunnerConfig, RunnerError};

/// Printed when the credential file is missing.
const MISSING_CONFIG_MESSAGE: &str = "ERROR: Expecting config.json in examples folder";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("failed to install rustls crypto provider");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let credentials = match Credentials::load(RunnerConfig::credentials_path_from_env()) {
        Ok(credentials) => credentials,
        Err(RunnerError::MissingConfigFile(_)) => {
            println!("{}", MISSING_CONFIG_MESSAGE);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let config = RunnerConfig::from_env()?;

    info!("-----------------------= FaceTrack =-----------------------");
    info!("Azure Media Analytics - Face Detector");
    info!(
        video = %config.video_path.display(),
        processor = %config.processor_name,
        "Starting pipeline"
    );

    let result = tokio::select! {
        result = run(config, &credentials) => result,
        _ = tokio::signal::ctrl_c() => {
            error!("Interrupted");
            std::process::exit(1);
        }
    };

    if let Err(e) = &result {
        error!("Pipeline failed: {}", e);
    }
    result?;

    info!("Pipeline complete");
    Ok(())
}

async fn run(config: RunnerConfig, credentials: &Credentials) -> Result<(), RunnerError> {
    let pipeline = Pipeline::connect(config, credentials).await?;
    let summary = pipeline.run().await?;

    info!(
        asset_id = %summary.asset_id,
        job_id = %summary.job_id,
        output_asset_id = %summary.output_asset_id,
        files = summary.downloaded.len(),
        "Results downloaded"
    );
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("facetrack=info,facetrack_ams=info,facetrack_blob=info,facetrack_runner=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
