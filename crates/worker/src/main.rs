use std::path::PathBuf;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formcheck_pipeline::Pipeline;
use formcheck_worker::config::{LogFormat, WorkerConfig};
use formcheck_worker::jobs::{self, JobRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env()?;

    // --- Tracing ---
    // Logs go to stderr; stdout carries one JSON report per line.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "formcheck_worker=info,formcheck_pipeline=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    tracing::info!(
        max_concurrent = config.max_concurrent_analyses,
        timeout_secs = config.analysis.pipeline_timeout_secs,
        ffprobe = %config.ffmpeg.ffprobe_bin,
        "Loaded worker configuration",
    );

    // --- Jobs ---
    let manifest: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: formcheck-worker <manifest.json>")?;
    let jobs = jobs::load_manifest(&manifest)
        .await
        .with_context(|| format!("failed to read job manifest {}", manifest.display()))?;
    tracing::info!(jobs = jobs.len(), manifest = %manifest.display(), "Loaded job manifest");

    let pipeline = Pipeline::new(config.analysis.clone())?;
    let runner = JobRunner::new(pipeline, config.ffmpeg.clone(), config.max_concurrent_analyses);

    // --- Shutdown ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    // --- Run ---
    let results = runner.run_all(jobs, cancel).await;

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut errored = 0usize;
    for result in results {
        match result {
            Ok(report) => {
                if report.outcome.is_success() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
                println!("{}", serde_json::to_string(&report)?);
            }
            Err(e) => {
                errored += 1;
                tracing::error!(error = %e, "Job could not be run");
            }
        }
    }

    tracing::info!(succeeded, failed, errored, "All jobs finished");
    Ok(())
}

/// Wait for a termination signal; in-flight analyses are then cancelled.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), cancelling analyses");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, cancelling analyses");
        }
    }
}
