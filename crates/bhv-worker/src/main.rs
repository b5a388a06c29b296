//! Behavior analysis worker binary.
//!
//! Usage: `bhv-worker <video> [report.json]`

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bhv_media::{BehaviorEngine, ReportBuilder};
use bhv_worker::metrics::{init_metrics, write_metrics};
use bhv_worker::{build_classifiers, AnalysisLogger, NarrativeClient, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let mut args = std::env::args_os().skip(1);
    let video = args
        .next()
        .map(PathBuf::from)
        .context("usage: bhv-worker <video> [report.json]")?;
    let report_arg = args.next().map(PathBuf::from);

    let config = WorkerConfig::from_env();
    info!(
        sample_fps = config.engine.sample_fps,
        num_frames = config.engine.num_frames,
        stride = config.engine.stride,
        action_model = %config.action_model,
        abnormal_model = %config.abnormal_model,
        ml_service = %config.ml.base_url,
        "Starting bhv-worker"
    );

    let metrics_handle = match config.metrics_path {
        Some(_) => Some(init_metrics()?),
        None => None,
    };

    let classifiers = build_classifiers(&config)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling after the current window");
            let _ = cancel_tx.send(true);
        }
    });

    let engine = BehaviorEngine::new(config.engine.clone(), classifiers.action, classifiers.abnormal)?
        .with_cancel(cancel_rx);

    let logger = AnalysisLogger::new(video.display().to_string());
    logger.log_start("analyzing video");

    let report = match engine
        .analyze(&video, None)
        .instrument(logger.create_span())
        .await
    {
        Ok(report) => report,
        Err(e) => {
            logger.log_error(&e.to_string());
            return Err(e.into());
        }
    };

    let report_path = report_arg.unwrap_or_else(|| config.default_report_path(&video));
    let persisted = ReportBuilder::write_json(&report, &report_path).await;
    match &persisted {
        Ok(()) => logger.log_progress(&format!("report written to {}", report_path.display())),
        Err(e) => logger.log_error(&e.to_string()),
    }
    logger.log_summary(&report);

    let narrative = NarrativeClient::new(config.narrative.clone())?
        .narrate(&report)
        .await;
    println!("{narrative}");

    if let (Some(handle), Some(path)) = (&metrics_handle, &config.metrics_path) {
        if let Err(e) = write_metrics(handle, path).await {
            warn!(error = %e, "Failed to write metrics");
        }
    }

    persisted?;
    info!("Worker finished");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("bhv_media=info".parse()?)
        .add_directive("bhv_ml_client=info".parse()?)
        .add_directive("bhv_worker=info".parse()?)
        .add_directive("ort=warn".parse()?)
        .add_directive("onnxruntime=warn".parse()?);

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
    Ok(())
}
