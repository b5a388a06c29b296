use std::path::Path;

use bhv_ml_client::MlClient;
use bhv_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with report_dir={}",
        config.report_dir.display()
    );
    ensure_report_dir(&config.report_dir).await?;
    ensure_ffmpeg()?;
    ensure_ml_service(&config).await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_report_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("report dir {} not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = bhv_media::check_ffmpeg()?;
    let ffprobe = bhv_media::check_ffprobe()?;
    println!(
        "worker-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

async fn ensure_ml_service(config: &WorkerConfig) -> anyhow::Result<()> {
    if config.action_onnx.is_some() && config.abnormal_onnx.is_some() {
        println!("worker-selfcheck: local ONNX models configured, skipping ML service");
        return Ok(());
    }

    let client = MlClient::new(config.ml.clone())?;
    if !client.health_check().await? {
        return Err(anyhow::anyhow!(
            "ML service at {} is not healthy",
            config.ml.base_url
        ));
    }
    Ok(())
}
