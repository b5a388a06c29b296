//! Prometheus text export for batch runs.

use std::path::Path;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Install the global Prometheus recorder.
pub fn init_metrics() -> WorkerResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WorkerError::metrics_failed(e.to_string()))
}

/// Write the rendered exposition to `path` (textfile collector layout).
pub async fn write_metrics(handle: &PrometheusHandle, path: &Path) -> WorkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, handle.render()).await?;
    info!(path = %path.display(), "Metrics written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_metrics_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("textfile/bhv.prom");
        let handle = PrometheusBuilder::new().build_recorder().handle();

        write_metrics(&handle, &target).await.unwrap();
        assert!(target.exists());
    }
}
