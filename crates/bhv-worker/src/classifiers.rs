//! Classifier construction from worker configuration.

use std::sync::Arc;

use tracing::info;

use bhv_media::ClipClassifier;
use bhv_ml_client::{MlClassifier, MlClient};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Action and abnormal classifiers for one engine.
pub struct Classifiers {
    pub action: Arc<dyn ClipClassifier>,
    pub abnormal: Arc<dyn ClipClassifier>,
}

/// Build both classifiers.
///
/// Each role uses a local ONNX model when its directory is configured and
/// the `onnx` feature is enabled; otherwise it is served by the ML service.
pub fn build_classifiers(config: &WorkerConfig) -> WorkerResult<Classifiers> {
    let client = Arc::new(MlClient::new(config.ml.clone())?);

    let action = match local_classifier(config.action_onnx.as_deref(), &config.action_model)? {
        Some(local) => local,
        None => Arc::new(MlClassifier::new(Arc::clone(&client), config.action_model.clone())),
    };
    let abnormal = match local_classifier(config.abnormal_onnx.as_deref(), &config.abnormal_model)? {
        Some(local) => local,
        None => Arc::new(MlClassifier::new(client, config.abnormal_model.clone())),
    };

    info!(
        action = action.name(),
        abnormal = abnormal.name(),
        "Classifiers ready"
    );
    Ok(Classifiers { action, abnormal })
}

#[cfg(feature = "onnx")]
fn local_classifier(
    dir: Option<&std::path::Path>,
    model: &str,
) -> WorkerResult<Option<Arc<dyn ClipClassifier>>> {
    use bhv_media::onnx::Normalization;
    use bhv_media::OrtVideoClassifier;

    let Some(dir) = dir else {
        return Ok(None);
    };
    let normalization = if model.contains("timesformer") {
        Normalization::KINETICS
    } else {
        Normalization::IMAGENET
    };
    let classifier = OrtVideoClassifier::from_dir(dir)
        .map_err(|e| crate::error::WorkerError::classifier_setup(format!("{}: {e}", dir.display())))?
        .with_name(model)
        .with_normalization(normalization);
    Ok(Some(Arc::new(classifier)))
}

#[cfg(not(feature = "onnx"))]
fn local_classifier(
    dir: Option<&std::path::Path>,
    model: &str,
) -> WorkerResult<Option<Arc<dyn ClipClassifier>>> {
    if let Some(dir) = dir {
        tracing::warn!(
            model,
            dir = %dir.display(),
            "ONNX model configured but built without the onnx feature, using the ML service"
        );
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_ml_service() {
        let config = WorkerConfig::default();
        let classifiers = build_classifiers(&config).unwrap();
        assert_eq!(classifiers.action.name(), config.action_model);
        assert_eq!(classifiers.abnormal.name(), config.abnormal_model);
    }
}
