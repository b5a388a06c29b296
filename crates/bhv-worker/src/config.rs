//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use bhv_media::EngineConfig;
use bhv_ml_client::MlClientConfig;
use bhv_models::CoarseAction;

pub const DEFAULT_ACTION_MODEL: &str = "facebook/timesformer-base-finetuned-k400";
pub const DEFAULT_ABNORMAL_MODEL: &str = "mitegvg/videomae-base-finetuned-xd-violence";

/// Chat-completion endpoint used for the narrative.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    /// Base URL of an OpenAI-compatible API
    pub api_url: String,
    /// API key; the narrative falls back to a note when absent
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Engine parameters
    pub engine: EngineConfig,
    /// Action model identifier sent to the ML service
    pub action_model: String,
    /// Abnormal model identifier sent to the ML service
    pub abnormal_model: String,
    /// Local ONNX model directory for the action classifier
    pub action_onnx: Option<PathBuf>,
    /// Local ONNX model directory for the abnormal classifier
    pub abnormal_onnx: Option<PathBuf>,
    /// Directory for reports when no explicit path is given
    pub report_dir: PathBuf,
    /// Prometheus text exposition written after each run
    pub metrics_path: Option<PathBuf>,
    pub ml: MlClientConfig,
    pub narrative: NarrativeConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            action_model: DEFAULT_ACTION_MODEL.to_string(),
            abnormal_model: DEFAULT_ABNORMAL_MODEL.to_string(),
            action_onnx: None,
            abnormal_onnx: None,
            report_dir: PathBuf::from("reports"),
            metrics_path: None,
            ml: MlClientConfig::default(),
            narrative: NarrativeConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.ml = MlClientConfig::from_env();
        config
    }

    /// Create config from any key lookup, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let engine = defaults.engine.clone();
        let parse = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let repetition_targets = parse("BHV_REPETITION_TARGETS")
            .map(|raw| parse_targets(&raw))
            .unwrap_or_else(|| engine.repetition_targets.iter().copied().collect());

        let engine = engine
            .clone()
            .with_sample_fps(parsed(&parse, "BHV_SAMPLE_FPS").unwrap_or(engine.sample_fps))
            .with_window(
                parsed(&parse, "BHV_NUM_FRAMES").unwrap_or(engine.num_frames),
                parsed(&parse, "BHV_STRIDE").unwrap_or(engine.stride),
            )
            .with_action_conf_thresh(
                parsed(&parse, "BHV_ACTION_CONF_THRESH").unwrap_or(engine.action_conf_thresh),
            )
            .with_repetition(
                repetition_targets,
                parsed(&parse, "BHV_REPETITION_MIN_SEC").unwrap_or(engine.repetition_min_sec),
            )
            .with_abnormal(
                parsed(&parse, "BHV_ABNORMAL_THRESH").unwrap_or(engine.abnormal_prob_thresh),
                parsed(&parse, "BHV_ABNORMAL_MARGIN").unwrap_or(engine.abnormal_margin),
                parsed(&parse, "BHV_ABNORMAL_MIN_CONSEC").unwrap_or(engine.abnormal_min_consec),
            );

        let narrative = NarrativeConfig {
            api_url: parse("NARRATIVE_API_URL").unwrap_or(defaults.narrative.api_url),
            api_key: parse("NARRATIVE_API_KEY").or_else(|| parse("OPENAI_API_KEY")),
            model: parse("NARRATIVE_MODEL").unwrap_or(defaults.narrative.model),
            timeout: defaults.narrative.timeout,
        };

        Self {
            engine,
            action_model: parse("BHV_ACTION_MODEL").unwrap_or(defaults.action_model),
            abnormal_model: parse("BHV_ABNORMAL_MODEL").unwrap_or(defaults.abnormal_model),
            action_onnx: parse("BHV_ACTION_ONNX").map(PathBuf::from),
            abnormal_onnx: parse("BHV_ABNORMAL_ONNX").map(PathBuf::from),
            report_dir: parse("BHV_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            metrics_path: parse("BHV_METRICS_PATH").map(PathBuf::from),
            ml: defaults.ml,
            narrative,
        }
    }

    /// Default report location: `<report_dir>/<video stem>.report.json`.
    pub fn default_report_path(&self, video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        self.report_dir.join(format!("{stem}.report.json"))
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable config value");
            None
        }
    }
}

/// Comma-separated coarse action names; unknown names are skipped.
fn parse_targets(raw: &str) -> Vec<CoarseAction> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(error = %e, "Ignoring unknown repetition target");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = from_pairs(&[]);
        assert_eq!(config.engine.sample_fps, 10.0);
        assert_eq!(config.engine.num_frames, 16);
        assert_eq!(config.engine.stride, 8);
        assert_eq!(config.action_model, DEFAULT_ACTION_MODEL);
        assert!(config.action_onnx.is_none());
        assert!(config.narrative.api_key.is_none());
        assert!(config.metrics_path.is_none());
    }

    #[test]
    fn test_engine_overrides() {
        let config = from_pairs(&[
            ("BHV_SAMPLE_FPS", "5"),
            ("BHV_NUM_FRAMES", "8"),
            ("BHV_STRIDE", "4"),
            ("BHV_ABNORMAL_THRESH", "0.8"),
            ("BHV_ABNORMAL_MIN_CONSEC", "3"),
            ("BHV_REPETITION_TARGETS", "sitting, Playing ,flying"),
        ]);
        assert_eq!(config.engine.sample_fps, 5.0);
        assert_eq!(config.engine.num_frames, 8);
        assert_eq!(config.engine.stride, 4);
        assert_eq!(config.engine.abnormal_prob_thresh, 0.8);
        assert_eq!(config.engine.abnormal_margin, 0.15);
        assert_eq!(config.engine.abnormal_min_consec, 3);
        let targets: Vec<_> = config.engine.repetition_targets.iter().copied().collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&CoarseAction::Sitting));
        assert!(targets.contains(&CoarseAction::Playing));
    }

    #[test]
    fn test_unparsable_value_falls_back() {
        let config = from_pairs(&[("BHV_STRIDE", "eight"), ("BHV_SAMPLE_FPS", "")]);
        assert_eq!(config.engine.stride, 8);
        assert_eq!(config.engine.sample_fps, 10.0);
    }

    #[test]
    fn test_narrative_key_fallback() {
        let config = from_pairs(&[("OPENAI_API_KEY", "sk-openai")]);
        assert_eq!(config.narrative.api_key.as_deref(), Some("sk-openai"));

        let config = from_pairs(&[
            ("OPENAI_API_KEY", "sk-openai"),
            ("NARRATIVE_API_KEY", "sk-narrative"),
        ]);
        assert_eq!(config.narrative.api_key.as_deref(), Some("sk-narrative"));
    }

    #[test]
    fn test_default_report_path() {
        let config = from_pairs(&[("BHV_REPORT_DIR", "/var/reports")]);
        assert_eq!(
            config.default_report_path(Path::new("/videos/cam1/morning.mp4")),
            PathBuf::from("/var/reports/morning.report.json")
        );
    }
}
