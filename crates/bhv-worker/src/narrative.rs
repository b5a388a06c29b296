//! Narrative report for caregivers.
//!
//! Turns the flags of a [`Report`] into short readable lines and, when
//! anything was flagged, asks an OpenAI-compatible chat-completions endpoint
//! for likely causes and practical advice. A missing key or a failed call
//! degrades to a note in the text; it never fails the run.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bhv_models::Report;

use crate::config::NarrativeConfig;
use crate::error::{WorkerError, WorkerResult};

const SYSTEM_PROMPT: &str =
    "You are a child behavior specialist who answers caregivers warmly and concisely.";

/// One line per repetition flag and abnormal interval.
pub fn narrative_lines(report: &Report) -> Vec<String> {
    let repetition = report.repetition_flags.iter().map(|ev| {
        format!(
            "- repetition: {} sustained for {:.1}s",
            ev.kind,
            ev.duration_sec()
        )
    });
    let abnormal = report.abnormal_flags.iter().map(|ev| {
        format!(
            "- abnormal interval: {:.2}s–{:.2}s (avg confidence {:.2})",
            ev.t_start, ev.t_end, ev.avg_conf
        )
    });
    repetition.chain(abnormal).collect()
}

/// Message used when nothing was flagged.
pub fn no_flags_message(report: &Report) -> String {
    format!(
        "Video analysis: no abnormal behavior detected (duration {}s)",
        report.summary.duration_sec
    )
}

/// Prompt sent to the chat model for a flagged report.
pub fn build_prompt(report: &Report, lines: &[String]) -> WorkerResult<String> {
    let summary = serde_json::to_string(&report.summary)
        .map_err(|e| WorkerError::narrative_failed(format!("summary encoding: {e}")))?;

    Ok(format!(
        "The following is a behavior analysis of a child recorded by a home camera.\n\n\
         Summary: {summary}\n\
         Flagged behavior:\n{flags}\n\n\
         Based on the flagged behavior:\n\
         1) Describe what the behavior most likely is and explain possible causes.\n\
         2) Give caregivers 4-5 lines of practical advice on how to respond.\n\
         3) If the behavior does not look abnormal, say that nothing abnormal happened.\n\n\
         Say each point only once.",
        flags = lines.join("\n"),
    ))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for the narrative.
pub struct NarrativeClient {
    http: Client,
    config: NarrativeConfig,
}

impl NarrativeClient {
    pub fn new(config: NarrativeConfig) -> WorkerResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Full narrative text for a report.
    pub async fn narrate(&self, report: &Report) -> String {
        if !report.has_flags() {
            return no_flags_message(report);
        }

        let lines = narrative_lines(report);
        let advice = match self.advice(report, &lines).await {
            Ok(advice) => advice,
            Err(e) => {
                warn!(error = %e, "Narrative advice unavailable");
                format!("(note: advice skipped: {e})")
            }
        };

        format!(
            "Video analysis report\n{}\n\nSuggested follow-up:\n{}",
            lines.join("\n"),
            advice
        )
    }

    async fn advice(&self, report: &Report, lines: &[String]) -> WorkerResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| WorkerError::config_error("NARRATIVE_API_KEY is not set"))?;
        let prompt = build_prompt(report, lines)?;
        self.complete(api_key, &prompt).await
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> WorkerResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        debug!(model = %self.config.model, "Requesting narrative from {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::narrative_failed(format!(
                "chat completions returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| WorkerError::narrative_failed("empty completion"))?;

        info!(chars = content.len(), "Narrative received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhv_media::{report::analysis_params, summarize, EngineConfig};
    use bhv_models::{CoarseAction, Event, EventKind, WindowStats};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report(repetition: Vec<Event>, abnormal: Vec<Event>) -> Report {
        let walking = vec![Event::new(EventKind::Action(CoarseAction::Walking), 0.0, 30.0, 0.8)];
        Report {
            video_path: "/videos/cam.mp4".to_string(),
            duration_sec: 30.0,
            params: analysis_params(&EngineConfig::default(), "action", "abnormal"),
            window_stats: WindowStats::default(),
            clips: Vec::new(),
            summary: summarize(30.0, &walking, &repetition, &abnormal),
            action_events: walking,
            repetition_flags: repetition,
            abnormal_flags: abnormal,
        }
    }

    fn flagged() -> Report {
        report(
            vec![Event::new(EventKind::Action(CoarseAction::Running), 2.0, 14.3, 0.7)],
            vec![Event::new(EventKind::Abnormal, 3.2, 9.8, 0.843)],
        )
    }

    fn client(server: &MockServer, key: Option<&str>) -> NarrativeClient {
        NarrativeClient::new(NarrativeConfig {
            api_url: format!("{}/v1", server.uri()),
            api_key: key.map(String::from),
            ..NarrativeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_narrative_lines() {
        let lines = narrative_lines(&flagged());
        assert_eq!(
            lines,
            vec![
                "- repetition: running sustained for 12.3s".to_string(),
                "- abnormal interval: 3.20s–9.80s (avg confidence 0.84)".to_string(),
            ]
        );
    }

    #[test]
    fn test_prompt_includes_summary_and_flags() {
        let report = flagged();
        let prompt = build_prompt(&report, &narrative_lines(&report)).unwrap();
        assert!(prompt.contains("\"abnormal_flags_count\":1"));
        assert!(prompt.contains("repetition: running"));
        assert!(prompt.contains("4-5 lines"));
    }

    #[tokio::test]
    async fn test_no_flags_skips_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let text = client(&server, Some("sk-test"))
            .narrate(&report(vec![], vec![]))
            .await;
        assert_eq!(text, "Video analysis: no abnormal behavior detected (duration 30s)");
    }

    #[tokio::test]
    async fn test_flagged_report_includes_advice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Stay calm and observe.  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server, Some("sk-test")).narrate(&flagged()).await;
        assert!(text.starts_with("Video analysis report\n- repetition: running"));
        assert!(text.ends_with("Suggested follow-up:\nStay calm and observe."));
    }

    #[tokio::test]
    async fn test_missing_key_falls_back_to_note() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let text = client(&server, None).narrate(&flagged()).await;
        assert!(text.contains("- abnormal interval: 3.20s–9.80s"));
        assert!(text.contains("(note: advice skipped: Configuration error: NARRATIVE_API_KEY is not set)"));
    }

    #[tokio::test]
    async fn test_service_error_falls_back_to_note() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let text = client(&server, Some("sk-test")).narrate(&flagged()).await;
        assert!(text.contains("(note: advice skipped:"));
        assert!(text.contains("rate limited"));
    }
}
