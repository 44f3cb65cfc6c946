//! Gemini-backed [`TextRewriter`].
//!
//! Only request and response shaping lives here; the prompt text itself is
//! rendered by [`RewriteRequest::prompt`].

use async_trait::async_trait;
use mdx_docs_core::contract::TextRewriter;
use mdx_docs_core::error::RewriteError;
use mdx_docs_core::rewrite::RewriteRequest;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::load_config::GeminiSettings;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// `None` when no API key is configured.
    pub fn from_settings(settings: &GeminiSettings) -> Option<Self> {
        let api_key = settings.api_key.clone()?;
        info!(model = %settings.model, "Initialized GeminiClient");
        Some(Self {
            http: reqwest::Client::new(),
            api_key,
            model: settings.model.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl TextRewriter for GeminiClient {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<String, RewriteError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt() }] }]
        });
        debug!(model = %self.model, task = request.task.name(), "Calling Gemini generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini request failed");
                RewriteError::Unreachable(e.to_string())
            })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RewriteError::Unreachable(e.to_string()))?;
        parse_generate_response(status, &text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    message: String,
}

/// Turn a raw generateContent answer into the generated text.
pub fn parse_generate_response(status: u16, body: &str) -> Result<String, RewriteError> {
    let parsed = serde_json::from_str::<GenerateContentResponse>(body);

    if !(200..300).contains(&status) {
        let message = match &parsed {
            Ok(GenerateContentResponse {
                error: Some(err), ..
            }) if !err.message.is_empty() => err.message.clone(),
            _ => body.trim().to_string(),
        };
        error!(status, message = %message, "Gemini rejected the request");
        return Err(RewriteError::Rejected { status, message });
    }

    let response = parsed.map_err(|e| RewriteError::Malformed(e.to_string()))?;
    if let Some(err) = response.error {
        return Err(RewriteError::Rejected {
            status,
            message: err.message,
        });
    }
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RewriteError::Rejected {
            status,
            message: format!("prompt blocked: {reason}"),
        });
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(RewriteError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_parts_of_first_candidate() {
        let body = r##"{"candidates":[{"content":{"parts":[{"text":"# Title\n"},{"text":"Body"}]}},{"content":{"parts":[{"text":"ignored"}]}}]}"##;
        assert_eq!(parse_generate_response(200, body).unwrap(), "# Title\nBody");
    }

    #[test]
    fn error_body_is_rejected_with_provider_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        match parse_generate_response(400, body) {
            Err(RewriteError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid. Please pass a valid API key.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_json_failure_keeps_raw_body() {
        match parse_generate_response(503, "upstream unavailable") {
            Err(RewriteError::Rejected { message, .. }) => {
                assert_eq!(message, "upstream unavailable")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn blocked_prompt_is_rejected() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse_generate_response(200, body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        assert!(matches!(
            parse_generate_response(200, r#"{"candidates":[]}"#),
            Err(RewriteError::EmptyResponse)
        ));
    }

    #[test]
    fn garbage_success_body_is_malformed() {
        assert!(matches!(
            parse_generate_response(200, "<html>"),
            Err(RewriteError::Malformed(_))
        ));
    }

    #[test]
    fn client_requires_api_key() {
        let settings = GeminiSettings {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
        };
        assert!(GeminiClient::from_settings(&settings).is_none());

        let with_key = GeminiSettings {
            api_key: Some("k".to_string()),
            api_base: "http://localhost:9999/".to_string(),
            ..settings
        };
        let client = GeminiClient::from_settings(&with_key).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
