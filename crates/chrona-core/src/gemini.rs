use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GeminiSettings;
use crate::progress::YearProgress;
use crate::sentence::{SentenceError, SentenceProvider};

/// Gemini `generateContent` client producing the daily sentence.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, settings: GeminiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }
}

/// Fill `{day}`, `{total}`, `{remaining}` and `{percent}` in a prompt template.
pub fn render_prompt(template: &str, progress: &YearProgress) -> String {
    template
        .replace("{day}", &progress.day_of_year.to_string())
        .replace("{total}", &progress.total_days.to_string())
        .replace("{remaining}", &progress.remaining_days().to_string())
        .replace("{percent}", &format!("{:.1}", progress.percentage))
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Concatenated text parts of the first candidate, if any.
fn extract_text(body: &str) -> Result<String, SentenceError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|err| SentenceError::Decode(err.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SentenceError::EmptyResponse);
    }
    Ok(text)
}

impl SentenceProvider for GeminiClient {
    async fn generate(&self, progress: &YearProgress) -> Result<String, SentenceError> {
        if self.api_key.trim().is_empty() {
            return Err(SentenceError::MissingApiKey);
        }

        let prompt = render_prompt(&self.settings.prompt, progress);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
        };

        info!(model = %self.settings.model, "Calling Gemini generateContent");
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SentenceError::Status { status, body });
        }
        debug!(bytes = body.len(), "Gemini response received");

        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "時は"}, {"text": "巡る。"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(extract_text(body).unwrap(), "時は巡る。");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        assert!(matches!(
            extract_text(r#"{"candidates": []}"#),
            Err(SentenceError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#),
            Err(SentenceError::EmptyResponse)
        ));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(
            extract_text("<html>"),
            Err(SentenceError::Decode(_))
        ));
    }

    #[test]
    fn prompt_placeholders_are_filled() {
        let progress = YearProgress::compute(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap());
        let prompt = render_prompt("{day}/{total} 残り{remaining} {percent}%", &progress);
        assert_eq!(prompt, "100/365 残り265 27.4%");
    }

    #[tokio::test]
    async fn blank_key_fails_without_network() {
        let client = GeminiClient::new("  ", GeminiSettings::default());
        let progress = YearProgress::compute(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(matches!(
            client.generate(&progress).await,
            Err(SentenceError::MissingApiKey)
        ));
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let settings = GeminiSettings {
            endpoint: "https://example.test/v1beta/".to_string(),
            model: "gemini-test".to_string(),
            ..GeminiSettings::default()
        };
        let client = GeminiClient::new("key", settings);
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }
}
