use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::XSettings;
use crate::oauth::{self, OAuthCredentials, RequestNonce, SigningError};

/// Identifier X assigns to a created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("X API rejected the post ({status}): {detail}")]
    Rejected {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("failed to sign request: {0}")]
    Signing(#[from] SigningError),
    #[error("failed to decode X API response: {0}")]
    Decode(String),
}

/// Something that publishes the composed text.
pub trait Poster {
    fn post(&self, text: &str) -> impl Future<Output = Result<PostId, PostError>> + Send;
}

/// OAuth 1.0a user-context client for the X API.
#[derive(Debug, Clone)]
pub struct XClient {
    http: reqwest::Client,
    credentials: OAuthCredentials,
    settings: XSettings,
}

impl XClient {
    pub fn new(credentials: OAuthCredentials, settings: XSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            settings,
        }
    }

    fn url(&self) -> String {
        format!("{}/2/tweets", self.settings.endpoint.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Deserialize, Default)]
struct ProblemResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Vec<ProblemEntry>,
}

#[derive(Deserialize)]
struct ProblemEntry {
    #[serde(default)]
    message: Option<String>,
}

fn parse_created(body: &str) -> Result<PostId, PostError> {
    let response: CreatePostResponse =
        serde_json::from_str(body).map_err(|err| PostError::Decode(err.to_string()))?;
    Ok(PostId(response.data.id))
}

/// Human-readable summary of an X error body; the raw body when it is not JSON.
fn describe_problem(body: &str) -> String {
    let Ok(problem) = serde_json::from_str::<ProblemResponse>(body) else {
        return body.trim().to_string();
    };

    let mut parts = Vec::new();
    if let Some(title) = problem.title {
        parts.push(title);
    }
    if let Some(detail) = problem.detail {
        parts.push(detail);
    }
    parts.extend(problem.errors.into_iter().filter_map(|entry| entry.message));

    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

impl Poster for XClient {
    async fn post(&self, text: &str) -> Result<PostId, PostError> {
        let url = self.url();
        let authorization = oauth::authorization_header(
            "POST",
            &url,
            &[],
            &self.credentials,
            &RequestNonce::generate(),
        )?;

        info!(chars = text.chars().count(), "Posting to X");
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&CreatePostRequest { text })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "X response received");

        if !status.is_success() {
            return Err(PostError::Rejected {
                status,
                detail: describe_problem(&body),
            });
        }

        parse_created(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_created_post_id() {
        let body = r#"{"data":{"id":"1445880548472328192","text":"hello"}}"#;
        assert_eq!(
            parse_created(body).unwrap(),
            PostId("1445880548472328192".to_string())
        );
    }

    #[test]
    fn missing_data_is_decode_error() {
        assert!(matches!(
            parse_created(r#"{"errors":[]}"#),
            Err(PostError::Decode(_))
        ));
    }

    #[test]
    fn problem_details_are_summarised() {
        let body = r#"{"title":"Forbidden","detail":"You are not permitted to perform this action.","type":"about:blank","status":403}"#;
        assert_eq!(
            describe_problem(body),
            "Forbidden; You are not permitted to perform this action."
        );

        let body = r#"{"errors":[{"message":"duplicate content"}]}"#;
        assert_eq!(describe_problem(body), "duplicate content");
    }

    #[test]
    fn non_json_problem_is_kept_raw() {
        assert_eq!(describe_problem(" Too Many Requests \n"), "Too Many Requests");
        assert_eq!(describe_problem("{}"), "{}");
    }

    #[test]
    fn url_joins_endpoint() {
        let settings = XSettings {
            endpoint: "https://api.x.test/".to_string(),
        };
        let client = XClient::new(
            OAuthCredentials {
                consumer_key: "a".into(),
                consumer_secret: "b".into(),
                access_token: "c".into(),
                access_token_secret: "d".into(),
            },
            settings,
        );
        assert_eq!(client.url(), "https://api.x.test/2/tweets");
    }
}
