use std::future::Future;

use thiserror::Error;

use crate::progress::YearProgress;

pub const DEFAULT_SENTENCE: &str = "時間は静かに流れ続けます。";

/// Leading markers models like to prefix list items with.
const BULLET_MARKERS: &[char] = &['*', '・', '-'];

/// Why a sentence could not be produced.
#[derive(Debug, Error)]
pub enum SentenceError {
    #[error("generative API key is not configured")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generative API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode generative API response: {0}")]
    Decode(String),
    #[error("generative API returned no text")]
    EmptyResponse,
}

/// Something that can write one sentence about the year so far.
pub trait SentenceProvider {
    fn generate(
        &self,
        progress: &YearProgress,
    ) -> impl Future<Output = Result<String, SentenceError>> + Send;
}

/// Result of asking a [`SentenceProvider`], before the fallback rule is applied.
#[derive(Debug)]
pub enum SentenceOutcome {
    Generated(String),
    Failed(SentenceError),
}

impl From<Result<String, SentenceError>> for SentenceOutcome {
    fn from(value: Result<String, SentenceError>) -> Self {
        match value {
            Ok(text) => SentenceOutcome::Generated(text),
            Err(err) => SentenceOutcome::Failed(err),
        }
    }
}

/// The sentence that ends up in the post, and whether it came from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSentence {
    pub text: String,
    pub used_fallback: bool,
}

/// Pick the first usable line of a generated reply, or `default` when there is none.
pub fn resolve_sentence(outcome: &SentenceOutcome, default: &str) -> ResolvedSentence {
    let generated = match outcome {
        SentenceOutcome::Generated(text) => first_usable_line(text),
        SentenceOutcome::Failed(_) => None,
    };

    match generated {
        Some(text) => ResolvedSentence {
            text,
            used_fallback: false,
        },
        None => ResolvedSentence {
            text: default.to_string(),
            used_fallback: true,
        },
    }
}

fn first_usable_line(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    let stripped = line.trim_start_matches(BULLET_MARKERS).trim();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(text: &str) -> SentenceOutcome {
        SentenceOutcome::Generated(text.to_string())
    }

    #[test]
    fn single_line_is_used_as_is() {
        let resolved = resolve_sentence(&generated("  一日は一頁。  "), DEFAULT_SENTENCE);
        assert_eq!(resolved.text, "一日は一頁。");
        assert!(!resolved.used_fallback);
    }

    #[test]
    fn first_non_empty_line_wins() {
        let resolved = resolve_sentence(&generated("\n\n 最初の行\n二行目\n"), DEFAULT_SENTENCE);
        assert_eq!(resolved.text, "最初の行");
    }

    #[test]
    fn bullet_markers_are_stripped() {
        for reply in ["* 時を刻む", "・時を刻む", "- 時を刻む", "**時を刻む"] {
            let resolved = resolve_sentence(&generated(reply), DEFAULT_SENTENCE);
            assert_eq!(resolved.text, "時を刻む", "reply {reply:?}");
        }
    }

    #[test]
    fn empty_and_whitespace_replies_fall_back() {
        for reply in ["", "   ", "\n \t\n", "*", " - "] {
            let resolved = resolve_sentence(&generated(reply), DEFAULT_SENTENCE);
            assert_eq!(resolved.text, DEFAULT_SENTENCE, "reply {reply:?}");
            assert!(resolved.used_fallback);
        }
    }

    #[test]
    fn failure_falls_back_to_configured_default() {
        let outcome = SentenceOutcome::Failed(SentenceError::EmptyResponse);
        let resolved = resolve_sentence(&outcome, "custom default");
        assert_eq!(resolved.text, "custom default");
        assert!(resolved.used_fallback);
    }
}
