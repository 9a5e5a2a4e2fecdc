use chrono::NaiveDate;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::bar::{RenderedBar, render};
use crate::compose::compose;
use crate::config::{Credentials, Settings};
use crate::gemini::GeminiClient;
use crate::progress::{YearProgress, today_in_offset};
use crate::sentence::{ResolvedSentence, SentenceOutcome, SentenceProvider, resolve_sentence};
use crate::x::{PostError, PostId, Poster, XClient};

/// One invocation's inputs besides settings and secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub date: NaiveDate,
    /// Compose and log the post without publishing it.
    pub dry_run: bool,
}

impl RunRequest {
    /// A request for "today" in the configured UTC offset.
    pub fn today(settings: &Settings) -> Self {
        Self {
            date: today_in_offset(settings.utc_offset_hours),
            dry_run: false,
        }
    }
}

/// Structured result of a run; only the binary turns this into an exit status.
#[derive(Debug)]
pub enum RunOutcome {
    Posted { id: PostId, text: String },
    DryRun { text: String },
    ConfigurationMissing { missing: Vec<&'static str> },
    PostingFailed { error: PostError, text: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Posted { .. } | RunOutcome::DryRun { .. })
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Everything computed for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPost {
    pub progress: YearProgress,
    pub bar: RenderedBar,
    pub sentence: ResolvedSentence,
    pub text: String,
}

/// Pure composition step: progress, bar, fallback rule, layout.
pub fn compose_post(
    date: NaiveDate,
    settings: &Settings,
    progress: YearProgress,
    sentence: &SentenceOutcome,
) -> ComposedPost {
    let bar = render(progress.percentage, &settings.bar);
    let sentence = resolve_sentence(sentence, &settings.default_sentence);
    let text = compose(date, &progress, &bar, &sentence.text);
    ComposedPost {
        progress,
        bar,
        sentence,
        text,
    }
}

/// Secrets this request cannot proceed without.
///
/// A dry run publishes nothing, so it needs none; a missing Gemini key there only
/// means the default sentence is used.
pub fn required_missing(request: &RunRequest, credentials: &Credentials) -> Vec<&'static str> {
    if request.dry_run {
        Vec::new()
    } else {
        credentials.missing()
    }
}

/// Run against the real Gemini and X clients.
pub async fn run(
    request: &RunRequest,
    settings: &Settings,
    credentials: &Credentials,
) -> RunOutcome {
    let sentence = GeminiClient::new(
        credentials.gemini_api_key.clone().unwrap_or_default(),
        settings.gemini.clone(),
    );
    if request.dry_run {
        return preview(request, settings, &sentence).await;
    }

    match &credentials.x {
        Ok(x) => {
            let poster = XClient::new(x.clone(), settings.x.clone());
            run_pipeline(request, settings, credentials, &sentence, &poster).await
        }
        Err(_) => configuration_missing(credentials.missing()),
    }
}

/// Orchestrate one run with the given collaborators.
///
/// Credentials are validated before either collaborator is touched. The sentence
/// provider is asked once and its failure is recovered locally; the poster is called at
/// most once and its failure is returned as [`RunOutcome::PostingFailed`].
pub async fn run_pipeline<S, P>(
    request: &RunRequest,
    settings: &Settings,
    credentials: &Credentials,
    sentence_provider: &S,
    poster: &P,
) -> RunOutcome
where
    S: SentenceProvider,
    P: Poster,
{
    let missing = required_missing(request, credentials);
    if !missing.is_empty() {
        return configuration_missing(missing);
    }

    let mut stages = StageLogger::new();
    let post = prepare_post(request, settings, sentence_provider, &mut stages).await;
    if request.dry_run {
        info!("Dry run; not posting");
        return RunOutcome::DryRun { text: post.text };
    }

    stages.begin("Post");
    let result = poster.post(&post.text).await;
    stages.end();

    match result {
        Ok(id) => {
            info!(%id, "Post published");
            RunOutcome::Posted { id, text: post.text }
        }
        Err(err) => {
            error!(error = %err, "Posting failed");
            RunOutcome::PostingFailed {
                error: err,
                text: post.text,
            }
        }
    }
}

/// Compose the post without a poster. Needs no secrets.
pub async fn preview<S>(
    request: &RunRequest,
    settings: &Settings,
    sentence_provider: &S,
) -> RunOutcome
where
    S: SentenceProvider,
{
    let mut stages = StageLogger::new();
    let post = prepare_post(request, settings, sentence_provider, &mut stages).await;
    info!("Dry run; not posting");
    RunOutcome::DryRun { text: post.text }
}

async fn prepare_post<S>(
    request: &RunRequest,
    settings: &Settings,
    sentence_provider: &S,
    stages: &mut StageLogger,
) -> ComposedPost
where
    S: SentenceProvider,
{
    stages.begin("Year progress");
    info!(date = %request.date, dry_run = request.dry_run, "Target date");
    let progress = YearProgress::compute(request.date);
    info!(
        day = progress.day_of_year,
        total = progress.total_days,
        percent = %format!("{:.1}", progress.percentage),
        "Year progress computed"
    );
    stages.end();

    stages.begin("Sentence generation");
    let outcome = SentenceOutcome::from(sentence_provider.generate(&progress).await);
    if let SentenceOutcome::Failed(err) = &outcome {
        warn!(error = %err, "Sentence generation failed; using the default sentence");
    }
    stages.end();

    stages.begin("Compose");
    let post = compose_post(request.date, settings, progress, &outcome);
    info!(bar = %post.bar, policy = %settings.bar.policy, "Progress bar rendered");
    if post.sentence.used_fallback {
        info!(sentence = %post.sentence.text, "Using default sentence");
    } else {
        info!(sentence = %post.sentence.text, "Using generated sentence");
    }
    info!("Composed post:\n{}", post.text);
    stages.end();

    post
}

fn configuration_missing(missing: Vec<&'static str>) -> RunOutcome {
    error!(
        missing = %missing.join(", "),
        "Required environment variables are not set; aborting before any network call"
    );
    RunOutcome::ConfigurationMissing { missing }
}

/// Times pipeline stages and reports them through `tracing`.
struct StageLogger {
    program_start: Instant,
    stage_start: Instant,
    current_stage: Option<&'static str>,
}

impl StageLogger {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            program_start: now,
            stage_start: now,
            current_stage: None,
        }
    }

    fn begin(&mut self, name: &'static str) {
        info!(
            stage = name,
            elapsed_ms = %format_ms(self.program_start.elapsed()),
            "BEGIN"
        );
        self.stage_start = Instant::now();
        self.current_stage = Some(name);
    }

    fn end(&mut self) {
        if let Some(name) = self.current_stage.take() {
            info!(
                stage = name,
                elapsed_ms = %format_ms(self.program_start.elapsed()),
                stage_ms = %format_ms(self.stage_start.elapsed()),
                "END"
            );
        }
    }
}

fn format_ms(d: std::time::Duration) -> String {
    let ms = d.as_secs_f64() * 1_000.0;
    format!("{:.3}", ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bar::FillPolicy;
    use crate::config::GEMINI_API_KEY;
    use crate::sentence::SentenceError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn compose_post_uses_configured_bar() {
        let mut settings = Settings::default();
        settings.bar.width = 12;
        settings.bar.policy = FillPolicy::FloorByStep;
        let day = date(2024, 12, 31);

        let post = compose_post(
            day,
            &settings,
            YearProgress::compute(day),
            &SentenceOutcome::Generated("おしまい。".to_string()),
        );
        assert_eq!(post.bar.filled_width, 12);
        assert!(post.text.contains("366日 / 366日（残り0日）"));
        assert!(post.text.ends_with("おしまい。"));
        assert!(!post.sentence.used_fallback);
    }

    #[test]
    fn compose_post_falls_back_on_failure() {
        let settings = Settings::default();
        let day = date(2025, 1, 1);
        let post = compose_post(
            day,
            &settings,
            YearProgress::compute(day),
            &SentenceOutcome::Failed(SentenceError::EmptyResponse),
        );
        assert!(post.sentence.used_fallback);
        assert!(post.text.ends_with(&settings.default_sentence));
        assert!(post.text.starts_with("本日は2025年1月1日（水）"));
    }

    #[test]
    fn exit_codes() {
        let ok = RunOutcome::DryRun {
            text: String::new(),
        };
        assert_eq!(ok.exit_code(), 0);
        let missing = RunOutcome::ConfigurationMissing {
            missing: vec![GEMINI_API_KEY],
        };
        assert_eq!(missing.exit_code(), 1);
        assert!(!missing.is_success());
    }

    #[test]
    fn dry_run_requires_no_secrets() {
        let credentials = Credentials::from_lookup(|_| None);
        let request = RunRequest {
            date: date(2025, 6, 1),
            dry_run: true,
        };
        assert!(required_missing(&request, &credentials).is_empty());

        let request = RunRequest {
            dry_run: false,
            ..request
        };
        assert_eq!(required_missing(&request, &credentials).len(), 5);
    }

    #[tokio::test]
    async fn run_without_x_credentials_reports_them_before_any_call() {
        let credentials = Credentials::from_lookup(|name: &str| {
            (name == GEMINI_API_KEY).then(|| "gemini-key".to_string())
        });
        let request = RunRequest {
            date: date(2025, 6, 1),
            dry_run: false,
        };

        match run(&request, &Settings::default(), &credentials).await {
            RunOutcome::ConfigurationMissing { missing } => {
                assert_eq!(missing.len(), 4);
                assert!(!missing.contains(&GEMINI_API_KEY));
            }
            other => panic!("expected missing configuration, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_without_gemini_key_stops_before_posting() {
        let credentials = Credentials::from_lookup(|name: &str| {
            (name != GEMINI_API_KEY).then(|| format!("{name}-value"))
        });
        let request = RunRequest {
            date: date(2025, 6, 1),
            dry_run: false,
        };

        match run(&request, &Settings::default(), &credentials).await {
            RunOutcome::ConfigurationMissing { missing } => {
                assert_eq!(missing, vec![GEMINI_API_KEY]);
            }
            other => panic!("expected missing configuration, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dry_run_through_run_uses_default_sentence_without_secrets() {
        let credentials = Credentials::from_lookup(|_| None);
        let request = RunRequest {
            date: date(2025, 6, 1),
            dry_run: true,
        };

        match run(&request, &Settings::default(), &credentials).await {
            RunOutcome::DryRun { text } => {
                assert!(text.ends_with(crate::sentence::DEFAULT_SENTENCE));
            }
            other => panic!("expected dry run, got {other:?}"),
        }
    }
}
