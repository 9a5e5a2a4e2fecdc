//! Core library for chrona: year progress, bar rendering, post composition, and the
//! Gemini and X clients that feed and publish it.

pub mod bar;
pub mod compose;
pub mod config;
pub mod gemini;
pub mod logging;
pub mod oauth;
pub mod progress;
pub mod runtime;
pub mod sentence;
pub mod x;

pub use bar::{BarConfig, FillPolicy, RenderedBar, render};
pub use compose::{compose, weekday_ja};
pub use config::{
    Credentials, MissingCredentials, Settings, SettingsError, SettingsLoadResult,
    SettingsOverrides, SettingsSource, apply_overrides, config_directory, load_settings,
    save_settings, settings_path,
};
pub use gemini::GeminiClient;
pub use logging::{
    LoggingDestination, LoggingError, LoggingGuard, current_log_path, init_logging,
    init_logging_in,
};
pub use progress::{YearProgress, date_in_offset, days_in_year, is_leap_year, today_in_offset};
pub use runtime::{
    ComposedPost, RunOutcome, RunRequest, compose_post, preview, run, run_pipeline,
};
pub use sentence::{
    DEFAULT_SENTENCE, ResolvedSentence, SentenceError, SentenceOutcome, SentenceProvider,
    resolve_sentence,
};
pub use oauth::SigningError;
pub use x::{PostError, PostId, Poster, XClient};
