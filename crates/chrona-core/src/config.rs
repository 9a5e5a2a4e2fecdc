use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bar::{BarConfig, FillPolicy};
use crate::oauth::OAuthCredentials;
use crate::sentence::DEFAULT_SENTENCE;

const CONFIG_DIR_NAME: &str = "chrona";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;
/// Environment variable that points at an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "CHRONA_CONFIG";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_PROMPT: &str = "AIが時間の観測者として、1年の進行度に寄り添う短い一文を日本語で生成して。哲学的な表現で、句読点含めて40文字以内にして。";
pub const DEFAULT_X_ENDPOINT: &str = "https://api.twitter.com";

pub const X_API_KEY: &str = "X_API_KEY";
pub const X_API_SECRET: &str = "X_API_SECRET";
pub const X_ACCESS_TOKEN: &str = "X_ACCESS_TOKEN";
pub const X_ACCESS_TOKEN_SECRET: &str = "X_ACCESS_TOKEN_SECRET";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Result returned by [`load_settings`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct SettingsLoadResult {
    pub settings: Settings,
    pub warnings: Vec<String>,
    pub source: SettingsSource,
    pub path: PathBuf,
}

/// Indicates where the settings were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    /// No settings file was found or usable; defaults were synthesized.
    Default,
    /// Settings were read from a TOML file.
    File,
}

/// Errors that can occur when persisting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML serialization error: {0}")]
    Ser(#[from] toml::ser::Error),
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
}

/// Deployment settings, constructed once at process start and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::schema_version")]
    pub schema_version: u32,
    #[serde(default = "Settings::default_sentence")]
    pub default_sentence: String,
    /// Fixed offset from UTC used to decide what "today" is.
    #[serde(default = "Settings::default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    // Tables must follow plain values for TOML serialization.
    #[serde(default)]
    pub bar: BarConfig,
    #[serde(default)]
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub x: XSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            bar: BarConfig::default(),
            default_sentence: Self::default_sentence(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            gemini: GeminiSettings::default(),
            x: XSettings::default(),
        }
    }
}

impl Settings {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }

    fn default_sentence() -> String {
        DEFAULT_SENTENCE.to_string()
    }

    const fn default_utc_offset_hours() -> i32 {
        DEFAULT_UTC_OFFSET_HOURS
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "GeminiSettings::default_model")]
    pub model: String,
    /// Prompt template; `{day}`, `{total}`, `{remaining}` and `{percent}` are filled in.
    #[serde(default = "GeminiSettings::default_prompt")]
    pub prompt: String,
    #[serde(default = "GeminiSettings::default_endpoint")]
    pub endpoint: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            prompt: Self::default_prompt(),
            endpoint: Self::default_endpoint(),
        }
    }
}

impl GeminiSettings {
    fn default_model() -> String {
        DEFAULT_GEMINI_MODEL.to_string()
    }

    fn default_prompt() -> String {
        DEFAULT_GEMINI_PROMPT.to_string()
    }

    fn default_endpoint() -> String {
        DEFAULT_GEMINI_ENDPOINT.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XSettings {
    #[serde(default = "XSettings::default_endpoint")]
    pub endpoint: String,
}

impl Default for XSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
        }
    }
}

impl XSettings {
    fn default_endpoint() -> String {
        DEFAULT_X_ENDPOINT.to_string()
    }
}

/// Command-line adjustments layered over the loaded settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub policy: Option<FillPolicy>,
    pub width: Option<usize>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self.policy.is_none() && self.width.is_none()
    }
}

/// Apply overrides in place, recording a warning for any value that is rejected.
pub fn apply_overrides(
    settings: &mut Settings,
    overrides: &SettingsOverrides,
    warnings: &mut Vec<String>,
) {
    if let Some(policy) = overrides.policy {
        settings.bar.policy = policy;
    }
    if let Some(width) = overrides.width {
        if width == 0 {
            warnings.push("Ignoring --width 0; bar width must be positive.".to_string());
        } else {
            settings.bar.width = width;
        }
    }
}

/// Base directory for chrona's settings and logs.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Settings path: explicit argument, then `CHRONA_CONFIG`, then the per-user default.
pub fn settings_path(explicit: Option<&str>) -> PathBuf {
    let from_env = std::env::var(CONFIG_PATH_ENV).ok();
    match explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            from_env
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
    {
        Some(value) => PathBuf::from(shellexpand::tilde(value).into_owned()),
        None => config_directory().join(CONFIG_FILE_NAME),
    }
}

/// Load settings from `path`, falling back to defaults when it is absent or unusable.
pub fn load_settings(path: &Path) -> SettingsLoadResult {
    let mut warnings = Vec::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<Settings>(&raw) {
                Ok(settings) => {
                    let (settings, mut sanitize_warnings) = sanitize_settings(settings);
                    warnings.append(&mut sanitize_warnings);
                    return SettingsLoadResult {
                        settings,
                        warnings,
                        source: SettingsSource::File,
                        path: path.to_path_buf(),
                    };
                }
                Err(err) => {
                    warnings.push(format!(
                        "Failed to parse {} as TOML: {}. Falling back to defaults.",
                        path.display(),
                        err
                    ));
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read {}: {}. Falling back to defaults.",
                    path.display(),
                    err
                ));
            }
        }
    }

    SettingsLoadResult {
        settings: Settings::default(),
        warnings,
        source: SettingsSource::Default,
        path: path.to_path_buf(),
    }
}

/// Write `settings` to `path`, refusing to clobber an existing file unless `overwrite`.
pub fn save_settings(
    path: &Path,
    settings: &Settings,
    overwrite: bool,
) -> Result<(), SettingsError> {
    if path.exists() && !overwrite {
        return Err(SettingsError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_toml(settings)?)?;
    Ok(())
}

pub fn to_toml(settings: &Settings) -> Result<String, SettingsError> {
    Ok(toml::to_string_pretty(settings)?)
}

fn sanitize_settings(mut settings: Settings) -> (Settings, Vec<String>) {
    let mut warnings = Vec::new();
    let defaults = Settings::default();

    if settings.schema_version != CURRENT_SCHEMA_VERSION {
        warnings.push(format!(
            "Unknown settings schema version {}. Resetting to {}.",
            settings.schema_version, CURRENT_SCHEMA_VERSION
        ));
        return (defaults, warnings);
    }

    if settings.bar.width == 0 {
        warnings.push(format!(
            "Bar width must be positive; using {}.",
            defaults.bar.width
        ));
        settings.bar.width = defaults.bar.width;
    }
    if settings.bar.filled.is_empty() {
        warnings.push("Filled glyph is empty; using the default.".to_string());
        settings.bar.filled = defaults.bar.filled.clone();
    }
    if settings.bar.empty.is_empty() {
        warnings.push("Empty glyph is empty; using the default.".to_string());
        settings.bar.empty = defaults.bar.empty.clone();
    }
    if settings.default_sentence.trim().is_empty() {
        warnings.push("Default sentence is blank; using the built-in sentence.".to_string());
        settings.default_sentence = defaults.default_sentence.clone();
    }
    if !(-23..=23).contains(&settings.utc_offset_hours) {
        warnings.push(format!(
            "UTC offset {}h is out of range; using +{}h.",
            settings.utc_offset_hours, DEFAULT_UTC_OFFSET_HOURS
        ));
        settings.utc_offset_hours = DEFAULT_UTC_OFFSET_HOURS;
    }
    if settings.gemini.model.trim().is_empty() {
        warnings.push(format!("Gemini model is blank; using {DEFAULT_GEMINI_MODEL}."));
        settings.gemini.model = defaults.gemini.model.clone();
    }
    if settings.gemini.prompt.trim().is_empty() {
        warnings.push("Gemini prompt is blank; using the built-in prompt.".to_string());
        settings.gemini.prompt = defaults.gemini.prompt.clone();
    }

    (settings, warnings)
}

/// Required secrets that were absent or blank, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required environment variables: {}", .0.join(", "))]
pub struct MissingCredentials(pub Vec<&'static str>);

/// Secrets read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub x: Result<OAuthCredentials, MissingCredentials>,
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("x", &self.x)
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read every secret through `lookup`; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let consumer_key = read(X_API_KEY);
        let consumer_secret = read(X_API_SECRET);
        let access_token = read(X_ACCESS_TOKEN);
        let access_token_secret = read(X_ACCESS_TOKEN_SECRET);

        let x = match (consumer_key, consumer_secret, access_token, access_token_secret) {
            (
                Some(consumer_key),
                Some(consumer_secret),
                Some(access_token),
                Some(access_token_secret),
            ) => Ok(OAuthCredentials {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            }),
            (consumer_key, consumer_secret, access_token, access_token_secret) => {
                let missing = [
                    (X_API_KEY, consumer_key.is_none()),
                    (X_API_SECRET, consumer_secret.is_none()),
                    (X_ACCESS_TOKEN, access_token.is_none()),
                    (X_ACCESS_TOKEN_SECRET, access_token_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(MissingCredentials(missing))
            }
        };

        Self {
            x,
            gemini_api_key: read(GEMINI_API_KEY),
        }
    }

    /// Every required secret that is absent, posting credentials first.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = match &self.x {
            Ok(_) => Vec::new(),
            Err(MissingCredentials(names)) => names.clone(),
        };
        if self.gemini_api_key.is_none() {
            missing.push(GEMINI_API_KEY);
        }
        missing
    }
}
