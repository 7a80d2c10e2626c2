use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use quiz_core::model::{Question, QuizSettings};

use crate::content::FallbackPool;
use crate::error::ConfigError;

pub const API_URL: &str = "QUIZ_API_URL";
pub const DB_URL: &str = "QUIZ_DB_URL";
pub const LOCAL_STORE: &str = "QUIZ_LOCAL_STORE";
pub const QUESTIONS_PER_SESSION: &str = "QUIZ_QUESTIONS_PER_SESSION";
pub const TIME_LIMIT_SECS: &str = "QUIZ_TIME_LIMIT_SECS";
pub const PASSING_SCORE: &str = "QUIZ_PASSING_SCORE";
pub const REQUEST_TIMEOUT_SECS: &str = "QUIZ_REQUEST_TIMEOUT_SECS";
pub const FALLBACK_WHEN_EMPTY: &str = "QUIZ_FALLBACK_WHEN_EMPTY";

/// Runtime configuration for [`crate::AppServices`].
///
/// Backend choice: `api_url` wins over `db_url`; with neither set everything
/// stays in memory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: Option<Url>,
    pub db_url: Option<String>,
    /// File backing the local store; in-memory when unset.
    pub local_store: Option<PathBuf>,
    pub settings: QuizSettings,
    pub request_timeout: Duration,
    pub fallback: FallbackPool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            db_url: None,
            local_store: None,
            settings: QuizSettings::default(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            fallback: FallbackPool::default(),
        }
    }
}

impl AppConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Read configuration from the process environment after loading `.env`, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that are set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Unset or blank keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that are set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = QuizSettings::default();

        let api_url = get(API_URL)
            .map(|raw| Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { key: API_URL, source }))
            .transpose()?;
        let settings = QuizSettings::new(
            number(QUESTIONS_PER_SESSION, get(QUESTIONS_PER_SESSION))?
                .unwrap_or(defaults.question_count()),
            number(TIME_LIMIT_SECS, get(TIME_LIMIT_SECS))?.unwrap_or(defaults.time_limit_secs()),
            number(PASSING_SCORE, get(PASSING_SCORE))?
                .unwrap_or_else(|| u32::from(defaults.passing_score())),
        )?;
        let request_timeout = number(REQUEST_TIMEOUT_SECS, get(REQUEST_TIMEOUT_SECS))?
            .map_or(Self::DEFAULT_REQUEST_TIMEOUT, |secs| {
                Duration::from_secs(u64::from(secs))
            });

        Ok(Self {
            api_url,
            db_url: get(DB_URL),
            local_store: get(LOCAL_STORE).map(PathBuf::from),
            settings,
            request_timeout,
            fallback: FallbackPool {
                questions: Vec::new(),
                when_empty: flag(FALLBACK_WHEN_EMPTY, get(FALLBACK_WHEN_EMPTY))?.unwrap_or(false),
            },
        })
    }

    /// Questions to serve when neither the remote nor the offline cache has any.
    #[must_use]
    pub fn with_fallback_questions(mut self, questions: Vec<Question>) -> Self {
        self.fallback.questions = questions;
        self
    }
}

fn number(key: &'static str, value: Option<String>) -> Result<Option<u32>, ConfigError> {
    value
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber { key, value: v })
        })
        .transpose()
}

fn flag(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: v }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::SettingsError;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.api_url.is_none());
        assert!(config.db_url.is_none());
        assert!(config.local_store.is_none());
        assert_eq!(config.settings, QuizSettings::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(!config.fallback.when_empty);
    }

    #[test]
    fn reads_every_key() {
        let config = AppConfig::from_lookup(lookup(&[
            (API_URL, "http://localhost:3001"),
            (DB_URL, "sqlite::memory:"),
            (LOCAL_STORE, "/tmp/quiz.json"),
            (QUESTIONS_PER_SESSION, "10"),
            (TIME_LIMIT_SECS, " 0 "),
            (PASSING_SCORE, "75"),
            (REQUEST_TIMEOUT_SECS, "3"),
            (FALLBACK_WHEN_EMPTY, "yes"),
        ]))
        .unwrap();

        assert_eq!(config.api_url.unwrap().as_str(), "http://localhost:3001/");
        assert_eq!(config.db_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.local_store, Some(PathBuf::from("/tmp/quiz.json")));
        assert_eq!(config.settings.question_count(), 10);
        assert!(!config.settings.is_timed());
        assert_eq!(config.settings.passing_score(), 75);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert!(config.fallback.when_empty);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = AppConfig::from_lookup(lookup(&[(API_URL, "  "), (PASSING_SCORE, "")])).unwrap();
        assert!(config.api_url.is_none());
        assert_eq!(config.settings.passing_score(), 60);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(QUESTIONS_PER_SESSION, "five")])).unwrap_err(),
            ConfigError::InvalidNumber { key: QUESTIONS_PER_SESSION, .. }
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(API_URL, "not a url")])).unwrap_err(),
            ConfigError::InvalidUrl { key: API_URL, .. }
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(FALLBACK_WHEN_EMPTY, "maybe")])).unwrap_err(),
            ConfigError::InvalidFlag { .. }
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(PASSING_SCORE, "150")])).unwrap_err(),
            ConfigError::Settings(SettingsError::InvalidPassingScore(150))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(QUESTIONS_PER_SESSION, "0")])).unwrap_err(),
            ConfigError::Settings(SettingsError::InvalidQuestionCount)
        ));
    }
}
