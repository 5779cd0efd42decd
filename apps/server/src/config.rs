//! Server configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use kobun_core::{QuestionBank, QuizConfig};

use crate::error::{ApiError, Result};

/// Question bank bundled into the binary, used when no path is configured.
pub const EMBEDDED_WORDS: &str = include_str!("../data/words.csv");

const DEFAULT_APP_NAME: &str = "古文単語";
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

/// Settings for the quiz server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CSV file with the question bank. The embedded bank is used when unset.
    pub words_path: Option<PathBuf>,
    /// Subject written into every results payload.
    pub app_name: String,
    /// Results sink endpoint. Submissions fail with a status message when unset.
    pub sink_url: Option<String>,
    /// Upper bound on one results request.
    pub sink_timeout_secs: u64,
    /// Sessions without learner activity for this long are dropped.
    pub session_idle_secs: u64,
    pub quiz: QuizConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            words_path: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            sink_url: None,
            sink_timeout_secs: DEFAULT_SINK_TIMEOUT_SECS,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            quiz: QuizConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment.
    ///
    /// Recognised env vars:
    /// - HOST, PORT: listen address (default 0.0.0.0:3000)
    /// - KOBUN_WORDS_PATH: question bank CSV
    /// - KOBUN_APP_NAME: subject of submitted results
    /// - KOBUN_SINK_URL: results endpoint
    /// - KOBUN_SINK_TIMEOUT_SECS: results request timeout (default 30)
    /// - KOBUN_SESSION_IDLE_SECS: idle time before a session is dropped (default 3600)
    /// - KOBUN_SESSION_SIZE: questions per session (default 20)
    /// - KOBUN_DURATION_SECS: countdown length (default 300)
    /// - KOBUN_FOLD: katakana_to_hiragana | hiragana_to_katakana
    /// - KOBUN_SKIP_HEADER: whether the CSV has a header row (default true)
    /// - KOBUN_SINK_MODE: fire_and_forget | confirmable
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let quiz = QuizConfig {
            fold: parse_var(&var, "KOBUN_FOLD")?.unwrap_or(defaults.quiz.fold),
            session_size: parse_var(&var, "KOBUN_SESSION_SIZE")?
                .unwrap_or(defaults.quiz.session_size),
            skip_header: parse_var(&var, "KOBUN_SKIP_HEADER")?
                .unwrap_or(defaults.quiz.skip_header),
            sink_mode: parse_var(&var, "KOBUN_SINK_MODE")?.unwrap_or(defaults.quiz.sink_mode),
            duration_secs: parse_var(&var, "KOBUN_DURATION_SECS")?
                .unwrap_or(defaults.quiz.duration_secs),
        };

        if quiz.session_size == 0 {
            return Err(ApiError::Config(
                "KOBUN_SESSION_SIZE must be at least 1".to_string(),
            ));
        }

        let sink_timeout_secs =
            parse_var(&var, "KOBUN_SINK_TIMEOUT_SECS")?.unwrap_or(defaults.sink_timeout_secs);
        let session_idle_secs =
            parse_var(&var, "KOBUN_SESSION_IDLE_SECS")?.unwrap_or(defaults.session_idle_secs);
        if sink_timeout_secs == 0 || session_idle_secs == 0 {
            return Err(ApiError::Config(
                "KOBUN_SINK_TIMEOUT_SECS and KOBUN_SESSION_IDLE_SECS must be at least 1"
                    .to_string(),
            ));
        }

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var(&var, "PORT")?.unwrap_or(defaults.port),
            words_path: var("KOBUN_WORDS_PATH").map(PathBuf::from),
            app_name: var("KOBUN_APP_NAME").unwrap_or(defaults.app_name),
            sink_url: var("KOBUN_SINK_URL"),
            sink_timeout_secs,
            session_idle_secs,
            quiz,
        })
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load the configured question bank.
    pub fn load_bank(&self) -> Result<QuestionBank> {
        match &self.words_path {
            Some(path) => QuestionBank::from_path(path, self.quiz.skip_header)
                .map_err(|e| ApiError::Config(e.to_string())),
            None => {
                tracing::info!("Using embedded question bank");
                Ok(QuestionBank::from_csv(EMBEDDED_WORDS, self.quiz.skip_header))
            }
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ApiError::Config(format!("{key}: {e}")))
        })
        .transpose()
}
