use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_FEED_BATCH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

impl Environment {
    /// Variable holding the API base URL for this environment.
    pub fn api_url_var(self) -> &'static str {
        match self {
            Environment::Development => "WECHOOSE_DEV_API_URL",
            Environment::Production => "WECHOOSE_API_URL",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown environment '{0}' (expected development or production)")]
    InvalidEnvironment(String),

    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Could not determine home directory")]
    NoHomeDirectory,
}

/// Values given on the command line; they take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub environment: Option<Environment>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub api_url: String,
    pub request_timeout: Duration,
    pub feed_batch: usize,
}

impl Config {
    pub fn from_env(overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(overrides: &Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match overrides.environment {
            Some(env) => env,
            None => match get("WECHOOSE_ENV") {
                Some(raw) => raw.parse()?,
                None => Environment::Production,
            },
        };

        let api_url = overrides
            .api_url
            .clone()
            .or_else(|| get(environment.api_url_var()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = validate_url(api_url.trim())?;

        let request_timeout = Duration::from_secs(positive(
            "WECHOOSE_TIMEOUT_SECS",
            get("WECHOOSE_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);
        let feed_batch = positive(
            "WECHOOSE_FEED_BATCH",
            get("WECHOOSE_FEED_BATCH"),
            DEFAULT_FEED_BATCH as u64,
        )? as usize;

        Ok(Self {
            environment,
            api_url,
            request_timeout,
            feed_batch,
        })
    }
}

fn validate_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim_end_matches('/');
    match reqwest::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(trimmed.to_string())
        }
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

fn positive(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

/// Per-user directories for the session file and the log.
pub struct Paths {
    pub session_file: PathBuf,
    pub log_file: PathBuf,
}

impl Paths {
    pub fn discover() -> Result<Self, ConfigError> {
        let dirs = directories::ProjectDirs::from("dev", "wechoose", "wechoose")
            .ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self {
            session_file: dirs.config_dir().join("session.json"),
            log_file: dirs.cache_dir().join("wechoose.log"),
        })
    }
}
