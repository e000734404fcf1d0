use koma_core::recognition::{validate_threshold, DEFAULT_TAGGER_THRESHOLD};

/// A configuration variable held a value that could not be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the annotation server, without trailing slash.
    pub api_url: String,
    /// Sent as `X-API-Key` when present.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Confidence floor for tagging requests.
    pub tagger_threshold: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_key: None,
            timeout_secs: 60,
            tagger_threshold: DEFAULT_TAGGER_THRESHOLD,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `KOMA_API_URL`          | `http://localhost:8000` |
    /// | `KOMA_API_KEY`          | unset                   |
    /// | `KOMA_TIMEOUT_SECS`     | `60`                    |
    /// | `KOMA_TAGGER_THRESHOLD` | `0.6`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = lookup("KOMA_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let api_key = lookup("KOMA_API_KEY").filter(|key| !key.trim().is_empty());

        let timeout_secs = match lookup("KOMA_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError {
                var: "KOMA_TIMEOUT_SECS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.timeout_secs,
        };

        let tagger_threshold = match lookup("KOMA_TAGGER_THRESHOLD") {
            Some(raw) => {
                let invalid = |reason: String| ConfigError {
                    var: "KOMA_TAGGER_THRESHOLD",
                    value: raw.clone(),
                    reason,
                };
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| invalid(e.to_string()))?;
                validate_threshold(value).map_err(|e| invalid(e.to_string()))?;
                value
            }
            None => defaults.tagger_threshold,
        };

        Ok(Self {
            api_url,
            api_key,
            timeout_secs,
            tagger_threshold,
        })
    }
}
