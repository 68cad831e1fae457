use std::time::Duration;

use stackscout_core::job::Backoff;
use stackscout_core::ScoutError;

/// Job polling schedule and overall deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub factor: u32,
    pub max_interval: Duration,
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            factor: 2,
            max_interval: Duration::from_secs(10),
            deadline: Duration::from_secs(5 * 60),
        }
    }
}

impl PollConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: self.initial_interval,
            factor: self.factor,
            max: self.max_interval,
        }
    }
}

/// Recommendation service configuration, built once and passed by reference
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL without a trailing slash
    pub base_url: String,
    pub api_key: Option<String>,
    /// Per-call timeout
    pub timeout: Duration,
    pub max_concurrency: usize,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub poll: PollConfig,
}

impl Config {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stackscout.dev";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_CACHE_CAPACITY: usize = 256;

    /// Validate the base URL and fill in the default tunables
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ScoutError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| {
            ScoutError::Configuration(format!("Invalid API URL '{base_url}': {e}"))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoutError::Configuration(format!(
                "API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
            poll: PollConfig::default(),
        })
    }

    /// Load configuration from the global CLI flags (which fall back to
    /// `STACKSCOUT_*` environment variables)
    pub fn from_global(global: &crate::Global) -> Result<Self, ScoutError> {
        let config = Self::new(&global.api_url, global.api_key.clone())?;
        config.with_timeout(global.timeout)
    }

    pub fn with_timeout(mut self, seconds: u64) -> Result<Self, ScoutError> {
        if seconds == 0 {
            return Err(ScoutError::Configuration(
                "Timeout must be at least one second".to_string(),
            ));
        }
        self.timeout = Duration::from_secs(seconds);
        Ok(self)
    }

    /// Without a credential every recommendation runs in demo mode
    pub fn demo_only(&self) -> bool {
        self.api_key.is_none()
    }

    /// Absolute URL for a service path; absolute URLs pass through untouched
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}
