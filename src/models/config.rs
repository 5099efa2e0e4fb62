//! Application configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once at startup (see [`crate::config::load_config`]) and passed by
/// reference; nothing below the CLI reads the environment directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scrape API endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Tuning for the domain availability job
    #[serde(default = "JobConfig::domains")]
    pub domains: JobConfig,

    /// Tuning for the paper download job
    #[serde(default = "JobConfig::papers")]
    pub papers: JobConfig,

    /// User-Agent header for direct document downloads
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Config {
    /// Build configuration from a variable lookup.
    ///
    /// Empty values are treated as unset. Numeric values that fail to parse
    /// are configuration errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("FIRECRAWL_API_KEY").or_else(|| get("TEST_API_KEY"));
        let default_url = format!(
            "http://localhost:{}",
            get("PORT").unwrap_or_else(|| defaults::PORT.to_string())
        );
        let api_url = get("FIRECRAWL_API_URL")
            .unwrap_or(default_url)
            .trim_end_matches('/')
            .to_string();
        let scrape_path = get("FIRECRAWL_SCRAPE_PATH").unwrap_or_else(defaults::scrape_path);

        let domains = JobConfig::from_lookup("DOMAIN_CHECK", JobConfig::domains(), &get)?;
        let papers = JobConfig::from_lookup("PAPER_DL", JobConfig::papers(), &get)?;

        Ok(Self {
            api: ApiConfig {
                api_key,
                api_url,
                scrape_path,
            },
            domains,
            papers,
            user_agent: defaults::user_agent(),
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !self.api.api_url.starts_with("http://") && !self.api.api_url.starts_with("https://") {
            return Err(AppError::config(format!(
                "FIRECRAWL_API_URL must be an http(s) URL, got '{}'",
                self.api.api_url
            )));
        }
        if !self.api.scrape_path.starts_with('/') {
            return Err(AppError::config(format!(
                "FIRECRAWL_SCRAPE_PATH must start with '/', got '{}'",
                self.api.scrape_path
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(AppError::config("user_agent is empty"));
        }
        self.domains.validate("DOMAIN_CHECK")?;
        self.papers.validate("PAPER_DL")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            domains: JobConfig::domains(),
            papers: JobConfig::papers(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Scrape API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token; required by every job that talks to the API
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL without trailing slash
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Path of the scrape endpoint
    #[serde(default = "defaults::scrape_path")]
    pub scrape_path: String,
}

impl ApiConfig {
    /// Full scrape endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.api_url, self.scrape_path)
    }

    /// The API key, or a configuration error if none was provided.
    pub fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::config("Missing FIRECRAWL_API_KEY (or TEST_API_KEY)"))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: defaults::api_url(),
            scrape_path: defaults::scrape_path(),
        }
    }
}

/// Tuning knobs shared by every batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Maximum in-flight items
    pub concurrency: usize,
    /// Courtesy delay after each item, in milliseconds
    pub delay_ms: u64,
    /// How long the scrape backend waits for the page to settle
    pub waitfor_ms: u64,
    /// Scrape timeout forwarded to the backend
    pub timeout_ms: u64,
    /// Retries after the first failed attempt
    pub retries: u32,
    /// Checkpoint every N completed items
    pub batch_size: usize,
}

impl JobConfig {
    /// Defaults for the domain availability job.
    pub fn domains() -> Self {
        Self {
            concurrency: 8,
            delay_ms: 150,
            waitfor_ms: 5_000,
            timeout_ms: 60_000,
            retries: 2,
            batch_size: 20,
        }
    }

    /// Defaults for the paper download job.
    pub fn papers() -> Self {
        Self {
            concurrency: 2,
            delay_ms: 250,
            waitfor_ms: 5_000,
            timeout_ms: 90_000,
            retries: 2,
            batch_size: 5,
        }
    }

    fn from_lookup<F>(prefix: &str, defaults: Self, get: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let concurrency: usize = parse_var(prefix, "CONCURRENCY", defaults.concurrency, get)?;
        let delay_ms: u64 = parse_var(prefix, "DELAY_MS", defaults.delay_ms, get)?;
        let waitfor_ms: u64 = parse_var(prefix, "WAITFOR_MS", defaults.waitfor_ms, get)?;
        let timeout_ms: u64 = parse_var(prefix, "TIMEOUT_MS", defaults.timeout_ms, get)?;
        let retries: u32 = parse_var(prefix, "RETRIES", defaults.retries, get)?;
        let batch_size: usize = parse_var(prefix, "BATCH_SIZE", defaults.batch_size, get)?;

        Ok(Self {
            concurrency: concurrency.max(1),
            delay_ms,
            waitfor_ms,
            timeout_ms: timeout_ms.max(1_000),
            retries,
            batch_size: batch_size.max(1),
        })
    }

    fn validate(&self, prefix: &str) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AppError::config(format!("{prefix}_CONCURRENCY must be > 0")));
        }
        if self.batch_size == 0 {
            return Err(AppError::config(format!("{prefix}_BATCH_SIZE must be > 0")));
        }
        if self.timeout_ms < 1_000 {
            return Err(AppError::config(format!(
                "{prefix}_TIMEOUT_MS must be >= 1000"
            )));
        }
        Ok(())
    }

    /// Courtesy delay applied after each item.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Timeout in whole seconds, as the backend sees it.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_ms / 1_000
    }
}

fn parse_var<T, F>(prefix: &str, name: &str, default: T, get: &F) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{prefix}_{name}");
    match get(&key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{key} must be a non-negative integer, got '{raw}'"))),
    }
}

mod defaults {
    pub const PORT: u16 = 3002;

    pub fn api_url() -> String {
        format!("http://localhost:{PORT}")
    }
    pub fn scrape_path() -> String {
        "/v1/scrape".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) firebatch/0.1".into()
    }
}
