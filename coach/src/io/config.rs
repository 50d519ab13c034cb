//! Coach configuration stored in `coach.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

/// Sequential generation calls in one Full attempt (gap analysis, then plan).
const GENERATION_CALLS_PER_ATTEMPT: u32 = 2;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "coach.toml";

/// Coach configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// service runs with in production.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoachConfig {
    /// Regenerations allowed after the first Full-branch attempt.
    pub max_retries: u32,

    pub llm: LlmConfig,

    pub server: ServerConfig,

    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    /// Environment variable holding the API key. Unset means no auth header.
    pub api_key_env: String,

    /// Per-call budget for generation requests, in seconds.
    pub generation_timeout_secs: u64,

    /// Per-call budget for verification requests, in seconds.
    pub verification_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

/// Operator alerts for internal faults and deadline expiries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertConfig {
    /// Discord-compatible webhook URL. Unset disables alerts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Budget for one webhook delivery, in seconds.
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

impl AlertConfig {
    /// Configured webhook URL, ignoring a blank value.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            api_key_env: "OPENAI_API_KEY".to_string(),
            generation_timeout_secs: 60,
            verification_timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.trim().is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl CoachConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    /// Overall deadline for one run: every allowed attempt may spend its full
    /// budgets (two generation calls for gap and plan, one verification call),
    /// and no more.
    pub fn run_deadline(&self) -> Duration {
        let per_attempt = self.llm.generation_timeout() * GENERATION_CALLS_PER_ATTEMPT
            + self.llm.verification_timeout();
        per_attempt * self.retry_policy().max_attempts()
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow!("llm.base_url must be non-empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("llm.temperature must be within 0.0..=2.0"));
        }
        if self.llm.generation_timeout_secs == 0 {
            return Err(anyhow!("llm.generation_timeout_secs must be > 0"));
        }
        if self.llm.verification_timeout_secs == 0 {
            return Err(anyhow!("llm.verification_timeout_secs must be > 0"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must be non-empty"));
        }
        if let Some(url) = self.alerts.webhook_url() {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(anyhow!("alerts.webhook_url must be an http(s) URL"));
            }
        }
        if self.alerts.timeout_secs == 0 {
            return Err(anyhow!("alerts.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CoachConfig::default()`.
pub fn load_config(path: &Path) -> Result<CoachConfig> {
    if !path.exists() {
        let cfg = CoachConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CoachConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CoachConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
