// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::aggregate::{DEFAULT_RECENT_N, DEFAULT_TOP_N};
use crate::ingest::types::RetrievalKey;
use crate::notify::ReportContext;

pub const ENV_CONFIG_PATH: &str = "MENTIONS_CONFIG_PATH";
pub const ENV_FEED_URL: &str = "MENTIONS_FEED_URL";
pub const DEFAULT_CONFIG_PATH: &str = "config/mentions.toml";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

fn default_report_label() -> String {
    "Mentions".to_string()
}
fn default_report_file_stem() -> String {
    "mentions_filtered".to_string()
}
fn default_top_n() -> usize {
    DEFAULT_TOP_N
}
fn default_recent_n() -> usize {
    DEFAULT_RECENT_N
}
fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Delimited-text export URL of the mentions feed; also the cache key.
    #[serde(default)]
    pub feed_url: String,
    #[serde(default = "default_report_label")]
    pub report_label: String,
    #[serde(default = "default_report_file_stem")]
    pub report_file_stem: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_recent_n")]
    pub recent_n: usize,
    /// Whole-request timeout for feed downloads.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            report_label: default_report_label(),
            report_file_stem: default_report_file_stem(),
            top_n: default_top_n(),
            recent_n: default_recent_n(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Parse TOML and sanitize.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing mentions config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading mentions config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration:
    /// 1) $MENTIONS_CONFIG_PATH (must exist)
    /// 2) config/mentions.toml
    /// 3) built-in defaults
    ///
    /// then $MENTIONS_FEED_URL overrides `feed_url`.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };

        if let Ok(url) = env::var(ENV_FEED_URL) {
            if !url.trim().is_empty() {
                cfg.feed_url = url.trim().to_string();
            }
        }
        Ok(cfg)
    }

    fn sanitized(mut self) -> Self {
        self.feed_url = self.feed_url.trim().to_string();
        if self.top_n == 0 {
            self.top_n = DEFAULT_TOP_N;
        }
        if self.recent_n == 0 {
            self.recent_n = DEFAULT_RECENT_N;
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = DEFAULT_FETCH_TIMEOUT_SECS;
        }
        if self.report_label.trim().is_empty() {
            self.report_label = default_report_label();
        }
        if self.report_file_stem.trim().is_empty() {
            self.report_file_stem = default_report_file_stem();
        }
        self
    }

    pub fn retrieval_key(&self) -> RetrievalKey {
        RetrievalKey::new(self.feed_url.clone())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn report_context(&self) -> ReportContext {
        ReportContext {
            label: self.report_label.clone(),
            file_stem: self.report_file_stem.clone(),
        }
    }
}
