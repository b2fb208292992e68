use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::directory::DIRECTORY_URL;
use crate::fetch::RetryPolicy;
use crate::query::DATA_URL;
use crate::station::METADATA_URL;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base of the plain-text data service, ending with `/`.
    pub data_url: String,
    /// Base of the station metadata service, ending with `/`.
    pub metadata_url: String,
    /// Active-station page, or a path to a saved copy.
    pub directory_url: String,
    /// Whether to verify TLS certificates on endpoints other than the data
    /// service, which is always fetched with verification relaxed.
    pub verify: bool,
    pub tmp_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_url: DATA_URL.to_string(),
            metadata_url: METADATA_URL.to_string(),
            directory_url: DIRECTORY_URL.to_string(),
            verify: true,
            tmp_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    data_url: Option<String>,
    metadata_url: Option<String>,
    directory_url: Option<String>,
    verify: Option<bool>,
    tmp_dir: Option<String>,
    retry_max: Option<String>,
    retry_delay: Option<String>,
    backoff: Option<String>,
}

impl RcConfig {
    fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            data_url: var("COOPS_DATA_URL"),
            metadata_url: var("COOPS_METADATA_URL"),
            directory_url: var("COOPS_DIRECTORY_URL"),
            verify: var("COOPS_VERIFY").map(|v| v.trim() != "0"),
            tmp_dir: var("COOPS_TMPDIR"),
            retry_max: var("COOPS_RETRY_MAX"),
            retry_delay: var("COOPS_RETRY_DELAY"),
            backoff: var("COOPS_BACKOFF"),
        }
    }

    /// Fills unset fields from `other`.
    fn or(self, other: RcConfig) -> RcConfig {
        RcConfig {
            data_url: self.data_url.or(other.data_url),
            metadata_url: self.metadata_url.or(other.metadata_url),
            directory_url: self.directory_url.or(other.directory_url),
            verify: self.verify.or(other.verify),
            tmp_dir: self.tmp_dir.or(other.tmp_dir),
            retry_max: self.retry_max.or(other.retry_max),
            retry_delay: self.retry_delay.or(other.retry_delay),
            backoff: self.backoff.or(other.backoff),
        }
    }

    fn resolve(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();
        let mut retry = defaults.retry;
        if let Some(v) = self.retry_max {
            retry.max_attempts = v
                .trim()
                .parse()
                .with_context(|| format!("invalid retry_max '{}'", v))?;
        }
        if let Some(v) = self.retry_delay {
            let secs: f64 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid retry_delay '{}'", v))?;
            if !(secs.is_finite() && secs >= 0.0) {
                bail!("invalid retry_delay '{}'", v);
            }
            retry.delay = Duration::from_secs_f64(secs);
        }
        if let Some(v) = self.backoff {
            retry.backoff = v
                .trim()
                .parse()
                .with_context(|| format!("invalid backoff '{}'", v))?;
        }

        Ok(ClientConfig {
            data_url: self.data_url.unwrap_or(defaults.data_url),
            metadata_url: self.metadata_url.unwrap_or(defaults.metadata_url),
            directory_url: self.directory_url.unwrap_or(defaults.directory_url),
            verify: self.verify.unwrap_or(defaults.verify),
            tmp_dir: self.tmp_dir.map(PathBuf::from),
            retry,
        })
    }
}

/// Resolves configuration from (in order of precedence) the environment,
/// the first rc file found, and built-in defaults.
pub(crate) fn load_config() -> Result<ClientConfig> {
    let mut cfg = RcConfig::from_env();
    for rc_path in rc_candidates() {
        if rc_path.exists() {
            let file = read_rc(&rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            cfg = cfg.or(file);
            break;
        }
    }
    cfg.resolve()
}

/// Reads a single rc file over the built-in defaults.
pub fn load_config_file(path: &Path) -> Result<ClientConfig> {
    read_rc(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?
        .resolve()
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Only split on the first colon so URLs survive intact.
        if let Some((k, v)) = line.split_once(':') {
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                continue;
            }
            let v = v.to_string();
            match k.trim() {
                "data_url" => cfg.data_url = Some(v),
                "metadata_url" => cfg.metadata_url = Some(v),
                "directory_url" => cfg.directory_url = Some(v),
                "verify" => cfg.verify = Some(v != "0"),
                "tmp_dir" => cfg.tmp_dir = Some(v),
                "retry_max" => cfg.retry_max = Some(v),
                "retry_delay" => cfg.retry_delay = Some(v),
                "backoff" => cfg.backoff = Some(v),
                _ => {}
            }
        }
    }

    cfg
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) COOPS_RC (explicit)
    // 2) ./.coopsrc
    // 3) ~/.coopsrc
    if let Ok(p) = std::env::var("COOPS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".coopsrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".coopsrc"));
    }
    v
}
