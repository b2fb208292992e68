use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::log::Logger;
use crate::util::is_remote;

/// Moves the resource named by `locator` into `dest`.
pub trait Transfer: Send + Sync {
    fn fetch(&self, locator: &str, dest: &Path) -> Result<()>;
}

/// HTTP(S) GET into a local file.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    http: HttpClient,
}

impl HttpTransfer {
    /// Verifies TLS certificates.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::build(timeout, true)
    }

    /// Accepts invalid or expired certificates. Only meant for the CO-OPS
    /// data endpoint, whose certificate is known to lapse.
    pub fn relaxed(timeout: Duration) -> Result<Self> {
        Self::build(timeout, false)
    }

    fn build(timeout: Duration, verify: bool) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("coops-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("coops-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout);

        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transfer for HttpTransfer {
    fn fetch(&self, locator: &str, dest: &Path) -> Result<()> {
        let mut resp = self
            .http
            .get(locator)
            .send()
            .with_context(|| format!("request to {} failed", locator))?
            .error_for_status()
            .with_context(|| format!("request to {} failed", locator))?;

        let mut out =
            File::create(dest).with_context(|| format!("failed to open {}", dest.display()))?;
        resp.copy_to(&mut out)
            .with_context(|| format!("download of {} interrupted", locator))?;
        Ok(())
    }
}

/// Copies a file from the local filesystem. Accepts plain paths and
/// `file://` locators.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCopy;

impl Transfer for LocalCopy {
    fn fetch(&self, locator: &str, dest: &Path) -> Result<()> {
        let src = locator.strip_prefix("file://").unwrap_or(locator);
        std::fs::copy(src, dest)
            .with_context(|| format!("failed to copy {} to {}", src, dest.display()))?;
        Ok(())
    }
}

/// Picks the transfer for a locator by scheme.
pub fn transfer_for(locator: &str, timeout: Duration, verify: bool) -> Result<Box<dyn Transfer>> {
    if is_remote(locator) {
        let http = if verify {
            HttpTransfer::new(timeout)?
        } else {
            HttpTransfer::relaxed(timeout)?
        };
        Ok(Box::new(http))
    } else {
        Ok(Box::new(LocalCopy))
    }
}

/// Fetches `remote` into `local` unless `local` already exists. `timeout`
/// bounds an HTTP transfer.
pub fn download(remote: &str, local: &Path, timeout: Duration, logger: &dyn Logger) {
    if local.exists() {
        logger.warn(&format!("file {} exists, skipping.", local.display()));
        return;
    }
    logger.info(&format!("Downloading {} as {}", remote, local.display()));
    fetch_with_fallback(remote, local, timeout, logger);
}

/// Fetches `remote` into `local`, overwriting any existing copy.
pub fn refresh(remote: &str, local: &Path, timeout: Duration, logger: &dyn Logger) {
    if local.exists() {
        logger.info(&format!("overwriting {} file with {}", local.display(), remote));
    } else {
        logger.info(&format!("downloading {} as {}", remote, local.display()));
    }
    fetch_with_fallback(remote, local, timeout, logger);
}

fn fetch_with_fallback(remote: &str, local: &Path, timeout: Duration, logger: &dyn Logger) {
    let primary = transfer_for(remote, timeout, true)
        .and_then(|t| t.fetch(remote, local));
    if primary.is_ok() {
        return;
    }
    logger.warn(&format!(
        "file {} was not downloaded. trying to cp...",
        remote
    ));
    if LocalCopy.fetch(remote, local).is_err() {
        logger.warn(&format!("file {} could not be copied", remote));
    }
}

/// Removes every file in `dir` whose name ends with `ext`. Returns how many
/// were removed.
pub fn cleanup(dir: &Path, ext: &str) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
    {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(ext));
        if matches && path.is_file() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}
