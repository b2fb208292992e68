use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::log::{Logger, StdoutLogger};
use crate::transfer::{Transfer, transfer_for};
use crate::util::retry_delay;

/// How often and how patiently to retry a failing download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Multiplier applied to the delay after each failure; 1 keeps it constant.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    /// The CO-OPS data service has long but recoverable outages.
    fn default() -> Self {
        Self {
            max_attempts: 100,
            delay: Duration::from_secs(10),
            backoff: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: 1.0,
        }
    }

    /// Runs `op` until it succeeds or `max_attempts` is reached, calling
    /// `sleep` between attempts. `op` receives the 1-based attempt number.
    pub fn run<T, F, S>(&self, mut sleep: S, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
        S: FnMut(Duration),
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= max {
                        return Err(err)
                            .with_context(|| format!("giving up after {} attempt(s)", attempt));
                    }
                    sleep(retry_delay(self.delay, self.backoff, attempt));
                    attempt += 1;
                }
            }
        }
    }
}

/// Downloads resources into private temporary files and returns their lines.
pub struct Fetcher {
    tmp_dir: Option<PathBuf>,
    retry: RetryPolicy,
    timeout: Duration,
    verbose: bool,
    verify: bool,
    logger: Arc<dyn Logger>,
    transfer: Option<Arc<dyn Transfer>>,
    sleep: fn(Duration),
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            tmp_dir: None,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
            verbose: false,
            verify: true,
            logger: Arc::new(StdoutLogger),
            transfer: None,
            sleep: thread::sleep,
        }
    }

    pub fn with_tmp_dir(mut self, tmp_dir: Option<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Certificate verification for [`Fetcher::read_lines`]. The relaxed
    /// reader never verifies.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Uses `transfer` for every locator instead of choosing by scheme.
    pub fn with_transfer(mut self, transfer: Arc<dyn Transfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Temporary file path for one download: `tmp_file`, or a fresh
    /// `<uuid>.tmp`, inside the configured temp directory if any.
    pub fn temp_path(&self, tmp_file: Option<&str>) -> PathBuf {
        let name = match tmp_file {
            Some(name) => name.to_string(),
            None => format!("{}.tmp", uuid::Uuid::new_v4()),
        };
        match &self.tmp_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Downloads with TLS verification relaxed and retries per policy.
    ///
    /// Never fails: when every attempt fails the error is logged and whatever
    /// landed in the temporary file (usually nothing) is returned.
    pub fn read_lines_relaxed(&self, locator: &str) -> Vec<String> {
        self.read_lines_relaxed_as(locator, None)
    }

    pub fn read_lines_relaxed_as(&self, locator: &str, tmp_file: Option<&str>) -> Vec<String> {
        let tmp = self.temp_path(tmp_file);
        self.announce(locator, &tmp);

        let fetched = self.resolve(locator, false).and_then(|transfer| {
            self.retry
                .run(self.sleep, |_| transfer.fetch(locator, &tmp))
        });
        if let Err(err) = fetched {
            self.logger.error(&format!("Cannot download {}", locator));
            tracing::debug!("download of {} failed: {:#}", locator, err);
        }

        let lines = read_lossy(&tmp).unwrap_or_default();
        remove_quietly(&tmp);
        lines
    }

    /// Single attempt with certificate verification; errors propagate.
    pub fn read_lines(&self, locator: &str) -> Result<Vec<String>> {
        self.read_lines_as(locator, None)
    }

    pub fn read_lines_as(&self, locator: &str, tmp_file: Option<&str>) -> Result<Vec<String>> {
        let tmp = self.temp_path(tmp_file);
        self.announce(locator, &tmp);

        let result = self
            .resolve(locator, self.verify)
            .and_then(|transfer| transfer.fetch(locator, &tmp))
            .and_then(|_| read_lossy(&tmp));
        remove_quietly(&tmp);
        result
    }

    fn announce(&self, locator: &str, tmp: &Path) {
        if self.verbose {
            self.logger.info(&format!(
                "downloading {} as temporary {}",
                locator,
                tmp.display()
            ));
        }
    }

    fn resolve(&self, locator: &str, verify: bool) -> Result<Arc<dyn Transfer>> {
        match &self.transfer {
            Some(t) => Ok(Arc::clone(t)),
            None => Ok(Arc::from(transfer_for(locator, self.timeout, verify)?)),
        }
    }
}

pub(crate) fn read_lossy(path: &Path) -> Result<Vec<String>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

fn remove_quietly(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("could not remove {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{Level, MemoryLogger};
    use anyhow::bail;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fails a fixed number of times, then writes `body`.
    struct Flaky {
        failures: u32,
        calls: Mutex<u32>,
        body: &'static [u8],
    }

    impl Flaky {
        fn new(failures: u32, body: &'static [u8]) -> Self {
            Self {
                failures,
                calls: Mutex::new(0),
                body,
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl Transfer for Flaky {
        fn fetch(&self, _locator: &str, dest: &Path) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                bail!("connection reset");
            }
            std::fs::write(dest, self.body)?;
            Ok(())
        }
    }

    fn no_sleep(_: Duration) {}

    fn fetcher(dir: &TempDir, flaky: Arc<Flaky>, log: Arc<MemoryLogger>, max: u32) -> Fetcher {
        Fetcher::new()
            .with_tmp_dir(Some(dir.path().to_path_buf()))
            .with_retry(RetryPolicy {
                max_attempts: max,
                delay: Duration::from_secs(10),
                backoff: 1.0,
            })
            .with_logger(log)
            .with_transfer(flaky)
            .with_sleep(no_sleep)
    }

    fn dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[test]
    fn run_sleeps_per_backoff_formula() {
        let policy = RetryPolicy {
            max_attempts: 4,
            delay: Duration::from_secs(1),
            backoff: 2.0,
        };
        let mut slept = Vec::new();
        let result: Result<()> = policy.run(|d| slept.push(d), |_| bail!("down"));
        assert!(result.is_err());
        assert_eq!(
            slept,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[test]
    fn long_run_with_growing_backoff_gives_up() {
        let policy = RetryPolicy {
            max_attempts: 100,
            delay: Duration::from_secs(10),
            backoff: 2.0,
        };
        let mut calls = 0;
        let mut slept = Vec::new();
        let result: Result<()> = policy.run(
            |d| slept.push(d),
            |_| {
                calls += 1;
                bail!("down")
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, 100);
        assert_eq!(slept.len(), 99);
        assert_eq!(slept[98], Duration::MAX);
        assert!(slept.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn run_returns_first_success() {
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(5),
            backoff: 1.0,
        };
        let mut slept = Vec::new();
        let got = policy
            .run(|d| slept.push(d), |attempt| {
                if attempt < 3 { bail!("down") } else { Ok(attempt) }
            })
            .unwrap();
        assert_eq!(got, 3);
        assert_eq!(slept.len(), 2);
    }

    #[test]
    fn default_policy_is_patient() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 100);
        assert_eq!(p.delay, Duration::from_secs(10));
        assert_eq!(p.backoff, 1.0);
    }

    #[test]
    fn relaxed_read_recovers_after_failures() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(Flaky::new(2, b"line one\nline two\n"));
        let log = Arc::new(MemoryLogger::new());
        let f = fetcher(&dir, flaky.clone(), log.clone(), 3);

        let lines = f.read_lines_relaxed("https://example.invalid/data");
        assert_eq!(lines, vec!["line one", "line two"]);
        assert_eq!(flaky.calls(), 3);
        assert!(log.messages(Level::Error).is_empty());
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn relaxed_read_exhausts_without_raising() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(Flaky::new(10, b"never"));
        let log = Arc::new(MemoryLogger::new());
        let f = fetcher(&dir, flaky.clone(), log.clone(), 4);

        let lines = f.read_lines_relaxed("https://example.invalid/data");
        assert!(lines.is_empty());
        assert_eq!(flaky.calls(), 4);
        assert_eq!(
            log.messages(Level::Error),
            vec!["Cannot download https://example.invalid/data"]
        );
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn undecodable_bytes_are_replaced() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(Flaky::new(0, b"ok\n\xff\xfebad\n"));
        let log = Arc::new(MemoryLogger::new());
        let f = fetcher(&dir, flaky, log, 1);

        let lines = f.read_lines_relaxed("x");
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("bad"));
        assert!(lines[1].contains('\u{FFFD}'));
    }

    #[test]
    fn strict_read_does_not_retry() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(Flaky::new(1, b"data"));
        let log = Arc::new(MemoryLogger::new());
        let f = fetcher(&dir, flaky.clone(), log, 100);

        assert!(f.read_lines("https://example.invalid/x").is_err());
        assert_eq!(flaky.calls(), 1);
        assert!(dir_is_empty(&dir));
        assert_eq!(f.read_lines("https://example.invalid/x").unwrap(), vec!["data"]);
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn temp_names_are_unique_unless_given() {
        let f = Fetcher::new().with_tmp_dir(Some(PathBuf::from("/scratch")));
        let a = f.temp_path(None);
        let b = f.temp_path(None);
        assert_ne!(a, b);
        assert!(a.starts_with("/scratch"));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("tmp"));
        assert_eq!(f.temp_path(Some("fixed.tmp")), PathBuf::from("/scratch/fixed.tmp"));
    }

    #[test]
    fn verbose_announces_temp_file() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(Flaky::new(0, b"x"));
        let log = Arc::new(MemoryLogger::new());
        let f = fetcher(&dir, flaky, log.clone(), 1).with_verbose(true);
        f.read_lines_relaxed_as("loc", Some("named.tmp"));
        let info = log.messages(Level::Info);
        assert_eq!(info.len(), 1);
        assert!(info[0].starts_with("downloading loc as temporary"));
        assert!(info[0].ends_with("named.tmp"));
    }
}
