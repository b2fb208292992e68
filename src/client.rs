use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, load_config};
use crate::directory::parse_active_stations;
use crate::fetch::{Fetcher, RetryPolicy};
use crate::log::{Logger, StdoutLogger};
use crate::model::{ActiveStations, StationInfo, TimeSeries};
use crate::product::{Product, parse_lines};
use crate::query::{DataQuery, Units};
use crate::report::StationSource;
use crate::station::{metadata_url, parse_station_json};
use crate::transfer::{self, Transfer};

/// Entry point for CO-OPS data, station metadata and the active-station list.
pub struct Client {
    config: ClientConfig,
    logger: Arc<dyn Logger>,
    fetcher: Fetcher,
}

impl Client {
    /// Creates a client from `COOPS_*` environment variables and/or
    /// `.coopsrc`, falling back to the public NOAA endpoints.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(load_config()?))
    }

    pub fn new(config: ClientConfig) -> Self {
        let logger: Arc<dyn Logger> = Arc::new(StdoutLogger);
        let fetcher = Fetcher::new()
            .with_tmp_dir(config.tmp_dir.clone())
            .with_retry(config.retry)
            .with_verify(config.verify)
            .with_logger(Arc::clone(&logger));
        Self {
            config,
            logger,
            fetcher,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.fetcher = self.fetcher.with_logger(Arc::clone(&logger));
        self.logger = logger;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.fetcher = self.fetcher.with_verbose(verbose);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = self.fetcher.with_timeout(timeout);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self.fetcher = self.fetcher.with_retry(retry);
        self
    }

    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.fetcher = self.fetcher.with_sleep(sleep);
        self
    }

    /// Routes every request through `transfer` regardless of scheme.
    pub fn with_transfer(mut self, transfer: Arc<dyn Transfer>) -> Self {
        self.fetcher = self.fetcher.with_transfer(transfer);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Downloads and decodes one time series.
    ///
    /// Transport failures are retried and, if they persist, logged; the
    /// result is then empty rather than an error.
    pub fn get_data(&self, query: &DataQuery) -> TimeSeries {
        let url = query.url(&self.config.data_url);
        self.logger.info(&format!("Downloading {}", url));
        let lines = self.fetcher.read_lines_relaxed(&url);
        parse_lines(&query.product, lines)
    }

    /// Like [`Client::get_data`] with the product, datum and units given as
    /// service identifiers. Fails only when the product has no decoder.
    pub fn get_product(
        &self,
        station_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
        product_id: &str,
        datum: &str,
        units: &str,
    ) -> Result<TimeSeries> {
        let product = product_id.parse::<Product>().inspect_err(|e| {
            self.logger.error(&e.to_string());
        })?;
        let units: Units = units.parse().unwrap_or_default();
        let query = DataQuery::new(station_id, begin, end)
            .with_product(product)
            .with_datum(datum)
            .with_units(units);
        Ok(self.get_data(&query))
    }

    /// Looks up name, state and coordinates of a station. Failures are
    /// logged and yield `None`.
    pub fn get_station_info(&self, station_id: &str) -> Option<StationInfo> {
        let url = metadata_url(&self.config.metadata_url, station_id);
        let info = self
            .fetcher
            .read_lines(&url)
            .and_then(|lines| parse_station_json(&lines.join("\n"), station_id));
        match info {
            Ok(info) => Some(info),
            Err(err) => {
                self.logger
                    .error(&format!("Cannot get info for {}", station_id));
                tracing::debug!("station lookup failed: {:#}", err);
                None
            }
        }
    }

    /// Reads the active-station table from the configured directory page.
    pub fn get_active_stations(&self) -> Result<ActiveStations> {
        self.get_active_stations_from(&self.config.directory_url)
    }

    /// Reads the active-station table from a URL or a saved copy of the page.
    pub fn get_active_stations_from(&self, locator: &str) -> Result<ActiveStations> {
        let lines = self
            .fetcher
            .read_lines(locator)
            .with_context(|| format!("failed to read station list {}", locator))?;
        Ok(parse_active_stations(lines))
    }

    /// See [`transfer::download`].
    pub fn download(&self, remote: &str, local: &Path) {
        transfer::download(remote, local, self.fetcher.timeout(), self.logger.as_ref());
    }

    /// See [`transfer::refresh`].
    pub fn refresh(&self, remote: &str, local: &Path) {
        transfer::refresh(remote, local, self.fetcher.timeout(), self.logger.as_ref());
    }
}

impl StationSource for Client {
    fn active_stations(&self) -> Result<ActiveStations> {
        self.get_active_stations()
    }

    fn station_info(&self, nos_id: &str) -> Option<StationInfo> {
        self.get_station_info(nos_id)
    }

    fn water_levels(
        &self,
        nos_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeSeries> {
        self.get_product(nos_id, begin, end, "waterlevelrawsixmin", "MSL", "meters")
    }
}
