//! Water-level anomaly table across all active stations.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::log::Logger;
use crate::model::{ActiveStations, StationInfo, TimeSeries};
use crate::util::date_to_stamp;

/// Six-minute samples per day.
const SAMPLES_PER_DAY: f64 = 240.0;

/// Data needed to build the report.
pub trait StationSource {
    fn active_stations(&self) -> Result<ActiveStations>;
    fn station_info(&self, nos_id: &str) -> Option<StationInfo>;
    /// Six-minute water levels relative to MSL, in meters.
    fn water_levels(
        &self,
        nos_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeSeries>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub stations: usize,
    pub written: usize,
    pub failed: usize,
}

pub struct AnomalyReport<'a, S: StationSource> {
    source: &'a S,
    logger: Arc<dyn Logger>,
    progress: bool,
}

impl<'a, S: StationSource> AnomalyReport<'a, S> {
    pub fn new(source: &'a S, logger: Arc<dyn Logger>) -> Self {
        Self {
            source,
            logger,
            progress: false,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Writes one row per station with a defined mean bias to `path`.
    ///
    /// A station that cannot be read is logged and skipped. When the station
    /// list itself is unavailable the failure is logged and the file keeps
    /// only its header. Only problems with the output file are returned as
    /// errors.
    pub fn write(
        &self,
        path: &Path,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<ReportSummary> {
        let started = Instant::now();

        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(
            out,
            "NOS-ID, NWS-ID, lon, lat, Bias MSL (meters), Length of record (days),{}--{}",
            date_to_stamp(&begin),
            date_to_stamp(&end)
        )?;

        let active = match self.source.active_stations() {
            Ok(active) => active,
            Err(err) => {
                self.logger.error("Cannot read the list of active stations");
                tracing::debug!("station list: {:#}", err);
                ActiveStations::default()
            }
        };
        let mut summary = ReportSummary {
            stations: active.len(),
            ..Default::default()
        };

        let pb = self.progress.then(|| {
            let pb = ProgressBar::new(active.len() as u64);
            let template = "{spinner:.green} {pos}/{len} {wide_bar} {msg}";
            if let Ok(style) = ProgressStyle::with_template(template) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        });

        for station in active.rows() {
            let nos_id = station.nos_id.to_string();
            if let Some(pb) = &pb {
                pb.set_message(nos_id.clone());
            }

            match self.row(&nos_id, &station.nws_id, begin, end) {
                Ok(Some(line)) => {
                    writeln!(out, "{}", line)?;
                    summary.written += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    self.logger.warn(&format!("Failed to read {}", nos_id));
                    tracing::debug!("station {}: {:#}", nos_id, err);
                    summary.failed += 1;
                }
            }

            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        out.flush()?;
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        self.logger.time(&format!(
            "Elapsed time: {} sec",
            started.elapsed().as_secs()
        ));
        Ok(summary)
    }

    /// `Ok(None)` when the station has no usable water levels.
    fn row(
        &self,
        nos_id: &str,
        nws_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Option<String>> {
        let info = self
            .source
            .station_info(nos_id)
            .with_context(|| format!("no station info for {}", nos_id))?;
        let levels = self.source.water_levels(nos_id, begin, end)?;

        let bias = levels.mean();
        if bias.is_nan() {
            return Ok(None);
        }
        let days = levels.len() as f64 / SAMPLES_PER_DAY;
        Ok(Some(format!(
            "{},{},{},{},{},{:?}",
            nos_id, nws_id, info.longitude(), info.latitude(), bias, days
        )))
    }
}
