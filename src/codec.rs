//! Local flat-file formats.
//!
//! Series files imitate the remote water-level layout closely enough that the
//! same fixed-column decoder reads them back: 13 blank columns, the timestamp,
//! one space, then the value.

use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::fetch::read_lossy;
use crate::model::{StationInfo, TimeSeries};
use crate::product::{CACHE_FILE, parse_with};
use crate::station::nos_id;

pub fn write_series(series: &TimeSeries, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (t, v) in series.iter() {
        writeln!(out, "{:13}{} {}", "", t.format("%Y-%m-%d %H:%M"), v)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads a series written by [`write_series`]. Lines that do not decode are
/// skipped.
pub fn read_series(path: &Path) -> Result<TimeSeries> {
    let lines = read_lossy(path)?;
    Ok(parse_with(&CACHE_FILE, lines))
}

/// Writes name, state, longitude and latitude, one per line. The station id
/// is carried by the file name, not the contents.
pub fn write_station_info(info: &StationInfo, path: &Path) -> Result<()> {
    let text = format!(
        "{}\n{}\n{}\n{}\n",
        info.name(),
        info.state(),
        info.longitude(),
        info.latitude()
    );
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_station_info(path: &Path) -> Result<StationInfo> {
    let lines = read_lossy(path)?;
    if lines.len() < 4 {
        return Err(anyhow!(
            "{}: expected 4 lines, found {}",
            path.display(),
            lines.len()
        ));
    }
    let lon: f64 = lines[2]
        .trim()
        .parse()
        .with_context(|| format!("{}: bad longitude '{}'", path.display(), lines[2]))?;
    let lat: f64 = lines[3]
        .trim()
        .parse()
        .with_context(|| format!("{}: bad latitude '{}'", path.display(), lines[3]))?;

    let station_id = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(nos_id);

    Ok(StationInfo::new(
        station_id,
        lines[0].trim_end(),
        lines[1].trim_end(),
        lon,
        lat,
    ))
}
