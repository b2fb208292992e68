//! Active-station listing scraped from the CO-OPS NWS products page.

use crate::model::{ActiveStation, ActiveStations};

pub const DIRECTORY_URL: &str = "https://access.co-ops.nos.noaa.gov/nwsproducts.html?type=current";

/// Everything from the line carrying this marker onward is the historical
/// table.
pub const HISTORICAL_MARKER: &str = "HistNWSTable";

/// Rows of the current table start with exactly this, indentation included.
pub const ROW_PREFIX: &str = "      <tr><td>";

/// Extracts `(nos id, nws id, lat, lon)` rows from the current-stations table.
pub fn parse_active_stations<I, S>(lines: I) -> ActiveStations
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = ActiveStations::default();
    for line in lines {
        let line = line.as_ref();
        if line.contains(HISTORICAL_MARKER) {
            break;
        }
        if let Some(row) = parse_row(line) {
            table.push(row);
        }
    }
    table
}

/// Parses one table row. Any field failing rejects the whole row.
pub fn parse_row(line: &str) -> Option<ActiveStation> {
    let cells = line.strip_prefix(ROW_PREFIX)?;
    let cells = cells.replace("</td><td>", ",");
    let cells = cells.trim_end();
    let cells = cells.strip_suffix("</tr>").unwrap_or(cells);
    let cells = cells.strip_suffix("</td>").unwrap_or(cells);

    let mut fields = cells.split(',');
    let nos_id = fields.next()?.trim().parse().ok()?;
    let nws_id = fields.next()?.trim().to_string();
    let lat = fields.next()?.trim().parse().ok()?;
    let lon = fields.next()?.trim().parse().ok()?;

    Some(ActiveStation {
        nos_id,
        nws_id,
        lat,
        lon,
    })
}
