use anyhow::{Result, anyhow};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::model::{StationId, StationInfo};

pub const METADATA_URL: &str = "https://api.tidesandcurrents.noaa.gov/mdapi/prod/webapi/stations/";

#[derive(Debug, serde::Deserialize)]
struct StationsReply {
    stations: Vec<StationRecord>,
}

#[derive(Debug, serde::Deserialize)]
struct StationRecord {
    name: String,
    #[serde(default)]
    state: Option<String>,
    lat: Value,
    lng: Value,
}

/// Metadata request URL for one station.
pub fn metadata_url(base: &str, station_id: &str) -> String {
    format!("{}{}.json?expand=details", base, station_id)
}

/// Builds [`StationInfo`] from a metadata service reply. Only the first
/// station in the reply is used.
pub fn parse_station_json(text: &str, station_id: &str) -> Result<StationInfo> {
    let reply: StationsReply = serde_json::from_str(text)?;
    let first = reply
        .stations
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("empty station list for {}", station_id))?;

    let lat = number(&first.lat).ok_or_else(|| anyhow!("bad latitude {}", first.lat))?;
    let lon = number(&first.lng).ok_or_else(|| anyhow!("bad longitude {}", first.lng))?;

    Ok(StationInfo::new(
        StationId::parse(station_id),
        first.name,
        first.state.unwrap_or_default(),
        lon,
        lat,
    ))
}

// The service has sent coordinates both as numbers and as strings.
fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts a 7-digit NOS id from free text such as a file name.
///
/// Takes the longest run of digits (the first one on ties); it counts only if
/// it is exactly seven digits long and not all zeros.
pub fn nos_id(text: &str) -> Option<StationId> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"));

    let mut longest: Option<&str> = None;
    for m in re.find_iter(text) {
        if longest.is_none_or(|l| m.as_str().len() > l.len()) {
            longest = Some(m.as_str());
        }
    }
    longest.and_then(StationId::parse)
}
