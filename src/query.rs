use chrono::NaiveDateTime;
use std::str::FromStr;

use crate::product::Product;
use crate::util::append_query;

pub const DATA_URL: &str = "https://opendap.co-ops.nos.noaa.gov/axis/webservices/";

/// Measurement units understood by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Meters,
    MetersPerSec,
    Feet,
    Knots,
    MilesPerHour,
}

impl Units {
    /// Service unit code: 0 metric, 1 feet/knots, 2 miles per hour.
    pub fn code(&self) -> u8 {
        match self {
            Units::Meters | Units::MetersPerSec => 0,
            Units::Feet | Units::Knots => 1,
            Units::MilesPerHour => 2,
        }
    }
}

impl FromStr for Units {
    type Err = std::convert::Infallible;

    /// Unrecognized names fall back to feet, which shares code 1 with knots.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "meters" => Units::Meters,
            "m/sec" => Units::MetersPerSec,
            "knots" => Units::Knots,
            "miles/hour" => Units::MilesPerHour,
            _ => Units::Feet,
        })
    }
}

/// One request for a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    pub station_id: String,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
    pub product: Product,
    /// `MSL`, `NAVD`, `IGLD`, `MTL`, `MHW`, `MHHW`, `MLLW`, `MLW`, ...
    pub datum: String,
    pub units: Units,
    /// Minutes between tide predictions; only sent for predictions.
    pub tide_interval: u32,
}

impl DataQuery {
    pub fn new(station_id: impl Into<String>, begin: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            station_id: station_id.into(),
            begin,
            end,
            product: Product::default(),
            datum: "MSL".to_string(),
            units: Units::Meters,
            tide_interval: 6,
        }
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.product = product;
        self
    }

    pub fn with_datum(mut self, datum: impl Into<String>) -> Self {
        self.datum = datum.into();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_tide_interval(mut self, minutes: u32) -> Self {
        self.tide_interval = minutes;
        self
    }

    /// Request URL under `base` (which ends with `/`).
    pub fn url(&self, base: &str) -> String {
        let begin = format_date(&self.begin);
        let end = format_date(&self.end);
        let unit = self.units.code().to_string();
        let interval = self.tide_interval.to_string();

        let mut params = vec![
            ("stationId", self.station_id.as_str()),
            ("beginDate", begin.as_str()),
            ("endDate", end.as_str()),
            ("datum", self.datum.as_str()),
            ("unit", unit.as_str()),
            ("timeZone", "0"),
        ];
        if self.product == Product::Predictions {
            params.push(("dataInterval", interval.as_str()));
        }
        params.push(("Submit", "Submit"));

        let path = format!("{}{}/plain/response.jsp", base, self.product.id());
        append_query(&path, &params)
    }
}

fn format_date(t: &NaiveDateTime) -> String {
    format!("{}%20{}", t.format("%Y%m%d"), t.format("%H:%M"))
}
