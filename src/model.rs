use chrono::NaiveDateTime;
use std::fmt;

/// One observation value. Most products carry a single scalar; wind carries
/// speed, direction and gust.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Scalar(f64),
    Wind { speed: f64, direction: f64, gust: f64 },
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Wind { .. } => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{}", v),
            Value::Wind {
                speed,
                direction,
                gust,
            } => write!(f, "{} {} {}", speed, direction, gust),
        }
    }
}

/// A time series as emitted by the source, in source order.
///
/// Timestamps are UTC with minute resolution. Both sequences always have the
/// same length; the only way to grow the series is [`TimeSeries::push`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<Value>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp: NaiveDateTime, value: Value) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDateTime, &Value)> {
        self.timestamps.iter().zip(self.values.iter())
    }

    /// Mean of the scalar values; NaN when the series holds no scalars.
    pub fn mean(&self) -> f64 {
        let (sum, n) = self
            .values
            .iter()
            .filter_map(Value::as_scalar)
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 { f64::NAN } else { sum / n as f64 }
    }
}

impl FromIterator<(NaiveDateTime, Value)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDateTime, Value)>>(iter: I) -> Self {
        let mut series = TimeSeries::new();
        for (t, v) in iter {
            series.push(t, v);
        }
        series
    }
}

/// A 7-digit NOS station identifier. `0000000` is not a valid id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StationId(String);

impl StationId {
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == 7 && s.bytes().all(|b| b.is_ascii_digit()) && s != "0000000";
        valid.then(|| StationId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic description of a station. Only built through
/// [`StationInfo::new`], so the longitude is always normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct StationInfo {
    station_id: Option<StationId>,
    name: String,
    state: String,
    longitude: f64,
    latitude: f64,
}

impl StationInfo {
    /// Builds station info, normalizing the longitude.
    pub fn new(
        station_id: Option<StationId>,
        name: impl Into<String>,
        state: impl Into<String>,
        longitude: f64,
        latitude: f64,
    ) -> Self {
        Self {
            station_id,
            name: name.into(),
            state: state.into(),
            longitude: normalize_longitude(longitude),
            latitude,
        }
    }

    pub fn station_id(&self) -> Option<&StationId> {
        self.station_id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Always <= 0 (west-negative).
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

/// Maps east-positive longitudes into the west-negative range used downstream.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 0.0 { lon - 360.0 } else { lon }
}

/// One row of the active-station directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStation {
    pub nos_id: u32,
    pub nws_id: String,
    pub lat: f64,
    pub lon: f64,
}

/// Table of currently active stations, stored column-wise.
///
/// Rows are only ever appended whole, so every column has the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveStations {
    pub nos_id: Vec<u32>,
    pub nws_id: Vec<String>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl ActiveStations {
    pub fn push(&mut self, row: ActiveStation) {
        self.nos_id.push(row.nos_id);
        self.nws_id.push(row.nws_id);
        self.lat.push(row.lat);
        self.lon.push(row.lon);
    }

    pub fn len(&self) -> usize {
        self.nos_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nos_id.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = ActiveStation> + '_ {
        (0..self.len()).map(|i| ActiveStation {
            nos_id: self.nos_id[i],
            nws_id: self.nws_id[i].clone(),
            lat: self.lat[i],
            lon: self.lon[i],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn longitude_normalization() {
        assert_eq!(normalize_longitude(10.0), -350.0);
        assert_eq!(normalize_longitude(359.5), -0.5);
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(-74.01), -74.01);
    }

    #[test]
    fn station_info_normalizes_on_construction() {
        let info = StationInfo::new(None, "Adak", "AK", 183.4, 51.86);
        assert!(info.longitude() <= 0.0);
        assert!((info.longitude() - (183.4 - 360.0)).abs() < 1e-9);
    }

    #[test]
    fn station_id_validation() {
        assert!(StationId::parse("8518750").is_some());
        assert!(StationId::parse("0000000").is_none());
        assert!(StationId::parse("851875").is_none());
        assert!(StationId::parse("85187500").is_none());
        assert!(StationId::parse("85a8750").is_none());
    }

    #[test]
    fn mean_of_scalars() {
        let series: TimeSeries = vec![
            (at(0, 0), Value::Scalar(1.0)),
            (at(0, 6), Value::Scalar(2.0)),
            (at(0, 12), Value::Scalar(3.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(series.len(), 3);
        assert_eq!(series.mean(), 2.0);
        assert!(TimeSeries::new().mean().is_nan());
    }

    #[test]
    fn wind_display() {
        let v = Value::Wind {
            speed: 3.5,
            direction: 270.0,
            gust: 6.25,
        };
        assert_eq!(v.to_string(), "3.5 270 6.25");
        assert_eq!(v.as_scalar(), None);
    }

    #[test]
    fn active_station_rows() {
        let mut table = ActiveStations::default();
        table.push(ActiveStation {
            nos_id: 8518750,
            nws_id: "BATN6".into(),
            lat: 40.7,
            lon: -74.01,
        });
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nws_id, "BATN6");
    }
}
