//! Line decoding for the plain-text CO-OPS product responses.
//!
//! Responses are fixed-column text with header and footer noise that shares
//! no reliable marker, so every line is decoded independently and the ones
//! that fail are dropped. Each product is described by a [`LineSpec`] and a
//! single decoder evaluates all of them.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use crate::error::{LineError, UnknownProduct};
use crate::model::{TimeSeries, Value};

pub const DEFAULT_PRODUCT: &str = "waterlevelrawsixmin";

/// Byte columns of a field, 0-indexed and end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Both ends must lie inside the line.
    Fixed(usize, usize),
    /// From `start` to the end of the line.
    ToEnd(usize),
    /// Like `Fixed`, but the end is clamped to the line length.
    Clamped(usize, usize),
}

impl Window {
    pub fn slice<'a>(&self, line: &'a str) -> Result<&'a str, LineError> {
        let len = line.len();
        let (start, end) = match *self {
            Window::Fixed(s, e) => (s, e),
            Window::ToEnd(s) => (s, len.max(s)),
            Window::Clamped(s, e) => (s, e.min(len).max(s)),
        };
        line.get(start..end)
            .ok_or(LineError::OutOfRange { start, end, len })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    /// Speed, direction, gust.
    Wind,
}

/// Where the timestamp and values sit in one response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpec {
    pub timestamp: Window,
    pub timestamp_format: &'static str,
    pub values: &'static [Window],
    pub shape: Shape,
}

const ISO_MINUTE: &str = "%Y-%m-%d %H:%M";

pub const WATER_LEVEL: LineSpec = LineSpec {
    timestamp: Window::Fixed(13, 29),
    timestamp_format: ISO_MINUTE,
    values: &[Window::Fixed(31, 38)],
    shape: Shape::Scalar,
};

pub const PREDICTIONS: LineSpec = LineSpec {
    timestamp: Window::Fixed(9, 25),
    timestamp_format: "%m/%d/%Y %H:%M",
    values: &[Window::ToEnd(26)],
    shape: Shape::Scalar,
};

pub const BAROMETRIC_PRESSURE: LineSpec = LineSpec {
    timestamp: Window::Fixed(13, 29),
    timestamp_format: ISO_MINUTE,
    values: &[Window::Fixed(30, 37)],
    shape: Shape::Scalar,
};

pub const WIND: LineSpec = LineSpec {
    timestamp: Window::Fixed(13, 29),
    timestamp_format: ISO_MINUTE,
    values: &[
        Window::Fixed(30, 37),
        Window::Fixed(38, 45),
        Window::Fixed(46, 53),
    ],
    shape: Shape::Wind,
};

/// Layout of locally cached series written by [`crate::codec::write_series`].
pub const CACHE_FILE: LineSpec = LineSpec {
    timestamp: Window::Fixed(13, 29),
    timestamp_format: ISO_MINUTE,
    values: &[Window::Clamped(30, 38)],
    shape: Shape::Scalar,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Product {
    /// Any of the `waterlevel*` products (raw/verified, one-minute through
    /// monthly). Keeps the exact identifier for the request.
    WaterLevel(String),
    Predictions,
    BarometricPressure,
    Wind,
}

impl Product {
    pub fn id(&self) -> &str {
        match self {
            Product::WaterLevel(id) => id,
            Product::Predictions => "predictions",
            Product::BarometricPressure => "barometricpressure",
            Product::Wind => "wind",
        }
    }

    pub fn line_spec(&self) -> &'static LineSpec {
        match self {
            Product::WaterLevel(_) => &WATER_LEVEL,
            Product::Predictions => &PREDICTIONS,
            Product::BarometricPressure => &BAROMETRIC_PRESSURE,
            Product::Wind => &WIND,
        }
    }
}

impl Default for Product {
    fn default() -> Self {
        Product::WaterLevel(DEFAULT_PRODUCT.to_string())
    }
}

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains("waterlevel") {
            return Ok(Product::WaterLevel(s.to_string()));
        }
        match s {
            "predictions" => Ok(Product::Predictions),
            "barometricpressure" => Ok(Product::BarometricPressure),
            "wind" => Ok(Product::Wind),
            other => Err(UnknownProduct(other.to_string())),
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn decode_number(field: &str) -> Result<f64, LineError> {
    let trimmed = field.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| LineError::Value(trimmed.to_string()))
}

/// Decodes one line according to `spec`.
pub fn decode_line(spec: &LineSpec, line: &str) -> Result<(NaiveDateTime, Value), LineError> {
    let raw_ts = spec.timestamp.slice(line)?;
    let timestamp = NaiveDateTime::parse_from_str(raw_ts, spec.timestamp_format)
        .map_err(|_| LineError::Timestamp(raw_ts.to_string()))?;

    let numbers = spec
        .values
        .iter()
        .map(|w| w.slice(line).and_then(decode_number))
        .collect::<Result<Vec<_>, _>>()?;

    let value = match (spec.shape, numbers.as_slice()) {
        (Shape::Scalar, [v]) => Value::Scalar(*v),
        (Shape::Wind, [speed, direction, gust]) => Value::Wind {
            speed: *speed,
            direction: *direction,
            gust: *gust,
        },
        _ => return Err(LineError::Value(line.to_string())),
    };
    Ok((timestamp, value))
}

/// Decodes every line with `spec`, keeping only the ones that succeed.
pub fn parse_with<I, S>(spec: &LineSpec, lines: I) -> TimeSeries
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| decode_line(spec, line.as_ref()))
        .filter_map(Result::ok)
        .collect()
}

pub fn parse_lines<I, S>(product: &Product, lines: I) -> TimeSeries
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parse_with(product.line_spec(), lines)
}

/// Parses a response for a product named by its service identifier.
pub fn parse_response<I, S>(product_id: &str, lines: I) -> Result<TimeSeries, UnknownProduct>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let product: Product = product_id.parse()?;
    Ok(parse_lines(&product, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    // 13 columns of station/sensor, timestamp at 13..29, value right-aligned
    // to column 38.
    const RAW_LINE: &str = "             2020-01-01 00:00    1.234";

    #[test]
    fn water_level_line() {
        let series = parse_response("waterlevelrawsixmin", [RAW_LINE]).unwrap();
        assert_eq!(series.timestamps(), &[at(2020, 1, 1, 0, 0)]);
        assert_eq!(series.values(), &[Value::Scalar(1.234)]);
    }

    #[test]
    fn realistic_water_level_response() {
        let body = "\
Station ID: 8518750  Datum: MSL
Time Zone: GMT
8518750 WL   2020-01-01 00:00  -0.412  0.003 0 0 0 0
8518750 WL   2020-01-01 00:06  -0.398  0.004 0 0 0 0
8518750 WL   2020-01-01 00:12     bad  0.004 0 0 0 0
";
        let series = parse_response("waterlevelverifiedsixmin", body.lines()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.values()[0], Value::Scalar(-0.412));
        assert_eq!(series.timestamps()[1], at(2020, 1, 1, 0, 6));
    }

    #[test]
    fn predictions_line() {
        let line = "8518750  01/02/2020 03:30 1.5";
        let series = parse_response("predictions", [line]).unwrap();
        assert_eq!(series.timestamps(), &[at(2020, 1, 2, 3, 30)]);
        assert_eq!(series.values(), &[Value::Scalar(1.5)]);
    }

    #[test]
    fn predictions_without_value_is_dropped() {
        let line = "8518750  01/02/2020 03:30";
        assert!(parse_response("predictions", [line]).unwrap().is_empty());
    }

    #[test]
    fn pressure_line() {
        let line = "8518750 BP   2021-06-30 12:00 1013.20";
        let series = parse_response("barometricpressure", [line]).unwrap();
        assert_eq!(series.values(), &[Value::Scalar(1013.2)]);
    }

    #[test]
    fn wind_line() {
        let line = "8518750 WS   2021-06-30 12:00     5.1   230.0     7.8";
        let series = parse_response("wind", [line]).unwrap();
        assert_eq!(
            series.values(),
            &[Value::Wind {
                speed: 5.1,
                direction: 230.0,
                gust: 7.8
            }]
        );
    }

    #[test]
    fn short_lines_are_dropped_for_every_product() {
        let short = "             2020-01-01 00:00  1";
        for id in ["waterlevelrawonemin", "barometricpressure", "wind", "predictions"] {
            let series = parse_response(id, [short, "", "x"]).unwrap();
            assert!(series.is_empty(), "{} kept a short line", id);
        }
    }

    #[test]
    fn non_ascii_lines_do_not_panic() {
        let line = "ééééééééééééééééééééééééééééééééééééééé";
        assert!(parse_response("wind", [line]).unwrap().is_empty());
    }

    #[test]
    fn decode_reports_why() {
        assert!(matches!(
            decode_line(&WATER_LEVEL, "short"),
            Err(LineError::OutOfRange { .. })
        ));
        assert!(matches!(
            decode_line(&WATER_LEVEL, "             2020-13-01 00:00    1.234"),
            Err(LineError::Timestamp(_))
        ));
        assert!(matches!(
            decode_line(&WATER_LEVEL, "             2020-01-01 00:00    abcde"),
            Err(LineError::Value(_))
        ));
    }

    #[test]
    fn unknown_product_is_an_error() {
        let err = parse_response("currents", [RAW_LINE]).unwrap_err();
        assert_eq!(err.to_string(), "Product [currents] is not yet implemented!");
    }

    #[test]
    fn product_ids_round_trip() {
        for id in ["waterlevelverifiedhourly", "predictions", "barometricpressure", "wind"] {
            let p: Product = id.parse().unwrap();
            assert_eq!(p.id(), id);
        }
        assert_eq!(Product::default().id(), DEFAULT_PRODUCT);
    }

    #[test]
    fn window_slicing() {
        assert_eq!(Window::Fixed(0, 3).slice("abcdef"), Ok("abc"));
        assert!(Window::Fixed(4, 8).slice("abcdef").is_err());
        assert_eq!(Window::ToEnd(2).slice("abcdef"), Ok("cdef"));
        assert_eq!(Window::ToEnd(6).slice("abcdef"), Ok(""));
        assert!(Window::ToEnd(7).slice("abcdef").is_err());
        assert_eq!(Window::Clamped(4, 8).slice("abcdef"), Ok("ef"));
        assert!(Window::Clamped(8, 10).slice("abcdef").is_err());
    }
}
