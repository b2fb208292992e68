//! A small Rust client for NOAA CO-OPS (Center for Operational Oceanographic
//! Products and Services) data.
//!
//! The crate covers a download-and-decode flow:
//! fetch a plain-text product response (retrying through the service's
//! frequent outages), decode it line by line into a [`TimeSeries`], and
//! optionally cache series and station descriptions in local flat files.
//!
//! ## Quick start
//! - Optionally point the client elsewhere via `COOPS_*` environment variables
//!   or a `.coopsrc` file (current directory or home directory).
//! - Build a [`DataQuery`] and call [`Client::get_data`].
//!
//! ```no_run
//! use anyhow::Result;
//! use chrono::{Duration, Utc};
//! use coops::{Client, DataQuery, Product};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let now = Utc::now().naive_utc();
//!     let query = DataQuery::new("8518750", now - Duration::days(3), now)
//!         .with_product(Product::Predictions);
//!     let tides = client.get_data(&query);
//!     println!("{} predictions, mean {:.3} m", tides.len(), tides.mean());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod directory;
mod error;
mod fetch;
mod model;
mod product;
mod query;
mod report;
mod station;

pub mod codec;
pub mod ini;
pub mod log;
pub mod transfer;
pub mod util;

pub use client::Client;
pub use config::{ClientConfig, load_config_file};
pub use directory::{DIRECTORY_URL, parse_active_stations, parse_row};
pub use error::{LineError, UnknownProduct};
pub use fetch::{Fetcher, RetryPolicy};
pub use model::{
    ActiveStation, ActiveStations, StationId, StationInfo, TimeSeries, Value, normalize_longitude,
};
pub use product::{
    DEFAULT_PRODUCT, LineSpec, Product, Shape, Window, decode_line, parse_lines, parse_response,
    parse_with,
};
pub use query::{DATA_URL, DataQuery, Units};
pub use report::{AnomalyReport, ReportSummary, StationSource};
pub use station::{METADATA_URL, metadata_url, nos_id, parse_station_json};
