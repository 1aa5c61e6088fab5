use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::model::holiday::{HolidayEntry, HolidaySet};

#[derive(Debug, Error)]
pub enum HolidayError {
    #[error("holiday request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("holiday source answered {status}")]
    Status { status: reqwest::StatusCode },

    #[error("holiday source returned no usable dates for {0}")]
    Empty(i32),
}

/// Anything that can produce the raw holiday feed for a year.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn fetch(&self, year: i32) -> Result<Vec<HolidayEntry>, HolidayError>;
}

/// Fetches `GET {base_url}?year=YYYY`, expecting a JSON array of
/// `{date, name, isNational}`.
pub struct RemoteHolidaySource {
    client: Client,
    base_url: String,
}

impl RemoteHolidaySource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HolidayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl HolidaySource for RemoteHolidaySource {
    async fn fetch(&self, year: i32) -> Result<Vec<HolidayEntry>, HolidayError> {
        debug!(year, url = %self.base_url, "Fetching holiday list");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("year", year)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HolidayError::Status { status });
        }

        Ok(response.json::<Vec<HolidayEntry>>().await?)
    }
}

/// Accepts `YYYY-M-D` with or without zero padding, optionally followed by a
/// time part (`2024-08-17T00:00:00+07:00`).
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let day_part = raw.trim().split(['T', ' ']).next()?;
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

/// Keeps national holidays of `year` with a parseable date.
pub fn build_set(year: i32, entries: Vec<HolidayEntry>) -> Result<HolidaySet, HolidayError> {
    let set = HolidaySet::new(
        year,
        entries
            .into_iter()
            .filter(|e| e.is_national)
            .filter_map(|e| normalize_date(&e.date).map(|d| (d, e.name))),
    );
    if set.is_empty() {
        return Err(HolidayError::Empty(year));
    }
    Ok(set)
}

const FALLBACK: [(u32, u32, &str); 5] = [
    (1, 1, "New Year's Day"),
    (5, 1, "Labor Day"),
    (6, 1, "Pancasila Day"),
    (8, 17, "Independence Day"),
    (12, 25, "Christmas Day"),
];

/// Fixed-date holidays used when the remote source is unreachable.
pub fn fallback_set(year: i32) -> HolidaySet {
    HolidaySet::new(
        year,
        FALLBACK.iter().filter_map(|(m, d, name)| {
            NaiveDate::from_ymd_opt(year, *m, *d).map(|date| (date, name.to_string()))
        }),
    )
}
