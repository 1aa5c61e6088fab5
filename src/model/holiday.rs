use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One entry of the remote holiday feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HolidayEntry {
    pub date: String,
    pub name: String,
    #[serde(rename = "isNational", default)]
    pub is_national: bool,
}

/// The public holidays of one year. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolidaySet {
    pub year: i32,
    dates: BTreeMap<NaiveDate, String>,
}

impl HolidaySet {
    /// Builds the set, dropping dates that fall outside `year`.
    pub fn new(year: i32, dates: impl IntoIterator<Item = (NaiveDate, String)>) -> Self {
        let dates = dates
            .into_iter()
            .filter(|(d, _)| d.year() == year)
            .collect();
        Self { year, dates }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn name_of(&self, date: NaiveDate) -> Option<&str> {
        self.dates.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &str)> {
        self.dates.iter().map(|(d, n)| (*d, n.as_str()))
    }
}

/// Why attendance is not expected on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum OffDay {
    Sunday,
    Holiday(String),
}

impl std::fmt::Display for OffDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffDay::Sunday => write!(f, "Sunday"),
            OffDay::Holiday(name) => write!(f, "{name}"),
        }
    }
}
