//! Fixtures shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::OfficeTimeConfig;
use crate::geo::Coordinates;
use crate::holiday::{HolidayCalendar, HolidayError, HolidaySource};
use crate::model::holiday::HolidayEntry;
use crate::model::intern::{Intern, InternId, InternStatus};
use crate::notify::{NotificationSink, NotifyError, TaskEvent};

pub const OFFICE: Coordinates = Coordinates {
    latitude: -6.2,
    longitude: 106.816666,
};

pub fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: (i32, u32, u32), time: &str) -> NaiveDateTime {
    date(day).and_time(NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap())
}

/// Opens 07:00, late after 08:00, closes 09:00, 100 m radius.
pub fn office() -> OfficeTimeConfig {
    OfficeTimeConfig {
        open_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        check_in_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        late_tolerance_minutes: 60,
        location: OFFICE,
        radius_m: 100.0,
        checkout_geofence: false,
    }
}

pub fn intern(id: InternId) -> Intern {
    Intern {
        id,
        name: format!("intern-{id}"),
        status: InternStatus::Active,
        start_date: None,
    }
}

struct FixtureHolidays;

#[async_trait]
impl HolidaySource for FixtureHolidays {
    async fn fetch(&self, year: i32) -> Result<Vec<HolidayEntry>, HolidayError> {
        Ok(vec![
            HolidayEntry {
                date: format!("{year}-01-01"),
                name: "New Year's Day".into(),
                is_national: true,
            },
            HolidayEntry {
                date: "2024-02-08".into(),
                name: "Isra Mi'raj".into(),
                is_national: true,
            },
        ])
    }
}

pub fn fixture_calendar() -> Arc<HolidayCalendar> {
    Arc::new(HolidayCalendar::new(
        Arc::new(FixtureHolidays),
        Duration::from_secs(3600),
    ))
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TaskEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, event: TaskEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
