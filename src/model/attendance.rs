use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::geo::Coordinates;
use crate::model::holiday::OffDay;
use crate::model::intern::InternId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Sick,
    Permission,
}

/// Kinds of attendance an intern can file without checking in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionKind {
    Sick,
    Permission,
}

impl From<PermissionKind> for AttendanceStatus {
    fn from(kind: PermissionKind) -> Self {
        match kind {
            PermissionKind::Sick => AttendanceStatus::Sick,
            PermissionKind::Permission => AttendanceStatus::Permission,
        }
    }
}

/// One row per (intern, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub intern_id: InternId,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_in_location: Option<Coordinates>,
    pub check_out: Option<NaiveDateTime>,
    pub check_out_location: Option<Coordinates>,
    pub status: AttendanceStatus,
    pub late_reason: Option<String>,
    pub notes: Option<String>,
    /// Rounded meters between the check-in point and the office.
    pub distance_m: Option<u32>,
    pub proof_ref: Option<String>,
}

impl AttendanceRecord {
    /// A bare record with no check-in data.
    pub fn new(intern_id: InternId, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            intern_id,
            date,
            check_in: None,
            check_in_location: None,
            check_out: None,
            check_out_location: None,
            status,
            late_reason: None,
            notes: None,
            distance_m: None,
            proof_ref: None,
        }
    }

    pub fn has_checked_out(&self) -> bool {
        self.check_out.is_some()
    }
}

/// The three instants that gate check-in on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceWindow {
    pub open_limit: NaiveDateTime,
    pub late_start: NaiveDateTime,
    pub hard_limit: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInOutcome {
    pub attendance_id: Uuid,
    pub status: AttendanceStatus,
    pub distance_m: u32,
}

/// Answer to "what is my attendance today".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TodayStatus {
    OffDay { date: NaiveDate, reason: OffDay },
    /// The check-in window has passed with no record; implicitly absent.
    Closed { date: NaiveDate, window: AttendanceWindow },
    NoRecord { date: NaiveDate, window: AttendanceWindow },
    Record { record: AttendanceRecord },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub sick: u32,
    pub permission: u32,
    /// Present + late over all recorded days, in percent.
    pub attendance_rate: f64,
}

impl AttendanceSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut summary = AttendanceSummary::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Sick => summary.sick += 1,
                AttendanceStatus::Permission => summary.permission += 1,
            }
        }

        let total = summary.total();
        if total > 0 {
            let attended = f64::from(summary.present + summary.late);
            summary.attendance_rate = (attended * 10_000.0 / f64::from(total)).round() / 100.0;
        }
        summary
    }

    pub fn total(&self) -> u32 {
        self.present + self.late + self.absent + self.sick + self.permission
    }
}
