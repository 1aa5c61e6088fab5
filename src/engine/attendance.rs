use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, instrument};

use crate::config::OfficeTimeConfig;
use crate::db::{AttendanceStore, InternDirectory, StoreError};
use crate::error::{CoreError, CoreResult};
use crate::geo::Coordinates;
use crate::holiday::HolidayCalendar;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, AttendanceWindow, CheckInOutcome,
    PermissionKind, TodayStatus,
};
use crate::model::intern::{Intern, InternId};

const BACKFILL_NOTE: &str = "Marked absent automatically: no attendance was recorded";

/// Decides check-in, check-out and daily attendance state for interns.
pub struct AttendanceEngine {
    office: OfficeTimeConfig,
    calendar: Arc<HolidayCalendar>,
    store: Arc<dyn AttendanceStore>,
    directory: Arc<dyn InternDirectory>,
}

impl AttendanceEngine {
    pub fn new(
        office: OfficeTimeConfig,
        calendar: Arc<HolidayCalendar>,
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn InternDirectory>,
    ) -> Self {
        Self {
            office,
            calendar,
            store,
            directory,
        }
    }

    pub fn office(&self) -> &OfficeTimeConfig {
        &self.office
    }

    /// Check-in window for `date`.
    pub fn window_for(&self, date: NaiveDate) -> AttendanceWindow {
        let late_start = date.and_time(self.office.check_in_time);
        AttendanceWindow {
            open_limit: date.and_time(self.office.open_time),
            late_start,
            hard_limit: late_start
                + Duration::minutes(i64::from(self.office.late_tolerance_minutes)),
        }
    }

    /* =========================
    Check-in
    ========================= */
    #[instrument(name = "attendance_check_in", skip(self, late_reason))]
    pub async fn check_in(
        &self,
        intern_id: InternId,
        now: NaiveDateTime,
        lat: f64,
        lon: f64,
        late_reason: Option<&str>,
    ) -> CoreResult<CheckInOutcome> {
        self.active_intern(intern_id).await?;
        let today = now.date();

        // 1️⃣ one record per day
        if self.store.find(intern_id, today).await?.is_some() {
            debug!("Rejected: record already exists");
            return Err(CoreError::validation("Already checked in today"));
        }

        // 2️⃣ no attendance on Sundays and holidays
        if let Some(reason) = self.calendar.off_day(today).await {
            return Err(CoreError::validation(format!(
                "Attendance is closed today ({reason})"
            )));
        }

        // 3️⃣ device location
        let device = Coordinates::new(lat, lon);
        if !device.is_valid() {
            return Err(CoreError::validation("Invalid coordinates"));
        }

        // 4️⃣ geofence
        let distance = self.office.location.distance_to(&device);
        debug!(distance_m = distance, radius_m = self.office.radius_m, "Distance from office");
        if distance > self.office.radius_m {
            return Err(CoreError::validation(format!(
                "You are {:.0} m from the office; check-in is allowed within {:.0} m",
                distance, self.office.radius_m
            )));
        }

        // 5️⃣ time window
        let status = classify_check_in(now, &self.window_for(today))?;
        let late_reason = match status {
            AttendanceStatus::Late => {
                Some(required_text(late_reason, "A late reason is required")?)
            }
            _ => None,
        };

        // 6️⃣ persist
        let mut record = AttendanceRecord::new(intern_id, today, status);
        record.check_in = Some(now);
        record.check_in_location = Some(device);
        record.distance_m = Some(distance.round() as u32);
        record.late_reason = late_reason;

        let record = self.store.insert(record).await.map_err(|e| match e {
            StoreError::Duplicate(_) => CoreError::validation("Already checked in today"),
            other => {
                error!(error = %other, "Check-in failed");
                other.into()
            }
        })?;

        info!(status = %record.status, distance_m = ?record.distance_m, "Checked in");

        Ok(CheckInOutcome {
            attendance_id: record.id,
            status: record.status,
            distance_m: record.distance_m.unwrap_or_default(),
        })
    }

    /* =========================
    Check-out
    ========================= */
    #[instrument(name = "attendance_check_out", skip(self))]
    pub async fn check_out(
        &self,
        intern_id: InternId,
        now: NaiveDateTime,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> CoreResult<AttendanceRecord> {
        let today = now.date();

        let record = self
            .store
            .find(intern_id, today)
            .await?
            .ok_or_else(|| CoreError::validation("No active check-in found for today"))?;

        let checked_in_at = record.check_in.ok_or_else(|| {
            CoreError::validation(format!(
                "Today is recorded as {}; nothing to check out",
                record.status
            ))
        })?;

        if record.has_checked_out() {
            return Err(CoreError::validation("Already checked out today"));
        }
        if now < checked_in_at {
            return Err(CoreError::validation("Check-out cannot be earlier than check-in"));
        }

        let location = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        if self.office.checkout_geofence {
            let point = location
                .filter(Coordinates::is_valid)
                .ok_or_else(|| CoreError::validation("A valid location is required to check out"))?;
            let distance = self.office.location.distance_to(&point);
            if distance > self.office.radius_m {
                return Err(CoreError::validation(format!(
                    "You are {:.0} m from the office; check-out is allowed within {:.0} m",
                    distance, self.office.radius_m
                )));
            }
        }

        // conditional on the row still having no check-out
        let record = self
            .store
            .set_check_out(intern_id, today, now, location)
            .await
            .map_err(|e| {
                error!(error = %e, "Check-out failed");
                CoreError::from(e)
            })?
            .ok_or_else(|| {
                debug!("Rejected: concurrent check-out won");
                CoreError::validation("Already checked out today")
            })?;

        info!("Checked out");
        Ok(record)
    }

    /* =========================
    Today status + backfill
    ========================= */
    /// Today's attendance. As a side effect, yesterday is recorded as absent
    /// when it was a working day with no record.
    #[instrument(name = "attendance_today", skip(self))]
    pub async fn today_status(
        &self,
        intern_id: InternId,
        now: NaiveDateTime,
    ) -> CoreResult<TodayStatus> {
        let intern = self.intern(intern_id).await?;
        let today = now.date();

        if let Some(record) = self.store.find(intern_id, today).await? {
            return Ok(TodayStatus::Record { record });
        }

        if let Some(reason) = self.calendar.off_day(today).await {
            return Ok(TodayStatus::OffDay { date: today, reason });
        }

        if intern.is_active() {
            self.backfill_absence(&intern, today).await?;
        }

        let window = self.window_for(today);
        if now > window.hard_limit {
            Ok(TodayStatus::Closed { date: today, window })
        } else {
            Ok(TodayStatus::NoRecord { date: today, window })
        }
    }

    /// Inserts an `absent` row for the working day before `today` if it has
    /// none. Returns the row when one was written.
    async fn backfill_absence(
        &self,
        intern: &Intern,
        today: NaiveDate,
    ) -> CoreResult<Option<AttendanceRecord>> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(None);
        };

        if intern.start_date.is_some_and(|start| yesterday < start) {
            return Ok(None);
        }
        if self.calendar.is_off_day(yesterday).await {
            return Ok(None);
        }
        if self.store.find(intern.id, yesterday).await?.is_some() {
            return Ok(None);
        }

        let mut record = AttendanceRecord::new(intern.id, yesterday, AttendanceStatus::Absent);
        record.notes = Some(BACKFILL_NOTE.to_string());

        match self.store.insert(record).await {
            Ok(record) => {
                info!(intern_id = intern.id, date = %yesterday, "Backfilled absence");
                Ok(Some(record))
            }
            // a concurrent query got there first
            Err(StoreError::Duplicate(_)) => Ok(None),
            Err(e) => {
                error!(error = %e, intern_id = intern.id, "Backfill failed");
                Err(e.into())
            }
        }
    }

    /* =========================
    Sick / permission
    ========================= */
    #[instrument(name = "attendance_permission", skip(self, notes, proof_ref))]
    pub async fn submit_permission(
        &self,
        intern_id: InternId,
        date: NaiveDate,
        kind: PermissionKind,
        notes: &str,
        proof_ref: Option<&str>,
    ) -> CoreResult<AttendanceRecord> {
        self.active_intern(intern_id).await?;

        let notes = required_text(Some(notes), "Notes are required")?;
        let proof_ref = match kind {
            PermissionKind::Sick => Some(required_text(
                proof_ref,
                "A sick note attachment is required",
            )?),
            PermissionKind::Permission => proof_ref
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
        };

        if self.store.find(intern_id, date).await?.is_some() {
            return Err(CoreError::validation(format!("Attendance for {date} is already recorded")));
        }

        let mut record = AttendanceRecord::new(intern_id, date, kind.into());
        record.notes = Some(notes);
        record.proof_ref = proof_ref;

        let record = self.store.insert(record).await.map_err(|e| match e {
            StoreError::Duplicate(_) => {
                CoreError::validation(format!("Attendance for {date} is already recorded"))
            }
            other => other.into(),
        })?;

        info!("Permission recorded");
        Ok(record)
    }

    /* =========================
    History
    ========================= */
    pub async fn attendance_history(
        &self,
        intern_id: InternId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        if from > to {
            return Err(CoreError::validation("from cannot be after to"));
        }
        self.intern(intern_id).await?;
        Ok(self.store.list_between(intern_id, from, to).await?)
    }

    pub async fn attendance_summary(
        &self,
        intern_id: InternId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<AttendanceSummary> {
        let records = self.attendance_history(intern_id, from, to).await?;
        Ok(AttendanceSummary::from_records(&records))
    }

    async fn intern(&self, intern_id: InternId) -> CoreResult<Intern> {
        self.directory
            .intern(intern_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("intern {intern_id}")))
    }

    async fn active_intern(&self, intern_id: InternId) -> CoreResult<Intern> {
        let intern = self.intern(intern_id).await?;
        if !intern.is_active() {
            return Err(CoreError::validation(format!("Intern is {}", intern.status)));
        }
        Ok(intern)
    }
}

/// `present` up to and including the official start, `late` until the hard
/// limit, rejected outside `[open_limit, hard_limit]`.
pub fn classify_check_in(
    now: NaiveDateTime,
    window: &AttendanceWindow,
) -> CoreResult<AttendanceStatus> {
    if now < window.open_limit {
        return Err(CoreError::validation(format!(
            "Attendance opens at {}",
            window.open_limit.time()
        )));
    }
    if now > window.hard_limit {
        return Err(CoreError::validation(format!(
            "Attendance closed at {}",
            window.hard_limit.time()
        )));
    }
    if now <= window.late_start {
        Ok(AttendanceStatus::Present)
    } else {
        Ok(AttendanceStatus::Late)
    }
}

fn required_text(value: Option<&str>, message: &str) -> CoreResult<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| CoreError::validation(message))
}
