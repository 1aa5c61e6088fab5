//! One working week for a small cohort, driven through both engines.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use internhub::config::OfficeTimeConfig;
use internhub::db::{AttendanceStore, MemoryStore};
use internhub::engine::{AttendanceEngine, TaskLifecycle};
use internhub::geo::Coordinates;
use internhub::holiday::{HolidayCalendar, HolidayError, HolidaySource};
use internhub::model::attendance::{AttendanceStatus, PermissionKind, TodayStatus};
use internhub::model::holiday::{HolidayEntry, OffDay};
use internhub::model::intern::{Intern, InternStatus};
use internhub::model::task::{
    AssignTarget, NewAssignment, Priority, ReviewAction, SubmissionLink, TaskStatus,
};
use internhub::notify::{NotificationSink, NotifyError, TaskEvent};

const OFFICE: Coordinates = Coordinates {
    latitude: 3.5952,
    longitude: 98.6722,
};

struct OfflineHolidays;

#[async_trait]
impl HolidaySource for OfflineHolidays {
    async fn fetch(&self, _year: i32) -> Result<Vec<HolidayEntry>, HolidayError> {
        Err(HolidayError::Empty(0))
    }
}

#[derive(Default)]
struct Outbox(Mutex<Vec<TaskEvent>>);

#[async_trait]
impl NotificationSink for Outbox {
    async fn emit(&self, event: TaskEvent) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(event);
        Ok(())
    }
}

fn at(y: i32, m: u32, d: u32, time: &str) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_time(NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap())
}

fn office() -> OfficeTimeConfig {
    OfficeTimeConfig {
        open_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        check_in_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        late_tolerance_minutes: 30,
        location: OFFICE,
        radius_m: 150.0,
        checkout_geofence: false,
    }
}

async fn cohort() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, name, status) in [
        (1, "Ayu", InternStatus::Active),
        (2, "Budi", InternStatus::Active),
        (3, "Citra", InternStatus::Inactive),
    ] {
        store
            .upsert_intern(Intern {
                id,
                name: name.into(),
                status,
                start_date: NaiveDate::from_ymd_opt(2024, 8, 12),
            })
            .await;
    }
    store
}

#[tokio::test]
async fn independence_week_attendance() {
    let store = cohort().await;
    // the remote source is down, so the fixed-date list decides 17 August
    let calendar = Arc::new(HolidayCalendar::new(
        Arc::new(OfflineHolidays),
        Duration::from_secs(60),
    ));
    let engine = AttendanceEngine::new(office(), calendar, store.clone(), store.clone());

    // Monday: Ayu on time, Budi late
    let ayu = engine
        .check_in(1, at(2024, 8, 12, "07:45:00"), OFFICE.latitude, OFFICE.longitude, None)
        .await
        .unwrap();
    assert_eq!(ayu.status, AttendanceStatus::Present);
    let budi = engine
        .check_in(
            2,
            at(2024, 8, 12, "08:20:00"),
            OFFICE.latitude,
            OFFICE.longitude,
            Some("traffic"),
        )
        .await
        .unwrap();
    assert_eq!(budi.status, AttendanceStatus::Late);

    engine
        .check_out(1, at(2024, 8, 12, "16:00:00"), None, None)
        .await
        .unwrap();

    // Tuesday: Budi reports sick, Ayu forgets to come
    engine
        .submit_permission(
            2,
            NaiveDate::from_ymd_opt(2024, 8, 13).unwrap(),
            PermissionKind::Sick,
            "flu",
            Some("proof/budi-0813.jpg"),
        )
        .await
        .unwrap();

    // Wednesday morning Ayu opens the app and Tuesday is backfilled
    let status = engine.today_status(1, at(2024, 8, 14, "07:35:00")).await.unwrap();
    assert!(matches!(status, TodayStatus::NoRecord { .. }));
    let tuesday = store
        .find(1, NaiveDate::from_ymd_opt(2024, 8, 13).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tuesday.status, AttendanceStatus::Absent);

    // Budi's Tuesday already has a record, nothing is backfilled for him
    engine.today_status(2, at(2024, 8, 14, "08:45:00")).await.unwrap();
    let budi_tuesday = store
        .find(2, NaiveDate::from_ymd_opt(2024, 8, 13).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budi_tuesday.status, AttendanceStatus::Sick);

    // Saturday 17 August is Independence Day
    let status = engine.today_status(1, at(2024, 8, 17, "08:00:00")).await.unwrap();
    assert!(matches!(
        status,
        TodayStatus::OffDay { reason: OffDay::Holiday(ref name), .. } if name == "Independence Day"
    ));

    // Monday 19th: Saturday was a holiday and Sunday is off, nothing to backfill
    let before = store.attendance_count().await;
    engine.today_status(1, at(2024, 8, 19, "07:40:00")).await.unwrap();
    assert_eq!(store.attendance_count().await, before);

    let summary = engine
        .attendance_summary(
            1,
            NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(summary.present, 1);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.attendance_rate, 50.0);
}

#[tokio::test]
async fn assignment_from_creation_to_stats() {
    let store = cohort().await;
    let outbox = Arc::new(Outbox::default());
    let lifecycle = TaskLifecycle::new(store.clone(), store.clone(), outbox.clone());

    let created = lifecycle
        .create_assignment(
            NewAssignment {
                title: "API documentation".into(),
                description: None,
                priority: Priority::Medium,
                start_date: NaiveDate::from_ymd_opt(2024, 8, 12).unwrap(),
                deadline: NaiveDate::from_ymd_opt(2024, 8, 16).unwrap(),
                deadline_time: NaiveTime::from_hms_opt(14, 0, 0),
                target: AssignTarget::All,
                created_by: 900,
            },
            at(2024, 8, 12, "09:00:00"),
        )
        .await
        .unwrap();
    assert_eq!(created.task_count, 2);
    assert_eq!(outbox.0.lock().unwrap().len(), 2);

    let today = NaiveDate::from_ymd_opt(2024, 8, 16).unwrap();
    let ayu_task = lifecycle.list_intern_tasks(1, today).await.unwrap().remove(0);
    let budi_task = lifecycle.list_intern_tasks(2, today).await.unwrap().remove(0);
    assert!(lifecycle.list_intern_tasks(3, today).await.unwrap().is_empty());

    lifecycle
        .update_self_status(ayu_task.id, 1, TaskStatus::InProgress, at(2024, 8, 13, "09:00:00"))
        .await
        .unwrap();

    let on_time = lifecycle
        .submit_task(
            ayu_task.id,
            1,
            Some("covers every endpoint"),
            vec![SubmissionLink::new("docs", "https://docs.example.com/api")],
            at(2024, 8, 16, "14:00:00"),
        )
        .await
        .unwrap();
    assert!(!on_time.is_late);

    let late = lifecycle
        .submit_task(
            budi_task.id,
            2,
            None,
            vec![SubmissionLink::new("draft", "https://docs.example.com/draft")],
            at(2024, 8, 16, "14:00:01"),
        )
        .await
        .unwrap();
    assert!(late.is_late);

    lifecycle
        .review_task(
            ayu_task.id,
            ReviewAction::Approve,
            Some(92),
            None,
            at(2024, 8, 19, "10:00:00"),
        )
        .await
        .unwrap();
    lifecycle
        .review_task(
            budi_task.id,
            ReviewAction::Revision,
            None,
            Some("Missing auth section"),
            at(2024, 8, 19, "10:05:00"),
        )
        .await
        .unwrap();

    let stats = lifecycle
        .assignment_stats(created.assignment_id, NaiveDate::from_ymd_opt(2024, 8, 19).unwrap())
        .await
        .unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.completed_on_time, 1);
    assert_eq!(stats.counts.revision, 1);
    assert_eq!(stats.progress_percentage, 50);
    assert_eq!(stats.average_score, Some(92.0));

    let events = outbox.0.lock().unwrap().clone();
    assert_eq!(events.len(), 4);
    assert!(matches!(events[2], TaskEvent::TaskApproved { score: 92, .. }));
    assert!(matches!(events[3], TaskEvent::RevisionRequested { intern_id: 2, .. }));
}
