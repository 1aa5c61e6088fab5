use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AttendanceStore, InternDirectory, StoreError, StoreResult, TaskStore};
use crate::geo::Coordinates;
use crate::model::attendance::AttendanceRecord;
use crate::model::intern::{Intern, InternId};
use crate::model::task::{Task, TaskAssignment};

/// In-process store backing the CLI and the tests.
///
/// Attendance rows are keyed by (intern, date), which gives the same
/// at-most-one-row guarantee a unique index gives in SQL.
#[derive(Default)]
pub struct MemoryStore {
    attendance: RwLock<BTreeMap<(InternId, NaiveDate), AttendanceRecord>>,
    assignments: RwLock<HashMap<Uuid, TaskAssignment>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
    interns: RwLock<BTreeMap<InternId, Intern>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a roster entry.
    pub async fn upsert_intern(&self, intern: Intern) {
        self.interns.write().await.insert(intern.id, intern);
    }

    pub async fn attendance_count(&self) -> usize {
        self.attendance.read().await.len()
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find(
        &self,
        intern_id: InternId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.attendance.read().await.get(&(intern_id, date)).cloned())
    }

    async fn insert(&self, record: AttendanceRecord) -> StoreResult<AttendanceRecord> {
        let mut rows = self.attendance.write().await;
        let key = (record.intern_id, record.date);
        if rows.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "attendance for intern {} on {}",
                record.intern_id, record.date
            )));
        }
        rows.insert(key, record.clone());
        Ok(record)
    }

    async fn set_check_out(
        &self,
        intern_id: InternId,
        date: NaiveDate,
        at: NaiveDateTime,
        location: Option<Coordinates>,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut rows = self.attendance.write().await;
        let row = rows.get_mut(&(intern_id, date)).ok_or_else(|| {
            StoreError::NotFound(format!("attendance for intern {intern_id} on {date}"))
        })?;

        if row.check_out.is_some() {
            return Ok(None);
        }
        row.check_out = Some(at);
        row.check_out_location = location;
        Ok(Some(row.clone()))
    }

    async fn list_between(
        &self,
        intern_id: InternId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        if from > to {
            return Ok(Vec::new());
        }
        let rows = self.attendance.read().await;
        Ok(rows
            .range((intern_id, from)..=(intern_id, to))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_assignment(
        &self,
        assignment: TaskAssignment,
        tasks: Vec<Task>,
    ) -> StoreResult<()> {
        // both locks held so readers never see an assignment without its tasks
        let mut assignments = self.assignments.write().await;
        let mut rows = self.tasks.write().await;

        if assignments.contains_key(&assignment.id) {
            return Err(StoreError::Duplicate(format!("assignment {}", assignment.id)));
        }
        if let Some(task) = tasks.iter().find(|t| rows.contains_key(&t.id)) {
            return Err(StoreError::Duplicate(format!("task {}", task.id)));
        }

        for task in tasks {
            rows.insert(task.id, task);
        }
        assignments.insert(assignment.id, assignment);
        Ok(())
    }

    async fn assignment(&self, id: Uuid) -> StoreResult<Option<TaskAssignment>> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut rows = self.tasks.write().await;
        match rows.get_mut(&task.id) {
            Some(row) => {
                *row = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("task {}", task.id))),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        match self.tasks.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("task {id}"))),
        }
    }

    async fn tasks_for_assignment(&self, assignment_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = self.tasks.read().await;
        let mut tasks: Vec<Task> = rows
            .values()
            .filter(|t| t.assignment_id == assignment_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.intern_id);
        Ok(tasks)
    }

    async fn tasks_for_intern(&self, intern_id: InternId) -> StoreResult<Vec<Task>> {
        let rows = self.tasks.read().await;
        let mut tasks: Vec<Task> = rows
            .values()
            .filter(|t| t.intern_id == intern_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }
}

#[async_trait]
impl InternDirectory for MemoryStore {
    async fn intern(&self, id: InternId) -> StoreResult<Option<Intern>> {
        Ok(self.interns.read().await.get(&id).cloned())
    }

    async fn active_interns(&self) -> StoreResult<Vec<Intern>> {
        Ok(self
            .interns
            .read()
            .await
            .values()
            .filter(|i| i.is_active())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use crate::model::intern::InternStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn second_row_for_same_day_is_duplicate() {
        let store = MemoryStore::new();
        let day = date(2024, 3, 4);

        store
            .insert(AttendanceRecord::new(1, day, AttendanceStatus::Present))
            .await
            .unwrap();
        let err = store
            .insert(AttendanceRecord::new(1, day, AttendanceStatus::Late))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Duplicate(_)));
        // another intern on the same day is fine
        store
            .insert(AttendanceRecord::new(2, day, AttendanceStatus::Present))
            .await
            .unwrap();
        assert_eq!(store.attendance_count().await, 2);
    }

    #[tokio::test]
    async fn list_between_is_scoped_to_intern_and_range() {
        let store = MemoryStore::new();
        for d in 1..=5 {
            store
                .insert(AttendanceRecord::new(7, date(2024, 3, d), AttendanceStatus::Present))
                .await
                .unwrap();
        }
        store
            .insert(AttendanceRecord::new(8, date(2024, 3, 2), AttendanceStatus::Absent))
            .await
            .unwrap();

        let rows = store
            .list_between(7, date(2024, 3, 2), date(2024, 3, 4))
            .await
            .unwrap();
        let days: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![date(2024, 3, 2), date(2024, 3, 3), date(2024, 3, 4)]);
    }

    #[tokio::test]
    async fn check_out_is_stamped_once() {
        let store = MemoryStore::new();
        let day = date(2024, 3, 4);
        let first = day.and_hms_opt(17, 0, 0).unwrap();
        let second = day.and_hms_opt(17, 5, 0).unwrap();

        assert!(matches!(
            store.set_check_out(1, day, first, None).await,
            Err(StoreError::NotFound(_))
        ));

        store
            .insert(AttendanceRecord::new(1, day, AttendanceStatus::Present))
            .await
            .unwrap();
        let row = store.set_check_out(1, day, first, None).await.unwrap().unwrap();
        assert_eq!(row.check_out, Some(first));

        assert_eq!(store.set_check_out(1, day, second, None).await.unwrap(), None);
        let stored = store.find(1, day).await.unwrap().unwrap();
        assert_eq!(stored.check_out, Some(first));
    }

    #[tokio::test]
    async fn active_interns_filters_roster() {
        let store = MemoryStore::new();
        for (id, status) in [
            (1, InternStatus::Active),
            (2, InternStatus::Inactive),
            (3, InternStatus::Active),
            (4, InternStatus::Completed),
        ] {
            store
                .upsert_intern(Intern {
                    id,
                    name: format!("intern-{id}"),
                    status,
                    start_date: None,
                })
                .await;
        }

        let ids: Vec<_> = store
            .active_interns()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
