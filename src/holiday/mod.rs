use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Weekday};
use moka::future::Cache;
use tracing::{debug, info, warn};

use crate::model::holiday::{HolidaySet, OffDay};

pub mod source;

pub use source::{HolidayError, HolidaySource, RemoteHolidaySource};

/// Years kept at once; a deployment rarely looks beyond last/this/next year.
const MAX_CACHED_YEARS: u64 = 16;
/// Upper bound on entry lifetime; moka rejects anything near 1000 years.
pub const MAX_TTL: Duration = Duration::from_secs(31 * 24 * 3600);

/// Off-day classification backed by a per-year holiday cache.
///
/// The cache is owned by the calendar and shared by cloning the calendar's
/// `Arc`. Concurrent misses on the same year are coalesced by moka, misses on
/// different years never block each other, and failed fetches are not cached
/// so the next lookup retries the remote source.
pub struct HolidayCalendar {
    source: Arc<dyn HolidaySource>,
    cache: Cache<i32, Arc<HolidaySet>>,
}

impl HolidayCalendar {
    /// `ttl` is clamped to [`MAX_TTL`].
    pub fn new(source: Arc<dyn HolidaySource>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHED_YEARS)
            .time_to_live(ttl.min(MAX_TTL))
            .build();
        Self { source, cache }
    }

    /// Holiday set for `year`, falling back to the fixed-date list when the
    /// source fails. The fallback is returned but never cached.
    pub async fn holiday_set_for(&self, year: i32) -> Arc<HolidaySet> {
        let source = Arc::clone(&self.source);
        let lookup = self
            .cache
            .try_get_with(year, async move {
                let entries = source.fetch(year).await?;
                let set = source::build_set(year, entries)?;
                info!(year, holidays = set.len(), "Holiday set cached");
                Ok::<_, HolidayError>(Arc::new(set))
            })
            .await;

        match lookup {
            Ok(set) => set,
            Err(e) => {
                warn!(year, error = %e, "Holiday source unavailable, using fallback list");
                Arc::new(source::fallback_set(year))
            }
        }
    }

    /// `Some` when attendance is not expected on `date`.
    pub async fn off_day(&self, date: NaiveDate) -> Option<OffDay> {
        if date.weekday() == Weekday::Sun {
            return Some(OffDay::Sunday);
        }

        let set = self.holiday_set_for(date.year()).await;
        let name = set.name_of(date)?;
        debug!(%date, holiday = name, "Date is a holiday");
        Some(OffDay::Holiday(name.to_string()))
    }

    pub async fn is_off_day(&self, date: NaiveDate) -> bool {
        self.off_day(date).await.is_some()
    }

    /// Populates the cache for several years concurrently.
    pub async fn warm_up(&self, years: impl IntoIterator<Item = i32>) {
        let lookups: Vec<_> = years
            .into_iter()
            .map(|year| self.holiday_set_for(year))
            .collect();

        let sets = futures::future::join_all(lookups).await;
        let total: usize = sets.iter().map(|s| s.len()).sum();
        info!(years = sets.len(), holidays = total, "Holiday cache warmup complete");
    }

    pub async fn is_cached(&self, year: i32) -> bool {
        self.cache.get(&year).await.is_some()
    }

    pub async fn invalidate(&self, year: i32) {
        self.cache.invalidate(&year).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::model::holiday::HolidayEntry;

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl HolidaySource for CountingSource {
        async fn fetch(&self, year: i32) -> Result<Vec<HolidayEntry>, HolidayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HolidayError::Empty(year));
            }
            Ok(vec![
                HolidayEntry {
                    date: format!("{year}-03-11"),
                    name: "Nyepi".into(),
                    is_national: true,
                },
                HolidayEntry {
                    date: format!("{year}-08-17"),
                    name: "Hari Kemerdekaan".into(),
                    is_national: true,
                },
            ])
        }
    }

    fn calendar(source: Arc<CountingSource>) -> HolidayCalendar {
        HolidayCalendar::new(source, Duration::from_secs(3600))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn sundays_are_off_without_touching_the_source() {
        let source = CountingSource::new(false);
        let cal = calendar(source.clone());

        // 2024-03-10 and 2024-03-17 are Sundays
        assert_eq!(cal.off_day(date(2024, 3, 10)).await, Some(OffDay::Sunday));
        assert!(cal.is_off_day(date(2024, 3, 17)).await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_holidays_are_cached_per_year() {
        let source = CountingSource::new(false);
        let cal = calendar(source.clone());

        assert_eq!(
            cal.off_day(date(2024, 3, 11)).await,
            Some(OffDay::Holiday("Nyepi".into()))
        );
        assert!(cal.is_off_day(date(2024, 8, 17)).await);
        assert!(!cal.is_off_day(date(2024, 3, 12)).await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(cal.is_cached(2024).await);

        assert!(cal.is_off_day(date(2025, 3, 11)).await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_fall_back_and_are_retried() {
        let source = CountingSource::new(true);
        let cal = calendar(source.clone());

        // Pancasila Day only exists in the fallback list
        assert_eq!(
            cal.off_day(date(2026, 6, 1)).await,
            Some(OffDay::Holiday("Pancasila Day".into()))
        );
        assert!(!cal.is_cached(2026).await);

        cal.holiday_set_for(2026).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let source = CountingSource::new(false);
        let cal = Arc::new(calendar(source.clone()));

        let lookups = (0..8).map(|_| {
            let cal = Arc::clone(&cal);
            tokio::spawn(async move { cal.holiday_set_for(2024).await.len() })
        });
        for handle in futures::future::join_all(lookups).await {
            assert_eq!(handle.unwrap(), 2);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn warm_up_fills_every_year() {
        let source = CountingSource::new(false);
        let cal = calendar(source.clone());

        cal.warm_up([2024, 2025, 2026]).await;

        for year in [2024, 2025, 2026] {
            assert!(cal.is_cached(year).await);
        }
        cal.invalidate(2025).await;
        assert!(!cal.is_cached(2025).await);
    }

    #[tokio::test]
    async fn oversized_ttl_is_clamped() {
        let source = CountingSource::new(false);
        let cal = HolidayCalendar::new(source.clone(), Duration::from_secs(9_000_000 * 3600));

        assert!(cal.is_off_day(date(2024, 3, 11)).await);
        assert!(cal.is_cached(2024).await);
    }
}
