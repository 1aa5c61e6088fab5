use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveTime};
use dotenvy::dotenv;

use crate::geo::Coordinates;

/// One working day.
pub const MAX_LATE_TOLERANCE_MINUTES: u32 = 24 * 60;
/// 31 days.
pub const MAX_CACHE_TTL_HOURS: u64 = 24 * 31;
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 120;

/// Office rules the attendance engine evaluates against. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficeTimeConfig {
    /// Earliest check-in.
    pub open_time: NaiveTime,
    /// Official start; check-ins after this are late.
    pub check_in_time: NaiveTime,
    pub late_tolerance_minutes: u32,
    pub location: Coordinates,
    pub radius_m: f64,
    /// Apply the geofence on check-out as well.
    pub checkout_geofence: bool,
}

impl OfficeTimeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.location.is_valid() {
            anyhow::bail!("OFFICE_LATITUDE/OFFICE_LONGITUDE out of range");
        }
        // a NaN radius disables the geofence
        if !self.radius_m.is_finite() || self.radius_m < 0.0 {
            anyhow::bail!("OFFICE_RADIUS_METERS must be a finite, non-negative number");
        }
        if self.open_time > self.check_in_time {
            anyhow::bail!("ATTENDANCE_OPEN_TIME must not be after CHECK_IN_TIME");
        }
        if self.late_tolerance_minutes > MAX_LATE_TOLERANCE_MINUTES {
            anyhow::bail!("LATE_TOLERANCE_MINUTES must be at most {MAX_LATE_TOLERANCE_MINUTES}");
        }
        Ok(())
    }
}

impl Default for OfficeTimeConfig {
    fn default() -> Self {
        Self {
            open_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            check_in_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            late_tolerance_minutes: 60,
            location: Coordinates::new(-6.200000, 106.816666),
            radius_m: 100.0,
            checkout_geofence: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HolidayConfig {
    pub api_url: String,
    pub fetch_timeout: Duration,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub office: OfficeTimeConfig,
    pub holiday: HolidayConfig,
    /// Offset of the office's wall clock from UTC.
    pub utc_offset: FixedOffset,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = OfficeTimeConfig::default();

        let office = OfficeTimeConfig {
            open_time: var_time("ATTENDANCE_OPEN_TIME", defaults.open_time)?,
            check_in_time: var_time("CHECK_IN_TIME", defaults.check_in_time)?,
            late_tolerance_minutes: var_or(
                "LATE_TOLERANCE_MINUTES",
                defaults.late_tolerance_minutes,
            )?,
            location: Coordinates::new(
                var_or("OFFICE_LATITUDE", defaults.location.latitude)?,
                var_or("OFFICE_LONGITUDE", defaults.location.longitude)?,
            ),
            radius_m: var_or("OFFICE_RADIUS_METERS", defaults.radius_m)?,
            checkout_geofence: var_or("CHECKOUT_GEOFENCE", defaults.checkout_geofence)?,
        };

        office.validate()?;

        let holiday = HolidayConfig {
            api_url: env::var("HOLIDAY_API_URL")
                .unwrap_or_else(|_| "https://api-harilibur.vercel.app/api".to_string()),
            fetch_timeout: fetch_timeout(var_or("HOLIDAY_FETCH_TIMEOUT_SECS", 5)?)?,
            cache_ttl: cache_ttl(var_or("HOLIDAY_CACHE_TTL_HOURS", 24)?)?,
        };

        let offset_hours: i32 = var_or("UTC_OFFSET_HOURS", 7)?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .with_context(|| format!("UTC_OFFSET_HOURS={offset_hours} is not a valid offset"))?;

        Ok(Self {
            office,
            holiday,
            utc_offset,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", tracing::Level::INFO)?,
        })
    }
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

fn cache_ttl(hours: u64) -> Result<Duration> {
    if hours == 0 || hours > MAX_CACHE_TTL_HOURS {
        anyhow::bail!("HOLIDAY_CACHE_TTL_HOURS must be between 1 and {MAX_CACHE_TTL_HOURS}");
    }
    let secs = hours
        .checked_mul(3600)
        .context("HOLIDAY_CACHE_TTL_HOURS overflows")?;
    Ok(Duration::from_secs(secs))
}

fn fetch_timeout(secs: u64) -> Result<Duration> {
    if secs == 0 || secs > MAX_FETCH_TIMEOUT_SECS {
        anyhow::bail!("HOLIDAY_FETCH_TIMEOUT_SECS must be between 1 and {MAX_FETCH_TIMEOUT_SECS}");
    }
    Ok(Duration::from_secs(secs))
}

fn var_time(key: &str, default: NaiveTime) -> Result<NaiveTime> {
    match env::var(key) {
        Ok(raw) => parse_time(&raw).with_context(|| format!("{key}={raw:?} is not HH:MM[:SS]")),
        Err(_) => Ok(default),
    }
}

/// `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}
