//! Attendance and task lifecycle engine for internship programs.
//!
//! [`engine::AttendanceEngine`] decides geofenced check-in/out, daily status
//! and absence backfill against a [`holiday::HolidayCalendar`];
//! [`engine::TaskLifecycle`] drives assignments through submission and review.
//! Persistence and notification delivery are reached through the traits in
//! [`db`] and [`notify`].

pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod geo;
pub mod holiday;
pub mod model;
pub mod notify;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CoreError, CoreResult};
