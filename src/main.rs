use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::rolling;

use internhub::clock::{Clock, SystemClock};
use internhub::config::Config;
use internhub::db::MemoryStore;
use internhub::engine::AttendanceEngine;
use internhub::holiday::{HolidayCalendar, RemoteHolidaySource};

#[derive(Parser)]
#[command(name = "internhub", about = "Attendance calendar and check-in window tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the public holidays of a year.
    Holidays {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Tell whether attendance is expected on a date.
    OffDay {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the check-in window for a date.
    Window {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "internhub.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    let clock = SystemClock::new(config.utc_offset);
    let today = clock.today();

    let source = RemoteHolidaySource::new(&config.holiday.api_url, config.holiday.fetch_timeout)?;
    let calendar = Arc::new(HolidayCalendar::new(Arc::new(source), config.holiday.cache_ttl));

    match cli.command {
        Command::Holidays { year } => {
            let year = year.unwrap_or(today.year());
            let set = calendar.holiday_set_for(year).await;
            info!(year, holidays = set.len(), "Listing holidays");
            for (date, name) in set.iter() {
                println!("{date}  {name}");
            }
        }
        Command::OffDay { date } => {
            let date = date.unwrap_or(today);
            match calendar.off_day(date).await {
                Some(reason) => println!("{date} is an off-day: {reason}"),
                None => println!("{date} is a working day"),
            }
        }
        Command::Window { date } => {
            let date = date.unwrap_or(today);
            let store = Arc::new(MemoryStore::new());
            let engine = AttendanceEngine::new(
                config.office.clone(),
                calendar.clone(),
                store.clone(),
                store,
            );

            if let Some(reason) = calendar.off_day(date).await {
                println!("{date} is an off-day: {reason}");
                return Ok(());
            }

            let window = engine.window_for(date);
            println!("{}", serde_json::to_string_pretty(&window)?);
            println!(
                "geofence: {:.0} m around ({}, {})",
                engine.office().radius_m,
                engine.office().location.latitude,
                engine.office().location.longitude
            );
        }
    }

    Ok(())
}
