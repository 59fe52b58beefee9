pub mod categories;
pub mod config;
pub mod delete;
pub mod edit;
pub mod events;
pub mod move_event;
pub mod new;

use std::sync::Arc;

use agenda_core::{
    AgendaConfig, Calendar, CategoryId, DateRange, Event, EventId, Recurrence, Reminder,
    WindowDescriptor,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::Args;

use crate::client::{HttpService, Session};
use crate::render::TerminalNotifier;

/// Date range of the loaded window.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Window start (YYYY-MM-DD); defaults to `window_days` before today
    #[arg(long)]
    pub from: Option<String>,

    /// Window end (YYYY-MM-DD); defaults to `window_days` after today
    #[arg(long)]
    pub to: Option<String>,
}

impl WindowArgs {
    pub fn range(&self, config: &AgendaConfig) -> Result<DateRange> {
        Ok(DateRange::from_args(
            self.from.as_deref(),
            self.to.as_deref(),
            config.window_days,
        )?)
    }
}

/// Optional event fields shared by `new` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct EventFields {
    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Repeat: none, daily, weekly or monthly
    #[arg(short, long)]
    pub repeat: Option<Recurrence>,

    /// Reminder before the start (e.g., "15m", "2h", "1day")
    #[arg(long)]
    pub remind: Option<Reminder>,

    /// Category id
    #[arg(short, long)]
    pub category: Option<CategoryId>,
}

/// A calendar talking to the configured service.
pub fn connect(config: &AgendaConfig) -> Result<Calendar> {
    let service = HttpService::new(&config.api_url, Session::new(config.token.clone()))?;
    Ok(Calendar::new(
        Arc::new(service),
        Arc::new(TerminalNotifier),
        config.sync_settings()?,
    ))
}

/// Load the window and look up `id`, in it or among all events.
pub async fn load_event(calendar: &Calendar, id: EventId, window: &WindowArgs, config: &AgendaConfig) -> Result<Event> {
    let range = window.range(config)?;
    calendar
        .open(WindowDescriptor::new(range))
        .await
        .context("Could not load events")?;

    calendar
        .find_event(id)
        .await
        .context("Could not look up event")?
        .with_context(|| format!("Event {id} not found"))
}

/// Parse a date/time given on the command line.
///
/// Accepts RFC 3339 (`2025-03-20T15:00:00Z`), local `YYYY-MM-DDTHH:MM`,
/// `YYYY-MM-DD HH:MM`, or a bare date meaning local midnight.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .with_context(|| format!("Could not parse date/time: \"{input}\""))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("\"{input}\" does not exist in the local time zone"))
}

/// Parse a duration such as `30m` or `2h30m`.
pub fn parse_duration(input: &str) -> Result<chrono::Duration> {
    let duration = humantime::parse_duration(input.trim())
        .with_context(|| format!("Could not parse duration: \"{input}\""))?;
    Ok(chrono::Duration::from_std(duration)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse_datetime("2025-03-20T15:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("2025-03-20T15:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 20, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_local_forms_agree() {
        let t = parse_datetime("2025-03-20T15:00").unwrap();
        assert_eq!(parse_datetime("2025-03-20 15:00").unwrap(), t);
        assert_eq!(parse_datetime("2025-03-20T15:00:00").unwrap(), t);
        assert_eq!(t.with_timezone(&Local).format("%H:%M").to_string(), "15:00");
    }

    #[test]
    fn test_parse_bare_date_is_local_midnight() {
        let t = parse_datetime("2025-03-20").unwrap();
        assert_eq!(
            t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            "2025-03-20 00:00"
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_datetime("next tuesday").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2h30m").unwrap(), chrono::Duration::minutes(150));
    }
}
