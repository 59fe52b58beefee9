use agenda_core::{AgendaConfig, EventId};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use super::{WindowArgs, connect, load_event, parse_datetime};

/// Move an event, keeping its duration unless an end is given.
pub async fn run(
    config: &AgendaConfig,
    id: EventId,
    start: String,
    end: Option<String>,
    window: WindowArgs,
) -> Result<()> {
    let calendar = connect(config)?;
    let event = load_event(&calendar, id, &window, config).await?;

    let start = parse_datetime(&start)?;
    let end = match end {
        Some(end) => parse_datetime(&end)?,
        None => start + event.duration(),
    };

    let moved = calendar.mutations().move_event(id, start, end).await?;
    println!("  now starts {}", format_local(moved.start));
    Ok(())
}

pub async fn resize(config: &AgendaConfig, id: EventId, end: String, window: WindowArgs) -> Result<()> {
    let calendar = connect(config)?;
    load_event(&calendar, id, &window, config).await?;

    let resized = calendar.mutations().resize(id, parse_datetime(&end)?).await?;
    println!("  now ends {}", format_local(resized.end));
    Ok(())
}

fn format_local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%a %b %-d %H:%M").to_string()
}
