use agenda_core::{AgendaConfig, EventDraft};
use anyhow::Result;
use chrono::Duration;

use super::{EventFields, connect, parse_datetime, parse_duration};

pub async fn run(
    config: &AgendaConfig,
    title: String,
    start: String,
    end: Option<String>,
    duration: Option<String>,
    fields: EventFields,
) -> Result<()> {
    let start = parse_datetime(&start)?;
    let end = match (end, duration) {
        (Some(end), _) => parse_datetime(&end)?,
        (None, Some(duration)) => start + parse_duration(&duration)?,
        (None, None) => start + Duration::hours(1),
    };

    let mut draft = EventDraft::new(&title, start, end);
    draft.description = fields.description.filter(|d| !d.trim().is_empty());
    draft.recurrence = fields.repeat.unwrap_or_default();
    draft.reminder = fields.remind;
    draft.category_id = fields.category;

    let calendar = connect(config)?;
    let event = calendar.mutations().create(draft).await?;
    println!("  id {}", event.id);

    Ok(())
}
