use agenda_core::{AgendaConfig, Event, EventDraft, EventId};
use anyhow::{Result, bail};

use super::{EventFields, WindowArgs, connect, load_event, parse_datetime};

/// Field changes requested on the command line.
#[derive(Debug, Default)]
pub struct Changes {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub fields: EventFields,
    pub no_reminder: bool,
    pub no_category: bool,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.fields.description.is_none()
            && self.fields.repeat.is_none()
            && self.fields.remind.is_none()
            && self.fields.category.is_none()
            && !self.no_reminder
            && !self.no_category
    }

    /// The full draft after applying these changes to `event`.
    ///
    /// A new start without a new end keeps the event's duration.
    fn apply(self, event: &Event) -> Result<EventDraft> {
        let mut draft = event.to_draft();

        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(start) = self.start {
            draft.start = parse_datetime(&start)?;
            draft.end = draft.start + event.duration();
        }
        if let Some(end) = self.end {
            draft.end = parse_datetime(&end)?;
        }
        if let Some(description) = self.fields.description {
            draft.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(repeat) = self.fields.repeat {
            draft.recurrence = repeat;
        }
        if self.no_reminder {
            draft.reminder = None;
        } else if let Some(reminder) = self.fields.remind {
            draft.reminder = Some(reminder);
        }
        if self.no_category {
            draft.category_id = None;
        } else if let Some(category) = self.fields.category {
            draft.category_id = Some(category);
        }

        Ok(draft)
    }
}

pub async fn run(config: &AgendaConfig, id: EventId, changes: Changes, window: WindowArgs) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to change. See `agenda edit --help` for the available options.");
    }

    let calendar = connect(config)?;
    let event = load_event(&calendar, id, &window, config).await?;
    let draft = changes.apply(&event)?;

    calendar.mutations().update(id, draft).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::{CategoryId, Recurrence, Reminder};
    use chrono::{Duration, TimeZone, Utc};

    fn review() -> Event {
        let start = Utc.with_ymd_and_hms(2025, 3, 20, 14, 0, 0).unwrap();
        let mut draft = EventDraft::new("Review", start, start + Duration::minutes(90));
        draft.reminder = Some("15m".parse::<Reminder>().unwrap());
        draft.category_id = Some(CategoryId(3));
        Event::from_draft(EventId::Saved(1), &draft)
    }

    #[test]
    fn test_new_start_keeps_duration() {
        let changes = Changes {
            start: Some("2025-03-21T10:00:00Z".into()),
            ..Default::default()
        };
        let draft = changes.apply(&review()).unwrap();

        assert_eq!(draft.start, Utc.with_ymd_and_hms(2025, 3, 21, 10, 0, 0).unwrap());
        assert_eq!(draft.end - draft.start, Duration::minutes(90));
        assert_eq!(draft.title, "Review");
    }

    #[test]
    fn test_clearing_flags() {
        let changes = Changes {
            no_reminder: true,
            no_category: true,
            fields: EventFields {
                repeat: Some(Recurrence::Weekly),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!changes.is_empty());

        let draft = changes.apply(&review()).unwrap();
        assert_eq!(draft.reminder, None);
        assert_eq!(draft.category_id, None);
        assert_eq!(draft.recurrence, Recurrence::Weekly);
    }

    #[test]
    fn test_no_changes() {
        assert!(Changes::default().is_empty());
    }
}
