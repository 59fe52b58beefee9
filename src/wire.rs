//! JSON shapes of the schedule service.
//!
//! The service speaks camelCase, uses `null` for "no recurrence" and sends a
//! reminder as two separate nullable fields. Everything is translated into
//! the core types here so nothing past this module sees those conventions.

use agenda_core::{
    AgendaError, AgendaResult, Category, CategoryId, Color, Event, EventId, EventPatch,
    FetchedEvent, Occurrence, Recurrence, Reminder, ReminderUnit,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event as the service returns it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub reminder_value: Option<u32>,
    #[serde(default)]
    pub reminder_unit: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Present when the service expanded recurrence itself.
    #[serde(default)]
    pub occurrence_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub occurrence_end: Option<DateTime<Utc>>,
}

impl EventRecord {
    pub fn into_event(self) -> AgendaResult<Event> {
        let recurrence = match self.recurrence.as_deref() {
            None | Some("") => Recurrence::None,
            Some(value) => value
                .parse()
                .map_err(|_| AgendaError::Serialization(format!("Unknown recurrence '{value}'")))?,
        };

        // A reminder with only one half present is no reminder at all.
        let reminder = match (self.reminder_value, self.reminder_unit.as_deref()) {
            (Some(value), Some(unit)) => unit
                .parse::<ReminderUnit>()
                .ok()
                .and_then(|unit| Reminder::new(value, unit).ok()),
            _ => None,
        };

        Ok(Event {
            id: EventId::Saved(self.id),
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            start: self.start_time,
            end: self.end_time,
            recurrence,
            reminder,
            category_id: self.category_id.map(CategoryId),
        })
    }

    pub fn into_fetched(self) -> AgendaResult<FetchedEvent> {
        let occurrence = match (self.occurrence_start, self.occurrence_end) {
            (Some(start), Some(end)) => Some(Occurrence { start, end }),
            _ => None,
        };
        Ok(FetchedEvent {
            event: self.into_event()?,
            occurrence,
        })
    }
}

/// Body of `POST /events` and `PUT /events/{id}`.
///
/// Absent fields are left out of the JSON; a cleared optional field is sent
/// as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Option<Recurrence>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_value: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_unit: Option<Option<ReminderUnit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<i64>>,
}

impl From<&EventPatch> for EventBody {
    fn from(patch: &EventPatch) -> Self {
        EventBody {
            title: patch.title.clone(),
            description: patch.description.clone(),
            start_time: patch.start,
            end_time: patch.end,
            recurrence: patch
                .recurrence
                .map(|r| r.is_recurring().then_some(r)),
            reminder_value: patch.reminder.map(|r| r.map(|r| r.value.get())),
            reminder_unit: patch.reminder.map(|r| r.map(|r| r.unit)),
            category_id: patch.category_id.map(|c| c.map(|c| c.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub color: String,
}

impl From<CategoryRecord> for Category {
    /// Malformed colours fall back to the default event colour.
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: CategoryId(record.id),
            name: record.name,
            color: Color::parse(&record.color).unwrap_or_default(),
        }
    }
}

/// Body of `POST /categories` and `PUT /categories/{id}`.
#[derive(Debug, Serialize)]
pub struct CategoryBody<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
