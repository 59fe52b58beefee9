//! Event types shared by the store, the expander and the service boundary.
//!
//! Optional fields are modelled as `Option` and recurrence as an explicit enum,
//! so there is no "none" sentinel anywhere in the core. Wire formats that use
//! sentinels translate at the transport edge.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::CategoryId;
use crate::error::{AgendaError, AgendaResult};

/// Identifier of an event.
///
/// An event carries a temporary id while its creation is in flight and the
/// server-assigned one once the server has confirmed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Saved(i64),
    Temporary(Uuid),
}

impl EventId {
    pub fn temporary() -> Self {
        EventId::Temporary(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EventId::Temporary(_))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Saved(id) => write!(f, "{id}"),
            EventId::Temporary(uuid) => write!(f, "tmp-{uuid}"),
        }
    }
}

impl FromStr for EventId {
    type Err = AgendaError;

    fn from_str(s: &str) -> AgendaResult<Self> {
        if let Some(rest) = s.strip_prefix("tmp-") {
            return Uuid::parse_str(rest)
                .map(EventId::Temporary)
                .map_err(|_| AgendaError::Validation(format!("Invalid event id '{s}'")));
        }
        s.parse::<i64>()
            .map(EventId::Saved)
            .map_err(|_| AgendaError::Validation(format!("Invalid event id '{s}'")))
    }
}

/// How a master event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for Recurrence {
    type Err = AgendaError;

    fn from_str(s: &str) -> AgendaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Recurrence::None),
            "daily" => Ok(Recurrence::Daily),
            "weekly" => Ok(Recurrence::Weekly),
            "monthly" => Ok(Recurrence::Monthly),
            _ => Err(AgendaError::Validation(format!(
                "Unknown recurrence '{s}'. Expected none, daily, weekly or monthly"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderUnit {
    Minutes,
    Hours,
    Days,
}

impl ReminderUnit {
    fn seconds(self) -> u64 {
        match self {
            ReminderUnit::Minutes => 60,
            ReminderUnit::Hours => 60 * 60,
            ReminderUnit::Days => 24 * 60 * 60,
        }
    }
}

impl FromStr for ReminderUnit {
    type Err = AgendaError;

    fn from_str(s: &str) -> AgendaResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minutes" => Ok(ReminderUnit::Minutes),
            "hours" => Ok(ReminderUnit::Hours),
            "days" => Ok(ReminderUnit::Days),
            _ => Err(AgendaError::Validation(format!("Unknown reminder unit '{s}'"))),
        }
    }
}

/// A reminder some time before the event starts.
///
/// Value and unit always travel together; a reminder is either fully
/// present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reminder {
    pub value: NonZeroU32,
    pub unit: ReminderUnit,
}

impl Reminder {
    pub fn new(value: u32, unit: ReminderUnit) -> AgendaResult<Self> {
        let value = NonZeroU32::new(value).ok_or_else(|| {
            AgendaError::Validation("Reminder value must be a positive number".into())
        })?;
        Ok(Reminder { value, unit })
    }

    /// How long before the start the reminder fires.
    pub fn offset(&self) -> Duration {
        Duration::seconds((u64::from(self.value.get()) * self.unit.seconds()) as i64)
    }

    /// Pick the largest unit that represents `duration` exactly.
    pub fn from_duration(duration: std::time::Duration) -> AgendaResult<Self> {
        let secs = duration.as_secs();
        if secs == 0 || duration.subsec_nanos() != 0 || secs % 60 != 0 {
            return Err(AgendaError::Validation(format!(
                "Reminder must be a whole number of minutes, got {}",
                humantime::format_duration(duration)
            )));
        }

        let unit = [ReminderUnit::Days, ReminderUnit::Hours, ReminderUnit::Minutes]
            .into_iter()
            .find(|unit| secs % unit.seconds() == 0)
            .unwrap_or(ReminderUnit::Minutes);

        let value = u32::try_from(secs / unit.seconds())
            .map_err(|_| AgendaError::Validation("Reminder is too far ahead".into()))?;
        Reminder::new(value, unit)
    }
}

impl FromStr for Reminder {
    type Err = AgendaError;

    /// Parse human durations such as `15m`, `2h` or `1day`.
    fn from_str(s: &str) -> AgendaResult<Self> {
        let duration = humantime::parse_duration(s)
            .map_err(|e| AgendaError::Validation(format!("Invalid reminder '{s}': {e}")))?;
        Reminder::from_duration(duration)
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            ReminderUnit::Minutes => "minutes",
            ReminderUnit::Hours => "hours",
            ReminderUnit::Days => "days",
        };
        write!(f, "{} {} before", self.value, unit)
    }
}

/// A master event as the user edits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub reminder: Option<Reminder>,
    pub category_id: Option<CategoryId>,
}

impl Event {
    pub fn from_draft(id: EventId, draft: &EventDraft) -> Self {
        Event {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            start: draft.start,
            end: draft.end,
            recurrence: draft.recurrence,
            reminder: draft.reminder,
            category_id: draft.category_id,
        }
    }

    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            start: self.start,
            end: self.end,
            recurrence: self.recurrence,
            reminder: self.reminder,
            category_id: self.category_id,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Copy of this event with only the time fields replaced.
    pub fn with_times(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            start,
            end,
            ..self.clone()
        }
    }

    /// Apply the fields present in `patch` on top of this event.
    pub fn apply(&self, patch: &EventPatch) -> Event {
        let mut event = self.clone();
        if let Some(title) = &patch.title {
            event.title = title.clone();
        }
        if let Some(description) = &patch.description {
            event.description = description.clone();
        }
        if let Some(start) = patch.start {
            event.start = start;
        }
        if let Some(end) = patch.end {
            event.end = end;
        }
        if let Some(recurrence) = patch.recurrence {
            event.recurrence = recurrence;
        }
        if let Some(reminder) = patch.reminder {
            event.reminder = reminder;
        }
        if let Some(category_id) = patch.category_id {
            event.category_id = category_id;
        }
        event
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Input for creating or fully updating an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub reminder: Option<Reminder>,
    pub category_id: Option<CategoryId>,
}

impl EventDraft {
    pub fn new(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        EventDraft {
            title: title.to_string(),
            description: None,
            start,
            end,
            recurrence: Recurrence::None,
            reminder: None,
            category_id: None,
        }
    }

    /// Checks run before anything touches the store or the network.
    pub fn validate(&self) -> AgendaResult<()> {
        if self.title.trim().is_empty() {
            return Err(AgendaError::Validation("Title is required".into()));
        }
        validate_times(self.start, self.end)
    }
}

pub(crate) fn validate_times(start: DateTime<Utc>, end: DateTime<Utc>) -> AgendaResult<()> {
    if end <= start {
        return Err(AgendaError::Validation(
            "End time must be after start time".into(),
        ));
    }
    Ok(())
}

/// Partial update sent to the service.
///
/// Outer `None` leaves a field untouched; for optional fields an inner `None`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,
    pub reminder: Option<Option<Reminder>>,
    pub category_id: Option<Option<CategoryId>>,
}

impl EventPatch {
    /// A move or resize: only the time fields change.
    pub fn times(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        EventPatch {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }
}

impl From<&EventDraft> for EventPatch {
    fn from(draft: &EventDraft) -> Self {
        EventPatch {
            title: Some(draft.title.clone()),
            description: Some(draft.description.clone()),
            start: Some(draft.start),
            end: Some(draft.end),
            recurrence: Some(draft.recurrence),
            reminder: Some(draft.reminder),
            category_id: Some(draft.category_id),
        }
    }
}

/// Start and end of one concrete occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A displayed occurrence of a master event. Never stored or edited directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventInstance {
    pub event: Event,
    pub occurrence_start: DateTime<Utc>,
    pub occurrence_end: DateTime<Utc>,
}

impl EventInstance {
    pub fn new(event: &Event, occurrence: Occurrence) -> Self {
        EventInstance {
            event: event.clone(),
            occurrence_start: occurrence.start,
            occurrence_end: occurrence.end,
        }
    }

    pub fn id(&self) -> EventId {
        self.event.id
    }
}

/// One record of an event listing.
///
/// Services that expand recurrence themselves attach the concrete occurrence;
/// services that return masters leave it empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedEvent {
    pub event: Event,
    pub occurrence: Option<Occurrence>,
}

impl From<Event> for FetchedEvent {
    fn from(event: Event) -> Self {
        FetchedEvent {
            event,
            occurrence: None,
        }
    }
}
