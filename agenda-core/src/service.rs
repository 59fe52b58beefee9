//! Boundary with the remote schedule service and the notification surface.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::category::{Category, CategoryId, Color};
use crate::date_range::DateRange;
use crate::error::AgendaResult;
use crate::event::{Event, EventDraft, EventId, EventPatch, FetchedEvent};
use crate::window::WindowDescriptor;

/// Parameters of an event listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub range: DateRange,
    pub category: Option<CategoryId>,
    pub search: Option<String>,
}

impl From<&WindowDescriptor> for EventQuery {
    fn from(descriptor: &WindowDescriptor) -> Self {
        let search = descriptor.search.trim();
        EventQuery {
            range: descriptor.range,
            category: descriptor.category.category(),
            search: (!search.is_empty()).then(|| search.to_string()),
        }
    }
}

/// The remote source of truth for events and categories.
///
/// Every call may fail; callers treat any error as "the request did not
/// happen". Transport concerns (sessions, base URLs, timeouts) live in the
/// implementation.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Events in the query window. May return masters, pre-expanded
    /// occurrences, or a mix of both.
    async fn list_events(&self, query: &EventQuery) -> AgendaResult<Vec<FetchedEvent>>;

    /// Every event master, unexpanded and without a date range.
    async fn list_masters(&self) -> AgendaResult<Vec<Event>>;

    async fn create_event(&self, draft: &EventDraft) -> AgendaResult<Event>;

    async fn update_event(&self, id: EventId, patch: &EventPatch) -> AgendaResult<Event>;

    /// Fails with `EventNotFound` if the event is already gone.
    async fn delete_event(&self, id: EventId) -> AgendaResult<()>;

    async fn list_categories(&self) -> AgendaResult<Vec<Category>>;

    async fn create_category(&self, name: &str, color: &Color) -> AgendaResult<Category>;

    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        color: &Color,
    ) -> AgendaResult<Category>;

    /// Fails with `CategoryInUse` if events still reference the category.
    async fn delete_category(&self, id: CategoryId) -> AgendaResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing, non-fatal message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Where notices go. A GUI shows toasts; the default only logs.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("{}", notice.message),
            NoticeLevel::Error => warn!("{}", notice.message),
        }
    }
}
