//! In-memory service and notifier used by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, oneshot};

use crate::category::{Category, CategoryId, Color};
use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, EventDraft, EventId, EventPatch, FetchedEvent};
use crate::recurrence;
use crate::service::{EventQuery, EventService, Notice, NoticeLevel, Notifier};

#[derive(Default)]
struct FakeState {
    events: Vec<Event>,
    categories: Vec<Category>,
    in_use: HashSet<CategoryId>,
    next_id: i64,
    failures: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    queries: Vec<EventQuery>,
    patches: Vec<(EventId, EventPatch)>,
    server_expansion: bool,
}

/// Blocks the next service call until released.
pub struct Hold {
    release: oneshot::Sender<()>,
    entered: Arc<Notify>,
}

impl Hold {
    /// Resolves once the held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Scripted stand-in for the remote schedule service.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
    holds: Mutex<VecDeque<(oneshot::Receiver<()>, Arc<Notify>)>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeService::default())
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_event(&self, draft: EventDraft) -> Event {
        let mut state = self.state();
        state.next_id += 1;
        let event = Event::from_draft(EventId::Saved(state.next_id), &draft);
        state.events.push(event.clone());
        event
    }

    pub fn add_category(&self, name: &str, color: &str) -> Category {
        let mut state = self.state();
        state.next_id += 1;
        let category = Category {
            id: CategoryId(state.next_id),
            name: name.to_string(),
            color: Color::parse(color).unwrap(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn mark_category_in_use(&self, id: CategoryId) {
        self.state().in_use.insert(id);
    }

    /// Drop an event server-side without the client knowing.
    pub fn forget_event(&self, id: EventId) {
        self.state().events.retain(|e| e.id != id);
    }

    pub fn server_event(&self, id: EventId) -> Option<Event> {
        self.state().events.iter().find(|e| e.id == id).cloned()
    }

    /// Return expanded occurrences instead of masters from `list_events`.
    pub fn expand_server_side(&self) {
        self.state().server_expansion = true;
    }

    /// Make the next call of `operation` fail.
    pub fn fail_next(&self, operation: &'static str) {
        self.state().failures.insert(operation);
    }

    /// Hold the next call of any operation until the returned hold is released.
    pub fn hold(&self) -> Hold {
        let (release, receiver) = oneshot::channel();
        let entered = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((receiver, entered.clone()));
        Hold { release, entered }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.state().queries.clone()
    }

    pub fn patches(&self) -> Vec<(EventId, EventPatch)> {
        self.state().patches.clone()
    }

    async fn enter(&self, operation: &'static str) -> AgendaResult<()> {
        *self.state().calls.entry(operation).or_default() += 1;

        let hold = self
            .holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some((receiver, entered)) = hold {
            entered.notify_one();
            let _ = receiver.await;
        }

        if self.state().failures.remove(operation) {
            return Err(AgendaError::Remote(format!("{operation} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl EventService for FakeService {
    async fn list_events(&self, query: &EventQuery) -> AgendaResult<Vec<FetchedEvent>> {
        self.enter("list_events").await?;
        let mut state = self.state();
        state.queries.push(query.clone());

        let needle = query.search.as_deref().map(str::to_lowercase);
        let matching = state.events.iter().filter(|e| {
            query.category.is_none_or(|c| e.category_id == Some(c))
                && needle
                    .as_deref()
                    .is_none_or(|n| e.title.to_lowercase().contains(n))
        });

        let mut records = Vec::new();
        for event in matching {
            let instances = recurrence::expand(event, &query.range);
            if state.server_expansion {
                records.extend(instances.into_iter().map(|i| FetchedEvent {
                    event: event.clone(),
                    occurrence: Some(crate::event::Occurrence {
                        start: i.occurrence_start,
                        end: i.occurrence_end,
                    }),
                }));
            } else if !instances.is_empty() {
                records.push(FetchedEvent::from(event.clone()));
            }
        }
        Ok(records)
    }

    async fn list_masters(&self) -> AgendaResult<Vec<Event>> {
        self.enter("list_masters").await?;
        Ok(self.state().events.clone())
    }

    async fn create_event(&self, draft: &EventDraft) -> AgendaResult<Event> {
        self.enter("create_event").await?;
        Ok(self.add_event(draft.clone()))
    }

    async fn update_event(&self, id: EventId, patch: &EventPatch) -> AgendaResult<Event> {
        self.enter("update_event").await?;
        let mut state = self.state();
        state.patches.push((id, patch.clone()));
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AgendaError::EventNotFound(id))?;
        *event = event.apply(patch);
        Ok(event.clone())
    }

    async fn delete_event(&self, id: EventId) -> AgendaResult<()> {
        self.enter("delete_event").await?;
        let mut state = self.state();
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(AgendaError::EventNotFound(id));
        }
        Ok(())
    }

    async fn list_categories(&self) -> AgendaResult<Vec<Category>> {
        self.enter("list_categories").await?;
        Ok(self.state().categories.clone())
    }

    async fn create_category(&self, name: &str, color: &Color) -> AgendaResult<Category> {
        self.enter("create_category").await?;
        Ok(self.add_category(name, color.as_str()))
    }

    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        color: &Color,
    ) -> AgendaResult<Category> {
        self.enter("update_category").await?;
        let mut state = self.state();
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AgendaError::CategoryNotFound(id))?;
        category.name = name.to_string();
        category.color = color.clone();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> AgendaResult<()> {
        self.enter("delete_category").await?;
        let mut state = self.state();
        if state.in_use.contains(&id) {
            return Err(AgendaError::CategoryInUse(id));
        }
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        if state.categories.len() == before {
            return Err(AgendaError::CategoryNotFound(id));
        }
        for event in state.events.iter_mut().filter(|e| e.category_id == Some(id)) {
            event.category_id = None;
        }
        Ok(())
    }
}

/// Notifier that keeps every notice for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingNotifier::default())
    }

    pub fn errors(&self) -> Vec<Notice> {
        self.with_level(NoticeLevel::Error)
    }

    pub fn successes(&self) -> Vec<Notice> {
        self.with_level(NoticeLevel::Success)
    }

    fn with_level(&self, level: NoticeLevel) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.level == level)
            .cloned()
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
