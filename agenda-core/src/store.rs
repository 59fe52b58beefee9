//! In-memory event store for the materialized window.
//!
//! The store holds exactly one record per event id. It also keeps the
//! registry of in-flight mutations, so the single-flight check and the
//! snapshot of the prior state happen under the same lock.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::date_range::DateRange;
use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, EventId, EventInstance, FetchedEvent, Occurrence};
use crate::recurrence;

/// Generation number of the fetch that filled the store.
pub type WindowId = u64;

/// Where the displayed occurrences of a record come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// Expanded locally from the master's recurrence.
    Local,
    /// Occurrences the service returned already expanded.
    Server(Vec<Occurrence>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event: Event,
    pub expansion: Expansion,
}

impl StoredEvent {
    fn local(event: Event) -> Self {
        StoredEvent {
            event,
            expansion: Expansion::Local,
        }
    }

    pub fn instances(&self, range: &DateRange) -> Vec<EventInstance> {
        match &self.expansion {
            Expansion::Local => recurrence::expand(&self.event, range),
            Expansion::Server(occurrences) => occurrences
                .iter()
                .filter(|o| range.contains(o.start))
                .map(|o| EventInstance::new(&self.event, *o))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Move,
    Delete,
}

/// A mutation applied locally and awaiting the service.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub target: EventId,
    pub kind: MutationKind,
    /// Record as it was before the mutation; `None` for creates.
    pub prior: Option<StoredEvent>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    window: Option<WindowId>,
    entries: HashMap<EventId, StoredEvent>,
    pending: HashMap<EventId, PendingMutation>,
}

/// Shared handle to the event store. Clones see the same data.
#[derive(Clone)]
pub struct EventStore {
    state: Arc<Mutex<StoreState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        EventStore {
            state: Arc::new(Mutex::new(StoreState::default())),
            revision: Arc::new(revision),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver that observes every change to the stored records.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Swap in the records of a freshly fetched window.
    ///
    /// Ids with a pending mutation keep their local state (or stay absent
    /// for a pending delete) whatever the fetch returned.
    pub fn replace(&self, window: WindowId, fetched: Vec<FetchedEvent>) {
        {
            let mut state = self.state();
            let mut entries: HashMap<EventId, StoredEvent> = HashMap::new();

            for record in fetched {
                let id = record.event.id;
                if state.pending.contains_key(&id) {
                    continue;
                }
                match (entries.entry(id), record.occurrence) {
                    (Entry::Vacant(slot), None) => {
                        slot.insert(StoredEvent::local(record.event));
                    }
                    (Entry::Vacant(slot), Some(occurrence)) => {
                        slot.insert(StoredEvent {
                            event: record.event,
                            expansion: Expansion::Server(vec![occurrence]),
                        });
                    }
                    (Entry::Occupied(mut slot), None) => {
                        // A master in the listing wins over its server occurrences.
                        *slot.get_mut() = StoredEvent::local(record.event);
                    }
                    (Entry::Occupied(mut slot), Some(occurrence)) => {
                        if let Expansion::Server(occurrences) = &mut slot.get_mut().expansion {
                            occurrences.push(occurrence);
                        }
                    }
                }
            }

            for entry in entries.values_mut() {
                if let Expansion::Server(occurrences) = &mut entry.expansion {
                    occurrences.sort_by_key(|o| o.start);
                    occurrences.dedup();
                }
            }

            let pending: Vec<EventId> = state.pending.keys().copied().collect();
            for id in pending {
                if let Some(local) = state.entries.get(&id) {
                    entries.insert(id, local.clone());
                }
            }

            debug!(window, count = entries.len(), "Event store replaced");
            state.entries = entries;
            state.window = Some(window);
        }
        self.bump();
    }

    /// Window the current records were fetched for.
    pub fn window(&self) -> Option<WindowId> {
        self.state().window
    }

    /// Insert or fully replace a record.
    pub fn upsert(&self, event: Event) {
        self.state()
            .entries
            .insert(event.id, StoredEvent::local(event));
        self.bump();
    }

    pub fn remove(&self, id: EventId) -> Option<Event> {
        let removed = self.state().entries.remove(&id).map(|e| e.event);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    pub fn get(&self, id: EventId) -> Option<Event> {
        self.state().entries.get(&id).map(|e| e.event.clone())
    }

    pub fn entry(&self, id: EventId) -> Option<StoredEvent> {
        self.state().entries.get(&id).cloned()
    }

    /// All records, ordered by start then id.
    pub fn entries(&self) -> Vec<StoredEvent> {
        let mut entries: Vec<StoredEvent> = self.state().entries.values().cloned().collect();
        entries.sort_by(|a, b| (a.event.start, a.event.id).cmp(&(b.event.start, b.event.id)));
        entries
    }

    /// All master events, ordered by start then id.
    pub fn list(&self) -> Vec<Event> {
        self.entries().into_iter().map(|e| e.event).collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Displayed instances within `range`, ordered by occurrence start then id.
    pub fn instances(&self, range: &DateRange) -> Vec<EventInstance> {
        let mut instances: Vec<EventInstance> = self
            .state()
            .entries
            .values()
            .flat_map(|entry| entry.instances(range))
            .collect();
        instances.sort_by(|a, b| (a.occurrence_start, a.id()).cmp(&(b.occurrence_start, b.id())));
        instances
    }

    /// Register a mutation on `target`.
    ///
    /// Fails with `MutationInProgress` if another one is in flight, and with
    /// `EventNotFound` if a non-create mutation targets an unknown id.
    pub fn begin_mutation(&self, target: EventId, kind: MutationKind) -> AgendaResult<PendingGuard> {
        let mut state = self.state();

        if state.pending.contains_key(&target) {
            return Err(AgendaError::MutationInProgress(target));
        }

        let prior = state.entries.get(&target).cloned();
        if prior.is_none() && kind != MutationKind::Create {
            return Err(AgendaError::EventNotFound(target));
        }

        state.pending.insert(
            target,
            PendingMutation {
                target,
                kind,
                prior: prior.clone(),
                submitted_at: Utc::now(),
            },
        );

        Ok(PendingGuard {
            store: self.clone(),
            target,
            prior,
        })
    }

    pub fn pending(&self, id: EventId) -> Option<PendingMutation> {
        self.state().pending.get(&id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    fn restore(&self, target: EventId, prior: Option<StoredEvent>) {
        {
            let mut state = self.state();
            match prior {
                Some(entry) => {
                    state.entries.insert(target, entry);
                }
                None => {
                    state.entries.remove(&target);
                }
            }
        }
        self.bump();
    }
}

/// Marks a mutation as in flight. Dropping it releases the event id.
pub struct PendingGuard {
    store: EventStore,
    target: EventId,
    prior: Option<StoredEvent>,
}

impl PendingGuard {
    pub fn target(&self) -> EventId {
        self.target
    }

    /// The event as it was when the mutation began.
    pub fn prior(&self) -> Option<&Event> {
        self.prior.as_ref().map(|entry| &entry.event)
    }

    /// Put the record back exactly as it was when the mutation began.
    pub fn rollback(mut self) {
        let prior = self.prior.take();
        debug!(id = %self.target, "Rolling back optimistic change");
        self.store.restore(self.target, prior);
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.store.state().pending.remove(&self.target);
    }
}
