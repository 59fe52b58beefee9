//! Optimistic mutations.
//!
//! Every change is applied to the store before the service is called, then
//! either confirmed or rolled back to the exact prior record. At most one
//! mutation per event id is in flight; a second one is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{AgendaError, AgendaResult};
use crate::event::{Event, EventDraft, EventId, EventPatch, validate_times};
use crate::service::{EventService, Notice, Notifier};
use crate::store::{EventStore, MutationKind, PendingGuard};

#[derive(Clone)]
pub struct MutationEngine {
    store: EventStore,
    service: Arc<dyn EventService>,
    notifier: Arc<dyn Notifier>,
}

impl MutationEngine {
    pub fn new(store: EventStore, service: Arc<dyn EventService>, notifier: Arc<dyn Notifier>) -> Self {
        MutationEngine {
            store,
            service,
            notifier,
        }
    }

    /// Create an event. It shows up in the store under a temporary id right
    /// away and is re-keyed to the server id once confirmed.
    pub async fn create(&self, draft: EventDraft) -> AgendaResult<Event> {
        draft.validate()?;

        let temporary = EventId::temporary();
        let guard = self.store.begin_mutation(temporary, MutationKind::Create)?;
        self.store.upsert(Event::from_draft(temporary, &draft));
        debug!(id = %temporary, "Event created locally");

        match self.service.create_event(&draft).await {
            Ok(confirmed) => {
                self.store.remove(temporary);
                self.store.upsert(confirmed.clone());
                drop(guard);
                debug!(from = %temporary, to = %confirmed.id, "Event creation confirmed");
                self.notifier
                    .notify(Notice::success(format!("Created \"{}\"", confirmed.title)));
                Ok(confirmed)
            }
            Err(e) => Err(self.fail(guard, "create", &draft.title, e)),
        }
    }

    /// Replace every editable field of an event.
    pub async fn update(&self, id: EventId, draft: EventDraft) -> AgendaResult<Event> {
        draft.validate()?;

        let guard = self.store.begin_mutation(id, MutationKind::Update)?;
        let updated = Event::from_draft(id, &draft);
        self.store.upsert(updated.clone());

        match self.service.update_event(id, &EventPatch::from(&draft)).await {
            Ok(_) => {
                drop(guard);
                self.notifier
                    .notify(Notice::success(format!("Updated \"{}\"", updated.title)));
                Ok(updated)
            }
            Err(e) => Err(self.fail(guard, "update", &draft.title, e)),
        }
    }

    /// Move an event to new times. Only the time fields change.
    pub async fn move_event(
        &self,
        id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AgendaResult<Event> {
        self.retime(id, start, end, "move", "Moved").await
    }

    /// Change only the end of an event.
    pub async fn resize(&self, id: EventId, end: DateTime<Utc>) -> AgendaResult<Event> {
        let current = self.store.get(id).ok_or(AgendaError::EventNotFound(id))?;
        self.retime(id, current.start, end, "resize", "Resized").await
    }

    async fn retime(
        &self,
        id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        action: &str,
        done: &str,
    ) -> AgendaResult<Event> {
        validate_times(start, end)?;

        let guard = self.store.begin_mutation(id, MutationKind::Move)?;
        let moved = guard
            .prior()
            .map(|current| current.with_times(start, end))
            .ok_or(AgendaError::EventNotFound(id))?;
        self.store.upsert(moved.clone());

        match self.service.update_event(id, &EventPatch::times(start, end)).await {
            Ok(_) => {
                drop(guard);
                self.notifier
                    .notify(Notice::success(format!("{done} \"{}\"", moved.title)));
                Ok(moved)
            }
            Err(e) => Err(self.fail(guard, action, &moved.title, e)),
        }
    }

    /// Delete an event and, for recurring ones, all of its occurrences.
    pub async fn delete(&self, id: EventId) -> AgendaResult<()> {
        let guard = self.store.begin_mutation(id, MutationKind::Delete)?;
        let title = guard.prior().map(|e| e.title.clone()).unwrap_or_default();
        self.store.remove(id);

        match self.service.delete_event(id).await {
            Ok(()) => {
                drop(guard);
                self.notifier.notify(Notice::success(format!("Deleted \"{title}\"")));
                Ok(())
            }
            Err(e) => Err(self.fail(guard, "delete", &title, e)),
        }
    }

    fn fail(&self, guard: PendingGuard, action: &str, title: &str, error: AgendaError) -> AgendaError {
        warn!(id = %guard.target(), action, error = %error, "Service rejected change, rolling back");
        guard.rollback();
        self.notifier
            .notify(Notice::error(format!("Could not {action} \"{title}\": {error}")));
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Recurrence;
    use crate::testing::{FakeService, RecordingNotifier};
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    fn standup() -> EventDraft {
        let mut draft = EventDraft::new("Standup", at(9, 0), at(9, 15));
        draft.recurrence = Recurrence::Daily;
        draft
    }

    struct Fixture {
        service: Arc<FakeService>,
        notifier: Arc<RecordingNotifier>,
        store: EventStore,
        engine: MutationEngine,
    }

    fn fixture() -> Fixture {
        let service = FakeService::new();
        let notifier = RecordingNotifier::new();
        let store = EventStore::new();
        let engine = MutationEngine::new(store.clone(), service.clone(), notifier.clone());
        Fixture {
            service,
            notifier,
            store,
            engine,
        }
    }

    /// Seed an event both on the server and in the store.
    fn seeded(f: &Fixture) -> Event {
        let event = f.service.add_event(EventDraft::new("Review", at(14, 0), at(15, 0)));
        f.store.upsert(event.clone());
        event
    }

    #[tokio::test]
    async fn test_create_is_visible_before_confirmation() {
        let f = fixture();
        let hold = f.service.hold();

        let engine = f.engine.clone();
        let task = tokio::spawn(async move { engine.create(standup()).await });
        hold.entered().await;

        let provisional = f.store.list();
        assert_eq!(provisional.len(), 1);
        assert!(provisional[0].id.is_temporary());
        assert_eq!(provisional[0].title, "Standup");
        assert_eq!(
            f.store.pending(provisional[0].id).unwrap().kind,
            MutationKind::Create
        );

        hold.release();
        let confirmed = task.await.unwrap().unwrap();

        let stored = f.store.list();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, confirmed.id);
        assert!(!confirmed.id.is_temporary());
        assert_eq!(stored[0].to_draft(), provisional[0].to_draft());
        assert_eq!(f.store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing_behind() {
        let f = fixture();
        f.service.fail_next("create_event");

        let err = f.engine.create(standup()).await.unwrap_err();

        assert!(matches!(err, AgendaError::Remote(_)));
        assert!(f.store.is_empty());
        assert_eq!(f.store.pending_count(), 0);
        assert_eq!(f.notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_is_never_submitted() {
        let f = fixture();
        let err = f
            .engine
            .create(EventDraft::new("Standup", at(9, 15), at(9, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, AgendaError::Validation(_)));
        assert!(f.store.is_empty());
        assert_eq!(f.service.calls("create_event"), 0);
    }

    #[tokio::test]
    async fn test_update_applies_immediately() {
        let f = fixture();
        let event = seeded(&f);
        let hold = f.service.hold();

        let mut draft = event.to_draft();
        draft.title = "Design review".into();
        let engine = f.engine.clone();
        let id = event.id;
        let task = tokio::spawn(async move { engine.update(id, draft).await });
        hold.entered().await;

        assert_eq!(f.store.get(event.id).unwrap().title, "Design review");
        hold.release();
        task.await.unwrap().unwrap();
        assert_eq!(f.store.get(event.id).unwrap().title, "Design review");
        assert_eq!(f.service.server_event(event.id).unwrap().title, "Design review");
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back_exactly() {
        let f = fixture();
        let event = seeded(&f);
        let before = f.store.entries();
        f.service.fail_next("update_event");

        let mut draft = event.to_draft();
        draft.title = "Design review".into();
        draft.description = Some("Bring slides".into());
        assert!(f.engine.update(event.id, draft).await.is_err());

        assert_eq!(f.store.entries(), before);
        assert_eq!(f.store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_move_rolls_back_exactly() {
        let f = fixture();
        let event = seeded(&f);
        let before = f.store.entries();
        f.service.fail_next("update_event");

        let result = f.engine.move_event(event.id, at(16, 0), at(17, 0)).await;

        assert!(result.is_err());
        assert_eq!(f.store.entries(), before);
    }

    #[tokio::test]
    async fn test_move_only_sends_times() {
        let f = fixture();
        let event = seeded(&f);

        let moved = f.engine.move_event(event.id, at(16, 0), at(17, 0)).await.unwrap();

        assert_eq!(moved.title, event.title);
        assert_eq!(moved.start, at(16, 0));
        assert_eq!(
            f.service.patches(),
            vec![(event.id, EventPatch::times(at(16, 0), at(17, 0)))]
        );
    }

    #[tokio::test]
    async fn test_resize_keeps_start() {
        let f = fixture();
        let event = seeded(&f);

        let resized = f.engine.resize(event.id, at(16, 30)).await.unwrap();

        assert_eq!(resized.start, event.start);
        assert_eq!(resized.end, at(16, 30));
        assert_eq!(resized.duration(), Duration::minutes(150));
        assert!(f.engine.resize(event.id, at(13, 0)).await.is_err());
    }

    #[tokio::test]
    async fn test_every_confirmed_change_is_announced() {
        let f = fixture();
        let event = seeded(&f);

        f.engine.move_event(event.id, at(16, 0), at(17, 0)).await.unwrap();
        f.engine.resize(event.id, at(17, 30)).await.unwrap();
        f.engine.delete(event.id).await.unwrap();

        let messages: Vec<_> = f.notifier.successes().into_iter().map(|n| n.message).collect();
        assert_eq!(
            messages,
            vec!["Moved \"Review\"", "Resized \"Review\"", "Deleted \"Review\""]
        );
        assert!(f.notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_failed_delete() {
        let f = fixture();
        let event = seeded(&f);
        let before = f.store.entries();

        f.service.fail_next("delete_event");
        assert!(f.engine.delete(event.id).await.is_err());
        assert_eq!(f.store.entries(), before);

        f.engine.delete(event.id).await.unwrap();
        assert!(f.store.is_empty());
        assert!(f.service.server_event(event.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_of_already_removed_event_restores_it() {
        let f = fixture();
        let event = seeded(&f);
        f.service.forget_event(event.id);

        let err = f.engine.delete(event.id).await.unwrap_err();

        assert_eq!(err, AgendaError::EventNotFound(event.id));
        assert_eq!(f.store.get(event.id), Some(event));
    }

    #[tokio::test]
    async fn test_second_mutation_on_same_id_is_rejected() {
        let f = fixture();
        let event = seeded(&f);
        let hold = f.service.hold();

        let engine = f.engine.clone();
        let id = event.id;
        let first = tokio::spawn(async move { engine.move_event(id, at(16, 0), at(17, 0)).await });
        hold.entered().await;

        let mut draft = event.to_draft();
        draft.title = "Renamed".into();
        let second = f.engine.update(event.id, draft).await;
        assert_eq!(second.unwrap_err(), AgendaError::MutationInProgress(event.id));
        assert_eq!(f.service.calls("update_event"), 1);

        hold.release();
        let moved = first.await.unwrap().unwrap();
        assert_eq!(f.store.get(event.id), Some(moved));
        assert_eq!(f.store.get(event.id).unwrap().title, "Review");
    }

    #[tokio::test]
    async fn test_mutating_unknown_event_fails_locally() {
        let f = fixture();
        let id = EventId::Saved(99);

        assert_eq!(
            f.engine.delete(id).await.unwrap_err(),
            AgendaError::EventNotFound(id)
        );
        assert_eq!(
            f.engine.move_event(id, at(9, 0), at(10, 0)).await.unwrap_err(),
            AgendaError::EventNotFound(id)
        );
        assert_eq!(f.service.calls("delete_event"), 0);
    }
}
