//! One calendar view's worth of synchronized state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::category::{CategoryDirectory, Color};
use crate::error::AgendaResult;
use crate::event::{Event, EventId};
use crate::mutation::MutationEngine;
use crate::projection::{ListedEvent, ProjectedInstance, ViewProjection, list_masters, project};
use crate::service::{EventService, LogNotifier, Notifier};
use crate::store::EventStore;
use crate::window::{DEFAULT_DEBOUNCE, FetchWindow, WindowDescriptor};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub debounce: Duration,
    pub default_color: Color,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            debounce: DEFAULT_DEBOUNCE,
            default_color: Color::default(),
        }
    }
}

/// Owns the store, category directory, fetch window and mutation engine of
/// a calendar view. Every surface reads through these handles; none keeps a
/// private copy.
pub struct Calendar {
    service: Arc<dyn EventService>,
    store: EventStore,
    categories: CategoryDirectory,
    window: FetchWindow,
    mutations: MutationEngine,
    settings: SyncSettings,
}

impl Calendar {
    pub fn new(
        service: Arc<dyn EventService>,
        notifier: Arc<dyn Notifier>,
        settings: SyncSettings,
    ) -> Self {
        let store = EventStore::new();
        let categories = CategoryDirectory::new(service.clone());
        let window = FetchWindow::new(
            service.clone(),
            store.clone(),
            notifier.clone(),
            settings.debounce,
        );
        let mutations = MutationEngine::new(store.clone(), service.clone(), notifier);

        Calendar {
            service,
            store,
            categories,
            window,
            mutations,
            settings,
        }
    }

    /// A calendar that reports notices through the log.
    pub fn with_service(service: Arc<dyn EventService>) -> Self {
        Calendar::new(service, Arc::new(LogNotifier), SyncSettings::default())
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn categories(&self) -> &CategoryDirectory {
        &self.categories
    }

    pub fn window(&self) -> &FetchWindow {
        &self.window
    }

    pub fn mutations(&self) -> &MutationEngine {
        &self.mutations
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn view(&self) -> ViewProjection {
        ViewProjection::new(
            self.store.clone(),
            self.categories.clone(),
            self.window.clone(),
            self.settings.default_color.clone(),
        )
    }

    /// Debounced window change, see [`FetchWindow::set`].
    pub fn set_window(&self, descriptor: WindowDescriptor) -> bool {
        self.window.set(descriptor)
    }

    /// Load `descriptor` and the categories immediately and project them.
    ///
    /// Failing to load categories is not fatal; events then show in the
    /// default colour.
    pub async fn open(&self, descriptor: WindowDescriptor) -> AgendaResult<Vec<ProjectedInstance>> {
        let (events, categories) =
            tokio::join!(self.window.load(descriptor.clone()), self.categories.list());
        events?;
        if let Err(e) = categories {
            warn!(error = %e, "Could not load categories, using default colours");
        }

        Ok(project(
            &self.store,
            &self.categories.cached(),
            &descriptor,
            &self.settings.default_color,
        ))
    }

    /// Every event master with its category, regardless of the window.
    pub async fn all_events(&self) -> AgendaResult<Vec<ListedEvent>> {
        let (events, categories) =
            tokio::join!(self.service.list_masters(), self.categories.list());
        let categories = categories.unwrap_or_else(|e| {
            warn!(error = %e, "Could not load categories, listing events without them");
            Vec::new()
        });
        Ok(list_masters(events?, &categories))
    }

    /// Look up an event in the store, falling back to the full listing.
    ///
    /// An event found only in the listing is added to the store so it can be
    /// changed through [`Calendar::mutations`].
    pub async fn find_event(&self, id: EventId) -> AgendaResult<Option<Event>> {
        if let Some(event) = self.store.get(id) {
            return Ok(Some(event));
        }

        let found = self
            .service
            .list_masters()
            .await?
            .into_iter()
            .find(|e| e.id == id);
        if let Some(event) = &found {
            debug!(%id, "Event outside the window added to the store");
            self.store.upsert(event.clone());
        }
        Ok(found)
    }
}
