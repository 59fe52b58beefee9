//! Fetch window management.
//!
//! The window descriptor says which events should be materialized. Changes
//! are debounced; only the descriptor still current when the timer fires is
//! fetched, and a response that arrives after the descriptor moved on is
//! dropped instead of applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::category::CategoryFilter;
use crate::date_range::DateRange;
use crate::error::{AgendaError, AgendaResult};
use crate::service::{EventQuery, EventService, Notice, Notifier};
use crate::store::{EventStore, WindowId};

/// Default delay between the last descriptor change and the fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// What is currently loaded: a date range plus display filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowDescriptor {
    pub range: DateRange,
    pub category: CategoryFilter,
    pub search: String,
}

impl WindowDescriptor {
    pub fn new(range: DateRange) -> Self {
        WindowDescriptor {
            range,
            category: CategoryFilter::All,
            search: String::new(),
        }
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.search = search.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Idle,
    Debouncing,
    Fetching,
}

/// Summary handed to `on_landed` subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchLanded {
    pub window: WindowId,
    pub descriptor: WindowDescriptor,
    pub records: usize,
}

type LandedCallback = Box<dyn Fn(&FetchLanded) + Send + Sync>;

struct WindowState {
    descriptor: Option<WindowDescriptor>,
    generation: WindowId,
    phase: WindowPhase,
    // The last fetch of the current descriptor failed.
    failed: bool,
}

/// Decides when to (re)fetch and applies only the freshest result.
#[derive(Clone)]
pub struct FetchWindow {
    service: Arc<dyn EventService>,
    store: EventStore,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    state: Arc<Mutex<WindowState>>,
    callbacks: Arc<Mutex<Vec<LandedCallback>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl FetchWindow {
    pub fn new(
        service: Arc<dyn EventService>,
        store: EventStore,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        FetchWindow {
            service,
            store,
            notifier,
            debounce,
            state: Arc::new(Mutex::new(WindowState {
                descriptor: None,
                generation: 0,
                phase: WindowPhase::Idle,
                failed: false,
            })),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            revision: Arc::new(revision),
        }
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_descriptor(&self) -> Option<WindowDescriptor> {
        self.state().descriptor.clone()
    }

    pub fn phase(&self) -> WindowPhase {
        self.state().phase
    }

    /// Receiver that observes every descriptor change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Call `callback` each time a fetch lands in the store.
    pub fn on_landed(&self, callback: impl Fn(&FetchLanded) + Send + Sync + 'static) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    /// Make `descriptor` current and fetch it once the debounce delay passes
    /// without another change. Returns `false` if it already was current and
    /// its last fetch did not fail; a failed descriptor is fetched again.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set(&self, descriptor: WindowDescriptor) -> bool {
        let Some(generation) = self.advance(descriptor, WindowPhase::Debouncing) else {
            return false;
        };

        let window = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window.debounce).await;
            // Failures are logged and reported inside fetch().
            let _ = window.fetch(generation).await;
        });
        true
    }

    /// Make `descriptor` current and fetch it right away.
    ///
    /// Returns `None` if a newer descriptor superseded it before the
    /// response arrived.
    pub async fn load(&self, descriptor: WindowDescriptor) -> AgendaResult<Option<FetchLanded>> {
        let generation = self.force(descriptor);
        self.fetch(generation).await
    }

    /// Fetch the current descriptor again without debouncing.
    pub async fn refresh(&self) -> AgendaResult<Option<FetchLanded>> {
        let descriptor = self
            .current_descriptor()
            .ok_or_else(|| AgendaError::Validation("No window selected".into()))?;
        self.load(descriptor).await
    }

    fn advance(&self, descriptor: WindowDescriptor, phase: WindowPhase) -> Option<WindowId> {
        let generation = {
            let mut state = self.state();
            if state.descriptor.as_ref() == Some(&descriptor) && !state.failed {
                return None;
            }
            state.generation += 1;
            state.failed = false;
            state.descriptor = Some(descriptor);
            state.phase = phase;
            state.generation
        };
        debug!(generation, "Window descriptor changed");
        self.revision.send_modify(|r| *r += 1);
        Some(generation)
    }

    fn force(&self, descriptor: WindowDescriptor) -> WindowId {
        let (generation, changed) = {
            let mut state = self.state();
            let changed = state.descriptor.as_ref() != Some(&descriptor);
            state.generation += 1;
            state.failed = false;
            state.descriptor = Some(descriptor);
            state.phase = WindowPhase::Fetching;
            (state.generation, changed)
        };
        if changed {
            self.revision.send_modify(|r| *r += 1);
        }
        generation
    }

    async fn fetch(&self, generation: WindowId) -> AgendaResult<Option<FetchLanded>> {
        let descriptor = {
            let mut state = self.state();
            if state.generation != generation {
                debug!(generation, "Window changed during debounce, fetch skipped");
                return Ok(None);
            }
            state.phase = WindowPhase::Fetching;
            match &state.descriptor {
                Some(descriptor) => descriptor.clone(),
                None => return Ok(None),
            }
        };

        let result = self.service.list_events(&EventQuery::from(&descriptor)).await;

        let landed = {
            let mut state = self.state();
            if state.generation != generation {
                debug!(generation, current = state.generation, "Discarding stale fetch");
                return Ok(None);
            }
            state.phase = WindowPhase::Idle;

            match result {
                Ok(fetched) => {
                    let records = fetched.len();
                    // Applied under the window lock so a descriptor change
                    // cannot slip in between the check and the swap.
                    self.store.replace(generation, fetched);
                    FetchLanded {
                        window: generation,
                        descriptor,
                        records,
                    }
                }
                Err(e) => {
                    state.failed = true;
                    drop(state);
                    warn!(error = %e, "Fetching events failed, keeping previous window");
                    self.notifier
                        .notify(Notice::error(format!("Could not load events: {e}")));
                    return Err(e);
                }
            }
        };

        debug!(generation, records = landed.records, "Fetch landed");
        let callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
        for callback in callbacks.iter() {
            callback(&landed);
        }
        Ok(Some(landed))
    }
}
