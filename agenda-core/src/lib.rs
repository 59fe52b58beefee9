//! Client-side event cache for the agenda calendar.
//!
//! This crate keeps a window of events from the remote schedule service in
//! memory and keeps it consistent while the user edits:
//! - `store` holds the fetched events plus pending optimistic changes
//! - `window` decides what to fetch and discards stale responses
//! - `mutation` applies changes optimistically and rolls them back on failure
//! - `recurrence` expands recurring masters into occurrences
//! - `projection` joins events with category colours for display

pub mod calendar;
pub mod category;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod mutation;
pub mod projection;
pub mod recurrence;
pub mod service;
pub mod store;
pub mod window;

#[cfg(test)]
mod testing;

pub use calendar::{Calendar, SyncSettings};
pub use category::{Category, CategoryDirectory, CategoryFilter, CategoryId, Color};
pub use crate::config::AgendaConfig;
pub use date_range::DateRange;
pub use error::{AgendaError, AgendaResult};
pub use event::*;
pub use mutation::MutationEngine;
pub use projection::{ListedEvent, ProjectedInstance, ViewProjection};
pub use service::{EventQuery, EventService, LogNotifier, Notice, NoticeLevel, Notifier};
pub use store::EventStore;
pub use window::{FetchWindow, WindowDescriptor};
