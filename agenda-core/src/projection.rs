//! Color-annotated, filtered view of the store.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use crate::category::{Category, CategoryDirectory, CategoryFilter, CategoryId, Color};
use crate::event::{Event, EventInstance};
use crate::store::EventStore;
use crate::window::{FetchWindow, WindowDescriptor};

/// An instance ready to be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedInstance {
    pub instance: EventInstance,
    pub color: Color,
    /// `None` when uncategorized or when the category no longer exists.
    pub category: Option<Category>,
}

/// Combine the store with categories and apply the descriptor's filters.
///
/// Filters are applied again here, on top of whatever the service already
/// filtered, because the store may still hold a window fetched before the
/// filters changed.
pub fn project(
    store: &EventStore,
    categories: &[Category],
    descriptor: &WindowDescriptor,
    default_color: &Color,
) -> Vec<ProjectedInstance> {
    let by_id: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let needle = descriptor.search.trim().to_lowercase();

    store
        .instances(&descriptor.range)
        .into_iter()
        .filter_map(|instance| {
            if let CategoryFilter::Only(wanted) = descriptor.category {
                if instance.event.category_id != Some(wanted) {
                    return None;
                }
            }
            if !needle.is_empty() && !instance.event.title.to_lowercase().contains(&needle) {
                return None;
            }

            // Only the colour depends on the category cache.
            let category = instance
                .event
                .category_id
                .and_then(|id| by_id.get(&id).copied());

            Some(ProjectedInstance {
                color: category.map_or_else(|| default_color.clone(), |c| c.color.clone()),
                category: category.cloned(),
                instance,
            })
        })
        .collect()
}

/// Live projection over the calendar's store, categories and window.
pub struct ViewProjection {
    store: EventStore,
    categories: CategoryDirectory,
    window: FetchWindow,
    default_color: Color,
    store_changes: watch::Receiver<u64>,
    category_changes: watch::Receiver<u64>,
    window_changes: watch::Receiver<u64>,
}

impl ViewProjection {
    pub fn new(
        store: EventStore,
        categories: CategoryDirectory,
        window: FetchWindow,
        default_color: Color,
    ) -> Self {
        ViewProjection {
            store_changes: store.subscribe(),
            category_changes: categories.subscribe(),
            window_changes: window.subscribe(),
            store,
            categories,
            window,
            default_color,
        }
    }

    /// Instances for the current descriptor; empty until one is set.
    pub fn render(&mut self) -> Vec<ProjectedInstance> {
        self.store_changes.mark_unchanged();
        self.category_changes.mark_unchanged();
        self.window_changes.mark_unchanged();

        match self.window.current_descriptor() {
            Some(descriptor) => project(
                &self.store,
                &self.categories.cached(),
                &descriptor,
                &self.default_color,
            ),
            None => Vec::new(),
        }
    }

    /// Wait until something that affects `render()` changed.
    ///
    /// An invalidated category cache is refilled before this returns, so the
    /// next `render()` sees the new names and colours.
    pub async fn changed(&mut self) {
        tokio::select! {
            _ = self.store_changes.changed() => {}
            _ = self.category_changes.changed() => {}
            _ = self.window_changes.changed() => {}
        }

        if let Err(e) = self.categories.list().await {
            warn!(error = %e, "Could not reload categories, using default colours");
        }
    }
}

/// An event master with its category resolved, for listings that are not
/// tied to a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedEvent {
    pub event: Event,
    /// `None` when uncategorized or when the category no longer exists.
    pub category: Option<Category>,
}

/// Join masters with their categories, ordered by start.
pub fn list_masters(mut events: Vec<Event>, categories: &[Category]) -> Vec<ListedEvent> {
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    events
        .into_iter()
        .map(|event| ListedEvent {
            category: event
                .category_id
                .and_then(|id| categories.iter().find(|c| c.id == id).cloned()),
            event,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::DateRange;
    use crate::event::{EventDraft, EventId};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn descriptor() -> WindowDescriptor {
        WindowDescriptor::new(
            DateRange::from_dates(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap(),
        )
    }

    fn event(id: i64, title: &str, day: u32, category: Option<i64>) -> Event {
        let start = Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap();
        let mut draft = EventDraft::new(title, start, start + Duration::hours(1));
        draft.category_id = category.map(CategoryId);
        Event::from_draft(EventId::Saved(id), &draft)
    }

    fn work() -> Category {
        Category {
            id: CategoryId(1),
            name: "Work".into(),
            color: Color::parse("#ff0000").unwrap(),
        }
    }

    fn default_color() -> Color {
        Color::parse("#3b82f6").unwrap()
    }

    #[test]
    fn test_resolves_category_color() {
        let store = EventStore::new();
        store.upsert(event(1, "Standup", 2, Some(1)));
        store.upsert(event(2, "Dentist", 3, None));

        let view = project(&store, &[work()], &descriptor(), &default_color());

        assert_eq!(view.len(), 2);
        assert_eq!(view[0].color, work().color);
        assert_eq!(view[0].category, Some(work()));
        assert_eq!(view[1].color, default_color());
        assert_eq!(view[1].category, None);
    }

    #[test]
    fn test_unknown_category_falls_back_to_default() {
        let store = EventStore::new();
        store.upsert(event(1, "Orphan", 2, Some(77)));

        let view = project(&store, &[work()], &descriptor(), &default_color());

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].color, default_color());
        assert_eq!(view[0].category, None);
    }

    #[test]
    fn test_category_filter_applies_at_display_time() {
        let store = EventStore::new();
        store.upsert(event(1, "Standup", 2, Some(1)));
        store.upsert(event(2, "Dentist", 3, None));
        store.upsert(event(3, "Orphan", 4, Some(77)));

        let filtered = descriptor().with_category(CategoryFilter::Only(CategoryId(1)));
        let view = project(&store, &[work()], &filtered, &default_color());

        let titles: Vec<_> = view.iter().map(|p| p.instance.event.title.as_str()).collect();
        assert_eq!(titles, vec!["Standup"]);
    }

    #[test]
    fn test_category_filter_does_not_need_resolved_categories() {
        let store = EventStore::new();
        store.upsert(event(1, "Standup", 2, Some(1)));
        store.upsert(event(2, "Dentist", 3, None));

        let filtered = descriptor().with_category(CategoryFilter::Only(CategoryId(1)));
        let view = project(&store, &[], &filtered, &default_color());

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].instance.event.title, "Standup");
        assert_eq!(view[0].color, default_color());
        assert_eq!(view[0].category, None);
    }

    #[test]
    fn test_list_masters_orders_by_start_and_resolves_categories() {
        let listed = list_masters(
            vec![event(2, "Dentist", 9, Some(77)), event(1, "Standup", 2, Some(1))],
            &[work()],
        );

        let titles: Vec<_> = listed.iter().map(|l| l.event.title.as_str()).collect();
        assert_eq!(titles, vec!["Standup", "Dentist"]);
        assert_eq!(listed[0].category, Some(work()));
        assert_eq!(listed[1].category, None);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let store = EventStore::new();
        store.upsert(event(1, "Team Standup", 2, None));
        store.upsert(event(2, "Dentist", 3, None));

        let view = project(&store, &[], &descriptor().with_search("STAND"), &default_color());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].instance.event.title, "Team Standup");

        let view = project(&store, &[], &descriptor().with_search("  "), &default_color());
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_events_outside_range_are_not_projected() {
        let store = EventStore::new();
        let start = Utc.with_ymd_and_hms(2024, 2, 5, 9, 0, 0).unwrap();
        store.upsert(Event::from_draft(
            EventId::Saved(1),
            &EventDraft::new("February", start, start + Duration::hours(1)),
        ));

        assert!(project(&store, &[], &descriptor(), &default_color()).is_empty());
    }
}
