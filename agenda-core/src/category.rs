//! Categories and the directory that caches them.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{AgendaError, AgendaResult};
use crate::service::EventService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = AgendaError;

    fn from_str(s: &str) -> AgendaResult<Self> {
        s.parse()
            .map(CategoryId)
            .map_err(|_| AgendaError::Validation(format!("Invalid category id '{s}'")))
    }
}

/// Colour of events without a resolvable category.
pub const DEFAULT_EVENT_COLOR: &str = "#3b82f6";

/// A `#rgb` or `#rrggbb` display colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Default for Color {
    fn default() -> Self {
        Color(DEFAULT_EVENT_COLOR.to_string())
    }
}

impl Color {
    pub fn parse(s: &str) -> AgendaResult<Self> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| matches!(h.len(), 3 | 6) && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| AgendaError::Validation(format!("Invalid colour '{s}'")))?;
        Ok(Color(format!("#{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue channels, if the colour is well-formed.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let mut rgb = hex.chars().map(|c| channel(&c.to_string().repeat(2)));
                Some((rgb.next()??, rgb.next()??, rgb.next()??))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Color {
    type Err = AgendaError;

    fn from_str(s: &str) -> AgendaResult<Self> {
        Color::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: Color,
}

/// Which categories a window shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CategoryId),
}

impl CategoryFilter {
    pub fn category(&self) -> Option<CategoryId> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(id) => Some(*id),
        }
    }
}

#[derive(Default)]
struct CacheState {
    categories: Option<Vec<Category>>,
    // Bumped by invalidate() so that a refresh started earlier cannot
    // repopulate the cache with what it read before the change.
    generation: u64,
}

/// Read-through cache of the user's categories.
///
/// Cloning yields another handle to the same cache. Nothing is polled: the
/// cache is refilled lazily after `invalidate()`.
#[derive(Clone)]
pub struct CategoryDirectory {
    service: Arc<dyn EventService>,
    state: Arc<Mutex<CacheState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl CategoryDirectory {
    pub fn new(service: Arc<dyn EventService>) -> Self {
        let (revision, _) = watch::channel(0);
        CategoryDirectory {
            service,
            state: Arc::new(Mutex::new(CacheState::default())),
            revision: Arc::new(revision),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All categories in service order, fetching them if the cache is cold.
    pub async fn list(&self) -> AgendaResult<Vec<Category>> {
        let generation = {
            let state = self.state();
            if let Some(categories) = &state.categories {
                return Ok(categories.clone());
            }
            state.generation
        };

        let fetched = self.service.list_categories().await?;

        let mut state = self.state();
        if state.generation == generation {
            debug!(count = fetched.len(), "Category cache filled");
            state.categories = Some(fetched.clone());
            drop(state);
            self.revision.send_modify(|r| *r += 1);
        } else {
            debug!("Category cache invalidated during refresh, result not cached");
        }
        Ok(fetched)
    }

    pub async fn by_id(&self, id: CategoryId) -> AgendaResult<Option<Category>> {
        Ok(self.list().await?.into_iter().find(|c| c.id == id))
    }

    /// Whatever is cached right now, without touching the service.
    pub fn cached(&self) -> Vec<Category> {
        self.state().categories.clone().unwrap_or_default()
    }

    /// Drop the cached categories; the next `list()` refetches.
    pub fn invalidate(&self) {
        {
            let mut state = self.state();
            state.categories = None;
            state.generation += 1;
        }
        debug!("Category cache invalidated");
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver that observes every change of the cached categories.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub async fn create(&self, name: &str, color: &Color) -> AgendaResult<Category> {
        let name = validate_name(name)?;
        let category = self.service.create_category(name, color).await?;
        self.invalidate();
        Ok(category)
    }

    pub async fn update(&self, id: CategoryId, name: &str, color: &Color) -> AgendaResult<Category> {
        let name = validate_name(name)?;
        let category = self.service.update_category(id, name, color).await?;
        self.invalidate();
        Ok(category)
    }

    /// Delete a category. Fails with `CategoryInUse` if the service refuses.
    pub async fn delete(&self, id: CategoryId) -> AgendaResult<()> {
        self.service.delete_category(id).await?;
        self.invalidate();
        Ok(())
    }
}

fn validate_name(name: &str) -> AgendaResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AgendaError::Validation("Category name is required".into()));
    }
    Ok(name)
}
