use agenda_core::{AgendaConfig, CategoryFilter, CategoryId, WindowDescriptor};
use anyhow::{Context, Result};

use super::{WindowArgs, connect};
use crate::render::{print_agenda, print_event_list};

pub async fn run(
    config: &AgendaConfig,
    window: WindowArgs,
    category: Option<CategoryId>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let calendar = connect(config)?;

    let mut descriptor = WindowDescriptor::new(window.range(config)?);
    if let Some(id) = category {
        descriptor = descriptor.with_category(CategoryFilter::Only(id));
    }
    if let Some(search) = &search {
        descriptor = descriptor.with_search(search);
    }

    let instances = calendar
        .open(descriptor)
        .await
        .context("Could not load events")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&instances)?);
    } else {
        print_agenda(&instances);
    }

    Ok(())
}

/// Every event once, as stored on the service.
pub async fn all(config: &AgendaConfig, json: bool) -> Result<()> {
    let calendar = connect(config)?;
    let events = calendar
        .all_events()
        .await
        .context("Could not load events")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print_event_list(&events);
    }

    Ok(())
}
