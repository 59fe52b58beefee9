use agenda_core::{AgendaConfig, EventId};
use anyhow::Result;

use super::{WindowArgs, connect, load_event};

pub async fn run(config: &AgendaConfig, id: EventId, window: WindowArgs) -> Result<()> {
    let calendar = connect(config)?;
    load_event(&calendar, id, &window, config).await?;

    calendar.mutations().delete(id).await?;
    Ok(())
}
