use agenda_core::{AgendaConfig, AgendaError, CategoryId, Color};
use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;

use super::connect;
use crate::render::Render;

pub async fn list(config: &AgendaConfig) -> Result<()> {
    let calendar = connect(config)?;
    let categories = calendar
        .categories()
        .list()
        .await
        .context("Could not load categories")?;

    if categories.is_empty() {
        println!("{}", "No categories yet".dimmed());
        return Ok(());
    }

    for category in &categories {
        println!("  {}", category.render());
    }

    Ok(())
}

pub async fn create(config: &AgendaConfig, name: String, color: Color) -> Result<()> {
    let calendar = connect(config)?;
    let category = calendar.categories().create(&name, &color).await?;

    println!("{}", format!("  Created: {}", category.name).green());
    println!("  {}", category.render());
    Ok(())
}

pub async fn edit(
    config: &AgendaConfig,
    id: CategoryId,
    name: Option<String>,
    color: Option<Color>,
) -> Result<()> {
    if name.is_none() && color.is_none() {
        bail!("Nothing to change. Pass --name and/or --color.");
    }

    let calendar = connect(config)?;
    let directory = calendar.categories();
    let current = directory
        .by_id(id)
        .await?
        .ok_or(AgendaError::CategoryNotFound(id))?;

    let name = name.unwrap_or(current.name);
    let color = color.unwrap_or(current.color);
    let updated = directory.update(id, &name, &color).await?;

    println!("{}", format!("  Updated: {}", updated.name).green());
    println!("  {}", updated.render());
    Ok(())
}

pub async fn delete(config: &AgendaConfig, id: CategoryId) -> Result<()> {
    let calendar = connect(config)?;

    match calendar.categories().delete(id).await {
        Ok(()) => {
            println!("{}", format!("  Deleted category {id}").green());
            Ok(())
        }
        Err(AgendaError::CategoryInUse(_)) => bail!(
            "Category {id} is still used by some events. Move them to another category first."
        ),
        Err(e) => Err(e.into()),
    }
}
