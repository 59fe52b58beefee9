use agenda_core::AgendaConfig;
use anyhow::Result;
use owo_colors::OwoColorize;

pub fn run(config: &AgendaConfig) -> Result<()> {
    let config_path = AgendaConfig::config_path()?;

    let mut shown = config.clone();
    if shown.token.is_some() {
        shown.token = Some("********".to_string());
    }

    println!("{}", format!("# {}", config_path.display()).dimmed());
    print!("{}", shown.to_toml()?);

    Ok(())
}
