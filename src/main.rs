mod client;
mod commands;
mod render;
mod wire;

use agenda_core::{AgendaConfig, CategoryId, Color, EventId};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{EventFields, WindowArgs};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agenda")]
#[command(about = "Browse and edit your agenda on a schedule service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show events in a date range
    Events {
        #[command(flatten)]
        window: WindowArgs,

        /// List every event once, without a date range
        #[arg(long, conflicts_with_all = ["from", "to", "category", "search"])]
        all: bool,

        /// Only show events in this category (by id)
        #[arg(short, long)]
        category: Option<CategoryId>,

        /// Only show events whose title contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Print the projected events as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an event
    New {
        /// Event title
        title: String,

        /// Start date/time (e.g., "2025-03-20T15:00")
        #[arg(short, long)]
        start: String,

        /// End date/time
        #[arg(short, long, conflicts_with = "duration")]
        end: Option<String>,

        /// Duration (e.g., "30m", "1h", "2h30m"); one hour if omitted
        #[arg(short, long)]
        duration: Option<String>,

        #[command(flatten)]
        fields: EventFields,
    },
    /// Change an existing event
    Edit {
        /// Event id
        id: EventId,

        #[arg(short, long)]
        title: Option<String>,

        /// New start date/time
        #[arg(short, long)]
        start: Option<String>,

        /// New end date/time
        #[arg(short, long)]
        end: Option<String>,

        #[command(flatten)]
        fields: EventFields,

        /// Remove the reminder
        #[arg(long, conflicts_with = "remind")]
        no_reminder: bool,

        /// Remove the category
        #[arg(long, conflicts_with = "category")]
        no_category: bool,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Move an event to a new start, keeping its duration unless --end is given
    Move {
        /// Event id
        id: EventId,

        /// New start date/time
        #[arg(short, long)]
        start: String,

        /// New end date/time
        #[arg(short, long)]
        end: Option<String>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Change when an event ends
    Resize {
        /// Event id
        id: EventId,

        /// New end date/time
        #[arg(short, long)]
        end: String,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Delete an event and all of its occurrences
    Delete {
        /// Event id
        id: EventId,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: Option<CategoryCommands>,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories
    List,
    /// Create a category
    New {
        name: String,

        /// Colour as #rgb or #rrggbb
        #[arg(short, long)]
        color: Color,
    },
    /// Rename or recolour a category
    Edit {
        /// Category id
        id: CategoryId,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        color: Option<Color>,
    },
    /// Delete a category that no event uses
    Delete {
        /// Category id
        id: CategoryId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = AgendaConfig::load()?;

    match cli.command {
        Commands::Events {
            window,
            all,
            category,
            search,
            json,
        } => {
            if all {
                commands::events::all(&config, json).await
            } else {
                commands::events::run(&config, window, category, search, json).await
            }
        }
        Commands::New {
            title,
            start,
            end,
            duration,
            fields,
        } => commands::new::run(&config, title, start, end, duration, fields).await,
        Commands::Edit {
            id,
            title,
            start,
            end,
            fields,
            no_reminder,
            no_category,
            window,
        } => {
            let changes = commands::edit::Changes {
                title,
                start,
                end,
                fields,
                no_reminder,
                no_category,
            };
            commands::edit::run(&config, id, changes, window).await
        }
        Commands::Move {
            id,
            start,
            end,
            window,
        } => commands::move_event::run(&config, id, start, end, window).await,
        Commands::Resize { id, end, window } => {
            commands::move_event::resize(&config, id, end, window).await
        }
        Commands::Delete { id, window } => commands::delete::run(&config, id, window).await,
        Commands::Categories { command } => match command.unwrap_or(CategoryCommands::List) {
            CategoryCommands::List => commands::categories::list(&config).await,
            CategoryCommands::New { name, color } => {
                commands::categories::create(&config, name, color).await
            }
            CategoryCommands::Edit { id, name, color } => {
                commands::categories::edit(&config, id, name, color).await
            }
            CategoryCommands::Delete { id } => commands::categories::delete(&config, id).await,
        },
        Commands::Config => commands::config::run(&config),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (warnings only by default).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
