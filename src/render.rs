//! Terminal rendering for agenda types.
//!
//! Extension traits that add colored output to agenda-core types using
//! owo_colors. Category colours are drawn as truecolor.

use agenda_core::{
    Category, Color, ListedEvent, Notice, NoticeLevel, Notifier, ProjectedInstance, Recurrence,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

/// Paint `text` in `color`, or leave it plain if the colour is unusable.
pub fn paint(text: &str, color: &Color) -> String {
    match color.rgb() {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text.to_string(),
    }
}

impl Render for Category {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            paint("■", &self.color),
            self.name,
            format!("#{} {}", self.id, self.color).dimmed()
        )
    }
}

impl Render for ProjectedInstance {
    fn render(&self) -> String {
        let event = &self.instance.event;
        let mut line = format!(
            "{} {} {}",
            format_time(self.instance.occurrence_start),
            paint(&event.title, &self.color),
            format!("[{}]", event.id).dimmed()
        );
        if let Some(category) = &self.category {
            line.push_str(&format!(" {}", category.name.dimmed()));
        }
        if event.recurrence.is_recurring() {
            line.push_str(&format!(" {}", format!("↻ {}", event.recurrence).dimmed()));
        }
        line
    }
}

impl Render for ListedEvent {
    fn render(&self) -> String {
        let event = &self.event;
        let title = match &self.category {
            Some(category) => paint(&event.title, &category.color),
            None => event.title.clone(),
        };
        let category = self.category.as_ref().map_or("no category", |c| c.name.as_str());
        let repeats = match event.recurrence {
            Recurrence::None => "does not repeat".to_string(),
            recurrence => format!("↻ {recurrence}"),
        };

        format!(
            "{}  {} {} {}",
            event.start.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            title,
            format!("[{}]", event.id).dimmed(),
            format!("{category}, {repeats}").dimmed()
        )
    }
}

/// Print instances grouped by local day.
pub fn print_agenda(instances: &[ProjectedInstance]) {
    if instances.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }

    let mut current_date: Option<NaiveDate> = None;
    for projected in instances {
        let date = projected.instance.occurrence_start.with_timezone(&Local).date_naive();
        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", format_date_label(date).bold());
            current_date = Some(date);
        }
        println!("  {}", projected.render());
    }
}

/// Print event masters, one per line.
pub fn print_event_list(events: &[ListedEvent]) {
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }
    for listed in events {
        println!("  {}", listed.render());
    }
}

/// "Today", "Tomorrow" or e.g. "Wed Feb 25".
fn format_date_label(date: NaiveDate) -> String {
    let today = Local::now().date_naive();
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    format!("{:>7}", time.with_timezone(&Local).format("%H:%M"))
}

/// Reports mutation outcomes on stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("  {}", notice.message.green()),
            NoticeLevel::Error => eprintln!("  {}", notice.message.red()),
        }
    }
}
