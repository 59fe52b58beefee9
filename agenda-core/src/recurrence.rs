//! Recurrence expansion for master events.
//!
//! Occurrence `k` of a master is its start shifted by `k` periods, always
//! measured from the master's own start so that clamped months do not drift.
//! Monthly steps that land past the end of a shorter month clamp to its last
//! day: a master on Jan 31 occurs on Feb 29 (or 28) and again on Mar 31.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use tracing::debug;

use crate::date_range::DateRange;
use crate::event::{Event, EventInstance, FetchedEvent, Occurrence, Recurrence};

/// Upper bound on the occurrences produced for a single master.
pub const MAX_OCCURRENCES: usize = 1000;

/// Expand a master into the instances whose start falls within `range`,
/// ordered by occurrence start.
///
/// A non-recurring event yields itself if it starts within the range.
pub fn expand(master: &Event, range: &DateRange) -> Vec<EventInstance> {
    occurrences(master, range)
        .into_iter()
        .map(|occurrence| EventInstance::new(master, occurrence))
        .collect()
}

/// Expand a listing record.
///
/// Records the service already expanded carry their own occurrence and are
/// treated as a single, non-recurring occurrence.
pub fn expand_fetched(record: &FetchedEvent, range: &DateRange) -> Vec<EventInstance> {
    match record.occurrence {
        Some(occurrence) if range.contains(occurrence.start) => {
            vec![EventInstance::new(&record.event, occurrence)]
        }
        Some(_) => Vec::new(),
        None => expand(&record.event, range),
    }
}

/// Occurrence times of `master` within `range`.
pub fn occurrences(master: &Event, range: &DateRange) -> Vec<Occurrence> {
    let duration = master.duration();

    if !master.recurrence.is_recurring() {
        return if range.contains(master.start) {
            vec![Occurrence {
                start: master.start,
                end: master.end,
            }]
        } else {
            Vec::new()
        };
    }

    if master.start > range.end {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut k = first_candidate(master, range);

    while let Some(start) = nth_start(master.start, master.recurrence, k) {
        if start > range.end {
            break;
        }
        if start >= range.start {
            result.push(Occurrence {
                start,
                end: start + duration,
            });
            if result.len() == MAX_OCCURRENCES {
                debug!(event = %master.id, "Recurrence expansion capped");
                break;
            }
        }
        k = match k.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    result
}

/// Start of occurrence `k`, or `None` if it is not representable.
fn nth_start(anchor: DateTime<Utc>, recurrence: Recurrence, k: u32) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::None => (k == 0).then_some(anchor),
        Recurrence::Daily => anchor.checked_add_signed(Duration::days(i64::from(k))),
        Recurrence::Weekly => anchor.checked_add_signed(Duration::weeks(i64::from(k))),
        Recurrence::Monthly => anchor.checked_add_months(Months::new(k)),
    }
}

/// An occurrence index at or before the first one inside `range`, so the
/// caller can skip a long history without stepping through it.
fn first_candidate(master: &Event, range: &DateRange) -> u32 {
    if master.start >= range.start {
        return 0;
    }

    let skipped = match master.recurrence {
        Recurrence::None => 0,
        Recurrence::Daily | Recurrence::Weekly => {
            let period = match master.recurrence {
                Recurrence::Daily => Duration::days(1),
                _ => Duration::weeks(1),
            };
            (range.start - master.start).num_seconds() / period.num_seconds()
        }
        Recurrence::Monthly => {
            let months = (i64::from(range.start.year()) - i64::from(master.start.year())) * 12
                + i64::from(range.start.month())
                - i64::from(master.start.month());
            months - 1
        }
    };

    u32::try_from(skipped.max(0)).unwrap_or(u32::MAX)
}
