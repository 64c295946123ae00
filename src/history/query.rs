//! Filtering, ranking and grouping of history entries.

use std::cmp::Reverse;

use chrono::{NaiveDate, TimeZone};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::HistoryEntry;

/// Sort newest first. Among equal timestamps, the later-inserted entry comes first.
pub fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.reverse();
    entries.sort_by_key(|entry| Reverse(entry.timestamp));
}

/// Case-insensitive substring match. An empty query matches everything.
pub fn matches(entry: &HistoryEntry, query: &str) -> bool {
    query.is_empty()
        || entry
            .calculation
            .to_lowercase()
            .contains(&query.to_lowercase())
}

/// Entries containing `query`, preserving input order.
pub fn search(entries: &[HistoryEntry], query: &str) -> Vec<HistoryEntry> {
    entries
        .iter()
        .filter(|entry| matches(entry, query))
        .cloned()
        .collect()
}

/// Entries fuzzily matching `query`, best match first.
///
/// Ties keep input order, so newest-first input stays newest-first.
pub fn fuzzy_search(entries: &[HistoryEntry], query: &str) -> Vec<HistoryEntry> {
    if query.is_empty() {
        return entries.to_vec();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(usize, i64)> = entries
        .iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            matcher
                .fuzzy_match(&entry.calculation, query)
                .map(|score| (idx, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scored
        .into_iter()
        .map(|(idx, _)| entries[idx].clone())
        .collect()
}

/// The calendar day an entry was recorded on, in `tz`.
pub fn day_of<Tz: TimeZone>(entry: &HistoryEntry, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(entry.timestamp)
        .single()
        .map(|dt| dt.date_naive())
}

/// Entries recorded on `day`, preserving input order.
pub fn on_day<Tz: TimeZone>(
    entries: &[HistoryEntry],
    day: NaiveDate,
    tz: &Tz,
) -> Vec<HistoryEntry> {
    entries
        .iter()
        .filter(|entry| day_of(entry, tz) == Some(day))
        .cloned()
        .collect()
}

/// Group entries by calendar day, newest day first.
///
/// Entries inside a day keep input order. Entries whose timestamp has no
/// unambiguous local time are left out.
pub fn group_by_day<Tz: TimeZone>(
    entries: &[HistoryEntry],
    tz: &Tz,
) -> Vec<(NaiveDate, Vec<HistoryEntry>)> {
    let mut groups: Vec<(NaiveDate, Vec<HistoryEntry>)> = Vec::new();

    for entry in entries {
        let Some(day) = day_of(entry, tz) else {
            continue;
        };
        match groups.iter_mut().find(|(d, _)| *d == day) {
            Some((_, group)) => group.push(entry.clone()),
            None => groups.push((day, vec![entry.clone()])),
        }
    }

    groups.sort_by_key(|(day, _)| Reverse(*day));
    groups
}
