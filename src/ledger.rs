use crate::counter::MALA_SIZE;
use crate::models::{DateGroup, HistoryEntry, Totals};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Date and chant keyed history of flushed counts.
///
/// Counts merge additively. Time spent is replaced on every merge because
/// callers always pass the session's cumulative total for that day.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate, chant: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.date == date && entry.chant == chant)
    }

    pub fn merge_flush(
        &mut self,
        date: NaiveDate,
        chant: &str,
        count_delta: u64,
        mala_delta: u64,
        time_spent_ms: u64,
        now_ms: i64,
    ) -> HistoryEntry {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.date == date && entry.chant == chant)
        {
            entry.count = entry.count.saturating_add(count_delta);
            entry.mala_count = entry.mala_count.saturating_add(mala_delta);
            entry.time_spent_ms = time_spent_ms;
            entry.last_updated = now_ms;
            return entry.clone();
        }

        let entry = HistoryEntry {
            date,
            chant: chant.to_string(),
            count: count_delta,
            mala_count: mala_delta,
            time_spent_ms,
            last_updated: now_ms,
        };
        self.entries.insert(0, entry.clone());
        entry
    }

    /// Replaces time spent on an existing entry. Returns false when there is none.
    pub fn sync_time(&mut self, date: NaiveDate, chant: &str, time_spent_ms: u64) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.date == date && entry.chant == chant)
        {
            Some(entry) if entry.time_spent_ms != time_spent_ms => {
                entry.time_spent_ms = time_spent_ms;
                true
            }
            _ => false,
        }
    }

    /// Drops every entry for `date`. Returns whether anything was removed.
    pub fn remove_date(&mut self, date: NaiveDate) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.date != date);
        self.entries.len() != before
    }

    pub fn clear_all(&mut self) -> bool {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        had_entries
    }

    pub fn aggregate(&self, date: NaiveDate, chant: &str) -> Totals {
        self.entries
            .iter()
            .filter(|entry| entry.date == date && entry.chant == chant)
            .fold(Totals::default(), |acc, entry| Totals {
                count: acc.count + entry.count,
                mala_count: acc.mala_count + entry.mala_count,
                time_spent_ms: acc.time_spent_ms + entry.time_spent_ms,
            })
    }

    /// Sum over every chant on `date`.
    pub fn day_totals(&self, date: NaiveDate) -> Totals {
        self.entries
            .iter()
            .filter(|entry| entry.date == date)
            .fold(Totals::default(), |acc, entry| Totals {
                count: acc.count + entry.count,
                mala_count: acc.mala_count + entry.count / u64::from(MALA_SIZE),
                time_spent_ms: acc.time_spent_ms + entry.time_spent_ms,
            })
    }

    /// History grouped per date, newest first.
    pub fn group_by_date(&self) -> Vec<DateGroup> {
        let mut by_date: BTreeMap<NaiveDate, Vec<HistoryEntry>> = BTreeMap::new();
        for entry in &self.entries {
            by_date.entry(entry.date).or_default().push(entry.clone());
        }

        by_date
            .into_iter()
            .rev()
            .map(|(date, entries)| {
                let total_count = entries.iter().map(|e| e.count).sum();
                let total_malas = entries
                    .iter()
                    .map(|e| e.count / u64::from(MALA_SIZE))
                    .sum();
                let total_time_ms = entries.iter().map(|e| e.time_spent_ms).sum();
                DateGroup {
                    date,
                    entries,
                    total_count,
                    total_malas,
                    total_time_ms,
                }
            })
            .collect()
    }
}
