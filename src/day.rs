use chrono::NaiveDate;

/// Remembers the last calendar date the session saw.
#[derive(Debug, Clone)]
pub struct DayBoundaryMonitor {
    last_observed: NaiveDate,
}

impl DayBoundaryMonitor {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_observed: today,
        }
    }

    pub fn last_observed(&self) -> NaiveDate {
        self.last_observed
    }

    /// Advances to `today` and returns the previous date if it changed.
    pub fn observe(&mut self, today: NaiveDate) -> Option<NaiveDate> {
        if today == self.last_observed {
            return None;
        }
        let previous = self.last_observed;
        self.last_observed = today;
        Some(previous)
    }
}
