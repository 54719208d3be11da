use chrono::{Local, NaiveDate, Utc};
use std::sync::{Arc, Mutex};

/// Source of wall-clock time and the device-local calendar date.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock whose time and date only move when told to. Clones share state.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<(i64, NaiveDate)>>,
}

impl ManualClock {
    pub fn new(now_ms: i64, today: NaiveDate) -> Self {
        Self {
            inner: Arc::new(Mutex::new((now_ms, today))),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.0 += ms;
    }

    pub fn set_today(&self, today: NaiveDate) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.1 = today;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn today(&self) -> NaiveDate {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}
