use crate::timer::ActivityTimer;

/// Units in one mala.
pub const MALA_SIZE: u32 = 108;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    pub new_count: u32,
    pub rolled_over_cycles: u32,
    /// Units that must be folded into history for this rollover. Excludes the
    /// part of the cycle that was restored from history and is already there.
    pub completed_units: u32,
}

/// In-progress count for the active chant.
///
/// `current_count` is what the user sees (0..=107). When a session resumes a
/// chant that already has a partial entry today, the restored remainder is
/// already part of history; `restored` tracks that share so later flushes add
/// only what was counted since.
#[derive(Debug, Clone)]
pub struct SessionCounter {
    active_chant: String,
    current_count: u32,
    restored: u32,
}

impl SessionCounter {
    pub fn new(active_chant: impl Into<String>) -> Self {
        Self {
            active_chant: active_chant.into(),
            current_count: 0,
            restored: 0,
        }
    }

    pub fn active_chant(&self) -> &str {
        &self.active_chant
    }

    pub fn current_count(&self) -> u32 {
        self.current_count
    }

    /// Units counted since the last flush that history does not hold yet.
    pub fn unflushed(&self) -> u32 {
        self.current_count - self.restored
    }

    pub fn record_increment(&mut self, timer: &mut ActivityTimer, now_ms: i64) -> Increment {
        timer.touch(now_ms);

        let total = self.current_count + 1;
        if total < MALA_SIZE {
            self.current_count = total;
            return Increment {
                new_count: total,
                rolled_over_cycles: 0,
                completed_units: 0,
            };
        }

        let cycles = total / MALA_SIZE;
        let completed_units = cycles * MALA_SIZE - self.restored;
        self.current_count = total % MALA_SIZE;
        self.restored = 0;
        Increment {
            new_count: self.current_count,
            rolled_over_cycles: cycles,
            completed_units,
        }
    }

    /// Makes `chant` active, resuming from a count that history already holds.
    pub fn switch_chant(&mut self, chant: impl Into<String>, restored_count: u32) {
        self.active_chant = chant.into();
        self.current_count = restored_count % MALA_SIZE;
        self.restored = self.current_count;
    }

    /// Marks everything counted so far as held by history.
    pub fn mark_flushed(&mut self) {
        self.restored = self.current_count;
    }

    /// History no longer holds any part of the remainder (its entry was cleared).
    pub fn forget_restored(&mut self) {
        self.restored = 0;
    }

    /// Discards the remainder without flushing.
    pub fn reset(&mut self) {
        self.current_count = 0;
        self.restored = 0;
    }
}
