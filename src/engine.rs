//! Session and history reconciliation.
//!
//! One `ChantEngine` exists per app lifecycle. Every mutation runs through it
//! under the caller's lock, and every ledger merge completes before the caller
//! is told to schedule a save, so a snapshot taken afterwards is consistent.

use crate::clock::Clock;
use crate::config::PREDEFINED_CHANTS;
use crate::counter::{MALA_SIZE, SessionCounter};
use crate::day::DayBoundaryMonitor;
use crate::errors::StoreError;
use crate::ledger::HistoryLedger;
use crate::models::{
    ChantList, DateGroup, DisplayState, HistoryEntry, StatsResponse, format_duration,
};
use crate::stats::build_stats_at;
use crate::storage::{encode_chants, encode_history};
use crate::timer::ActivityTimer;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// What a mutation changed, so the caller knows what to persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    pub history_changed: bool,
    pub chants_changed: bool,
}

impl Effects {
    fn history(changed: bool) -> Self {
        Self {
            history_changed: changed,
            chants_changed: false,
        }
    }

    fn merge(self, other: Effects) -> Self {
        Self {
            history_changed: self.history_changed || other.history_changed,
            chants_changed: self.chants_changed || other.chants_changed,
        }
    }
}

pub struct ChantEngine {
    clock: Arc<dyn Clock>,
    inactivity_timeout_ms: u64,
    counter: SessionCounter,
    timer: ActivityTimer,
    ledger: HistoryLedger,
    day: DayBoundaryMonitor,
    custom_chants: Vec<String>,
}

impl ChantEngine {
    /// Starts a session on the first predefined chant, resuming today's
    /// partial mala and time for it if history has them.
    pub fn new(
        clock: Arc<dyn Clock>,
        history: Vec<HistoryEntry>,
        custom_chants: Vec<String>,
        inactivity_timeout_ms: u64,
    ) -> Self {
        let today = clock.today();
        let now = clock.now_ms();
        let mut custom: Vec<String> = Vec::with_capacity(custom_chants.len());
        for chant in custom_chants {
            let chant = chant.trim().to_string();
            if !chant.is_empty() && !is_predefined(&chant) && !custom.contains(&chant) {
                custom.push(chant);
            }
        }

        let mut engine = Self {
            clock,
            inactivity_timeout_ms,
            counter: SessionCounter::new(PREDEFINED_CHANTS[0]),
            timer: ActivityTimer::new(now),
            ledger: HistoryLedger::from_entries(history),
            day: DayBoundaryMonitor::new(today),
            custom_chants: custom,
        };
        engine.resume(PREDEFINED_CHANTS[0]);
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn active_chant(&self) -> &str {
        self.counter.active_chant()
    }

    pub fn current_count(&self) -> u32 {
        self.counter.current_count()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed_ms()
    }

    pub fn timer(&self) -> &ActivityTimer {
        &self.timer
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn today(&self) -> NaiveDate {
        self.day.last_observed()
    }

    pub fn is_known_chant(&self, chant: &str) -> bool {
        is_predefined(chant) || self.custom_chants.iter().any(|c| c == chant)
    }

    pub fn display(&self) -> DisplayState {
        let today = self.today();
        let chant = self.counter.active_chant();
        let totals = self.ledger.aggregate(today, chant);
        DisplayState {
            date: today,
            chant: chant.to_string(),
            count: self.counter.current_count(),
            mala_count: totals.mala_count,
            today_total: totals.count + u64::from(self.counter.unflushed()),
            elapsed_ms: self.timer.elapsed_ms(),
            elapsed: format_duration(self.timer.elapsed_ms()),
            timer_running: self.timer.is_running(),
        }
    }

    pub fn history(&self) -> Vec<DateGroup> {
        self.ledger.group_by_date()
    }

    pub fn stats(&self) -> StatsResponse {
        build_stats_at(self.today(), &self.ledger)
    }

    pub fn chants(&self) -> ChantList {
        ChantList {
            active: self.counter.active_chant().to_string(),
            predefined: PREDEFINED_CHANTS.iter().map(|c| c.to_string()).collect(),
            custom: self.custom_chants.clone(),
        }
    }

    pub fn history_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        encode_history(self.ledger.entries())
    }

    pub fn chants_snapshot(&self) -> Result<Vec<u8>, StoreError> {
        encode_chants(&self.custom_chants)
    }

    // ── Input events ─────────────────────────────────────────────────

    /// Counts one unit. A named chant other than the active one is switched
    /// to first; an unknown chant is ignored.
    pub fn increment(&mut self, chant: Option<&str>) -> Effects {
        let mut effects = self.check_day_boundary();
        if let Some(chant) = chant {
            if !self.is_known_chant(chant) {
                debug!(chant, "increment for unknown chant ignored");
                return effects;
            }
            effects = effects.merge(self.select_chant(chant));
        }

        let now = self.clock.now_ms();
        let step = self.counter.record_increment(&mut self.timer, now);
        if step.rolled_over_cycles == 0 {
            return effects;
        }

        let today = self.today();
        let entry = self.ledger.merge_flush(
            today,
            self.counter.active_chant(),
            u64::from(step.completed_units),
            u64::from(step.rolled_over_cycles),
            self.timer.elapsed_ms(),
            now,
        );
        info!(
            chant = %entry.chant,
            date = %today,
            count = entry.count,
            malas = entry.mala_count,
            "mala completed"
        );
        effects.merge(Effects::history(true))
    }

    pub fn observe_activity(&mut self) {
        self.timer.observe_activity(self.clock.now_ms());
    }

    /// Flushes the active chant's remainder under today, then resumes `chant`.
    pub fn select_chant(&mut self, chant: &str) -> Effects {
        let effects = self.check_day_boundary();
        if chant == self.counter.active_chant() {
            return effects;
        }
        if !self.is_known_chant(chant) {
            debug!(chant, "switch to unknown chant ignored");
            return effects;
        }

        let flushed = self.flush_remainder(self.today());
        self.resume(chant);
        info!(chant, count = self.counter.current_count(), "chant selected");
        effects.merge(Effects::history(flushed))
    }

    pub fn toggle_timer(&mut self) {
        let state = self.timer.toggle(self.clock.now_ms());
        debug!(?state, "timer toggled");
    }

    /// Discards the unflushed remainder and zeroes the timer. History is untouched.
    pub fn reset_session(&mut self) {
        self.counter.reset();
        self.timer.reset();
        info!(chant = self.counter.active_chant(), "session reset");
    }

    /// One timer period: auto-pause on inactivity, otherwise accrue a tick and
    /// mirror the live time into today's entry when one exists. A date change
    /// is reconciled first so the tick never lands on the previous day.
    pub fn tick(&mut self) -> Effects {
        let effects = self.check_day_boundary();
        let now = self.clock.now_ms();
        if self.timer.check_inactivity(now, self.inactivity_timeout_ms) {
            debug!("timer paused after inactivity");
            return effects;
        }
        if !self.timer.tick() {
            return effects;
        }
        let today = self.today();
        effects.merge(Effects::history(self.ledger.sync_time(
            today,
            self.counter.active_chant(),
            self.timer.elapsed_ms(),
        )))
    }

    /// Reconciles a calendar date change: the open remainder belongs to the
    /// date it was counted on, and the session starts fresh on the new one.
    pub fn check_day_boundary(&mut self) -> Effects {
        let today = self.clock.today();
        let Some(previous) = self.day.observe(today) else {
            return Effects::default();
        };

        let flushed = self.flush_remainder(previous);
        self.counter.reset();
        self.timer.reset();
        info!(%previous, %today, flushed, "day changed");
        Effects::history(flushed)
    }

    /// Folds the open remainder into today's entry before the process exits.
    /// The next start resumes it as a restored partial mala.
    pub fn suspend(&mut self) -> Effects {
        let effects = self.check_day_boundary();
        self.timer.pause();
        let flushed = self.flush_remainder(self.today());
        effects.merge(Effects::history(flushed))
    }

    pub fn clear_all(&mut self) -> Effects {
        let cleared = self.ledger.clear_all();
        self.counter.forget_restored();
        info!("history cleared");
        Effects::history(cleared)
    }

    pub fn clear_date(&mut self, date: NaiveDate) -> Effects {
        let removed = self.ledger.remove_date(date);
        if date == self.today() {
            self.counter.forget_restored();
        }
        if removed {
            info!(%date, "history cleared for date");
        }
        Effects::history(removed)
    }

    pub fn add_custom_chant(&mut self, text: &str) -> Effects {
        let chant = text.trim();
        if chant.is_empty() || self.is_known_chant(chant) {
            return Effects::default();
        }
        self.custom_chants.push(chant.to_string());
        info!(chant, "custom chant added");
        Effects {
            history_changed: false,
            chants_changed: true,
        }
    }

    /// Removes a custom chant. Predefined chants stay. Removing the active
    /// chant moves the session to the first predefined chant.
    pub fn remove_custom_chant(&mut self, chant: &str) -> Effects {
        let Some(index) = self.custom_chants.iter().position(|c| c == chant) else {
            return Effects::default();
        };

        let mut effects = Effects::default();
        if self.counter.active_chant() == chant {
            effects = self.select_chant(PREDEFINED_CHANTS[0]);
        }
        self.custom_chants.remove(index);
        info!(chant, "custom chant removed");
        effects.merge(Effects {
            history_changed: false,
            chants_changed: true,
        })
    }

    fn flush_remainder(&mut self, date: NaiveDate) -> bool {
        let delta = self.counter.unflushed();
        let elapsed = self.timer.elapsed_ms();
        if delta == 0 {
            return self
                .ledger
                .sync_time(date, self.counter.active_chant(), elapsed);
        }

        let entry = self.ledger.merge_flush(
            date,
            self.counter.active_chant(),
            u64::from(delta),
            0,
            elapsed,
            self.clock.now_ms(),
        );
        self.counter.mark_flushed();
        info!(chant = %entry.chant, %date, delta, count = entry.count, "remainder flushed");
        true
    }

    fn resume(&mut self, chant: &str) {
        let (count, time_spent_ms) = self
            .ledger
            .get(self.today(), chant)
            .map(|entry| (entry.count, entry.time_spent_ms))
            .unwrap_or((0, 0));
        let remainder = (count % u64::from(MALA_SIZE)) as u32;
        self.counter.switch_chant(chant, remainder);
        self.timer.restore(time_spent_ms);
    }
}

fn is_predefined(chant: &str) -> bool {
    PREDEFINED_CHANTS.contains(&chant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::Totals;

    const A: &str = PREDEFINED_CHANTS[0];
    const B: &str = PREDEFINED_CHANTS[1];

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn engine_on(clock: &ManualClock, history: Vec<HistoryEntry>) -> ChantEngine {
        ChantEngine::new(Arc::new(clock.clone()), history, vec!["ॐ".to_string()], 2_000)
    }

    fn count(engine: &mut ChantEngine, times: u32) -> Effects {
        let mut effects = Effects::default();
        for _ in 0..times {
            effects = effects.merge(engine.increment(None));
        }
        effects
    }

    #[test]
    fn one_hundred_nine_increments_complete_one_mala() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());

        assert!(!count(&mut engine, 107).history_changed);
        assert!(engine.ledger().is_empty());
        assert!(count(&mut engine, 2).history_changed);

        let entry = engine.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 108);
        assert_eq!(entry.mala_count, 1);
        assert_eq!(engine.current_count(), 1);

        let display = engine.display();
        assert_eq!(display.today_total, 109);
        assert_eq!(display.mala_count, 1);
    }

    #[test]
    fn switching_flushes_remainder_and_starts_fresh() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 50);

        let effects = engine.select_chant(B);
        assert!(effects.history_changed);
        let entry = engine.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 50);
        assert_eq!(entry.mala_count, 0);
        assert_eq!(engine.active_chant(), B);
        assert_eq!(engine.current_count(), 0);
        assert!(!engine.timer().is_running());
    }

    #[test]
    fn switching_back_restores_partial_mala_without_double_counting() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 50);
        engine.select_chant(B);
        engine.select_chant(A);
        assert_eq!(engine.current_count(), 50);
        assert_eq!(engine.display().today_total, 50);

        count(&mut engine, 58);
        let entry = engine.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 108);
        assert_eq!(entry.mala_count, 1);
        assert_eq!(engine.current_count(), 0);

        count(&mut engine, 3);
        engine.select_chant(B);
        assert_eq!(engine.ledger().get(day(1), A).unwrap().count, 111);
    }

    #[test]
    fn unknown_chants_are_ignored() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 5);

        assert_eq!(engine.select_chant("nope"), Effects::default());
        assert_eq!(engine.increment(Some("nope")), Effects::default());
        assert_eq!(engine.active_chant(), A);
        assert_eq!(engine.current_count(), 5);
    }

    #[test]
    fn increment_for_another_chant_switches_first() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 4);

        engine.increment(Some(B));
        assert_eq!(engine.active_chant(), B);
        assert_eq!(engine.current_count(), 1);
        assert_eq!(engine.ledger().get(day(1), A).unwrap().count, 4);
    }

    #[test]
    fn day_boundary_flushes_under_previous_date_once() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        engine.increment(None);
        for _ in 0..3 {
            clock.advance_ms(500);
            engine.tick();
        }
        count(&mut engine, 9);
        assert_eq!(engine.elapsed_ms(), 3_000);

        clock.set_today(day(2));
        assert!(engine.check_day_boundary().history_changed);
        assert_eq!(engine.check_day_boundary(), Effects::default());
        assert_eq!(engine.check_day_boundary(), Effects::default());

        let entry = engine.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 10);
        assert_eq!(entry.time_spent_ms, 3_000);
        assert!(engine.ledger().get(day(2), A).is_none());
        assert_eq!(engine.current_count(), 0);
        assert_eq!(engine.elapsed_ms(), 0);
        assert_eq!(engine.today(), day(2));
        assert_eq!(engine.ledger().entries().len(), 1);
    }

    #[test]
    fn day_boundary_without_remainder_only_advances_date() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        clock.set_today(day(2));

        assert_eq!(engine.check_day_boundary(), Effects::default());
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.today(), day(2));
    }

    #[test]
    fn increments_after_midnight_count_toward_the_new_day() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 7);
        clock.set_today(day(2));
        count(&mut engine, 2);

        assert_eq!(engine.ledger().get(day(1), A).unwrap().count, 7);
        assert_eq!(engine.current_count(), 2);
        assert_eq!(engine.display().date, day(2));
    }

    #[test]
    fn timer_time_replaces_entry_time() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 108);
        assert_eq!(engine.ledger().get(day(1), A).unwrap().time_spent_ms, 0);

        clock.advance_ms(900);
        assert!(engine.tick().history_changed);
        clock.advance_ms(900);
        assert!(engine.tick().history_changed);
        assert_eq!(engine.ledger().get(day(1), A).unwrap().time_spent_ms, 2_000);

        clock.advance_ms(2_500);
        assert_eq!(engine.tick(), Effects::default());
        assert!(!engine.timer().is_running());
        assert_eq!(engine.elapsed_ms(), 2_000);
    }

    #[test]
    fn tick_after_midnight_leaves_previous_day_time_alone() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 108);

        clock.set_today(day(2));
        clock.advance_ms(500);
        engine.tick();
        engine.check_day_boundary();

        assert_eq!(engine.ledger().get(day(1), A).unwrap().time_spent_ms, 0);
        assert!(engine.ledger().get(day(2), A).is_none());
        assert_eq!(engine.today(), day(2));
        assert_eq!(engine.elapsed_ms(), 0);
        assert!(!engine.timer().is_running());
    }

    #[test]
    fn cold_start_resumes_todays_entry_for_first_chant() {
        let clock = ManualClock::new(0, day(1));
        let history = vec![HistoryEntry {
            date: day(1),
            chant: A.to_string(),
            count: 130,
            mala_count: 1,
            time_spent_ms: 42_000,
            last_updated: 0,
        }];
        let mut engine = engine_on(&clock, history);
        assert_eq!(engine.current_count(), 22);
        assert_eq!(engine.elapsed_ms(), 42_000);
        assert_eq!(engine.display().today_total, 130);

        count(&mut engine, 86);
        let entry = engine.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 216);
        assert_eq!(entry.mala_count, 2);
    }

    #[test]
    fn suspend_then_restart_resumes_remainder() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 40);
        assert!(engine.suspend().history_changed);
        assert_eq!(engine.current_count(), 40);
        assert!(!engine.suspend().history_changed);

        let history = engine.ledger().entries().to_vec();
        let mut restarted = engine_on(&clock, history);
        assert_eq!(restarted.current_count(), 40);
        count(&mut restarted, 68);
        let entry = restarted.ledger().get(day(1), A).unwrap();
        assert_eq!(entry.count, 108);
        assert_eq!(entry.mala_count, 1);
    }

    #[test]
    fn reset_discards_without_touching_history() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 20);
        engine.reset_session();
        engine.select_chant(B);

        assert!(engine.ledger().is_empty());
        assert_eq!(engine.elapsed_ms(), 0);
    }

    #[test]
    fn clearing_history_zeroes_aggregates() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());
        count(&mut engine, 120);
        clock.set_today(day(2));
        count(&mut engine, 110);

        assert!(engine.clear_date(day(1)).history_changed);
        assert_eq!(engine.ledger().aggregate(day(1), A), Totals::default());
        assert!(!engine.clear_date(day(1)).history_changed);

        assert!(engine.clear_all().history_changed);
        assert_eq!(engine.ledger().aggregate(day(2), A), Totals::default());
        assert_eq!(engine.display().today_total, 2);
    }

    #[test]
    fn custom_chants_can_be_added_and_removed() {
        let clock = ManualClock::new(0, day(1));
        let mut engine = engine_on(&clock, Vec::new());

        assert!(engine.add_custom_chant("  हरि  ").chants_changed);
        assert_eq!(engine.add_custom_chant("हरि"), Effects::default());
        assert_eq!(engine.add_custom_chant("   "), Effects::default());
        assert_eq!(engine.add_custom_chant(B), Effects::default());
        assert_eq!(engine.chants().custom, vec!["ॐ".to_string(), "हरि".to_string()]);

        assert_eq!(engine.remove_custom_chant(A), Effects::default());
        assert!(engine.is_known_chant(A));

        engine.select_chant("हरि");
        count(&mut engine, 3);
        let effects = engine.remove_custom_chant("हरि");
        assert!(effects.chants_changed);
        assert!(effects.history_changed);
        assert_eq!(engine.active_chant(), A);
        assert!(!engine.is_known_chant("हरि"));
        assert_eq!(engine.ledger().get(day(1), "हरि").unwrap().count, 3);
    }
}
