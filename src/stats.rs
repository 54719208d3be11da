use crate::ledger::HistoryLedger;
use crate::models::{DailyPoint, StatsResponse, WeeklyAveragePoint, WeeklyPoint};
use chrono::{Datelike, Duration, NaiveDate};

pub fn build_stats_at(today: NaiveDate, ledger: &HistoryLedger) -> StatsResponse {
    const WEEK_COUNT: usize = 8;

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset as i64);
        let totals = ledger.day_totals(date);
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            count: totals.count,
            malas: totals.mala_count,
            time_spent_ms: totals.time_spent_ms,
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_totals = Vec::with_capacity(WEEK_COUNT);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let mut count = 0u64;
        let mut malas = 0u64;
        let mut time_spent_ms = 0u64;
        for day_offset in 0..7 {
            let totals = ledger.day_totals(start + Duration::days(day_offset));
            count = count.saturating_add(totals.count);
            malas = malas.saturating_add(totals.mala_count);
            time_spent_ms = time_spent_ms.saturating_add(totals.time_spent_ms);
        }

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };

        let denom = if days_counted == 0 { 1.0 } else { f64::from(days_counted) };

        weekly_totals.push(WeeklyPoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            count,
            malas,
            time_spent_ms,
        });

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            days_counted,
            avg_count: count as f64 / denom,
            avg_malas: malas as f64 / denom,
            avg_time_ms: time_spent_ms as f64 / denom,
        });
    }

    StatsResponse {
        last_7_days,
        weekly_totals,
        weekly_averages,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_last_7_days_includes_each_day() {
        let mut ledger = HistoryLedger::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let two_days_ago = today - Duration::days(2);
        ledger.merge_flush(two_days_ago, "A", 216, 2, 60_000, 0);
        ledger.merge_flush(two_days_ago, "B", 50, 0, 10_000, 0);

        let stats = build_stats_at(today, &ledger);
        assert_eq!(stats.last_7_days.len(), 7);
        let point = stats
            .last_7_days
            .iter()
            .find(|day| day.date == two_days_ago.to_string())
            .expect("missing day");
        assert_eq!(point.count, 266);
        assert_eq!(point.malas, 2);
        assert_eq!(point.time_spent_ms, 70_000);
    }

    #[test]
    fn stats_weekly_series_lengths() {
        let ledger = HistoryLedger::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let stats = build_stats_at(today, &ledger);
        assert_eq!(stats.weekly_totals.len(), 8);
        assert_eq!(stats.weekly_averages.len(), 8);
        assert_eq!(stats.last_7_days.len(), 7);
    }

    #[test]
    fn current_week_average_uses_days_so_far() {
        let mut ledger = HistoryLedger::default();
        // 2026-01-07 is a Wednesday.
        let today = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        ledger.merge_flush(today, "A", 324, 3, 0, 0);

        let stats = build_stats_at(today, &ledger);
        let current = stats.weekly_averages.last().unwrap();
        assert_eq!(current.days_counted, 3);
        assert_eq!(current.avg_count, 108.0);
        assert_eq!(stats.weekly_totals.last().unwrap().week, "2026-W02");
    }
}
