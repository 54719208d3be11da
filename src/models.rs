use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: NaiveDate,
    #[serde(rename = "chantText")]
    pub chant: String,
    pub count: u64,
    #[serde(default)]
    pub mala_count: u64,
    #[serde(rename = "timeSpent", default)]
    pub time_spent_ms: u64,
    #[serde(default)]
    pub last_updated: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub count: u64,
    pub mala_count: u64,
    pub time_spent_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateGroup {
    pub date: NaiveDate,
    pub entries: Vec<HistoryEntry>,
    pub total_count: u64,
    pub total_malas: u64,
    pub total_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub date: NaiveDate,
    pub chant: String,
    pub count: u32,
    pub mala_count: u64,
    pub today_total: u64,
    pub elapsed_ms: u64,
    pub elapsed: String,
    pub timer_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChantList {
    pub active: String,
    pub predefined: Vec<String>,
    pub custom: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Load,
    Save,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub key: String,
    pub message: String,
    pub at: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncrementRequest {
    pub chant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChantRequest {
    pub chant: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearDateRequest {
    pub date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: String,
    pub count: u64,
    pub malas: u64,
    pub time_spent_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
    pub week: String,
    pub start_date: String,
    pub end_date: String,
    pub count: u64,
    pub malas: u64,
    pub time_spent_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAveragePoint {
    pub week: String,
    pub days_counted: u8,
    pub avg_count: f64,
    pub avg_malas: f64,
    pub avg_time_ms: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub last_7_days: Vec<DailyPoint>,
    pub weekly_totals: Vec<WeeklyPoint>,
    pub weekly_averages: Vec<WeeklyAveragePoint>,
}

/// Formats milliseconds as `HH:MM:SS`.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
