use std::{env, ops::RangeInclusive, path::PathBuf, time::Duration};

pub const PREDEFINED_CHANTS: [&str; 2] = ["राम कृष्ण हरी", "राधा"];

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub save_debounce: Duration,
    pub inactivity_timeout_ms: u64,
    pub day_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("data"),
            save_debounce: Duration::from_millis(1_000),
            inactivity_timeout_ms: 2_000,
            day_poll_interval: Duration::from_millis(60_000),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            data_dir: env::var("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            save_debounce: Duration::from_millis(ms_from_env(
                "SAVE_DEBOUNCE_MS",
                50..=60_000,
                1_000,
            )),
            inactivity_timeout_ms: ms_from_env("INACTIVITY_TIMEOUT_MS", 500..=600_000, 2_000),
            day_poll_interval: Duration::from_millis(ms_from_env(
                "DAY_POLL_INTERVAL_MS",
                1_000..=3_600_000,
                60_000,
            )),
        }
    }
}

fn ms_from_env(name: &str, range: RangeInclusive<u64>, default: u64) -> u64 {
    parse_ms(env::var(name).ok().as_deref(), range, default)
}

fn parse_ms(raw: Option<&str>, range: RangeInclusive<u64>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}
