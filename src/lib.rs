pub mod app;
pub mod clock;
pub mod config;
pub mod counter;
pub mod day;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod persistence;
pub mod state;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use engine::ChantEngine;
pub use state::{AppState, BackgroundTasks, Session};
pub use storage::FileStore;
