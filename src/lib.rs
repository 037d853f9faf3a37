pub mod app;
pub mod calendar;
pub mod cloud;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod selection;
pub mod state;
pub mod storage;
pub mod sync;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_moods, persist_moods};
