// Library surface for the binary and for headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod arena;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod game;
pub mod games;
pub mod record;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod time_series;
pub mod timer;
pub mod trial;
pub mod ui;
pub mod util;

pub use app::{App, AppAction, AppState};
pub use error::{GymError, Result};
pub use game::GameType;
