mod config;
pub mod database;

pub use config::{BehaviorSettings, NotificationSettings, Settings, TimerSettings};
pub use database::{
    DailyStats, Database, DayCount, SessionFilter, SessionRecord, TaskCount, TaskStats, WeeklyStats,
};

use std::path::PathBuf;

/// Returns `~/.config/focusroom[-dev]/`.
///
/// Set FOCUSROOM_ENV=dev to use the development data directory, or
/// FOCUSROOM_HOME to use an explicit directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("FOCUSROOM_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusroom-dev")
            } else {
                base_dir.join("focusroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
