use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use focusroom_core::storage::{Database, SessionFilter};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats (UTC)
    Today {
        /// Another day instead, as YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Seven-day stats
    Week {
        /// First day of the week, as YYYY-MM-DD (default: this Monday)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// All-time stats for one task
    Task {
        /// Task ID, as passed to `run --task-id`
        id: String,
    },
    /// Recent session records
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only sessions tagged with this task
        #[arg(long)]
        task: Option<String>,
        /// Earliest day, as YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest day, as YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Delete a session record
    Delete {
        /// Record ID, as shown by `stats log`
        id: i64,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today { date } => {
            let stats = db.daily_stats(date.unwrap_or_else(|| Utc::now().date_naive()))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Week { start } => {
            let stats = db.weekly_stats(start)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Task { id } => {
            let stats = db.task_stats(&id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Log {
            limit,
            task,
            from,
            to,
        } => {
            let filter = SessionFilter {
                task_id: task,
                from,
                to,
            };
            let sessions = db.query_sessions(&filter, limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        StatsAction::Delete { id } => {
            db.delete_session(id)?;
            println!("deleted session {id}");
        }
    }
    Ok(())
}
