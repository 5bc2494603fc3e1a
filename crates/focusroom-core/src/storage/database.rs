//! SQLite-based session log and statistics.
//!
//! Provides persistent storage for:
//! - Completed phases (work sessions count as pomodoros)
//! - Daily, weekly and per-task pomodoro statistics

use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::DatabaseError;
use crate::events::PhaseCompleted;
use crate::timer::Phase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub phase: Phase,
    pub duration_min: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub task_id: Option<String>,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_pomodoros: u64,
    pub total_minutes: u64,
    pub total_hours: f64,
    /// Work sessions per task, busiest first. Untagged sessions are left out.
    pub task_breakdown: Vec<TaskCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCount {
    pub task_id: String,
    pub count: u64,
    pub minutes: u64,
}

/// All-time work statistics for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub task_id: String,
    pub total_pomodoros: u64,
    pub total_minutes: u64,
    pub total_hours: f64,
    pub first_session: Option<DateTime<Utc>>,
    pub last_session: Option<DateTime<Utc>>,
    /// Only days with at least one session, oldest first.
    pub daily_counts: Vec<DayCount>,
}

/// Narrows [`Database::query_sessions`]. Date bounds are inclusive UTC days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub task_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_pomodoros: u64,
    pub total_minutes: u64,
    pub total_hours: f64,
    pub daily_breakdown: Vec<DayCount>,
    pub average_per_day: f64,
}

/// SQLite database for the session log.
pub struct Database {
    conn: Connection,
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_phase(idx: usize, raw: &str) -> rusqlite::Result<Phase> {
    raw.parse::<Phase>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

impl Database {
    /// Open the database at `~/.config/focusroom/focusroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("focusroom.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                phase        TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                started_at   TEXT NOT NULL,
                completed_at TEXT NOT NULL,
                task_id      TEXT,
                skipped      INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_phase_completed_at ON sessions(phase, completed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_task_id ON sessions(task_id);",
        )?;
        Ok(())
    }

    /// Record a completed phase.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        phase: Phase,
        duration_min: u64,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        task_id: Option<&str>,
        skipped: bool,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (phase, duration_min, started_at, completed_at, task_id, skipped)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                phase.as_str(),
                duration_min,
                ts(started_at),
                ts(completed_at),
                task_id,
                skipped,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record an engine completion.
    ///
    /// Skipped phases are logged with the minutes actually spent, natural
    /// completions with the planned length.
    pub fn record_completion(
        &self,
        done: &PhaseCompleted,
        task_id: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let duration_min = if done.skipped {
            let spent = (done.completed_at - done.started_at).num_minutes().max(0);
            u64::try_from(spent).unwrap_or(0).min(done.planned_min)
        } else {
            done.planned_min
        };
        self.record_session(
            done.phase,
            duration_min,
            done.started_at,
            done.completed_at,
            task_id,
            done.skipped,
        )
    }

    /// Most recent records first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.query_sessions(&SessionFilter::default(), limit)
    }

    /// Most recent matching records first.
    pub fn query_sessions(
        &self,
        filter: &SessionFilter,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, duration_min, started_at, completed_at, task_id, skipped
             FROM sessions
             WHERE (?1 IS NULL OR task_id = ?1)
               AND (?2 IS NULL OR completed_at >= ?2)
               AND (?3 IS NULL OR completed_at < ?3)
             ORDER BY completed_at DESC, id DESC
             LIMIT ?4",
        )?;
        let from = filter.from.map(|d| ts(day_start(d)));
        let until = filter.to.map(|d| ts(day_start(d) + Duration::days(1)));
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![filter.task_id, from, until, limit], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                phase: parse_phase(1, &row.get::<_, String>(1)?)?,
                duration_min: row.get(2)?,
                started_at: parse_ts(3, &row.get::<_, String>(3)?)?,
                completed_at: parse_ts(4, &row.get::<_, String>(4)?)?,
                task_id: row.get(5)?,
                skipped: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn delete_session(&self, id: i64) -> Result<(), DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    /// Work sessions and minutes per UTC day in `[from, from + days)`.
    fn work_by_day(&self, from: NaiveDate, days: u32) -> Result<Vec<DayCount>, DatabaseError> {
        let mut breakdown: Vec<DayCount> = (0..days)
            .map(|i| DayCount {
                date: from + Duration::days(i64::from(i)),
                count: 0,
                minutes: 0,
            })
            .collect();

        let start = day_start(from);
        let end = start + Duration::days(i64::from(days));
        let mut stmt = self.conn.prepare(
            "SELECT substr(completed_at, 1, 10), COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions
             WHERE phase = 'work' AND completed_at >= ?1 AND completed_at < ?2
             GROUP BY substr(completed_at, 1, 10)",
        )?;
        let rows = stmt.query_map(params![ts(start), ts(end)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        for row in rows {
            let (day, count, minutes) = row?;
            let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") else {
                continue;
            };
            if let Some(slot) = breakdown.iter_mut().find(|d| d.date == date) {
                slot.count = count;
                slot.minutes = minutes;
            }
        }
        Ok(breakdown)
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats, DatabaseError> {
        let day = self
            .work_by_day(date, 1)?
            .pop()
            .unwrap_or(DayCount {
                date,
                count: 0,
                minutes: 0,
            });
        Ok(DailyStats {
            date,
            total_pomodoros: day.count,
            total_minutes: day.minutes,
            total_hours: round2(day.minutes as f64 / 60.0),
            task_breakdown: self.tasks_on(date)?,
        })
    }

    fn tasks_on(&self, date: NaiveDate) -> Result<Vec<TaskCount>, DatabaseError> {
        let start = day_start(date);
        let mut stmt = self.conn.prepare(
            "SELECT task_id, COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions
             WHERE phase = 'work' AND task_id IS NOT NULL
               AND completed_at >= ?1 AND completed_at < ?2
             GROUP BY task_id
             ORDER BY COUNT(*) DESC, task_id",
        )?;
        let rows = stmt.query_map(params![ts(start), ts(start + Duration::days(1))], |row| {
            Ok(TaskCount {
                task_id: row.get(0)?,
                count: row.get(1)?,
                minutes: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Work statistics for one task across the whole log.
    ///
    /// An unknown task yields zero totals and no sessions.
    pub fn task_stats(&self, task_id: &str) -> Result<TaskStats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_at, duration_min
             FROM sessions
             WHERE phase = 'work' AND task_id = ?1
             ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            Ok((
                parse_ts(0, &row.get::<_, String>(0)?)?,
                row.get::<_, u64>(1)?,
            ))
        })?;

        let mut stats = TaskStats {
            task_id: task_id.to_string(),
            total_pomodoros: 0,
            total_minutes: 0,
            total_hours: 0.0,
            first_session: None,
            last_session: None,
            daily_counts: Vec::new(),
        };
        for row in rows {
            let (completed_at, minutes) = row?;
            stats.total_pomodoros += 1;
            stats.total_minutes += minutes;
            stats.first_session.get_or_insert(completed_at);
            stats.last_session = Some(completed_at);

            let date = completed_at.date_naive();
            match stats.daily_counts.last_mut() {
                Some(day) if day.date == date => {
                    day.count += 1;
                    day.minutes += minutes;
                }
                _ => stats.daily_counts.push(DayCount {
                    date,
                    count: 1,
                    minutes,
                }),
            }
        }
        stats.total_hours = round2(stats.total_minutes as f64 / 60.0);
        Ok(stats)
    }

    /// Seven-day statistics. `week_start` defaults to this week's Monday.
    pub fn weekly_stats(&self, week_start: Option<NaiveDate>) -> Result<WeeklyStats, DatabaseError> {
        let week_start = week_start.unwrap_or_else(|| week_start_of(Utc::now().date_naive()));
        let daily_breakdown = self.work_by_day(week_start, 7)?;
        let total_pomodoros: u64 = daily_breakdown.iter().map(|d| d.count).sum();
        let total_minutes: u64 = daily_breakdown.iter().map(|d| d.minutes).sum();
        Ok(WeeklyStats {
            week_start,
            week_end: week_start + Duration::days(6),
            total_pomodoros,
            total_minutes,
            total_hours: round2(total_minutes as f64 / 60.0),
            daily_breakdown,
            average_per_day: round2(total_pomodoros as f64 / 7.0),
        })
    }
}
