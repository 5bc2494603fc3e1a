use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{format_mmss, progress_pct, Phase, SessionConfig, TimerState};

/// A phase finished, by reaching zero or by `skip`.
///
/// Drives the effect dispatcher and any UI transition; both observe the same
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseCompleted {
    pub phase: Phase,
    pub next_phase: Phase,
    pub completed_work_sessions: u32,
    /// Whether the next phase started running on its own.
    pub auto_started: bool,
    /// Minutes the expiring phase was loaded with.
    pub planned_min: u64,
    /// `true` when completion came from `skip` rather than the countdown.
    pub skipped: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Every state change in the engine produces an Event.
/// UI code subscribes to them; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Started {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    Paused {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    Stopped {
        phase: Phase,
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
    Skipped {
        from: Phase,
        to: Phase,
        at: DateTime<Utc>,
    },
    PhaseSwitched {
        from: Phase,
        to: Phase,
        at: DateTime<Utc>,
    },
    ConfigUpdated {
        config: SessionConfig,
        at: DateTime<Utc>,
    },
    PhaseCompleted(PhaseCompleted),
}

impl Event {
    pub fn phase_completed(&self) -> Option<&PhaseCompleted> {
        match self {
            Event::PhaseCompleted(done) => Some(done),
            _ => None,
        }
    }
}

/// Immutable copy of the timer state plus the values a view renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_ms: u64,
    pub remaining_seconds: u64,
    pub phase_total_seconds: u64,
    pub is_running: bool,
    pub completed_work_sessions: u32,
    /// Work sessions completed in the current long-break cycle.
    pub cycle_position: u32,
    pub sessions_until_long_break: u32,
    /// `MM:SS` of the remaining time.
    pub display: String,
    /// 0.0 .. 100.0 progress within the current phase.
    pub progress_pct: f64,
}

impl TimerSnapshot {
    pub fn capture(state: &TimerState, config: &SessionConfig) -> Self {
        let remaining_seconds = state.remaining_seconds();
        Self {
            phase: state.phase(),
            remaining_ms: state.remaining_ms(),
            remaining_seconds,
            phase_total_seconds: state.phase_total_ms() / 1000,
            is_running: state.is_running(),
            completed_work_sessions: state.completed_work_sessions(),
            cycle_position: state.cycle_count(config),
            sessions_until_long_break: config.sessions_until_long_break,
            display: format_mmss(remaining_seconds),
            progress_pct: progress_pct(state.remaining_ms(), state.phase_total_ms()),
        }
    }
}
