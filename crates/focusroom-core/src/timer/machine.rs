//! Session state machine.
//!
//! Pure transitions over [`TimerState`]: given the current state, the active
//! configuration and one [`Input`], produce the next state and at most one
//! [`Completion`]. No clock reads, no side effects.
//!
//! ## Phase cycle
//!
//! ```text
//! Work -> ShortBreak -> Work -> ... -> Work -> LongBreak -> Work
//!         (every `sessions_until_long_break`-th work completion is long)
//! ```
//!
//! A tick that overshoots the remaining time completes the phase once and
//! carries the leftover into the next phase, whether or not that phase
//! auto-starts. The carried time never consumes the whole next phase, so one
//! tick yields at most one completion no matter how large it is.

use serde::{Deserialize, Serialize};

use super::clock::TickEvent;
use super::config::SessionConfig;
use super::phase::Phase;

/// Carried-over time always leaves at least this much of the next phase.
pub const MIN_CARRY_REMAINDER_MS: u64 = 1_000;

/// Input consumed by [`TimerState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Tick(TickEvent),
    Start,
    Resume,
    Pause,
    Stop,
    Reset,
    Skip,
    SwitchPhase(Phase),
}

impl Input {
    pub fn name(&self) -> &'static str {
        match self {
            Input::Tick(_) => "tick",
            Input::Start => "start",
            Input::Resume => "resume",
            Input::Pause => "pause",
            Input::Stop => "stop",
            Input::Reset => "reset",
            Input::Skip => "skip",
            Input::SwitchPhase(_) => "switch_phase",
        }
    }
}

/// Signal that a phase finished, either by reaching zero or by `skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// The phase that expired.
    pub phase: Phase,
    /// The phase that was loaded in its place.
    pub next_phase: Phase,
    /// Work sessions completed so far, including this one.
    pub completed_work_sessions: u32,
    /// Whether the next phase started running on its own.
    pub auto_started: bool,
    /// Overshoot applied to the next phase's countdown.
    pub carried_over_ms: u64,
}

/// Outcome of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: TimerState,
    pub completed: Option<Completion>,
}

impl Transition {
    fn unchanged(state: TimerState) -> Self {
        Self {
            state,
            completed: None,
        }
    }
}

/// The engine's mutable core.
///
/// Invariants:
/// - `remaining_ms <= phase_total_ms`
/// - `is_running` implies `remaining_ms > 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    phase: Phase,
    remaining_ms: u64,
    /// Length the current phase was loaded with. A config swap does not
    /// change it, so the running countdown is never rescaled.
    phase_total_ms: u64,
    is_running: bool,
    completed_work_sessions: u32,
}

impl TimerState {
    /// Fresh state: stopped at the start of a full work phase.
    pub fn initial(config: &SessionConfig) -> Self {
        Self::loaded(Phase::Work, config, 0)
    }

    fn loaded(phase: Phase, config: &SessionConfig, completed_work_sessions: u32) -> Self {
        let total = config.duration_ms(phase);
        Self {
            phase,
            remaining_ms: total,
            phase_total_ms: total,
            is_running: false,
            completed_work_sessions,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Whole seconds left, rounded up so a running phase never shows zero.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    pub fn phase_total_ms(&self) -> u64 {
        self.phase_total_ms
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    /// Position inside the long-break cycle. Derived, never stored.
    pub fn cycle_count(&self, config: &SessionConfig) -> u32 {
        self.completed_work_sessions % config.sessions_until_long_break.max(1)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Apply one input.
    pub fn apply(self, config: &SessionConfig, input: Input) -> Transition {
        match input {
            Input::Tick(tick) => self.apply_tick(config, tick),
            Input::Start | Input::Resume => Transition::unchanged(self.started()),
            Input::Pause => Transition::unchanged(Self {
                is_running: false,
                ..self
            }),
            Input::Stop => Transition::unchanged(Self {
                is_running: false,
                ..Self::loaded(self.phase, config, self.completed_work_sessions)
            }),
            Input::Reset => Transition::unchanged(Self::initial(config)),
            Input::Skip => self.complete(config, 0),
            Input::SwitchPhase(phase) => Transition::unchanged(Self::loaded(
                phase,
                config,
                self.completed_work_sessions,
            )),
        }
    }

    fn started(self) -> Self {
        if self.remaining_ms == 0 {
            return self;
        }
        Self {
            is_running: true,
            ..self
        }
    }

    fn apply_tick(self, config: &SessionConfig, tick: TickEvent) -> Transition {
        if !self.is_running {
            return Transition::unchanged(self);
        }
        let elapsed_ms = u64::try_from(tick.elapsed.as_millis()).unwrap_or(u64::MAX);
        if elapsed_ms < self.remaining_ms {
            return Transition::unchanged(Self {
                remaining_ms: self.remaining_ms - elapsed_ms,
                ..self
            });
        }
        self.complete(config, elapsed_ms - self.remaining_ms)
    }

    /// Finish the current phase and load the next one.
    fn complete(self, config: &SessionConfig, overshoot_ms: u64) -> Transition {
        let expiring = self.phase;
        let completed_work_sessions = if expiring == Phase::Work {
            self.completed_work_sessions.saturating_add(1)
        } else {
            self.completed_work_sessions
        };
        let next_phase = expiring.next(completed_work_sessions, config.sessions_until_long_break);
        let auto_started = config.auto_start_after(expiring);

        let mut next = Self::loaded(next_phase, config, completed_work_sessions);
        let carried_over_ms =
            overshoot_ms.min(next.phase_total_ms.saturating_sub(MIN_CARRY_REMAINDER_MS));
        next.remaining_ms -= carried_over_ms;
        next.is_running = auto_started && next.remaining_ms > 0;

        Transition {
            state: next,
            completed: Some(Completion {
                phase: expiring,
                next_phase,
                completed_work_sessions,
                auto_started,
                carried_over_ms,
            }),
        }
    }
}
