//! Focus engine facade.
//!
//! The only surface UI code talks to. Owns the timer state, the active
//! configuration, the phase clock and the effect dispatcher. Commands and
//! ticks take `&mut self`, so they are applied one at a time; the async
//! [`EngineHandle`](crate::service::EngineHandle) adds a queue in front of it
//! for hosts with concurrent callers.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = FocusEngine::new(SessionConfig::default())?;
//! let mut states = engine.subscribe_state();
//! engine.start()?;
//! // In the host timer callback:
//! if let Some(done) = engine.tick() {
//!     println!("{} finished", done.phase);
//! }
//! ```

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::effects::EffectDispatcher;
use crate::error::EngineError;
use crate::events::{Event, PhaseCompleted, TimerSnapshot};
use crate::timer::{
    Input, MonotonicSource, Phase, PhaseClock, SessionConfig, TickEvent, TimeSource, TimerState,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How commands issued after [`FocusEngine::dispose`] are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MisusePolicy {
    /// Return [`EngineError::Disposed`].
    Strict,
    /// Ignore the command.
    Lenient,
}

impl Default for MisusePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            MisusePolicy::Strict
        } else {
            MisusePolicy::Lenient
        }
    }
}

/// Pomodoro engine: state machine, clock, effects and subscriptions.
pub struct FocusEngine<S: TimeSource = MonotonicSource> {
    config: SessionConfig,
    state: TimerState,
    clock: PhaseClock<S>,
    effects: EffectDispatcher,
    /// When the current phase first started running.
    phase_started_at: Option<DateTime<Utc>>,
    state_tx: watch::Sender<TimerSnapshot>,
    events_tx: broadcast::Sender<Event>,
    misuse: MisusePolicy,
    disposed: bool,
}

impl FocusEngine<MonotonicSource> {
    /// Create an engine on the monotonic host clock with no effects.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(config: SessionConfig) -> Result<Self, EngineError> {
        Self::with_source(config, MonotonicSource::new())
    }
}

impl<S: TimeSource> FocusEngine<S> {
    /// Create an engine reading time from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn with_source(config: SessionConfig, source: S) -> Result<Self, EngineError> {
        config.validate()?;
        let state = TimerState::initial(&config);
        let (state_tx, _) = watch::channel(TimerSnapshot::capture(&state, &config));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut clock = PhaseClock::new(source);
        clock.start();
        Ok(Self {
            config,
            state,
            clock,
            effects: EffectDispatcher::silent(),
            phase_started_at: None,
            state_tx,
            events_tx,
            misuse: MisusePolicy::default(),
            disposed: false,
        })
    }

    pub fn with_effects(mut self, effects: EffectDispatcher) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_misuse_policy(mut self, misuse: MisusePolicy) -> Self {
        self.misuse = misuse;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::capture(&self.state, &self.config)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn clock(&self) -> &PhaseClock<S> {
        &self.clock
    }

    /// Latest snapshot, updated after every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<TimerSnapshot> {
        self.state_tx.subscribe()
    }

    /// Command events and phase completions.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down. No-op when already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.run_command("start", Input::Start)
    }

    /// Continue a paused countdown. Same transition as `start`.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.run_command("resume", Input::Resume)
    }

    /// Halt the countdown, keeping the remaining time.
    ///
    /// Time since the last tick is applied first so nothing is lost. If that
    /// finishes the phase, the completion is returned and the next phase is
    /// left paused.
    pub fn pause(&mut self) -> Result<Option<PhaseCompleted>, EngineError> {
        if !self.accept("pause")? || !self.state.is_running() {
            return Ok(None);
        }
        let completed = match self.clock.sample() {
            Some(tick) => self.apply(Input::Tick(tick)),
            None => None,
        };
        let before = self.state;
        self.apply(Input::Pause);
        if self.state != before {
            self.emit(Event::Paused {
                phase: self.state.phase(),
                remaining_ms: self.state.remaining_ms(),
                at: Utc::now(),
            });
        }
        Ok(completed)
    }

    /// Halt and reload the current phase at its full configured length.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.run_command("stop", Input::Stop)
    }

    /// Back to a fresh work phase with the session counter cleared.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.run_command("reset", Input::Reset)
    }

    /// Complete the current phase immediately.
    pub fn skip(&mut self) -> Result<Option<PhaseCompleted>, EngineError> {
        if !self.accept("skip")? {
            return Ok(None);
        }
        let from = self.state.phase();
        let completed = self.apply(Input::Skip);
        self.clock.rebase();
        self.emit(Event::Skipped {
            from,
            to: self.state.phase(),
            at: Utc::now(),
        });
        Ok(completed)
    }

    /// Manually select a phase. Stops the countdown; counters unchanged.
    pub fn switch_phase(&mut self, phase: Phase) -> Result<(), EngineError> {
        self.run_command("switch_phase", Input::SwitchPhase(phase))
    }

    /// Replace the configuration. The running phase keeps its countdown;
    /// new durations apply from the next phase load.
    pub fn update_config(&mut self, config: SessionConfig) -> Result<(), EngineError> {
        if !self.accept("update_config")? {
            return Ok(());
        }
        config.validate()?;
        debug!(?config, "configuration replaced");
        self.config = config;
        self.publish_state();
        self.emit(Event::ConfigUpdated {
            config: self.config.clone(),
            at: Utc::now(),
        });
        Ok(())
    }

    /// Host timer callback: measure elapsed time and apply it.
    ///
    /// Returns `None` after disposal.
    pub fn tick(&mut self) -> Option<PhaseCompleted> {
        if self.disposed {
            return None;
        }
        let tick = self.clock.sample()?;
        self.apply(Input::Tick(tick))
    }

    /// Apply an externally measured tick.
    ///
    /// For hosts that measure time themselves. The clock reference moves to
    /// now so a later `pause` does not count the same interval twice.
    pub fn apply_tick(&mut self, tick: TickEvent) -> Result<Option<PhaseCompleted>, EngineError> {
        if !self.accept("apply_tick")? {
            return Ok(None);
        }
        let completed = self.apply(Input::Tick(tick));
        self.clock.rebase();
        Ok(completed)
    }

    /// Tear down: stop the clock. Later commands are misuse.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clock.stop();
        self.disposed = true;
        debug!("engine disposed");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn accept(&self, command: &'static str) -> Result<bool, EngineError> {
        if !self.disposed {
            return Ok(true);
        }
        match self.misuse {
            MisusePolicy::Strict => Err(EngineError::Disposed { command }),
            MisusePolicy::Lenient => {
                debug!(command, "command ignored after dispose");
                Ok(false)
            }
        }
    }

    /// Commands that can never complete a phase.
    fn run_command(&mut self, name: &'static str, input: Input) -> Result<(), EngineError> {
        if !self.accept(name)? {
            return Ok(());
        }
        let before = self.state;
        self.apply(input);
        if self.state == before {
            return Ok(());
        }
        // Paused time and time spent in a discarded countdown are not counted.
        self.clock.rebase();

        let at = Utc::now();
        let phase = self.state.phase();
        let remaining_ms = self.state.remaining_ms();
        let event = match input {
            Input::Start => Event::Started {
                phase,
                remaining_ms,
                at,
            },
            Input::Resume => Event::Resumed {
                phase,
                remaining_ms,
                at,
            },
            Input::Stop => Event::Stopped { phase, at },
            Input::Reset => Event::Reset { at },
            Input::SwitchPhase(to) => Event::PhaseSwitched {
                from: before.phase(),
                to,
                at,
            },
            Input::Tick(_) | Input::Pause | Input::Skip => return Ok(()),
        };
        self.emit(event);
        Ok(())
    }

    /// Run one transition and publish its consequences.
    fn apply(&mut self, input: Input) -> Option<PhaseCompleted> {
        let before = self.state;
        let transition = before.apply(&self.config, input);
        self.state = transition.state;
        let now = Utc::now();

        let completed = transition.completed.map(|c| PhaseCompleted {
            phase: c.phase,
            next_phase: c.next_phase,
            completed_work_sessions: c.completed_work_sessions,
            auto_started: c.auto_started,
            planned_min: before.phase_total_ms() / 60_000,
            skipped: matches!(input, Input::Skip),
            started_at: self.phase_started_at.unwrap_or(now),
            completed_at: now,
        });

        let phase_reloaded = completed.is_some()
            || matches!(
                input,
                Input::Stop | Input::Reset | Input::SwitchPhase(_)
            );
        if phase_reloaded {
            self.phase_started_at = self.state.is_running().then_some(now);
        } else if self.state.is_running() && self.phase_started_at.is_none() {
            self.phase_started_at = Some(now);
        }

        if let Some(done) = &completed {
            info!(
                phase = %done.phase,
                next = %done.next_phase,
                sessions = done.completed_work_sessions,
                carried_over_ms = transition.completed.map_or(0, |c| c.carried_over_ms),
                "phase completed"
            );
            self.effects.on_phase_completed(done, &self.config);
            self.emit(Event::PhaseCompleted(done.clone()));
        }

        if self.state != before {
            debug!(
                input = input.name(),
                phase = %self.state.phase(),
                remaining_ms = self.state.remaining_ms(),
                running = self.state.is_running(),
                "timer state changed"
            );
            self.publish_state();
        }
        completed
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

impl<S: TimeSource> Drop for FocusEngine<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: TimeSource> std::fmt::Debug for FocusEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualSource;
    use std::time::Duration;

    fn engine() -> (FocusEngine<ManualSource>, ManualSource) {
        let source = ManualSource::new();
        let engine = FocusEngine::with_source(SessionConfig::default(), source.clone()).unwrap();
        (engine, source)
    }

    #[test]
    fn rejects_invalid_config_at_construction() {
        let config = SessionConfig {
            work_duration: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            FocusEngine::new(config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn clock_ticks_drive_countdown() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance_secs(1);
        assert!(engine.tick().is_none());
        assert_eq!(engine.snapshot().display, "24:59");
    }

    #[test]
    fn paused_time_is_not_counted() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance_secs(10);
        engine.tick();
        engine.pause().unwrap();
        source.advance_secs(600);
        engine.tick();
        engine.resume().unwrap();
        source.advance_secs(5);
        engine.tick();
        assert_eq!(engine.state().remaining_seconds(), 25 * 60 - 15);
    }

    #[test]
    fn pause_flushes_time_since_last_tick() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance(Duration::from_millis(700));
        engine.pause().unwrap();
        assert_eq!(engine.state().remaining_ms(), 25 * 60 * 1000 - 700);
        let before = engine.state();
        engine.pause().unwrap();
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn idle_time_before_start_is_not_counted() {
        let (mut engine, source) = engine();
        source.advance_secs(3_600);
        engine.start().unwrap();
        source.advance_secs(1);
        engine.tick();
        assert_eq!(engine.state().remaining_seconds(), 25 * 60 - 1);
    }

    #[test]
    fn start_while_running_keeps_clock_reference() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance_secs(2);
        engine.start().unwrap();
        engine.tick();
        assert_eq!(engine.state().remaining_seconds(), 25 * 60 - 2);
    }

    #[test]
    fn suspended_host_catches_up_in_one_tick() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance_secs(40);
        engine.tick();
        assert_eq!(engine.state().remaining_seconds(), 25 * 60 - 40);
    }

    #[test]
    fn completion_is_broadcast_and_state_published() {
        let (mut engine, source) = engine();
        let mut events = engine.subscribe_events();
        let states = engine.subscribe_state();
        engine.start().unwrap();
        source.advance_secs(25 * 60);
        let done = engine.tick().expect("work should complete");
        assert_eq!(done.phase, Phase::Work);
        assert_eq!(done.planned_min, 25);
        assert!(!done.skipped);

        assert!(matches!(events.try_recv().unwrap(), Event::Started { .. }));
        match events.try_recv().unwrap() {
            Event::PhaseCompleted(c) => assert_eq!(c, done),
            other => panic!("expected completion, got {other:?}"),
        }
        let snap = states.borrow().clone();
        assert_eq!(snap.phase, Phase::ShortBreak);
        assert!(snap.is_running);
        assert_eq!(snap.display, "05:00");
    }

    #[test]
    fn skip_marks_completion_as_skipped() {
        let (mut engine, _) = engine();
        let mut events = engine.subscribe_events();
        let done = engine.skip().unwrap().unwrap();
        assert!(done.skipped);
        assert_eq!(done.next_phase, Phase::ShortBreak);
        assert!(events.try_recv().unwrap().phase_completed().is_some());
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::Skipped {
                from: Phase::Work,
                to: Phase::ShortBreak,
                ..
            }
        ));
    }

    #[test]
    fn update_config_keeps_running_countdown() {
        let (mut engine, source) = engine();
        engine.start().unwrap();
        source.advance_secs(15 * 60);
        engine.tick();
        engine
            .update_config(SessionConfig {
                work_duration: 50,
                ..SessionConfig::default()
            })
            .unwrap();
        assert_eq!(engine.state().remaining_seconds(), 600);
        engine.stop().unwrap();
        assert_eq!(engine.state().remaining_seconds(), 50 * 60);
    }

    #[test]
    fn update_config_rejects_invalid() {
        let (mut engine, _) = engine();
        let bad = SessionConfig {
            sessions_until_long_break: 0,
            ..SessionConfig::default()
        };
        assert!(engine.update_config(bad).is_err());
        assert_eq!(engine.config().sessions_until_long_break, 4);
    }

    #[test]
    fn strict_policy_rejects_commands_after_dispose() {
        let (engine, _) = engine();
        let mut engine = engine.with_misuse_policy(MisusePolicy::Strict);
        engine.dispose();
        assert!(!engine.clock().is_started());
        assert_eq!(
            engine.start(),
            Err(EngineError::Disposed { command: "start" })
        );
        assert!(engine.skip().is_err());
        assert!(engine.tick().is_none());
    }

    #[test]
    fn lenient_policy_ignores_commands_after_dispose() {
        let (engine, _) = engine();
        let mut engine = engine.with_misuse_policy(MisusePolicy::Lenient);
        let before = engine.state();
        engine.dispose();
        engine.dispose();
        assert!(engine.start().is_ok());
        assert_eq!(engine.skip(), Ok(None));
        assert_eq!(engine.state(), before);
    }

    #[test]
    fn phase_start_time_recorded_on_first_start() {
        let (mut engine, _) = engine();
        engine.start().unwrap();
        let done = engine.skip().unwrap().unwrap();
        assert!(done.started_at <= done.completed_at);
    }
}
