//! Effect dispatch.
//!
//! Turns each [`PhaseCompleted`] into at most one sound and at most one
//! notification. Capabilities are supplied by the host; their failures are
//! logged and swallowed so a broken speaker never stops the timer.

use tracing::{debug, warn};

use crate::error::EffectError;
use crate::events::PhaseCompleted;
use crate::timer::{Phase, SessionConfig};

/// Plays a short completion sound.
pub trait SoundPlayer: Send {
    /// `volume` is 0-100.
    fn play(&mut self, volume: u8) -> Result<(), EffectError>;
}

/// Notification permission as last reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

/// Displays a system notification.
///
/// Asking for permission is the host's job; the dispatcher only reads it.
pub trait Notifier: Send {
    fn permission(&self) -> Permission;
    fn notify(&mut self, title: &str, body: &str) -> Result<(), EffectError>;
}

/// Sound player that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSound;

impl SoundPlayer for NoSound {
    fn play(&mut self, _volume: u8) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Notifier without permission; never displays anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNotifier;

impl Notifier for NoNotifier {
    fn permission(&self) -> Permission {
        Permission::Undetermined
    }

    fn notify(&mut self, _title: &str, _body: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

/// What happened to one effect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    Delivered,
    /// Turned off in the session configuration.
    Disabled,
    /// Notification permission denied or not yet decided.
    NoPermission,
    Failed(EffectError),
}

/// Result of dispatching one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectReport {
    pub sound: EffectOutcome,
    pub notification: EffectOutcome,
}

/// Notification title and body for a completion.
pub fn notification_text(event: &PhaseCompleted) -> (String, String) {
    let title = format!("{} complete", event.phase.label());
    let body = match event.next_phase {
        Phase::Work => "Start the next focus session".to_string(),
        Phase::ShortBreak => "Time for a short break".to_string(),
        Phase::LongBreak => format!(
            "{} sessions done. Time for a long break",
            event.completed_work_sessions
        ),
    };
    (title, body)
}

/// Fire-and-forget dispatcher. No retries, no queue.
pub struct EffectDispatcher {
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn Notifier>,
}

impl EffectDispatcher {
    pub fn new(sound: Box<dyn SoundPlayer>, notifier: Box<dyn Notifier>) -> Self {
        Self { sound, notifier }
    }

    /// Dispatcher with no host capabilities.
    pub fn silent() -> Self {
        Self::new(Box::new(NoSound), Box::new(NoNotifier))
    }

    /// Trigger the effects for one completion, each at most once.
    pub fn on_phase_completed(
        &mut self,
        event: &PhaseCompleted,
        config: &SessionConfig,
    ) -> EffectReport {
        let sound = self.play_sound(config);
        let notification = self.send_notification(event, config);
        debug!(?sound, ?notification, phase = %event.phase, "effects dispatched");
        EffectReport {
            sound,
            notification,
        }
    }

    fn play_sound(&mut self, config: &SessionConfig) -> EffectOutcome {
        if !config.sound_enabled {
            return EffectOutcome::Disabled;
        }
        match self.sound.play(config.sound_volume.min(100)) {
            Ok(()) => EffectOutcome::Delivered,
            Err(e) => {
                warn!(error = %e, "completion sound failed");
                EffectOutcome::Failed(e)
            }
        }
    }

    fn send_notification(&mut self, event: &PhaseCompleted, config: &SessionConfig) -> EffectOutcome {
        if !config.notifications_enabled {
            return EffectOutcome::Disabled;
        }
        if self.notifier.permission() != Permission::Granted {
            return EffectOutcome::NoPermission;
        }
        let (title, body) = notification_text(event);
        match self.notifier.notify(&title, &body) {
            Ok(()) => EffectOutcome::Delivered,
            Err(e) => {
                warn!(error = %e, "completion notification failed");
                EffectOutcome::Failed(e)
            }
        }
    }
}

impl Default for EffectDispatcher {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for EffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        plays: Arc<Mutex<Vec<u8>>>,
        notes: Arc<Mutex<Vec<(String, String)>>>,
    }

    struct FakeSound {
        rec: Recorder,
        fail: bool,
    }

    impl SoundPlayer for FakeSound {
        fn play(&mut self, volume: u8) -> Result<(), EffectError> {
            if self.fail {
                return Err(EffectError::PlaybackBlocked("autoplay".into()));
            }
            self.rec.plays.lock().unwrap().push(volume);
            Ok(())
        }
    }

    struct FakeNotifier {
        rec: Recorder,
        permission: Permission,
    }

    impl Notifier for FakeNotifier {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn notify(&mut self, title: &str, body: &str) -> Result<(), EffectError> {
            self.rec
                .notes
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn completed(next: Phase) -> PhaseCompleted {
        PhaseCompleted {
            phase: Phase::Work,
            next_phase: next,
            completed_work_sessions: 4,
            auto_started: true,
            planned_min: 25,
            skipped: false,
            started_at: Utc::now(),
            completed_at: Utc::now(),
        }
    }

    fn dispatcher(rec: &Recorder, fail: bool, permission: Permission) -> EffectDispatcher {
        EffectDispatcher::new(
            Box::new(FakeSound {
                rec: rec.clone(),
                fail,
            }),
            Box::new(FakeNotifier {
                rec: rec.clone(),
                permission,
            }),
        )
    }

    #[test]
    fn one_completion_fires_each_effect_once() {
        let rec = Recorder::default();
        let mut d = dispatcher(&rec, false, Permission::Granted);
        let report = d.on_phase_completed(&completed(Phase::ShortBreak), &SessionConfig::default());
        assert_eq!(report.sound, EffectOutcome::Delivered);
        assert_eq!(report.notification, EffectOutcome::Delivered);
        assert_eq!(*rec.plays.lock().unwrap(), vec![50]);
        let notes = rec.notes.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, "Focus session complete");
        assert_eq!(notes[0].1, "Time for a short break");
    }

    #[test]
    fn disabled_effects_do_nothing() {
        let rec = Recorder::default();
        let mut d = dispatcher(&rec, false, Permission::Granted);
        let config = SessionConfig {
            sound_enabled: false,
            notifications_enabled: false,
            ..SessionConfig::default()
        };
        let report = d.on_phase_completed(&completed(Phase::ShortBreak), &config);
        assert_eq!(report.sound, EffectOutcome::Disabled);
        assert_eq!(report.notification, EffectOutcome::Disabled);
        assert!(rec.plays.lock().unwrap().is_empty());
        assert!(rec.notes.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_permission_skips_silently() {
        for permission in [Permission::Denied, Permission::Undetermined] {
            let rec = Recorder::default();
            let mut d = dispatcher(&rec, false, permission);
            let report = d.on_phase_completed(&completed(Phase::ShortBreak), &SessionConfig::default());
            assert_eq!(report.notification, EffectOutcome::NoPermission);
            assert!(rec.notes.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn playback_failure_is_reported_not_raised() {
        let rec = Recorder::default();
        let mut d = dispatcher(&rec, true, Permission::Granted);
        let report = d.on_phase_completed(&completed(Phase::LongBreak), &SessionConfig::default());
        assert!(matches!(report.sound, EffectOutcome::Failed(EffectError::PlaybackBlocked(_))));
        assert_eq!(report.notification, EffectOutcome::Delivered);
    }

    #[test]
    fn long_break_text_mentions_session_count() {
        let (_, body) = notification_text(&completed(Phase::LongBreak));
        assert!(body.starts_with("4 sessions done"));
    }
}
