use serde::{Deserialize, Serialize};

use super::phase::Phase;
use crate::error::ConfigError;

/// Durations and behaviour flags for one engine.
///
/// Treated as an immutable value: the engine validates it on
/// construction and on `update_config`, and replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Work phase length in minutes.
    pub work_duration: u32,
    /// Short break length in minutes.
    pub short_break_duration: u32,
    /// Long break length in minutes.
    pub long_break_duration: u32,
    /// Completed work sessions per long break.
    pub sessions_until_long_break: u32,
    pub auto_start_breaks: bool,
    pub auto_start_work: bool,
    pub sound_enabled: bool,
    /// Playback volume, 0-100.
    pub sound_volume: u8,
    pub notifications_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            sessions_until_long_break: 4,
            auto_start_breaks: true,
            auto_start_work: false,
            sound_enabled: true,
            sound_volume: 50,
            notifications_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Reject configurations the state machine must never see.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("work_duration", self.work_duration),
            ("short_break_duration", self.short_break_duration),
            ("long_break_duration", self.long_break_duration),
        ];
        for (key, minutes) in durations {
            if minutes == 0 {
                return Err(ConfigError::invalid(key, "must be greater than 0 minutes"));
            }
        }
        if self.sessions_until_long_break < 1 {
            return Err(ConfigError::invalid(
                "sessions_until_long_break",
                "must be at least 1",
            ));
        }
        if self.sound_volume > 100 {
            return Err(ConfigError::invalid(
                "sound_volume",
                format!("{} is outside 0-100", self.sound_volume),
            ));
        }
        Ok(())
    }

    /// Validate and return `self`, for builder-style construction.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Configured length of `phase` in minutes.
    pub fn duration_min(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_duration,
            Phase::ShortBreak => self.short_break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    /// Configured length of `phase` in milliseconds.
    ///
    /// Uses saturating arithmetic so absurd minute values cannot overflow.
    pub fn duration_ms(&self, phase: Phase) -> u64 {
        u64::from(self.duration_min(phase))
            .saturating_mul(60)
            .saturating_mul(1000)
    }

    /// Auto-start flag consulted when leaving `from`.
    pub fn auto_start_after(&self, from: Phase) -> bool {
        match from {
            Phase::Work => self.auto_start_breaks,
            Phase::ShortBreak | Phase::LongBreak => self.auto_start_work,
        }
    }
}
