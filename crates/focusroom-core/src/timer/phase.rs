use serde::{Deserialize, Serialize};

/// Countdown mode. Selects which configured duration applies and which
/// rule picks the next phase when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Work)
    }

    /// Human-readable label used in notifications and the CLI.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus session",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }

    /// Stable machine name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Phase that follows `self` once it completes.
    ///
    /// `completed_work_sessions` must already include the session that just
    /// finished when `self` is `Work`.
    pub fn next(self, completed_work_sessions: u32, sessions_until_long_break: u32) -> Phase {
        match self {
            Phase::Work => {
                if sessions_until_long_break > 0
                    && completed_work_sessions % sessions_until_long_break == 0
                {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "work" | "focus" => Ok(Phase::Work),
            "short_break" | "short" => Ok(Phase::ShortBreak),
            "long_break" | "long" => Ok(Phase::LongBreak),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_goes_to_long_break_on_cycle_boundary() {
        assert_eq!(Phase::Work.next(1, 4), Phase::ShortBreak);
        assert_eq!(Phase::Work.next(3, 4), Phase::ShortBreak);
        assert_eq!(Phase::Work.next(4, 4), Phase::LongBreak);
        assert_eq!(Phase::Work.next(8, 4), Phase::LongBreak);
    }

    #[test]
    fn single_session_cycle_always_long_break() {
        assert_eq!(Phase::Work.next(1, 1), Phase::LongBreak);
        assert_eq!(Phase::Work.next(2, 1), Phase::LongBreak);
    }

    #[test]
    fn breaks_return_to_work() {
        assert_eq!(Phase::ShortBreak.next(2, 4), Phase::Work);
        assert_eq!(Phase::LongBreak.next(4, 4), Phase::Work);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("focus".parse::<Phase>().unwrap(), Phase::Work);
        assert_eq!("short-break".parse::<Phase>().unwrap(), Phase::ShortBreak);
        assert_eq!("LONG".parse::<Phase>().unwrap(), Phase::LongBreak);
        assert!("nap".parse::<Phase>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Phase::ShortBreak).unwrap();
        assert_eq!(json, "\"short_break\"");
    }
}
