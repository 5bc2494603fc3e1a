mod clock;
mod config;
mod display;
mod machine;
mod phase;

pub use clock::{
    ManualSource, MonotonicSource, PhaseClock, TickEvent, Ticker, TimeSource,
    DEFAULT_TICK_INTERVAL,
};
pub use config::SessionConfig;
pub use display::{format_mmss, progress_pct};
pub use machine::{Completion, Input, TimerState, Transition, MIN_CARRY_REMAINDER_MS};
pub use phase::Phase;
