//! # Focusroom Core Library
//!
//! This library provides the core logic for the Focusroom Pomodoro timer.
//! The `focusroom` CLI binary is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Timer**: A pure phase state machine driven by elapsed-time ticks
//!   from a monotonic clock
//! - **Engine**: Command facade that owns the clock, validates usage and
//!   publishes snapshots and events
//! - **Service**: Async actor that serializes commands and ticks on one queue
//! - **Effects**: Sound and notification side effects on phase completion
//! - **Storage**: SQLite session log and TOML-based settings
//!
//! ## Key Components
//!
//! - [`TimerState`]: Phase state machine
//! - [`FocusEngine`]: Synchronous engine facade
//! - [`EngineHandle`]: Handle to the async engine service
//! - [`Database`]: Session log and statistics
//! - [`Settings`]: Application configuration management

pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod service;
pub mod storage;
pub mod timer;

pub use effects::{EffectDispatcher, Notifier, Permission, SoundPlayer};
pub use engine::{FocusEngine, MisusePolicy};
pub use error::{ConfigError, CoreError, DatabaseError, EffectError, EngineError};
pub use events::{Event, PhaseCompleted, TimerSnapshot};
pub use service::{Command, EngineHandle, ServiceOptions};
pub use storage::{Database, Settings};
pub use timer::{Phase, SessionConfig, TickEvent, TimerState};
