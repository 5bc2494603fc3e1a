//! Phase clock: turns host timer callbacks into measured elapsed time.
//!
//! Ticks never assume a fixed one-second cadence. Each sample reports the
//! time since the previous sample on a monotonic source, so a callback that
//! was delayed for 40 seconds (suspended process, throttled host) reports
//! ~40 seconds and the state machine catches up in a single step.
//!
//! ```ignore
//! let mut clock = PhaseClock::new(MonotonicSource::new());
//! clock.start();
//! // in the host callback:
//! if let Some(tick) = clock.sample() {
//!     engine.apply_tick(tick)?;
//! }
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// Host cadence for periodic ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A clock reading in milliseconds since an arbitrary, fixed origin.
///
/// Implementations should be monotonic. The phase clock still guards
/// against readings that go backwards.
pub trait TimeSource: Send + 'static {
    fn now_ms(&self) -> i64;
}

/// Monotonic source backed by `tokio::time::Instant`.
///
/// Follows the tokio clock, so a paused test runtime drives it
/// deterministically.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    origin: Instant,
}

impl MonotonicSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicSource {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Hand-driven source for simulations and tests.
///
/// Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    now: Arc<AtomicI64>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Move the reading backwards, as a wall clock adjusted by NTP would.
    pub fn rewind(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_sub(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualSource {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Elapsed time since the previous tick. Consumed once, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub elapsed: Duration,
}

impl TickEvent {
    pub fn new(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Fractional seconds since the last tick.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Drift-correcting wrapper around a [`TimeSource`].
///
/// The only component that reads the time source. It never touches timer
/// state; it only measures.
///
/// `start` and `stop` only set and clear the reference reading; they do not
/// schedule callbacks. Periodic delivery is a separate [`Ticker`], and in
/// the async service [`EngineHandle`](crate::service::EngineHandle) owns the
/// single ticker for its engine and cancels it on shutdown.
#[derive(Debug)]
pub struct PhaseClock<S = MonotonicSource> {
    source: S,
    last_ms: Option<i64>,
}

impl<S: TimeSource> PhaseClock<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_ms: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_started(&self) -> bool {
        self.last_ms.is_some()
    }

    /// Record the reference timestamp. Returns `false` if already started,
    /// in which case the existing reference is kept.
    pub fn start(&mut self) -> bool {
        if self.last_ms.is_some() {
            return false;
        }
        self.last_ms = Some(self.source.now_ms());
        trace!("phase clock started");
        true
    }

    /// Forget the reference. No-op when not started.
    pub fn stop(&mut self) {
        if self.last_ms.take().is_some() {
            trace!("phase clock stopped");
        }
    }

    /// Move the reference to now without producing a tick.
    ///
    /// Used when a countdown resumes so that paused time is not counted.
    pub fn rebase(&mut self) {
        if self.last_ms.is_some() {
            self.last_ms = Some(self.source.now_ms());
        }
    }

    /// Measure the time since the previous sample.
    ///
    /// Returns `None` when the clock is stopped. A backwards reading is
    /// clamped to zero and logged.
    pub fn sample(&mut self) -> Option<TickEvent> {
        let last = self.last_ms?;
        let now = self.source.now_ms();
        self.last_ms = Some(now);
        let delta = now.saturating_sub(last);
        if delta < 0 {
            warn!(
                delta_ms = delta,
                "clock went backwards; clamping elapsed time to zero"
            );
            return Some(TickEvent::new(Duration::ZERO));
        }
        Some(TickEvent::new(Duration::from_millis(delta.unsigned_abs())))
    }
}

/// Periodic host callback.
///
/// Calls `on_tick` once per period until it returns `false` or the ticker is
/// stopped. The interval's immediate first tick is skipped, so the first
/// call happens one full period after spawning. Dropping the ticker cancels
/// it.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn on the current tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Spawn a ticker that pushes `make()` onto `tx` each period.
    pub fn spawn_into<T, F>(period: Duration, tx: mpsc::UnboundedSender<T>, make: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        Self::spawn(period, move || tx.send(make()).is_ok())
    }

    /// Cancel pending callbacks. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
