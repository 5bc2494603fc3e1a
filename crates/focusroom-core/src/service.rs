//! Async engine service.
//!
//! Moves a [`FocusEngine`] into a tokio task that drains a single queue.
//! User commands and clock ticks land on the same queue and are applied one
//! at a time in arrival order, so a pause can never interleave with a tick.
//!
//! ```ignore
//! let handle = EngineHandle::spawn(FocusEngine::new(config)?, ServiceOptions::default());
//! let mut events = handle.subscribe();
//! handle.start().await?;
//! while let Ok(event) = events.recv().await { /* re-render */ }
//! handle.shutdown().await;
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, trace};

use crate::engine::FocusEngine;
use crate::error::EngineError;
use crate::events::{Event, PhaseCompleted, TimerSnapshot};
use crate::timer::{Phase, SessionConfig, TickEvent, Ticker, TimeSource, DEFAULT_TICK_INTERVAL};

/// Service tuning.
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// Host callback period. `None` leaves ticking to the caller via
    /// [`EngineHandle::tick`].
    pub tick_interval: Option<Duration>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            tick_interval: Some(DEFAULT_TICK_INTERVAL),
        }
    }
}

/// A command routed through the service queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Resume,
    Pause,
    Stop,
    Reset,
    Skip,
    SwitchPhase(Phase),
    UpdateConfig(SessionConfig),
    ApplyTick(TickEvent),
}

type Reply = oneshot::Sender<Result<Option<PhaseCompleted>, EngineError>>;

enum Request {
    /// One host timer callback.
    Tick,
    Command(Command, Reply),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running engine service.
///
/// The actor task owns the only event sender, so event receivers see
/// `Closed` once the service has shut down.
#[derive(Debug)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Request>,
    state_rx: watch::Receiver<TimerSnapshot>,
    events_rx: broadcast::Receiver<Event>,
}

impl Clone for EngineHandle {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            state_rx: self.state_rx.clone(),
            events_rx: self.events_rx.resubscribe(),
        }
    }
}

impl EngineHandle {
    /// Spawn the service on the current tokio runtime.
    pub fn spawn<S: TimeSource>(engine: FocusEngine<S>, options: ServiceOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state_rx = engine.subscribe_state();
        let events_rx = engine.subscribe_events();

        // The ticker holds a weak sender so dropping every handle ends the
        // service.
        let ticker = options.tick_interval.map(|period| {
            let weak = tx.downgrade();
            Ticker::spawn(period, move || {
                weak.upgrade()
                    .is_some_and(|tx| tx.send(Request::Tick).is_ok())
            })
        });

        tokio::spawn(run(engine, rx, ticker));
        Self {
            tx,
            state_rx,
            events_rx,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Latest published snapshot.
    pub fn state(&self) -> TimerSnapshot {
        self.state_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<TimerSnapshot> {
        self.state_rx.clone()
    }

    /// Events from now on. The stream ends with `Closed` after shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events_rx.resubscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn start(&self) -> Result<(), EngineError> {
        self.send(Command::Start).await.map(|_| ())
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        self.send(Command::Resume).await.map(|_| ())
    }

    pub async fn pause(&self) -> Result<Option<PhaseCompleted>, EngineError> {
        self.send(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.send(Command::Stop).await.map(|_| ())
    }

    pub async fn reset(&self) -> Result<(), EngineError> {
        self.send(Command::Reset).await.map(|_| ())
    }

    pub async fn skip(&self) -> Result<Option<PhaseCompleted>, EngineError> {
        self.send(Command::Skip).await
    }

    pub async fn switch_phase(&self, phase: Phase) -> Result<(), EngineError> {
        self.send(Command::SwitchPhase(phase)).await.map(|_| ())
    }

    pub async fn update_config(&self, config: SessionConfig) -> Result<(), EngineError> {
        self.send(Command::UpdateConfig(config)).await.map(|_| ())
    }

    pub async fn apply_tick(&self, tick: TickEvent) -> Result<Option<PhaseCompleted>, EngineError> {
        self.send(Command::ApplyTick(tick)).await
    }

    /// Enqueue one host timer callback without waiting for it.
    pub fn tick(&self) -> Result<(), EngineError> {
        self.tx
            .send(Request::Tick)
            .map_err(|_| EngineError::ServiceStopped)
    }

    /// Send any command and wait for it to be applied.
    pub async fn send(&self, command: Command) -> Result<Option<PhaseCompleted>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Command(command, reply_tx))
            .map_err(|_| EngineError::ServiceStopped)?;
        reply_rx.await.map_err(|_| EngineError::ServiceStopped)?
    }

    /// Stop ticking, dispose the engine and end the service.
    ///
    /// Requests already queued ahead of the shutdown are still applied.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Request::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run<S: TimeSource>(
    mut engine: FocusEngine<S>,
    mut rx: mpsc::UnboundedReceiver<Request>,
    mut ticker: Option<Ticker>,
) {
    debug!("engine service started");
    let mut on_shutdown = None;
    while let Some(request) = rx.recv().await {
        match request {
            Request::Tick => {
                trace!("tick");
                engine.tick();
            }
            Request::Command(command, reply) => {
                let _ = reply.send(dispatch(&mut engine, command));
            }
            Request::Shutdown(done) => {
                on_shutdown = Some(done);
                break;
            }
        }
    }
    if let Some(t) = ticker.as_mut() {
        t.stop();
    }
    engine.dispose();
    drop(engine);
    rx.close();
    debug!("engine service stopped");
    if let Some(done) = on_shutdown {
        let _ = done.send(());
    }
}

fn dispatch<S: TimeSource>(
    engine: &mut FocusEngine<S>,
    command: Command,
) -> Result<Option<PhaseCompleted>, EngineError> {
    match command {
        Command::Start => engine.start().map(|()| None),
        Command::Resume => engine.resume().map(|()| None),
        Command::Pause => engine.pause(),
        Command::Stop => engine.stop().map(|()| None),
        Command::Reset => engine.reset().map(|()| None),
        Command::Skip => engine.skip(),
        Command::SwitchPhase(phase) => engine.switch_phase(phase).map(|()| None),
        Command::UpdateConfig(config) => engine.update_config(config).map(|()| None),
        Command::ApplyTick(tick) => engine.apply_tick(tick),
    }
}
