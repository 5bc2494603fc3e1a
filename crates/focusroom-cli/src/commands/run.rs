//! `focusroom run`: live countdown driven by the engine service.

use std::io::Write;

use clap::Args;
use focusroom_core::effects::notification_text;
use focusroom_core::error::EffectError;
use focusroom_core::{
    Database, EffectDispatcher, EngineHandle, Event, FocusEngine, Notifier, Permission,
    PhaseCompleted, ServiceOptions, SessionConfig, Settings, SoundPlayer, TimerSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Work phase length in minutes
    #[arg(long)]
    work: Option<u32>,
    /// Short break length in minutes
    #[arg(long)]
    short_break: Option<u32>,
    /// Long break length in minutes
    #[arg(long)]
    long_break: Option<u32>,
    /// Work sessions before a long break
    #[arg(long)]
    sessions: Option<u32>,
    /// Start the next work phase automatically after a break
    #[arg(long)]
    auto_work: bool,
    /// Wait for a key press before starting breaks
    #[arg(long)]
    no_auto_breaks: bool,
    /// Task to attach to logged sessions
    #[arg(long)]
    task_id: Option<String>,
    /// Quit after the first completed phase
    #[arg(long)]
    once: bool,
}

impl RunArgs {
    /// Stored settings with command-line overrides applied.
    fn session_config(&self, base: SessionConfig) -> SessionConfig {
        SessionConfig {
            work_duration: self.work.unwrap_or(base.work_duration),
            short_break_duration: self.short_break.unwrap_or(base.short_break_duration),
            long_break_duration: self.long_break.unwrap_or(base.long_break_duration),
            sessions_until_long_break: self.sessions.unwrap_or(base.sessions_until_long_break),
            auto_start_breaks: base.auto_start_breaks && !self.no_auto_breaks,
            auto_start_work: base.auto_start_work || self.auto_work,
            ..base
        }
    }
}

/// Sound as the terminal bell.
struct TerminalBell;

impl SoundPlayer for TerminalBell {
    fn play(&mut self, volume: u8) -> Result<(), EffectError> {
        if volume == 0 {
            return Ok(());
        }
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|()| err.flush())
            .map_err(|e| EffectError::Unavailable(e.to_string()))
    }
}

/// Notifications as a banner on stderr.
struct StderrBanner;

impl Notifier for StderrBanner {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&mut self, title: &str, body: &str) -> Result<(), EffectError> {
        writeln!(std::io::stderr(), "\n*** {title} ***\n    {body}")
            .map_err(|e| EffectError::Unavailable(e.to_string()))
    }
}

enum Key {
    PauseResume,
    Skip,
    Stop,
    Reset,
    Quit,
}

fn parse_key(line: &str) -> Option<Key> {
    match line.trim() {
        "p" => Some(Key::PauseResume),
        "s" => Some(Key::Skip),
        "x" => Some(Key::Stop),
        "r" => Some(Key::Reset),
        "q" => Some(Key::Quit),
        _ => None,
    }
}

fn render(snap: &TimerSnapshot) {
    let status = if snap.is_running { "" } else { " (paused)" };
    print!(
        "\r\x1b[K{} {} {:>3.0}%  [{}/{}]{status}",
        snap.phase.label(),
        snap.display,
        snap.progress_pct,
        snap.cycle_position,
        snap.sessions_until_long_break,
    );
    let _ = std::io::stdout().flush();
}

fn announce(done: &PhaseCompleted) {
    let (title, body) = notification_text(done);
    println!("\r\x1b[K{title}. {body}.");
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = Settings::load()?.session_config()?;
    let config = args.session_config(base).validated()?;
    let db = Database::open()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(args, config, db));
    // Do not wait on the pending stdin read.
    runtime.shutdown_background();
    result
}

async fn session(
    args: RunArgs,
    config: SessionConfig,
    db: Database,
) -> Result<(), Box<dyn std::error::Error>> {
    let effects = EffectDispatcher::new(Box::new(TerminalBell), Box::new(StderrBanner));
    let engine = FocusEngine::new(config)?.with_effects(effects);
    let handle = EngineHandle::spawn(engine, ServiceOptions::default());
    let mut events = handle.subscribe();
    let mut states = handle.watch_state();

    println!("keys: p pause/resume, s skip, x stop, r reset, q quit (then Enter)");
    handle.start().await?;
    render(&states.borrow_and_update());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let result = loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                render(&states.borrow_and_update());
            }
            event = events.recv() => match event {
                Ok(Event::PhaseCompleted(done)) => {
                    announce(&done);
                    if let Err(e) = db.record_completion(&done, args.task_id.as_deref()) {
                        warn!(error = %e, "failed to record session");
                    }
                    if args.once {
                        break Ok(());
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event stream lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => break Err(e.into()),
                };
                let outcome = match parse_key(&line) {
                    Some(Key::PauseResume) if handle.state().is_running => {
                        handle.pause().await.map(|_| ())
                    }
                    Some(Key::PauseResume) => handle.resume().await,
                    Some(Key::Skip) => handle.skip().await.map(|_| ()),
                    Some(Key::Stop) => handle.stop().await,
                    Some(Key::Reset) => handle.reset().await,
                    Some(Key::Quit) => break Ok(()),
                    None => {
                        if !line.trim().is_empty() {
                            eprintln!("\nunknown key {:?}: use p, s, x, r or q", line.trim());
                        }
                        Ok(())
                    }
                };
                if let Err(e) = outcome {
                    break Err(e.into());
                }
            }
        }
    };

    handle.shutdown().await;
    println!();
    info!("session ended");
    result
}
