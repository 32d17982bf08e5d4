//! Timer service: the single owner of the engine and its countdown loop.
//!
//! - Commands are applied under the engine mutex
//! - At most one countdown loop runs, claimed through the engine
//! - A `Notify` wakes the loop as soon as the engine leaves `Active`
//! - A `watch` flag tells the daemon to shut down after `Close`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::notification::NotificationSurface;
use crate::types::{DurationParams, EngineStatus, OptionParams, Options, Phase, PhaseDurations};

use super::timer::TimerEngine;

/// Default countdown tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// Command
// ============================================================================

/// A command delivered to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Switch,
    Reset,
    Close,
    ChangePhase(Phase),
    ChangeRestInterval(i64),
    RefreshNotification,
    /// Merged into the current durations under the engine lock
    SetDurations(DurationParams),
    /// Merged into the current options under the engine lock
    SetOptions(OptionParams),
}

// ============================================================================
// TimerService
// ============================================================================

/// Owns the engine, the countdown task and the shutdown flag.
pub struct TimerService {
    engine: Arc<Mutex<TimerEngine>>,
    stop: Arc<Notify>,
    tick_interval: Duration,
    running_loops: Arc<AtomicUsize>,
    loop_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TimerService {
    /// Wraps `engine`, ticking every `tick_interval`.
    pub fn new(engine: TimerEngine, tick_interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            stop: Arc::new(Notify::new()),
            tick_interval,
            running_loops: Arc::new(AtomicUsize::new(0)),
            loop_handle: std::sync::Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Applies `command` and returns the resulting status.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn dispatch(&self, command: Command) -> EngineStatus {
        let mut engine = self.engine.lock().await;
        let now = Instant::now();
        tracing::debug!("Dispatching {:?}", command);

        let closing = matches!(command, Command::Close);
        match command {
            Command::Start => {
                engine.start_at(now);
            }
            Command::Resume => {
                engine.resume_at(now);
            }
            Command::Pause => {
                engine.pause_at(now);
            }
            Command::Switch => engine.switch_at(now),
            Command::Reset => engine.reset(),
            Command::Close => engine.close(),
            Command::ChangePhase(phase) => engine.change_phase(phase),
            Command::ChangeRestInterval(interval) => {
                engine.change_rest_interval(interval);
            }
            Command::RefreshNotification => engine.refresh_notification(),
            Command::SetDurations(params) => {
                let durations = params.apply(engine.durations());
                engine.set_durations_at(durations, now);
            }
            Command::SetOptions(params) => {
                let options = params.apply(engine.options());
                engine.set_options(options);
            }
        }

        if engine.is_active() {
            if engine.claim_loop() {
                self.spawn_countdown();
            }
        } else {
            self.stop.notify_one();
        }

        let status = engine.status();
        drop(engine);

        if closing {
            self.shutdown();
        }
        status
    }

    /// Returns the current status.
    pub async fn status(&self) -> EngineStatus {
        self.engine.lock().await.status()
    }

    /// Returns the current notification surface.
    pub async fn notification(&self) -> NotificationSurface {
        self.engine.lock().await.notification()
    }

    /// Returns the durations and options in effect.
    pub async fn settings(&self) -> (PhaseDurations, Options) {
        let engine = self.engine.lock().await;
        (engine.durations(), engine.options())
    }

    /// Returns the shared engine.
    pub fn engine(&self) -> Arc<Mutex<TimerEngine>> {
        Arc::clone(&self.engine)
    }

    /// Returns the number of countdown loops currently running.
    pub fn running_loops(&self) -> usize {
        self.running_loops.load(Ordering::SeqCst)
    }

    /// Raises the shutdown flag and wakes the countdown loop.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        self.stop.notify_one();
    }

    /// Returns true once shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Subscribes to the shutdown flag.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Waits for the countdown task to finish.
    pub async fn join_countdown(&self) {
        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Countdown task failed: {}", e);
            }
        }
    }

    fn spawn_countdown(&self) {
        self.running_loops.fetch_add(1, Ordering::SeqCst);
        let handle = tokio::spawn(run_countdown(
            Arc::clone(&self.engine),
            Arc::clone(&self.stop),
            Arc::clone(&self.running_loops),
            self.tick_interval,
            self.shutdown_tx.subscribe(),
        ));
        let previous = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                tracing::debug!("Previous countdown task still winding down");
            }
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        if let Some(handle) = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

/// Countdown loop: ticks the engine until it is no longer active or the
/// service shuts down.
///
/// The loop holds the engine's loop claim and gives it back, under the
/// engine lock, right before exiting. On shutdown the engine is left as it
/// is, so an interrupted countdown is restored on the next start.
async fn run_countdown(
    engine: Arc<Mutex<TimerEngine>>,
    stop: Arc<Notify>,
    running_loops: Arc<AtomicUsize>,
    tick_interval: Duration,
    shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::debug!("Countdown loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.notified() => {}
        }

        let mut engine = engine.lock().await;
        if engine.is_active() {
            engine.tick_at(Instant::now());
        }
        if !engine.is_active() || *shutdown.borrow() {
            running_loops.fetch_sub(1, Ordering::SeqCst);
            engine.release_loop();
            break;
        }
    }

    tracing::debug!("Countdown loop exited");
}

// ============================================================================
// Tests
// ============================================================================
