//! Timer engine for the Pomodoro service.
//!
//! This module provides the core timer functionality:
//! - State transitions (Stopped → Active → Paused)
//! - Countdown anchored to a monotonic end instant
//! - Phase completion with work-cycle counting and long-break insertion
//! - Auto-start of the next phase
//! - Persistence and notification rendering after every change
//!
//! The engine is synchronous. `TimerService` owns it behind a mutex and
//! drives `tick_at` from the countdown loop.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, Instant};

use crate::notification::{NotificationRenderer, NotificationSurface};
use crate::signal::SignalEmitter;
use crate::store::{PomodoroRepository, SettingsRepository};
use crate::types::{
    clamp_rest_interval, EngineState, EngineStatus, OperatingMode, Options, Phase, PhaseDurations,
};

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events for the daemon and external integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started {
        phase: Phase,
        remaining_seconds: u32,
    },
    /// Countdown paused
    Paused { remaining_seconds: u32 },
    /// Timer reset to the chosen phase
    Reset { phase: Phase },
    /// A phase ran to zero
    PhaseCompleted {
        /// Phase that finished
        phase: Phase,
        /// Length of the finished phase in seconds
        seconds: u32,
        /// Work phases finished since the daemon started
        completed_work_cycles: u32,
    },
    /// Chosen phase changed
    PhaseChanged { phase: Phase },
    /// Rest interval changed
    RestIntervalChanged { interval: u32 },
    /// Remaining time recomputed
    Tick { remaining_seconds: u32 },
    /// Close requested
    Closed,
}

// ============================================================================
// Phase sequencing
// ============================================================================

/// Picks the phase that follows `finished`.
///
/// `completed_work_cycles` already counts `finished` when it was work.
pub fn next_phase(finished: Phase, completed_work_cycles: u32, rest_interval: u32) -> Phase {
    if !finished.is_work() {
        return Phase::Work;
    }
    let interval = rest_interval.max(1);
    if completed_work_cycles > 0 && completed_work_cycles % interval == 0 {
        Phase::LongBreak
    } else {
        Phase::ShortBreak
    }
}

// ============================================================================
// Countdown
// ============================================================================

/// Start and end instants of a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub started_at: Instant,
    pub ends_at: Instant,
}

impl Countdown {
    /// Anchors a countdown of `remaining_seconds` at `now`.
    pub fn new(now: Instant, remaining_seconds: u32) -> Self {
        Self {
            started_at: now,
            ends_at: now + Duration::from_secs(u64::from(remaining_seconds)),
        }
    }

    /// Whole seconds left at `now`, rounded down; 0 once the end has passed.
    pub fn remaining_at(&self, now: Instant) -> u32 {
        let left = self.ends_at.saturating_duration_since(now).as_secs();
        u32::try_from(left).unwrap_or(u32::MAX)
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine was not counting down
    Idle,
    /// Remaining time updated
    Running { remaining_seconds: u32 },
    /// The phase finished
    Completed {
        finished: Phase,
        next: Phase,
        auto_started: bool,
    },
}

// ============================================================================
// EnginePorts
// ============================================================================

/// Collaborators injected into the engine.
#[derive(Clone)]
pub struct EnginePorts {
    pub repository: Arc<PomodoroRepository>,
    pub settings: Arc<SettingsRepository>,
    pub renderer: Arc<dyn NotificationRenderer>,
    pub signals: Arc<dyn SignalEmitter>,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that owns the Pomodoro state.
pub struct TimerEngine {
    /// Persisted snapshot
    state: EngineState,
    /// Phase lengths
    durations: PhaseDurations,
    /// Sound, vibration and auto-start options
    options: Options,
    /// Work phases finished since the engine was created
    completed_work_cycles: u32,
    /// Anchors of the running countdown
    countdown: Option<Countdown>,
    /// Set while a countdown loop owns the ticking
    loop_claimed: bool,
    ports: EnginePorts,
    surface_tx: watch::Sender<NotificationSurface>,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an engine from the persisted snapshot.
    ///
    /// A snapshot saved while active comes back paused: the process that was
    /// counting down is gone.
    pub fn new(ports: EnginePorts, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        let durations = ports.settings.durations();
        let options = ports.settings.options();

        let mut state = ports.repository.load(&durations);
        if state.operating_mode.is_active() {
            tracing::info!(
                "Restoring interrupted {} countdown as paused at {}",
                state.current_phase,
                state.time_text()
            );
            state.operating_mode = OperatingMode::Paused;
        }

        let surface = render(ports.renderer.as_ref(), &state, &durations);
        let (surface_tx, _) = watch::channel(surface);

        let engine = Self {
            state,
            durations,
            options,
            completed_work_cycles: 0,
            countdown: None,
            loop_claimed: false,
            ports,
            surface_tx,
            event_tx,
        };
        engine.ports.repository.save(&engine.state);
        engine
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Starts the countdown. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        self.start_at(Instant::now())
    }

    /// Starts the countdown anchored at `now`.
    pub fn start_at(&mut self, now: Instant) -> bool {
        if self.state.operating_mode.is_active() {
            tracing::debug!("Start ignored: already active");
            return false;
        }

        self.countdown = Some(Countdown::new(now, self.state.remaining_seconds));
        self.state.operating_mode = OperatingMode::Active;
        self.publish();
        self.emit(TimerEvent::Started {
            phase: self.state.current_phase,
            remaining_seconds: self.state.remaining_seconds,
        });
        true
    }

    /// Resumes the countdown; same as start.
    pub fn resume_at(&mut self, now: Instant) -> bool {
        self.start_at(now)
    }

    /// Pauses the countdown. Returns false if it was not running.
    pub fn pause(&mut self) -> bool {
        self.pause_at(Instant::now())
    }

    /// Pauses the countdown, keeping the time left at `now`.
    pub fn pause_at(&mut self, now: Instant) -> bool {
        if !self.state.operating_mode.is_active() {
            tracing::debug!("Pause ignored: not active");
            return false;
        }

        if let Some(countdown) = self.countdown.take() {
            self.state.remaining_seconds = self.clamp_remaining(countdown.remaining_at(now));
        }
        self.state.operating_mode = OperatingMode::Paused;
        self.publish();
        self.emit(TimerEvent::Paused {
            remaining_seconds: self.state.remaining_seconds,
        });
        true
    }

    /// Pauses when active, starts otherwise.
    pub fn switch_at(&mut self, now: Instant) {
        if self.state.operating_mode.is_active() {
            self.pause_at(now);
        } else {
            self.start_at(now);
        }
    }

    /// Stops the timer and refills it with the chosen phase.
    pub fn reset(&mut self) {
        let phase = self.state.chosen_phase;
        self.countdown = None;
        self.state.current_phase = phase;
        self.state.remaining_seconds = self.durations.seconds(phase);
        self.state.operating_mode = OperatingMode::Stopped;
        self.publish();
        self.emit(TimerEvent::Reset { phase });
    }

    /// Chooses `phase` to run next and resets to it.
    pub fn change_phase(&mut self, phase: Phase) {
        if !self.state.operating_mode.is_stopped() {
            tracing::debug!(
                "Changing phase while {}, the countdown is reset",
                self.state.operating_mode
            );
        }
        self.state.chosen_phase = phase;
        self.reset();
        self.emit(TimerEvent::PhaseChanged { phase });
    }

    /// Sets the number of pomodoros between long breaks (clamped to 1-10).
    pub fn change_rest_interval(&mut self, interval: i64) -> u32 {
        let interval = clamp_rest_interval(interval);
        self.state.rest_interval = self.ports.repository.update_rest_interval(i64::from(interval));
        self.publish();
        self.emit(TimerEvent::RestIntervalChanged {
            interval: self.state.rest_interval,
        });
        self.state.rest_interval
    }

    /// Replaces the phase durations.
    ///
    /// A stopped timer is refilled with the new length; a running or paused
    /// one keeps its time, cut down to the new length if needed.
    pub fn set_durations_at(&mut self, durations: PhaseDurations, now: Instant) {
        self.durations = self.ports.settings.update_durations(durations);

        if self.state.operating_mode.is_stopped() {
            self.reset();
            return;
        }

        let limit = self.durations.seconds(self.state.current_phase);
        if let Some(countdown) = self.countdown {
            if countdown.remaining_at(now) > limit {
                self.countdown = Some(Countdown::new(now, limit));
            }
        }
        self.state.remaining_seconds = self.state.remaining_seconds.min(limit);
        self.publish();
    }

    /// Replaces the options; they apply from the next completion.
    pub fn set_options(&mut self, options: Options) {
        self.ports.settings.update_options(options);
        self.options = options;
    }

    /// Renders the notification surface again without changing state.
    pub fn refresh_notification(&mut self) {
        self.render_surface();
    }

    /// Resets the timer before the daemon shuts down.
    pub fn close(&mut self) {
        self.reset();
        self.emit(TimerEvent::Closed);
    }

    // ------------------------------------------------------------------------
    // Countdown
    // ------------------------------------------------------------------------

    /// Recomputes the remaining time at `now` and completes the phase when
    /// it reaches zero.
    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        if !self.state.operating_mode.is_active() {
            return TickOutcome::Idle;
        }
        let Some(countdown) = self.countdown else {
            tracing::warn!("Active without a countdown, re-anchoring");
            self.countdown = Some(Countdown::new(now, self.state.remaining_seconds));
            return TickOutcome::Running {
                remaining_seconds: self.state.remaining_seconds,
            };
        };

        self.state.remaining_seconds = self.clamp_remaining(countdown.remaining_at(now));
        if self.state.remaining_seconds == 0 {
            return self.complete_phase_at(now);
        }

        self.publish();
        self.emit(TimerEvent::Tick {
            remaining_seconds: self.state.remaining_seconds,
        });
        TickOutcome::Running {
            remaining_seconds: self.state.remaining_seconds,
        }
    }

    fn complete_phase_at(&mut self, now: Instant) -> TickOutcome {
        let finished = self.state.current_phase;
        if finished.is_work() {
            self.completed_work_cycles += 1;
        }
        tracing::info!(
            "{} finished (work cycles: {})",
            finished.display_name(),
            self.completed_work_cycles
        );

        if self.options.notification_sound {
            self.ports.signals.play_end_of_phase_sound();
        }
        if self.options.vibration {
            self.ports.signals.trigger_haptic_pulse();
        }
        self.emit(TimerEvent::PhaseCompleted {
            phase: finished,
            seconds: self.durations.seconds(finished),
            completed_work_cycles: self.completed_work_cycles,
        });

        self.reset();
        let next = next_phase(
            finished,
            self.completed_work_cycles,
            self.state.rest_interval,
        );
        self.change_phase(next);

        let auto_started = self.options.auto_start(next) && self.start_at(now);
        TickOutcome::Completed {
            finished,
            next,
            auto_started,
        }
    }

    /// Claims the right to run the countdown loop.
    ///
    /// Returns false if a loop already holds the claim.
    pub fn claim_loop(&mut self) -> bool {
        if self.loop_claimed {
            return false;
        }
        self.loop_claimed = true;
        true
    }

    /// Gives the loop claim back.
    pub fn release_loop(&mut self) {
        self.loop_claimed = false;
    }

    /// Returns true while a countdown loop holds the claim.
    pub fn loop_claimed(&self) -> bool {
        self.loop_claimed
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the current snapshot.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn completed_work_cycles(&self) -> u32 {
        self.completed_work_cycles
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.countdown
    }

    pub fn is_active(&self) -> bool {
        self.state.operating_mode.is_active()
    }

    /// Returns the snapshot as sent to clients.
    pub fn status(&self) -> EngineStatus {
        EngineStatus::from_state(&self.state, self.completed_work_cycles)
    }

    /// Returns the latest notification surface.
    pub fn notification(&self) -> NotificationSurface {
        self.surface_tx.borrow().clone()
    }

    /// Subscribes to notification surface updates.
    pub fn subscribe_notification(&self) -> watch::Receiver<NotificationSurface> {
        self.surface_tx.subscribe()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn clamp_remaining(&self, seconds: u32) -> u32 {
        seconds.min(self.durations.seconds(self.state.current_phase))
    }

    /// Saves the snapshot and re-renders the surface.
    fn publish(&mut self) {
        self.ports.repository.save(&self.state);
        self.render_surface();
    }

    fn render_surface(&self) {
        let surface = render(self.ports.renderer.as_ref(), &self.state, &self.durations);
        self.surface_tx.send_replace(surface);
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No event consumer, dropping timer event");
        }
    }
}

fn render(
    renderer: &dyn NotificationRenderer,
    state: &EngineState,
    durations: &PhaseDurations,
) -> NotificationSurface {
    let phase_name = state.current_phase.display_name();
    match state.operating_mode {
        OperatingMode::Stopped => {
            renderer.render_stopped(phase_name, durations.minutes(state.current_phase))
        }
        OperatingMode::Active => {
            let total = durations.seconds(state.current_phase);
            renderer.render_active(
                phase_name,
                total.saturating_sub(state.remaining_seconds),
                total,
                &state.time_text(),
            )
        }
        OperatingMode::Paused => renderer.render_paused(phase_name, &state.time_text()),
    }
}

// ============================================================================
// Tests
// ============================================================================
