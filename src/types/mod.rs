//! Core data types for the Pomodoro service.
//!
//! This module defines the data structures used for:
//! - Phases, operating modes and the persisted engine snapshot
//! - Phase durations and user options with range clamping
//! - Tags and the focus task used by the task journal
//! - IPC request/response serialization

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Shortest allowed phase duration in minutes
pub const MIN_PHASE_MINUTES: u32 = 1;

/// Longest allowed phase duration in minutes
pub const MAX_PHASE_MINUTES: u32 = 999;

/// Smallest allowed rest interval
pub const MIN_REST_INTERVAL: u32 = 1;

/// Largest allowed rest interval
pub const MAX_REST_INTERVAL: u32 = 10;

/// Rest interval used when nothing is stored
pub const DEFAULT_REST_INTERVAL: u32 = 4;

/// Clamps a user-supplied phase duration into the valid range.
pub fn clamp_phase_minutes(minutes: i64) -> u32 {
    minutes.clamp(i64::from(MIN_PHASE_MINUTES), i64::from(MAX_PHASE_MINUTES)) as u32
}

/// Clamps a user-supplied rest interval into the valid range.
pub fn clamp_rest_interval(interval: i64) -> u32 {
    interval.clamp(i64::from(MIN_REST_INTERVAL), i64::from(MAX_REST_INTERVAL)) as u32
}

/// Formats seconds as `M:SS`.
pub fn format_time(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

// ============================================================================
// ParseNameError
// ============================================================================

/// Error returned when a stored or user-supplied name does not match a variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} name: {value:?}")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl ParseNameError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

fn normalize_name(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('-', "_")
}

// ============================================================================
// Phase
// ============================================================================

/// One of the three timer phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Focused work (a pomodoro)
    Work,
    /// Short break between pomodoros
    ShortBreak,
    /// Long break after every `rest_interval` pomodoros
    LongBreak,
}

impl Phase {
    /// All phases in display order.
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::ShortBreak, Phase::LongBreak];

    /// Returns the storage name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Returns the name shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Work => "Pomodoro",
            Phase::ShortBreak => "Break",
            Phase::LongBreak => "Rest",
        }
    }

    /// Returns true for the work phase.
    pub fn is_work(&self) -> bool {
        matches!(self, Phase::Work)
    }

    /// Parses a stored phase name, falling back to `Work` on garbage.
    pub fn parse_or_default(s: &str) -> Phase {
        s.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, falling back to {}", e, Phase::default().as_str());
            Phase::default()
        })
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Work
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "work" | "pomodoro" => Ok(Phase::Work),
            "short_break" | "break" => Ok(Phase::ShortBreak),
            "long_break" | "rest" => Ok(Phase::LongBreak),
            _ => Err(ParseNameError::new("phase", s)),
        }
    }
}

// ============================================================================
// OperatingMode
// ============================================================================

/// Run state of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Idle, waiting for a start
    Stopped,
    /// Counting down
    Active,
    /// Countdown frozen, remaining time kept
    Paused,
}

impl OperatingMode {
    /// Returns the storage name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Stopped => "stopped",
            OperatingMode::Active => "active",
            OperatingMode::Paused => "paused",
        }
    }

    /// Returns true if the countdown is advancing.
    pub fn is_active(&self) -> bool {
        matches!(self, OperatingMode::Active)
    }

    /// Returns true if the timer is stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(self, OperatingMode::Stopped)
    }

    /// Returns true if the timer is paused.
    pub fn is_paused(&self) -> bool {
        matches!(self, OperatingMode::Paused)
    }

    /// Parses a stored mode name, falling back to `Stopped` on garbage.
    pub fn parse_or_default(s: &str) -> OperatingMode {
        s.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, falling back to {}", e, OperatingMode::default().as_str());
            OperatingMode::default()
        })
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        OperatingMode::Stopped
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "stopped" => Ok(OperatingMode::Stopped),
            "active" => Ok(OperatingMode::Active),
            "paused" => Ok(OperatingMode::Paused),
            _ => Err(ParseNameError::new("operating mode", s)),
        }
    }
}

// ============================================================================
// PhaseDurations
// ============================================================================

/// Per-phase durations in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    /// Work duration in minutes (1-999)
    pub work: u32,
    /// Short break duration in minutes (1-999)
    pub short_break: u32,
    /// Long break duration in minutes (1-999)
    pub long_break: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            work: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

impl PhaseDurations {
    /// Returns the duration of `phase` in minutes.
    pub fn minutes(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }

    /// Returns the duration of `phase` in seconds.
    pub fn seconds(&self, phase: Phase) -> u32 {
        self.minutes(phase) * 60
    }

    /// Sets the duration of `phase`, clamped to 1-999 minutes.
    pub fn set(&mut self, phase: Phase, minutes: i64) {
        let minutes = clamp_phase_minutes(minutes);
        match phase {
            Phase::Work => self.work = minutes,
            Phase::ShortBreak => self.short_break = minutes,
            Phase::LongBreak => self.long_break = minutes,
        }
    }

    /// Returns a copy with every duration clamped into range.
    pub fn clamped(self) -> Self {
        Self {
            work: clamp_phase_minutes(i64::from(self.work)),
            short_break: clamp_phase_minutes(i64::from(self.short_break)),
            long_break: clamp_phase_minutes(i64::from(self.long_break)),
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// User options read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Play a sound when a phase ends
    pub notification_sound: bool,
    /// Trigger a haptic pulse when a phase ends
    pub vibration: bool,
    /// Start breaks automatically after a pomodoro
    pub auto_break_start: bool,
    /// Start the next pomodoro automatically after a break
    pub auto_pomodoro_start: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            notification_sound: true,
            vibration: true,
            auto_break_start: false,
            auto_pomodoro_start: false,
        }
    }
}

impl Options {
    /// Returns whether the next phase should start on its own.
    pub fn auto_start(&self, next: Phase) -> bool {
        if next.is_work() {
            self.auto_pomodoro_start
        } else {
            self.auto_break_start
        }
    }
}

// ============================================================================
// EngineState
// ============================================================================

/// Persisted run-time record of the timer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Whether the countdown is advancing
    pub operating_mode: OperatingMode,
    /// Phase selected to run next
    pub chosen_phase: Phase,
    /// Phase counting down
    pub current_phase: Phase,
    /// Seconds left in the current phase
    pub remaining_seconds: u32,
    /// Pomodoros between long breaks
    pub rest_interval: u32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(&PhaseDurations::default())
    }
}

impl EngineState {
    /// Creates a stopped work-phase state sized by `durations`.
    pub fn new(durations: &PhaseDurations) -> Self {
        Self {
            operating_mode: OperatingMode::Stopped,
            chosen_phase: Phase::Work,
            current_phase: Phase::Work,
            remaining_seconds: durations.seconds(Phase::Work),
            rest_interval: DEFAULT_REST_INTERVAL,
        }
    }

    /// Remaining time formatted as `M:SS`.
    pub fn time_text(&self) -> String {
        format_time(self.remaining_seconds)
    }

    /// Returns a copy that satisfies the range invariants for `durations`.
    ///
    /// A stopped state always shows the full chosen phase.
    pub fn clamped(mut self, durations: &PhaseDurations) -> Self {
        if self.operating_mode.is_stopped() {
            self.current_phase = self.chosen_phase;
            self.remaining_seconds = durations.seconds(self.chosen_phase);
        }
        self.remaining_seconds = self
            .remaining_seconds
            .min(durations.seconds(self.current_phase));
        self.rest_interval = clamp_rest_interval(i64::from(self.rest_interval));
        self
    }
}

// ============================================================================
// Tags
// ============================================================================

/// A journal tag that accumulates focused time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Auto-incremented identifier
    pub id: u32,
    /// Tag name
    pub name: String,
    /// Completed work time credited to this tag
    pub seconds: u64,
}

/// The tag and task currently in focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTask {
    /// Focused tag id (0 when none)
    pub tag_id: u32,
    /// Focused tag name
    pub tag_name: String,
    /// Free-form task description
    pub task_name: String,
}

impl Default for FocusTask {
    fn default() -> Self {
        Self {
            tag_id: 0,
            tag_name: "None".to_string(),
            task_name: "Brainstorming".to_string(),
        }
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// Partial update of the phase durations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationParams {
    /// Work duration in minutes
    #[serde(rename = "work", skip_serializing_if = "Option::is_none")]
    pub work: Option<i64>,
    /// Short break duration in minutes
    #[serde(rename = "shortBreak", skip_serializing_if = "Option::is_none")]
    pub short_break: Option<i64>,
    /// Long break duration in minutes
    #[serde(rename = "longBreak", skip_serializing_if = "Option::is_none")]
    pub long_break: Option<i64>,
}

impl DurationParams {
    /// Applies the present fields on top of `durations`.
    pub fn apply(&self, mut durations: PhaseDurations) -> PhaseDurations {
        if let Some(work) = self.work {
            durations.set(Phase::Work, work);
        }
        if let Some(short_break) = self.short_break {
            durations.set(Phase::ShortBreak, short_break);
        }
        if let Some(long_break) = self.long_break {
            durations.set(Phase::LongBreak, long_break);
        }
        durations
    }
}

/// Partial update of the options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionParams {
    /// Sound on phase end
    #[serde(rename = "notificationSound", skip_serializing_if = "Option::is_none")]
    pub notification_sound: Option<bool>,
    /// Haptic pulse on phase end
    #[serde(rename = "vibration", skip_serializing_if = "Option::is_none")]
    pub vibration: Option<bool>,
    /// Auto-start breaks
    #[serde(rename = "autoBreakStart", skip_serializing_if = "Option::is_none")]
    pub auto_break_start: Option<bool>,
    /// Auto-start pomodoros
    #[serde(rename = "autoPomodoroStart", skip_serializing_if = "Option::is_none")]
    pub auto_pomodoro_start: Option<bool>,
}

impl OptionParams {
    /// Applies the present fields on top of `options`.
    pub fn apply(&self, mut options: Options) -> Options {
        if let Some(v) = self.notification_sound {
            options.notification_sound = v;
        }
        if let Some(v) = self.vibration {
            options.vibration = v;
        }
        if let Some(v) = self.auto_break_start {
            options.auto_break_start = v;
        }
        if let Some(v) = self.auto_pomodoro_start {
            options.auto_pomodoro_start = v;
        }
        options
    }
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Reset the countdown to the chosen phase
    Reset,
    /// Start the countdown
    Start,
    /// Resume the countdown
    Resume,
    /// Pause the countdown
    Pause,
    /// Reset and shut the daemon down
    Close,
    /// Toggle between running and paused
    Switch,
    /// Select the phase to run next
    ChangePhase {
        /// Phase name
        phase: String,
    },
    /// Change the number of pomodoros between long breaks
    ChangeRestInterval {
        /// New interval (clamped to 1-10)
        interval: i64,
    },
    /// Re-render the notification surface
    RefreshNotification,
    /// Query the current status
    Status,
    /// Change phase durations
    SetDurations {
        /// Durations to change
        #[serde(flatten)]
        params: DurationParams,
    },
    /// Change options
    SetOptions {
        /// Options to change
        #[serde(flatten)]
        params: OptionParams,
    },
    /// Add a journal tag
    AddTag {
        /// Tag name
        name: String,
    },
    /// Remove a journal tag
    RemoveTag {
        /// Tag id
        id: u32,
    },
    /// List journal tags
    ListTags,
    /// Focus a tag and task
    SetFocusTask {
        /// Tag id
        #[serde(rename = "tagId")]
        tag_id: u32,
        /// Task description
        #[serde(rename = "taskName", skip_serializing_if = "Option::is_none")]
        task_name: Option<String>,
    },
    /// Any command this daemon does not know
    #[serde(other)]
    Unknown,
}

/// Snapshot of the engine sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Current operating mode
    pub mode: OperatingMode,
    /// Chosen phase
    #[serde(rename = "chosenPhase")]
    pub chosen_phase: Phase,
    /// Current phase
    #[serde(rename = "currentPhase")]
    pub current_phase: Phase,
    /// Seconds left in the current phase
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    /// Remaining time formatted as `M:SS`
    #[serde(rename = "timeText")]
    pub time_text: String,
    /// Pomodoros between long breaks
    #[serde(rename = "restInterval")]
    pub rest_interval: u32,
    /// Work phases finished since the daemon started
    #[serde(rename = "completedWorkCycles")]
    pub completed_work_cycles: u32,
}

impl EngineStatus {
    /// Builds a status from a persisted snapshot and the cycle counter.
    pub fn from_state(state: &EngineState, completed_work_cycles: u32) -> Self {
        Self {
            mode: state.operating_mode,
            chosen_phase: state.chosen_phase,
            current_phase: state.current_phase,
            remaining_seconds: state.remaining_seconds,
            time_text: state.time_text(),
            rest_interval: state.rest_interval,
            completed_work_cycles,
        }
    }
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Engine status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EngineStatus>,
    /// Current notification surface
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<crate::notification::NotificationSurface>,
    /// Phase durations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durations: Option<PhaseDurations>,
    /// Options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    /// Journal tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    /// Focus task
    #[serde(rename = "focusTask", skip_serializing_if = "Option::is_none")]
    pub focus_task: Option<FocusTask>,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
