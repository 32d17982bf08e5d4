//! Command definitions for the Pomodoro CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{
    DurationParams, IpcRequest, OptionParams, Phase, MAX_PHASE_MINUTES, MAX_REST_INTERVAL,
    MIN_PHASE_MINUTES, MIN_REST_INTERVAL,
};

/// Longest accepted task name, in characters.
const MAX_TASK_NAME_LEN: usize = 100;

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro CLI - a countdown service driven from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro",
    version,
    about = "Pomodoro timer service and CLI",
    long_about = "A Pomodoro countdown service running as a background daemon.\n\
                  Work phases alternate with short breaks, and every few work\n\
                  phases a long break is inserted.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the config file (default: ~/.pomodoro/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the countdown of the current phase
    Start,

    /// Pause the running countdown
    Pause,

    /// Resume a paused countdown
    Resume,

    /// Start when stopped or paused, pause when running
    Switch,

    /// Stop and rewind to the chosen phase
    Reset,

    /// Stop the timer and shut the daemon down
    Close,

    /// Show current timer status
    Status,

    /// Follow the countdown until interrupted
    Watch {
        /// Refresh interval in seconds (1-60)
        #[arg(
            short,
            long,
            default_value = "1",
            value_parser = clap::value_parser!(u64).range(1..=60)
        )]
        interval: u64,
    },

    /// Choose the phase the timer starts from
    Phase {
        /// Phase to select
        #[arg(value_enum)]
        phase: PhaseArg,
    },

    /// Set how many work phases run before a long break
    RestInterval {
        /// Work phases per long break (1-10)
        #[arg(value_parser = clap::value_parser!(u32).range(MIN_REST_INTERVAL as i64..=MAX_REST_INTERVAL as i64))]
        interval: u32,
    },

    /// Show or change phase durations
    Durations(DurationArgs),

    /// Show or change timer options
    Options(OptionArgs),

    /// Manage journal tags
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },

    /// Set the tag and task the next work phases are credited to
    Focus(FocusArgs),

    /// Run the timer service in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Returns the IPC request for commands that map to exactly one.
    pub fn to_request(&self) -> Option<IpcRequest> {
        let request = match self {
            Commands::Start => IpcRequest::Start,
            Commands::Pause => IpcRequest::Pause,
            Commands::Resume => IpcRequest::Resume,
            Commands::Switch => IpcRequest::Switch,
            Commands::Reset => IpcRequest::Reset,
            Commands::Close => IpcRequest::Close,
            Commands::Status | Commands::Watch { .. } => IpcRequest::Status,
            Commands::Phase { phase } => IpcRequest::ChangePhase {
                phase: Phase::from(*phase).as_str().to_string(),
            },
            Commands::RestInterval { interval } => IpcRequest::ChangeRestInterval {
                interval: i64::from(*interval),
            },
            Commands::Durations(args) => args.to_request(),
            Commands::Options(args) => args.to_request(),
            Commands::Tags { action } => action.to_request(),
            Commands::Focus(args) => IpcRequest::SetFocusTask {
                tag_id: args.tag,
                task_name: args.task.clone(),
            },
            Commands::Daemon | Commands::Completions { .. } => return None,
        };
        Some(request)
    }
}

// ============================================================================
// Phase Argument
// ============================================================================

/// Phase names accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseArg {
    #[value(alias = "pomodoro")]
    Work,
    #[value(alias = "break")]
    ShortBreak,
    #[value(alias = "rest")]
    LongBreak,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Work => Phase::Work,
            PhaseArg::ShortBreak => Phase::ShortBreak,
            PhaseArg::LongBreak => Phase::LongBreak,
        }
    }
}

// ============================================================================
// Settings Arguments
// ============================================================================

/// Arguments for the durations command. Without flags, shows the current
/// durations.
#[derive(Args, Debug, Clone, Default)]
pub struct DurationArgs {
    /// Work phase in minutes (1-999)
    #[arg(short, long, value_parser = minutes_parser())]
    pub work: Option<u32>,

    /// Short break in minutes (1-999)
    #[arg(short, long, value_parser = minutes_parser())]
    pub short_break: Option<u32>,

    /// Long break in minutes (1-999)
    #[arg(short, long, value_parser = minutes_parser())]
    pub long_break: Option<u32>,
}

fn minutes_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(MIN_PHASE_MINUTES as i64..=MAX_PHASE_MINUTES as i64)
}

impl DurationArgs {
    fn is_empty(&self) -> bool {
        self.work.is_none() && self.short_break.is_none() && self.long_break.is_none()
    }

    fn to_request(&self) -> IpcRequest {
        if self.is_empty() {
            return IpcRequest::Status;
        }
        IpcRequest::SetDurations {
            params: DurationParams {
                work: self.work.map(i64::from),
                short_break: self.short_break.map(i64::from),
                long_break: self.long_break.map(i64::from),
            },
        }
    }
}

/// Arguments for the options command. Without flags, shows the current
/// options.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Play a sound at the end of each phase
    #[arg(long, value_name = "BOOL")]
    pub sound: Option<bool>,

    /// Pulse at the end of each phase
    #[arg(long, value_name = "BOOL")]
    pub vibration: Option<bool>,

    /// Start breaks automatically after a work phase
    #[arg(long, value_name = "BOOL")]
    pub auto_break_start: Option<bool>,

    /// Start work phases automatically after a break
    #[arg(long, value_name = "BOOL")]
    pub auto_pomodoro_start: Option<bool>,
}

impl OptionArgs {
    fn to_request(&self) -> IpcRequest {
        let params = OptionParams {
            notification_sound: self.sound,
            vibration: self.vibration,
            auto_break_start: self.auto_break_start,
            auto_pomodoro_start: self.auto_pomodoro_start,
        };
        if params.notification_sound.is_none()
            && params.vibration.is_none()
            && params.auto_break_start.is_none()
            && params.auto_pomodoro_start.is_none()
        {
            return IpcRequest::Status;
        }
        IpcRequest::SetOptions { params }
    }
}

// ============================================================================
// Journal Arguments
// ============================================================================

/// Tag subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TagsAction {
    /// List tags and their credited time
    List,

    /// Add a tag
    Add {
        /// Tag name
        #[arg(value_parser = validate_task_name)]
        name: String,
    },

    /// Remove a tag by id
    Remove {
        /// Tag id
        id: u32,
    },
}

impl TagsAction {
    fn to_request(&self) -> IpcRequest {
        match self {
            TagsAction::List => IpcRequest::ListTags,
            TagsAction::Add { name } => IpcRequest::AddTag { name: name.clone() },
            TagsAction::Remove { id } => IpcRequest::RemoveTag { id: *id },
        }
    }
}

/// Arguments for the focus command
#[derive(Args, Debug, Clone)]
pub struct FocusArgs {
    /// Tag id to credit work phases to (0 for none)
    #[arg(short = 'g', long)]
    pub tag: u32,

    /// Task name; keeps the current task when omitted
    #[arg(short, long, value_parser = validate_task_name)]
    pub task: Option<String>,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates a tag or task name.
///
/// - Must not be blank
/// - Must not exceed 100 characters
fn validate_task_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if s.chars().count() > MAX_TASK_NAME_LEN {
        return Err(format!(
            "name must be at most {} characters",
            MAX_TASK_NAME_LEN
        ));
    }
    Ok(s.trim().to_string())
}

// ============================================================================
// Tests
// ============================================================================
