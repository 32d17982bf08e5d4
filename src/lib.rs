//! Pomodoro Service Library
//!
//! This library provides the core functionality for the Pomodoro service.
//! It includes:
//! - Timer engine and the service owning its countdown loop
//! - Preference store and repositories for state, settings and tags
//! - Notification surface rendered from the engine state
//! - End-of-phase sound and haptic signals
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - TOML daemon configuration

pub mod cli;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod signal;
pub mod sound;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    EngineState, EngineStatus, IpcRequest, IpcResponse, OperatingMode, Options, Phase,
    PhaseDurations, ResponseData,
};

pub use config::ServiceConfig;

pub use daemon::{Command, Daemon, TimerEngine, TimerEvent, TimerService};

pub use notification::{
    MockNotificationRenderer, NotificationAction, NotificationRenderer, NotificationSurface,
    TextRenderer,
};

pub use signal::{DeviceSignals, MockSignalEmitter, SignalEmitter};

pub use sound::{MockSoundPlayer, SoundError, SoundPlayer, SoundSource};

pub use store::{JsonFileStore, MemoryStore, PreferenceStore, StoreError};
