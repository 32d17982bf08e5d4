//! Notification surface rendered from the engine state.
//!
//! The daemon has no desktop notification center to talk to, so the
//! "notification" is a plain value:
//!
//! - `NotificationSurface`: title, text, optional progress and action buttons
//! - `NotificationRenderer`: builds a surface for each operating mode
//! - `TextRenderer`: the default renderer
//!
//! The engine keeps the latest surface on a `watch` channel and clients read
//! it through the `status` command.

mod actions;

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::types::OperatingMode;

pub use self::actions::{action_ids, NotificationAction};

/// Progress bar shown while a phase is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Seconds elapsed in the phase
    pub value: u32,
    /// Phase length in seconds
    pub max: u32,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSurface {
    /// Mode the surface was rendered for
    pub mode: OperatingMode,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    pub actions: Vec<NotificationAction>,
}

impl NotificationSurface {
    /// Returns true if the surface offers `action`.
    pub fn has_action(&self, action: NotificationAction) -> bool {
        self.actions.contains(&action)
    }
}

// ============================================================================
// NotificationRenderer
// ============================================================================

/// Builds notification surfaces.
pub trait NotificationRenderer: Send + Sync {
    /// Surface for a stopped timer showing the phase length.
    fn render_stopped(&self, phase_name: &str, minutes: u32) -> NotificationSurface;

    /// Surface for a running countdown.
    fn render_active(
        &self,
        phase_name: &str,
        elapsed_seconds: u32,
        total_seconds: u32,
        time_text: &str,
    ) -> NotificationSurface;

    /// Surface for a paused countdown.
    fn render_paused(&self, phase_name: &str, time_text: &str) -> NotificationSurface;
}

/// Plain-text renderer used by the daemon.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl NotificationRenderer for TextRenderer {
    fn render_stopped(&self, phase_name: &str, minutes: u32) -> NotificationSurface {
        NotificationSurface {
            mode: OperatingMode::Stopped,
            title: format!("{} timer", phase_name),
            text: format!("{} min", minutes),
            progress: None,
            actions: vec![NotificationAction::Start, NotificationAction::Close],
        }
    }

    fn render_active(
        &self,
        phase_name: &str,
        elapsed_seconds: u32,
        total_seconds: u32,
        time_text: &str,
    ) -> NotificationSurface {
        NotificationSurface {
            mode: OperatingMode::Active,
            title: format!("{} in progress", phase_name),
            text: time_text.to_string(),
            progress: Some(Progress {
                value: elapsed_seconds.min(total_seconds),
                max: total_seconds,
            }),
            actions: vec![NotificationAction::Pause],
        }
    }

    fn render_paused(&self, phase_name: &str, time_text: &str) -> NotificationSurface {
        NotificationSurface {
            mode: OperatingMode::Paused,
            title: format!("{} paused", phase_name),
            text: time_text.to_string(),
            progress: None,
            actions: vec![
                NotificationAction::Resume,
                NotificationAction::Reset,
                NotificationAction::Close,
            ],
        }
    }
}

// ============================================================================
// MockNotificationRenderer
// ============================================================================

/// A render request recorded by [`MockNotificationRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Stopped {
        phase_name: String,
        minutes: u32,
    },
    Active {
        phase_name: String,
        elapsed_seconds: u32,
        total_seconds: u32,
        time_text: String,
    },
    Paused {
        phase_name: String,
        time_text: String,
    },
}

/// Renderer that records every call and delegates to [`TextRenderer`].
#[derive(Debug, Default)]
pub struct MockNotificationRenderer {
    calls: Mutex<Vec<RenderCall>>,
}

impl MockNotificationRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded call.
    #[must_use]
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the most recent call.
    #[must_use]
    pub fn last_call(&self) -> Option<RenderCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    fn record(&self, call: RenderCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl NotificationRenderer for MockNotificationRenderer {
    fn render_stopped(&self, phase_name: &str, minutes: u32) -> NotificationSurface {
        self.record(RenderCall::Stopped {
            phase_name: phase_name.to_string(),
            minutes,
        });
        TextRenderer.render_stopped(phase_name, minutes)
    }

    fn render_active(
        &self,
        phase_name: &str,
        elapsed_seconds: u32,
        total_seconds: u32,
        time_text: &str,
    ) -> NotificationSurface {
        self.record(RenderCall::Active {
            phase_name: phase_name.to_string(),
            elapsed_seconds,
            total_seconds,
            time_text: time_text.to_string(),
        });
        TextRenderer.render_active(phase_name, elapsed_seconds, total_seconds, time_text)
    }

    fn render_paused(&self, phase_name: &str, time_text: &str) -> NotificationSurface {
        self.record(RenderCall::Paused {
            phase_name: phase_name.to_string(),
            time_text: time_text.to_string(),
        });
        TextRenderer.render_paused(phase_name, time_text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod text_renderer_tests {
        use super::*;

        #[test]
        fn test_stopped_surface() {
            let surface = TextRenderer.render_stopped("Pomodoro", 25);
            assert_eq!(surface.mode, OperatingMode::Stopped);
            assert_eq!(surface.title, "Pomodoro timer");
            assert_eq!(surface.text, "25 min");
            assert!(surface.progress.is_none());
            assert_eq!(
                surface.actions,
                vec![NotificationAction::Start, NotificationAction::Close]
            );
        }

        #[test]
        fn test_active_surface() {
            let surface = TextRenderer.render_active("Break", 60, 300, "4:00");
            assert_eq!(surface.title, "Break in progress");
            assert_eq!(surface.text, "4:00");
            assert_eq!(surface.progress, Some(Progress { value: 60, max: 300 }));
            assert_eq!(surface.actions, vec![NotificationAction::Pause]);
        }

        #[test]
        fn test_active_progress_is_bounded() {
            let surface = TextRenderer.render_active("Rest", 1000, 900, "0:00");
            assert_eq!(surface.progress, Some(Progress { value: 900, max: 900 }));
        }

        #[test]
        fn test_paused_surface() {
            let surface = TextRenderer.render_paused("Rest", "12:34");
            assert_eq!(surface.title, "Rest paused");
            assert!(surface.has_action(NotificationAction::Resume));
            assert!(surface.has_action(NotificationAction::Reset));
            assert!(surface.has_action(NotificationAction::Close));
            assert!(!surface.has_action(NotificationAction::Pause));
        }

        #[test]
        fn test_surface_serializes() {
            let surface = TextRenderer.render_paused("Rest", "12:34");
            let json = serde_json::to_string(&surface).unwrap();
            assert!(json.contains("\"mode\":\"paused\""));
            assert!(json.contains("\"actions\":[\"resume\",\"reset\",\"close\"]"));
            assert!(!json.contains("progress"));
        }
    }

    mod mock_renderer_tests {
        use super::*;

        #[test]
        fn test_records_calls() {
            let mock = MockNotificationRenderer::new();
            mock.render_stopped("Pomodoro", 25);
            mock.render_paused("Pomodoro", "20:00");

            assert_eq!(mock.calls().len(), 2);
            assert_eq!(
                mock.last_call(),
                Some(RenderCall::Paused {
                    phase_name: "Pomodoro".to_string(),
                    time_text: "20:00".to_string(),
                })
            );
        }
    }
}
