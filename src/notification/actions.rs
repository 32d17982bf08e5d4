//! Notification action buttons.
//!
//! Every action maps to exactly one command on the command channel.

use serde::{Deserialize, Serialize};

use crate::types::IpcRequest;

/// Action button identifiers.
pub mod action_ids {
    pub const START: &str = "START_ACTION";
    pub const PAUSE: &str = "PAUSE_ACTION";
    pub const RESUME: &str = "RESUME_ACTION";
    pub const RESET: &str = "RESET_ACTION";
    pub const CLOSE: &str = "CLOSE_ACTION";
}

/// A button shown on the notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Start,
    Pause,
    Resume,
    Reset,
    Close,
}

impl NotificationAction {
    /// Returns the action identifier.
    pub fn id(&self) -> &'static str {
        match self {
            NotificationAction::Start => action_ids::START,
            NotificationAction::Pause => action_ids::PAUSE,
            NotificationAction::Resume => action_ids::RESUME,
            NotificationAction::Reset => action_ids::RESET,
            NotificationAction::Close => action_ids::CLOSE,
        }
    }

    /// Returns the button label.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::Start => "Start",
            NotificationAction::Pause => "Pause",
            NotificationAction::Resume => "Resume",
            NotificationAction::Reset => "Reset",
            NotificationAction::Close => "Close",
        }
    }

    /// Returns the command sent when the button is pressed.
    pub fn request(&self) -> IpcRequest {
        match self {
            NotificationAction::Start => IpcRequest::Start,
            NotificationAction::Pause => IpcRequest::Pause,
            NotificationAction::Resume => IpcRequest::Resume,
            NotificationAction::Reset => IpcRequest::Reset,
            NotificationAction::Close => IpcRequest::Close,
        }
    }

    /// Looks an action up by identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            action_ids::START => Some(NotificationAction::Start),
            action_ids::PAUSE => Some(NotificationAction::Pause),
            action_ids::RESUME => Some(NotificationAction::Resume),
            action_ids::RESET => Some(NotificationAction::Reset),
            action_ids::CLOSE => Some(NotificationAction::Close),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [NotificationAction; 5] = [
        NotificationAction::Start,
        NotificationAction::Pause,
        NotificationAction::Resume,
        NotificationAction::Reset,
        NotificationAction::Close,
    ];

    #[test]
    fn test_ids_are_unique_and_resolvable() {
        for action in ALL {
            assert_eq!(NotificationAction::from_id(action.id()), Some(action));
        }
        assert_eq!(NotificationAction::from_id("SNOOZE_ACTION"), None);
    }

    #[test]
    fn test_request_mapping() {
        assert!(matches!(
            NotificationAction::Pause.request(),
            IpcRequest::Pause
        ));
        assert!(matches!(
            NotificationAction::Resume.request(),
            IpcRequest::Resume
        ));
        assert!(matches!(
            NotificationAction::Close.request(),
            IpcRequest::Close
        ));
    }
}
