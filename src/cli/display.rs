//! Display utilities for the Pomodoro CLI.
//!
//! This module provides formatted output for:
//! - Command confirmations
//! - Error messages
//! - Status, settings and journal display

use crate::notification::NotificationSurface;
use crate::types::{
    format_time, EngineStatus, FocusTask, IpcResponse, OperatingMode, Options, PhaseDurations, Tag,
};

/// Width of the textual progress bar.
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the confirmation of a timer command.
    pub fn show_command_success(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(status) = response.data.as_ref().and_then(|d| d.status.as_ref()) {
            println!("  {}", Self::status_line(status));
        }
    }

    /// Shows the full status report.
    pub fn show_status(response: &IpcResponse) {
        for line in Self::status_report(response) {
            println!("{}", line);
        }
    }

    /// Shows the durations carried by a response.
    pub fn show_durations(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(durations) = response.data.as_ref().and_then(|d| d.durations) {
            for line in Self::durations_lines(&durations) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the options carried by a response.
    pub fn show_options(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(options) = response.data.as_ref().and_then(|d| d.options) {
            for line in Self::options_lines(&options) {
                println!("  {}", line);
            }
        }
    }

    /// Shows the tag list and the focused task.
    pub fn show_tags(response: &IpcResponse) {
        let data = response.data.as_ref();
        let tags = data.and_then(|d| d.tags.as_deref()).unwrap_or_default();
        for line in Self::tag_lines(tags) {
            println!("{}", line);
        }
        if let Some(focus) = data.and_then(|d| d.focus_task.as_ref()) {
            println!("Focus: {}", Self::focus_line(focus));
        }
    }

    /// Shows a plain confirmation message.
    pub fn show_message(response: &IpcResponse) {
        println!("* {}", response.message);
    }

    /// Rewrites the current terminal line with the countdown.
    pub fn show_watch_line(response: &IpcResponse) {
        use std::io::Write;

        let Some(status) = response.data.as_ref().and_then(|d| d.status.as_ref()) else {
            return;
        };
        let surface = response.data.as_ref().and_then(|d| d.notification.as_ref());
        let bar = surface.map(Self::progress_bar).unwrap_or_default();

        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\r\x1b[2K{} {}", Self::status_line(status), bar);
        let _ = stdout.flush();
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    // ------------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------------

    /// One-line summary such as `Pomodoro 12:34 (running)`.
    pub fn status_line(status: &EngineStatus) -> String {
        format!(
            "{} {} ({})",
            status.current_phase.display_name(),
            status.time_text,
            Self::mode_label(status.mode)
        )
    }

    /// Full status report.
    pub fn status_report(response: &IpcResponse) -> Vec<String> {
        let mut lines = vec![
            "Pomodoro status".to_string(),
            "─────────────────────────────".to_string(),
        ];

        let Some(data) = &response.data else {
            lines.push("The timer is not running".to_string());
            return lines;
        };

        if let Some(status) = &data.status {
            lines.push(format!("State: {}", Self::mode_label(status.mode)));
            lines.push(format!("Phase: {}", status.current_phase.display_name()));
            if status.chosen_phase != status.current_phase {
                lines.push(format!("Chosen: {}", status.chosen_phase.display_name()));
            }
            lines.push(format!("Remaining: {}", status.time_text));
            lines.push(format!(
                "Pomodoros: {} (long break every {})",
                status.completed_work_cycles, status.rest_interval
            ));
        }
        if let Some(surface) = &data.notification {
            lines.push(format!("Notification: {} | {}", surface.title, surface.text));
        }
        if let Some(focus) = &data.focus_task {
            lines.push(format!("Focus: {}", Self::focus_line(focus)));
        }
        lines
    }

    pub fn durations_lines(durations: &PhaseDurations) -> Vec<String> {
        vec![
            format!("Work: {} min", durations.work),
            format!("Short break: {} min", durations.short_break),
            format!("Long break: {} min", durations.long_break),
        ]
    }

    pub fn options_lines(options: &Options) -> Vec<String> {
        vec![
            format!("Sound: {}", Self::on_off(options.notification_sound)),
            format!("Vibration: {}", Self::on_off(options.vibration)),
            format!("Auto break start: {}", Self::on_off(options.auto_break_start)),
            format!(
                "Auto pomodoro start: {}",
                Self::on_off(options.auto_pomodoro_start)
            ),
        ]
    }

    pub fn tag_lines(tags: &[Tag]) -> Vec<String> {
        if tags.is_empty() {
            return vec!["No tags".to_string()];
        }
        tags.iter()
            .map(|tag| {
                let seconds = u32::try_from(tag.seconds).unwrap_or(u32::MAX);
                format!("{:>3}  {:<20} {}", tag.id, tag.name, format_time(seconds))
            })
            .collect()
    }

    pub fn focus_line(focus: &FocusTask) -> String {
        format!("{} ({})", focus.task_name, focus.tag_name)
    }

    /// Renders the surface progress as `[#####-----]`. Empty without
    /// progress.
    pub fn progress_bar(surface: &NotificationSurface) -> String {
        let Some(progress) = surface.progress else {
            return String::new();
        };
        let filled = if progress.max == 0 {
            0
        } else {
            (progress.value.min(progress.max) as usize * BAR_WIDTH) / progress.max as usize
        };
        format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
    }

    fn mode_label(mode: OperatingMode) -> &'static str {
        match mode {
            OperatingMode::Stopped => "stopped",
            OperatingMode::Active => "running",
            OperatingMode::Paused => "paused",
        }
    }

    fn on_off(value: bool) -> &'static str {
        if value {
            "on"
        } else {
            "off"
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
