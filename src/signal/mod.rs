//! End-of-phase signals: a sound and a haptic pulse.
//!
//! Both are fire-and-forget. Failures are logged and never reach the engine.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::sound::{SoundPlayer, SoundSource};

/// Emits the one-shot signals at the end of a phase.
pub trait SignalEmitter: Send + Sync {
    /// Plays the end-of-phase sound.
    fn play_end_of_phase_sound(&self);

    /// Triggers a haptic pulse.
    fn trigger_haptic_pulse(&self);
}

/// Desktop signals: sound through a [`SoundPlayer`], haptics as a terminal
/// bell on stderr.
pub struct DeviceSignals {
    player: Option<Arc<dyn SoundPlayer>>,
    source: SoundSource,
}

impl DeviceSignals {
    /// Creates signals playing `source`. Without a player the sound is
    /// skipped.
    pub fn new(player: Option<Arc<dyn SoundPlayer>>, source: SoundSource) -> Self {
        Self { player, source }
    }
}

impl SignalEmitter for DeviceSignals {
    fn play_end_of_phase_sound(&self) {
        let Some(player) = &self.player else {
            tracing::debug!("No audio player, skipping end-of-phase sound");
            return;
        };
        if let Err(e) = player.play(&self.source) {
            tracing::warn!("Failed to play end-of-phase sound: {}", e);
        }
    }

    fn trigger_haptic_pulse(&self) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            tracing::debug!("Failed to ring terminal bell: {}", e);
        }
    }
}

/// Signal emitter that counts calls.
#[derive(Debug, Default)]
pub struct MockSignalEmitter {
    sounds: AtomicUsize,
    pulses: AtomicUsize,
}

impl MockSignalEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sound_count(&self) -> usize {
        self.sounds.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pulse_count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl SignalEmitter for MockSignalEmitter {
    fn play_end_of_phase_sound(&self) {
        self.sounds.fetch_add(1, Ordering::SeqCst);
    }

    fn trigger_haptic_pulse(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}
