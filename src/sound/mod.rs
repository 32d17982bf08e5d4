//! Sound playback for the end-of-phase signal.
//!
//! - A configured sound file, a desktop sound, or the built-in chime
//! - Playback on a dedicated audio thread, never blocking the engine
//! - Graceful degradation when audio is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  crossbeam  ┌──────────────────┐
//! │   AudioThread    │────────────▶│ RodioSoundPlayer │
//! │  (Send + Sync)   │   channel   │  (audio thread)  │
//! └──────────────────┘             └────────┬─────────┘
//!                                           │
//!                          ┌────────────────┴────────────────┐
//!                          ▼                                 ▼
//!                 ┌──────────────────┐             ┌──────────────────┐
//!                 │    Sound file    │  fallback   │  Built-in chime  │
//!                 └──────────────────┘────────────▶└──────────────────┘
//! ```

mod embedded;
mod error;
mod player;
mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use embedded::{chime, chime_duration, CHIME_NOTES};
pub use error::SoundError;
pub use player::{try_create_player, AudioThread, RodioSoundPlayer};
pub use source::{default_sound, resolve_sound, SoundSource};

/// Trait for sound playback implementations.
pub trait SoundPlayer: Send + Sync {
    /// Starts playing `source` without waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be handed to the backend.
    fn play(&self, source: &SoundSource) -> Result<(), SoundError>;

    /// Returns true if sound playback is disabled.
    fn is_disabled(&self) -> bool;

    /// Enables sound playback.
    fn enable(&self);

    /// Disables sound playback.
    fn disable(&self);
}

impl SoundPlayer for AudioThread {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        AudioThread::play(self, source)
    }

    fn is_disabled(&self) -> bool {
        AudioThread::is_disabled(self)
    }

    fn enable(&self) {
        AudioThread::enable(self)
    }

    fn disable(&self) {
        AudioThread::disable(self)
    }
}

/// Mock sound player for testing.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<SoundSource>>,
    disabled: AtomicBool,
    should_fail: AtomicBool,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<SoundSource> {
        self.play_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if self.disabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.play_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(source.clone());
        Ok(())
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mock = MockSoundPlayer::new();
        mock.play(&SoundSource::Embedded).unwrap();
        mock.play(&SoundSource::file("/tmp/gong.wav")).unwrap();

        assert_eq!(mock.play_count(), 2);
        assert_eq!(mock.get_play_calls()[0], SoundSource::Embedded);
    }

    #[test]
    fn test_mock_disabled_skips() {
        let mock = MockSoundPlayer::new();
        mock.disable();
        assert!(mock.is_disabled());
        mock.play(&SoundSource::Embedded).unwrap();
        assert_eq!(mock.play_count(), 0);

        mock.enable();
        mock.play(&SoundSource::Embedded).unwrap();
        assert_eq!(mock.play_count(), 1);
    }

    #[test]
    fn test_mock_failure() {
        let mock = MockSoundPlayer::new();
        mock.set_should_fail(true);
        assert!(mock.play(&SoundSource::Embedded).is_err());
        assert_eq!(mock.play_count(), 0);
    }
}
