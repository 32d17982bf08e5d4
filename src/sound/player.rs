//! Sound player implementation using rodio.
//!
//! rodio's `OutputStream` cannot leave the thread that opened it, so the
//! player lives on a dedicated audio thread. `AudioThread` is the `Send +
//! Sync` handle the daemon keeps; play requests reach the thread over a
//! crossbeam channel.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender, TrySendError};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::embedded::chime;
use super::error::SoundError;
use super::source::SoundSource;

/// Pending play requests before new ones are dropped.
const QUEUE_CAPACITY: usize = 8;

/// A sound player that uses rodio for audio playback.
///
/// Must stay on the thread that created it. Playback is non-blocking.
pub struct RodioSoundPlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
}

impl RodioSoundPlayer {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new() -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }

    /// Plays `source`, falling back to the built-in chime if a file cannot
    /// be opened or decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if no sink can be created on the output stream.
    pub fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        match source {
            SoundSource::File { path, name } => {
                debug!("Playing sound file: {}", name);
                match self.play_file(path) {
                    Err(e) if e.should_fallback_to_embedded() => {
                        warn!("Failed to play '{}': {}, falling back to chime", name, e);
                        self.play_chime()
                    }
                    other => other,
                }
            }
            SoundSource::Embedded => self.play_chime(),
        }
    }

    fn play_file(&self, path: &Path) -> Result<(), SoundError> {
        let file = File::open(path)
            .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| SoundError::DecodeError(e.to_string()))?;

        let sink = self.sink()?;
        sink.append(decoder);
        sink.detach();
        Ok(())
    }

    fn play_chime(&self) -> Result<(), SoundError> {
        let sink = self.sink()?;
        for note in chime() {
            sink.append(note);
        }
        sink.detach();
        debug!("Chime playback started (detached)");
        Ok(())
    }

    fn sink(&self) -> Result<Sink, SoundError> {
        Sink::try_new(&self.stream_handle).map_err(|e| SoundError::StreamError(e.to_string()))
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer").finish_non_exhaustive()
    }
}

// ============================================================================
// AudioThread
// ============================================================================

/// Handle to the audio thread.
///
/// Dropping the handle closes the queue and lets the thread exit.
#[derive(Debug)]
pub struct AudioThread {
    tx: Sender<SoundSource>,
    disabled: AtomicBool,
    handle: Option<JoinHandle<()>>,
}

impl AudioThread {
    /// Starts the audio thread and opens the output device on it.
    ///
    /// # Errors
    ///
    /// Returns the device error if the output stream cannot be opened; the
    /// thread has exited by then.
    pub fn spawn(disabled: bool) -> Result<Self, SoundError> {
        let (tx, rx) = bounded::<SoundSource>(QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), SoundError>>(1);

        let handle = std::thread::Builder::new()
            .name("pomodoro-audio".to_string())
            .spawn(move || {
                let player = match RodioSoundPlayer::new() {
                    Ok(player) => {
                        let _ = ready_tx.send(Ok(()));
                        player
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for source in rx {
                    if let Err(e) = player.play(&source) {
                        warn!("Sound playback failed: {}", e);
                    }
                }
                debug!("Audio thread exiting");
            })
            .map_err(|e| SoundError::PlaybackError(format!("cannot spawn audio thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                disabled: AtomicBool::new(disabled),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SoundError::PlaybackError(
                    "audio thread exited during startup".to_string(),
                ))
            }
        }
    }

    /// Queues `source` for playback without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::PlaybackError` if the queue is full or the
    /// thread has stopped.
    pub fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.is_disabled() {
            debug!("Sound playback disabled, skipping");
            return Ok(());
        }
        self.tx.try_send(source.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SoundError::PlaybackError("sound queue full".to_string()),
            TrySendError::Disconnected(_) => {
                SoundError::PlaybackError("audio thread stopped".to_string())
            }
        })
    }

    /// Returns true if sound playback is currently disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Enables sound playback.
    pub fn enable(&self) {
        self.disabled.store(false, Ordering::Relaxed);
    }

    /// Disables sound playback.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        // Closing the queue ends the thread's receive loop.
        let (closed, _) = bounded(0);
        self.tx = closed;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Starts the audio thread, returning None if audio is unavailable.
#[must_use]
pub fn try_create_player(disabled: bool) -> Option<Arc<AudioThread>> {
    match AudioThread::spawn(disabled) {
        Ok(player) => Some(Arc::new(player)),
        Err(e) => {
            warn!("Audio not available, sound disabled: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Audio hardware is usually missing in CI; these tests only check that
    // the no-device path degrades cleanly.

    #[test]
    fn test_spawn_without_device_does_not_panic() {
        let _ = AudioThread::spawn(true);
    }

    #[test]
    fn test_disabled_thread_skips_playback() {
        let player = match AudioThread::spawn(true) {
            Ok(p) => p,
            Err(_) => return,
        };

        assert!(player.is_disabled());
        assert!(player.play(&SoundSource::Embedded).is_ok());

        player.enable();
        assert!(!player.is_disabled());
        player.disable();
        assert!(player.is_disabled());
    }

    #[test]
    fn test_try_create_player_no_panic() {
        let _ = try_create_player(true);
    }
}
