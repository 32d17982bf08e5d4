//! Built-in end-of-phase chime.
//!
//! Synthesized with rodio sine sources so the binary does not need to ship
//! an audio file.

use std::time::Duration;

use rodio::source::{SineWave, Source};

/// Chime notes as `(frequency_hz, length_ms)`.
pub const CHIME_NOTES: &[(f32, u64)] = &[(880.0, 160), (1174.7, 160), (1568.0, 320)];

/// Output gain applied to every note.
const CHIME_GAIN: f32 = 0.25;

/// Returns the chime notes as rodio sources, in playback order.
pub fn chime() -> Vec<impl Source<Item = f32> + Send + 'static> {
    CHIME_NOTES
        .iter()
        .map(|&(freq, ms)| {
            SineWave::new(freq)
                .take_duration(Duration::from_millis(ms))
                .amplify(CHIME_GAIN)
        })
        .collect()
}

/// Total length of the chime.
#[must_use]
pub fn chime_duration() -> Duration {
    CHIME_NOTES
        .iter()
        .map(|&(_, ms)| Duration::from_millis(ms))
        .sum()
}
