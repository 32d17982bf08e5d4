//! Sound source selection.
//!
//! A configured sound file wins; otherwise the first well-known desktop
//! sound that exists is used, and the built-in chime is the last resort.

use std::path::{Path, PathBuf};

use super::error::SoundError;

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundSource {
    /// An audio file on disk.
    File {
        /// Display name (file stem).
        name: String,
        /// The full path to the sound file.
        path: PathBuf,
    },
    /// The synthesized chime.
    Embedded,
}

impl SoundSource {
    /// Creates a file source named after the file stem.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::File { name, path }
    }

    /// Creates a file source after checking that the file exists.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::FileNotFound` if `path` is not a regular file.
    pub fn existing_file(path: impl Into<PathBuf>) -> Result<Self, SoundError> {
        let path = path.into();
        if !path.is_file() {
            return Err(SoundError::FileNotFound(path.display().to_string()));
        }
        Ok(Self::file(path))
    }

    /// Returns the name of the sound source.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } => name,
            Self::Embedded => "chime",
        }
    }

    /// Returns true for the built-in chime.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded)
    }

    /// Returns the file path of a file source.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Embedded => None,
        }
    }
}

/// Desktop sounds tried in order when nothing is configured.
const SYSTEM_SOUND_CANDIDATES: &[&str] = &[
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
    "/usr/share/sounds/freedesktop/stereo/bell.oga",
    "/System/Library/Sounds/Glass.aiff",
    "/System/Library/Sounds/Ping.aiff",
];

/// Picks the sound played at the end of a phase.
///
/// A configured file that does not exist is logged and skipped.
#[must_use]
pub fn resolve_sound(configured: Option<&Path>) -> SoundSource {
    if let Some(path) = configured {
        match SoundSource::existing_file(path) {
            Ok(source) => return source,
            Err(e) => tracing::warn!("{}, using the default sound", e),
        }
    }
    default_sound()
}

/// Returns the first available desktop sound, or the built-in chime.
#[must_use]
pub fn default_sound() -> SoundSource {
    SYSTEM_SOUND_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map_or(SoundSource::Embedded, SoundSource::file)
}
