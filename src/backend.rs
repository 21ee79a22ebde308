use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, warn};

static AUDIO_BACKEND: OnceCell<AudioBackend> = OnceCell::new();

/// Audio I/O backend for the separation tool's decoding library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioBackend {
    #[default]
    Soundfile,
    SoxIo,
}

impl AudioBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioBackend::Soundfile => "soundfile",
            AudioBackend::SoxIo => "sox_io",
        }
    }
}

impl fmt::Display for AudioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown audio backend '{}' (expected 'soundfile' or 'sox_io')",
            self.0
        )
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for AudioBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "soundfile" => Ok(AudioBackend::Soundfile),
            "sox_io" => Ok(AudioBackend::SoxIo),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Select the backend for the lifetime of the process.
///
/// Only the first call takes effect; the returned value is the backend actually in use.
pub fn set_audio_backend(backend: AudioBackend) -> AudioBackend {
    select(&AUDIO_BACKEND, backend)
}

pub fn audio_backend() -> Option<AudioBackend> {
    AUDIO_BACKEND.get().copied()
}

fn select(cell: &OnceCell<AudioBackend>, backend: AudioBackend) -> AudioBackend {
    let active = *cell.get_or_init(|| backend);
    if active == backend {
        debug!("audio backend: {}", active);
    } else {
        warn!(
            "audio backend already set to {}, ignoring request for {}",
            active, backend
        );
    }
    active
}
