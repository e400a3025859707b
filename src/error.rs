use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the synthesis core at its control boundary.
///
/// Nothing in here is ever produced on the render path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthError {
    #[error("interval {interval} is outside the playable range of ±{limit} semitones")]
    IntervalOutOfRange { interval: i32, limit: u32 },

    #[error("interval {interval} has no audible frequency")]
    InaudibleInterval { interval: i32 },

    #[error("unknown waveform: {0}")]
    UnknownWaveform(String),

    #[error("invalid sequence step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    #[error("playback of {steps} steps over {seconds} seconds is too long")]
    PlaybackTooLong { seconds: f64, steps: usize },
}

/// Errors that can occur while loading or validating a synth configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors raised by the render hosts while setting up output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device available")]
    NoDevice,

    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error(transparent)]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error(transparent)]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("{seconds} seconds of audio do not fit in a WAV file")]
    WavTooLong { seconds: f64 },

    #[error("failed to write WAV file: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Synth(#[from] SynthError),
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_interval_display() {
        let err = SynthError::IntervalOutOfRange {
            interval: 14,
            limit: 12,
        };
        assert_eq!(
            err.to_string(),
            "interval 14 is outside the playable range of ±12 semitones"
        );
    }

    #[test]
    fn test_playback_too_long_display() {
        let err = SynthError::PlaybackTooLong {
            seconds: 1e12,
            steps: 4,
        };
        assert_eq!(err.to_string(), "playback of 4 steps over 1000000000000 seconds is too long");
    }

    #[test]
    fn test_read_file_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "mock");
        let err = ConfigError::read_file("/a/synth.toml", io);
        assert!(err.to_string().contains("/a/synth.toml"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid("envelope.attack_time", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid value for 'envelope.attack_time': must be greater than zero"
        );
    }
}
