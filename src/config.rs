//! Startup configuration of the synthesizer.
//!
//! Every setting has a default, so an empty file (or no file) gives the
//! classic patch: a sine voice at A3 with a short plucky envelope.
//!
//! ```toml
//! master_volume = 0.4
//! waveform = "analog_saw"
//!
//! [tuning]
//! base_frequency = 220.0
//!
//! [envelope]
//! attack_time = 0.1
//! release_time = 0.2
//!
//! [mix]
//! mode = "sub_oscillator"
//! sub = "square"
//! fundamental = "sine"
//! ```

use crate::{
    envelope::AdsrParams,
    error::ConfigError,
    note::{Tuning, TuningScheme},
    oscillator::{Lfo, Waveform, ANALOG_SAW_HARMONICS},
    renderer::Mix,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MASTER_VOLUME: f64 = 0.4;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_TICK_MS: u64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub tuning: Tuning,
    pub envelope: AdsrParams,
    pub lfo: Lfo,
    /// Partials summed by the analog saw.
    pub harmonics: u32,
    /// Gain applied to the final sample.
    pub master_volume: f64,
    /// Waveform selected at startup.
    pub waveform: Waveform,
    pub mix: Mix,
    pub host: HostConfig,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            envelope: AdsrParams::default(),
            lfo: Lfo::default(),
            harmonics: ANALOG_SAW_HARMONICS,
            master_volume: DEFAULT_MASTER_VOLUME,
            waveform: Waveform::Sine,
            mix: Mix::Single,
            host: HostConfig::default(),
        }
    }
}

/// Settings for whatever drives the voice, rather than the voice itself.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Sample rate used when rendering to a file.
    pub sample_rate: u32,
    /// How often the control loop polls, in milliseconds.
    pub tick_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl SynthConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable by the render path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let env = &self.envelope;
        positive("envelope.attack_time", env.attack_time)?;
        positive("envelope.decay_time", env.decay_time)?;
        positive("envelope.release_time", env.release_time)?;
        finite("envelope.attack_amplitude", env.attack_amplitude)?;
        finite("envelope.sustain_amplitude", env.sustain_amplitude)?;
        non_negative("envelope.amplitude_floor", env.amplitude_floor)?;

        positive("tuning.base_frequency", self.tuning.base_frequency)?;
        if let TuningScheme::JustIntonation { reference } = self.tuning.scheme {
            positive("tuning.scheme.reference", reference)?;
        }

        non_negative("lfo.rate", self.lfo.rate)?;
        non_negative("lfo.depth", self.lfo.depth)?;

        if self.harmonics == 0 {
            return Err(ConfigError::invalid("harmonics", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(ConfigError::invalid("master_volume", "must be between 0 and 1"));
        }

        let layers = self.mix.layers();
        if layers.is_empty() {
            return Err(ConfigError::invalid("mix.layers", "must contain at least one oscillator"));
        }
        for layer in &layers {
            positive("mix.layers.ratio", layer.ratio)?;
            finite("mix.layers.weight", layer.weight)?;
        }

        if self.host.sample_rate == 0 {
            return Err(ConfigError::invalid("host.sample_rate", "must be greater than zero"));
        }
        if self.host.tick_ms == 0 {
            return Err(ConfigError::invalid("host.tick_ms", "must be greater than zero"));
        }

        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not a finite number")))
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be greater than zero"))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must not be negative"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::renderer::OscillatorLayer;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(SynthConfig::from_toml("").unwrap(), SynthConfig::default());
    }

    #[test]
    fn test_defaults() {
        let config = SynthConfig::default();
        assert_eq!(config.tuning.base_frequency, 220.0);
        assert_eq!(config.master_volume, 0.4);
        assert_eq!(config.harmonics, 99);
        assert_eq!(config.lfo.rate, 5.0);
        assert_eq!(config.lfo.depth, 0.002);
        assert_eq!(config.envelope.sustain_amplitude, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = SynthConfig::from_toml(
            r#"
            waveform = "triangle"
            master_volume = 0.25

            [envelope]
            release_time = 0.5

            [tuning]
            scheme = { just_intonation = { reference = 261.63 } }
            interval_limit = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.waveform, Waveform::Triangle);
        assert_eq!(config.master_volume, 0.25);
        assert_eq!(config.envelope.release_time, 0.5);
        assert_eq!(config.envelope.attack_time, 0.1);
        assert_eq!(config.tuning.base_frequency, 220.0);
        assert_eq!(config.tuning.scheme, TuningScheme::JustIntonation { reference: 261.63 });
        assert_eq!(config.tuning.interval_limit, Some(12));
    }

    #[test]
    fn test_mix_modes() {
        let config = SynthConfig::from_toml(
            r#"
            [mix]
            mode = "sub_oscillator"
            sub = "square"
            fundamental = "analog_saw"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.mix.layers(),
            vec![
                OscillatorLayer::fixed(Waveform::Square, 0.5, 1.0),
                OscillatorLayer::fixed(Waveform::AnalogSaw, 1.0, 1.0),
            ]
        );

        let config = SynthConfig::from_toml(
            r#"
            [mix]
            mode = "layers"
            layers = [{ ratio = 2.0, weight = 0.5 }, { waveform = "noise", weight = 0.1 }]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.mix.layers(),
            vec![
                OscillatorLayer {
                    waveform: None,
                    ratio: 2.0,
                    weight: 0.5
                },
                OscillatorLayer::fixed(Waveform::Noise, 1.0, 0.1),
            ]
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = SynthConfig::from_toml("[envelope]\nattack_time = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "envelope.attack_time", .. }));

        let err = SynthConfig::from_toml("master_volume = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "master_volume", .. }));

        let err = SynthConfig::from_toml("[mix]\nmode = \"layers\"\nlayers = []").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "mix.layers", .. }));

        let err = SynthConfig::from_toml("harmonics = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "harmonics", .. }));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = SynthConfig::from_toml("waveform = \"kazoo\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SynthConfig::load("/nonexistent/lofi-synth.toml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
