use crate::error::SynthError;
use serde::{Deserialize, Serialize};

/// Frequency ratio between two adjacent semitones, the twelfth root of two.
pub const SEMITONE_RATIO: f64 = 1.059_463_094_359_295_3;

/// A3, the lowest key of the default layout.
pub const DEFAULT_BASE_FREQUENCY: f64 = 220.0;
pub const DEFAULT_BASE_OCTAVE: i32 = 3;

/// Computer keyboard keys in ascending pitch order, two rows laid out like a piano.
/// The key at index `k` plays the interval `k` above the base note.
pub const KEYBOARD_LAYOUT: [char; 16] = [
    'z', 's', 'x', 'c', 'f', 'v', 'g', 'b', 'n', 'j', 'm', 'k', ',', 'l', '.', '/',
];

/// Note names starting from the base note, which is an A.
const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Semitones from C up to A, used to find where octave numbers change.
const A_ABOVE_C: i32 = 9;

/// How an interval is turned into a frequency.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningScheme {
    /// Intervals are counted from the configured base frequency.
    #[default]
    EqualTemperament,
    /// Intervals are counted from an arbitrary reference note, e.g. to detune
    /// one note up or down from another.
    JustIntonation { reference: f64 },
}

/// Maps discrete key intervals onto frequencies.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Frequency of interval 0, in Hz.
    pub base_frequency: f64,
    /// Octave number of the base note, used for naming only.
    pub base_octave: i32,
    pub scheme: TuningScheme,
    /// When set, intervals further than this many semitones from the base are rejected.
    pub interval_limit: Option<u32>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            base_frequency: DEFAULT_BASE_FREQUENCY,
            base_octave: DEFAULT_BASE_OCTAVE,
            scheme: TuningScheme::EqualTemperament,
            interval_limit: None,
        }
    }
}

impl Tuning {
    /// Gets the frequency of `interval` under the configured scheme.
    pub fn frequency(&self, interval: i32) -> Result<f64, SynthError> {
        self.frequency_for_interval(interval, self.scheme)
    }

    /// Gets the frequency of `interval` under `scheme`.
    /// A positive interval is above the reference, a negative one below it.
    /// Fails if the interval is beyond the limit or so far out that the
    /// frequency is no longer a positive finite number.
    pub fn frequency_for_interval(&self, interval: i32, scheme: TuningScheme) -> Result<f64, SynthError> {
        if let Some(limit) = self.interval_limit {
            if interval.unsigned_abs() > limit {
                return Err(SynthError::IntervalOutOfRange { interval, limit });
            }
        }
        let reference = match scheme {
            TuningScheme::EqualTemperament => self.base_frequency,
            TuningScheme::JustIntonation { reference } => reference,
        };
        let frequency = transpose(reference, interval);
        if frequency.is_finite() && frequency > 0.0 {
            Ok(frequency)
        } else {
            Err(SynthError::InaudibleInterval { interval })
        }
    }

    /// Gets the name of the note at `interval`, e.g. `A3` or `C#4`.
    pub fn note(&self, interval: i32) -> Note {
        let step = interval.rem_euclid(12);
        let octaves = interval.div_euclid(12) + (step + A_ABOVE_C) / 12;
        Note {
            name: NOTE_NAMES[step as usize],
            octave: self.base_octave.saturating_add(octaves),
        }
    }
}

/// Shifts `frequency` by `interval` semitones.
pub fn transpose(frequency: f64, interval: i32) -> f64 {
    frequency * SEMITONE_RATIO.powi(interval)
}

/// Gets the interval played by a key of the computer keyboard layout.
pub fn key_interval(key: char) -> Option<i32> {
    let key = key.to_ascii_lowercase();
    KEYBOARD_LAYOUT.iter().position(|&k| k == key).map(|idx| idx as i32)
}

/// A named note, for display.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Note {
    pub name: &'static str,
    pub octave: i32,
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}
