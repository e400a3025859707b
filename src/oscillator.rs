use crate::error::SynthError;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_2_PI, PI, TAU};

/// Number of harmonics summed by the additive sawtooth.
pub const ANALOG_SAW_HARMONICS: u32 = 99;

pub const DEFAULT_LFO_RATE: f64 = 5.0;
pub const DEFAULT_LFO_DEPTH: f64 = 0.002;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    /// Band-limited sawtooth built from a truncated Fourier series.
    AnalogSaw,
    /// Naive rising ramp, cheap but aliased.
    DigitalSaw,
    /// Naive falling ramp.
    ReverseSaw,
    /// Uniform white noise, independent of frequency and time.
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 7] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::AnalogSaw,
        Waveform::DigitalSaw,
        Waveform::ReverseSaw,
        Waveform::Noise,
    ];

    /// Gets the compact index used to store the waveform in an atomic.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Gets the label shown in the status line.
    pub fn label(self) -> &'static str {
        match self {
            Waveform::Sine => "SINE",
            Waveform::Square => "SQUARE",
            Waveform::Triangle => "TRIANGLE",
            Waveform::AnalogSaw => "ANALOG SAW",
            Waveform::DigitalSaw => "DIGITAL SAW",
            Waveform::ReverseSaw => "REVERSE SAW",
            Waveform::Noise => "NOISE",
        }
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Waveform {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "analog_saw" => Ok(Waveform::AnalogSaw),
            "digital_saw" | "saw" => Ok(Waveform::DigitalSaw),
            "reverse_saw" => Ok(Waveform::ReverseSaw),
            "noise" => Ok(Waveform::Noise),
            _ => Err(SynthError::UnknownWaveform(s.to_string())),
        }
    }
}

/// Low-frequency sine that wobbles the carrier's pitch.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lfo {
    /// Rate in Hz.
    pub rate: f64,
    /// Phase deviation per Hz of carrier frequency, in radians.
    pub depth: f64,
}

impl Default for Lfo {
    fn default() -> Self {
        Self {
            rate: DEFAULT_LFO_RATE,
            depth: DEFAULT_LFO_DEPTH,
        }
    }
}

impl Lfo {
    /// Disables the vibrato.
    pub fn off() -> Self {
        Self { rate: 0.0, depth: 0.0 }
    }

    /// Gets the instantaneous carrier phase in radians at `time` seconds.
    pub fn phase(&self, frequency: f64, time: f64) -> f64 {
        TAU * frequency * time + self.depth * frequency * (TAU * self.rate * time).sin()
    }
}

/// Produces waveform samples as a function of continuous time.
///
/// Apart from the noise generator's state, sampling is a pure function of
/// frequency, time and waveform, so the same oscillator can be evaluated for
/// several layers in any order.
pub struct Oscillator {
    lfo: Lfo,
    harmonics: u32,
    noise: SmallRng,
}

impl Oscillator {
    pub fn new(lfo: Lfo, harmonics: u32) -> Self {
        Self {
            lfo,
            harmonics,
            noise: SmallRng::from_entropy(),
        }
    }

    /// Creates an oscillator whose noise sequence is reproducible.
    pub fn with_seed(lfo: Lfo, harmonics: u32, seed: u64) -> Self {
        Self {
            lfo,
            harmonics,
            noise: SmallRng::seed_from_u64(seed),
        }
    }

    /// Gets the amplitude of `waveform` at `frequency` Hz and `time` seconds.
    /// Frequencies that are not finite and positive produce silence.
    pub fn sample(&mut self, frequency: f64, time: f64, waveform: Waveform) -> f64 {
        if !(frequency.is_finite() && frequency > 0.0) {
            return 0.0;
        }

        let phase = self.lfo.phase(frequency, time);
        match waveform {
            Waveform::Sine => sine(phase),
            Waveform::Square => square(phase),
            Waveform::Triangle => triangle(phase),
            Waveform::AnalogSaw => analog_saw(phase, self.harmonics),
            Waveform::DigitalSaw => digital_saw(phase),
            Waveform::ReverseSaw => reverse_saw(phase),
            Waveform::Noise => self.noise.gen_range(-1.0..=1.0),
        }
    }
}

pub fn sine(phase: f64) -> f64 {
    phase.sin()
}

/// Follows the sign of the sine, so vibrato moves the edges with it.
pub fn square(phase: f64) -> f64 {
    if phase.sin() > 0.0 {
        1.0
    } else {
        -1.0
    }
}

pub fn triangle(phase: f64) -> f64 {
    phase.sin().asin() * FRAC_2_PI
}

/// Sums the first `harmonics` partials of a sawtooth.
pub fn analog_saw(phase: f64, harmonics: u32) -> f64 {
    let mut output = 0.0;
    for n in 1..=harmonics {
        let n = n as f64;
        output += (n * phase).sin() / n;
    }
    output * FRAC_2_PI
}

/// Maps each period of the phase linearly onto -1..1.
pub fn digital_saw(phase: f64) -> f64 {
    phase.rem_euclid(TAU) / PI - 1.0
}

pub fn reverse_saw(phase: f64) -> f64 {
    -digital_saw(phase)
}
