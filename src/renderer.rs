use crate::{
    oscillator::{Oscillator, Waveform},
    voice::VoiceContext,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One oscillator in the voice's mix.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorLayer {
    /// A fixed waveform, or `None` to follow the voice's selected waveform.
    #[serde(default)]
    pub waveform: Option<Waveform>,
    /// Multiplier applied to the voice frequency.
    #[serde(default = "unity")]
    pub ratio: f64,
    #[serde(default = "unity")]
    pub weight: f64,
}

fn unity() -> f64 {
    1.0
}

impl OscillatorLayer {
    pub fn selected() -> Self {
        Self {
            waveform: None,
            ratio: 1.0,
            weight: 1.0,
        }
    }

    pub fn fixed(waveform: Waveform, ratio: f64, weight: f64) -> Self {
        Self {
            waveform: Some(waveform),
            ratio,
            weight,
        }
    }
}

/// How oscillators are combined into a voice.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mix {
    /// One oscillator playing the selected waveform.
    #[default]
    Single,
    /// A sub-oscillator an octave down layered under the fundamental.
    SubOscillator { sub: Waveform, fundamental: Waveform },
    Layers { layers: Vec<OscillatorLayer> },
}

impl Mix {
    pub fn layers(&self) -> Vec<OscillatorLayer> {
        match self {
            Mix::Single => vec![OscillatorLayer::selected()],
            Mix::SubOscillator { sub, fundamental } => vec![
                OscillatorLayer::fixed(*sub, 0.5, 1.0),
                OscillatorLayer::fixed(*fundamental, 1.0, 1.0),
            ],
            Mix::Layers { layers } => layers.clone(),
        }
    }
}

/// The render half of a voice. Computes one output sample for any point in time.
pub struct VoiceRenderer {
    context: Arc<VoiceContext>,
    oscillator: Oscillator,
    layers: Vec<OscillatorLayer>,
    master_volume: f64,
}

impl VoiceRenderer {
    pub fn new(
        context: Arc<VoiceContext>,
        oscillator: Oscillator,
        layers: Vec<OscillatorLayer>,
        master_volume: f64,
    ) -> Self {
        Self {
            context,
            oscillator,
            layers,
            master_volume,
        }
    }

    /// Gets the output sample at `time` seconds into the stream.
    ///
    /// Safe to call from a real-time audio callback: it reads the shared voice
    /// state without locking and does not allocate.
    pub fn render(&mut self, time: f64) -> f64 {
        let amplitude = self.context.envelope().amplitude(time);
        if amplitude == 0.0 {
            return 0.0;
        }

        let frequency = self.context.frequency();
        let selected = self.context.waveform();

        let mut mix = 0.0;
        for layer in &self.layers {
            let waveform = layer.waveform.unwrap_or(selected);
            mix += layer.weight * self.oscillator.sample(frequency * layer.ratio, time, waveform);
        }

        (amplitude * mix * self.master_volume).clamp(-1.0, 1.0)
    }

    pub fn layers(&self) -> &[OscillatorLayer] {
        &self.layers
    }
}
