use crate::{
    config::SynthConfig,
    envelope::{AdsrEnvelope, AdsrPhase},
    error::SynthError,
    note::Tuning,
    oscillator::{Oscillator, Waveform},
    renderer::VoiceRenderer,
};
use basedrop::{Collector, Shared, SharedCell};
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};

/// State of the monophonic voice shared between the control loop and the
/// render callback.
///
/// Every field can be read without blocking. The frequency and waveform are
/// single atomic words; the envelope is published as a whole immutable
/// snapshot, so the reader never sees half of a note event.
pub struct VoiceContext {
    /// Frequency in Hz, stored as the bits of an `f64`.
    frequency: AtomicU64,
    /// Selected waveform, see [`Waveform::index`].
    waveform: AtomicU8,
    /// The most recently published envelope.
    envelope: SharedCell<AdsrEnvelope>,
}

impl VoiceContext {
    pub fn frequency(&self) -> f64 {
        f64::from_bits(self.frequency.load(Ordering::Relaxed))
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_index(self.waveform.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Gets the current envelope snapshot. Never blocks or allocates.
    pub fn envelope(&self) -> Shared<AdsrEnvelope> {
        self.envelope.get()
    }
}

/// Creates the two halves of a voice: the control side and the render side.
pub fn voice(config: &SynthConfig) -> (Controller, VoiceRenderer) {
    let collector = Collector::new();
    let envelope = AdsrEnvelope::new(config.envelope);

    let context = Arc::new(VoiceContext {
        frequency: AtomicU64::new(0f64.to_bits()),
        waveform: AtomicU8::new(config.waveform.index()),
        envelope: SharedCell::new(Shared::new(&collector.handle(), envelope)),
    });

    let oscillator = Oscillator::new(config.lfo, config.harmonics);
    let renderer = VoiceRenderer::new(
        context.clone(),
        oscillator,
        config.mix.layers(),
        config.master_volume,
    );

    let controller = Controller {
        context,
        collector,
        envelope,
        tuning: config.tuning,
    };

    (controller, renderer)
}

/// The control loop's handle on the voice.
///
/// All methods apply immediately and never wait on the render thread.
pub struct Controller {
    context: Arc<VoiceContext>,
    /// Reclaims envelope snapshots once the render thread has let go of them.
    collector: Collector,
    /// Copy of the last published envelope.
    envelope: AdsrEnvelope,
    tuning: Tuning,
}

impl Controller {
    pub fn note_on(&mut self, time: f64) {
        self.publish(self.envelope.note_on(time));
    }

    pub fn note_off(&mut self, time: f64) {
        self.publish(self.envelope.note_off(time));
    }

    pub fn set_frequency(&self, hz: f64) {
        self.context.frequency.store(hz.to_bits(), Ordering::Relaxed);
    }

    pub fn set_waveform(&self, waveform: Waveform) {
        self.context.waveform.store(waveform.index(), Ordering::Relaxed);
    }

    /// Tunes the voice to `interval`, optionally switches waveform, and starts
    /// a note at `time`. Returns the new frequency.
    ///
    /// Nothing changes if the interval cannot be played.
    pub fn play_interval(
        &mut self,
        interval: i32,
        waveform: Option<Waveform>,
        time: f64,
    ) -> Result<f64, SynthError> {
        let frequency = self.tuning.frequency(interval)?;
        if let Some(waveform) = waveform {
            self.set_waveform(waveform);
        }
        self.set_frequency(frequency);
        self.note_on(time);
        Ok(frequency)
    }

    pub fn frequency(&self) -> f64 {
        self.context.frequency()
    }

    pub fn waveform(&self) -> Waveform {
        self.context.waveform()
    }

    pub fn envelope(&self) -> &AdsrEnvelope {
        &self.envelope
    }

    /// Gets the envelope phase at `time`, for display.
    pub fn phase(&self, time: f64) -> AdsrPhase {
        self.envelope.phase(time)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn context(&self) -> &Arc<VoiceContext> {
        &self.context
    }

    fn publish(&mut self, envelope: AdsrEnvelope) {
        self.envelope = envelope;
        let snapshot = Shared::new(&self.collector.handle(), envelope);
        self.context.envelope.set(snapshot);
        self.collector.collect();
    }
}
