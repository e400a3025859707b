//! Hosts that pull samples from a [`VoiceRenderer`]: a live cpal stream and an
//! offline WAV renderer.

use crate::{
    clock::StreamClock,
    error::OutputError,
    renderer::VoiceRenderer,
    sequencer::Sequence,
    voice::Controller,
};
use cpal::{
    traits::{DeviceTrait, HostTrait},
    Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
};
use std::{path::Path, sync::Arc};

/// Most 16-bit samples a WAV file's 32-bit data length can describe.
const MAX_WAV_SAMPLES: f64 = (u32::MAX / 2) as f64;

/// An output device and the stream format it prefers.
pub struct AudioOutput {
    device: Device,
    config: SupportedStreamConfig,
}

impl AudioOutput {
    /// Opens the host's default output device.
    pub fn open_default() -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        Self::from_cpal(device)
    }

    pub fn from_cpal(device: Device) -> Result<Self, OutputError> {
        let config = device.default_output_config()?;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            format = ?config.sample_format(),
            "opened output device"
        );
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Builds a stream that renders one sample per frame, copied to every channel.
    /// The stream advances `clock` by one sample per frame. It is not started.
    pub fn build_stream(&self, renderer: VoiceRenderer, clock: Arc<StreamClock>) -> Result<Stream, OutputError> {
        let config: StreamConfig = self.config.clone().into();
        match self.config.sample_format() {
            SampleFormat::F32 => self.build::<f32>(&config, renderer, clock),
            SampleFormat::I16 => self.build::<i16>(&config, renderer, clock),
            SampleFormat::U16 => self.build::<u16>(&config, renderer, clock),
            other => Err(OutputError::UnsupportedFormat(other)),
        }
    }

    fn build<T>(
        &self,
        config: &StreamConfig,
        mut renderer: VoiceRenderer,
        clock: Arc<StreamClock>,
    ) -> Result<Stream, OutputError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let stream = self.device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let time = clock.tick();
                    let value = T::from_sample(renderer.render(time) as f32);
                    frame.fill(value);
                }
            },
            move |err| {
                tracing::error!(%err, "output stream error");
            },
            None,
        )?;
        Ok(stream)
    }
}

/// Plays `sequence` through the voice into a mono 16-bit WAV file, including
/// the final release. Events land exactly on their scheduled sample.
///
/// Returns the number of samples written.
pub fn render_to_wav(
    path: impl AsRef<Path>,
    sample_rate: u32,
    mut controller: Controller,
    mut renderer: VoiceRenderer,
    sequence: &Sequence,
    repeats: usize,
) -> Result<u64, OutputError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let tail = controller.envelope().params().release_time;
    let end = sequence.playback_duration(repeats)? + tail;
    let total = (end * sample_rate as f64).ceil();
    if !(total <= MAX_WAV_SAMPLES) {
        return Err(OutputError::WavTooLong { seconds: end });
    }
    let total = total as u64;

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
    let clock = StreamClock::new(sample_rate);
    let events = sequence.timeline(0.0, repeats);

    let mut next = 0;
    for _ in 0..total {
        let time = clock.tick();
        while let Some(event) = events.get(next).filter(|e| e.time <= time) {
            event.event.apply(&mut controller, event.time)?;
            next += 1;
        }
        let sample = renderer.render(time);
        writer.write_sample((sample * i16::MAX as f64) as i16)?;
    }

    writer.finalize()?;
    tracing::info!(path = %path.as_ref().display(), samples = total, "rendered");
    Ok(total)
}
