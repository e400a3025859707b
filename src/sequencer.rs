//! A scripted stand-in for a player at the keyboard.
//!
//! A [`Sequence`] is written as whitespace separated steps of the form
//! `note[:hold[:rest]][@waveform]`, where `note` is an interval from the base
//! note or a key of the computer keyboard layout, and `hold`/`rest` are in
//! seconds. For example `0:0.3 4:0.3 z:0.5:0.2@square`.

use crate::{
    clock::StreamClock,
    error::SynthError,
    note::key_interval,
    oscillator::Waveform,
    voice::Controller,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

pub const DEFAULT_HOLD: f64 = 0.3;
pub const DEFAULT_REST: f64 = 0.1;

/// Longest hold or rest a step may ask for, in seconds.
pub const MAX_STEP_SECONDS: f64 = 3600.0;

/// Longest a sequence may play for, repeats included, in seconds.
pub const MAX_PLAYBACK_SECONDS: f64 = 86_400.0;
pub const MAX_PLAYBACK_STEPS: usize = 1_000_000;

/// The arpeggio played when no sequence is given.
pub const DEMO_SEQUENCE: &str = "0:0.4 4:0.4 7:0.4 4:0.4";

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Step {
    pub interval: i32,
    /// Switch to this waveform as the note starts.
    pub waveform: Option<Waveform>,
    /// How long the note is held, in seconds.
    pub hold: f64,
    /// Silence after the note is released, in seconds.
    pub rest: f64,
}

impl std::str::FromStr for Step {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SynthError::InvalidStep {
            step: s.to_string(),
            reason: reason.to_string(),
        };

        let (timing, waveform) = match s.split_once('@') {
            Some((timing, waveform)) => (timing, Some(waveform.parse::<Waveform>()?)),
            None => (s, None),
        };

        let mut parts = timing.splitn(3, ':');
        let note = parts.next().unwrap_or_default();
        let interval = match note.parse::<i32>() {
            Ok(interval) => interval,
            Err(_) => {
                let mut chars = note.chars();
                match (chars.next(), chars.next()) {
                    (Some(key), None) => key_interval(key).ok_or_else(|| invalid("not a key of the layout"))?,
                    _ => return Err(invalid("expected an interval or a key")),
                }
            }
        };

        let mut seconds = |default: f64| -> Result<f64, SynthError> {
            match parts.next() {
                None => Ok(default),
                Some(value) => match value.parse::<f64>() {
                    Ok(value) if (0.0..=MAX_STEP_SECONDS).contains(&value) => Ok(value),
                    Ok(value) if value > MAX_STEP_SECONDS => Err(invalid("durations must not exceed an hour")),
                    _ => Err(invalid("durations must be non-negative seconds")),
                },
            }
        };
        let hold = seconds(DEFAULT_HOLD)?;
        let rest = seconds(DEFAULT_REST)?;

        Ok(Step {
            interval,
            waveform,
            hold,
            rest,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl std::str::FromStr for Sequence {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let steps = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Step>, _>>()?;
        if steps.is_empty() {
            return Err(SynthError::InvalidStep {
                step: s.to_string(),
                reason: "a sequence needs at least one step".to_string(),
            });
        }
        Ok(Self { steps })
    }
}

impl Sequence {
    /// Gets the length of one pass through the sequence, in seconds.
    pub fn duration(&self) -> f64 {
        self.steps.iter().map(|step| step.hold + step.rest).sum()
    }

    /// Gets the length of `repeats` passes through the sequence, in seconds.
    /// Fails if that would play for longer than a day or too many steps.
    pub fn playback_duration(&self, repeats: usize) -> Result<f64, SynthError> {
        let seconds = self.duration() * repeats as f64;
        let steps = self.steps.len().saturating_mul(repeats);
        if seconds > MAX_PLAYBACK_SECONDS || steps > MAX_PLAYBACK_STEPS {
            return Err(SynthError::PlaybackTooLong { seconds, steps });
        }
        Ok(seconds)
    }

    /// Lays the steps out as note events, `repeats` times over, starting at `start`.
    pub fn timeline(&self, start: f64, repeats: usize) -> Vec<TimedEvent> {
        let mut events = Vec::with_capacity(2 * self.steps.len() * repeats);
        let mut time = start;
        for _ in 0..repeats {
            for step in &self.steps {
                events.push(TimedEvent {
                    time,
                    event: Event::NoteOn {
                        interval: step.interval,
                        waveform: step.waveform,
                    },
                });
                time += step.hold;
                events.push(TimedEvent {
                    time,
                    event: Event::NoteOff,
                });
                time += step.rest;
            }
        }
        events
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TimedEvent {
    /// Stream time in seconds.
    pub time: f64,
    pub event: Event,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Event {
    NoteOn {
        interval: i32,
        waveform: Option<Waveform>,
    },
    NoteOff,
}

impl Event {
    /// Applies the event to the voice at `time`.
    pub fn apply(&self, controller: &mut Controller, time: f64) -> Result<(), SynthError> {
        match *self {
            Event::NoteOn { interval, waveform } => {
                let pitch = controller.play_interval(interval, waveform, time)?;
                tracing::info!(
                    osc = %controller.waveform(),
                    note = %controller.tuning().note(interval),
                    pitch,
                    time,
                    "note on"
                );
            }
            Event::NoteOff => {
                controller.note_off(time);
                tracing::debug!(time, "note off");
            }
        }
        Ok(())
    }
}

/// Drives a voice from a sequence in real time, polling the stream clock.
pub struct ControlLoop {
    controller: Controller,
    clock: Arc<StreamClock>,
    tick: Duration,
}

impl ControlLoop {
    pub fn new(controller: Controller, clock: Arc<StreamClock>, tick: Duration) -> Self {
        Self {
            controller,
            clock,
            tick,
        }
    }

    /// Plays `sequence` `repeats` times and waits for the last release to finish.
    ///
    /// Events are stamped with the clock time at which they are noticed, so
    /// they land up to one tick late. Gives up if the clock stops advancing.
    pub fn run(&mut self, sequence: &Sequence, repeats: usize) -> Result<(), SynthError> {
        let tail = self.controller.envelope().params().release_time;
        let seconds = sequence.playback_duration(repeats)? + tail;
        let too_long = SynthError::PlaybackTooLong {
            seconds,
            steps: sequence.steps.len().saturating_mul(repeats),
        };
        let deadline = Duration::try_from_secs_f64(2.0 * seconds + 1.0)
            .ok()
            .and_then(|timeout| Instant::now().checked_add(timeout))
            .ok_or(too_long)?;

        let start = self.clock.time();
        let end = start + seconds;
        let events = sequence.timeline(start, repeats);
        let mut next = 0;
        let mut phase = None;

        loop {
            let now = self.clock.time();
            while let Some(event) = events.get(next).filter(|e| e.time <= now) {
                event.event.apply(&mut self.controller, now)?;
                next += 1;
            }

            let current = self.controller.phase(now);
            if phase != Some(current) {
                tracing::debug!(env = %current, time = now, "envelope phase");
                phase = Some(current);
            }

            if next == events.len() && now >= end {
                return Ok(());
            }
            if Instant::now() > deadline {
                tracing::warn!(time = now, "stream clock stalled, stopping playback");
                return Ok(());
            }
            std::thread::sleep(self.tick);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_step() {
        let step: Step = "7:0.5:0.25@square".parse().unwrap();
        assert_eq!(
            step,
            Step {
                interval: 7,
                waveform: Some(Waveform::Square),
                hold: 0.5,
                rest: 0.25
            }
        );

        let step: Step = "-3".parse().unwrap();
        assert_eq!(step.interval, -3);
        assert_eq!(step.hold, DEFAULT_HOLD);
        assert_eq!(step.rest, DEFAULT_REST);
        assert_eq!(step.waveform, None);
    }

    #[test]
    fn test_parse_key_step() {
        let step: Step = ",:0.2".parse().unwrap();
        assert_eq!(step.interval, 12);
        assert_eq!(step.hold, 0.2);
        let step: Step = "/".parse().unwrap();
        assert_eq!(step.interval, 15);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("q".parse::<Step>(), Err(SynthError::InvalidStep { .. })));
        assert!(matches!("zz".parse::<Step>(), Err(SynthError::InvalidStep { .. })));
        assert!(matches!("0:-1".parse::<Step>(), Err(SynthError::InvalidStep { .. })));
        assert!(matches!("0@organ".parse::<Step>(), Err(SynthError::UnknownWaveform(_))));
        assert!(matches!("  ".parse::<Sequence>(), Err(SynthError::InvalidStep { .. })));
    }

    #[test]
    fn test_demo_sequence() {
        let sequence: Sequence = DEMO_SEQUENCE.parse().unwrap();
        let events = sequence.timeline(0.0, 1);
        assert_eq!(events.len(), 8);
        assert!(matches!(events[2].event, Event::NoteOn { interval: 7, waveform: None }));
        assert!((sequence.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_overlong_durations() {
        assert!(matches!("0:1e300".parse::<Sequence>(), Err(SynthError::InvalidStep { .. })));
        assert!(matches!("0:0.1:3601".parse::<Step>(), Err(SynthError::InvalidStep { .. })));
        assert!(matches!("0:inf".parse::<Step>(), Err(SynthError::InvalidStep { .. })));
        let step: Step = "0:3600:3600".parse().unwrap();
        assert_eq!(step.hold, MAX_STEP_SECONDS);
    }

    #[test]
    fn test_run_rejects_endless_playback() {
        use crate::{config::SynthConfig, voice::voice};

        let (controller, _renderer) = voice(&SynthConfig::default());
        let clock = Arc::new(StreamClock::new(1000));
        let sequence: Sequence = "0:3600:3600".parse().unwrap();
        let mut control = ControlLoop::new(controller, clock, Duration::from_millis(1));
        assert!(matches!(
            control.run(&sequence, usize::MAX),
            Err(SynthError::PlaybackTooLong { .. })
        ));
    }

    #[test]
    fn test_playback_duration() {
        let sequence: Sequence = "0:0.5:0.5 4:1".parse().unwrap();
        assert!((sequence.playback_duration(3).unwrap() - 4.8).abs() < 1e-12);
        assert!(matches!(
            sequence.playback_duration(usize::MAX),
            Err(SynthError::PlaybackTooLong { .. })
        ));

        let instant: Sequence = "0:0:0".parse().unwrap();
        assert_eq!(instant.playback_duration(1000).unwrap(), 0.0);
        assert!(matches!(
            instant.playback_duration(MAX_PLAYBACK_STEPS + 1),
            Err(SynthError::PlaybackTooLong { .. })
        ));
    }

    #[test]
    fn test_run_rejects_overlong_release() {
        use crate::{config::SynthConfig, voice::voice};

        let mut config = SynthConfig::default();
        config.envelope.release_time = 1e300;
        let (controller, _renderer) = voice(&config);
        let clock = Arc::new(StreamClock::new(1000));
        let sequence: Sequence = "0:0.1".parse().unwrap();
        let mut control = ControlLoop::new(controller, clock, Duration::from_millis(1));
        assert!(matches!(
            control.run(&sequence, 1),
            Err(SynthError::PlaybackTooLong { .. })
        ));
    }

    #[test]
    fn test_failed_note_keeps_waveform() {
        use crate::{config::SynthConfig, voice::voice};

        let mut config = SynthConfig::default();
        config.tuning.interval_limit = Some(12);
        let (mut controller, _renderer) = voice(&config);
        let event = Event::NoteOn {
            interval: 13,
            waveform: Some(Waveform::Noise),
        };
        assert!(event.apply(&mut controller, 0.0).is_err());
        assert_eq!(controller.waveform(), Waveform::Sine);
        assert!(!controller.envelope().is_note_on());
    }

    #[test]
    fn test_timeline() {
        let sequence: Sequence = "0:0.5:0.5 12:0.25:0".parse().unwrap();
        assert_eq!(sequence.duration(), 1.25);

        let events = sequence.timeline(1.0, 2);
        assert_eq!(events.len(), 8);
        assert_eq!(events[0].time, 1.0);
        assert!(matches!(events[0].event, Event::NoteOn { interval: 0, .. }));
        assert_eq!(events[1], TimedEvent { time: 1.5, event: Event::NoteOff });
        assert_eq!(events[2].time, 2.0);
        assert!(matches!(events[2].event, Event::NoteOn { interval: 12, .. }));
        assert_eq!(events[3].time, 2.25);
        assert_eq!(events[4].time, 2.25);
        assert_eq!(events[7].time, 3.5);
    }

    #[test]
    fn test_control_loop_with_running_clock() {
        use crate::{config::SynthConfig, voice::voice};

        let (controller, _renderer) = voice(&SynthConfig::default());
        let context = controller.context().clone();
        let clock = Arc::new(StreamClock::new(1000));

        // Stands in for the audio thread, advancing the clock ten times faster
        // than real time.
        let ticker = {
            let clock = clock.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    for _ in 0..10 {
                        clock.tick();
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let sequence: Sequence = "5:0.1:0.1@triangle".parse().unwrap();
        let mut control = ControlLoop::new(controller, clock.clone(), Duration::from_millis(1));
        control.run(&sequence, 1).unwrap();

        let envelope = context.envelope();
        assert!(!envelope.is_note_on());
        assert!(envelope.trigger_off_time() > envelope.trigger_on_time());
        assert_eq!(context.waveform(), Waveform::Triangle);
        assert!(clock.time() >= 0.2 + 0.2);
        ticker.join().unwrap();
    }
}
