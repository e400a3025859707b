use serde::{Deserialize, Serialize};

/// Amplitudes below this are output as exact silence.
pub const AMPLITUDE_FLOOR: f64 = 1e-4;

/// Fixed shape of an ADSR envelope.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsrParams {
    /// Attack time in seconds.
    pub attack_time: f64,
    /// Decay time in seconds.
    pub decay_time: f64,
    /// Release time in seconds.
    pub release_time: f64,
    /// Peak amplitude reached at the end of the attack.
    pub attack_amplitude: f64,
    /// Amplitude held while the note stays on.
    pub sustain_amplitude: f64,
    /// Amplitudes below this are forced to zero.
    pub amplitude_floor: f64,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack_time: 0.10,
            decay_time: 0.01,
            release_time: 0.20,
            attack_amplitude: 1.0,
            sustain_amplitude: 0.8,
            amplitude_floor: AMPLITUDE_FLOOR,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdsrPhase {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl AdsrPhase {
    pub fn label(self) -> &'static str {
        match self {
            AdsrPhase::Attack => "ATTACK",
            AdsrPhase::Decay => "DECAY",
            AdsrPhase::Sustain => "SUSTAIN",
            AdsrPhase::Release => "RELEASE",
        }
    }
}

impl std::fmt::Display for AdsrPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An immutable snapshot of an ADSR envelope.
///
/// The envelope is a pure function of time: note events only record when they
/// happened, and [`AdsrEnvelope::amplitude`] derives the level from those
/// timestamps. Events return a new snapshot rather than mutating this one, so a
/// snapshot can be published to the audio thread as a single unit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdsrEnvelope {
    params: AdsrParams,
    /// Time of the most recent note-on, in seconds.
    trigger_on_time: f64,
    /// Time of the most recent note-off, in seconds.
    trigger_off_time: f64,
    note_on: bool,
}

impl AdsrEnvelope {
    /// Creates an envelope that has been released since forever, so it is silent.
    pub fn new(params: AdsrParams) -> Self {
        Self {
            params,
            trigger_on_time: 0.0,
            trigger_off_time: f64::NEG_INFINITY,
            note_on: false,
        }
    }

    pub fn params(&self) -> &AdsrParams {
        &self.params
    }

    pub fn trigger_on_time(&self) -> f64 {
        self.trigger_on_time
    }

    pub fn trigger_off_time(&self) -> f64 {
        self.trigger_off_time
    }

    pub fn is_note_on(&self) -> bool {
        self.note_on
    }

    /// Starts the envelope from silence at `time`, whatever phase it was in.
    pub fn note_on(&self, time: f64) -> Self {
        Self {
            trigger_on_time: time,
            note_on: true,
            ..*self
        }
    }

    /// Releases the envelope at `time`.
    pub fn note_off(&self, time: f64) -> Self {
        Self {
            trigger_off_time: time,
            note_on: false,
            ..*self
        }
    }

    /// Gets the phase the envelope is in at `time`.
    pub fn phase(&self, time: f64) -> AdsrPhase {
        self.evaluate(time).0
    }

    /// Gets the amplitude of the envelope at `time`.
    pub fn amplitude(&self, time: f64) -> f64 {
        self.evaluate(time).1
    }

    /// Picks the phase for `time` and computes the amplitude on that phase's
    /// segment. Phase and amplitude both come from here so they always agree.
    fn evaluate(&self, time: f64) -> (AdsrPhase, f64) {
        let p = &self.params;
        let (phase, amplitude) = if self.note_on {
            let life_time = time - self.trigger_on_time;
            if life_time <= p.attack_time {
                let amp = p.attack_amplitude * (life_time / p.attack_time);
                (AdsrPhase::Attack, amp)
            } else if life_time <= p.attack_time + p.decay_time {
                let t = (life_time - p.attack_time) / p.decay_time;
                let amp = p.attack_amplitude + (p.sustain_amplitude - p.attack_amplitude) * t;
                (AdsrPhase::Decay, amp)
            } else {
                (AdsrPhase::Sustain, p.sustain_amplitude)
            }
        } else {
            let t = ((time - self.trigger_off_time) / p.release_time).clamp(0.0, 1.0);
            (AdsrPhase::Release, p.sustain_amplitude * (1.0 - t))
        };

        // Also catches negative and NaN levels.
        if !(amplitude >= p.amplitude_floor) {
            return (phase, 0.0);
        }
        (phase, amplitude)
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}
