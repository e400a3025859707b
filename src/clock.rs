use std::sync::atomic::{AtomicU64, Ordering};

/// Stream time, counted in samples rendered so far.
///
/// Only the render callback advances the clock. The control loop reads it to
/// timestamp note events on the same timeline the renderer uses.
pub struct StreamClock {
    samples: AtomicU64,
    sample_rate: u32,
}

impl StreamClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: AtomicU64::new(0),
            sample_rate,
        }
    }

    /// Gets the current stream time in seconds.
    pub fn time(&self) -> f64 {
        self.samples.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    /// Gets the time of the next sample and moves the clock past it.
    pub fn tick(&self) -> f64 {
        let sample = self.samples.fetch_add(1, Ordering::Relaxed);
        sample as f64 / self.sample_rate as f64
    }
}
