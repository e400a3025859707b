pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod note;
pub mod oscillator;
pub mod output;
pub mod renderer;
pub mod sequencer;
pub mod voice;
