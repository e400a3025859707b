use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cpal::traits::StreamTrait;
use lofi_synth::{
    clock::StreamClock,
    config::SynthConfig,
    oscillator::Waveform,
    output::{render_to_wav, AudioOutput},
    sequencer::{ControlLoop, Sequence, DEMO_SEQUENCE},
    voice::voice,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lofi-synth")]
#[command(author, version, about = "Monophonic real-time synthesizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a note sequence through the default output device
    Play(PlayArgs),

    /// Render a note sequence to a WAV file
    Render {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[command(flatten)]
        args: PlayArgs,
    },
}

#[derive(Args)]
struct PlayArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Waveform to start with, overriding the configuration
    #[arg(short, long)]
    waveform: Option<Waveform>,

    /// Steps of the form note[:hold[:rest]][@waveform], separated by spaces
    #[arg(short, long, default_value = DEMO_SEQUENCE)]
    sequence: Sequence,

    /// Number of times to play the sequence
    #[arg(short, long, default_value_t = 2)]
    repeats: usize,
}

impl PlayArgs {
    fn load_config(&self) -> anyhow::Result<SynthConfig> {
        let mut config = match &self.config {
            Some(path) => SynthConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SynthConfig::default(),
        };
        if let Some(waveform) = self.waveform {
            config.waveform = waveform;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play(args),
        Commands::Render { output, args } => render(output, args),
    }
}

fn play(args: PlayArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;

    let output = AudioOutput::open_default()?;
    let clock = Arc::new(StreamClock::new(output.sample_rate()));
    let (controller, renderer) = voice(&config);

    let stream = output.build_stream(renderer, clock.clone())?;
    stream.play()?;
    tracing::info!(osc = %config.waveform, "lofi-synth playing");

    let tick = Duration::from_millis(config.host.tick_ms);
    ControlLoop::new(controller, clock, tick).run(&args.sequence, args.repeats)?;

    Ok(())
}

fn render(output: PathBuf, args: PlayArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    let (controller, renderer) = voice(&config);
    render_to_wav(
        &output,
        config.host.sample_rate,
        controller,
        renderer,
        &args.sequence,
        args.repeats,
    )
    .with_context(|| format!("rendering {}", output.display()))?;
    Ok(())
}
