use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use chromesthesia::audio::{
    decode_file, synth, write_wav, AudioAnalysisResult, AudioFeatureEstimator, BandIntensities,
    BandLayout, FileSnapshotSource, FrameTicker, PcmBuffer,
};
use chromesthesia::AnalysisConfig;

#[derive(Parser)]
#[command(name = "chromesthesia")]
#[command(about = "Frequency-band extraction and audio feature estimation")]
struct Args {
    /// JSON config overriding analysis constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate tempo, spectral balance, energy and structure of a file
    Analyze {
        /// Audio file (WAV, FLAC, OGG, MP3, M4A)
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Play a file through the live band extractor and print a meter per frame
    Watch {
        input: PathBuf,

        /// Band layout: 3 or 8
        #[arg(long, default_value = "3")]
        layout: BandLayout,

        /// Frames per second (defaults to the config value)
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Also play the file on the default output device
        #[arg(long)]
        play: bool,
    },

    /// Live band meter from the default microphone
    Live {
        #[arg(long, default_value = "3")]
        layout: BandLayout,

        #[arg(long)]
        fps: Option<u32>,

        #[arg(long)]
        frames: Option<u64>,
    },

    /// Write a synthetic test signal as a 32-bit float WAV
    Synth {
        kind: SignalKind,

        output: PathBuf,

        #[arg(long, default_value = "120")]
        bpm: f32,

        #[arg(long, default_value = "10")]
        seconds: f32,

        /// Tone or carrier frequency in Hz
        #[arg(long, default_value = "440")]
        freq: f32,

        #[arg(long, default_value = "44100")]
        sample_rate: u32,
    },

    /// Write the default configuration as JSON
    Config {
        #[arg(long)]
        write: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SignalKind {
    Click,
    Sine,
    Swell,
    Silence,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    match args.command {
        Command::Analyze { input, output } => analyze(&config, input, output),
        Command::Watch { input, layout, fps, frames, play } => {
            watch(&config, input, layout, fps, frames, play)
        }
        Command::Live { layout, fps, frames } => live(&config, layout, fps, frames),
        Command::Synth { kind, output, bpm, seconds, freq, sample_rate } => {
            let samples = match kind {
                SignalKind::Click => synth::click_track(bpm, seconds, sample_rate, 10.0, 0.8),
                SignalKind::Sine => synth::sine(freq, seconds, sample_rate, 0.8),
                SignalKind::Swell => synth::triangle_swell(seconds, sample_rate, freq),
                SignalKind::Silence => synth::silence(seconds, sample_rate),
            };
            write_wav(&output, &PcmBuffer::mono(samples, sample_rate))
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {:.1}s test signal to {}", seconds, output.display());
            Ok(())
        }
        Command::Config { write } => {
            config.save(&write)?;
            info!("Wrote configuration to {}", write.display());
            Ok(())
        }
    }
}

fn analyze(config: &AnalysisConfig, input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let mut estimator = AudioFeatureEstimator::new(config.clone())?;
    let result = estimator
        .analyze_file(&input)
        .with_context(|| format!("Failed to analyze {}", input.display()))?;

    log_summary(&result);

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("Analysis written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn log_summary(result: &AudioAnalysisResult) {
    info!("=== ANALYSIS RESULTS ===");
    info!("Duration: {:.2} seconds", result.duration);
    info!("Tempo: {} BPM", result.bpm);
    info!(
        "Levels: bass {} / mid {} / treble {} ({})",
        result.bass_level, result.mid_level, result.treble_level, result.dominant_freq
    );
    info!(
        "Energy: {} (avg {}), dynamics: {} (range {:.2})",
        result.energy_level, result.avg_energy, result.dynamics, result.dynamic_range
    );
    info!("Structure: {}", result.structure);
}

fn watch(
    config: &AnalysisConfig,
    input: PathBuf,
    layout: BandLayout,
    fps: Option<u32>,
    frames: Option<u64>,
    play: bool,
) -> Result<()> {
    let buffer = decode_file(&input).with_context(|| format!("Failed to decode {}", input.display()))?;
    let mut source = FileSnapshotSource::new(&buffer, config.spectrum.clone());

    // Held until the meter finishes; dropping it stops the sound.
    let _playback = start_playback(&input, play)?;

    let ticker = FrameTicker::new(fps.unwrap_or(config.live.fps), layout);
    info!("Watching {} at {:?} per frame", input.display(), ticker.period());
    let stats = ticker.run(&mut source, meter(frames));

    info!(
        "{} frames, mean {:?}, worst {:?}",
        stats.frames,
        stats.mean_frame(),
        stats.max_frame
    );
    Ok(())
}

#[cfg(feature = "device")]
fn start_playback(input: &Path, play: bool) -> Result<Option<chromesthesia::audio::AudioPlayback>> {
    if !play {
        return Ok(None);
    }
    let playback = chromesthesia::audio::AudioPlayback::load_file(input)?;
    playback.play();
    Ok(Some(playback))
}

#[cfg(not(feature = "device"))]
fn start_playback(_input: &Path, play: bool) -> Result<Option<()>> {
    if play {
        anyhow::bail!("--play needs the `device` feature");
    }
    Ok(None)
}

#[cfg(feature = "device")]
fn live(config: &AnalysisConfig, layout: BandLayout, fps: Option<u32>, frames: Option<u64>) -> Result<()> {
    let mut processor = chromesthesia::audio::AudioProcessor::new(config.spectrum.clone())?;
    let ticker = FrameTicker::new(fps.unwrap_or(config.live.fps), layout);
    info!("Listening at {} Hz, {:?} per frame", processor.sample_rate(), ticker.period());

    let stats = ticker.run(&mut processor, meter(frames));
    info!("{} frames, worst {:?}", stats.frames, stats.max_frame);
    Ok(())
}

#[cfg(not(feature = "device"))]
fn live(_config: &AnalysisConfig, _layout: BandLayout, _fps: Option<u32>, _frames: Option<u64>) -> Result<()> {
    anyhow::bail!("live capture needs the `device` feature");
}

/// Frame callback printing one meter line per frame, stopping after `limit`.
fn meter(limit: Option<u64>) -> impl FnMut(&BandIntensities) -> ControlFlow<()> {
    let mut count = 0u64;
    let mut stdout = std::io::stdout();
    move |bands| {
        count += 1;
        let bars: Vec<String> = bands
            .labels()
            .iter()
            .zip(bands.values())
            .map(|(label, value)| format!("{:>10} {:<10}", label, "#".repeat(value as usize / 10)))
            .collect();
        // A closed pipe ends the run.
        if writeln!(stdout, "{}", bars.join("")).is_err() {
            return ControlFlow::Break(());
        }
        match limit {
            Some(limit) if count >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }
}
