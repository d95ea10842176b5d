use std::f32::consts::TAU;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use whizwordz_audio::audio::read_first_channel;
use whizwordz_audio::engine::{platform_backend, SimulatedBackend, StreamBackend};
use whizwordz_audio::{EngineConfig, EngineHandle};

#[derive(Parser, Debug)]
#[command(
    name = "whizwordz_cli",
    about = "Drive the WhizWordz audio engine from the command line"
)]
struct Cli {
    /// Engine configuration file (defaults to assets/engine_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// How long to keep the mode running
    #[arg(long, default_value_t = 5.0, value_parser = parse_seconds)]
    seconds: f32,
    /// Use the deterministic simulated backend instead of the audio device
    #[arg(long)]
    simulate: bool,
}

/// Accept only durations `std::time::Duration` can represent.
fn parse_seconds(arg: &str) -> Result<f32, String> {
    let seconds: f32 = arg.parse().map_err(|err| format!("{err}"))?;
    if seconds < 0.0 {
        return Err(format!("{seconds} is negative"));
    }
    Duration::try_from_secs_f32(seconds).map_err(|err| format!("{seconds}: {err}"))?;
    Ok(seconds)
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Route the microphone to the speaker
    Passthrough {
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        gain_db: f32,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Play a file while recording microphone and playback to a stereo file
    PlayRecord {
        source: PathBuf,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        gain_db: f32,
        /// Override the recordings directory
        #[arg(long)]
        recordings_dir: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Play the first channel of a file once
    PlayLeft {
        source: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the header and a first-channel summary of a container file
    Inspect { path: PathBuf },
}

fn main() -> ExitCode {
    whizwordz_audio::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path),
        None => EngineConfig::load(),
    };

    match cli.command {
        Commands::Passthrough { gain_db, run } => {
            let session = Session::new(config, &run);
            session.engine.start_full_duplex(gain_db)?;
            session.run_for(run.seconds);
            session.engine.stop_full_duplex()?;
            session.report()
        }
        Commands::PlayRecord {
            source,
            gain_db,
            recordings_dir,
            run,
        } => {
            if let Some(dir) = recordings_dir {
                config.recording.recordings_dir = dir;
            }
            let session = Session::new(config, &run);
            session.engine.start_play_record(&source, gain_db)?;
            session.run_for(run.seconds);
            if let Some(summary) = session.engine.stop_play_record()? {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            session.report()
        }
        Commands::PlayLeft { source, run } => {
            let session = Session::new(config, &run);
            session.engine.play_left_channel(&source)?;
            session.run_until_idle(run.seconds);
            session.engine.stop_playback()?;
            session.report()
        }
        Commands::Inspect { path } => run_inspect(&path),
    }
}

/// Engine plus the simulated device when running a dry run.
struct Session {
    engine: EngineHandle,
    simulated: Option<Arc<SimulatedBackend>>,
}

impl Session {
    fn new(config: EngineConfig, run: &RunArgs) -> Self {
        let (backend, simulated) = if run.simulate {
            let simulated = Arc::new(SimulatedBackend::new());
            let backend: Arc<dyn StreamBackend> = simulated.clone();
            (backend, Some(simulated))
        } else {
            (platform_backend(), None)
        };
        Self {
            engine: EngineHandle::new(backend, config),
            simulated,
        }
    }

    fn callbacks_for(&self, seconds: f32) -> usize {
        let audio = &self.engine.config().audio;
        let frames = (seconds * audio.sample_rate as f32) as usize;
        frames / audio.frames_per_callback.max(1)
    }

    /// Keep the mode running; a dry run pumps callbacks with a synthetic tone.
    fn run_for(&self, seconds: f32) {
        match &self.simulated {
            Some(backend) => {
                for index in 0..self.callbacks_for(seconds) {
                    self.pump(backend, index);
                }
            }
            None => thread::sleep(Duration::from_secs_f32(seconds)),
        }
    }

    /// Like [`Session::run_for`] but returns early once playback ends.
    fn run_until_idle(&self, seconds: f32) {
        match &self.simulated {
            Some(backend) => {
                for index in 0..self.callbacks_for(seconds) {
                    self.pump(backend, index);
                    if !self.engine.is_playing() {
                        break;
                    }
                }
            }
            None => {
                let deadline = Duration::from_secs_f32(seconds);
                let step = Duration::from_millis(50);
                let mut waited = Duration::ZERO;
                while waited < deadline && self.engine.is_playing() {
                    thread::sleep(step);
                    waited += step;
                }
            }
        }
    }

    fn pump(&self, backend: &SimulatedBackend, index: usize) {
        let audio = &self.engine.config().audio;
        let frames = audio.frames_per_callback;
        let rate = audio.sample_rate as f32;
        // 440 Hz at half scale stands in for the microphone
        let tone: Vec<f32> = (0..frames)
            .map(|i| 0.5 * (TAU * 440.0 * (index * frames + i) as f32 / rate).sin())
            .collect();
        backend.inject_capture(&tone);
        backend.pump(frames);
    }

    fn report(&self) -> Result<ExitCode> {
        let status = self.engine.status()?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        Ok(ExitCode::from(0))
    }
}

#[derive(Serialize)]
struct InspectReport<'a> {
    path: &'a Path,
    channels: u16,
    sample_rate: u32,
    frames: usize,
    duration_secs: f32,
    peak: f32,
    rms: f32,
}

fn run_inspect(path: &Path) -> Result<ExitCode> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let decoded =
        read_first_channel(file).with_context(|| format!("decoding {}", path.display()))?;

    let frames = decoded.samples.len();
    let peak = decoded
        .samples
        .iter()
        .fold(0.0f32, |peak, sample| peak.max(sample.abs()));
    let rms = if frames == 0 {
        0.0
    } else {
        (decoded.samples.iter().map(|s| s * s).sum::<f32>() / frames as f32).sqrt()
    };
    let duration_secs = if decoded.sample_rate == 0 {
        0.0
    } else {
        frames as f32 / decoded.sample_rate as f32
    };

    let report = InspectReport {
        path,
        channels: decoded.channels,
        sample_rate: decoded.sample_rate,
        frames,
        duration_secs,
        peak,
        rms,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}
