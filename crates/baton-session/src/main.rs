use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use baton_audio::{AudioParameterController, AudioParameters};
use baton_beat::{BeatDetector, BeatPipeline, ReferenceTempo, TcpAccelSource};
use baton_classifier::WindowedClassifier;
use baton_core::{Error, PoseSequence, Result};
use baton_session::{BatonConfig, PerformanceSession};
use baton_style::{PerformanceAnalyzer, StyleTaxonomy};

#[derive(Parser)]
#[command(name = "baton", version, about = "Conducting-motion analysis and audio control")]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a recorded performance (JSON array of pose frames)
    Analyze {
        poses: PathBuf,

        /// Override the model checkpoint
        #[arg(long)]
        model: Option<PathBuf>,

        /// Override the feature scaler
        #[arg(long)]
        scaler: Option<PathBuf>,
    },

    /// Follow a live accelerometer stream and report tempo changes
    Listen {
        /// Sensor address (host:port)
        #[arg(long)]
        address: Option<String>,

        /// Reference BPM of the accompaniment
        #[arg(long, conflicts_with = "track")]
        bpm: Option<f64>,

        /// Accompaniment track to estimate the reference BPM from
        #[arg(long)]
        track: Option<PathBuf>,
    },

    /// Estimate the BPM of an audio file
    Bpm { track: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => BatonConfig::from_file(path)?,
        None => BatonConfig::from_env()?,
    };

    match cli.command {
        Commands::Analyze {
            poses,
            model,
            scaler,
        } => analyze(config, poses, model, scaler),
        Commands::Listen {
            address,
            bpm,
            track,
        } => listen(config, address, bpm, track).await,
        Commands::Bpm { track } => {
            let tempo = ReferenceTempo::from_audio_file_async(track, config.reference).await?;
            println!("{:.1}", tempo.bpm());
            Ok(())
        }
    }
}

fn analyze(
    mut config: BatonConfig,
    poses: PathBuf,
    model: Option<PathBuf>,
    scaler: Option<PathBuf>,
) -> Result<()> {
    if let Some(model) = model {
        config.classifier.model_path = model;
    }
    if let Some(scaler) = scaler {
        config.classifier.scaler_path = scaler;
    }

    let json = std::fs::read_to_string(&poses)?;
    let sequence = PoseSequence::from_json(&json)?;
    tracing::info!(path = %poses.display(), frames = sequence.len(), "Loaded recording");

    let classifier_config = config.classifier.clone();
    let analyzer = PerformanceAnalyzer::new(
        move || WindowedClassifier::load(&classifier_config),
        config.analysis,
        StyleTaxonomy::default_conducting(),
    )?;

    // Replay the recording through a session so the live path sees it too
    let mut session = PerformanceSession::new(config.audio, AudioParameters::default())?;
    session.start()?;
    for frame in sequence.frames() {
        session.push_frame(frame.clone());
    }
    session.stop()?;

    let report = session.report(&analyzer)?;
    if let Some(analysis) = &report.analysis {
        println!("{}", analysis.score.feedback_text());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn listen(
    config: BatonConfig,
    address: Option<String>,
    bpm: Option<f64>,
    track: Option<PathBuf>,
) -> Result<()> {
    let reference = match (bpm, track) {
        (Some(bpm), _) => ReferenceTempo::new(bpm)?,
        (None, Some(track)) => {
            ReferenceTempo::from_audio_file_async(track, config.reference.clone()).await?
        }
        (None, None) => {
            return Err(Error::Config(
                "either --bpm or --track is required".into(),
            ))
        }
    };

    let detector = BeatDetector::new(config.beat.clone(), reference)?;
    let address = address.unwrap_or_else(|| config.stream.address.clone());
    let source = TcpAccelSource::new(address).with_max_line_length(config.stream.max_message_len);

    let mut controller = AudioParameterController::new(config.audio, AudioParameters::default())?;
    let mut pipeline = BeatPipeline::new(config.stream);
    let mut updates = pipeline.start_streaming(source, detector).await?;

    tracing::info!(reference_bpm = reference.bpm(), "Listening for beats");

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                controller.on_beat_event(&update.event);

                let engine = controller.engine();
                tracing::info!(
                    at_ms = update.at.as_millis() as u64,
                    event = ?update.event,
                    rate = engine.playback_rate,
                    grain = engine.grain_size,
                    volume_db = engine.volume_db,
                    "Beat"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                pipeline.stop();
                break;
            }
        }
    }

    let stats = pipeline.stats();
    tracing::info!(
        received = stats.received(),
        dropped = stats.dropped(),
        events = stats.events(),
        "Stream closed"
    );
    Ok(())
}
