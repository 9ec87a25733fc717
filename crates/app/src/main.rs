use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Parser, Subcommand};
use sketch_sequencer_core::{
    render_track, AppConfig, CanvasExtent, JsonFileStore, OfflineSynth, Session, SketchError,
    SvgSurface, SynthEngine, TransportStatus,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> sketch_sequencer_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Render { input, output } => run_render(&config, &input, &output),
        Commands::Schedule { inputs } => run_schedule(&config, &inputs),
        Commands::Simulate {
            inputs,
            step,
            pause_at,
            hold,
            realtime,
        } => {
            let plan = SimulationPlan {
                step,
                pause_at,
                hold,
                realtime,
            };
            run_simulate(&config, &inputs, plan).await
        }
    }
}

fn load_session(
    config: &AppConfig,
    inputs: &[PathBuf],
) -> sketch_sequencer_core::Result<Session<OfflineSynth>> {
    let mut session = Session::new(OfflineSynth::new(), config);
    for input in inputs {
        let drawing = JsonFileStore::load(input)?;
        let id = session.import_drawing(&drawing)?;
        tracing::info!(?input, track = %id, "loaded drawing");
    }
    Ok(session)
}

fn run_render(
    config: &AppConfig,
    input: &Path,
    output: &Path,
) -> sketch_sequencer_core::Result<()> {
    let session = load_session(config, &[input.to_path_buf()])?;
    let extent = CanvasExtent::new(config.canvas.width, config.canvas.height);
    let mut surface = SvgSurface::new(extent);
    for track in session.tracks() {
        render_track(&mut surface, track, None)?;
    }
    std::fs::write(output, surface.to_svg())?;
    tracing::info!(?output, elements = surface.element_count(), "wrote svg");
    Ok(())
}

fn run_schedule(config: &AppConfig, inputs: &[PathBuf]) -> sketch_sequencer_core::Result<()> {
    let session = load_session(config, inputs)?;
    let schedule = session.schedule()?;

    println!("{:>6}  {:>10}  {:>10}  {:>10}", "track", "onset s", "freq Hz", "dur s");
    for (track, event) in schedule.ordered() {
        println!(
            "{:>6}  {:>10.4}  {:>10.2}  {:>10.4}",
            track, event.onset_time, event.frequency, event.duration
        );
    }
    tracing::info!(
        tracks = schedule.tracks().len(),
        events = schedule.len(),
        "schedule complete"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct SimulationPlan {
    step: f64,
    pause_at: Option<f64>,
    hold: f64,
    realtime: bool,
}

async fn run_simulate(
    config: &AppConfig,
    inputs: &[PathBuf],
    plan: SimulationPlan,
) -> sketch_sequencer_core::Result<()> {
    let SimulationPlan { step, hold, .. } = plan;
    if !step.is_finite() || step <= 0.0 {
        return Err(SketchError::msg("--step must be a positive number of seconds"));
    }
    if !hold.is_finite() || hold < 0.0 {
        return Err(SketchError::msg("--hold must be a non-negative number of seconds"));
    }

    let mut session = load_session(config, inputs)?;
    let report = drive_simulation(&mut session, plan).await?;
    session.stop();
    tracing::info!(
        fired = report.fired,
        held_ticks = report.held_ticks,
        "simulation finished"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimulationReport {
    fired: usize,
    held_ticks: usize,
    position: f64,
}

/// Plays the session tick by tick until nothing is pending.
async fn drive_simulation(
    session: &mut Session<OfflineSynth>,
    plan: SimulationPlan,
) -> sketch_sequencer_core::Result<SimulationReport> {
    let SimulationPlan {
        step,
        pause_at,
        hold,
        realtime,
    } = plan;
    session.play().await?;
    let mut pause_pending = pause_at;
    let mut held = 0.0;
    let mut held_ticks = 0;

    while !session.transport().engine().pending().is_empty() {
        if session.status() == TransportStatus::Paused {
            // Ticks keep passing in wall time while the transport clock stands still.
            held += step;
            held_ticks += 1;
            if held >= hold {
                session.play().await?;
                tracing::info!(held, "resumed");
            }
        } else {
            for event in session.transport_mut().engine_mut().advance(step) {
                tracing::info!(
                    onset = event.onset_time,
                    frequency = event.frequency,
                    duration = event.duration,
                    "trigger"
                );
            }

            let position = session.transport().engine().position();
            if pause_pending.is_some_and(|at| position >= at) {
                pause_pending = None;
                session.pause();
                tracing::info!(
                    position,
                    hold,
                    pending = session.transport().engine().pending().len(),
                    "holding"
                );
            }
        }

        if realtime {
            tokio::time::sleep(Duration::from_secs_f64(step)).await;
        }
    }

    let engine = session.transport().engine();
    Ok(SimulationReport {
        fired: engine.fired().len(),
        held_ticks,
        position: engine.position(),
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn freehand drawings into sound", long_about = None)]
struct Cli {
    /// JSON configuration file (canvas size, tempo, palette).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a saved drawing to an SVG file.
    Render {
        /// Saved drawing in the persistence JSON format.
        input: PathBuf,
        output: PathBuf,
    },
    /// Print the combined event schedule of one or more drawings.
    Schedule {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Play drawings against the offline engine and log every trigger.
    Simulate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Clock increment per tick, in seconds.
        #[arg(long, default_value_t = 0.05)]
        step: f64,
        /// Pause once the clock reaches this position.
        #[arg(long)]
        pause_at: Option<f64>,
        /// Seconds to stay paused before resuming.
        #[arg(long, default_value_t = 1.0)]
        hold: f64,
        /// Sleep for each step so triggers are logged in real time.
        #[arg(long)]
        realtime: bool,
    },
}
