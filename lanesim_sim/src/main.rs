//! lanesim CLI
//!
//! Runs the bundled scenario drivers and prints runfiles search paths.

use clap::{Parser, Subcommand};
use lanesim_env::{SearchPath, VirtualClock, WallClock, DEFAULT_REPO_PATHS};
use lanesim_sim::drivers::intersection::INTERSECTION_MAP;
use lanesim_sim::drivers::{run_intersection, run_video_rendering, IntersectionOptions, VideoOptions};
use lanesim_sim::{BitmapViewer, FfmpegEncoder, LogViewer, SimError, VideoRenderer, Viewer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Frame size of rendered videos.
const FRAME_SIZE: (u32, u32) = (800, 800);

/// Lane-corridor traffic scenario simulator
#[derive(Parser, Debug)]
#[command(name = "lanesim-sim")]
#[command(about = "Run lane-corridor traffic scenarios", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Three-way intersection with rule-based agents
    Intersection {
        /// Map file (JSON lane graph)
        #[arg(long, default_value = INTERSECTION_MAP)]
        map: PathBuf,

        /// Steps per run
        #[arg(long, default_value = "50")]
        steps: usize,

        /// Number of runs, each on the next scenario
        #[arg(long, default_value = "1")]
        runs: usize,

        /// Scenario seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Overrides simulation::real_time_factor
        #[arg(long)]
        real_time_factor: Option<f64>,

        /// Do not sleep between steps
        #[arg(long)]
        no_wait: bool,

        /// Render frames into this video (".mp4" is appended)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render configurable scenarios into a video with ffmpeg
    RenderVideo {
        /// Parameter file with the scenario generation config
        #[arg(long, default_value = "demos/params/intersection_configurable.json")]
        params: PathBuf,

        /// Output video path (".mp4" is appended)
        #[arg(short, long, default_value = "demos/scenarios/test_video_step")]
        output: PathBuf,

        /// Scenarios to render
        #[arg(long, default_value = "10")]
        scenarios: usize,

        /// Steps per scenario
        #[arg(long, default_value = "20")]
        steps: usize,

        /// Keep the intermediate PNG frames
        #[arg(long)]
        keep_frames: bool,

        /// ffmpeg executable
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },

    /// Print the runfiles search path of a script
    Runfiles {
        /// Script path (defaults to this executable)
        script: Option<PathBuf>,
    },
}

fn intersection<V: Viewer>(options: &IntersectionOptions, viewer: V, no_wait: bool) -> Result<V, SimError> {
    let runtime = if no_wait {
        run_intersection(options, viewer, &VirtualClock::new())?
    } else {
        run_intersection(options, viewer, &WallClock::new())?
    };
    Ok(runtime.into_viewer())
}

fn run(command: Command) -> Result<(), SimError> {
    match command {
        Command::Intersection {
            map,
            steps,
            runs,
            seed,
            real_time_factor,
            no_wait,
            output,
        } => {
            let options = IntersectionOptions {
                map_file: map,
                num_steps: steps,
                num_runs: runs,
                random_seed: seed,
                real_time_factor,
                ..IntersectionOptions::default()
            };
            match output {
                Some(output) => {
                    let viewer = BitmapViewer::new(FRAME_SIZE.0, FRAME_SIZE.1).use_world_bounds(true);
                    let mut renderer = intersection(&options, VideoRenderer::new(viewer, 0.2)?, no_wait)?;
                    let path = renderer.export_video(output, true)?;
                    info!("Video written to {}", path.display());
                }
                None => {
                    let viewer = intersection(&options, LogViewer::new(), no_wait)?;
                    info!("Drew {} frames", viewer.frames_drawn());
                }
            }
        }
        Command::RenderVideo {
            params,
            output,
            scenarios,
            steps,
            keep_frames,
            ffmpeg,
        } => {
            let options = VideoOptions {
                param_file: params,
                output,
                scenarios_to_show: scenarios,
                steps_per_scenario: steps,
                remove_image_dir: !keep_frames,
                ..VideoOptions::default()
            };
            let viewer = BitmapViewer::new(FRAME_SIZE.0, FRAME_SIZE.1).use_world_bounds(true);
            let (renderer, path) = run_video_rendering(&options, viewer, FfmpegEncoder::with_program(ffmpeg))?;
            info!("Video with {} frames written to {}", renderer.frame_count(), path.display());
        }
        Command::Runfiles { script } => {
            let search_path = match script {
                Some(script) => {
                    let cwd = std::env::current_dir().map_err(lanesim_env::EnvError::from)?;
                    let mut search_path = SearchPath::new();
                    search_path.append_runfiles(&script, &cwd, &DEFAULT_REPO_PATHS);
                    search_path
                }
                None => SearchPath::from_process_args()?,
            };
            for entry in search_path.entries() {
                println!("{}", entry.display());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("lanesim simulator v{}", env!("CARGO_PKG_VERSION"));
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
