use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tasep_common::SimulationConfig;
use tasep_engine::output::{save_final_positions, save_snapshots, OutputFormat};
use tasep_engine::{EngineError, TasepSimulation};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a TASEP growth simulation and records snapshots", long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides timing.max_frames from the configuration
    #[arg(long)]
    max_frames: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting TASEP simulation engine...");

    // --- Load Configuration ---
    let config = SimulationConfig::load(&args.config)?;
    let params = config.model_params()?;
    let max_frames = args.max_frames.unwrap_or(config.timing.max_frames);
    if max_frames == 0 {
        anyhow::bail!("max_frames must be greater than 0.");
    }
    debug!("Model parameters: {:#?}", params);

    // --- Initialize Simulation ---
    let mut sim = TasepSimulation::new(params, config.timing.seed)?;
    sim.set_record_positions(config.output.save_positions_in_snapshot);
    info!("State initialized with {} particles.", sim.state().len());

    let record_interval = config.timing.record_interval_frames.max(1);
    let frame_delay = Duration::from_millis(config.timing.frame_delay_ms);
    info!(
        "Recording a snapshot every {} frames, running at most {} frames.",
        record_interval, max_frames
    );

    // --- Initial Snapshot (t = 0) ---
    sim.record_snapshot();

    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    let print_interval_secs = 5.0;

    for frame in 1..=max_frames {
        let frame_start = Instant::now();
        let model_time = match sim.step() {
            Ok(t) => t,
            Err(e @ EngineError::InvariantViolation(_)) => {
                error!("Engine state corrupt at frame {}: {}", frame, e);
                anyhow::bail!("Simulation aborted.");
            }
            Err(e) => {
                error!("Error during frame {}: {}", frame, e);
                anyhow::bail!("Simulation frame failed.");
            }
        };
        let frame_duration = frame_start.elapsed();

        let stop = config.timing.stop_when_complete && sim.can_be_stopped();
        let is_record_frame = frame % record_interval == 0;
        let is_last_frame = frame == max_frames || stop;
        if is_record_frame || is_last_frame {
            sim.record_snapshot();
        }

        let now = Instant::now();
        if now.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs || is_last_frame {
            info!(
                "Frame [{}/{}] t = {:.2} | Leader at {} | Mobile: {} | Frame Time: {:6.2} ms | Elapsed: {:.2} s",
                frame,
                max_frames,
                model_time,
                sim.state().leader_position(),
                sim.state().free_count(),
                frame_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = now;
        } else {
            trace!(
                "Frame [{}/{}] completed in {:.2} ms",
                frame,
                max_frames,
                frame_duration.as_secs_f64() * 1000.0
            );
        }

        if stop {
            info!("Interface left the canvas at t = {:.2}; stopping.", model_time);
            break;
        }
        if !frame_delay.is_zero() {
            std::thread::sleep(frame_delay);
        }
    }

    if !sim.can_be_stopped() {
        warn!("Run ended before the interface left the canvas.");
    }
    info!(
        "Simulation finished in {:.3} seconds after {} frames.",
        start_time.elapsed().as_secs_f64(),
        sim.frame()
    );

    // --- Save Recorded Data ---
    let base = &config.output.base_filename;
    if config.output.save_stats {
        let format = OutputFormat::from_name(config.output.format.as_deref());
        if let Err(e) = save_snapshots(sim.get_recorded_snapshots(), base, format) {
            error!("Error saving snapshots: {:#}", e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if config.output.save_positions {
        save_final_positions(sim.state().positions(), base)?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
