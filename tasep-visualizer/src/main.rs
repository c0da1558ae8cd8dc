use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashMap;
use env_logger::Builder;
use image::RgbaImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use minimp4::Mp4Muxer;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::YUVBuffer;
use rayon::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tasep_common::{ModelParams, SimulationConfig, Snapshot};
use tasep_engine::output::load_snapshot_file;
use tasep_engine::{project, ParticleState};

mod render;

use render::{draw_frame, even_extent, rgb_to_yuv420, Theme};

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about = "Renders recorded TASEP snapshots to video", long_about = None)]
struct Args {
    /// Input snapshot file path (.bin)
    #[arg(short, long)]
    input: PathBuf,

    /// Configuration the snapshots were recorded with
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Output video file path (.mp4)
    #[arg(short, long, default_value = "tasep_video.mp4")]
    output: PathBuf,

    /// Also write every frame as a PNG into this directory
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Frames per second for the output video
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Pixels per canvas unit
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Background colour name
    #[arg(long, default_value = "white")]
    bg_color: String,
}

/// Pixel layout shared by every frame.
struct Layout {
    width: u32,
    height: u32,
    scale: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting TASEP visualizer...");
    if !(args.scale.is_finite() && args.scale > 0.0) {
        anyhow::bail!("scale must be a positive number, got {}", args.scale);
    }
    if args.fps == 0 {
        anyhow::bail!("fps must be greater than 0.");
    }

    let config = SimulationConfig::load(&args.config)?;
    let params = config.model_params()?;
    let layout = Layout {
        width: even_extent(params.canvas().width, args.scale),
        height: even_extent(params.canvas().height, args.scale),
        scale: args.scale,
    };
    info!(
        "{} data, jump rate {}, angle {}; video {}x{} px at {} fps",
        params.initial_data(),
        params.jump_rate(),
        params.angle(),
        layout.width,
        layout.height,
        args.fps
    );

    let snapshots = load_snapshot_file(&args.input)?;
    info!("Found {} snapshots in {}", snapshots.len(), args.input.display());
    if snapshots.is_empty() {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }

    let theme = Theme::default().with_background(&args.bg_color);
    let start_time = Instant::now();
    let frames = render_frames(&snapshots, &params, &layout, &theme)?;
    if frames.is_empty() {
        warn!("No snapshot carries particle positions; record with save_positions_in_snapshot = true.");
        return Ok(());
    }

    if let Some(dir) = &args.frames_dir {
        write_png_frames(&frames, dir)?;
    }
    let frame_count = encode_video(&frames, &layout, args.fps, &args.output, &params)?;

    let duration = start_time.elapsed();
    info!(
        "Video generation completed in {:.2?} ({:.1} frames per second)",
        duration,
        frame_count as f64 / duration.as_secs_f64()
    );
    info!("Output saved to: {}", args.output.display());
    Ok(())
}

fn progress_bar(len: usize, what: &str, colors: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    let template = format!(
        "[{{elapsed_precise}}] [{{bar:40.{}}}] {{pos}}/{{len}} {} ({{percent}}%) [{{eta}}]",
        colors, what
    );
    bar.set_style(ProgressStyle::default_bar().template(&template)?.progress_chars("#>-"));
    Ok(bar)
}

/// Re-projects and rasterizes every snapshot that carries positions, in parallel.
/// Returns the images in snapshot order.
fn render_frames(snapshots: &[Snapshot], params: &ModelParams, layout: &Layout, theme: &Theme) -> Result<Vec<RgbaImage>> {
    let progress = progress_bar(snapshots.len(), "frames", "cyan/blue")?;
    let frames_map = DashMap::new();

    snapshots.par_iter().enumerate().for_each(|(index, snapshot)| {
        match render_snapshot(snapshot, params, layout, theme) {
            Ok(Some(image)) => {
                frames_map.insert(index, image);
            }
            Ok(None) => {}
            Err(e) => error!("Skipping snapshot {} (frame {}): {:#}", index, snapshot.frame, e),
        }
        progress.inc(1);
    });
    progress.finish_with_message("Rendered");

    let skipped = snapshots.len() - frames_map.len();
    if skipped > 0 {
        warn!("{} of {} snapshots could not be drawn.", skipped, snapshots.len());
    }

    let mut frames: Vec<(usize, RgbaImage)> = frames_map.into_iter().collect();
    frames.sort_unstable_by_key(|(index, _)| *index);
    Ok(frames.into_iter().map(|(_, image)| image).collect())
}

fn render_snapshot(snapshot: &Snapshot, params: &ModelParams, layout: &Layout, theme: &Theme) -> Result<Option<RgbaImage>> {
    let Some(positions) = &snapshot.positions else {
        return Ok(None);
    };
    let state = ParticleState::from_positions(positions.clone())
        .context("Recorded positions are not a valid particle state")?;
    let geometry = project(&state, snapshot.model_time, params);
    Ok(Some(draw_frame(&geometry, layout.width, layout.height, layout.scale, theme)))
}

fn write_png_frames(frames: &[RgbaImage], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create frames directory {}", dir.display()))?;
    frames
        .par_iter()
        .enumerate()
        .try_for_each(|(index, image)| {
            let path = dir.join(format!("frame_{:05}.png", index));
            image
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))
        })?;
    info!("Wrote {} PNG frames to {}", frames.len(), dir.display());
    Ok(())
}

/// Encodes the frames to H.264 and wraps the stream in an MP4 container.
fn encode_video(frames: &[RgbaImage], layout: &Layout, fps: u32, output: &Path, params: &ModelParams) -> Result<usize> {
    let mut encoder = Encoder::with_api_config(
        openh264::OpenH264API::from_source(),
        EncoderConfig::new()
            .max_frame_rate(FrameRate::from_hz(fps as f32))
            .bitrate(BitRate::from_bps(5_000_000)),
    )
    .context("Failed to initialize H.264 encoder")?;

    let progress = progress_bar(frames.len(), "encoded", "green/blue")?;
    let mut h264_data = Vec::new();
    let mut frame_count = 0;

    const ENCODE_BATCH_SIZE: usize = 30;
    for batch in frames.chunks(ENCODE_BATCH_SIZE) {
        // Colour conversion in parallel, encoding in order.
        let yuv_frames: Vec<Vec<u8>> = batch.par_iter().map(rgb_to_yuv420).collect();
        for yuv in yuv_frames {
            let source = YUVBuffer::from_vec(yuv, layout.width as usize, layout.height as usize);
            match encoder.encode(&source) {
                Ok(bitstream) => {
                    bitstream.write_vec(&mut h264_data);
                    frame_count += 1;
                }
                Err(e) => error!("Error encoding frame {}: {}", frame_count, e),
            }
            progress.inc(1);
        }
    }
    progress.finish_with_message(format!("Encoded {} frames", frame_count));

    let mut video_buffer = Cursor::new(Vec::new());
    {
        let mut muxer = Mp4Muxer::new(&mut video_buffer);
        let description = format!("TASEP {} data, jump rate {}", params.initial_data(), params.jump_rate());
        muxer.init_video(layout.width as i32, layout.height as i32, false, &description);
        muxer.write_video(&h264_data);
        muxer.close();
    }
    fs::write(output, video_buffer.into_inner())
        .with_context(|| format!("Failed to write video file to {}", output.display()))?;
    Ok(frame_count)
}
