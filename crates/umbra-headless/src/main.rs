mod metrics;
mod snapshots;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use metrics::{FrameSample, MetricsWriter};
use snapshots::SnapshotWriter;
use umbra_core::{
    trail_stats, CpuEvaluator, Evaluator, FrameCompositor, FrameStatus, GpuEvaluator, RunConfig,
};

#[derive(Parser)]
#[command(name = "umbra-headless")]
#[command(about = "Headless CLI runner for Umbra scenes, fractals and slime simulations")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Output directory for results
    #[arg(short, long, value_name = "DIR")]
    out: PathBuf,

    /// Number of frames to produce
    #[arg(short, long, default_value_t = 120)]
    frames: u64,

    /// Fixed time step per frame, in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Run the kernels on the GPU instead of the CPU reference evaluator
    #[arg(long)]
    gpu: bool,

    /// Write a PNG (and agent CSV in slime mode) every N frames; 0 disables
    #[arg(long, value_name = "N", default_value_t = 30)]
    snapshot_every: u64,

    /// Sample metrics every N frames
    #[arg(long, value_name = "N", default_value_t = 10)]
    metrics_every: u64,

    /// Enable strict mode (fail on scene diagnostics or skipped frames)
    #[arg(long)]
    strict: bool,
}

fn make_evaluator(gpu: bool, size: [u32; 2]) -> anyhow::Result<Box<dyn Evaluator>> {
    if gpu {
        let evaluator = GpuEvaluator::headless(size).context("create GPU evaluator")?;
        log::info!("{}", evaluator.gpu().info());
        Ok(Box::new(evaluator))
    } else {
        log::info!("Using the CPU reference evaluator");
        Ok(Box::new(CpuEvaluator::new(size)))
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.frames == 0 {
        anyhow::bail!("Frame count must be greater than 0.");
    }
    if !(cli.dt > 0.0 && cli.dt.is_finite()) {
        anyhow::bail!("Time step (dt) must be positive.");
    }
    if cli.metrics_every == 0 {
        anyhow::bail!("Metrics interval must be greater than 0.");
    }

    log::info!("Loading configuration from {}", cli.config.display());
    let config = RunConfig::from_path(&cli.config)?;

    let (registry, diagnostics) = config.build_registry();
    if cli.strict && !diagnostics.is_empty() {
        anyhow::bail!(
            "Scene description has {} problem(s), first: {}",
            diagnostics.len(),
            diagnostics[0]
        );
    }

    std::fs::create_dir_all(&cli.out).with_context(|| format!("create {}", cli.out.display()))?;

    let size = config.render.surface.size;
    let mut evaluator = make_evaluator(cli.gpu, size)?;
    let mut compositor = FrameCompositor::new(config.render, registry, evaluator.as_mut())?;

    let mut metrics_writer = MetricsWriter::new(&cli.out)?;
    let snapshot_writer = SnapshotWriter::new(&cli.out)?;

    log::info!("Running {:?} mode for {} frames (dt {:.4}s)", compositor.config().mode, cli.frames, cli.dt);
    let start_time = Instant::now();

    for frame in 1..=cli.frames {
        let frame_start = Instant::now();
        let report = compositor.advance_frame(evaluator.as_mut(), cli.dt)?;
        let frame_time = frame_start.elapsed();

        if report.status == FrameStatus::Retained && cli.strict {
            anyhow::bail!("Frame {} was skipped after an evaluator error", report.frame);
        }

        let last = frame == cli.frames;
        let snapshot = cli.snapshot_every > 0 && (frame % cli.snapshot_every == 0 || last);
        let sample = frame == 1 || frame % cli.metrics_every == 0 || last;
        if !snapshot && !sample {
            continue;
        }

        let image = evaluator.read_output()?;
        if snapshot {
            snapshot_writer.write_frame(frame, &image)?;
            if let Some(stepper) = compositor.stepper() {
                snapshot_writer.write_agents(frame, stepper.agents().agents())?;
            }
            log::info!("Snapshot written for frame {}", frame);
        }

        if sample {
            let trail = match compositor.stepper() {
                Some(stepper) => Some(trail_stats(&stepper.read_trail(evaluator.as_mut())?)),
                None => None,
            };
            let agents = compositor.stepper().map(|s| &s.agents().stats);
            metrics_writer.write_frame(&FrameSample {
                report: &report,
                mean_luminance: image.mean_luminance(),
                trail,
                agents,
                frame_time,
            })?;

            log::info!(
                "Frame {}: {:?}, luminance={:.3}, objects={}, agents={}, time={:?}",
                frame,
                report.status,
                image.mean_luminance(),
                report.objects,
                report.agents,
                frame_time
            );
        }
    }

    let retained = compositor.retained_frames();
    compositor.teardown(evaluator.as_mut());

    println!(
        "Produced {} frames in {:?} ({} retained, {} metric rows)",
        cli.frames,
        start_time.elapsed(),
        retained,
        metrics_writer.rows()
    );
    if metrics_writer.retained() > 0 {
        log::warn!("{} sampled frames kept a stale image", metrics_writer.retained());
    }
    println!("Results written to {}", cli.out.display());

    Ok(())
}
