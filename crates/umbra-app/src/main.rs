//! Umbra Interactive App
//!
//! Window front end for the frame compositor, rendering on the GPU evaluator.

mod renderer;
mod viewer;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use umbra_core::RunConfig;
use umbra_params::RenderMode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Scene,
    Fractal,
    Slime,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Scene => RenderMode::Scene,
            ModeArg::Fractal => RenderMode::Fractal,
            ModeArg::Slime => RenderMode::Slime,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "configs/scene.yaml")]
    config: PathBuf,

    /// Override the configured render mode
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    log::info!("Loading configuration from {}", cli.config.display());
    let mut config = RunConfig::from_path(&cli.config)?;
    if let Some(mode) = cli.mode {
        config.render.mode = mode.into();
    }

    let (registry, diagnostics) = config.build_registry();
    if !diagnostics.is_empty() {
        log::warn!("Scene description has {} problem(s); offending nodes were left out", diagnostics.len());
    }

    println!("Starting Umbra viewer");
    println!("Mode: {:?}", config.render.mode);
    println!("Scene objects: {}", registry.len());
    if config.render.mode == RenderMode::Slime {
        println!("Agents: {}", config.render.slime.agent_count);
        println!("Seed: {}", config.render.slime.seed);
    }

    pollster::block_on(viewer::run_viewer(config.render, registry))?;

    Ok(())
}
