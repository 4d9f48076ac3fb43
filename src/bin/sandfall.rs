//! Sandfall - headless demo runner
//!
//! Runs the demo scene for a number of frames and logs what the world did.
//!
//! ```text
//! sandfall [--cpu] [--frames N] [--seed N] [config.json]
//! ```
//!
//! The GPU backend is used when an adapter is available; otherwise, or with
//! `--cpu`, the host emulation backend runs the same kernels.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use sandfall_engine::{
    CpuWorld, DemoDriver, GpuContext, GpuContextConfig, GpuWorld, Simulation, WorldConfig,
    WorldError, WorldResult,
};

const FRAME_DELTA: f32 = 1.0 / 60.0;

struct Args {
    cpu: bool,
    frames: u64,
    seed: u32,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        cpu: false,
        frames: 600,
        seed: 1,
        config: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--cpu" => args.cpu = true,
            "--frames" => {
                let value = iter.next().ok_or("--frames needs a value")?;
                args.frames = value
                    .parse()
                    .map_err(|_| format!("invalid frame count '{value}'"))?;
            }
            "--seed" => {
                let value = iter.next().ok_or("--seed needs a value")?;
                args.seed = value
                    .parse()
                    .map_err(|_| format!("invalid seed '{value}'"))?;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
            path => args.config = Some(PathBuf::from(path)),
        }
    }
    Ok(args)
}

/// GPU world if an adapter exists, emulation otherwise.
fn create_world(config: WorldConfig, force_cpu: bool) -> WorldResult<Box<dyn Simulation>> {
    if !force_cpu {
        match GpuContext::new(GpuContextConfig::default()) {
            Ok(context) => return Ok(Box::new(GpuWorld::new(context, config)?)),
            Err(WorldError::AdapterUnavailable(reason)) => {
                log::warn!("No GPU adapter ({reason}), falling back to host emulation");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Box::new(CpuWorld::new(config)?))
}

fn run(args: Args) -> WorldResult<()> {
    let config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };

    let mut demo = DemoDriver::new(&config, args.seed);
    let mut world = create_world(config, args.cpu)?;

    let start = Instant::now();
    let report_every = (args.frames / 10).max(1);
    for _ in 0..args.frames {
        demo.drive(world.as_mut(), FRAME_DELTA)?;
        if world.frame_index() % report_every == 0 {
            log::info!(
                "frame {} / {} ({:.1} s elapsed)",
                world.frame_index(),
                args.frames,
                start.elapsed().as_secs_f32()
            );
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    log::info!(
        "Ran {} frames in {:.2} s ({:.1} frames/s)",
        world.frame_index(),
        elapsed,
        world.frame_index() as f64 / elapsed.max(f64::EPSILON)
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("===========================================");
    println!("   Sandfall - headless demo");
    println!("===========================================");

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            log::error!("{message}");
            eprintln!("usage: sandfall [--cpu] [--frames N] [--seed N] [config.json]");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
