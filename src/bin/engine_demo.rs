//! Demo/wiring binary: drives the engine with a synthetic frame source and
//! a null backend so the pipeline can be exercised without a microphone or
//! a real speech service. Installs `env_logger`, the way the teacher's own
//! binary entrypoint sets up logging before doing anything else.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use speechbus::audio::SyntheticFrameSource;
use speechbus::config::{ConsumerConfig, EngineConfig};
use speechbus::transcription::{NullBackend, Stdout};
use speechbus::Engine;

#[derive(Parser, Debug)]
#[command(name = "engine_demo", version, about = "Drives the transcription engine with a synthetic audio source")]
struct Args {
    /// Raw little-endian 16-bit mono PCM file. If omitted, generates silence.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Duration of generated silence, in seconds, when --input is omitted.
    #[arg(long, default_value_t = 20.0)]
    duration_s: f64,

    #[arg(long, default_value_t = 16_000)]
    sample_rate_hz: u32,

    #[arg(long, default_value_t = 1024)]
    frame_samples: usize,

    #[arg(long, default_value_t = 2.0)]
    realtime_window_s: f64,

    #[arg(long, default_value_t = 10.0)]
    batch_window_s: f64,

    #[arg(long, default_value_t = 4)]
    max_workers: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pcm = match &args.input {
        Some(path) => fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let samples = (args.sample_rate_hz as f64 * args.duration_s) as usize;
            vec![0u8; samples * 2]
        }
    };
    info!("loaded {} bytes of PCM", pcm.len());

    let mut config = EngineConfig::default();
    config.audio.sample_rate_hz = args.sample_rate_hz;
    config.audio.frame_samples = args.frame_samples;
    config.consumers.insert(
        "realtime".to_string(),
        ConsumerConfig {
            window_seconds: args.realtime_window_s,
            max_workers: args.max_workers,
            ..ConsumerConfig::default()
        },
    );
    config.consumers.insert(
        "batch".to_string(),
        ConsumerConfig {
            window_seconds: args.batch_window_s,
            max_workers: args.max_workers,
            ..ConsumerConfig::default()
        },
    );

    let engine = Engine::new(config);
    engine.add_consumer("realtime", Arc::new(NullBackend::new("null-realtime")))?;
    engine.add_consumer("batch", Arc::new(NullBackend::new("null-batch")))?;
    engine.add_aggregator("realtime", Arc::new(Stdout))?;
    engine.add_aggregator("batch", Arc::new(Stdout))?;

    let source = Box::new(SyntheticFrameSource::new(
        pcm,
        args.sample_rate_hz,
        1,
        args.frame_samples,
        "demo",
    ));
    engine.run_source_to_completion(source);

    let clean = engine.shutdown(Duration::from_secs(30));
    if !clean {
        info!("shutdown completed with stragglers; see warnings above");
    }
    Ok(())
}
