//! Run recorded farend and nearend PCM files through the pipeline.
//!
//! Inputs are raw native-endian S16 PCM (or WAV files, detected by
//! extension), interleaved with `--channels` channels at `--rate` Hz. The
//! processed nearend is written as a 16-bit WAV file.
//!
//! ```sh
//! cargo run -p sonora-stream --features examples --example process_files -- \
//!     --farend farend.pcm --nearend nearend.pcm --output out.wav
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing_subscriber::EnvFilter;

use sonora_stream::engine::bypass::BypassEngines;
use sonora_stream::{Config, PipelineContext, Sample};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Fixed-point (`i16`) bands.
    Fixed,
    /// Floating-point (`f32`) bands.
    Float,
}

#[derive(Parser, Debug)]
#[command(about = "Process farend/nearend PCM files through sonora-stream")]
struct Args {
    /// Interleaved channels in both inputs.
    #[arg(short, long, default_value_t = 2)]
    channels: usize,

    /// Sample rate of both inputs in Hz.
    #[arg(short, long, default_value_t = 48_000)]
    rate: u32,

    /// Reported echo path delay in milliseconds.
    #[arg(short, long, default_value_t = 100)]
    delay: u16,

    /// Farend (loudspeaker) recording.
    #[arg(long, default_value = "farend.pcm")]
    farend: PathBuf,

    /// Nearend (microphone) recording.
    #[arg(long, default_value = "nearend.pcm")]
    nearend: PathBuf,

    /// Processed output WAV.
    #[arg(short, long, default_value = "out.wav")]
    output: PathBuf,

    /// Band representation handed to the engines.
    #[arg(long, value_enum, default_value_t = Format::Fixed)]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    println!(
        "channels {}, rate {}, aec delay {} ms, {:?} bands",
        args.channels, args.rate, args.delay, args.format
    );

    let farend = read_pcm(&args.farend)?;
    let nearend = read_pcm(&args.nearend)?;

    let processed = match args.format {
        Format::Fixed => run::<i16>(&args, &farend, &nearend)?,
        Format::Float => run::<f32>(&args, &farend, &nearend)?,
    };

    let spec = WavSpec {
        channels: u16::try_from(args.channels).context("channel count out of range")?,
        sample_rate: args.rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    for pair in processed.chunks_exact(2) {
        writer.write_sample(i16::from_ne_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()?;

    println!(
        "Wrote {} ({} bytes of audio)",
        args.output.display(),
        processed.len()
    );
    Ok(())
}

fn run<S: Sample>(args: &Args, farend: &[u8], nearend: &[u8]) -> Result<Vec<u8>> {
    let mut ctx = PipelineContext::<S>::builder(BypassEngines::new())
        .config(Config::default())
        .build();
    ctx.init(args.channels, args.rate, args.rate, args.delay)
        .context("failed to init pipeline")?;
    ctx.set_nearend_info(args.rate, args.channels)?;
    ctx.set_nearend_ready(true);
    ctx.set_farend_info(args.rate, args.channels)?;
    ctx.set_farend_ready(true);

    let chunk_bytes = (args.rate as usize / 100) * args.channels * 2;
    let frame_bytes = ctx.per_frame_bytes();
    ensure!(frame_bytes > 0, "pipeline reported an empty frame");

    let mut processed = Vec::with_capacity(nearend.len());
    let mut out = vec![0u8; frame_bytes];
    let mut drain = |ctx: &mut PipelineContext<S>, processed: &mut Vec<u8>| -> Result<()> {
        loop {
            let n = ctx.try_process(&mut out)?;
            if n == 0 {
                return Ok(());
            }
            processed.extend_from_slice(&out[..n]);
        }
    };

    for (far, near) in farend.chunks(chunk_bytes).zip(nearend.chunks(chunk_bytes)) {
        ctx.push_farend(far)?;
        ctx.push_nearend(near)?;
        drain(&mut ctx, &mut processed)?;
    }
    drain(&mut ctx, &mut processed)?;

    let stats = ctx.statistics();
    println!(
        "{} frames processed, {} with echo cancellation, {} farend underrun bytes",
        stats.frames_processed, stats.aec_frames, stats.farend_underrun_bytes
    );

    ctx.set_nearend_ready(false);
    ctx.set_farend_ready(false);
    ctx.release();
    Ok(processed)
}

/// Read a raw PCM file, or the samples of a WAV file, as native-endian S16
/// bytes.
fn read_pcm(path: &Path) -> Result<Vec<u8>> {
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return fs::read(path).with_context(|| format!("failed to read {}", path.display()));
    }

    let reader =
        WavReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(samples.iter().flat_map(|s| s.to_ne_bytes()).collect())
}
