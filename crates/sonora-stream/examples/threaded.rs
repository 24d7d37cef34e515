//! Feed the pipeline from a producer thread.
//!
//! A "device" thread generates farend and nearend audio in 10 ms chunks and
//! hands them over through lock-free ring buffers. The main thread owns the
//! pipeline context and is the only one that touches it.
//!
//! ```sh
//! RUST_LOG=sonora_stream=debug cargo run -p sonora-stream --features examples --example threaded
//! ```

use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing_subscriber::EnvFilter;

use sonora_stream::engine::bypass::BypassEngines;
use sonora_stream::{Config, PipelineContext};

#[derive(Parser, Debug)]
#[command(about = "Stream synthetic audio through sonora-stream from another thread")]
struct Args {
    /// Sample rate in Hz.
    #[arg(short, long, default_value_t = 48_000)]
    rate: u32,

    /// Interleaved channels.
    #[arg(short, long, default_value_t = 2)]
    channels: usize,

    /// Number of 10 ms chunks to generate.
    #[arg(long, default_value_t = 500)]
    chunks: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let chunk = (args.rate as usize / 100) * args.channels;

    let (mut farend_tx, mut farend_rx) = HeapRb::<i16>::new(chunk * 16).split();
    let (mut nearend_tx, mut nearend_rx) = HeapRb::<i16>::new(chunk * 16).split();
    let done = Arc::new(AtomicBool::new(false));

    let producer = thread::spawn({
        let done = done.clone();
        let (rate, channels, chunks) = (args.rate as f32, args.channels, args.chunks);
        move || {
            let mut n = 0usize;
            let mut farend = vec![0i16; chunk];
            let mut nearend = vec![0i16; chunk];
            for _ in 0..chunks {
                for (i, (far, near)) in farend
                    .chunks_exact_mut(channels)
                    .zip(nearend.chunks_exact_mut(channels))
                    .enumerate()
                {
                    let t = (n + i) as f32 / rate;
                    let music = (t * 330.0 * TAU).sin() * 6000.0;
                    let voice = (t * 900.0 * TAU).sin() * 3000.0;
                    far.fill(music as i16);
                    near.fill((music * 0.25 + voice) as i16);
                }
                n += chunk / channels;

                // Wait for room instead of dropping audio.
                while farend_tx.vacant_len() < chunk || nearend_tx.vacant_len() < chunk {
                    thread::sleep(Duration::from_millis(1));
                }
                farend_tx.push_slice(&farend);
                nearend_tx.push_slice(&nearend);
            }
            done.store(true, Ordering::Release);
        }
    });

    let mut ctx = PipelineContext::<f32>::builder(BypassEngines::new())
        .config(Config::default())
        .build();
    ctx.init(args.channels, args.rate, args.rate, 50)?;
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let mut samples = vec![0i16; chunk];
    let mut bytes = vec![0u8; chunk * 2];
    let mut out = vec![0u8; ctx.per_frame_bytes() * 4];
    let mut total_out = 0usize;

    loop {
        let finished = done.load(Ordering::Acquire);
        if farend_rx.occupied_len() < chunk || nearend_rx.occupied_len() < chunk {
            if finished {
                break;
            }
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        farend_rx.pop_slice(&mut samples);
        encode(&samples, &mut bytes);
        ctx.push_farend(&bytes)?;

        nearend_rx.pop_slice(&mut samples);
        encode(&samples, &mut bytes);
        ctx.push_nearend(&bytes)?;

        loop {
            let n = ctx.try_process(&mut out)?;
            if n == 0 {
                break;
            }
            total_out += n;
        }
    }

    producer
        .join()
        .map_err(|_| anyhow!("producer thread panicked"))?;

    let stats = ctx.statistics();
    println!(
        "Processed {} frames, {} bytes out, {} bytes dropped",
        stats.frames_processed,
        total_out,
        stats.dropped_farend_bytes + stats.dropped_nearend_bytes
    );
    Ok(())
}

fn encode(samples: &[i16], bytes: &mut [u8]) {
    for (dst, s) in bytes.chunks_exact_mut(2).zip(samples) {
        dst.copy_from_slice(&s.to_ne_bytes());
    }
}
