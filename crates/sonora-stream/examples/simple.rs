//! Minimal streaming demo.
//!
//! Pushes one second of synthetic farend and nearend audio through a 16 kHz
//! mono pipeline with pass-through engines, and checks that the output
//! matches the nearend input.
//!
//! ```sh
//! cargo run -p sonora-stream --example simple
//! ```

use std::f32::consts::TAU;

use sonora_stream::engine::bypass::BypassEngines;
use sonora_stream::{Config, PipelineContext};

const SAMPLE_RATE: u32 = 16_000;
const CHANNELS: usize = 1;
const SECONDS: usize = 1;

fn main() {
    let mut ctx = PipelineContext::<i16>::builder(BypassEngines::new())
        .config(Config::default())
        .build();
    ctx.init(CHANNELS, SAMPLE_RATE, SAMPLE_RATE, 0).unwrap();
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let frame_bytes = ctx.per_frame_bytes();
    let (farend, nearend) = synthetic_pcm(SAMPLE_RATE as usize * SECONDS);

    for (far, near) in farend
        .chunks(frame_bytes)
        .zip(nearend.chunks(frame_bytes))
    {
        ctx.push_farend(far).unwrap();
        ctx.push_nearend(near).unwrap();
    }

    let mut processed = Vec::with_capacity(nearend.len());
    let mut out = vec![0u8; frame_bytes];
    loop {
        let n = ctx.try_process(&mut out).unwrap();
        if n == 0 {
            break;
        }
        processed.extend_from_slice(&out[..n]);
    }

    assert_eq!(
        processed, nearend,
        "pass-through engines should not modify the nearend signal"
    );

    let stats = ctx.statistics();
    println!(
        "Processed {} frames ({} with echo cancellation), {} bytes out.",
        stats.frames_processed,
        stats.aec_frames,
        processed.len()
    );
}

/// A 440 Hz farend tone and a nearend made of its attenuated echo plus a
/// 1 kHz talker, both as native-endian S16 bytes.
fn synthetic_pcm(num_samples: usize) -> (Vec<u8>, Vec<u8>) {
    let rate = SAMPLE_RATE as f32;
    let echo_delay = 40;
    let farend: Vec<i16> = (0..num_samples)
        .map(|i| ((i as f32 * 440.0 / rate * TAU).sin() * 8000.0) as i16)
        .collect();
    let nearend: Vec<i16> = (0..num_samples)
        .map(|i| {
            let echo = if i >= echo_delay {
                f32::from(farend[i - echo_delay]) * 0.3
            } else {
                0.0
            };
            let talker = (i as f32 * 1000.0 / rate * TAU).sin() * 4000.0;
            (echo + talker) as i16
        })
        .collect();

    let to_bytes = |samples: &[i16]| -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
    };
    (to_bytes(&farend), to_bytes(&nearend))
}
