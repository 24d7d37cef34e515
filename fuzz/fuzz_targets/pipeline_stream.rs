#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sonora_stream::config::{MaxProcessingRate, Pipeline};
use sonora_stream::engine::bypass::BypassEngines;
use sonora_stream::{Config, PipelineContext, Stage};

#[derive(Debug, Arbitrary)]
enum Op {
    PushFarend(Vec<u8>),
    PushNearend(Vec<u8>),
    TryProcess(u16),
    FarendReady(bool),
    NearendReady(bool),
    FarendInfo { rate_idx: u8, channels: u8 },
    NearendInfo { rate_idx: u8, channels: u8 },
    Delay(u16),
    Enable(u8, bool),
    Flush,
    Reset,
    Fini,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Index into `RATES`.
    rate_idx: u8,
    /// Clamped to 1-2.
    channels: u8,
    mobile: bool,
    ops: Vec<Op>,
}

const RATES: [u32; 6] = [8000, 16000, 22050, 32000, 44100, 48000];

fn rate(idx: u8) -> u32 {
    RATES[usize::from(idx) % RATES.len()]
}

fn stage(idx: u8) -> Stage {
    Stage::ALL[usize::from(idx) % Stage::ALL.len()]
}

fuzz_target!(|input: FuzzInput| {
    let rate_hz = rate(input.rate_idx);
    let channels = usize::from(input.channels % 2) + 1;
    let config = Config {
        pipeline: Pipeline {
            maximum_processing_rate: if input.mobile {
                MaxProcessingRate::Rate16kHz
            } else {
                MaxProcessingRate::Rate48kHz
            },
            ring_buffer_size: 1 << 16,
        },
        ..Default::default()
    };
    let mut ctx = PipelineContext::<i16>::builder(BypassEngines::new())
        .config(config)
        .build();
    ctx.init(channels, rate_hz, rate_hz, 0).unwrap();

    let mut out = Vec::new();
    for op in input.ops {
        match op {
            Op::PushFarend(pcm) => {
                if let Ok(n) = ctx.push_farend(&pcm) {
                    assert!(n == 0 || n == pcm.len());
                }
            }
            Op::PushNearend(pcm) => {
                if let Ok(n) = ctx.push_nearend(&pcm) {
                    assert!(n == 0 || n == pcm.len());
                }
            }
            Op::TryProcess(len) => {
                out.resize(usize::from(len), 0);
                if let Ok(n) = ctx.try_process(&mut out) {
                    assert!(n <= out.len());
                }
            }
            Op::FarendReady(ready) => ctx.set_farend_ready(ready),
            Op::NearendReady(ready) => ctx.set_nearend_ready(ready),
            Op::FarendInfo { rate_idx, channels } => {
                let _ = ctx.set_farend_info(rate(rate_idx), usize::from(channels % 3));
            }
            Op::NearendInfo { rate_idx, channels } => {
                let _ = ctx.set_nearend_info(rate(rate_idx), usize::from(channels % 3));
            }
            Op::Delay(ms) => {
                let _ = ctx.set_aec_delay_ms(ms);
            }
            Op::Enable(idx, enabled) => ctx.set_stage_enabled(stage(idx), enabled),
            Op::Flush => ctx.flush(),
            Op::Reset => {
                let _ = ctx.reset();
            }
            Op::Fini => {
                ctx.fini();
                assert_eq!(ctx.per_frame_bytes(), 0);
                ctx.init(channels, rate_hz, rate_hz, 0).unwrap();
            }
        }
    }
});
