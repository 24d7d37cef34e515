//! End-to-end tests of the streaming pipeline against instrumented engines.

use std::f32::consts::TAU;
use std::iter;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use proptest::collection::vec as pvec;
use proptest::prelude::*;
use sonora_common_audio::channel_buffer::{Bands, BandsMut};
use sonora_stream::config::{self, GainControlMode, NoiseSuppressionLevel, Pipeline};
use sonora_stream::engine::{
    EchoCanceller, EngineError, EngineFactory, GainController, GainOutcome, NoiseSuppressor,
};
use sonora_stream::{Config, Error, PipelineContext, PipelineStats, Sample, Stage};
use test_strategy::proptest;

/// Switches and counters shared between a test and its engines.
#[derive(Debug, Default)]
struct Switches {
    fail_aec_init: AtomicBool,
    fail_aec_config: AtomicBool,
    fail_aec_process: AtomicBool,
    zero_aec_output: AtomicBool,
    fail_agc_process: AtomicBool,
    aec_calls: AtomicUsize,
    ns_calls: AtomicUsize,
    agc_calls: AtomicUsize,
    last_delay_ms: AtomicUsize,
    created: AtomicUsize,
    dropped: AtomicUsize,
}

impl Switches {
    fn engine_calls(&self) -> usize {
        self.aec_calls.load(Ordering::SeqCst)
            + self.ns_calls.load(Ordering::SeqCst)
            + self.agc_calls.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
struct MockEngines {
    switches: Arc<Switches>,
}

#[derive(Debug)]
struct Mock<S> {
    switches: Arc<Switches>,
    _sample: PhantomData<S>,
}

impl<S> Mock<S> {
    fn new(switches: &Arc<Switches>) -> Self {
        switches.created.fetch_add(1, Ordering::SeqCst);
        Self {
            switches: switches.clone(),
            _sample: PhantomData,
        }
    }
}

impl<S> Drop for Mock<S> {
    fn drop(&mut self) {
        self.switches.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: Sample> EngineFactory<S> for MockEngines {
    fn echo_canceller(&mut self) -> Result<Box<dyn EchoCanceller<S>>, EngineError> {
        Ok(Box::new(Mock::<S>::new(&self.switches)))
    }

    fn noise_suppressor(&mut self) -> Result<Box<dyn NoiseSuppressor<S>>, EngineError> {
        Ok(Box::new(Mock::<S>::new(&self.switches)))
    }

    fn gain_controller(&mut self) -> Result<Box<dyn GainController>, EngineError> {
        Ok(Box::new(Mock::<i16>::new(&self.switches)))
    }
}

impl<S: Sample> EchoCanceller<S> for Mock<S> {
    fn init(&mut self, _sample_rate_hz: u32) -> Result<(), EngineError> {
        if self.switches.fail_aec_init.load(Ordering::SeqCst) {
            return Err(EngineError::Init { code: -1 });
        }
        Ok(())
    }

    fn set_config(&mut self, _config: &config::EchoCanceller) -> Result<(), EngineError> {
        if self.switches.fail_aec_config.load(Ordering::SeqCst) {
            return Err(EngineError::Config { code: -3 });
        }
        Ok(())
    }

    fn buffer_farend(&mut self, _farend: &[S]) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(
        &mut self,
        nearend: Bands<'_, S>,
        mut out: BandsMut<'_, S>,
        delay_ms: u16,
    ) -> Result<(), EngineError> {
        self.switches.aec_calls.fetch_add(1, Ordering::SeqCst);
        self.switches
            .last_delay_ms
            .store(usize::from(delay_ms), Ordering::SeqCst);
        if self.switches.fail_aec_process.load(Ordering::SeqCst) {
            return Err(EngineError::Process { code: -2 });
        }
        if self.switches.zero_aec_output.load(Ordering::SeqCst) {
            out.as_mut_slice().fill(S::default());
        } else {
            out.copy_from(nearend);
        }
        Ok(())
    }
}

impl<S: Sample> NoiseSuppressor<S> for Mock<S> {
    fn init(&mut self, _sample_rate_hz: u32) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_policy(&mut self, _level: NoiseSuppressionLevel) -> Result<(), EngineError> {
        Ok(())
    }

    fn analyze(&mut self, _band0: &[S]) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(&mut self, nearend: Bands<'_, S>, mut out: BandsMut<'_, S>) -> Result<(), EngineError> {
        self.switches.ns_calls.fetch_add(1, Ordering::SeqCst);
        out.copy_from(nearend);
        Ok(())
    }
}

impl GainController for Mock<i16> {
    fn init(
        &mut self,
        _min_level: i32,
        _max_level: i32,
        _mode: GainControlMode,
        _sample_rate_hz: u32,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    fn set_config(&mut self, _config: &config::GainControl) -> Result<(), EngineError> {
        Ok(())
    }

    fn add_mic(&mut self, _nearend: Bands<'_, i16>) -> Result<(), EngineError> {
        Ok(())
    }

    fn process(
        &mut self,
        nearend: Bands<'_, i16>,
        mut out: BandsMut<'_, i16>,
        mic_level: i32,
        _stream_has_echo: bool,
    ) -> Result<GainOutcome, EngineError> {
        self.switches.agc_calls.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_agc_process.load(Ordering::SeqCst) {
            out.as_mut_slice().fill(i16::MIN);
            return Err(EngineError::Process { code: -4 });
        }
        out.copy_from(nearend);
        Ok(GainOutcome {
            mic_level: (mic_level + 1).min(255),
            saturation_warning: false,
        })
    }
}

fn pipeline<S: Sample>(channels: usize, rate: u32) -> (PipelineContext<S>, Arc<Switches>) {
    let engines = MockEngines::default();
    let switches = engines.switches.clone();
    let mut ctx = PipelineContext::<S>::builder(engines).build();
    ctx.init(channels, rate, rate, 0).unwrap();
    (ctx, switches)
}

fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
}

fn tone(rate: u32, channels: usize, frames: usize, freq: f32) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let v = (i as f32 * freq / rate as f32 * TAU).sin() * 5000.0;
            iter::repeat_n(v as i16, channels)
        })
        .collect()
}

#[test]
fn silence_streams_through_in_whole_frames() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    let frame_bytes = ctx.per_frame_bytes();
    assert_eq!(frame_bytes, 320);

    let silence = vec![0u8; frame_bytes * 10];
    assert_eq!(ctx.push_farend(&silence).unwrap(), silence.len());
    assert_eq!(ctx.push_nearend(&silence).unwrap(), silence.len());

    let mut out = vec![0xAAu8; frame_bytes * 3];
    let mut total = 0;
    loop {
        let n = ctx.try_process(&mut out).unwrap();
        if n == 0 {
            break;
        }
        assert_eq!(n % frame_bytes, 0);
        assert!(out[..n].iter().all(|&b| b == 0));
        total += n;
    }
    assert_eq!(total, silence.len());

    let stats = ctx.statistics();
    assert_eq!(stats.frames_processed, 10);
    assert_eq!(stats.aec_frames, 10);
    assert_eq!(stats.farend_underrun_bytes, 0);
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 10);
}

#[test]
fn echo_canceller_waits_for_both_directions() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    let nearend = tone(16000, 1, 160, 300.0);
    let farend = vec![0i16; 160];
    let mut out = vec![0i16; 160];

    ctx.set_nearend_ready(true);
    assert!(!ctx.should_run_aec());
    assert_eq!(ctx.push_nearend(&pcm_bytes(&nearend)).unwrap(), 0);

    let written = ctx.do_process(Some(&farend), &nearend, &mut out).unwrap();
    assert_eq!(written, 160);
    assert_eq!(out, nearend);
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 0);

    ctx.set_farend_ready(true);
    assert!(ctx.should_run_aec());
    ctx.do_process(Some(&farend), &nearend, &mut out).unwrap();
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 1);

    // No farend, no echo cancellation.
    ctx.do_process(None, &nearend, &mut out).unwrap();
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn partial_frame_is_rejected_untouched() {
    let (mut ctx, switches) = pipeline::<i16>(2, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let nearend = vec![100i16; 319];
    let mut out = vec![-7i16; 320];
    let err = ctx.do_process(Some(&[0; 320]), &nearend, &mut out).unwrap_err();

    assert!(matches!(
        err,
        Error::InsufficientData {
            available: 319,
            required: 320,
        }
    ));
    assert_eq!(switches.engine_calls(), 0);
    assert!(out.iter().all(|&s| s == -7));
    assert_eq!(ctx.statistics(), PipelineStats {
        mic_level: Some(128),
        ..Default::default()
    });
}

#[test]
fn failed_stage_is_disabled_until_a_good_reset() {
    let engines = MockEngines::default();
    let switches = engines.switches.clone();
    switches.fail_aec_init.store(true, Ordering::SeqCst);

    let mut ctx = PipelineContext::<i16>::builder(engines).build();
    ctx.init(1, 16000, 16000, 0).unwrap();
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    assert!(!ctx.stage_enabled(Stage::EchoCanceller));
    assert!(ctx.stage_enabled(Stage::NoiseSuppression));
    assert!(ctx.stage_enabled(Stage::GainControl));
    assert!(!ctx.should_run_aec());

    // The other stages keep running.
    let nearend = vec![3i16; 160];
    let mut out = vec![0i16; 160];
    ctx.do_process(Some(&[0; 160]), &nearend, &mut out).unwrap();
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 0);
    assert_eq!(switches.ns_calls.load(Ordering::SeqCst), 1);
    assert_eq!(out, nearend);

    switches.fail_aec_init.store(false, Ordering::SeqCst);
    ctx.reset().unwrap();
    assert!(ctx.stage_enabled(Stage::EchoCanceller));
    ctx.do_process(Some(&[0; 160]), &nearend, &mut out).unwrap();
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn rejected_echo_config_disables_the_stage() {
    let (mut ctx, switches) = pipeline::<i16>(2, 16000);
    assert!(ctx.stage_enabled(Stage::EchoCanceller));

    switches.fail_aec_config.store(true, Ordering::SeqCst);
    ctx.set_echo_canceller_config(config::EchoCanceller {
        nlp_mode: config::NlpMode::Aggressive,
        ..Default::default()
    });
    assert!(!ctx.stage_enabled(Stage::EchoCanceller));

    switches.fail_aec_config.store(false, Ordering::SeqCst);
    ctx.reset().unwrap();
    assert!(ctx.stage_enabled(Stage::EchoCanceller));
}

#[test]
fn runtime_failure_passes_nearend_through() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    switches.fail_aec_process.store(true, Ordering::SeqCst);
    switches.zero_aec_output.store(true, Ordering::SeqCst);

    let nearend = tone(16000, 1, 320, 440.0);
    let mut out = vec![0i16; 320];
    assert_eq!(ctx.do_process(Some(&[1; 320]), &nearend, &mut out).unwrap(), 320);

    assert_eq!(out, nearend);
    assert_eq!(ctx.statistics().echo_canceller_failures, 2);
    assert!(ctx.stage_enabled(Stage::EchoCanceller));
}

#[test]
fn release_tears_down_exactly_once() {
    let (mut ctx, switches) = pipeline::<i16>(2, 16000);
    let created = switches.created.load(Ordering::SeqCst);
    assert_eq!(created, 6);

    assert_eq!(ctx.retain(), 2);
    assert_eq!(ctx.retain(), 3);
    assert_eq!(ctx.release(), 2);
    assert_eq!(ctx.release(), 1);
    assert_eq!(switches.dropped.load(Ordering::SeqCst), 0);

    assert_eq!(ctx.release(), 0);
    assert!(!ctx.is_initialized());
    assert_eq!(switches.dropped.load(Ordering::SeqCst), created);

    assert_eq!(ctx.release(), 0);
    ctx.fini();
    drop(ctx);
    assert_eq!(switches.dropped.load(Ordering::SeqCst), created);
}

#[test]
fn drop_releases_engines() {
    let (ctx, switches) = pipeline::<f32>(1, 48000);
    drop(ctx);
    assert_eq!(
        switches.dropped.load(Ordering::SeqCst),
        switches.created.load(Ordering::SeqCst)
    );
}

#[test]
fn stereo_three_band_output_comes_from_the_echo_canceller() {
    let (mut ctx, switches) = pipeline::<f32>(2, 48000);
    assert_eq!(ctx.num_bands(), Some(3));
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    switches.zero_aec_output.store(true, Ordering::SeqCst);

    let nearend = tone(48000, 2, 480 * 4, 1000.0);
    let farend = tone(48000, 2, 480 * 4, 500.0);
    let mut out = vec![1i16; nearend.len()];
    let written = ctx.do_process(Some(&farend), &nearend, &mut out).unwrap();

    assert_eq!(written, nearend.len());
    assert!(out.iter().all(|&s| s == 0));
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 4 * 2);
}

#[test]
fn two_band_pass_through_keeps_the_signal() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 32000);
    assert_eq!(ctx.num_bands(), Some(2));
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let nearend = tone(32000, 1, 320 * 8, 700.0);
    let mut out = vec![0i16; nearend.len()];
    ctx.do_process(Some(&[]), &nearend, &mut out).unwrap();

    let energy = |s: &[i16]| s.iter().map(|&x| f64::from(x).powi(2)).sum::<f64>();
    let ratio = energy(&out[640..]) / energy(&nearend[640..]);
    assert!((0.8..1.25).contains(&ratio), "energy ratio {ratio}");
}

#[test]
fn farend_underrun_is_padded_and_counted() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    ctx.push_nearend(&vec![0u8; 640]).unwrap();
    ctx.push_farend(&vec![0u8; 320]).unwrap();

    let mut out = vec![0u8; 640];
    assert_eq!(ctx.try_process(&mut out).unwrap(), 640);
    assert_eq!(ctx.statistics().farend_underrun_bytes, 320);
    assert_eq!(switches.aec_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn output_that_does_not_fit_is_kept_for_later() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let nearend = pcm_bytes(&tone(16000, 1, 320, 200.0));
    ctx.push_farend(&[0u8; 640]).unwrap();
    ctx.push_nearend(&nearend).unwrap();

    let mut first = vec![0u8; 320];
    assert_eq!(ctx.try_process(&mut first).unwrap(), 320);

    // A buffer smaller than a frame still gets output; the rest waits.
    let mut small = vec![0u8; 100];
    assert_eq!(ctx.try_process(&mut small).unwrap(), 100);

    let mut rest = vec![0u8; 320];
    assert_eq!(ctx.try_process(&mut rest).unwrap(), 220);
    assert_eq!([first, small, rest[..220].to_vec()].concat(), nearend);
    assert_eq!(ctx.statistics().frames_processed, 2);
}

#[test]
fn gain_control_failure_keeps_mic_level() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    switches.fail_agc_process.store(true, Ordering::SeqCst);

    let nearend = tone(16000, 1, 320, 600.0);
    let mut out = vec![0i16; 320];
    assert_eq!(ctx.do_process(None, &nearend, &mut out).unwrap(), 320);

    assert_eq!(out, nearend);
    let stats = ctx.statistics();
    assert_eq!(stats.gain_controller_failures, 2);
    assert_eq!(stats.mic_level, Some(128));
    assert_eq!(switches.agc_calls.load(Ordering::SeqCst), 2);
    assert!(ctx.stage_enabled(Stage::GainControl));
}

#[test]
fn flush_drops_buffered_and_pending_audio() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let stale = pcm_bytes(&tone(16000, 1, 160 * 5, 300.0));
    ctx.push_farend(&stale).unwrap();
    ctx.push_nearend(&stale).unwrap();
    // A trailing odd byte is held back as a partial sample.
    ctx.push_nearend(&[0x7F]).unwrap();
    let mut small = vec![0u8; 100];
    assert_eq!(ctx.try_process(&mut small).unwrap(), 100);

    ctx.flush();
    let mut out = vec![0u8; 640];
    assert_eq!(ctx.try_process(&mut out).unwrap(), 0);

    let fresh = pcm_bytes(&tone(16000, 1, 320, 900.0));
    ctx.push_farend(&fresh).unwrap();
    ctx.push_nearend(&fresh).unwrap();
    assert_eq!(ctx.try_process(&mut out).unwrap(), 640);
    assert_eq!(out, fresh);
}

#[test]
fn mic_level_is_carried_and_reset() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 16000);
    let nearend = vec![0i16; 160 * 3];
    let mut out = vec![0i16; nearend.len()];
    ctx.do_process(None, &nearend, &mut out).unwrap();
    assert_eq!(ctx.statistics().mic_level, Some(131));

    ctx.reset().unwrap();
    assert_eq!(ctx.statistics().mic_level, Some(128));
}

#[test]
fn delay_reaches_the_echo_canceller() {
    let (mut ctx, switches) = pipeline::<i16>(1, 8000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    ctx.set_aec_delay_ms(120).unwrap();

    let mut out = vec![0i16; 80];
    ctx.do_process(Some(&[0; 80]), &[0; 80], &mut out).unwrap();
    assert_eq!(switches.last_delay_ms.load(Ordering::SeqCst), 120);
}

#[test]
fn disabled_stages_are_skipped() {
    let engines = MockEngines::default();
    let switches = engines.switches.clone();
    let config = Config {
        noise_suppression: None,
        gain_control: None,
        ..Default::default()
    };
    let mut ctx = PipelineContext::<i16>::builder(engines)
        .config(config)
        .build();
    ctx.init(1, 16000, 16000, 0).unwrap();

    let mut out = vec![0i16; 160];
    ctx.do_process(None, &[5; 160], &mut out).unwrap();
    assert_eq!(switches.engine_calls(), 0);
    assert_eq!(ctx.statistics().mic_level, None);
}

#[test]
fn resampled_nearend_comes_back_at_its_own_rate() {
    let (mut ctx, _switches) = pipeline::<f32>(1, 44100);
    assert_eq!(ctx.processing_rate_hz(), Some(32000));
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let chunk = pcm_bytes(&tone(44100, 1, 441, 440.0));
    let mut out = vec![0u8; 882 * 4];
    let mut total = 0;
    for _ in 0..50 {
        ctx.push_farend(&chunk).unwrap();
        ctx.push_nearend(&chunk).unwrap();
        total += ctx.try_process(&mut out).unwrap();
    }

    let pushed = chunk.len() * 50;
    assert_eq!(total % 2, 0);
    // Resampler latency holds back a few blocks at each stage.
    assert!(total > pushed / 2 && total <= pushed, "total {total} of {pushed}");
}

#[test]
fn resampled_stream_drains_into_frame_sized_buffers() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 44100);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    let frame_bytes = ctx.per_frame_bytes();
    assert_eq!(frame_bytes, 640);

    let chunk = pcm_bytes(&tone(44100, 1, 441, 440.0));
    let mut out = vec![0u8; frame_bytes];
    let mut total = 0;
    for _ in 0..100 {
        ctx.push_farend(&chunk).unwrap();
        ctx.push_nearend(&chunk).unwrap();
        total += ctx.try_process(&mut out).unwrap();
    }
    assert!(total > 0, "no output at 44.1 kHz");
    loop {
        let n = ctx.try_process(&mut out).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }

    let pushed = chunk.len() * 100;
    assert!(total > pushed / 2 && total <= pushed, "total {total} of {pushed}");
}

#[test]
fn format_change_flushes_buffered_audio() {
    let (mut ctx, _switches) = pipeline::<i16>(1, 16000);
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);
    ctx.push_nearend(&vec![0u8; 3200]).unwrap();

    ctx.set_nearend_info(16000, 2).unwrap();
    let mut out = vec![0u8; 3200];
    assert_eq!(ctx.try_process(&mut out).unwrap(), 0);

    // Stereo input is downmixed to the single processing channel.
    ctx.push_farend(&vec![0u8; 320]).unwrap();
    ctx.push_nearend(&vec![0u8; 640]).unwrap();
    assert_eq!(ctx.try_process(&mut out).unwrap(), 320);
}

#[test]
fn init_after_fini_starts_fresh() {
    let (mut ctx, switches) = pipeline::<i16>(1, 16000);
    ctx.do_process(None, &[0; 160], &mut [0; 160]).unwrap();
    ctx.fini();
    assert_eq!(ctx.statistics(), PipelineStats::default());

    ctx.init(2, 48000, 48000, 0).unwrap();
    assert_eq!(ctx.statistics().frames_processed, 0);
    assert_eq!(switches.created.load(Ordering::SeqCst), 3 + 6);
}

#[proptest(cases = 32)]
fn pass_through_is_exact_for_any_chunking(
    #[strategy(1usize..=2)] channels: usize,
    #[strategy(pvec(1usize..2000, 1..20))] chunk_sizes: Vec<usize>,
) {
    let config = Config {
        pipeline: Pipeline {
            ring_buffer_size: 1 << 16,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut ctx = PipelineContext::<i16>::builder(MockEngines::default())
        .config(config)
        .build();
    ctx.init(channels, 16000, 16000, 0).unwrap();
    ctx.set_farend_ready(true);
    ctx.set_nearend_ready(true);

    let total: usize = chunk_sizes.iter().sum();
    let input = pcm_bytes(&tone(16000, channels, total / (2 * channels) + 1, 523.0));
    let frame_bytes = ctx.per_frame_bytes();
    let mut out = vec![0u8; frame_bytes];
    let mut processed = Vec::new();

    let mut offset = 0;
    for size in chunk_sizes {
        let chunk = &input[offset..offset + size];
        offset += size;
        prop_assert_eq!(ctx.push_farend(chunk).unwrap(), size);
        prop_assert_eq!(ctx.push_nearend(chunk).unwrap(), size);
        loop {
            let n = ctx.try_process(&mut out).unwrap();
            if n == 0 {
                break;
            }
            prop_assert_eq!(n, frame_bytes);
            processed.extend_from_slice(&out[..n]);
        }
    }

    prop_assert_eq!(processed.len(), total / frame_bytes * frame_bytes);
    prop_assert_eq!(&processed[..], &input[..processed.len()]);
}
