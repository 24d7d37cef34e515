//! The streaming pipeline context.
//!
//! [`PipelineContext`] owns two ring-buffered intakes (farend and nearend),
//! the per-channel engines and subband buffers, and the rate adapters that
//! bring everything to the processing rate and back.
//!
//! # Lifecycle
//!
//! ```text
//! builder().build() -> Uninitialized --init--> Initialized --fini--> Uninitialized
//!                                                  |   ^
//!                                                  reset, set_*_info
//! ```
//!
//! Processing only happens while initialized. Each 10 ms frame runs gain
//! control, then noise suppression, then echo cancellation.

mod channel;
mod intake;

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use derive_more::Debug;
use sonora_common_audio::audio_util::{merge_stereo, s16_as_bytes, s16_from_bytes};
use sonora_common_audio::if_channel_buffer::Sample;
use sonora_common_audio::rate_adapter::RateAdapter;

use self::channel::{ChannelPipeline, FrameSettings, deinterleave};
use self::intake::{Intake, adapter_for, allocate_ring};
use crate::config::{self, Config};
use crate::engine::{EngineFactory, Stage};
use crate::error::{ConfigError, Error};
use crate::stats::PipelineStats;
use crate::stream_format::StreamFormat;
use crate::subband_buffer::num_bands_for_rate;

/// Largest processing frame, in samples per channel.
pub const MAX_FRAME_SIZE: usize = 480;

/// Rates processed natively when the engines allow them.
const NATIVE_PROCESSING_RATES: [u32; 4] = [8000, 16000, 32000, 48000];

/// Processing rate used for any other nearend rate.
const FALLBACK_PROCESSING_RATE_HZ: u32 = 32000;

/// Outcome of [`PipelineContext::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// The context was set up by this call.
    Initialized,
    /// The context was already initialized; nothing changed.
    AlreadyInitialized,
}

/// Builder for [`PipelineContext`].
#[derive(Debug)]
pub struct PipelineBuilder<S: Sample> {
    #[debug(skip)]
    engines: Box<dyn EngineFactory<S>>,
    config: Config,
}

impl<S: Sample> PipelineBuilder<S> {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> PipelineContext<S> {
        let requested = [
            self.config.echo_canceller.is_some(),
            self.config.noise_suppression.is_some(),
            self.config.gain_control.is_some(),
        ];
        PipelineContext {
            engines: self.engines,
            config: self.config,
            requested,
            farend_ready: false,
            nearend_ready: false,
            ref_count: AtomicUsize::new(0),
            session: None,
        }
    }
}

/// Farend/nearend streaming pipeline.
///
/// `S` selects the band representation handed to the echo canceller and
/// noise suppressor: `i16` for fixed-point engines, `f32` for floating
/// point ones.
///
/// # Example
///
/// ```
/// use sonora_stream::PipelineContext;
/// use sonora_stream::engine::bypass::BypassEngines;
///
/// let mut ctx = PipelineContext::<i16>::builder(BypassEngines::new()).build();
/// ctx.init(1, 16000, 16000, 0).unwrap();
/// ctx.set_farend_ready(true);
/// ctx.set_nearend_ready(true);
///
/// let chunk = vec![0u8; ctx.per_frame_bytes()];
/// ctx.push_farend(&chunk).unwrap();
/// ctx.push_nearend(&chunk).unwrap();
///
/// let mut out = vec![0u8; ctx.per_frame_bytes()];
/// assert_eq!(ctx.try_process(&mut out).unwrap(), out.len());
/// ```
#[derive(Debug)]
pub struct PipelineContext<S: Sample> {
    #[debug(skip)]
    engines: Box<dyn EngineFactory<S>>,
    config: Config,
    /// Stage enable requests, indexed by [`Stage::index`].
    requested: [bool; 3],
    farend_ready: bool,
    nearend_ready: bool,
    ref_count: AtomicUsize,
    session: Option<Session<S>>,
}

impl<S: Sample> PipelineContext<S> {
    pub fn builder(engines: impl EngineFactory<S> + 'static) -> PipelineBuilder<S> {
        PipelineBuilder {
            engines: Box::new(engines),
            config: Config::default(),
        }
    }

    /// Set the context up for `channels` at the given nearend and farend
    /// rates, then [`reset`](Self::reset) every engine.
    ///
    /// Calling `init` on an initialized context changes nothing.
    pub fn init(
        &mut self,
        channels: usize,
        nearend_rate_hz: u32,
        farend_rate_hz: u32,
        aec_delay_ms: u16,
    ) -> Result<InitStatus, Error> {
        if self.session.is_some() {
            return Ok(InitStatus::AlreadyInitialized);
        }

        let nearend = StreamFormat::new(nearend_rate_hz, channels)?;
        let farend = StreamFormat::new(farend_rate_hz, channels)?;

        let cap = self
            .config
            .pipeline
            .maximum_processing_rate
            .as_hz()
            .min(self.engines.max_processing_rate_hz());
        let processing_rate_hz = if NATIVE_PROCESSING_RATES.contains(&nearend_rate_hz) {
            nearend_rate_hz.min(cap)
        } else {
            FALLBACK_PROCESSING_RATE_HZ.min(cap)
        };

        let num_frames = (80 * processing_rate_hz / 8000) as usize;
        if num_frames > MAX_FRAME_SIZE {
            return Err(ConfigError::FrameTooLarge {
                num_frames,
                max: MAX_FRAME_SIZE,
            }
            .into());
        }
        let num_bands = num_bands_for_rate(processing_rate_hz);
        if !(1..=3).contains(&num_bands) {
            return Err(ConfigError::UnsupportedBandCount { num_bands }.into());
        }

        let ring_size = self.config.pipeline.ring_buffer_size;
        let farend_ring = allocate_ring(ring_size)?;
        let nearend_ring = allocate_ring(ring_size)?;

        let session = Session {
            channels,
            processing_rate_hz,
            num_frames,
            num_bands,
            aec_delay_ms,
            healthy: [true; 3],
            mic_level: 0,
            farend: Intake::new(farend, processing_rate_hz, channels, farend_ring)?,
            nearend: Intake::new(nearend, processing_rate_hz, channels, nearend_ring)?,
            output_adapter: adapter_for(processing_rate_hz, nearend_rate_hz, channels)?,
            lanes: (0..channels).map(ChannelPipeline::new).collect(),
            scratch: Scratch::new(channels, num_frames),
            pending: Vec::new(),
            stats: PipelineStats::default(),
        };
        self.session = Some(session);
        self.ref_count.store(1, Ordering::Release);

        tracing::info!(
            channels,
            nearend_rate_hz,
            farend_rate_hz,
            processing_rate_hz,
            num_frames,
            num_bands,
            "pipeline initialized"
        );

        self.reset()?;
        Ok(InitStatus::Initialized)
    }

    /// Create any missing engines, then init and configure every engine at
    /// the processing rate.
    ///
    /// A stage whose engine fails on any channel is disabled until the next
    /// successful reset. Other stages are unaffected.
    pub fn reset(&mut self) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        session.reset_engines(self.engines.as_mut(), &self.config);
        tracing::info!(
            aec = session.healthy[Stage::EchoCanceller.index()],
            ns = session.healthy[Stage::NoiseSuppression.index()],
            agc = session.healthy[Stage::GainControl.index()],
            "pipeline reset"
        );
        Ok(())
    }

    /// Release engines, adapters and buffers.
    ///
    /// The context can be initialized again afterwards.
    pub fn fini(&mut self) {
        *self.ref_count.get_mut() = 0;
        if self.session.take().is_some() {
            tracing::info!("pipeline finalized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Take an additional reference. Returns the new count, or 0 if the
    /// context is not initialized.
    pub fn retain(&self) -> usize {
        if self.session.is_none() {
            return 0;
        }
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop a reference. The last one finalizes the context.
    ///
    /// Returns the remaining count. Releasing a torn-down context returns 0.
    pub fn release(&mut self) -> usize {
        let count = self.ref_count.get_mut();
        if *count == 0 {
            return 0;
        }
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.fini();
        }
        remaining
    }

    pub fn set_farend_ready(&mut self, ready: bool) {
        if self.farend_ready != ready {
            tracing::debug!(ready, "farend readiness changed");
        }
        self.farend_ready = ready;
    }

    pub fn set_nearend_ready(&mut self, ready: bool) {
        if self.nearend_ready != ready {
            tracing::debug!(ready, "nearend readiness changed");
        }
        self.nearend_ready = ready;
    }

    /// Both directions are ready and echo cancellation is enabled.
    pub fn should_run_aec(&self) -> bool {
        self.farend_ready && self.nearend_ready && self.stage_enabled(Stage::EchoCanceller)
    }

    /// Request a stage on or off.
    pub fn set_stage_enabled(&mut self, stage: Stage, enabled: bool) {
        tracing::info!(%stage, enabled, "stage enable requested");
        self.requested[stage.index()] = enabled;
    }

    /// The stage is requested and its engines came up on the last reset.
    pub fn stage_enabled(&self, stage: Stage) -> bool {
        let index = stage.index();
        self.requested[index]
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.healthy[index])
    }

    /// Change the farend format. Flushes buffered farend audio and resets.
    pub fn set_farend_info(&mut self, sample_rate_hz: u32, channels: usize) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        let format = StreamFormat::new(sample_rate_hz, channels)?;
        session.farend.set_format(format)?;
        tracing::info!(sample_rate_hz, channels, "farend format changed");
        self.reset()
    }

    /// Change the nearend format. Flushes buffered nearend audio and
    /// pending output, then resets. Output follows the new nearend rate.
    pub fn set_nearend_info(&mut self, sample_rate_hz: u32, channels: usize) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        let format = StreamFormat::new(sample_rate_hz, channels)?;
        session.nearend.set_format(format)?;
        session.output_adapter =
            adapter_for(session.processing_rate_hz, sample_rate_hz, session.channels)?;
        session.pending.clear();
        tracing::info!(sample_rate_hz, channels, "nearend format changed");
        self.reset()
    }

    pub fn set_aec_delay_ms(&mut self, delay_ms: u16) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        session.aec_delay_ms = delay_ms;
        Ok(())
    }

    /// Replace the echo canceller settings and apply them to live engines.
    ///
    /// An engine that rejects the settings is dropped and echo cancellation
    /// is disabled until the next successful reset.
    pub fn set_echo_canceller_config(&mut self, config: config::EchoCanceller) {
        if let Some(session) = self.session.as_mut() {
            session.reconfigure_echo_canceller(&config);
        }
        self.config.echo_canceller = Some(config);
    }

    /// Process whole frames of interleaved PCM at the processing rate.
    ///
    /// `nearend` must hold at least one frame (`num_frames * channels`
    /// samples). Echo cancellation runs only when `farend` is given and
    /// [`should_run_aec`](Self::should_run_aec) holds. Missing farend
    /// samples are treated as silence.
    ///
    /// Returns the number of samples written to `out`.
    pub fn do_process(
        &mut self,
        farend: Option<&[i16]>,
        nearend: &[i16],
        out: &mut [i16],
    ) -> Result<usize, Error> {
        let need_aec = farend.is_some() && self.should_run_aec();
        let gain_control = self.stage_enabled(Stage::GainControl);
        let noise_suppression = self.stage_enabled(Stage::NoiseSuppression);
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        let settings = FrameSettings {
            num_frames: session.num_frames,
            num_bands: session.num_bands,
            gain_control,
            noise_suppression,
            echo_cancellation: need_aec,
            farend: farend.is_some(),
            delay_ms: session.aec_delay_ms,
        };
        session.process(&settings, farend, nearend, out)
    }

    /// Queue farend PCM (native-endian S16, interleaved).
    ///
    /// Returns `Ok(0)` without buffering unless
    /// [`should_run_aec`](Self::should_run_aec) holds, otherwise the number
    /// of bytes taken.
    pub fn push_farend(&mut self, pcm: &[u8]) -> Result<usize, Error> {
        let run = self.should_run_aec();
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        if !run {
            return Ok(0);
        }
        let dropped = session.farend.push(pcm)?;
        if dropped > 0 {
            session.stats.dropped_farend_bytes += dropped as u64;
            tracing::warn!(dropped, "farend ring full, audio dropped");
        }
        Ok(pcm.len())
    }

    /// Queue nearend PCM (native-endian S16, interleaved).
    ///
    /// Same contract as [`push_farend`](Self::push_farend).
    pub fn push_nearend(&mut self, pcm: &[u8]) -> Result<usize, Error> {
        let run = self.should_run_aec();
        let session = self.session.as_mut().ok_or(Error::NotInitialized)?;
        if !run {
            return Ok(0);
        }
        let dropped = session.nearend.push(pcm)?;
        if dropped > 0 {
            session.stats.dropped_nearend_bytes += dropped as u64;
            tracing::warn!(dropped, "nearend ring full, audio dropped");
        }
        Ok(pcm.len())
    }

    /// Process buffered frames until `out` can be filled, and copy the
    /// result, at the nearend rate, into `out`.
    ///
    /// Output that does not fit is kept for the next call. Returns the
    /// number of bytes written.
    pub fn try_process(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        let session = self.session.as_ref().ok_or(Error::NotInitialized)?;
        let frame_bytes = session.per_frame_bytes();

        loop {
            let Some(session) = self.session.as_mut() else {
                return Err(Error::NotInitialized);
            };
            if session.nearend.avail() < frame_bytes || session.pending.len() >= out.len() {
                break;
            }
            let mut frame = mem::take(&mut session.scratch.frame);
            session.read_frame(&mut frame);
            let result = self.do_process(Some(&frame.farend), &frame.nearend, &mut frame.output);

            let Some(session) = self.session.as_mut() else {
                return Err(Error::NotInitialized);
            };
            let queued = result.and_then(|written| session.queue_output(&frame.output[..written]));
            session.scratch.frame = frame;
            queued?;
        }

        let Some(session) = self.session.as_mut() else {
            return Err(Error::NotInitialized);
        };
        let n = out.len().min(session.pending.len());
        out[..n].copy_from_slice(&session.pending[..n]);
        session.pending.drain(..n);
        Ok(n)
    }

    /// Drop all buffered input, resampler state and pending output.
    pub fn flush(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.farend.flush();
            session.nearend.flush();
            if let Some(adapter) = session.output_adapter.as_mut() {
                adapter.reset();
            }
            session.pending.clear();
        }
    }

    /// Bytes of one processing frame across all channels, or 0 when not
    /// initialized.
    pub fn per_frame_bytes(&self) -> usize {
        self.session.as_ref().map_or(0, Session::per_frame_bytes)
    }

    pub fn processing_rate_hz(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.processing_rate_hz)
    }

    pub fn num_bands(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.num_bands)
    }

    pub fn channels(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.channels)
    }

    /// Counters of the current session. All zero when not initialized.
    pub fn statistics(&self) -> PipelineStats {
        self.session.as_ref().map_or_else(PipelineStats::default, |s| {
            let mut stats = s.stats.clone();
            stats.mic_level = self
                .stage_enabled(Stage::GainControl)
                .then_some(s.mic_level);
            stats
        })
    }
}

impl<S: Sample> Drop for PipelineContext<S> {
    fn drop(&mut self) {
        self.fini();
    }
}

/// One farend/nearend frame pair read from the rings, plus its output.
#[derive(Debug, Default)]
struct FrameScratch {
    #[debug(skip)]
    bytes: Vec<u8>,
    #[debug(skip)]
    farend: Vec<i16>,
    #[debug(skip)]
    nearend: Vec<i16>,
    #[debug(skip)]
    output: Vec<i16>,
}

#[derive(Debug)]
struct Scratch {
    #[debug(skip)]
    farend: Vec<Vec<i16>>,
    #[debug(skip)]
    nearend: Vec<Vec<i16>>,
    #[debug(skip)]
    output: Vec<Vec<i16>>,
    frame: FrameScratch,
}

impl Scratch {
    fn new(channels: usize, num_frames: usize) -> Self {
        let samples = num_frames * channels;
        Self {
            farend: vec![vec![0; num_frames]; channels],
            nearend: vec![vec![0; num_frames]; channels],
            output: vec![vec![0; num_frames]; channels],
            frame: FrameScratch {
                bytes: vec![0; samples * 2],
                farend: vec![0; samples],
                nearend: vec![0; samples],
                output: vec![0; samples],
            },
        }
    }
}

/// Everything that exists between `init` and `fini`.
#[derive(Debug)]
struct Session<S: Sample> {
    channels: usize,
    processing_rate_hz: u32,
    num_frames: usize,
    num_bands: usize,
    aec_delay_ms: u16,
    /// Per-stage engine health from the last reset.
    healthy: [bool; 3],
    mic_level: i32,
    farend: Intake,
    nearend: Intake,
    /// Processing rate back to the nearend rate.
    output_adapter: Option<RateAdapter>,
    lanes: Vec<ChannelPipeline<S>>,
    scratch: Scratch,
    /// Processed bytes not yet handed out by `try_process`.
    #[debug(skip)]
    pending: Vec<u8>,
    stats: PipelineStats,
}

impl<S: Sample> Session<S> {
    fn per_frame_bytes(&self) -> usize {
        self.num_frames * self.channels * 2
    }

    fn reset_engines(&mut self, factory: &mut dyn EngineFactory<S>, config: &Config) {
        let rate = self.processing_rate_hz;
        let echo_config = config.echo_canceller.clone().unwrap_or_default();
        let ns_level = config.noise_suppression.clone().unwrap_or_default().level;
        let gain_config = config.gain_control.clone().unwrap_or_default();

        self.healthy = [true; 3];
        for lane in &mut self.lanes {
            let results = [
                (
                    Stage::EchoCanceller,
                    lane.reset_echo_canceller(factory, rate, &echo_config),
                ),
                (
                    Stage::NoiseSuppression,
                    lane.reset_noise_suppressor(factory, rate, ns_level),
                ),
                (
                    Stage::GainControl,
                    lane.reset_gain_controller(factory, rate, &gain_config),
                ),
            ];
            for (stage, result) in results {
                if let Err(error) = result {
                    tracing::warn!(%stage, %error, "engine setup failed, stage disabled");
                    self.healthy[stage.index()] = false;
                }
            }
        }
        self.mic_level = gain_config.initial_mic_level;
    }

    fn reconfigure_echo_canceller(&mut self, config: &config::EchoCanceller) {
        for lane in &mut self.lanes {
            if let Err(error) = lane.reconfigure_echo_canceller(config) {
                tracing::warn!(%error, "echo canceller rejected configuration, stage disabled");
                self.healthy[Stage::EchoCanceller.index()] = false;
            }
        }
    }

    fn process(
        &mut self,
        settings: &FrameSettings,
        farend: Option<&[i16]>,
        nearend: &[i16],
        out: &mut [i16],
    ) -> Result<usize, Error> {
        let frame_len = self.num_frames * self.channels;
        if nearend.len() < frame_len {
            return Err(Error::InsufficientData {
                available: nearend.len(),
                required: frame_len,
            });
        }

        let mut written = 0;
        for (index, nearend_frame) in nearend.chunks_exact(frame_len).enumerate() {
            if written == out.len() {
                break;
            }

            deinterleave(nearend_frame, &mut self.scratch.nearend);
            if let Some(farend) = farend {
                let start = (index * frame_len).min(farend.len());
                let farend_frame = &farend[start..farend.len().min(start + frame_len)];
                deinterleave(farend_frame, &mut self.scratch.farend);
            }

            for (ch, lane) in self.lanes.iter_mut().enumerate() {
                lane.process_frame(
                    settings,
                    &self.scratch.farend[ch],
                    &self.scratch.nearend[ch],
                    &mut self.scratch.output[ch],
                    &mut self.mic_level,
                    &mut self.stats,
                )?;
            }

            let n = match self.scratch.output.as_slice() {
                [mono] => {
                    let n = mono.len().min(out.len() - written);
                    out[written..written + n].copy_from_slice(&mono[..n]);
                    n
                }
                [left, right] => merge_stereo(left, right, &mut out[written..]),
                _ => 0,
            };
            if n == 0 {
                break;
            }
            written += n;

            self.stats.frames_processed += 1;
            if settings.echo_cancellation {
                self.stats.aec_frames += 1;
            }
        }
        Ok(written)
    }

    /// Read one processing frame from each ring into `frame`, zero-padding
    /// a short farend read.
    fn read_frame(&mut self, frame: &mut FrameScratch) {
        let frame_bytes = self.per_frame_bytes();
        frame.bytes.resize(frame_bytes, 0);

        let farend_read = self.farend.read(&mut frame.bytes);
        if farend_read < frame_bytes {
            frame.bytes[farend_read..].fill(0);
            let missing = frame_bytes - farend_read;
            self.stats.farend_underrun_bytes += missing as u64;
            tracing::debug!(missing, "farend underrun, padding with silence");
        }
        frame.farend.resize(frame_bytes / 2, 0);
        s16_from_bytes(&frame.bytes, &mut frame.farend);

        let nearend_read = self.nearend.read(&mut frame.bytes);
        frame.nearend.resize(frame_bytes / 2, 0);
        s16_from_bytes(&frame.bytes[..nearend_read], &mut frame.nearend);

        frame.output.resize(frame_bytes / 2, 0);
    }

    /// Convert processed samples to the nearend rate and queue them.
    fn queue_output(&mut self, processed: &[i16]) -> Result<(), Error> {
        match self.output_adapter.as_mut() {
            Some(adapter) => {
                let mut adapted = Vec::with_capacity(processed.len() * 8);
                adapter.process(processed, &mut adapted)?;
                self.pending.extend_from_slice(s16_as_bytes(&adapted));
            }
            None => self.pending.extend_from_slice(s16_as_bytes(processed)),
        }
        Ok(())
    }
}
