//! Per-channel engines and subband buffers.

use derive_more::Debug;
use sonora_common_audio::audio_util::split_stereo;
use sonora_common_audio::if_channel_buffer::Sample;

use crate::config::{self, NoiseSuppressionLevel};
use crate::engine::{
    EchoCanceller, EngineError, EngineFactory, GainController, NoiseSuppressor,
};
use crate::error::ConfigError;
use crate::stats::PipelineStats;
use crate::subband_buffer::SubbandBuffer;

/// What runs on the current frame.
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameSettings {
    pub(super) num_frames: usize,
    pub(super) num_bands: usize,
    pub(super) gain_control: bool,
    pub(super) noise_suppression: bool,
    pub(super) echo_cancellation: bool,
    /// A farend frame was supplied, whether or not echo cancellation runs.
    pub(super) farend: bool,
    pub(super) delay_ms: u16,
}

#[derive(Debug)]
struct Buffers {
    farend: SubbandBuffer,
    nearend: SubbandBuffer,
    output: SubbandBuffer,
}

impl Buffers {
    fn new(num_frames: usize, num_bands: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            farend: SubbandBuffer::new(num_frames, num_bands)?,
            nearend: SubbandBuffer::new(num_frames, num_bands)?,
            output: SubbandBuffer::new(num_frames, num_bands)?,
        })
    }
}

/// Engines and subband buffers of one processing channel.
#[derive(Debug)]
pub(super) struct ChannelPipeline<S: Sample> {
    channel: usize,
    #[debug(skip)]
    echo_canceller: Option<Box<dyn EchoCanceller<S>>>,
    #[debug(skip)]
    noise_suppressor: Option<Box<dyn NoiseSuppressor<S>>>,
    #[debug(skip)]
    gain_controller: Option<Box<dyn GainController>>,
    /// Created on the first processed frame.
    buffers: Option<Buffers>,
}

impl<S: Sample> ChannelPipeline<S> {
    pub(super) fn new(channel: usize) -> Self {
        Self {
            channel,
            echo_canceller: None,
            noise_suppressor: None,
            gain_controller: None,
            buffers: None,
        }
    }

    /// Create the echo canceller if needed, then init and configure it.
    /// The engine is dropped on failure.
    pub(super) fn reset_echo_canceller(
        &mut self,
        factory: &mut dyn EngineFactory<S>,
        sample_rate_hz: u32,
        config: &config::EchoCanceller,
    ) -> Result<(), EngineError> {
        let mut engine = match self.echo_canceller.take() {
            Some(engine) => engine,
            None => factory.echo_canceller()?,
        };
        engine.init(sample_rate_hz)?;
        engine.set_config(config)?;
        self.echo_canceller = Some(engine);
        Ok(())
    }

    pub(super) fn reset_noise_suppressor(
        &mut self,
        factory: &mut dyn EngineFactory<S>,
        sample_rate_hz: u32,
        level: NoiseSuppressionLevel,
    ) -> Result<(), EngineError> {
        let mut engine = match self.noise_suppressor.take() {
            Some(engine) => engine,
            None => factory.noise_suppressor()?,
        };
        engine.init(sample_rate_hz)?;
        engine.set_policy(level)?;
        self.noise_suppressor = Some(engine);
        Ok(())
    }

    pub(super) fn reset_gain_controller(
        &mut self,
        factory: &mut dyn EngineFactory<S>,
        sample_rate_hz: u32,
        config: &config::GainControl,
    ) -> Result<(), EngineError> {
        let mut engine = match self.gain_controller.take() {
            Some(engine) => engine,
            None => factory.gain_controller()?,
        };
        engine.init(
            config.min_level,
            config.max_level,
            config.mode,
            sample_rate_hz,
        )?;
        engine.set_config(config)?;
        self.gain_controller = Some(engine);
        Ok(())
    }

    /// Re-apply an echo canceller configuration to a live engine.
    pub(super) fn reconfigure_echo_canceller(
        &mut self,
        config: &config::EchoCanceller,
    ) -> Result<(), EngineError> {
        let Some(engine) = self.echo_canceller.as_mut() else {
            return Ok(());
        };
        let result = engine.set_config(config);
        if result.is_err() {
            self.echo_canceller = None;
        }
        result
    }

    /// Run AGC, NS and AEC over one deinterleaved frame of this channel.
    ///
    /// `out` receives the processed full-band frame. Engine failures pass
    /// the frame through and are counted in `stats`.
    pub(super) fn process_frame(
        &mut self,
        settings: &FrameSettings,
        farend: &[i16],
        nearend: &[i16],
        out: &mut [i16],
        mic_level: &mut i32,
        stats: &mut PipelineStats,
    ) -> Result<(), ConfigError> {
        let channel = self.channel;
        let buffers = match self.buffers.take() {
            Some(buffers) => buffers,
            None => Buffers::new(settings.num_frames, settings.num_bands)?,
        };
        let Buffers {
            farend: farend_buf,
            nearend: nearend_buf,
            output: output_buf,
        } = self.buffers.insert(buffers);

        nearend_buf.fill(nearend);
        // Keep the farend filter state continuous across readiness changes.
        if settings.farend {
            farend_buf.fill(farend);
        }

        if settings.gain_control
            && let Some(agc) = self.gain_controller.as_mut()
        {
            if let Err(error) = agc.add_mic(nearend_buf.bands::<i16>()) {
                tracing::warn!(channel, %error, "gain control add_mic failed");
            }
            match agc.process(
                nearend_buf.bands::<i16>(),
                output_buf.bands_mut::<i16>(),
                *mic_level,
                false,
            ) {
                Ok(outcome) => {
                    nearend_buf
                        .bands_mut::<i16>()
                        .copy_from(output_buf.bands::<i16>());
                    *mic_level = outcome.mic_level;
                    if outcome.saturation_warning {
                        tracing::debug!(channel, "gain control reported saturation");
                    }
                }
                Err(error) => {
                    stats.gain_controller_failures += 1;
                    tracing::warn!(channel, %error, "gain control failed, passing frame through");
                }
            }
        }

        if settings.noise_suppression
            && let Some(ns) = self.noise_suppressor.as_mut()
        {
            let result = match ns.analyze(nearend_buf.bands::<S>().band(0)) {
                Ok(()) => ns.process(nearend_buf.bands::<S>(), output_buf.bands_mut::<S>()),
                Err(error) => Err(error),
            };
            match result {
                Ok(()) => nearend_buf
                    .bands_mut::<S>()
                    .copy_from(output_buf.bands::<S>()),
                Err(error) => {
                    stats.noise_suppressor_failures += 1;
                    tracing::warn!(channel, %error, "noise suppression failed, passing frame through");
                }
            }
        }

        let mut echo_cancelled = false;
        if settings.echo_cancellation
            && let Some(aec) = self.echo_canceller.as_mut()
        {
            let result = match aec.buffer_farend(farend_buf.bands::<S>().band(0)) {
                Ok(()) => aec.process(
                    nearend_buf.bands::<S>(),
                    output_buf.bands_mut::<S>(),
                    settings.delay_ms,
                ),
                Err(error) => Err(error),
            };
            match result {
                Ok(()) => echo_cancelled = true,
                Err(error) => {
                    stats.echo_canceller_failures += 1;
                    tracing::warn!(channel, %error, "echo cancellation failed, passing nearend through");
                }
            }
        }

        if echo_cancelled {
            output_buf.read_into(out);
        } else {
            nearend_buf.read_into(out);
        }
        Ok(())
    }
}

/// Deinterleave `src` into the first `dst.len()` channel slices.
///
/// Destination samples not covered by `src` are zeroed.
pub(super) fn deinterleave(src: &[i16], dst: &mut [Vec<i16>]) {
    for channel in dst.iter_mut() {
        channel.fill(0);
    }
    match dst {
        [mono] => {
            let n = src.len().min(mono.len());
            mono[..n].copy_from_slice(&src[..n]);
        }
        [left, right] => {
            split_stereo(src, left, right);
        }
        _ => {}
    }
}
