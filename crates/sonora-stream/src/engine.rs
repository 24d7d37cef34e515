//! Capability traits for the processing engines the pipeline drives.
//!
//! The pipeline never computes echo, noise or gain estimates itself. It
//! hands band-split frames to engines obtained from an [`EngineFactory`].
//! `S` is the band sample representation: `i16` for fixed-point engines,
//! `f32` (FloatS16 range) for floating-point engines. Gain control always
//! works on `i16` bands.

pub mod bypass;

use sonora_common_audio::channel_buffer::{Bands, BandsMut};
use sonora_common_audio::if_channel_buffer::Sample;

use crate::config::{self, GainControlMode, NoiseSuppressionLevel};

/// Default processing-rate cap reported by a factory.
pub const DEFAULT_MAX_PROCESSING_RATE_HZ: u32 = 48_000;

/// One of the three processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    EchoCanceller,
    NoiseSuppression,
    GainControl,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::EchoCanceller, Self::NoiseSuppression, Self::GainControl];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::EchoCanceller => 0,
            Self::NoiseSuppression => 1,
            Self::GainControl => 2,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EchoCanceller => "aec",
            Self::NoiseSuppression => "ns",
            Self::GainControl => "agc",
        })
    }
}

/// Failure reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The factory could not create the engine.
    Unavailable,
    /// `init` failed with an engine-specific code.
    Init { code: i32 },
    /// The engine rejected its configuration.
    Config { code: i32 },
    /// Processing a frame failed.
    Process { code: i32 },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Unavailable => write!(f, "engine unavailable"),
            Self::Init { code } => write!(f, "engine init failed ({code})"),
            Self::Config { code } => write!(f, "engine rejected configuration ({code})"),
            Self::Process { code } => write!(f, "engine processing failed ({code})"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Acoustic echo canceller for one channel.
pub trait EchoCanceller<S: Sample>: Send {
    fn init(&mut self, sample_rate_hz: u32) -> Result<(), EngineError>;

    fn set_config(&mut self, config: &config::EchoCanceller) -> Result<(), EngineError>;

    /// Queue one lowest-band farend frame.
    fn buffer_farend(&mut self, farend: &[S]) -> Result<(), EngineError>;

    /// Cancel echo from `nearend` into `out`, given the reported echo path
    /// delay.
    fn process(
        &mut self,
        nearend: Bands<'_, S>,
        out: BandsMut<'_, S>,
        delay_ms: u16,
    ) -> Result<(), EngineError>;
}

/// Noise suppressor for one channel.
pub trait NoiseSuppressor<S: Sample>: Send {
    fn init(&mut self, sample_rate_hz: u32) -> Result<(), EngineError>;

    fn set_policy(&mut self, level: NoiseSuppressionLevel) -> Result<(), EngineError>;

    /// Update the noise estimate from the lowest band.
    fn analyze(&mut self, band0: &[S]) -> Result<(), EngineError>;

    fn process(&mut self, nearend: Bands<'_, S>, out: BandsMut<'_, S>) -> Result<(), EngineError>;
}

/// Result of one gain control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainOutcome {
    /// Mic level to carry into the next frame.
    pub mic_level: i32,
    /// The input was saturated.
    pub saturation_warning: bool,
}

/// Automatic gain controller for one channel.
pub trait GainController: Send {
    fn init(
        &mut self,
        min_level: i32,
        max_level: i32,
        mode: GainControlMode,
        sample_rate_hz: u32,
    ) -> Result<(), EngineError>;

    fn set_config(&mut self, config: &config::GainControl) -> Result<(), EngineError>;

    /// Feed the unprocessed mic bands to the level estimator.
    fn add_mic(&mut self, nearend: Bands<'_, i16>) -> Result<(), EngineError>;

    fn process(
        &mut self,
        nearend: Bands<'_, i16>,
        out: BandsMut<'_, i16>,
        mic_level: i32,
        stream_has_echo: bool,
    ) -> Result<GainOutcome, EngineError>;
}

/// Creates per-channel engines for a [`PipelineContext`](crate::PipelineContext).
pub trait EngineFactory<S: Sample>: Send {
    /// Highest processing rate these engines support.
    fn max_processing_rate_hz(&self) -> u32 {
        DEFAULT_MAX_PROCESSING_RATE_HZ
    }

    fn echo_canceller(&mut self) -> Result<Box<dyn EchoCanceller<S>>, EngineError>;

    fn noise_suppressor(&mut self) -> Result<Box<dyn NoiseSuppressor<S>>, EngineError>;

    fn gain_controller(&mut self) -> Result<Box<dyn GainController>, EngineError>;
}
