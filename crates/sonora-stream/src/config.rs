//! Pipeline configuration.
//!
//! A stage is requested by setting its field to `Some(...)`. All three
//! stages are requested by default.

/// Top-level configuration for a [`PipelineContext`](crate::PipelineContext).
///
/// # Example
///
/// ```
/// use sonora_stream::Config;
/// use sonora_stream::config::{NoiseSuppression, NoiseSuppressionLevel};
///
/// let config = Config {
///     noise_suppression: Some(NoiseSuppression {
///         level: NoiseSuppressionLevel::Moderate,
///     }),
///     gain_control: None,
///     ..Default::default()
/// };
/// assert!(config.echo_canceller.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Processing-rate and buffering properties.
    pub pipeline: Pipeline,
    /// Echo canceller settings. Set to `None` to disable.
    pub echo_canceller: Option<EchoCanceller>,
    /// Noise suppression settings. Set to `None` to disable.
    pub noise_suppression: Option<NoiseSuppression>,
    /// Gain control settings. Set to `None` to disable.
    pub gain_control: Option<GainControl>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: Pipeline::default(),
            echo_canceller: Some(EchoCanceller::default()),
            noise_suppression: Some(NoiseSuppression::default()),
            gain_control: Some(GainControl::default()),
        }
    }
}

/// Upper bound for the processing rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxProcessingRate {
    /// 16 kHz, the rate mobile echo control runs at.
    Rate16kHz,
    /// 32 kHz.
    Rate32kHz,
    /// 48 kHz.
    Rate48kHz,
}

impl MaxProcessingRate {
    /// Returns the rate in Hz.
    pub fn as_hz(self) -> u32 {
        match self {
            Self::Rate16kHz => 16000,
            Self::Rate32kHz => 32000,
            Self::Rate48kHz => 48000,
        }
    }
}

/// Default byte capacity of each direction's ring buffer (8 MiB).
pub const DEFAULT_RING_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Pipeline processing properties.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Highest processing rate the pipeline will pick.
    pub maximum_processing_rate: MaxProcessingRate,
    /// Byte capacity of each of the farend and nearend ring buffers.
    /// Must be a power of two.
    pub ring_buffer_size: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            maximum_processing_rate: MaxProcessingRate::Rate48kHz,
            ring_buffer_size: DEFAULT_RING_BUFFER_SIZE,
        }
    }
}

/// Non-linear processing aggressiveness of the echo canceller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NlpMode {
    Conservative,
    Moderate,
    Aggressive,
}

/// Acoustic routing hint for mobile echo control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPathRouting {
    QuietEarpieceOrHeadset,
    Earpiece,
    LoudEarpiece,
    Speakerphone,
    LoudSpeakerphone,
}

/// Echo canceller settings.
///
/// The full-rate canceller reads `nlp_mode`, `skew_mode`, `metrics`,
/// `delay_logging` and `delay_agnostic`; mobile echo control reads
/// `routing` and `comfort_noise`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoCanceller {
    /// Non-linear processing mode (default: `Moderate`).
    pub nlp_mode: NlpMode,
    /// Clock skew compensation (default: off).
    pub skew_mode: bool,
    /// Collect echo metrics (default: off).
    pub metrics: bool,
    /// Log delay estimates (default: off).
    pub delay_logging: bool,
    /// Estimate the echo path delay instead of trusting the reported one
    /// (default: on).
    pub delay_agnostic: bool,
    /// Routing mode for mobile echo control (default: `LoudEarpiece`).
    pub routing: EchoPathRouting,
    /// Comfort noise generation for mobile echo control (default: on).
    pub comfort_noise: bool,
}

impl Default for EchoCanceller {
    fn default() -> Self {
        Self {
            nlp_mode: NlpMode::Moderate,
            skew_mode: false,
            metrics: false,
            delay_logging: false,
            delay_agnostic: true,
            routing: EchoPathRouting::LoudEarpiece,
            comfort_noise: true,
        }
    }
}

/// Background noise suppression settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseSuppression {
    /// Aggressiveness level (default: `VeryHigh`).
    pub level: NoiseSuppressionLevel,
}

impl Default for NoiseSuppression {
    fn default() -> Self {
        Self {
            level: NoiseSuppressionLevel::VeryHigh,
        }
    }
}

/// Noise suppression aggressiveness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseSuppressionLevel {
    /// Low suppression (~6 dB).
    Low,
    /// Moderate suppression (~10 dB).
    Moderate,
    /// High suppression (~15 dB).
    High,
    /// Very high suppression (~20 dB).
    VeryHigh,
}

impl NoiseSuppressionLevel {
    /// Numeric policy as understood by classic noise suppressors (0..=3).
    pub fn policy(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Moderate => 1,
            Self::High => 2,
            Self::VeryHigh => 3,
        }
    }
}

/// Gain control operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainControlMode {
    /// Adapt the analog mic level reported by the caller.
    AdaptiveAnalog,
    /// Adapt a digital gain only.
    AdaptiveDigital,
    /// Apply a fixed digital gain.
    FixedDigital,
}

/// Automatic gain control settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GainControl {
    /// Operating mode (default: `AdaptiveAnalog`).
    pub mode: GainControlMode,
    /// Lowest analog mic level (default: 0).
    pub min_level: i32,
    /// Highest analog mic level (default: 255).
    pub max_level: i32,
    /// Mic level carried into the first frame after a reset (default: 128).
    pub initial_mic_level: i32,
    /// Target peak level in -dBFS (default: 3).
    pub target_level_dbfs: u8,
    /// Compression gain in dB (default: 9).
    pub compression_gain_db: u8,
    /// Enable the limiter (default: true).
    pub limiter: bool,
}

impl Default for GainControl {
    fn default() -> Self {
        Self {
            mode: GainControlMode::AdaptiveAnalog,
            min_level: 0,
            max_level: 255,
            initial_mic_level: 128,
            target_level_dbfs: 3,
            compression_gain_db: 9,
            limiter: true,
        }
    }
}
