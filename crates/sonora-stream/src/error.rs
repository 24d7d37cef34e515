use sonora_common_audio::rate_adapter::RateAdapterError;

use crate::stream_format::StreamFormatError;

/// Errors returned by [`PipelineContext`](crate::PipelineContext) operations.
#[derive(Debug)]
pub enum Error {
    /// The context has not been initialized, or was finalized.
    NotInitialized,
    /// Stream parameters or configuration were rejected.
    InvalidConfiguration(ConfigError),
    /// Fewer samples than one processing frame were supplied.
    InsufficientData { available: usize, required: usize },
    /// A ring buffer region could not be allocated.
    Allocation { bytes: usize },
    /// Sample-rate conversion failed.
    RateAdapter(RateAdapterError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "pipeline context is not initialized"),
            Self::InvalidConfiguration(e) => write!(f, "invalid configuration: {e}"),
            Self::InsufficientData {
                available,
                required,
            } => write!(
                f,
                "not enough data for one frame: {available} samples available, {required} required"
            ),
            Self::Allocation { bytes } => write!(f, "failed to allocate {bytes} bytes"),
            Self::RateAdapter(e) => write!(f, "rate adapter: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfiguration(e) => Some(e),
            Self::RateAdapter(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfiguration(e)
    }
}

impl From<StreamFormatError> for Error {
    fn from(e: StreamFormatError) -> Self {
        Self::InvalidConfiguration(ConfigError::StreamFormat(e))
    }
}

impl From<RateAdapterError> for Error {
    fn from(e: RateAdapterError) -> Self {
        Self::RateAdapter(e)
    }
}

/// Why a configuration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A farend or nearend stream format is invalid.
    StreamFormat(StreamFormatError),
    /// The processing frame would exceed the per-channel scratch size.
    FrameTooLarge { num_frames: usize, max: usize },
    /// Subband buffers support 1, 2 or 3 bands.
    UnsupportedBandCount { num_bands: usize },
    /// Ring buffer capacity must be a power of two of at least 2 bytes.
    RingBufferSize { size: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::StreamFormat(e) => write!(f, "{e}"),
            Self::FrameTooLarge { num_frames, max } => {
                write!(f, "frame of {num_frames} samples exceeds the maximum of {max}")
            }
            Self::UnsupportedBandCount { num_bands } => {
                write!(f, "unsupported band count {num_bands}; expected 1, 2 or 3")
            }
            Self::RingBufferSize { size } => {
                write!(f, "ring buffer size {size} is not a power of two >= 2")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StreamFormat(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_format_errors_become_invalid_configuration() {
        let err: Error = StreamFormatError::UnsupportedChannels { channels: 3 }.into();
        assert!(matches!(
            err,
            Error::InvalidConfiguration(ConfigError::StreamFormat(_))
        ));
        assert!(err.to_string().contains("unsupported channel count 3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn insufficient_data_message() {
        let err = Error::InsufficientData {
            available: 100,
            required: 160,
        };
        assert_eq!(
            err.to_string(),
            "not enough data for one frame: 100 samples available, 160 required"
        );
    }
}
