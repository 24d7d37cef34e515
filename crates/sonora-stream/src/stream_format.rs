//! Validated description of one direction's PCM stream.

use std::num::NonZeroU32;

/// Minimum supported sample rate in Hz.
pub const MIN_SAMPLE_RATE_HZ: u32 = 8_000;
/// Maximum supported sample rate in Hz.
pub const MAX_SAMPLE_RATE_HZ: u32 = 384_000;
/// Maximum supported channel count.
pub const MAX_CHANNELS: usize = 2;

/// Error returned when creating a [`StreamFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormatError {
    /// Sample rate is outside the supported range.
    UnsupportedSampleRate { sample_rate_hz: u32 },
    /// Sample rate does not map to an integer number of 10ms frames.
    Non10msAlignedSampleRate { sample_rate_hz: u32 },
    /// Only mono and stereo streams are supported.
    UnsupportedChannels { channels: usize },
}

impl std::fmt::Display for StreamFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::UnsupportedSampleRate { sample_rate_hz } => write!(
                f,
                "unsupported sample rate {sample_rate_hz}; expected {MIN_SAMPLE_RATE_HZ}..={MAX_SAMPLE_RATE_HZ}",
            ),
            Self::Non10msAlignedSampleRate { sample_rate_hz } => write!(
                f,
                "sample rate {sample_rate_hz} is not aligned to 10ms frames (must be divisible by 100)",
            ),
            Self::UnsupportedChannels { channels } => write!(
                f,
                "unsupported channel count {channels}; expected 1..={MAX_CHANNELS}",
            ),
        }
    }
}

impl std::error::Error for StreamFormatError {}

/// Sample rate and channel count of a farend or nearend stream.
///
/// Invariants:
/// - `sample_rate_hz` is in `8000..=384000`.
/// - `sample_rate_hz` is divisible by `100` (exact 10ms frames).
/// - `channels` is 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    sample_rate_hz: NonZeroU32,
    channels: usize,
}

impl StreamFormat {
    pub fn new(sample_rate_hz: u32, channels: usize) -> Result<Self, StreamFormatError> {
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(StreamFormatError::UnsupportedChannels { channels });
        }
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
            return Err(StreamFormatError::UnsupportedSampleRate { sample_rate_hz });
        }
        if !sample_rate_hz.is_multiple_of(100) {
            return Err(StreamFormatError::Non10msAlignedSampleRate { sample_rate_hz });
        }
        let Some(sample_rate_hz) = NonZeroU32::new(sample_rate_hz) else {
            return Err(StreamFormatError::UnsupportedSampleRate { sample_rate_hz });
        };
        Ok(Self {
            sample_rate_hz,
            channels,
        })
    }

    /// The sampling rate in Hz.
    pub const fn sample_rate_hz(self) -> u32 {
        self.sample_rate_hz.get()
    }

    /// The number of interleaved channels.
    pub const fn channels(self) -> usize {
        self.channels
    }

    /// Frames per 10ms chunk.
    pub const fn frames_per_10ms(self) -> usize {
        self.sample_rate_hz.get() as usize / 100
    }

    /// Bytes of interleaved S16 PCM per 10ms chunk.
    pub const fn bytes_per_10ms(self) -> usize {
        self.frames_per_10ms() * self.channels * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_sample_rate() {
        assert_eq!(
            StreamFormat::new(7_900, 1).unwrap_err(),
            StreamFormatError::UnsupportedSampleRate {
                sample_rate_hz: 7_900,
            }
        );
        assert_eq!(
            StreamFormat::new(384_100, 1).unwrap_err(),
            StreamFormatError::UnsupportedSampleRate {
                sample_rate_hz: 384_100,
            }
        );
    }

    #[test]
    fn rejects_non_10ms_aligned_rate() {
        assert_eq!(
            StreamFormat::new(44_101, 2).unwrap_err(),
            StreamFormatError::Non10msAlignedSampleRate {
                sample_rate_hz: 44_101,
            }
        );
    }

    #[test]
    fn rejects_multichannel() {
        assert_eq!(
            StreamFormat::new(48_000, 0).unwrap_err(),
            StreamFormatError::UnsupportedChannels { channels: 0 }
        );
        assert_eq!(
            StreamFormat::new(48_000, 6).unwrap_err(),
            StreamFormatError::UnsupportedChannels { channels: 6 }
        );
    }

    #[test]
    fn accepts_valid_values() {
        let format = StreamFormat::new(44_100, 2).unwrap();
        assert_eq!(format.sample_rate_hz(), 44_100);
        assert_eq!(format.channels(), 2);
        assert_eq!(format.frames_per_10ms(), 441);
        assert_eq!(format.bytes_per_10ms(), 1764);
    }
}
