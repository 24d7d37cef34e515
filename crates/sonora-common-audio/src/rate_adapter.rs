//! Streaming sample-rate conversion for interleaved S16 audio.
//!
//! [`RateAdapter`] accepts chunks of any length, stages them per channel and
//! feeds the resampler in fixed 10 ms blocks. Output is produced as soon as a
//! full block is available, so a call may return nothing and a later call
//! may return more than one block. State persists across calls.

use std::mem;

use derive_more::Debug;
use rubato::{FftFixedIn, ResampleError, Resampler, ResamplerConstructionError};

use crate::audio_util::{float_s16_to_s16, s16_as_bytes, s16_from_bytes};

/// Sub-chunks per FFT block.
const SUB_CHUNKS: usize = 2;

/// Errors from building or running a [`RateAdapter`].
#[derive(Debug)]
pub enum RateAdapterError {
    /// Channel count of zero.
    InvalidChannels { channels: usize },
    /// The resampler rejected the rate pair.
    Construction(ResamplerConstructionError),
    /// The resampler failed while processing.
    Resample(ResampleError),
}

impl std::fmt::Display for RateAdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChannels { channels } => {
                write!(f, "rate adapter needs at least one channel, got {channels}")
            }
            Self::Construction(e) => write!(f, "failed to build resampler: {e}"),
            Self::Resample(e) => write!(f, "resampling failed: {e}"),
        }
    }
}

impl std::error::Error for RateAdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidChannels { .. } => None,
            Self::Construction(e) => Some(e),
            Self::Resample(e) => Some(e),
        }
    }
}

impl From<ResamplerConstructionError> for RateAdapterError {
    fn from(e: ResamplerConstructionError) -> Self {
        Self::Construction(e)
    }
}

impl From<ResampleError> for RateAdapterError {
    fn from(e: ResampleError) -> Self {
        Self::Resample(e)
    }
}

/// Stateful resampler bound to `(input_rate, output_rate, channels)`.
#[derive(Debug)]
pub struct RateAdapter {
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    #[debug(skip)]
    resampler: FftFixedIn<f32>,
    /// Per-channel input waiting for a full block.
    #[debug(skip)]
    staged: Vec<Vec<f32>>,
    #[debug(skip)]
    output: Vec<Vec<f32>>,
    /// Bytes of an incomplete frame from the last `process_bytes` call.
    #[debug(skip)]
    carry: Vec<u8>,
    #[debug(skip)]
    samples_in: Vec<i16>,
    #[debug(skip)]
    samples_out: Vec<i16>,
}

impl RateAdapter {
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
    ) -> Result<Self, RateAdapterError> {
        if channels == 0 {
            return Err(RateAdapterError::InvalidChannels { channels });
        }
        let chunk = (input_rate as usize / 100).max(1);
        let resampler = FftFixedIn::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            chunk,
            SUB_CHUNKS,
            channels,
        )?;
        let max_out = resampler.output_frames_max();
        tracing::debug!(input_rate, output_rate, channels, chunk, "rate adapter created");
        Ok(Self {
            input_rate,
            output_rate,
            channels,
            resampler,
            staged: vec![Vec::with_capacity(chunk * 2); channels],
            output: vec![vec![0.0; max_out]; channels],
            carry: Vec::new(),
            samples_in: Vec::new(),
            samples_out: Vec::new(),
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Resampler latency in output frames.
    pub fn output_delay(&self) -> usize {
        self.resampler.output_delay()
    }

    /// Resample interleaved samples, appending the result to `out`.
    ///
    /// A trailing partial frame in `input` is ignored. Returns the number of
    /// interleaved samples appended.
    pub fn process(
        &mut self,
        input: &[i16],
        out: &mut Vec<i16>,
    ) -> Result<usize, RateAdapterError> {
        let start = out.len();
        for frame in input.chunks_exact(self.channels) {
            for (staged, &s) in self.staged.iter_mut().zip(frame) {
                staged.push(f32::from(s));
            }
        }
        loop {
            let needed = self.resampler.input_frames_next();
            if self.staged[0].len() < needed {
                break;
            }
            let (used, produced) = self.resampler.process_into_buffer(
                self.staged.as_slice(),
                self.output.as_mut_slice(),
                None,
            )?;
            for staged in &mut self.staged {
                staged.drain(..used);
            }
            self.append_output(produced, out);
        }
        Ok(out.len() - start)
    }

    /// Byte-oriented [`process`](Self::process) for native-endian S16 PCM.
    ///
    /// Bytes of an incomplete frame are kept until the next call.
    pub fn process_bytes(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<usize, RateAdapterError> {
        let frame_bytes = self.channels * 2;
        self.carry.extend_from_slice(input);
        let whole = self.carry.len() - self.carry.len() % frame_bytes;

        let mut samples_in = mem::take(&mut self.samples_in);
        samples_in.clear();
        samples_in.resize(whole / 2, 0);
        s16_from_bytes(&self.carry[..whole], &mut samples_in);
        self.carry.drain(..whole);

        let mut samples_out = mem::take(&mut self.samples_out);
        samples_out.clear();
        let result = self.process(&samples_in, &mut samples_out);
        if result.is_ok() {
            out.extend_from_slice(s16_as_bytes(&samples_out));
        }
        self.samples_in = samples_in;
        self.samples_out = samples_out;
        result.map(|n| n * 2)
    }

    /// Push out any staged input, then reset.
    ///
    /// Returns the number of interleaved samples appended to `out`.
    pub fn flush(&mut self, out: &mut Vec<i16>) -> Result<usize, RateAdapterError> {
        let start = out.len();
        if !self.staged[0].is_empty() {
            let (_, produced) = self.resampler.process_partial_into_buffer(
                Some(self.staged.as_slice()),
                self.output.as_mut_slice(),
                None,
            )?;
            self.append_output(produced, out);
        }
        self.reset();
        Ok(out.len() - start)
    }

    /// Drop all staged input and resampler history.
    pub fn reset(&mut self) {
        self.resampler.reset();
        for staged in &mut self.staged {
            staged.clear();
        }
        self.carry.clear();
    }

    fn append_output(&self, frames: usize, out: &mut Vec<i16>) {
        out.reserve(frames * self.channels);
        for i in 0..frames {
            for channel in &self.output {
                out.push(float_s16_to_s16(channel[i]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn sine(rate: u32, freq: f32, frames: usize, channels: usize) -> Vec<i16> {
        let mut out = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let v = (2.0 * PI * freq * i as f32 / rate as f32).sin() * 8000.0;
            for _ in 0..channels {
                out.push(v as i16);
            }
        }
        out
    }

    #[test]
    fn zero_channels_rejected() {
        assert!(matches!(
            RateAdapter::new(16000, 48000, 0),
            Err(RateAdapterError::InvalidChannels { channels: 0 })
        ));
    }

    #[test]
    fn output_length_follows_rate_ratio() {
        let mut adapter = RateAdapter::new(48000, 16000, 1).unwrap();
        let input = sine(48000, 440.0, 48000, 1);
        let mut out = Vec::new();
        for chunk in input.chunks(480) {
            adapter.process(chunk, &mut out).unwrap();
        }
        // One second in: one second out, minus what is still staged.
        assert!(out.len() <= 16000);
        assert!(out.len() >= 16000 - 2 * 160, "got {}", out.len());
    }

    #[test]
    fn short_chunks_accumulate() {
        let mut adapter = RateAdapter::new(16000, 32000, 2).unwrap();
        let input = sine(16000, 300.0, 160, 2);
        let mut out = Vec::new();
        // 30 frames is less than one 10 ms block.
        assert_eq!(0, adapter.process(&input[..60], &mut out).unwrap());
        let n = adapter.process(&input[60..], &mut out).unwrap();
        assert_eq!(n % 2, 0);
        assert!(n > 0);
    }

    #[test]
    fn process_bytes_carries_partial_frames() {
        let mut adapter = RateAdapter::new(8000, 16000, 2).unwrap();
        let input = sine(8000, 200.0, 80, 2);
        let bytes = s16_as_bytes(&input);
        let mut out = Vec::new();
        // Split mid-frame.
        adapter.process_bytes(&bytes[..3], &mut out).unwrap();
        adapter.process_bytes(&bytes[3..], &mut out).unwrap();
        assert_eq!(out.len() % 4, 0);
        assert!(!out.is_empty());
    }

    #[test]
    fn silence_stays_silent() {
        let mut adapter = RateAdapter::new(44100, 16000, 1).unwrap();
        let mut out = Vec::new();
        for _ in 0..20 {
            adapter.process(&[0; 441], &mut out).unwrap();
        }
        assert!(!out.is_empty());
        assert!(out.iter().all(|&s| s == 0));
    }

    #[test]
    fn flush_drains_staged_input() {
        let mut adapter = RateAdapter::new(16000, 16100, 1).unwrap();
        let mut out = Vec::new();
        adapter.process(&sine(16000, 500.0, 100, 1), &mut out).unwrap();
        assert!(out.is_empty());
        assert!(adapter.flush(&mut out).unwrap() > 0);

        // Reset: staged input is gone.
        let mut again = Vec::new();
        assert_eq!(0, adapter.flush(&mut again).unwrap());
    }
}
