//! Farend / nearend intake: channel remap, rate adaptation and ring storage.

use derive_more::Debug;
use sonora_common_audio::audio_util::{remap_channels, s16_as_bytes, s16_from_bytes};
use sonora_common_audio::rate_adapter::{RateAdapter, RateAdapterError};
use sonora_ring_buffer::{RingBuffer, RingBufferError};

use crate::error::{ConfigError, Error};
use crate::stream_format::StreamFormat;

/// Adapter from `input_rate` to `output_rate`, or `None` when they match.
pub(super) fn adapter_for(
    input_rate: u32,
    output_rate: u32,
    channels: usize,
) -> Result<Option<RateAdapter>, RateAdapterError> {
    if input_rate == output_rate {
        return Ok(None);
    }
    RateAdapter::new(input_rate, output_rate, channels).map(Some)
}

/// Allocate one direction's ring buffer.
pub(super) fn allocate_ring(size: usize) -> Result<RingBuffer, Error> {
    RingBuffer::with_capacity(size).map_err(|e| match e {
        RingBufferError::InvalidSize { size } => ConfigError::RingBufferSize { size }.into(),
        RingBufferError::Allocation { size } => Error::Allocation { bytes: size },
    })
}

/// Incoming PCM for one direction, stored at the processing format.
#[derive(Debug)]
pub(super) struct Intake {
    format: StreamFormat,
    processing_rate_hz: u32,
    processing_channels: usize,
    adapter: Option<RateAdapter>,
    ring: RingBuffer,
    /// Bytes of an incomplete input frame.
    #[debug(skip)]
    carry: Vec<u8>,
    #[debug(skip)]
    decoded: Vec<i16>,
    #[debug(skip)]
    remapped: Vec<i16>,
    #[debug(skip)]
    adapted: Vec<i16>,
}

impl Intake {
    pub(super) fn new(
        format: StreamFormat,
        processing_rate_hz: u32,
        processing_channels: usize,
        ring: RingBuffer,
    ) -> Result<Self, Error> {
        let adapter = adapter_for(
            format.sample_rate_hz(),
            processing_rate_hz,
            processing_channels,
        )?;
        Ok(Self {
            format,
            processing_rate_hz,
            processing_channels,
            adapter,
            ring,
            carry: Vec::new(),
            decoded: Vec::new(),
            remapped: Vec::new(),
            adapted: Vec::new(),
        })
    }

    /// Switch to a new input format, dropping everything buffered.
    pub(super) fn set_format(&mut self, format: StreamFormat) -> Result<(), Error> {
        self.adapter = adapter_for(
            format.sample_rate_hz(),
            self.processing_rate_hz,
            self.processing_channels,
        )?;
        self.format = format;
        self.flush();
        Ok(())
    }

    /// Convert `bytes` to the processing format and queue them.
    ///
    /// Returns the number of converted bytes that did not fit in the ring.
    pub(super) fn push(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let in_channels = self.format.channels();
        self.carry.extend_from_slice(bytes);
        let whole = self.carry.len() - self.carry.len() % (in_channels * 2);

        self.decoded.resize(whole / 2, 0);
        s16_from_bytes(&self.carry[..whole], &mut self.decoded);
        self.carry.drain(..whole);

        let frames = self.decoded.len() / in_channels;
        self.remapped.resize(frames * self.processing_channels, 0);
        remap_channels(
            &self.decoded,
            in_channels,
            self.processing_channels,
            &mut self.remapped,
        );

        let samples: &[i16] = match self.adapter.as_mut() {
            Some(adapter) => {
                self.adapted.clear();
                adapter.process(&self.remapped, &mut self.adapted)?;
                &self.adapted
            }
            None => &self.remapped,
        };
        let converted = s16_as_bytes(samples);

        // Keep the ring frame-aligned when it runs out of room.
        let frame_bytes = self.processing_channels * 2;
        let room = self.ring.free() - self.ring.free() % frame_bytes;
        let written = self.ring.write(&converted[..converted.len().min(room)]);
        Ok(converted.len() - written)
    }

    /// Bytes queued at the processing format.
    pub(super) fn avail(&self) -> usize {
        self.ring.avail()
    }

    /// Read up to `dest.len()` queued bytes.
    pub(super) fn read(&mut self, dest: &mut [u8]) -> usize {
        self.ring.read(dest)
    }

    pub(super) fn flush(&mut self) {
        self.ring.flush();
        self.carry.clear();
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.reset();
        }
    }
}
