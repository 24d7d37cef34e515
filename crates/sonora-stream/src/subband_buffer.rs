//! One channel of one frame, in full-band and band-split form.

use derive_more::Debug;
use sonora_common_audio::channel_buffer::{Bands, BandsMut};
use sonora_common_audio::if_channel_buffer::{IfChannelBuffer, Sample};

use crate::error::ConfigError;
use crate::splitting_filter::SplittingFilter;

/// Number of bands a frame at `processing_rate_hz` is split into.
///
/// 1 band up to 8 kHz, then one band per 16 kHz.
pub fn num_bands_for_rate(processing_rate_hz: u32) -> usize {
    if processing_rate_hz <= 8000 {
        1
    } else {
        (processing_rate_hz / 16000) as usize
    }
}

/// Full-band frame plus its band-split form for a single channel.
///
/// With one band the band views alias the full-band storage and
/// [`analysis`](Self::analysis) / [`synthesis`](Self::synthesis) do nothing.
/// With two or three bands, writes to the band views only reach the
/// full-band frame after `synthesis`, which [`read_into`](Self::read_into)
/// always runs.
#[derive(Debug)]
pub struct SubbandBuffer {
    #[debug(skip)]
    data: IfChannelBuffer,
    #[debug(skip)]
    bands: Option<IfChannelBuffer>,
    filter: Option<SplittingFilter>,
}

impl SubbandBuffer {
    pub fn new(num_frames: usize, num_bands: usize) -> Result<Self, ConfigError> {
        if !(1..=3).contains(&num_bands) || !num_frames.is_multiple_of(num_bands) {
            return Err(ConfigError::UnsupportedBandCount { num_bands });
        }
        let (bands, filter) = if num_bands == 1 {
            (None, None)
        } else {
            (
                Some(IfChannelBuffer::new(num_frames, 1, num_bands)),
                Some(SplittingFilter::new(1, num_bands)),
            )
        };
        Ok(Self {
            data: IfChannelBuffer::new(num_frames, 1, 1),
            bands,
            filter,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.data.num_frames()
    }

    pub fn num_bands(&self) -> usize {
        self.bands.as_ref().map_or(1, IfChannelBuffer::num_bands)
    }

    /// Load one full-band frame and split it.
    ///
    /// Samples beyond `frame.len()` are zeroed.
    pub fn fill(&mut self, frame: &[i16]) {
        let dest = self.data.ibuf().bands_mut(0);
        let n = frame.len().min(dest.len());
        dest[..n].copy_from_slice(&frame[..n]);
        dest[n..].fill(0);
        self.analysis();
    }

    /// Full band into bands.
    pub fn analysis(&mut self) {
        if let (Some(filter), Some(bands)) = (self.filter.as_mut(), self.bands.as_mut()) {
            filter.analysis(self.data.fbuf_const(), bands.fbuf());
        }
    }

    /// Bands into full band.
    pub fn synthesis(&mut self) {
        if let (Some(filter), Some(bands)) = (self.filter.as_mut(), self.bands.as_mut()) {
            filter.synthesis(bands.fbuf_const(), self.data.fbuf());
        }
    }

    /// Merge the bands and copy the full-band frame into `out`.
    ///
    /// Returns the number of samples copied.
    pub fn read_into(&mut self, out: &mut [i16]) -> usize {
        self.synthesis();
        let src = self.data.ibuf_const().bands(0);
        let n = src.len().min(out.len());
        out[..n].copy_from_slice(&src[..n]);
        n
    }

    /// Band-domain view in the `S` representation.
    pub fn bands<S: Sample>(&mut self) -> Bands<'_, S> {
        S::view(self.band_storage()).band_view(0)
    }

    /// Mutable band-domain view in the `S` representation.
    pub fn bands_mut<S: Sample>(&mut self) -> BandsMut<'_, S> {
        S::view_mut(self.band_storage()).band_view_mut(0)
    }

    fn band_storage(&mut self) -> &mut IfChannelBuffer {
        match self.bands.as_mut() {
            Some(bands) => bands,
            None => &mut self.data,
        }
    }
}
