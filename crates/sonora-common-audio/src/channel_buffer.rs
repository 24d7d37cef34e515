//! Multi-channel, multi-band sample storage.
//!
//! The buffer stores audio data in a single contiguous allocation, laid out as:
//!
//! ```text
//! [ band0_ch0 | band1_ch0 | band0_ch1 | band1_ch1 ]
//! ```
//!
//! so all bands of one channel are adjacent and `bands(ch)` is also the
//! full-band frame of that channel. [`Bands`] and [`BandsMut`] are the
//! borrowed per-channel views handed to processing engines.

use derive_more::Debug;

/// Multi-channel, optionally multi-band audio buffer.
#[derive(Debug)]
pub struct ChannelBuffer<T> {
    #[debug(skip)]
    data: Vec<T>,
    num_frames: usize,
    num_frames_per_band: usize,
    num_channels: usize,
    num_bands: usize,
}

impl<T: Copy + Default> ChannelBuffer<T> {
    /// Create a new zero-initialized buffer.
    ///
    /// `num_frames` must be divisible by `num_bands`.
    pub fn new(num_frames: usize, num_channels: usize, num_bands: usize) -> Self {
        assert!(num_bands > 0, "num_bands must be > 0");
        assert!(num_channels > 0, "num_channels must be > 0");
        assert!(
            num_frames.is_multiple_of(num_bands),
            "num_frames ({num_frames}) must be divisible by num_bands ({num_bands})"
        );
        Self {
            data: vec![T::default(); num_frames * num_channels],
            num_frames,
            num_frames_per_band: num_frames / num_bands,
            num_channels,
            num_bands,
        }
    }
}

impl<T> ChannelBuffer<T> {
    /// Total number of frames across all bands.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn num_frames_per_band(&self) -> usize {
        self.num_frames_per_band
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    #[inline]
    fn offset(&self, channel: usize, band: usize) -> usize {
        channel * self.num_frames + band * self.num_frames_per_band
    }

    /// Samples of one band of one channel.
    #[inline]
    pub fn channel(&self, band: usize, channel: usize) -> &[T] {
        debug_assert!(band < self.num_bands);
        debug_assert!(channel < self.num_channels);
        let start = self.offset(channel, band);
        &self.data[start..start + self.num_frames_per_band]
    }

    #[inline]
    pub fn channel_mut(&mut self, band: usize, channel: usize) -> &mut [T] {
        debug_assert!(band < self.num_bands);
        debug_assert!(channel < self.num_channels);
        let start = self.offset(channel, band);
        &mut self.data[start..start + self.num_frames_per_band]
    }

    /// All bands of `channel`, concatenated (`num_frames` samples).
    #[inline]
    pub fn bands(&self, channel: usize) -> &[T] {
        debug_assert!(channel < self.num_channels);
        let start = channel * self.num_frames;
        &self.data[start..start + self.num_frames]
    }

    #[inline]
    pub fn bands_mut(&mut self, channel: usize) -> &mut [T] {
        debug_assert!(channel < self.num_channels);
        let start = channel * self.num_frames;
        &mut self.data[start..start + self.num_frames]
    }

    /// Band-indexed view over one channel.
    #[inline]
    pub fn band_view(&self, channel: usize) -> Bands<'_, T> {
        Bands {
            data: self.bands(channel),
            num_frames_per_band: self.num_frames_per_band,
        }
    }

    /// Mutable band-indexed view over one channel.
    #[inline]
    pub fn band_view_mut(&mut self, channel: usize) -> BandsMut<'_, T> {
        let num_frames_per_band = self.num_frames_per_band;
        BandsMut {
            data: self.bands_mut(channel),
            num_frames_per_band,
        }
    }

    /// Raw access to the underlying data.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// Read-only view of the bands of one channel.
#[derive(Debug, Clone, Copy)]
pub struct Bands<'a, T> {
    #[debug(skip)]
    data: &'a [T],
    num_frames_per_band: usize,
}

impl<'a, T> Bands<'a, T> {
    /// Wraps `data` split into bands of `num_frames_per_band` samples.
    pub fn new(data: &'a [T], num_frames_per_band: usize) -> Self {
        assert!(num_frames_per_band > 0, "num_frames_per_band must be > 0");
        assert!(
            data.len().is_multiple_of(num_frames_per_band),
            "band data ({}) must be a multiple of the band size ({num_frames_per_band})",
            data.len()
        );
        Self {
            data,
            num_frames_per_band,
        }
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.data.len() / self.num_frames_per_band
    }

    #[inline]
    pub fn num_frames_per_band(&self) -> usize {
        self.num_frames_per_band
    }

    #[inline]
    pub fn band(&self, band: usize) -> &'a [T] {
        let start = band * self.num_frames_per_band;
        &self.data[start..start + self.num_frames_per_band]
    }

    /// Iterates over the bands, lowest frequency first.
    pub fn iter(&self) -> impl Iterator<Item = &'a [T]> + use<'a, T> {
        self.data.chunks_exact(self.num_frames_per_band)
    }

    /// All bands concatenated.
    #[inline]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }
}

/// Mutable view of the bands of one channel.
#[derive(Debug)]
pub struct BandsMut<'a, T> {
    #[debug(skip)]
    data: &'a mut [T],
    num_frames_per_band: usize,
}

impl<'a, T> BandsMut<'a, T> {
    /// Wraps `data` split into bands of `num_frames_per_band` samples.
    pub fn new(data: &'a mut [T], num_frames_per_band: usize) -> Self {
        assert!(num_frames_per_band > 0, "num_frames_per_band must be > 0");
        assert!(
            data.len().is_multiple_of(num_frames_per_band),
            "band data ({}) must be a multiple of the band size ({num_frames_per_band})",
            data.len()
        );
        Self {
            data,
            num_frames_per_band,
        }
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.data.len() / self.num_frames_per_band
    }

    #[inline]
    pub fn num_frames_per_band(&self) -> usize {
        self.num_frames_per_band
    }

    #[inline]
    pub fn band(&self, band: usize) -> &[T] {
        let start = band * self.num_frames_per_band;
        &self.data[start..start + self.num_frames_per_band]
    }

    #[inline]
    pub fn band_mut(&mut self, band: usize) -> &mut [T] {
        let start = band * self.num_frames_per_band;
        &mut self.data[start..start + self.num_frames_per_band]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.data.chunks_exact_mut(self.num_frames_per_band)
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }

    /// Reborrow as a read-only view.
    #[inline]
    pub fn as_bands(&self) -> Bands<'_, T> {
        Bands {
            data: self.data,
            num_frames_per_band: self.num_frames_per_band,
        }
    }
}

impl<T: Copy> BandsMut<'_, T> {
    /// Overwrites these bands with `src`.
    ///
    /// # Panics
    ///
    /// Panics if the band layouts differ.
    pub fn copy_from(&mut self, src: Bands<'_, T>) {
        assert_eq!(
            self.num_frames_per_band, src.num_frames_per_band,
            "band size mismatch"
        );
        self.data.copy_from_slice(src.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_band_dimensions() {
        let buf = ChannelBuffer::<f32>::new(480, 2, 1);
        assert_eq!(buf.num_frames(), 480);
        assert_eq!(buf.num_frames_per_band(), 480);
        assert_eq!(buf.num_channels(), 2);
        assert_eq!(buf.num_bands(), 1);
        assert_eq!(buf.data().len(), 960);
    }

    #[test]
    fn multi_band_layout() {
        // 2 channels, 2 bands, 4 frames total (2 per band)
        let mut buf = ChannelBuffer::<i16>::new(4, 2, 2);
        buf.channel_mut(0, 0).copy_from_slice(&[1, 2]);
        buf.channel_mut(1, 0).copy_from_slice(&[3, 4]);
        buf.channel_mut(0, 1).copy_from_slice(&[5, 6]);
        buf.channel_mut(1, 1).copy_from_slice(&[7, 8]);

        assert_eq!(buf.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(buf.bands(0), &[1, 2, 3, 4]);
        assert_eq!(buf.bands(1), &[5, 6, 7, 8]);
    }

    #[test]
    fn band_view_indexes_bands() {
        let mut buf = ChannelBuffer::<i16>::new(480, 1, 3);
        buf.channel_mut(2, 0).fill(7);

        let view = buf.band_view(0);
        assert_eq!(view.num_bands(), 3);
        assert_eq!(view.num_frames_per_band(), 160);
        assert!(view.band(0).iter().all(|&s| s == 0));
        assert!(view.band(2).iter().all(|&s| s == 7));
        assert_eq!(view.iter().count(), 3);
    }

    #[test]
    fn band_view_mut_writes_through() {
        let mut buf = ChannelBuffer::<f32>::new(320, 1, 2);
        {
            let mut view = buf.band_view_mut(0);
            view.band_mut(1).fill(1.5);
            assert_eq!(view.as_bands().band(1)[0], 1.5);
        }
        assert!(buf.channel(1, 0).iter().all(|&s| s == 1.5));
        assert!(buf.channel(0, 0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn copy_from_overwrites_all_bands() {
        let src_data = [1i16, 2, 3, 4, 5, 6];
        let src = Bands::new(&src_data, 2);
        let mut dst_data = [0i16; 6];
        BandsMut::new(&mut dst_data, 2).copy_from(src);
        assert_eq!(dst_data, src_data);
    }

    #[test]
    #[should_panic(expected = "divisible by num_bands")]
    fn non_divisible_frames_panics() {
        let _ = ChannelBuffer::<f32>::new(481, 1, 3);
    }

    #[test]
    #[should_panic(expected = "multiple of the band size")]
    fn bands_reject_ragged_data() {
        let data = [0i16; 5];
        let _ = Bands::new(&data, 2);
    }
}
