//! Paired fixed-point / floating-point channel storage.
//!
//! [`IfChannelBuffer`] keeps an `i16` and a FloatS16 `f32` copy of the same
//! audio and converts lazily: taking a mutable view of one representation
//! invalidates the other, and the next read of the other converts on demand.

use std::fmt;

use derive_more::Debug;

use crate::audio_util::float_s16_to_s16;
use crate::channel_buffer::ChannelBuffer;

/// Channel buffer readable and writable as either `i16` or FloatS16 `f32`.
#[derive(Debug)]
pub struct IfChannelBuffer {
    ivalid: bool,
    ibuf: ChannelBuffer<i16>,
    fvalid: bool,
    fbuf: ChannelBuffer<f32>,
}

impl IfChannelBuffer {
    pub fn new(num_frames: usize, num_channels: usize, num_bands: usize) -> Self {
        Self {
            ivalid: true,
            ibuf: ChannelBuffer::new(num_frames, num_channels, num_bands),
            fvalid: true,
            fbuf: ChannelBuffer::new(num_frames, num_channels, num_bands),
        }
    }

    /// Mutable `i16` view. The float view is stale until next requested.
    pub fn ibuf(&mut self) -> &mut ChannelBuffer<i16> {
        self.refresh_i();
        self.fvalid = false;
        &mut self.ibuf
    }

    /// Mutable FloatS16 view. The `i16` view is stale until next requested.
    pub fn fbuf(&mut self) -> &mut ChannelBuffer<f32> {
        self.refresh_f();
        self.ivalid = false;
        &mut self.fbuf
    }

    /// Up-to-date `i16` view without invalidating the float view.
    pub fn ibuf_const(&mut self) -> &ChannelBuffer<i16> {
        self.refresh_i();
        &self.ibuf
    }

    /// Up-to-date FloatS16 view without invalidating the `i16` view.
    pub fn fbuf_const(&mut self) -> &ChannelBuffer<f32> {
        self.refresh_f();
        &self.fbuf
    }

    pub fn num_frames(&self) -> usize {
        self.ibuf.num_frames()
    }

    pub fn num_frames_per_band(&self) -> usize {
        self.ibuf.num_frames_per_band()
    }

    pub fn num_channels(&self) -> usize {
        self.ibuf.num_channels()
    }

    pub fn num_bands(&self) -> usize {
        self.ibuf.num_bands()
    }

    fn refresh_f(&mut self) {
        if !self.fvalid {
            debug_assert!(self.ivalid);
            for (dst, &src) in self.fbuf.data_mut().iter_mut().zip(self.ibuf.data()) {
                *dst = f32::from(src);
            }
            self.fvalid = true;
        }
    }

    fn refresh_i(&mut self) {
        if !self.ivalid {
            debug_assert!(self.fvalid);
            for (dst, &src) in self.ibuf.data_mut().iter_mut().zip(self.fbuf.data()) {
                *dst = float_s16_to_s16(src);
            }
            self.ivalid = true;
        }
    }
}

/// Sample representation an engine works in.
///
/// Implemented for `i16` (fixed point) and `f32` (FloatS16).
pub trait Sample: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// Read-only view of `buf` in this representation.
    fn view(buf: &mut IfChannelBuffer) -> &ChannelBuffer<Self>;

    /// Mutable view of `buf` in this representation.
    fn view_mut(buf: &mut IfChannelBuffer) -> &mut ChannelBuffer<Self>;
}

impl Sample for i16 {
    fn view(buf: &mut IfChannelBuffer) -> &ChannelBuffer<Self> {
        buf.ibuf_const()
    }

    fn view_mut(buf: &mut IfChannelBuffer) -> &mut ChannelBuffer<Self> {
        buf.ibuf()
    }
}

impl Sample for f32 {
    fn view(buf: &mut IfChannelBuffer) -> &ChannelBuffer<Self> {
        buf.fbuf_const()
    }

    fn view_mut(buf: &mut IfChannelBuffer) -> &mut ChannelBuffer<Self> {
        buf.fbuf()
    }
}
