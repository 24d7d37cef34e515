#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

use derive_more::Debug;

/// Error returned when constructing a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    /// The backing region is not a power of two (or is smaller than 2 bytes).
    InvalidSize { size: usize },
    /// The backing region could not be allocated.
    Allocation { size: usize },
}

impl std::fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::InvalidSize { size } => {
                write!(f, "ring buffer size {size} is not a power of two")
            }
            Self::Allocation { size } => {
                write!(f, "failed to allocate {size} bytes for ring buffer")
            }
        }
    }
}

impl std::error::Error for RingBufferError {}

fn check_size(size: usize) -> Result<(), RingBufferError> {
    if size < 2 || !size.is_power_of_two() {
        return Err(RingBufferError::InvalidSize { size });
    }
    Ok(())
}

/// A fixed-capacity byte FIFO over a power-of-two region.
///
/// One slot is kept empty to tell a full buffer from an empty one, so at most
/// `capacity() - 1` bytes can be queued at any time.
///
/// # Invariants
///
/// - `read_pos` and `write_pos` are always in `0..capacity` (wrapped with
///   the size mask after every transfer).
/// - `avail() + free() == capacity() - 1` always holds.
///
/// The buffer is meant for exactly one writer and one reader. All mutating
/// methods take `&mut self`; sharing across threads goes through an owner
/// that hands the data over (see `sonora-stream`).
#[derive(Debug)]
pub struct RingBuffer<B = Box<[u8]>> {
    #[debug(skip)]
    data: B,
    mask: usize,
    read_pos: usize,
    write_pos: usize,
}

impl RingBuffer {
    /// Allocates a zeroed region of `size` bytes and wraps it.
    ///
    /// The allocation is fallible: a region that cannot be reserved yields
    /// [`RingBufferError::Allocation`] instead of aborting.
    pub fn with_capacity(size: usize) -> Result<Self, RingBufferError> {
        check_size(size)?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| RingBufferError::Allocation { size })?;
        data.resize(size, 0u8);
        Self::new(data.into_boxed_slice())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RingBuffer<B> {
    /// Wraps a caller-provided region. Its length must be a power of two.
    pub fn new(data: B) -> Result<Self, RingBufferError> {
        let size = data.as_ref().len();
        check_size(size)?;
        Ok(Self {
            data,
            mask: size - 1,
            read_pos: 0,
            write_pos: 0,
        })
    }

    /// Size of the backing region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of bytes ready to be read.
    #[inline]
    pub fn avail(&self) -> usize {
        self.write_pos.wrapping_sub(self.read_pos) & self.mask
    }

    /// Number of bytes that can be written before data starts being dropped.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.avail() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Drops all unread data.
    pub fn flush(&mut self) {
        self.read_pos = self.write_pos;
    }

    /// Appends as much of `src` as fits and returns the number of bytes
    /// stored. Bytes beyond [`free`](Self::free) are silently dropped.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let to_write = src.len().min(self.free());
        let start = self.write_pos;
        let first = to_write.min(self.capacity() - start);

        let data = self.data.as_mut();
        data[start..start + first].copy_from_slice(&src[..first]);
        data[..to_write - first].copy_from_slice(&src[first..to_write]);

        self.write_pos = (start + to_write) & self.mask;
        to_write
    }

    /// Copies up to `dest.len()` bytes out of the buffer.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let len = dest.len();
        self.consume(dest, len, |src, dst| {
            dst.copy_from_slice(src);
            src.len()
        })
    }

    /// Drains up to `len` bytes through `process`.
    ///
    /// `process` receives each contiguous run of queued bytes together with
    /// the matching window of `dest`, and returns how many bytes of the run it
    /// consumed. There are at most two runs per call (before and after the
    /// wrap point). Returning `0` stops the drain; only consumed bytes advance
    /// the read cursor and count toward the result.
    pub fn consume<F>(&mut self, dest: &mut [u8], len: usize, mut process: F) -> usize
    where
        F: FnMut(&[u8], &mut [u8]) -> usize,
    {
        let mut remaining = len.min(self.avail()).min(dest.len());
        let mut copied = 0;

        while remaining > 0 {
            let start = self.read_pos;
            let run = remaining.min(self.capacity() - start);
            let consumed = process(
                &self.data.as_ref()[start..start + run],
                &mut dest[copied..copied + run],
            )
            .min(run);
            if consumed == 0 {
                break;
            }
            remaining -= consumed;
            copied += consumed;
            self.read_pos = (start + consumed) & self.mask;
        }

        copied
    }
}
