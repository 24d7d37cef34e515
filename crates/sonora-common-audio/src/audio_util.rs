//! Sample format conversions and interleaved channel mapping.
//!
//! # Format conventions
//!
//! | Name      | Type    | Range                          |
//! |-----------|---------|--------------------------------|
//! | S16       | `i16`   | \[-32768, 32767\]              |
//! | Float     | `f32`   | \[-1.0, 1.0\]                  |
//! | FloatS16  | `f32`   | \[-32768.0, 32768.0\]          |
//!
//! PCM byte streams are native-endian S16, as they come off a capture device
//! or a raw `.pcm` file.

const S16_TO_FLOAT_SCALING: f32 = 1.0 / 32768.0;

// ── Scalar conversions ──────────────────────────────────────────────

/// Convert a single S16 sample to Float \[-1.0, 1.0\].
#[inline]
pub fn s16_to_float(v: i16) -> f32 {
    f32::from(v) * S16_TO_FLOAT_SCALING
}

/// Convert a single FloatS16 sample to S16, rounding to nearest.
#[inline]
pub fn float_s16_to_s16(v: f32) -> i16 {
    let v = v.clamp(-32768.0, 32767.0);
    (v + f32::copysign(0.5, v)) as i16
}

/// Convert a single Float \[-1.0, 1.0\] sample to S16.
#[inline]
pub fn float_to_s16(v: f32) -> i16 {
    float_s16_to_s16(v * 32768.0)
}

// ── PCM bytes ───────────────────────────────────────────────────────

/// Decode native-endian S16 PCM bytes into `dest`.
///
/// Decodes `min(src.len() / 2, dest.len())` samples and returns that count.
/// A trailing odd byte is ignored.
pub fn s16_from_bytes(src: &[u8], dest: &mut [i16]) -> usize {
    let mut count = 0;
    for (slot, pair) in dest.iter_mut().zip(src.chunks_exact(2)) {
        *slot = i16::from_ne_bytes([pair[0], pair[1]]);
        count += 1;
    }
    count
}

/// View S16 samples as native-endian PCM bytes.
#[inline]
pub fn s16_as_bytes(samples: &[i16]) -> &[u8] {
    bytemuck::cast_slice(samples)
}

// ── Stereo split / merge ────────────────────────────────────────────

/// Deinterleave stereo samples into `left` and `right`.
///
/// Processes `min(interleaved.len(), 2 * min(left.len(), right.len()))`
/// samples rounded down to an even count and returns the number of samples
/// written to each channel.
///
/// ```text
/// [L0, R0, L1, R1, L2] -> left [L0, L1], right [R0, R1]
/// ```
pub fn split_stereo<T: Copy>(interleaved: &[T], left: &mut [T], right: &mut [T]) -> usize {
    let frames = (interleaved.len() / 2).min(left.len()).min(right.len());
    for (i, frame) in interleaved.chunks_exact(2).take(frames).enumerate() {
        left[i] = frame[0];
        right[i] = frame[1];
    }
    frames
}

/// Interleave `left` and `right` into `interleaved`.
///
/// Writes `2 * min(left.len(), right.len(), interleaved.len() / 2)` samples
/// and returns that count.
pub fn merge_stereo<T: Copy>(left: &[T], right: &[T], interleaved: &mut [T]) -> usize {
    let frames = left.len().min(right.len()).min(interleaved.len() / 2);
    for (i, frame) in interleaved.chunks_exact_mut(2).take(frames).enumerate() {
        frame[0] = left[i];
        frame[1] = right[i];
    }
    frames * 2
}

/// Map interleaved S16 audio between mono and stereo.
///
/// Mono to stereo duplicates each sample; stereo to mono averages the two
/// channels with an `i32` accumulator. Equal channel counts copy. Returns
/// the number of samples written to `dest`.
///
/// # Panics
///
/// Panics if either channel count is not 1 or 2.
pub fn remap_channels(
    src: &[i16],
    src_channels: usize,
    dst_channels: usize,
    dest: &mut [i16],
) -> usize {
    assert!(
        (1..=2).contains(&src_channels) && (1..=2).contains(&dst_channels),
        "only mono and stereo are supported ({src_channels} -> {dst_channels})"
    );
    match (src_channels, dst_channels) {
        (1, 2) => {
            let frames = src.len().min(dest.len() / 2);
            for (frame, &s) in dest.chunks_exact_mut(2).zip(&src[..frames]) {
                frame[0] = s;
                frame[1] = s;
            }
            frames * 2
        }
        (2, 1) => {
            let frames = (src.len() / 2).min(dest.len());
            for (slot, frame) in dest.iter_mut().zip(src.chunks_exact(2)).take(frames) {
                let acc = i32::from(frame[0]) + i32::from(frame[1]);
                *slot = (acc / 2) as i16;
            }
            frames
        }
        _ => {
            let n = src.len().min(dest.len());
            dest[..n].copy_from_slice(&src[..n]);
            n
        }
    }
}
