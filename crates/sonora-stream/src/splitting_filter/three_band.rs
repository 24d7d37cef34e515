//! 3-band FIR filter bank with DCT modulation.
//!
//! Splits a 480-sample (48 kHz, 10 ms) frame into three 160-sample bands
//! (0-8 kHz, 8-16 kHz, 16-24 kHz) and merges them back. Reconstruction is
//! approximate and delayed.

const SQRT_3: f32 = 1.732_050_8;

const SPARSITY: usize = 4;
const STRIDE_LOG2: usize = 2;
const STRIDE: usize = 1 << STRIDE_LOG2;
const NUM_ZERO_FILTERS: usize = 2;
const FILTER_SIZE: usize = 4;
const MEMORY_SIZE: usize = FILTER_SIZE * STRIDE - 1;

pub(crate) const NUM_BANDS: usize = 3;
pub(crate) const FULL_BAND_SIZE: usize = 480;
pub(crate) const SPLIT_BAND_SIZE: usize = FULL_BAND_SIZE / NUM_BANDS;

const NUM_NON_ZERO_FILTERS: usize = SPARSITY * NUM_BANDS - NUM_ZERO_FILTERS;
const ZERO_FILTER_INDEX_1: usize = 3;
const ZERO_FILTER_INDEX_2: usize = 9;

#[rustfmt::skip]
const FILTER_COEFFS: [[f32; FILTER_SIZE]; NUM_NON_ZERO_FILTERS] = [
    [-0.00047749, -0.00496888, 0.16547118,  0.00425496],
    [-0.00173287, -0.01585778, 0.14989004,  0.00994113],
    [-0.00304815, -0.02536082, 0.12154542,  0.01157993],
    [-0.00346946, -0.02587886, 0.04760441,  0.00607594],
    [-0.00154717, -0.01136076, 0.01387458,  0.00186353],
    [ 0.00186353,  0.01387458,-0.01136076, -0.00154717],
    [ 0.00607594,  0.04760441,-0.02587886, -0.00346946],
    [ 0.00983212,  0.08543175,-0.02982767, -0.00383509],
    [ 0.00994113,  0.14989004,-0.01585778, -0.00173287],
    [ 0.00425496,  0.16547118,-0.00496888, -0.00047749],
];

#[rustfmt::skip]
const DCT_MODULATION: [[f32; NUM_BANDS]; NUM_NON_ZERO_FILTERS] = [
    [ 2.0,     2.0,    2.0],
    [ SQRT_3,  0.0,   -SQRT_3],
    [ 1.0,    -2.0,    1.0],
    [-1.0,     2.0,   -1.0],
    [-SQRT_3,  0.0,    SQRT_3],
    [-2.0,    -2.0,   -2.0],
    [-SQRT_3,  0.0,    SQRT_3],
    [-1.0,     2.0,   -1.0],
    [ 1.0,    -2.0,    1.0],
    [ SQRT_3,  0.0,   -SQRT_3],
];

/// Maps a polyphase index to its filter, skipping the two all-zero filters.
fn filter_index(index: usize) -> Option<usize> {
    match index {
        ZERO_FILTER_INDEX_1 | ZERO_FILTER_INDEX_2 => None,
        i if i < ZERO_FILTER_INDEX_1 => Some(i),
        i if i < ZERO_FILTER_INDEX_2 => Some(i - 1),
        i => Some(i - 2),
    }
}

/// Sparse polyphase FIR over one subsampled frame, carrying `state` between
/// frames.
fn filter_core(
    filter: &[f32; FILTER_SIZE],
    input: &[f32; SPLIT_BAND_SIZE],
    in_shift: usize,
    output: &mut [f32; SPLIT_BAND_SIZE],
    state: &mut [f32; MEMORY_SIZE],
) {
    debug_assert!(in_shift < STRIDE);
    output.fill(0.0);

    // Outputs that only see history.
    for (k, out) in output.iter_mut().enumerate().take(in_shift) {
        let mut j = MEMORY_SIZE + k - in_shift;
        for &coeff in filter {
            *out += state[j] * coeff;
            j = j.wrapping_sub(STRIDE);
        }
    }

    // Outputs that straddle history and the current frame.
    for (shift, k) in (in_shift..FILTER_SIZE * STRIDE).enumerate() {
        let from_input = (1 + (shift >> STRIDE_LOG2)).min(FILTER_SIZE);
        for (i, &coeff) in filter.iter().enumerate() {
            if i < from_input {
                output[k] += input[shift - i * STRIDE] * coeff;
            } else {
                output[k] += state[MEMORY_SIZE + shift - i * STRIDE] * coeff;
            }
        }
    }

    // Outputs fully inside the current frame.
    let mut shift = FILTER_SIZE * STRIDE - in_shift;
    for out in &mut output[FILTER_SIZE * STRIDE..] {
        for (i, &coeff) in filter.iter().enumerate() {
            *out += input[shift - i * STRIDE] * coeff;
        }
        shift += 1;
    }

    state.copy_from_slice(&input[SPLIT_BAND_SIZE - MEMORY_SIZE..]);
}

/// Analysis and synthesis state for one channel.
#[derive(Debug)]
pub(crate) struct ThreeBandFilterBank {
    analysis_state: [[f32; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
    synthesis_state: [[f32; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
}

impl ThreeBandFilterBank {
    pub(crate) fn new() -> Self {
        Self {
            analysis_state: [[0.0; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
            synthesis_state: [[0.0; MEMORY_SIZE]; NUM_NON_ZERO_FILTERS],
        }
    }

    /// `input` (480 samples) into `bands` (3 x 160 samples, concatenated).
    pub(crate) fn analysis(&mut self, input: &[f32], bands: &mut [f32]) {
        debug_assert_eq!(input.len(), FULL_BAND_SIZE);
        debug_assert_eq!(bands.len(), FULL_BAND_SIZE);
        bands.fill(0.0);

        let mut subsampled = [0.0f32; SPLIT_BAND_SIZE];
        let mut filtered = [0.0f32; SPLIT_BAND_SIZE];
        for phase in 0..NUM_BANDS {
            for (k, s) in subsampled.iter_mut().enumerate() {
                *s = input[(NUM_BANDS - 1) - phase + NUM_BANDS * k];
            }

            for in_shift in 0..STRIDE {
                let Some(fi) = filter_index(phase + in_shift * NUM_BANDS) else {
                    continue;
                };
                filter_core(
                    &FILTER_COEFFS[fi],
                    &subsampled,
                    in_shift,
                    &mut filtered,
                    &mut self.analysis_state[fi],
                );
                for (band, &modulation) in bands
                    .chunks_exact_mut(SPLIT_BAND_SIZE)
                    .zip(&DCT_MODULATION[fi])
                {
                    for (b, &f) in band.iter_mut().zip(&filtered) {
                        *b += modulation * f;
                    }
                }
            }
        }
    }

    /// `bands` (3 x 160 samples, concatenated) into `output` (480 samples).
    pub(crate) fn synthesis(&mut self, bands: &[f32], output: &mut [f32]) {
        debug_assert_eq!(bands.len(), FULL_BAND_SIZE);
        debug_assert_eq!(output.len(), FULL_BAND_SIZE);
        output.fill(0.0);

        let mut modulated = [0.0f32; SPLIT_BAND_SIZE];
        let mut filtered = [0.0f32; SPLIT_BAND_SIZE];
        for phase in 0..NUM_BANDS {
            for in_shift in 0..STRIDE {
                let Some(fi) = filter_index(phase + in_shift * NUM_BANDS) else {
                    continue;
                };
                modulated.fill(0.0);
                for (band, &modulation) in bands
                    .chunks_exact(SPLIT_BAND_SIZE)
                    .zip(&DCT_MODULATION[fi])
                {
                    for (m, &b) in modulated.iter_mut().zip(band) {
                        *m += modulation * b;
                    }
                }
                filter_core(
                    &FILTER_COEFFS[fi],
                    &modulated,
                    in_shift,
                    &mut filtered,
                    &mut self.synthesis_state[fi],
                );
                for (k, &f) in filtered.iter().enumerate() {
                    output[phase + NUM_BANDS * k] += NUM_BANDS as f32 * f;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn zero_filters_are_skipped() {
        assert_eq!(filter_index(0), Some(0));
        assert_eq!(filter_index(3), None);
        assert_eq!(filter_index(4), Some(3));
        assert_eq!(filter_index(9), None);
        assert_eq!(filter_index(11), Some(9));
    }

    #[test]
    fn impulse_reaches_the_bands() {
        let mut bank = ThreeBandFilterBank::new();
        let mut input = [0.0f32; FULL_BAND_SIZE];
        input[10] = 1000.0;
        let mut bands = [0.0f32; FULL_BAND_SIZE];
        bank.analysis(&input, &mut bands);
        assert!(bands.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn silence_in_silence_out() {
        let mut bank = ThreeBandFilterBank::new();
        let mut bands = [1.0f32; FULL_BAND_SIZE];
        bank.analysis(&[0.0; FULL_BAND_SIZE], &mut bands);
        assert!(bands.iter().all(|&s| s == 0.0));

        let mut output = [1.0f32; FULL_BAND_SIZE];
        bank.synthesis(&bands, &mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn round_trip_is_a_delayed_copy() {
        let mut bank = ThreeBandFilterBank::new();
        let frames = 10;
        let input: Vec<f32> = (0..frames * FULL_BAND_SIZE)
            .map(|n| (2.0 * PI * 700.0 * n as f32 / 48000.0).sin() * 4000.0)
            .collect();
        let mut output = vec![0.0f32; input.len()];
        let mut bands = [0.0f32; FULL_BAND_SIZE];
        for (frame_in, frame_out) in input
            .chunks_exact(FULL_BAND_SIZE)
            .zip(output.chunks_exact_mut(FULL_BAND_SIZE))
        {
            bank.analysis(frame_in, &mut bands);
            bank.synthesis(&bands, frame_out);
        }

        // Skip the first two frames while the filters settle.
        let settled = 2 * FULL_BAND_SIZE..input.len();
        let energy: f32 = input[settled.clone()].iter().map(|x| x * x).sum();
        let best_err = (0..=64)
            .map(|delay| {
                settled
                    .clone()
                    .map(|n| (output[n] - input[n - delay]).powi(2))
                    .sum::<f32>()
            })
            .fold(f32::INFINITY, f32::min);
        assert!(best_err < energy / 2.0, "err={best_err} energy={energy}");
    }
}
