//! Band-splitting filter for 2-band (32 kHz) and 3-band (48 kHz) frames.
//!
//! - **2 bands**: 320 samples into 2 x 160 with an allpass QMF pair.
//! - **3 bands**: 480 samples into 3 x 160 with a DCT-modulated FIR bank.
//!
//! Call [`SplittingFilter::analysis`] to split a frame and
//! [`SplittingFilter::synthesis`] to merge it back. Each channel carries
//! its own filter state across frames.

mod three_band;

use sonora_common_audio::channel_buffer::ChannelBuffer;

use self::three_band::ThreeBandFilterBank;

/// Samples per band for both supported layouts.
pub const SAMPLES_PER_BAND: usize = 160;

const ALL_PASS_COEFFS_1: [f32; 3] = [0.097_930_908_2, 0.564_300_537_1, 0.873_733_520_5];
const ALL_PASS_COEFFS_2: [f32; 3] = [0.325_515_747_07, 0.748_626_708_98, 0.961_456_298_82];

/// Three cascaded first-order sections, two state values each.
const QMF_STATE_SIZE: usize = 6;

type QmfState = [f32; QMF_STATE_SIZE];

/// Runs `data` through three cascaded allpass sections
/// `y[n] = x[n-1] + a * (x[n] - y[n-1])`, ping-ponging between `data` and
/// `scratch`. The result ends up in `scratch`.
fn allpass_qmf(data: &mut [f32], scratch: &mut [f32], coeffs: &[f32; 3], state: &mut QmfState) {
    debug_assert_eq!(data.len(), scratch.len());
    debug_assert!(!data.is_empty());

    fn section(input: &[f32], output: &mut [f32], a: f32, state: &mut [f32]) {
        let last = input.len() - 1;
        output[0] = state[0] + a * (input[0] - state[1]);
        for k in 1..input.len() {
            output[k] = input[k - 1] + a * (input[k] - output[k - 1]);
        }
        state[0] = input[last];
        state[1] = output[last];
    }

    section(data, scratch, coeffs[0], &mut state[0..2]);
    section(scratch, data, coeffs[1], &mut state[2..4]);
    section(data, scratch, coeffs[2], &mut state[4..6]);
}

#[derive(Debug, Default)]
struct QmfPair {
    analysis: [QmfState; 2],
    synthesis: [QmfState; 2],
}

impl QmfPair {
    fn analysis(&mut self, input: &[f32], low: &mut [f32], high: &mut [f32]) {
        let half = input.len() / 2;
        debug_assert!(half <= SAMPLES_PER_BAND);
        debug_assert_eq!(low.len(), half);
        debug_assert_eq!(high.len(), half);

        let mut odd = [0.0f32; SAMPLES_PER_BAND];
        let mut even = [0.0f32; SAMPLES_PER_BAND];
        for (i, pair) in input.chunks_exact(2).enumerate() {
            even[i] = pair[0];
            odd[i] = pair[1];
        }

        let mut odd_filtered = [0.0f32; SAMPLES_PER_BAND];
        let mut even_filtered = [0.0f32; SAMPLES_PER_BAND];
        let [state1, state2] = &mut self.analysis;
        allpass_qmf(&mut odd[..half], &mut odd_filtered[..half], &ALL_PASS_COEFFS_1, state1);
        allpass_qmf(&mut even[..half], &mut even_filtered[..half], &ALL_PASS_COEFFS_2, state2);

        for i in 0..half {
            low[i] = (odd_filtered[i] + even_filtered[i]) * 0.5;
            high[i] = (odd_filtered[i] - even_filtered[i]) * 0.5;
        }
    }

    fn synthesis(&mut self, low: &[f32], high: &[f32], output: &mut [f32]) {
        let half = low.len();
        debug_assert!(half <= SAMPLES_PER_BAND);
        debug_assert_eq!(high.len(), half);
        debug_assert_eq!(output.len(), half * 2);

        let mut sum = [0.0f32; SAMPLES_PER_BAND];
        let mut diff = [0.0f32; SAMPLES_PER_BAND];
        for i in 0..half {
            sum[i] = low[i] + high[i];
            diff[i] = low[i] - high[i];
        }

        let mut sum_filtered = [0.0f32; SAMPLES_PER_BAND];
        let mut diff_filtered = [0.0f32; SAMPLES_PER_BAND];
        let [state1, state2] = &mut self.synthesis;
        allpass_qmf(&mut sum[..half], &mut sum_filtered[..half], &ALL_PASS_COEFFS_2, state1);
        allpass_qmf(&mut diff[..half], &mut diff_filtered[..half], &ALL_PASS_COEFFS_1, state2);

        // Interleave, saturating to the S16 range.
        for (i, pair) in output.chunks_exact_mut(2).enumerate() {
            pair[0] = diff_filtered[i].clamp(-32768.0, 32767.0);
            pair[1] = sum_filtered[i].clamp(-32768.0, 32767.0);
        }
    }
}

#[derive(Debug)]
enum Banks {
    Two(Vec<QmfPair>),
    Three(Vec<ThreeBandFilterBank>),
}

/// Splits full-band frames into bands and merges them back.
#[derive(Debug)]
pub struct SplittingFilter {
    banks: Banks,
}

impl SplittingFilter {
    /// # Panics
    ///
    /// Panics unless `num_bands` is 2 or 3.
    pub fn new(num_channels: usize, num_bands: usize) -> Self {
        let banks = match num_bands {
            2 => Banks::Two((0..num_channels).map(|_| QmfPair::default()).collect()),
            3 => Banks::Three((0..num_channels).map(|_| ThreeBandFilterBank::new()).collect()),
            n => panic!("splitting filter supports 2 or 3 bands, got {n}"),
        };
        Self { banks }
    }

    pub fn num_bands(&self) -> usize {
        match self.banks {
            Banks::Two(_) => 2,
            Banks::Three(_) => 3,
        }
    }

    /// Split each channel of `data` into the bands of `bands`.
    pub fn analysis(&mut self, data: &ChannelBuffer<f32>, bands: &mut ChannelBuffer<f32>) {
        debug_assert_eq!(bands.num_bands(), self.num_bands());
        debug_assert_eq!(data.num_channels(), bands.num_channels());
        debug_assert_eq!(data.num_frames(), bands.num_frames());

        match &mut self.banks {
            Banks::Two(pairs) => {
                for (ch, pair) in pairs.iter_mut().enumerate().take(data.num_channels()) {
                    let mut out = bands.band_view_mut(ch);
                    let (low, high) = out.as_mut_slice().split_at_mut(data.num_frames() / 2);
                    pair.analysis(data.bands(ch), low, high);
                }
            }
            Banks::Three(banks) => {
                for (ch, bank) in banks.iter_mut().enumerate().take(data.num_channels()) {
                    bank.analysis(data.bands(ch), bands.bands_mut(ch));
                }
            }
        }
    }

    /// Merge the bands of each channel of `bands` into `data`.
    pub fn synthesis(&mut self, bands: &ChannelBuffer<f32>, data: &mut ChannelBuffer<f32>) {
        debug_assert_eq!(bands.num_bands(), self.num_bands());
        debug_assert_eq!(data.num_channels(), bands.num_channels());
        debug_assert_eq!(data.num_frames(), bands.num_frames());

        match &mut self.banks {
            Banks::Two(pairs) => {
                for (ch, pair) in pairs.iter_mut().enumerate().take(data.num_channels()) {
                    let view = bands.band_view(ch);
                    pair.synthesis(view.band(0), view.band(1), data.bands_mut(ch));
                }
            }
            Banks::Three(banks) => {
                for (ch, bank) in banks.iter_mut().enumerate().take(data.num_channels()) {
                    bank.synthesis(bands.bands(ch), data.bands_mut(ch));
                }
            }
        }
    }
}
