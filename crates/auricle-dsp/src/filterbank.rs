//! Hybrid time-frequency transform.
//!
//! A weighted overlap-add STFT (hop 128, FFT 256, square-root Hann analysis
//! and synthesis windows) turns fixed-size time-domain blocks into complex
//! bins × time-slots per channel and back. On top of the uniform bins sits a
//! *hybrid* band map: single-bin bands at low frequencies and progressively
//! wider bin groups above, so the band set is finer where spatial hearing is
//! most sensitive. Panning gains are computed per band and applied to every
//! bin the band covers.
//!
//! The transform introduces a fixed latency of `FFT_SIZE - HOP_SIZE` samples.

use crate::error::{Error, Result};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// STFT hop size in time-domain samples.
pub const HOP_SIZE: usize = 128;

/// FFT length (50% overlap).
pub const FFT_SIZE: usize = 2 * HOP_SIZE;

/// Number of non-redundant FFT bins.
pub const NUM_BINS: usize = FFT_SIZE / 2 + 1;

/// Non-uniform grouping of FFT bins into frequency bands.
///
/// Bands are ordered by frequency; each carries a representative center
/// frequency (the mean of its member bin frequencies).
#[derive(Debug, Clone)]
pub struct BandMap {
    band_of_bin: [usize; NUM_BINS],
    centers_hz: Vec<f32>,
}

impl BandMap {
    /// Build the hybrid banding for a sample rate: single bins up to bin 24,
    /// pairs up to bin 64, groups of four above.
    pub fn hybrid(sample_rate: f32) -> Self {
        let bin_hz = sample_rate / FFT_SIZE as f32;
        let mut band_of_bin = [0usize; NUM_BINS];
        let mut centers_hz = Vec::new();
        let mut bin = 0;
        while bin < NUM_BINS {
            let width = if bin < 24 {
                1
            } else if bin < 64 {
                2
            } else {
                4
            };
            let width = width.min(NUM_BINS - bin);
            let band = centers_hz.len();
            let mut sum = 0.0;
            for b in bin..bin + width {
                band_of_bin[b] = band;
                sum += b as f32 * bin_hz;
            }
            centers_hz.push(sum / width as f32);
            bin += width;
        }
        Self {
            band_of_bin,
            centers_hz,
        }
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.centers_hz.len()
    }

    #[inline]
    pub fn band_of_bin(&self, bin: usize) -> usize {
        self.band_of_bin[bin]
    }

    /// Band center frequencies in Hz, ascending.
    #[inline]
    pub fn centers_hz(&self) -> &[f32] {
        &self.centers_hz
    }
}

/// WOLA STFT filterbank with per-channel overlap state.
///
/// Analysis channels correspond to sources, synthesis channels to
/// loudspeakers. Channel counts may be resized between blocks; overlap-add
/// state is preserved for channel indices that survive the resize and
/// zero-initialized for new ones.
pub struct Filterbank {
    sample_rate: f32,
    block_size: usize,
    time_slots: usize,
    window: [f32; FFT_SIZE],
    fft_fwd: Arc<dyn Fft<f32>>,
    fft_inv: Arc<dyn Fft<f32>>,
    band_map: BandMap,
    /// Per analysis channel: previous hop of input samples.
    analysis_state: Vec<Vec<f32>>,
    /// Per synthesis channel: overlap-add tail.
    synthesis_state: Vec<Vec<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Filterbank {
    /// Block size must be a non-zero integer multiple of [`HOP_SIZE`];
    /// anything else is a configuration error rejected here, not at runtime.
    pub fn new(
        sample_rate: f32,
        block_size: usize,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Result<Self> {
        if sample_rate <= 0.0 {
            return Err(Error::SampleRate(sample_rate));
        }
        if block_size == 0 || block_size % HOP_SIZE != 0 {
            return Err(Error::BlockSize {
                block_size,
                hop: HOP_SIZE,
            });
        }

        // Square-root periodic Hann: analysis * synthesis windows sum to
        // unity at 50% overlap.
        let mut window = [0.0f32; FFT_SIZE];
        for (n, w) in window.iter_mut().enumerate() {
            let hann =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / FFT_SIZE as f32).cos());
            *w = hann.sqrt();
        }

        let mut planner = FftPlanner::new();
        let fft_fwd = planner.plan_fft_forward(FFT_SIZE);
        let fft_inv = planner.plan_fft_inverse(FFT_SIZE);

        Ok(Self {
            sample_rate,
            block_size,
            time_slots: block_size / HOP_SIZE,
            window,
            fft_fwd,
            fft_inv,
            band_map: BandMap::hybrid(sample_rate),
            analysis_state: vec![vec![0.0; FFT_SIZE - HOP_SIZE]; num_inputs],
            synthesis_state: vec![vec![0.0; FFT_SIZE - HOP_SIZE]; num_outputs],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        })
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of STFT time slots per block.
    #[inline]
    pub fn time_slots(&self) -> usize {
        self.time_slots
    }

    /// Fixed transform latency in samples.
    #[inline]
    pub fn latency_samples(&self) -> usize {
        FFT_SIZE - HOP_SIZE
    }

    #[inline]
    pub fn band_map(&self) -> &BandMap {
        &self.band_map
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.analysis_state.len()
    }

    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.synthesis_state.len()
    }

    /// Change channel counts. Overlap state is kept for surviving channel
    /// indices; added channels start from silence.
    pub fn resize(&mut self, num_inputs: usize, num_outputs: usize) {
        self.analysis_state
            .resize_with(num_inputs, || vec![0.0; FFT_SIZE - HOP_SIZE]);
        self.synthesis_state
            .resize_with(num_outputs, || vec![0.0; FFT_SIZE - HOP_SIZE]);
    }

    /// Analyse one channel's time-domain block into `time_slots * NUM_BINS`
    /// complex values (slot-major).
    pub fn analyze(&mut self, channel: usize, input: &[f32], tf: &mut [Complex<f32>]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(tf.len(), self.time_slots * NUM_BINS);

        for slot in 0..self.time_slots {
            let hop = &input[slot * HOP_SIZE..(slot + 1) * HOP_SIZE];
            let hist = &mut self.analysis_state[channel];
            for n in 0..FFT_SIZE - HOP_SIZE {
                self.scratch[n] = Complex::new(hist[n] * self.window[n], 0.0);
            }
            for n in 0..HOP_SIZE {
                let idx = FFT_SIZE - HOP_SIZE + n;
                self.scratch[idx] = Complex::new(hop[n] * self.window[idx], 0.0);
            }
            hist.copy_from_slice(hop);

            self.fft_fwd.process(&mut self.scratch);
            tf[slot * NUM_BINS..(slot + 1) * NUM_BINS].copy_from_slice(&self.scratch[..NUM_BINS]);
        }
    }

    /// Synthesise one channel's `time_slots * NUM_BINS` complex values back
    /// into a time-domain block.
    pub fn synthesize(&mut self, channel: usize, tf: &[Complex<f32>], output: &mut [f32]) {
        debug_assert_eq!(output.len(), self.block_size);
        debug_assert_eq!(tf.len(), self.time_slots * NUM_BINS);

        let scale = 1.0 / FFT_SIZE as f32;
        for slot in 0..self.time_slots {
            let bins = &tf[slot * NUM_BINS..(slot + 1) * NUM_BINS];
            self.scratch[..NUM_BINS].copy_from_slice(bins);
            for k in 1..FFT_SIZE / 2 {
                self.scratch[FFT_SIZE - k] = bins[k].conj();
            }

            self.fft_inv.process(&mut self.scratch);

            let ola = &mut self.synthesis_state[channel];
            let out = &mut output[slot * HOP_SIZE..(slot + 1) * HOP_SIZE];
            for n in 0..HOP_SIZE {
                out[n] = ola[n] + self.scratch[n].re * scale * self.window[n];
            }
            for n in 0..FFT_SIZE - HOP_SIZE {
                let idx = HOP_SIZE + n;
                ola[n] = self.scratch[idx].re * scale * self.window[idx];
            }
        }
    }
}
