//! Frequency-dependent gain normalization.
//!
//! Amplitude panning should preserve perceived loudness as a source moves.
//! In dry rooms the loudspeaker signals sum coherently at the listener and
//! amplitude normalization (gains summing linearly to the reference) is
//! appropriate; in reverberant conditions and at high frequencies the signals
//! sum incoherently and energy normalization (gains summing in power) is the
//! better model. The blend is expressed as a per-band exponent `p` in [1, 2]:
//! a gain row is scaled so that `(sum g_i^p)^(1/p)` equals the reference
//! level, with `p = 1` amplitude-preserving and `p = 2` energy-preserving.
//!
//! The crossover shape is a psychoacoustic calibration, not a derived
//! formula, so it is an explicitly parameterized curve rather than a
//! constant.

/// Monotonic amplitude/energy crossover curve indexed by band center
/// frequency and the room coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizationCurve {
    /// Frequency at which the blend weight reaches 0.5, in Hz.
    pub crossover_hz: f32,
    /// Steepness of the transition in the log-frequency domain.
    pub steepness: f32,
}

impl Default for NormalizationCurve {
    fn default() -> Self {
        Self {
            crossover_hz: 700.0,
            steepness: 0.8,
        }
    }
}

impl NormalizationCurve {
    /// Blend weight in [0, 1]: 0 favours amplitude preservation (low
    /// frequencies), 1 favours energy preservation (high frequencies).
    /// Monotonic in frequency.
    #[inline]
    pub fn weight(&self, freq_hz: f32) -> f32 {
        if freq_hz <= 0.0 {
            return 0.0;
        }
        0.5 * (1.0 + (self.steepness * (freq_hz / self.crossover_hz).ln()).tanh())
    }

    /// Normalization exponent `p` for a band, in [1, 2].
    ///
    /// `room_coeff = 0` yields `p = 1` at every band (pure amplitude
    /// normalization); `room_coeff = 1` crosses over from amplitude at low
    /// frequencies to energy at high frequencies.
    #[inline]
    pub fn exponent(&self, freq_hz: f32, room_coeff: f32) -> f32 {
        1.0 + room_coeff.clamp(0.0, 1.0) * self.weight(freq_hz)
    }
}

/// Rescale an energy-normalized gain row so `(sum g^p)^(1/p)` equals 1.
///
/// With `p = 2` the row is already on the target isosurface and is left
/// untouched. An all-zero row stays zero.
pub fn renormalize(gains: &mut [f32], p: f32) {
    if (p - 2.0).abs() < 1e-6 {
        return;
    }
    let mut sum_pv = 0.0f32;
    for &g in gains.iter() {
        if g > 0.0 {
            sum_pv += g.powf(p);
        }
    }
    if sum_pv <= f32::EPSILON {
        return;
    }
    let denom = sum_pv.powf(1.0 / p);
    for g in gains.iter_mut() {
        *g /= denom;
    }
}
