//! Coefficient design for the three filter roles.
//!
//! The peak filter is the constant-Q peaking EQ from the RBJ cookbook.
//! Cut banks realize an even-order Butterworth response of order
//! `2 * (slope_index + 1)` as `order / 2` cascaded second-order sections.
//! Section `i` carries the conjugate pole pair at angle
//! `(2i + 1) * pi / (2 * order)` on the Butterworth circle, which as a
//! biquad is a plain high/low-pass with `Q = 1 / (2 cos(angle))`.
//!
//! Everything is computed in `f64` and narrowed once at the end.

use std::f64::consts::PI;

use crate::eq::biquad::{Coefficients, StageKind};
use crate::eq::params::{
    ChainSettings, MAX_FREQ_HZ, MAX_QUALITY, MIN_FREQ_HZ, MIN_QUALITY, Slope,
};

/// Number of second-order sections a cut bank can hold.
pub const MAX_SECTIONS: usize = 4;

/// Upper bound for any designed frequency, as a fraction of the sample rate.
/// Keeps `tan(pi * f / fs)` finite when the host runs below 40 kHz.
const MAX_NYQUIST_FRACTION: f32 = 0.49;

/// Ordered section coefficients for one cut bank.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CutCoefficients {
    kind: StageKind,
    sections: [Coefficients; MAX_SECTIONS],
    len: usize,
}

impl CutCoefficients {
    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Coefficients] {
        &self.sections[..self.len]
    }

    /// Section `index`, or identity when fewer sections were designed.
    pub fn section(&self, index: usize) -> Coefficients {
        self.as_slice()
            .get(index)
            .copied()
            .unwrap_or(Coefficients::IDENTITY)
    }

    const fn empty(kind: StageKind) -> Self {
        Self {
            kind,
            sections: [Coefficients::IDENTITY; MAX_SECTIONS],
            len: 0,
        }
    }
}

/// Everything one block needs, designed from a single snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChainCoefficients {
    pub low_cut: CutCoefficients,
    pub peak: Coefficients,
    pub high_cut: CutCoefficients,
}

/// Designs all three filters for `settings` at `sample_rate`.
pub fn design(settings: &ChainSettings, sample_rate: f32) -> ChainCoefficients {
    let settings = settings.clamped();
    ChainCoefficients {
        low_cut: butterworth_highpass(settings.low_cut_freq, sample_rate, settings.low_cut_slope),
        peak: peak(
            sample_rate,
            settings.peak_freq,
            settings.peak_quality,
            settings.peak_gain(),
        ),
        high_cut: butterworth_lowpass(
            settings.high_cut_freq,
            sample_rate,
            settings.high_cut_slope,
        ),
    }
}

/// Peaking EQ centred on `freq` with linear `gain`. A gain of 1 is an exact
/// identity.
pub fn peak(sample_rate: f32, freq: f32, quality: f32, gain: f32) -> Coefficients {
    if !valid_rate(sample_rate) || gain.is_nan() || gain <= 0.0 {
        return Coefficients::IDENTITY;
    }

    let freq = f64::from(clamp_freq(freq, sample_rate));
    let quality = f64::from(clamp_quality(quality));
    let a = f64::from(gain).sqrt();

    let omega = 2.0 * PI * freq / f64::from(sample_rate);
    let alpha = omega.sin() / (2.0 * quality);
    let c2 = -2.0 * omega.cos();

    Coefficients::from_raw(
        1.0 + alpha * a,
        c2,
        1.0 - alpha * a,
        1.0 + alpha / a,
        c2,
        1.0 - alpha / a,
    )
}

/// The two responses a cut bank section can have.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pass {
    High,
    Low,
}

impl Pass {
    const fn stage_kind(self) -> StageKind {
        match self {
            Self::High => StageKind::HighPassSection,
            Self::Low => StageKind::LowPassSection,
        }
    }
}

pub fn butterworth_highpass(freq: f32, sample_rate: f32, slope: Slope) -> CutCoefficients {
    butterworth(Pass::High, freq, sample_rate, slope)
}

pub fn butterworth_lowpass(freq: f32, sample_rate: f32, slope: Slope) -> CutCoefficients {
    butterworth(Pass::Low, freq, sample_rate, slope)
}

/// Q of section `index` in an even Butterworth cascade of `order`.
pub fn butterworth_section_q(order: usize, index: usize) -> f64 {
    let angle = (2 * index + 1) as f64 * PI / (2 * order) as f64;
    1.0 / (2.0 * angle.cos())
}

fn butterworth(pass: Pass, freq: f32, sample_rate: f32, slope: Slope) -> CutCoefficients {
    let mut out = CutCoefficients::empty(pass.stage_kind());
    if !valid_rate(sample_rate) {
        return out;
    }

    let freq = clamp_freq(freq, sample_rate);
    let order = slope.butterworth_order();

    for (index, section) in out.sections.iter_mut().take(order / 2).enumerate() {
        let q = butterworth_section_q(order, index);
        *section = second_order_section(pass, freq, sample_rate, q);
    }
    out.len = order / 2;

    out
}

/// Bilinear-transformed, pre-warped second-order high/low-pass.
fn second_order_section(pass: Pass, freq: f32, sample_rate: f32, q: f64) -> Coefficients {
    let n = (PI * f64::from(freq) / f64::from(sample_rate)).tan();
    let n2 = n * n;
    let inv_q = 1.0 / q;
    let a1 = 2.0 * (n2 - 1.0);
    let a2 = 1.0 - inv_q * n + n2;
    let a0 = 1.0 + inv_q * n + n2;

    match pass {
        Pass::Low => Coefficients::from_raw(n2, 2.0 * n2, n2, a0, a1, a2),
        Pass::High => Coefficients::from_raw(1.0, -2.0, 1.0, a0, a1, a2),
    }
}

fn valid_rate(sample_rate: f32) -> bool {
    sample_rate.is_finite() && sample_rate > 0.0
}

fn clamp_freq(freq: f32, sample_rate: f32) -> f32 {
    let freq = if freq.is_nan() { MIN_FREQ_HZ } else { freq };
    freq.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ)
        .min(sample_rate * MAX_NYQUIST_FRACTION)
}

fn clamp_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        return MIN_QUALITY;
    }
    quality.clamp(MIN_QUALITY, MAX_QUALITY)
}
