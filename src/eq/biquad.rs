use std::f64::consts::PI;

/// Role a biquad plays inside a mono chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Peak,
    HighPassSection,
    LowPassSection,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Peak => write!(f, "Peak"),
            Self::HighPassSection => write!(f, "High-pass section"),
            Self::LowPassSection => write!(f, "Low-pass section"),
        }
    }
}

/// Second-order transfer function, normalized so that `a0 == 1`.
///
/// `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coefficients {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Coefficients {
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Builds from raw coefficients, dividing everything by `a0`.
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv_a0 = 1.0 / a0;
        Self {
            b0: (b0 * inv_a0) as f32,
            b1: (b1 * inv_a0) as f32,
            b2: (b2 * inv_a0) as f32,
            a1: (a1 * inv_a0) as f32,
            a2: (a2 * inv_a0) as f32,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Linear magnitude of the response at `freq`.
    pub fn magnitude(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * f64::from(freq) / f64::from(sample_rate);
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();
        let (b0, b1, b2) = (f64::from(self.b0), f64::from(self.b1), f64::from(self.b2));
        let (a1, a2) = (f64::from(self.a1), f64::from(self.a2));

        let num_re = b0 + b1 * c1 + b2 * c2;
        let num_im = -(b1 * s1 + b2 * s2);
        let den_re = 1.0 + a1 * c1 + a2 * c2;
        let den_im = -(a1 * s1 + a2 * s2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt() as f32
    }

    pub fn magnitude_db(&self, freq: f32, sample_rate: f32) -> f32 {
        20.0 * self.magnitude(freq, sample_rate).max(1e-12).log10()
    }
}

/// One second-order IIR section in transposed direct form II.
///
/// The two state registers carry over between blocks and are only cleared
/// by [`BiquadStage::reset`].
#[derive(Clone, Debug)]
pub struct BiquadStage {
    kind: StageKind,
    coeffs: Coefficients,
    z1: f32,
    z2: f32,
}

impl BiquadStage {
    pub const fn new(kind: StageKind) -> Self {
        Self {
            kind,
            coeffs: Coefficients::IDENTITY,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    pub const fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    /// Takes effect from the next processed sample; state is kept.
    pub const fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.coeffs = coeffs;
    }

    pub const fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = input.mul_add(c.b0, self.z1);
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_coefficients_pass_signal_untouched() {
        let mut stage = BiquadStage::new(StageKind::Peak);
        let mut buf: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).collect();
        let expected = buf.clone();

        stage.process_block(&mut buf);

        assert_eq!(buf, expected);
    }

    #[test]
    fn block_processing_matches_sample_processing_across_calls() {
        // Simple one-zero averager plus a resonant pole pair.
        let coeffs = Coefficients::from_raw(0.5, 0.5, 0.0, 1.0, -0.9, 0.2);

        let input: Vec<f32> = (0..256).map(|i| ((i * 7919) % 101) as f32 / 50.0 - 1.0).collect();

        let mut by_sample = BiquadStage::new(StageKind::LowPassSection);
        by_sample.set_coefficients(coeffs);
        let expected: Vec<f32> = input.iter().map(|&x| by_sample.process_sample(x)).collect();

        let mut by_block = BiquadStage::new(StageKind::LowPassSection);
        by_block.set_coefficients(coeffs);
        let mut buf = input.clone();
        let (first, second) = buf.split_at_mut(100);
        by_block.process_block(first);
        by_block.process_block(second);

        assert_eq!(buf, expected, "state must carry across block boundaries");
    }

    #[test]
    fn reset_clears_history() {
        let mut stage = BiquadStage::new(StageKind::HighPassSection);
        stage.set_coefficients(Coefficients::from_raw(1.0, 0.0, 0.0, 1.0, -0.5, 0.0));

        let first = stage.process_sample(1.0);
        let tail = stage.process_sample(0.0);
        assert!(tail.abs() > 0.0, "pole should ring after an impulse");

        stage.reset();
        assert_eq!(stage.process_sample(1.0), first);
    }

    #[test]
    fn from_raw_normalizes_by_a0() {
        let c = Coefficients::from_raw(2.0, 4.0, 2.0, 2.0, 1.0, 0.5);
        assert_eq!(c.b0, 1.0);
        assert_eq!(c.b1, 2.0);
        assert_eq!(c.a1, 0.5);
        assert_eq!(c.a2, 0.25);
        assert!(c.is_finite());
    }

    #[test]
    fn identity_magnitude_is_flat() {
        for f in [20.0, 1000.0, 20_000.0] {
            assert!(Coefficients::IDENTITY.magnitude_db(f, 48_000.0).abs() < 1e-6);
        }
    }
}
