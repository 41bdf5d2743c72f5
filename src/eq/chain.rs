use crate::eq::biquad::{BiquadStage, StageKind};
use crate::eq::cut_bank::{CutBank, apply_cut_bank};
use crate::eq::design::ChainCoefficients;
use crate::eq::params::ChainSettings;

// MonoChain is the fixed per-channel cascade: low cut -> peak -> high cut.
#[derive(Clone, Debug)]
pub struct MonoChain {
    low_cut: CutBank,
    peak: BiquadStage,
    high_cut: CutBank,
}

impl Default for MonoChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoChain {
    pub const fn new() -> Self {
        Self {
            low_cut: CutBank::new(StageKind::HighPassSection),
            peak: BiquadStage::new(StageKind::Peak),
            high_cut: CutBank::new(StageKind::LowPassSection),
        }
    }

    pub const fn low_cut(&self) -> &CutBank {
        &self.low_cut
    }

    pub const fn peak(&self) -> &BiquadStage {
        &self.peak
    }

    pub const fn high_cut(&self) -> &CutBank {
        &self.high_cut
    }

    /// Pushes freshly designed coefficients into every stage.
    pub fn apply(&mut self, coefficients: &ChainCoefficients, settings: &ChainSettings) {
        self.peak.set_coefficients(coefficients.peak);
        apply_cut_bank(&mut self.low_cut, &coefficients.low_cut, settings.low_cut_slope);
        apply_cut_bank(&mut self.high_cut, &coefficients.high_cut, settings.high_cut_slope);
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let signal = self.low_cut.process_sample(input);
        let signal = self.peak.process_sample(signal);
        self.high_cut.process_sample(signal)
    }

    // process_block runs the whole buffer through each component in turn.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        self.low_cut.process_block(buffer);
        self.peak.process_block(buffer);
        self.high_cut.process_block(buffer);
    }

    pub fn magnitude_db(&self, freq: f32, sample_rate: f32) -> f32 {
        self.low_cut.magnitude_db(freq, sample_rate)
            + self.peak.coefficients().magnitude_db(freq, sample_rate)
            + self.high_cut.magnitude_db(freq, sample_rate)
    }
}
