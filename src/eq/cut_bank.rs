use crate::eq::biquad::{BiquadStage, StageKind};
use crate::eq::design::{CutCoefficients, MAX_SECTIONS};
use crate::eq::params::Slope;

/// Four biquad sections with per-stage bypass. The active stages always form
/// a prefix `[0, slope.stages())`; only [`CutBank::update`] and
/// [`CutBank::bypass_all`] touch the flags.
#[derive(Clone, Debug)]
pub struct CutBank {
    kind: StageKind,
    stages: [BiquadStage; MAX_SECTIONS],
    bypassed: [bool; MAX_SECTIONS],
}

impl CutBank {
    pub const fn new(kind: StageKind) -> Self {
        Self {
            kind,
            stages: [
                BiquadStage::new(kind),
                BiquadStage::new(kind),
                BiquadStage::new(kind),
                BiquadStage::new(kind),
            ],
            bypassed: [true; MAX_SECTIONS],
        }
    }

    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn stage(&self, index: usize) -> Option<&BiquadStage> {
        self.stages.get(index)
    }

    pub fn is_bypassed(&self, index: usize) -> bool {
        self.bypassed.get(index).copied().unwrap_or(true)
    }

    /// Number of active stages.
    pub fn active_stages(&self) -> usize {
        self.bypassed.iter().filter(|&&b| !b).count()
    }

    /// Loads the sections for `slope` and enables exactly those.
    pub fn update(&mut self, coefficients: &CutCoefficients, slope: Slope) {
        self.bypass_all();

        // Highest section first, falling through to stage 0.
        for index in (0..slope.stages()).rev() {
            self.stages[index].set_coefficients(coefficients.section(index));
            self.bypassed[index] = false;
        }
    }

    /// Turns the bank into a pass-through. Stage state is left frozen.
    pub const fn bypass_all(&mut self) {
        self.bypassed = [true; MAX_SECTIONS];
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    fn is_prefix(&self) -> bool {
        let active = self.active_stages();
        self.bypassed
            .iter()
            .enumerate()
            .all(|(index, &bypassed)| bypassed == (index >= active))
    }

    /// Runs the active stages over `buffer` in ascending order.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        if !self.is_prefix() {
            debug_assert!(false, "cut bank bypass flags are not a prefix: {:?}", self.bypassed);
            self.bypass_all();
            return;
        }

        for (stage, _) in self
            .stages
            .iter_mut()
            .zip(self.bypassed)
            .filter(|(_, bypassed)| !bypassed)
        {
            stage.process_block(buffer);
        }
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let mut signal = input;
        for (stage, bypassed) in self.stages.iter_mut().zip(self.bypassed) {
            if !bypassed {
                signal = stage.process_sample(signal);
            }
        }
        signal
    }

    /// Combined response of the active stages.
    pub fn magnitude_db(&self, freq: f32, sample_rate: f32) -> f32 {
        self.stages
            .iter()
            .zip(self.bypassed)
            .filter(|(_, bypassed)| !bypassed)
            .map(|(stage, _)| stage.coefficients().magnitude_db(freq, sample_rate))
            .sum()
    }
}

/// Single update path shared by all four banks of a stereo chain.
pub fn apply_cut_bank(bank: &mut CutBank, coefficients: &CutCoefficients, slope: Slope) {
    debug_assert_eq!(
        bank.kind(),
        coefficients.kind(),
        "coefficients designed for a different bank"
    );
    bank.update(coefficients, slope);
}
