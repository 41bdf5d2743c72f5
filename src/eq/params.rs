use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const MIN_FREQ_HZ: f32 = 20.0;
pub const MAX_FREQ_HZ: f32 = 20_000.0;
pub const MIN_GAIN_DB: f32 = -24.0;
pub const MAX_GAIN_DB: f32 = 24.0;
pub const MIN_QUALITY: f32 = 0.1;
pub const MAX_QUALITY: f32 = 10.0;

/// Roll-off of a cut bank. Each step adds one second-order section.
#[derive(
    ValueEnum, Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Self; 4] = [Self::Db12, Self::Db24, Self::Db36, Self::Db48];

    /// Clamps out-of-range selectors to the nearest valid slope.
    pub const fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Db12,
            1 => Self::Db24,
            2 => Self::Db36,
            _ => Self::Db48,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of active biquad sections in a cut bank.
    pub const fn stages(self) -> usize {
        self.index() + 1
    }

    /// Total Butterworth order realized by the bank.
    pub const fn butterworth_order(self) -> usize {
        2 * self.stages()
    }

    pub const fn db_per_octave(self) -> u32 {
        12 * self.stages() as u32
    }
}

impl std::fmt::Display for Slope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} dB/Oct", self.db_per_octave())
    }
}

/// Read-only view of every control the equalizer consumes in one block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_freq: ParamId::LowCutFreq.spec().default,
            high_cut_freq: ParamId::HighCutFreq.spec().default,
            peak_freq: ParamId::PeakFreq.spec().default,
            peak_gain_db: ParamId::PeakGain.spec().default,
            peak_quality: ParamId::PeakQuality.spec().default,
            low_cut_slope: Slope::Db12,
            high_cut_slope: Slope::Db12,
        }
    }
}

impl ChainSettings {
    /// Every field clamped into its own domain. NaN maps to the range minimum.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for id in ParamId::ALL {
            out.set(id, self.get(id));
        }
        out
    }

    pub fn is_in_range(&self) -> bool {
        self.clamped() == *self
    }

    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::LowCutFreq => self.low_cut_freq,
            ParamId::HighCutFreq => self.high_cut_freq,
            ParamId::PeakFreq => self.peak_freq,
            ParamId::PeakGain => self.peak_gain_db,
            ParamId::PeakQuality => self.peak_quality,
            ParamId::LowCutSlope => self.low_cut_slope.index() as f32,
            ParamId::HighCutSlope => self.high_cut_slope.index() as f32,
        }
    }

    /// Sets a field in plain units, clamped to the field's range.
    pub fn set(&mut self, id: ParamId, value: f32) {
        let value = id.spec().range.clamp(value);
        match id {
            ParamId::LowCutFreq => self.low_cut_freq = value,
            ParamId::HighCutFreq => self.high_cut_freq = value,
            ParamId::PeakFreq => self.peak_freq = value,
            ParamId::PeakGain => self.peak_gain_db = value,
            ParamId::PeakQuality => self.peak_quality = value,
            ParamId::LowCutSlope => self.low_cut_slope = Slope::from_index(value.round() as usize),
            ParamId::HighCutSlope => {
                self.high_cut_slope = Slope::from_index(value.round() as usize);
            }
        }
    }

    /// Linear peak gain.
    pub fn peak_gain(&self) -> f32 {
        10f32.powf(self.peak_gain_db / 20.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
}

impl ParamId {
    pub const ALL: [Self; 7] = [
        Self::LowCutFreq,
        Self::HighCutFreq,
        Self::PeakFreq,
        Self::PeakGain,
        Self::PeakQuality,
        Self::LowCutSlope,
        Self::HighCutSlope,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::LowCutFreq => "LowCut Freq",
            Self::HighCutFreq => "HighCut Freq",
            Self::PeakFreq => "Peak Freq",
            Self::PeakGain => "Peak Gain",
            Self::PeakQuality => "Peak Quality",
            Self::LowCutSlope => "LowCut Slope",
            Self::HighCutSlope => "HighCut Slope",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    pub const fn spec(self) -> ParameterSpec {
        LAYOUT[self as usize]
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A normalisable range: `value = min + (max - min) * p^(1 / skew)`,
/// snapped to `step` from `min`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub skew: f32,
}

impl ParameterRange {
    pub const fn new(min: f32, max: f32, step: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            step,
            skew,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn snap(&self, value: f32) -> f32 {
        let value = self.clamp(value);
        if self.step <= 0.0 {
            return value;
        }
        let steps = ((value - self.min) / self.step).round();
        self.clamp(steps.mul_add(self.step, self.min))
    }

    /// Maps a plain value to `[0, 1]`.
    pub fn normalize(&self, value: f32) -> f32 {
        let proportion = (self.clamp(value) - self.min) / (self.max - self.min);
        if self.skew == 1.0 {
            proportion
        } else {
            proportion.powf(self.skew)
        }
    }

    /// Maps `[0, 1]` back to a snapped plain value.
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let p = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        let p = if self.skew == 1.0 || p == 0.0 {
            p
        } else {
            (p.ln() / self.skew).exp()
        };
        self.snap(p.mul_add(self.max - self.min, self.min))
    }
}

/// Declarative description of one exposed control.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParameterSpec {
    pub id: ParamId,
    pub range: ParameterRange,
    pub default: f32,
    /// Display labels for choice parameters, indexed by value.
    pub choices: Option<&'static [&'static str]>,
}

impl ParameterSpec {
    pub const fn name(&self) -> &'static str {
        self.id.name()
    }
}

const SLOPE_CHOICES: &[&str] = &["12 dB/Oct", "24 dB/Oct", "36 dB/Oct", "48 dB/Oct"];

const FREQ_RANGE: ParameterRange = ParameterRange::new(MIN_FREQ_HZ, MAX_FREQ_HZ, 1.0, 0.25);
const SLOPE_RANGE: ParameterRange = ParameterRange::new(0.0, 3.0, 1.0, 1.0);

const LAYOUT: [ParameterSpec; 7] = [
    ParameterSpec {
        id: ParamId::LowCutFreq,
        range: FREQ_RANGE,
        default: 20.0,
        choices: None,
    },
    ParameterSpec {
        id: ParamId::HighCutFreq,
        range: FREQ_RANGE,
        default: 20_000.0,
        choices: None,
    },
    ParameterSpec {
        id: ParamId::PeakFreq,
        range: FREQ_RANGE,
        default: 750.0,
        choices: None,
    },
    ParameterSpec {
        id: ParamId::PeakGain,
        range: ParameterRange::new(MIN_GAIN_DB, MAX_GAIN_DB, 1.0, 1.0),
        default: 0.0,
        choices: None,
    },
    ParameterSpec {
        id: ParamId::PeakQuality,
        range: ParameterRange::new(MIN_QUALITY, MAX_QUALITY, 0.05, 1.0),
        default: 1.0,
        choices: None,
    },
    ParameterSpec {
        id: ParamId::LowCutSlope,
        range: SLOPE_RANGE,
        default: 0.0,
        choices: Some(SLOPE_CHOICES),
    },
    ParameterSpec {
        id: ParamId::HighCutSlope,
        range: SLOPE_RANGE,
        default: 0.0,
        choices: Some(SLOPE_CHOICES),
    },
];

/// The layout handed to whatever parameter store hosts the equalizer.
pub const fn parameter_layout() -> &'static [ParameterSpec; 7] {
    &LAYOUT
}
