pub mod biquad;
pub mod chain;
pub mod cut_bank;
pub mod design;
pub mod engine;
pub mod params;
pub mod store;

pub use chain::MonoChain;
pub use engine::{Equalizer, EqualizerHandle};
pub use params::{ChainSettings, ParamId, Slope, parameter_layout};
pub use store::{ParameterReader, ParameterStore};
