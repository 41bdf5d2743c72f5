use anyhow::{Result, bail};
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};

use crate::eq::chain::MonoChain;
use crate::eq::design::design;
use crate::eq::params::ChainSettings;
use crate::eq::store::{ParameterReader, ParameterStore};

const MESSAGE_CHANNEL_CAPACITY: usize = 16;

pub enum EngineMessage {
    /// Clear all filter state, as on a stream restart.
    Reset,
    /// Re-prepare for a new host configuration, validated by the sender.
    Prepare(ProcessSpec),
}

/// Host configuration. Only constructible through [`ProcessSpec::new`], so
/// a held value always has a positive rate and a non-zero block size.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProcessSpec {
    sample_rate: f32,
    max_block_size: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f32, max_block_size: usize) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            bail!("sample rate must be positive, got {sample_rate}");
        }
        if max_block_size == 0 {
            bail!("max block size must be non-zero");
        }

        Ok(Self {
            sample_rate,
            max_block_size,
        })
    }

    pub const fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub const fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

/// Stereo equalizer: one independent [`MonoChain`] per channel, refreshed
/// from the current parameter snapshot on every block.
pub struct Equalizer {
    left: MonoChain,
    right: MonoChain,
    params: ParameterReader,
    /// Channel for control-thread requests, drained at the start of a block.
    rx_updates: Receiver<EngineMessage>,
    spec: Option<ProcessSpec>,
}

/// Control-thread side of an [`Equalizer`].
#[derive(Clone)]
pub struct EqualizerHandle {
    params: ParameterStore,
    tx_updates: Sender<EngineMessage>,
}

impl Equalizer {
    pub fn new(initial: ChainSettings) -> (Self, EqualizerHandle) {
        let (params, _) = ParameterStore::new(initial);
        Self::with_store(params)
    }

    /// Builds an engine reading from an existing store, e.g. one shared with
    /// a settings layer that publishes before the engine exists.
    pub fn with_store(params: ParameterStore) -> (Self, EqualizerHandle) {
        let (tx_updates, rx_updates) = bounded(MESSAGE_CHANNEL_CAPACITY);
        let reader = params.reader();

        (
            Self {
                left: MonoChain::new(),
                right: MonoChain::new(),
                params: reader,
                rx_updates,
                spec: None,
            },
            EqualizerHandle { params, tx_updates },
        )
    }

    /// Validates the host configuration and clears every stage's history.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<()> {
        let spec = ProcessSpec::new(sample_rate, max_block_size)?;
        self.configure(spec);

        debug!("Equalizer prepared: {sample_rate} Hz, {max_block_size} frames");
        Ok(())
    }

    /// Audio-side half of [`Equalizer::prepare`]: no validation, no logging.
    fn configure(&mut self, spec: ProcessSpec) {
        self.spec = Some(spec);
        self.left.reset();
        self.right.reset();
        let settings = self.params.load();
        self.refresh(&settings);
    }

    pub const fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    pub const fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    pub const fn left(&self) -> &MonoChain {
        &self.left
    }

    pub const fn right(&self) -> &MonoChain {
        &self.right
    }

    /// Clears filter state without touching the configuration.
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Processes one stereo block in place using the current snapshot.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.handle_messages();
        let settings = self.params.load();
        self.process_block_with(&settings, left, right);
    }

    /// Like [`Equalizer::process_block`], with an explicit snapshot.
    /// Unprepared engines leave the audio untouched.
    pub fn process_block_with(
        &mut self,
        settings: &ChainSettings,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        if self.spec.is_none() {
            return;
        }

        self.refresh(settings);
        self.left.process_block(left);
        self.right.process_block(right);
    }

    /// Designs coefficients once and pushes them into both channels.
    fn refresh(&mut self, settings: &ChainSettings) {
        let Some(spec) = self.spec else {
            return;
        };
        let coefficients = design(settings, spec.sample_rate());
        self.left.apply(&coefficients, settings);
        self.right.apply(&coefficients, settings);
    }

    /// Runs on the audio thread, so nothing here may log or allocate.
    pub fn handle_messages(&mut self) {
        while let Ok(message) = self.rx_updates.try_recv() {
            match message {
                EngineMessage::Reset => self.reset(),
                EngineMessage::Prepare(spec) => self.configure(spec),
            }
        }
    }

    /// Magnitude of the left chain's current response, in dB.
    pub fn magnitude_db(&self, freq: f32) -> Option<f32> {
        self.spec
            .map(|spec| self.left.magnitude_db(freq, spec.sample_rate()))
    }
}

impl EqualizerHandle {
    pub const fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn request_reset(&self) {
        self.send(EngineMessage::Reset);
    }

    /// Rejects an invalid configuration here, before it reaches the audio thread.
    pub fn request_prepare(&self, sample_rate: f32, max_block_size: usize) -> Result<()> {
        let spec = ProcessSpec::new(sample_rate, max_block_size)?;
        self.send(EngineMessage::Prepare(spec));
        Ok(())
    }

    fn send(&self, message: EngineMessage) {
        match self.tx_updates.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Equalizer message queue full, dropping request"),
            Err(TrySendError::Disconnected(_)) => warn!("Equalizer is gone, dropping request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::params::Slope;

    const SR: f32 = 48_000.0;
    const BLOCK: usize = 64;

    fn impulse(len: usize) -> Vec<f32> {
        let mut buf = vec![0.0; len];
        buf[0] = 1.0;
        buf
    }

    #[test]
    fn prepare_rejects_invalid_configuration() {
        let (mut eq, _) = Equalizer::new(ChainSettings::default());
        assert!(eq.prepare(0.0, BLOCK).is_err());
        assert!(eq.prepare(-44_100.0, BLOCK).is_err());
        assert!(eq.prepare(f32::NAN, BLOCK).is_err());
        assert!(eq.prepare(SR, 0).is_err());
        assert!(!eq.is_prepared());

        eq.prepare(SR, BLOCK).expect("valid configuration");
        let spec = eq.spec().expect("prepared");
        assert_eq!(spec.sample_rate(), SR);
        assert_eq!(spec.max_block_size(), BLOCK);
    }

    #[test]
    fn engine_follows_a_store_it_was_built_from() {
        let (store, _) = ParameterStore::new(ChainSettings::default());
        store.publish(ChainSettings {
            low_cut_slope: Slope::Db36,
            ..ChainSettings::default()
        });
        let (mut eq, handle) = Equalizer::with_store(store.clone());
        eq.prepare(SR, BLOCK).expect("valid configuration");
        assert_eq!(eq.left().low_cut().active_stages(), 3);

        store.update(|s| s.low_cut_slope = Slope::Db12);
        let mut left = vec![0.0; BLOCK];
        let mut right = vec![0.0; BLOCK];
        eq.process_block(&mut left, &mut right);
        assert_eq!(eq.left().low_cut().active_stages(), 1);
        assert_eq!(handle.params().snapshot(), store.snapshot());
    }

    #[test]
    fn unprepared_engine_passes_audio_through() {
        let (mut eq, handle) = Equalizer::new(ChainSettings::default());
        handle.params().set("Peak Gain", 12.0).expect("known parameter");

        let mut left = impulse(BLOCK);
        let mut right = impulse(BLOCK);
        eq.process_block(&mut left, &mut right);

        assert_eq!(left, impulse(BLOCK));
        assert_eq!(right, impulse(BLOCK));
    }

    #[test]
    fn block_reads_latest_published_snapshot() {
        let (mut eq, handle) = Equalizer::new(ChainSettings::default());
        eq.prepare(SR, BLOCK).expect("valid configuration");

        handle
            .params()
            .update(|s| s.high_cut_slope = Slope::Db48);
        let mut left = vec![0.0; BLOCK];
        let mut right = vec![0.0; BLOCK];
        eq.process_block(&mut left, &mut right);

        assert_eq!(eq.left().high_cut().active_stages(), 4);
        assert_eq!(eq.right().high_cut().active_stages(), 4);
        assert_eq!(eq.left().low_cut().active_stages(), 1);
    }

    #[test]
    fn reset_request_clears_state_before_next_block() {
        let (mut eq, handle) = Equalizer::new(ChainSettings {
            peak_gain_db: 12.0,
            ..ChainSettings::default()
        });
        eq.prepare(SR, BLOCK).expect("valid configuration");

        let mut first_l = impulse(BLOCK);
        let mut first_r = impulse(BLOCK);
        eq.process_block(&mut first_l, &mut first_r);

        handle.request_reset();
        let mut second_l = impulse(BLOCK);
        let mut second_r = impulse(BLOCK);
        eq.process_block(&mut second_l, &mut second_r);

        assert_eq!(first_l, second_l);
        assert_eq!(first_r, second_r);
    }

    #[test]
    fn prepare_request_is_applied_on_the_audio_side() {
        let (mut eq, handle) = Equalizer::new(ChainSettings::default());
        handle.request_prepare(44_100.0, 256).expect("valid configuration");
        assert!(handle.request_prepare(-1.0, 256).is_err());
        assert!(handle.request_prepare(f32::INFINITY, 256).is_err());
        assert!(handle.request_prepare(48_000.0, 0).is_err());

        let mut left = vec![0.0; 8];
        let mut right = vec![0.0; 8];
        eq.process_block(&mut left, &mut right);

        assert_eq!(eq.spec().map(|s| s.sample_rate()), Some(44_100.0));
        assert_eq!(eq.spec().map(|s| s.max_block_size()), Some(256));
    }

    #[test]
    fn magnitude_reflects_current_coefficients() {
        let (mut eq, _) = Equalizer::new(ChainSettings {
            peak_freq: 2000.0,
            peak_gain_db: -12.0,
            ..ChainSettings::default()
        });
        assert_eq!(eq.magnitude_db(2000.0), None);

        eq.prepare(SR, BLOCK).expect("valid configuration");
        let db = eq.magnitude_db(2000.0).expect("prepared");
        assert!((db + 12.0).abs() < 0.1, "{db}");
    }
}
