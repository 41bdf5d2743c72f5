use anyhow::{Result, anyhow};
use arc_swap::ArcSwap;
use log::debug;
use std::sync::Arc;

use crate::eq::params::{ChainSettings, ParamId};

/// Control-side owner of the published snapshot. Writers replace the whole
/// [`ChainSettings`] so readers never see a half-updated set of fields.
#[derive(Clone)]
pub struct ParameterStore {
    current: Arc<ArcSwap<ChainSettings>>,
}

/// Audio-side view of a [`ParameterStore`]. Loading never blocks or allocates.
#[derive(Clone)]
pub struct ParameterReader {
    current: Arc<ArcSwap<ChainSettings>>,
}

impl ParameterStore {
    pub fn new(initial: ChainSettings) -> (Self, ParameterReader) {
        let current = Arc::new(ArcSwap::from_pointee(initial.clamped()));
        (
            Self {
                current: Arc::clone(&current),
            },
            ParameterReader { current },
        )
    }

    pub fn reader(&self) -> ParameterReader {
        ParameterReader {
            current: Arc::clone(&self.current),
        }
    }

    pub fn snapshot(&self) -> ChainSettings {
        **self.current.load()
    }

    pub fn publish(&self, settings: ChainSettings) {
        let clamped = settings.clamped();
        if clamped != settings {
            debug!("Clamped published settings: {settings:?} -> {clamped:?}");
        }
        self.current.store(Arc::new(clamped));
    }

    /// Read-modify-write that retries if another writer raced us.
    pub fn update<F>(&self, mut f: F)
    where
        F: FnMut(&mut ChainSettings),
    {
        self.current.rcu(|old| {
            let mut next = **old;
            f(&mut next);
            next.clamped()
        });
    }

    /// Sets a parameter by its layout name, in plain units.
    pub fn set(&self, name: &str, value: f32) -> Result<()> {
        let id = lookup(name)?;
        self.update(|s| s.set(id, value));

        let stored = self.snapshot().get(id);
        if stored != value {
            debug!("{name} clamped from {value} to {stored}");
        }
        Ok(())
    }

    /// Sets a parameter from a `[0, 1]` host value using the layout's range.
    pub fn set_normalized(&self, name: &str, normalized: f32) -> Result<()> {
        let id = lookup(name)?;
        let value = id.spec().range.denormalize(normalized);
        self.update(|s| s.set(id, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<f32> {
        Ok(self.snapshot().get(lookup(name)?))
    }
}

impl ParameterReader {
    #[inline]
    pub fn load(&self) -> ChainSettings {
        **self.current.load()
    }
}

fn lookup(name: &str) -> Result<ParamId> {
    ParamId::from_name(name).ok_or_else(|| anyhow!("Unknown parameter name: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::params::Slope;
    use std::thread;

    #[test]
    fn reader_sees_published_snapshot() {
        let (store, reader) = ParameterStore::new(ChainSettings::default());
        assert_eq!(reader.load(), ChainSettings::default());

        let next = ChainSettings {
            peak_gain_db: 6.0,
            low_cut_slope: Slope::Db36,
            ..ChainSettings::default()
        };
        store.publish(next);
        assert_eq!(reader.load(), next);
        assert_eq!(store.reader().load(), next);
    }

    #[test]
    fn named_access_uses_layout_names() -> Result<()> {
        let (store, reader) = ParameterStore::new(ChainSettings::default());

        store.set("Peak Freq", 2500.0)?;
        store.set("HighCut Slope", 3.0)?;
        assert_eq!(store.get("Peak Freq")?, 2500.0);
        assert_eq!(reader.load().high_cut_slope, Slope::Db48);

        assert!(store.set("Drive", 1.0).is_err());
        assert!(store.get("Drive").is_err());
        Ok(())
    }

    #[test]
    fn out_of_range_values_are_clamped_on_write() -> Result<()> {
        let (store, reader) = ParameterStore::new(ChainSettings::default());
        store.set("Peak Gain", 99.0)?;
        store.set("LowCut Freq", 2.0)?;
        store.publish(ChainSettings {
            peak_quality: 50.0,
            ..reader.load()
        });

        let s = reader.load();
        assert_eq!(s.peak_gain_db, 24.0);
        assert_eq!(s.low_cut_freq, 20.0);
        assert_eq!(s.peak_quality, 10.0);
        Ok(())
    }

    #[test]
    fn normalized_writes_follow_the_skewed_range() -> Result<()> {
        let (store, _) = ParameterStore::new(ChainSettings::default());
        store.set_normalized("HighCut Freq", 1.0)?;
        assert_eq!(store.get("HighCut Freq")?, 20_000.0);
        store.set_normalized("HighCut Freq", 0.0)?;
        assert_eq!(store.get("HighCut Freq")?, 20.0);
        store.set_normalized("LowCut Slope", 0.5)?;
        assert!(matches!(store.snapshot().low_cut_slope, Slope::Db24 | Slope::Db36));
        Ok(())
    }

    #[test]
    fn concurrent_writers_never_tear_a_snapshot() {
        let (store, reader) = ParameterStore::new(ChainSettings::default());

        // Writers keep peak_freq and peak_gain_db paired; readers check the pairing.
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let gain = ((w * 500 + i) % 48) as f32 - 24.0;
                        store.publish(ChainSettings {
                            peak_gain_db: gain,
                            peak_freq: 1000.0 + gain,
                            ..ChainSettings::default()
                        });
                    }
                })
            })
            .collect();

        for _ in 0..2000 {
            let s = reader.load();
            if s.peak_gain_db != 0.0 || s.peak_freq != 750.0 {
                assert_eq!(s.peak_freq, 1000.0 + s.peak_gain_db);
            }
        }

        for w in writers {
            w.join().expect("writer thread panicked");
        }
    }
}
