use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::eq::ChainSettings;

impl std::fmt::Display for RenderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Block Size: {}", self.block_size)?;
        writeln!(f, "Output Directory: {}", self.output_dir)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Frames handed to the equalizer per call.
    pub block_size: usize,
    /// Where timestamped renders go when no output path is given.
    pub output_dir: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            block_size: 512,
            output_dir: "./renders".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render: RenderSettings,
    pub eq: ChainSettings,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;

        writeln!(f, "Render Settings:")?;
        writeln!(f, "{}", self.render)?;

        let eq = &self.eq;
        writeln!(f, "Equalizer Settings:")?;
        writeln!(f, "LowCut: {} Hz, {}", eq.low_cut_freq, eq.low_cut_slope)?;
        writeln!(
            f,
            "Peak: {} Hz, {} dB, Q {}",
            eq.peak_freq, eq.peak_gain_db, eq.peak_quality
        )?;
        writeln!(f, "HighCut: {} Hz, {}", eq.high_cut_freq, eq.high_cut_slope)?;
        Ok(())
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path();

        if settings_path.exists() {
            Self::load_from(&settings_path)
        } else {
            info!("No settings file found, using defaults");
            let settings = Self::default();
            // Try to save defaults, but don't fail if we can't
            let _ = settings.save_to(&settings_path);
            Ok(settings)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read settings file")?;
        let mut settings: Self =
            serde_json::from_str(&contents).context("Failed to parse settings")?;
        settings.eq = settings.eq.clamped();
        debug!("Loaded settings from {path:?}");
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_settings_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure the config directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json).context("Failed to write settings file")?;

        debug!("Saved settings to {path:?}");
        Ok(())
    }

    fn get_settings_path() -> PathBuf {
        const SETTINGS_FILENAME: &str = "settings.json";

        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join("eqchain")
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("eqchain")
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }
}
