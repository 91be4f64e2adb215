use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable constants for every analysis stage.
///
/// Defaults reproduce the behaviour the visualizer and the lyric generator
/// were tuned against; a JSON file only needs to name the values it changes:
///
/// ```json
/// { "tempo": { "downsample_factor": 8 }, "live": { "fps": 30 } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tempo: TempoConfig,
    pub spectrum: SpectrumConfig,
    pub frequency: FrequencyConfig,
    pub dynamics: DynamicsConfig,
    pub structure: StructureConfig,
    pub live: LiveConfig,
}

/// Envelope-peak BPM detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Every Nth rectified sample feeds the envelope follower. Larger values
    /// are faster but coarsen peak timing to `factor / sample_rate` seconds.
    pub downsample_factor: usize,
    pub attack: f32,
    pub release: f32,
    pub peak_threshold: f32,
    pub fallback_bpm: u32,
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            downsample_factor: 10,
            attack: 0.1,
            release: 0.01,
            peak_threshold: 0.1,
            fallback_bpm: 120,
            min_bpm: 60,
            max_bpm: 180,
        }
    }
}

/// Byte-spectrum analyser settings (mirrors an `AnalyserNode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// Offline dominant-frequency classification.
///
/// Bin ranges are absolute bin indices, not fractions of the spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    pub bass_bins: (usize, usize),
    pub mid_bins: (usize, usize),
    pub treble_bins: (usize, usize),
    pub bass_dominance: f32,
    pub treble_dominance: f32,
    pub mid_dominance: f32,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            bass_bins: (0, 10),
            mid_bins: (10, 50),
            treble_bins: (50, 100),
            bass_dominance: 0.5,
            treble_dominance: 0.45,
            mid_dominance: 0.45,
        }
    }
}

/// Windowed RMS energy and dynamic-range classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    pub window_seconds: f32,
    pub low_energy: f32,
    pub high_energy: f32,
    pub wide_range: f32,
    pub compressed_range: f32,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.1,
            low_energy: 0.1,
            high_energy: 0.3,
            wide_range: 3.0,
            compressed_range: 1.5,
        }
    }
}

/// Coarse structure segmentation thresholds, relative to the mean segment RMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub segment_seconds: f32,
    pub quiet_ratio: f32,
    pub loud_ratio: f32,
    pub peak_ratio: f32,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            segment_seconds: 2.0,
            quiet_ratio: 0.7,
            loud_ratio: 1.2,
            peak_ratio: 1.5,
        }
    }
}

/// Live extractor scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub fps: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

impl AnalysisConfig {
    /// Load a config from JSON and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tempo;
        if t.downsample_factor == 0 {
            return Err(invalid("tempo.downsample_factor must be at least 1"));
        }
        for (name, value) in [("tempo.attack", t.attack), ("tempo.release", t.release)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(&format!("{} must be in (0, 1], got {}", name, value)));
            }
        }
        if t.min_bpm == 0 || t.min_bpm >= t.max_bpm {
            return Err(invalid(&format!(
                "tempo range {}..{} is empty",
                t.min_bpm, t.max_bpm
            )));
        }
        // Halving must be able to land inside the range.
        if u64::from(t.max_bpm) < 2 * u64::from(t.min_bpm) - 1 {
            return Err(invalid("tempo.max_bpm must be at least twice tempo.min_bpm"));
        }

        let s = &self.spectrum;
        if !s.fft_size.is_power_of_two() || !(32..=32768).contains(&s.fft_size) {
            return Err(invalid(&format!(
                "spectrum.fft_size must be a power of two in 32..=32768, got {}",
                s.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&s.smoothing_time_constant) {
            return Err(invalid("spectrum.smoothing_time_constant must be in [0, 1]"));
        }
        if s.min_decibels >= s.max_decibels {
            return Err(invalid("spectrum.min_decibels must be below max_decibels"));
        }

        if self.dynamics.window_seconds <= 0.0 {
            return Err(invalid("dynamics.window_seconds must be positive"));
        }
        if self.structure.segment_seconds <= 0.0 {
            return Err(invalid("structure.segment_seconds must be positive"));
        }
        if self.live.fps == 0 {
            return Err(invalid("live.fps must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> AnalysisError {
    AnalysisError::Config(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "tempo": { "downsample_factor": 4 } }"#).unwrap();
        assert_eq!(config.tempo.downsample_factor, 4);
        assert_eq!(config.tempo.fallback_bpm, 120);
        assert_eq!(config.spectrum.fft_size, 2048);
        assert_eq!(config.live.fps, 60);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.spectrum.fft_size = 1000;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.tempo.downsample_factor = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.tempo.release = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.tempo.max_bpm = 90;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.live.fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_tempo_range_near_integer_limit() {
        let config: AnalysisConfig = serde_json::from_str(&format!(
            r#"{{ "tempo": {{ "min_bpm": {}, "max_bpm": {} }} }}"#,
            u32::MAX / 2 + 10,
            u32::MAX
        ))
        .unwrap();
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.tempo.min_bpm = 0;
        config.tempo.max_bpm = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("chromesthesia-config-{}.json", std::process::id()));
        let mut config = AnalysisConfig::default();
        config.structure.peak_ratio = 2.0;
        config.save(&path).unwrap();

        let loaded = AnalysisConfig::load(&path).unwrap();
        assert_eq!(loaded.structure.peak_ratio, 2.0);
        let _ = std::fs::remove_file(&path);
    }
}
