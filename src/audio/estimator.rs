use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Instant;

use super::beat_detector::detect_bpm;
use super::decode::decode_file;
use super::dynamics::{analyze_dynamics, Dynamics, EnergyLevel};
use super::frequency_profile::{analyze_frequency_profile, DominantFrequency};
use super::structure::describe_structure;
use super::PcmBuffer;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Per-file summary used to seed generation parameters.
///
/// Field names serialize in camelCase; `dynamicRange` is written as a
/// two-decimal string (`"2.41"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAnalysisResult {
    pub bpm: u32,
    /// Seconds.
    pub duration: f32,
    pub bass_level: u8,
    pub mid_level: u8,
    pub treble_level: u8,
    pub dominant_freq: DominantFrequency,
    pub energy_level: EnergyLevel,
    pub dynamics: Dynamics,
    /// Mean 100 ms RMS scaled to 0..=100.
    pub avg_energy: u8,
    #[serde(with = "ratio_string")]
    pub dynamic_range: f32,
    pub structure: String,
}

mod ratio_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:.2}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.trim().parse::<f32>().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of one estimator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Decoding,
    Analyzing,
    Complete,
    Failed,
}

/// One-shot analysis of a decoded buffer (channel 0 only).
///
/// Only an invalid `config` is an error: every sub-analysis resolves silence
/// or an empty buffer to its documented default (120 BPM, balanced, low
/// energy, consistent structure).
pub fn analyze_pcm(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<AudioAnalysisResult> {
    config.validate()?;

    let bpm = detect_bpm(samples, sample_rate, &config.tempo);
    let profile = analyze_frequency_profile(samples, &config.spectrum, &config.frequency);
    let dynamics = analyze_dynamics(samples, sample_rate, &config.dynamics);
    let structure = describe_structure(samples, sample_rate, &config.structure);

    let duration = if sample_rate > 0 {
        samples.len() as f32 / sample_rate as f32
    } else {
        0.0
    };

    Ok(AudioAnalysisResult {
        bpm,
        duration,
        bass_level: profile.bass_level,
        mid_level: profile.mid_level,
        treble_level: profile.treble_level,
        dominant_freq: profile.dominant,
        energy_level: dynamics.energy_level,
        dynamics: dynamics.dynamics,
        avg_energy: dynamics.avg_energy,
        dynamic_range: dynamics.dynamic_range,
        structure,
    })
}

/// Drives `Idle -> Decoding -> Analyzing -> Complete | Failed` for one file
/// or recording at a time.
pub struct AudioFeatureEstimator {
    config: AnalysisConfig,
    state: AnalysisState,
}

impl AudioFeatureEstimator {
    /// Rejects a config that fails [`AnalysisConfig::validate`].
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: AnalysisState::Idle,
        })
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.state = AnalysisState::Idle;
    }

    /// Decode `path` and analyse it. Decoder failures are surfaced as
    /// `AnalysisError::Decode`; the estimator never invents a result for a
    /// file it could not read.
    pub fn analyze_file<P: AsRef<Path>>(&mut self, path: P) -> Result<AudioAnalysisResult> {
        self.state = AnalysisState::Decoding;
        info!("Decoding {}", path.as_ref().display());

        let buffer = match decode_file(&path) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Decoding failed: {}", e);
                self.state = AnalysisState::Failed;
                return Err(e);
            }
        };

        self.analyze_buffer(&buffer)
    }

    /// Analyse an already decoded buffer.
    ///
    /// A buffer with no channels or a zero sample rate is rejected as
    /// `BadInput`; a zero-length or silent channel is analysed normally and
    /// yields the conservative defaults.
    pub fn analyze_buffer(&mut self, buffer: &PcmBuffer) -> Result<AudioAnalysisResult> {
        self.state = AnalysisState::Analyzing;

        let samples = match Self::validate(buffer) {
            Ok(samples) => samples,
            Err(e) => {
                self.state = AnalysisState::Failed;
                return Err(e);
            }
        };

        let started = Instant::now();
        let result = match analyze_pcm(samples, buffer.sample_rate, &self.config) {
            Ok(result) => result,
            Err(e) => {
                self.state = AnalysisState::Failed;
                return Err(e);
            }
        };
        debug!("Analysed {:.2}s of audio in {:?}", result.duration, started.elapsed());
        info!(
            "Analysis complete: {} BPM, {}, {} energy, {}",
            result.bpm, result.dominant_freq, result.energy_level, result.structure
        );

        self.state = AnalysisState::Complete;
        Ok(result)
    }

    fn validate(buffer: &PcmBuffer) -> Result<&[f32]> {
        if buffer.sample_rate == 0 {
            return Err(AnalysisError::BadInput("sample rate is zero".to_string()));
        }
        buffer
            .channel(0)
            .ok_or_else(|| AnalysisError::BadInput("buffer has no channels".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{decode::write_wav, structure::CONSISTENT, synth};

    fn estimator() -> AudioFeatureEstimator {
        AudioFeatureEstimator::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn five_seconds_of_silence() {
        let mut estimator = estimator();
        let result = estimator
            .analyze_buffer(&PcmBuffer::mono(synth::silence(5.0, 44100), 44100))
            .unwrap();

        assert_eq!(result.bpm, 120);
        assert_eq!(result.energy_level, EnergyLevel::Low);
        assert_eq!(result.dominant_freq, DominantFrequency::Balanced);
        assert_eq!(result.dynamics, Dynamics::Compressed);
        assert_eq!(result.structure, CONSISTENT);
        assert_eq!((result.bass_level, result.mid_level, result.treble_level), (0, 0, 0));
        assert_eq!(result.avg_energy, 0);
        assert_eq!(result.dynamic_range, 1.0);
        assert!((result.duration - 5.0).abs() < 1e-6);
        assert_eq!(estimator.state(), AnalysisState::Complete);
    }

    #[test]
    fn zero_length_buffer_gets_defaults() {
        let result = estimator()
            .analyze_buffer(&PcmBuffer::mono(Vec::new(), 48000))
            .unwrap();
        assert_eq!(result.bpm, 120);
        assert_eq!(result.duration, 0.0);
        assert_eq!(result.structure, CONSISTENT);
        assert_eq!(result.dominant_freq, DominantFrequency::Balanced);
    }

    #[test]
    fn swell_reports_quiet_start_and_fade() {
        let result = estimator()
            .analyze_buffer(&PcmBuffer::mono(synth::triangle_swell(20.0, 8000, 220.0), 8000))
            .unwrap();
        let structure = result.structure.to_lowercase();
        assert!(structure.contains("quiet"), "{}", result.structure);
        assert!(structure.contains("fade"), "{}", result.structure);
    }

    #[test]
    fn click_track_end_to_end() {
        let result = estimator()
            .analyze_buffer(&PcmBuffer::mono(synth::click_track(100.0, 10.0, 44100, 10.0, 0.8), 44100))
            .unwrap();
        assert!((99..=101).contains(&result.bpm), "{}", result.bpm);
        assert_eq!(result.energy_level, EnergyLevel::Low);
    }

    #[test]
    fn only_first_channel_is_read() {
        let buffer = PcmBuffer {
            channels: vec![synth::silence(3.0, 8000), synth::sine(200.0, 3.0, 8000, 0.9)],
            sample_rate: 8000,
        };
        let result = estimator().analyze_buffer(&buffer).unwrap();
        assert_eq!(result.avg_energy, 0);
        assert_eq!(result.energy_level, EnergyLevel::Low);
    }

    #[test]
    fn structurally_invalid_buffers_fail() {
        let mut estimator = estimator();

        let err = estimator
            .analyze_buffer(&PcmBuffer { channels: Vec::new(), sample_rate: 44100 })
            .unwrap_err();
        assert!(matches!(err, AnalysisError::BadInput(_)));
        assert_eq!(estimator.state(), AnalysisState::Failed);

        let err = estimator
            .analyze_buffer(&PcmBuffer::mono(vec![0.0; 100], 0))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::BadInput(_)));

        estimator.reset();
        assert_eq!(estimator.state(), AnalysisState::Idle);
    }

    #[test]
    fn unusable_tempo_range_is_rejected_up_front() {
        let mut config = AnalysisConfig::default();
        config.tempo.min_bpm = 0;
        config.tempo.max_bpm = 0;

        assert!(matches!(
            AudioFeatureEstimator::new(config.clone()),
            Err(AnalysisError::Config(_))
        ));
        let clicks = synth::click_track(120.0, 5.0, 44100, 10.0, 0.8);
        assert!(matches!(analyze_pcm(&clicks, 44100, &config), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn file_round_trip_and_decode_failure() {
        let path = std::env::temp_dir().join(format!("chromesthesia-estimator-{}.wav", std::process::id()));
        write_wav(&path, &PcmBuffer::mono(synth::click_track(120.0, 6.0, 44100, 10.0, 0.8), 44100)).unwrap();

        let mut estimator = estimator();
        let result = estimator.analyze_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(result.bpm, 120);
        assert_eq!(estimator.state(), AnalysisState::Complete);

        assert!(estimator.analyze_file(&path).is_err());
        assert_eq!(estimator.state(), AnalysisState::Failed);
    }

    #[test]
    fn json_shape() {
        let result = analyze_pcm(&synth::silence(1.0, 8000), 8000, &AnalysisConfig::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["bpm"], 120);
        assert_eq!(json["dominantFreq"], "balanced");
        assert_eq!(json["energyLevel"], "low");
        assert_eq!(json["dynamics"], "compressed/consistent");
        assert_eq!(json["dynamicRange"], "1.00");
        assert_eq!(json["structure"], CONSISTENT);
        assert_eq!(json["bassLevel"], 0);

        let back: AudioAnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
