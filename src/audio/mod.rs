pub mod bands;
pub mod beat_detector;
pub mod decode;
pub mod dynamics;
pub mod estimator;
pub mod fft;
pub mod frequency_profile;
pub mod scheduler;
pub mod structure;
pub mod synth;

#[cfg(feature = "device")]
pub mod playback;
#[cfg(feature = "device")]
pub mod processor;

pub use bands::{extract_bands, BandIntensities, BandLayout, EightBands, ThreeBands};
pub use beat_detector::detect_bpm;
pub use decode::{decode_file, write_wav};
pub use dynamics::{Dynamics, EnergyLevel};
pub use estimator::{analyze_pcm, AnalysisState, AudioAnalysisResult, AudioFeatureEstimator};
pub use fft::SpectrumAnalyser;
pub use frequency_profile::DominantFrequency;
pub use scheduler::{FileSnapshotSource, FrameTicker, SnapshotSource};

#[cfg(feature = "device")]
pub use playback::AudioPlayback;
#[cfg(feature = "device")]
pub use processor::AudioProcessor;

/// Decoded PCM: planar `f32` channels in `[-1, 1]` at `sample_rate` Hz.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PcmBuffer {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// Sample frames per channel (length of the longest channel).
    pub fn frames(&self) -> usize {
        self.channels.iter().map(|c| c.len()).max().unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.sample_rate as f32
        }
    }
}
