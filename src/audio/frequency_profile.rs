use serde::{Deserialize, Serialize};
use std::fmt;

use super::bands::{average_range, band_percent};
use super::fft::SpectrumAnalyser;
use crate::config::{FrequencyConfig, SpectrumConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantFrequency {
    #[serde(rename = "bass-heavy")]
    BassHeavy,
    #[serde(rename = "treble-heavy")]
    TrebleHeavy,
    #[serde(rename = "mid-focused")]
    MidFocused,
    #[serde(rename = "balanced")]
    Balanced,
}

impl fmt::Display for DominantFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DominantFrequency::BassHeavy => "bass-heavy",
            DominantFrequency::TrebleHeavy => "treble-heavy",
            DominantFrequency::MidFocused => "mid-focused",
            DominantFrequency::Balanced => "balanced",
        };
        f.write_str(label)
    }
}

/// Coarse spectral balance of a whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyProfile {
    pub bass_level: u8,
    pub mid_level: u8,
    pub treble_level: u8,
    pub dominant: DominantFrequency,
}

impl Default for FrequencyProfile {
    fn default() -> Self {
        Self {
            bass_level: 0,
            mid_level: 0,
            treble_level: 0,
            dominant: DominantFrequency::Balanced,
        }
    }
}

/// Classify a byte spectrum by the relative weight of three fixed bin ranges.
///
/// The ranges are absolute bin indices (a low-end prefix of the spectrum), so
/// the result depends on FFT size. Ranges past the end of `spectrum` are
/// clipped and count as 0.
pub fn classify_spectrum(spectrum: &[u8], config: &FrequencyConfig) -> FrequencyProfile {
    let bass = average_range(spectrum, config.bass_bins.0, config.bass_bins.1);
    let mid = average_range(spectrum, config.mid_bins.0, config.mid_bins.1);
    let treble = average_range(spectrum, config.treble_bins.0, config.treble_bins.1);

    let total = bass + mid + treble;
    let dominant = if total <= 0.0 {
        DominantFrequency::Balanced
    } else if bass / total > config.bass_dominance {
        DominantFrequency::BassHeavy
    } else if treble / total > config.treble_dominance {
        DominantFrequency::TrebleHeavy
    } else if mid / total > config.mid_dominance {
        DominantFrequency::MidFocused
    } else {
        DominantFrequency::Balanced
    };

    FrequencyProfile {
        bass_level: band_percent(bass),
        mid_level: band_percent(mid),
        treble_level: band_percent(treble),
        dominant,
    }
}

/// Run the whole buffer through the analyser once and classify the result.
pub fn analyze_frequency_profile(
    samples: &[f32],
    spectrum: &SpectrumConfig,
    config: &FrequencyConfig,
) -> FrequencyProfile {
    let mut analyser = SpectrumAnalyser::new(spectrum.clone());
    let bytes = analyser.average_byte_spectrum(samples);
    classify_spectrum(&bytes, config)
}
