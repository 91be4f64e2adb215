use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DynamicsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnergyLevel::Low => "low",
            EnergyLevel::Medium => "medium",
            EnergyLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dynamics {
    #[serde(rename = "wide dynamic range")]
    Wide,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "compressed/consistent")]
    Compressed,
}

impl fmt::Display for Dynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dynamics::Wide => "wide dynamic range",
            Dynamics::Moderate => "moderate",
            Dynamics::Compressed => "compressed/consistent",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsProfile {
    /// Mean window RMS on the sample scale.
    pub avg_energy_raw: f32,
    /// `avg_energy_raw * 100`, rounded.
    pub avg_energy: u8,
    /// Loudest window RMS over the mean; 1.0 for silence.
    pub dynamic_range: f32,
    pub energy_level: EnergyLevel,
    pub dynamics: Dynamics,
}

/// RMS of contiguous, non-overlapping windows. The trailing partial window
/// is kept and measured over its own length.
pub fn window_rms(samples: &[f32], window_len: usize) -> Vec<f32> {
    samples.chunks(window_len.max(1)).map(rms).collect()
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Loudness and dynamic-range summary from 100 ms RMS windows.
pub fn analyze_dynamics(samples: &[f32], sample_rate: u32, config: &DynamicsConfig) -> DynamicsProfile {
    let window_len = ((sample_rate as f32 * config.window_seconds) as usize).max(1);
    let windows = window_rms(samples, window_len);

    let (avg, max) = if windows.is_empty() {
        (0.0, 0.0)
    } else {
        let sum: f32 = windows.iter().sum();
        let max = windows.iter().fold(0.0f32, |a, &b| a.max(b));
        (sum / windows.len() as f32, max)
    };

    let dynamic_range = if avg > 0.0 { max / avg } else { 1.0 };

    let energy_level = if avg < config.low_energy {
        EnergyLevel::Low
    } else if avg > config.high_energy {
        EnergyLevel::High
    } else {
        EnergyLevel::Medium
    };

    let dynamics = if dynamic_range > config.wide_range {
        Dynamics::Wide
    } else if dynamic_range < config.compressed_range {
        Dynamics::Compressed
    } else {
        Dynamics::Moderate
    };

    DynamicsProfile {
        avg_energy_raw: avg,
        avg_energy: (avg * 100.0).round().clamp(0.0, 100.0) as u8,
        dynamic_range,
        energy_level,
        dynamics,
    }
}
