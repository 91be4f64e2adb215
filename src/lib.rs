//! Audio analysis core for the Chromesthesia visualizer.
//!
//! Two entry points:
//! - [`audio::extract_bands`] reduces a live byte spectrum to 3 or 8 band
//!   percentages, once per animation frame;
//! - [`audio::AudioFeatureEstimator`] summarises a whole decoded file (tempo,
//!   spectral balance, energy, dynamics and a prose structure outline).

pub mod audio;
pub mod config;
pub mod error;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
