use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

use crate::config::SpectrumConfig;

/// Byte-spectrum analyser with the same output conventions as a Web Audio
/// `AnalyserNode`: Blackman window, magnitudes scaled by `1/fft_size`,
/// exponential time smoothing, and a linear map of
/// `[min_decibels, max_decibels]` onto `0..=255`.
///
/// This is the upstream collaborator that feeds [`extract_bands`]; the
/// extractor itself stays stateless.
///
/// [`extract_bands`]: super::bands::extract_bands
pub struct SpectrumAnalyser {
    config: SpectrumConfig,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl SpectrumAnalyser {
    /// `config` is assumed validated (power-of-two `fft_size`).
    pub fn new(config: SpectrumConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            window: Self::blackman_window(fft_size),
            fft,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            bytes: vec![0; fft_size / 2],
            config,
        }
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let alpha = 0.16f32;
        let a0 = 0.5 * (1.0 - alpha);
        let a1 = 0.5;
        let a2 = 0.5 * alpha;

        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    /// Centre frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.config.fft_size as f32
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
        self.bytes.iter_mut().for_each(|v| *v = 0);
    }

    /// Analyse the most recent `fft_size` samples of `frame` and return the
    /// smoothed byte spectrum. Shorter input is zero-padded at the front.
    pub fn process(&mut self, frame: &[f32]) -> &[u8] {
        self.load_frame(frame);
        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing_time_constant;
        let scale = 1.0 / self.config.fft_size as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.buffer.iter()) {
            let magnitude = bin.norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            // Flush NaN/inf so one bad frame cannot poison the history.
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }

        for (byte, &magnitude) in self.bytes.iter_mut().zip(self.smoothed.iter()) {
            *byte = to_byte(magnitude, self.config.min_decibels, self.config.max_decibels);
        }
        &self.bytes
    }

    /// One pass over an entire buffer: the mean linear magnitude across
    /// consecutive `fft_size` frames, converted to bytes. No time smoothing is
    /// applied and the analyser's live history is left untouched.
    ///
    /// When the length is not a multiple of `fft_size`, the last frame is
    /// aligned to the end of the buffer (overlapping its predecessor) so the
    /// tail is analysed without a hard cut; a buffer shorter than one frame is
    /// zero-padded.
    pub fn average_byte_spectrum(&mut self, samples: &[f32]) -> Vec<u8> {
        let fft_size = self.config.fft_size;
        let bins = self.bin_count();
        let mut sum = vec![0.0f64; bins];
        let mut frames = 0usize;

        let mut starts: Vec<usize> = (0..samples.len() / fft_size).map(|i| i * fft_size).collect();
        if samples.len() % fft_size != 0 {
            starts.push(samples.len().saturating_sub(fft_size));
        }

        for start in starts {
            let chunk = &samples[start..samples.len().min(start + fft_size)];
            for (i, slot) in self.buffer.iter_mut().enumerate() {
                let sample = chunk.get(i).copied().unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.fft.process(&mut self.buffer);

            for (acc, bin) in sum.iter_mut().zip(self.buffer.iter()) {
                *acc += (bin.norm() / fft_size as f32) as f64;
            }
            frames += 1;
        }

        if frames == 0 {
            return vec![0; bins];
        }

        sum.iter()
            .map(|&total| {
                to_byte(
                    (total / frames as f64) as f32,
                    self.config.min_decibels,
                    self.config.max_decibels,
                )
            })
            .collect()
    }

    fn load_frame(&mut self, frame: &[f32]) {
        let fft_size = self.config.fft_size;
        let take = frame.len().min(fft_size);
        let pad = fft_size - take;
        let recent = &frame[frame.len() - take..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
    }
}

fn to_byte(magnitude: f32, min_db: f32, max_db: f32) -> u8 {
    if magnitude <= 0.0 || !magnitude.is_finite() {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - min_db) / (max_db - min_db);
    scaled.floor().clamp(0.0, 255.0) as u8
}
