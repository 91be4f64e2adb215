//! Deterministic test signals, shared by the `synth` command and the tests.

use std::f32::consts::PI;

/// Rectangular clicks of `click_ms` at `amplitude`, one per beat.
pub fn click_track(bpm: f32, seconds: f32, sample_rate: u32, click_ms: f32, amplitude: f32) -> Vec<f32> {
    let len = (seconds * sample_rate as f32) as usize;
    let mut samples = vec![0.0; len];
    if bpm <= 0.0 {
        return samples;
    }

    let period = 60.0 / bpm as f64 * sample_rate as f64;
    let click_len = (click_ms / 1000.0 * sample_rate as f32) as usize;

    let mut beat = 0u64;
    loop {
        let start = (beat as f64 * period).round() as usize;
        if start >= len {
            break;
        }
        let end = (start + click_len).min(len);
        samples[start..end].iter_mut().for_each(|s| *s = amplitude);
        beat += 1;
    }
    samples
}

pub fn sine(freq: f32, seconds: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let len = (seconds * sample_rate as f32) as usize;
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Sine carrier under a triangular envelope: near silence, full scale at the
/// midpoint, back to near silence at the end.
pub fn triangle_swell(seconds: f32, sample_rate: u32, carrier_hz: f32) -> Vec<f32> {
    let len = (seconds * sample_rate as f32) as usize;
    let floor = 0.01;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = floor + (1.0 - floor) * (1.0 - (2.0 * t / seconds - 1.0).abs());
            envelope * (2.0 * PI * carrier_hz * t).sin()
        })
        .collect()
}

pub fn silence(seconds: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; (seconds * sample_rate as f32) as usize]
}
