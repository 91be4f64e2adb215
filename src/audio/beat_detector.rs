use crate::config::TempoConfig;
use log::debug;

/// Estimate tempo from the amplitude envelope of a whole buffer.
///
/// The rectified signal is downsampled, run through an attack/release
/// envelope follower, and the mean spacing of envelope peaks is converted to
/// beats per minute. Fewer than two peaks (silence, steady drones) yields the
/// configured fallback instead of an error.
pub fn detect_bpm(samples: &[f32], sample_rate: u32, config: &TempoConfig) -> u32 {
    if sample_rate == 0 || samples.is_empty() {
        return config.fallback_bpm;
    }

    let factor = config.downsample_factor.max(1);
    let env = envelope(samples, factor, config.attack, config.release);
    let peaks = find_peaks(&env, config.peak_threshold);

    if peaks.len() < 2 {
        debug!("Only {} envelope peaks, using fallback tempo", peaks.len());
        return config.fallback_bpm;
    }

    let span = (peaks[peaks.len() - 1] - peaks[0]) as f64;
    let avg_interval = span / (peaks.len() - 1) as f64;
    let interval_seconds = avg_interval * factor as f64 / sample_rate as f64;
    let raw_bpm = (60.0 / interval_seconds).round() as u32;

    let bpm = octave_correct(raw_bpm, config.min_bpm, config.max_bpm);
    debug!(
        "Tempo: {} peaks, mean interval {:.3}s, raw {} BPM, corrected {} BPM",
        peaks.len(),
        interval_seconds,
        raw_bpm,
        bpm
    );
    bpm
}

/// Fold half- and double-time estimates into `[min_bpm, max_bpm]`.
///
/// Lands inside the range when `max_bpm >= 2 * min_bpm - 1` (enforced by
/// config validation). Any other range still terminates, with the upper bound
/// taking precedence and a zero bound treated as 1.
pub fn octave_correct(bpm: u32, min_bpm: u32, max_bpm: u32) -> u32 {
    let mut bpm = bpm.max(1);
    while bpm < min_bpm {
        match bpm.checked_mul(2) {
            Some(doubled) => bpm = doubled,
            None => break,
        }
    }
    let ceiling = max_bpm.max(1);
    while bpm > ceiling {
        bpm = bpm / 2 + bpm % 2;
    }
    bpm
}

/// Asymmetric envelope follower over every `factor`th rectified sample.
pub fn envelope(samples: &[f32], factor: usize, attack: f32, release: f32) -> Vec<f32> {
    let mut level = 0.0f32;
    samples
        .iter()
        .step_by(factor.max(1))
        .map(|&s| {
            let x = s.abs();
            let coeff = if x > level { attack } else { release };
            level += (x - level) * coeff;
            level
        })
        .collect()
}

/// Indices of strict local maxima above `threshold`. Always increasing.
pub fn find_peaks(envelope: &[f32], threshold: f32) -> Vec<usize> {
    envelope
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .map(|(i, _)| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    fn config() -> TempoConfig {
        TempoConfig::default()
    }

    #[test]
    fn click_tracks_in_range() {
        for bpm in [90.0, 100.0, 120.0, 150.0] {
            let clicks = synth::click_track(bpm, 10.0, 44100, 10.0, 0.8);
            let detected = detect_bpm(&clicks, 44100, &config());
            assert!(
                (detected as i64 - bpm as i64).abs() <= 1,
                "expected ~{} got {}",
                bpm,
                detected
            );
        }
    }

    #[test]
    fn slow_and_fast_tempos_are_folded() {
        let slow = synth::click_track(40.0, 12.0, 44100, 10.0, 0.8);
        assert_eq!(detect_bpm(&slow, 44100, &config()), 80);

        let fast = synth::click_track(240.0, 10.0, 44100, 10.0, 0.8);
        assert_eq!(detect_bpm(&fast, 44100, &config()), 120);
    }

    #[test]
    fn silence_and_quiet_drone_fall_back() {
        let cfg = config();
        assert_eq!(detect_bpm(&synth::silence(5.0, 44100), 44100, &cfg), 120);
        assert_eq!(detect_bpm(&vec![0.05; 44100 * 3], 44100, &cfg), 120);
        assert_eq!(detect_bpm(&[], 44100, &cfg), 120);
        assert_eq!(detect_bpm(&[0.9, 0.0, 0.9], 0, &cfg), 120);
    }

    #[test]
    fn octave_correction_bounds() {
        for raw in 30..60 {
            assert_eq!(octave_correct(raw, 60, 180), raw * 2);
        }
        for raw in 181..=360 {
            assert_eq!(octave_correct(raw, 60, 180), (raw + 1) / 2);
        }
        for raw in 0..2000 {
            let bpm = octave_correct(raw, 60, 180);
            assert!((60..=180).contains(&bpm), "{} -> {}", raw, bpm);
        }
    }

    #[test]
    fn octave_correction_terminates_on_degenerate_ranges() {
        assert_eq!(octave_correct(120, 0, 0), 1);
        assert_eq!(octave_correct(0, 0, 0), 1);
        assert_eq!(octave_correct(50, 100, 60), 50);
        assert_eq!(octave_correct(3, u32::MAX, u32::MAX), 3 << 30);
        assert_eq!(octave_correct(u32::MAX, 1, 1), 1);
    }

    #[test]
    fn envelope_attacks_fast_and_releases_slow() {
        let mut signal = vec![1.0; 20];
        signal.extend(vec![0.0; 20]);
        let env = envelope(&signal, 1, 0.1, 0.01);

        assert!(env[19] > 0.85);
        assert!(env[39] > 0.7);
        assert!(env[39] < env[19]);
    }

    #[test]
    fn peaks_need_both_neighbours_and_threshold() {
        let env = [0.0, 0.2, 0.1, 0.05, 0.08, 0.06, 0.3, 0.3, 0.1];
        // 0.08 is below threshold, the 0.3 plateau is not a strict maximum
        assert_eq!(find_peaks(&env, 0.1), vec![1]);
    }
}
