use crate::config::StructureConfig;

use super::dynamics::rms;

pub const CONSISTENT: &str = "Consistent energy throughout";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start_seconds: f32,
    pub rms: f32,
}

/// RMS per fixed-length segment, stamped with the segment start time.
pub fn segment_energy(samples: &[f32], sample_rate: u32, segment_seconds: f32) -> Vec<Segment> {
    let segment_len = ((sample_rate as f32 * segment_seconds) as usize).max(1);
    samples
        .chunks(segment_len)
        .enumerate()
        .map(|(i, chunk)| Segment {
            start_seconds: if sample_rate > 0 {
                (i * segment_len) as f32 / sample_rate as f32
            } else {
                0.0
            },
            rms: rms(chunk),
        })
        .collect()
}

/// Human-readable energy contour, e.g. `"Quiet start, Peak at 1:04, Fades out"`.
///
/// Compares the opening and closing thirds of the segments, and the loudest
/// segment, against the mean segment RMS. This is prose for a prompt, not a
/// formal segmentation.
pub fn describe_structure(samples: &[f32], sample_rate: u32, config: &StructureConfig) -> String {
    let segments = segment_energy(samples, sample_rate, config.segment_seconds);
    if segments.is_empty() {
        return CONSISTENT.to_string();
    }

    let mean = |s: &[Segment]| s.iter().map(|seg| seg.rms).sum::<f32>() / s.len() as f32;
    let average = mean(&segments);
    let third = segments.len() / 3;
    let mut parts: Vec<String> = Vec::new();

    if third > 0 {
        let start = mean(&segments[..third]);
        if start < average * config.quiet_ratio {
            parts.push("Quiet start".to_string());
        } else if start > average * config.loud_ratio {
            parts.push("Energetic start".to_string());
        }
    }

    // Earliest segment wins a tie.
    let peak = segments
        .iter()
        .fold(segments[0], |best, &seg| if seg.rms > best.rms { seg } else { best });
    if peak.rms > average * config.peak_ratio {
        parts.push(format!("Peak at {}", format_timestamp(peak.start_seconds)));
    }

    if third > 0 {
        let end = mean(&segments[segments.len() - third..]);
        if end < average * config.quiet_ratio {
            parts.push("Fades out".to_string());
        }
    }

    if parts.is_empty() {
        CONSISTENT.to_string()
    } else {
        parts.join(", ")
    }
}

/// `m:ss`
pub fn format_timestamp(seconds: f32) -> String {
    let total = seconds.max(0.0).floor() as u32;
    format!("{}:{:02}", total / 60, total % 60)
}
