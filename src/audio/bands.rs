use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Band split used by the live extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BandLayout {
    /// bass / mids / treble
    #[default]
    Three,
    /// subBass .. treble, used by the advanced visualizer
    Eight,
}

impl BandLayout {
    /// Bin boundaries for a snapshot of `bins` entries. Always starts at 0,
    /// ends at `bins` and never decreases.
    pub fn boundaries(self, bins: usize) -> Vec<usize> {
        match self {
            BandLayout::Three => vec![0, bins / 6, bins * 2 / 3, bins],
            // Coarse linear fractions, doubling towards the low end.
            BandLayout::Eight => vec![
                0,
                bins / 64,
                bins / 32,
                bins / 16,
                bins / 8,
                bins / 4,
                bins / 2,
                bins * 3 / 4,
                bins,
            ],
        }
    }

    pub fn band_count(self) -> usize {
        match self {
            BandLayout::Three => 3,
            BandLayout::Eight => 8,
        }
    }
}

impl FromStr for BandLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "3" | "three" => Ok(BandLayout::Three),
            "8" | "eight" => Ok(BandLayout::Eight),
            other => Err(format!("unknown band layout '{}', expected 3 or 8", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreeBands {
    pub bass: u8,
    pub mids: u8,
    pub treble: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EightBands {
    pub sub_bass: u8,
    pub bass: u8,
    pub low_mids: u8,
    pub mids: u8,
    pub high_mids: u8,
    pub presence: u8,
    pub brilliance: u8,
    pub treble: u8,
}

/// Per-frame band levels, each an integer percentage in `0..=100`.
///
/// Built fresh from every snapshot and replaced wholesale on the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BandIntensities {
    Three(ThreeBands),
    Eight(EightBands),
}

const THREE_LABELS: [&str; 3] = ["bass", "mids", "treble"];
const EIGHT_LABELS: [&str; 8] = [
    "subBass",
    "bass",
    "lowMids",
    "mids",
    "highMids",
    "presence",
    "brilliance",
    "treble",
];

impl BandIntensities {
    pub fn zeroed(layout: BandLayout) -> Self {
        match layout {
            BandLayout::Three => BandIntensities::Three(ThreeBands::default()),
            BandLayout::Eight => BandIntensities::Eight(EightBands::default()),
        }
    }

    pub fn layout(&self) -> BandLayout {
        match self {
            BandIntensities::Three(_) => BandLayout::Three,
            BandIntensities::Eight(_) => BandLayout::Eight,
        }
    }

    /// Band values in ascending frequency order.
    pub fn values(&self) -> Vec<u8> {
        match *self {
            BandIntensities::Three(b) => vec![b.bass, b.mids, b.treble],
            BandIntensities::Eight(b) => vec![
                b.sub_bass,
                b.bass,
                b.low_mids,
                b.mids,
                b.high_mids,
                b.presence,
                b.brilliance,
                b.treble,
            ],
        }
    }

    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            BandIntensities::Three(_) => &THREE_LABELS,
            BandIntensities::Eight(_) => &EIGHT_LABELS,
        }
    }

    fn from_values(layout: BandLayout, v: &[u8]) -> Self {
        match layout {
            BandLayout::Three => BandIntensities::Three(ThreeBands {
                bass: v[0],
                mids: v[1],
                treble: v[2],
            }),
            BandLayout::Eight => BandIntensities::Eight(EightBands {
                sub_bass: v[0],
                bass: v[1],
                low_mids: v[2],
                mids: v[3],
                high_mids: v[4],
                presence: v[5],
                brilliance: v[6],
                treble: v[7],
            }),
        }
    }
}

impl fmt::Display for BandIntensities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.labels().iter().zip(self.values()).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={:>3}", label, value)?;
        }
        Ok(())
    }
}

/// Reduce a byte frequency snapshot to band percentages.
///
/// Each band is the mean magnitude of its bin range scaled to `0..=100`.
/// An empty snapshot yields all zeros; this runs inside the frame loop and
/// must never fail.
pub fn extract_bands(snapshot: &[u8], layout: BandLayout) -> BandIntensities {
    if snapshot.is_empty() {
        return BandIntensities::zeroed(layout);
    }

    let bounds = layout.boundaries(snapshot.len());
    let mut values = [0u8; 8];
    for (slot, edge) in values.iter_mut().zip(bounds.windows(2)) {
        *slot = band_percent(average_range(snapshot, edge[0], edge[1]));
    }

    BandIntensities::from_values(layout, &values[..layout.band_count()])
}

/// Mean of `data[start..end]`, or 0 for an empty or out-of-range span.
pub fn average_range(data: &[u8], start: usize, end: usize) -> f32 {
    let end = end.min(data.len());
    if start >= end {
        return 0.0;
    }

    let sum: u32 = data[start..end].iter().map(|&v| v as u32).sum();
    sum as f32 / (end - start) as f32
}

/// `round(clamp(mean / 255, 0, 1) * 100)`
pub fn band_percent(mean: f32) -> u8 {
    ((mean / 255.0).clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 37 + 11) % 256) as u8).collect()
    }

    #[test]
    fn bass_only_snapshot() {
        let mut snapshot = vec![0u8; 2048];
        for v in snapshot.iter_mut().take(2048 / 6) {
            *v = 255;
        }

        let bands = extract_bands(&snapshot, BandLayout::Three);
        assert_eq!(
            bands,
            BandIntensities::Three(ThreeBands { bass: 100, mids: 0, treble: 0 })
        );
    }

    #[test]
    fn silence_and_full_scale() {
        for layout in [BandLayout::Three, BandLayout::Eight] {
            let zeros = extract_bands(&vec![0u8; 1024], layout);
            assert!(zeros.values().iter().all(|&v| v == 0));

            let full = extract_bands(&vec![255u8; 1024], layout);
            assert!(full.values().iter().all(|&v| v == 100), "{:?}", full);
        }
    }

    #[test]
    fn empty_snapshot_is_zero() {
        assert_eq!(
            extract_bands(&[], BandLayout::Eight),
            BandIntensities::zeroed(BandLayout::Eight)
        );
        assert_eq!(extract_bands(&[], BandLayout::Three).values(), vec![0, 0, 0]);
    }

    #[test]
    fn degenerate_lengths_do_not_panic() {
        for len in 1..20 {
            let snapshot = vec![200u8; len];
            for layout in [BandLayout::Three, BandLayout::Eight] {
                let bands = extract_bands(&snapshot, layout);
                assert_eq!(bands.values().len(), layout.band_count());
                assert!(bands.values().iter().all(|&v| v == 0 || v == 78));
            }
        }
    }

    #[test]
    fn values_in_range_and_idempotent() {
        let snapshot = ramp(1024);
        for layout in [BandLayout::Three, BandLayout::Eight] {
            let a = extract_bands(&snapshot, layout);
            let b = extract_bands(&snapshot, layout);
            assert_eq!(a, b);
            assert!(a.values().iter().all(|&v| v <= 100));
        }
    }

    #[test]
    fn scaling_down_never_raises_a_band() {
        let snapshot = ramp(2048);
        for k in [1.0f32, 0.9, 0.5, 0.25, 0.01] {
            let scaled: Vec<u8> = snapshot.iter().map(|&v| (v as f32 * k) as u8).collect();
            for layout in [BandLayout::Three, BandLayout::Eight] {
                let before = extract_bands(&snapshot, layout).values();
                let after = extract_bands(&scaled, layout).values();
                for (b, a) in before.iter().zip(&after) {
                    assert!(a <= b, "k={} raised a band: {:?} -> {:?}", k, before, after);
                }
            }
        }
    }

    #[test]
    fn eight_band_ranges_cover_the_spectrum() {
        for bins in [8usize, 64, 1024, 4096] {
            let bounds = BandLayout::Eight.boundaries(bins);
            assert_eq!(bounds.first(), Some(&0));
            assert_eq!(bounds.last(), Some(&bins));
            assert!(bounds.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn eight_band_treble_only() {
        let mut snapshot = vec![0u8; 1024];
        for v in snapshot.iter_mut().skip(768) {
            *v = 255;
        }
        let values = extract_bands(&snapshot, BandLayout::Eight).values();
        assert_eq!(values, vec![0, 0, 0, 0, 0, 0, 0, 100]);
    }

    #[test]
    fn layout_parsing() {
        assert_eq!("3".parse::<BandLayout>(), Ok(BandLayout::Three));
        assert_eq!("Eight".parse::<BandLayout>(), Ok(BandLayout::Eight));
        assert!("5".parse::<BandLayout>().is_err());
    }
}
