use crossbeam_channel::{tick, Receiver};
use log::debug;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use super::bands::{extract_bands, BandIntensities, BandLayout};
use super::fft::SpectrumAnalyser;
use super::PcmBuffer;
use crate::config::SpectrumConfig;

/// Anything that can hand the live extractor a byte spectrum on demand.
pub trait SnapshotSource {
    /// Current spectrum, `elapsed` since the ticker started. `None` when no
    /// audio is available yet; the extractor then reports silence.
    fn next_snapshot(&mut self, elapsed: Duration) -> Option<&[u8]>;

    /// True once the source has nothing more to play.
    fn is_finished(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub max_frame: Duration,
    pub total: Duration,
}

impl FrameStats {
    pub fn mean_frame(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames as u32
        }
    }
}

/// Periodic driver for the live extractor.
///
/// Ticks come from a bounded `crossbeam_channel::tick`, so when a frame
/// overruns the period the missed ticks are dropped, not replayed.
pub struct FrameTicker {
    period: Duration,
    layout: BandLayout,
}

impl FrameTicker {
    pub fn new(fps: u32, layout: BandLayout) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            layout,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Pull a snapshot each tick, reduce it to bands and pass them to
    /// `on_frame` until it breaks or the source finishes.
    pub fn run<S, F>(&self, source: &mut S, mut on_frame: F) -> FrameStats
    where
        S: SnapshotSource + ?Sized,
        F: FnMut(&BandIntensities) -> ControlFlow<()>,
    {
        let ticker: Receiver<Instant> = tick(self.period);
        let started = Instant::now();
        let mut stats = FrameStats::default();

        while !source.is_finished() {
            if ticker.recv().is_err() {
                break;
            }

            let frame_start = Instant::now();
            let bands = match source.next_snapshot(started.elapsed()) {
                Some(snapshot) => extract_bands(snapshot, self.layout),
                None => BandIntensities::zeroed(self.layout),
            };
            let flow = on_frame(&bands);

            let spent = frame_start.elapsed();
            stats.frames += 1;
            stats.total += spent;
            stats.max_frame = stats.max_frame.max(spent);

            if stats.frames % 120 == 0 {
                debug!(
                    "Frame {}: {} (mean {:?}, worst {:?})",
                    stats.frames,
                    bands,
                    stats.mean_frame(),
                    stats.max_frame
                );
            }

            if flow.is_break() {
                break;
            }
        }
        stats
    }
}

/// Plays a decoded buffer back in wall-clock time through an analyser, the
/// way a media element feeds an `AnalyserNode`.
pub struct FileSnapshotSource {
    samples: Vec<f32>,
    sample_rate: u32,
    analyser: SpectrumAnalyser,
    position: usize,
}

impl FileSnapshotSource {
    /// Uses channel 0 of `buffer`.
    pub fn new(buffer: &PcmBuffer, spectrum: SpectrumConfig) -> Self {
        Self {
            samples: buffer.channel(0).map(|c| c.to_vec()).unwrap_or_default(),
            sample_rate: buffer.sample_rate,
            analyser: SpectrumAnalyser::new(spectrum),
            position: 0,
        }
    }

    pub fn position_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.position as f32 / self.sample_rate as f32
        }
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn next_snapshot(&mut self, elapsed: Duration) -> Option<&[u8]> {
        if self.samples.is_empty() {
            return None;
        }
        let position = (elapsed.as_secs_f64() * self.sample_rate as f64) as usize;
        self.position = position.min(self.samples.len());
        Some(self.analyser.process(&self.samples[..self.position]))
    }

    fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth;

    /// Hands out a fixed snapshot a set number of times.
    struct Fixed {
        snapshot: Vec<u8>,
        remaining: usize,
    }

    impl SnapshotSource for Fixed {
        fn next_snapshot(&mut self, _elapsed: Duration) -> Option<&[u8]> {
            self.remaining = self.remaining.saturating_sub(1);
            Some(&self.snapshot)
        }

        fn is_finished(&self) -> bool {
            self.remaining == 0
        }
    }

    struct Empty;

    impl SnapshotSource for Empty {
        fn next_snapshot(&mut self, _elapsed: Duration) -> Option<&[u8]> {
            None
        }
    }

    #[test]
    fn runs_until_source_finishes() {
        let mut source = Fixed { snapshot: vec![255; 1024], remaining: 5 };
        let mut seen = Vec::new();
        let stats = FrameTicker::new(200, BandLayout::Three).run(&mut source, |bands| {
            seen.push(*bands);
            ControlFlow::Continue(())
        });

        assert_eq!(stats.frames, 5);
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|b| b.values() == vec![100, 100, 100]));
    }

    #[test]
    fn callback_can_stop_and_missing_audio_is_silence() {
        let mut frames = 0;
        let stats = FrameTicker::new(200, BandLayout::Eight).run(&mut Empty, |bands| {
            frames += 1;
            assert!(bands.values().iter().all(|&v| v == 0));
            if frames == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(stats.frames, 3);
    }

    #[test]
    fn file_source_tracks_wall_clock() {
        let buffer = PcmBuffer::mono(synth::sine(100.0, 1.0, 8000, 0.8), 8000);
        let mut source = FileSnapshotSource::new(&buffer, SpectrumConfig::default());

        assert!(!source.is_finished());
        let snapshot = source.next_snapshot(Duration::from_millis(500)).unwrap().to_vec();
        assert_eq!(snapshot.len(), 1024);
        assert!((source.position_seconds() - 0.5).abs() < 1e-3);
        assert!(extract_bands(&snapshot, BandLayout::Three).values()[0] > 0);

        source.next_snapshot(Duration::from_secs(2));
        assert!(source.is_finished());
    }

    #[test]
    fn period_follows_fps() {
        assert_eq!(FrameTicker::new(50, BandLayout::Three).period(), Duration::from_millis(20));
        // fps 0 is clamped rather than dividing by zero
        assert_eq!(FrameTicker::new(0, BandLayout::Three).period(), Duration::from_secs(1));
    }
}
