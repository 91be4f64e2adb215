use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::time::Duration;

use super::fft::SpectrumAnalyser;
use super::scheduler::SnapshotSource;
use crate::config::SpectrumConfig;
use crate::error::{AnalysisError, Result};

/// Microphone capture feeding a live analyser.
///
/// The cpal callback only forwards raw blocks; mixdown and analysis happen on
/// the ticker's thread when a snapshot is requested.
pub struct AudioProcessor {
    _stream: Stream,
    audio_receiver: Receiver<Vec<f32>>,
    window: VecDeque<f32>,
    scratch: Vec<f32>,
    analyser: SpectrumAnalyser,
    sample_rate: u32,
    channels: usize,
}

impl AudioProcessor {
    pub fn new(spectrum: SpectrumConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AnalysisError::Device("no input device available".to_string()))?;

        let config = device
            .default_input_config()
            .map_err(|e| AnalysisError::Device(format!("failed to get default input config: {}", e)))?;

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        info!("Audio config: {:?}", config);

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let (audio_sender, audio_receiver) = crossbeam_channel::unbounded();

        let stream = Self::create_input_stream(&device, &config.into(), audio_sender)?;
        stream
            .play()
            .map_err(|e| AnalysisError::Device(format!("failed to start input stream: {}", e)))?;

        let fft_size = spectrum.fft_size;
        Ok(Self {
            _stream: stream,
            audio_receiver,
            window: VecDeque::from(vec![0.0; fft_size]),
            scratch: Vec::with_capacity(fft_size),
            analyser: SpectrumAnalyser::new(spectrum),
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The callback only copies the interleaved block out; mixdown happens in
    /// [`drain`](Self::drain) on the consumer side.
    fn create_input_stream(device: &Device, config: &StreamConfig, sender: Sender<Vec<f32>>) -> Result<Stream> {
        debug!(
            "Opening {}-channel input at {} Hz",
            config.channels, config.sample_rate.0
        );

        let on_data = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Only fails once the processor, and with it the stream, is gone.
            let _ = sender.send(data.to_vec());
        };
        device
            .build_input_stream(config, on_data, |err| warn!("Input stream error: {}", err), None)
            .map_err(|e| AnalysisError::Device(format!("failed to build input stream: {}", e)))
    }

    /// Mix every pending block to mono and keep the newest `fft_size` samples.
    fn drain(&mut self) {
        let capacity = self.analyser.fft_size();
        while let Ok(block) = self.audio_receiver.try_recv() {
            self.window.extend(mix_to_mono(&block, self.channels));
            let excess = self.window.len().saturating_sub(capacity);
            self.window.drain(..excess);
        }
    }
}

fn mix_to_mono(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    let channels = channels.max(1);
    interleaved
        .chunks(channels)
        .map(move |frame| frame.iter().sum::<f32>() / channels as f32)
}

impl SnapshotSource for AudioProcessor {
    fn next_snapshot(&mut self, _elapsed: Duration) -> Option<&[u8]> {
        self.drain();
        self.scratch.clear();
        self.scratch.extend(self.window.iter().copied());
        Some(self.analyser.process(&self.scratch))
    }
}
