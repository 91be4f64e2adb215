use log::info;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Speaker playback that runs alongside `watch`, so the meter can be
/// compared against what is heard.
pub struct AudioPlayback {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl AudioPlayback {
    /// Open the default output device and queue `path`, paused.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AnalysisError::Device(format!("no output device: {}", e)))?;

        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)
            .map_err(|e| AnalysisError::Decode(format!("{}: {}", path.as_ref().display(), e)))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| AnalysisError::Device(format!("failed to open sink: {}", e)))?;
        sink.append(source);
        sink.pause();

        info!("Loaded audio file for playback: {:?}", path.as_ref());
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    pub fn play(&self) {
        self.sink.play();
        info!("Audio playback started");
    }
}
