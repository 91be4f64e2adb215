use hound::{SampleFormat, WavSpec, WavWriter};
use log::{info, warn};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::PcmBuffer;
use crate::error::{AnalysisError, Result};

/// Decode an audio file (WAV, FLAC, OGG/Vorbis, MP3, AAC/M4A) into planar
/// `f32` channels.
///
/// Corrupt packets are skipped. A file that yields no samples at all is a
/// decode failure, not an empty buffer.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<PcmBuffer> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_error(path, e))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode(format!("no audio track in {}", path.display())))?
        .clone();

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::Decode(format!("unknown sample rate in {}", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(path, e))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(path, e)),
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped += 1;
                warn!("Skipping corrupt packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(decode_error(path, e)),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channel_count == 0 {
            continue;
        }
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
    }

    let buffer = PcmBuffer { channels, sample_rate };
    if buffer.frames() == 0 {
        return Err(AnalysisError::Decode(format!(
            "no audio samples decoded from {}",
            path.display()
        )));
    }

    info!(
        "Decoded {} ({} Hz, {} channel(s), {:.2}s{})",
        path.display(),
        buffer.sample_rate,
        buffer.channels.len(),
        buffer.duration_seconds(),
        if skipped > 0 { format!(", {} packets skipped", skipped) } else { String::new() }
    );
    Ok(buffer)
}

/// Write a 32-bit float WAV.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &PcmBuffer) -> Result<()> {
    if buffer.channels.is_empty() || buffer.sample_rate == 0 {
        return Err(AnalysisError::BadInput(
            "cannot write a buffer with no channels or zero sample rate".to_string(),
        ));
    }

    let spec = WavSpec {
        channels: buffer.channels.len() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec).map_err(wav_error)?;
    for i in 0..buffer.frames() {
        for channel in &buffer.channels {
            writer
                .write_sample(channel.get(i).copied().unwrap_or(0.0))
                .map_err(wav_error)?;
        }
    }
    writer.finalize().map_err(wav_error)?;
    Ok(())
}

fn decode_error(path: &Path, err: SymphoniaError) -> AnalysisError {
    AnalysisError::Decode(format!("{}: {}", path.display(), err))
}

fn wav_error(err: hound::Error) -> AnalysisError {
    match err {
        hound::Error::IoError(e) => AnalysisError::Io(e),
        other => AnalysisError::BadInput(other.to_string()),
    }
}
