//! `ExtractAudio` and `ChunkAudio` (§4.2): PCM extraction and
//! fixed-overlap chunking for the transcription fan-out (§4.5).

use std::path::{Path, PathBuf};

use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

const OVERLAP_SECONDS: f64 = 2.0;

/// Extract `path`'s audio track to 16 kHz mono PCM s16le WAV at `out_path`.
pub async fn extract_audio(
    path: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
    cancel: Option<watch::Receiver<bool>>,
) -> MediaResult<()> {
    let out_path = out_path.as_ref();
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let cmd = FfmpegCommand::new(path, out_path)
        .no_video()
        .audio_codec("pcm_s16le")
        .audio_channels(1)
        .audio_sample_rate(16_000);

    let mut runner = FfmpegRunner::new();
    if let Some(rx) = cancel {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd).await
}

/// A contiguous slice of the source audio to transcribe independently.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub path: PathBuf,
    pub index: u32,
    pub start: f64,
    pub end: f64,
}

/// Split `path` (duration `total_duration` seconds, `bytes` total size)
/// into chunks of approximately `chunk_mb` megabytes, with a fixed 2-second
/// overlap between consecutive chunks (§4.2, §4.5).
pub async fn chunk_audio(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    total_duration: f64,
    bytes: u64,
    chunk_mb: f64,
    cancel: Option<watch::Receiver<bool>>,
) -> MediaResult<Vec<AudioChunk>> {
    let path = path.as_ref();
    let out_dir = out_dir.as_ref();
    tokio::fs::create_dir_all(out_dir).await?;

    if total_duration <= 0.0 || bytes == 0 {
        return Ok(Vec::new());
    }

    let bytes_per_second = bytes as f64 / total_duration;
    let chunk_bytes = (chunk_mb * 1024.0 * 1024.0).max(1.0);
    let chunk_duration = (chunk_bytes / bytes_per_second).max(OVERLAP_SECONDS + 1.0);
    let stride = chunk_duration - OVERLAP_SECONDS;

    let mut chunks = Vec::new();
    let mut index = 0u32;
    let mut start = 0.0;

    while start < total_duration {
        let end = (start + chunk_duration).min(total_duration);
        let out_path = out_dir.join(format!("chunk-{:05}.wav", index));

        let cmd = FfmpegCommand::new(path, &out_path).seek(start).duration(end - start);
        let mut runner = FfmpegRunner::new();
        if let Some(rx) = cancel.clone() {
            runner = runner.with_cancel(rx);
        }
        runner.run(&cmd).await?;

        chunks.push(AudioChunk { path: out_path, index, start, end });

        index += 1;
        start += stride;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundaries_respect_stride() {
        // 100s clip, ~30MB at a bitrate implying ~8MB chunks -> several
        // overlapping segments, none exceeding total duration.
        let total_duration = 100.0;
        let bytes_per_second = 300_000.0;
        let bytes = (bytes_per_second * total_duration) as u64;
        let chunk_mb = 8.0;

        let chunk_duration = (chunk_mb * 1024.0 * 1024.0 / bytes_per_second).max(OVERLAP_SECONDS + 1.0);
        let stride = chunk_duration - OVERLAP_SECONDS;

        assert!(stride > 0.0);
        assert!(chunk_duration > stride);
    }
}
