//! `Probe(path) -> VideoMetadata` (§4.2): parses `ffprobe -print_format
//! json -show_streams -show_format`.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use pipeline_models::VideoMetadata;

use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Parse `ffprobe`'s JSON, selecting the first video stream for
/// resolution/codec/fps and the first audio stream for audio codec;
/// duration from the format section.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoMetadata> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "ffprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream found".to_string()))?;

    let audio_streams: Vec<&FfprobeStream> =
        probe.streams.iter().filter(|s| s.codec_type == "audio").collect();
    let subtitle_count = probe.streams.iter().filter(|s| s.codec_type == "subtitle").count();

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe.format.size.as_ref().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
    let bitrate = probe.format.bit_rate.as_ref().and_then(|b| b.parse::<u64>().ok()).unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoMetadata::new(
        duration,
        video_stream.width.unwrap_or(0),
        video_stream.height.unwrap_or(0),
        fps,
        video_stream.codec_name.clone().unwrap_or_default(),
        audio_streams.first().and_then(|s| s.codec_name.clone()),
        audio_streams.len() as u32,
        subtitle_count > 0,
        bitrate,
        size,
    ))
}

pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let metadata = probe_video(path).await?;
    Ok(metadata.duration)
}

/// Parse frame rate string (e.g. `"30/1"` or `"29.97"`).
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
    }
}
