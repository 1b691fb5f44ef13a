//! `ExtractFrames` (§4.2): three sampling modes over one source video.

use std::path::{Path, PathBuf};

use pipeline_models::FrameSamplingMode;
use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sample frames from `path` into `out_dir`, writing JPEGs named
/// `frame-%05d.jpg`. Returns the extracted paths in frame order.
///
/// `cancel` observes the job deadline (§5): when it flips to `true` the
/// underlying `ffmpeg` process is killed and `Cancelled` is returned.
pub async fn extract_frames(
    path: impl AsRef<Path>,
    mode: FrameSamplingMode,
    sample_rate: u32,
    max_frames: u32,
    duration: f64,
    out_dir: impl AsRef<Path>,
    cancel: Option<watch::Receiver<bool>>,
) -> MediaResult<Vec<PathBuf>> {
    let path = path.as_ref();
    let out_dir = out_dir.as_ref();
    tokio::fs::create_dir_all(out_dir).await?;

    let max_frames = max_frames.max(1);
    let filter = build_filter(mode, sample_rate, max_frames, duration);

    let output_pattern = out_dir.join("frame-%05d.jpg");
    let cmd = FfmpegCommand::new(path, &output_pattern)
        .video_filter(filter)
        .output_arg("-vsync")
        .output_arg("vfr")
        .output_arg("-q:v")
        .output_arg("2")
        .output_arg("-frames:v")
        .output_arg(max_frames.to_string());

    let mut runner = FfmpegRunner::new();
    if let Some(rx) = cancel {
        runner = runner.with_cancel(rx);
    }
    runner.run(&cmd).await?;

    collect_frame_paths(out_dir).await
}

fn build_filter(mode: FrameSamplingMode, sample_rate: u32, max_frames: u32, duration: f64) -> String {
    match mode {
        FrameSamplingMode::Keyframes => "select='eq(pict_type,I)'".to_string(),
        FrameSamplingMode::Uniform => {
            let fps = if sample_rate > 0 {
                sample_rate as f64
            } else if duration > 0.0 {
                (max_frames as f64 / duration).max(0.01)
            } else {
                1.0
            };
            format!("fps={:.4}", fps)
        }
        FrameSamplingMode::SceneBased => "select='gt(scene,0.3)'".to_string(),
    }
}

async fn collect_frame_paths(out_dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// `Validate(path)`: a file ffprobe cannot describe is treated as corrupt.
pub async fn validate_video(path: impl AsRef<Path>) -> MediaResult<()> {
    crate::probe::probe_video(path)
        .await
        .map(|_| ())
        .map_err(|e| MediaError::InvalidVideo(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_filter_uses_sample_rate_when_set() {
        let filter = build_filter(FrameSamplingMode::Uniform, 2, 30, 60.0);
        assert_eq!(filter, "fps=2.0000");
    }

    #[test]
    fn test_uniform_filter_falls_back_to_max_frames_over_duration() {
        let filter = build_filter(FrameSamplingMode::Uniform, 0, 30, 60.0);
        assert_eq!(filter, "fps=0.5000");
    }

    #[test]
    fn test_keyframes_filter() {
        assert_eq!(build_filter(FrameSamplingMode::Keyframes, 1, 30, 60.0), "select='eq(pict_type,I)'");
    }

    #[test]
    fn test_scene_based_filter() {
        assert_eq!(build_filter(FrameSamplingMode::SceneBased, 1, 30, 60.0), "select='gt(scene,0.3)'");
    }
}
