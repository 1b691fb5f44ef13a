//! `Acquire(source, jobId) -> localPath` (§4.2): dispatches by source kind
//! into the worker's per-job temp directory.
//!
//! `Job.videoUrl` is the generic source locator: an HTTP(S) URL for
//! `Url`/`Youtube`, a pre-authorized download URL for `Drive` (OAuth token
//! exchange is a submitter-API concern, out of scope per §1), or a
//! worker-local staging path for `Buffer` (the front end writes inline
//! uploads there before enqueueing).

use std::path::PathBuf;
use std::time::Duration;

use pipeline_models::JobSource;

use crate::config::MtkConfig;
use crate::download::download_http;
use crate::error::MediaResult;
use crate::fs_utils::move_file;
use crate::security::{is_youtube_url, validate_filename, validate_video_url};
use crate::ytdlp::download_youtube;
use crate::MediaError;

/// Fetch the job's source into `<config.temp_dir>/<job_id>/<dest name>`.
pub async fn acquire(
    source: JobSource,
    video_url: &str,
    filename: &str,
    job_id: &str,
    config: &MtkConfig,
) -> MediaResult<PathBuf> {
    let job_dir = config.job_dir(job_id);
    tokio::fs::create_dir_all(&job_dir).await?;

    let dest_name = sanitized_dest_name(filename);
    let dest = job_dir.join(dest_name);
    let retry_delay = Duration::from_millis(config.download_retry_delay_ms);

    match source {
        JobSource::Url => {
            validate_video_url(video_url).map_err(|e| MediaError::SecurityViolation(e.message()))?;
            if is_youtube_url(video_url) {
                download_youtube(
                    video_url,
                    &dest,
                    config.yt_proxy_url.as_deref(),
                    config.yt_cookies_path.as_deref(),
                )
                .await?;
            } else {
                download_http(video_url, &dest, config.max_video_size, config.download_max_retries, retry_delay)
                    .await?;
            }
            Ok(dest)
        }
        JobSource::Youtube => {
            validate_video_url(video_url).map_err(|e| MediaError::SecurityViolation(e.message()))?;
            download_youtube(video_url, &dest, config.yt_proxy_url.as_deref(), config.yt_cookies_path.as_deref())
                .await?;
            Ok(dest)
        }
        JobSource::Drive => {
            validate_video_url(video_url).map_err(|e| MediaError::SecurityViolation(e.message()))?;
            download_http(video_url, &dest, config.max_video_size, config.download_max_retries, retry_delay)
                .await?;
            Ok(dest)
        }
        JobSource::Buffer => {
            move_file(video_url, &dest).await?;
            Ok(dest)
        }
    }
}

fn sanitized_dest_name(filename: &str) -> String {
    if validate_filename(filename).is_ok() && !filename.is_empty() {
        filename.to_string()
    } else {
        "source.mp4".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_dest_name_rejects_traversal() {
        assert_eq!(sanitized_dest_name("../../etc/passwd"), "source.mp4");
        assert_eq!(sanitized_dest_name("clip.mp4"), "clip.mp4");
    }
}
