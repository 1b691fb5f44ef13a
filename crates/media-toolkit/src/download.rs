//! HTTP source acquisition (§4.2.1): retried, size-bounded, redirect-capped
//! streaming download used by `Acquire` for direct-URL and cloud-drive
//! sources.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const MAX_REDIRECTS: usize = 10;

fn is_allowed_content_type(content_type: Option<&str>, allow_prefixes: &[&str]) -> bool {
    match content_type {
        None => true,
        Some(ct) => {
            let ct = ct.split(';').next().unwrap_or(ct).trim();
            if ct.is_empty() {
                return true;
            }
            allow_prefixes.iter().any(|prefix| ct.starts_with(prefix))
        }
    }
}

/// Download `url` to `out_path`, retrying transient failures up to
/// `max_retries` with backoff `retry_delay * attempt`. Only network errors
/// and HTTP 5xx are retried; 4xx and content-validation failures are not.
pub async fn download_http(
    url: &str,
    out_path: impl AsRef<Path>,
    max_file_size: u64,
    max_retries: u32,
    retry_delay: Duration,
) -> MediaResult<()> {
    let out_path = out_path.as_ref();
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match try_download(&client, url, out_path, max_file_size).await {
            Ok(()) => return Ok(()),
            Err((e, retryable)) if attempt <= max_retries && retryable => {
                let delay = retry_delay * attempt;
                warn!("download attempt {} failed ({}), retrying in {:?}", attempt, e, delay);
                tokio::time::sleep(delay).await;
            }
            Err((e, _)) => return Err(e),
        }
    }
}

/// Returns `(error, retryable)` on failure — retryable iff the failure was
/// a network error or HTTP 5xx, never for 4xx or content validation.
async fn try_download(
    client: &Client,
    url: &str,
    out_path: &Path,
    max_file_size: u64,
) -> Result<(), (MediaError, bool)> {
    let response = client.get(url).send().await.map_err(|e| {
        let retryable = MediaError::from(e).is_retryable();
        (MediaError::download_failed("network error contacting source"), retryable)
    })?;

    if !response.status().is_success() {
        let status = response.status();
        debug!("download responded with status {}", status);
        let retryable = status.is_server_error();
        return Err((MediaError::download_failed(format!("unexpected status {}", status)), retryable));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !is_allowed_content_type(content_type.as_deref(), &["video/"]) {
        return Err((
            MediaError::Validation(format!("unsupported content type: {}", content_type.unwrap_or_default())),
            false,
        ));
    }

    let mut file = tokio::fs::File::create(out_path).await.map_err(|e| (MediaError::from(e), false))?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| (MediaError::from(e), true))?;
        written += chunk.len() as u64;
        if written > max_file_size {
            drop(file);
            let _ = tokio::fs::remove_file(out_path).await;
            return Err((
                MediaError::ResourceLimit(format!("download exceeded max file size of {} bytes", max_file_size)),
                false,
            ));
        }
        file.write_all(&chunk).await.map_err(|e| (MediaError::from(e), false))?;
    }

    file.flush().await.map_err(|e| (MediaError::from(e), false))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_video_content_type() {
        assert!(is_allowed_content_type(Some("video/mp4"), &["video/"]));
        assert!(is_allowed_content_type(Some("video/mp4; charset=binary"), &["video/"]));
    }

    #[test]
    fn test_allows_missing_content_type() {
        assert!(is_allowed_content_type(None, &["video/"]));
        assert!(is_allowed_content_type(Some(""), &["video/"]));
    }

    #[test]
    fn test_rejects_non_video_content_type() {
        assert!(!is_allowed_content_type(Some("text/html"), &["video/"]));
    }
}
