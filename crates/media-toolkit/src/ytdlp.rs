//! YouTube acquisition via `yt-dlp`, with optional proxy/cookie plumbing
//! (§4.2).

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Download a YouTube video with `yt-dlp`, optionally routed through a
/// proxy and/or a cookies file for age- or login-gated content.
pub async fn download_youtube(
    url: &str,
    output_path: impl AsRef<Path>,
    proxy_url: Option<&str>,
    cookies_path: Option<&str>,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let mut args: Vec<String> = vec![
        "-f".to_string(),
        "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
    ];

    if let Some(proxy) = proxy_url {
        args.push("--proxy".to_string());
        args.push(proxy.to_string());
    }

    if let Some(cookies) = cookies_path {
        args.push("--cookies".to_string());
        args.push(cookies.to_string());
    }

    args.push("-o".to_string());

    info!("downloading youtube source {} to {}", url, output_path.display());

    let output = Command::new("yt-dlp")
        .args(&args)
        .arg(output_path)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("yt-dlp did not produce an output file"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::is_youtube_url;

    #[test]
    fn test_youtube_detection_gate() {
        assert!(is_youtube_url("https://youtu.be/abc123"));
        assert!(!is_youtube_url("https://example.com/video.mp4"));
    }
}
