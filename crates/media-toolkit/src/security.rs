//! `videoUrl` SSRF/scheme validation and `filename` path-traversal
//! validation (§6).

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

const MAX_URL_LENGTH: usize = 2048;

/// Patterns matching private/loopback/link-local hosts and cloud metadata
/// endpoints.
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^https?://127\.").unwrap(),
        Regex::new(r"^https?://localhost").unwrap(),
        Regex::new(r"^https?://10\.").unwrap(),
        Regex::new(r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.").unwrap(),
        Regex::new(r"^https?://192\.168\.").unwrap(),
        Regex::new(r"^https?://169\.254\.").unwrap(),
        Regex::new(r"^https?://\[::1\]").unwrap(),
        Regex::new(r"^https?://\[fd").unwrap(),
        Regex::new(r"^https?://\[fe80").unwrap(),
        Regex::new(r"^https?://metadata\.").unwrap(),
        Regex::new(r"^https?://169\.254\.169\.254").unwrap(),
        Regex::new(r"^https?://metadata\.google\.internal").unwrap(),
    ]
});

/// Well-known hosting domains recognised for source-kind dispatch (§4.2
/// `Acquire`'s YouTube path). This is a dispatch hint, not an access-control
/// gate — unlisted domains still pass `validate_video_url` as long as they
/// clear the scheme and blocked-pattern checks (§6's literal contract has
/// no domain allow-list).
static YOUTUBE_DOMAINS: LazyLock<[&'static str; 4]> =
    LazyLock::new(|| ["youtube.com", "www.youtube.com", "youtu.be", "m.youtube.com"]);

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    TooLong,
    Empty,
    Invalid(String),
    BadScheme(String),
    Blocked,
}

impl UrlValidationError {
    pub fn message(&self) -> String {
        match self {
            UrlValidationError::TooLong => {
                format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)
            }
            UrlValidationError::Empty => "URL cannot be empty".to_string(),
            UrlValidationError::Invalid(e) => format!("invalid URL format: {}", e),
            UrlValidationError::BadScheme(s) => {
                format!("invalid protocol '{}'. Only HTTP and HTTPS are allowed", s)
            }
            UrlValidationError::Blocked => "private_address".to_string(),
        }
    }
}

/// Validate `videoUrl` per §6: scheme in {http, https}, no private/
/// link-local/loopback host, length cap.
pub fn validate_video_url(url: &str) -> Result<(), UrlValidationError> {
    if url.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlValidationError::Invalid(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::BadScheme(other.to_string())),
    }

    if BLOCKED_PATTERNS.iter().any(|p| p.is_match(trimmed)) {
        return Err(UrlValidationError::Blocked);
    }

    if parsed.host_str().is_none() {
        return Err(UrlValidationError::Invalid("missing host".to_string()));
    }

    Ok(())
}

/// Whether a URL's host is a recognised YouTube domain (used by
/// `MTK.Acquire` to decide between the metadata-API/`yt-dlp` path and the
/// plain HTTP fetcher).
pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|host| YOUTUBE_DOMAINS.contains(&host.as_str()))
        .unwrap_or(false)
}

/// Reject `filename` containing `..`, `/`, or `\` (§6).
pub fn validate_filename(filename: &str) -> Result<(), UrlValidationError> {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return Err(UrlValidationError::Invalid(
            "filename must not contain path separators or '..'".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_https_url() {
        assert!(validate_video_url("https://example.com/10s.mp4").is_ok());
    }

    #[test]
    fn test_rejects_bad_scheme() {
        assert_eq!(
            validate_video_url("ftp://example.com/v.mp4"),
            Err(UrlValidationError::BadScheme("ftp".to_string()))
        );
    }

    #[test]
    fn test_rejects_private_address() {
        assert_eq!(
            validate_video_url("http://10.0.0.1/v.mp4"),
            Err(UrlValidationError::Blocked)
        );
    }

    #[test]
    fn test_rejects_metadata_endpoint() {
        assert_eq!(
            validate_video_url("http://169.254.169.254/latest/meta-data/"),
            Err(UrlValidationError::Blocked)
        );
    }

    #[test]
    fn test_rejects_too_long() {
        let long_url = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validate_video_url(&long_url), Err(UrlValidationError::TooLong));
    }

    #[test]
    fn test_filename_rejects_traversal() {
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.mp4").is_err());
        assert!(validate_filename("a\\b.mp4").is_err());
        assert!(validate_filename("video.mp4").is_ok());
    }

    #[test]
    fn test_youtube_domain_detection() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_youtube_url("https://youtu.be/abc"));
        assert!(!is_youtube_url("https://example.com/v.mp4"));
    }
}
