//! `MtkConfig::from_env()` (§6 CLI/config surface).

#[derive(Debug, Clone)]
pub struct MtkConfig {
    pub temp_dir: String,
    pub max_video_size: u64,
    pub max_file_size: u64,
    pub download_max_retries: u32,
    pub download_retry_delay_ms: u64,
    pub yt_proxy_url: Option<String>,
    pub yt_cookies_path: Option<String>,
}

impl Default for MtkConfig {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/video-pipeline".to_string(),
            max_video_size: 5 * 1024 * 1024 * 1024,
            max_file_size: 5 * 1024 * 1024 * 1024,
            download_max_retries: 3,
            download_retry_delay_ms: 1_000,
            yt_proxy_url: None,
            yt_cookies_path: None,
        }
    }
}

impl MtkConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            temp_dir: std::env::var("TEMP_DIR").unwrap_or(default.temp_dir),
            max_video_size: std::env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_video_size),
            max_file_size: std::env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_file_size),
            download_max_retries: std::env::var("DOWNLOAD_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            download_retry_delay_ms: std::env::var("DOWNLOAD_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
            yt_proxy_url: std::env::var("YT_PROXY_URL").ok(),
            yt_cookies_path: std::env::var("YT_COOKIES_PATH").ok(),
        }
    }

    /// Per-job working directory (§6 temp filesystem layout).
    pub fn job_dir(&self, job_id: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.temp_dir).join(job_id)
    }
}
