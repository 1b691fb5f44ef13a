//! Base64 payload encoding for ETC's `AnalyzeFrame`/`Transcribe` requests
//! (§4.1, §4.2).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

use crate::error::MediaResult;

/// Read a file and return its standard base64 encoding.
pub async fn encode_file_base64(path: impl AsRef<Path>) -> MediaResult<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(STANDARD.encode(bytes))
}

pub fn encode_bytes_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bytes_base64() {
        assert_eq!(encode_bytes_base64(b"hi"), "aGk=");
    }
}
