//! Signed media upload payloads

use serde::{Deserialize, Serialize};

/// Folder used when the caller does not name one
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUploadRequest {
    #[serde(default)]
    pub folder: Option<String>,
}

/// Everything the browser needs to upload straight to the media CDN
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUploadResponse {
    pub cloud_name: String,
    pub api_key: String,
    pub timestamp: i64,
    pub signature: String,
    pub folder: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_uses_camel_case() {
        let resp = SignUploadResponse {
            cloud_name: "demo".to_string(),
            api_key: "123".to_string(),
            timestamp: 1_700_000_000,
            signature: "abc".to_string(),
            folder: "uploads".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["cloudName"], "demo");
        assert_eq!(json["apiKey"], "123");
        assert_eq!(json["timestamp"], 1_700_000_000);
    }
}
