//! Media CDN upload signature
//!
//! The CDN authenticates signed uploads with
//! `sha1_hex(sorted "k=v" pairs joined by '&' + api_secret)`; parameters with
//! empty values are left out of the string to sign.

use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Build the canonical string to sign from upload parameters
pub fn string_to_sign(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign upload parameters with the CDN API secret
pub fn sign_upload_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Signature for the `{folder, timestamp}` pair issued by the upload endpoint
pub fn sign_folder_upload(folder: &str, timestamp: i64, api_secret: &str) -> String {
    let mut params = BTreeMap::new();
    params.insert("folder", folder.to_string());
    params.insert("timestamp", timestamp.to_string());
    sign_upload_params(&params, api_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_sign_is_sorted() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        assert_eq!(
            string_to_sign(&params),
            "eager=w_400,h_300,c_pad|w_260,h_200,c_crop&public_id=sample_image&timestamp=1315060510"
        );
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut params = BTreeMap::new();
        params.insert("folder", String::new());
        params.insert("timestamp", "100".to_string());
        assert_eq!(string_to_sign(&params), "timestamp=100");
    }

    #[test]
    fn test_known_signature() {
        // Reference example published in the CDN's signature documentation
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1315060510".to_string());
        params.insert("public_id", "sample_image".to_string());
        params.insert("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop".to_string());
        assert_eq!(
            sign_upload_params(&params, "abcd"),
            "bfd09f95f331f558cbd1320e67aa8d488770583e"
        );
    }

    #[test]
    fn test_folder_signature_matches_generic() {
        let mut params = BTreeMap::new();
        params.insert("folder", "videos".to_string());
        params.insert("timestamp", "1700000000".to_string());
        assert_eq!(
            sign_folder_upload("videos", 1_700_000_000, "secret"),
            sign_upload_params(&params, "secret")
        );
        assert_eq!(sign_folder_upload("videos", 1_700_000_000, "secret").len(), 40);
    }
}
