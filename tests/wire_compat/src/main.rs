fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use guangyuyun_protocol::{
        LargeFileUploadResponse, SmallFileUploadResponse, TokenRequest, TokenResponse,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  gateway: {fixture}\n  ours:    {reserialized}"
        );
        parsed
    }

    // --- Token ---

    #[test]
    fn fixture_token_request() {
        let req = roundtrip_test::<TokenRequest>("token_request.json");
        assert_eq!(req.api_key, "sk-7f3c2a9e41d84b6f");
        assert_eq!(req.expire_time, 1_753_760_400);
    }

    #[test]
    fn fixture_token_response_plain() {
        let resp = roundtrip_test::<TokenResponse>("token_response_plain.json");
        assert!(resp.is_success());
        assert!(resp.token().unwrap().starts_with("eyJ"));
        assert_eq!(resp.expire_time(), None);
    }

    #[test]
    fn fixture_token_response_detailed() {
        let resp = roundtrip_test::<TokenResponse>("token_response_detailed.json");
        assert!(resp.token().unwrap().starts_with("eyJ"));
        assert_eq!(resp.expire_time(), Some(1_753_760_400));
    }

    // --- Small file upload ---

    #[test]
    fn fixture_small_upload_response() {
        let resp = roundtrip_test::<SmallFileUploadResponse>("small_upload_response.json");
        assert!(resp.is_success());
        assert_eq!(
            resp.file_id(),
            Some("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG")
        );
    }

    #[test]
    fn fixture_small_upload_error() {
        let resp = roundtrip_test::<SmallFileUploadResponse>("small_upload_error.json");
        assert!(!resp.is_success());
        assert_eq!(resp.code, 5);
        assert_eq!(resp.file_id(), None);
    }

    // --- Large file upload ---

    #[test]
    fn fixture_large_upload_progress() {
        let resp = roundtrip_test::<LargeFileUploadResponse>("large_upload_progress.json");
        assert!(resp.is_success());
        assert_eq!(resp.server_offset(), Some(1_048_576));
        // Blank id means the upload is still open.
        assert_eq!(resp.remote_id(), None);
        assert!(!resp.is_upload_complete());
    }

    #[test]
    fn fixture_large_upload_complete() {
        let resp = roundtrip_test::<LargeFileUploadResponse>("large_upload_complete.json");
        assert!(resp.is_upload_complete());
        assert_eq!(
            resp.remote_id(),
            Some("QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o")
        );
    }

    #[test]
    fn fixture_large_upload_index_mismatch() {
        let resp = roundtrip_test::<LargeFileUploadResponse>("large_upload_index_mismatch.json");
        assert!(resp.is_index_mismatch());
        assert_eq!(resp.server_offset(), Some(5 * 1024 * 1024));
    }

    #[test]
    fn numeric_file_index_is_accepted() {
        // Some gateway builds send fileIndex as a JSON number.
        let json = r#"{"code":200,"message":"success","fileIndex":2097152}"#;
        let resp: LargeFileUploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.server_offset(), Some(2_097_152));

        let out = serde_json::to_value(&resp).unwrap();
        assert_eq!(out["fileIndex"], "2097152");
    }

    #[test]
    fn missing_fields_default() {
        let resp: LargeFileUploadResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.code, 0);
        assert!(resp.message.is_empty());
        assert_eq!(resp.server_offset(), None);

        let token: TokenResponse = serde_json::from_str(r#"{"code":401}"#).unwrap();
        assert!(!token.is_success());
        assert_eq!(token.token(), None);
    }
}
