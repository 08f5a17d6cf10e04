fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use filedrop_protocol::constants;
    use filedrop_protocol::{
        ChunkAck, ChunkSubmission, ErrorResponse, TransferDirection, TransferProgress,
        TransferState,
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
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
        parsed
    }

    // --- Server responses ---

    #[test]
    fn fixture_chunk_ack() {
        let ack = roundtrip_test::<ChunkAck>("chunk_ack.json");
        assert!(ack.is_success());
        assert_eq!(
            ack.session_token(),
            Some("2b7f0c1e-9a4d-4f55-8c1b-3f0e6a9d7c21")
        );
    }

    #[test]
    fn fixture_chunk_ack_error() {
        let ack = roundtrip_test::<ChunkAck>("chunk_ack_error.json");
        assert!(!ack.is_success());
        assert_eq!(ack.session_token(), None);
    }

    #[test]
    fn fixture_error_response() {
        let resp = roundtrip_test::<ErrorResponse>("error_response.json");
        assert_eq!(resp.error, "File not found");
    }

    // --- Progress snapshots ---

    #[test]
    fn fixture_transfer_progress_upload() {
        let progress = roundtrip_test::<TransferProgress>("transfer_progress_upload.json");
        assert_eq!(progress.direction, TransferDirection::Upload);
        assert_eq!(progress.state, TransferState::InFlight);
        let pct = progress.percentage().unwrap();
        assert!((pct - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn fixture_transfer_progress_download() {
        let progress = roundtrip_test::<TransferProgress>("transfer_progress_download.json");
        assert_eq!(progress.state, TransferState::Failed);
        assert_eq!(progress.total_bytes, None);
        assert_eq!(progress.percentage(), None);
    }

    #[test]
    fn state_and_direction_strings() {
        for (state, wire) in [
            (TransferState::Pending, "pending"),
            (TransferState::InFlight, "in_flight"),
            (TransferState::Completed, "completed"),
            (TransferState::Cancelled, "cancelled"),
            (TransferState::Failed, "failed"),
        ] {
            assert_eq!(serde_json::to_value(state).unwrap(), wire);
            assert_eq!(state.to_string(), wire);
        }
        assert_eq!(serde_json::to_value(TransferDirection::Upload).unwrap(), "upload");
        assert_eq!(
            serde_json::to_value(TransferDirection::Download).unwrap(),
            "download"
        );
    }

    // --- Multipart form layout ---

    #[test]
    fn fixture_chunk_form() {
        let form = load_fixture("chunk_form.json");
        assert_eq!(form["path"], constants::UPLOAD_CHUNK_PATH);
        assert_eq!(form["file_field"], constants::FIELD_CHUNK);
        assert_eq!(form["file_name"], constants::CHUNK_PART_FILE_NAME);

        let expected: Vec<&str> = form["text_fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();

        let submission = ChunkSubmission {
            filename: "docs/report.pdf".into(),
            chunk_number: 2,
            total_chunks: 3,
            file_size: 12_582_912,
            upload_id: Some("token".into()),
            chunk: Vec::new(),
        };
        let names: Vec<&str> = submission.text_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, expected);

        // The first chunk goes out before any token exists.
        let first = ChunkSubmission {
            chunk_number: 0,
            upload_id: None,
            ..submission
        };
        let names: Vec<&str> = first.text_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, expected[..expected.len() - 1]);
    }
}
