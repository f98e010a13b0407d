fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use harufilm_protocol::messages::{
        CompleteThumbnailRequest, CompleteUploadRequest, ErrorResponse, InitiateThumbnailRequest,
        InitiateUploadRequest, InitiateUploadResponse, PartUrlRequest, PresignedUrlResponse,
        SuccessResponse,
    };
    use harufilm_session_store::{
        FileBackend, ManualClock, MemoryBackend, STORAGE_KEY, SessionStore, UploadSession,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Normalizes JSON numbers so that `0` and `0.0` compare equal.
    ///
    /// The web client writes whole-second offsets as integers while `f64`
    /// fields serialize with a fractional part.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(|f| serde_json::json!(f))
                .unwrap_or_else(|| v.clone()),
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
    }

    // --- Control plane bodies ---

    #[test]
    fn fixture_initiate_upload_request() {
        roundtrip_test::<InitiateUploadRequest>("initiate_upload_request.json");
    }

    #[test]
    fn fixture_initiate_upload_response() {
        roundtrip_test::<InitiateUploadResponse>("initiate_upload_response.json");
    }

    #[test]
    fn fixture_part_url_request() {
        roundtrip_test::<PartUrlRequest>("part_url_request.json");
    }

    #[test]
    fn fixture_presigned_url_response() {
        roundtrip_test::<PresignedUrlResponse>("presigned_url_response.json");
    }

    #[test]
    fn fixture_thumbnail_requests() {
        roundtrip_test::<InitiateThumbnailRequest>("thumbnail_request.json");
        roundtrip_test::<CompleteThumbnailRequest>("thumbnail_request.json");
    }

    #[test]
    fn fixture_success_response() {
        roundtrip_test::<SuccessResponse>("success_response.json");
    }

    #[test]
    fn fixture_error_response() {
        roundtrip_test::<ErrorResponse>("error_response.json");
        let err: ErrorResponse = serde_json::from_value(load_fixture("error_response.json")).unwrap();
        assert_eq!(err.description(), Some("invalid upload id"));
    }

    #[test]
    fn fixture_complete_upload_request() {
        let fixture = load_fixture("complete_upload_request.json");
        let parsed: CompleteUploadRequest = serde_json::from_value(fixture.clone()).unwrap();
        assert_eq!(parsed.parts.len(), 3);
        assert_eq!(parsed.parts[0].part_number, 1);
        assert_eq!(parsed.parts[0].checksum_tag, "9b2cf535f27731c974343645a3985328");
        assert_eq!(parsed.timestamps[1].time, 12.5);

        let reserialized = serde_json::to_value(&parsed).unwrap();
        assert_eq!(normalize_value(&fixture), normalize_value(&reserialized));
    }

    #[test]
    fn complete_request_accepts_string_times() {
        let json = r#"{"uploadId":"u","uploadDate":"2025-01-10","parts":[],
                       "timestamps":[{"time":"7.25","label":"dinner"}]}"#;
        let parsed: CompleteUploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamps[0].time, 7.25);
    }

    // --- Persisted session document ---

    fn clock_at_fixture_time() -> Arc<ManualClock> {
        // 2025-01-10T03:00:00Z, the newer session's lastUpdated.
        Arc::new(ManualClock::new(
            chrono::DateTime::from_timestamp_millis(1_736_478_000_000).unwrap(),
        ))
    }

    #[test]
    fn fixture_upload_session_roundtrip() {
        let doc = load_fixture("upload_session_storage.json");
        let record = &doc["sessions"]["2025-01-10_15728640"];
        let session: UploadSession = serde_json::from_value(record.clone()).unwrap();
        assert_eq!(session.transfer_id, "2~mQ0aZ8d1N3vYkqVv0nRk4b1Zt7");
        assert_eq!(session.part_count, 3);
        assert_eq!(serde_json::to_value(&session).unwrap(), *record);
    }

    #[test]
    fn store_reads_fixture_document() {
        let backend = MemoryBackend::new();
        backend.insert_raw(STORAGE_KEY, &read_fixture("upload_session_storage.json"));
        let store = SessionStore::with_clock(backend, clock_at_fixture_time()).unwrap();

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 2);
        let session = store.get_session("2025-01-10_15728640").unwrap();
        assert_eq!(
            session.sorted_parts().iter().map(|p| p.part_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn store_writes_same_shape_it_reads() {
        let backend = MemoryBackend::new();
        backend.insert_raw(STORAGE_KEY, &read_fixture("upload_session_storage.json"));
        let clock = clock_at_fixture_time();
        let store = SessionStore::with_clock(backend.clone(), clock.clone()).unwrap();

        // The older session is exactly 24h old: kept. One more millisecond purges it.
        assert!(store.clear_expired_sessions(Duration::from_secs(86_400)).unwrap().is_empty());
        clock.advance(Duration::from_millis(1));
        let purged = store.clear_expired_sessions(Duration::from_secs(86_400)).unwrap();
        assert_eq!(purged, vec!["2025-01-09_5242880".to_string()]);

        let written: serde_json::Value =
            serde_json::from_str(&backend.raw(STORAGE_KEY).unwrap()).unwrap();
        let fixture = load_fixture("upload_session_storage.json");
        assert_eq!(
            written["sessions"]["2025-01-10_15728640"],
            fixture["sessions"]["2025-01-10_15728640"]
        );
        assert!(written["sessions"].get("2025-01-09_5242880").is_none());
    }

    #[test]
    fn file_backend_document_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::open(FileBackend::new(tmp.path())).unwrap();
        store
            .save_session("k", UploadSession::new("u", "2025-01-10", 1, 0))
            .unwrap();
        assert!(tmp.path().join("upload-session-storage.json").exists());
    }
}
